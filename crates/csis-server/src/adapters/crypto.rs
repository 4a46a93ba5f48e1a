//! Software crypto gateway.
//!
//! Computes the block immediately and posts the result back through the
//! runtime channel, so callers see the same request/completion split as with
//! a controller-side AES engine.

use super::runtime::ServiceEvent;
use crate::ports::outbound::{CryptoGateway, EncryptRequest, EncryptionCompletion};
use csis_crypto::{Aes128Block, BlockCipher, CryptoError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// [`CryptoGateway`] backed by a local [`BlockCipher`].
pub struct LocalCryptoGateway<C: BlockCipher = Aes128Block> {
    cipher: C,
    events: mpsc::Sender<ServiceEvent>,
}

impl LocalCryptoGateway {
    /// Gateway using software AES.
    pub fn new(events: mpsc::Sender<ServiceEvent>) -> Self {
        Self::with_cipher(Aes128Block, events)
    }
}

impl<C: BlockCipher> LocalCryptoGateway<C> {
    /// Gateway using a custom cipher.
    pub fn with_cipher(cipher: C, events: mpsc::Sender<ServiceEvent>) -> Self {
        Self { cipher, events }
    }
}

impl<C: BlockCipher> CryptoGateway for LocalCryptoGateway<C> {
    fn request_encrypt_block(&self, request: EncryptRequest) -> Result<(), CryptoError> {
        let ciphertext = self
            .cipher
            .encrypt_block(&request.key, &request.iv, &request.plaintext);

        let completion = EncryptionCompletion {
            service: request.service,
            connection: request.connection,
            result: Ok(ciphertext),
        };

        match self.events.try_send(ServiceEvent::EncryptionComplete(completion)) {
            Ok(()) => {
                debug!(service = %request.service, connection = %request.connection, "Encryption queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(service = %request.service, "Event channel full, encryption refused");
                Err(CryptoError::EngineBusy)
            }
            Err(TrySendError::Closed(_)) => Err(CryptoError::EngineUnavailable),
        }
    }
}
