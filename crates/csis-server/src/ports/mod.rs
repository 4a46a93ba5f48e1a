//! Ports layer (hexagonal architecture).
//!
//! - `inbound`: the API the GATT dispatch layer and the application drive
//! - `outbound`: collaborators the service drives

pub mod inbound;
pub mod outbound;

pub use inbound::CoordinatedSetApi;
pub use outbound::{
    CryptoGateway, EncryptRequest, EncryptionCompletion, GattTransport, IdentityResolver,
    LeaseTimer,
};
