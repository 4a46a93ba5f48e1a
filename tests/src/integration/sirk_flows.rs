//! # SIRK Flows
//!
//! SIRK reads and change notifications under each sharing mode, with the
//! software crypto gateway completing through the runtime channel.

#[cfg(test)]
mod tests {
    use crate::support::{Device, IdentityTable, Pdu, NOTIFY};
    use csis_crypto::{encrypt_block, ZERO_IV};
    use csis_server::{parse_sirk, CoordinatedSetApi, CsisConfig, CsisError, Sirk};
    use csis_types::{AttStatus, Attribute, Characteristic, ConnectionId, SharingMode};

    const SIRK_HEX: &str = "457d7d0921a1fd22cecd8c86dd72cccd";
    const NEW_SIRK_HEX: &str = "00112233445566778899aabbccddeeff";
    const SIRK_VALUE: Attribute = Attribute::Value(Characteristic::Sirk);

    const C1: ConnectionId = ConnectionId(1);
    const C2: ConnectionId = ConnectionId(2);
    const C3: ConnectionId = ConnectionId(3);
    const C4: ConnectionId = ConnectionId(4);

    fn device(mode: SharingMode) -> Device {
        let config = CsisConfig::default()
            .with_sharing_mode(mode)
            .with_sirk_hex(SIRK_HEX)
            .with_max_connections(3);
        Device::new(&config, &[1]).unwrap()
    }

    fn new_sirk() -> Sirk {
        parse_sirk(NEW_SIRK_HEX).unwrap()
    }

    fn encrypted_for(n: u8, sirk: &Sirk) -> Vec<u8> {
        let mut value = vec![0x00];
        value.extend_from_slice(&encrypt_block(
            &IdentityTable::key(n),
            &ZERO_IV,
            &sirk.to_be_bytes(),
        ));
        value
    }

    /// Test: plaintext mode returns the key as configured
    #[tokio::test]
    async fn test_plaintext_read() {
        let mut device = device(SharingMode::PlaintextOnly);
        device.connect(1, C1, 1, &[]);
        device.read(1, C1, SIRK_VALUE);

        let mut expected = vec![0x01];
        expected.extend_from_slice(&hex::decode(SIRK_HEX).unwrap());
        assert_eq!(
            device.transport.last_read(C1),
            Some((AttStatus::Success, expected))
        );
    }

    /// Test: encrypted mode answers with the key under the peer's link key
    #[tokio::test]
    async fn test_encrypted_read() {
        let mut device = device(SharingMode::EncryptedOnly);
        device.connect(1, C1, 7, &[]);
        device.read(1, C1, SIRK_VALUE);

        let sirk = parse_sirk(SIRK_HEX).unwrap();
        assert_eq!(
            device.transport.last_read(C1),
            Some((AttStatus::Success, encrypted_for(7, &sirk)))
        );
    }

    /// Test: OOB-only mode refuses every read
    #[tokio::test]
    async fn test_oob_read_refused() {
        let mut device = device(SharingMode::OobOnly);
        device.connect(1, C1, 1, &[]);
        device.read(1, C1, SIRK_VALUE);

        assert_eq!(
            device.transport.last_read(C1),
            Some((AttStatus::OobSirkOnly, Vec::new()))
        );
    }

    /// Test: [C1 notify on, C2 off], encrypted change reaches C1 only
    #[tokio::test]
    async fn test_encrypted_change_only_subscribers() {
        let mut device = device(SharingMode::EncryptedOnly);
        device.connect(1, C1, 1, &[Characteristic::Sirk]);
        device.connect(1, C2, 2, &[]);
        device.transport.take();

        device.service(1).set_sirk(new_sirk()).unwrap();
        device.runtime.drain();

        assert_eq!(
            device.transport.notifications_to(C1, Characteristic::Sirk),
            vec![encrypted_for(1, &new_sirk())]
        );
        assert!(device
            .transport
            .notifications_to(C2, Characteristic::Sirk)
            .is_empty());
    }

    /// Test: every subscriber gets its own ciphertext, in registry order
    #[tokio::test]
    async fn test_encrypted_change_fan_out() {
        let mut device = device(SharingMode::EncryptedOnly);
        for (connection, n) in [(C1, 1), (C2, 2), (C3, 3)] {
            device.connect(1, connection, n, &[Characteristic::Sirk]);
        }
        device.transport.take();

        device.service(1).set_sirk(new_sirk()).unwrap();
        device.runtime.drain();

        let sent: Vec<_> = device
            .transport
            .take()
            .into_iter()
            .filter_map(|pdu| match pdu {
                Pdu::Notify {
                    connection, value, ..
                } => Some((connection, value)),
                _ => None,
            })
            .collect();
        assert_eq!(
            sent,
            vec![
                (C1, encrypted_for(1, &new_sirk())),
                (C2, encrypted_for(2, &new_sirk())),
                (C3, encrypted_for(3, &new_sirk())),
            ]
        );
    }

    /// Test: subscribers without a link key are passed over
    #[tokio::test]
    async fn test_fan_out_skips_unbonded() {
        let mut device = device(SharingMode::EncryptedOnly);
        device.connect(1, C1, 1, &[Characteristic::Sirk]);
        device.connect(1, C2, 2, &[Characteristic::Sirk]);
        device.connect(1, C3, 3, &[Characteristic::Sirk]);
        device.transport.take();

        // C2 loses its link key
        device.identities.identify(C2, 2);
        device.service(1).set_sirk(new_sirk()).unwrap();
        device.runtime.drain();

        assert_eq!(device.transport.notification_count(Characteristic::Sirk), 2);
        assert!(device
            .transport
            .notifications_to(C2, Characteristic::Sirk)
            .is_empty());
    }

    /// Test: plaintext change is one notification per subscriber
    #[tokio::test]
    async fn test_plaintext_change() {
        let mut device = device(SharingMode::PlaintextOnly);
        device.connect(1, C1, 1, &[Characteristic::Sirk]);
        device.connect(1, C2, 2, &[Characteristic::Sirk]);
        device.transport.take();

        device.service(1).set_sirk(new_sirk()).unwrap();

        let mut expected = vec![0x01];
        expected.extend_from_slice(&hex::decode(NEW_SIRK_HEX).unwrap());
        assert_eq!(
            device.transport.notifications_to(C1, Characteristic::Sirk),
            vec![expected.clone()]
        );
        assert_eq!(
            device.transport.notifications_to(C2, Characteristic::Sirk),
            vec![expected]
        );
    }

    /// Test: rewriting the same key is silent
    #[tokio::test]
    async fn test_same_key_silent() {
        let mut device = device(SharingMode::PlaintextOnly);
        device.connect(1, C1, 1, &[Characteristic::Sirk]);
        device.transport.take();

        let changes = device
            .service(1)
            .set_sirk(parse_sirk(SIRK_HEX).unwrap())
            .unwrap();

        assert!(changes.is_empty());
        assert!(device.transport.take().is_empty());
    }

    /// Test: a change while a read is in flight is refused whole
    #[tokio::test]
    async fn test_change_refused_while_busy() {
        let mut device = device(SharingMode::EncryptedOnly);
        device.connect(1, C1, 1, &[Characteristic::Sirk]);
        device.connect(1, C2, 2, &[]);

        // Dispatch without draining so the completion stays queued
        device.runtime.dispatch(csis_server::ServiceEvent::Read {
            service: csis_types::ServiceHandle(1),
            connection: C2,
            attribute: SIRK_VALUE,
        });

        assert_eq!(
            device.service(1).set_sirk(new_sirk()),
            Err(CsisError::EncryptionBusy)
        );
        assert_eq!(
            device.service(1).identity().sirk,
            parse_sirk(SIRK_HEX).unwrap()
        );

        // Once the read completes the change goes through
        device.runtime.drain();
        assert!(device.service(1).set_sirk(new_sirk()).is_ok());
    }

    /// Test: a switch to OOB before the queued completions run sends nothing
    #[tokio::test]
    async fn test_switch_to_oob_halts_fan_out() {
        let mut device = device(SharingMode::EncryptedOnly);
        device.connect(1, C1, 1, &[Characteristic::Sirk]);
        device.connect(1, C2, 2, &[Characteristic::Sirk]);
        device.transport.take();

        device.service(1).set_sirk(new_sirk()).unwrap();
        device
            .service(1)
            .set_sharing_mode(SharingMode::OobOnly)
            .unwrap();
        device.runtime.drain();

        assert_eq!(device.transport.notification_count(Characteristic::Sirk), 0);
        assert_eq!(device.service(1).metrics().encryptions_requested, 1);
    }

    /// Test: size changes reach Size subscribers
    #[tokio::test]
    async fn test_size_change_notified() {
        let mut device = device(SharingMode::PlaintextOnly);
        device.connect(1, C1, 1, &[Characteristic::Size]);
        device.transport.take();

        device.service(1).set_size(3).unwrap();
        assert_eq!(
            device.transport.notifications_to(C1, Characteristic::Size),
            vec![vec![3]]
        );
    }

    /// Test: the connection past capacity is refused, the table is unchanged
    #[tokio::test]
    async fn test_registry_full() {
        let mut device = device(SharingMode::PlaintextOnly);
        for (connection, n) in [(C1, 1), (C2, 2), (C3, 3), (C4, 4)] {
            device.connect(1, connection, n, &[]);
        }

        let registry = device.service(1).registry();
        assert_eq!(registry.len(), 3);
        assert!(!registry.contains(C4));

        // C4 is unknown, its writes get no response
        device.write(1, C4, Attribute::ClientConfig(Characteristic::Lock), &NOTIFY);
        assert_eq!(device.transport.last_write(C4), None);
        assert_eq!(device.service(1).metrics().clients_rejected, 1);
    }
}
