//! # Advertising Flows
//!
//! RSI produced by a service instance as a peer would see it over the air.

#[cfg(test)]
mod tests {
    use crate::support::Device;
    use csis_server::{parse_sirk, CoordinatedSetApi, CsisConfig, Rsi, RsiCodec};
    use csis_types::{wire, SharingMode};

    const SIRK_HEX: &str = "457d7d0921a1fd22cecd8c86dd72cccd";

    fn device() -> Device {
        let config = CsisConfig::default()
            .with_sharing_mode(SharingMode::EncryptedOnly)
            .with_sirk_hex(SIRK_HEX);
        Device::new(&config, &[1]).unwrap()
    }

    /// Test: a set member resolves the advertised RSI from the AD structure
    #[tokio::test]
    async fn test_advertised_rsi_resolves() {
        let mut device = device();
        let ad = device.service(1).generate_rsi().to_ad_structure();

        assert_eq!(ad[0] as usize, wire::RSI_LEN + 1);
        assert_eq!(ad[1], wire::AD_TYPE_RSI);

        let mut payload = [0u8; wire::RSI_LEN];
        payload.copy_from_slice(&ad[2..]);
        let rsi = Rsi::from_advertising_bytes(payload);

        let codec = RsiCodec::new();
        assert!(codec.resolve(&rsi, &parse_sirk(SIRK_HEX).unwrap()));
        assert!(!codec.resolve(
            &rsi,
            &parse_sirk("00000000000000000000000000000001").unwrap()
        ));
    }

    /// Test: each call draws a fresh prand
    #[tokio::test]
    async fn test_rsi_rotates() {
        let mut device = device();
        let service = device.service(1);
        let first = service.generate_rsi();
        let second = service.generate_rsi();

        // 22 random bits: a collision here is vanishingly unlikely
        assert_ne!(first.prand_bytes(), second.prand_bytes());
    }

    /// Test: after a key change old advertisements stop resolving
    #[tokio::test]
    async fn test_rsi_follows_key_change() {
        let mut device = device();
        let old = device.service(1).generate_rsi();

        let new_sirk = parse_sirk("ffeeddccbbaa99887766554433221100").unwrap();
        device.service(1).set_sirk(new_sirk.clone()).unwrap();
        let fresh = device.service(1).generate_rsi();

        let codec = RsiCodec::new();
        assert!(codec.resolve(&fresh, &new_sirk));
        assert!(!codec.resolve(&old, &new_sirk));
    }
}
