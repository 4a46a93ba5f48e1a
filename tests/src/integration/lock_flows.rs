//! # Lock Flows
//!
//! Set member lock arbitration across clients and service instances, with the
//! real tokio lease timer on a paused clock.

#[cfg(test)]
mod tests {
    use crate::support::Device;
    use csis_bus::{CsisEvent, EventFilter, EventTopic};
    use csis_server::{CoordinatedSetApi, CsisConfig};
    use csis_types::{AttStatus, Characteristic, ConnectionId, LockValue, ServiceHandle, SharingMode};
    use std::time::Duration;

    const C1: ConnectionId = ConnectionId(0x40);
    const C2: ConnectionId = ConnectionId(0x41);
    const C3: ConnectionId = ConnectionId(0x42);

    fn config() -> CsisConfig {
        CsisConfig::default()
            .with_sharing_mode(SharingMode::PlaintextOnly)
            .with_lock_timeout(60)
    }

    /// Test: one holder at a time, release hands the lock on
    #[tokio::test(start_paused = true)]
    async fn test_two_clients_contend() {
        let mut device = Device::new(&config(), &[1]).unwrap();
        device.connect(1, C1, 1, &[Characteristic::Lock]);
        device.connect(1, C2, 2, &[Characteristic::Lock]);
        device.transport.take();

        assert_eq!(device.write_lock(1, C1, 1), Some(AttStatus::Success));
        assert_eq!(device.write_lock(1, C2, 1), Some(AttStatus::LockDenied));
        assert_eq!(device.write_lock(1, C2, 0), Some(AttStatus::LockReleaseNotAllowed));
        assert_eq!(device.write_lock(1, C1, 0), Some(AttStatus::Success));
        assert_eq!(device.write_lock(1, C2, 1), Some(AttStatus::Success));

        // C2 saw C1 lock then unlock, C1 saw C2 lock
        assert_eq!(
            device.transport.notifications_to(C2, Characteristic::Lock),
            vec![vec![1], vec![0]]
        );
        assert_eq!(
            device.transport.notifications_to(C1, Characteristic::Lock),
            vec![vec![1]]
        );
    }

    /// Test: the lock is device-wide across instances
    #[tokio::test(start_paused = true)]
    async fn test_lock_spans_instances() {
        let mut device = Device::new(&config(), &[1, 2]).unwrap();
        device.connect(1, C1, 1, &[]);
        device.connect(2, C2, 2, &[]);

        assert_eq!(device.write_lock(1, C1, 1), Some(AttStatus::Success));
        assert_eq!(device.write_lock(2, C2, 1), Some(AttStatus::LockDenied));

        let state = device.service(2).lock_state();
        assert_eq!(state.value, LockValue::Locked);
        assert_eq!(state.owner_service, ServiceHandle(1));
        assert_eq!(state.owner_connection, C1);
    }

    /// Test: an abandoned lock lapses after the lease and everyone is told
    #[tokio::test(start_paused = true)]
    async fn test_lease_expiry_releases_lock() {
        let mut device = Device::new(&config(), &[1]).unwrap();
        let mut events = device.bus.subscribe(EventFilter::topics(vec![EventTopic::Lock]));
        device.connect(1, C1, 1, &[Characteristic::Lock]);
        device.connect(1, C2, 2, &[Characteristic::Lock]);
        device.write_lock(1, C1, 1);
        device.transport.take();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(device.runtime.drain(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(device.runtime.drain(), 1);

        assert_eq!(device.service(1).lock_state().value, LockValue::Unlocked);
        assert_eq!(
            device.transport.notifications_to(C1, Characteristic::Lock),
            vec![vec![0]]
        );
        assert_eq!(
            device.transport.notifications_to(C2, Characteristic::Lock),
            vec![vec![0]]
        );

        let mut received = Vec::new();
        while let Ok(Some(event)) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(
            received.last(),
            Some(&CsisEvent::LockReleased {
                service: ServiceHandle(1),
                previous_owner: C1,
            })
        );
    }

    /// Test: a release just before the deadline leaves no expiry behind
    #[tokio::test(start_paused = true)]
    async fn test_release_before_deadline() {
        let mut device = Device::new(&config(), &[1]).unwrap();
        device.connect(1, C1, 1, &[]);
        device.connect(1, C2, 2, &[Characteristic::Lock]);
        device.write_lock(1, C1, 1);

        tokio::time::sleep(Duration::from_secs(59)).await;
        device.write_lock(1, C1, 0);
        device.write_lock(1, C2, 1);
        device.transport.take();

        // Past C1's original deadline: C2's fresh lease still holds
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(device.runtime.drain(), 0);
        assert_eq!(device.service(1).lock_state().owner_connection, C2);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(device.runtime.drain(), 1);
        assert_eq!(device.service(1).lock_state().value, LockValue::Unlocked);
    }

    /// Test: the holder reconnecting keeps the lock silently
    #[tokio::test(start_paused = true)]
    async fn test_holder_reconnects() {
        let mut device = Device::new(&config(), &[1]).unwrap();
        device.connect(1, C1, 1, &[]);
        device.connect(1, C2, 2, &[Characteristic::Lock]);
        device.write_lock(1, C1, 1);
        device.disconnect(1, C1);
        device.transport.take();

        // Same bonded peer, new link
        device.connect(1, C3, 1, &[]);
        assert_eq!(device.write_lock(1, C3, 1), Some(AttStatus::LockAlreadyGranted));
        assert_eq!(device.transport.notification_count(Characteristic::Lock), 0);
        assert_eq!(device.service(1).lock_state().owner_connection, C3);

        // The original lease still governs
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(device.runtime.drain(), 1);
        assert_eq!(device.service(1).lock_state().value, LockValue::Unlocked);
    }

    /// Test: a peer that cannot be identified is only matched by connection
    #[tokio::test(start_paused = true)]
    async fn test_unidentified_peer_loses_lock_on_reconnect() {
        let mut device = Device::new(&config(), &[1]).unwrap();
        device.connect(1, C1, 1, &[]);
        device.write_lock(1, C1, 1);
        device.disconnect(1, C1);

        // New connection, no resolvable identity
        device.runtime.dispatch(csis_server::ServiceEvent::ClientConnected {
            service: ServiceHandle(1),
            connection: C2,
        });
        assert_eq!(device.write_lock(1, C2, 1), Some(AttStatus::LockDenied));
    }

    /// Test: application lock overrides remote state and notifies
    #[tokio::test(start_paused = true)]
    async fn test_application_lock() {
        let mut device = Device::new(&config(), &[1]).unwrap();
        device.connect(1, C1, 1, &[Characteristic::Lock]);
        device.transport.take();

        device.service(1).set_lock(LockValue::Locked, 5);
        assert_eq!(
            device.transport.notifications_to(C1, Characteristic::Lock),
            vec![vec![1]]
        );
        assert_eq!(device.write_lock(1, C1, 1), Some(AttStatus::LockDenied));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(device.runtime.drain(), 1);
        assert_eq!(device.service(1).lock_state().value, LockValue::Unlocked);
        assert_eq!(device.write_lock(1, C1, 1), Some(AttStatus::Success));
    }

    /// Test: lock transitions reach the application bus
    #[tokio::test(start_paused = true)]
    async fn test_lock_events_published() {
        let mut device = Device::new(&config(), &[1]).unwrap();
        let mut events = device.bus.subscribe(EventFilter::topics(vec![EventTopic::Lock]));
        device.connect(1, C1, 1, &[]);

        device.write_lock(1, C1, 1);
        device.write_lock(1, C1, 0);

        assert_eq!(
            events.try_recv().unwrap(),
            Some(CsisEvent::LockStateChanged {
                service: ServiceHandle(1),
                connection: C1,
                value: LockValue::Locked,
            })
        );
        assert_eq!(
            events.try_recv().unwrap(),
            Some(CsisEvent::LockStateChanged {
                service: ServiceHandle(1),
                connection: C1,
                value: LockValue::Unlocked,
            })
        );
    }
}
