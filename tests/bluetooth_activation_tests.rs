use audio_route_switch::audio::{AudioDevice, LinkRequest};
use audio_route_switch::selection::HeadsetState;
use audio_route_switch::system::{GatewayCall, HardwareEvent};
use std::time::Duration;

mod test_utils;
use test_utils::{EngineHarness, SettingsBuilder, car_kit};

const LINK_UP: GatewayCall = GatewayCall::EnableBluetoothLink(true);
const LINK_DOWN: GatewayCall = GatewayCall::EnableBluetoothLink(false);

fn earpiece() -> AudioDevice {
    AudioDevice::earpiece()
}

/// Activated with the car kit selected and its audio link confirmed
fn linked_call() -> EngineHarness {
    let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);
    harness.emit(HardwareEvent::BluetoothAudioConnected);
    assert_eq!(harness.engine.headset_state(), HeadsetState::AudioActivated);
    harness
}

/// Bringing the Bluetooth link up for a call
#[cfg(test)]
mod enable_link {
    use super::*;

    #[test]
    fn test_first_attempt_is_immediate() {
        let harness = EngineHarness::activated(vec![car_kit(), earpiece()]);

        assert_eq!(harness.gateway.count(LINK_UP), 1);
        assert_eq!(harness.gateway.count(GatewayCall::EnableSpeaker(false)), 1);
        assert_eq!(harness.engine.headset_state(), HeadsetState::AudioActivating);
        assert!(harness.engine.is_link_job_running(LinkRequest::Enable));
    }

    #[test]
    fn test_attempts_repeat_on_interval() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);

        harness.advance(Duration::from_millis(499));
        assert_eq!(harness.gateway.count(LINK_UP), 1);

        harness.advance(Duration::from_millis(1));
        assert_eq!(harness.gateway.count(LINK_UP), 2);

        harness.advance(Duration::from_millis(500));
        assert_eq!(harness.gateway.count(LINK_UP), 3);
    }

    #[test]
    fn test_link_confirmation_stops_retries() {
        let mut harness = linked_call();

        assert!(!harness.engine.is_link_job_running(LinkRequest::Enable));
        assert_eq!(harness.engine.next_job_deadline(), None);

        harness.advance(Duration::from_secs(10));
        assert_eq!(harness.gateway.count(LINK_UP), 1);
        assert_eq!(harness.selected(), Some(car_kit()));
    }

    #[test]
    fn test_no_attempt_while_only_started() {
        let harness = EngineHarness::started(vec![car_kit(), earpiece()]);

        assert_eq!(harness.selected(), Some(car_kit()));
        assert_eq!(harness.gateway.count(LINK_UP), 0);
        assert_eq!(harness.engine.next_job_deadline(), None);
    }

    #[test]
    fn test_headset_arriving_mid_call_is_linked() {
        let mut harness = EngineHarness::activated(vec![earpiece()]);

        harness.emit(HardwareEvent::DeviceConnected(car_kit()));

        assert_eq!(harness.selected(), Some(car_kit()));
        assert_eq!(harness.gateway.count(LINK_UP), 1);
    }

    #[test]
    fn test_headset_leaving_cancels_attempts() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);

        harness.emit(HardwareEvent::DeviceDisconnected(car_kit()));

        assert_eq!(harness.selected(), Some(earpiece()));
        assert_eq!(harness.engine.headset_state(), HeadsetState::Disconnected);
        assert_eq!(harness.engine.next_job_deadline(), None);
        harness.advance(Duration::from_secs(1));
        assert_eq!(harness.gateway.count(LINK_UP), 1);
    }
}

/// Giving up on a link that never comes up
#[cfg(test)]
mod activation_timeout {
    use super::*;

    #[test]
    fn test_timeout_after_exact_budget_falls_back() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);

        let elapsed = harness.run_jobs_to_completion();

        assert_eq!(elapsed, Duration::from_millis(5000));
        assert_eq!(harness.gateway.count(LINK_UP), 10);
        assert_eq!(
            harness.engine.headset_state(),
            HeadsetState::AudioActivationError
        );
        assert_eq!(
            harness.last_notification(),
            Some((vec![car_kit(), earpiece()], Some(earpiece())))
        );
    }

    #[test]
    fn test_timeout_fires_once() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);
        harness.run_jobs_to_completion();
        let count = harness.notification_count();

        harness.advance(Duration::from_secs(30));

        assert_eq!(harness.notification_count(), count);
        assert_eq!(harness.gateway.count(LINK_UP), 10);
    }

    #[test]
    fn test_configured_budget_is_used() {
        let settings = SettingsBuilder::new()
            .retry(Duration::from_millis(100), Duration::from_millis(1000))
            .build();
        let mut harness = EngineHarness::with_settings(vec![car_kit(), earpiece()], settings);
        harness.start();
        harness.engine.activate().unwrap();

        let elapsed = harness.run_jobs_to_completion();

        assert_eq!(elapsed, Duration::from_millis(1000));
        assert_eq!(harness.gateway.count(LINK_UP), 10);
    }

    #[test]
    fn test_timeout_clears_sticky_headset() {
        let mut harness = EngineHarness::activated(vec![earpiece(), car_kit()]);
        harness.engine.select_device(Some(car_kit()));

        harness.run_jobs_to_completion();

        assert_eq!(harness.engine.user_selected_device(), None);
        assert_eq!(harness.selected(), Some(earpiece()));
    }

    #[test]
    fn test_explicit_selection_retries_headset() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);
        harness.run_jobs_to_completion();

        harness.engine.select_device(Some(car_kit()));

        assert_eq!(harness.selected(), Some(car_kit()));
        assert_eq!(harness.engine.headset_state(), HeadsetState::AudioActivating);
        assert_eq!(harness.gateway.count(LINK_UP), 11);
    }

    #[test]
    fn test_reconnect_clears_activation_error() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);
        harness.run_jobs_to_completion();

        harness.emit(HardwareEvent::DeviceDisconnected(car_kit()));
        harness.emit(HardwareEvent::DeviceConnected(car_kit()));

        assert_eq!(harness.selected(), Some(car_kit()));
        assert!(harness.engine.is_link_job_running(LinkRequest::Enable));
    }

    #[test]
    fn test_late_link_up_restores_headset() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);
        harness.run_jobs_to_completion();
        assert_eq!(harness.selected(), Some(earpiece()));

        harness.emit(HardwareEvent::BluetoothAudioConnected);

        assert_eq!(harness.engine.headset_state(), HeadsetState::AudioActivated);
        assert_eq!(harness.selected(), Some(car_kit()));
        assert_eq!(harness.engine.next_job_deadline(), None);
        assert_eq!(harness.gateway.count(LINK_UP), 10);
        assert_eq!(harness.gateway.count(LINK_DOWN), 0);
    }
}

/// Releasing the link when audio moves elsewhere
#[cfg(test)]
mod disable_link {
    use super::*;

    #[test]
    fn test_switching_away_releases_link() {
        let mut harness = linked_call();

        harness.engine.select_device(Some(earpiece()));

        assert_eq!(harness.gateway.count(LINK_DOWN), 1);
        assert!(harness.engine.is_link_job_running(LinkRequest::Disable));

        harness.emit(HardwareEvent::BluetoothAudioDisconnected);

        assert!(!harness.engine.is_link_job_running(LinkRequest::Disable));
        assert_eq!(harness.engine.headset_state(), HeadsetState::Connected);
        harness.advance(Duration::from_secs(1));
        assert_eq!(harness.gateway.count(LINK_DOWN), 1);
    }

    #[test]
    fn test_disable_timeout_only_warns() {
        let mut harness = linked_call();
        harness.engine.select_device(Some(earpiece()));

        let elapsed = harness.run_jobs_to_completion();

        assert_eq!(elapsed, Duration::from_millis(5000));
        assert_eq!(harness.gateway.count(LINK_DOWN), 10);
        assert_eq!(harness.selected(), Some(earpiece()));
        assert_eq!(harness.engine.headset_state(), HeadsetState::Connected);
    }

    #[test]
    fn test_enable_cancels_pending_disable() {
        let mut harness = linked_call();
        harness.engine.select_device(Some(earpiece()));

        harness.engine.select_device(Some(car_kit()));

        assert!(harness.engine.is_link_job_running(LinkRequest::Enable));
        assert!(!harness.engine.is_link_job_running(LinkRequest::Disable));
        assert_eq!(harness.gateway.count(LINK_UP), 2);
    }

    #[test]
    fn test_deactivate_cancels_jobs_synchronously() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);

        harness.engine.deactivate();

        assert_eq!(harness.engine.next_job_deadline(), None);
        assert_eq!(harness.gateway.count(LINK_DOWN), 1);
        assert_eq!(harness.engine.headset_state(), HeadsetState::Connected);
        harness.advance(Duration::from_secs(10));
        assert_eq!(harness.gateway.count(LINK_UP), 1);
        assert_eq!(harness.gateway.count(LINK_DOWN), 1);
    }

    #[test]
    fn test_link_drop_during_call_is_reestablished() {
        let mut harness = linked_call();

        harness.emit(HardwareEvent::BluetoothAudioDisconnected);

        assert!(harness.engine.is_link_job_running(LinkRequest::Enable));
        assert_eq!(harness.gateway.count(LINK_UP), 2);
        assert_eq!(harness.selected(), Some(car_kit()));
    }

    #[test]
    fn test_link_outside_call_is_left_alone() {
        let mut harness = EngineHarness::started(vec![car_kit(), earpiece()]);

        harness.emit(HardwareEvent::BluetoothAudioConnected);
        harness.advance(Duration::from_millis(500));
        harness.advance(Duration::from_millis(500));

        assert_eq!(harness.engine.headset_state(), HeadsetState::AudioActivated);
        assert_eq!(harness.engine.next_job_deadline(), None);
        assert_eq!(harness.gateway.count(LINK_DOWN), 0);
        assert_eq!(harness.gateway.get_calls(), vec![GatewayCall::AddListener]);
    }

    #[test]
    fn test_link_up_outside_call_is_reused_on_activate() {
        let mut harness = EngineHarness::started(vec![car_kit(), earpiece()]);
        harness.emit(HardwareEvent::BluetoothAudioConnected);

        harness.engine.activate().unwrap();

        assert_eq!(harness.gateway.count(LINK_UP), 0);
        assert_eq!(harness.engine.next_job_deadline(), None);
        assert_eq!(harness.engine.headset_state(), HeadsetState::AudioActivated);
    }

    #[test]
    fn test_stray_link_during_call_is_released() {
        let mut harness = EngineHarness::activated(vec![car_kit(), earpiece()]);
        harness.engine.select_device(Some(earpiece()));
        assert_eq!(harness.gateway.count(LINK_DOWN), 1);

        harness.emit(HardwareEvent::BluetoothAudioConnected);

        assert_eq!(harness.selected(), Some(earpiece()));
        assert!(harness.engine.is_link_job_running(LinkRequest::Disable));
        assert_eq!(harness.gateway.count(LINK_DOWN), 2);
        assert_eq!(harness.engine.headset_state(), HeadsetState::Connected);
    }
}
