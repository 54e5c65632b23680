use std::fmt;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::activation::{ActivationRetryJob, JobOutcome, RetryAction, RetrySettings};
use crate::audio::{AudioDevice, DeviceCatalog, DeviceKind, LinkRequest};
use crate::config::Config;
use crate::error::{RouteError, RouteResult};
use crate::priority::PriorityOrder;
use crate::selection::headset::{HeadsetState, HeadsetTracker};
use crate::system::{Clock, HardwareEvent, HardwareEventSender, HardwareGateway, SystemClock};

/// Receives the priority-ordered device list and the selected device whenever the
/// selection changes. Called synchronously on the engine's task.
pub type DeviceChangeListener = Box<dyn FnMut(&[AudioDevice], Option<&AudioDevice>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Started,
    Activated,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Started => write!(f, "started"),
            EngineState::Activated => write!(f, "activated"),
        }
    }
}

/// Construction parameters for [`SelectionEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub preferred_order: Vec<DeviceKind>,
    pub manage_audio_focus: bool,
    pub retry: RetrySettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            preferred_order: Vec::new(),
            manage_audio_focus: true,
            retry: RetrySettings::default(),
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            preferred_order: config.routing.preferred_device_order.clone(),
            manage_audio_focus: config.routing.manage_audio_focus,
            retry: config.retry_settings(),
        }
    }
}

/// Decides which audio device a call uses and drives the hardware to route it there.
///
/// The engine is owned by a single task. Gateway callbacks come in through the
/// [`HardwareEvent`] channel handed to [`HardwareGateway::add_device_listener`] and are
/// applied with [`SelectionEngine::handle_event`]. Bluetooth link retries are deadlines
/// the owner waits for ([`SelectionEngine::next_job_deadline`]) before calling
/// [`SelectionEngine::run_due_jobs`].
pub struct SelectionEngine<G: HardwareGateway, C: Clock = SystemClock> {
    gateway: G,
    clock: C,
    events: HardwareEventSender,
    order: PriorityOrder,
    manage_audio_focus: bool,
    state: EngineState,
    catalog: DeviceCatalog,
    selected: Option<AudioDevice>,
    user_selected: Option<AudioDevice>,
    headset: HeadsetTracker,
    enable_link_job: ActivationRetryJob,
    disable_link_job: ActivationRetryJob,
    listener: Option<DeviceChangeListener>,
}

impl<G: HardwareGateway> SelectionEngine<G> {
    pub fn new(
        gateway: G,
        events: HardwareEventSender,
        settings: &EngineSettings,
    ) -> RouteResult<Self> {
        Self::with_clock(gateway, SystemClock, events, settings)
    }
}

impl<G: HardwareGateway, C: Clock> SelectionEngine<G, C> {
    /// Fails with [`RouteError::InvalidConfiguration`] when the preferred order repeats a kind.
    pub fn with_clock(
        gateway: G,
        clock: C,
        events: HardwareEventSender,
        settings: &EngineSettings,
    ) -> RouteResult<Self> {
        let order = PriorityOrder::new(&settings.preferred_order)?;
        info!("Selection engine created with device order {}", order);

        Ok(Self {
            gateway,
            clock,
            events,
            order,
            manage_audio_focus: settings.manage_audio_focus,
            state: EngineState::Stopped,
            catalog: DeviceCatalog::new(),
            selected: None,
            user_selected: None,
            headset: HeadsetTracker::new(),
            enable_link_job: ActivationRetryJob::new(LinkRequest::Enable, settings.retry),
            disable_link_job: ActivationRetryJob::new(LinkRequest::Disable, settings.retry),
            listener: None,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn selected_device(&self) -> Option<&AudioDevice> {
        self.selected.as_ref()
    }

    pub fn user_selected_device(&self) -> Option<&AudioDevice> {
        self.user_selected.as_ref()
    }

    /// Devices in priority order
    pub fn available_devices(&self) -> Vec<AudioDevice> {
        self.catalog.snapshot(&self.order)
    }

    pub fn headset_state(&self) -> HeadsetState {
        self.headset.state()
    }

    pub fn preferred_order(&self) -> &PriorityOrder {
        &self.order
    }

    pub fn is_link_job_running(&self, direction: LinkRequest) -> bool {
        match direction {
            LinkRequest::Enable => self.enable_link_job.is_running(),
            LinkRequest::Disable => self.disable_link_job.is_running(),
        }
    }

    /// Earliest instant at which [`SelectionEngine::run_due_jobs`] has work to do
    pub fn next_job_deadline(&self) -> Option<Instant> {
        match (
            self.enable_link_job.next_deadline(),
            self.disable_link_job.next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Register with the gateway, load the current devices and report the initial selection.
    pub fn start(&mut self, listener: DeviceChangeListener) -> RouteResult<()> {
        if self.state != EngineState::Stopped {
            debug!("start() ignored, engine already {}", self.state);
            return Ok(());
        }

        self.gateway.add_device_listener(self.events.clone())?;
        let devices = match self.gateway.enumerate_devices() {
            Ok(devices) => devices,
            Err(e) => {
                log_gateway_failure("remove device listener", self.gateway.remove_device_listener());
                return Err(RouteError::Gateway(e));
            }
        };

        self.listener = Some(listener);
        self.state = EngineState::Started;
        for device in devices {
            self.insert_device(device);
        }
        self.selected = self.best_device();

        info!(
            "Selection engine started with {} device(s), selected {}",
            self.catalog.len(),
            describe(self.selected.as_ref())
        );
        self.notify();
        Ok(())
    }

    /// Take over the audio session and route it to the selected device.
    pub fn activate(&mut self) -> RouteResult<()> {
        match self.state {
            EngineState::Stopped => Err(RouteError::IllegalState {
                operation: "activate",
                state: self.state,
            }),
            EngineState::Started => {
                log_gateway_failure("cache audio state", self.gateway.cache_state());
                log_gateway_failure("unmute", self.gateway.mute(false));
                if self.manage_audio_focus {
                    log_gateway_failure("acquire audio focus", self.gateway.set_focus());
                }
                self.state = EngineState::Activated;
                info!("Audio session activated");
                self.activate_selected();
                Ok(())
            }
            EngineState::Activated => {
                debug!("activate() while activated, re-running device activation");
                self.activate_selected();
                Ok(())
            }
        }
    }

    /// Release the route and put the cached audio state back.
    pub fn deactivate(&mut self) {
        if self.state != EngineState::Activated {
            debug!("deactivate() ignored, engine {}", self.state);
            return;
        }

        self.cancel_link_jobs();
        log_gateway_failure(
            "disable Bluetooth link",
            self.gateway.enable_bluetooth_link(false),
        );
        if matches!(
            self.headset.state(),
            HeadsetState::AudioActivating | HeadsetState::AudioActivated
        ) {
            self.headset.set_state(HeadsetState::Connected);
        }
        log_gateway_failure("restore audio state", self.gateway.restore_state());
        self.state = EngineState::Started;
        info!("Audio session deactivated");
    }

    pub fn stop(&mut self) {
        match self.state {
            EngineState::Stopped => {
                debug!("stop() ignored, engine already stopped");
                return;
            }
            EngineState::Activated => self.deactivate(),
            EngineState::Started => {}
        }

        self.cancel_link_jobs();
        log_gateway_failure("remove device listener", self.gateway.remove_device_listener());
        self.listener = None;
        self.catalog.clear();
        self.selected = None;
        self.user_selected = None;
        self.headset.reset();
        self.state = EngineState::Stopped;
        info!("Selection engine stopped");
    }

    /// Pin `device` as the sticky choice. `None`, or a device that is not available,
    /// returns to automatic selection.
    pub fn select_device(&mut self, device: Option<AudioDevice>) {
        match device {
            Some(device) if self.catalog.contains(&device) => {
                info!("User selected {}", device);
                if device.is_kind(DeviceKind::BluetoothHeadset) && self.headset.has_activation_error() {
                    self.headset.set_state(HeadsetState::Connected);
                }
                self.user_selected = Some(device);
            }
            Some(device) => {
                warn!("Cannot select unavailable device {}, using automatic selection", device);
                self.user_selected = None;
            }
            None => {
                info!("User selection cleared");
                self.user_selected = None;
            }
        }
        self.reselect();
    }

    /// Swap the priority order at runtime.
    pub fn set_preferred_order(&mut self, preferred: &[DeviceKind]) -> RouteResult<()> {
        let order = PriorityOrder::new(preferred)?;
        if order == self.order {
            debug!("Preferred order unchanged: {}", order);
            return Ok(());
        }

        info!("Preferred device order changed: {} -> {}", self.order, order);
        self.order = order;
        if self.state != EngineState::Stopped {
            self.reselect();
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: HardwareEvent) {
        match event {
            HardwareEvent::DeviceConnected(device) => self.on_device_connected(device),
            HardwareEvent::DeviceDisconnected(device) => self.on_device_disconnected(device),
            HardwareEvent::KindUnavailable(kind) => self.on_kind_unavailable(kind),
            HardwareEvent::BluetoothAudioConnected => self.on_bluetooth_audio_connected(),
            HardwareEvent::BluetoothAudioDisconnected => self.on_bluetooth_audio_disconnected(),
        }
    }

    pub fn on_device_connected(&mut self, device: AudioDevice) {
        if self.state == EngineState::Stopped {
            debug!("Ignoring connect of {} while stopped", device);
            return;
        }

        info!("Device connected: {}", device);
        if !self.insert_device(device) {
            debug!("Catalog unchanged by connect");
        }
        self.reselect();
    }

    pub fn on_device_disconnected(&mut self, device: AudioDevice) {
        if self.state == EngineState::Stopped {
            debug!("Ignoring disconnect of {} while stopped", device);
            return;
        }

        let device = if self.catalog.contains(&device) {
            device
        } else {
            self.headset.resolve(device)
        };
        info!("Device disconnected: {}", device);
        if self.catalog.remove(&device) {
            match device.kind {
                DeviceKind::WiredHeadset => self.restore_earpiece(),
                DeviceKind::BluetoothHeadset => {
                    self.headset.forget(&device);
                    self.bluetooth_gone_if_last();
                }
                _ => {}
            }
        } else {
            debug!("{} was not in the catalog", device);
        }

        if self.user_selected.as_ref() == Some(&device) {
            info!("User selected device {} went away", device);
            self.user_selected = None;
        }
        self.reselect();
    }

    /// Every device of `kind` went away at once.
    pub fn on_kind_unavailable(&mut self, kind: DeviceKind) {
        if self.state == EngineState::Stopped {
            debug!("Ignoring loss of {} while stopped", kind);
            return;
        }

        info!("All {} devices unavailable", kind);
        self.catalog.remove_all_of_kind(kind);
        match kind {
            DeviceKind::WiredHeadset => self.restore_earpiece(),
            DeviceKind::BluetoothHeadset => {
                self.headset.evict();
                self.bluetooth_gone_if_last();
            }
            _ => {}
        }

        if self.user_selected.as_ref().is_some_and(|d| d.is_kind(kind)) {
            self.user_selected = None;
        }
        self.reselect();
    }

    /// The Bluetooth audio link came up.
    pub fn on_bluetooth_audio_connected(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }

        self.enable_link_job.cancel();
        self.headset.set_state(HeadsetState::AudioActivated);
        self.reselect();

        if self.state != EngineState::Activated {
            info!("Bluetooth audio link up outside a call, leaving it alone");
        } else if self.bluetooth_route_active() {
            info!("Bluetooth audio link established");
        } else if !self.disable_link_job.is_running() {
            info!("Bluetooth audio link came up with no headset route in use, releasing it");
            self.start_link_job(LinkRequest::Disable);
        }
    }

    /// The Bluetooth audio link dropped.
    pub fn on_bluetooth_audio_disconnected(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }

        let was_active = self.headset.state() == HeadsetState::AudioActivated;
        self.disable_link_job.cancel();
        if self.catalog.contains_kind(DeviceKind::BluetoothHeadset) {
            self.headset.set_state(HeadsetState::Connected);
        } else {
            self.headset.set_state(HeadsetState::Disconnected);
        }

        if was_active && self.bluetooth_route_active() {
            warn!("Bluetooth audio link dropped while in use, re-establishing");
            self.start_link_job(LinkRequest::Enable);
        } else {
            info!("Bluetooth audio link released");
        }
    }

    /// Run every retry attempt whose deadline has passed.
    pub fn run_due_jobs(&mut self) {
        let now = self.clock.now();
        let disable = self.poll_link_job(LinkRequest::Disable, now);
        let enable = self.poll_link_job(LinkRequest::Enable, now);

        if disable == JobOutcome::TimedOut {
            warn!("Bluetooth link did not confirm release in time");
        }
        if enable == JobOutcome::TimedOut {
            self.on_bluetooth_activation_failed();
        }
    }

    fn on_bluetooth_activation_failed(&mut self) {
        warn!("Bluetooth audio link could not be established, falling back");
        if self
            .user_selected
            .as_ref()
            .is_some_and(|d| d.is_kind(DeviceKind::BluetoothHeadset))
        {
            self.user_selected = None;
        }
        self.reselect();
    }

    /// Adds to the catalog, applying the wired-over-earpiece rule. Returns true on change.
    fn insert_device(&mut self, device: AudioDevice) -> bool {
        match device.kind {
            DeviceKind::Earpiece if self.catalog.contains_kind(DeviceKind::WiredHeadset) => {
                debug!("Ignoring earpiece while a wired headset is plugged in");
                false
            }
            DeviceKind::WiredHeadset => {
                let added = self.catalog.add(device);
                let replaced = self.catalog.remove_all_of_kind(DeviceKind::Earpiece);
                added || replaced
            }
            DeviceKind::BluetoothHeadset => {
                let device = self.headset.resolve(device);
                self.headset.headset_connected(&device);
                self.catalog.add(device)
            }
            DeviceKind::Earpiece | DeviceKind::Speakerphone => self.catalog.add(device),
        }
    }

    fn restore_earpiece(&mut self) {
        if !self.catalog.contains_kind(DeviceKind::WiredHeadset) && self.gateway.has_earpiece() {
            debug!("Wired headset removed, restoring earpiece");
            self.catalog.add(AudioDevice::earpiece());
        }
    }

    fn bluetooth_gone_if_last(&mut self) {
        if self.catalog.contains_kind(DeviceKind::BluetoothHeadset) {
            return;
        }
        self.cancel_link_jobs();
        self.headset.set_state(HeadsetState::Disconnected);
    }

    fn bluetooth_route_active(&self) -> bool {
        self.state == EngineState::Activated
            && self
                .selected
                .as_ref()
                .is_some_and(|d| d.is_kind(DeviceKind::BluetoothHeadset))
    }

    fn best_device(&self) -> Option<AudioDevice> {
        if let Some(device) = &self.user_selected {
            if self.catalog.contains(device) {
                return Some(device.clone());
            }
        }

        let skip_bluetooth = self.headset.has_activation_error();
        self.catalog
            .snapshot(&self.order)
            .into_iter()
            .filter(|d| !(skip_bluetooth && d.is_kind(DeviceKind::BluetoothHeadset)))
            .find(|d| self.gateway.is_reachable(d))
    }

    /// Recompute the selection, activating and notifying on change.
    fn reselect(&mut self) -> bool {
        let best = self.best_device();
        if best == self.selected {
            debug!("Selection unchanged: {}", describe(best.as_ref()));
            return false;
        }

        info!(
            "Selected device changed: {} -> {}",
            describe(self.selected.as_ref()),
            describe(best.as_ref())
        );
        self.selected = best;
        if self.state == EngineState::Activated {
            self.activate_selected();
        }
        self.notify();
        true
    }

    fn activate_selected(&mut self) {
        let Some(device) = self.selected.clone() else {
            debug!("No device to activate");
            self.release_bluetooth_link();
            return;
        };

        info!("Activating {}", device);
        let plan = device.kind.route_plan();
        log_gateway_failure(
            "switch speaker",
            self.gateway.enable_speaker(plan.speaker_enabled),
        );
        match plan.bluetooth_link {
            LinkRequest::Enable => self.request_bluetooth_link(),
            LinkRequest::Disable => self.release_bluetooth_link(),
        }
    }

    fn request_bluetooth_link(&mut self) {
        match self.headset.state() {
            HeadsetState::AudioActivated => {
                self.disable_link_job.cancel();
                debug!("Bluetooth audio link already up");
            }
            HeadsetState::Disconnected => {
                warn!("Cannot enable Bluetooth audio link, no headset connected");
            }
            _ => self.start_link_job(LinkRequest::Enable),
        }
    }

    fn release_bluetooth_link(&mut self) {
        self.enable_link_job.cancel();
        match self.headset.state() {
            HeadsetState::AudioActivated => self.start_link_job(LinkRequest::Disable),
            HeadsetState::AudioActivating => {
                log_gateway_failure(
                    "disable Bluetooth link",
                    self.gateway.enable_bluetooth_link(false),
                );
                self.headset.set_state(HeadsetState::Connected);
            }
            _ => {}
        }
    }

    /// Start a job, cancelling the opposite direction, and make its first attempt now.
    fn start_link_job(&mut self, direction: LinkRequest) {
        let now = self.clock.now();
        match direction {
            LinkRequest::Enable => {
                self.disable_link_job.cancel();
                self.enable_link_job.execute(now);
            }
            LinkRequest::Disable => {
                self.enable_link_job.cancel();
                self.disable_link_job.execute(now);
            }
        }
        self.poll_link_job(direction, now);
    }

    fn poll_link_job(&mut self, direction: LinkRequest, now: Instant) -> JobOutcome {
        let job = match direction {
            LinkRequest::Enable => &mut self.enable_link_job,
            LinkRequest::Disable => &mut self.disable_link_job,
        };
        let mut attempt = LinkAttempt {
            gateway: &self.gateway,
            headset: &mut self.headset,
            direction,
        };
        job.poll(now, &mut attempt)
    }

    fn cancel_link_jobs(&mut self) {
        self.enable_link_job.cancel();
        self.disable_link_job.cancel();
    }

    fn notify(&mut self) {
        let devices = self.catalog.snapshot(&self.order);
        if let Some(listener) = self.listener.as_mut() {
            listener(&devices, self.selected.as_ref());
        }
    }
}

/// One tick of a Bluetooth link job.
struct LinkAttempt<'a, G: HardwareGateway> {
    gateway: &'a G,
    headset: &'a mut HeadsetTracker,
    direction: LinkRequest,
}

impl<G: HardwareGateway> RetryAction for LinkAttempt<'_, G> {
    fn attempt(&mut self) {
        match self.direction {
            LinkRequest::Enable => {
                log_gateway_failure(
                    "enable Bluetooth link",
                    self.gateway.enable_bluetooth_link(true),
                );
                self.headset.set_state(HeadsetState::AudioActivating);
            }
            LinkRequest::Disable => {
                log_gateway_failure(
                    "disable Bluetooth link",
                    self.gateway.enable_bluetooth_link(false),
                );
                self.headset.set_state(HeadsetState::Connected);
            }
        }
    }

    fn timed_out(&mut self) {
        match self.direction {
            LinkRequest::Enable => {
                self.headset.set_state(HeadsetState::AudioActivationError);
                if let Some(headset) = self.headset.evict() {
                    debug!("Evicted {} from the headset cache", headset);
                }
            }
            LinkRequest::Disable => self.headset.set_state(HeadsetState::Connected),
        }
    }
}

fn log_gateway_failure(operation: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        error!("Failed to {}: {:#}", operation, e);
    }
}

fn describe(device: Option<&AudioDevice>) -> String {
    device.map_or_else(|| "none".to_string(), |d| d.to_string())
}
