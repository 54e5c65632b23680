use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

use crate::audio::AudioDevice;
use crate::system::events::{HardwareEvent, HardwareEventSender};
use crate::system::traits::{Clock, FileSystemInterface, HardwareGateway};

/// One routing primitive invoked on the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayCall {
    AddListener,
    RemoveListener,
    EnableBluetoothLink(bool),
    EnableSpeaker(bool),
    SetFocus,
    Mute(bool),
    CacheState,
    RestoreState,
}

/// Mock hardware gateway for testing - provides controllable device behavior
#[derive(Clone)]
pub struct MockGateway {
    pub devices: Arc<Mutex<Vec<AudioDevice>>>,
    pub unreachable: Arc<Mutex<HashSet<AudioDevice>>>,
    pub has_earpiece: Arc<Mutex<bool>>,
    pub sink: Arc<Mutex<Option<HardwareEventSender>>>,
    pub calls: Arc<Mutex<Vec<GatewayCall>>>,
    pub should_fail_registration: Arc<Mutex<bool>>,
    pub should_fail_enumeration: Arc<Mutex<bool>>,
    pub should_fail_routing: Arc<Mutex<bool>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(Mutex::new(Vec::new())),
            unreachable: Arc::new(Mutex::new(HashSet::new())),
            has_earpiece: Arc::new(Mutex::new(true)),
            sink: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            should_fail_registration: Arc::new(Mutex::new(false)),
            should_fail_enumeration: Arc::new(Mutex::new(false)),
            should_fail_routing: Arc::new(Mutex::new(false)),
        }
    }

    /// Mock seeded with the devices enumeration should report
    pub fn with_devices(devices: Vec<AudioDevice>) -> Self {
        let gateway = Self::new();
        *gateway.devices.lock().unwrap() = devices;
        gateway
    }

    /// Send a hardware event to whoever registered as listener
    pub fn emit(&self, event: HardwareEvent) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    pub fn has_listener(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    pub fn set_reachable(&self, device: &AudioDevice, reachable: bool) {
        let mut unreachable = self.unreachable.lock().unwrap();
        if reachable {
            unreachable.remove(device);
        } else {
            unreachable.insert(device.clone());
        }
    }

    pub fn set_has_earpiece(&self, has_earpiece: bool) {
        *self.has_earpiece.lock().unwrap() = has_earpiece;
    }

    /// Get all gateway calls that were made
    pub fn get_calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times `call` was made
    pub fn count(&self, call: GatewayCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    /// Last routing call of any kind
    pub fn last_call(&self) -> Option<GatewayCall> {
        self.calls.lock().unwrap().last().copied()
    }

    /// Clear the call history
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Configure the mock to fail listener registration
    pub fn set_registration_failure(&self, should_fail: bool) {
        *self.should_fail_registration.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail enumeration
    pub fn set_enumeration_failure(&self, should_fail: bool) {
        *self.should_fail_enumeration.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail every routing primitive
    pub fn set_routing_failure(&self, should_fail: bool) {
        *self.should_fail_routing.lock().unwrap() = should_fail;
    }

    fn record(&self, call: GatewayCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if *self.should_fail_routing.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock routing failure: {:?}", call));
        }
        Ok(())
    }
}

impl HardwareGateway for MockGateway {
    fn add_device_listener(&self, events: HardwareEventSender) -> Result<()> {
        if *self.should_fail_registration.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock registration failure"));
        }
        self.calls.lock().unwrap().push(GatewayCall::AddListener);
        *self.sink.lock().unwrap() = Some(events);
        Ok(())
    }

    fn remove_device_listener(&self) -> Result<()> {
        self.calls.lock().unwrap().push(GatewayCall::RemoveListener);
        *self.sink.lock().unwrap() = None;
        Ok(())
    }

    fn enumerate_devices(&self) -> Result<Vec<AudioDevice>> {
        if *self.should_fail_enumeration.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock enumeration failure"));
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    fn is_reachable(&self, device: &AudioDevice) -> bool {
        !self.unreachable.lock().unwrap().contains(device)
    }

    fn has_earpiece(&self) -> bool {
        *self.has_earpiece.lock().unwrap()
    }

    fn enable_bluetooth_link(&self, enable: bool) -> Result<()> {
        self.record(GatewayCall::EnableBluetoothLink(enable))
    }

    fn enable_speaker(&self, enable: bool) -> Result<()> {
        self.record(GatewayCall::EnableSpeaker(enable))
    }

    fn set_focus(&self) -> Result<()> {
        self.record(GatewayCall::SetFocus)
    }

    fn mute(&self, mute: bool) -> Result<()> {
        self.record(GatewayCall::Mute(mute))
    }

    fn cache_state(&self) -> Result<()> {
        self.record(GatewayCall::CacheState)
    }

    fn restore_state(&self) -> Result<()> {
        self.record(GatewayCall::RestoreState)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock file system for testing - provides controllable file operations
#[derive(Clone)]
pub struct MockFileSystem {
    pub files: Arc<Mutex<HashMap<PathBuf, String>>>,
    pub modification_times: Arc<Mutex<HashMap<PathBuf, SystemTime>>>,
    pub read_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub write_calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub directory_creation_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub should_fail_read: Arc<Mutex<bool>>,
    pub should_fail_write: Arc<Mutex<bool>>,
    pub should_fail_create_dir: Arc<Mutex<bool>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            modification_times: Arc::new(Mutex::new(HashMap::new())),
            read_calls: Arc::new(Mutex::new(Vec::new())),
            write_calls: Arc::new(Mutex::new(Vec::new())),
            directory_creation_calls: Arc::new(Mutex::new(Vec::new())),
            should_fail_read: Arc::new(Mutex::new(false)),
            should_fail_write: Arc::new(Mutex::new(false)),
            should_fail_create_dir: Arc::new(Mutex::new(false)),
        }
    }

    /// Add a file to the mock file system
    pub fn add_file<P: AsRef<Path>>(&self, path: P, content: String) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content);
    }

    /// Pin the modification time reported for `path`
    pub fn set_modified_time<P: AsRef<Path>>(&self, path: P, time: SystemTime) {
        self.modification_times
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), time);
    }

    /// Get all read calls that were made
    pub fn get_read_calls(&self) -> Vec<PathBuf> {
        self.read_calls.lock().unwrap().clone()
    }

    /// Get all write calls that were made
    pub fn get_write_calls(&self) -> Vec<(PathBuf, String)> {
        self.write_calls.lock().unwrap().clone()
    }

    /// Get all directory creation calls that were made
    pub fn get_directory_creation_calls(&self) -> Vec<PathBuf> {
        self.directory_creation_calls.lock().unwrap().clone()
    }

    /// Configure the mock to fail read operations
    pub fn set_read_failure(&self, should_fail: bool) {
        *self.should_fail_read.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail write operations
    pub fn set_write_failure(&self, should_fail: bool) {
        *self.should_fail_write.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail directory creation
    pub fn set_create_dir_failure(&self, should_fail: bool) {
        *self.should_fail_create_dir.lock().unwrap() = should_fail;
    }

    /// Check if a file exists in the mock system
    pub fn file_exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.lock().unwrap().contains_key(path.as_ref())
    }
}

impl FileSystemInterface for MockFileSystem {
    fn read_config_file(&self, path: &Path) -> Result<String> {
        self.read_calls.lock().unwrap().push(path.to_path_buf());

        if *self.should_fail_read.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock read failure"));
        }

        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }

    fn write_config_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), content.to_string()));

        if *self.should_fail_write.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock write failure"));
        }

        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn config_file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_config_dir(&self, path: &Path) -> Result<()> {
        self.directory_creation_calls
            .lock()
            .unwrap()
            .push(path.to_path_buf());

        if *self.should_fail_create_dir.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock create directory failure"));
        }

        Ok(())
    }

    fn get_config_modified_time(&self, path: &Path) -> Result<SystemTime> {
        if !self.config_file_exists(path) {
            return Err(anyhow::anyhow!("File not found: {}", path.display()));
        }
        let pinned = self.modification_times.lock().unwrap().get(path).copied();
        Ok(pinned.unwrap_or(SystemTime::UNIX_EPOCH + Duration::from_secs(1000)))
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}
