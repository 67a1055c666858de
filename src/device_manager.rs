//! Session object tying the radio driver to the device registry.
//!
//! Every inbound [`RadioEvent`] is applied under one lock: registry,
//! connection state machines and GATT trees are only ever mutated there.
//! Follow-up driver commands and caller notifications are collected while the
//! lock is held and released after it is dropped.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::ble::adapter::AdapterDriver;
use crate::ble::advertising::{encode_payload, BeaconRanger, ScanDetection};
use crate::ble::driver::{BroadcastRequest, Command, RadioDriver, RadioEvent};
use crate::config::{ManagerConfig, ScanConfiguration};
use crate::data::{CharacteristicProperties, Device, ProfileType};
use crate::error::Result;
use crate::events::{CallbackHandle, DeviceEvent};
use crate::gatt::{DeviceRegistry, RegistryChange, ServiceTreeBuilder, Upsert};

/// Why a caller request was not passed to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No device with this identifier is registered.
    UnknownDevice {
        /// Requested identifier.
        id: String,
    },
    /// The device has no known address.
    NoAddress {
        /// Device key.
        id: String,
    },
    /// The device is not connected.
    NotConnected {
        /// Device key.
        id: String,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDevice { id } => write!(f, "Unknown device: {}", id),
            Self::NoAddress { id } => write!(f, "Device {} has no address", id),
            Self::NotConnected { id } => write!(f, "Device {} is not connected", id),
        }
    }
}

/// Outcome of a caller request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// The command was handed to the driver.
    Issued,
    /// Nothing to do (already in the requested state).
    Ignored,
    /// The request was invalid and nothing was sent.
    Rejected(Rejection),
}

impl CommandStatus {
    /// Check if the command was handed to the driver.
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued)
    }

    /// Check if the request was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// What the radio is scanning for.
#[derive(Debug)]
enum ScanMode {
    /// Connectable peripherals feed the registry.
    Devices,
    /// Advertisement frames are ranged as beacons.
    Beacons(BeaconRanger),
}

/// State guarded by the session lock.
#[derive(Debug, Default)]
struct SessionState {
    registry: DeviceRegistry,
    scan_mode: Option<ScanMode>,
    broadcasting: bool,
}

/// Results of applying one event, released after the lock is dropped.
#[derive(Debug, Default)]
struct Outcome {
    events: Vec<DeviceEvent>,
    detections: Vec<ScanDetection>,
    commands: Vec<Command>,
}

impl SessionState {
    fn apply(&mut self, event: RadioEvent) -> Outcome {
        let mut out = Outcome::default();

        match event {
            RadioEvent::PeripheralFound { name, address } => {
                if matches!(self.scan_mode, Some(ScanMode::Beacons(_))) {
                    trace!("Ignoring peripheral while ranging beacons");
                    return out;
                }
                for change in self
                    .registry
                    .on_peripheral_found(name.as_deref(), address.as_deref())
                {
                    out.events.push(match change {
                        RegistryChange::Added(device) => DeviceEvent::DeviceAdded(device),
                        RegistryChange::Removed { key } => DeviceEvent::DeviceRemoved { id: key },
                    });
                }
            }

            RadioEvent::ConnectionStateChanged { device, state } => {
                let Some(target) = self.registry.get_mut(&device) else {
                    debug!("State {} for unknown device {}", state, device);
                    return out;
                };
                let key = target.key().to_string();
                let update = target.apply_state_token(&state);

                for transition in &update.transitions {
                    out.events.push(DeviceEvent::StateChanged {
                        device: key.clone(),
                        from: transition.from,
                        to: transition.to,
                    });
                }

                if update.rediscover {
                    ServiceTreeBuilder::new(target).clear();
                    out.events.push(DeviceEvent::ProfilesCleared {
                        device: key.clone(),
                    });
                    match target.address.clone() {
                        Some(address) => {
                            info!("Connected to {}, discovering services", key);
                            out.commands.push(Command::DiscoverServices { address });
                        }
                        None => warn!("Connected to {} without an address", key),
                    }
                }
            }

            RadioEvent::ProfileDiscovered {
                device,
                profile,
                kind,
            } => {
                let Some(target) = self.registry.get_mut(&device) else {
                    debug!("Profile {} for unknown device {}", profile, device);
                    return out;
                };
                let kind = ProfileType::from_token(&kind);
                let upsert = ServiceTreeBuilder::new(target).add_profile(profile, kind);
                let key = target.key().to_string();
                if let Some(snapshot) = target.profile(&profile).cloned() {
                    out.events.push(match upsert {
                        Upsert::Added => DeviceEvent::ProfileAdded {
                            device: key,
                            profile: snapshot,
                        },
                        Upsert::Updated => DeviceEvent::ProfileUpdated {
                            device: key,
                            profile: snapshot,
                        },
                    });
                }
            }

            RadioEvent::CharacteristicDiscovered {
                device,
                profile,
                characteristic,
                properties,
            } => {
                let Some(target) = self.registry.get_mut(&device) else {
                    debug!("Characteristic {} for unknown device {}", characteristic, device);
                    return out;
                };
                let properties = CharacteristicProperties::from_token(&properties);
                let Some(upsert) = ServiceTreeBuilder::new(target).add_characteristic(
                    &profile,
                    characteristic,
                    properties,
                ) else {
                    return out;
                };
                let key = target.key().to_string();
                if let Some(snapshot) = target.characteristic(&profile, &characteristic).cloned() {
                    out.events.push(match upsert {
                        Upsert::Added => DeviceEvent::CharacteristicAdded {
                            device: key,
                            profile,
                            characteristic: snapshot,
                        },
                        Upsert::Updated => DeviceEvent::CharacteristicUpdated {
                            device: key,
                            profile,
                            characteristic: snapshot,
                        },
                    });
                }
            }

            RadioEvent::DescriptorDiscovered {
                device,
                profile,
                characteristic,
                descriptor,
                value,
            } => {
                let Some(target) = self.registry.get_mut(&device) else {
                    debug!("Descriptor {} for unknown device {}", descriptor, device);
                    return out;
                };
                let Some(upsert) = ServiceTreeBuilder::new(target).add_descriptor(
                    &profile,
                    &characteristic,
                    descriptor,
                    value,
                ) else {
                    return out;
                };
                let key = target.key().to_string();
                let snapshot = target
                    .characteristic(&profile, &characteristic)
                    .and_then(|c| c.descriptor(&descriptor))
                    .cloned();
                if let Some(snapshot) = snapshot {
                    out.events.push(match upsert {
                        Upsert::Added => DeviceEvent::DescriptorAdded {
                            device: key,
                            profile,
                            characteristic,
                            descriptor: snapshot,
                        },
                        Upsert::Updated => DeviceEvent::DescriptorUpdated {
                            device: key,
                            profile,
                            characteristic,
                            descriptor: snapshot,
                        },
                    });
                }
            }

            RadioEvent::CharacteristicValueChanged {
                device,
                characteristic,
                value,
            } => {
                let Some(target) = self.registry.get_mut(&device) else {
                    debug!("Value for unknown device {}", device);
                    return out;
                };
                let key = target.key().to_string();
                if let Some(profile) =
                    ServiceTreeBuilder::new(target).set_value(&characteristic, value.clone())
                {
                    out.events.push(DeviceEvent::ValueChanged {
                        device: key,
                        profile,
                        characteristic,
                        value,
                    });
                }
            }

            RadioEvent::BeaconDetected { frame, rssi } => {
                let Some(ScanMode::Beacons(ranger)) = &self.scan_mode else {
                    trace!("Ignoring advertisement frame outside beacon scanning");
                    return out;
                };
                match ranger.detect(&frame, rssi) {
                    Ok(detections) => out.detections = detections,
                    Err(e) => debug!("Malformed advertisement frame: {}", e),
                }
            }

            RadioEvent::CommandFailed { command, reason } => {
                warn!("Radio command {} failed: {}", command, reason);
                match command.as_str() {
                    "start_scan" => self.scan_mode = None,
                    "start_broadcast" => self.broadcasting = false,
                    _ => {}
                }
                out.events.push(DeviceEvent::CommandFailed { command, reason });
            }
        }

        out
    }
}

/// State shared with the event pump.
struct Inner {
    driver: Arc<dyn RadioDriver>,
    state: Mutex<SessionState>,
    event_tx: broadcast::Sender<DeviceEvent>,
    detection_tx: broadcast::Sender<ScanDetection>,
}

impl Inner {
    async fn dispatch(&self, event: RadioEvent) {
        let outcome = self.state.lock().apply(event);

        for event in outcome.events {
            self.publish(event);
        }
        for detection in outcome.detections {
            let _ = self.detection_tx.send(detection);
        }
        for command in outcome.commands {
            // Failures are already reported as events.
            let _ = self.issue(command).await;
        }
    }

    fn publish(&self, event: DeviceEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    async fn issue(&self, command: Command) -> Result<CommandStatus> {
        let kind = command.kind();
        debug!("Issuing {}", kind);

        match self.driver.send(command).await {
            Ok(()) => Ok(CommandStatus::Issued),
            Err(e) => {
                error!("Failed to issue {}: {}", kind, e);
                self.publish(DeviceEvent::CommandFailed {
                    command: kind.to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// Central manager for discovering and talking to BLE peripherals.
///
/// # Example
///
/// ```rust,no_run
/// use gatt_central::{DeviceManager, Result};
///
/// # async fn run() -> Result<()> {
/// let manager = DeviceManager::new().await?;
/// manager.start_scanning_devices().await?;
/// tokio::time::sleep(std::time::Duration::from_secs(5)).await;
///
/// for device in manager.devices() {
///     println!("{}", device);
/// }
/// manager.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceManager {
    inner: Arc<Inner>,
    config: ManagerConfig,
    /// Callback ID counter.
    callback_counter: AtomicU64,
    /// Event pump task handle.
    pump_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    /// Running flag.
    is_running: Arc<AtomicBool>,
}

impl DeviceManager {
    /// Create a manager on the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        Self::with_config(ManagerConfig::default()).await
    }

    /// Create a manager on the first Bluetooth adapter with custom sizing.
    pub async fn with_config(config: ManagerConfig) -> Result<Self> {
        let (driver, events) = AdapterDriver::new(&config).await?;
        let manager = Self::with_driver(Arc::new(driver), config);
        manager.attach(events);
        Ok(manager)
    }

    /// Create a manager over any radio driver.
    ///
    /// Driver events must be fed in with [`attach`](Self::attach) or
    /// [`dispatch`](Self::dispatch).
    pub fn with_driver(driver: Arc<dyn RadioDriver>, config: ManagerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let (detection_tx, _) = broadcast::channel(config.detection_capacity);

        Self {
            inner: Arc::new(Inner {
                driver,
                state: Mutex::new(SessionState::default()),
                event_tx,
                detection_tx,
            }),
            config,
            callback_counter: AtomicU64::new(0),
            pump_handle: Mutex::new(None),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the session configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Start draining a driver event stream in the background.
    ///
    /// Replaces any previously attached stream.
    pub fn attach(&self, mut events: mpsc::Receiver<RadioEvent>) {
        let inner = self.inner.clone();
        let is_running = self.is_running.clone();
        is_running.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            while is_running.load(Ordering::SeqCst) {
                match events.recv().await {
                    Some(event) => inner.dispatch(event).await,
                    None => break,
                }
            }
            debug!("Radio event pump ended");
        });

        if let Some(previous) = self.pump_handle.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Apply a single driver event.
    pub async fn dispatch(&self, event: RadioEvent) {
        self.inner.dispatch(event).await;
    }

    // === Scanning ===

    /// Start ranging beacons, keeping only UUIDs accepted by `filter`.
    pub async fn start_scanning(&self, filter: ScanConfiguration) -> Result<CommandStatus> {
        let filters = filter.uuids().to_vec();
        let previous = self
            .inner
            .state
            .lock()
            .scan_mode
            .replace(ScanMode::Beacons(BeaconRanger::new(filter)));
        info!("Starting beacon scan with {} filter(s)", filters.len());

        let result = self.inner.issue(Command::StartScan { filters }).await;
        if result.is_err() {
            self.inner.state.lock().scan_mode = previous;
        }
        result
    }

    /// Start discovering connectable devices.
    ///
    /// Devices from an earlier scan are dropped first.
    pub async fn start_scanning_devices(&self) -> Result<CommandStatus> {
        let removed: Vec<String> = {
            let mut state = self.inner.state.lock();
            let removed = state
                .registry
                .devices()
                .iter()
                .map(|d| d.key().to_string())
                .collect();
            state.registry.clear();
            state.scan_mode = Some(ScanMode::Devices);
            removed
        };
        for id in removed {
            self.inner.publish(DeviceEvent::DeviceRemoved { id });
        }
        info!("Starting device scan");

        let result = self
            .inner
            .issue(Command::StartScan {
                filters: Vec::new(),
            })
            .await;
        if result.is_err() {
            self.inner.state.lock().scan_mode = None;
        }
        result
    }

    /// Stop any scan. Discovered devices are kept.
    pub async fn stop_scanning(&self) -> Result<CommandStatus> {
        if self.inner.state.lock().scan_mode.take().is_none() {
            debug!("Not scanning");
            return Ok(CommandStatus::Ignored);
        }

        info!("Stopping scan");
        self.inner.issue(Command::StopScan).await
    }

    /// Check if a scan is active.
    pub fn is_scanning(&self) -> bool {
        self.inner.state.lock().scan_mode.is_some()
    }

    /// Check if beacons are being ranged.
    pub fn is_ranging_beacons(&self) -> bool {
        matches!(self.inner.state.lock().scan_mode, Some(ScanMode::Beacons(_)))
    }

    // === Broadcasting ===

    /// Advertise as a beacon.
    pub async fn start_broadcasting(
        &self,
        uuid: Uuid,
        major: u16,
        minor: u16,
        identifier: &str,
    ) -> Result<CommandStatus> {
        let request = BroadcastRequest {
            uuid,
            major,
            minor,
            identifier: identifier.to_string(),
            payload: Bytes::copy_from_slice(&encode_payload(&uuid, major, minor)),
        };
        let was_broadcasting =
            std::mem::replace(&mut self.inner.state.lock().broadcasting, true);
        info!("Broadcasting {} major={} minor={}", uuid, major, minor);

        let result = self.inner.issue(Command::StartBroadcast(request)).await;
        if result.is_err() {
            self.inner.state.lock().broadcasting = was_broadcasting;
        }
        result
    }

    /// Stop advertising.
    pub async fn stop_broadcasting(&self) -> Result<CommandStatus> {
        if !std::mem::replace(&mut self.inner.state.lock().broadcasting, false) {
            debug!("Not broadcasting");
            return Ok(CommandStatus::Ignored);
        }

        info!("Stopping broadcast");
        self.inner.issue(Command::StopBroadcast).await
    }

    /// Check if a broadcast is active.
    pub fn is_broadcasting(&self) -> bool {
        self.inner.state.lock().broadcasting
    }

    // === Connections ===

    /// Resolve a device's address, or the reason the request is invalid.
    fn address_of(
        &self,
        id: &str,
        require_connected: bool,
    ) -> std::result::Result<(Device, String), Rejection> {
        let state = self.inner.state.lock();
        let device = state.registry.get(id).ok_or_else(|| Rejection::UnknownDevice {
            id: id.to_string(),
        })?;
        let address = device.address.clone().ok_or_else(|| Rejection::NoAddress {
            id: device.key().to_string(),
        })?;
        if require_connected && !device.is_connected() {
            return Err(Rejection::NotConnected {
                id: device.key().to_string(),
            });
        }
        Ok((device.clone(), address))
    }

    fn reject(&self, rejection: Rejection) -> Result<CommandStatus> {
        warn!("Request rejected: {}", rejection);
        Ok(CommandStatus::Rejected(rejection))
    }

    /// Ask the driver to connect to a device.
    ///
    /// The device state only changes once the driver reports it.
    pub async fn connect(&self, id: &str) -> Result<CommandStatus> {
        let (device, address) = match self.address_of(id, false) {
            Ok(found) => found,
            Err(rejection) => return self.reject(rejection),
        };
        if !device.state().can_connect() {
            debug!("{} already {}", device.key(), device.state());
            return Ok(CommandStatus::Ignored);
        }

        info!("Connecting to {}", device);
        self.inner.issue(Command::Connect { address }).await
    }

    /// Ask the driver to disconnect from a device.
    pub async fn disconnect(&self, id: &str) -> Result<CommandStatus> {
        let (device, address) = match self.address_of(id, false) {
            Ok(found) => found,
            Err(rejection) => return self.reject(rejection),
        };
        if !device.state().can_disconnect() {
            debug!("{} already {}", device.key(), device.state());
            return Ok(CommandStatus::Ignored);
        }

        info!("Disconnecting from {}", device);
        self.inner.issue(Command::Disconnect { address }).await
    }

    // === Characteristics ===

    /// Read a characteristic. The value arrives as a
    /// [`DeviceEvent::ValueChanged`].
    pub async fn read_characteristic(
        &self,
        id: &str,
        profile: Uuid,
        characteristic: Uuid,
    ) -> Result<CommandStatus> {
        let address = match self.address_of(id, true) {
            Ok((_, address)) => address,
            Err(rejection) => return self.reject(rejection),
        };
        self.inner
            .issue(Command::ReadCharacteristic {
                address,
                profile,
                characteristic,
            })
            .await
    }

    /// Write a characteristic.
    pub async fn write_characteristic(
        &self,
        id: &str,
        profile: Uuid,
        characteristic: Uuid,
        value: impl Into<Bytes>,
    ) -> Result<CommandStatus> {
        let address = match self.address_of(id, true) {
            Ok((_, address)) => address,
            Err(rejection) => return self.reject(rejection),
        };
        self.inner
            .issue(Command::WriteCharacteristic {
                address,
                profile,
                characteristic,
                value: value.into(),
            })
            .await
    }

    /// Enable notifications on a characteristic.
    pub async fn subscribe_characteristic(
        &self,
        id: &str,
        profile: Uuid,
        characteristic: Uuid,
    ) -> Result<CommandStatus> {
        self.set_subscription(id, profile, characteristic, true).await
    }

    /// Disable notifications on a characteristic.
    pub async fn unsubscribe_characteristic(
        &self,
        id: &str,
        profile: Uuid,
        characteristic: Uuid,
    ) -> Result<CommandStatus> {
        self.set_subscription(id, profile, characteristic, false).await
    }

    async fn set_subscription(
        &self,
        id: &str,
        profile: Uuid,
        characteristic: Uuid,
        enable: bool,
    ) -> Result<CommandStatus> {
        let address = match self.address_of(id, true) {
            Ok((_, address)) => address,
            Err(rejection) => return self.reject(rejection),
        };
        self.inner
            .issue(Command::Subscribe {
                address,
                profile,
                characteristic,
                enable,
            })
            .await
    }

    // === Snapshots ===

    /// Get all discovered devices in discovery order.
    pub fn devices(&self) -> Vec<Device> {
        self.inner.state.lock().registry.devices().to_vec()
    }

    /// Get a device by key or address.
    pub fn device(&self, id: &str) -> Option<Device> {
        self.inner.state.lock().registry.get(id).cloned()
    }

    /// Get the number of discovered devices.
    pub fn device_count(&self) -> usize {
        self.inner.state.lock().registry.len()
    }

    // === Observers ===

    /// Subscribe to device and GATT tree changes.
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Register a callback for device and GATT tree changes.
    pub fn on_device_event<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(DeviceEvent) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.inner.event_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Device event callback lagged by {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Subscribe to beacon detections.
    pub fn subscribe_detections(&self) -> broadcast::Receiver<ScanDetection> {
        self.inner.detection_tx.subscribe()
    }

    /// Register a callback fired once per beacon detection.
    pub fn on_scan_detection<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(ScanDetection) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.inner.detection_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(detection) => callback(detection),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Scan detection callback lagged by {} detections", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    // === Lifecycle ===

    /// Stop scanning and broadcasting, disconnect devices and clear the
    /// registry.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down device manager");

        if let Err(e) = self.stop_scanning().await {
            warn!("Error stopping scan: {}", e);
        }
        if let Err(e) = self.stop_broadcasting().await {
            warn!("Error stopping broadcast: {}", e);
        }

        let connected: Vec<String> = self
            .inner
            .state
            .lock()
            .registry
            .devices()
            .iter()
            .filter(|d| d.state().can_disconnect())
            .map(|d| d.key().to_string())
            .collect();
        for id in connected {
            if let Err(e) = self.disconnect(&id).await {
                warn!("Error disconnecting {}: {}", id, e);
            }
        }

        let removed: Vec<String> = {
            let mut state = self.inner.state.lock();
            let removed = state
                .registry
                .devices()
                .iter()
                .map(|d| d.key().to_string())
                .collect();
            state.registry.clear();
            removed
        };
        for id in removed {
            self.inner.publish(DeviceEvent::DeviceRemoved { id });
        }

        self.is_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.pump_handle.lock().take() {
            handle.abort();
        }

        Ok(())
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.pump_handle.lock().take() {
            handle.abort();
        }
    }
}
