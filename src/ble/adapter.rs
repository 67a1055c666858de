//! Radio driver backed by the host Bluetooth adapter.
//!
//! Commands are queued to a worker task. Scan control runs inline on the
//! worker; peripheral operations each get their own task so a slow connection
//! never stalls a stop request. Results come back as [`RadioEvent`]s.

use btleplug::api::{
    Central, CentralEvent, Characteristic as BtCharacteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bytes::Bytes;
use futures::stream::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::ble::advertising::manufacturer_record;
use crate::ble::connection::ConnectionState;
use crate::ble::driver::{Command, RadioDriver, RadioEvent};
use crate::ble::uuids::CLIENT_CHARACTERISTIC_CONFIGURATION_UUID;
use crate::config::ManagerConfig;
use crate::data::CharacteristicProperties;
use crate::error::{Error, Result};
use crate::protocol::ClientConfiguration;

/// Notification forwarders per connected peripheral.
type Links = Arc<Mutex<HashMap<String, JoinHandle<()>>>>;

/// [`RadioDriver`] for the first Bluetooth adapter on this host.
///
/// Beacon broadcasting is not available on this driver; requests fail with a
/// `CommandFailed` event.
pub struct AdapterDriver {
    command_tx: mpsc::Sender<Command>,
    worker: JoinHandle<()>,
    central: JoinHandle<()>,
    links: Links,
}

impl AdapterDriver {
    /// Open the first Bluetooth adapter.
    ///
    /// Returns the driver and the stream of events it reports.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new(config: &ManagerConfig) -> Result<(Self, mpsc::Receiver<RadioEvent>)> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter, config))
    }

    /// Drive a specific adapter.
    pub fn with_adapter(
        adapter: Adapter,
        config: &ManagerConfig,
    ) -> (Self, mpsc::Receiver<RadioEvent>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);

        let links: Links = Arc::new(Mutex::new(HashMap::new()));
        let central = tokio::spawn(forward_central_events(adapter.clone(), event_tx.clone()));
        let worker = tokio::spawn(run_worker(adapter, command_rx, event_tx, links.clone()));

        (
            Self {
                command_tx,
                worker,
                central,
                links,
            },
            event_rx,
        )
    }
}

#[async_trait::async_trait]
impl RadioDriver for AdapterDriver {
    async fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::DriverUnavailable)
    }
}

impl Drop for AdapterDriver {
    fn drop(&mut self) {
        self.worker.abort();
        self.central.abort();
        abort_links(&self.links);
    }
}

async fn run_worker(
    adapter: Adapter,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<RadioEvent>,
    links: Links,
) {

    while let Some(command) = commands.recv().await {
        let kind = command.kind();
        trace!("Driver executing {}", kind);

        match command {
            Command::StartScan { filters } => {
                // Filtering happens on the decoded frames.
                debug!("Scanning with {} beacon filter(s)", filters.len());
                let result = adapter
                    .start_scan(ScanFilter::default())
                    .await
                    .map_err(Error::from);
                report(&events, kind, result).await;
            }
            Command::StopScan => {
                let result = adapter.stop_scan().await.map_err(Error::from);
                report(&events, kind, result).await;
            }
            Command::StartBroadcast(_) => {
                let result = Err(Error::NotSupported {
                    operation: "beacon broadcasting".to_string(),
                });
                report(&events, kind, result).await;
            }
            Command::StopBroadcast => {}
            other => {
                let adapter = adapter.clone();
                let events = events.clone();
                let links = links.clone();
                tokio::spawn(async move {
                    let result = execute(&adapter, &events, &links, other).await;
                    report(&events, kind, result).await;
                });
            }
        }
    }

    debug!("Driver command queue closed");
    abort_links(&links);
}

fn abort_links(links: &Links) {
    for (address, handle) in links.lock().drain() {
        trace!("Dropping notification link to {}", address);
        handle.abort();
    }
}

async fn report(events: &mpsc::Sender<RadioEvent>, kind: &'static str, result: Result<()>) {
    if let Err(e) = result {
        warn!("{} failed: {}", kind, e);
        let _ = events
            .send(RadioEvent::CommandFailed {
                command: kind.to_string(),
                reason: e.to_string(),
            })
            .await;
    }
}

/// Translate adapter events for the lifetime of the driver.
async fn forward_central_events(adapter: Adapter, events: mpsc::Sender<RadioEvent>) {
    let mut stream = match adapter.events().await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to get adapter events: {}", e);
            return;
        }
    };

    while let Some(event) = stream.next().await {
        let translated = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                let name = match adapter.peripheral(&id).await {
                    Ok(peripheral) => peripheral
                        .properties()
                        .await
                        .ok()
                        .flatten()
                        .and_then(|p| p.local_name),
                    Err(e) => {
                        trace!("Failed to get peripheral: {}", e);
                        continue;
                    }
                };
                vec![RadioEvent::PeripheralFound {
                    name,
                    address: Some(id.to_string()),
                }]
            }
            CentralEvent::DeviceDisconnected(id) => {
                debug!("Device disconnected: {:?}", id);
                vec![RadioEvent::ConnectionStateChanged {
                    device: id.to_string(),
                    state: ConnectionState::Disconnected.token().to_string(),
                }]
            }
            CentralEvent::ManufacturerDataAdvertisement {
                id,
                manufacturer_data,
            } => {
                let rssi = match adapter.peripheral(&id).await {
                    Ok(peripheral) => peripheral
                        .properties()
                        .await
                        .ok()
                        .flatten()
                        .and_then(|p| p.rssi),
                    Err(_) => None,
                };
                let Some(rssi) = rssi else {
                    trace!("Advertisement from {:?} without signal strength", id);
                    continue;
                };
                manufacturer_data
                    .iter()
                    .filter_map(|(company_id, data)| manufacturer_record(*company_id, data))
                    .map(|frame| RadioEvent::BeaconDetected { frame, rssi })
                    .collect()
            }
            _ => continue,
        };

        for event in translated {
            if events.send(event).await.is_err() {
                debug!("Radio event receiver dropped");
                return;
            }
        }
    }
}

async fn find_peripheral(adapter: &Adapter, address: &str) -> Result<Peripheral> {
    adapter
        .peripherals()
        .await?
        .into_iter()
        .find(|p| p.id().to_string() == address)
        .ok_or_else(|| Error::DeviceNotFound {
            identifier: address.to_string(),
        })
}

fn find_characteristic(
    peripheral: &Peripheral,
    profile: &Uuid,
    characteristic: &Uuid,
) -> Result<BtCharacteristic> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.service_uuid == *profile && c.uuid == *characteristic)
        .ok_or_else(|| Error::CharacteristicNotFound {
            uuid: characteristic.to_string(),
        })
}

async fn emit(events: &mpsc::Sender<RadioEvent>, event: RadioEvent) -> Result<()> {
    events
        .send(event)
        .await
        .map_err(|_| Error::DriverUnavailable)
}

async fn emit_state(
    events: &mpsc::Sender<RadioEvent>,
    address: &str,
    state: ConnectionState,
) -> Result<()> {
    emit(
        events,
        RadioEvent::ConnectionStateChanged {
            device: address.to_string(),
            state: state.token().to_string(),
        },
    )
    .await
}

async fn execute(
    adapter: &Adapter,
    events: &mpsc::Sender<RadioEvent>,
    links: &Links,
    command: Command,
) -> Result<()> {
    match command {
        Command::Connect { address } => connect(adapter, events, links, &address).await,
        Command::Disconnect { address } => {
            let peripheral = find_peripheral(adapter, &address).await?;
            emit_state(events, &address, ConnectionState::Disconnecting).await?;
            peripheral.disconnect().await?;
            if let Some(handle) = links.lock().remove(&address) {
                handle.abort();
            }
            emit_state(events, &address, ConnectionState::Disconnected).await
        }
        Command::DiscoverServices { address } => {
            let peripheral = find_peripheral(adapter, &address).await?;
            discover(&peripheral, events, &address).await
        }
        Command::ReadCharacteristic {
            address,
            profile,
            characteristic,
        } => {
            let peripheral = find_peripheral(adapter, &address).await?;
            let target = find_characteristic(&peripheral, &profile, &characteristic)?;
            let value = peripheral.read(&target).await?;
            trace!("Read {} bytes from {}", value.len(), characteristic);
            emit(
                events,
                RadioEvent::CharacteristicValueChanged {
                    device: address,
                    characteristic,
                    value: Bytes::from(value),
                },
            )
            .await
        }
        Command::WriteCharacteristic {
            address,
            profile,
            characteristic,
            value,
        } => {
            let peripheral = find_peripheral(adapter, &address).await?;
            let target = find_characteristic(&peripheral, &profile, &characteristic)?;
            let properties = CharacteristicProperties::from_bits(target.properties.bits());
            let write_type = if properties.contains(CharacteristicProperties::WRITE) {
                WriteType::WithResponse
            } else {
                WriteType::WithoutResponse
            };
            peripheral.write(&target, &value, write_type).await?;
            trace!("Wrote {} bytes to {}", value.len(), characteristic);
            emit(
                events,
                RadioEvent::CharacteristicValueChanged {
                    device: address,
                    characteristic,
                    value,
                },
            )
            .await
        }
        Command::Subscribe {
            address,
            profile,
            characteristic,
            enable,
        } => {
            let peripheral = find_peripheral(adapter, &address).await?;
            let target = find_characteristic(&peripheral, &profile, &characteristic)?;
            let properties = CharacteristicProperties::from_bits(target.properties.bits());

            let configuration = if !enable {
                peripheral.unsubscribe(&target).await?;
                ClientConfiguration::Disabled
            } else {
                peripheral.subscribe(&target).await?;
                if properties.contains(CharacteristicProperties::NOTIFY) {
                    ClientConfiguration::Notifications
                } else {
                    ClientConfiguration::Indications
                }
            };
            debug!("{} on {}: {}", characteristic, address, configuration);

            emit(
                events,
                RadioEvent::DescriptorDiscovered {
                    device: address,
                    profile,
                    characteristic,
                    descriptor: CLIENT_CHARACTERISTIC_CONFIGURATION_UUID,
                    value: Bytes::copy_from_slice(&configuration.to_bytes()),
                },
            )
            .await
        }
        other => Err(Error::Internal(format!(
            "{} is not a peripheral command",
            other.kind()
        ))),
    }
}

async fn connect(
    adapter: &Adapter,
    events: &mpsc::Sender<RadioEvent>,
    links: &Links,
    address: &str,
) -> Result<()> {
    let peripheral = find_peripheral(adapter, address).await?;
    emit_state(events, address, ConnectionState::Connecting).await?;

    if let Err(e) = peripheral.connect().await {
        emit_state(events, address, ConnectionState::Disconnected).await?;
        return Err(e.into());
    }
    info!("Connected to {}", address);

    let handle = tokio::spawn(forward_notifications(
        peripheral,
        events.clone(),
        address.to_string(),
    ));
    if let Some(previous) = links.lock().insert(address.to_string(), handle) {
        previous.abort();
    }

    emit_state(events, address, ConnectionState::Connected).await
}

async fn forward_notifications(
    peripheral: Peripheral,
    events: mpsc::Sender<RadioEvent>,
    address: String,
) {
    let mut notifications = match peripheral.notifications().await {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to get notifications stream: {}", e);
            return;
        }
    };

    while let Some(notification) = notifications.next().await {
        trace!(
            "Notification from {}: {} bytes",
            notification.uuid,
            notification.value.len()
        );
        let event = RadioEvent::CharacteristicValueChanged {
            device: address.clone(),
            characteristic: notification.uuid,
            value: Bytes::from(notification.value),
        };
        if events.send(event).await.is_err() {
            break;
        }
    }

    debug!("Notification stream for {} ended", address);
}

/// Report profiles, then characteristics, then descriptors with their values.
async fn discover(
    peripheral: &Peripheral,
    events: &mpsc::Sender<RadioEvent>,
    address: &str,
) -> Result<()> {
    peripheral.discover_services().await?;
    let services = peripheral.services();
    debug!("Discovered {} services on {}", services.len(), address);

    for service in &services {
        let kind = if service.primary { "primary" } else { "secondary" };
        emit(
            events,
            RadioEvent::ProfileDiscovered {
                device: address.to_string(),
                profile: service.uuid,
                kind: kind.to_string(),
            },
        )
        .await?;
    }

    for service in &services {
        for characteristic in &service.characteristics {
            let properties = CharacteristicProperties::from_bits(characteristic.properties.bits());
            emit(
                events,
                RadioEvent::CharacteristicDiscovered {
                    device: address.to_string(),
                    profile: service.uuid,
                    characteristic: characteristic.uuid,
                    properties: properties.to_string(),
                },
            )
            .await?;
        }
    }

    for service in &services {
        for characteristic in &service.characteristics {
            for descriptor in &characteristic.descriptors {
                let value = match peripheral.read_descriptor(descriptor).await {
                    Ok(value) => Bytes::from(value),
                    Err(e) => {
                        debug!("Failed to read descriptor {}: {}", descriptor.uuid, e);
                        Bytes::new()
                    }
                };
                emit(
                    events,
                    RadioEvent::DescriptorDiscovered {
                        device: address.to_string(),
                        profile: service.uuid,
                        characteristic: characteristic.uuid,
                        descriptor: descriptor.uuid,
                        value,
                    },
                )
                .await?;
            }
        }
    }

    Ok(())
}
