//! Heart rate monitor example
//!
//! Run with: cargo run --example heart_rate_monitor

use gatt_central::ble::uuids::{HEART_RATE_MEASUREMENT_UUID, HEART_RATE_SERVICE_UUID};
use gatt_central::{DecodedValue, DeviceEvent, DeviceManager, Error, Result};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    println!("Heart Rate Monitor");
    println!("==================\n");
    println!("Looking for devices...\n");

    let manager = DeviceManager::new().await?;
    let mut events = manager.subscribe();
    manager.start_scanning_devices().await?;

    // Wait for devices to be discovered
    tokio::time::sleep(Duration::from_secs(5)).await;
    manager.stop_scanning().await?;

    let devices = manager.devices();
    let device = devices
        .iter()
        .find(|d| d.address.is_some())
        .ok_or_else(|| Error::DeviceNotFound {
            identifier: "any".to_string(),
        })?;

    println!("Connecting to {}...\n", device);
    manager.connect(device.key()).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                break;
            }
            event = events.recv() => {
                let Ok(event) = event else { break };
                match event {
                    DeviceEvent::CharacteristicAdded { device, profile, characteristic }
                        if characteristic.uuid == HEART_RATE_MEASUREMENT_UUID =>
                    {
                        manager
                            .subscribe_characteristic(&device, profile, HEART_RATE_MEASUREMENT_UUID)
                            .await?;
                    }
                    DeviceEvent::ValueChanged { profile, characteristic, value, .. }
                        if profile == HEART_RATE_SERVICE_UUID
                            && characteristic == HEART_RATE_MEASUREMENT_UUID =>
                    {
                        let decoded =
                            gatt_central::decode_characteristic(&characteristic, Some(&value[..]));
                        match decoded {
                            Some(DecodedValue::HeartRateMeasurement(hrm)) => println!("{}", hrm),
                            Some(other) => println!("Unexpected value: {}", other),
                            None => {}
                        }
                    }
                    DeviceEvent::CommandFailed { command, reason } => {
                        println!("Command {} failed: {}", command, reason);
                    }
                    _ => {}
                }
            }
        }
    }

    manager.shutdown().await?;

    Ok(())
}
