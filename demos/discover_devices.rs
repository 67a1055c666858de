//! Basic example: discover nearby peripherals and dump their GATT trees
//!
//! Run with: cargo run --example discover_devices

use gatt_central::{DeviceEvent, DeviceManager, Result};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gatt_central=debug".parse().unwrap()),
        )
        .init();

    println!("Starting BLE device discovery...\n");

    let manager = DeviceManager::new().await?;

    let _handle = manager.on_device_event(|event| match event {
        DeviceEvent::DeviceAdded(device) => println!("Discovered {}", device),
        DeviceEvent::DeviceRemoved { id } => println!("Removed {}", id),
        DeviceEvent::StateChanged { device, from, to } => {
            println!("{}: {} -> {}", device, from, to)
        }
        DeviceEvent::CommandFailed { command, reason } => {
            println!("Command {} failed: {}", command, reason)
        }
        _ => {}
    });

    manager.start_scanning_devices().await?;

    println!("Scanning for 10 seconds...");
    println!("Press Ctrl+C to exit early.\n");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(10)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted!");
        }
    }

    manager.stop_scanning().await?;

    println!("\n--- Scan Complete ---");
    println!("Total devices found: {}", manager.device_count());

    // Connect to the first device with an address and explore it
    let Some(device) = manager.devices().into_iter().find(|d| d.address.is_some()) else {
        manager.shutdown().await?;
        return Ok(());
    };

    println!("\nConnecting to {}...", device);
    manager.connect(device.key()).await?;
    tokio::time::sleep(Duration::from_secs(10)).await;

    if let Some(device) = manager.device(device.key()) {
        for profile in device.profiles() {
            println!("{} [{}] ({})", profile.label(), profile.uuid, profile.kind);
            for characteristic in &profile.characteristics {
                println!(
                    "  {} [{}] ({})",
                    characteristic.label(),
                    characteristic.uuid,
                    characteristic.properties
                );
                if let Some(value) = characteristic.decoded() {
                    println!("    = {}", value);
                }
                for descriptor in &characteristic.descriptors {
                    if let Some(value) = descriptor.decoded() {
                        println!("    {}: {}", descriptor.uuid, value);
                    }
                }
            }
        }
    }

    manager.shutdown().await?;
    println!("\nDone!");

    Ok(())
}
