//! Beacon ranging example
//!
//! Run with: cargo run --example beacon_ranging [proximity-uuid ...]

use gatt_central::{DeviceManager, Result, ScanConfiguration};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let mut filter = ScanConfiguration::new();
    for arg in std::env::args().skip(1) {
        if !filter.add_uuid_str(&arg) {
            eprintln!("Ignoring invalid UUID {}", arg);
        }
    }

    println!("Beacon Ranging");
    println!("==============\n");
    if filter.is_empty() {
        println!("Reporting every beacon in range.\n");
    }

    let manager = DeviceManager::new().await?;

    let _handle = manager.on_scan_detection(|detection| {
        println!("{}", detection);
    });

    manager.start_scanning(filter).await?;

    println!("Press Ctrl+C to exit.\n");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(60)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nExiting...");
        }
    }

    manager.shutdown().await?;

    Ok(())
}
