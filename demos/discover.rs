//! Example: Finding boards on the local network
//!
//! Run with: RUST_LOG=debug cargo run --example discover
//!
//! This example demonstrates:
//! - Broadcasting the identify tag on every local interface
//! - Tuning the scan window and retry count
//! - Reading MAC, firmware and address from each answer

use ether_io::{discover_with, DiscoveryConfig};
use std::time::Duration;

fn main() -> ether_io::Result<()> {
    env_logger::init();

    let config = DiscoveryConfig::new()
        .with_scan_timeout(Duration::from_millis(500))
        .with_max_retries(2);

    let boards = discover_with(&config)?;
    if boards.is_empty() {
        println!("No boards answered.");
        return Ok(());
    }

    println!("Found {} board(s):\n", boards.len());
    for board in &boards {
        let mac = board
            .mac()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":");
        let [major, minor] = board.firmware();
        let tag = if board.has_identify_tag() { "" } else { " (unknown tag)" };

        println!("  {:<15}  {}  firmware {}.{:02}{}", board.ip(), mac, major, minor, tag);
    }

    Ok(())
}
