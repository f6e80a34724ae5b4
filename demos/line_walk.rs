//! Example: Walking a lit line across a port
//!
//! Run with: cargo run --example line_walk -- 10.10.10.10 b
//!
//! This example demonstrates:
//! - Opening a session and configuring a port as outputs
//! - Single-line changes with `write_line`
//! - Handling validation and timeout errors

use ether_io::utils::get_on_lines;
use ether_io::{Device, DeviceConfig, EtherIoError, Variant};
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

fn main() -> ether_io::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let ip: Ipv4Addr = match args.next().map(|s| s.parse()) {
        Some(Ok(ip)) => ip,
        Some(Err(_)) => return Err(EtherIoError::invalid_parameter("ip", "not an IPv4 address")),
        None => Ipv4Addr::new(10, 10, 10, 10),
    };
    let port = args.next().and_then(|s| s.chars().next()).unwrap_or('a');

    let config = DeviceConfig::new(Variant::Io24, ip).with_timeout(Duration::from_millis(500));
    let device = match Device::open(config) {
        Ok(device) => device,
        Err(EtherIoError::Timeout) => {
            println!("No answer from {}", ip);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    device.validate_port_letter(port)?;

    // All outputs, all low
    device.write_port_direction(port, 0x00)?;
    device.write_port_value(port, 0x00)?;

    for line in 0..8 {
        device.write_line(port, line, true)?;
        let reading = device.read_port_value(port)?;
        println!(
            "port {} = {:08b}  on: {:?}",
            reading.port(),
            reading.value(),
            get_on_lines(reading.value())
        );
        thread::sleep(Duration::from_millis(200));
        device.write_line(port, line, false)?;
    }

    // Back to inputs
    device.write_port_direction(port, 0xFF)?;
    device.close();
    Ok(())
}
