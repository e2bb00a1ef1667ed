//! Connect to a sensor and print its parameter record.
//!
//! Usage: cargo run --features native --example info [sensor-ip]

use ilidar::ffi::NativeDriver;
use ilidar::{DeviceSession, Frame, ReceiveBuffer, DEFAULT_SENSOR_PORT};
use std::net::Ipv4Addr;

fn main() {
    env_logger::init();

    let sensor_ip = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(Ipv4Addr::new(192, 168, 5, 200));

    let result = NativeDriver::new().and_then(|driver| {
        let mut session = DeviceSession::new(driver);
        session.initialize(ReceiveBuffer::new(), |_: Frame| {})?;
        session.connect(sensor_ip, DEFAULT_SENSOR_PORT)?;
        session.get_parameters()
    });

    match result {
        Ok(p) => {
            println!("Serial:    {}", p.sensor_sn);
            println!("Capture:   mode={} rows={} period={}us", p.capture_mode, p.capture_row, p.capture_period_us);
            println!("Shutter:   {:?}", p.capture_shutter);
            println!("Sensor IP: {}", p.sensor_ip());
            println!("Dest IP:   {}:{}", p.dest_ip(), p.data_port);
            println!("Subnet:    {}  Gateway: {}", p.subnet(), p.gateway());
            println!("MAC:       {}", p.mac_string());
            println!("Sync:      {} (trigger delay {}us)", p.sync, p.sync_trig_delay_us);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
