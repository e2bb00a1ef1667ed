//! Stream depth frames from a sensor and report point counts.
//!
//! Usage: ILIDAR_LIB_DIR=/path/to/lib cargo run --features native --example stream [sensor-ip]
//! Press Ctrl+C to stop.

use ilidar::ffi::NativeDriver;
use ilidar::{DeviceSession, Frame, ReceiveBuffer, SessionConfig, DEFAULT_SENSOR_PORT};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let sensor_ip: Ipv4Addr = match std::env::args().nth(1) {
        Some(arg) => match arg.parse() {
            Ok(ip) => ip,
            Err(e) => {
                eprintln!("Invalid sensor IP '{}': {}", arg, e);
                std::process::exit(2);
            }
        },
        None => Ipv4Addr::new(192, 168, 5, 200),
    };

    let driver = match NativeDriver::new() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to load driver: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, frames) = crossbeam_channel::bounded::<Frame>(4);
    let mut session = DeviceSession::with_config(driver, SessionConfig::from_env());

    let setup = session
        .initialize(ReceiveBuffer::new(), ilidar::frame::channel_sink(tx))
        .and_then(|_| session.connect(sensor_ip, DEFAULT_SENSOR_PORT))
        .and_then(|_| session.start());
    if let Err(e) = setup {
        eprintln!("Failed to start streaming from {}: {}", sensor_ip, e);
        std::process::exit(1);
    }

    if let Some(ep) = session.endpoint() {
        println!("Host:      {} (broadcast {})", ep.host_ip, ep.broadcast);
    }
    match session.get_parameters() {
        Ok(params) => println!("Sensor SN: {}", params.sensor_sn),
        Err(e) => eprintln!("Could not read parameters: {}", e),
    }
    println!("Streaming depth (Ctrl+C to stop)...");

    let start = Instant::now();
    let mut count: u64 = 0;
    let mut last_report = Instant::now();

    loop {
        match frames.recv_timeout(Duration::from_secs(2)) {
            Ok(frame) => {
                count += 1;

                if count % 30 == 1 {
                    println!("frame={:<8} points={}", frame.sequence, frame.points.len());
                }

                let now = Instant::now();
                if now.duration_since(last_report) >= Duration::from_secs(3) {
                    let elapsed = start.elapsed().as_secs_f64();
                    println!("--- {} frames in {:.1}s ({:.1} Hz) ---", count, elapsed, count as f64 / elapsed);
                    last_report = now;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                eprintln!("Timeout waiting for frames");
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = session.disconnect() {
        eprintln!("Disconnect failed: {}", e);
    }
}
