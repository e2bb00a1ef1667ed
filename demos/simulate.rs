//! Run the full session and frame pipeline against the simulated driver.
//!
//! A producer thread plays the driver's receive loop, writing a moving
//! depth ramp into the shared buffer at ~30 Hz.
//!
//! Usage: RUST_LOG=info cargo run --example simulate

use ilidar::net::HostInterface;
use ilidar::protocol::{BUFFER_LEN, BUFFER_WIDTH};
use ilidar::sim::SimDriver;
use ilidar::{DeviceSession, Frame, ReceiveBuffer, DEFAULT_SENSOR_PORT};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    env_logger::init();

    let driver = SimDriver::new();
    let lan = vec![HostInterface {
        name: "sim0".into(),
        ip: Ipv4Addr::new(192, 168, 5, 2),
        mask: Ipv4Addr::new(255, 255, 255, 0),
    }];

    let (tx, frames) = crossbeam_channel::bounded::<Frame>(4);
    let mut session = DeviceSession::new(driver.clone()).with_interfaces(lan);
    let setup = session
        .initialize(ReceiveBuffer::new(), ilidar::frame::channel_sink(tx))
        .and_then(|_| session.connect(Ipv4Addr::new(192, 168, 5, 200), DEFAULT_SENSOR_PORT))
        .and_then(|_| session.start());
    if let Err(e) = setup {
        eprintln!("Setup failed: {}", e);
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    let producer = {
        let driver = driver.clone();
        let running = running.clone();
        std::thread::spawn(move || {
            let mut data = vec![0u16; BUFFER_LEN];
            let mut tick: usize = 0;
            while running.load(Ordering::Relaxed) {
                for (i, sample) in data.iter_mut().enumerate() {
                    let x = i % BUFFER_WIDTH;
                    *sample = (((x + tick) % BUFFER_WIDTH) * 25) as u16;
                }
                driver.push_frame(&data);
                tick += 4;
                std::thread::sleep(Duration::from_millis(33));
            }
        })
    };

    for _ in 0..30 {
        match frames.recv_timeout(Duration::from_secs(1)) {
            Ok(frame) => println!("frame={:<4} points={}", frame.sequence, frame.points.len()),
            Err(e) => {
                eprintln!("No frame: {}", e);
                break;
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    let _ = producer.join();

    let processed = session.frames_processed();
    if let Err(e) = session.destroy() {
        eprintln!("Destroy failed: {}", e);
    }
    println!("Processed {} frames", processed);
}
