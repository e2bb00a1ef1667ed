use crossbeam_channel::Receiver;
use ilidar::net::HostInterface;
use ilidar::protocol::{BUFFER_LEN, BUFFER_WIDTH};
use ilidar::sim::{DriverOp, SimDriver};
use ilidar::{DeviceSession, Frame, ReceiveBuffer, SessionState, DEFAULT_SENSOR_PORT};
use std::net::Ipv4Addr;
use std::time::Duration;

const SENSOR: Ipv4Addr = Ipv4Addr::new(192, 168, 5, 200);

fn streaming_session() -> (DeviceSession<SimDriver>, SimDriver, Receiver<Frame>) {
    let driver = SimDriver::new();
    let interfaces = vec![
        HostInterface {
            name: "wlan0".into(),
            ip: Ipv4Addr::new(10, 0, 0, 12),
            mask: Ipv4Addr::new(255, 255, 255, 0),
        },
        HostInterface {
            name: "eth0".into(),
            ip: Ipv4Addr::new(192, 168, 5, 2),
            mask: Ipv4Addr::new(255, 255, 255, 0),
        },
    ];
    let (tx, rx) = crossbeam_channel::unbounded();

    let mut session = DeviceSession::new(driver.clone()).with_interfaces(interfaces);
    session
        .initialize(ReceiveBuffer::new(), ilidar::frame::channel_sink(tx))
        .unwrap();
    session.connect(SENSOR, DEFAULT_SENSOR_PORT).unwrap();
    session.start().unwrap();
    assert_eq!(session.state(), SessionState::Streaming);

    (session, driver, rx)
}

/// A frame whose first depth row holds the given samples.
fn frame_with_row(samples: &[u16]) -> Vec<u16> {
    let mut frame = vec![0u16; BUFFER_LEN];
    frame[..samples.len()].copy_from_slice(samples);
    frame
}

#[test]
fn frames_flow_from_driver_thread_to_sink() {
    let (session, driver, frames) = streaming_session();
    assert_eq!(
        session.endpoint().map(|ep| ep.broadcast),
        Some(Ipv4Addr::new(192, 168, 5, 255))
    );

    let producer = {
        let driver = driver.clone();
        std::thread::spawn(move || driver.push_frame(&frame_with_row(&[99, 100, 8000, 8001])))
    };
    assert!(producer.join().unwrap());

    let frame = frames.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(frame.points.len(), 2);
    assert_eq!(frame.depth.dimensions(), (320, 160));
    assert_eq!(frame.depth.get_pixel(0, 0).0[3], 255);
    assert_eq!(frame.depth.get_pixel(10, 10).0, [0, 0, 0, 0]);
}

#[test]
fn rows_below_depth_field_are_ignored() {
    let (_session, driver, frames) = streaming_session();
    let mut data = vec![0u16; BUFFER_LEN];
    data[160 * BUFFER_WIDTH] = 1000;
    data[319 * BUFFER_WIDTH + 5] = 1000;
    driver.push_frame(&data);

    let frame = frames.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(frame.points.is_empty());
}

#[test]
fn notifications_outside_streaming_are_dropped() {
    let (mut session, driver, frames) = streaming_session();
    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Connected);

    assert!(driver.push_frame(&frame_with_row(&[1000; 8])));
    assert!(frames.recv_timeout(Duration::from_millis(300)).is_err());
    assert_eq!(session.frames_processed(), 0);

    session.start().unwrap();
    driver.push_frame(&frame_with_row(&[1000; 8]));
    let frame = frames.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(frame.points.len(), 8);
}

#[test]
fn burst_of_notifications_coalesces_to_newest_frame() {
    let (session, driver, frames) = streaming_session();
    for i in 0..300u16 {
        driver.push_frame(&frame_with_row(&[1000 + i]));
    }

    // Wait for the worker to drain whatever was pending.
    let mut received = Vec::new();
    while let Ok(frame) = frames.recv_timeout(Duration::from_millis(300)) {
        received.push(frame);
    }

    assert!(!received.is_empty());
    assert_eq!(session.frames_processed() as usize, received.len());
    let sequences: Vec<u64> = received.iter().map(|f| f.sequence).collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));

    // Whatever was coalesced, the final frame carries the final write.
    let last = received.last().unwrap();
    assert_eq!(last.points.len(), 1);
    assert!((last.points[0].z + 1.299).abs() < 1e-6);
    assert_eq!(last.depth.get_pixel(0, 0).0[3], 255);
}

#[test]
fn destroy_during_frame_delivery_is_safe() {
    let (mut session, driver, _frames) = streaming_session();

    let producer = {
        let driver = driver.clone();
        std::thread::spawn(move || {
            let frame = frame_with_row(&[2000; 320]);
            let mut delivered = 0;
            for _ in 0..500 {
                if driver.push_frame(&frame) {
                    delivered += 1;
                }
            }
            delivered
        })
    };

    session.destroy().unwrap();
    session.destroy().unwrap();
    let _ = producer.join().unwrap();

    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(!session.interface_created());
    assert!(!driver.is_bound());
    assert!(!driver.push_frame(&frame_with_row(&[2000])));
    assert_eq!(driver.count(DriverOp::Destroy), 1);
}
