//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（MockDevice 后台线程）
//! - 并发读写一致性测试

#[cfg(test)]
mod contract_tests {
    use contracts::{ChannelKind, DetectionBox, ImuSample, IMU_WIRE_LEN};

    #[test]
    fn test_channel_names_are_stable() {
        let names: Vec<&str> = ChannelKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            ["frame", "depth", "disparity", "rectified", "points", "detection", "imu"]
        );
    }

    #[test]
    fn test_wire_layouts() {
        let sample = ImuSample {
            timestamp: 2.0,
            accel: [1.0, 2.0, 3.0],
            gyro: [4.0, 5.0, 6.0],
        };
        let mut wire = [0.0; IMU_WIRE_LEN];
        sample.write_wire(&mut wire);
        assert_eq!(wire, [2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let b = DetectionBox {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
            score: 0.875,
            class_id: 1,
        };
        assert_eq!(b.to_wire(), [1, 2, 3, 4, 1, 875]);
        assert_eq!(b.class_name(), "PERSON");
    }
}

/// Scenarios driven by manual emission, fully deterministic
#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;

    use contracts::{ImuSample, StereoDevice};
    use device::{synthetic_depth, synthetic_stereo, MockDevice};
    use exchange::{status_code, Bridge, BridgeError, STATUS_TOO_SMALL};

    fn bridge_with_device() -> (Arc<MockDevice>, Bridge) {
        let device = Arc::new(MockDevice::new());
        let bridge = Bridge::new(device.clone() as Arc<dyn StereoDevice>);
        bridge.initialize(1, 25).unwrap();
        (device, bridge)
    }

    #[test]
    fn test_depth_in_millimeters() {
        let (device, bridge) = bridge_with_device();
        bridge.enable_depth(0).unwrap();
        device.emit_depth(&synthetic_depth(640, 400, 1.5, 0.1));

        assert_eq!(bridge.depth_size(), (640, 400));
        let mut depth = vec![0u16; 640 * 400];
        assert_eq!(bridge.take_depth(&mut depth).unwrap(), 640 * 400);
        assert!(depth.iter().all(|&d| d == 1500));

        // consumed exactly once
        let again = bridge.take_depth(&mut depth);
        assert_eq!(status_code(&again), 0);
        assert!(matches!(again, Err(BridgeError::NotReady { .. })));
    }

    #[test]
    fn test_imu_overflow_keeps_newest() {
        let (device, bridge) = bridge_with_device();
        bridge.enable_imu().unwrap();
        for i in 0..2005 {
            device.emit_imu(&ImuSample {
                timestamp: i as f64,
                ..Default::default()
            });
        }
        assert_eq!(bridge.imu_count(), 2000);

        let samples = bridge.take_imu(2000).unwrap();
        assert_eq!(samples.len(), 2000);
        assert_eq!(samples.first().unwrap().timestamp, 5.0);
        assert_eq!(samples.last().unwrap().timestamp, 2004.0);
        assert_eq!(bridge.imu_count(), 0);
        assert!(bridge.take_imu(10).unwrap().is_empty());
    }

    #[test]
    fn test_one_short_destination_writes_nothing() {
        let (device, bridge) = bridge_with_device();
        device.emit_camera(&synthetic_stereo(640, 400, true, false, 0, 0.0));

        let shape = bridge.frame_info();
        assert_eq!((shape.width, shape.height, shape.channels), (1280, 400, 1));

        let mut short = vec![0xAAu8; shape.len() - 1];
        let result = bridge.take_frame(&mut short);
        assert_eq!(status_code(&result), STATUS_TOO_SMALL);
        assert!(short.iter().all(|&b| b == 0xAA));

        // still pending for a correctly sized buffer
        let mut full = vec![0u8; shape.len()];
        assert_eq!(bridge.take_frame(&mut full).unwrap(), shape.len());
    }

    #[test]
    fn test_release_then_reinitialize() {
        let (device, bridge) = bridge_with_device();
        bridge.enable_depth(1).unwrap();
        bridge.release();
        assert!(!device.is_open());
        assert!(matches!(
            bridge.take_depth(&mut [0u16; 4]),
            Err(BridgeError::NotInitialized)
        ));

        bridge.initialize(2, 25).unwrap();
        assert_eq!(device.open_count(), 2);
        // channels start disabled again after a release
        assert!(matches!(
            bridge.take_depth(&mut [0u16; 4]),
            Err(BridgeError::ChannelNotEnabled { .. })
        ));
    }
}

/// Concurrent producer / consumer consistency
#[cfg(test)]
mod concurrency_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use frames::constant_frame;
    use contracts::StereoDevice;
    use device::MockDevice;
    use exchange::Bridge;

    mod frames {
        use contracts::{RawImage, StereoFrame};

        /// Stereo pair whose every pixel equals `value`
        pub fn constant_frame(width: u32, height: u32, value: u8) -> StereoFrame {
            let plane = || {
                RawImage::new(
                    width,
                    height,
                    1,
                    vec![value; (width * height) as usize],
                )
            };
            StereoFrame {
                timestamp: f64::from(value),
                left: plane(),
                right: Some(plane()),
            }
        }
    }

    /// A take never observes a mix of two stores
    #[test]
    fn test_no_torn_reads() {
        let device = Arc::new(MockDevice::new());
        let bridge = Arc::new(Bridge::new(device.clone() as Arc<dyn StereoDevice>));
        bridge.initialize(1, 25).unwrap();

        let (w, h) = (160u32, 100u32);
        let done = Arc::new(AtomicBool::new(false));

        let producer = {
            let device = device.clone();
            let done = done.clone();
            thread::spawn(move || {
                for i in 0..2000u32 {
                    device.emit_camera(&constant_frame(w, h, (i % 251) as u8));
                }
                done.store(true, Ordering::Release);
            })
        };

        let consumer = {
            let bridge = bridge.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut buf = vec![0u8; (w * h * 2) as usize];
                let mut taken = 0u64;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    if let Ok(n) = bridge.take_frame(&mut buf) {
                        let first = buf[0];
                        assert!(
                            buf[..n].iter().all(|&b| b == first),
                            "torn frame observed"
                        );
                        taken += 1;
                    }
                    if finished {
                        break;
                    }
                }
                taken
            })
        };

        producer.join().unwrap();
        let taken = consumer.join().unwrap();
        assert!(taken > 0);

        let stats = bridge.stats();
        let frame = stats.slot(contracts::ChannelKind::Frame).unwrap();
        assert_eq!(frame.stored, 2000);
        // every store is either taken once or overwritten unread, except
        // the one possibly still pending
        assert!(frame.taken + frame.overwritten >= 1999);
        assert!(frame.taken <= frame.stored);
        assert_eq!(stats.callbacks, 2000);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ChannelKind, DetectionBox, StereoDevice};
    use device::{MockConfig, MockDevice, StreamRates};
    use exchange::Bridge;

    const CONFIG: &str = r#"
[device]
fps = 100
imu_frequency_hz = 1000

[channels.depth]
enabled = true

[channels.points]
enabled = true

[channels.imu]
enabled = true

[channels.detection]
enabled = true

[detection]
max_boxes = 4
"#;

    /// End-to-end: config file -> streaming MockDevice -> Bridge -> consumer polls
    #[tokio::test]
    async fn test_e2e_streaming_session() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let device = Arc::new(MockDevice::streaming(MockConfig {
            detection_boxes: 6,
            ..MockConfig::from(&config.mock)
        }));
        let bridge = Arc::new(Bridge::from_config(
            device.clone() as Arc<dyn StereoDevice>,
            &config,
        ));
        bridge.initialize_with(config.device.settings()).unwrap();
        let enabled = bridge.enable_from_config(&config.channels).unwrap();
        assert_eq!(
            enabled,
            vec![
                ChannelKind::Depth,
                ChannelKind::Points,
                ChannelKind::Imu,
                ChannelKind::Detection
            ]
        );

        let consumer = {
            let bridge = bridge.clone();
            tokio::task::spawn_blocking(move || {
                let mut depth = vec![0u16; 640 * 400];
                let mut points = vec![0f32; 640 * 400 * 3];
                let mut boxes = [DetectionBox::default(); 16];
                let (mut got_depth, mut got_points, mut got_boxes, mut imu) =
                    (false, false, 0usize, 0usize);
                for _ in 0..400 {
                    got_depth |= bridge.take_depth(&mut depth).is_ok();
                    got_points |= bridge.take_points(&mut points).is_ok();
                    if let Ok(n) = bridge.take_detection_boxes(&mut boxes) {
                        got_boxes = n;
                    }
                    imu += bridge.take_imu(2000).map(|s| s.len()).unwrap_or(0);
                    if got_depth && got_points && got_boxes > 0 && imu > 0 {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                (got_depth, got_points, got_boxes, imu, depth[0])
            })
        };

        let (got_depth, got_points, boxes, imu, depth_mm) =
            tokio::time::timeout(Duration::from_secs(10), consumer)
                .await
                .expect("consumer timed out")
                .unwrap();

        assert!(got_depth, "no depth delivered");
        assert!(got_points, "no points delivered");
        assert_eq!(depth_mm, 1500);
        // truncated to the configured maximum
        assert_eq!(boxes, 4);
        assert!(imu > 0, "no IMU samples drained");

        bridge.release();
        assert!(!device.is_open());
        assert_eq!(device.worker_count(), 0);
    }

    /// Producer threads stop delivering once the bridge is released
    #[tokio::test]
    async fn test_release_stops_streaming() {
        let device = Arc::new(MockDevice::streaming(MockConfig {
            stream: Some(StreamRates {
                frame_hz: Some(200.0),
                imu_hz: None,
            }),
            ..Default::default()
        }));
        let bridge = Bridge::new(device.clone() as Arc<dyn StereoDevice>);
        bridge.initialize(1, 25).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let before = bridge.callback_count();
        assert!(before > 0, "camera producer not running");

        bridge.release();
        assert_eq!(device.worker_count(), 0);
        assert_eq!(bridge.callback_count(), 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(bridge.callback_count(), 0, "frames delivered after release");
        assert!(!bridge.is_initialized());
    }
}
