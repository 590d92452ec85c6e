//! Risk classification, swerve detection and warning events

use drive_trace::simulation::{
    PlayerState, ProximityMonitor, RiskLevel, SimulationConfig, SwerveDetector, SwerveState,
    TrafficAction, VehicleId, VehicleSnapshot, WarningEvent, WarningLog, WarningType,
};

const DT: f32 = 1.0 / 60.0;
const DT_SECS: f64 = 1.0 / 60.0;

fn snapshot(id: usize, x: f32, world_y: f64) -> VehicleSnapshot {
    VehicleSnapshot {
        id: VehicleId(id),
        recorded_id: None,
        lane: 0,
        x,
        world_y,
        relative_y: world_y as f32,
        speed: 100.0,
        action: TrafficAction::Maintain,
    }
}

/// A player between the slow and overspeed thresholds raises no speed warning
fn cruising_player(x: f32) -> PlayerState {
    PlayerState::new(x, 0, 0.0, 200.0)
}

#[test]
fn test_collision_takes_priority_over_proximity() {
    let monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();
    let vehicles = vec![snapshot(0, 300.0, 0.0), snapshot(1, 100.0, 90.0)];

    let (risk, distance, vehicle) = monitor.classify_risk(100.0, 0.0, &vehicles);

    assert_eq!(risk, RiskLevel::Collision);
    assert_eq!(distance, Some(90.0));
    assert_eq!(vehicle, Some(VehicleId(1)));
}

#[test]
fn test_risk_levels_by_distance() {
    let monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();

    let (risk, distance, _) = monitor.classify_risk(100.0, 0.0, &[snapshot(0, 100.0, 200.0)]);
    assert_eq!(risk, RiskLevel::Proximity);
    assert_eq!(distance, Some(200.0));

    let (risk, _, _) = monitor.classify_risk(100.0, 0.0, &[snapshot(0, 100.0, -1000.0)]);
    assert_eq!(risk, RiskLevel::Safe);

    let (risk, distance, vehicle) = monitor.classify_risk(100.0, 0.0, &[]);
    assert_eq!(risk, RiskLevel::Safe);
    assert_eq!(distance, None);
    assert_eq!(vehicle, None);
}

#[test]
fn test_distance_uses_both_axes() {
    let monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();
    // 60 across and 80 ahead is 100 away, exactly the collision distance
    let (risk, distance, _) = monitor.classify_risk(100.0, 0.0, &[snapshot(0, 160.0, 80.0)]);
    assert_eq!(risk, RiskLevel::Proximity);
    assert!((distance.unwrap() - 100.0).abs() < 1e-4);
}

#[test]
fn test_warning_events_fire_on_rising_edge_only() {
    let mut monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();
    let player = cruising_player(100.0);
    let close = vec![snapshot(0, 100.0, 200.0)];
    let far = vec![snapshot(0, 100.0, 5000.0)];

    let first = monitor.evaluate(&player, &close, DT);
    assert!(first.raised(WarningType::Proximity));
    assert_eq!(first.events.len(), 1);

    let second = monitor.evaluate(&player, &close, DT);
    assert!(second.is_active(WarningType::Proximity));
    assert!(second.events.is_empty());

    let cleared = monitor.evaluate(&player, &far, DT);
    assert_eq!(cleared.risk, RiskLevel::Safe);
    assert!(cleared.active.is_empty());

    let again = monitor.evaluate(&player, &close, DT);
    assert!(again.raised(WarningType::Proximity));
    assert_eq!(monitor.raised_count(WarningType::Proximity), 2);
    assert_eq!(monitor.total_raised(), 2);
}

#[test]
fn test_escalation_from_proximity_to_collision_raises_collision() {
    let mut monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();
    let player = cruising_player(100.0);

    monitor.evaluate(&player, &[snapshot(0, 100.0, 200.0)], DT);
    let hit = monitor.evaluate(&player, &[snapshot(0, 100.0, 50.0)], DT);

    assert_eq!(hit.risk, RiskLevel::Collision);
    assert!(hit.raised(WarningType::Collision));
    assert!(!hit.is_active(WarningType::Proximity));
    assert_eq!(hit.events[0].message, "Collision! You hit another vehicle.");
}

#[test]
fn test_single_spike_does_not_swerve() {
    let mut detector = SwerveDetector::new(2.0, 0.5, 10);
    let mut now = 0.0;
    detector.update(0.0, now);

    now += DT_SECS;
    assert!(matches!(detector.update(10.0, now), SwerveState::Active { .. }));

    for tick in 0..11 {
        now += DT_SECS;
        let state = detector.update(10.0, now);
        assert_ne!(state, SwerveState::Swerving);
        if tick < 9 {
            assert!(matches!(state, SwerveState::Active { .. }));
        }
    }
    assert_eq!(detector.state(), SwerveState::Stable);
}

#[test]
fn test_sustained_movement_escalates_and_clears() {
    let mut detector = SwerveDetector::new(2.0, 0.5, 10);
    let mut now = 0.0;
    let mut x = 0.0;
    detector.update(x, now);

    for _ in 0..60 {
        now += DT_SECS;
        x += 5.0;
        detector.update(x, now);
    }
    assert!(detector.is_swerving());

    for _ in 0..9 {
        now += DT_SECS;
        assert_eq!(detector.update(x, now), SwerveState::Swerving);
    }
    now += DT_SECS;
    assert_eq!(detector.update(x, now), SwerveState::Stable);
}

#[test]
fn test_short_movement_stays_active() {
    let mut detector = SwerveDetector::new(2.0, 0.5, 10);
    let mut now = 0.0;
    let mut x = 0.0;
    detector.update(x, now);

    // Under half a second of movement
    for _ in 0..20 {
        now += DT_SECS;
        x += 5.0;
        detector.update(x, now);
    }
    assert!(matches!(detector.state(), SwerveState::Active { .. }));
}

#[test]
fn test_swerving_raised_once_while_sustained() {
    let mut monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();
    let mut x = 100.0;
    let mut swerving_events = 0;
    let mut swerving_ticks = 0;

    for _ in 0..90 {
        x += 5.0;
        let assessment = monitor.evaluate(&cruising_player(x), &[], DT);
        swerving_events += assessment
            .events
            .iter()
            .filter(|e| e.warning_type == WarningType::Swerving)
            .count();
        if assessment.is_active(WarningType::Swerving) {
            swerving_ticks += 1;
        }
    }

    assert_eq!(swerving_events, 1);
    assert!(swerving_ticks > 30);
    assert_eq!(monitor.raised_count(WarningType::Swerving), 1);
}

#[test]
fn test_speed_warnings() {
    let config = SimulationConfig::default();
    let cases = [
        (0.0, Some(WarningType::Stopped)),
        (100.0, Some(WarningType::SlowDriving)),
        (200.0, None),
        (300.0, Some(WarningType::Overspeeding)),
    ];

    for (speed, expected) in cases {
        let mut monitor = ProximityMonitor::new(&config).unwrap();
        let assessment = monitor.evaluate(&PlayerState::new(100.0, 0, 0.0, speed), &[], DT);
        let speed_warnings: Vec<WarningType> = assessment
            .active
            .iter()
            .copied()
            .filter(|t| {
                matches!(
                    t,
                    WarningType::Stopped | WarningType::SlowDriving | WarningType::Overspeeding
                )
            })
            .collect();
        assert_eq!(speed_warnings, expected.into_iter().collect::<Vec<_>>(), "speed {}", speed);
    }
}

#[test]
fn test_monitor_clock_accumulates() {
    let mut monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();
    for _ in 0..30 {
        monitor.evaluate(&cruising_player(100.0), &[], 0.5);
    }
    assert!((monitor.time() - 15.0).abs() < 1e-4);
}

#[test]
fn test_session_clock_holds_over_an_hour() {
    let mut monitor = ProximityMonitor::new(&SimulationConfig::default()).unwrap();
    let ticks = 60 * 60 * 60;
    for _ in 0..ticks {
        monitor.evaluate(&cruising_player(100.0), &[], DT);
    }
    let expected = ticks as f64 * DT as f64;
    assert!((monitor.time() - expected).abs() < 1e-5, "clock drifted to {}", monitor.time());
}

#[test]
fn test_swerve_timing_late_in_session() {
    let mut detector = SwerveDetector::new(2.0, 0.5, 10);
    let mut now = 10.0 * 3600.0;
    let mut x = 0.0;
    detector.update(x, now);

    for _ in 0..25 {
        now += DT_SECS;
        x += 5.0;
        detector.update(x, now);
    }
    assert!(matches!(detector.state(), SwerveState::Active { .. }));

    for _ in 0..15 {
        now += DT_SECS;
        x += 5.0;
        detector.update(x, now);
    }
    assert!(detector.is_swerving());
}

#[test]
fn test_warning_log_writes_csv_rows() {
    let path = std::env::temp_dir().join(format!(
        "drive_trace_warnings_{}.csv",
        std::process::id()
    ));
    let player = PlayerState::new(130.0, 0, 42.0, 180.0);

    let mut log = WarningLog::create(&path).unwrap();
    log.append(&WarningEvent::new(1.5, WarningType::Collision, &player))
        .unwrap();
    log.append_all(&[WarningEvent::new(2.0, WarningType::SlowDriving, &player)])
        .unwrap();
    assert_eq!(log.rows_written(), 2);
    drop(log);

    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let lines: Vec<&str> = contents.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "timestamp,warning_type,message,player_speed,player_x,player_y"
    );
    assert!(lines[1].starts_with("1.5,COLLISION,"));
    assert!(lines[1].ends_with(",180.0,130.0,42.0"));
    assert!(lines[2].contains("SLOW_DRIVING"));
}

#[test]
fn test_warning_log_to_memory() {
    let mut log = WarningLog::from_writer(Vec::new());
    log.append(&WarningEvent::new(
        0.25,
        WarningType::Overspeeding,
        &PlayerState::new(10.0, 0, 0.0, 300.0),
    ))
    .unwrap();
    assert_eq!(log.rows_written(), 1);
}
