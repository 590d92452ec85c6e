//! Player kinematics validation

use drive_trace::simulation::{PlayerControls, PlayerKinematics, SimulationConfig, MAX_SPEED_LEVEL};

const DT: f32 = 1.0 / 60.0;

fn level(level: u8) -> PlayerControls {
    PlayerControls {
        speed_level: Some(level),
        ..PlayerControls::default()
    }
}

fn drive(player: &mut PlayerKinematics, controls: &PlayerControls, ticks: usize) {
    for _ in 0..ticks {
        player.apply_controls(controls, DT);
        player.update(DT);
    }
}

#[test]
fn test_player_starts_stationary_in_middle_lane() {
    let player = PlayerKinematics::new(&SimulationConfig::default()).unwrap();
    assert_eq!(player.x, 650.0);
    assert_eq!(player.lane(), 2);
    assert_eq!(player.speed, 0.0);
    assert_eq!(player.world_y, 0.0);
    assert_eq!(player.state().lane, 2);
}

#[test]
fn test_speed_levels_map_to_target_speed() {
    let player = PlayerKinematics::new(&SimulationConfig::default()).unwrap();
    assert_eq!(player.speed_for_level(0), 0.0);
    assert_eq!(player.speed_for_level(MAX_SPEED_LEVEL), 370.0);
    assert!((player.speed_for_level(3) - 370.0 / 3.0).abs() < 1e-3);
    // Levels above the top one are capped
    assert_eq!(player.speed_for_level(42), 370.0);
}

#[test]
fn test_acceleration_is_constant_rate_and_lands_on_target() {
    let mut player = PlayerKinematics::new(&SimulationConfig::default()).unwrap();
    player.apply_controls(&level(9), 1.0);
    player.update(1.0);
    assert_eq!(player.speed, 70.0);
    assert_eq!(player.acceleration, 70.0);

    drive(&mut player, &level(9), 400);
    assert_eq!(player.speed, 370.0);
    assert_eq!(player.acceleration, 0.0);

    drive(&mut player, &level(5), 1);
    assert!(player.speed < 370.0);
    assert_eq!(player.acceleration, -70.0);
}

#[test]
fn test_brake_decelerates_hard_and_resumes_target() {
    let config = SimulationConfig::default();
    let mut player = PlayerKinematics::new(&config).unwrap();
    drive(&mut player, &level(9), 400);
    assert_eq!(player.speed, 370.0);

    let braking = PlayerControls {
        speed_level: None,
        brake: true,
        steer: 0,
    };
    drive(&mut player, &braking, 1);
    assert!(player.is_braking());
    assert_eq!(player.target_speed, 0.0);
    // Brake impulse plus the normal deceleration toward zero
    let expected = 370.0 - 70.0 * 4.0 * DT - 70.0 * DT;
    assert!((player.speed - expected).abs() < 1e-3);

    drive(&mut player, &braking, 600);
    assert_eq!(player.speed, 0.0);

    drive(&mut player, &PlayerControls::default(), 1);
    assert!(!player.is_braking());
    assert_eq!(player.target_speed, 370.0);
}

#[test]
fn test_steering_turns_heading_and_stays_on_road() {
    let config = SimulationConfig::default();
    let road_width = config.world_frame().road_width();
    let half_width = config.player_half_width;
    let mut player = PlayerKinematics::new(&config).unwrap();
    drive(&mut player, &level(9), 400);

    let steer_right = PlayerControls {
        speed_level: Some(9),
        brake: false,
        steer: 1,
    };
    drive(&mut player, &steer_right, 1);
    assert!(player.heading > 0.0);

    drive(&mut player, &steer_right, 600);
    assert_eq!(player.heading, config.max_heading);
    assert_eq!(player.x, road_width - half_width);
    assert_eq!(player.lane(), 3);

    let steer_left = PlayerControls {
        steer: -1,
        ..steer_right
    };
    drive(&mut player, &steer_left, 600);
    assert_eq!(player.heading, -config.max_heading);
    assert_eq!(player.x, half_width);
    assert_eq!(player.lane(), 0);
}

#[test]
fn test_no_turning_while_stationary() {
    let mut player = PlayerKinematics::new(&SimulationConfig::default()).unwrap();
    let steer = PlayerControls {
        speed_level: Some(0),
        brake: false,
        steer: 1,
    };
    drive(&mut player, &steer, 60);
    assert_eq!(player.heading, 0.0);
    assert_eq!(player.x, 650.0);
}

#[test]
fn test_forward_distance_accumulates() {
    let mut player = PlayerKinematics::new(&SimulationConfig::default()).unwrap();
    drive(&mut player, &level(9), 400);
    let before = player.world_y;
    drive(&mut player, &level(9), 60);
    assert!((player.world_y - before - 370.0).abs() < 0.1);
}

#[test]
fn test_stop_zeroes_motion() {
    let mut player = PlayerKinematics::new(&SimulationConfig::default()).unwrap();
    drive(&mut player, &level(7), 120);
    assert!(player.speed > 0.0);

    player.stop();
    assert_eq!(player.speed, 0.0);
    assert_eq!(player.target_speed, 0.0);
    assert_eq!(player.state().speed, 0.0);
}

#[test]
fn test_invalid_player_configuration_is_rejected() {
    let config = SimulationConfig {
        brake_multiplier: 0.5,
        ..SimulationConfig::default()
    };
    assert!(PlayerKinematics::new(&config).is_err());
}
