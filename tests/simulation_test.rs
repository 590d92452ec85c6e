use std::process::{Command, Output};

fn run_simulation(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_drive_trace"))
        .args(args)
        .env("RUST_LOG", "warn,drive_trace=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that the headless simulation runs to completion
#[test]
fn test_headless_simulation_runs() {
    let output = run_simulation(&["--ticks", "600", "--seed", "7"]);

    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
    assert!(stderr.contains("Total ticks: 600"), "Wrong tick count. stderr: {}", stderr);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Driving Simulation Summary ==="));
}

/// Test that simulation statistics are logged
#[test]
fn test_simulation_statistics_logged() {
    let output = run_simulation(&["--ticks", "300", "--seed", "1"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for statistic in [
        "Traffic mode: procedural",
        "Vehicles in pool:",
        "Total vehicles recycled:",
        "Overlap corrections:",
        "Skipped vehicle updates:",
        "Warnings raised:",
        "Collisions:",
    ] {
        assert!(stderr.contains(statistic), "Missing '{}' statistic", statistic);
    }
}

/// Test that the pool size follows the requested density
#[test]
fn test_pool_size_follows_density() {
    let output = run_simulation(&["--ticks", "60", "--seed", "3", "--vehicles-per-lane", "5"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let pool_line = stderr
        .lines()
        .find(|line| line.contains("Vehicles in pool:"))
        .expect("Could not find 'Vehicles in pool' line");

    // Parse the number - handle log format with timestamp
    let parts: Vec<&str> = pool_line.split("Vehicles in pool:").collect();
    let pool_size: usize = parts
        .get(1)
        .and_then(|s| s.trim().parse().ok())
        .expect("Could not parse pool size");

    assert_eq!(pool_size, 20);
}

/// Test that a missing replay file degrades to empty traffic
#[test]
fn test_missing_replay_file_is_not_fatal() {
    let output = run_simulation(&[
        "--ticks",
        "60",
        "--replay",
        "/definitely/missing/trajectories.csv",
    ]);

    assert!(
        output.status.success(),
        "Simulation failed without replay data. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Trajectory data unavailable"));
    assert!(stderr.contains("Traffic mode: replay"));
    assert!(stderr.contains("Vehicles in pool: 0"));
}

/// Test that raised warnings land in the warning log
#[test]
fn test_warning_log_written() {
    let path = std::env::temp_dir().join(format!(
        "drive_trace_cli_warnings_{}.csv",
        std::process::id()
    ));
    let path_arg = path.to_string_lossy().to_string();

    let output = run_simulation(&["--ticks", "120", "--seed", "5", "--warnings-log", &path_arg]);
    assert!(output.status.success(), "Simulation failed to run");

    let contents = std::fs::read_to_string(&path).expect("Warning log was not created");
    std::fs::remove_file(&path).ok();

    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("timestamp,warning_type,message,player_speed,player_x,player_y")
    );
    // The player pulls away from a standstill, well under highway speed
    assert!(contents.contains("SLOW_DRIVING"));
}

/// Test that a generated recording can be replayed
#[test]
fn test_generated_recording_replays() {
    let path = std::env::temp_dir().join(format!(
        "drive_trace_cli_generated_{}.csv",
        std::process::id()
    ));
    let path_arg = path.to_string_lossy().to_string();

    let output = run_simulation(&[
        "--generate",
        &path_arg,
        "--generate-frames",
        "30",
        "--seed",
        "4",
    ]);
    assert!(
        output.status.success(),
        "Generation failed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Generated 240 trajectory rows over 30 frames"));
    assert!(!stderr.contains("SIMULATION COMPLETE"));

    let output = run_simulation(&["--ticks", "120", "--replay", &path_arg]);
    std::fs::remove_file(&path).ok();
    assert!(output.status.success(), "Replay of generated file failed");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Loaded traffic data: 240 entries, 8 vehicles"));
    assert!(stderr.contains("Vehicles in pool: 8"));
    assert!(stderr.contains("Skipped vehicle updates: 0"));
}
