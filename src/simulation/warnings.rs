//! Driving warnings and the append-only warning log
//!
//! The log gets one CSV row per newly raised warning:
//! `timestamp,warning_type,message,player_speed,player_x,player_y`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::types::PlayerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningType {
    Collision,
    Proximity,
    Swerving,
    Stopped,
    SlowDriving,
    Overspeeding,
}

impl WarningType {
    pub const ALL: [WarningType; 6] = [
        WarningType::Collision,
        WarningType::Proximity,
        WarningType::Swerving,
        WarningType::Stopped,
        WarningType::SlowDriving,
        WarningType::Overspeeding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::Collision => "COLLISION",
            WarningType::Proximity => "PROXIMITY",
            WarningType::Swerving => "SWERVING",
            WarningType::Stopped => "STOPPED",
            WarningType::SlowDriving => "SLOW_DRIVING",
            WarningType::Overspeeding => "OVERSPEEDING",
        }
    }

    /// Driver-facing text
    pub fn message(&self) -> &'static str {
        match self {
            WarningType::Collision => "Collision! You hit another vehicle.",
            WarningType::Proximity => "Too close to another vehicle. Keep a safe distance.",
            WarningType::Swerving => "Swerving detected. Keep a steady line in your lane.",
            WarningType::Stopped => "Stopped: Safely pull over to the left if you want to stop.",
            WarningType::SlowDriving => "Driving slow on highways isn't safe.",
            WarningType::Overspeeding => "Overspeeding! Slow down to avoid accidents.",
        }
    }
}

/// A warning raised on a given tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningEvent {
    /// Session time in seconds
    pub timestamp: f64,
    pub warning_type: WarningType,
    pub message: String,
    pub player_speed: f32,
    pub player_x: f32,
    pub player_y: f64,
}

impl WarningEvent {
    pub fn new(timestamp: f64, warning_type: WarningType, player: &PlayerState) -> Self {
        Self {
            timestamp,
            warning_type,
            message: warning_type.message().to_string(),
            player_speed: player.speed,
            player_x: player.x,
            player_y: player.world_y,
        }
    }
}

/// CSV sink for warning events
pub struct WarningLog<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl WarningLog<File> {
    /// Create (or truncate) a log file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create warning log {}", path.display()))?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> WarningLog<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            rows: 0,
        }
    }

    pub fn append(&mut self, event: &WarningEvent) -> Result<()> {
        self.writer
            .serialize(event)
            .context("Failed to write warning event")?;
        self.writer.flush().context("Failed to flush warning log")?;
        self.rows += 1;
        Ok(())
    }

    pub fn append_all<'a, I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a WarningEvent>,
    {
        for event in events {
            self.append(event)?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }
}
