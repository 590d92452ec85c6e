//! Recorded trajectory tables and replay playback
//!
//! Trajectory files are row-oriented CSV, ordered by frame then vehicle.
//! Three layouts are accepted and unified during ingestion into a single
//! target world-X per record:
//!
//! * `frame_id, vehicle_id, world_x, world_y, speed, action`
//! * `frame, vehicle_id, x_position, y_position, speed_px_per_s, relative_x, relative_y`
//! * lane-indexed rows carrying a `lane` column instead of a world-X
//!
//! The table is read once and never mutated, so it is shared behind an `Arc`.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use super::coordinates::CoordinateMapping;
use super::traffic_source::SourceUpdate;
use super::types::WorldFrame;
use super::vehicle::{TrafficAction, Vehicle};

/// One CSV row as found on disk, before unification
#[derive(Debug, Deserialize)]
struct RawTrajectoryRow {
    #[serde(default, alias = "frame")]
    frame_id: Option<f64>,
    #[serde(default)]
    vehicle_id: Option<f64>,
    #[serde(default, alias = "x_position")]
    world_x: Option<f32>,
    #[serde(default, alias = "y_position")]
    world_y: Option<f64>,
    #[serde(default)]
    lane: Option<f64>,
    #[serde(default, alias = "speed_px_per_s")]
    speed: Option<f32>,
    #[serde(default)]
    action: Option<String>,
}

/// A recorded observation of one vehicle in one data frame
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRecord {
    pub frame: u32,
    pub vehicle_id: u32,
    /// Lateral target in world-X, derived from the lane for lane-indexed rows
    pub world_x: Option<f32>,
    pub world_y: Option<f64>,
    pub speed: Option<f32>,
    pub action: TrafficAction,
}

impl TrajectoryRecord {
    pub fn new(frame: u32, vehicle_id: u32, world_x: f32, world_y: f64, speed: f32) -> Self {
        Self {
            frame,
            vehicle_id,
            world_x: Some(world_x),
            world_y: Some(world_y),
            speed: Some(speed),
            action: TrafficAction::Maintain,
        }
    }

    fn from_raw(
        raw: RawTrajectoryRow,
        frame: &WorldFrame,
        mapping: CoordinateMapping,
    ) -> Result<Self> {
        let frame_value = raw.frame_id.context("missing frame")?;
        if !frame_value.is_finite() || frame_value < 0.0 || frame_value > u32::MAX as f64 {
            bail!("invalid frame {}", frame_value);
        }
        let vehicle_value = raw.vehicle_id.context("missing vehicle_id")?;
        if !vehicle_value.is_finite()
            || vehicle_value < 0.0
            || vehicle_value > u32::MAX as f64
            || vehicle_value.fract() != 0.0
        {
            bail!("invalid vehicle_id {}", vehicle_value);
        }

        let world_x = match (raw.world_x, raw.lane) {
            (Some(x), _) => Some(mapping.map_x(x)),
            (None, Some(lane)) if lane.is_finite() => {
                Some(frame.lane_center(frame.clamp_lane(lane.floor() as i64)))
            }
            (None, Some(lane)) => bail!("invalid lane {}", lane),
            (None, None) => None,
        };

        Ok(Self {
            frame: frame_value.floor() as u32,
            vehicle_id: vehicle_value as u32,
            world_x,
            world_y: raw.world_y.map(|y| mapping.map_y(y)),
            speed: raw.speed,
            action: raw
                .action
                .as_deref()
                .map(|label| label.parse::<TrafficAction>().unwrap_or_default())
                .unwrap_or_default(),
        })
    }
}

/// Trajectory rows indexed by (frame, vehicle_id)
#[derive(Debug, Clone, Default)]
pub struct TrajectoryTable {
    frames: BTreeMap<u32, Vec<TrajectoryRecord>>,
    /// Earliest record of each vehicle, sorted by vehicle id
    first_records: Vec<TrajectoryRecord>,
    row_count: usize,
    skipped_rows: usize,
}

impl TrajectoryTable {
    /// Build a table from records in any order
    pub fn from_records(records: Vec<TrajectoryRecord>) -> Self {
        let mut frames: BTreeMap<u32, Vec<TrajectoryRecord>> = BTreeMap::new();
        let row_count = records.len();
        for record in records {
            frames.entry(record.frame).or_default().push(record);
        }

        let mut first_records: BTreeMap<u32, TrajectoryRecord> = BTreeMap::new();
        for rows in frames.values_mut() {
            // Stable sort keeps the file order of duplicate rows
            rows.sort_by_key(|r| r.vehicle_id);
            for row in rows.iter() {
                first_records.entry(row.vehicle_id).or_insert_with(|| row.clone());
            }
        }

        Self {
            frames,
            first_records: first_records.into_values().collect(),
            row_count,
            skipped_rows: 0,
        }
    }

    /// Parse a trajectory CSV from any reader
    ///
    /// Rows that cannot be parsed are skipped and counted; a missing or
    /// unreadable header is an error.
    pub fn from_reader<R: Read>(
        reader: R,
        frame: &WorldFrame,
        mapping: CoordinateMapping,
    ) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().context("Failed to read trajectory header")?.clone();
        let has_frame = headers.iter().any(|h| h == "frame_id" || h == "frame");
        if !has_frame || !headers.iter().any(|h| h == "vehicle_id") {
            bail!("Trajectory header lacks frame/vehicle_id columns: {:?}", headers);
        }

        let mut records = Vec::new();
        let mut skipped = 0;
        for (index, row) in reader.deserialize::<RawTrajectoryRow>().enumerate() {
            let parsed = row
                .map_err(anyhow::Error::from)
                .and_then(|raw| TrajectoryRecord::from_raw(raw, frame, mapping));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping malformed trajectory row {}: {:#}", index + 2, e);
                }
            }
        }

        let mut table = Self::from_records(records);
        table.skipped_rows = skipped;
        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(
        path: P,
        frame: &WorldFrame,
        mapping: CoordinateMapping,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open trajectory file {}", path.display()))?;
        Self::from_reader(file, frame, mapping)
            .with_context(|| format!("Failed to parse trajectory file {}", path.display()))
    }

    /// Load a table, degrading to an empty one when the data is unavailable
    pub fn load_or_empty<P: AsRef<Path>>(
        path: P,
        frame: &WorldFrame,
        mapping: CoordinateMapping,
    ) -> Self {
        match Self::from_path(path.as_ref(), frame, mapping) {
            Ok(table) => {
                info!(
                    "Loaded traffic data: {} entries, {} vehicles, max frame: {:?}",
                    table.row_count,
                    table.vehicle_count(),
                    table.max_frame()
                );
                table
            }
            Err(e) => {
                warn!("Trajectory data unavailable, replay traffic will be empty: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn max_frame(&self) -> Option<u32> {
        self.frames.keys().next_back().copied()
    }

    pub fn vehicle_count(&self) -> usize {
        self.first_records.len()
    }

    /// First recorded observation of every vehicle, by ascending id
    pub fn first_records(&self) -> &[TrajectoryRecord] {
        &self.first_records
    }

    pub fn records_at(&self, frame: u32) -> &[TrajectoryRecord] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last record for a vehicle in the given frame
    pub fn record_for(&self, frame: u32, vehicle_id: u32) -> Option<&TrajectoryRecord> {
        let rows = self.records_at(frame);
        let end = rows.partition_point(|r| r.vehicle_id <= vehicle_id);
        rows[..end].last().filter(|r| r.vehicle_id == vehicle_id)
    }
}

/// Virtual playback clock decoupled from render and recorded frame rates
///
/// Counts whole engine ticks so the data frame is exact: with ten ticks per
/// frame, tick 50 is data frame 5 with no accumulated rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    ticks: u64,
    ticks_per_frame: u32,
    max_frame: u32,
}

impl PlaybackClock {
    pub fn new(ticks_per_frame: u32, max_frame: u32) -> Self {
        Self {
            ticks: 0,
            ticks_per_frame: ticks_per_frame.max(1),
            max_frame,
        }
    }

    /// Move forward one tick, wrapping to 0 past the last recorded frame
    pub fn advance(&mut self) {
        self.ticks += 1;
        if self.ticks > self.max_frame as u64 * self.ticks_per_frame as u64 {
            self.ticks = 0;
        }
    }

    /// Recorded frame currently being played
    pub fn data_frame(&self) -> u32 {
        (self.ticks / self.ticks_per_frame as u64) as u32
    }

    /// Fractional playback position in data frames
    pub fn playback_frame(&self) -> f32 {
        self.ticks as f32 / self.ticks_per_frame as f32
    }

    pub fn max_frame(&self) -> u32 {
        self.max_frame
    }
}

/// Traffic driven by a recorded trajectory table
#[derive(Debug, Clone)]
pub struct ReplaySource {
    table: Arc<TrajectoryTable>,
    clock: PlaybackClock,
}

impl ReplaySource {
    pub fn new(table: Arc<TrajectoryTable>, ticks_per_frame: u32) -> Self {
        let max_frame = table.max_frame().unwrap_or(0);
        Self {
            table,
            clock: PlaybackClock::new(ticks_per_frame, max_frame),
        }
    }

    pub fn table(&self) -> &TrajectoryTable {
        &self.table
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Advance the playback clock once per engine tick
    pub fn begin_tick(&mut self) {
        if self.table.is_empty() {
            return;
        }
        let before = self.clock.data_frame();
        self.clock.advance();
        if self.clock.data_frame() < before {
            debug!("Replay wrapped to frame 0 after frame {}", before);
        }
    }

    /// Targets recorded for this vehicle in the current data frame
    ///
    /// Vehicles absent from the frame keep their previous targets.
    pub fn step(&self, vehicle: &Vehicle) -> Result<SourceUpdate> {
        let Some(recorded_id) = vehicle.recorded_id else {
            return Ok(SourceUpdate::default());
        };
        let frame = self.clock.data_frame();
        let Some(record) = self.table.record_for(frame, recorded_id) else {
            return Ok(SourceUpdate::default());
        };

        if let Some(speed) = record.speed {
            if !speed.is_finite() || speed < 0.0 {
                bail!(
                    "Record for vehicle {} at frame {} has invalid speed {}",
                    recorded_id,
                    frame,
                    speed
                );
            }
        }
        if let Some(x) = record.world_x {
            if !x.is_finite() {
                bail!(
                    "Record for vehicle {} at frame {} has invalid world_x {}",
                    recorded_id,
                    frame,
                    x
                );
            }
        }

        Ok(SourceUpdate {
            target_speed: record.speed,
            target_x: record.world_x,
            lane_change: None,
            action: Some(record.action),
        })
    }
}
