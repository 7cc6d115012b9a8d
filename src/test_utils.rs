//! Test utilities for building synthetic telemetry regions
//!
//! [`RegionBuilder`] lays out a complete iRacing-style region (header, session
//! YAML, descriptor table, rotating value buffers) in a [`MemoryRegion`], and
//! [`TelemetryFixture`] lets a test play the simulator: write values, bump the
//! data-version counter, rotate buffers, drop the connected bit.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::HashMap;
use std::sync::Arc;

use crate::region::{MemoryRegion, SignalMode};
use crate::schema::header::{HEADER_SIZE, IRSDK_STATUS_CONNECTED, IRSDK_VER};
use crate::schema::variables::VAR_HEADER_SIZE;
use crate::types::VariableType;

/// Bytes reserved for the session YAML block.
pub const SESSION_CAPACITY: usize = 32 * 1024;

/// Session YAML covering a two-session weekend with a pace car, three human
/// drivers, a spectator and an AI car. `UserName` values are unquoted the way
/// iRacing writes them.
pub const SAMPLE_SESSION_YAML: &str = "---
WeekendInfo:
 TrackName: roadatlanta full
 TrackID: 127
 TrackLength: 4.05 km
 TrackDisplayName: Road Atlanta
 TrackConfigName: Full Course
 TrackType: road course
 SeriesID: 231
 SeasonID: 4611
 SessionID: 180000001
 SubSessionID: 4242
 LeagueID: 0
 Official: 1
 RaceWeek: 3
 EventType: Race
 Category: Road
 SimMode: full
 TeamRacing: 0
 NumCarClasses: 2
 NumCarTypes: 3

SessionInfo:
 CurrentSessionNum: 1
 Sessions:
 - SessionNum: 0
   SessionLaps: unlimited
   SessionTime: 600.0000 sec
   SessionType: Practice
   SessionName: PRACTICE
 - SessionNum: 1
   SessionLaps: 20
   SessionTime: unlimited
   SessionType: Race
   SessionName: RACE

DriverInfo:
 DriverCarIdx: 1
 DriverUserID: 1001
 PaceCarIdx: 0
 Drivers:
 - CarIdx: 0
   UserName: Pace Car
   UserID: -1
   CarNumberRaw: 0
   CarClassID: 11
   CarID: 11
   CarIsPaceCar: 1
   CarIsAI: 0
   IRating: 0
   ClubID: 0
   IsSpectator: 0
 - CarIdx: 1
   UserName: O'Connor, Mike
   AbbrevName: O'Connor, M
   Initials: MO
   UserID: 1001
   TeamName: O'Connor Racing
   CarNumberRaw: 7
   CarClassID: 74
   CarID: 132
   CarIsPaceCar: 0
   CarIsAI: 0
   IRating: 2150
   ClubID: 37
   IsSpectator: 0
   CarDesignStr: ,ff0000,00ff00,0000ff
 - CarIdx: 2
   UserName: Jane Doe
   UserID: 1002
   CarNumberRaw: 23
   CarClassID: 74
   CarID: 132
   CarIsPaceCar: 0
   CarIsAI: 0
   IRating: 3400
   ClubID: 12
   IsSpectator: 0
 - CarIdx: 3
   UserName: Sam Watcher
   UserID: 1003
   CarNumberRaw: 0
   CarClassID: 0
   CarID: 0
   CarIsPaceCar: 0
   CarIsAI: 0
   IRating: 1350
   ClubID: 12
   IsSpectator: 1
 - CarIdx: 4
   UserName: AI Bot
   UserID: 1004
   CarNumberRaw: 44
   CarClassID: 87
   CarID: 143
   CarIsPaceCar: 0
   CarIsAI: 1
   IRating: 0
   ClubID: 0
   IsSpectator: 0
 - CarIdx: 5
   UserName: Max Power
   UserID: 1005
   CarNumberRaw: 99
   CarClassID: 87
   CarID: 143
   CarIsPaceCar: 0
   CarIsAI: 0
   IRating: 1800
   ClubID: 37
   IsSpectator: 0
";

/// Number of per-car slots in `CarIdx*` arrays.
pub const CAR_SLOTS: usize = 64;

#[derive(Debug, Clone)]
struct FixtureVar {
    name: String,
    data_type: VariableType,
    count: usize,
}

/// Lays out a synthetic telemetry region.
#[derive(Debug, Clone)]
pub struct RegionBuilder {
    variables: Vec<FixtureVar>,
    session_yaml: String,
    version: i32,
    connected: bool,
    num_buf: usize,
    signal_mode: SignalMode,
}

impl Default for RegionBuilder {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            session_yaml: SAMPLE_SESSION_YAML.to_string(),
            version: 1,
            connected: true,
            num_buf: 3,
            signal_mode: SignalMode::Notify,
        }
    }
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The variables the standings relay reads, plus a few extra kinds.
    pub fn standings() -> Self {
        Self::new()
            .variable("SessionNum", VariableType::Int32, 1)
            .variable("SessionState", VariableType::Int32, 1)
            .variable("SessionTime", VariableType::Float64, 1)
            .variable("Speed", VariableType::Float32, 1)
            .variable("IsOnTrack", VariableType::Bool, 1)
            .variable("SessionFlags", VariableType::BitField, 1)
            .variable("CarIdxClassPosition", VariableType::Int32, CAR_SLOTS)
            .variable("CarIdxLapCompleted", VariableType::Int32, CAR_SLOTS)
    }

    pub fn variable(mut self, name: &str, data_type: VariableType, count: usize) -> Self {
        self.variables.push(FixtureVar { name: name.to_string(), data_type, count });
        self
    }

    pub fn session_yaml(mut self, yaml: &str) -> Self {
        self.session_yaml = yaml.to_string();
        self
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    pub fn buffers(mut self, num_buf: usize) -> Self {
        self.num_buf = num_buf.clamp(1, 4);
        self
    }

    pub fn signal_mode(mut self, mode: SignalMode) -> Self {
        self.signal_mode = mode;
        self
    }

    /// Lay out the region and return the fixture driving it.
    pub fn build(self) -> TelemetryFixture {
        let mut var_offsets = HashMap::new();
        let mut buf_len = 0usize;
        for var in &self.variables {
            let size = var.data_type.size();
            buf_len = buf_len.div_ceil(size) * size;
            var_offsets.insert(var.name.clone(), (var.data_type, buf_len, var.count));
            buf_len += size * var.count;
        }
        let buf_len = buf_len.max(4).div_ceil(16) * 16;

        let session_offset = HEADER_SIZE;
        let var_header_offset = session_offset + SESSION_CAPACITY;
        let first_buf = var_header_offset + self.variables.len() * VAR_HEADER_SIZE;
        let first_buf = first_buf.div_ceil(16) * 16;
        let buf_offsets: Vec<usize> = (0..self.num_buf).map(|i| first_buf + i * buf_len).collect();
        let total = first_buf + self.num_buf * buf_len;

        let mut bytes = vec![0u8; total];
        let put = |bytes: &mut Vec<u8>, offset: usize, value: i32| {
            bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        };

        put(&mut bytes, 0, IRSDK_VER);
        put(&mut bytes, 4, if self.connected { IRSDK_STATUS_CONNECTED } else { 0 });
        put(&mut bytes, 8, 60);
        put(&mut bytes, 12, self.version);
        put(&mut bytes, 16, SESSION_CAPACITY as i32);
        put(&mut bytes, 20, session_offset as i32);
        put(&mut bytes, 24, self.variables.len() as i32);
        put(&mut bytes, 28, var_header_offset as i32);
        put(&mut bytes, 32, self.num_buf as i32);
        put(&mut bytes, 36, buf_len as i32);
        for (i, offset) in buf_offsets.iter().enumerate() {
            put(&mut bytes, 48 + i * 16, i as i32 + 1);
            put(&mut bytes, 52 + i * 16, *offset as i32);
        }

        let yaml = self.session_yaml.as_bytes();
        assert!(yaml.len() < SESSION_CAPACITY, "session YAML too large for fixture");
        bytes[session_offset..session_offset + yaml.len()].copy_from_slice(yaml);

        for (i, var) in self.variables.iter().enumerate() {
            let base = var_header_offset + i * VAR_HEADER_SIZE;
            let (_, offset, count) = var_offsets[&var.name];
            put(&mut bytes, base, irsdk_code(var.data_type));
            put(&mut bytes, base + 4, offset as i32);
            put(&mut bytes, base + 8, count as i32);
            bytes[base + 16..base + 16 + var.name.len()].copy_from_slice(var.name.as_bytes());
        }

        let layout = Layout {
            var_offsets,
            buf_offsets,
            session_offset,
            var_header_offset,
            region_len: total,
        };

        TelemetryFixture {
            region: MemoryRegion::with_mode(bytes, self.signal_mode),
            layout: Arc::new(layout),
        }
    }
}

fn irsdk_code(data_type: VariableType) -> i32 {
    match data_type {
        VariableType::Char => 0,
        VariableType::Bool => 1,
        VariableType::Int32 => 2,
        VariableType::BitField => 3,
        VariableType::Float32 => 4,
        VariableType::Float64 => 5,
    }
}

#[derive(Debug)]
struct Layout {
    var_offsets: HashMap<String, (VariableType, usize, usize)>,
    buf_offsets: Vec<usize>,
    session_offset: usize,
    var_header_offset: usize,
    region_len: usize,
}

/// Writer side of a synthetic region.
///
/// Values are written into every value buffer, so whichever buffer the
/// decoder picks holds them.
#[derive(Debug, Clone)]
pub struct TelemetryFixture {
    region: MemoryRegion,
    layout: Arc<Layout>,
}

impl TelemetryFixture {
    /// A handle onto the same bytes, for the decoder to own.
    pub fn region(&self) -> MemoryRegion {
        self.region.clone()
    }

    pub fn region_len(&self) -> usize {
        self.layout.region_len
    }

    pub fn var_header_offset(&self) -> usize {
        self.layout.var_header_offset
    }

    pub fn buffer_offsets(&self) -> &[usize] {
        &self.layout.buf_offsets
    }

    fn write_element(&self, name: &str, index: usize, bytes: &[u8]) {
        let (data_type, offset, count) = self.layout.var_offsets[name];
        assert!(index < count, "{} has {} elements", name, count);
        for buf in &self.layout.buf_offsets {
            self.region
                .write_at(buf + offset + index * data_type.size(), bytes)
                .expect("fixture write in bounds");
        }
    }

    pub fn set_i32(&self, name: &str, value: i32) {
        self.write_element(name, 0, &value.to_le_bytes());
    }

    pub fn set_f32(&self, name: &str, value: f32) {
        self.write_element(name, 0, &value.to_le_bytes());
    }

    pub fn set_f64(&self, name: &str, value: f64) {
        self.write_element(name, 0, &value.to_le_bytes());
    }

    pub fn set_bool(&self, name: &str, value: bool) {
        self.write_element(name, 0, &[u8::from(value)]);
    }

    /// Write `values` to the leading elements of an array variable.
    pub fn set_i32s(&self, name: &str, values: &[i32]) {
        for (i, value) in values.iter().enumerate() {
            self.write_element(name, i, &value.to_le_bytes());
        }
    }

    /// Set the data-version counter.
    pub fn set_version(&self, version: i32) {
        self.region.write_i32(12, version).expect("header in bounds");
    }

    /// Rewrite the session YAML and bump the data-version counter to `version`.
    pub fn set_session_yaml(&self, yaml: &str, version: i32) {
        let mut block = vec![0u8; SESSION_CAPACITY];
        block[..yaml.len()].copy_from_slice(yaml.as_bytes());
        self.region.write_at(self.layout.session_offset, &block).expect("session block in bounds");
        self.set_version(version);
    }

    pub fn set_connected(&self, connected: bool) {
        let status = if connected { IRSDK_STATUS_CONNECTED } else { 0 };
        self.region.write_i32(4, status).expect("header in bounds");
    }

    /// Overwrite a raw header field.
    pub fn set_header_field(&self, offset: usize, value: i32) {
        self.region.write_i32(offset, value).expect("header in bounds");
    }

    /// Mark the oldest buffer as the newest, the way the simulator rotates.
    pub fn advance_tick(&self) -> i32 {
        let bytes = self.region.snapshot();
        let ticks: Vec<i32> = (0..self.layout.buf_offsets.len())
            .map(|i| {
                i32::from_le_bytes(bytes[48 + i * 16..52 + i * 16].try_into().expect("4 bytes"))
            })
            .collect();
        let newest = ticks.iter().copied().max().unwrap_or(0) + 1;
        let oldest = ticks
            .iter()
            .enumerate()
            .min_by_key(|(_, tick)| **tick)
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.region.write_i32(48 + oldest * 16, newest).expect("header in bounds");
        newest
    }

    /// Wake a decoder waiting on the region.
    pub fn signal(&self) {
        self.region.signal();
    }
}
