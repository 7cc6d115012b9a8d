//! iRacing shared memory access
//!
//! Maps the simulator's telemetry region and its data-valid event the same way
//! the official C++ SDK does. Parsing happens in [`crate::schema`]; this module
//! only hands out bytes and waits for the event.
//!
//! # Usage
//!
//! ```rust,ignore
//! use livetiming::windows::MappedRegion;
//! use livetiming::{DecoderConfig, TelemetryDecoder};
//!
//! let region = MappedRegion::open()?;
//! let mut decoder = TelemetryDecoder::new(region, DecoderConfig::default());
//! decoder.poll(std::time::Duration::from_millis(100)).await?;
//! ```

mod region;

pub use region::{IRSDK_DATAVALIDEVENTNAME, IRSDK_MEMMAPFILENAME, IRSDK_MEMMAPFILESIZE, MappedRegion};
