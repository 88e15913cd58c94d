//! adsb-core: Mode S / ADS-B frame decoding, CRC/ICAO recovery, CPR
//! position resolution, and a fixed-capacity LRU aircraft tracker.
//!
//! No async, no I/O — just the decode pipeline and in-memory state. Raw
//! radio acquisition, CLI, and transport live in sibling crates; this is
//! the shared core.

pub mod cpr;
pub mod crc;
pub mod decode;
pub mod frame;
pub mod tracker;
pub mod types;

pub use frame::{bits, decode_frame, Frame};
pub use tracker::{SharedTracker, Tracker, TrackerConfig};
pub use types::*;
