//! Shared types, error enum, and the Observation/Aircraft data model for
//! adsb-core.

use serde::Serialize;
use thiserror::Error;

/// All hard errors produced by adsb-core.
///
/// Soft absences (undefined altitude, a declined CPR resolution, an
/// implied ICAO with no prior direct sighting) are never represented here —
/// they surface as `None` fields on [`Observation`] or are silently dropped,
/// per the pipeline's "tolerate bad frames" design.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdsbError {
    #[error("frame length {actual} bits incompatible with DF {df}")]
    LengthMismatch { df: u8, actual: usize },
    #[error("CRC validation failed for DF {df}")]
    CrcInvalid { df: u8 },
    #[error("unrecognized downlink format: {0}")]
    UnknownDf(u8),
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AdsbError>;

// ---------------------------------------------------------------------------
// Downlink Format metadata
// ---------------------------------------------------------------------------

/// Metadata for a Downlink Format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfInfo {
    pub name: &'static str,
    pub bits: usize,
}

/// Known Downlink Format table. Short frames are 56 bits, long frames 112.
pub const DF_TABLE: &[(u8, DfInfo)] = &[
    (0, DfInfo { name: "Short air-air surveillance", bits: 56 }),
    (4, DfInfo { name: "Surveillance altitude reply", bits: 56 }),
    (5, DfInfo { name: "Surveillance identity reply", bits: 56 }),
    (11, DfInfo { name: "All-call reply", bits: 56 }),
    (16, DfInfo { name: "Long air-air surveillance", bits: 112 }),
    (17, DfInfo { name: "ADS-B extended squitter", bits: 112 }),
    (18, DfInfo { name: "TIS-B / ADS-R", bits: 112 }),
    (19, DfInfo { name: "Military extended squitter", bits: 112 }),
    (20, DfInfo { name: "Comm-B altitude reply", bits: 112 }),
    (21, DfInfo { name: "Comm-B identity reply", bits: 112 }),
    (24, DfInfo { name: "Comm-D extended length message", bits: 112 }),
];

/// Look up DF metadata. Returns `None` for unrecognized DFs.
pub fn df_info(df: u8) -> Option<&'static DfInfo> {
    DF_TABLE.iter().find(|(d, _)| *d == df).map(|(_, info)| info)
}

// ---------------------------------------------------------------------------
// ICAO address
// ---------------------------------------------------------------------------

/// 24-bit ICAO aircraft address, held in the low 24 bits of a `u32`.
pub type Icao = u32;

/// Where an ICAO address on an [`Observation`] came from.
///
/// `ImpliedFromCrc` addresses are recovered from the CRC residual rather
/// than transmitted directly, and are only trustworthy once corroborated
/// by a prior direct sighting in the Tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IcaoSource {
    Direct,
    ImpliedFromCrc,
}

/// Tri-state airborne/surface flag. Distinct from `Option<bool>` so that
/// "never reported" and "reported, value unknown" both collapse to
/// `Unknown` without losing the type-level distinction from `Yes`/`No`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Airborne {
    Yes,
    No,
    Unknown,
}

impl Default for Airborne {
    fn default() -> Self {
        Airborne::Unknown
    }
}

/// Format ICAO address as 6-char uppercase hex string.
pub fn icao_to_string(icao: Icao) -> String {
    format!("{:06X}", icao & 0xFF_FFFF)
}

/// Parse a 6-char hex string into an ICAO address.
pub fn icao_from_hex(hex: &str) -> Option<Icao> {
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().map(|v| v & 0xFF_FFFF)
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ADS-B callsign character set
// ---------------------------------------------------------------------------

/// ADS-B character set for callsign encoding (6 bits per character).
/// `'#'` marks codes with no assigned character; these are skipped rather
/// than emitted.
pub const CALLSIGN_CHARSET: &[u8; 64] =
    b"#ABCDEFGHIJKLMNOPQRSTUVWXYZ##### ###############0123456789######";

// ---------------------------------------------------------------------------
// CPR half-frame
// ---------------------------------------------------------------------------

/// A single even- or odd-format CPR half-frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CprHalf {
    pub lat17: u32,
    pub lon17: u32,
    pub timestamp: f64,
    pub airborne: Airborne,
    pub valid: bool,
}

impl CprHalf {
    pub const fn empty() -> Self {
        CprHalf { lat17: 0, lon17: 0, timestamp: 0.0, airborne: Airborne::Unknown, valid: false }
    }
}

// ---------------------------------------------------------------------------
// Observation — output of FrameDecoder, input to Tracker
// ---------------------------------------------------------------------------

/// A fully- or partially-populated decode result for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub df: u8,
    pub icao: Icao,
    pub icao_source: IcaoSource,
    pub altitude_ft: Option<i32>,
    pub squawk: Option<u16>,
    pub callsign: String,
    pub airborne: Airborne,
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
    pub even: CprHalf,
    pub odd: CprHalf,
    pub rxtime: f64,
    pub signal_level: Option<f64>,
}

impl Observation {
    /// A bare observation carrying only an ICAO and timestamp; callers
    /// fill in whichever fields the format dispatch actually decoded.
    pub fn new(df: u8, icao: Icao, icao_source: IcaoSource, rxtime: f64) -> Self {
        Observation {
            df,
            icao,
            icao_source,
            altitude_ft: None,
            squawk: None,
            callsign: String::new(),
            airborne: Airborne::Unknown,
            speed_kts: None,
            heading_deg: None,
            vertical_rate_fpm: None,
            even: CprHalf::empty(),
            odd: CprHalf::empty(),
            rxtime,
            signal_level: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Aircraft — Tracker entry
// ---------------------------------------------------------------------------

/// A single slot in the Tracker's slab: all Observation fields a caller
/// would want to inspect, plus running counters, resolved position, and
/// the intrusive LRU links.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub icao: Icao,
    pub icao_set: bool,
    pub altitude_ft: Option<i32>,
    pub squawk: Option<u16>,
    pub callsign: String,
    pub airborne: Airborne,
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
    pub even: CprHalf,
    pub odd: CprHalf,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub latlon_timestamp: f64,
    pub rxtime: f64,
    pub n_messages: u64,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

impl Aircraft {
    /// Reset a slab slot to its sentinel-free empty state, preserving the
    /// `prev`/`next` links (the Tracker splices those separately).
    pub fn clear(&mut self) {
        let (prev, next) = (self.prev, self.next);
        *self = Aircraft::empty();
        self.prev = prev;
        self.next = next;
    }

    pub fn empty() -> Self {
        Aircraft {
            icao: 0,
            icao_set: false,
            altitude_ft: None,
            squawk: None,
            callsign: String::new(),
            airborne: Airborne::Unknown,
            speed_kts: None,
            heading_deg: None,
            vertical_rate_fpm: None,
            even: CprHalf::empty(),
            odd: CprHalf::empty(),
            lat: None,
            lon: None,
            latlon_timestamp: 0.0,
            rxtime: 0.0,
            n_messages: 0,
            prev: None,
            next: None,
        }
    }
}

/// Optional per-frame station position override, carried alongside an
/// Observation into `Tracker::ingest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTag {
    pub station_lat: Option<f64>,
    pub station_lon: Option<f64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icao_roundtrip() {
        let icao = icao_from_hex("4840D6").unwrap();
        assert_eq!(icao, 0x4840D6);
        assert_eq!(icao_to_string(icao), "4840D6");
    }

    #[test]
    fn test_icao_from_hex_rejects_wrong_length() {
        assert!(icao_from_hex("4840D").is_none());
        assert!(icao_from_hex("4840D6AA").is_none());
    }

    #[test]
    fn test_hex_decode() {
        assert_eq!(hex_decode("4840D6"), Some(vec![0x48, 0x40, 0xD6]));
        assert_eq!(hex_decode("odd"), None);
        assert_eq!(hex_decode("ZZZZ"), None);
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x48, 0x40, 0xD6]), "4840D6");
    }

    #[test]
    fn test_df_info() {
        assert_eq!(df_info(17).unwrap().name, "ADS-B extended squitter");
        assert_eq!(df_info(17).unwrap().bits, 112);
        assert!(df_info(3).is_none());
    }

    #[test]
    fn test_aircraft_clear_preserves_links() {
        let mut ac = Aircraft::empty();
        ac.icao = 0x4840D6;
        ac.icao_set = true;
        ac.n_messages = 5;
        ac.prev = Some(2);
        ac.next = Some(7);

        ac.clear();

        assert!(!ac.icao_set);
        assert_eq!(ac.n_messages, 0);
        assert_eq!(ac.prev, Some(2));
        assert_eq!(ac.next, Some(7));
    }
}
