//! Raw frame ingestion: bit addressing, length validation, and CRC-based
//! ICAO recovery. The pure per-format payload decode lives in `decode`.

use log::debug;

use crate::crc;
use crate::decode;
use crate::types::{df_info, hex_decode, AdsbError, IcaoSource, Observation, Result};

/// A candidate frame as delivered by the upstream demodulator.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 7 (short) or 14 (long) raw message bytes.
    pub raw: Vec<u8>,
    /// Receive wall-clock time, Unix seconds.
    pub rxtime: f64,
    /// Signal strength in dB, if the demodulator reports one.
    pub signal_level: Option<f64>,
    /// Upstream tag. `'1'` marks a pre-decoded text line, not raw bytes;
    /// such frames are skipped by this core.
    pub msgtype: char,
}

impl Frame {
    pub fn new(raw: Vec<u8>, rxtime: f64, signal_level: Option<f64>) -> Self {
        Frame { raw, rxtime, signal_level, msgtype: '0' }
    }

    /// Build a Frame from a hex string, for callers working from text logs
    /// or test fixtures.
    pub fn from_hex(hex_str: &str, rxtime: f64, signal_level: Option<f64>) -> Option<Self> {
        hex_decode(hex_str).map(|raw| Frame::new(raw, rxtime, signal_level))
    }
}

/// Read `n` bits (`n <= 32`) starting at bit offset `off` from a
/// big-endian bit string, MSB of byte 0 first.
pub fn bits(data: &[u8], off: usize, n: u32) -> u32 {
    debug_assert!(n <= 32);
    let mut value: u64 = 0;
    for i in 0..n as usize {
        let bit_pos = off + i;
        let byte = bit_pos / 8;
        let shift = 7 - (bit_pos % 8);
        let bit = if byte < data.len() { (data[byte] >> shift) & 1 } else { 0 };
        value = (value << 1) | bit as u64;
    }
    value as u32
}

const SHORT_DFS: &[u8] = &[0, 4, 5, 11];
const LONG_DFS: &[u8] = &[16, 17, 18, 19, 20, 21, 24];

/// Decode a single candidate frame into an Observation, or a hard decode
/// error when length or CRC forbid further interpretation.
pub fn decode_frame(frame: &Frame) -> Result<Observation> {
    if frame.msgtype == '1' {
        return Err(AdsbError::UnknownDf(0));
    }

    let df = bits(&frame.raw, 0, 5) as u8;
    let actual_bits = frame.raw.len() * 8;

    let expected_short = SHORT_DFS.contains(&df) && actual_bits == 56;
    let expected_long = LONG_DFS.contains(&df) && actual_bits == 112;
    if !expected_short && !expected_long {
        debug!("dropping frame: DF {df} incompatible with {actual_bits}-bit length");
        return Err(AdsbError::LengthMismatch { df, actual: actual_bits });
    }

    match df {
        17 | 18 | 11 => {
            let icao = bits(&frame.raw, 8, 24);
            if !crc::parity(&frame.raw) {
                debug!("dropping frame: CRC invalid for DF {df}, ICAO {icao:06X}");
                return Err(AdsbError::CrcInvalid { df });
            }
            decode::decode(&frame.raw, df, icao, IcaoSource::Direct, frame.rxtime, frame.signal_level)
        }
        0 | 4 | 5 | 20 | 21 => {
            let icao = crc::checksum(&frame.raw);
            decode::decode(&frame.raw, df, icao, IcaoSource::ImpliedFromCrc, frame.rxtime, frame.signal_level)
        }
        _ => {
            df_info(df).ok_or(AdsbError::UnknownDf(df))?;
            Err(AdsbError::UnknownDf(df))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hex_decode;

    #[test]
    fn test_bits_basic() {
        let data = hex_decode("8D4840D6202CC371C32CE0576098").unwrap();
        assert_eq!(bits(&data, 0, 5), 17); // DF17
        assert_eq!(bits(&data, 8, 24), 0x4840D6);
    }

    #[test]
    fn test_decode_frame_df17_identification() {
        let frame = Frame::from_hex("8D4840D6202CC371C32CE0576098", 1.0, None).unwrap();
        let obs = decode_frame(&frame).unwrap();
        assert_eq!(obs.df, 17);
        assert_eq!(obs.icao, 0x4840D6);
        assert_eq!(obs.icao_source, IcaoSource::Direct);
        assert_eq!(obs.callsign.trim(), "KLM1023");
    }

    #[test]
    fn test_decode_frame_length_mismatch() {
        let frame = Frame::new(vec![0x8D, 0x48, 0x40], 1.0, None);
        assert!(matches!(decode_frame(&frame), Err(AdsbError::LengthMismatch { .. })));
    }

    #[test]
    fn test_decode_frame_crc_invalid_df17() {
        let mut data = hex_decode("8D4840D6202CC371C32CE0576098").unwrap();
        data[5] ^= 0x01;
        let frame = Frame::new(data, 1.0, None);
        assert!(matches!(decode_frame(&frame), Err(AdsbError::CrcInvalid { .. })));
    }

    #[test]
    fn test_decode_frame_skips_msgtype_1() {
        let mut frame = Frame::from_hex("8D4840D6202CC371C32CE0576098", 1.0, None).unwrap();
        frame.msgtype = '1';
        assert!(decode_frame(&frame).is_err());
    }

    #[test]
    fn test_decode_frame_implied_icao() {
        // A DF0 frame: ICAO is recovered from the checksum, not verified.
        let data = hex_decode("02E19838209D95").unwrap();
        let frame = Frame::new(data, 1.0, None);
        let obs = decode_frame(&frame).unwrap();
        assert_eq!(obs.df, 0);
        assert_eq!(obs.icao_source, IcaoSource::ImpliedFromCrc);
    }
}
