//! Per-format, per-type-code payload decode.
//!
//! Pure bit-field extraction — no CRC, no frame-length validation (that
//! happens in `frame` before this module is reached). Each function here
//! mirrors one clause of the upstream transponder's message structure.

use crate::frame::bits;
use crate::types::{Airborne, CALLSIGN_CHARSET, Icao, IcaoSource, Observation, Result};

/// Dispatch on `df` (and, for Extended Squitter, on type code) and build
/// the Observation for one frame. `icao`/`icao_source` have already been
/// determined by the caller (direct bits or CRC residual).
pub fn decode(
    raw: &[u8],
    df: u8,
    icao: Icao,
    icao_source: IcaoSource,
    rxtime: f64,
    signal_level: Option<f64>,
) -> Result<Observation> {
    let mut obs = Observation::new(df, icao, icao_source, rxtime);
    obs.signal_level = signal_level;

    match df {
        0 | 4 | 20 => {
            obs.altitude_ft = decode_ac13(raw);
        }
        5 | 21 => {
            obs.squawk = Some(decode_squawk(raw));
        }
        11 => {
            let capability = bits(raw, 5, 3);
            obs.airborne = match capability {
                4 => Airborne::No,
                5 => Airborne::Yes,
                _ => Airborne::Unknown,
            };
        }
        17 | 18 => {
            let tc = bits(raw, 32, 5) as u8;
            decode_extended_squitter(raw, tc, rxtime, &mut obs);
        }
        _ => {}
    }

    Ok(obs)
}

fn decode_extended_squitter(raw: &[u8], tc: u8, rxtime: f64, obs: &mut Observation) {
    match tc {
        1..=4 => {
            obs.callsign = decode_callsign(raw);
        }
        5..=8 => {
            obs.airborne = Airborne::No;
            if bits(raw, 44, 1) != 0 {
                obs.heading_deg = Some(bits(raw, 45, 7) as f64 * 360.0 / 128.0);
            }
            obs.speed_kts = decode_movement(raw);
            store_cpr_half(raw, rxtime, Airborne::No, obs);
        }
        9..=18 => {
            obs.altitude_ft = decode_ac12(raw);
            obs.airborne = Airborne::Yes;
            store_cpr_half(raw, rxtime, Airborne::Yes, obs);
        }
        19 => {
            let st = bits(raw, 37, 3);
            if st == 1 || st == 2 {
                decode_velocity(raw, st, obs);
                obs.airborne = Airborne::Yes;
            }
            // ST 3/4 and other subtypes: ignored.
        }
        _ => {}
    }
}

fn store_cpr_half(raw: &[u8], rxtime: f64, airborne: Airborne, obs: &mut Observation) {
    let half = if bits(raw, 53, 1) != 0 { &mut obs.odd } else { &mut obs.even };
    half.lat17 = bits(raw, 54, 17);
    half.lon17 = bits(raw, 71, 17);
    half.timestamp = rxtime;
    half.airborne = airborne;
    half.valid = true;
}

/// AC13 altitude field (bytes 2-3 of the raw frame). `M` clear and `Q` set
/// is the only encoding this core understands; metric and Gillham/gray-code
/// encodings yield `None`.
fn decode_ac13(raw: &[u8]) -> Option<i32> {
    let m_bit = raw[3] & (1 << 6);
    if m_bit != 0 {
        return None;
    }
    let q_bit = raw[3] & (1 << 4);
    if q_bit == 0 {
        return None;
    }
    let n = ((raw[2] & 0x1F) as i32) << 6
        | (((raw[3] & 0x80) >> 2) as i32)
        | (((raw[3] & 0x20) >> 1) as i32)
        | ((raw[3] & 0x0F) as i32);
    Some(n * 25 - 1000)
}

/// AC12 altitude field (bytes 5-6). Q set ⇒ 25 ft-resolution barometric
/// altitude; Q clear yields `None` (Gillham not supported).
fn decode_ac12(raw: &[u8]) -> Option<i32> {
    let q_bit = raw[5] & 1;
    if q_bit == 0 {
        return None;
    }
    let n = ((raw[5] as i32) >> 1) << 4 | (((raw[6] & 0xF0) >> 4) as i32);
    Some(n * 25 - 1000)
}

/// Mode-A squawk from DF5/21 (bytes 2-3), assembled from the ICAO Annex 10
/// bit-interleaving pattern. Returns four octal digits read as a decimal
/// number (e.g. digits 7,5,0,0 ⇒ 7500).
fn decode_squawk(raw: &[u8]) -> u16 {
    let a = ((raw[3] & 0x80) >> 5) | (raw[2] & 0x02) | ((raw[2] & 0x08) >> 3);
    let b = ((raw[3] & 0x02) << 1) | ((raw[3] & 0x08) >> 2) | ((raw[3] & 0x20) >> 5);
    let c = ((raw[2] & 0x01) << 2) | ((raw[2] & 0x04) >> 1) | ((raw[2] & 0x10) >> 4);
    let d = ((raw[3] & 0x01) << 2) | ((raw[3] & 0x04) >> 1) | ((raw[3] & 0x10) >> 4);
    a as u16 * 1000 + b as u16 * 100 + c as u16 * 10 + d as u16
}

/// 8-character callsign from eight 6-bit slots starting at bit 40.
/// Placeholder codes (`'#'` in the charset) are skipped, not emitted.
fn decode_callsign(raw: &[u8]) -> String {
    let mut s = String::with_capacity(8);
    for i in 0..8 {
        let c = bits(raw, 40 + i * 6, 6) as usize;
        let ch = CALLSIGN_CHARSET[c];
        if ch != b'#' {
            s.push(ch as char);
        }
    }
    s
}

/// Surface movement field (bit 37, 7 bits) to ground speed in knots, via
/// the piecewise table from ICAO Annex 10.
fn decode_movement(raw: &[u8]) -> Option<f64> {
    let v = bits(raw, 37, 7);
    match v {
        0 => None,
        1 => Some(0.0),
        2..=8 => Some(0.125 * (v as f64 - 1.0)),
        9..=12 => Some(1.0 + 0.25 * (v as f64 - 8.0)),
        13..=38 => Some(2.0 + 0.5 * (v as f64 - 12.0)),
        39..=93 => Some(15.0 + (v as f64 - 38.0)),
        94..=108 => Some(70.0 + 2.0 * (v as f64 - 93.0)),
        109..=123 => Some(100.0 + 5.0 * (v as f64 - 108.0)),
        124 => Some(175.0),
        _ => None, // 125-127: reserved
    }
}

/// TC19 ST 1/2 ground velocity: east-west and north-south components,
/// each signed magnitude-minus-one. ST=2 scales speed ×4 (supersonic).
/// ST 3/4 (airspeed/heading) are never passed to this function.
fn decode_velocity(raw: &[u8], st: u32, obs: &mut Observation) {
    let v_ew = bits(raw, 46, 10) as i32;
    let v_ns = bits(raw, 57, 10) as i32;

    if v_ew != 0 && v_ns != 0 {
        let d_ew = bits(raw, 45, 1) != 0;
        let d_ns = bits(raw, 56, 1) != 0;

        let v_ew = if d_ew { -(v_ew - 1) } else { v_ew - 1 };
        let v_ns = if d_ns { -(v_ns - 1) } else { v_ns - 1 };

        let mut speed = ((v_ew * v_ew + v_ns * v_ns) as f64).sqrt();
        let mut heading = (v_ew as f64).atan2(v_ns as f64) * 180.0 / std::f64::consts::PI;
        if heading < 0.0 {
            heading += 360.0;
        }
        if st == 2 {
            speed *= 4.0;
        }

        obs.speed_kts = Some(speed);
        obs.heading_deg = Some(heading);
    }

    let vr = bits(raw, 69, 9) as i32;
    if vr != 0 {
        let s_vr = bits(raw, 68, 1) != 0;
        let vertrate = (vr - 1) * 64 * if s_vr { -1 } else { 1 };
        obs.vertical_rate_fpm = Some(vertrate);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hex_decode;

    fn raw(hex: &str) -> Vec<u8> {
        hex_decode(hex).unwrap()
    }

    /// Write `value`'s low `n` bits into `data` at bit offset `off`,
    /// using the same big-endian MSB-first convention as `bits()`.
    fn set_bits(data: &mut [u8], off: usize, n: u32, value: u32) {
        for i in 0..n as usize {
            let bit_pos = off + i;
            let byte = bit_pos / 8;
            let shift = 7 - (bit_pos % 8);
            let bit = (value >> (n as usize - 1 - i)) & 1;
            if bit != 0 {
                data[byte] |= 1 << shift;
            } else {
                data[byte] &= !(1 << shift);
            }
        }
    }

    #[test]
    fn test_callsign_decode() {
        let r = raw("8D4840D6202CC371C32CE0576098");
        assert_eq!(decode_callsign(&r).trim(), "KLM1023");
    }

    #[test]
    fn test_callsign_skips_hash_placeholder() {
        // All 6-bit slots zero => charset code 0 => '#' => skipped entirely.
        let r = vec![0u8; 14];
        assert_eq!(decode_callsign(&r), "");
    }

    #[test]
    fn test_ac12_airborne_position_altitude() {
        let r = raw("8D40621D58C382D690C8AC2863A7");
        assert_eq!(decode_ac12(&r), Some(38000));
    }

    #[test]
    fn test_ac13_metric_is_none() {
        // M bit set (bit 6 of byte 3) => metric/Gillham, unsupported.
        let mut r = vec![0u8; 7];
        r[3] = 1 << 6;
        assert_eq!(decode_ac13(&r), None);
    }

    #[test]
    fn test_movement_table_boundaries() {
        let mut r = vec![0u8; 14];

        set_bits(&mut r, 37, 7, 1);
        assert_eq!(decode_movement(&r), Some(0.0));

        set_bits(&mut r, 37, 7, 124);
        assert_eq!(decode_movement(&r), Some(175.0));

        set_bits(&mut r, 37, 7, 0);
        assert_eq!(decode_movement(&r), None);

        set_bits(&mut r, 37, 7, 126);
        assert_eq!(decode_movement(&r), None);

        set_bits(&mut r, 37, 7, 39);
        assert_eq!(decode_movement(&r), Some(16.0));
    }

    #[test]
    fn test_velocity_decode() {
        let r = raw("8D485020994409940838175B284F");
        let mut obs = Observation::new(17, 0x485020, IcaoSource::Direct, 1.0);
        decode_velocity(&r, bits(&r, 37, 3), &mut obs);
        assert_eq!(obs.vertical_rate_fpm, Some(-832));
        assert!(obs.speed_kts.is_some());
        assert!(obs.heading_deg.is_some());
    }

    #[test]
    fn test_squawk_7500() {
        // a=7, b=5, c=0, d=0 per the bit-selector expressions above.
        let mut r = vec![0u8; 7];
        r[2] = 0x0A; // a: bits 0x02 | 0x08
        r[3] = 0xA2; // a: bit 0x80; b: bits 0x02 | 0x20
        assert_eq!(decode_squawk(&r), 7500);
    }

    #[test]
    fn test_full_decode_df17_identification() {
        let r = raw("8D4840D6202CC371C32CE0576098");
        let obs = decode(&r, 17, 0x4840D6, IcaoSource::Direct, 1.0, None).unwrap();
        assert_eq!(obs.callsign.trim(), "KLM1023");
        assert!(obs.altitude_ft.is_none());
        assert!(!obs.even.valid && !obs.odd.valid);
    }

    #[test]
    fn test_full_decode_df17_position_even() {
        let r = raw("8D40621D58C382D690C8AC2863A7");
        let obs = decode(&r, 17, 0x40621D, IcaoSource::Direct, 1.0, None).unwrap();
        assert_eq!(obs.altitude_ft, Some(38000));
        assert_eq!(obs.airborne, Airborne::Yes);
        assert_eq!(obs.even.lat17, 93000);
        assert_eq!(obs.even.lon17, 51372);
        assert!(!obs.odd.valid);
    }

    #[test]
    fn test_full_decode_df17_position_odd() {
        let r = raw("8D40621D58C386435CC412692AD6");
        let obs = decode(&r, 17, 0x40621D, IcaoSource::Direct, 10.0, None).unwrap();
        assert_eq!(obs.odd.lat17, 74158);
        assert_eq!(obs.odd.lon17, 50194);
        assert!(!obs.even.valid);
    }
}
