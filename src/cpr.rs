//! Compact Position Reporting (CPR) decode.
//!
//! Global (even/odd pair) decode needs no reference position but fails
//! across a latitude-zone boundary crossing. Local (reference-seeded)
//! decode needs only one half-frame and a position within roughly 180 NM
//! (airborne) or 45 NM (surface, half the zone width) of the aircraft.
//!
//! Airborne zones span 360°; surface zones span 90° and are additionally
//! disambiguated against a reference by folding into the nearest 90° wedge.

const CPR_SCALE: f64 = (1u32 << 17) as f64;

/// Mode-S latitude-zone count: 59 at the equator, decreasing stepwise with
/// latitude, 2 at ±87°, 1 beyond. `acos`'s argument would exceed 1 exactly
/// at the poles, hence the explicit overrides.
pub fn nl(lat: f64) -> i32 {
    let lat = lat.abs();
    if lat == 0.0 {
        return 59;
    }
    if lat == 87.0 {
        return 2;
    }
    if lat > 87.0 {
        return 1;
    }
    let tmp = 1.0 - (1.0 - (std::f64::consts::PI / 30.0).cos())
        / (std::f64::consts::PI / 180.0 * lat).cos().powi(2);
    (2.0 * std::f64::consts::PI / tmp.acos()).floor() as i32
}

/// Mathematical non-negative remainder (as opposed to Rust's `%`, which
/// keeps the sign of the dividend).
fn modulo(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r < 0.0 {
        r + b
    } else {
        r
    }
}

struct GlobalResult {
    lat: f64,
    lon: f64,
}

/// Shared airborne/surface global-decode core. `zone_width` is 360 for
/// airborne, 90 for surface.
fn global_core(
    even_lat17: u32,
    even_lon17: u32,
    odd_lat17: u32,
    odd_lon17: u32,
    use_even: bool,
    zone_width: f64,
) -> Option<GlobalResult> {
    let even_lat = even_lat17 as f64 / CPR_SCALE;
    let even_lon = even_lon17 as f64 / CPR_SCALE;
    let odd_lat = odd_lat17 as f64 / CPR_SCALE;
    let odd_lon = odd_lon17 as f64 / CPR_SCALE;

    let j = ((59.0 * even_lat17 as f64 - 60.0 * odd_lat17 as f64) / CPR_SCALE + 0.5).floor();

    let dlat_even = zone_width / 60.0;
    let dlat_odd = zone_width / 59.0;

    let mut lat_even = dlat_even * (modulo(j, 60.0) + even_lat);
    let mut lat_odd = dlat_odd * (modulo(j, 59.0) + odd_lat);

    if zone_width == 360.0 {
        if lat_even >= 270.0 {
            lat_even -= 360.0;
        }
        if lat_odd >= 270.0 {
            lat_odd -= 360.0;
        }
    }

    let nl_even = nl(lat_even);
    if nl_even != nl(lat_odd) {
        return None;
    }

    let lat = if use_even { lat_even } else { lat_odd };

    let ni = (nl_even - if use_even { 0 } else { 1 }).max(1);
    let m = (even_lon17 as f64 * (nl_even - 1) as f64 - odd_lon17 as f64 * nl_even as f64) / CPR_SCALE + 0.5;
    let m = m.floor();

    let chosen_lon = if use_even { even_lon } else { odd_lon };
    let mut lon = (zone_width / ni as f64) * (modulo(m, ni as f64) + chosen_lon);

    if zone_width == 360.0 && lon > 180.0 {
        lon -= 360.0;
    }

    Some(GlobalResult { lat, lon })
}

/// Globally unambiguous airborne position from an even/odd CPR pair.
/// `use_even` selects which half's latitude/longitude/timestamp to
/// publish; the caller typically prefers the more recently received half.
pub fn global_airborne(
    even_lat17: u32,
    even_lon17: u32,
    odd_lat17: u32,
    odd_lon17: u32,
    use_even: bool,
) -> Option<(f64, f64)> {
    global_core(even_lat17, even_lon17, odd_lat17, odd_lon17, use_even, 360.0)
        .map(|r| (r.lat, r.lon))
}

/// Globally unambiguous surface position. Zone width is 90° instead of
/// 360°; the raw result is folded into the 90° wedge nearest
/// `(ref_lat, ref_lon)` since surface CPR alone is ambiguous across the
/// four quadrants of the globe.
pub fn global_surface(
    even_lat17: u32,
    even_lon17: u32,
    odd_lat17: u32,
    odd_lon17: u32,
    use_even: bool,
    ref_lat: f64,
    ref_lon: f64,
) -> Option<(f64, f64)> {
    let r = global_core(even_lat17, even_lon17, odd_lat17, odd_lon17, use_even, 90.0)?;
    let lat = r.lat - 90.0 * ((r.lat - ref_lat + 45.0) / 90.0).floor();
    let lon = r.lon - 90.0 * ((r.lon - ref_lon + 45.0) / 90.0).floor();
    Some((lat, lon))
}

/// Locally unambiguous resolution from a single half-frame plus a
/// reference position. `zone_width` is 360 for airborne, 90 for surface.
fn local_core(
    cpr_lat17: u32,
    cpr_lon17: u32,
    use_even: bool,
    ref_lat: f64,
    ref_lon: f64,
    zone_width: f64,
) -> (f64, f64) {
    let cpr_lat = cpr_lat17 as f64 / CPR_SCALE;
    let cpr_lon = cpr_lon17 as f64 / CPR_SCALE;

    let d_lat = if use_even { zone_width / 60.0 } else { zone_width / 59.0 };
    let j = (ref_lat / d_lat).floor() + (modulo(ref_lat, d_lat) / d_lat - cpr_lat + 0.5).floor();
    let lat = d_lat * (j + cpr_lat);

    let ni = nl(lat) - if use_even { 0 } else { 1 };
    let d_lon = if ni > 0 { zone_width / ni as f64 } else { zone_width };

    let m = (ref_lon / d_lon).floor() + (modulo(ref_lon, d_lon) / d_lon - cpr_lon + 0.5).floor();
    let lon = d_lon * (m + cpr_lon);

    (lat, lon)
}

/// Locally unambiguous airborne resolution (360° zone width).
pub fn local_airborne(cpr_lat17: u32, cpr_lon17: u32, use_even: bool, ref_lat: f64, ref_lon: f64) -> (f64, f64) {
    local_core(cpr_lat17, cpr_lon17, use_even, ref_lat, ref_lon, 360.0)
}

/// Locally unambiguous surface resolution (90° zone width).
pub fn local_surface(cpr_lat17: u32, cpr_lon17: u32, use_even: bool, ref_lat: f64, ref_lon: f64) -> (f64, f64) {
    local_core(cpr_lat17, cpr_lon17, use_even, ref_lat, ref_lon, 90.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nl_equator() {
        assert_eq!(nl(0.0), 59);
    }

    #[test]
    fn test_nl_poles() {
        assert_eq!(nl(87.0), 2);
        assert_eq!(nl(-87.0), 2);
        assert_eq!(nl(88.0), 1);
        assert_eq!(nl(90.0), 1);
    }

    #[test]
    fn test_nl_mid_latitude() {
        let n = nl(52.0);
        assert!(n > 30 && n < 40, "NL at 52 deg should be ~36, got {n}");
    }

    #[test]
    fn test_nl_monotone_nonincreasing() {
        let mut prev = nl(0.0);
        let mut lat = 1.0;
        while lat <= 89.0 {
            let cur = nl(lat);
            assert!(cur <= prev, "NL should be non-increasing: nl({lat})={cur} > prev={prev}");
            prev = cur;
            lat += 1.0;
        }
    }

    #[test]
    fn test_global_airborne_known_pair() {
        // "The 1090MHz Riddle" canonical test vectors.
        let result = global_airborne(93000, 51372, 74158, 50194, true);
        assert!(result.is_some());
        let (lat, lon) = result.unwrap();
        assert!((lat - 52.2572).abs() < 0.01, "lat should be ~52.2572, got {lat}");
        assert!((lon - 3.9192).abs() < 0.01, "lon should be ~3.9192, got {lon}");
    }

    #[test]
    fn test_global_airborne_odd_half() {
        let result = global_airborne(93000, 51372, 74158, 50194, false);
        assert!(result.is_some());
        let (lat, _lon) = result.unwrap();
        assert!((lat - 52.2572).abs() < 0.01);
    }

    #[test]
    fn test_local_airborne_matches_global() {
        let (lat, lon) = local_airborne(93000, 51372, true, 52.25, 3.92);
        assert!((lat - 52.2572).abs() < 0.01, "got {lat}");
        assert!((lon - 3.9192).abs() < 0.01, "got {lon}");
    }

    #[test]
    fn test_modulo_negative() {
        assert!((modulo(-1.0, 60.0) - 59.0).abs() < 1e-10);
    }

    #[test]
    fn test_modulo_positive() {
        assert!((modulo(7.0, 3.0) - 1.0).abs() < 1e-10);
    }
}
