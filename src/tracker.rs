//! Fixed-capacity aircraft tracker: an intrusive doubly-linked LRU list
//! over an array-backed slab, keyed by ICAO address.
//!
//! Modeled directly on the source's `PlaneDB`: a vector of N entries
//! chained by `prev`/`next` slab indices, with `first`/`last` marking the
//! MRU/LRU ends. A companion hash from ICAO to slot index makes lookup
//! O(1); the linked list remains the sole source of truth for ordering and
//! eviction.
//!
//! `Tracker` itself holds no lock — `ingest`/`snapshot`/`set_station_position`
//! take `&mut self`/`&self` like any other plain struct, the same split the
//! teacher's tracker uses. The source's `PlaneDB` wraps this same state in a
//! single `std::mutex mtx` that every operation acquires; callers here get
//! the equivalent by holding the `Tracker` behind an `Arc<Mutex<Tracker>>`
//! (the pattern the rest of the pack already uses for shared state — see
//! `SharedTracker` below) rather than `Tracker` locking itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::warn;
use serde::Serialize;

use crate::cpr;
use crate::types::{Aircraft, Airborne, AdsbError, FrameTag, Icao, Observation, Result};

/// Default slab capacity, matching the source's `N = 512`.
pub const DEFAULT_CAPACITY: usize = 512;

/// A `Tracker` shared across demodulator and snapshot-reader threads, the
/// way spec's concurrency model requires: "a single mutex serialises all
/// Tracker operations". Construct with `Arc::new(Mutex::new(Tracker::new(..)))`;
/// `ingest` callers and `snapshot` callers both lock the same mutex, so a
/// snapshot always sees a consistent frozen view, never a partially-applied
/// Ingest.
pub type SharedTracker = Arc<Mutex<Tracker>>;

/// Default Snapshot activity cutoff, in seconds.
pub const DEFAULT_INACTIVE_CUTOFF: f64 = 60.0;

/// Tracker configuration. See spec's External Interfaces section for the
/// recognised option set.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub capacity: usize,
    pub station_lat: Option<f64>,
    pub station_lon: Option<f64>,
    pub inactive_cutoff_seconds: f64,
    /// Whether to persist decoded surface ground speed onto the aircraft
    /// record. The source computes but discards this value; left as an
    /// explicit switch per the open design question it leaves unresolved.
    pub store_surface_speed: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            capacity: DEFAULT_CAPACITY,
            station_lat: None,
            station_lon: None,
            inactive_cutoff_seconds: DEFAULT_INACTIVE_CUTOFF,
            store_surface_speed: false,
        }
    }
}

/// The aircraft tracker.
pub struct Tracker {
    slab: Vec<Aircraft>,
    index: HashMap<Icao, usize>,
    first: Option<usize>,
    last: Option<usize>,
    count: usize,
    capacity: usize,
    station_lat: Option<f64>,
    station_lon: Option<f64>,
    inactive_cutoff_seconds: f64,
    store_surface_speed: bool,
    surface_warning_given: bool,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        let n = config.capacity.max(1);
        let mut slab = Vec::with_capacity(n);
        for i in 0..n {
            let mut ac = Aircraft::empty();
            ac.next = if i == 0 { None } else { Some(i - 1) };
            ac.prev = if i == n - 1 { None } else { Some(i + 1) };
            slab.push(ac);
        }

        Tracker {
            slab,
            index: HashMap::new(),
            first: Some(n - 1),
            last: Some(0),
            count: 0,
            capacity: n,
            station_lat: config.station_lat,
            station_lon: config.station_lon,
            inactive_cutoff_seconds: config.inactive_cutoff_seconds,
            store_surface_speed: config.store_surface_speed,
            surface_warning_given: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_station_position(&mut self, lat: f64, lon: f64) {
        self.station_lat = Some(lat);
        self.station_lon = Some(lon);
    }

    /// Walk from `first` up to `count` steps looking for `icao`. The
    /// companion hash makes this O(1) in practice; the walk itself exists
    /// only to document the fallback the source relies on.
    fn find(&self, icao: Icao) -> Option<usize> {
        self.index.get(&icao).copied()
    }

    fn move_to_front(&mut self, ptr: usize) {
        if self.first == Some(ptr) {
            return;
        }

        let prev = self.slab[ptr].prev;
        let next = self.slab[ptr].next;

        match next {
            Some(n) => self.slab[n].prev = prev,
            None => self.last = prev,
        }
        if let Some(p) = prev {
            self.slab[p].next = next;
        }

        self.slab[ptr].next = self.first;
        self.slab[ptr].prev = None;
        if let Some(f) = self.first {
            self.slab[f].prev = Some(ptr);
        }
        self.first = Some(ptr);
    }

    /// Evict the LRU slot and return its (now-cleared) index.
    fn create(&mut self) -> usize {
        let ptr = self.last.expect("slab always has at least one slot");
        if let Some(old_icao) = self.index.iter().find(|(_, &v)| v == ptr).map(|(&k, _)| k) {
            if self.slab[ptr].icao_set {
                self.index.remove(&old_icao);
            }
        }
        self.count = (self.count + 1).min(self.capacity);
        self.slab[ptr].clear();
        ptr
    }

    /// Precedence: the aircraft's own last known position, else a
    /// per-frame station override, else the tracker's global station
    /// position. Returns `None` for either coordinate when nothing is set.
    fn calc_reference_position(&self, tag: &FrameTag, ptr: usize) -> (Option<f64>, Option<f64>) {
        let mut lat = self.station_lat;
        let mut lon = self.station_lon;

        if tag.station_lat.is_some() && tag.station_lon.is_some() {
            lat = tag.station_lat;
            lon = tag.station_lon;
        }

        let ac = &self.slab[ptr];
        if ac.lat.is_some() && ac.lon.is_some() {
            lat = ac.lat;
            lon = ac.lon;
        }

        (lat, lon)
    }

    /// Merge one Observation into the tracker. Rejects unset ICAOs,
    /// silently drops CRC-implied ICAOs with no prior direct sighting,
    /// otherwise creates or finds the entry, moves it to the MRU head, and
    /// merges fields (only overwriting where the incoming value is
    /// present). CPR resolution runs when a valid half-frame arrived.
    pub fn ingest(&mut self, obs: &Observation, tag: &FrameTag) -> Result<()> {
        let ptr = match self.find(obs.icao) {
            Some(ptr) => ptr,
            None => {
                if obs.icao_source == crate::types::IcaoSource::ImpliedFromCrc {
                    return Err(AdsbError::UnknownDf(obs.df));
                }
                let ptr = self.create();
                ptr
            }
        };

        self.move_to_front(ptr);
        self.index.insert(obs.icao, ptr);

        let ac = &mut self.slab[ptr];
        ac.icao = obs.icao;
        ac.icao_set = true;
        ac.rxtime = obs.rxtime;
        ac.n_messages += 1;

        if let Some(alt) = obs.altitude_ft {
            ac.altitude_ft = Some(alt);
        }
        if let Some(sq) = obs.squawk {
            ac.squawk = Some(sq);
        }
        if !obs.callsign.is_empty() {
            ac.callsign = obs.callsign.clone();
        }
        if let Some(spd) = obs.speed_kts {
            if obs.airborne == Airborne::Yes || self.store_surface_speed {
                ac.speed_kts = Some(spd);
            }
        }
        if let Some(hdg) = obs.heading_deg {
            ac.heading_deg = Some(hdg);
        }
        if let Some(vr) = obs.vertical_rate_fpm {
            ac.vertical_rate_fpm = Some(vr);
        }
        if obs.airborne != Airborne::Unknown {
            ac.airborne = obs.airborne;
        }

        if obs.even.valid {
            self.slab[ptr].even = obs.even;
            self.resolve_cpr_half(ptr, tag, true);
        }
        if obs.odd.valid {
            self.slab[ptr].odd = obs.odd;
            self.resolve_cpr_half(ptr, tag, false);
        }

        Ok(())
    }

    fn resolve_cpr_half(&mut self, ptr: usize, tag: &FrameTag, use_even: bool) {
        let ac = &self.slab[ptr];
        let (even, odd) = (ac.even, ac.odd);
        if !even.valid || !odd.valid || even.airborne != odd.airborne {
            return;
        }

        let airborne = even.airborne == Airborne::Yes;
        let resolved = if airborne {
            cpr::global_airborne(even.lat17, even.lon17, odd.lat17, odd.lon17, use_even)
        } else {
            let (ref_lat, ref_lon) = self.calc_reference_position(tag, ptr);
            match (ref_lat, ref_lon) {
                (Some(ref_lat), Some(ref_lon)) => {
                    cpr::global_surface(even.lat17, even.lon17, odd.lat17, odd.lon17, use_even, ref_lat, ref_lon)
                }
                _ => {
                    if !self.surface_warning_given {
                        warn!(
                            "surface CPR decode requested but no reference position is available; \
                             further occurrences will not be logged"
                        );
                        self.surface_warning_given = true;
                    }
                    None
                }
            }
        };

        if let Some((lat, lon)) = resolved {
            let ac = &mut self.slab[ptr];
            ac.lat = Some(lat);
            ac.lon = Some(lon);
            ac.latlon_timestamp = if use_even { even.timestamp } else { odd.timestamp };
        }
    }

    /// Produce a compact snapshot, iterating MRU to LRU. When
    /// `include_inactive` is false, stops at the first entry whose age
    /// exceeds the configured cutoff — valid because the list is already
    /// ordered by recency.
    pub fn snapshot(&self, now: f64, include_inactive: bool) -> Snapshot {
        let mut rows = Vec::with_capacity(self.count);
        let mut ptr = self.first;
        let mut steps = 0;

        while let Some(p) = ptr {
            if steps >= self.count {
                break;
            }
            let ac = &self.slab[p];
            if !ac.icao_set {
                break;
            }

            let age = now - ac.rxtime;
            if !include_inactive && age > self.inactive_cutoff_seconds {
                break;
            }

            rows.push(SnapshotRow {
                icao: ac.icao,
                lat: ac.lat,
                lon: ac.lon,
                altitude_ft: ac.altitude_ft,
                speed_kts: ac.speed_kts,
                heading_deg: ac.heading_deg,
                vertical_rate_fpm: ac.vertical_rate_fpm,
                squawk: ac.squawk,
                callsign: ac.callsign.clone(),
                airborne: ac.airborne == Airborne::Yes,
                n_messages: ac.n_messages,
                age_seconds: age,
            });

            ptr = ac.next;
            steps += 1;
        }

        Snapshot { count: rows.len(), values: rows, error: false }
    }
}

/// Compact snapshot row: field order matches the wire tuple format.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    pub icao: Icao,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude_ft: Option<i32>,
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
    pub squawk: Option<u16>,
    pub callsign: String,
    pub airborne: bool,
    pub n_messages: u64,
    pub age_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub count: usize,
    pub values: Vec<SnapshotRow>,
    pub error: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
