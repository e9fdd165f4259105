//! Tick/millisecond conversion over a validated tempo map

use crate::chart::TempoEvent;
use crate::error::{FillError, Result};

/// A tempo-change marker with its cached millisecond position
#[derive(Debug, Clone, Copy)]
pub struct TempoMarker {
    pub tick: u64,
    pub bpm: f64,
    /// Millisecond time of this marker, filled in once at construction
    pub ms_time: f64,
}

/// Validated tempo map supporting O(log n) tick/ms conversion
#[derive(Debug, Clone)]
pub struct TempoMap {
    resolution: u32,
    markers: Vec<TempoMarker>,
}

/// Milliseconds spanned by a single tick at the given tempo
fn ms_per_tick(bpm: f64, resolution: u32) -> f64 {
    60_000.0 / (bpm * resolution as f64)
}

impl TempoMap {
    /// Validate the tempo list and pre-compute every marker's ms position.
    ///
    /// Fails if the list is empty, unsorted, contains a non-positive BPM, or
    /// does not start at tick 0. Nothing is silently repaired.
    pub fn new(resolution: u32, tempos: &[TempoEvent]) -> Result<Self> {
        if resolution == 0 {
            return Err(FillError::InvalidChart(
                "resolution must be > 0".to_string(),
            ));
        }
        if tempos.is_empty() {
            return Err(FillError::InvalidTempo("empty tempo list".to_string()));
        }
        if tempos[0].tick != 0 {
            return Err(FillError::InvalidTempo(format!(
                "first tempo event must be at tick 0, found tick {}",
                tempos[0].tick
            )));
        }

        let mut markers = Vec::with_capacity(tempos.len());
        let mut ms = 0.0f64;
        for (i, event) in tempos.iter().enumerate() {
            if event.bpm <= 0.0 {
                return Err(FillError::InvalidTempo(format!(
                    "non-positive bpm {} at tick {}",
                    event.bpm, event.tick
                )));
            }
            if i > 0 {
                let prev = &tempos[i - 1];
                if event.tick < prev.tick {
                    return Err(FillError::InvalidTempo(format!(
                        "tempo list not sorted: tick {} follows tick {}",
                        event.tick, prev.tick
                    )));
                }
                ms += (event.tick - prev.tick) as f64 * ms_per_tick(prev.bpm, resolution);
            }
            markers.push(TempoMarker {
                tick: event.tick,
                bpm: event.bpm,
                ms_time: ms,
            });
        }

        Ok(TempoMap {
            resolution,
            markers,
        })
    }

    /// Ticks per quarter note
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Last marker with `tick <= target` (always exists, first marker is at 0)
    fn marker_at(&self, tick: u64) -> &TempoMarker {
        let idx = self.markers.partition_point(|m| m.tick <= tick);
        &self.markers[idx - 1]
    }

    /// BPM active at the given tick
    pub fn bpm_at(&self, tick: u64) -> f64 {
        self.marker_at(tick).bpm
    }

    /// Convert a tick position to milliseconds
    pub fn tick_to_ms(&self, tick: u64) -> f64 {
        let marker = self.marker_at(tick);
        marker.ms_time + (tick - marker.tick) as f64 * ms_per_tick(marker.bpm, self.resolution)
    }

    /// Convert a millisecond position back to the nearest tick
    pub fn ms_to_tick(&self, ms: f64) -> u64 {
        if ms <= 0.0 {
            return 0;
        }
        let idx = self.markers.partition_point(|m| m.ms_time <= ms);
        let marker = &self.markers[idx - 1];
        let ticks = (ms - marker.ms_time) / ms_per_tick(marker.bpm, self.resolution);
        marker.tick + ticks.round() as u64
    }

    /// Convert a tick range to `(start_ms, end_ms)`.
    ///
    /// Monotonic: `end_ms >= start_ms` whenever `end_tick >= start_tick`.
    pub fn tick_range_to_ms(&self, start_tick: u64, end_tick: u64) -> (f64, f64) {
        let start_ms = self.tick_to_ms(start_tick);
        let end_ms = self.tick_to_ms(end_tick);
        (start_ms, end_ms.max(start_ms))
    }
}
