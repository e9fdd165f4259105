//! Drum-Fill Detection
//!
//! A deterministic, non-ML analysis pipeline that locates drum fills — spans
//! where the drummer deviates from the established groove — in parsed
//! rhythm-game charts. Pure function of (chart, configuration); no I/O inside
//! the pipeline.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod error;
pub mod groove;
pub mod passes;
pub mod pattern;
pub mod tempo;

pub use analysis::{validate_fill_segments, FeatureVector, FillSegment};
pub use chart::{Difficulty, Instrument, NoteEvent, ParsedChart, TempoEvent, TrackData, Voice};
pub use config::Config;
pub use error::{FillError, Result};
pub use pattern::PatternCache;
pub use tempo::TempoMap;

use analysis::{ChartNote, FillState};
use chart::TrackData as Track;

/// Main detection pipeline for drum-fill extraction
#[derive(Debug)]
pub struct FillDetector {
    config: Config,
}

impl FillDetector {
    /// Create a new detector with a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)
            .map_err(|e| FillError::InvalidConfig(e.to_string()))?;
        Ok(Self { config })
    }

    /// The detector's configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Detect fills in one chart with a throwaway pattern cache
    pub fn detect(&self, chart: &ParsedChart) -> Result<Vec<FillSegment>> {
        let mut cache = PatternCache::new(self.config.pattern.max_cache_size);
        self.detect_with_cache(chart, &mut cache)
    }

    /// Detect fills using a caller-owned pattern cache.
    ///
    /// Reusing one cache across a catalog lets novelty scoring treat grooves
    /// shared between songs as familiar. The cache is single-owner mutable
    /// state; concurrent calls must not share one instance unsynchronized.
    pub fn detect_with_cache(
        &self,
        chart: &ParsedChart,
        cache: &mut PatternCache,
    ) -> Result<Vec<FillSegment>> {
        chart::validate_chart(chart)?;
        let tempo_map = TempoMap::new(chart.resolution, &chart.tempos)?;

        let track = chart
            .track_data
            .iter()
            .find(|t| {
                t.instrument == Instrument::Drums && t.difficulty == self.config.difficulty
            })
            .ok_or(FillError::TrackNotFound {
                instrument: Instrument::Drums,
                difficulty: self.config.difficulty,
            })?;

        let notes = flatten_notes(track, &tempo_map);
        log::debug!(
            "analyzing {:?}: {} drum notes at resolution {}",
            chart.name,
            notes.len(),
            chart.resolution
        );

        // A valid chart can simply have no (or one) drum note: no fills
        if notes.len() < 2 {
            return Ok(Vec::new());
        }

        let song_id = chart.name.clone().unwrap_or_default();
        let mut state = FillState::new(song_id, tempo_map, notes);

        passes::windows::run(&mut state, &self.config)?;
        if state.windows.is_empty() {
            return Ok(Vec::new());
        }
        passes::features::run(&mut state, &self.config, cache)?;
        passes::baseline::run(&mut state, &self.config)?;
        passes::candidates::run(&mut state, &self.config)?;
        passes::segments::run(&mut state, &self.config)?;

        Ok(state.segments)
    }
}

/// Detect fills with the given configuration (convenience wrapper)
pub fn extract_fills(chart: &ParsedChart, config: &Config) -> Result<Vec<FillSegment>> {
    FillDetector::new(config.clone())?.detect(chart)
}

/// Flatten a track's note groups into one tick-sorted note list with cached
/// ms times and resolved voices
fn flatten_notes(track: &Track, tempo_map: &TempoMap) -> Vec<ChartNote> {
    let mut raw: Vec<&NoteEvent> = track
        .note_event_groups
        .iter()
        .flatten()
        .collect();
    raw.sort_by_key(|n| (n.tick, n.note_type));

    raw.into_iter()
        .map(|n| {
            let ms_time = tempo_map.tick_to_ms(n.tick);
            let ms_length = if n.length > 0 {
                tempo_map.tick_to_ms(n.tick + n.length) - ms_time
            } else {
                0.0
            };
            ChartNote {
                tick: n.tick,
                ms_time,
                length: n.length,
                ms_length,
                voice: Voice::classify(n.note_type, n.flags),
            }
        })
        .collect()
}
