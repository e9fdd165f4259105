//! Chart data model shared with the external chart parser

use crate::error::{FillError, Result};
use serde::{Deserialize, Serialize};

/// Difficulty selector for track lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

/// Instrument selector for track lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Drums,
}

impl Instrument {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Drums => "drums",
        }
    }
}

/// Note flag bit: cymbal marker (pro drums)
pub const FLAG_CYMBAL: u32 = 1 << 0;
/// Note flag bit: accent marker
pub const FLAG_ACCENT: u32 = 1 << 1;
/// Note flag bit: ghost-note marker
pub const FLAG_GHOST: u32 = 1 << 2;

/// Drum voice resolved from a note's lane and flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    Kick,
    Snare,
    Tom,
    Hat,
    Ride,
    Crash,
    Other,
}

impl Voice {
    /// Resolve a lane number and flag bitmask into a voice.
    ///
    /// Lanes follow the common five-lane drum layout: 0 = kick, 1 = snare,
    /// 2-4 = toms, with the cymbal flag promoting lanes 2/3/4 to
    /// hat/ride/crash. This is the single place lane/flag decoding happens;
    /// every downstream feature reads the resolved `Voice`.
    pub fn classify(note_type: u8, flags: u32) -> Voice {
        let cymbal = flags & FLAG_CYMBAL != 0;
        match note_type {
            0 => Voice::Kick,
            1 => Voice::Snare,
            2 => {
                if cymbal {
                    Voice::Hat
                } else {
                    Voice::Tom
                }
            }
            3 => {
                if cymbal {
                    Voice::Ride
                } else {
                    Voice::Tom
                }
            }
            4 => {
                if cymbal {
                    Voice::Crash
                } else {
                    Voice::Tom
                }
            }
            _ => Voice::Other,
        }
    }

    /// One-letter code used when hashing rhythmic patterns
    pub fn letter(&self) -> char {
        match self {
            Voice::Kick => 'k',
            Voice::Snare => 's',
            Voice::Tom => 't',
            Voice::Hat => 'h',
            Voice::Ride => 'r',
            Voice::Crash => 'c',
            Voice::Other => 'x',
        }
    }

    pub fn is_tom(&self) -> bool {
        matches!(self, Voice::Tom)
    }

    pub fn is_hat_or_ride(&self) -> bool {
        matches!(self, Voice::Hat | Voice::Ride)
    }

    pub fn is_kick(&self) -> bool {
        matches!(self, Voice::Kick)
    }

    pub fn is_crash(&self) -> bool {
        matches!(self, Voice::Crash)
    }
}

/// A tempo-change marker as produced by the chart parser
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TempoEvent {
    /// Tick position of the change
    pub tick: u64,
    /// Beats per minute from this tick onward
    pub bpm: f64,
}

/// A single charted drum hit
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Tick position of the hit
    pub tick: u64,
    /// Sustain length in ticks (usually 0 for drums)
    #[serde(default)]
    pub length: u64,
    /// Lane number (0 = kick, 1 = snare, 2-4 = toms/cymbals)
    pub note_type: u8,
    /// Flag bitmask (`FLAG_CYMBAL`, `FLAG_ACCENT`, `FLAG_GHOST`)
    #[serde(default)]
    pub flags: u32,
}

/// One instrument/difficulty track of a parsed chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackData {
    pub instrument: Instrument,
    pub difficulty: Difficulty,
    /// Note events grouped by chart section; group order is not significant,
    /// the pipeline flattens and re-sorts by tick
    pub note_event_groups: Vec<Vec<NoteEvent>>,
}

/// Parsed chart handed over by the external chart parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedChart {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    /// Ticks per quarter note, chart-wide constant
    pub resolution: u32,
    /// Tempo changes, sorted ascending, first at tick 0
    pub tempos: Vec<TempoEvent>,
    pub track_data: Vec<TrackData>,
}

/// Validate basic chart shape before any processing
pub fn validate_chart(chart: &ParsedChart) -> Result<()> {
    if chart.resolution == 0 {
        return Err(FillError::InvalidChart(
            "resolution must be > 0".to_string(),
        ));
    }
    if chart.tempos.is_empty() {
        return Err(FillError::InvalidChart("empty tempo list".to_string()));
    }
    Ok(())
}
