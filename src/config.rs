//! Configuration system for the fill detector

use crate::chart::Difficulty;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Difficulty of the drum track to analyze
    pub difficulty: Difficulty,
    /// Analysis window length in beats
    pub window_beats: f64,
    /// Window advance per step in beats (must not exceed `window_beats`)
    pub stride_beats: f64,
    pub thresholds: ThresholdConfig,
    pub pattern: PatternConfig,
    pub groove: GrooveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Expert,
            window_beats: 2.0,
            stride_beats: 1.0,
            thresholds: ThresholdConfig::default(),
            pattern: PatternConfig::default(),
            groove: GrooveConfig::default(),
        }
    }
}

/// Per-rule thresholds for candidate detection and segment filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Density z-score needed by the density+distance primary rule
    pub density_z: f64,
    /// Groove (Mahalanobis) distance needed by the density+distance rule
    pub dist: f64,
    /// Tom-ratio jump needed by the tom-jump primary rule
    pub tom_jump: f64,
    /// Unconditional notes-per-beat cutoff ("very dense")
    pub very_dense: f64,
    /// Tom fraction cutoff for the elevated-density tom rule
    pub tom_fraction: f64,
    /// Minimum fill duration in beats
    pub min_beats: f64,
    /// Maximum fill duration in beats
    pub max_beats: f64,
    /// Segments closer than this (in beats) are merged
    pub merge_gap_beats: f64,
    /// Max gap between same-voice hits counted as a burst, in ms
    pub burst_ms: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            density_z: 2.0,
            dist: 3.0,
            tom_jump: 2.5,
            very_dense: 6.0,
            tom_fraction: 0.6,
            min_beats: 1.0,
            max_beats: 8.0,
            merge_gap_beats: 1.0,
            burst_ms: 150.0,
        }
    }
}

/// Rhythmic n-gram extraction and cache parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Quantization grid cells per beat (4 = 16th notes)
    pub grid_per_beat: usize,
    /// N-gram sub-window length in beats
    pub ngram_beats: f64,
    /// N-gram sub-window advance in beats
    pub ngram_stride_beats: f64,
    /// Pattern cache entry limit; exceeding it evicts the low-frequency 25%
    pub max_cache_size: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            grid_per_beat: 4,
            ngram_beats: 1.0,
            ngram_stride_beats: 0.5,
            max_cache_size: 4096,
        }
    }
}

/// Groove-model training parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrooveConfig {
    /// Minimum stable windows required before the model is usable
    pub min_samples: usize,
    /// Windows with |density z| above this are excluded from training
    pub stable_density_z: f64,
}

impl Default for GrooveConfig {
    fn default() -> Self {
        Self {
            min_samples: 8,
            stable_density_z: 2.5,
        }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.window_beats <= 0.0 {
        anyhow::bail!("window_beats must be > 0");
    }
    if config.stride_beats <= 0.0 {
        anyhow::bail!("stride_beats must be > 0");
    }
    if config.stride_beats > config.window_beats {
        anyhow::bail!("stride_beats must not exceed window_beats");
    }

    let t = &config.thresholds;
    for (name, value) in [
        ("thresholds.density_z", t.density_z),
        ("thresholds.dist", t.dist),
        ("thresholds.tom_jump", t.tom_jump),
        ("thresholds.very_dense", t.very_dense),
        ("thresholds.tom_fraction", t.tom_fraction),
        ("thresholds.min_beats", t.min_beats),
        ("thresholds.max_beats", t.max_beats),
        ("thresholds.burst_ms", t.burst_ms),
    ] {
        if value <= 0.0 {
            anyhow::bail!("{} must be > 0", name);
        }
    }
    if t.merge_gap_beats < 0.0 {
        anyhow::bail!("thresholds.merge_gap_beats must be >= 0");
    }
    if t.max_beats <= t.min_beats {
        anyhow::bail!("thresholds.max_beats must be > thresholds.min_beats");
    }

    if config.pattern.grid_per_beat == 0 {
        anyhow::bail!("pattern.grid_per_beat must be >= 1");
    }
    if config.pattern.ngram_beats <= 0.0 || config.pattern.ngram_stride_beats <= 0.0 {
        anyhow::bail!("pattern n-gram lengths must be > 0");
    }
    if config.pattern.max_cache_size < 16 {
        anyhow::bail!("pattern.max_cache_size must be >= 16");
    }

    if config.groove.min_samples == 0 {
        anyhow::bail!("groove.min_samples must be >= 1");
    }
    if config.groove.stable_density_z <= 0.0 {
        anyhow::bail!("groove.stable_density_z must be > 0");
    }

    Ok(())
}

/// Load configuration from JSON file (missing fields fall back to defaults)
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
