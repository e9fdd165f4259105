//! Feature extraction: per-window statistics against rolling baselines

use crate::analysis::{ChartNote, FillState};
use crate::config::Config;
use crate::error::Result;
use crate::pattern::{extract_ngrams, PatternCache};

/// Standard deviations below this are treated as zero for z-scores
const STD_EPSILON: f64 = 1e-6;

/// Voice-fraction baselines below this are too weak to divide by
const FRACTION_EPSILON: f64 = 0.05;

/// Running mean/std accumulator over previously scored windows
#[derive(Debug, Clone, Copy, Default)]
struct RollingStat {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl RollingStat {
    fn push(&mut self, value: f64) {
        self.n += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }

    fn std(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = (self.sum_sq / self.n as f64 - mean * mean).max(0.0);
        variance.sqrt()
    }

    fn z(&self, value: f64) -> f64 {
        let std = self.std();
        if std < STD_EPSILON {
            0.0
        } else {
            (value - self.mean()) / std
        }
    }
}

/// Rolling baselines carried across windows, earliest first
#[derive(Debug, Clone, Copy, Default)]
struct RollingBaseline {
    windows_seen: usize,
    density: RollingStat,
    tom_fraction: RollingStat,
    hat_fraction: RollingStat,
    kick_fraction: RollingStat,
    ioi_std: RollingStat,
}

/// Window-local statistics before baseline comparison
#[derive(Debug, Clone, Copy, Default)]
struct LocalStats {
    density: f64,
    tom_fraction: f64,
    hat_fraction: f64,
    kick_fraction: f64,
    ioi_std_ms: f64,
    same_pad_burst: bool,
    crash_resolve: bool,
}

impl LocalStats {
    fn compute(notes: &[ChartNote], window_beats: f64, burst_ms: f64, resolution: u32) -> Self {
        let n = notes.len();
        if n == 0 {
            return LocalStats::default();
        }

        let count = n as f64;
        let toms = notes.iter().filter(|x| x.voice.is_tom()).count() as f64;
        let hats = notes.iter().filter(|x| x.voice.is_hat_or_ride()).count() as f64;
        let kicks = notes.iter().filter(|x| x.voice.is_kick()).count() as f64;

        LocalStats {
            density: count / window_beats,
            tom_fraction: toms / count,
            hat_fraction: hats / count,
            kick_fraction: kicks / count,
            ioi_std_ms: ioi_std_ms(notes),
            same_pad_burst: has_same_pad_burst(notes, burst_ms),
            crash_resolve: has_crash_resolve(notes, resolution),
        }
    }
}

/// Standard deviation of inter-onset intervals, in ms (0 below 3 notes)
fn ioi_std_ms(notes: &[ChartNote]) -> f64 {
    if notes.len() < 3 {
        return 0.0;
    }
    let iois: Vec<f64> = notes
        .windows(2)
        .map(|pair| (pair[1].ms_time - pair[0].ms_time).max(0.0))
        .collect();
    let mean = iois.iter().sum::<f64>() / iois.len() as f64;
    let variance = iois.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / iois.len() as f64;
    variance.sqrt()
}

/// True if >=3 consecutive hits land on the same voice within `burst_ms` gaps
fn has_same_pad_burst(notes: &[ChartNote], burst_ms: f64) -> bool {
    let mut run = 1usize;
    for pair in notes.windows(2) {
        let same_voice = pair[0].voice == pair[1].voice;
        let close = pair[1].ms_time - pair[0].ms_time <= burst_ms;
        if same_voice && close {
            run += 1;
            if run >= 3 {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

/// True if a crash lands with at least 4 notes packed into the beat before it
fn has_crash_resolve(notes: &[ChartNote], resolution: u32) -> bool {
    let beat = resolution as u64;
    for (i, note) in notes.iter().enumerate() {
        if !note.voice.is_crash() {
            continue;
        }
        let run_start = note.tick.saturating_sub(beat);
        let preceding = notes[..i]
            .iter()
            .filter(|x| x.tick >= run_start)
            .count();
        if preceding >= 4 {
            return true;
        }
    }
    false
}

/// Compute every window's feature vector except `groove_dist`.
///
/// Each window is compared against rolling statistics over the windows before
/// it, never against future context; the baseline updates after scoring.
/// N-gram novelty is scored against (and recorded into) the caller-owned
/// pattern cache.
pub fn run(state: &mut FillState, config: &Config, cache: &mut PatternCache) -> Result<()> {
    let FillState {
        notes,
        windows,
        resolution,
        ..
    } = state;
    let resolution = *resolution;

    let mut rolling = RollingBaseline::default();

    for window in windows.iter_mut() {
        let window_notes = &notes[window.note_range.clone()];
        let local = LocalStats::compute(
            window_notes,
            config.window_beats,
            config.thresholds.burst_ms,
            resolution,
        );

        let f = &mut window.features;
        f.note_density = local.density;
        f.density_z = rolling.density.z(local.density);
        f.tom_fraction = local.tom_fraction;
        f.same_pad_burst = local.same_pad_burst;
        f.crash_resolve = local.crash_resolve;
        f.ioi_std_z = rolling.ioi_std.z(local.ioi_std_ms);

        if rolling.windows_seen == 0 {
            // No baseline yet; ratios against nothing stay neutral
            f.tom_ratio_jump = 0.0;
            f.hat_dropout = 0.0;
            f.kick_drop = 0.0;
        } else {
            f.tom_ratio_jump =
                local.tom_fraction / rolling.tom_fraction.mean().max(FRACTION_EPSILON);
            f.hat_dropout = fractional_drop(rolling.hat_fraction.mean(), local.hat_fraction);
            f.kick_drop = fractional_drop(rolling.kick_fraction.mean(), local.kick_fraction);
        }

        let ngrams = extract_ngrams(
            window_notes,
            window.start_tick,
            window.end_tick,
            resolution,
            &config.pattern,
        );
        f.ngram_novelty = cache.observe_and_score(&ngrams);

        rolling.windows_seen += 1;
        rolling.density.push(local.density);
        rolling.tom_fraction.push(local.tom_fraction);
        rolling.hat_fraction.push(local.hat_fraction);
        rolling.kick_fraction.push(local.kick_fraction);
        rolling.ioi_std.push(local.ioi_std_ms);
    }

    log::debug!(
        "extracted features for {} windows ({} cached patterns)",
        state.windows.len(),
        cache.len()
    );
    Ok(())
}

/// How far `current` fell below `baseline`, as a fraction of `baseline`
fn fractional_drop(baseline: f64, current: f64) -> f64 {
    if baseline < FRACTION_EPSILON {
        return 0.0;
    }
    ((baseline - current) / baseline).clamp(0.0, 1.0)
}
