//! Candidate detection: rule table, confidence accumulation, post-processing

use crate::analysis::{FeatureVector, FillState};
use crate::config::{Config, ThresholdConfig};
use crate::error::Result;

/// How a rule participates in classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Any true primary rule flags the window as a candidate
    Primary,
    /// Adjusts confidence only, never flips the candidate bit
    Secondary,
    /// Combination bonus or activity penalty, confidence only
    Bonus,
}

/// One detection rule: a predicate plus the confidence it contributes
pub struct Rule {
    pub reason: &'static str,
    pub kind: RuleKind,
    pub weight: f64,
    pub test: fn(&FeatureVector, &ThresholdConfig) -> bool,
}

fn dense_and_far(f: &FeatureVector, t: &ThresholdConfig) -> bool {
    f.density_z > t.density_z && f.groove_dist > t.dist
}

fn tom_jump(f: &FeatureVector, t: &ThresholdConfig) -> bool {
    f.tom_ratio_jump > t.tom_jump
}

fn very_dense(f: &FeatureVector, t: &ThresholdConfig) -> bool {
    f.note_density > t.very_dense
}

fn tom_heavy_elevated(f: &FeatureVector, t: &ThresholdConfig) -> bool {
    f.tom_fraction > t.tom_fraction && f.density_z > 1.0
}

fn hat_dropout(f: &FeatureVector, _t: &ThresholdConfig) -> bool {
    f.hat_dropout > 0.5
}

fn kick_drop(f: &FeatureVector, _t: &ThresholdConfig) -> bool {
    f.kick_drop > 0.5
}

fn irregular_timing(f: &FeatureVector, _t: &ThresholdConfig) -> bool {
    f.ioi_std_z > 2.0
}

fn novel_ngrams(f: &FeatureVector, _t: &ThresholdConfig) -> bool {
    f.ngram_novelty > 0.5
}

fn same_pad_burst(f: &FeatureVector, _t: &ThresholdConfig) -> bool {
    f.same_pad_burst
}

fn crash_resolve(f: &FeatureVector, _t: &ThresholdConfig) -> bool {
    f.crash_resolve
}

fn density_with_tom_jump(f: &FeatureVector, t: &ThresholdConfig) -> bool {
    f.density_z > t.density_z && f.tom_ratio_jump > t.tom_jump
}

fn low_activity(f: &FeatureVector, _t: &ThresholdConfig) -> bool {
    f.note_density < 0.5
}

/// The ordered rule set, evaluated uniformly per window
pub const RULES: &[Rule] = &[
    Rule {
        reason: "density z and groove distance both elevated",
        kind: RuleKind::Primary,
        weight: 0.4,
        test: dense_and_far,
    },
    Rule {
        reason: "tom ratio jump",
        kind: RuleKind::Primary,
        weight: 0.35,
        test: tom_jump,
    },
    Rule {
        reason: "very dense",
        kind: RuleKind::Primary,
        weight: 0.3,
        test: very_dense,
    },
    Rule {
        reason: "tom-heavy at elevated density",
        kind: RuleKind::Primary,
        weight: 0.3,
        test: tom_heavy_elevated,
    },
    Rule {
        reason: "hat dropout",
        kind: RuleKind::Secondary,
        weight: 0.1,
        test: hat_dropout,
    },
    Rule {
        reason: "kick drop",
        kind: RuleKind::Secondary,
        weight: 0.1,
        test: kick_drop,
    },
    Rule {
        reason: "irregular timing",
        kind: RuleKind::Secondary,
        weight: 0.1,
        test: irregular_timing,
    },
    Rule {
        reason: "novel n-grams",
        kind: RuleKind::Secondary,
        weight: 0.15,
        test: novel_ngrams,
    },
    Rule {
        reason: "same-pad burst",
        kind: RuleKind::Secondary,
        weight: 0.1,
        test: same_pad_burst,
    },
    Rule {
        reason: "crash resolve",
        kind: RuleKind::Secondary,
        weight: 0.1,
        test: crash_resolve,
    },
    Rule {
        reason: "density and tom jump together",
        kind: RuleKind::Bonus,
        weight: 0.15,
        test: density_with_tom_jump,
    },
    Rule {
        reason: "very low activity",
        kind: RuleKind::Bonus,
        weight: -0.2,
        test: low_activity,
    },
];

/// Evaluate the rule table for one feature vector
pub fn classify_window(features: &FeatureVector, thresholds: &ThresholdConfig) -> (bool, f64) {
    let mut is_candidate = false;
    let mut confidence = 0.0;
    for rule in RULES {
        if (rule.test)(features, thresholds) {
            confidence += rule.weight;
            if rule.kind == RuleKind::Primary {
                is_candidate = true;
            }
        }
    }
    (is_candidate, confidence.clamp(0.0, 1.0))
}

/// Flag candidate windows, then drop single-frame noise and groups whose
/// duration falls outside the configured fill bounds
pub fn run(state: &mut FillState, config: &Config) -> Result<()> {
    let t = &config.thresholds;

    for window in state.windows.iter_mut() {
        let (is_candidate, confidence) = classify_window(&window.features, t);
        if is_candidate {
            let reasons: Vec<&str> = RULES
                .iter()
                .filter(|rule| (rule.test)(&window.features, t))
                .map(|rule| rule.reason)
                .collect();
            log::debug!(
                "window {}..{} flagged ({})",
                window.start_tick,
                window.end_tick,
                reasons.join(", ")
            );
        }
        window.is_candidate = is_candidate;
        window.confidence = confidence;
    }

    remove_isolated(state, t);
    enforce_group_duration(state, config);

    log::debug!(
        "{} candidate windows after post-processing",
        state.windows.iter().filter(|w| w.is_candidate).count()
    );
    Ok(())
}

/// Clear isolated single-window candidates unless their evidence is extreme.
///
/// A lone flagged window with quiet neighbors is usually one odd bar, not a
/// fill; a window twice over threshold is kept even alone.
fn remove_isolated(state: &mut FillState, t: &ThresholdConfig) {
    let flags: Vec<bool> = state.windows.iter().map(|w| w.is_candidate).collect();
    for (i, window) in state.windows.iter_mut().enumerate() {
        if !flags[i] {
            continue;
        }
        let prev = i > 0 && flags[i - 1];
        let next = i + 1 < flags.len() && flags[i + 1];
        if prev || next {
            continue;
        }
        let f = &window.features;
        let extreme = f.density_z > 2.0 * t.density_z
            || f.groove_dist > 2.0 * t.dist
            || f.tom_ratio_jump > 2.0 * t.tom_jump;
        if !extreme {
            window.is_candidate = false;
        }
    }
}

/// Drop whole candidate groups whose window span converts to a beat duration
/// outside `[min_beats, max_beats]`
fn enforce_group_duration(state: &mut FillState, config: &Config) {
    let t = &config.thresholds;
    let n = state.windows.len();
    let mut i = 0usize;
    while i < n {
        if !state.windows[i].is_candidate {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && state.windows[i].is_candidate {
            i += 1;
        }
        let group_len = i - start;
        let beats = (group_len - 1) as f64 * config.stride_beats + config.window_beats;
        if beats < t.min_beats || beats > t.max_beats {
            for window in &mut state.windows[start..i] {
                window.is_candidate = false;
            }
        }
    }
}
