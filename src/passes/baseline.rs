//! Groove baseline: fit the statistical model and assign distances

use crate::analysis::FillState;
use crate::config::Config;
use crate::error::Result;
use crate::groove::GrooveModel;

/// Fit the groove model over stable windows and score every window's
/// Mahalanobis distance from it.
///
/// The training set excludes windows that already look extreme (high density
/// z, tom jump, or raw density) so the baseline is not contaminated by the
/// very fills being searched for. One global fit per song keeps the output
/// deterministic.
pub fn run(state: &mut FillState, config: &Config) -> Result<()> {
    let t = &config.thresholds;
    let stable: Vec<_> = state
        .windows
        .iter()
        .filter(|w| {
            let f = &w.features;
            f.density_z.abs() <= config.groove.stable_density_z
                && f.tom_ratio_jump <= t.tom_jump
                && f.note_density <= t.very_dense
        })
        .map(|w| w.features.groove_coords())
        .collect();

    let model = GrooveModel::fit(&stable, config.groove.min_samples);
    log::debug!(
        "groove model: {} stable windows, valid={}",
        model.sample_count,
        model.is_valid
    );

    for window in state.windows.iter_mut() {
        window.features.groove_dist = model.distance(&window.features.groove_coords());
    }
    state.groove = Some(model);
    Ok(())
}
