//! Rhythmic n-gram hashing and novelty scoring

use crate::analysis::ChartNote;
use crate::config::PatternConfig;
use std::collections::HashMap;

/// Bounded map from rhythmic-pattern hashes to observation counts.
///
/// The cache is the only state a caller may keep alive across charts: scoring
/// a second song against a cache warmed on the first makes shared grooves
/// read as familiar. It is a single-owner mutable resource; callers sharing
/// one instance across threads must serialize access themselves.
#[derive(Debug, Clone)]
pub struct PatternCache {
    counts: HashMap<u64, u32>,
    max_size: usize,
}

impl PatternCache {
    /// Create a cache bounded to roughly `max_size` entries
    pub fn new(max_size: usize) -> Self {
        PatternCache {
            counts: HashMap::new(),
            max_size: max_size.max(16),
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Forget everything seen so far
    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Score how many of `patterns` are unseen, recording each as observed.
    ///
    /// A pattern repeated inside the same call counts as unseen only the
    /// first time; later windows of the song then see it as familiar. Returns
    /// unseen/total, 0.0 for an empty slice.
    pub fn observe_and_score(&mut self, patterns: &[u64]) -> f64 {
        if patterns.is_empty() {
            return 0.0;
        }

        let mut unseen = 0usize;
        for &pattern in patterns {
            let count = self.counts.entry(pattern).or_insert(0);
            if *count == 0 {
                unseen += 1;
            }
            *count += 1;
        }
        self.evict_if_needed();

        unseen as f64 / patterns.len() as f64
    }

    /// Drop the lowest-frequency quarter of entries once over `max_size`.
    ///
    /// Ties break on the hash value so eviction never depends on map
    /// iteration order.
    fn evict_if_needed(&mut self) {
        if self.counts.len() <= self.max_size {
            return;
        }
        let mut entries: Vec<(u64, u32)> = self.counts.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        let drop_n = self.counts.len() / 4;
        for (key, _) in entries.into_iter().take(drop_n) {
            self.counts.remove(&key);
        }
        log::debug!("pattern cache evicted {} entries", drop_n);
    }
}

/// Slide fixed-beat sub-windows across `[start_tick, end_tick)` and hash each
/// one into a pattern key
pub fn extract_ngrams(
    notes: &[ChartNote],
    start_tick: u64,
    end_tick: u64,
    resolution: u32,
    config: &PatternConfig,
) -> Vec<u64> {
    let sub_len = ((config.ngram_beats * resolution as f64).round() as u64).max(1);
    let stride = ((config.ngram_stride_beats * resolution as f64).round() as u64).max(1);

    let mut patterns = Vec::new();
    let mut sub_start = start_tick;
    while sub_start + sub_len <= end_tick {
        patterns.push(hash_pattern(
            notes,
            sub_start,
            sub_start + sub_len,
            resolution,
            config.grid_per_beat,
        ));
        sub_start += stride;
    }
    patterns
}

/// Quantize the notes of one sub-window onto the grid and hash the result.
///
/// Each grid cell contributes its sorted distinct voice initials (or `-` when
/// silent); cells join with `|`. The string is FNV-1a hashed so identical
/// rhythmic shapes map to identical keys regardless of tick offset.
pub fn hash_pattern(
    notes: &[ChartNote],
    start_tick: u64,
    end_tick: u64,
    resolution: u32,
    grid_per_beat: usize,
) -> u64 {
    let cell_ticks = resolution as f64 / grid_per_beat.max(1) as f64;
    let span = (end_tick - start_tick) as f64;
    let n_cells = ((span / cell_ticks).round() as usize).max(1);

    let mut cells: Vec<Vec<char>> = vec![Vec::new(); n_cells];
    for note in notes {
        if note.tick < start_tick || note.tick >= end_tick {
            continue;
        }
        let cell = (((note.tick - start_tick) as f64 / cell_ticks) as usize).min(n_cells - 1);
        let letter = note.voice.letter();
        if !cells[cell].contains(&letter) {
            cells[cell].push(letter);
        }
    }

    let mut text = String::with_capacity(n_cells * 3);
    for (i, cell) in cells.iter_mut().enumerate() {
        if i > 0 {
            text.push('|');
        }
        if cell.is_empty() {
            text.push('-');
        } else {
            cell.sort_unstable();
            for &c in cell.iter() {
                text.push(c);
            }
        }
    }

    fnv1a(text.as_bytes())
}

/// FNV-1a, 64-bit. Deterministic across runs and platforms.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}
