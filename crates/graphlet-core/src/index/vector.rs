//! Brute-force vector similarity search.

use std::cmp::Ordering;

use graphlet_common::types::{Uid, VectorMetric};

/// Returns the `k` candidates nearest to `probe`, nearest first.
///
/// Ties are broken by ascending entity id so results are deterministic.
#[must_use]
pub fn nearest<'a, I>(candidates: I, probe: &[f32], k: usize, metric: VectorMetric) -> Vec<(Uid, f64)>
where
    I: IntoIterator<Item = (Uid, &'a [f32])>,
{
    let mut scored: Vec<(Uid, f64)> = candidates
        .into_iter()
        .map(|(uid, vector)| (uid, metric.distance(vector, probe)))
        .collect();
    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}
