//! Angular distance and first-match association.
//!
//! The association policy is deliberately "first found": candidates are
//! scanned in collection order and the first one closer than the threshold
//! wins, even if a later candidate is closer. Ntuples produced with this
//! policy are only comparable with each other if it never changes.

use calotuple_core::{CaloCluster, CaloRings, Direction, Directional};
use std::collections::HashSet;
use std::f32::consts::PI;

/// Angular separation ΔR between two directions.
///
/// The phi difference takes the short way around the circle.
#[inline]
#[must_use]
pub fn delta_r(a: Direction, b: Direction) -> f32 {
    let deta = (a.eta - b.eta).abs();
    let raw_dphi = (a.phi - b.phi).abs();
    let dphi = if raw_dphi < PI {
        raw_dphi
    } else {
        2.0 * PI - raw_dphi
    };
    deta.hypot(dphi)
}

/// Returns the first candidate strictly closer than `threshold` to `reference`.
///
/// Later candidates are never examined once one qualifies.
pub fn associate<T, I>(reference: Direction, candidates: I, threshold: f32) -> Option<T>
where
    I: IntoIterator<Item = (Direction, T)>,
{
    candidates
        .into_iter()
        .find(|(direction, _)| delta_r(reference, *direction) < threshold)
        .map(|(_, candidate)| candidate)
}

/// Finds the cluster associated with a seed direction.
#[must_use]
pub fn match_cluster(
    reference: Direction,
    clusters: &[CaloCluster],
    threshold: f32,
) -> Option<&CaloCluster> {
    associate(
        reference,
        clusters.iter().map(|c| (c.direction(), c)),
        threshold,
    )
}

/// Finds the ring descriptor built from `cluster`.
///
/// This is an identity lookup on the back-reference, not a distance search.
#[must_use]
pub fn match_rings<'a>(cluster: &CaloCluster, rings: &'a [CaloRings]) -> Option<&'a CaloRings> {
    rings.iter().find(|r| r.belongs_to(cluster))
}

/// True if no two clusters share an id.
///
/// Ring lookup by id is only meaningful when this holds.
#[must_use]
pub fn has_unique_ids(clusters: &[CaloCluster]) -> bool {
    let mut seen = HashSet::with_capacity(clusters.len());
    clusters.iter().all(|c| seen.insert(c.id))
}
