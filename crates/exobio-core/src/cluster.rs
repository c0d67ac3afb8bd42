//! Spatial clustering of scan systems
//!
//! Groups coordinate-bearing scan systems into proximity clusters with a
//! greedy three-phase pass: seed from globally closest pairs, expand each
//! cluster with nearby loners, then merge clusters whose centers fall within
//! the linking distance. Greedy and heuristic; it does not chase a globally
//! optimal partition.

use std::collections::HashSet;

use crate::bio::ScanSystem;
use crate::error::{Error, Result};
use crate::geometry::{mean_centroid, Coordinates, Cuboid};

/// A cluster of scan systems, keyed by system name.
///
/// Aggregates (bounds, center, radius, centroid, center system) are computed
/// on first access and cached until the next membership change. Clusters
/// grow; they never shrink.
#[derive(Debug, Clone)]
pub struct ScanSystemGroup {
    members: Vec<ScanSystem>,
    names: HashSet<String>,
    bounds: Option<Cuboid>,
    radius: Option<f64>,
    centroid: Option<Coordinates>,
    center_member: Option<usize>,
}

impl ScanSystemGroup {
    /// Seed a new cluster from its initial pair
    pub fn from_pair(a: ScanSystem, b: ScanSystem) -> Self {
        let mut group = Self {
            members: Vec::with_capacity(2),
            names: HashSet::new(),
            bounds: None,
            radius: None,
            centroid: None,
            center_member: None,
        };
        group.add(a);
        group.add(b);
        group
    }

    /// Add a member; a system already present (by name, case-insensitive)
    /// is ignored. Returns whether membership changed.
    pub fn add(&mut self, system: ScanSystem) -> bool {
        if !self.names.insert(system.name().to_lowercase()) {
            return false;
        }
        self.members.push(system);
        self.invalidate();
        true
    }

    pub fn contains(&self, system_name: &str) -> bool {
        self.names.contains(&system_name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[ScanSystem] {
        &self.members
    }

    /// Total scans across all members
    pub fn scan_count(&self) -> usize {
        self.members.iter().map(|m| m.scan_count()).sum()
    }

    fn invalidate(&mut self) {
        self.bounds = None;
        self.radius = None;
        self.centroid = None;
        self.center_member = None;
    }

    fn member_coordinates(&self) -> Result<Vec<Coordinates>> {
        self.members.iter().map(|m| m.coordinates()).collect()
    }

    /// Bounding cuboid over all members
    pub fn bounds(&mut self) -> Result<Cuboid> {
        if let Some(bounds) = self.bounds {
            return Ok(bounds);
        }
        let bounds = Cuboid::enclosing(self.member_coordinates()?)
            .ok_or_else(|| Error::internal("bounds of an empty cluster"))?;
        self.bounds = Some(bounds);
        Ok(bounds)
    }

    /// Cluster center: the bounding cuboid's midpoint
    pub fn center(&mut self) -> Result<Coordinates> {
        Ok(self.bounds()?.center())
    }

    /// Maximum member distance to the center
    pub fn radius(&mut self) -> Result<f64> {
        if let Some(radius) = self.radius {
            return Ok(radius);
        }
        let center = self.center()?;
        let radius = self
            .member_coordinates()?
            .iter()
            .map(|c| c.distance(&center))
            .fold(0.0_f64, f64::max);
        self.radius = Some(radius);
        Ok(radius)
    }

    /// Arithmetic mean of member positions. Diagnostics only; distance
    /// decisions use [`Self::center`].
    pub fn centroid(&mut self) -> Result<Coordinates> {
        if let Some(centroid) = self.centroid {
            return Ok(centroid);
        }
        let centroid = mean_centroid(self.member_coordinates()?)
            .ok_or_else(|| Error::internal("centroid of an empty cluster"))?;
        self.centroid = Some(centroid);
        Ok(centroid)
    }

    /// The member nearest to the cluster center
    pub fn center_system(&mut self) -> Result<&ScanSystem> {
        if self.center_member.is_none() {
            let center = self.center()?;
            let coords = self.member_coordinates()?;
            let nearest = coords
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.distance(&center).total_cmp(&b.distance(&center)))
                .map(|(i, _)| i)
                .ok_or_else(|| Error::internal("center system of an empty cluster"))?;
            self.center_member = Some(nearest);
        }
        // The memo is always a valid index into members
        Ok(&self.members[self.center_member.unwrap_or_default()])
    }

    /// Members ordered nearest-to-center first, for reporting
    pub fn members_by_center_distance(&mut self) -> Result<Vec<&ScanSystem>> {
        let center = self.center()?;
        let mut ordered: Vec<(f64, usize)> = self
            .member_coordinates()?
            .iter()
            .enumerate()
            .map(|(i, c)| (c.distance(&center), i))
            .collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(ordered.iter().map(|(_, i)| &self.members[*i]).collect())
    }

    fn absorb(&mut self, other: ScanSystemGroup) {
        for member in other.members {
            self.add(member);
        }
    }
}

/// Cluster scan systems by proximity.
///
/// Phase 1 seeds two-member clusters from the globally closest qualifying
/// pair, repeatedly. Phase 2 attaches remaining loners to the first cluster
/// (in creation order) whose center lies within `max_distance`. Phase 3
/// merges clusters, largest radius first, whenever two centers fall within
/// `max_distance`, restarting until stable.
///
/// Every input system must have coordinates; the orphans that never joined
/// a cluster are simply absent from the result. Returned clusters are
/// ordered most-members first, then larger radius first.
pub fn cluster_scan_systems(
    systems: Vec<ScanSystem>,
    max_distance: f64,
) -> Result<Vec<ScanSystemGroup>> {
    let coords: Vec<Coordinates> = systems
        .iter()
        .map(|s| s.coordinates())
        .collect::<Result<_>>()?;
    let mut pool: Vec<Option<ScanSystem>> = systems.into_iter().map(Some).collect();
    let mut groups: Vec<ScanSystemGroup> = Vec::new();

    // Phase 1: seed from the globally closest unclaimed pair
    loop {
        let mut best: Option<(usize, usize, f64)> = None;

        for i in 0..pool.len() {
            if pool[i].is_none() {
                continue;
            }
            for j in (i + 1)..pool.len() {
                if pool[j].is_none() {
                    continue;
                }
                let d = coords[i].distance(&coords[j]);
                if d > max_distance {
                    continue;
                }
                // First-found wins among equal distances
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((i, j, d));
                }
            }
        }

        let Some((i, j, _)) = best else { break };
        let a = pool[i].take().ok_or_else(|| Error::internal("seed pair vanished"))?;
        let b = pool[j].take().ok_or_else(|| Error::internal("seed pair vanished"))?;
        groups.push(ScanSystemGroup::from_pair(a, b));
    }

    // Phase 2: each loner joins the first cluster whose current center is
    // near enough. Adding a member moves the center for later candidates.
    for group in &mut groups {
        for i in 0..pool.len() {
            if pool[i].is_none() {
                continue;
            }
            if coords[i].distance(&group.center()?) <= max_distance {
                if let Some(system) = pool[i].take() {
                    group.add(system);
                }
            }
        }
    }

    // Phase 3: merge clusters with centers within reach, largest radius
    // first, restarting after every merge
    'merge: loop {
        let mut order: Vec<(usize, f64)> = Vec::with_capacity(groups.len());
        for (idx, group) in groups.iter_mut().enumerate() {
            order.push((idx, group.radius()?));
        }
        order.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (pos, &(a, _)) in order.iter().enumerate() {
            let center_a = groups[a].center()?;
            for &(b, _) in order.iter().skip(pos + 1) {
                if center_a.distance(&groups[b].center()?) <= max_distance {
                    let absorbed = groups.remove(b);
                    let a = if b < a { a - 1 } else { a };
                    groups[a].absorb(absorbed);
                    continue 'merge;
                }
            }
        }

        break;
    }

    // Reporting order: most members first, then larger radius
    let mut keyed: Vec<(usize, f64, ScanSystemGroup)> = Vec::with_capacity(groups.len());
    for mut group in groups {
        let radius = group.radius()?;
        keyed.push((group.len(), radius, group));
    }
    keyed.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.total_cmp(&a.1)));

    Ok(keyed.into_iter().map(|(_, _, g)| g).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::record;
    use std::sync::Arc;

    fn scan_system(name: &str, x: f64, y: f64, z: f64) -> ScanSystem {
        ScanSystem::new(
            Arc::new(record(name, Some(Coordinates::new(x, y, z)), None)),
            vec![],
        )
    }

    #[test]
    fn test_close_pair_clusters_distant_system_stays_out() {
        let systems = vec![
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 1.0, 0.0, 0.0),
            scan_system("C", 50.0, 0.0, 0.0),
        ];

        let groups = cluster_scan_systems(systems, 5.0).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert!(groups[0].contains("A"));
        assert!(groups[0].contains("B"));
        assert!(!groups[0].contains("C"));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut group = ScanSystemGroup::from_pair(
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 2.0, 0.0, 0.0),
        );

        assert!(!group.add(scan_system("a", 0.0, 0.0, 0.0)));
        assert_eq!(group.len(), 2);

        assert!(group.add(scan_system("C", 1.0, 1.0, 0.0)));
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_radius_is_exact_and_tracks_membership() {
        let mut group = ScanSystemGroup::from_pair(
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 4.0, 0.0, 0.0),
        );

        // Center (2,0,0); both members 2.0 away
        assert_eq!(group.center().unwrap(), Coordinates::new(2.0, 0.0, 0.0));
        assert_eq!(group.radius().unwrap(), 2.0);

        // Extending the box moves the center and the radius
        group.add(scan_system("C", 10.0, 0.0, 0.0));
        assert_eq!(group.center().unwrap(), Coordinates::new(5.0, 0.0, 0.0));
        assert_eq!(group.radius().unwrap(), 5.0);
    }

    #[test]
    fn test_center_system_is_nearest_member() {
        let mut group = ScanSystemGroup::from_pair(
            scan_system("Left", 0.0, 0.0, 0.0),
            scan_system("Right", 10.0, 0.0, 0.0),
        );
        group.add(scan_system("Middle", 6.0, 0.0, 0.0));

        assert_eq!(group.center_system().unwrap().name(), "Middle");

        let ordered = group.members_by_center_distance().unwrap();
        assert_eq!(ordered[0].name(), "Middle");
        assert_eq!(ordered.len(), 3);
    }

    #[test]
    fn test_seeding_picks_globally_closest_pair_first() {
        // B-C is the closest pair; A must not grab B just by coming first
        let systems = vec![
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 3.0, 0.0, 0.0),
            scan_system("C", 4.0, 0.0, 0.0),
        ];

        let groups = cluster_scan_systems(systems, 100.0).unwrap();
        // B-C seeds first; A then joins by expansion or merge into one group
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_expansion_attaches_loner_within_reach() {
        let systems = vec![
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 1.0, 0.0, 0.0),
            scan_system("C", 3.0, 0.0, 0.0),
        ];

        // A-B seed (distance 1); C is 2.5 from the center (0.5,0,0)
        let groups = cluster_scan_systems(systems, 2.6).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].contains("C"));
    }

    #[test]
    fn test_merging_joins_nearby_clusters() {
        // Two tight pairs whose centers sit 4 apart
        let systems = vec![
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 1.0, 0.0, 0.0),
            scan_system("C", 4.0, 0.0, 0.0),
            scan_system("D", 5.0, 0.0, 0.0),
        ];

        let merged = cluster_scan_systems(systems, 4.0).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 4);
    }

    #[test]
    fn test_far_apart_clusters_stay_separate() {
        let systems = vec![
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 1.0, 0.0, 0.0),
            scan_system("C", 100.0, 0.0, 0.0),
            scan_system("D", 101.0, 0.0, 0.0),
            scan_system("E", 100.5, 1.0, 0.0),
        ];

        let mut groups = cluster_scan_systems(systems, 5.0).unwrap();
        assert_eq!(groups.len(), 2);
        // Most members first
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1].len(), 2);
        assert!(groups[0].contains("E"));
        assert!(groups[0].center().is_ok());
    }

    #[test]
    fn test_missing_coordinates_is_an_error() {
        let systems = vec![
            scan_system("A", 0.0, 0.0, 0.0),
            ScanSystem::new(Arc::new(record("NoCoords", None, None)), vec![]),
        ];

        assert!(matches!(
            cluster_scan_systems(systems, 5.0),
            Err(Error::MissingCoordinates(name)) if name == "NoCoords"
        ));
    }

    #[test]
    fn test_no_qualifying_pairs_yields_no_clusters() {
        let systems = vec![
            scan_system("A", 0.0, 0.0, 0.0),
            scan_system("B", 50.0, 0.0, 0.0),
        ];
        assert!(cluster_scan_systems(systems, 5.0).unwrap().is_empty());
    }
}
