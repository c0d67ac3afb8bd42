//! Survey-region report: which boxels around a central system hold systems
//! of the wanted mass codes, and what stars and landable planets they carry

use std::sync::Arc;

use anyhow::{bail, Result};
use exobio_core::{
    Cuboid, RegionCenter, StarSystemRecord, SystemCache, SystemNameBreakout,
};
use tracing::info;

/// Occurrence counter preserving first-seen order
#[derive(Debug, Default)]
struct CountTracker {
    counts: Vec<(String, usize)>,
}

impl CountTracker {
    fn bump(&mut self, key: &str) {
        match self
            .counts
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, count)) => *count += 1,
            None => self.counts.push((key.to_string(), 1)),
        }
    }

    /// "Key (n)" entries, most frequent first
    fn summary(mut self) -> String {
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        let parts: Vec<String> = self
            .counts
            .into_iter()
            .map(|(key, count)| format!("{key} ({count})"))
            .collect();
        parts.join(", ")
    }
}

/// Cache every system in a cube around `central_system`, then print one
/// tab-separated row per boxel prefix whose mass code is wanted: system
/// count with minor-series range, and histograms of star classes, landable
/// planet types, and their atmospheres.
pub async fn find_mass_code_systems_in_cube(
    cache: &mut SystemCache,
    central_system: &str,
    size: f64,
    mass_codes: &[String],
) -> Result<()> {
    let center = RegionCenter::Name(central_system.to_string());
    cache.cache_systems_in_cube(&center, size).await?;

    let Some(central) = cache.get(central_system) else {
        bail!("central system {central_system} is not known to the catalog");
    };
    let Some(coordinates) = central.coordinates else {
        bail!("central system {central_system} has no coordinates");
    };

    let cuboid = Cuboid::around(coordinates, size);
    let records = cache.systems_in_cuboid(&cuboid);
    info!(systems = records.len(), %cuboid, "surveying region");

    let wanted: Vec<String> = mass_codes.iter().map(|c| c.to_lowercase()).collect();

    // Group matching systems by boxel prefix, first-seen order
    let mut by_prefix: Vec<(String, Vec<(Arc<StarSystemRecord>, SystemNameBreakout)>)> =
        Vec::new();
    for record in records {
        let Some(breakout) = SystemNameBreakout::parse(&record.name) else {
            continue;
        };
        if !wanted.contains(&breakout.mass_code.to_lowercase()) {
            continue;
        }
        let prefix = breakout.prefix();
        match by_prefix.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, group)) => group.push((record, breakout)),
            None => by_prefix.push((prefix, vec![(record, breakout)])),
        }
    }

    by_prefix.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    println!("Prefix\tCounts\tStar Types\tPlanet Types\tAtmosphere Types");

    for (prefix, group) in by_prefix {
        let mut star_types = CountTracker::default();
        let mut planet_types = CountTracker::default();
        let mut atmosphere_types = CountTracker::default();

        for body in group
            .iter()
            .flat_map(|(record, _)| record.bodies.iter().flatten())
        {
            if body.is_star() {
                if let Some(class) = body.star_class() {
                    star_types.bump(class);
                }
            } else if let exobio_core::BodyDetail::Planet {
                sub_type,
                atmosphere_type,
                is_landable,
            } = &body.detail
            {
                if !is_landable {
                    continue;
                }
                if let Some(sub_type) = sub_type.as_deref().filter(|s| !s.trim().is_empty()) {
                    planet_types.bump(sub_type);
                }
                let atmosphere = atmosphere_type
                    .as_deref()
                    .filter(|s| !s.trim().is_empty() && !s.eq_ignore_ascii_case("no atmosphere"));
                if let Some(atmosphere) = atmosphere {
                    atmosphere_types.bump(atmosphere);
                }
            }
        }

        let min = group.iter().map(|(_, b)| b.minor_series).min().unwrap_or(0);
        let max = group.iter().map(|(_, b)| b.minor_series).max().unwrap_or(0);
        let counts = format!("{} ({} - {})", group.len(), min, max);

        println!(
            "{prefix}\t{counts}\t{}\t{}\t{}",
            star_types.summary(),
            planet_types.summary(),
            atmosphere_types.summary()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_tracker_orders_by_frequency() {
        let mut tracker = CountTracker::default();
        tracker.bump("K");
        tracker.bump("M");
        tracker.bump("M");
        tracker.bump("k");

        assert_eq!(tracker.summary(), "K (2), M (2)");
    }

    #[test]
    fn test_count_tracker_empty() {
        assert_eq!(CountTracker::default().summary(), "");
    }
}
