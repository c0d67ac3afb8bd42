//! Organic scan reports: findings per species, and clumps of valuable
//! systems worth revisiting in one circuit

use std::collections::HashMap;

use anyhow::{bail, Result};
use console::style;
use exobio_core::{
    cluster_scan_systems, BioEntityInfo, BioEntityScan, BodyDetail, ScanSystem, SystemCache,
    SystemMap,
};
use tracing::{info, warn};

use crate::journal::{JournalEntry, JournalEvent};

/// Extract analysed organic scans from the journal stream.
///
/// A Touchdown names the current system; subsequent analysed ScanOrganic
/// events are attributed to it. Scans before any touchdown, or with missing
/// fields, are discarded with a warning.
pub fn extract_scans(entries: &[JournalEntry]) -> Vec<BioEntityScan> {
    let mut current_system: Option<String> = None;
    let mut scans = Vec::new();

    for entry in entries {
        match &entry.event {
            JournalEvent::Touchdown { star_system } => {
                if let Some(name) = star_system {
                    if !name.trim().is_empty() {
                        current_system = Some(name.clone());
                    }
                }
            }
            JournalEvent::ScanOrganic {
                scan_type,
                species,
                system_address,
                body,
            } if scan_type == "Analyse" => {
                let Some(system_name) = &current_system else {
                    warn!("discarding organic scan before any touchdown");
                    continue;
                };
                match (species, system_address, body) {
                    (Some(species), Some(address), Some(body)) if !species.trim().is_empty() => {
                        scans.push(BioEntityScan {
                            system_name: system_name.clone(),
                            system_id: *address,
                            body_id: *body,
                            species_id: species.clone(),
                        });
                    }
                    _ => {
                        warn!(system = %system_name, "discarding incomplete organic scan");
                    }
                }
            }
            _ => {}
        }
    }

    scans
}

/// Assemble per-species display names and values from sale events.
///
/// The first observed name and value win; later disagreements are reported
/// but do not override. Species with no usable name or value are dropped.
pub fn collect_species_info(entries: &[JournalEntry]) -> Vec<BioEntityInfo> {
    let mut order: Vec<String> = Vec::new();
    let mut genus: HashMap<String, String> = HashMap::new();
    let mut species_names: HashMap<String, String> = HashMap::new();
    let mut values: HashMap<String, f64> = HashMap::new();

    for entry in entries {
        let JournalEvent::SellOrganicData { bio_data: Some(data) } = &entry.event else {
            continue;
        };

        for sale in data {
            let Some(id) = sale.species.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            if !genus.contains_key(id)
                && !species_names.contains_key(id)
                && !values.contains_key(id)
            {
                order.push(id.to_string());
            }

            if let Some(name) = sale.genus_localised.as_deref().filter(|s| !s.is_empty()) {
                let known = genus.entry(id.to_string()).or_insert_with(|| name.to_string());
                if known != name {
                    warn!(species = id, "conflicting genus names in sale data");
                }
            }
            if let Some(name) = sale.species_localised.as_deref().filter(|s| !s.is_empty()) {
                let known = species_names
                    .entry(id.to_string())
                    .or_insert_with(|| name.to_string());
                if known != name {
                    warn!(species = id, "conflicting species names in sale data");
                }
            }
            if let Some(value) = sale.value {
                let known = values.entry(id.to_string()).or_insert(value);
                if *known != value {
                    warn!(species = id, "conflicting values in sale data");
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| {
            let genus = match genus.get(&id) {
                Some(g) => g.clone(),
                None => {
                    warn!(species = %id, "no genus name in sale data");
                    return None;
                }
            };
            let species = match species_names.get(&id) {
                Some(s) => s.clone(),
                None => {
                    warn!(species = %id, "no species name in sale data");
                    return None;
                }
            };
            let value = match values.get(&id) {
                Some(v) => *v,
                None => {
                    warn!(species = %id, "no value in sale data");
                    return None;
                }
            };
            Some(BioEntityInfo {
                species_id: id,
                genus,
                species,
                value,
            })
        })
        .collect()
}

fn unique_system_names(scans: &[BioEntityScan]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut seen: HashMap<String, ()> = HashMap::new();
    for scan in scans {
        if seen.insert(scan.system_name.to_lowercase(), ()).is_none() {
            names.push(scan.system_name.clone());
        }
    }
    names
}

/// Tabular report of every analysed species: where it was found, on what
/// kind of planet, under what star. Tab-separated, highest value first.
pub async fn findings_report(cache: &mut SystemCache, entries: &[JournalEntry]) -> Result<()> {
    let scans = extract_scans(entries);
    if scans.is_empty() {
        bail!("no analysed organic scans found in the journals");
    }

    let mut infos = collect_species_info(entries);
    infos.sort_by(|a, b| b.value.total_cmp(&a.value));

    cache.cache_systems(&unique_system_names(&scans)).await?;

    println!("Species\tValue\tSystem\tPrimary\tSize\tPlanet\tType\tAtmosphere");

    for info in &infos {
        let mut first_for_species = true;
        let mut by_system: Vec<(String, Vec<&BioEntityScan>)> = Vec::new();
        for scan in scans.iter().filter(|s| s.species_id == info.species_id) {
            match by_system.iter_mut().find(|(name, _)| *name == scan.system_name) {
                Some((_, group)) => group.push(scan),
                None => by_system.push((scan.system_name.clone(), vec![scan])),
            }
        }

        let value_mcr = format!("{:.1}", info.value / 1_000_000.0);

        for (system_name, group) in by_system {
            let record = cache
                .get(&system_name)
                .ok_or_else(|| exobio_core::Error::SystemNotFound(system_name.clone()))?;
            let map = SystemMap::build(&record)?;

            let primary = record.primary_star_class().unwrap_or("<unknown>").to_string();
            let size = format!("{} S, {} P", record.star_count(), record.planet_count());
            let mut first_for_system = true;

            for scan in group {
                let node = map.node(scan.body_id).ok_or(exobio_core::Error::BodyNotFound {
                    system: system_name.clone(),
                    id: scan.body_id,
                })?;
                let Some(body) = &node.body else {
                    bail!("body {} of {} is not a planet", scan.body_id, system_name);
                };
                let BodyDetail::Planet {
                    sub_type,
                    atmosphere_type,
                    ..
                } = &body.detail
                else {
                    bail!("body {} of {} is not a planet", scan.body_id, system_name);
                };

                let planet_name = body
                    .name
                    .strip_prefix(system_name.as_str())
                    .unwrap_or(&body.name)
                    .trim();

                let columns = [
                    if first_for_species { info.species.as_str() } else { "" },
                    if first_for_species { value_mcr.as_str() } else { "" },
                    if first_for_system { system_name.as_str() } else { "" },
                    if first_for_system { primary.as_str() } else { "" },
                    if first_for_system { size.as_str() } else { "" },
                    planet_name,
                    sub_type.as_deref().unwrap_or("<unknown>"),
                    atmosphere_type.as_deref().unwrap_or("<unknown>"),
                ];
                println!("{}", columns.join("\t"));
                first_for_species = false;
                first_for_system = false;
            }
        }
    }

    Ok(())
}

/// Cluster the systems holding scans worth at least `min_value_millions`
/// MCr and print each clump with its members, nearest the center first.
pub async fn clump_report(
    cache: &mut SystemCache,
    entries: &[JournalEntry],
    min_value_millions: f64,
    max_distance: f64,
) -> Result<()> {
    let min_value = min_value_millions * 1_000_000.0;
    let infos: HashMap<String, BioEntityInfo> = collect_species_info(entries)
        .into_iter()
        .map(|i| (i.species_id.clone(), i))
        .collect();

    let mut valuable: Vec<BioEntityScan> = Vec::new();
    for scan in extract_scans(entries) {
        match infos.get(&scan.species_id) {
            Some(info) if info.value >= min_value => valuable.push(scan),
            Some(_) => {}
            None => warn!(species = %scan.species_id, "no sale info for scanned species"),
        }
    }

    if valuable.is_empty() {
        bail!("no scans at or above {min_value_millions:.1} MCr found in the journals");
    }

    cache.cache_systems(&unique_system_names(&valuable)).await?;

    let mut scan_systems: Vec<ScanSystem> = Vec::new();
    for name in unique_system_names(&valuable) {
        let Some(record) = cache.get(&name) else {
            warn!(system = %name, "scan system not in cache, skipping");
            continue;
        };
        let scans = valuable
            .iter()
            .filter(|s| s.system_name == name)
            .cloned()
            .collect();
        scan_systems.push(ScanSystem::new(record, scans));
    }

    let groups = cluster_scan_systems(scan_systems, max_distance)?;
    info!(groups = groups.len(), "clustering finished");

    for (index, mut group) in groups.into_iter().enumerate() {
        let center = group.center()?;
        let radius = group.radius()?;

        println!();
        println!(
            "{}",
            style(format!(
                "Group #{}: {} systems, centered on [{}] in a {:.1} LY radius.",
                index + 1,
                group.len(),
                center,
                radius
            ))
            .bold()
        );

        let members: Vec<ScanSystem> = group
            .members_by_center_distance()?
            .into_iter()
            .cloned()
            .collect();
        for member in members {
            let distance = member.coordinates()?.distance(&center);
            println!(
                "  {} [{}], Distance from center {:.1} LY.",
                style(member.name()).cyan(),
                member.record,
                distance
            );

            let mut counts: Vec<(&BioEntityInfo, usize)> = Vec::new();
            for scan in &member.scans {
                let Some(info) = infos.get(&scan.species_id) else {
                    continue;
                };
                match counts.iter_mut().find(|(i, _)| i.species_id == info.species_id) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((info, 1)),
                }
            }
            counts.sort_by(|a, b| b.0.value.total_cmp(&a.0.value).then(b.1.cmp(&a.1)));

            for (info, count) in counts {
                let plural = if count > 1 { "s" } else { "" };
                println!(
                    "    {} ({:.1} MCr): {} occurrence{}",
                    info.species,
                    info.value / 1_000_000.0,
                    count,
                    plural
                );
            }
        }
    }

    Ok(())
}
