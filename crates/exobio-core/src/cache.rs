//! Persistent, name-keyed cache of star system records
//!
//! Records are fetched from the catalog at most once: a name that is already
//! cached is never refreshed, even if its body list is missing because an
//! earlier fetch failed. Every cache-extending call rewrites the whole store
//! through a temp file so a crash cannot corrupt existing data.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::geometry::{Coordinates, Cuboid};
use crate::remote::{
    is_empty_response, parse_summaries, parse_system_bodies, EdsmSummary, RegionCenter,
    SystemCatalog,
};
use crate::types::StarSystemRecord;

/// Summary batch size for the multi-system endpoint
const SYSTEMS_PER_CALL: usize = 10;

/// On-disk-backed mapping from system name to record
pub struct SystemCache {
    catalog: Arc<dyn SystemCatalog>,
    store_path: PathBuf,
    systems: Vec<Arc<StarSystemRecord>>,
    // Lazily rebuilt after any mutation; keys are lowercased names
    by_name: Option<HashMap<String, Arc<StarSystemRecord>>>,
}

impl SystemCache {
    /// Open the cache, loading any existing store from disk
    pub fn open(catalog: Arc<dyn SystemCatalog>, config: &CacheConfig) -> Result<Self> {
        let systems = Self::load(&config.store_path)?;
        info!("Loaded {} systems from cache.", systems.len());

        Ok(Self {
            catalog,
            store_path: config.store_path.clone(),
            systems,
            by_name: None,
        })
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<StarSystemRecord>> {
        self.systems.iter()
    }

    /// Look up a cached record by name, case-insensitively
    pub fn get(&mut self, name: &str) -> Option<Arc<StarSystemRecord>> {
        self.index().get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&mut self, name: &str) -> bool {
        self.index().contains_key(&name.to_lowercase())
    }

    /// Ensure every named system is cached. Names already present are left
    /// untouched; the rest are summarized in batches of [`SYSTEMS_PER_CALL`]
    /// and then enriched with their body lists one call per system.
    pub async fn cache_systems(&mut self, names: &[String]) -> Result<()> {
        let names_to_add = {
            let index = self.index();
            let mut seen = HashSet::new();
            names
                .iter()
                .filter(|n| {
                    let key = n.to_lowercase();
                    !index.contains_key(&key) && seen.insert(key)
                })
                .cloned()
                .collect::<Vec<_>>()
        };

        if names_to_add.is_empty() {
            return Ok(());
        }

        info!("Fetching {} new systems.", names_to_add.len());
        let mut records = self.fetch_summaries(&names_to_add).await;
        if records.is_empty() {
            warn!("No system summaries fetched; cache unchanged.");
            return Ok(());
        }

        self.fetch_bodies_into(&mut records).await;
        self.extend_and_persist(records)
    }

    /// Cache every system within a sphere around the given center
    pub async fn cache_systems_in_sphere(
        &mut self,
        center: &RegionCenter,
        radius: f64,
    ) -> Result<()> {
        let summaries = match self.catalog.systems_in_sphere(center, radius).await {
            Ok(json) => Self::parse_region_response(&json, "sphere"),
            Err(e) => {
                error!("EDSM sphere query failed: {e}");
                Vec::new()
            }
        };

        self.add_region_summaries(summaries).await
    }

    /// Cache every system within a cube of the given edge size
    pub async fn cache_systems_in_cube(&mut self, center: &RegionCenter, size: f64) -> Result<()> {
        let summaries = match self.catalog.systems_in_cube(center, size).await {
            Ok(json) => Self::parse_region_response(&json, "cube"),
            Err(e) => {
                error!("EDSM cube query failed: {e}");
                Vec::new()
            }
        };

        self.add_region_summaries(summaries).await
    }

    /// Cached records with coordinates within `radius` of `center`; no network
    pub fn systems_in_sphere(&self, center: &Coordinates, radius: f64) -> Vec<Arc<StarSystemRecord>> {
        self.systems
            .iter()
            .filter(|s| {
                s.coordinates
                    .map(|c| c.distance(center) <= radius)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Cached records with coordinates inside the cuboid; no network
    pub fn systems_in_cuboid(&self, cuboid: &Cuboid) -> Vec<Arc<StarSystemRecord>> {
        self.systems
            .iter()
            .filter(|s| s.coordinates.map(|c| cuboid.contains(&c)).unwrap_or(false))
            .cloned()
            .collect()
    }

    fn index(&mut self) -> &HashMap<String, Arc<StarSystemRecord>> {
        let systems = &self.systems;
        self.by_name.get_or_insert_with(|| {
            systems
                .iter()
                .map(|s| (s.name.to_lowercase(), Arc::clone(s)))
                .collect()
        })
    }

    fn parse_region_response(json: &str, what: &str) -> Vec<EdsmSummary> {
        if is_empty_response(json) {
            error!("EDSM returned empty response for {what} query.");
            return Vec::new();
        }

        match parse_summaries(json) {
            Ok(summaries) => summaries,
            Err(e) => {
                error!("Failed to parse {what} query response: {e}");
                Vec::new()
            }
        }
    }

    /// Add every summary not already cached, fetching body lists for the
    /// newcomers. Cached systems are not updated even if the region fetch
    /// returned fresher coordinates.
    async fn add_region_summaries(&mut self, summaries: Vec<EdsmSummary>) -> Result<()> {
        let mut records = {
            let index = self.index();
            let mut seen = HashSet::new();
            summaries
                .into_iter()
                .filter(|s| {
                    let key = s.name.to_lowercase();
                    !index.contains_key(&key) && seen.insert(key)
                })
                .map(StarSystemRecord::from)
                .collect::<Vec<_>>()
        };

        if records.is_empty() {
            return Ok(());
        }

        info!("Fetching bodies for {} non-cached systems.", records.len());
        self.fetch_bodies_into(&mut records).await;
        self.extend_and_persist(records)
    }

    /// Fetch summaries for the given names in fixed-size batches. A failed
    /// or malformed batch is logged and skipped; it never aborts the rest.
    async fn fetch_summaries(&self, names: &[String]) -> Vec<StarSystemRecord> {
        let blocks: Vec<&[String]> = names.chunks(SYSTEMS_PER_CALL).collect();
        let total = blocks.len();
        let mut records = Vec::new();

        for (index, block) in blocks.into_iter().enumerate() {
            info!("Fetching system summaries from EDSM ({} of {total}).", index + 1);

            let json = match self.catalog.systems_by_name(block).await {
                Ok(json) => json,
                Err(e) => {
                    error!("Summary fetch failed: {e}");
                    continue;
                }
            };

            if is_empty_response(&json) {
                error!("EDSM returned empty response for system summaries.");
                continue;
            }

            match parse_summaries(&json) {
                Ok(summaries) => {
                    records.extend(summaries.into_iter().map(StarSystemRecord::from));
                }
                Err(e) => {
                    error!("Failed to parse system summaries: {e}");
                }
            }
        }

        records
    }

    /// Fetch the full body list for each record, one call per system.
    /// Failures are isolated: the record keeps `bodies = None`.
    async fn fetch_bodies_into(&self, records: &mut [StarSystemRecord]) {
        let total = records.len();

        for (index, record) in records.iter_mut().enumerate() {
            info!(
                "Fetching system bodies from EDSM for {} ({} of {total}).",
                record.name,
                index + 1
            );

            let json = match self.catalog.system_bodies(&record.name).await {
                Ok(json) => json,
                Err(e) => {
                    error!("Body fetch for {} failed: {e}", record.name);
                    continue;
                }
            };

            if is_empty_response(&json) {
                error!("EDSM returned empty response for bodies of {}.", record.name);
                continue;
            }

            let payload = match parse_system_bodies(&json) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to parse body response for {}: {e}", record.name);
                    continue;
                }
            };

            let Some(bodies) = payload.bodies else {
                continue;
            };

            match bodies.into_iter().map(|b| b.into_domain()).collect() {
                Ok(converted) => record.bodies = Some(converted),
                Err(e) => {
                    error!("Invalid body data for {}: {e}", record.name);
                }
            }
        }
    }

    fn extend_and_persist(&mut self, records: Vec<StarSystemRecord>) -> Result<()> {
        self.systems.extend(records.into_iter().map(Arc::new));
        self.by_name = None;
        self.persist()?;
        info!("Saved {} systems to cache.", self.systems.len());
        Ok(())
    }

    fn load(path: &PathBuf) -> Result<Vec<Arc<StarSystemRecord>>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(path)?;
        let (records, _): (Vec<StarSystemRecord>, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;

        Ok(records.into_iter().map(Arc::new).collect())
    }

    /// Whole-store rewrite via temp file + rename. Failure here is fatal.
    fn persist(&self) -> Result<()> {
        let records: Vec<&StarSystemRecord> = self.systems.iter().map(|s| s.as_ref()).collect();
        let bytes = bincode::serde::encode_to_vec(&records, bincode::config::standard())?;

        let dir = match self.store_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&self.store_path)
            .map_err(|e| Error::Io(e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    /// In-memory catalog that serves canned summaries and body payloads
    /// while recording every call it receives.
    struct FakeCatalog {
        known: Vec<(String, Coordinates)>,
        bodies: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn new(known: Vec<(&str, Coordinates)>) -> Self {
            Self {
                known: known
                    .into_iter()
                    .map(|(n, c)| (n.to_string(), c))
                    .collect(),
                bodies: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_bodies(mut self, name: &str, json: &str) -> Self {
            self.bodies.insert(name.to_string(), json.to_string());
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn summary_json(&self, names: Option<&[String]>) -> String {
            let entries: Vec<String> = self
                .known
                .iter()
                .filter(|(n, _)| {
                    names.map_or(true, |wanted| {
                        wanted.iter().any(|w| w.eq_ignore_ascii_case(n))
                    })
                })
                .map(|(n, c)| {
                    format!(
                        r#"{{"name": "{n}", "id": 1, "id64": 1, "coords": {{"x": {}, "y": {}, "z": {}}}}}"#,
                        c.x, c.y, c.z
                    )
                })
                .collect();
            format!("[{}]", entries.join(","))
        }
    }

    #[async_trait]
    impl SystemCatalog for FakeCatalog {
        async fn systems_by_name(&self, names: &[String]) -> Result<String> {
            self.calls.lock().push(format!("systems:{}", names.join(",")));
            Ok(self.summary_json(Some(names)))
        }

        async fn systems_in_sphere(&self, _center: &RegionCenter, _radius: f64) -> Result<String> {
            self.calls.lock().push("sphere".to_string());
            Ok(self.summary_json(None))
        }

        async fn systems_in_cube(&self, _center: &RegionCenter, _size: f64) -> Result<String> {
            self.calls.lock().push("cube".to_string());
            Ok(self.summary_json(None))
        }

        async fn system_bodies(&self, system_name: &str) -> Result<String> {
            self.calls.lock().push(format!("bodies:{system_name}"));
            Ok(self
                .bodies
                .get(system_name)
                .cloned()
                .unwrap_or_else(|| "{}".to_string()))
        }
    }

    fn config_in(dir: &TempDir) -> CacheConfig {
        CacheConfig {
            store_path: dir.path().join("test.cache"),
        }
    }

    const SOL_BODIES: &str = r#"{
        "name": "Sol",
        "bodies": [
            {"bodyId": 0, "name": "Sol", "type": "Star", "subType": "G (White-Yellow) Star", "isMainStar": true},
            {"bodyId": 1, "name": "Mercury", "type": "Planet", "subType": "Metal-rich body", "parents": [{"Star": 0}], "isLandable": true}
        ]
    }"#;

    #[tokio::test]
    async fn test_cached_name_makes_no_remote_calls() {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(
            FakeCatalog::new(vec![("Sol", Coordinates::new(0.0, 0.0, 0.0))])
                .with_bodies("Sol", SOL_BODIES),
        );

        let mut cache = SystemCache::open(catalog.clone(), &config_in(&dir)).unwrap();
        cache.cache_systems(&["Sol".to_string()]).await.unwrap();
        let before = catalog.call_count();
        let cached = cache.get("Sol").unwrap();

        // Same name again, different case: nothing happens
        cache.cache_systems(&["SOL".to_string()]).await.unwrap();
        assert_eq!(catalog.call_count(), before);
        assert!(Arc::ptr_eq(&cache.get("sol").unwrap(), &cached));
    }

    #[tokio::test]
    async fn test_cache_systems_fetches_summaries_and_bodies() {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(
            FakeCatalog::new(vec![("Sol", Coordinates::new(0.0, 0.0, 0.0))])
                .with_bodies("Sol", SOL_BODIES),
        );

        let mut cache = SystemCache::open(catalog.clone(), &config_in(&dir)).unwrap();
        cache.cache_systems(&["Sol".to_string()]).await.unwrap();

        let record = cache.get("sol").unwrap();
        assert_eq!(record.name, "Sol");
        assert_eq!(record.coordinates, Some(Coordinates::new(0.0, 0.0, 0.0)));
        assert_eq!(record.bodies.as_ref().map(|b| b.len()), Some(2));
        assert_eq!(record.primary_star_class(), Some("G"));
    }

    #[tokio::test]
    async fn test_batching_splits_names_into_blocks_of_ten() {
        let dir = TempDir::new().unwrap();
        let names: Vec<String> = (0..12).map(|i| format!("System {i}")).collect();
        let known: Vec<(&str, Coordinates)> = Vec::new();
        let catalog = Arc::new(FakeCatalog::new(known));

        // Unknown systems: summaries come back empty, so no body fetches
        let mut cache = SystemCache::open(catalog.clone(), &config_in(&dir)).unwrap();
        cache.cache_systems(&names).await.unwrap();

        let calls = catalog.calls.lock().clone();
        let summary_calls: Vec<_> = calls.iter().filter(|c| c.starts_with("systems:")).collect();
        assert_eq!(summary_calls.len(), 2);
        assert_eq!(summary_calls[0].matches(',').count(), 9); // 10 names
        assert_eq!(summary_calls[1].matches(',').count(), 1); // 2 names
    }

    #[tokio::test]
    async fn test_failed_body_fetch_keeps_record_without_bodies() {
        let dir = TempDir::new().unwrap();
        // No canned bodies: the fake answers "{}" which is the empty sentinel
        let catalog = Arc::new(FakeCatalog::new(vec![(
            "Achenar",
            Coordinates::new(67.5, -119.46, 24.84),
        )]));

        let mut cache = SystemCache::open(catalog.clone(), &config_in(&dir)).unwrap();
        cache.cache_systems(&["Achenar".to_string()]).await.unwrap();

        let record = cache.get("Achenar").unwrap();
        assert!(record.bodies.is_none());
        assert!(record.coordinates.is_some());

        // The failed body list is accepted, not retried on the next call
        let before = catalog.call_count();
        cache.cache_systems(&["Achenar".to_string()]).await.unwrap();
        assert_eq!(catalog.call_count(), before);
    }

    #[tokio::test]
    async fn test_malformed_body_payload_is_isolated() {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(
            FakeCatalog::new(vec![
                ("Sol", Coordinates::new(0.0, 0.0, 0.0)),
                ("Achenar", Coordinates::new(67.5, -119.46, 24.84)),
            ])
            .with_bodies("Sol", SOL_BODIES)
            .with_bodies("Achenar", "not json at all"),
        );

        let mut cache = SystemCache::open(catalog, &config_in(&dir)).unwrap();
        cache
            .cache_systems(&["Sol".to_string(), "Achenar".to_string()])
            .await
            .unwrap();

        // Sol parsed fine; Achenar kept without bodies
        assert!(cache.get("Sol").unwrap().bodies.is_some());
        assert!(cache.get("Achenar").unwrap().bodies.is_none());
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let catalog = Arc::new(
            FakeCatalog::new(vec![("Sol", Coordinates::new(0.0, 0.0, 0.0))])
                .with_bodies("Sol", SOL_BODIES),
        );

        {
            let mut cache = SystemCache::open(catalog.clone(), &config).unwrap();
            cache.cache_systems(&["Sol".to_string()]).await.unwrap();
        }

        // Reopen from disk: record is there, no remote calls needed
        let fresh_catalog = Arc::new(FakeCatalog::new(vec![]));
        let mut cache = SystemCache::open(fresh_catalog.clone(), &config).unwrap();
        assert_eq!(cache.len(), 1);

        cache.cache_systems(&["Sol".to_string()]).await.unwrap();
        assert_eq!(fresh_catalog.call_count(), 0);

        let record = cache.get("Sol").unwrap();
        assert_eq!(record.bodies.as_ref().map(|b| b.len()), Some(2));
    }

    #[tokio::test]
    async fn test_region_fetch_skips_cached_systems() {
        let dir = TempDir::new().unwrap();
        let original_coords = Coordinates::new(0.0, 0.0, 0.0);
        let catalog = Arc::new(
            FakeCatalog::new(vec![("Sol", original_coords)]).with_bodies("Sol", SOL_BODIES),
        );

        let mut cache = SystemCache::open(catalog.clone(), &config_in(&dir)).unwrap();
        cache.cache_systems(&["Sol".to_string()]).await.unwrap();

        // Second catalog claims different coordinates for Sol plus a new system
        let region_catalog = Arc::new(
            FakeCatalog::new(vec![
                ("Sol", Coordinates::new(9.0, 9.0, 9.0)),
                ("Barnard's Star", Coordinates::new(-3.03, 1.45, 4.95)),
            ]),
        );
        let mut cache = SystemCache {
            catalog: region_catalog.clone(),
            ..cache
        };

        cache
            .cache_systems_in_sphere(&RegionCenter::Name("Sol".to_string()), 10.0)
            .await
            .unwrap();

        // Sol keeps its original coordinates; only the newcomer got a body fetch
        assert_eq!(cache.get("Sol").unwrap().coordinates, Some(original_coords));
        assert!(cache.contains("Barnard's Star"));
        let calls = region_catalog.calls.lock().clone();
        assert!(calls.contains(&"bodies:Barnard's Star".to_string()));
        assert!(!calls.contains(&"bodies:Sol".to_string()));
    }

    #[tokio::test]
    async fn test_local_geometric_queries() {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(FakeCatalog::new(vec![
            ("A", Coordinates::new(0.0, 0.0, 0.0)),
            ("B", Coordinates::new(3.0, 0.0, 0.0)),
            ("C", Coordinates::new(100.0, 0.0, 0.0)),
        ]));

        let mut cache = SystemCache::open(catalog.clone(), &config_in(&dir)).unwrap();
        cache
            .cache_systems(&["A".into(), "B".into(), "C".into()])
            .await
            .unwrap();
        let before = catalog.call_count();

        let near = cache.systems_in_sphere(&Coordinates::new(0.0, 0.0, 0.0), 5.0);
        assert_eq!(near.len(), 2);

        let boxed = cache.systems_in_cuboid(&Cuboid::around(Coordinates::new(0.0, 0.0, 0.0), 2.0));
        assert_eq!(boxed.len(), 1);
        assert_eq!(boxed[0].name, "A");

        // Pure filters, no network
        assert_eq!(catalog.call_count(), before);
    }
}
