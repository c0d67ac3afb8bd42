//! exobio-core: star system cache, hierarchy reconstruction, and scan clustering
//!
//! This crate turns sparse observations of star systems (journal scan events plus
//! records fetched from the EDSM catalog) into two derived products: a navigable
//! tree of the celestial bodies in a system, and spatial clusters of systems that
//! hold valuable biological scan targets.

pub mod bio;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod names;
pub mod remote;
pub mod types;

pub use bio::{BioEntityInfo, BioEntityScan, ScanSystem};
pub use cache::SystemCache;
pub use cluster::{cluster_scan_systems, ScanSystemGroup};
pub use config::{CacheConfig, EdsmConfig};
pub use error::{Error, Result};
pub use geometry::{Coordinates, Cuboid};
pub use hierarchy::{SystemMap, SystemNode, ROOT_ID};
pub use names::SystemNameBreakout;
pub use remote::{EdsmClient, RegionCenter, SystemCatalog};
pub use types::{BodyDetail, CelestialBody, NodeKind, ParentRef, StarSystemRecord};
