//! Domain model for star systems and their celestial bodies
//!
//! These types are what the cache persists and the hierarchy builder consumes.
//! The raw EDSM JSON shapes live in [`crate::remote`] and are converted into
//! these on ingest.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Coordinates;

/// Node kind inside a system map. `Star` and `Planet` are listed bodies;
/// a `Barycentre` only ever appears as a parent reference; `System` is the
/// synthetic root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    System,
    Barycentre,
    Star,
    Planet,
}

/// One entry of a body's parent chain, nearest ancestor first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub kind: NodeKind,
    pub id: i32,
}

/// Kind-specific body attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyDetail {
    Star {
        /// EDSM subtype, e.g. "K (Yellow-Orange) Star"
        sub_type: Option<String>,
        is_main_star: bool,
    },
    Planet {
        /// EDSM subtype, e.g. "Rocky body"
        sub_type: Option<String>,
        atmosphere_type: Option<String>,
        is_landable: bool,
    },
}

/// A star or planet in a system's body list.
///
/// `body_id` may be absent on ingest; hierarchy reconstruction infers one.
/// Among bodies of one system that do carry an id, ids are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialBody {
    pub body_id: Option<i32>,
    pub name: String,
    /// Parent references, nearest ancestor first
    pub parents: Vec<ParentRef>,
    pub detail: BodyDetail,
}

impl CelestialBody {
    /// Node kind of this body's variant
    pub fn node_kind(&self) -> NodeKind {
        match self.detail {
            BodyDetail::Star { .. } => NodeKind::Star,
            BodyDetail::Planet { .. } => NodeKind::Planet,
        }
    }

    pub fn is_star(&self) -> bool {
        matches!(self.detail, BodyDetail::Star { .. })
    }

    pub fn is_planet(&self) -> bool {
        matches!(self.detail, BodyDetail::Planet { .. })
    }

    /// Star class letter extracted from the subtype, e.g. "K" from
    /// "K (Yellow-Orange) Star". None for planets or unparsable subtypes.
    pub fn star_class(&self) -> Option<&str> {
        static CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)\s+.+$").expect("valid regex"));

        match &self.detail {
            BodyDetail::Star { sub_type, .. } => {
                let sub_type = sub_type.as_deref()?;
                CLASS
                    .captures(sub_type)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
            }
            BodyDetail::Planet { .. } => None,
        }
    }
}

/// One cached star system.
///
/// `bodies` distinguishes "never fetched" (None) from "fetched, confirmed
/// bodyless" (Some but empty). `name` is the unique, case-insensitive key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystemRecord {
    pub name: String,
    pub id: Option<i64>,
    pub id64: Option<i64>,
    pub coordinates: Option<Coordinates>,
    pub bodies: Option<Vec<CelestialBody>>,
}

impl StarSystemRecord {
    /// The system's main star, if the body list is fetched and has one
    pub fn primary_star(&self) -> Option<&CelestialBody> {
        self.bodies.as_ref()?.iter().find(
            |b| matches!(b.detail, BodyDetail::Star { is_main_star, .. } if is_main_star),
        )
    }

    /// Class letter of the primary star
    pub fn primary_star_class(&self) -> Option<&str> {
        self.primary_star()?.star_class()
    }

    pub fn star_count(&self) -> usize {
        self.bodies
            .as_ref()
            .map(|bodies| bodies.iter().filter(|b| b.is_star()).count())
            .unwrap_or(0)
    }

    pub fn planet_count(&self) -> usize {
        self.bodies
            .as_ref()
            .map(|bodies| bodies.iter().filter(|b| b.is_planet()).count())
            .unwrap_or(0)
    }
}

impl fmt::Display for StarSystemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.coordinates {
            Some(c) => write!(f, "{} [{}]", self.name, c),
            None => write!(f, "{} [no coordinates]", self.name),
        }
    }
}
