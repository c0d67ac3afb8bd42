//! EDSM catalog client and wire types
//!
//! The catalog is reached through the [`SystemCatalog`] trait so the cache can
//! be exercised against an in-memory fake. Every method returns the raw JSON
//! body; sentinel checks (`""` / `"{}"`) and parsing belong to the caller so a
//! bad payload only ever loses its own unit of work.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::config::EdsmConfig;
use crate::error::{Error, Result};
use crate::geometry::Coordinates;
use crate::types::{BodyDetail, CelestialBody, NodeKind, ParentRef, StarSystemRecord};

/// Center of a region query: a named system or raw coordinates
#[derive(Debug, Clone)]
pub enum RegionCenter {
    Name(String),
    Coords(Coordinates),
}

/// Remote system catalog, issued one request at a time
#[async_trait]
pub trait SystemCatalog: Send + Sync {
    /// Batched summary lookup (caller keeps batches to at most 10 names)
    async fn systems_by_name(&self, names: &[String]) -> Result<String>;

    /// All system summaries within a sphere
    async fn systems_in_sphere(&self, center: &RegionCenter, radius: f64) -> Result<String>;

    /// All system summaries within a cube of the given edge size
    async fn systems_in_cube(&self, center: &RegionCenter, size: f64) -> Result<String>;

    /// Full body list for one system
    async fn system_bodies(&self, system_name: &str) -> Result<String>;
}

/// EDSM API client with a minimum delay between consecutive calls
pub struct EdsmClient {
    client: Client,
    config: EdsmConfig,
    last_call: Mutex<Option<Instant>>,
}

impl EdsmClient {
    pub fn new(config: &EdsmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config: config.clone(),
            last_call: Mutex::new(None),
        }
    }

    /// Wait out the remainder of the inter-call delay, then claim the slot
    async fn throttle(&self) {
        let remaining = {
            let last = self.last_call.lock();
            let minimum = Duration::from_millis(self.config.throttle_ms);
            last.and_then(|t| minimum.checked_sub(t.elapsed()))
        };

        if let Some(delay) = remaining {
            sleep(delay).await;
        }

        *self.last_call.lock() = Some(Instant::now());
    }

    async fn get_text(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        self.throttle().await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self.client.get(&url).query(query).send().await?;
        Ok(response.text().await?)
    }

    fn region_params(center: &RegionCenter, query: &mut Vec<(String, String)>) {
        match center {
            RegionCenter::Name(name) => {
                query.push(("systemName".to_string(), name.clone()));
            }
            RegionCenter::Coords(c) => {
                query.push(("x".to_string(), c.x.to_string()));
                query.push(("y".to_string(), c.y.to_string()));
                query.push(("z".to_string(), c.z.to_string()));
            }
        }
    }
}

#[async_trait]
impl SystemCatalog for EdsmClient {
    async fn systems_by_name(&self, names: &[String]) -> Result<String> {
        let mut query = vec![
            ("showCoordinates".to_string(), "1".to_string()),
            ("showId".to_string(), "1".to_string()),
        ];
        for name in names {
            query.push(("systemName[]".to_string(), name.clone()));
        }

        self.get_text("api-v1/systems", &query).await
    }

    async fn systems_in_sphere(&self, center: &RegionCenter, radius: f64) -> Result<String> {
        let mut query = vec![
            ("showCoordinates".to_string(), "1".to_string()),
            ("showId".to_string(), "1".to_string()),
            ("radius".to_string(), radius.to_string()),
        ];
        Self::region_params(center, &mut query);

        self.get_text("api-v1/sphere-systems", &query).await
    }

    async fn systems_in_cube(&self, center: &RegionCenter, size: f64) -> Result<String> {
        let mut query = vec![
            ("showCoordinates".to_string(), "1".to_string()),
            ("showId".to_string(), "1".to_string()),
            ("size".to_string(), size.to_string()),
        ];
        Self::region_params(center, &mut query);

        self.get_text("api-v1/cube-systems", &query).await
    }

    async fn system_bodies(&self, system_name: &str) -> Result<String> {
        let query = vec![("systemName".to_string(), system_name.to_string())];
        self.get_text("api-system-v1/bodies", &query).await
    }
}

/// True for the payloads EDSM sends when it has nothing to say
pub fn is_empty_response(json: &str) -> bool {
    let trimmed = json.trim();
    trimmed.is_empty() || trimmed == "{}"
}

// --- wire types ----------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EdsmCoords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<EdsmCoords> for Coordinates {
    fn from(c: EdsmCoords) -> Self {
        Coordinates::new(c.x, c.y, c.z)
    }
}

/// Lightweight system summary from the name/sphere/cube endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdsmSummary {
    pub name: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub id64: Option<i64>,
    #[serde(default)]
    pub coords: Option<EdsmCoords>,
}

impl From<EdsmSummary> for StarSystemRecord {
    fn from(summary: EdsmSummary) -> Self {
        StarSystemRecord {
            name: summary.name,
            id: summary.id,
            id64: summary.id64,
            coordinates: summary.coords.map(Into::into),
            bodies: None,
        }
    }
}

/// Response of the bodies endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdsmSystemBodies {
    pub name: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub id64: Option<i64>,
    #[serde(default)]
    pub bodies: Option<Vec<EdsmBody>>,
}

/// One body as EDSM reports it. Parents arrive as single-entry maps,
/// `{"Star": 1}` or `{"Null": 2}` for a barycentre.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdsmBody {
    #[serde(default)]
    pub body_id: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub body_type: Option<String>,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub parents: Option<Vec<HashMap<String, i32>>>,
    #[serde(default)]
    pub is_main_star: Option<bool>,
    #[serde(default)]
    pub atmosphere_type: Option<String>,
    #[serde(default)]
    pub is_landable: Option<bool>,
}

impl EdsmBody {
    /// Convert to the domain body. Errors here fail the whole system's
    /// body payload, never anything beyond it.
    pub fn into_domain(self) -> Result<CelestialBody> {
        let name = self.name.unwrap_or_else(|| "<unnamed>".to_string());

        let detail = match self.body_type.as_deref() {
            Some("Star") => BodyDetail::Star {
                sub_type: self.sub_type,
                is_main_star: self.is_main_star.unwrap_or(false),
            },
            Some("Planet") => BodyDetail::Planet {
                sub_type: self.sub_type,
                atmosphere_type: self.atmosphere_type,
                is_landable: self.is_landable.unwrap_or(false),
            },
            other => {
                return Err(Error::invalid_body(
                    &name,
                    format!("unknown body type {:?}", other),
                ))
            }
        };

        let mut parents = Vec::new();
        for (index, entry) in self.parents.unwrap_or_default().into_iter().enumerate() {
            if entry.len() != 1 {
                return Err(Error::invalid_body(
                    &name,
                    format!("parent entry {index} should contain exactly one value"),
                ));
            }

            let (tag, id) = entry
                .into_iter()
                .next()
                .ok_or_else(|| Error::internal("single-entry map had no entry"))?;

            let kind = match tag.as_str() {
                "Star" => NodeKind::Star,
                "Planet" => NodeKind::Planet,
                "Null" => NodeKind::Barycentre,
                other => {
                    return Err(Error::invalid_body(
                        &name,
                        format!("parent entry {index} has unrecognized type \"{other}\""),
                    ))
                }
            };

            parents.push(ParentRef { kind, id });
        }

        Ok(CelestialBody {
            body_id: self.body_id,
            name,
            parents,
            detail,
        })
    }
}

/// Parse a summary-array payload
pub fn parse_summaries(json: &str) -> Result<Vec<EdsmSummary>> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a bodies payload
pub fn parse_system_bodies(json: &str) -> Result<EdsmSystemBodies> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODIES_JSON: &str = r#"{
        "id": 27,
        "id64": 10477373803,
        "name": "Sol",
        "bodies": [
            {
                "id": 1, "bodyId": 0, "name": "Sol", "type": "Star",
                "subType": "G (White-Yellow) Star", "parents": null,
                "isMainStar": true
            },
            {
                "id": 2, "bodyId": 1, "name": "Mercury", "type": "Planet",
                "subType": "Metal-rich body",
                "parents": [{"Star": 0}],
                "atmosphereType": "No atmosphere", "isLandable": true
            }
        ]
    }"#;

    #[test]
    fn test_parse_system_bodies() {
        let system = parse_system_bodies(BODIES_JSON).unwrap();
        assert_eq!(system.name, "Sol");
        let bodies = system.bodies.unwrap();
        assert_eq!(bodies.len(), 2);

        let star = bodies[0].clone().into_domain().unwrap();
        assert_eq!(star.body_id, Some(0));
        assert_eq!(star.node_kind(), NodeKind::Star);
        assert_eq!(star.star_class(), Some("G"));

        let planet = bodies[1].clone().into_domain().unwrap();
        assert_eq!(planet.node_kind(), NodeKind::Planet);
        assert_eq!(
            planet.parents,
            vec![ParentRef {
                kind: NodeKind::Star,
                id: 0
            }]
        );
        match planet.detail {
            BodyDetail::Planet { is_landable, .. } => assert!(is_landable),
            _ => panic!("expected a planet"),
        }
    }

    #[test]
    fn test_barycentre_parent_tag() {
        let json = r#"{
            "bodyId": 2, "name": "Alpha Centauri A", "type": "Star",
            "parents": [{"Null": 1}]
        }"#;
        let body: EdsmBody = serde_json::from_str(json).unwrap();
        let domain = body.into_domain().unwrap();
        assert_eq!(
            domain.parents,
            vec![ParentRef {
                kind: NodeKind::Barycentre,
                id: 1
            }]
        );
    }

    #[test]
    fn test_unknown_parent_tag_is_an_error() {
        let json = r#"{
            "bodyId": 2, "name": "X", "type": "Planet",
            "parents": [{"Moon": 1}]
        }"#;
        let body: EdsmBody = serde_json::from_str(json).unwrap();
        assert!(body.into_domain().is_err());
    }

    #[test]
    fn test_unknown_body_type_is_an_error() {
        let json = r#"{"bodyId": 2, "name": "X", "type": "Comet"}"#;
        let body: EdsmBody = serde_json::from_str(json).unwrap();
        assert!(body.into_domain().is_err());
    }

    #[test]
    fn test_parse_summaries() {
        let json = r#"[
            {"name": "Sol", "id": 27, "id64": 10477373803, "coords": {"x": 0, "y": 0, "z": 0}},
            {"name": "Barnard's Star"}
        ]"#;
        let summaries = parse_summaries(json).unwrap();
        assert_eq!(summaries.len(), 2);

        let sol: StarSystemRecord = summaries[0].clone().into();
        assert_eq!(sol.coordinates, Some(Coordinates::new(0.0, 0.0, 0.0)));
        assert!(sol.bodies.is_none());

        let barnard: StarSystemRecord = summaries[1].clone().into();
        assert!(barnard.coordinates.is_none());
    }

    #[test]
    fn test_empty_response_sentinels() {
        assert!(is_empty_response(""));
        assert!(is_empty_response("{}"));
        assert!(is_empty_response(" {} "));
        assert!(!is_empty_response("[]"));
        assert!(!is_empty_response(r#"[{"name": "Sol"}]"#));
    }
}
