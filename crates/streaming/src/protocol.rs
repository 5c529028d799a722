//! Wire types for Overpass API JSON responses (`[out:json]`, `out body geom`).
//!
//! Only the fields the converter reads are modeled; everything else in the
//! document is ignored. Unknown element types deserialize to
//! [`Element::Other`] instead of failing the whole response.

use std::collections::BTreeMap;

use geo::Coord;
use serde::Deserialize;

use crate::error::FetchError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub version: Option<f64>,
    #[serde(default)]
    pub generator: Option<String>,
    /// Set by the server on runtime errors (timeouts, memory limits); the
    /// element list is then incomplete.
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl OverpassResponse {
    /// Decodes a response body, rejecting documents that carry a runtime error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FetchError> {
        let response: OverpassResponse =
            serde_json::from_slice(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        if let Some(message) = response.runtime_error() {
            return Err(FetchError::Remote(message.to_string()));
        }
        Ok(response)
    }

    pub fn runtime_error(&self) -> Option<&str> {
        self.remark
            .as_deref()
            .filter(|r| r.trim_start().starts_with("runtime error"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Node {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Way {
    pub id: u64,
    #[serde(default)]
    pub nodes: Vec<u64>,
    /// Embedded node positions; `null` slots mark nodes the server could not
    /// resolve.
    #[serde(default)]
    pub geometry: Option<Vec<Option<LatLon>>>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: MemberKind,
    #[serde(rename = "ref")]
    pub reference: u64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Option<Vec<Option<LatLon>>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relation {
    pub id: u64,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}
