use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// OSM element type a feature was built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    Way,
    Relation,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

/// Stable feature identity, rendered as `way/123`, `relation/9` or `relation/9#2`.
///
/// `part` distinguishes the outer rings of one multipolygon relation; it is
/// always 0 for ways.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId {
    kind: ElementKind,
    osm_id: u64,
    part: u32,
}

impl FeatureId {
    pub fn way(osm_id: u64) -> Self {
        Self {
            kind: ElementKind::Way,
            osm_id,
            part: 0,
        }
    }

    pub fn relation(osm_id: u64, part: u32) -> Self {
        Self {
            kind: ElementKind::Relation,
            osm_id,
            part,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn osm_id(&self) -> u64 {
        self.osm_id
    }

    pub fn part(&self) -> u32 {
        self.part
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.osm_id)?;
        if self.part > 0 {
            write!(f, "#{}", self.part)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid feature id: {0:?}")]
pub struct ParseFeatureIdError(pub String);

impl FromStr for FeatureId {
    type Err = ParseFeatureIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFeatureIdError(s.to_string());
        let (kind, rest) = s.split_once('/').ok_or_else(err)?;
        let (id, part) = match rest.split_once('#') {
            Some((id, part)) => (id, part.parse::<u32>().map_err(|_| err())?),
            None => (rest, 0),
        };
        let osm_id = id.parse::<u64>().map_err(|_| err())?;
        match kind {
            "way" if part == 0 => Ok(FeatureId::way(osm_id)),
            "relation" => Ok(FeatureId::relation(osm_id, part)),
            _ => Err(err()),
        }
    }
}

impl Serialize for FeatureId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FeatureId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureId;

    #[test]
    fn display_and_parse_agree() {
        for id in [
            FeatureId::way(42),
            FeatureId::relation(7, 0),
            FeatureId::relation(7, 3),
        ] {
            let text = id.to_string();
            assert_eq!(text.parse::<FeatureId>().unwrap(), id);
        }
        assert_eq!(FeatureId::relation(7, 3).to_string(), "relation/7#3");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("node/1".parse::<FeatureId>().is_err());
        assert!("way/abc".parse::<FeatureId>().is_err());
        assert!("way/1#2".parse::<FeatureId>().is_err());
        assert!("42".parse::<FeatureId>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&FeatureId::way(5)).unwrap();
        assert_eq!(json, "\"way/5\"");
        let back: FeatureId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FeatureId::way(5));
    }
}
