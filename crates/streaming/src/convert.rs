//! Topology conversion: Overpass nodes/ways/relations into polygon parcels.
//!
//! Conversion is partial-failure tolerant. Every element is converted on its
//! own; an element that can't become a parcel is recorded as a
//! [`ConversionError`] and skipped, the rest of the batch is unaffected.
//! Output order follows the response order.

use std::collections::{BTreeMap, HashMap, HashSet};

use foundation::ids::FeatureId;
use geo::{Contains, Coord, LineString, Polygon};
use layers::{Category, Parcel};
use tracing::debug;

use crate::error::ConversionError;
use crate::protocol::{Element, LatLon, Member, MemberKind, OverpassResponse, Relation, Way};

/// Parcels that converted cleanly plus one error per dropped element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    pub parcels: Vec<Parcel>,
    pub errors: Vec<ConversionError>,
}

impl Conversion {
    pub fn dropped(&self) -> usize {
        self.errors.len()
    }
}

pub struct TopologyConverter<'a> {
    nodes: HashMap<u64, Coord<f64>>,
    ways: HashMap<u64, &'a Way>,
    relation_ways: HashSet<u64>,
}

impl<'a> TopologyConverter<'a> {
    pub fn new(response: &'a OverpassResponse) -> Self {
        let mut nodes = HashMap::new();
        let mut ways = HashMap::new();
        let mut relation_ways = HashSet::new();

        for element in &response.elements {
            match element {
                Element::Node(n) => {
                    nodes.insert(n.id, Coord { x: n.lon, y: n.lat });
                }
                Element::Way(w) => {
                    ways.insert(w.id, w);
                }
                Element::Relation(r) => {
                    relation_ways.extend(
                        r.members
                            .iter()
                            .filter(|m| m.kind == MemberKind::Way)
                            .map(|m| m.reference),
                    );
                }
                Element::Other => {}
            }
        }

        Self {
            nodes,
            ways,
            relation_ways,
        }
    }

    pub fn convert(&self, response: &OverpassResponse) -> Conversion {
        let mut out = Conversion::default();

        for element in &response.elements {
            let converted = match element {
                Element::Way(way) => {
                    // Untagged member ways are relation topology, not parcels.
                    if way.tags.is_empty() && self.relation_ways.contains(&way.id) {
                        continue;
                    }
                    self.way_parcel(way).map(|p| vec![p])
                }
                Element::Relation(rel) => self.relation_parcels(rel),
                Element::Node(_) | Element::Other => continue,
            };

            match converted {
                Ok(parcels) => out.parcels.extend(parcels),
                Err(err) => {
                    debug!(element = err.element(), "dropping element: {err}");
                    out.errors.push(err);
                }
            }
        }

        out
    }

    fn way_parcel(&self, way: &Way) -> Result<Parcel, ConversionError> {
        let element = format!("way/{}", way.id);
        let category = category_of(&element, &way.tags)?;
        let coords = self.resolve(&element, way.geometry.as_deref(), &way.nodes)?;
        let ring = closed_ring(&element, coords)?;
        Ok(Parcel {
            id: FeatureId::way(way.id),
            category,
            geometry: Polygon::new(ring, Vec::new()),
        })
    }

    /// One parcel per outer ring; inner rings become holes of the outer ring
    /// that contains them.
    fn relation_parcels(&self, rel: &Relation) -> Result<Vec<Parcel>, ConversionError> {
        let element = format!("relation/{}", rel.id);
        let category = category_of(&element, &rel.tags)?;

        let mut outer_parts = Vec::new();
        let mut inner_parts = Vec::new();
        for member in rel.members.iter().filter(|m| m.kind == MemberKind::Way) {
            let coords = self.member_coords(&element, member)?;
            match member.role.as_str() {
                "outer" | "" => outer_parts.push(coords),
                "inner" => inner_parts.push(coords),
                _ => {}
            }
        }

        let outers = assemble_rings(&element, outer_parts)?;
        if outers.is_empty() {
            return Err(ConversionError::NoOuterRing { element });
        }
        let inners = assemble_rings(&element, inner_parts)?;

        let mut polygons: Vec<Polygon<f64>> = outers
            .into_iter()
            .map(|ring| Polygon::new(ring, Vec::new()))
            .collect();
        for inner in inners {
            // An inner ring may touch its outer ring at a vertex.
            let hole = Polygon::new(inner, Vec::new());
            match polygons.iter_mut().find(|p| p.contains(&hole)) {
                Some(polygon) => polygon.interiors_push(hole.exterior().clone()),
                None => debug!(element = element.as_str(), "inner ring outside every outer ring"),
            }
        }

        Ok(polygons
            .into_iter()
            .enumerate()
            .map(|(part, geometry)| Parcel {
                id: FeatureId::relation(rel.id, part as u32),
                category,
                geometry,
            })
            .collect())
    }

    fn member_coords(
        &self,
        element: &str,
        member: &Member,
    ) -> Result<Vec<Coord<f64>>, ConversionError> {
        if let Some(geometry) = member.geometry.as_deref() {
            return self.resolve(element, Some(geometry), &[]);
        }
        match self.ways.get(&member.reference) {
            Some(way) => self.resolve(element, way.geometry.as_deref(), &way.nodes),
            None => Err(ConversionError::MissingNode {
                element: element.to_string(),
                node: None,
            }),
        }
    }

    /// Embedded geometry wins; otherwise node references are looked up among
    /// the node elements of the same response.
    fn resolve(
        &self,
        element: &str,
        geometry: Option<&[Option<LatLon>]>,
        node_refs: &[u64],
    ) -> Result<Vec<Coord<f64>>, ConversionError> {
        match geometry {
            Some(points) => points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    p.map(LatLon::to_coord)
                        .ok_or_else(|| ConversionError::MissingNode {
                            element: element.to_string(),
                            node: node_refs.get(i).copied(),
                        })
                })
                .collect(),
            None => node_refs
                .iter()
                .map(|id| {
                    self.nodes
                        .get(id)
                        .copied()
                        .ok_or_else(|| ConversionError::MissingNode {
                            element: element.to_string(),
                            node: Some(*id),
                        })
                })
                .collect(),
        }
    }
}

/// Converts a whole response. See the module docs for the failure policy.
pub fn convert(response: &OverpassResponse) -> Conversion {
    TopologyConverter::new(response).convert(response)
}

fn category_of(element: &str, tags: &BTreeMap<String, String>) -> Result<Category, ConversionError> {
    let tag = tags
        .get("landuse")
        .ok_or_else(|| ConversionError::MissingCategory {
            element: element.to_string(),
        })?;
    Category::from_tag(tag.trim()).ok_or_else(|| ConversionError::UnknownCategory {
        element: element.to_string(),
        tag: tag.clone(),
    })
}

fn closed_ring(element: &str, coords: Vec<Coord<f64>>) -> Result<LineString<f64>, ConversionError> {
    let distinct = distinct_points(&coords);
    if distinct < 3 {
        return Err(ConversionError::TooFewPoints {
            element: element.to_string(),
            distinct,
        });
    }
    if coords.first() != coords.last() {
        return Err(ConversionError::OpenRing {
            element: element.to_string(),
        });
    }
    Ok(LineString::new(coords))
}

fn distinct_points(coords: &[Coord<f64>]) -> usize {
    coords
        .iter()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

/// Joins member ways end to end until every ring closes.
///
/// Open parts are matched on shared endpoints and reversed when needed. A
/// part that can't be joined into a closed ring fails the whole relation.
fn assemble_rings(
    element: &str,
    parts: Vec<Vec<Coord<f64>>>,
) -> Result<Vec<LineString<f64>>, ConversionError> {
    let mut rings = Vec::new();
    let mut open = Vec::new();

    for part in parts {
        if is_closed(&part) {
            rings.push(closed_ring(element, part)?);
        } else {
            open.push(part);
        }
    }

    while let Some(mut current) = open.pop() {
        while !is_closed(&current) {
            let Some(&end) = current.last() else {
                break;
            };
            let Some(i) = open
                .iter()
                .position(|p| p.first() == Some(&end) || p.last() == Some(&end))
            else {
                return Err(ConversionError::OpenRing {
                    element: element.to_string(),
                });
            };
            let mut next = open.swap_remove(i);
            if next.first() != Some(&end) {
                next.reverse();
            }
            current.extend(next.into_iter().skip(1));
        }
        rings.push(closed_ring(element, current)?);
    }

    Ok(rings)
}

fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 2 && coords.first() == coords.last()
}
