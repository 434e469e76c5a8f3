//! # Snapshot Format
//!
//! Wire records for the full-graph snapshot (`getwholegraph`) and the
//! layout response (`drawgraph`), using the service's upper-case field names.
//!
//! `GraphSnapshot::capture` produces the same shape from a local store, so a
//! captured snapshot restores to an equivalent store.

use crate::entity::{Detail, Link, LinkType, Node};
use crate::primitives::NO_IMAGE;
use crate::store::EntityStore;
use crate::{Anchor, AnchorKind, Color, DetailKind, PsynthError, Shape, Uid};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// LENIENT NUMBERS
// =============================================================================

/// A JSON number, or a string holding one.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("not a number: {s:?}"))),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Numeric::deserialize(deserializer)?.into_f64()
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = lenient_f64(deserializer)?;
    Ok(value as i64)
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = lenient_f64(deserializer)?;
    Ok(value as u32)
}

/// Unset coordinates arrive as `null`, `"None"` or an empty string.
fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Numeric>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Numeric::Text(s)) if s.trim().is_empty() || s == "None" => Ok(None),
        Some(n) => n.into_f64().map(Some),
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NodeRecord {
    pub uid: String,
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub y: f64,
    #[serde(deserialize_with = "lenient_u32")]
    pub shape: u32,
    #[serde(deserialize_with = "lenient_f64")]
    pub radius: f64,
    pub color: String,
    pub picture: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LinkRecord {
    pub uid: String,
    pub name: String,
    #[serde(rename = "TYPE")]
    pub link_type: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub value: i64,
    pub origin: String,
    pub terminus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LinkTypeRecord {
    pub name: String,
    pub icon: String,
    pub tile: String,
    pub color: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub max: i64,
    #[serde(default = "default_true")]
    pub sync: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DetailRecord {
    pub uid: String,
    pub anchor_type: AnchorKind,
    pub anchor_uid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "TYPE", default)]
    pub kind: DetailKind,
    pub content: String,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub y: Option<f64>,
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            uid: node.uid.to_string(),
            name: node.name.clone(),
            x: node.x,
            y: node.y,
            shape: node.shape.code(),
            radius: node.radius,
            color: node.color.as_str().to_string(),
            picture: node.image.clone().unwrap_or_else(|| NO_IMAGE.to_string()),
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let mut node = Node::new(record.name)
            .with_uid(record.uid)
            .at(record.x, record.y)
            .with_shape(Shape::from_code(record.shape))
            .with_radius(record.radius)
            .with_color(Color::from(record.color))
            .with_image(record.picture);
        node.created = true;
        node
    }
}

impl From<&Link> for LinkRecord {
    fn from(link: &Link) -> Self {
        Self {
            uid: link.uid.to_string(),
            name: link.name.clone(),
            link_type: link.link_type.clone(),
            value: link.value,
            origin: link.origin.to_string(),
            terminus: link.terminus.to_string(),
        }
    }
}

impl From<LinkRecord> for Link {
    fn from(record: LinkRecord) -> Self {
        let mut link = Link::new(record.origin, record.terminus, record.link_type)
            .with_uid(record.uid)
            .with_name(record.name)
            .with_value(record.value);
        link.created = true;
        link
    }
}

impl From<&LinkType> for LinkTypeRecord {
    fn from(link_type: &LinkType) -> Self {
        Self {
            name: link_type.name.clone(),
            icon: link_type.icon.clone(),
            tile: link_type.tile.clone(),
            color: link_type.color.as_str().to_string(),
            max: link_type.max,
            sync: link_type.sync,
        }
    }
}

impl From<LinkTypeRecord> for LinkType {
    fn from(record: LinkTypeRecord) -> Self {
        let mut link_type = LinkType::new(record.name)
            .with_icon(record.icon, record.tile)
            .with_color(Color::from(record.color))
            .with_max(record.max)
            .with_sync(record.sync);
        link_type.created = true;
        link_type
    }
}

impl From<&Detail> for DetailRecord {
    fn from(detail: &Detail) -> Self {
        let (anchor_type, anchor_uid) = match &detail.anchor {
            Some(anchor) => (anchor.kind, anchor.uid.to_string()),
            None => (AnchorKind::Node, String::new()),
        };
        Self {
            uid: detail.uid.to_string(),
            anchor_type,
            anchor_uid,
            name: detail.name.clone(),
            kind: detail.kind,
            content: detail.content.clone(),
            x: detail.x,
            y: detail.y,
        }
    }
}

impl From<DetailRecord> for Detail {
    fn from(record: DetailRecord) -> Self {
        let mut detail = Detail::new(record.content)
            .with_uid(record.uid)
            .with_kind(record.kind);
        if !record.anchor_uid.is_empty() {
            detail.anchor = Some(Anchor {
                kind: record.anchor_type,
                uid: Uid::new(record.anchor_uid),
            });
        }
        if let Some(name) = record.name {
            detail = detail.with_name(name);
        }
        detail.x = record.x;
        detail.y = record.y;
        detail.created = true;
        detail
    }
}

// =============================================================================
// GRAPH SNAPSHOT
// =============================================================================

/// A whole graph as the service serves it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub name: String,
    #[serde(default)]
    pub rel_types: Vec<LinkTypeRecord>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub rels: Vec<LinkRecord>,
    #[serde(default)]
    pub details: Vec<DetailRecord>,
}

impl GraphSnapshot {
    /// Record every entity of `store`, in list order.
    #[must_use]
    pub fn capture(name: &str, store: &EntityStore) -> Self {
        Self {
            name: name.to_string(),
            rel_types: store.link_types().map(LinkTypeRecord::from).collect(),
            nodes: store.nodes().map(NodeRecord::from).collect(),
            rels: store.links().map(LinkRecord::from).collect(),
            details: store.details().map(DetailRecord::from).collect(),
        }
    }

    /// Parse a snapshot from a response body.
    pub fn from_value(body: &serde_json::Value) -> Result<Self, PsynthError> {
        Self::deserialize(body).map_err(|e| PsynthError::SerializationError(e.to_string()))
    }

    /// Rebuild a store. Every restored entity is flagged created.
    ///
    /// Link types go in first, then nodes, links and details.
    pub fn restore(self) -> Result<EntityStore, PsynthError> {
        let mut store = EntityStore::new();
        for record in self.rel_types {
            store.add_link_type(record.into())?;
        }
        for record in self.nodes {
            store.add_node(record.into())?;
        }
        for record in self.rels {
            store.add_link(record.into())?;
        }
        for record in self.details {
            store.add_detail(record.into())?;
        }
        Ok(store)
    }
}

// =============================================================================
// LAYOUT RESPONSE
// =============================================================================

/// A server-assigned position for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Placement {
    pub uid: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub y: f64,
}

/// Body of a `drawgraph` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutUpdate {
    #[serde(default)]
    pub nodes: Vec<Placement>,
    #[serde(default)]
    pub details: Vec<Placement>,
}

impl LayoutUpdate {
    pub fn from_value(body: &serde_json::Value) -> Result<Self, PsynthError> {
        Self::deserialize(body).map_err(|e| PsynthError::SerializationError(e.to_string()))
    }

    /// Overwrite positions of the named entities.
    ///
    /// Returns the UIDs that named nothing in the store.
    pub fn apply(&self, store: &mut EntityStore) -> Vec<String> {
        let mut unknown = Vec::new();
        for placement in &self.nodes {
            let placed = store.modify_node(&placement.uid, |node| {
                node.x = placement.x;
                node.y = placement.y;
            });
            if placed.is_err() {
                unknown.push(placement.uid.clone());
            }
        }
        for placement in &self.details {
            let placed = store.modify_detail(&placement.uid, |detail| {
                detail.x = Some(placement.x);
                detail.y = Some(placement.y);
            });
            if placed.is_err() {
                unknown.push(placement.uid.clone());
            }
        }
        unknown
    }
}

// =============================================================================
// TESTS
// =============================================================================
