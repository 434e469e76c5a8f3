//! # Core Type Definitions
//!
//! This module contains the small value types shared by every entity:
//! - Identifiers (`Uid`)
//! - Visual descriptors (`Color`, `Shape`)
//! - Detail anchoring (`Anchor`, `AnchorKind`, `DetailKind`)
//! - Entity kinds (`EntityKind`)
//! - Error types (`PsynthError`)

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::primitives::DYNAMIC_COLOR;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Globally unique identifier of a Node, Link or Detail.
///
/// Generated from a random UUID unless the caller (or a loaded snapshot)
/// supplies one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Uid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// VISUAL DESCRIPTORS
// =============================================================================

/// Fill color of a Node or LinkType.
///
/// `Dynamic` renders with the viewer's active palette; `Explicit` carries a
/// concrete color value such as `#1AA2D4`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Color {
    #[default]
    Dynamic,
    Explicit(String),
}

impl Color {
    /// Get the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Dynamic => DYNAMIC_COLOR,
            Self::Explicit(value) => value,
        }
    }

    /// Check whether this color follows the palette.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

impl From<String> for Color {
    fn from(s: String) -> Self {
        if s == DYNAMIC_COLOR {
            Self::Dynamic
        } else {
            Self::Explicit(s)
        }
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        match color {
            Color::Dynamic => DYNAMIC_COLOR.to_string(),
            Color::Explicit(value) => value,
        }
    }
}

/// Node outline. Encoded on the wire as an integer:
/// `0` circle, `1` image-backed, `n > 1` regular n-gon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum Shape {
    Circle,
    Image,
    Polygon(u32),
}

impl Shape {
    /// Decode a wire shape code.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Circle,
            1 => Self::Image,
            sides => Self::Polygon(sides),
        }
    }

    /// Encode as a wire shape code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Circle => 0,
            Self::Image => 1,
            Self::Polygon(sides) => sides,
        }
    }
}

impl From<u32> for Shape {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

impl From<Shape> for u32 {
    fn from(shape: Shape) -> Self {
        shape.code()
    }
}

// =============================================================================
// DETAIL ANCHORING
// =============================================================================

/// The kind of entity a Detail hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorKind {
    #[serde(rename = "node", alias = "Node")]
    Node,
    #[serde(rename = "rel", alias = "link", alias = "Link")]
    Link,
}

impl AnchorKind {
    /// Get the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Link => "rel",
        }
    }
}

/// Weak back-reference from a Detail to the Node or Link it annotates.
///
/// The anchor is not owned; it resolves only while the referenced entity
/// is present in the same session's store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub uid: Uid,
}

impl Anchor {
    /// Anchor to a node.
    #[must_use]
    pub fn node(uid: impl Into<Uid>) -> Self {
        Self {
            kind: AnchorKind::Node,
            uid: uid.into(),
        }
    }

    /// Anchor to a link.
    #[must_use]
    pub fn link(uid: impl Into<Uid>) -> Self {
        Self {
            kind: AnchorKind::Link,
            uid: uid.into(),
        }
    }
}

/// What a Detail's content string holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    #[default]
    Comment,
    Link,
    Image,
    Video,
}

impl DetailKind {
    /// Get the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Link => "link",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl FromStr for DetailKind {
    type Err = PsynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(Self::Comment),
            "link" => Ok(Self::Link),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(PsynthError::SerializationError(format!(
                "unknown detail kind: {other}"
            ))),
        }
    }
}

// =============================================================================
// ENTITY KINDS
// =============================================================================

/// The four kinds of entity a session stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Link,
    LinkType,
    Detail,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "Node",
            Self::Link => "Link",
            Self::LinkType => "LinkType",
            Self::Detail => "Detail",
        };
        f.write_str(name)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in a Psynth session.
///
/// Local validation errors (`WrongEntityKind`, `UnknownOperation`,
/// `DuplicateUid`, ...) are returned before anything is queued.
/// Remote failures (`Rejected`, `UnexpectedStatus`, `Transport`) are
/// recorded in the session's failure log while the queue keeps draining.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PsynthError {
    /// An entity of one kind was passed where another kind was required.
    #[error("expected a {expected} entity, got a {found}")]
    WrongEntityKind {
        expected: EntityKind,
        found: EntityKind,
    },

    /// The operation name is not on the allow-list.
    #[error("'{0}' is not an allowed operation")]
    UnknownOperation(String),

    /// An entity with this key is already stored.
    #[error("duplicate {kind} uid: {uid}")]
    DuplicateUid { kind: EntityKind, uid: String },

    /// An in-place edit tried to change an entity's key.
    #[error("{kind} key cannot change from {from} to {to}")]
    KeyChanged {
        kind: EntityKind,
        from: String,
        to: String,
    },

    /// The requested node was not found in the store.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The requested link was not found in the store.
    #[error("link not found: {0}")]
    LinkNotFound(String),

    /// The requested link type was not found in the store.
    #[error("link type not found: {0}")]
    LinkTypeNotFound(String),

    /// The requested detail was not found in the store.
    #[error("detail not found: {0}")]
    DetailNotFound(String),

    /// A detail's anchor does not resolve to a stored node or link.
    #[error("anchor {kind:?} {uid} does not resolve")]
    AnchorNotFound { kind: AnchorKind, uid: String },

    /// A detail was added without an anchor.
    #[error("detail {0} has no anchor")]
    UnanchoredDetail(String),

    /// The graph has no nodes, so it has no bounding box.
    #[error("graph has no nodes")]
    EmptyGraph,

    /// The bounding box has zero height, so no publish scale exists.
    #[error("graph bounding box has zero height")]
    DegenerateBounds,

    /// The service refused the request (validation failure).
    #[error("{operation} rejected: {message}")]
    Rejected { operation: String, message: String },

    /// The service answered with a status other than success or rejection.
    #[error("{operation} failed with status {status}")]
    UnexpectedStatus { operation: String, status: u16 },

    /// The request never produced a response.
    #[error("{operation} transport failure: {message}")]
    Transport { operation: String, message: String },

    /// A successful response did not have the expected shape.
    #[error("malformed {operation} response: {message}")]
    MalformedResponse { operation: String, message: String },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Client configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_uids_are_distinct() {
        let a = Uid::generate();
        let b = Uid::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn color_dynamic_sentinel() {
        assert_eq!(Color::from("dynamic"), Color::Dynamic);
        assert_eq!(
            Color::from("#1AA2D4"),
            Color::Explicit("#1AA2D4".to_string())
        );
        assert_eq!(Color::Dynamic.as_str(), "dynamic");
        assert!(Color::default().is_dynamic());
    }

    #[test]
    fn shape_codes() {
        assert_eq!(Shape::from_code(0), Shape::Circle);
        assert_eq!(Shape::from_code(1), Shape::Image);
        assert_eq!(Shape::from_code(6), Shape::Polygon(6));
        assert_eq!(Shape::Polygon(5).code(), 5);
    }

    #[test]
    fn anchor_kind_wire_names() {
        assert_eq!(AnchorKind::Node.as_str(), "node");
        assert_eq!(AnchorKind::Link.as_str(), "rel");

        let parsed: AnchorKind = serde_json::from_str("\"Node\"").expect("parse");
        assert_eq!(parsed, AnchorKind::Node);
        for name in ["\"rel\"", "\"link\"", "\"Link\""] {
            let parsed: AnchorKind = serde_json::from_str(name).expect("parse");
            assert_eq!(parsed, AnchorKind::Link);
        }
    }

    #[test]
    fn detail_kind_parse() {
        assert_eq!("video".parse::<DetailKind>().expect("parse"), DetailKind::Video);
        assert!("gif".parse::<DetailKind>().is_err());
    }
}
