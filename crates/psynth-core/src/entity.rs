//! # Entities
//!
//! The four entity kinds of a graph: `Node`, `Link`, `LinkType` and `Detail`.
//!
//! Entities are plain owned values. They hold no reference to the session
//! that stores them; relationships are resolved by UID (or by name, for
//! link types) through the session's `EntityStore`.
//!
//! Every entity starts with `created == false` and is flagged created when
//! its "new" operation is enqueued.

use crate::operation::Params;
use crate::primitives::{
    BLANK_DETAIL_NAME, DEFAULT_LINK_NAME, DEFAULT_LINK_TYPE_ICON, DEFAULT_LINK_TYPE_MAX,
    DEFAULT_LINK_TYPE_NAME, DEFAULT_LINK_TYPE_TILE, DEFAULT_LINK_VALUE, DEFAULT_NODE_NAME,
    DEFAULT_NODE_RADIUS, DEFAULT_NODE_SIDES, DEFAULT_NODE_X, DEFAULT_NODE_Y, NO_IMAGE,
};
use crate::{Anchor, Color, DetailKind, EntityKind, PsynthError, Shape, Uid};

/// Insert a key/value pair into a parameter map.
fn put(params: &mut Params, key: &str, value: impl ToString) {
    params.insert(key.to_string(), value.to_string());
}

// =============================================================================
// NODE
// =============================================================================

/// A vertex of the graph with screen-space position (0,0 is top-left).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub uid: Uid,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub shape: Shape,
    /// Image URL or path, used when `shape` is `Shape::Image`.
    ///
    /// `None` goes on the wire as `"na"`, so `Some("na")` and `Some("")`
    /// read back as `None`. `with_image` folds them to `None` up front.
    pub image: Option<String>,
    pub radius: f64,
    pub color: Color,
    pub(crate) created: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_NAME)
    }
}

impl Node {
    /// Create a node with a fresh UID and default geometry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uid: Uid::generate(),
            name: name.into(),
            x: DEFAULT_NODE_X,
            y: DEFAULT_NODE_Y,
            shape: Shape::Polygon(DEFAULT_NODE_SIDES),
            image: None,
            radius: DEFAULT_NODE_RADIUS,
            color: Color::Dynamic,
            created: false,
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = uid.into();
        self
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        let image = image.into();
        self.image = (!image.is_empty() && image != NO_IMAGE).then_some(image);
        self
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<Color>) -> Self {
        self.color = color.into();
        self
    }

    /// Whether the service has been asked to create this node.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Serialize the node's field set for a `newnode`/`updatenode` request.
    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        put(&mut params, "uid", &self.uid);
        put(&mut params, "name", &self.name);
        put(&mut params, "x", self.x);
        put(&mut params, "y", self.y);
        put(&mut params, "radius", self.radius);
        put(&mut params, "shape", self.shape.code());
        put(&mut params, "picture", self.image.as_deref().unwrap_or(NO_IMAGE));
        put(&mut params, "color", self.color.as_str());
        params
    }
}

// =============================================================================
// LINK
// =============================================================================

/// A typed, directed edge between two nodes, referenced by UID.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub uid: Uid,
    pub origin: Uid,
    pub terminus: Uid,
    /// Name of the `LinkType` this link belongs to.
    pub link_type: String,
    pub name: String,
    /// Strength, expected to lie in `1..=link_type.max`. Not enforced.
    pub value: i64,
    pub(crate) created: bool,
}

impl Link {
    /// Create a link from `origin` to `terminus` of the given type.
    #[must_use]
    pub fn new(origin: impl Into<Uid>, terminus: impl Into<Uid>, link_type: impl Into<String>) -> Self {
        Self {
            uid: Uid::generate(),
            origin: origin.into(),
            terminus: terminus.into(),
            link_type: link_type.into(),
            name: DEFAULT_LINK_NAME.to_string(),
            value: DEFAULT_LINK_VALUE,
            created: false,
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = uid.into();
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Whether this link touches the node `uid` at either end.
    #[must_use]
    pub fn touches(&self, uid: &str) -> bool {
        self.origin.as_str() == uid || self.terminus.as_str() == uid
    }

    /// Whether both links join the same unordered pair of nodes.
    #[must_use]
    pub fn is_parallel_to(&self, other: &Link) -> bool {
        (self.origin == other.origin && self.terminus == other.terminus)
            || (self.origin == other.terminus && self.terminus == other.origin)
    }

    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        put(&mut params, "uid", &self.uid);
        put(&mut params, "name", &self.name);
        put(&mut params, "value", self.value);
        put(&mut params, "rel_type", &self.link_type);
        put(&mut params, "o_uid", &self.origin);
        put(&mut params, "t_uid", &self.terminus);
        params
    }
}

// =============================================================================
// LINK TYPE
// =============================================================================

/// A named category of links. The name is its key within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkType {
    pub name: String,
    pub icon: String,
    pub tile: String,
    pub color: Color,
    /// Largest value a link of this type may carry.
    pub max: i64,
    /// Whether the icon color follows the line color.
    pub sync: bool,
    pub(crate) created: bool,
}

impl Default for LinkType {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_TYPE_NAME)
    }
}

impl LinkType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: DEFAULT_LINK_TYPE_ICON.to_string(),
            tile: DEFAULT_LINK_TYPE_TILE.to_string(),
            color: Color::Dynamic,
            max: DEFAULT_LINK_TYPE_MAX,
            sync: true,
            created: false,
        }
    }

    #[must_use]
    pub fn with_max(mut self, max: i64) -> Self {
        self.max = max;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<Color>) -> Self {
        self.color = color.into();
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>, tile: impl Into<String>) -> Self {
        self.icon = icon.into();
        self.tile = tile.into();
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Whether `value` lies in this type's allowed range `1..=max`.
    #[must_use]
    pub fn accepts(&self, value: i64) -> bool {
        (1..=self.max).contains(&value)
    }

    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        put(&mut params, "NAME", &self.name);
        put(&mut params, "ICON", &self.icon);
        put(&mut params, "TILE", &self.tile);
        put(&mut params, "COLOR", self.color.as_str());
        put(&mut params, "MAX", self.max);
        put(&mut params, "SYNC", self.sync);
        params
    }
}

// =============================================================================
// DETAIL
// =============================================================================

/// An annotation attached to a node or link.
///
/// Position may be left unset; `GraphSession::attach_detail` derives it
/// from the anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub uid: Uid,
    pub anchor: Option<Anchor>,
    pub content: String,
    pub kind: DetailKind,
    /// Display name. `None` goes on the wire as `" "`, so a blank name
    /// reads back as `None`. `with_name` folds blank names to `None`.
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub(crate) created: bool,
}

impl Detail {
    /// Create an unanchored comment detail.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            uid: Uid::generate(),
            anchor: None,
            content: content.into(),
            kind: DetailKind::Comment,
            name: None,
            x: None,
            y: None,
            created: false,
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = uid.into();
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: DetailKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.trim().is_empty()).then_some(name);
        self
    }

    #[must_use]
    pub fn anchored_to(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Whether this detail is anchored to the entity `uid`.
    ///
    /// The anchor kind is not compared.
    #[must_use]
    pub fn is_anchored_to(&self, uid: &str) -> bool {
        self.anchor.as_ref().is_some_and(|a| a.uid.as_str() == uid)
    }

    /// Unset coordinates are omitted.
    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(anchor) = &self.anchor {
            put(&mut params, "anchor_uid", &anchor.uid);
            put(&mut params, "anchor_type", anchor.kind.as_str());
        }
        put(&mut params, "uid", &self.uid);
        put(
            &mut params,
            "name",
            self.name.as_deref().unwrap_or(BLANK_DETAIL_NAME),
        );
        put(&mut params, "content", &self.content);
        put(&mut params, "type", self.kind.as_str());
        if let Some(x) = self.x {
            put(&mut params, "x", x);
        }
        if let Some(y) = self.y {
            put(&mut params, "y", y);
        }
        params
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Any one of the four entity kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(Node),
    Link(Link),
    LinkType(LinkType),
    Detail(Detail),
}

impl Entity {
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Link(_) => EntityKind::Link,
            Self::LinkType(_) => EntityKind::LinkType,
            Self::Detail(_) => EntityKind::Detail,
        }
    }
}

macro_rules! entity_conversions {
    ($($ty:ident),+) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Self::$ty(value)
                }
            }

            impl TryFrom<Entity> for $ty {
                type Error = PsynthError;

                fn try_from(entity: Entity) -> Result<Self, Self::Error> {
                    match entity {
                        Entity::$ty(value) => Ok(value),
                        other => Err(PsynthError::WrongEntityKind {
                            expected: EntityKind::$ty,
                            found: other.kind(),
                        }),
                    }
                }
            }
        )+
    };
}

entity_conversions!(Node, Link, LinkType, Detail);

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_defaults() {
        let node = Node::default();
        assert_eq!(node.name, "New Node");
        assert_eq!(node.shape, Shape::Polygon(6));
        assert_eq!(node.radius, 24.0);
        assert!(node.color.is_dynamic());
        assert!(!node.is_created());
    }

    #[test]
    fn node_params_use_sentinels() {
        let node = Node::new("A").with_uid("n1").at(10.0, 20.5);
        let params = node.to_params();
        assert_eq!(params.get("uid").map(String::as_str), Some("n1"));
        assert_eq!(params.get("x").map(String::as_str), Some("10"));
        assert_eq!(params.get("y").map(String::as_str), Some("20.5"));
        assert_eq!(params.get("picture").map(String::as_str), Some("na"));
        assert_eq!(params.get("color").map(String::as_str), Some("dynamic"));
        assert_eq!(params.get("shape").map(String::as_str), Some("6"));
    }

    #[test]
    fn link_parallel_is_direction_agnostic() {
        let ab = Link::new("a", "b", "T");
        let ba = Link::new("b", "a", "T");
        let ac = Link::new("a", "c", "T");
        assert!(ab.is_parallel_to(&ba));
        assert!(!ab.is_parallel_to(&ac));
        assert!(ab.touches("b"));
        assert!(!ab.touches("c"));
    }

    #[test]
    fn link_type_range_is_inclusive() {
        let lt = LinkType::new("Default").with_max(10);
        assert!(lt.accepts(1));
        assert!(lt.accepts(10));
        assert!(!lt.accepts(0));
        assert!(!lt.accepts(11));
    }

    #[test]
    fn detail_params_omit_unset_position() {
        let detail = Detail::new("hello").anchored_to(Anchor::link("l1"));
        let params = detail.to_params();
        assert_eq!(params.get("anchor_type").map(String::as_str), Some("rel"));
        assert_eq!(params.get("name").map(String::as_str), Some(" "));
        assert!(!params.contains_key("x"));

        let placed = detail.at(3.0, 4.0).to_params();
        assert_eq!(placed.get("x").map(String::as_str), Some("3"));
    }

    #[test]
    fn builders_fold_wire_sentinels_to_none() {
        assert!(Node::new("A").with_image("na").image.is_none());
        assert!(Node::new("A").with_image("").image.is_none());
        assert_eq!(
            Node::new("A").with_image("img/a.png").image.as_deref(),
            Some("img/a.png")
        );

        assert!(Detail::new("c").with_name(" ").name.is_none());
        assert!(Detail::new("c").with_name("\t").name.is_none());
        assert_eq!(Detail::new("c").with_name("Note").name.as_deref(), Some("Note"));
    }

    #[test]
    fn entity_conversion_checks_kind() {
        let entity = Entity::from(Node::new("A"));
        assert_eq!(entity.kind(), EntityKind::Node);

        let err = Link::try_from(entity.clone()).expect_err("wrong kind");
        assert_eq!(
            err,
            PsynthError::WrongEntityKind {
                expected: EntityKind::Link,
                found: EntityKind::Node,
            }
        );
        assert!(Node::try_from(entity).is_ok());
    }
}
