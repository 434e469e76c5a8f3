//! # Relationship Views
//!
//! Derived facts over an `EntityStore`: incident links, neighbors, parallel
//! links, attached details and the bounding box.
//!
//! Every view is recomputed on demand with a linear scan. Nothing is cached,
//! so a view always reflects the store at the moment it is called.
//!
//! Dangling references (a link endpoint or detail anchor that was never
//! added) are not errors here; they surface as `None`.

use crate::entity::{Detail, Link, LinkType, Node};
use crate::primitives::{DETAIL_LINE_HEIGHT, DETAIL_LINK_GAP, DETAIL_NODE_GAP};
use crate::store::EntityStore;
use crate::{Anchor, AnchorKind, PsynthError};

/// A point in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// The minimal rectangle enclosing every node position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// The entity a detail's anchor resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorTarget<'a> {
    Node(&'a Node),
    Link(&'a Link),
}

impl EntityStore {
    // =========================================================================
    // INCIDENT LINKS
    // =========================================================================

    /// Links leaving `node`.
    #[must_use]
    pub fn out_links(&self, node: &str) -> Vec<&Link> {
        self.links().filter(|l| l.origin.as_str() == node).collect()
    }

    /// Links arriving at `node`.
    #[must_use]
    pub fn in_links(&self, node: &str) -> Vec<&Link> {
        self.links().filter(|l| l.terminus.as_str() == node).collect()
    }

    /// Links touching `node` at either end.
    #[must_use]
    pub fn all_links(&self, node: &str) -> Vec<&Link> {
        self.links().filter(|l| l.touches(node)).collect()
    }

    // =========================================================================
    // NEIGHBORS
    // =========================================================================

    /// Terminus of every link leaving `node`, one entry per link.
    #[must_use]
    pub fn out_neighbors(&self, node: &str) -> Vec<Option<&Node>> {
        self.out_links(node)
            .into_iter()
            .map(|l| self.terminus(l))
            .collect()
    }

    /// Origin of every link arriving at `node`, one entry per link.
    #[must_use]
    pub fn in_neighbors(&self, node: &str) -> Vec<Option<&Node>> {
        self.in_links(node)
            .into_iter()
            .map(|l| self.origin(l))
            .collect()
    }

    /// Opposite endpoint of every link touching `node`, one entry per link.
    ///
    /// A self-loop contributes `node` once.
    #[must_use]
    pub fn all_neighbors(&self, node: &str) -> Vec<Option<&Node>> {
        self.links()
            .filter_map(|l| {
                if l.terminus.as_str() == node {
                    Some(self.origin(l))
                } else if l.origin.as_str() == node {
                    Some(self.terminus(l))
                } else {
                    None
                }
            })
            .collect()
    }

    // =========================================================================
    // LINK VIEWS
    // =========================================================================

    #[must_use]
    pub fn origin(&self, link: &Link) -> Option<&Node> {
        self.node(link.origin.as_str())
    }

    #[must_use]
    pub fn terminus(&self, link: &Link) -> Option<&Node> {
        self.node(link.terminus.as_str())
    }

    /// Every other link joining the same two nodes, in either direction.
    ///
    /// `link` itself is never included, even when it is stored.
    #[must_use]
    pub fn parallel(&self, link: &Link) -> Vec<&Link> {
        self.links()
            .filter(|other| other.uid != link.uid && other.is_parallel_to(link))
            .collect()
    }

    /// Midpoint between the link's endpoints.
    #[must_use]
    pub fn center(&self, link: &Link) -> Option<Point> {
        let origin = self.origin(link)?;
        let terminus = self.terminus(link)?;
        Some(Point {
            x: (origin.x + terminus.x) / 2.0,
            y: (origin.y + terminus.y) / 2.0,
        })
    }

    /// Resolve a link's type by name.
    #[must_use]
    pub fn link_type_of(&self, link: &Link) -> Option<&LinkType> {
        self.link_type(&link.link_type)
    }

    /// Links whose type is named `name`.
    #[must_use]
    pub fn links_of_type(&self, name: &str) -> Vec<&Link> {
        self.links().filter(|l| l.link_type == name).collect()
    }

    // =========================================================================
    // DETAIL VIEWS
    // =========================================================================

    /// Details anchored to the entity with this UID.
    ///
    /// Anchor kind is not checked against the entity's kind.
    #[must_use]
    pub fn details_of(&self, uid: &str) -> Vec<&Detail> {
        self.details().filter(|d| d.is_anchored_to(uid)).collect()
    }

    /// Resolve a detail's anchor.
    #[must_use]
    pub fn anchor(&self, detail: &Detail) -> Option<AnchorTarget<'_>> {
        let anchor = detail.anchor.as_ref()?;
        match anchor.kind {
            AnchorKind::Node => self.node(anchor.uid.as_str()).map(AnchorTarget::Node),
            AnchorKind::Link => self.link(anchor.uid.as_str()).map(AnchorTarget::Link),
        }
    }

    /// Where the next detail attached to `anchor` should be placed.
    ///
    /// Details stack downward by one line per detail already on the anchor.
    pub fn next_detail_position(&self, anchor: &Anchor) -> Result<Point, PsynthError> {
        let stacked = self.details_of(anchor.uid.as_str()).len() as f64 * DETAIL_LINE_HEIGHT;
        let not_found = || PsynthError::AnchorNotFound {
            kind: anchor.kind,
            uid: anchor.uid.to_string(),
        };
        match anchor.kind {
            AnchorKind::Node => {
                let node = self.node(anchor.uid.as_str()).ok_or_else(not_found)?;
                Ok(Point {
                    x: node.x + node.radius + DETAIL_NODE_GAP,
                    y: node.y + node.radius + stacked,
                })
            }
            AnchorKind::Link => {
                let link = self.link(anchor.uid.as_str()).ok_or_else(not_found)?;
                let center = self.center(link).ok_or_else(not_found)?;
                Ok(Point {
                    x: center.x + DETAIL_LINK_GAP,
                    y: center.y + stacked,
                })
            }
        }
    }

    // =========================================================================
    // BOUNDING BOX
    // =========================================================================

    /// Extent of all node positions; `None` when there are no nodes.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut nodes = self.nodes();
        let first = nodes.next()?;
        let start = BoundingBox {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        Some(nodes.fold(start, |b, n| BoundingBox {
            min_x: b.min_x.min(n.x),
            max_x: b.max_x.max(n.x),
            min_y: b.min_y.min(n.y),
            max_y: b.max_y.max(n.y),
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
