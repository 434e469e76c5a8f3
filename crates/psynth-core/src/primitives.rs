//! # Primitives
//!
//! Fixed constants shared by the entity model, the session and the wire
//! formats. These are compiled in and immutable at runtime.

// =============================================================================
// STATUS CODES
// =============================================================================

/// Status of a successful remote operation.
pub const STATUS_OK: u16 = 200;

/// Status the service uses for a request-level validation failure.
pub const STATUS_REJECTED: u16 = 406;

// =============================================================================
// ENTITY DEFAULTS
// =============================================================================

/// Color sentinel meaning "render using the active palette".
pub const DYNAMIC_COLOR: &str = "dynamic";

/// Image reference sent for nodes without an image.
pub const NO_IMAGE: &str = "na";

pub const DEFAULT_NODE_NAME: &str = "New Node";
pub const DEFAULT_NODE_X: f64 = 1.0;
pub const DEFAULT_NODE_Y: f64 = 1.0;
pub const DEFAULT_NODE_SIDES: u32 = 6;
pub const DEFAULT_NODE_RADIUS: f64 = 24.0;

pub const DEFAULT_LINK_NAME: &str = "Link";
pub const DEFAULT_LINK_VALUE: i64 = 1;

pub const DEFAULT_LINK_TYPE_NAME: &str = "Links";
pub const DEFAULT_LINK_TYPE_ICON: &str = "img/link_icon.png";
pub const DEFAULT_LINK_TYPE_TILE: &str = "img/link_tile.png";
pub const DEFAULT_LINK_TYPE_MAX: i64 = 10;

/// Name sent for details without a display name.
pub const BLANK_DETAIL_NAME: &str = " ";

// =============================================================================
// DETAIL PLACEMENT
// =============================================================================

/// Horizontal gap between a node's rim and its details.
pub const DETAIL_NODE_GAP: f64 = 4.0;

/// Horizontal offset of link details from the link midpoint.
pub const DETAIL_LINK_GAP: f64 = 10.0;

/// Vertical spacing between stacked details on one anchor.
pub const DETAIL_LINE_HEIGHT: f64 = 20.0;

// =============================================================================
// PUBLISHING
// =============================================================================

/// Margin added to the bounding box's min corner before negating it.
pub const PUBLISH_MARGIN: f64 = 0.1;

/// Target height, in pixels, of a published graph.
pub const PUBLISH_TARGET_HEIGHT: f64 = 1080.0;
