//! # psynth-core
//!
//! Client-side model of a remote Psynth graph.
//!
//! A `GraphSession` keeps a local `EntityStore` of nodes, links, link types
//! and details, answers relationship questions from it, and mirrors every
//! change to the remote service through an ordered `RequestQueue`.
//!
//! ## Architectural Constraints
//!
//! - The store is authoritative for local queries and is updated
//!   synchronously, before the remote request is sent
//! - Remote requests leave in enqueue order, one at a time
//! - The service is reached only through `RemoteGraphService`; this crate
//!   has NO async and NO network dependencies

// =============================================================================
// MODULES
// =============================================================================

pub mod bootstrap;
pub mod entity;
pub mod formats;
pub mod operation;
pub mod primitives;
pub mod queue;
pub mod remote;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod views;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Anchor, AnchorKind, Color, DetailKind, EntityKind, PsynthError, Shape, Uid,
};

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use entity::{Detail, Entity, Link, LinkType, Node};
pub use store::{EntityStore, Keyed, Table};
pub use views::{AnchorTarget, BoundingBox, Point};

// =============================================================================
// RE-EXPORTS: Remote Requests
// =============================================================================

pub use bootstrap::{create_graph, list_graphs, load_graph};
pub use operation::{Operation, Params, Request};
pub use queue::{Continuation, QueueState, RequestQueue, then};
pub use remote::{RemoteGraphService, Response, TransportError, settle};
pub use session::{GraphSession, Identity};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{GraphSnapshot, LayoutUpdate};
