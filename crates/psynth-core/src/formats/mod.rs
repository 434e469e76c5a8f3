//! # Wire Formats
//!
//! Response bodies the core parses: the full-graph snapshot and the
//! layout update.

pub mod snapshot;

pub use snapshot::{
    DetailRecord, GraphSnapshot, LayoutUpdate, LinkRecord, LinkTypeRecord, NodeRecord, Placement,
};
