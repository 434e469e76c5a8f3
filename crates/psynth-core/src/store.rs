//! # Entity Store
//!
//! Owned collections of the four entity kinds, each kept as an
//! insertion-ordered list plus a key-indexed map.
//!
//! The store knows nothing about the remote service. Adding to it directly
//! is the "no remote update" path; `GraphSession` wraps it to keep local and
//! remote state moving together.

use crate::entity::{Detail, Entity, Link, LinkType, Node};
use crate::{EntityKind, PsynthError};
use std::collections::BTreeMap;

// =============================================================================
// KEYED TRAIT
// =============================================================================

/// An entity that can be stored in a `Table`.
pub trait Keyed {
    /// The kind reported in duplicate-key errors.
    const KIND: EntityKind;

    /// The entity's key: UID for nodes, links and details, name for link types.
    fn key(&self) -> &str;

    /// The error for a key that names nothing.
    fn not_found(key: &str) -> PsynthError;
}

impl Keyed for Node {
    const KIND: EntityKind = EntityKind::Node;

    fn key(&self) -> &str {
        self.uid.as_str()
    }

    fn not_found(key: &str) -> PsynthError {
        PsynthError::NodeNotFound(key.to_string())
    }
}

impl Keyed for Link {
    const KIND: EntityKind = EntityKind::Link;

    fn key(&self) -> &str {
        self.uid.as_str()
    }

    fn not_found(key: &str) -> PsynthError {
        PsynthError::LinkNotFound(key.to_string())
    }
}

impl Keyed for LinkType {
    const KIND: EntityKind = EntityKind::LinkType;

    fn key(&self) -> &str {
        &self.name
    }

    fn not_found(key: &str) -> PsynthError {
        PsynthError::LinkTypeNotFound(key.to_string())
    }
}

impl Keyed for Detail {
    const KIND: EntityKind = EntityKind::Detail;

    fn key(&self) -> &str {
        self.uid.as_str()
    }

    fn not_found(key: &str) -> PsynthError {
        PsynthError::DetailNotFound(key.to_string())
    }
}

// =============================================================================
// TABLE
// =============================================================================

/// One entity kind's storage.
///
/// Entities live in `entries`; `order` records insertion order. Every key in
/// `order` is present in `entries` and vice versa after every operation.
#[derive(Debug, Clone)]
pub struct Table<T> {
    order: Vec<String>,
    entries: BTreeMap<String, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Keyed> Table<T> {
    /// Append an entity. Rejects a key that is already stored.
    pub fn insert(&mut self, entity: T) -> Result<&mut T, PsynthError> {
        let key = entity.key().to_string();
        if self.entries.contains_key(&key) {
            return Err(PsynthError::DuplicateUid {
                kind: T::KIND,
                uid: key,
            });
        }
        self.order.push(key.clone());
        Ok(self.entries.entry(key).or_insert(entity))
    }

    /// Remove an entity from both the list and the index.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let entity = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entity)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    /// Edit an entity in place.
    ///
    /// The key is fixed: if `edit` changes it, the entity is put back as it
    /// was and `KeyChanged` is returned.
    pub fn modify<R>(&mut self, key: &str, edit: impl FnOnce(&mut T) -> R) -> Result<R, PsynthError>
    where
        T: Clone,
    {
        let entity = self.entries.get_mut(key).ok_or_else(|| T::not_found(key))?;
        let before = entity.clone();
        let result = edit(entity);
        if entity.key() != key {
            let to = entity.key().to_string();
            *entity = before;
            return Err(PsynthError::KeyChanged {
                kind: T::KIND,
                from: key.to_string(),
                to,
            });
        }
        Ok(result)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    /// The key-indexed map. Iteration order is not insertion order.
    #[must_use]
    pub fn index(&self) -> &BTreeMap<String, T> {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// ENTITY STORE
// =============================================================================

/// All entities of one graph.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    nodes: Table<Node>,
    links: Table<Link>,
    link_types: Table<LinkType>,
    details: Table<Detail>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity of any kind to the table for its kind.
    pub fn add(&mut self, entity: Entity) -> Result<(), PsynthError> {
        match entity {
            Entity::Node(node) => self.add_node(node).map(|_| ()),
            Entity::Link(link) => self.add_link(link).map(|_| ()),
            Entity::LinkType(link_type) => self.add_link_type(link_type).map(|_| ()),
            Entity::Detail(detail) => self.add_detail(detail).map(|_| ()),
        }
    }

    pub fn add_node(&mut self, node: Node) -> Result<&mut Node, PsynthError> {
        self.nodes.insert(node)
    }

    pub fn add_link(&mut self, link: Link) -> Result<&mut Link, PsynthError> {
        self.links.insert(link)
    }

    pub fn add_link_type(&mut self, link_type: LinkType) -> Result<&mut LinkType, PsynthError> {
        self.link_types.insert(link_type)
    }

    pub fn add_detail(&mut self, detail: Detail) -> Result<&mut Detail, PsynthError> {
        self.details.insert(detail)
    }

    pub fn remove_node(&mut self, uid: &str) -> Option<Node> {
        self.nodes.remove(uid)
    }

    pub fn remove_link(&mut self, uid: &str) -> Option<Link> {
        self.links.remove(uid)
    }

    pub fn remove_link_type(&mut self, name: &str) -> Option<LinkType> {
        self.link_types.remove(name)
    }

    pub fn remove_detail(&mut self, uid: &str) -> Option<Detail> {
        self.details.remove(uid)
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    #[must_use]
    pub fn node(&self, uid: &str) -> Option<&Node> {
        self.nodes.get(uid)
    }

    pub fn modify_node<R>(
        &mut self,
        uid: &str,
        edit: impl FnOnce(&mut Node) -> R,
    ) -> Result<R, PsynthError> {
        self.nodes.modify(uid, edit)
    }

    #[must_use]
    pub fn link(&self, uid: &str) -> Option<&Link> {
        self.links.get(uid)
    }

    pub fn modify_link<R>(
        &mut self,
        uid: &str,
        edit: impl FnOnce(&mut Link) -> R,
    ) -> Result<R, PsynthError> {
        self.links.modify(uid, edit)
    }

    #[must_use]
    pub fn link_type(&self, name: &str) -> Option<&LinkType> {
        self.link_types.get(name)
    }

    pub fn modify_link_type<R>(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut LinkType) -> R,
    ) -> Result<R, PsynthError> {
        self.link_types.modify(name, edit)
    }

    #[must_use]
    pub fn detail(&self, uid: &str) -> Option<&Detail> {
        self.details.get(uid)
    }

    pub fn modify_detail<R>(
        &mut self,
        uid: &str,
        edit: impl FnOnce(&mut Detail) -> R,
    ) -> Result<R, PsynthError> {
        self.details.modify(uid, edit)
    }

    // =========================================================================
    // LISTS AND INDICES
    // =========================================================================

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter()
    }

    /// Link types in insertion order.
    pub fn link_types(&self) -> impl Iterator<Item = &LinkType> + '_ {
        self.link_types.iter()
    }

    /// Details in insertion order.
    pub fn details(&self) -> impl Iterator<Item = &Detail> + '_ {
        self.details.iter()
    }

    #[must_use]
    pub fn node_index(&self) -> &BTreeMap<String, Node> {
        self.nodes.index()
    }

    #[must_use]
    pub fn link_index(&self) -> &BTreeMap<String, Link> {
        self.links.index()
    }

    #[must_use]
    pub fn link_type_index(&self) -> &BTreeMap<String, LinkType> {
        self.link_types.index()
    }

    #[must_use]
    pub fn detail_index(&self) -> &BTreeMap<String, Detail> {
        self.details.index()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn link_type_count(&self) -> usize {
        self.link_types.len()
    }

    #[must_use]
    pub fn detail_count(&self) -> usize {
        self.details.len()
    }

    /// Check if the store holds no entities at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.links.is_empty()
            && self.link_types.is_empty()
            && self.details.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
