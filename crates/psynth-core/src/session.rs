//! # Session Module
//!
//! `GraphSession` binds an `EntityStore` to one remote graph and to the
//! `RequestQueue` that talks to it.
//!
//! Every mutating call updates the store synchronously and enqueues the
//! matching remote request. Requests leave strictly in enqueue order with
//! at most one in flight; a continuation that enqueues more work appends it
//! behind everything already queued.
//!
//! Remote failures never stop the queue. They are logged and collected in
//! the session's failure log.

use crate::entity::{Detail, Entity, Link, LinkType, Node};
use crate::formats::{GraphSnapshot, LayoutUpdate};
use crate::operation::{Operation, Params, Request};
use crate::primitives::{PUBLISH_MARGIN, PUBLISH_TARGET_HEIGHT};
use crate::queue::{Continuation, Pending, QueueState, RequestQueue};
use crate::remote::{self, RemoteGraphService};
use crate::store::{EntityStore, Keyed};
use crate::{Anchor, PsynthError, Uid};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

// =============================================================================
// IDENTITY
// =============================================================================

/// Who is talking to the service, and about which graph.
///
/// These fields are attached to every outgoing request at dispatch time.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub key: String,
    /// Server-assigned graph handle; absent until the graph exists.
    pub filename: Option<String>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .field("filename", &self.filename)
            .finish()
    }
}

impl Identity {
    #[must_use]
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
            filename: None,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Attach `user`, `key` and, once assigned, `filename`.
    pub fn tag(&self, params: &mut Params) {
        params.insert("user".to_string(), self.username.clone());
        params.insert("key".to_string(), self.key.clone());
        if let Some(filename) = self.filename.as_deref().filter(|f| !f.is_empty()) {
            params.insert("filename".to_string(), filename.to_string());
        }
    }
}

// =============================================================================
// GRAPH SESSION
// =============================================================================

/// A local model of one remote graph.
///
/// Obtain one through `bootstrap::create_graph` or `bootstrap::load_graph`.
pub struct GraphSession {
    name: String,
    identity: Identity,
    store: EntityStore,
    queue: RequestQueue,
    service: Box<dyn RemoteGraphService>,
    failures: Vec<PsynthError>,
}

impl fmt::Debug for GraphSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphSession")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .field("store", &self.store)
            .field("queue", &self.queue)
            .field("failures", &self.failures)
            .finish()
    }
}

impl GraphSession {
    /// Bind an empty store to a remote graph.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        identity: Identity,
        service: impl RemoteGraphService + 'static,
    ) -> Self {
        Self::with_store(name, identity, Box::new(service), EntityStore::new())
    }

    /// Bind an existing store, e.g. one restored from a snapshot.
    #[must_use]
    pub fn with_store(
        name: impl Into<String>,
        identity: Identity,
        service: Box<dyn RemoteGraphService>,
        store: EntityStore,
    ) -> Self {
        Self {
            name: name.into(),
            identity,
            store,
            queue: RequestQueue::new(),
            service,
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.identity.filename.as_deref()
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Read access to entities and relationship views.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Local-only access. Changes made here reach the service only through
    /// the matching `update_*` call.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    #[must_use]
    pub fn queue_state(&self) -> QueueState {
        self.queue.state()
    }

    /// Number of requests not yet sent.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    /// Remote failures observed so far, oldest first.
    #[must_use]
    pub fn failures(&self) -> &[PsynthError] {
        &self.failures
    }

    /// Drain the failure log.
    pub fn take_failures(&mut self) -> Vec<PsynthError> {
        std::mem::take(&mut self.failures)
    }

    /// Capture the current store as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.name, &self.store)
    }

    // =========================================================================
    // REQUEST QUEUE
    // =========================================================================

    /// Queue a request. If nothing is in flight, draining starts now and
    /// runs until the queue is empty.
    pub fn enqueue(&mut self, request: Request, continuation: Option<Continuation>) {
        debug!(
            operation = %request.operation,
            pending = self.queue.len(),
            "enqueue"
        );
        if self.queue.push(request, continuation) {
            self.drain();
        }
    }

    /// Queue an allow-listed operation by name.
    ///
    /// Unknown names fail here and are never queued.
    pub fn request(
        &mut self,
        name: &str,
        params: Params,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        let request = Request::named(name, params)?;
        self.enqueue(request, continuation);
        Ok(())
    }

    /// Run `f` with the queue held: requests it enqueues are sent, in order,
    /// only after it returns.
    ///
    /// Inside a continuation, or inside another batch, this is a plain call.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let took_hold = self.queue.hold();
        let result = f(self);
        if took_hold && self.queue.release() {
            self.drain();
        }
        result
    }

    fn drain(&mut self) {
        while let Some(Pending {
            mut request,
            continuation,
        }) = self.queue.next()
        {
            self.identity.tag(&mut request.params);
            let operation = request.operation;
            debug!(%operation, remaining = self.queue.len(), "dispatch");
            let outcome = self.service.execute(operation, &request.params);
            match remote::settle(operation, outcome) {
                Ok(body) => {
                    if let Some(continuation) = continuation {
                        continuation.succeed(self, &body);
                    }
                }
                Err(error) => {
                    let unhandled = match continuation {
                        Some(continuation) => continuation.fail(self, error),
                        None => Some(error),
                    };
                    if let Some(error) = unhandled {
                        self.record_failure(error);
                    }
                }
            }
        }
    }

    fn record_failure(&mut self, error: PsynthError) {
        warn!(%error, "remote request failed");
        self.failures.push(error);
    }

    // =========================================================================
    // ADD
    // =========================================================================

    /// Add any entity kind, dispatching to the typed method.
    pub fn add(
        &mut self,
        entity: Entity,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        match entity {
            Entity::Node(node) => self.add_node(node, continuation).map(|_| ()),
            Entity::Link(link) => self.add_link(link, continuation).map(|_| ()),
            Entity::LinkType(link_type) => self.add_link_type(link_type, continuation),
            Entity::Detail(detail) => self.add_detail(detail, continuation).map(|_| ()),
        }
    }

    pub fn add_node(
        &mut self,
        mut node: Node,
        continuation: Option<Continuation>,
    ) -> Result<Uid, PsynthError> {
        node.created = true;
        let request = Request::with_params(Operation::NewNode, node.to_params());
        let uid = self.store.add_node(node)?.uid.clone();
        self.enqueue(request, continuation);
        Ok(uid)
    }

    /// Add a link. A value outside its type's range is logged, not refused.
    pub fn add_link(
        &mut self,
        mut link: Link,
        continuation: Option<Continuation>,
    ) -> Result<Uid, PsynthError> {
        self.warn_out_of_range(&link);
        link.created = true;
        let request = Request::with_params(Operation::NewRel, link.to_params());
        let uid = self.store.add_link(link)?.uid.clone();
        self.enqueue(request, continuation);
        Ok(uid)
    }

    /// Add a link type. Links of this type should be added after it.
    pub fn add_link_type(
        &mut self,
        mut link_type: LinkType,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        link_type.created = true;
        let request = Request::with_params(Operation::NewRelType, link_type.to_params());
        self.store.add_link_type(link_type)?;
        self.enqueue(request, continuation);
        Ok(())
    }

    /// Add an anchored detail, deriving any unset coordinate from its anchor.
    pub fn add_detail(
        &mut self,
        mut detail: Detail,
        continuation: Option<Continuation>,
    ) -> Result<Uid, PsynthError> {
        let anchor = detail
            .anchor
            .clone()
            .ok_or_else(|| PsynthError::UnanchoredDetail(detail.uid.to_string()))?;
        if detail.x.is_none() || detail.y.is_none() {
            let position = self.store.next_detail_position(&anchor)?;
            detail.x.get_or_insert(position.x);
            detail.y.get_or_insert(position.y);
        }
        detail.created = true;
        let request = Request::with_params(Operation::NewDetail, detail.to_params());
        let uid = self.store.add_detail(detail)?.uid.clone();
        self.enqueue(request, continuation);
        Ok(uid)
    }

    /// Anchor `detail` to a node or link and add it.
    pub fn attach_detail(
        &mut self,
        anchor: Anchor,
        mut detail: Detail,
        continuation: Option<Continuation>,
    ) -> Result<Uid, PsynthError> {
        detail.anchor = Some(anchor);
        self.add_detail(detail, continuation)
    }

    /// Add several nodes with one `batchnodes` request.
    ///
    /// Nothing is stored if any UID collides.
    pub fn add_nodes(
        &mut self,
        nodes: Vec<Node>,
        continuation: Option<Continuation>,
    ) -> Result<Vec<Uid>, PsynthError> {
        check_batch(&nodes, |key| self.store.node(key).is_some())?;
        let fields: Vec<Params> = nodes.iter().map(Node::to_params).collect();
        let request = Request::new(Operation::BatchNodes).param("nodes", encode(&fields)?);
        let mut uids = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            node.created = true;
            uids.push(self.store.add_node(node)?.uid.clone());
        }
        self.enqueue(request, continuation);
        Ok(uids)
    }

    /// Add several links with one `batchrels` request.
    ///
    /// Nothing is stored if any UID collides.
    pub fn add_links(
        &mut self,
        links: Vec<Link>,
        continuation: Option<Continuation>,
    ) -> Result<Vec<Uid>, PsynthError> {
        check_batch(&links, |key| self.store.link(key).is_some())?;
        let fields: Vec<Params> = links.iter().map(Link::to_params).collect();
        let request = Request::new(Operation::BatchRels).param("rels", encode(&fields)?);
        let mut uids = Vec::with_capacity(links.len());
        for mut link in links {
            self.warn_out_of_range(&link);
            link.created = true;
            uids.push(self.store.add_link(link)?.uid.clone());
        }
        self.enqueue(request, continuation);
        Ok(uids)
    }

    fn warn_out_of_range(&self, link: &Link) {
        if let Some(link_type) = self.store.link_type(&link.link_type) {
            if !link_type.accepts(link.value) {
                warn!(
                    link = %link.uid,
                    value = link.value,
                    max = link_type.max,
                    "link value outside its type's range"
                );
            }
        }
    }

    // =========================================================================
    // REMOVE
    // =========================================================================

    /// Remove a node locally and queue its deletion.
    ///
    /// Links and details that reference it are left in place.
    pub fn remove_node(
        &mut self,
        uid: &str,
        continuation: Option<Continuation>,
    ) -> Result<Node, PsynthError> {
        let node = self
            .store
            .remove_node(uid)
            .ok_or_else(|| PsynthError::NodeNotFound(uid.to_string()))?;
        self.enqueue(Request::new(Operation::DelNode).param("uid", uid), continuation);
        Ok(node)
    }

    pub fn remove_link(
        &mut self,
        uid: &str,
        continuation: Option<Continuation>,
    ) -> Result<Link, PsynthError> {
        let link = self
            .store
            .remove_link(uid)
            .ok_or_else(|| PsynthError::LinkNotFound(uid.to_string()))?;
        self.enqueue(Request::new(Operation::DelRel).param("uid", uid), continuation);
        Ok(link)
    }

    pub fn remove_detail(
        &mut self,
        uid: &str,
        continuation: Option<Continuation>,
    ) -> Result<Detail, PsynthError> {
        let detail = self
            .store
            .remove_detail(uid)
            .ok_or_else(|| PsynthError::DetailNotFound(uid.to_string()))?;
        self.enqueue(Request::new(Operation::DelDetail).param("uid", uid), continuation);
        Ok(detail)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Push a node's current fields to the service.
    pub fn update_node(
        &mut self,
        uid: &str,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        let params = self
            .store
            .node(uid)
            .ok_or_else(|| PsynthError::NodeNotFound(uid.to_string()))?
            .to_params();
        self.enqueue(Request::with_params(Operation::UpdateNode, params), continuation);
        Ok(())
    }

    pub fn update_link(
        &mut self,
        uid: &str,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        let params = self
            .store
            .link(uid)
            .ok_or_else(|| PsynthError::LinkNotFound(uid.to_string()))?
            .to_params();
        self.enqueue(Request::with_params(Operation::UpdateRel, params), continuation);
        Ok(())
    }

    pub fn update_link_type(
        &mut self,
        name: &str,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        let params = self
            .store
            .link_type(name)
            .ok_or_else(|| PsynthError::LinkTypeNotFound(name.to_string()))?
            .to_params();
        self.enqueue(
            Request::with_params(Operation::UpdateRelType, params),
            continuation,
        );
        Ok(())
    }

    pub fn update_detail(
        &mut self,
        uid: &str,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        let params = self
            .store
            .detail(uid)
            .ok_or_else(|| PsynthError::DetailNotFound(uid.to_string()))?
            .to_params();
        self.enqueue(
            Request::with_params(Operation::UpdateDetail, params),
            continuation,
        );
        Ok(())
    }

    /// Mutate a node in place, then push it.
    ///
    /// The UID cannot be edited; an edit that changes it is undone and
    /// nothing is sent.
    pub fn edit_node(
        &mut self,
        uid: &str,
        edit: impl FnOnce(&mut Node),
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        self.store.modify_node(uid, edit)?;
        self.update_node(uid, continuation)
    }

    // =========================================================================
    // LAYOUT
    // =========================================================================

    /// Ask the service for a layout and apply the returned positions.
    ///
    /// `continuation` receives the raw response after positions are applied.
    pub fn draw(&mut self, continuation: Option<Continuation>) {
        let apply = Continuation::preceded_by(
            |session: &mut GraphSession, body: &Value| match LayoutUpdate::from_value(body) {
                Ok(update) => {
                    let unknown = update.apply(&mut session.store);
                    if !unknown.is_empty() {
                        warn!(count = unknown.len(), "layout named unknown entities");
                    }
                }
                Err(e) => session.record_failure(PsynthError::MalformedResponse {
                    operation: Operation::DrawGraph.to_string(),
                    message: e.to_string(),
                }),
            },
            continuation,
        );
        self.enqueue(Request::new(Operation::DrawGraph), Some(apply));
    }

    /// Publish the graph, scaled so its height fills the target height.
    ///
    /// Fails before queueing when there are no nodes or the bounding box
    /// has no height.
    pub fn publish(&mut self, continuation: Option<Continuation>) -> Result<(), PsynthError> {
        let bbox = self.store.bounding_box().ok_or(PsynthError::EmptyGraph)?;
        let height = bbox.height();
        if height <= 0.0 || !height.is_finite() {
            return Err(PsynthError::DegenerateBounds);
        }
        let request = Request::new(Operation::Publish)
            .param("x", -(bbox.min_x + PUBLISH_MARGIN))
            .param("y", -(bbox.min_y + PUBLISH_MARGIN))
            .param("scale", PUBLISH_TARGET_HEIGHT / height);
        let announce = Continuation::preceded_by(
            |session: &mut GraphSession, body: &Value| {
                info!(graph = %session.name, response = %body, "graph published");
            },
            continuation,
        );
        self.enqueue(request, Some(announce));
        Ok(())
    }

    // =========================================================================
    // GRAPH-LEVEL OPERATIONS
    // =========================================================================

    /// Rename the graph locally and remotely.
    pub fn rename(&mut self, name: impl Into<String>, continuation: Option<Continuation>) {
        self.name = name.into();
        let request = Request::new(Operation::SetGraphName).param("name", &self.name);
        self.enqueue(request, continuation);
    }

    /// Ask the service for a shortest path between two nodes.
    pub fn shortest_path(
        &mut self,
        from: &str,
        to: &str,
        continuation: Option<Continuation>,
    ) -> Result<(), PsynthError> {
        for uid in [from, to] {
            if self.store.node(uid).is_none() {
                return Err(PsynthError::NodeNotFound(uid.to_string()));
            }
        }
        let request = Request::new(Operation::ShortestPath)
            .param("o_uid", from)
            .param("t_uid", to);
        self.enqueue(request, continuation);
        Ok(())
    }
}

/// Reject a batch whose keys repeat or are already stored.
fn check_batch<T: Keyed>(
    entities: &[T],
    stored: impl Fn(&str) -> bool,
) -> Result<(), PsynthError> {
    let mut seen = BTreeSet::new();
    for entity in entities {
        let key = entity.key();
        if stored(key) || !seen.insert(key) {
            return Err(PsynthError::DuplicateUid {
                kind: T::KIND,
                uid: key.to_string(),
            });
        }
    }
    Ok(())
}

fn encode(fields: &[Params]) -> Result<String, PsynthError> {
    serde_json::to_string(fields).map_err(|e| PsynthError::SerializationError(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::then;
    use crate::remote::{Response, TransportError};
    use crate::testing::{CallLog, ScriptedService};
    use serde_json::json;

    fn session_with(service: ScriptedService) -> (GraphSession, CallLog) {
        let log = service.log();
        let identity = Identity::new("ada", "k-123").with_filename("g-1");
        (GraphSession::new("test", identity, service), log)
    }

    fn session() -> (GraphSession, CallLog) {
        session_with(ScriptedService::new())
    }

    #[test]
    fn identity_tags_every_request() {
        let (mut session, log) = session();
        session
            .add_node(Node::new("A").with_uid("a"), None)
            .expect("add");

        let calls = log.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].param("user"), Some("ada"));
        assert_eq!(calls[0].param("key"), Some("k-123"));
        assert_eq!(calls[0].param("filename"), Some("g-1"));
        assert_eq!(calls[0].param("uid"), Some("a"));
    }

    #[test]
    fn identity_without_filename_omits_it() {
        let mut params = Params::new();
        Identity::new("ada", "k").tag(&mut params);
        assert!(!params.contains_key("filename"));

        let mut params = Params::new();
        Identity::new("ada", "k").with_filename("").tag(&mut params);
        assert!(!params.contains_key("filename"));
    }

    #[test]
    fn identity_debug_hides_key() {
        let rendered = format!("{:?}", Identity::new("ada", "secret"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn add_then_remove_sends_two_requests_in_order() {
        let (mut session, log) = session();
        let uid = session.add_node(Node::new("A"), None).expect("add");
        let removed = session.remove_node(uid.as_str(), None).expect("remove");

        assert!(removed.is_created());
        assert_eq!(session.store().node_count(), 0);
        assert_eq!(log.operations(), vec![Operation::NewNode, Operation::DelNode]);
        assert_eq!(log.calls()[1].param("uid"), Some(uid.as_str()));
    }

    #[test]
    fn removing_unknown_entities_fails_locally() {
        let (mut session, log) = session();
        assert_eq!(
            session.remove_node("ghost", None).map(|_| ()),
            Err(PsynthError::NodeNotFound("ghost".into()))
        );
        assert!(matches!(
            session.remove_link("ghost", None),
            Err(PsynthError::LinkNotFound(_))
        ));
        assert!(matches!(
            session.remove_detail("ghost", None),
            Err(PsynthError::DetailNotFound(_))
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn duplicate_uid_is_rejected_before_queueing() {
        let (mut session, log) = session();
        session.add_node(Node::new("A").with_uid("a"), None).expect("add");
        let again = session.add_node(Node::new("B").with_uid("a"), None);

        assert!(matches!(again, Err(PsynthError::DuplicateUid { .. })));
        assert_eq!(log.len(), 1);
        assert_eq!(session.store().node("a").map(|n| n.name.as_str()), Some("A"));
    }

    #[test]
    fn detail_position_derives_from_node_anchor() {
        let (mut session, log) = session();
        session
            .add_node(Node::new("A").with_uid("a").at(10.0, 20.0), None)
            .expect("node");

        for content in ["first", "second"] {
            session
                .attach_detail(Anchor::node("a"), Detail::new(content), None)
                .expect("detail");
        }

        let positions: Vec<_> = session
            .store()
            .details_of("a")
            .iter()
            .map(|d| (d.x, d.y))
            .collect();
        assert_eq!(positions, vec![(Some(38.0), Some(44.0)), (Some(38.0), Some(64.0))]);

        let sent = &log.calls()[1];
        assert_eq!(sent.operation, Operation::NewDetail);
        assert_eq!(sent.param("anchor_uid"), Some("a"));
        assert_eq!(sent.param("anchor_type"), Some("node"));
        assert_eq!(sent.param("x"), Some("38"));
    }

    #[test]
    fn explicit_detail_position_is_kept() {
        let (mut session, _) = session();
        session.add_node(Node::new("A").with_uid("a"), None).expect("node");
        let uid = session
            .attach_detail(Anchor::node("a"), Detail::new("pinned").at(-5.0, 7.0), None)
            .expect("detail");
        let detail = session.store().detail(uid.as_str()).expect("stored");
        assert_eq!((detail.x, detail.y), (Some(-5.0), Some(7.0)));
    }

    #[test]
    fn detail_needs_a_resolvable_anchor() {
        let (mut session, log) = session();
        assert!(matches!(
            session.add_detail(Detail::new("loose"), None),
            Err(PsynthError::UnanchoredDetail(_))
        ));
        assert!(matches!(
            session.attach_detail(Anchor::link("nope"), Detail::new("x"), None),
            Err(PsynthError::AnchorNotFound { .. })
        ));
        assert!(log.is_empty());
        assert_eq!(session.store().detail_count(), 0);
    }

    #[test]
    fn out_of_range_link_value_is_still_sent() {
        let (mut session, log) = session();
        session
            .add_link_type(LinkType::new("Default").with_max(10), None)
            .expect("type");
        session.add_node(Node::new("A").with_uid("a"), None).expect("a");
        session.add_node(Node::new("B").with_uid("b"), None).expect("b");
        session
            .add_link(Link::new("a", "b", "Default").with_value(42), None)
            .expect("link");

        assert_eq!(session.store().link_count(), 1);
        assert_eq!(log.operations().last(), Some(&Operation::NewRel));
        assert_eq!(log.calls()[3].param("value"), Some("42"));
    }

    #[test]
    fn add_nodes_sends_one_batch_request() {
        let (mut session, log) = session();
        let nodes = vec![Node::new("A").with_uid("a"), Node::new("B").with_uid("b")];
        let uids = session.add_nodes(nodes, None).expect("batch");

        assert_eq!(uids.len(), 2);
        assert!(session.store().nodes().all(Node::is_created));
        let calls = log.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, Operation::BatchNodes);

        let encoded: Vec<Params> =
            serde_json::from_str(calls[0].param("nodes").expect("nodes param")).expect("json");
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[1].get("uid").map(String::as_str), Some("b"));
    }

    #[test]
    fn batch_with_collision_stores_nothing() {
        let (mut session, log) = session();
        session.add_node(Node::new("A").with_uid("a"), None).expect("a");

        let clash = vec![Node::new("C").with_uid("c"), Node::new("A2").with_uid("a")];
        assert!(session.add_nodes(clash, None).is_err());
        let repeat = vec![Node::new("D").with_uid("d"), Node::new("D2").with_uid("d")];
        assert!(session.add_nodes(repeat, None).is_err());

        assert_eq!(session.store().node_count(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn add_links_sends_rels_param() {
        let (mut session, log) = session();
        session.add_node(Node::new("A").with_uid("a"), None).expect("a");
        session.add_node(Node::new("B").with_uid("b"), None).expect("b");
        let links = vec![
            Link::new("a", "b", "Links").with_uid("ab"),
            Link::new("b", "a", "Links").with_uid("ba"),
        ];
        session.add_links(links, None).expect("links");

        let last = log.calls().pop().expect("call");
        assert_eq!(last.operation, Operation::BatchRels);
        assert!(last.param("rels").is_some_and(|r| r.contains("\"ba\"")));
        assert_eq!(session.store().out_links("a").len(), 1);
    }

    #[test]
    fn update_pushes_current_fields() {
        let (mut session, log) = session();
        session.add_node(Node::new("A").with_uid("a"), None).expect("a");
        session
            .edit_node("a", |n| n.name = "Renamed".into(), None)
            .expect("edit");

        let last = log.calls().pop().expect("call");
        assert_eq!(last.operation, Operation::UpdateNode);
        assert_eq!(last.param("name"), Some("Renamed"));
        assert!(matches!(
            session.update_link("missing", None),
            Err(PsynthError::LinkNotFound(_))
        ));
        assert!(matches!(
            session.update_link_type("missing", None),
            Err(PsynthError::LinkTypeNotFound(_))
        ));
    }

    #[test]
    fn editing_a_uid_is_refused() {
        let (mut session, log) = session();
        session.add_node(Node::new("A").with_uid("a"), None).expect("a");

        let result = session.edit_node("a", |n| n.uid = Uid::new("b"), None);
        assert!(matches!(result, Err(PsynthError::KeyChanged { .. })));
        assert!(session.store().node("a").is_some());
        assert!(session.store().node("b").is_none());
        assert_eq!(log.operations(), vec![Operation::NewNode]);
    }

    #[test]
    fn continuation_enqueues_after_pending_work() {
        let (mut session, log) = session();
        session.batch(|s| {
            s.enqueue(
                Request::new(Operation::GetGraphName),
                then(|s, _| s.enqueue(Request::new(Operation::GetComments), None)),
            );
            s.enqueue(Request::new(Operation::GetAllPos), None);
            assert_eq!(s.queue_state(), QueueState::Held);
            assert_eq!(s.pending_requests(), 2);
        });

        assert_eq!(
            log.operations(),
            vec![Operation::GetGraphName, Operation::GetAllPos, Operation::GetComments]
        );
        assert_eq!(session.queue_state(), QueueState::Idle);
        assert_eq!(log.max_in_flight(), 1);
    }

    #[test]
    fn continuation_sees_response_body() {
        let service = ScriptedService::new()
            .respond(Operation::GetAllPos, Response::ok(json!({"count": 3})));
        let (mut session, _) = session_with(service);
        session.enqueue(
            Request::new(Operation::GetAllPos),
            then(|s, body| {
                let count = body["count"].as_i64().unwrap_or_default();
                s.rename(format!("count-{count}"), None);
            }),
        );
        assert_eq!(session.name(), "count-3");
    }

    #[test]
    fn failures_are_logged_and_draining_continues() {
        let service = ScriptedService::new()
            .respond(Operation::NewNode, Response::rejected("bad node"))
            .fail(Operation::DelNode, TransportError::Connection("reset".into()));
        let (mut session, log) = session_with(service);

        session.batch(|s| {
            s.enqueue(
                Request::new(Operation::NewNode),
                then(|s, _| s.rename("never", None)),
            );
            s.enqueue(Request::new(Operation::DelNode), None);
            s.enqueue(Request::new(Operation::GetGraphName), None);
        });

        assert_eq!(log.len(), 3);
        assert_eq!(session.name(), "test");
        let failures = session.take_failures();
        assert!(matches!(failures[0], PsynthError::Rejected { .. }));
        assert!(matches!(failures[1], PsynthError::Transport { .. }));
        assert!(session.failures().is_empty());
    }

    #[test]
    fn failure_handler_claims_only_its_own_failure() {
        let service = ScriptedService::new()
            .respond(Operation::GetHeat, Response::rejected("no heat"))
            .respond(Operation::GetChat, Response::rejected("no chat"));
        let (mut session, _) = session_with(service);

        session.batch(|s| {
            s.enqueue(Request::new(Operation::GetHeat), None);
            s.enqueue(
                Request::new(Operation::GetChat),
                Some(
                    Continuation::new(|s, _| s.rename("unreachable", None))
                        .or_else(|s, error| s.rename(format!("handled {error}"), None)),
                ),
            );
        });

        assert_eq!(session.name(), "handled getchat rejected: no chat");
        let failures = session.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            PsynthError::Rejected { operation, .. } if operation == "getheat"
        ));
    }

    #[test]
    fn draw_forwards_failure_to_caller_handler() {
        let service = ScriptedService::new()
            .fail(Operation::DrawGraph, TransportError::Connection("timed out".into()));
        let (mut session, _) = session_with(service);

        session.draw(Some(
            Continuation::new(|_, _| {}).or_else(|s, _| s.rename("draw failed", None)),
        ));

        assert_eq!(session.name(), "draw failed");
        assert!(session.failures().is_empty());
    }

    #[test]
    fn unknown_operation_name_is_never_queued() {
        let (mut session, log) = session();
        let result = session.request("dropdatabase", Params::new(), None);
        assert_eq!(
            result,
            Err(PsynthError::UnknownOperation("dropdatabase".into()))
        );
        session
            .request("getgraphname", Params::new(), None)
            .expect("allowed");
        assert_eq!(log.operations(), vec![Operation::GetGraphName]);
    }

    #[test]
    fn draw_applies_layout_then_runs_continuation() {
        let layout = json!({
            "nodes": [{"UID": "a", "X": "50", "Y": 60}, {"UID": "ghost", "X": 0, "Y": 0}],
            "details": []
        });
        let service = ScriptedService::new().respond(Operation::DrawGraph, Response::ok(layout));
        let (mut session, _) = session_with(service);
        session.add_node(Node::new("A").with_uid("a"), None).expect("a");

        session.draw(then(|s, _| {
            let x = s.store().node("a").map(|n| n.x).unwrap_or_default();
            s.rename(format!("x={x}"), None);
        }));

        assert_eq!(session.name(), "x=50");
        assert!(session.failures().is_empty());
    }

    #[test]
    fn malformed_layout_is_recorded() {
        let service = ScriptedService::new()
            .respond(Operation::DrawGraph, Response::ok(json!({"nodes": "oops"})));
        let (mut session, _) = session_with(service);
        session.draw(None);
        assert!(matches!(
            session.failures(),
            [PsynthError::MalformedResponse { .. }]
        ));
    }

    #[test]
    fn publish_offsets_and_scales_to_target_height() {
        let (mut session, log) = session();
        session.add_node(Node::new("A").at(-20.0, 0.0), None).expect("a");
        session.add_node(Node::new("B").at(100.0, 80.0), None).expect("b");
        session.publish(None).expect("publish");

        let sent = log.calls().pop().expect("call");
        assert_eq!(sent.operation, Operation::Publish);
        let number = |key: &str| -> f64 {
            sent.param(key)
                .and_then(|v| v.parse().ok())
                .expect("numeric param")
        };
        assert!((number("x") - 19.9).abs() < 1e-9);
        assert!((number("y") + 0.1).abs() < 1e-9);
        assert!((number("scale") - 13.5).abs() < 1e-9);
    }

    #[test]
    fn publish_guards_empty_and_flat_graphs() {
        let (mut session, log) = session();
        assert_eq!(session.publish(None), Err(PsynthError::EmptyGraph));

        session.add_node(Node::new("A").at(0.0, 5.0), None).expect("a");
        session.add_node(Node::new("B").at(9.0, 5.0), None).expect("b");
        assert_eq!(session.publish(None), Err(PsynthError::DegenerateBounds));

        assert!(!log.operations().contains(&Operation::Publish));
        assert_eq!(session.queue_state(), QueueState::Idle);

        // The queue still works afterwards.
        session.draw(None);
        assert_eq!(log.operations().last(), Some(&Operation::DrawGraph));
    }

    #[test]
    fn shortest_path_checks_both_ends() {
        let (mut session, log) = session();
        session.add_node(Node::new("A").with_uid("a"), None).expect("a");
        assert!(matches!(
            session.shortest_path("a", "z", None),
            Err(PsynthError::NodeNotFound(uid)) if uid == "z"
        ));
        session.add_node(Node::new("Z").with_uid("z"), None).expect("z");
        session.shortest_path("a", "z", None).expect("path");

        let sent = log.calls().pop().expect("call");
        assert_eq!(sent.operation, Operation::ShortestPath);
        assert_eq!((sent.param("o_uid"), sent.param("t_uid")), (Some("a"), Some("z")));
    }

    #[test]
    fn add_dispatches_by_entity_kind() {
        let (mut session, log) = session();
        session
            .add(Entity::LinkType(LinkType::new("Default")), None)
            .expect("type");
        session
            .add(Entity::Node(Node::new("A").with_uid("a")), None)
            .expect("node");
        assert_eq!(log.operations(), vec![Operation::NewRelType, Operation::NewNode]);
        assert!(session.store().link_type("Default").is_some_and(LinkType::is_created));
    }
}
