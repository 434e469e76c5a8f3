//! # Bootstrap
//!
//! Entry points that talk to the service before a session exists: creating
//! a graph, loading one, and listing what the user owns.
//!
//! These calls are synchronous and bypass the request queue; a failure here
//! means there is no session to record it in, so it is returned directly.

use crate::formats::GraphSnapshot;
use crate::operation::{Operation, Request};
use crate::remote::{self, RemoteGraphService};
use crate::session::{GraphSession, Identity};
use crate::PsynthError;
use serde_json::Value;
use tracing::info;

/// Create an empty remote graph and bind a session to it.
///
/// The server assigns the graph's `filename`; it is attached to every
/// request the session sends afterwards.
pub fn create_graph<S>(
    name: &str,
    identity: Identity,
    mut service: S,
) -> Result<GraphSession, PsynthError>
where
    S: RemoteGraphService + 'static,
{
    let identity = Identity {
        filename: None,
        ..identity
    };
    let request = Request::new(Operation::CreateMap).param("name", name);
    let body = call(&mut service, &identity, request)?;
    let filename = body
        .get("filename")
        .and_then(Value::as_str)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| PsynthError::MalformedResponse {
            operation: Operation::CreateMap.to_string(),
            message: format!("no filename in {body}"),
        })?
        .to_string();

    info!(graph = name, %filename, "graph created");
    Ok(GraphSession::new(
        name,
        identity.with_filename(filename),
        service,
    ))
}

/// Fetch a whole remote graph and bind a session to a restored store.
///
/// Every restored entity is flagged as already created.
pub fn load_graph<S>(
    filename: &str,
    identity: Identity,
    mut service: S,
) -> Result<GraphSession, PsynthError>
where
    S: RemoteGraphService + 'static,
{
    let identity = identity.with_filename(filename);
    let body = call(&mut service, &identity, Request::new(Operation::GetWholeGraph))?;
    let snapshot =
        GraphSnapshot::from_value(&body).map_err(|e| PsynthError::MalformedResponse {
            operation: Operation::GetWholeGraph.to_string(),
            message: e.to_string(),
        })?;
    let name = snapshot.name.clone();
    let store = snapshot.restore()?;

    info!(
        graph = %name,
        filename,
        nodes = store.node_count(),
        links = store.link_count(),
        link_types = store.link_type_count(),
        details = store.detail_count(),
        "graph loaded"
    );
    Ok(GraphSession::with_store(
        name,
        identity,
        Box::new(service),
        store,
    ))
}

/// List the graphs the user owns, as the service reports them.
pub fn list_graphs<S>(identity: &Identity, service: &mut S) -> Result<Value, PsynthError>
where
    S: RemoteGraphService + ?Sized,
{
    call(service, identity, Request::new(Operation::GetFileList))
}

fn call<S>(service: &mut S, identity: &Identity, request: Request) -> Result<Value, PsynthError>
where
    S: RemoteGraphService + ?Sized,
{
    let Request {
        operation,
        mut params,
    } = request;
    identity.tag(&mut params);
    remote::settle(operation, service.execute(operation, &params))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Response;
    use crate::testing::ScriptedService;
    use serde_json::json;

    fn identity() -> Identity {
        Identity::new("ada", "k-123")
    }

    #[test]
    fn create_graph_adopts_server_filename() {
        let service = ScriptedService::new()
            .respond(Operation::CreateMap, Response::ok(json!({"filename": "g-42"})));
        let log = service.log();

        let session = create_graph("demo", identity(), service).expect("create");
        assert_eq!(session.name(), "demo");
        assert_eq!(session.filename(), Some("g-42"));

        let calls = log.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, Operation::CreateMap);
        assert_eq!(calls[0].params.get("name").map(String::as_str), Some("demo"));
        assert_eq!(calls[0].params.get("user").map(String::as_str), Some("ada"));
        assert!(!calls[0].params.contains_key("filename"));
    }

    #[test]
    fn create_graph_without_filename_is_malformed() {
        let service = ScriptedService::new()
            .respond(Operation::CreateMap, Response::ok(json!({"ok": true})));
        let result = create_graph("demo", identity(), service);
        assert!(matches!(
            result,
            Err(PsynthError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn create_graph_rejection_is_returned() {
        let service = ScriptedService::new()
            .respond(Operation::CreateMap, Response::rejected("bad key"));
        let result = create_graph("demo", identity(), service);
        assert!(matches!(result, Err(PsynthError::Rejected { .. })));
    }

    #[test]
    fn load_graph_restores_entities_as_created() {
        let body = json!({
            "name": "loaded",
            "rel_types": [
                {"NAME": "Links", "ICON": "i", "TILE": "t", "COLOR": "dynamic", "MAX": "10", "SYNC": true}
            ],
            "nodes": [
                {"UID": "a", "NAME": "A", "X": "1.5", "Y": 2, "SHAPE": 6, "RADIUS": 24, "COLOR": "dynamic", "PICTURE": "na"},
                {"UID": "b", "NAME": "B", "X": 10, "Y": 20, "SHAPE": "0", "RADIUS": "30", "COLOR": "#ff0000", "PICTURE": "na"}
            ],
            "rels": [
                {"UID": "ab", "NAME": "Link", "TYPE": "Links", "VALUE": "3", "ORIGIN": "a", "TERMINUS": "b"}
            ],
            "details": [
                {"UID": "d", "ANCHOR_TYPE": "node", "ANCHOR_UID": "a", "NAME": " ", "TYPE": "comment", "CONTENT": "hi", "X": 5, "Y": 6}
            ]
        });
        let service = ScriptedService::new()
            .respond(Operation::GetWholeGraph, Response::ok(body));
        let log = service.log();

        let session = load_graph("g-7", identity(), service).expect("load");
        assert_eq!(session.name(), "loaded");
        assert_eq!(session.filename(), Some("g-7"));

        let store = session.store();
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.link_count(), 1);
        assert_eq!(store.detail_count(), 1);
        let a = store.node("a").expect("node a");
        assert!(a.is_created());
        assert!((a.x - 1.5).abs() < f64::EPSILON);
        assert_eq!(store.link("ab").map(|l| l.value), Some(3));

        let calls = log.calls();
        assert_eq!(calls[0].operation, Operation::GetWholeGraph);
        assert_eq!(calls[0].params.get("filename").map(String::as_str), Some("g-7"));
    }

    #[test]
    fn list_graphs_returns_raw_body() {
        let mut service = ScriptedService::new()
            .respond(Operation::GetFileList, Response::ok(json!(["g-1", "g-2"])));
        let listed = list_graphs(&identity(), &mut service).expect("list");
        assert_eq!(listed, json!(["g-1", "g-2"]));
    }
}
