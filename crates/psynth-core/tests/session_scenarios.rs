//! End-to-end session scenarios against a scripted service.

use psynth_core::testing::ScriptedService;
use psynth_core::{
    Anchor, Detail, GraphSession, Identity, Link, LinkType, Node, Operation, PsynthError,
    QueueState, Request, Response, create_graph, then,
};
use serde_json::json;

fn fresh_session() -> (GraphSession, psynth_core::testing::CallLog) {
    let service = ScriptedService::new()
        .respond(Operation::CreateMap, Response::ok(json!({"filename": "f-1"})));
    let log = service.log();
    let session = create_graph("scenario", Identity::new("ada", "k"), service).expect("create");
    (session, log)
}

#[test]
fn three_nodes_one_link() {
    let (mut session, log) = fresh_session();

    let n1 = session
        .add_node(Node::new("one").at(0.0, 0.0), None)
        .expect("n1");
    let n2 = session
        .add_node(Node::new("two").at(120.0, 40.0), None)
        .expect("n2");
    session
        .add_node(Node::new("three").at(-30.0, 90.0), None)
        .expect("n3");
    session
        .add_link_type(LinkType::new("Default").with_max(10), None)
        .expect("type");
    let link = session
        .add_link(
            Link::new(n1.clone(), n2.clone(), "Default").with_value(5),
            None,
        )
        .expect("link");

    let store = session.store();
    let out = store.out_links(n1.as_str());
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].uid, link);

    let neighbors: Vec<_> = store
        .all_neighbors(n1.as_str())
        .into_iter()
        .map(|n| n.map(|n| n.uid.clone()))
        .collect();
    assert_eq!(neighbors, vec![Some(n2.clone())]);

    let bbox = store.bounding_box().expect("bbox");
    assert_eq!((bbox.min_x, bbox.max_x), (-30.0, 120.0));
    assert_eq!((bbox.min_y, bbox.max_y), (0.0, 90.0));

    assert_eq!(
        log.operations(),
        vec![
            Operation::CreateMap,
            Operation::NewNode,
            Operation::NewNode,
            Operation::NewNode,
            Operation::NewRelType,
            Operation::NewRel,
        ]
    );
    assert!(
        log.calls()[1..]
            .iter()
            .all(|c| c.param("filename") == Some("f-1"))
    );
}

#[test]
fn follow_up_runs_after_already_queued_request() {
    let (mut session, log) = fresh_session();

    session.batch(|s| {
        // Q1, whose continuation enqueues Q2.
        s.enqueue(
            Request::new(Operation::GetGraphName),
            then(|s, _| s.enqueue(Request::new(Operation::GetHeat), None)),
        );
        // Q3, queued before Q1 has been answered.
        s.enqueue(Request::new(Operation::GetAllPos), None);
    });

    assert_eq!(
        log.operations()[1..],
        [
            Operation::GetGraphName,
            Operation::GetAllPos,
            Operation::GetHeat
        ]
    );
    assert_eq!(session.queue_state(), QueueState::Idle);
}

#[test]
fn publish_with_zero_nodes_is_guarded() {
    let (mut session, log) = fresh_session();

    assert_eq!(session.publish(None), Err(PsynthError::EmptyGraph));
    assert_eq!(session.queue_state(), QueueState::Idle);
    assert_eq!(log.len(), 1);

    session.add_node(Node::new("solo"), None).expect("node");
    session.draw(None);
    assert_eq!(
        log.operations()[1..],
        [Operation::NewNode, Operation::DrawGraph]
    );
}

#[test]
fn dangling_references_surface_as_absent() {
    let (mut session, _) = fresh_session();
    let a = session.add_node(Node::new("a"), None).expect("a");
    let b = session.add_node(Node::new("b"), None).expect("b");
    let link = session
        .add_link(Link::new(a.clone(), b.clone(), "Links"), None)
        .expect("link");
    session
        .attach_detail(Anchor::link(link.clone()), Detail::new("on the link"), None)
        .expect("detail");

    session.remove_node(b.as_str(), None).expect("remove");

    let store = session.store();
    let link = store.link(link.as_str()).expect("link kept");
    assert!(store.terminus(link).is_none());
    assert!(store.center(link).is_none());
    assert_eq!(store.out_neighbors(a.as_str()), vec![None]);
    assert_eq!(store.details_of(link.uid.as_str()).len(), 1);
}
