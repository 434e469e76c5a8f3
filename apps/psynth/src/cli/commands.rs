//! # CLI Command Implementations

use psynth::{ClientConfig, HttpGraphService, SessionHandle, run_blocking};
use psynth_core::{
    Anchor, Detail, GraphSession, Link, LinkType, Node, Params, PsynthError, create_graph,
    list_graphs, load_graph,
};
use serde_json::{Value, json};
use std::f64::consts::TAU;

/// Radius of the demo ring.
const DEMO_RING_RADIUS: f64 = 200.0;

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Open a session on an existing graph.
async fn open_existing(config: ClientConfig, filename: String) -> Result<SessionHandle, PsynthError> {
    let identity = config.identity()?;
    SessionHandle::open(move || {
        let service = HttpGraphService::new(&config)?;
        load_graph(&filename, identity, service)
    })
    .await
}

/// Print and clear any failures the session recorded.
async fn report_failures(handle: &SessionHandle) -> Result<usize, PsynthError> {
    let failures = handle.with(GraphSession::take_failures).await?;
    for failure in &failures {
        tracing::warn!("{}", failure);
    }
    Ok(failures.len())
}

fn summary(session: &GraphSession) -> Value {
    let store = session.store();
    let bbox = store.bounding_box().map(|b| {
        json!({
            "min_x": b.min_x,
            "max_x": b.max_x,
            "min_y": b.min_y,
            "max_y": b.max_y,
            "width": b.width(),
            "height": b.height(),
        })
    });
    json!({
        "name": session.name(),
        "filename": session.filename(),
        "nodes": store.node_count(),
        "links": store.link_count(),
        "link_types": store.link_type_count(),
        "details": store.detail_count(),
        "bounding_box": bbox,
    })
}

fn print_summary(value: &Value, json_mode: bool) {
    if json_mode {
        print_json(value);
        return;
    }
    println!("Psynth Graph");
    println!("============");
    println!("Name:       {}", value["name"].as_str().unwrap_or_default());
    println!("Filename:   {}", value["filename"].as_str().unwrap_or_default());
    println!();
    println!("Nodes:      {}", value["nodes"]);
    println!("Links:      {}", value["links"]);
    println!("Link types: {}", value["link_types"]);
    println!("Details:    {}", value["details"]);
    match value["bounding_box"].as_object() {
        Some(b) => println!(
            "Bounds:     x {}..{}, y {}..{}",
            b["min_x"], b["max_x"], b["min_y"], b["max_y"]
        ),
        None => println!("Bounds:     (no nodes)"),
    }
}

// =============================================================================
// CREATE / LIST
// =============================================================================

pub async fn cmd_create(
    config: ClientConfig,
    json_mode: bool,
    name: String,
) -> Result<(), PsynthError> {
    let identity = config.identity()?;
    let handle = SessionHandle::open(move || {
        let service = HttpGraphService::new(&config)?;
        create_graph(&name, identity, service)
    })
    .await?;
    let session = handle.close().await?;

    if json_mode {
        print_json(&json!({"name": session.name(), "filename": session.filename()}));
    } else {
        println!(
            "Created '{}' as {}",
            session.name(),
            session.filename().unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn cmd_list(config: ClientConfig, json_mode: bool) -> Result<(), PsynthError> {
    let identity = config.identity()?;
    let graphs = run_blocking(move || {
        let mut service = HttpGraphService::new(&config)?;
        list_graphs(&identity, &mut service)
    })
    .await??;

    match (&graphs, json_mode) {
        (Value::Array(items), false) => {
            for item in items {
                match item {
                    Value::String(s) => println!("{s}"),
                    other => println!("{other}"),
                }
            }
        }
        _ => print_json(&graphs),
    }
    Ok(())
}

// =============================================================================
// SHOW / DRAW / PUBLISH
// =============================================================================

pub async fn cmd_show(
    config: ClientConfig,
    json_mode: bool,
    filename: String,
) -> Result<(), PsynthError> {
    let handle = open_existing(config, filename).await?;
    let value = handle.with(|s| summary(s)).await?;
    handle.close().await?;
    print_summary(&value, json_mode);
    Ok(())
}

pub async fn cmd_draw(
    config: ClientConfig,
    json_mode: bool,
    filename: String,
) -> Result<(), PsynthError> {
    let handle = open_existing(config, filename).await?;
    handle
        .call(|s, reply| {
            s.draw(reply);
            Ok(())
        })
        .await?;
    report_failures(&handle).await?;
    let value = handle.with(|s| summary(s)).await?;
    handle.close().await?;
    print_summary(&value, json_mode);
    Ok(())
}

pub async fn cmd_publish(
    config: ClientConfig,
    json_mode: bool,
    filename: String,
) -> Result<(), PsynthError> {
    let handle = open_existing(config, filename).await?;
    let response = handle.call(|s, reply| s.publish(reply)).await;
    handle.close().await?;
    let response = response?;

    if json_mode {
        print_json(&response);
    } else {
        println!("Published: {response}");
    }
    Ok(())
}

// =============================================================================
// REQUEST
// =============================================================================

pub async fn cmd_request(
    config: ClientConfig,
    json_mode: bool,
    filename: String,
    op: String,
    params: Vec<(String, String)>,
) -> Result<(), PsynthError> {
    let params: Params = params.into_iter().collect();
    let handle = open_existing(config, filename).await?;
    let response = handle
        .call(move |s, reply| s.request(&op, params, reply))
        .await;
    handle.close().await?;
    let response = response?;

    if json_mode {
        print_json(&response);
    } else {
        println!("{response}");
    }
    Ok(())
}

// =============================================================================
// DEMO
// =============================================================================

/// Populate a session with a ring of `count` nodes.
pub fn build_ring(session: &mut GraphSession, count: usize) -> Result<(), PsynthError> {
    let link_type = LinkType::default();
    let type_name = link_type.name.clone();
    session.add_link_type(link_type, None)?;

    let mut uids = Vec::with_capacity(count);
    for i in 0..count {
        let angle = TAU * i as f64 / count.max(1) as f64;
        let node = Node::new(format!("Node {}", i + 1))
            .at(DEMO_RING_RADIUS * angle.cos(), DEMO_RING_RADIUS * angle.sin());
        uids.push(session.add_node(node, None)?);
    }

    if count > 1 {
        for (i, origin) in uids.iter().enumerate() {
            let terminus = &uids[(i + 1) % count];
            session.add_link(Link::new(origin.clone(), terminus.clone(), &type_name), None)?;
        }
    }

    for (i, uid) in uids.iter().enumerate() {
        let detail = Detail::new(format!("Comment on node {}", i + 1));
        session.attach_detail(Anchor::node(uid.clone()), detail, None)?;
    }
    Ok(())
}

pub async fn cmd_demo(
    config: ClientConfig,
    json_mode: bool,
    name: String,
    nodes: usize,
) -> Result<(), PsynthError> {
    let identity = config.identity()?;
    let handle = SessionHandle::open(move || {
        let service = HttpGraphService::new(&config)?;
        create_graph(&name, identity, service)
    })
    .await?;

    handle.with(move |s| build_ring(s, nodes)).await??;
    handle
        .call(|s, reply| {
            s.draw(reply);
            Ok(())
        })
        .await?;
    let failed = report_failures(&handle).await?;
    let value = handle.with(|s| summary(s)).await?;
    handle.close().await?;

    print_summary(&value, json_mode);
    if failed > 0 && !json_mode {
        println!();
        println!("{failed} request(s) failed; see the log above.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use psynth_core::testing::ScriptedService;
    use psynth_core::{Identity, Operation};

    #[test]
    fn ring_has_one_link_and_one_detail_per_node() {
        let service = ScriptedService::new();
        let log = service.log();
        let mut session = GraphSession::new("ring", Identity::new("u", "k"), service);

        build_ring(&mut session, 5).expect("ring");

        let store = session.store();
        assert_eq!(store.node_count(), 5);
        assert_eq!(store.link_count(), 5);
        assert_eq!(store.detail_count(), 5);
        for node in store.nodes() {
            assert_eq!(store.out_links(node.uid.as_str()).len(), 1);
            assert_eq!(store.in_links(node.uid.as_str()).len(), 1);
        }
        assert_eq!(log.operations()[0], Operation::NewRelType);
        assert!(session.failures().is_empty());
    }

    #[test]
    fn single_node_ring_has_no_links() {
        let mut session = GraphSession::new("one", Identity::new("u", "k"), ScriptedService::new());
        build_ring(&mut session, 1).expect("ring");
        assert_eq!(session.store().link_count(), 0);
        assert_eq!(session.store().detail_count(), 1);
    }

    #[test]
    fn summary_reports_counts_and_bounds() {
        let mut session = GraphSession::new("s", Identity::new("u", "k"), ScriptedService::new());
        build_ring(&mut session, 4).expect("ring");
        let value = summary(&session);
        assert_eq!(value["nodes"], 4);
        assert_eq!(value["name"], "s");
        let height = value["bounding_box"]["height"].as_f64().expect("height");
        assert!((height - 2.0 * DEMO_RING_RADIUS).abs() < 1e-9);
    }
}
