//! CGML semantic parser.
//!
//! Walks the generic [`crate::xml::XmlNode`] tree produced by [`crate::xml`]
//! and performs the "meaning assignment" pass: generic `<node>`/`<edge>`
//! elements become states, pseudo-vertices, notes and components depending
//! on which `data` keys they carry. The three-pass structure mirrors
//! `harel`'s own state-building functions (`parse_state`, `parse_parallel`):
//! walk children, dispatch on tag/key, recurse into nested graphs.

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

use crate::model::{
    ChoiceVertex, ComponentDecl, FinalVertex, InitialVertex, Meta, Model, Note, Point, Rect,
    ShallowHistoryVertex, State, StateMachine, TerminateVertex, Transition, UnknownVertex,
};
use crate::xml::{self, XmlError, XmlNode};

/// Errors raised while turning the XML tree into a typed [`Model`].
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    MalformedXml(#[from] XmlError),
    #[error("top-level graph is not a state machine (missing dStateMachine marker)")]
    NotAStateMachine,
    #[error("state machine meta is missing required key: {0}")]
    MissingMeta(String),
    #[error("state machine has more than one CGML_META note")]
    DuplicateMeta,
    #[error("component declaration on node {0} is missing id or type")]
    ComponentMissingIdOrType(String),
}

/// Parses CGML document text into the typed [`Model`].
pub fn parse(text: &str) -> Result<Model, ModelError> {
    let root = xml::read(text)?;
    let mut machines = Vec::new();
    for graph in root.children_named("graph") {
        if is_state_machine_graph(graph) {
            machines.push(parse_state_machine(graph)?);
        }
    }
    if machines.is_empty() {
        return Err(ModelError::NotAStateMachine);
    }
    Ok(Model { machines })
}

fn is_state_machine_graph(graph: &XmlNode) -> bool {
    graph
        .children_named("data")
        .any(|d| d.attr_str("key").as_deref() == Some("dStateMachine"))
}

struct ProvisionalNode<'a> {
    id: String,
    parent_id: Option<String>,
    data: Vec<&'a XmlNode>,
}

struct ProvisionalEdge<'a> {
    id: String,
    source: String,
    target: String,
    data: Vec<&'a XmlNode>,
}

/// Pass 1 — gather vertices and edges, recursing through nested `<graph>`
/// elements that hang off a `<node>` (a composite state's substates).
fn gather<'a>(
    graph: &'a XmlNode,
    parent: Option<String>,
    nodes: &mut Vec<ProvisionalNode<'a>>,
    edges: &mut Vec<ProvisionalEdge<'a>>,
) {
    for child in &graph.children {
        match child.tag.as_str() {
            "node" => {
                let id = child.attr_str("id").unwrap_or_default().into_owned();
                let data: Vec<&XmlNode> = child.children_named("data").collect();
                nodes.push(ProvisionalNode { id: id.clone(), parent_id: parent.clone(), data });
                if let Some(sub_graph) = child.child_named("graph") {
                    gather(sub_graph, Some(id), nodes, edges);
                }
            }
            "edge" => {
                let id = child
                    .attr_str("id")
                    .map(Cow::into_owned)
                    .unwrap_or_else(|| format!("__edge{}", edges.len()));
                let source = child.attr_str("source").unwrap_or_default().into_owned();
                let target = child.attr_str("target").unwrap_or_default().into_owned();
                let data: Vec<&XmlNode> = child.children_named("data").collect();
                edges.push(ProvisionalEdge { id, source, target, data });
            }
            _ => {}
        }
    }
}

enum NodeKind {
    Meta(Meta),
    Component(ComponentDecl),
    Note(Note),
    Initial(InitialVertex),
    Choice(ChoiceVertex),
    Final(FinalVertex),
    Terminate(TerminateVertex),
    ShallowHistory(ShallowHistoryVertex),
    Unknown(UnknownVertex),
    State(State),
}

/// Pass 2 — classify a provisional node by inspecting its `data` keys.
fn classify(np: &ProvisionalNode) -> Result<NodeKind, ModelError> {
    let mut name: Option<String> = None;
    let mut data_block: Option<String> = None;
    let mut point: Option<Point> = None;
    let mut rect: Option<Rect> = None;
    let mut vertex_kind: Option<String> = None;
    let mut note_kind: Option<String> = None;
    let mut color: Option<String> = None;

    for d in &np.data {
        let key = d.attr_str("key").unwrap_or_default().into_owned();
        match key.as_str() {
            "dName" => name = d.text_trimmed(),
            "dData" => data_block = d.text_trimmed(),
            "dGeometry" => {
                if let Some(pt) = d.child_named("point") {
                    point = Some(parse_point(pt));
                }
                if let Some(r) = d.child_named("rect") {
                    rect = Some(parse_rect(r));
                }
            }
            "dVertex" => vertex_kind = d.text_trimmed(),
            "dNote" => note_kind = Some(d.text_trimmed().unwrap_or_else(|| "informal".to_string())),
            "dColor" => color = d.text_trimmed(),
            _ => {}
        }
    }

    if note_kind.is_some() {
        let formal = note_kind.as_deref() == Some("formal");
        if formal && name.as_deref() == Some("CGML_META") {
            let mut values = HashMap::new();
            for (k, v) in parse_kv_block(data_block.as_deref().unwrap_or_default()) {
                values.insert(k, v);
            }
            return Ok(NodeKind::Meta(Meta { id: np.id.clone(), values }));
        }
        if formal && name.as_deref() == Some("CGML_COMPONENT") {
            let mut parameters: HashMap<String, String> = parse_kv_block(
                data_block.as_deref().unwrap_or_default(),
            )
            .into_iter()
            .collect();
            let id = parameters.remove("id");
            let type_name = parameters.remove("type");
            let (id, type_name) = match (id, type_name) {
                (Some(i), Some(t)) => (i, t),
                _ => return Err(ModelError::ComponentMissingIdOrType(np.id.clone())),
            };
            return Ok(NodeKind::Component(ComponentDecl { id, type_name, parameters }));
        }
        return Ok(NodeKind::Note(Note {
            id: np.id.clone(),
            parent_id: np.parent_id.clone(),
            name,
            text: data_block.unwrap_or_default(),
        }));
    }

    if let Some(subtype) = vertex_kind {
        return Ok(match subtype.as_str() {
            "initial" => NodeKind::Initial(InitialVertex { id: np.id.clone(), parent_id: np.parent_id.clone() }),
            "choice" => NodeKind::Choice(ChoiceVertex { id: np.id.clone(), parent_id: np.parent_id.clone() }),
            "final" => NodeKind::Final(FinalVertex { id: np.id.clone(), parent_id: np.parent_id.clone() }),
            "terminate" => {
                NodeKind::Terminate(TerminateVertex { id: np.id.clone(), parent_id: np.parent_id.clone() })
            }
            "shallowHistory" => NodeKind::ShallowHistory(ShallowHistoryVertex {
                id: np.id.clone(),
                parent_id: np.parent_id.clone(),
            }),
            other => NodeKind::Unknown(UnknownVertex {
                id: np.id.clone(),
                parent_id: np.parent_id.clone(),
                subtype: other.to_string(),
            }),
        });
    }

    Ok(NodeKind::State(State {
        id: np.id.clone(),
        name,
        actions_block: data_block.unwrap_or_default(),
        parent_id: np.parent_id.clone(),
        bounds: rect,
        color,
    }))
}

fn parse_point(node: &XmlNode) -> Point {
    Point { x: attr_f64(node, "x"), y: attr_f64(node, "y") }
}

fn parse_rect(node: &XmlNode) -> Rect {
    Rect {
        x: attr_f64(node, "x"),
        y: attr_f64(node, "y"),
        width: attr_f64(node, "width"),
        height: attr_f64(node, "height"),
    }
}

fn attr_f64(node: &XmlNode, name: &str) -> f64 {
    node.attr_str(name).and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0)
}

/// Note content grammar: `key/value` pairs, one per paragraph, paragraphs
/// separated by a blank line.
fn parse_kv_block(text: &str) -> Vec<(String, String)> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| match block.split_once('/') {
            Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
            None => (block.trim().to_string(), String::new()),
        })
        .collect()
}

/// Pass 3 — wires edges into [`Transition`]s, dropping component-anchor
/// edges whose source is the meta note.
fn parse_state_machine(graph: &XmlNode) -> Result<StateMachine, ModelError> {
    let mut provisional_nodes = Vec::new();
    let mut provisional_edges = Vec::new();
    gather(graph, None, &mut provisional_nodes, &mut provisional_edges);

    let mut sm = StateMachine::default();
    let mut meta: Option<Meta> = None;

    for np in &provisional_nodes {
        match classify(np)? {
            NodeKind::Meta(m) => {
                if meta.is_some() {
                    return Err(ModelError::DuplicateMeta);
                }
                meta = Some(m);
            }
            NodeKind::Component(c) => {
                sm.components.insert(c.id.clone(), c);
            }
            NodeKind::Note(n) => sm.notes.push(n),
            NodeKind::Initial(v) => {
                sm.initials.insert(v.id.clone(), v);
            }
            NodeKind::Choice(v) => {
                sm.choices.insert(v.id.clone(), v);
            }
            NodeKind::Final(v) => {
                sm.finals.insert(v.id.clone(), v);
            }
            NodeKind::Terminate(v) => {
                sm.terminates.insert(v.id.clone(), v);
            }
            NodeKind::ShallowHistory(v) => {
                sm.shallow_history.insert(v.id.clone(), v);
            }
            NodeKind::Unknown(v) => {
                sm.unknown_vertices.insert(v.id.clone(), v);
            }
            NodeKind::State(s) => {
                sm.states.insert(s.id.clone(), s);
            }
        }
    }

    let meta = meta.ok_or_else(|| ModelError::MissingMeta("platform".to_string()))?;
    if !meta.values.contains_key("platform") {
        return Err(ModelError::MissingMeta("platform".to_string()));
    }
    if !meta.values.contains_key("standardVersion") {
        return Err(ModelError::MissingMeta("standardVersion".to_string()));
    }

    for (i, ep) in provisional_edges.iter().enumerate() {
        if ep.source == meta.id {
            continue;
        }
        let trigger_block = find_data(&ep.data, "dData").and_then(XmlNode::text_trimmed).unwrap_or_default();
        let waypoints = find_data(&ep.data, "dGeometry")
            .map(|d| d.children_named("point").map(parse_point).collect())
            .unwrap_or_default();
        let label_position = find_data(&ep.data, "dLabelGeometry").and_then(|d| d.child_named("point")).map(parse_point);
        let color = find_data(&ep.data, "dColor").and_then(XmlNode::text_trimmed);

        sm.transitions.insert(
            ep.id.clone(),
            Transition {
                id: ep.id.clone(),
                source_id: ep.source.clone(),
                target_id: ep.target.clone(),
                trigger_block,
                waypoints,
                label_position,
                color,
                seq: i,
            },
        );
    }

    sm.platform = meta.values.get("platform").cloned().unwrap_or_default();
    sm.standard_version = meta.values.get("standardVersion").cloned().unwrap_or_default();
    sm.name = meta.values.get("name").cloned();
    sm.meta = meta;

    Ok(sm)
}

fn find_data<'a>(data: &[&'a XmlNode], key: &str) -> Option<&'a XmlNode> {
    data.iter().find(|d| d.attr_str("key").as_deref() == Some(key)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(graph_body: &str) -> String {
        format!(
            r#"<graphml>
                <graph>
                    <data key="dStateMachine"/>
                    {graph_body}
                </graph>
            </graphml>"#
        )
    }

    #[test]
    fn requires_state_machine_marker() {
        let xml = "<graphml><graph></graph></graphml>";
        assert!(matches!(parse(xml), Err(ModelError::NotAStateMachine)));
    }

    #[test]
    fn requires_meta_with_platform_and_version() {
        let xml = wrap(r#"<node id="a"><data key="dName">A</data></node>"#);
        assert!(matches!(parse(&xml), Err(ModelError::MissingMeta(_))));
    }

    #[test]
    fn parses_meta_state_and_transition() {
        let xml = wrap(
            r#"
            <node id="meta0">
                <data key="dNote">formal</data>
                <data key="dName">CGML_META</data>
                <data key="dData">platform/junior-reader

standardVersion/1.0</data>
            </node>
            <node id="A"><data key="dName">A</data></node>
            <node id="B"><data key="dName">B</data></node>
            <edge id="e1" source="A" target="B">
                <data key="dData">toggle /</data>
            </edge>
            "#,
        );
        let model = parse(&xml).unwrap();
        assert_eq!(model.machines.len(), 1);
        let sm = &model.machines[0];
        assert_eq!(sm.platform, "junior-reader");
        assert_eq!(sm.standard_version, "1.0");
        assert_eq!(sm.states.len(), 2);
        let transition = sm.transitions.get("e1").unwrap();
        assert_eq!(transition.source_id, "A");
        assert_eq!(transition.target_id, "B");
    }

    #[test]
    fn duplicate_meta_is_rejected() {
        let meta = |id: &str| {
            format!(
                r#"<node id="{id}">
                    <data key="dNote">formal</data>
                    <data key="dName">CGML_META</data>
                    <data key="dData">platform/p

standardVersion/1.0</data>
                </node>"#
            )
        };
        let xml = wrap(&format!("{}{}", meta("m0"), meta("m1")));
        assert!(matches!(parse(&xml), Err(ModelError::DuplicateMeta)));
    }

    #[test]
    fn component_declarations_require_id_and_type() {
        let xml = wrap(
            r#"
            <node id="meta0">
                <data key="dNote">formal</data>
                <data key="dName">CGML_META</data>
                <data key="dData">platform/p

standardVersion/1.0</data>
            </node>
            <node id="comp0">
                <data key="dNote">formal</data>
                <data key="dName">CGML_COMPONENT</data>
                <data key="dData">type/Counter</data>
            </node>
            "#,
        );
        assert!(matches!(parse(&xml), Err(ModelError::ComponentMissingIdOrType(_))));
    }

    #[test]
    fn component_anchor_transitions_are_discarded() {
        let xml = wrap(
            r#"
            <node id="meta0">
                <data key="dNote">formal</data>
                <data key="dName">CGML_META</data>
                <data key="dData">platform/p

standardVersion/1.0</data>
            </node>
            <node id="comp0">
                <data key="dNote">formal</data>
                <data key="dName">CGML_COMPONENT</data>
                <data key="dData">id/cnt

type/Counter</data>
            </node>
            <edge id="anchor" source="meta0" target="comp0"/>
            "#,
        );
        let model = parse(&xml).unwrap();
        assert!(model.machines[0].transitions.is_empty());
        assert!(model.machines[0].components.contains_key("cnt"));
    }

    #[test]
    fn unknown_vertex_subtypes_are_retained_without_failing() {
        let xml = wrap(
            r#"
            <node id="meta0">
                <data key="dNote">formal</data>
                <data key="dName">CGML_META</data>
                <data key="dData">platform/p

standardVersion/1.0</data>
            </node>
            <node id="v0"><data key="dVertex">somethingExotic</data></node>
            "#,
        );
        let model = parse(&xml).unwrap();
        let v = model.machines[0].unknown_vertices.get("v0").unwrap();
        assert_eq!(v.subtype, "somethingExotic");
    }
}
