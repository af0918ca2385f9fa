use futures::executor::block_on;
use narwhal::geom::{Point, Vector, point, rect, vector};
use narwhal::{
    BoxMeasurer, DiagramConfig, DiagramData, DiagramEngine, DiagramState, GridLayout, NodeData,
    NodeMeasurement, NodeRecord, Padding, Renderer,
};

/// Box measurer that shifts container content down by a header.
#[derive(Default)]
struct HeaderedBoxes {
    boxes: BoxMeasurer,
}

impl Renderer for HeaderedBoxes {
    fn measure(&mut self, node: &NodeRecord) -> NodeMeasurement {
        let mut m = self.boxes.measure(node);
        if node.disclosed() {
            m.content_offset = vector(0.0, 12.0);
        }
        m
    }

    fn render(&mut self, node_id: &str) {
        self.boxes.render(node_id);
    }
}

fn nested() -> DiagramData {
    DiagramData {
        nodes: vec![
            NodeData::new("spacer"),
            NodeData::new("L1").with_children(vec![
                NodeData::new("first"),
                NodeData::new("L2").with_children(vec![
                    NodeData::new("L3").with_children(vec![NodeData::new("leaf"), NodeData::new("leaf2")]),
                ]),
            ]),
        ],
        links: Vec::new(),
        expanded: vec!["L1".into(), "L2".into(), "L3".into()],
    }
}

/// Sum of content offset, position and (disclosed) padding over the container chain.
fn summed_offset(state: &DiagramState, id: &str) -> Point {
    let mut acc = Vector::zero();
    let mut cur = state.node(id).and_then(|n| n.group_id.clone());
    while let Some(container) = cur {
        let rec = state.node(&container).unwrap();
        acc += rec.content_offset + rec.position.to_vector();
        if let Some(p) = rec.container_padding() {
            acc += vector(p.left, p.top);
        }
        cur = rec.group_id.clone();
    }
    acc.to_point()
}

#[test]
fn global_offsets_add_up_along_the_container_chain() {
    let engine = DiagramEngine::new(
        DiagramConfig {
            container_padding: Padding::new(6.0, 3.0, 2.0, 5.0),
            ..DiagramConfig::default()
        },
        HeaderedBoxes::default(),
        GridLayout::default(),
    );
    block_on(engine.load(nested())).unwrap();
    let state = engine.state();

    for id in ["L1", "first", "L2", "L3", "leaf", "leaf2"] {
        assert_eq!(state.global_offset(id), summed_offset(&state, id), "offset of {id}");
    }
    let leaf = state.global_offset("leaf");
    assert!(leaf.x > 0.0 && leaf.y > 0.0);
    // Three disclosed levels, each adding its padding and header.
    assert!(leaf.y >= 3.0 * (6.0 + 12.0));
    assert_eq!(
        state.relative_position("leaf", Some("L2")),
        Some((summed_offset(&state, "leaf") - summed_offset(&state, "L3")).to_point())
    );
}

#[test]
fn padding_set_by_a_layout_is_committed() {
    let engine = DiagramEngine::new(
        DiagramConfig {
            layout_attributes: serde_json::json!({ "containerPadding": 25.0 })
                .as_object()
                .cloned()
                .unwrap(),
            ..DiagramConfig::default()
        },
        BoxMeasurer::default(),
        GridLayout::default(),
    );
    block_on(engine.load(nested())).unwrap();
    let state = engine.state();
    assert_eq!(
        state.node("L3").unwrap().container_padding(),
        Some(Padding::uniform(25.0))
    );
    // leaf sits at the origin of L3's children space.
    let l3 = state.global_bounds("L3").unwrap();
    let leaf = state.global_bounds("leaf").unwrap();
    assert_eq!(leaf.origin, l3.origin + vector(25.0, 25.0));
    assert_eq!(leaf.size, rect(0.0, 0.0, 80.0, 40.0).size);
    assert_eq!(state.space_origin(Some("L3")), point(l3.origin.x + 25.0, l3.origin.y + 25.0));
}
