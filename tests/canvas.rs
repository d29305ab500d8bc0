use egui::{Pos2, Vec2};
use schema_loom::canvas::interaction::{InteractionMode, Tool, MAX_ZOOM, MIN_ZOOM};
use schema_loom::canvas::layout::{self, initial_position, relax, LayoutNode, SimulationParams};
use schema_loom::canvas::overview;
use schema_loom::canvas::scene::{ApproxTextMeasure, EdgeKey, EdgePath, Scene, NODE_RADIUS, SELECTED_STROKE_WIDTH, STROKE_WIDTH};
use schema_loom::canvas::{Canvas, CanvasEvent, Draft};
use schema_loom::schema::exchange::Imported;
use schema_loom::schema::{EditCommand, NodeType, PositionMap, RelKey, RelationshipType, SchemaDocument, Selection};
use schema_loom::session::{NoopCollaborator, SchemaSession};

const PERSON: Pos2 = Pos2::new(200.0, 200.0);
const PRODUCT: Pos2 = Pos2::new(600.0, 200.0);
const EMPTY_SPOT: Pos2 = Pos2::new(400.0, 500.0);

fn placed() -> (SchemaDocument, PositionMap) {
    let mut positions = PositionMap::new();
    positions.insert("Person".into(), PERSON);
    positions.insert("Product".into(), PRODUCT);
    (SchemaDocument::example(), positions)
}

fn canvas_for(doc: &SchemaDocument, positions: &PositionMap) -> Canvas {
    let mut canvas = Canvas::new(Vec2::new(800.0, 600.0), SimulationParams::default());
    let events = canvas.sync(doc, positions, None);
    assert!(events.is_empty(), "every node already has a position");
    canvas
}

fn click(canvas: &mut Canvas, doc: &SchemaDocument, at: Pos2) -> Vec<CanvasEvent> {
    canvas.pointer_down(at);
    canvas.pointer_up(doc, at)
}

fn buys_key() -> EdgeKey {
    EdgeKey { rel: RelKey::new("BUYS", "Person", "Product"), ordinal: 0 }
}

fn knows_key() -> EdgeKey {
    EdgeKey { rel: RelKey::new("KNOWS", "Person", "Person"), ordinal: 0 }
}

#[test]
fn initial_positions_are_distinct_and_on_one_circle() {
    let viewport = Vec2::new(800.0, 600.0);
    let n = 7;
    let pts: Vec<Pos2> = (0..n).map(|i| initial_position(i, n, viewport)).collect();
    let centroid = (pts.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2()) / n as f32).to_pos2();
    let r0 = pts[0].distance(centroid);
    assert!(r0 > 1.0);
    for p in &pts {
        assert!((p.distance(centroid) - r0).abs() < 1e-2, "all points share one radius");
    }
    for i in 0..n {
        for j in (i + 1)..n {
            assert!(pts[i].distance(pts[j]) > 1.0, "points {} and {} overlap", i, j);
        }
    }
    // radius follows the smaller viewport side
    assert!((r0 - 600.0 * 0.3).abs() < 1e-2);
}

#[test]
fn relax_never_moves_pinned_nodes() {
    let nodes = vec![
        LayoutNode { name: "A".into(), position: Pos2::new(0.0, 0.0), pinned: true },
        LayoutNode { name: "B".into(), position: Pos2::new(10.0, 0.0), pinned: false },
        LayoutNode { name: "C".into(), position: Pos2::new(0.0, 10.0), pinned: false },
    ];
    let links = vec![("A".to_string(), "B".to_string())];
    let report = relax(&nodes, &links, Pos2::ZERO, &SimulationParams::default());

    assert_eq!(report.positions["A"], Pos2::new(0.0, 0.0));
    let moved = report.positions["B"] != Pos2::new(10.0, 0.0) || report.positions["C"] != Pos2::new(0.0, 10.0);
    assert!(moved, "free nodes react to the forces");
    assert!(report.positions.values().all(|p| p.x.is_finite() && p.y.is_finite()));
}

#[test]
fn relax_terminates_on_degenerate_input() {
    let params = SimulationParams { max_iterations: 25, energy_threshold: 0.0, ..SimulationParams::default() };
    let single = vec![LayoutNode { name: "Solo".into(), position: Pos2::new(5.0, 5.0), pinned: false }];
    let report = relax(&single, &[], Pos2::ZERO, &params);
    assert!(report.iterations <= 25);

    let empty = relax(&[], &[], Pos2::ZERO, &params);
    assert!(empty.positions.is_empty());
    assert_eq!(empty.iterations, 0);

    // Two nodes stacked on the same spot, linked to each other twice and to themselves
    let stacked = vec![
        LayoutNode { name: "A".into(), position: Pos2::new(1.0, 1.0), pinned: false },
        LayoutNode { name: "B".into(), position: Pos2::new(1.0, 1.0), pinned: false },
    ];
    let links = vec![
        ("A".to_string(), "B".to_string()),
        ("B".to_string(), "A".to_string()),
        ("A".to_string(), "A".to_string()),
    ];
    let report = relax(&stacked, &links, Pos2::ZERO, &params);
    assert!(report.iterations <= 25);
    assert!(report.positions["A"] != report.positions["B"]);
}

#[test]
fn relax_stops_once_motion_dies_down() {
    let params = SimulationParams { max_iterations: 10_000, energy_threshold: 0.01, ..SimulationParams::default() };
    let still = vec![LayoutNode { name: "A".into(), position: Pos2::ZERO, pinned: false }];
    let quiet = relax(&still, &[], Pos2::ZERO, &params);
    assert!(quiet.converged);
    assert_eq!(quiet.iterations, 1);
    assert!(quiet.kinetic_energy < params.energy_threshold);

    let crowd: Vec<LayoutNode> = (0..20)
        .map(|i| LayoutNode { name: format!("N{}", i), position: Pos2::new(i as f32 * 0.5, 0.0), pinned: false })
        .collect();
    let busy = relax(&crowd, &[], Pos2::ZERO, &params);
    assert!(busy.iterations > quiet.iterations, "a crowded start keeps moving for a while");
    assert!(busy.iterations < 10_000);
}

#[test]
fn fill_missing_only_adds_new_entries() {
    let doc = SchemaDocument::example();
    let mut positions = PositionMap::new();
    positions.insert("Person".into(), Pos2::new(5.0, 5.0));
    let filled = layout::fill_missing(&doc, &positions, Vec2::new(800.0, 600.0), &SimulationParams::default());

    assert_eq!(filled.len(), 1);
    assert!(filled.contains_key("Product"));
    assert!(!filled.contains_key("Person"));

    positions.extend(filled);
    let again = layout::fill_missing(&doc, &positions, Vec2::new(800.0, 600.0), &SimulationParams::default());
    assert!(again.is_empty());
}

#[test]
fn reflexive_relationship_is_drawn_as_a_loop() {
    let (doc, positions) = placed();
    let mut scene = Scene::new();
    scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);

    let knows = scene.edge(&knows_key()).expect("KNOWS visual");
    let buys = scene.edge(&buys_key()).expect("BUYS visual");
    assert!(knows.path.is_loop());
    assert!(!buys.path.is_loop());
    assert!(knows.path.points().len() > 2);
    // The loop sits on top of the box and its label above the loop
    match knows.path {
        EdgePath::Loop { anchor, .. } => assert_eq!(anchor, Pos2::new(PERSON.x, PERSON.y - NODE_RADIUS)),
        _ => panic!("expected loop"),
    }
    assert!(knows.label_pos.y < PERSON.y - NODE_RADIUS);
    assert!(knows.path.to_svg().starts_with('M') && knows.path.to_svg().contains('C'));
}

#[test]
fn straight_edges_stop_at_the_node_boundary() {
    let (doc, positions) = placed();
    let mut scene = Scene::new();
    scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);

    let buys = scene.edge(&buys_key()).expect("BUYS visual");
    match buys.path {
        EdgePath::Straight { from, to } => {
            assert_eq!(from, Pos2::new(PERSON.x + NODE_RADIUS, PERSON.y));
            assert_eq!(to, Pos2::new(PRODUCT.x - NODE_RADIUS, PRODUCT.y));
        }
        _ => panic!("expected straight edge"),
    }
    assert_eq!(buys.arrow[0], Pos2::new(PRODUCT.x - NODE_RADIUS, PRODUCT.y));
    assert_eq!(buys.label_pos, Pos2::new(400.0, 200.0));
    assert!(buys.chip.contains(buys.label_pos));
    assert!(buys.chip.width() > 10.0, "chip sized to the label");
}

#[test]
fn node_box_lists_labels_and_properties() {
    let (doc, positions) = placed();
    let mut scene = Scene::new();
    scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);
    let product = scene.node("Product").expect("Product visual");

    assert_eq!(product.labels_line, "Labels: Product, Item");
    assert_eq!(product.property_lines, vec!["id: str *".to_string(), "price: float *".to_string()]);
    assert_eq!(product.rect().center(), PRODUCT);
    assert!(product.header_rect().height() < product.rect().height());
}

#[test]
fn edges_paint_beneath_nodes() {
    let (doc, positions) = placed();
    let mut scene = Scene::new();
    scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);
    let kinds: Vec<bool> = scene
        .paint_order()
        .map(|item| matches!(item, schema_loom::canvas::scene::SceneItem::Node(_)))
        .collect();
    assert_eq!(kinds, vec![false, false, true, true]);
}

#[test]
fn reconcile_is_incremental() {
    let (mut doc, mut positions) = placed();
    let mut scene = Scene::new();
    let first = scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);
    assert_eq!(first.nodes_added, 2);
    assert_eq!(first.edges_added, 2);
    let person_id = scene.node("Person").expect("person").id;
    let buys_id = scene.edge(&buys_key()).expect("buys").id;

    let unchanged = scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);
    assert!(unchanged.is_empty());

    doc.node_types.push(NodeType::new("Order"));
    positions.insert("Order".into(), Pos2::new(400.0, 450.0));
    let diff = scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);
    assert_eq!(diff.nodes_added, 1);
    assert_eq!(diff.nodes_updated + diff.nodes_removed + diff.edges_added + diff.edges_removed, 0);
    assert_eq!(scene.node("Person").expect("person").id, person_id);
    assert_eq!(scene.edge(&buys_key()).expect("buys").id, buys_id);

    doc.relationship_types.retain(|r| r.name != "KNOWS");
    let diff = scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);
    assert_eq!(diff.edges_removed, 1);
    assert_eq!(scene.edge(&buys_key()).expect("buys").id, buys_id);
}

#[test]
fn duplicate_triples_get_ordinals() {
    let (mut doc, positions) = placed();
    doc.relationship_types.push(RelationshipType::new("BUYS", "Person", "Product"));
    let mut scene = Scene::new();
    scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);

    assert_eq!(scene.edge_count(), 3);
    assert!(scene.edge(&EdgeKey { rel: RelKey::new("BUYS", "Person", "Product"), ordinal: 1 }).is_some());
}

#[test]
fn moving_a_node_only_touches_its_edges() {
    let (mut doc, mut positions) = placed();
    doc.node_types.push(NodeType::new("Order"));
    doc.node_types.push(NodeType::new("Invoice"));
    doc.relationship_types.push(RelationshipType::new("BILLS", "Order", "Invoice"));
    positions.insert("Order".into(), Pos2::new(100.0, 500.0));
    positions.insert("Invoice".into(), Pos2::new(500.0, 500.0));
    let mut scene = Scene::new();
    scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);
    let bills_key = EdgeKey { rel: RelKey::new("BILLS", "Order", "Invoice"), ordinal: 0 };
    let bills_before = scene.edge(&bills_key).expect("bills").clone();

    let touched = scene.move_node("Person", Pos2::new(250.0, 260.0), &ApproxTextMeasure);
    assert_eq!(touched, 2, "BUYS and KNOWS");
    assert_eq!(scene.edges_touching("Person").len(), 2);
    assert_eq!(scene.edge(&bills_key).expect("bills"), &bills_before);
    assert_eq!(scene.node("Person").expect("person").center, Pos2::new(250.0, 260.0));
}

#[test]
fn highlight_is_exclusive() {
    let (doc, positions) = placed();
    let mut scene = Scene::new();
    scene.reconcile(&doc, &positions, None, &ApproxTextMeasure);

    scene.set_selection(Some(&Selection::Node("Person".into())));
    assert_eq!(scene.highlighted_count(), 1);
    assert_eq!(scene.node("Person").expect("person").stroke_width, SELECTED_STROKE_WIDTH);

    scene.set_selection(Some(&Selection::Relationship(RelKey::new("BUYS", "Person", "Product"))));
    assert_eq!(scene.highlighted_count(), 1);
    assert_eq!(scene.node("Person").expect("person").stroke_width, STROKE_WIDTH);
    assert_eq!(scene.edge(&buys_key()).expect("buys").stroke_width, STROKE_WIDTH * 2.0);

    scene.set_selection(None);
    assert_eq!(scene.highlighted_count(), 0);
}

#[test]
fn clicks_select_and_background_clears() {
    let (doc, positions) = placed();
    let state = Imported { document: doc, positions };
    let canvas = Canvas::new(Vec2::new(800.0, 600.0), SimulationParams::default());
    let mut session = SchemaSession::new(state, canvas, NoopCollaborator);

    session.pointer_down(PERSON);
    session.pointer_up(PERSON);
    assert_eq!(session.selection(), Some(&Selection::Node("Person".into())));
    assert!(session.canvas().scene().node("Person").expect("person").selected);

    session.pointer_down(PRODUCT);
    session.pointer_up(PRODUCT);
    assert_eq!(session.selection(), Some(&Selection::Node("Product".into())));
    assert_eq!(session.canvas().scene().highlighted_count(), 1);
    assert!(!session.canvas().scene().node("Person").expect("person").selected);

    session.pointer_down(EMPTY_SPOT);
    session.pointer_up(EMPTY_SPOT);
    assert!(session.selection().is_none());
    assert_eq!(session.canvas().scene().highlighted_count(), 0);
}

#[test]
fn node_click_is_not_also_a_background_click() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    let events = click(&mut canvas, &doc, PERSON);
    assert_eq!(events.len(), 1);
    match &events[0] {
        CanvasEvent::NodeSelected(node) => assert_eq!(node, doc.node("Person").expect("person")),
        other => panic!("unexpected {:?}", other),
    }

    let events = click(&mut canvas, &doc, Pos2::new(400.0, 200.0));
    assert_eq!(events.len(), 1);
    match &events[0] {
        CanvasEvent::RelationshipSelected(rel) => assert_eq!(rel.name, "BUYS"),
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(click(&mut canvas, &doc, EMPTY_SPOT), vec![CanvasEvent::SelectionCleared]);
}

#[test]
fn drag_commits_exactly_once_at_release() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);

    // Grab 10px right and 5px below the center; the node must not jump
    canvas.pointer_down(Pos2::new(210.0, 205.0));
    assert!(matches!(canvas.mode(), InteractionMode::Dragging { .. }));
    canvas.pointer_move(Pos2::new(230.0, 215.0));
    canvas.pointer_move(Pos2::new(280.0, 255.0));
    canvas.pointer_move(Pos2::new(310.0, 305.0));

    // Live position is on the scene only
    assert_eq!(canvas.scene().node("Person").expect("person").center, Pos2::new(300.0, 300.0));
    assert_eq!(canvas.positions()["Person"], PERSON);

    let events = canvas.pointer_up(&doc, Pos2::new(310.0, 305.0));
    assert_eq!(
        events,
        vec![CanvasEvent::PositionCommitted { name: "Person".into(), position: Pos2::new(300.0, 300.0) }]
    );
    assert_eq!(canvas.positions()["Person"], Pos2::new(300.0, 300.0));
    assert_eq!(canvas.positions()["Product"], PRODUCT);
    assert_eq!(canvas.mode(), &InteractionMode::Idle);
}

#[test]
fn session_drag_updates_positions_once() {
    struct Count(usize);
    impl schema_loom::session::Collaborator for Count {
        fn on_positions_update(&mut self, _positions: &PositionMap) {
            self.0 += 1;
        }
    }
    let (doc, positions) = placed();
    let canvas = Canvas::new(Vec2::new(800.0, 600.0), SimulationParams::default());
    let mut session = SchemaSession::new(Imported { document: doc, positions }, canvas, Count(0));

    session.pointer_down(PRODUCT);
    session.pointer_move(Pos2::new(620.0, 210.0));
    session.pointer_move(Pos2::new(650.0, 250.0));
    let outcomes = session.pointer_up(Pos2::new(650.0, 250.0));

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert_eq!(session.collaborator().0, 1);
    assert_eq!(session.positions()["Product"], Pos2::new(650.0, 250.0));
    assert_eq!(session.positions()["Person"], PERSON);
    assert!(session.selection().is_none(), "a drag is not a click");
}

#[test]
fn drag_commits_the_release_point_not_the_last_move() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.pointer_down(PERSON);
    canvas.pointer_move(Pos2::new(250.0, 250.0));
    let events = canvas.pointer_up(&doc, Pos2::new(300.0, 320.0));

    assert_eq!(
        events,
        vec![CanvasEvent::PositionCommitted { name: "Person".into(), position: Pos2::new(300.0, 320.0) }]
    );
    assert_eq!(canvas.scene().node("Person").expect("person").center, Pos2::new(300.0, 320.0));
}

#[test]
fn release_far_from_press_without_moves_is_a_drag() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.pointer_down(PERSON);
    let events = canvas.pointer_up(&doc, Pos2::new(400.0, 450.0));

    assert_eq!(
        events,
        vec![CanvasEvent::PositionCommitted { name: "Person".into(), position: Pos2::new(400.0, 450.0) }]
    );
    assert_eq!(canvas.positions()["Person"], Pos2::new(400.0, 450.0));

    // Same for the background: a far release is a pan, not a click
    let open = Pos2::new(100.0, 500.0);
    canvas.pointer_down(open);
    assert!(canvas.pointer_up(&doc, Pos2::new(140.0, 530.0)).is_empty());
    assert_eq!(canvas.transform().translate, Vec2::new(40.0, 30.0));
}

#[test]
fn leaving_the_canvas_commits_the_last_position() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.pointer_down(PERSON);
    canvas.pointer_move(Pos2::new(260.0, 240.0));
    let events = canvas.pointer_leave(&doc);

    assert_eq!(
        events,
        vec![CanvasEvent::PositionCommitted { name: "Person".into(), position: Pos2::new(260.0, 240.0) }]
    );
    assert_eq!(canvas.mode(), &InteractionMode::Idle);
}

#[test]
fn node_removed_mid_drag_returns_to_idle_silently() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.pointer_down(PRODUCT);
    canvas.pointer_move(Pos2::new(650.0, 260.0));

    let mut smaller = doc.clone();
    smaller.node_types.retain(|n| n.name != "Product");
    smaller.relationship_types.retain(|r| !r.touches("Product"));
    let mut left = positions.clone();
    left.remove("Product");
    canvas.sync(&smaller, &left, None);

    assert_eq!(canvas.mode(), &InteractionMode::Idle);
    assert!(canvas.pointer_up(&smaller, Pos2::new(650.0, 260.0)).is_empty());
    assert!(canvas.scene().node("Product").is_none());
}

#[test]
fn sync_during_drag_keeps_the_live_position() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.pointer_down(PERSON);
    canvas.pointer_move(Pos2::new(250.0, 250.0));
    canvas.sync(&doc, &positions, None);
    assert_eq!(canvas.scene().node("Person").expect("person").center, Pos2::new(250.0, 250.0));
}

#[test]
fn zoom_is_bounded_and_suppressed_while_dragging() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);

    canvas.pointer_down(PERSON);
    canvas.scroll(PERSON, 120.0);
    assert_eq!(canvas.transform().scale, 1.0);
    canvas.pointer_up(&doc, PERSON);

    for _ in 0..100 {
        canvas.scroll(EMPTY_SPOT, 1.0);
    }
    assert_eq!(canvas.transform().scale, MAX_ZOOM);
    for _ in 0..200 {
        canvas.zoom_out();
    }
    assert_eq!(canvas.transform().scale, MIN_ZOOM);

    // Double-click leaves the view alone; the explicit control resets it
    canvas.double_click();
    assert_eq!(canvas.transform().scale, MIN_ZOOM);
    canvas.reset_view();
    assert_eq!(canvas.transform().scale, 1.0);
}

#[test]
fn zoom_keeps_the_point_under_the_pointer() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    let anchor = Pos2::new(300.0, 100.0);
    let world_before = canvas.transform().screen_to_world(anchor);
    canvas.scroll(anchor, 1.0);
    let world_after = canvas.transform().screen_to_world(anchor);
    assert!(world_before.distance(world_after) < 1e-3);
    assert!(canvas.transform().scale > 1.0);
}

#[test]
fn background_drag_pans() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.pointer_down(EMPTY_SPOT);
    assert_eq!(canvas.mode(), &InteractionMode::Panning { moved: false });
    canvas.pointer_move(Pos2::new(450.0, 520.0));
    let events = canvas.pointer_up(&doc, Pos2::new(450.0, 520.0));

    assert!(events.is_empty(), "a pan is not a background click");
    assert_eq!(canvas.transform().translate, Vec2::new(50.0, 20.0));
    // Node coordinates are untouched by panning
    assert_eq!(canvas.positions()["Person"], PERSON);
}

#[test]
fn dragging_under_zoom_uses_world_coordinates() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.scroll(Pos2::ZERO, 1.0);
    let t = canvas.transform();
    let start = t.world_to_screen(PERSON);
    canvas.pointer_down(start);
    let end = start + Vec2::new(110.0, 0.0);
    canvas.pointer_move(end);
    let events = canvas.pointer_up(&doc, end);

    match &events[..] {
        [CanvasEvent::PositionCommitted { name, position }] => {
            assert_eq!(name, "Person");
            assert!((position.x - (PERSON.x + 100.0)).abs() < 1e-3);
            assert!((position.y - PERSON.y).abs() < 1e-3);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn add_node_tool_requests_a_draft_at_the_click() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.set_tool(Tool::AddNode);
    let events = click(&mut canvas, &doc, EMPTY_SPOT);

    match &events[..] {
        [CanvasEvent::CreationRequested(Draft::Node(draft))] => {
            assert_eq!(draft.position, Some(EMPTY_SPOT));
            assert!(draft.node.properties.is_empty());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(canvas.tool(), &Tool::Select);
}

#[test]
fn add_relationship_tool_picks_start_then_end() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);
    canvas.set_tool(Tool::AddRelationship { start: None });

    click(&mut canvas, &doc, PERSON);
    assert_eq!(canvas.tool(), &Tool::AddRelationship { start: Some("Person".into()) });
    let events = click(&mut canvas, &doc, PRODUCT);
    match &events[..] {
        [CanvasEvent::CreationRequested(Draft::Relationship(draft))] => {
            assert_eq!(draft.relationship.start_node, "Person");
            assert_eq!(draft.relationship.end_node, "Product");
        }
        other => panic!("unexpected {:?}", other),
    }

    // Same node twice gives a reflexive draft
    canvas.set_tool(Tool::AddRelationship { start: None });
    click(&mut canvas, &doc, PRODUCT);
    let events = click(&mut canvas, &doc, PRODUCT);
    match &events[..] {
        [CanvasEvent::CreationRequested(Draft::Relationship(draft))] => assert!(draft.relationship.is_reflexive()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn delete_tool_emits_commands() {
    let (doc, positions) = placed();
    let mut canvas = canvas_for(&doc, &positions);

    canvas.set_tool(Tool::Delete);
    let events = click(&mut canvas, &doc, Pos2::new(400.0, 200.0));
    assert_eq!(
        events,
        vec![CanvasEvent::Command(EditCommand::DeleteRelationship(RelKey::new("BUYS", "Person", "Product")))]
    );

    canvas.set_tool(Tool::Delete);
    let events = click(&mut canvas, &doc, PRODUCT);
    assert_eq!(events, vec![CanvasEvent::Command(EditCommand::DeleteNode { name: "Product".into() })]);
}

#[test]
fn overview_projects_into_a_small_square() {
    let doc = SchemaDocument::example();
    let mut positions = PositionMap::new();
    assert!(overview::project(&doc, &positions).is_none());

    positions.insert("Person".into(), Pos2::new(0.0, 0.0));
    positions.insert("Product".into(), Pos2::new(200.0, 100.0));
    let ov = overview::project(&doc, &positions).expect("overview");

    // bounds (-100,-100)..(300,200): 400 x 300, so x limits the scale
    assert!((ov.scale - 0.25).abs() < 1e-6);
    assert_eq!(ov.origin, Pos2::new(-100.0, -100.0));
    let person = ov.nodes.iter().find(|n| n.name == "Person").expect("person mark");
    assert_eq!(person.rect.center(), Pos2::new(25.0, 25.0));
    assert_eq!(person.rect.width(), overview::MARKER_SIZE);
    assert_eq!(ov.edges.len(), 2);
    assert!(ov.edges.contains(&[Pos2::new(25.0, 25.0), Pos2::new(75.0, 50.0)]));
    for n in &ov.nodes {
        assert!(n.rect.center().x <= overview::OVERVIEW_SIZE && n.rect.center().y <= overview::OVERVIEW_SIZE);
    }
}

#[test]
fn canvas_overview_includes_the_viewport_frame() {
    let (doc, positions) = placed();
    let canvas = canvas_for(&doc, &positions);
    let ov = canvas.overview(&doc).expect("overview");
    let frame = ov.viewport_frame.expect("frame");
    assert_eq!(frame.min, ov.project_point(Pos2::ZERO));
    assert_eq!(frame.max, ov.project_point(Pos2::new(800.0, 600.0)));
}
