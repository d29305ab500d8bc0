use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use egui::{Color32, Pos2, Rect, Vec2};

use super::CanvasEvent;
use crate::schema::{NodeType, PositionMap, Property, RelKey, SchemaDocument, Selection};

// Node box geometry (world units, relative to the box's top-left corner)
pub const NODE_WIDTH: f32 = 120.0;
pub const NODE_HEIGHT: f32 = 120.0;
pub const NODE_RADIUS: f32 = 60.0;
pub const HEADER_HEIGHT: f32 = 25.0;
pub const LABELS_BASELINE: f32 = 40.0;
pub const SEPARATOR_Y: f32 = 50.0;
pub const PROPERTIES_TOP: f32 = 60.0;
pub const PROPERTY_LINE_HEIGHT: f32 = 20.0;
pub const TEXT_INSET: f32 = 10.0;
pub const TITLE_FONT_SIZE: f32 = 12.0;
pub const BODY_FONT_SIZE: f32 = 10.0;

pub const STROKE_WIDTH: f32 = 2.0;
pub const SELECTED_STROKE_WIDTH: f32 = STROKE_WIDTH * 2.0;

pub const ARROW_SIZE: f32 = 10.0;
pub const LOOP_LIFT: f32 = 100.0;
pub const LOOP_SPREAD: f32 = 80.0;
pub const LOOP_SEGMENTS: usize = 24;
pub const CHIP_PADDING: f32 = 5.0;
pub const CHIP_HEIGHT: f32 = 20.0;

pub const EDGE_COLOR: Color32 = Color32::from_rgb(0x21, 0x96, 0xf3);
pub const HIGHLIGHT_HEADER: Color32 = Color32::from_rgb(0xff, 0x70, 0x43);

/// Width of rendered text. The GUI measures with real font metrics; tests
/// and headless callers use [`ApproxTextMeasure`].
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

pub struct ApproxTextMeasure;

impl TextMeasure for ApproxTextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.6
    }
}

// Stable header color per node type, chosen from a small palette via hashing.
pub fn header_color(name: &str) -> Color32 {
    const PALETTE: [Color32; 8] = [
        Color32::from_rgb(0x4c, 0xaf, 0x50), // green
        Color32::from_rgb(0x7b, 0xa3, 0xff), // blue
        Color32::from_rgb(0xa3, 0x7b, 0xff), // violet
        Color32::from_rgb(0x26, 0xa6, 0x9a), // teal
        Color32::from_rgb(0x8d, 0x6e, 0x63), // brown
        Color32::from_rgb(0x5c, 0x6b, 0xc0), // indigo
        Color32::from_rgb(0x9a, 0xcd, 0x32), // yellowgreen
        Color32::from_rgb(0xcd, 0x32, 0x9a), // fuchsia
    ];
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    name.hash(&mut hasher);
    PALETTE[hasher.finish() as usize % PALETTE.len()]
}

pub fn property_line(p: &Property) -> String {
    format!("{}: {}{}", p.name, p.kind, if p.required { " *" } else { "" })
}

pub fn point_segment_distance(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn cubic_point(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, t: f32) -> Pos2 {
    let u = 1.0 - t;
    let v = p0.to_vec2() * (u * u * u)
        + p1.to_vec2() * (3.0 * u * u * t)
        + p2.to_vec2() * (3.0 * u * t * t)
        + p3.to_vec2() * (t * t * t);
    v.to_pos2()
}

fn arrow_head(tip: Pos2, dir: Vec2) -> [Pos2; 3] {
    let base = tip - dir * ARROW_SIZE;
    let perp = Vec2::new(-dir.y, dir.x) * (ARROW_SIZE * 0.5);
    [tip, base + perp, base - perp]
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeVisual {
    pub id: u64,
    pub name: String,
    pub center: Pos2,
    pub header_color: Color32,
    pub labels_line: String,
    pub property_lines: Vec<String>,
    pub stroke_width: f32,
    pub selected: bool,
    labels: Vec<String>,
    properties: Vec<Property>,
}

impl NodeVisual {
    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.center, Vec2::new(NODE_WIDTH, NODE_HEIGHT))
    }

    pub fn header_rect(&self) -> Rect {
        let r = self.rect();
        Rect::from_min_size(r.min, Vec2::new(NODE_WIDTH, HEADER_HEIGHT))
    }

    pub fn title_pos(&self) -> Pos2 {
        self.header_rect().center()
    }

    pub fn labels_pos(&self) -> Pos2 {
        self.rect().min + Vec2::new(TEXT_INSET, LABELS_BASELINE)
    }

    pub fn separator(&self) -> [Pos2; 2] {
        let min = self.rect().min;
        [min + Vec2::new(0.0, SEPARATOR_Y), min + Vec2::new(NODE_WIDTH, SEPARATOR_Y)]
    }

    pub fn property_pos(&self, i: usize) -> Pos2 {
        self.rect().min + Vec2::new(TEXT_INSET, PROPERTIES_TOP + i as f32 * PROPERTY_LINE_HEIGHT)
    }

    fn content_matches(&self, node: &NodeType) -> bool {
        self.labels == node.labels && self.properties == node.properties
    }

    fn set_content(&mut self, node: &NodeType) {
        self.labels = node.labels.clone();
        self.properties = node.properties.clone();
        self.labels_line = format!("Labels: {}", node.labels.join(", "));
        self.property_lines = node.properties.iter().map(property_line).collect();
    }
}

/// Scene key of an edge: the relationship triple plus an ordinal that
/// tells exact duplicates apart (0 for the first occurrence).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub rel: RelKey,
    pub ordinal: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EdgePath {
    Straight { from: Pos2, to: Pos2 },
    // Closed loop anchored at the top of the node box
    Loop { anchor: Pos2, ctrl1: Pos2, ctrl2: Pos2 },
}

impl EdgePath {
    pub fn is_loop(&self) -> bool {
        matches!(self, EdgePath::Loop { .. })
    }

    /// Polyline approximation used for painting and hit testing.
    pub fn points(&self) -> Vec<Pos2> {
        match *self {
            EdgePath::Straight { from, to } => vec![from, to],
            EdgePath::Loop { anchor, ctrl1, ctrl2 } => (0..=LOOP_SEGMENTS)
                .map(|i| cubic_point(anchor, ctrl1, ctrl2, anchor, i as f32 / LOOP_SEGMENTS as f32))
                .collect(),
        }
    }

    /// SVG-style path data, handy for exporting or debugging the scene.
    pub fn to_svg(&self) -> String {
        match *self {
            EdgePath::Straight { from, to } => format!("M{},{} L{},{}", from.x, from.y, to.x, to.y),
            EdgePath::Loop { anchor, ctrl1, ctrl2 } => format!(
                "M{},{} C{},{} {},{} {},{}",
                anchor.x, anchor.y, ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, anchor.x, anchor.y
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeVisual {
    pub id: u64,
    pub key: EdgeKey,
    pub path: EdgePath,
    pub arrow: [Pos2; 3],
    pub label: String,
    pub label_pos: Pos2,
    pub chip: Rect,
    pub stroke_width: f32,
    pub selected: bool,
    properties: Vec<Property>,
}

impl EdgeVisual {
    fn distance_to(&self, p: Pos2) -> f32 {
        let pts = self.path.points();
        let line = pts
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .fold(f32::INFINITY, f32::min);
        if self.chip.contains(p) { 0.0 } else { line }
    }
}

struct EdgeGeometry {
    path: EdgePath,
    arrow: [Pos2; 3],
    label_pos: Pos2,
}

fn edge_geometry(source: Pos2, target: Pos2, reflexive: bool) -> EdgeGeometry {
    if reflexive {
        let anchor = source - Vec2::new(0.0, NODE_RADIUS);
        let ctrl1 = source + Vec2::new(-LOOP_SPREAD, -LOOP_LIFT);
        let ctrl2 = source + Vec2::new(LOOP_SPREAD, -LOOP_LIFT);
        let dir = (anchor - ctrl2).normalized();
        EdgeGeometry {
            path: EdgePath::Loop { anchor, ctrl1, ctrl2 },
            arrow: arrow_head(anchor, dir),
            label_pos: source - Vec2::new(0.0, LOOP_LIFT + CHIP_HEIGHT * 0.5),
        }
    } else {
        let delta = target - source;
        let dir = if delta.length_sq() > f32::EPSILON { delta.normalized() } else { Vec2::X };
        let from = source + dir * NODE_RADIUS;
        let to = target - dir * NODE_RADIUS;
        EdgeGeometry {
            path: EdgePath::Straight { from, to },
            arrow: arrow_head(to, dir),
            label_pos: from.lerp(to, 0.5),
        }
    }
}

fn chip_rect(label: &str, center: Pos2, measure: &dyn TextMeasure) -> Rect {
    let w = measure.text_width(label, BODY_FONT_SIZE);
    Rect::from_center_size(center, Vec2::new(w + CHIP_PADDING * 2.0, CHIP_HEIGHT))
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Highlight {
    Node(String),
    Edge(EdgeKey),
}

/// Counts of what a reconcile pass touched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneDiff {
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub nodes_updated: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
    pub edges_updated: usize,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        *self == SceneDiff::default()
    }
}

pub enum SceneItem<'a> {
    Edge(&'a EdgeVisual),
    Node(&'a NodeVisual),
}

#[derive(Default)]
pub struct Scene {
    nodes: HashMap<String, NodeVisual>,
    node_order: Vec<String>,
    edges: HashMap<EdgeKey, EdgeVisual>,
    edge_order: Vec<EdgeKey>,
    // node name -> keys of the edges touching it
    adjacency: HashMap<String, Vec<EdgeKey>>,
    highlight: Option<Highlight>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn node(&self, name: &str) -> Option<&NodeVisual> { self.nodes.get(name) }
    pub fn edge(&self, key: &EdgeKey) -> Option<&EdgeVisual> { self.edges.get(key) }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeVisual> {
        self.node_order.iter().filter_map(|n| self.nodes.get(n))
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeVisual> {
        self.edge_order.iter().filter_map(|k| self.edges.get(k))
    }

    /// Fixed paint order: the edge layer first, then node boxes on top.
    pub fn paint_order(&self) -> impl Iterator<Item = SceneItem<'_>> {
        self.edges().map(SceneItem::Edge).chain(self.nodes().map(SceneItem::Node))
    }

    pub fn edges_touching(&self, node: &str) -> &[EdgeKey] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Brings the scene in line with `doc`. Visuals are matched by key:
    /// unchanged ones are left alone, changed ones are updated in place
    /// (keeping their id), and only missing or stale keys are created or
    /// dropped. Node types without a position are not drawn.
    pub fn reconcile(
        &mut self,
        doc: &SchemaDocument,
        positions: &PositionMap,
        selection: Option<&Selection>,
        measure: &dyn TextMeasure,
    ) -> SceneDiff {
        let mut diff = SceneDiff::default();

        let mut node_order = Vec::with_capacity(doc.node_count());
        for node in &doc.node_types {
            let Some(&center) = positions.get(&node.name) else { continue };
            node_order.push(node.name.clone());
            match self.nodes.get_mut(&node.name) {
                Some(v) => {
                    let mut touched = false;
                    if !v.content_matches(node) {
                        v.set_content(node);
                        touched = true;
                    }
                    if v.center != center {
                        v.center = center;
                        touched = true;
                    }
                    if touched { diff.nodes_updated += 1; }
                }
                None => {
                    let id = self.alloc_id();
                    let mut v = NodeVisual {
                        id,
                        name: node.name.clone(),
                        center,
                        header_color: header_color(&node.name),
                        labels_line: String::new(),
                        property_lines: Vec::new(),
                        stroke_width: STROKE_WIDTH,
                        selected: false,
                        labels: Vec::new(),
                        properties: Vec::new(),
                    };
                    v.set_content(node);
                    self.nodes.insert(node.name.clone(), v);
                    diff.nodes_added += 1;
                }
            }
        }
        let before = self.nodes.len();
        self.nodes.retain(|name, _| node_order.contains(name));
        diff.nodes_removed = before - self.nodes.len();
        self.node_order = node_order;

        let mut ordinals: HashMap<RelKey, usize> = HashMap::new();
        let mut edge_order = Vec::with_capacity(doc.relationship_count());
        let mut adjacency: HashMap<String, Vec<EdgeKey>> = HashMap::new();
        for rel in &doc.relationship_types {
            let (Some(src), Some(dst)) = (self.nodes.get(&rel.start_node), self.nodes.get(&rel.end_node)) else {
                continue;
            };
            let (src, dst) = (src.center, dst.center);
            let rk = rel.key();
            let slot = ordinals.entry(rk.clone()).or_insert(0);
            let key = EdgeKey { rel: rk, ordinal: *slot };
            *slot += 1;

            let geo = edge_geometry(src, dst, rel.is_reflexive());
            let chip = chip_rect(&rel.name, geo.label_pos, measure);
            match self.edges.get_mut(&key) {
                Some(e) => {
                    if e.path != geo.path || e.properties != rel.properties || e.chip != chip {
                        e.path = geo.path;
                        e.arrow = geo.arrow;
                        e.label_pos = geo.label_pos;
                        e.chip = chip;
                        e.properties = rel.properties.clone();
                        diff.edges_updated += 1;
                    }
                }
                None => {
                    let id = self.alloc_id();
                    self.edges.insert(
                        key.clone(),
                        EdgeVisual {
                            id,
                            key: key.clone(),
                            path: geo.path,
                            arrow: geo.arrow,
                            label: rel.name.clone(),
                            label_pos: geo.label_pos,
                            chip,
                            stroke_width: STROKE_WIDTH,
                            selected: false,
                            properties: rel.properties.clone(),
                        },
                    );
                    diff.edges_added += 1;
                }
            }
            adjacency.entry(rel.start_node.clone()).or_default().push(key.clone());
            if !rel.is_reflexive() {
                adjacency.entry(rel.end_node.clone()).or_default().push(key.clone());
            }
            edge_order.push(key);
        }
        let before = self.edges.len();
        self.edges.retain(|k, _| edge_order.contains(k));
        diff.edges_removed = before - self.edges.len();
        self.edge_order = edge_order;
        self.adjacency = adjacency;

        self.set_selection(selection);
        diff
    }

    /// Moves one node box and recomputes only the edges touching it.
    /// Returns how many edges were updated.
    pub fn move_node(&mut self, name: &str, center: Pos2, measure: &dyn TextMeasure) -> usize {
        let Some(v) = self.nodes.get_mut(name) else { return 0 };
        v.center = center;
        let keys = self.adjacency.get(name).cloned().unwrap_or_default();
        let mut touched = 0;
        for key in keys {
            let (Some(src), Some(dst)) = (self.nodes.get(&key.rel.start_node), self.nodes.get(&key.rel.end_node)) else {
                continue;
            };
            let reflexive = key.rel.start_node == key.rel.end_node;
            let geo = edge_geometry(src.center, dst.center, reflexive);
            if let Some(e) = self.edges.get_mut(&key) {
                e.chip = chip_rect(&e.label, geo.label_pos, measure);
                e.path = geo.path;
                e.arrow = geo.arrow;
                e.label_pos = geo.label_pos;
                touched += 1;
            }
        }
        touched
    }

    fn set_node_highlight(&mut self, name: &str, on: bool) {
        if let Some(v) = self.nodes.get_mut(name) {
            v.selected = on;
            v.stroke_width = if on { SELECTED_STROKE_WIDTH } else { STROKE_WIDTH };
            v.header_color = if on { HIGHLIGHT_HEADER } else { header_color(&v.name) };
        }
    }

    fn set_edge_highlight(&mut self, key: &EdgeKey, on: bool) {
        if let Some(e) = self.edges.get_mut(key) {
            e.selected = on;
            e.stroke_width = if on { SELECTED_STROKE_WIDTH } else { STROKE_WIDTH };
        }
    }

    /// Clears the previous highlight, then highlights the selected element
    /// if it is on the scene. At most one element is highlighted.
    pub fn set_selection(&mut self, selection: Option<&Selection>) {
        match self.highlight.take() {
            Some(Highlight::Node(name)) => self.set_node_highlight(&name, false),
            Some(Highlight::Edge(key)) => self.set_edge_highlight(&key, false),
            None => {}
        }
        let next = match selection {
            Some(Selection::Node(name)) if self.nodes.contains_key(name) => Some(Highlight::Node(name.clone())),
            Some(Selection::Relationship(rel)) => {
                let key = EdgeKey { rel: rel.clone(), ordinal: 0 };
                self.edges.contains_key(&key).then_some(Highlight::Edge(key))
            }
            _ => None,
        };
        match &next {
            Some(Highlight::Node(name)) => self.set_node_highlight(name, true),
            Some(Highlight::Edge(key)) => self.set_edge_highlight(key, true),
            None => {}
        }
        self.highlight = next;
    }

    pub fn highlighted_count(&self) -> usize {
        self.nodes.values().filter(|v| v.selected).count() + self.edges.values().filter(|e| e.selected).count()
    }

    // Topmost node box under a world-space point (nodes paint last-on-top)
    pub fn node_at(&self, p: Pos2) -> Option<&str> {
        self.node_order
            .iter()
            .rev()
            .filter_map(|n| self.nodes.get(n))
            .find(|v| v.rect().contains(p))
            .map(|v| v.name.as_str())
    }

    pub fn edge_at(&self, p: Pos2, tolerance: f32) -> Option<&EdgeKey> {
        self.edges()
            .map(|e| (e, e.distance_to(p)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(e, _)| &e.key)
    }

    /// Click on a node box. Consumes the event so the background handler
    /// never sees it; emits the full node type.
    pub fn on_node_click(&self, name: &str, doc: &SchemaDocument) -> Option<CanvasEvent> {
        doc.node(name).cloned().map(CanvasEvent::NodeSelected)
    }

    pub fn on_edge_click(&self, key: &EdgeKey, doc: &SchemaDocument) -> Option<CanvasEvent> {
        doc.relationship(&key.rel).cloned().map(CanvasEvent::RelationshipSelected)
    }

    pub fn on_background_click(&self) -> CanvasEvent {
        CanvasEvent::SelectionCleared
    }
}
