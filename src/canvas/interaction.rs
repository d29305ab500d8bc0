use egui::{Pos2, Vec2};

use super::scene::{Scene, TextMeasure};
use super::{CanvasEvent, Draft};
use crate::schema::{EditCommand, NodeDraft, NodeType, PositionMap, RelationshipDraft, RelationshipType, SchemaDocument};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 4.0;
pub const ZOOM_STEP: f32 = 1.1;
// Pointer travel (screen px) below which a press/release pair is a click
pub const CLICK_SLOP: f32 = 3.0;
pub const EDGE_HIT_TOLERANCE: f32 = 6.0;

/// Pan/zoom applied to the whole scene: `screen = world * scale + translate`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewTransform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { translate: Vec2::ZERO, scale: 1.0 }
    }
}

impl ViewTransform {
    pub fn world_to_screen(&self, p: Pos2) -> Pos2 {
        (p.to_vec2() * self.scale + self.translate).to_pos2()
    }

    pub fn screen_to_world(&self, p: Pos2) -> Pos2 {
        ((p.to_vec2() - self.translate) / self.scale).to_pos2()
    }

    // Zoom about a fixed screen point, keeping scale within [MIN_ZOOM, MAX_ZOOM]
    pub fn zoom_about(&mut self, anchor: Pos2, factor: f32) {
        let next = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = next / self.scale;
        self.translate = anchor.to_vec2() - (anchor.to_vec2() - self.translate) * ratio;
        self.scale = next;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionMode {
    Idle,
    Dragging {
        node: String,
        // pointer minus node center at press time, in world units
        grab_offset: Vec2,
        current: Pos2,
        moved: bool,
    },
    Panning { moved: bool },
    Zooming,
}

/// What a click on the canvas does besides selecting.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Tool {
    #[default]
    Select,
    AddNode,
    AddRelationship { start: Option<String> },
    Delete,
}

pub struct InteractionController {
    mode: InteractionMode,
    tool: Tool,
    transform: ViewTransform,
    press: Option<Pos2>,
    last_pointer: Option<Pos2>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            mode: InteractionMode::Idle,
            tool: Tool::Select,
            transform: ViewTransform::default(),
            press: None,
            last_pointer: None,
        }
    }

    pub fn mode(&self) -> &InteractionMode { &self.mode }
    pub fn tool(&self) -> &Tool { &self.tool }
    pub fn transform(&self) -> ViewTransform { self.transform }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.transform = ViewTransform {
            translate: transform.translate,
            scale: transform.scale.clamp(MIN_ZOOM, MAX_ZOOM),
        };
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.mode, InteractionMode::Dragging { .. })
    }

    /// Live position of the node being dragged, once it actually moved.
    pub fn live_drag(&self) -> Option<(&str, Pos2)> {
        match &self.mode {
            InteractionMode::Dragging { node, current, moved: true, .. } => Some((node.as_str(), *current)),
            _ => None,
        }
    }

    fn beyond_slop(&self, screen: Pos2) -> bool {
        self.press.is_some_and(|p| p.distance(screen) > CLICK_SLOP)
    }

    // Drops a drag whose node vanished from the document. No event escapes.
    pub fn abort_if_missing(&mut self, doc: &SchemaDocument) {
        if let InteractionMode::Dragging { node, .. } = &self.mode {
            if !doc.contains_node(node) {
                log::debug!("drag target {} disappeared, back to idle", node);
                self.mode = InteractionMode::Idle;
                self.press = None;
            }
        }
        if let Tool::AddRelationship { start: Some(s) } = &self.tool {
            if !doc.contains_node(s) {
                self.tool = Tool::AddRelationship { start: None };
            }
        }
    }

    pub fn pointer_down(&mut self, scene: &Scene, screen: Pos2) {
        self.press = Some(screen);
        self.last_pointer = Some(screen);
        let world = self.transform.screen_to_world(screen);
        self.mode = match scene.node_at(world).and_then(|n| scene.node(n)) {
            Some(v) => InteractionMode::Dragging {
                node: v.name.clone(),
                grab_offset: world - v.center,
                current: v.center,
                moved: false,
            },
            None => InteractionMode::Panning { moved: false },
        };
    }

    pub fn pointer_move(&mut self, scene: &mut Scene, measure: &dyn TextMeasure, screen: Pos2) {
        let past_slop = self.beyond_slop(screen);
        let last = self.last_pointer.replace(screen);
        match &mut self.mode {
            InteractionMode::Dragging { node, grab_offset, current, moved } => {
                if scene.node(node).is_none() {
                    self.mode = InteractionMode::Idle;
                    self.press = None;
                    return;
                }
                if !*moved && !past_slop {
                    return;
                }
                *moved = true;
                // World-space math only: the pointer is mapped back through the
                // view transform once and the node follows it by its grab offset
                let world = self.transform.screen_to_world(screen);
                *current = world - *grab_offset;
                scene.move_node(node, *current, measure);
            }
            InteractionMode::Panning { moved } => {
                if !*moved && !past_slop {
                    return;
                }
                *moved = true;
                if let Some(last) = last {
                    self.transform.translate += screen - last;
                }
            }
            InteractionMode::Zooming => self.mode = InteractionMode::Idle,
            InteractionMode::Idle => {}
        }
    }

    /// Release. The release point is treated as a final move first, so a
    /// drag commits where the pointer let go and a press released beyond
    /// the slop is never a click.
    pub fn pointer_up(
        &mut self,
        scene: &mut Scene,
        measure: &dyn TextMeasure,
        doc: &SchemaDocument,
        positions: &mut PositionMap,
        screen: Pos2,
    ) -> Vec<CanvasEvent> {
        self.pointer_move(scene, measure, screen);
        let scene = &*scene;
        let mode = std::mem::replace(&mut self.mode, InteractionMode::Idle);
        self.press = None;
        let world = self.transform.screen_to_world(screen);
        match mode {
            InteractionMode::Dragging { node, current, moved: true, .. } => {
                if !doc.contains_node(&node) {
                    return Vec::new();
                }
                positions.insert(node.clone(), current);
                vec![CanvasEvent::PositionCommitted { name: node, position: current }]
            }
            InteractionMode::Dragging { node, moved: false, .. } => self.click_node(scene, doc, &node),
            InteractionMode::Panning { moved: false } => {
                let tolerance = EDGE_HIT_TOLERANCE / self.transform.scale;
                match scene.edge_at(world, tolerance).cloned() {
                    Some(key) => self.click_edge(scene, doc, &key),
                    None => self.click_background(scene, world),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Pointer left the canvas: a drag in flight is committed at its last
    /// known position, never dropped and never left half-done.
    pub fn pointer_leave(&mut self, doc: &SchemaDocument, positions: &mut PositionMap) -> Vec<CanvasEvent> {
        let mode = std::mem::replace(&mut self.mode, InteractionMode::Idle);
        self.press = None;
        match mode {
            InteractionMode::Dragging { node, current, moved: true, .. } if doc.contains_node(&node) => {
                positions.insert(node.clone(), current);
                vec![CanvasEvent::PositionCommitted { name: node, position: current }]
            }
            _ => Vec::new(),
        }
    }

    // Suppressed while a node is being dragged
    pub fn scroll(&mut self, screen: Pos2, delta_y: f32) {
        if self.is_dragging() || delta_y == 0.0 {
            return;
        }
        self.mode = InteractionMode::Zooming;
        let factor = if delta_y > 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
        self.transform.zoom_about(screen, factor);
    }

    pub fn zoom_in(&mut self, viewport: Vec2) {
        if !self.is_dragging() {
            self.transform.zoom_about((viewport * 0.5).to_pos2(), ZOOM_STEP);
        }
    }

    pub fn zoom_out(&mut self, viewport: Vec2) {
        if !self.is_dragging() {
            self.transform.zoom_about((viewport * 0.5).to_pos2(), 1.0 / ZOOM_STEP);
        }
    }

    pub fn reset_view(&mut self) {
        if !self.is_dragging() {
            self.transform = ViewTransform::default();
        }
    }

    // Double-click never resets the view; explicit controls do that
    pub fn double_click(&mut self) {}

    fn click_node(&mut self, scene: &Scene, doc: &SchemaDocument, name: &str) -> Vec<CanvasEvent> {
        match std::mem::take(&mut self.tool) {
            Tool::AddRelationship { start: None } => {
                self.tool = Tool::AddRelationship { start: Some(name.to_string()) };
                scene.on_node_click(name, doc).into_iter().collect()
            }
            Tool::AddRelationship { start: Some(start) } => {
                let draft = RelationshipDraft { relationship: RelationshipType::new("", start, name) };
                vec![CanvasEvent::CreationRequested(Draft::Relationship(draft))]
            }
            Tool::Delete => vec![CanvasEvent::Command(EditCommand::DeleteNode { name: name.to_string() })],
            tool => {
                self.tool = tool;
                scene.on_node_click(name, doc).into_iter().collect()
            }
        }
    }

    fn click_edge(&mut self, scene: &Scene, doc: &SchemaDocument, key: &super::scene::EdgeKey) -> Vec<CanvasEvent> {
        match std::mem::take(&mut self.tool) {
            Tool::Delete => vec![CanvasEvent::Command(EditCommand::DeleteRelationship(key.rel.clone()))],
            tool => {
                self.tool = tool;
                scene.on_edge_click(key, doc).into_iter().collect()
            }
        }
    }

    fn click_background(&mut self, scene: &Scene, world: Pos2) -> Vec<CanvasEvent> {
        match std::mem::take(&mut self.tool) {
            Tool::AddNode => {
                let draft = NodeDraft { node: NodeType::new(""), position: Some(world) };
                vec![CanvasEvent::CreationRequested(Draft::Node(draft))]
            }
            // Clicking empty space abandons a half-picked relationship
            Tool::AddRelationship { .. } | Tool::Select => vec![scene.on_background_click()],
            Tool::Delete => {
                self.tool = Tool::Delete;
                vec![scene.on_background_click()]
            }
        }
    }
}
