pub mod interaction;
pub mod layout;
pub mod overview;
pub mod scene;

use egui::{Pos2, Vec2};

use crate::schema::{
    EditCommand, NodeDraft, NodeType, PositionMap, RelationshipDraft, RelationshipType, SchemaDocument, Selection,
};
use interaction::{InteractionController, InteractionMode, Tool, ViewTransform};
use layout::SimulationParams;
use overview::Overview;
use scene::{ApproxTextMeasure, Scene, SceneDiff, TextMeasure};

/// Partially filled entity for the form layer to complete.
#[derive(Clone, Debug, PartialEq)]
pub enum Draft {
    Node(NodeDraft),
    Relationship(RelationshipDraft),
}

/// Everything the canvas reports to the document owner. The canvas never
/// edits the document itself.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
    NodeSelected(NodeType),
    RelationshipSelected(RelationshipType),
    SelectionCleared,
    // Exactly one per completed drag
    PositionCommitted { name: String, position: Pos2 },
    // Coordinates computed for nodes that had none
    PositionsFilled(PositionMap),
    CreationRequested(Draft),
    Command(EditCommand),
}

/// The canvas engine: layout, scene graph and interaction, over a local
/// copy of the position map.
pub struct Canvas {
    params: SimulationParams,
    viewport: Vec2,
    positions: PositionMap,
    scene: Scene,
    controller: InteractionController,
    measure: Box<dyn TextMeasure>,
    last_diff: SceneDiff,
}

impl Canvas {
    pub fn new(viewport: Vec2, params: SimulationParams) -> Self {
        Self {
            params,
            viewport,
            positions: PositionMap::new(),
            scene: Scene::new(),
            controller: InteractionController::new(),
            measure: Box::new(ApproxTextMeasure),
            last_diff: SceneDiff::default(),
        }
    }

    pub fn set_text_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
    }

    pub fn params(&self) -> &SimulationParams { &self.params }
    pub fn set_params(&mut self, params: SimulationParams) { self.params = params; }
    pub fn viewport(&self) -> Vec2 { self.viewport }
    pub fn scene(&self) -> &Scene { &self.scene }
    pub fn positions(&self) -> &PositionMap { &self.positions }
    pub fn mode(&self) -> &InteractionMode { self.controller.mode() }
    pub fn tool(&self) -> &Tool { self.controller.tool() }
    pub fn set_tool(&mut self, tool: Tool) { self.controller.set_tool(tool); }
    pub fn transform(&self) -> ViewTransform { self.controller.transform() }
    pub fn last_diff(&self) -> SceneDiff { self.last_diff }

    pub fn resize(&mut self, viewport: Vec2) {
        if viewport.x > 0.0 && viewport.y > 0.0 {
            self.viewport = viewport;
        }
    }

    /// Refreshes the canvas from the owner's state. Missing coordinates are
    /// laid out and reported through `PositionsFilled`; a drag whose node
    /// disappeared is dropped.
    pub fn sync(&mut self, doc: &SchemaDocument, positions: &PositionMap, selection: Option<&Selection>) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        self.controller.abort_if_missing(doc);
        self.positions = positions.clone();

        let filled = layout::fill_missing(doc, &self.positions, self.viewport, &self.params);
        if !filled.is_empty() {
            log::debug!("laid out {} unpositioned node type(s)", filled.len());
            self.positions.extend(filled.iter().map(|(k, v)| (k.clone(), *v)));
            events.push(CanvasEvent::PositionsFilled(filled));
        }

        // A drag in progress keeps its live coordinate
        let mut shown = self.positions.clone();
        if let Some((name, p)) = self.controller.live_drag() {
            shown.insert(name.to_string(), p);
        }
        self.last_diff = self.scene.reconcile(doc, &shown, selection, self.measure.as_ref());
        events
    }

    pub fn set_selection(&mut self, selection: Option<&Selection>) {
        self.scene.set_selection(selection);
    }

    pub fn pointer_down(&mut self, screen: Pos2) {
        self.controller.pointer_down(&self.scene, screen);
    }

    pub fn pointer_move(&mut self, screen: Pos2) {
        self.controller.pointer_move(&mut self.scene, self.measure.as_ref(), screen);
    }

    pub fn pointer_up(&mut self, doc: &SchemaDocument, screen: Pos2) -> Vec<CanvasEvent> {
        self.controller.pointer_up(&mut self.scene, self.measure.as_ref(), doc, &mut self.positions, screen)
    }

    pub fn pointer_leave(&mut self, doc: &SchemaDocument) -> Vec<CanvasEvent> {
        self.controller.pointer_leave(doc, &mut self.positions)
    }

    pub fn scroll(&mut self, screen: Pos2, delta_y: f32) {
        self.controller.scroll(screen, delta_y);
    }

    pub fn double_click(&mut self) {
        self.controller.double_click();
    }

    pub fn zoom_in(&mut self) { self.controller.zoom_in(self.viewport); }
    pub fn zoom_out(&mut self) { self.controller.zoom_out(self.viewport); }
    pub fn reset_view(&mut self) { self.controller.reset_view(); }

    pub fn overview(&self, doc: &SchemaDocument) -> Option<Overview> {
        overview::project(doc, &self.positions)
            .map(|o| o.with_viewport(self.controller.transform(), self.viewport))
    }
}
