#![allow(clippy::collapsible_if)]
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Vec2};

use crate::canvas::interaction::{InteractionMode, Tool, ViewTransform};
use crate::canvas::overview::{Overview, OVERVIEW_SIZE};
use crate::canvas::scene::{
    EdgeVisual, NodeVisual, SceneItem, TextMeasure, BODY_FONT_SIZE, EDGE_COLOR, TITLE_FONT_SIZE,
};
use crate::canvas::Canvas;
use crate::persistence::cache::{self, CacheStore};
use crate::persistence::settings::AppSettings;
use crate::schema::exchange::Imported;
use crate::schema::{
    EditCommand, EditOutcome, NodeDraft, NodeType, PositionMap, Property, PropertyType, RelKey, RelationshipDraft,
    RelationshipType, SchemaDocument, Selection,
};
use crate::session::{Collaborator, SchemaSession};

// Style for toast notifications
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NoticeStyle {
    Subtle,
    Prominent,
    Error,
}

/// Collaborator behind the side panel: it only records that something
/// changed, the panel re-reads the session on the next frame.
#[derive(Default)]
pub struct PanelState {
    reload_editor: bool,
    model_revision: u64,
    positions_revision: u64,
}

impl Collaborator for PanelState {
    fn on_element_selected(&mut self, _selection: Option<&Selection>) {
        self.reload_editor = true;
    }

    fn on_model_update(&mut self, document: &SchemaDocument) {
        self.model_revision += 1;
        log::debug!(
            "model revision {}: {} node type(s), {} relationship type(s)",
            self.model_revision,
            document.node_count(),
            document.relationship_count()
        );
    }

    fn on_positions_update(&mut self, _positions: &PositionMap) {
        self.positions_revision += 1;
    }
}

// Real font metrics for label chips, available once the first frame ran
struct PainterMeasure(egui::Painter);

impl TextMeasure for PainterMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.0
            .layout_no_wrap(text.to_owned(), FontId::proportional(font_size), Color32::WHITE)
            .size()
            .x
    }
}

struct NodeForm {
    name: String,
    labels: String,
    properties: Vec<Property>,
    position: Option<Pos2>,
}

impl NodeForm {
    fn from_node(node: &NodeType, position: Option<Pos2>) -> Self {
        Self {
            name: node.name.clone(),
            labels: node.labels.iter().filter(|l| !l.is_empty()).cloned().collect::<Vec<_>>().join(", "),
            properties: node.properties.clone(),
            position,
        }
    }

    // Labels default to the type name when left blank
    fn to_node(&self) -> NodeType {
        let name = self.name.trim().to_string();
        let mut labels: Vec<String> = self
            .labels
            .split(',')
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if labels.is_empty() {
            labels.push(name.clone());
        }
        NodeType { name, labels, properties: trimmed(&self.properties) }
    }
}

struct RelForm {
    name: String,
    start_node: String,
    end_node: String,
    properties: Vec<Property>,
}

impl RelForm {
    fn from_rel(rel: &RelationshipType) -> Self {
        Self {
            name: rel.name.clone(),
            start_node: rel.start_node.clone(),
            end_node: rel.end_node.clone(),
            properties: rel.properties.clone(),
        }
    }

    fn to_rel(&self) -> RelationshipType {
        RelationshipType {
            name: self.name.trim().to_string(),
            start_node: self.start_node.clone(),
            end_node: self.end_node.clone(),
            properties: trimmed(&self.properties),
        }
    }
}

fn trimmed(props: &[Property]) -> Vec<Property> {
    props
        .iter()
        .map(|p| Property { name: p.name.trim().to_string(), ..p.clone() })
        .collect()
}

enum Editor {
    None,
    Node { existing: Option<String>, form: NodeForm },
    Relationship { existing: Option<RelKey>, form: RelForm },
}

pub struct SchemaApp {
    session: SchemaSession<PanelState>,
    settings: AppSettings,
    editor: Editor,
    // Canvas placement and pointer tracking
    canvas_rect: Option<Rect>,
    canvas_pressed: bool,
    measure_ready: bool,
    // Import/export path buffers
    import_path: String,
    export_path: String,
    // Preferences window
    show_prefs_window: bool,
    prefs_edit: AppSettings,
    prefs_cache_override_str: String,
    prefs_export_override_str: String,
    prefs_status: Option<String>,
    // Transient info toast
    last_info: Option<String>,
    last_info_time: Option<Instant>,
    last_info_style: NoticeStyle,
}

impl SchemaApp {
    pub fn new(state: Imported, settings: AppSettings, cache: Option<CacheStore>) -> Self {
        let canvas = Canvas::new(Vec2::new(1000.0, 700.0), settings.simulation.clone());
        let mut session = SchemaSession::new(state, canvas, PanelState::default());
        if let Some(cache) = cache {
            session = session.with_cache(cache);
        }
        let export_path = cache::export_path_now(&settings.export_dir()).display().to_string();
        Self {
            session,
            prefs_edit: settings.clone(),
            settings,
            editor: Editor::None,
            canvas_rect: None,
            canvas_pressed: false,
            measure_ready: false,
            import_path: String::new(),
            export_path,
            show_prefs_window: false,
            prefs_cache_override_str: String::new(),
            prefs_export_override_str: String::new(),
            prefs_status: None,
            last_info: None,
            last_info_time: None,
            last_info_style: NoticeStyle::Subtle,
        }
    }

    fn notify(&mut self, msg: impl Into<String>, style: NoticeStyle) {
        self.last_info = Some(msg.into());
        self.last_info_time = Some(Instant::now());
        self.last_info_style = style;
    }

    fn report(&mut self, outcome: EditOutcome) {
        let style = if outcome.success { NoticeStyle::Subtle } else { NoticeStyle::Error };
        self.notify(outcome.message, style);
    }

    fn report_failures(&mut self, outcomes: Vec<EditOutcome>) {
        for o in outcomes.into_iter().filter(|o| !o.success) {
            self.report(o);
        }
    }

    // Rebuilds the form buffers from the session's current selection
    fn load_editor(&mut self) {
        let doc = self.session.document();
        self.editor = match self.session.selection() {
            None => Editor::None,
            Some(Selection::Node(name)) => match doc.node(name) {
                Some(n) => Editor::Node { existing: Some(name.clone()), form: NodeForm::from_node(n, None) },
                None => Editor::None,
            },
            Some(Selection::Relationship(key)) => match doc.relationship(key) {
                Some(r) => Editor::Relationship { existing: Some(key.clone()), form: RelForm::from_rel(r) },
                None => Editor::None,
            },
            Some(Selection::PendingNode(d)) => Editor::Node { existing: None, form: NodeForm::from_node(&d.node, d.position) },
            Some(Selection::PendingRelationship(d)) => Editor::Relationship {
                existing: None,
                form: RelForm::from_rel(&d.relationship),
            },
        };
    }

    fn begin_new_node(&mut self) {
        let draft = NodeDraft { node: NodeType::new(""), position: None };
        self.session.select(Some(Selection::PendingNode(draft)));
    }

    fn begin_new_relationship(&mut self) {
        let first = self.session.document().node_types.first().map(|n| n.name.clone()).unwrap_or_default();
        let draft = RelationshipDraft { relationship: RelationshipType::new("", first.clone(), first) };
        self.session.select(Some(Selection::PendingRelationship(draft)));
    }

    pub fn menu_import(&mut self) {
        let path = PathBuf::from(self.import_path.trim());
        if path.as_os_str().is_empty() {
            self.notify("Enter a path to import", NoticeStyle::Error);
            return;
        }
        let outcome = self.session.import_file(&path);
        self.report(outcome);
    }

    pub fn menu_export(&mut self) {
        let path = if self.export_path.trim().is_empty() {
            cache::export_path_now(&self.settings.export_dir())
        } else {
            PathBuf::from(self.export_path.trim())
        };
        let outcome = self.session.export_file(&path);
        self.report(outcome);
    }

    pub fn menu_load_example(&mut self) {
        self.session.load(Imported { document: SchemaDocument::example(), positions: PositionMap::new() });
        self.notify("Loaded example schema", NoticeStyle::Prominent);
    }

    pub fn menu_reset_view(&mut self) {
        self.session.canvas_mut().reset_view();
    }

    pub fn menu_open_prefs(&mut self) {
        self.prefs_edit = self.settings.clone();
        self.prefs_cache_override_str = match &self.prefs_edit.cache_override {
            Some(p) => p.display().to_string(),
            None => String::new(),
        };
        self.prefs_export_override_str = match &self.prefs_edit.export_override {
            Some(p) => p.display().to_string(),
            None => String::new(),
        };
        self.prefs_status = None;
        self.show_prefs_window = true;
    }

    fn prefs_window(&mut self, ctx: &egui::Context) {
        if !self.show_prefs_window {
            return;
        }
        let mut open = true;
        let mut save = false;
        egui::Window::new("Preferences").open(&mut open).resizable(false).show(ctx, |ui| {
            ui.checkbox(&mut self.prefs_edit.overview_enabled, "Show overview map");
            ui.separator();
            ui.label("Cache directory (empty for OS default)");
            ui.add(egui::TextEdit::singleline(&mut self.prefs_cache_override_str).hint_text(
                AppSettings::default().cache_dir().display().to_string(),
            ));
            ui.label("Export directory (empty for OS temp)");
            ui.add(egui::TextEdit::singleline(&mut self.prefs_export_override_str).hint_text(
                AppSettings::export_default_dir().display().to_string(),
            ));
            ui.separator();
            egui::CollapsingHeader::new("Layout simulation").default_open(false).show(ui, |ui| {
                let sim = &mut self.prefs_edit.simulation;
                egui::Grid::new("sim_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Link distance");
                    ui.add(egui::DragValue::new(&mut sim.link_distance).range(10.0..=1000.0));
                    ui.end_row();
                    ui.label("Charge strength");
                    ui.add(egui::DragValue::new(&mut sim.charge_strength).range(-5000.0..=0.0));
                    ui.end_row();
                    ui.label("Center strength");
                    ui.add(egui::DragValue::new(&mut sim.center_strength).speed(0.01).range(0.0..=1.0));
                    ui.end_row();
                    ui.label("Collision radius");
                    ui.add(egui::DragValue::new(&mut sim.collision_radius).range(0.0..=400.0));
                    ui.end_row();
                    ui.label("Alpha decay");
                    ui.add(egui::DragValue::new(&mut sim.alpha_decay).speed(0.005).range(0.001..=1.0));
                    ui.end_row();
                    ui.label("Velocity decay");
                    ui.add(egui::DragValue::new(&mut sim.velocity_decay).speed(0.01).range(0.0..=1.0));
                    ui.end_row();
                    ui.label("Max iterations");
                    ui.add(egui::DragValue::new(&mut sim.max_iterations).range(1..=5000));
                    ui.end_row();
                    ui.label("Energy threshold");
                    ui.add(egui::DragValue::new(&mut sim.energy_threshold).speed(0.001).range(0.0..=10.0));
                    ui.end_row();
                });
            });
            ui.separator();
            if ui.button("Save").clicked() {
                save = true;
            }
            if let Some(msg) = &self.prefs_status {
                ui.small(msg.clone());
            }
        });
        if save {
            let to_path = |s: &str| {
                let s = s.trim();
                if s.is_empty() { None } else { Some(PathBuf::from(s)) }
            };
            self.prefs_edit.cache_override = to_path(&self.prefs_cache_override_str);
            self.prefs_edit.export_override = to_path(&self.prefs_export_override_str);
            match self.prefs_edit.save() {
                Ok(()) => {
                    self.settings = self.prefs_edit.clone();
                    self.session.canvas_mut().set_params(self.settings.simulation.clone());
                    self.prefs_status = Some(format!("Saved to {}", AppSettings::settings_path().display()));
                }
                Err(e) => self.prefs_status = Some(format!("Save failed: {}", e)),
            }
        }
        if !open {
            self.show_prefs_window = false;
        }
    }

    fn tool_bar(&mut self, ui: &mut egui::Ui) {
        let current = self.session.canvas().tool().clone();
        ui.horizontal_wrapped(|ui| {
            if ui.selectable_label(current == Tool::Select, "Select").clicked() {
                self.session.canvas_mut().set_tool(Tool::Select);
            }
            if ui.selectable_label(current == Tool::AddNode, "Add node").clicked() {
                self.session.canvas_mut().set_tool(Tool::AddNode);
            }
            let rel_active = matches!(current, Tool::AddRelationship { .. });
            if ui.selectable_label(rel_active, "Add relationship").clicked() {
                self.session.canvas_mut().set_tool(Tool::AddRelationship { start: None });
            }
            if ui.selectable_label(current == Tool::Delete, "Delete").clicked() {
                self.session.canvas_mut().set_tool(Tool::Delete);
            }
        });
        let hint = match &current {
            Tool::Select => "Click to select, drag to move or pan",
            Tool::AddNode => "Click empty canvas to place a node type",
            Tool::AddRelationship { start: None } => "Click the start node",
            Tool::AddRelationship { start: Some(_) } => "Click the end node",
            Tool::Delete => "Click a node or relationship to delete it",
        };
        ui.small(hint);
        ui.horizontal(|ui| {
            if ui.button("-").on_hover_text("Zoom out").clicked() {
                self.session.canvas_mut().zoom_out();
            }
            ui.label(format!("{:.0}%", self.session.canvas().transform().scale * 100.0));
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.session.canvas_mut().zoom_in();
            }
            if ui.button("Reset view").clicked() {
                self.menu_reset_view();
            }
        });
    }

    fn element_lists(&mut self, ui: &mut egui::Ui) {
        let mut pick: Option<Selection> = None;
        egui::CollapsingHeader::new(format!("Node types ({})", self.session.document().node_count()))
            .default_open(true)
            .show(ui, |ui| {
                for node in &self.session.document().node_types {
                    let sel = self.session.selection().is_some_and(|s| s.is_node(&node.name));
                    if ui.selectable_label(sel, node.name.as_str()).clicked() {
                        pick = Some(Selection::Node(node.name.clone()));
                    }
                }
            });
        egui::CollapsingHeader::new(format!("Relationships ({})", self.session.document().relationship_count()))
            .default_open(true)
            .show(ui, |ui| {
                for rel in &self.session.document().relationship_types {
                    let key = rel.key();
                    let sel = self.session.selection().is_some_and(|s| s.is_relationship(&key));
                    if ui.selectable_label(sel, key.to_string()).clicked() {
                        pick = Some(Selection::Relationship(key));
                    }
                }
            });
        if let Some(sel) = pick {
            self.session.select(Some(sel));
        }
        ui.horizontal(|ui| {
            if ui.button("New node type").clicked() {
                self.begin_new_node();
            }
            let can_link = self.session.document().node_count() > 0;
            if ui.add_enabled(can_link, egui::Button::new("New relationship")).clicked() {
                self.begin_new_relationship();
            }
        });
    }

    fn editor_ui(&mut self, ui: &mut egui::Ui) {
        let node_names: Vec<String> = self.session.document().node_types.iter().map(|n| n.name.clone()).collect();
        let mut command: Option<EditCommand> = None;
        let mut cancel = false;
        match &mut self.editor {
            Editor::None => {
                ui.weak("Nothing selected");
            }
            Editor::Node { existing, form } => {
                ui.heading(if existing.is_some() { "Node type" } else { "New node type" });
                egui::Grid::new("node_form").num_columns(2).show(ui, |ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut form.name);
                    ui.end_row();
                    ui.label("Labels");
                    ui.add(egui::TextEdit::singleline(&mut form.labels).hint_text("comma separated"));
                    ui.end_row();
                });
                properties_ui(ui, "node_props", &mut form.properties);
                ui.horizontal(|ui| {
                    let label = if existing.is_some() { "Apply" } else { "Create" };
                    if ui.button(label).clicked() {
                        let node = form.to_node();
                        command = Some(match existing {
                            Some(name) => EditCommand::UpdateNode { name: name.clone(), node },
                            None => EditCommand::AddNode { node, position: form.position },
                        });
                    }
                    match existing {
                        Some(name) => {
                            if ui.button("Delete").clicked() {
                                command = Some(EditCommand::DeleteNode { name: name.clone() });
                            }
                        }
                        None => {
                            if ui.button("Cancel").clicked() {
                                cancel = true;
                            }
                        }
                    }
                });
            }
            Editor::Relationship { existing, form } => {
                ui.heading(if existing.is_some() { "Relationship" } else { "New relationship" });
                egui::Grid::new("rel_form").num_columns(2).show(ui, |ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut form.name);
                    ui.end_row();
                    ui.label("Start");
                    node_combo(ui, "rel_start", &mut form.start_node, &node_names);
                    ui.end_row();
                    ui.label("End");
                    node_combo(ui, "rel_end", &mut form.end_node, &node_names);
                    ui.end_row();
                });
                properties_ui(ui, "rel_props", &mut form.properties);
                ui.horizontal(|ui| {
                    let label = if existing.is_some() { "Apply" } else { "Create" };
                    if ui.button(label).clicked() {
                        let relationship = form.to_rel();
                        command = Some(match existing {
                            Some(key) => EditCommand::UpdateRelationship { key: key.clone(), relationship },
                            None => EditCommand::AddRelationship(relationship),
                        });
                    }
                    match existing {
                        Some(key) => {
                            if ui.button("Delete").clicked() {
                                command = Some(EditCommand::DeleteRelationship(key.clone()));
                            }
                        }
                        None => {
                            if ui.button("Cancel").clicked() {
                                cancel = true;
                            }
                        }
                    }
                });
            }
        }
        if cancel {
            self.session.cancel_pending();
        }
        if let Some(cmd) = command {
            let outcome = self.session.apply(cmd);
            if outcome.success {
                // Pick up renamed keys and normalised values
                self.load_editor();
            }
            self.report(outcome);
        }
    }

    fn exchange_ui(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Import / Export").default_open(false).show(ui, |ui| {
            ui.label("Import from");
            ui.add(egui::TextEdit::singleline(&mut self.import_path).hint_text("/path/to/schema.json"));
            if ui.button("Import").clicked() {
                self.menu_import();
            }
            ui.separator();
            ui.label("Export to");
            ui.text_edit_singleline(&mut self.export_path);
            ui.horizontal(|ui| {
                if ui.button("Export").clicked() {
                    self.menu_export();
                }
                if ui.button("New file name").clicked() {
                    self.export_path = cache::export_path_now(&self.settings.export_dir()).display().to_string();
                }
            });
        });
        let state = self.session.collaborator();
        ui.small(format!("model rev {}, layout rev {}", state.model_revision, state.positions_revision));
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        if self.canvas_rect.map(|r| r.size()) != Some(rect.size()) {
            self.session.canvas_mut().resize(rect.size());
        }
        self.canvas_rect = Some(rect);
        if !self.measure_ready {
            self.session.canvas_mut().set_text_measure(Box::new(PainterMeasure(painter.clone())));
            self.measure_ready = true;
            self.session.resync();
        }

        // Canvas-local screen coordinates
        let origin = rect.min;
        let local = |p: Pos2| (p - origin).to_pos2();
        let (pressed, released, hover, scroll, double) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.hover_pos(),
                i.raw_scroll_delta.y,
                i.pointer.button_double_clicked(egui::PointerButton::Primary),
            )
        });
        let hovered = response.hovered();

        if pressed && hovered {
            if let Some(p) = hover {
                self.session.pointer_down(local(p));
                self.canvas_pressed = true;
            }
        }
        if self.canvas_pressed {
            let outcomes = match hover {
                Some(p) => {
                    self.session.pointer_move(local(p));
                    if released {
                        self.canvas_pressed = false;
                        self.session.pointer_up(local(p))
                    } else {
                        Vec::new()
                    }
                }
                // Pointer left the window mid-gesture
                None => {
                    self.canvas_pressed = false;
                    self.session.pointer_leave()
                }
            };
            self.report_failures(outcomes);
            ui.ctx().request_repaint();
        }
        if hovered && scroll != 0.0 {
            if let Some(p) = hover {
                self.session.canvas_mut().scroll(local(p), scroll);
                ui.ctx().request_repaint_after(Duration::from_millis(16));
            }
        }
        if hovered && double {
            self.session.canvas_mut().double_click();
        }
        if hovered && ui.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.canvas_mut().set_tool(Tool::Select);
            self.session.cancel_pending();
        }

        painter.rect_filled(rect, 0.0, Color32::from_gray(245));
        let t = self.session.canvas().transform();
        for item in self.session.canvas().scene().paint_order() {
            match item {
                SceneItem::Edge(e) => paint_edge(&painter, e, origin, t),
                SceneItem::Node(v) => paint_node(&painter, v, origin, t),
            }
        }
        if let InteractionMode::Dragging { .. } = self.session.canvas().mode() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        }
    }

    fn overview_window(&self, ctx: &egui::Context) {
        if !self.settings.overview_enabled {
            return;
        }
        let Some(overview) = self.session.canvas().overview(self.session.document()) else { return };
        egui::Area::new("overview_map".into())
            .anchor(Align2::RIGHT_TOP, egui::vec2(-12.0, 40.0))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).inner_margin(egui::Margin::same(4)).show(ui, |ui| {
                    let (resp, painter) = ui.allocate_painter(Vec2::splat(OVERVIEW_SIZE), Sense::hover());
                    paint_overview(&painter, &overview, resp.rect);
                });
            });
    }

    fn toast(&self, ctx: &egui::Context) {
        // Bottom-right transient info toast (visible for 3 seconds)
        let (Some(msg), Some(when)) = (&self.last_info, self.last_info_time) else { return };
        if Instant::now().duration_since(when) > Duration::from_secs(3) {
            return;
        }
        egui::Area::new("bottom_right_toast".into())
            .anchor(Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .interactable(false)
            .show(ctx, |ui| {
                let (fill, text_col) = match self.last_info_style {
                    NoticeStyle::Subtle => (Color32::from_rgba_premultiplied(20, 20, 20, 170), Color32::from_gray(200)),
                    NoticeStyle::Prominent => (Color32::from_rgba_premultiplied(30, 30, 30, 230), Color32::LIGHT_GREEN),
                    NoticeStyle::Error => (Color32::from_rgba_premultiplied(60, 20, 20, 230), Color32::LIGHT_RED),
                };
                egui::Frame::popup(ui.style())
                    .corner_radius(egui::CornerRadius::same(8))
                    .fill(fill)
                    .inner_margin(egui::Margin::symmetric(10, 6))
                    .show(ui, |ui| {
                        ui.colored_label(text_col, msg.as_str());
                    });
            });
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

fn node_combo(ui: &mut egui::Ui, id: &str, value: &mut String, names: &[String]) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.as_str())
        .show_ui(ui, |ui| {
            for n in names {
                ui.selectable_value(value, n.clone(), n.as_str());
            }
        });
}

fn properties_ui(ui: &mut egui::Ui, id: &str, props: &mut Vec<Property>) {
    ui.label("Properties");
    let mut remove = None;
    for (i, p) in props.iter_mut().enumerate() {
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut p.name).desired_width(90.0).hint_text("name"));
            egui::ComboBox::from_id_salt((id, i))
                .selected_text(p.kind.as_str())
                .width(60.0)
                .show_ui(ui, |ui| {
                    for kind in PropertyType::ALL {
                        ui.selectable_value(&mut p.kind, kind, kind.as_str());
                    }
                });
            ui.checkbox(&mut p.required, "required");
            if ui.small_button("x").clicked() {
                remove = Some(i);
            }
        });
        ui.add(egui::TextEdit::singleline(&mut p.description).hint_text("description"));
    }
    if let Some(i) = remove {
        props.remove(i);
    }
    if ui.small_button("+ property").clicked() {
        props.push(Property::new("", PropertyType::Str, false));
    }
}

fn to_screen(origin: Pos2, t: ViewTransform, p: Pos2) -> Pos2 {
    origin + t.world_to_screen(p).to_vec2()
}

fn paint_node(painter: &egui::Painter, v: &NodeVisual, origin: Pos2, t: ViewTransform) {
    let map = |p: Pos2| to_screen(origin, t, p);
    let s = t.scale;
    let r = v.rect();
    let rect = Rect::from_min_max(map(r.min), map(r.max));
    let h = v.header_rect();
    let header = Rect::from_min_max(map(h.min), map(h.max));
    painter.rect_filled(rect, 4.0 * s, Color32::WHITE);
    painter.rect_filled(header, 0.0, v.header_color);
    painter.rect_stroke(rect, 4.0 * s, Stroke::new(v.stroke_width * s, Color32::from_gray(60)), egui::StrokeKind::Inside);
    painter.text(map(v.title_pos()), Align2::CENTER_CENTER, &v.name, FontId::proportional(TITLE_FONT_SIZE * s), Color32::WHITE);
    painter.text(
        map(v.labels_pos()),
        Align2::LEFT_BOTTOM,
        &v.labels_line,
        FontId::proportional(BODY_FONT_SIZE * s),
        Color32::from_gray(70),
    );
    let [a, b] = v.separator();
    painter.line_segment([map(a), map(b)], Stroke::new(1.0, Color32::from_gray(200)));
    for (i, line) in v.property_lines.iter().enumerate() {
        painter.text(
            map(v.property_pos(i)),
            Align2::LEFT_TOP,
            line,
            FontId::proportional(BODY_FONT_SIZE * s),
            Color32::from_gray(30),
        );
    }
}

fn paint_edge(painter: &egui::Painter, e: &EdgeVisual, origin: Pos2, t: ViewTransform) {
    let map = |p: Pos2| to_screen(origin, t, p);
    let s = t.scale;
    let points: Vec<Pos2> = e.path.points().into_iter().map(map).collect();
    painter.add(Shape::line(points, Stroke::new(e.stroke_width * s, EDGE_COLOR)));
    painter.add(Shape::convex_polygon(e.arrow.iter().map(|p| map(*p)).collect(), EDGE_COLOR, Stroke::NONE));
    let chip = Rect::from_min_max(map(e.chip.min), map(e.chip.max));
    painter.rect_filled(chip, 3.0 * s, Color32::WHITE);
    painter.rect_stroke(chip, 3.0 * s, Stroke::new(1.0, EDGE_COLOR), egui::StrokeKind::Inside);
    painter.text(map(e.label_pos), Align2::CENTER_CENTER, &e.label, FontId::proportional(BODY_FONT_SIZE * s), EDGE_COLOR);
}

fn paint_overview(painter: &egui::Painter, overview: &Overview, rect: Rect) {
    let map = |p: Pos2| rect.min + p.to_vec2();
    painter.rect_filled(rect, 0.0, Color32::WHITE);
    painter.rect_stroke(rect, 0.0, Stroke::new(1.0, Color32::from_gray(220)), egui::StrokeKind::Inside);
    let edge_stroke = Stroke::new(1.0, EDGE_COLOR.gamma_multiply(0.7));
    for [a, b] in &overview.edges {
        painter.line_segment([map(*a), map(*b)], edge_stroke);
    }
    for n in &overview.nodes {
        let r = Rect::from_min_max(map(n.rect.min), map(n.rect.max));
        painter.rect_filled(r, 0.0, n.color.gamma_multiply(0.7));
    }
    if let Some(frame) = overview.viewport_frame {
        let frame = Rect::from_min_max(map(frame.min), map(frame.max)).intersect(rect);
        painter.add(Shape::dashed_line(
            &[frame.left_top(), frame.right_top(), frame.right_bottom(), frame.left_bottom(), frame.left_top()],
            Stroke::new(1.0, Color32::from_gray(50)),
            2.0,
            2.0,
        ));
    }
}

impl eframe::App for SchemaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.session.collaborator().reload_editor {
            self.session.collaborator_mut().reload_editor = false;
            self.load_editor();
        }

        self.prefs_window(ctx);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::E))) {
                self.menu_export();
            }
            ui.horizontal(|ui| {
                ui.label("Schema-Loom");
                ui.menu_button("File", |ui| {
                    if ui.button("Export").clicked() {
                        self.menu_export();
                        ui.close();
                    }
                    if ui.button("Load example schema").clicked() {
                        self.menu_load_example();
                        ui.close();
                    }
                    if ui.button("Clear cache").clicked() {
                        match self.session.cache().map(CacheStore::clear) {
                            Some(Ok(())) => self.notify("Cache cleared", NoticeStyle::Subtle),
                            Some(Err(e)) => self.notify(format!("Clear failed: {}", e), NoticeStyle::Error),
                            None => {}
                        }
                        ui.close();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Reset view").clicked() {
                        self.menu_reset_view();
                        ui.close();
                    }
                    ui.checkbox(&mut self.settings.overview_enabled, "Overview map");
                });
                ui.menu_button("Settings", |ui| {
                    if ui.button("Preferences").clicked() {
                        self.menu_open_prefs();
                        ui.close();
                    }
                });
            });
        });

        egui::SidePanel::left("schema_panel").resizable(true).default_width(300.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                self.tool_bar(ui);
                ui.separator();
                self.element_lists(ui);
                ui.separator();
                self.editor_ui(ui);
                ui.separator();
                self.exchange_ui(ui);
            });
        });

        egui::CentralPanel::default().frame(egui::Frame::NONE).show(ctx, |ui| {
            self.canvas_ui(ui);
        });

        self.overview_window(ctx);
        self.toast(ctx);
    }
}
