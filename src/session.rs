use std::path::Path;

use egui::Pos2;

use crate::canvas::{Canvas, CanvasEvent, Draft};
use crate::persistence::cache::{self, CacheStore};
use crate::schema::exchange::{self, Imported};
use crate::schema::{self, EditCommand, EditOutcome, PositionMap, RelKey, SchemaDocument, Selection};

/// Receives the session's notifications. Every hook defaults to a no-op so a
/// collaborator only implements what it listens to.
pub trait Collaborator {
    fn on_element_selected(&mut self, _selection: Option<&Selection>) {}
    fn on_model_update(&mut self, _document: &SchemaDocument) {}
    fn on_positions_update(&mut self, _positions: &PositionMap) {}
}

pub struct NoopCollaborator;

impl Collaborator for NoopCollaborator {}

/// Single owner of the document, positions and selection. The canvas and
/// the forms only hand it commands and events.
pub struct SchemaSession<C: Collaborator = NoopCollaborator> {
    document: SchemaDocument,
    positions: PositionMap,
    selection: Option<Selection>,
    canvas: Canvas,
    collaborator: C,
    cache: Option<CacheStore>,
    // Layout filled in before a cache was attached
    unsaved_layout: bool,
}

impl<C: Collaborator> SchemaSession<C> {
    pub fn new(state: Imported, canvas: Canvas, collaborator: C) -> Self {
        let mut session = Self {
            document: state.document,
            positions: state.positions,
            selection: None,
            canvas,
            collaborator,
            cache: None,
            unsaved_layout: false,
        };
        if session.refresh() {
            let positions = &session.positions;
            session.collaborator.on_positions_update(positions);
            session.unsaved_layout = true;
        }
        session
    }

    /// Autosave every committed change into `cache`. A layout computed at
    /// start-up is written right away.
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        if std::mem::take(&mut self.unsaved_layout) {
            self.autosave();
        }
        self
    }

    pub fn document(&self) -> &SchemaDocument { &self.document }
    pub fn positions(&self) -> &PositionMap { &self.positions }
    pub fn selection(&self) -> Option<&Selection> { self.selection.as_ref() }
    pub fn canvas(&self) -> &Canvas { &self.canvas }
    pub fn canvas_mut(&mut self) -> &mut Canvas { &mut self.canvas }
    pub fn collaborator(&self) -> &C { &self.collaborator }
    pub fn collaborator_mut(&mut self) -> &mut C { &mut self.collaborator }
    pub fn cache(&self) -> Option<&CacheStore> { self.cache.as_ref() }

    // Re-syncs the canvas and absorbs positions it filled in. Returns true
    // when the position map grew.
    fn refresh(&mut self) -> bool {
        let events = self.canvas.sync(&self.document, &self.positions, self.selection.as_ref());
        let mut grew = false;
        for ev in events {
            if let CanvasEvent::PositionsFilled(filled) = ev {
                for (name, p) in filled {
                    if !self.positions.contains_key(&name) {
                        self.positions.insert(name, p);
                        grew = true;
                    }
                }
            }
        }
        grew
    }

    /// Re-syncs the canvas after a viewport or text metrics change.
    pub fn resync(&mut self) {
        if self.refresh() {
            self.collaborator.on_positions_update(&self.positions);
            self.autosave();
        }
    }

    fn autosave(&self) {
        if let Some(cache) = &self.cache {
            match cache.save(&self.document, &self.positions) {
                Ok(path) => log::debug!("cached session to {}", path.display()),
                Err(e) => log::warn!("failed to cache session: {:#}", e),
            }
        }
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
        self.canvas.set_selection(self.selection.as_ref());
        self.collaborator.on_element_selected(self.selection.as_ref());
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.set_selection(selection);
    }

    /// Drops a pending creation draft, if any.
    pub fn cancel_pending(&mut self) {
        if self.selection.as_ref().is_some_and(Selection::is_pending) {
            self.set_selection(None);
        }
    }

    // Where the selection ends up once `cmd` succeeds
    fn selection_after(&self, cmd: &EditCommand) -> Option<Selection> {
        let current = self.selection.clone()?;
        match (cmd, current) {
            (EditCommand::AddNode { .. } | EditCommand::AddRelationship(_), s) if s.is_pending() => None,
            (EditCommand::UpdateNode { name, node }, Selection::Node(sel)) if sel == *name => {
                Some(Selection::Node(node.name.clone()))
            }
            (EditCommand::UpdateNode { name, node }, Selection::Relationship(key)) => {
                let rename = |n: &String| if n == name { node.name.clone() } else { n.clone() };
                Some(Selection::Relationship(RelKey::new(
                    key.name.clone(),
                    rename(&key.start_node),
                    rename(&key.end_node),
                )))
            }
            (EditCommand::UpdateRelationship { key, relationship }, Selection::Relationship(sel)) if sel == *key => {
                Some(Selection::Relationship(relationship.key()))
            }
            (_, s) => Some(s),
        }
    }

    fn selection_valid(&self, selection: &Selection) -> bool {
        match selection {
            Selection::Node(name) => self.document.contains_node(name),
            Selection::Relationship(key) => self.document.relationship(key).is_some(),
            Selection::PendingNode(_) => true,
            Selection::PendingRelationship(d) => {
                self.document.contains_node(&d.relationship.start_node) && self.document.contains_node(&d.relationship.end_node)
            }
        }
    }

    /// Applies one edit atomically. On rejection the document, positions and
    /// selection are left exactly as they were.
    pub fn apply(&mut self, cmd: EditCommand) -> EditOutcome {
        let description = cmd.describe();
        let next_selection = self.selection_after(&cmd);
        let change = match schema::apply(&mut self.document, &mut self.positions, cmd) {
            Ok(change) => change,
            Err(e) => {
                log::info!("rejected {}: {}", description, e);
                return EditOutcome::failed(e.to_string());
            }
        };

        let next_selection = next_selection.filter(|s| self.selection_valid(s));
        if next_selection != self.selection {
            self.set_selection(next_selection);
        }
        if change.model {
            self.collaborator.on_model_update(&self.document);
        }
        let grew = self.refresh();
        if change.positions || grew {
            self.collaborator.on_positions_update(&self.positions);
        }
        self.autosave();
        EditOutcome::ok(description)
    }

    /// Routes canvas events. Returns the outcome of every command an event
    /// turned into.
    pub fn handle(&mut self, events: Vec<CanvasEvent>) -> Vec<EditOutcome> {
        let mut outcomes = Vec::new();
        for ev in events {
            match ev {
                CanvasEvent::NodeSelected(node) => self.set_selection(Some(Selection::Node(node.name))),
                CanvasEvent::RelationshipSelected(rel) => self.set_selection(Some(Selection::Relationship(rel.key()))),
                CanvasEvent::SelectionCleared => self.set_selection(None),
                CanvasEvent::PositionCommitted { name, position } => {
                    outcomes.push(self.apply(EditCommand::SetPosition { name, position }));
                }
                CanvasEvent::PositionsFilled(filled) => {
                    let before = self.positions.len();
                    for (name, p) in filled {
                        self.positions.entry(name).or_insert(p);
                    }
                    if self.positions.len() != before {
                        self.collaborator.on_positions_update(&self.positions);
                        self.autosave();
                    }
                }
                CanvasEvent::CreationRequested(Draft::Node(draft)) => {
                    self.set_selection(Some(Selection::PendingNode(draft)));
                }
                CanvasEvent::CreationRequested(Draft::Relationship(draft)) => {
                    self.set_selection(Some(Selection::PendingRelationship(draft)));
                }
                CanvasEvent::Command(cmd) => outcomes.push(self.apply(cmd)),
            }
        }
        outcomes
    }

    pub fn pointer_down(&mut self, screen: Pos2) {
        self.canvas.pointer_down(screen);
    }

    pub fn pointer_move(&mut self, screen: Pos2) {
        self.canvas.pointer_move(screen);
    }

    pub fn pointer_up(&mut self, screen: Pos2) -> Vec<EditOutcome> {
        let events = self.canvas.pointer_up(&self.document, screen);
        self.handle(events)
    }

    pub fn pointer_leave(&mut self) -> Vec<EditOutcome> {
        let events = self.canvas.pointer_leave(&self.document);
        self.handle(events)
    }

    /// Replaces the whole session state with an imported document. A
    /// rejected document leaves everything untouched.
    pub fn import_json(&mut self, text: &str) -> EditOutcome {
        match exchange::import_str(text) {
            Ok(state) => {
                self.load(state);
                let msg = format!(
                    "imported {} node type(s) and {} relationship type(s)",
                    self.document.node_count(),
                    self.document.relationship_count()
                );
                log::info!("{}", msg);
                EditOutcome::ok(msg)
            }
            Err(e) => {
                log::warn!("import rejected: {}", e);
                EditOutcome::failed(e.to_string())
            }
        }
    }

    pub fn import_file(&mut self, path: &Path) -> EditOutcome {
        match std::fs::read_to_string(path) {
            Ok(text) => self.import_json(&text),
            Err(e) => {
                log::warn!("cannot read {}: {}", path.display(), e);
                EditOutcome::failed(format!("cannot read {}: {}", path.display(), e))
            }
        }
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        exchange::export_string(&self.document, &self.positions)
    }

    pub fn export_file(&self, path: &Path) -> EditOutcome {
        match cache::export_to_path(path, &self.document, &self.positions) {
            Ok(()) => EditOutcome::ok(format!("exported to {}", path.display())),
            Err(e) => {
                log::warn!("export to {} failed: {:#}", path.display(), e);
                EditOutcome::failed(e.to_string())
            }
        }
    }

    /// Swaps in a whole new document and layout, clearing the selection.
    pub fn load(&mut self, state: Imported) {
        self.document = state.document;
        self.positions = state.positions;
        self.set_selection(None);
        self.collaborator.on_model_update(&self.document);
        self.refresh();
        self.collaborator.on_positions_update(&self.positions);
        self.autosave();
    }
}
