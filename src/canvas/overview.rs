use egui::{Color32, Pos2, Rect, Vec2};

use super::interaction::ViewTransform;
use super::scene::header_color;
use crate::schema::{PositionMap, SchemaDocument};

pub const OVERVIEW_SIZE: f32 = 100.0;
pub const OVERVIEW_MARGIN: f32 = 100.0;
pub const MARKER_SIZE: f32 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct OverviewNode {
    pub name: String,
    pub rect: Rect,
    pub color: Color32,
}

/// Scaled-down projection of every positioned node type and relationship,
/// in overview-local coordinates (0..OVERVIEW_SIZE on both axes).
#[derive(Clone, Debug, PartialEq)]
pub struct Overview {
    pub scale: f32,
    pub origin: Pos2,
    pub nodes: Vec<OverviewNode>,
    pub edges: Vec<[Pos2; 2]>,
    pub viewport_frame: Option<Rect>,
}

impl Overview {
    pub fn size(&self) -> Vec2 {
        Vec2::splat(OVERVIEW_SIZE)
    }

    pub fn project_point(&self, world: Pos2) -> Pos2 {
        ((world - self.origin) * self.scale).to_pos2()
    }

    /// Adds the frame of the currently visible canvas area.
    pub fn with_viewport(mut self, transform: ViewTransform, viewport: Vec2) -> Self {
        let min = transform.screen_to_world(Pos2::ZERO);
        let max = transform.screen_to_world(viewport.to_pos2());
        self.viewport_frame = Some(Rect::from_two_pos(self.project_point(min), self.project_point(max)));
        self
    }
}

/// Returns `None` when no node type has a position yet.
pub fn project(doc: &SchemaDocument, positions: &PositionMap) -> Option<Overview> {
    let placed: Vec<(&str, Pos2)> = doc
        .node_types
        .iter()
        .filter_map(|n| positions.get(&n.name).map(|p| (n.name.as_str(), *p)))
        .collect();
    if placed.is_empty() {
        return None;
    }

    let mut bounds = Rect::NOTHING;
    for (_, p) in &placed {
        bounds.extend_with(*p);
    }
    let bounds = bounds.expand(OVERVIEW_MARGIN);
    let sx = OVERVIEW_SIZE / if bounds.width() > 0.0 { bounds.width() } else { 1.0 };
    let sy = OVERVIEW_SIZE / if bounds.height() > 0.0 { bounds.height() } else { 1.0 };

    let mut overview = Overview {
        scale: sx.min(sy),
        origin: bounds.min,
        nodes: Vec::with_capacity(placed.len()),
        edges: Vec::new(),
        viewport_frame: None,
    };
    for rel in &doc.relationship_types {
        if let (Some(a), Some(b)) = (positions.get(&rel.start_node), positions.get(&rel.end_node)) {
            let edge = [overview.project_point(*a), overview.project_point(*b)];
            overview.edges.push(edge);
        }
    }
    for (name, p) in placed {
        let center = overview.project_point(p);
        overview.nodes.push(OverviewNode {
            name: name.to_string(),
            rect: Rect::from_center_size(center, Vec2::splat(MARKER_SIZE)),
            color: header_color(name),
        });
    }
    Some(overview)
}
