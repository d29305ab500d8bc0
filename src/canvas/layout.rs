use std::collections::HashMap;
use std::f32::consts::TAU;

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

use crate::schema::{PositionMap, SchemaDocument};

// Cooling floor; below it the forces no longer move anything visibly
pub const ALPHA_MIN: f32 = 0.001;

/// Tunables for the force simulation. `max_iterations` and
/// `energy_threshold` are the two stopping conditions: the run ends after
/// the iteration budget or once the kinetic energy of an iteration (sum of
/// squared velocities of the free nodes) drops below the threshold,
/// whichever comes first. Alpha cooling also ends the run at [`ALPHA_MIN`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub center_strength: f32,
    pub collision_radius: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub max_iterations: usize,
    pub energy_threshold: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            link_distance: 200.0,
            charge_strength: -800.0,
            center_strength: 0.05,
            collision_radius: 80.0,
            alpha_decay: 0.1,
            velocity_decay: 0.5,
            max_iterations: 300,
            energy_threshold: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
    pub name: String,
    pub position: Pos2,
    pub pinned: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RelaxReport {
    pub positions: PositionMap,
    pub iterations: usize,
    pub converged: bool,
    pub kinetic_energy: f32,
}

/// Seat the `index`-th of `total` unpositioned nodes on a circle centred in
/// the viewport, radius proportional to the smaller viewport side.
pub fn initial_position(index: usize, total: usize, viewport: Vec2) -> Pos2 {
    let total = total.max(1);
    let angle = (index as f32 / total as f32) * TAU;
    let radius = viewport.x.min(viewport.y) * 0.3;
    let center = Pos2::new(viewport.x * 0.5, viewport.y * 0.5);
    Pos2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

// Deterministic nudge for coincident pairs
fn jiggle(i: usize, j: usize) -> Vec2 {
    Vec2::new(1e-3 * (i + 1) as f32, -1e-3 * (j + 1) as f32)
}

/// Runs the force simulation over `nodes`. Pinned nodes keep their
/// coordinate; only free nodes integrate velocity. Links are pairs of node
/// names; self links and links to unknown names are ignored.
pub fn relax(nodes: &[LayoutNode], links: &[(String, String)], center: Pos2, params: &SimulationParams) -> RelaxReport {
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (n.name.as_str(), i)).collect();
    let mut pos: Vec<Pos2> = nodes.iter().map(|n| n.position).collect();
    let mut vel: Vec<Vec2> = vec![Vec2::ZERO; nodes.len()];
    let free: Vec<bool> = nodes.iter().map(|n| !n.pinned).collect();

    let edges: Vec<(usize, usize)> = links
        .iter()
        .filter_map(|(a, b)| match (index.get(a.as_str()), index.get(b.as_str())) {
            (Some(&i), Some(&j)) if i != j => Some((i, j)),
            _ => None,
        })
        .collect();
    let mut degree = vec![0usize; nodes.len()];
    for &(s, t) in &edges {
        degree[s] += 1;
        degree[t] += 1;
    }

    let mut report = RelaxReport::default();
    let mut alpha = 1.0_f32;
    let min_sep = params.collision_radius * 2.0;

    if free.iter().any(|f| *f) {
        while report.iterations < params.max_iterations {
            if alpha < ALPHA_MIN {
                report.converged = true;
                break;
            }
            alpha += (0.0 - alpha) * params.alpha_decay;
            report.iterations += 1;

            // Springs along relationships, biased towards the lower-degree end
            for &(s, t) in &edges {
                let mut d = pos[t] + vel[t] - pos[s] - vel[s];
                if d.length_sq() < 1e-12 { d = jiggle(s, t); }
                let l = d.length();
                let strength = 1.0 / degree[s].min(degree[t]).max(1) as f32;
                let k = (l - params.link_distance) / l * alpha * strength;
                let bias = degree[s] as f32 / (degree[s] + degree[t]) as f32;
                if free[t] { vel[t] -= d * k * bias; }
                if free[s] { vel[s] += d * k * (1.0 - bias); }
            }

            // Many-body charge and collision separation
            for i in 0..pos.len() {
                for j in (i + 1)..pos.len() {
                    if !free[i] && !free[j] { continue; }
                    let mut d = pos[j] - pos[i];
                    if d.length_sq() < 1e-12 { d = jiggle(i, j); }
                    let l2 = d.length_sq().max(1.0);
                    let w = params.charge_strength * alpha / l2;
                    if free[i] { vel[i] += d * w; }
                    if free[j] { vel[j] -= d * w; }

                    let l = d.length();
                    if l < min_sep {
                        let push = (min_sep - l) / l;
                        let (wi, wj) = match (free[i], free[j]) {
                            (true, true) => (0.5, 0.5),
                            (true, false) => (1.0, 0.0),
                            _ => (0.0, 1.0),
                        };
                        vel[i] -= d * push * wi;
                        vel[j] += d * push * wj;
                    }
                }
            }

            // Centering: nudge free nodes so the whole layout drifts to the center
            let count = pos.len() as f32;
            let centroid = pos.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2()) / count;
            let pull = (center.to_vec2() - centroid) * params.center_strength * alpha;

            let mut energy = 0.0_f32;
            for i in 0..pos.len() {
                if !free[i] {
                    vel[i] = Vec2::ZERO;
                    continue;
                }
                vel[i] += pull;
                vel[i] *= 1.0 - params.velocity_decay;
                pos[i] += vel[i];
                energy += vel[i].length_sq();
            }
            report.kinetic_energy = energy;
            if energy < params.energy_threshold {
                report.converged = true;
                break;
            }
        }
        if alpha < ALPHA_MIN {
            report.converged = true;
        }
    } else {
        report.converged = true;
    }

    log::debug!(
        "layout relaxed {} node(s) in {} iteration(s), converged={}",
        nodes.len(),
        report.iterations,
        report.converged
    );
    report.positions = nodes.iter().zip(pos).map(|(n, p)| (n.name.clone(), p)).collect();
    report
}

/// Computes coordinates for every node type of `doc` missing from
/// `positions`. Existing entries are pinned and never overwritten; only the
/// new entries are returned.
pub fn fill_missing(doc: &SchemaDocument, positions: &PositionMap, viewport: Vec2, params: &SimulationParams) -> PositionMap {
    let missing: Vec<&str> = doc
        .node_types
        .iter()
        .map(|n| n.name.as_str())
        .filter(|name| !positions.contains_key(*name))
        .collect();
    if missing.is_empty() {
        return PositionMap::new();
    }

    let mut nodes: Vec<LayoutNode> = Vec::with_capacity(doc.node_count());
    let mut seeded = 0usize;
    for node in &doc.node_types {
        match positions.get(&node.name) {
            Some(p) => nodes.push(LayoutNode { name: node.name.clone(), position: *p, pinned: true }),
            None => {
                let p = initial_position(seeded, missing.len(), viewport);
                seeded += 1;
                nodes.push(LayoutNode { name: node.name.clone(), position: p, pinned: false });
            }
        }
    }
    let links: Vec<(String, String)> = doc
        .relationship_types
        .iter()
        .map(|r| (r.start_node.clone(), r.end_node.clone()))
        .collect();
    let center = Pos2::new(viewport.x * 0.5, viewport.y * 0.5);

    let mut report = relax(&nodes, &links, center, params);
    report.positions.retain(|name, p| !positions.contains_key(name) && p.x.is_finite() && p.y.is_finite());
    report.positions
}
