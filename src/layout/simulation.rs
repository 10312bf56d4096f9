//! Velocity-Verlet particle simulation with many-body repulsion, link
//! springs and collision.
//!
//! The simulation is a pull-based stepper: nothing happens until the owner
//! calls [`Simulation::step`], which advances one tick and reports whether a
//! tick was taken. Cooling follows the usual alpha schedule:
//! `alpha += (alpha_target - alpha) * alpha_decay` every tick, and the
//! simulation stops itself once `alpha < alpha_min`.

use std::f64::consts::PI;

use crate::config::ForceSettings;
use crate::geometry::Point;

use super::rng::XorShift64Star;

const INITIAL_RADIUS: f64 = 10.0;
/// Squared distance below which many-body forces are softened.
const DISTANCE_MIN2: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Pinned coordinates; while set the node ignores all forces.
    pub fx: Option<f64>,
    pub fy: Option<f64>,
}

impl SimNode {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            fx: None,
            fy: None,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    pub distance: f64,
    strength: f64,
    bias: f64,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    charge_strength: f64,
    collide_radius: f64,
    link_distance: f64,
    rng: XorShift64Star,
    stopped: bool,
    ticks: usize,
}

impl Simulation {
    pub fn new(settings: &ForceSettings) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            alpha: 1.0,
            alpha_min: settings.alpha_min,
            alpha_decay: settings.alpha_decay,
            alpha_target: 0.0,
            velocity_decay: 1.0 - settings.velocity_decay,
            charge_strength: settings.charge_strength,
            collide_radius: settings.collide_radius,
            link_distance: settings.link_distance,
            rng: XorShift64Star::new(settings.seed),
            stopped: false,
            ticks: 0,
        }
    }

    /// Replaces the particles. Nodes without a starting point are seeded on
    /// a phyllotaxis spiral around the origin.
    pub fn set_nodes(&mut self, initial: &[Option<Point>]) {
        let golden = PI * (3.0 - 5f64.sqrt());
        self.nodes = initial
            .iter()
            .enumerate()
            .map(|(idx, start)| match start {
                Some(p) if p.is_finite() => SimNode::at(p.x, p.y),
                _ => {
                    let radius = INITIAL_RADIUS * (0.5 + idx as f64).sqrt();
                    let angle = idx as f64 * golden;
                    SimNode::at(radius * angle.cos(), radius * angle.sin())
                }
            })
            .collect();
        self.relink();
    }

    /// Replaces the springs. Pairs referencing unknown particles are dropped.
    pub fn set_links(&mut self, pairs: &[(usize, usize)]) {
        let count = self.nodes.len();
        self.links = pairs
            .iter()
            .filter(|(s, t)| *s < count && *t < count)
            .map(|(source, target)| SimLink {
                source: *source,
                target: *target,
                distance: self.link_distance,
                strength: 0.0,
                bias: 0.0,
            })
            .collect();
        self.relink();
    }

    /// Recomputes link strength `1 / min(degree)` and the bias that moves
    /// the lighter endpoint more.
    fn relink(&mut self) {
        let mut degree = vec![0usize; self.nodes.len()];
        for link in &self.links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }
        for link in &mut self.links {
            let (s, t) = (degree[link.source] as f64, degree[link.target] as f64);
            link.strength = 1.0 / s.min(t).max(1.0);
            link.bias = s / (s + t).max(1.0);
        }
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> Option<&SimNode> {
        self.nodes.get(idx)
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target;
    }

    pub fn alpha_min(&self) -> f64 {
        self.alpha_min
    }

    /// Ticks taken since the simulation was created.
    pub fn tick_count(&self) -> usize {
        self.ticks
    }

    pub fn restart(&mut self) {
        self.stopped = false;
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Pins a particle; its velocity is cleared on the next tick.
    pub fn fix(&mut self, idx: usize, x: f64, y: f64) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.fx = Some(x);
            node.fy = Some(y);
        }
    }

    pub fn release(&mut self, idx: usize) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.fx = None;
            node.fy = None;
        }
    }

    /// Advances one tick unless stopped. Returns whether a tick was taken;
    /// the tick that cools alpha below its minimum is still taken and
    /// stops the simulation afterwards.
    pub fn step(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.tick();
        if self.alpha < self.alpha_min {
            self.stopped = true;
        }
        true
    }

    fn tick(&mut self) {
        self.ticks += 1;
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        let alpha = self.alpha;

        self.apply_links(alpha);
        self.apply_many_body(alpha);
        self.apply_collide();

        let decay = self.velocity_decay;
        for node in &mut self.nodes {
            match node.fx {
                Some(fx) => {
                    node.x = fx;
                    node.vx = 0.0;
                }
                None => {
                    node.vx *= decay;
                    node.x += node.vx;
                }
            }
            match node.fy {
                Some(fy) => {
                    node.y = fy;
                    node.vy = 0.0;
                }
                None => {
                    node.vy *= decay;
                    node.y += node.vy;
                }
            }
        }
    }

    fn apply_links(&mut self, alpha: f64) {
        for link in &self.links {
            let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
            let mut x = t.x + t.vx - s.x - s.vx;
            let mut y = t.y + t.vy - s.y - s.vy;
            if x == 0.0 {
                x = self.rng.jiggle();
            }
            if y == 0.0 {
                y = self.rng.jiggle();
            }
            let len = (x * x + y * y).sqrt();
            let pull = (len - link.distance) / len * alpha * link.strength;
            x *= pull;
            y *= pull;
            let target = &mut self.nodes[link.target];
            target.vx -= x * link.bias;
            target.vy -= y * link.bias;
            let source = &mut self.nodes[link.source];
            source.vx += x * (1.0 - link.bias);
            source.vy += y * (1.0 - link.bias);
        }
    }

    fn apply_many_body(&mut self, alpha: f64) {
        if self.charge_strength == 0.0 {
            return;
        }
        let positions: Vec<(f64, f64)> = self.nodes.iter().map(|n| (n.x, n.y)).collect();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            for (j, (ox, oy)) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut x = ox - positions[i].0;
                let mut y = oy - positions[i].1;
                let mut l = x * x + y * y;
                if x == 0.0 {
                    x = self.rng.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = self.rng.jiggle();
                    l += y * y;
                }
                if l < DISTANCE_MIN2 {
                    l = (DISTANCE_MIN2 * l).sqrt();
                }
                let w = self.charge_strength * alpha / l;
                node.vx += x * w;
                node.vy += y * w;
            }
        }
    }

    fn apply_collide(&mut self) {
        let radius = self.collide_radius;
        if radius <= 0.0 {
            return;
        }
        let r = radius * 2.0;
        let count = self.nodes.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                let mut x = a.x + a.vx - b.x - b.vx;
                let mut y = a.y + a.vy - b.y - b.vy;
                let mut l = x * x + y * y;
                if l >= r * r {
                    continue;
                }
                if x == 0.0 {
                    x = self.rng.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = self.rng.jiggle();
                    l += y * y;
                }
                let dist = l.sqrt();
                let push = (r - dist) / dist;
                x *= push;
                y *= push;
                // Equal radii share the correction evenly.
                self.nodes[i].vx += x * 0.5;
                self.nodes[i].vy += y * 0.5;
                self.nodes[j].vx -= x * 0.5;
                self.nodes[j].vy -= y * 0.5;
            }
        }
    }
}
