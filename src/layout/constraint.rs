//! Group-aware constraint solver.
//!
//! Each tick takes a stress-majorization step toward ideal distances
//! (`link_distance` times the hop count between two nodes), then projects
//! the result onto the constraints: sibling rectangles must not overlap and
//! every group encloses its members plus padding. Group bounds are
//! recomputed from the members after every tick.

use std::collections::VecDeque;

use crate::config::ConstraintSettings;
use crate::geometry::{Dimension, Point, Rect};

use super::rng::XorShift64Star;

/// How far a drag re-heats a settled solver.
const RESUME_ALPHA: f64 = 0.1;
const PROJECTION_PASSES: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintNode {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Fixed nodes keep their position against every force and projection.
    pub fixed: bool,
}

impl ConstraintNode {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            x: f64::NAN,
            y: f64::NAN,
            width,
            height,
            fixed: false,
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.x = position.x;
        self.y = position.y;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.position(), Dimension::new(self.width, self.height))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstraintGroup {
    /// Indices into the node list.
    pub leaves: Vec<usize>,
    /// Indices into the group list.
    pub groups: Vec<usize>,
    pub padding: f64,
    /// Padded bounds of the members; `None` until the first tick.
    pub bounds: Option<Rect>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintLink {
    pub source: usize,
    pub target: usize,
}

/// Something that takes part in overlap removal at one nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Node(usize),
    Group(usize),
}

#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    nodes: Vec<ConstraintNode>,
    groups: Vec<ConstraintGroup>,
    links: Vec<ConstraintLink>,
    size: Option<Dimension>,
    link_distance: f64,
    avoid_overlaps: bool,
    alpha: f64,
    alpha_decay: f64,
    convergence_threshold: f64,
    hops: Vec<Vec<Option<usize>>>,
    rng: XorShift64Star,
    running: bool,
}

impl ConstraintSolver {
    pub fn new(settings: &ConstraintSettings) -> Self {
        Self {
            nodes: Vec::new(),
            groups: Vec::new(),
            links: Vec::new(),
            size: settings.view_dimensions,
            link_distance: settings.link_distance,
            avoid_overlaps: settings.avoid_overlaps,
            alpha: 0.0,
            alpha_decay: settings.alpha_decay,
            convergence_threshold: settings.convergence_threshold,
            hops: Vec::new(),
            rng: XorShift64Star::new(settings.seed),
            running: false,
        }
    }

    pub fn set_nodes(&mut self, nodes: Vec<ConstraintNode>) -> &mut Self {
        self.nodes = nodes;
        self
    }

    /// Groups referencing unknown nodes or groups keep only the valid members.
    pub fn set_groups(&mut self, mut groups: Vec<ConstraintGroup>) -> &mut Self {
        let (node_count, group_count) = (self.nodes.len(), groups.len());
        for group in &mut groups {
            group.leaves.retain(|idx| *idx < node_count);
            group.groups.retain(|idx| *idx < group_count);
        }
        self.groups = groups;
        self
    }

    pub fn set_links(&mut self, links: Vec<ConstraintLink>) -> &mut Self {
        let count = self.nodes.len();
        self.links = links
            .into_iter()
            .filter(|l| l.source < count && l.target < count)
            .collect();
        self
    }

    pub fn set_size(&mut self, size: Option<Dimension>) -> &mut Self {
        self.size = size;
        self
    }

    pub fn set_link_distance(&mut self, distance: f64) -> &mut Self {
        self.link_distance = distance;
        self
    }

    pub fn set_avoid_overlaps(&mut self, avoid: bool) -> &mut Self {
        self.avoid_overlaps = avoid;
        self
    }

    pub fn set_convergence_threshold(&mut self, threshold: f64) -> &mut Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn link_distance(&self) -> f64 {
        self.link_distance
    }

    pub fn size(&self) -> Option<Dimension> {
        self.size
    }

    pub fn nodes(&self) -> &[ConstraintNode] {
        &self.nodes
    }

    pub fn groups(&self) -> &[ConstraintGroup] {
        &self.groups
    }

    pub fn links(&self) -> &[ConstraintLink] {
        &self.links
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Seeds unplaced nodes inside the view, precomputes hop distances and
    /// starts ticking from `alpha`.
    pub fn start(&mut self, alpha: f64) {
        let extent = match self.size {
            Some(size) => size,
            None => {
                let side = self.link_distance * (self.nodes.len().max(1) as f64).sqrt();
                Dimension::new(side, side)
            }
        };
        for node in &mut self.nodes {
            if !node.x.is_finite() || !node.y.is_finite() {
                node.x = self.rng.next_f64_unit() * extent.width;
                node.y = self.rng.next_f64_unit() * extent.height;
            }
        }
        self.hops = self.hop_distances();
        self.alpha = alpha;
        self.running = true;
    }

    /// Re-heats a settled or running solver, e.g. while dragging.
    pub fn resume(&mut self) {
        self.alpha = self.alpha.max(RESUME_ALPHA);
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.alpha = 0.0;
        self.running = false;
    }

    pub fn drag_start(&mut self, idx: usize) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.fixed = true;
        }
        self.resume();
    }

    pub fn drag_to(&mut self, idx: usize, position: Point) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.x = position.x;
            node.y = position.y;
        }
        self.resume();
    }

    pub fn drag_end(&mut self, idx: usize) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.fixed = false;
        }
    }

    /// Advances one tick. Returns `false` once converged or stopped; the
    /// converging tick itself still returns `true`.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let before: Vec<Point> = self.nodes.iter().map(ConstraintNode::position).collect();

        self.descend();
        if self.avoid_overlaps {
            self.project();
        }
        self.center();
        self.update_bounds();

        let moved = self
            .nodes
            .iter()
            .zip(&before)
            .map(|(n, p)| ((n.x - p.x).powi(2) + (n.y - p.y).powi(2)).sqrt())
            .sum::<f64>()
            / self.nodes.len().max(1) as f64;

        self.alpha *= 1.0 - self.alpha_decay;
        if self.alpha < self.convergence_threshold || moved < self.convergence_threshold {
            self.running = false;
        }
        true
    }

    fn hop_distances(&self) -> Vec<Vec<Option<usize>>> {
        let count = self.nodes.len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
        for link in &self.links {
            adjacency[link.source].push(link.target);
            adjacency[link.target].push(link.source);
        }
        (0..count)
            .map(|start| {
                let mut dist = vec![None; count];
                dist[start] = Some(0);
                let mut queue = VecDeque::from([start]);
                while let Some(node) = queue.pop_front() {
                    let next_hop = dist[node].unwrap_or(0) + 1;
                    for next in &adjacency[node] {
                        if dist[*next].is_none() {
                            dist[*next] = Some(next_hop);
                            queue.push_back(*next);
                        }
                    }
                }
                dist
            })
            .collect()
    }

    /// One damped step toward the ideal pairwise distances. Disconnected
    /// pairs only repel while closer than one link distance.
    fn descend(&mut self) {
        let count = self.nodes.len();
        let mut shift = vec![(0.0f64, 0.0f64); count];
        for i in 0..count {
            for j in (i + 1)..count {
                let hops = self.hops.get(i).and_then(|row| row.get(j).copied().flatten());
                let mut dx = self.nodes[j].x - self.nodes[i].x;
                let mut dy = self.nodes[j].y - self.nodes[i].y;
                if dx == 0.0 && dy == 0.0 {
                    dx = self.rng.jiggle();
                    dy = self.rng.jiggle();
                }
                let len = (dx * dx + dy * dy).sqrt();
                let (ideal, weight) = match hops {
                    Some(h) => (self.link_distance * h as f64, 1.0 / h as f64),
                    None if len < self.link_distance => (self.link_distance, 0.5),
                    None => continue,
                };
                let k = self.alpha * weight * (len - ideal) / len * 0.5;
                shift[i].0 += dx * k;
                shift[i].1 += dy * k;
                shift[j].0 -= dx * k;
                shift[j].1 -= dy * k;
            }
        }
        for (node, (sx, sy)) in self.nodes.iter_mut().zip(shift) {
            if !node.fixed {
                node.x += sx;
                node.y += sy;
            }
        }
    }

    /// Removes overlaps between siblings, innermost level first.
    fn project(&mut self) {
        let (node_group, group_parent) = self.membership();
        let levels: Vec<Vec<Member>> = self
            .groups
            .iter()
            .map(|group| {
                let mut level: Vec<Member> = group.leaves.iter().map(|n| Member::Node(*n)).collect();
                level.extend(group.groups.iter().map(|g| Member::Group(*g)));
                level
            })
            .collect();
        // Deeper groups are declared after their parents as often as not, so
        // order levels by depth instead of declaration.
        let depth = |mut g: usize| {
            let mut d = 0usize;
            while let Some(p) = group_parent[g] {
                d += 1;
                g = p;
                if d > group_parent.len() {
                    break;
                }
            }
            d
        };
        let mut order: Vec<usize> = (0..self.groups.len()).collect();
        order.sort_by_key(|g| std::cmp::Reverse(depth(*g)));

        for g in order {
            self.separate_until_clear(&levels[g]);
        }
        let mut root: Vec<Member> = (0..self.nodes.len())
            .filter(|n| node_group[*n].is_none())
            .map(Member::Node)
            .collect();
        root.extend(
            (0..self.groups.len())
                .filter(|g| group_parent[*g].is_none())
                .map(Member::Group),
        );
        self.separate_until_clear(&root);
    }

    fn separate_until_clear(&mut self, members: &[Member]) {
        for _ in 0..PROJECTION_PASSES {
            self.update_bounds();
            if !self.separate(members) {
                break;
            }
        }
    }

    /// First owning group of each node and parent group of each group.
    fn membership(&self) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
        let mut node_group = vec![None; self.nodes.len()];
        let mut group_parent = vec![None; self.groups.len()];
        for (idx, group) in self.groups.iter().enumerate() {
            for leaf in &group.leaves {
                if node_group[*leaf].is_none() {
                    node_group[*leaf] = Some(idx);
                }
            }
            for child in &group.groups {
                if *child != idx && group_parent[*child].is_none() {
                    group_parent[*child] = Some(idx);
                }
            }
        }
        (node_group, group_parent)
    }

    /// One sweep over all sibling pairs; returns whether anything moved.
    fn separate(&mut self, members: &[Member]) -> bool {
        let mut moved = false;
        let mut rects: Vec<Option<Rect>> = members.iter().map(|m| self.member_rect(*m)).collect();
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (Some(a), Some(b)) = (rects[i], rects[j]) else {
                    continue;
                };
                let ox = a.right().min(b.right()) - a.x.max(b.x);
                let oy = a.bottom().min(b.bottom()) - a.y.max(b.y);
                if ox <= 0.0 || oy <= 0.0 {
                    continue;
                }
                let (a_pinned, b_pinned) = (self.is_pinned(members[i]), self.is_pinned(members[j]));
                if a_pinned && b_pinned {
                    continue;
                }
                let (share_a, share_b) = match (a_pinned, b_pinned) {
                    (true, false) => (0.0, 1.0),
                    (false, true) => (1.0, 0.0),
                    _ => (0.5, 0.5),
                };
                let (mut dx, mut dy) = (0.0, 0.0);
                if ox < oy {
                    let dir = if b.cx() >= a.cx() { 1.0 } else { -1.0 };
                    dx = ox * dir;
                } else {
                    let dir = if b.cy() >= a.cy() { 1.0 } else { -1.0 };
                    dy = oy * dir;
                }
                self.shift_member(members[i], -dx * share_a, -dy * share_a);
                self.shift_member(members[j], dx * share_b, dy * share_b);
                if let Some(r) = rects[i].as_mut() {
                    r.x -= dx * share_a;
                    r.y -= dy * share_a;
                }
                if let Some(r) = rects[j].as_mut() {
                    r.x += dx * share_b;
                    r.y += dy * share_b;
                }
                moved = true;
            }
        }
        moved
    }

    fn member_rect(&self, member: Member) -> Option<Rect> {
        match member {
            Member::Node(n) => self.nodes.get(n).map(ConstraintNode::bounds),
            Member::Group(g) => self.groups.get(g).and_then(|group| group.bounds),
        }
    }

    fn is_pinned(&self, member: Member) -> bool {
        self.leaves_of(member).iter().any(|n| self.nodes[*n].fixed)
    }

    fn leaves_of(&self, member: Member) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![member];
        let mut visited = vec![false; self.groups.len()];
        while let Some(m) = stack.pop() {
            match m {
                Member::Node(n) => out.push(n),
                Member::Group(g) => {
                    if visited[g] {
                        continue;
                    }
                    visited[g] = true;
                    out.extend(&self.groups[g].leaves);
                    stack.extend(self.groups[g].groups.iter().map(|c| Member::Group(*c)));
                }
            }
        }
        out
    }

    fn shift_member(&mut self, member: Member, dx: f64, dy: f64) {
        for n in self.leaves_of(member) {
            let node = &mut self.nodes[n];
            node.x += dx;
            node.y += dy;
        }
    }

    /// Keeps the layout centered in the view while nothing is pinned.
    fn center(&mut self) {
        let Some(size) = self.size else {
            return;
        };
        if self.nodes.is_empty() || self.nodes.iter().any(|n| n.fixed) {
            return;
        }
        let count = self.nodes.len() as f64;
        let cx = self.nodes.iter().map(|n| n.x).sum::<f64>() / count;
        let cy = self.nodes.iter().map(|n| n.y).sum::<f64>() / count;
        let (dx, dy) = (size.width / 2.0 - cx, size.height / 2.0 - cy);
        for node in &mut self.nodes {
            node.x += dx;
            node.y += dy;
        }
    }

    /// Recomputes padded group bounds bottom-up; empty groups stay unbounded.
    pub fn update_bounds(&mut self) {
        let count = self.groups.len();
        let mut done = vec![false; count];
        let mut visiting = vec![false; count];
        for g in 0..count {
            self.bounds_of(g, &mut done, &mut visiting);
        }
    }

    fn bounds_of(&mut self, g: usize, done: &mut [bool], visiting: &mut [bool]) -> Option<Rect> {
        if done[g] || visiting[g] {
            return self.groups[g].bounds;
        }
        visiting[g] = true;
        let mut rect: Option<Rect> = None;
        for leaf in self.groups[g].leaves.clone() {
            let r = self.nodes[leaf].bounds();
            rect = Some(rect.map_or(r, |acc| acc.union(&r)));
        }
        for child in self.groups[g].groups.clone() {
            if let Some(r) = self.bounds_of(child, done, visiting) {
                rect = Some(rect.map_or(r, |acc| acc.union(&r)));
            }
        }
        let padding = self.groups[g].padding;
        self.groups[g].bounds = rect.map(|r| r.inflate(padding));
        visiting[g] = false;
        done[g] = true;
        self.groups[g].bounds
    }
}
