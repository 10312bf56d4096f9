//! Pan and zoom over an [`AffineTransform`].
//!
//! Scale lives in `a`/`d` and translation in `e`/`f`. Every operation
//! except [`Viewport::zoom_to`] composes a translate or scale matrix onto
//! the current one, so the two never leak into each other.

use serde::Serialize;

use crate::config::{MinimapConfig, ViewportConfig};
use crate::geometry::{AffineTransform, Point};
use crate::graph::Node;
use crate::reconcile::GraphBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub transform: AffineTransform,
    pub width: f64,
    pub height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_speed: f64,
    pub pan_on_zoom: bool,
    pub auto_center: bool,
    pub auto_zoom: bool,
    pub minimap: Option<MinimapConfig>,
    #[serde(skip)]
    precision: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            transform: AffineTransform::identity(),
            width: config.width,
            height: config.height,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_speed: config.zoom_speed,
            pan_on_zoom: config.pan_on_zoom,
            auto_center: config.auto_center,
            auto_zoom: config.auto_zoom,
            minimap: config.minimap,
            precision: config.transform_precision,
        }
    }

    pub fn zoom_level(&self) -> f64 {
        self.transform.a
    }

    pub fn pan_offset(&self) -> Point {
        Point::new(self.transform.e, self.transform.f)
    }

    /// Moves the scene by `(dx, dy)` screen units, or by graph units scaled
    /// with the current zoom when `ignore_zoom` is set.
    pub fn pan(&mut self, dx: f64, dy: f64, ignore_zoom: bool) {
        let zoom = if ignore_zoom { 1.0 } else { self.zoom_level() };
        self.transform = self
            .transform
            .compose(&AffineTransform::translate(dx / zoom, dy / zoom));
    }

    /// Centers the graph point `(x, y)` in the view.
    pub fn pan_to(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let zoom = self.zoom_level();
        let offset = self.pan_offset();
        let dx = -offset.x - x * zoom + self.width / 2.0;
        let dy = -offset.y - y * zoom + self.height / 2.0;
        self.transform = self
            .transform
            .compose(&AffineTransform::translate(dx / zoom, dy / zoom));
    }

    pub fn pan_to_node(&mut self, node: &Node) {
        if let Some(position) = node.position {
            self.pan_to(position.x, position.y);
        }
    }

    pub fn zoom(&mut self, factor: f64) {
        self.transform = self.transform.compose(&AffineTransform::scale(factor, factor));
    }

    /// Sets the scale outright. The relative factor `level / zoom_level()` is
    /// undefined at zero zoom, so this is the one operation that writes
    /// `a`/`d` directly.
    pub fn zoom_to(&mut self, level: f64) {
        self.transform.a = level;
        self.transform.d = level;
    }

    /// One zoom step in `direction`. Steps that would leave the open range
    /// `(min_zoom, max_zoom)` are rejected. With `pan_on_zoom` and an
    /// anchor (screen coordinates), the graph point under the anchor stays
    /// in place. Returns whether the zoom changed.
    pub fn on_zoom(&mut self, direction: ZoomDirection, anchor: Option<Point>) -> bool {
        let factor = match direction {
            ZoomDirection::In => 1.0 + self.zoom_speed,
            ZoomDirection::Out => 1.0 - self.zoom_speed,
        };
        let level = self.zoom_level() * factor;
        if level <= self.min_zoom || level >= self.max_zoom {
            return false;
        }
        let pivot = anchor
            .filter(|_| self.pan_on_zoom)
            .and_then(|screen| Some(self.transform.inverse()?.apply(screen)));
        match pivot {
            Some(p) => {
                self.pan(p.x, p.y, true);
                self.zoom(factor);
                self.pan(-p.x, -p.y, true);
            }
            None => self.zoom(factor),
        }
        true
    }

    /// Zoom that fits `bounds` into the view, never above `1`, clamped to
    /// the configured range.
    pub fn fit_level(&self, bounds: &GraphBounds) -> f64 {
        let height_zoom = self.height / bounds.height();
        let width_zoom = self.width / bounds.width();
        let level = height_zoom.min(width_zoom).min(1.0);
        if level.is_nan() {
            return self.zoom_level();
        }
        level.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn zoom_to_fit(&mut self, bounds: &GraphBounds) {
        let level = self.fit_level(bounds);
        if level != self.zoom_level() {
            self.zoom_to(level);
        }
    }

    pub fn center(&mut self, bounds: &GraphBounds) {
        let center = bounds.center();
        self.pan_to(center.x, center.y);
    }

    /// Applies the configured automatic zoom-to-fit and centering for a
    /// freshly reconciled frame.
    pub fn auto_fit(&mut self, bounds: &GraphBounds) {
        if self.auto_zoom {
            self.zoom_to_fit(bounds);
        }
        if self.auto_center {
            self.center(bounds);
        }
    }

    /// Scale coefficient between the graph and the minimap; `None` without
    /// a minimap.
    pub fn minimap_scale(&self, bounds: &GraphBounds) -> Option<f64> {
        let minimap = self.minimap?;
        Some((bounds.width() / minimap.max_width).max(bounds.height() / minimap.max_height))
    }

    /// Serialized matrix after rounding to the configured precision.
    pub fn to_svg(&self) -> String {
        self.transform.smooth(self.precision).to_svg()
    }
}
