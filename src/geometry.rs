use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub width: f64,
    pub height: f64,
}

impl Dimension {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle stored as its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn from_center(center: Point, size: Dimension) -> Self {
        Self {
            x: center.x - size.width / 2.0,
            y: center.y - size.height / 2.0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.cx(), self.cy())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    pub fn inflate(&self, pad: f64) -> Rect {
        Rect {
            x: self.x - pad,
            y: self.y - pad,
            width: self.width + 2.0 * pad,
            height: self.height + 2.0 * pad,
        }
    }

    /// Point where the segment from the center toward `(x2, y2)` leaves the
    /// rectangle, or `None` when the target lies inside it.
    pub fn ray_intersection(&self, x2: f64, y2: f64) -> Option<Point> {
        self.line_intersections(self.cx(), self.cy(), x2, y2)
            .into_iter()
            .next()
    }

    fn line_intersections(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Vec<Point> {
        let sides = [
            (self.x, self.y, self.right(), self.y),
            (self.right(), self.y, self.right(), self.bottom()),
            (self.right(), self.bottom(), self.x, self.bottom()),
            (self.x, self.bottom(), self.x, self.y),
        ];
        sides
            .iter()
            .filter_map(|&(sx1, sy1, sx2, sy2)| {
                segment_intersection(x1, y1, x2, y2, sx1, sy1, sx2, sy2)
            })
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn segment_intersection(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
    x4: f64,
    y4: f64,
) -> Option<Point> {
    let denom = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denom == 0.0 {
        return None;
    }
    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denom;
    let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denom;
    if (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub) {
        Some(Point::new(x1 + ua * (x2 - x1), y1 + ua * (y2 - y1)))
    } else {
        None
    }
}

/// 2-D affine matrix `[a c e; b d f; 0 0 1]`.
///
/// For pan/zoom only `a`/`d` (uniform scale) and `e`/`f` (translation) carry
/// information; `b`/`c` stay zero as long as the matrix is built from
/// [`AffineTransform::translate`] and [`AffineTransform::scale`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self × other`: `other` is applied first, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            a: self.a * other.a + self.c * other.b,
            c: self.a * other.c + self.c * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            b: self.b * other.a + self.d * other.b,
            d: self.b * other.c + self.d * other.d,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    pub fn inverse(&self) -> Option<AffineTransform> {
        let denom = self.a * self.d - self.b * self.c;
        if denom == 0.0 || !denom.is_finite() {
            return None;
        }
        Some(AffineTransform {
            a: self.d / denom,
            b: self.b / -denom,
            c: self.c / -denom,
            d: self.a / denom,
            e: (self.d * self.e - self.c * self.f) / -denom,
            f: (self.b * self.e - self.a * self.f) / denom,
        })
    }

    /// Rounds every component to `1 / precision`.
    pub fn smooth(&self, precision: f64) -> AffineTransform {
        let round = |v: f64| (v * precision).round() / precision;
        AffineTransform {
            a: round(self.a),
            b: round(self.b),
            c: round(self.c),
            d: round(self.d),
            e: round(self.e),
            f: round(self.f),
        }
    }

    pub fn to_svg(&self) -> String {
        format!(
            "matrix({},{},{},{},{},{})",
            fmt_num(self.a),
            fmt_num(self.b),
            fmt_num(self.c),
            fmt_num(self.d),
            fmt_num(self.e),
            fmt_num(self.f)
        )
    }
}

/// Formats without a trailing `.0` and never as `-0`.
pub(crate) fn fmt_num(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_then_scale_keeps_pan_and_zoom_apart() {
        let m = AffineTransform::identity()
            .compose(&AffineTransform::translate(10.0, 20.0))
            .compose(&AffineTransform::scale(2.0, 2.0));
        assert_eq!(m.a, 2.0);
        assert_eq!(m.d, 2.0);
        assert_eq!(m.e, 10.0);
        assert_eq!(m.f, 20.0);
        assert_eq!(m.b, 0.0);
        assert_eq!(m.c, 0.0);
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let m = AffineTransform::scale(2.0, 2.0).compose(&AffineTransform::translate(5.0, 0.0));
        let p = m.apply(Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(12.0, 2.0));
    }

    #[test]
    fn inverse_round_trips_a_point() {
        let m = AffineTransform::translate(3.0, -4.0).compose(&AffineTransform::scale(0.5, 0.5));
        let inv = m.inverse().expect("invertible");
        let p = inv.apply(m.apply(Point::new(7.0, 9.0)));
        assert!((p.x - 7.0).abs() < 1e-9);
        assert!((p.y - 9.0).abs() < 1e-9);
    }

    #[test]
    fn serializes_smoothed_matrix() {
        let m = AffineTransform {
            a: 1.23456,
            b: 0.0,
            c: 0.0,
            d: 1.23456,
            e: -10.0,
            f: 4.5,
        };
        assert_eq!(m.smooth(100.0).to_svg(), "matrix(1.23,0,0,1.23,-10,4.5)");
    }

    #[test]
    fn ray_leaves_rect_on_facing_side() {
        let rect = Rect::from_center(Point::new(0.0, 0.0), Dimension::new(20.0, 10.0));
        let hit = rect.ray_intersection(100.0, 0.0).expect("hit");
        assert!((hit.x - 10.0).abs() < 1e-9);
        assert!(hit.y.abs() < 1e-9);
        let hit = rect.ray_intersection(0.0, -50.0).expect("hit");
        assert!((hit.y + 5.0).abs() < 1e-9);
    }

    #[test]
    fn ray_toward_inner_point_misses() {
        let rect = Rect::from_center(Point::new(0.0, 0.0), Dimension::new(20.0, 20.0));
        assert!(rect.ray_intersection(2.0, 2.0).is_none());
    }
}
