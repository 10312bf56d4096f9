//! SVG path data for edge polylines.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, fmt_num};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Curve {
    Linear,
    /// Uniform cubic B-spline through the control polygon.
    Basis,
    /// B-spline straightened toward the chord; `1.0` equals [`Curve::Basis`].
    Bundle(f64),
    /// Horizontal first, then vertical, at every bend.
    StepAfter,
}

impl Default for Curve {
    fn default() -> Self {
        Curve::Bundle(1.0)
    }
}

/// Builds path data (`M..L..C..`) for `points`. Empty input yields an empty string.
pub fn line(points: &[Point], curve: Curve) -> String {
    let mut path = PathBuilder::default();
    match curve {
        Curve::Linear => {
            for (idx, p) in points.iter().enumerate() {
                if idx == 0 {
                    path.move_to(*p);
                } else {
                    path.line_to(*p);
                }
            }
        }
        Curve::Basis => basis(points, &mut path),
        Curve::StepAfter => {
            if let Some((first, rest)) = points.split_first() {
                path.move_to(*first);
                let mut prev = *first;
                for p in rest {
                    path.line_to(Point::new(p.x, prev.y));
                    path.line_to(*p);
                    prev = *p;
                }
            }
        }
        Curve::Bundle(beta) => {
            let beta = beta.clamp(0.0, 1.0);
            if points.len() < 2 {
                basis(points, &mut path);
            } else {
                let first = points[0];
                let last = points[points.len() - 1];
                let j = (points.len() - 1) as f64;
                let straightened: Vec<Point> = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let t = i as f64 / j;
                        Point::new(
                            beta * p.x + (1.0 - beta) * (first.x + t * (last.x - first.x)),
                            beta * p.y + (1.0 - beta) * (first.y + t * (last.y - first.y)),
                        )
                    })
                    .collect();
                basis(&straightened, &mut path);
            }
        }
    }
    path.finish()
}

fn basis(points: &[Point], path: &mut PathBuilder) {
    match points {
        [] => {}
        [only] => path.move_to(*only),
        [a, b] => {
            path.move_to(*a);
            path.line_to(*b);
        }
        _ => {
            path.move_to(points[0]);
            let (p0, p1) = (points[0], points[1]);
            path.line_to(Point::new((5.0 * p0.x + p1.x) / 6.0, (5.0 * p0.y + p1.y) / 6.0));
            let mut x0 = p0;
            let mut x1 = p1;
            for p in &points[2..] {
                basis_segment(path, x0, x1, *p);
                x0 = x1;
                x1 = *p;
            }
            basis_segment(path, x0, x1, x1);
            path.line_to(x1);
        }
    }
}

fn basis_segment(path: &mut PathBuilder, p0: Point, p1: Point, p: Point) {
    path.cubic_to(
        Point::new((2.0 * p0.x + p1.x) / 3.0, (2.0 * p0.y + p1.y) / 3.0),
        Point::new((p0.x + 2.0 * p1.x) / 3.0, (p0.y + 2.0 * p1.y) / 3.0),
        Point::new((p0.x + 4.0 * p1.x + p.x) / 6.0, (p0.y + 4.0 * p1.y + p.y) / 6.0),
    );
}

#[derive(Default)]
struct PathBuilder {
    d: String,
}

impl PathBuilder {
    fn move_to(&mut self, p: Point) {
        self.d.push_str(&format!("M{},{}", fmt_num(p.x), fmt_num(p.y)));
    }

    fn line_to(&mut self, p: Point) {
        self.d.push_str(&format!("L{},{}", fmt_num(p.x), fmt_num(p.y)));
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.d.push_str(&format!(
            "C{},{},{},{},{},{}",
            fmt_num(c1.x),
            fmt_num(c1.y),
            fmt_num(c2.x),
            fmt_num(c2.y),
            fmt_num(p.x),
            fmt_num(p.y)
        ));
    }

    fn finish(self) -> String {
        self.d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn linear_path() {
        let d = line(&pts(&[(0.0, 0.0), (10.0, 0.0), (20.0, 5.5)]), Curve::Linear);
        assert_eq!(d, "M0,0L10,0L20,5.5");
    }

    #[test]
    fn two_point_basis_is_straight() {
        assert_eq!(line(&pts(&[(0.0, 0.0), (6.0, 6.0)]), Curve::Basis), "M0,0L6,6");
    }

    #[test]
    fn basis_starts_and_ends_on_endpoints() {
        let d = line(&pts(&[(0.0, 0.0), (6.0, 0.0), (12.0, 0.0)]), Curve::default());
        assert!(d.starts_with("M0,0L1,0C"));
        assert!(d.ends_with("L12,0"));
    }

    #[test]
    fn step_after_turns_at_the_next_x() {
        let d = line(&pts(&[(0.0, 0.0), (10.0, 4.0), (20.0, 4.0)]), Curve::StepAfter);
        assert_eq!(d, "M0,0L10,0L10,4L20,4L20,4");
    }

    #[test]
    fn empty_points_give_empty_path() {
        assert!(line(&[], Curve::Linear).is_empty());
    }
}
