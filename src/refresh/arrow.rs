//! Midpoint arrowheads for rendered connection paths.
//!
//! Paths arrive as SVG `d` strings and are parsed with `svgtypes`. The first
//! drawn segment decides the glyph: a cubic as written, a straight line as a
//! cubic whose control points sit on its endpoints. Position and direction
//! come from that curve at t = 0.5, not from the arc-length midpoint.

use serde::Serialize;
use svgtypes::{PathParser, PathSegment};

use crate::model::{ConnectionId, Point};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Cubic {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl Cubic {
    pub fn line(from: Point, to: Point) -> Self {
        Self { p0: from, p1: from, p2: to, p3: to }
    }

    /// Degree-raised quadratic through control point `q`.
    pub fn quadratic(from: Point, q: Point, to: Point) -> Self {
        let toward = |a: Point| a.offset((q.x - a.x) * 2.0 / 3.0, (q.y - a.y) * 2.0 / 3.0);
        Self { p0: from, p1: toward(from), p2: toward(to), p3: to }
    }

    pub fn at(&self, t: f32) -> Point {
        let u = 1.0 - t;
        let (uu, tt) = (u * u, t * t);
        let (uuu, ttt) = (uu * u, tt * t);
        Point::new(
            uuu * self.p0.x + 3.0 * uu * t * self.p1.x + 3.0 * u * tt * self.p2.x + ttt * self.p3.x,
            uuu * self.p0.y + 3.0 * uu * t * self.p1.y + 3.0 * u * tt * self.p2.y + ttt * self.p3.y,
        )
    }

    /// First derivative at `t`.
    pub fn tangent(&self, t: f32) -> Point {
        let u = 1.0 - t;
        let a = 3.0 * u * u;
        let b = 6.0 * u * t;
        let c = 3.0 * t * t;
        Point::new(
            a * (self.p1.x - self.p0.x) + b * (self.p2.x - self.p1.x) + c * (self.p3.x - self.p2.x),
            a * (self.p1.y - self.p0.y) + b * (self.p2.y - self.p1.y) + c * (self.p3.y - self.p2.y),
        )
    }
}

fn resolve(current: Point, abs: bool, x: f64, y: f64) -> Point {
    let origin = if abs { Point::ORIGIN } else { current };
    origin.offset(x as f32, y as f32)
}

/// Curve for the first drawn segment of a path, or `None` when nothing is drawn.
///
/// Relative commands are made absolute against the current point. Quadratics
/// are raised to cubics; arcs and `Z` are read as their chord.
pub fn parse_path(d: &str) -> Option<Cubic> {
    let mut start: Option<Point> = None;
    let mut current = Point::ORIGIN;
    for segment in PathParser::from(d).flatten() {
        if let PathSegment::MoveTo { abs, x, y } = segment {
            current = resolve(current, abs, x, y);
            start = Some(current);
            continue;
        }
        // A path has to move before it draws.
        let origin = start?;
        let from = current;
        let curve = match segment {
            PathSegment::MoveTo { .. } => continue,
            PathSegment::LineTo { abs, x, y } => Cubic::line(from, resolve(from, abs, x, y)),
            PathSegment::HorizontalLineTo { abs, x } => {
                let x = if abs { x as f32 } else { from.x + x as f32 };
                Cubic::line(from, Point::new(x, from.y))
            }
            PathSegment::VerticalLineTo { abs, y } => {
                let y = if abs { y as f32 } else { from.y + y as f32 };
                Cubic::line(from, Point::new(from.x, y))
            }
            PathSegment::CurveTo { abs, x1, y1, x2, y2, x, y } => Cubic {
                p0: from,
                p1: resolve(from, abs, x1, y1),
                p2: resolve(from, abs, x2, y2),
                p3: resolve(from, abs, x, y),
            },
            // No previous curve to reflect: the first control sits on the start.
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => Cubic {
                p0: from,
                p1: from,
                p2: resolve(from, abs, x2, y2),
                p3: resolve(from, abs, x, y),
            },
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                Cubic::quadratic(from, resolve(from, abs, x1, y1), resolve(from, abs, x, y))
            }
            PathSegment::SmoothQuadratic { abs, x, y } => Cubic::line(from, resolve(from, abs, x, y)),
            PathSegment::EllipticalArc { abs, x, y, .. } => Cubic::line(from, resolve(from, abs, x, y)),
            PathSegment::ClosePath { .. } => Cubic::line(from, origin),
        };
        return Some(curve);
    }
    None
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ArrowGlyph {
    pub connection: ConnectionId,
    pub at: Point,
    /// Direction of travel, degrees clockwise from +x in screen space.
    pub angle_deg: f32,
}

impl ArrowGlyph {
    pub fn for_path(connection: ConnectionId, d: &str) -> Option<Self> {
        let curve = parse_path(d)?;
        let dir = curve.tangent(0.5);
        Some(Self {
            connection,
            at: curve.at(0.5),
            angle_deg: dir.y.atan2(dir.x).to_degrees(),
        })
    }

    /// Triangle centred on `at`, tip first.
    pub fn points(&self, size: f32) -> [Point; 3] {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let half = size / 2.0;
        let tip = self.at.offset(cos * half, sin * half);
        let back = self.at.offset(-cos * half, -sin * half);
        [
            tip,
            back.offset(-sin * half, cos * half),
            back.offset(sin * half, -cos * half),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn straight_line_midpoint() {
        let glyph = ArrowGlyph::for_path(ConnectionId(1), "M 0 0 L 100 0").unwrap();
        assert!(close(glyph.at.x, 50.0) && close(glyph.at.y, 0.0));
        assert!(close(glyph.angle_deg, 0.0));

        let down = ArrowGlyph::for_path(ConnectionId(2), "M 0 0 L 0 40").unwrap();
        assert!(close(down.angle_deg, 90.0));
    }

    #[test]
    fn cubic_midpoint_and_tangent() {
        // Symmetric S-curve: midpoint is the centre, direction is along +x.
        let glyph = ArrowGlyph::for_path(ConnectionId(1), "M0,0 C50,0 50,100 100,100").unwrap();
        assert!(close(glyph.at.x, 50.0) && close(glyph.at.y, 50.0));
        let curve = parse_path("M0,0 C50,0 50,100 100,100").unwrap();
        let t = curve.tangent(0.5);
        assert!(close(t.x, 75.0) && close(t.y, 150.0));
    }

    #[test]
    fn relative_cubic_is_made_absolute() {
        let glyph = ArrowGlyph::for_path(ConnectionId(1), "M10,10 c50,0 50,100 100,100").unwrap();
        assert!(close(glyph.at.x, 60.0) && close(glyph.at.y, 60.0));
        assert!(close(glyph.angle_deg, 63.434948));
    }

    #[test]
    fn axis_lines_use_the_first_segment() {
        let glyph = ArrowGlyph::for_path(ConnectionId(1), "M 0 0 H 100 V 100").unwrap();
        assert!(close(glyph.at.x, 50.0) && close(glyph.at.y, 0.0));
        assert!(close(glyph.angle_deg, 0.0));

        let up = ArrowGlyph::for_path(ConnectionId(2), "M 20 80 v -60").unwrap();
        assert!(close(up.at.x, 20.0) && close(up.at.y, 50.0));
        assert!(close(up.angle_deg, -90.0));
    }

    #[test]
    fn quadratic_is_raised_to_cubic() {
        let curve = parse_path("M 0 0 Q 50 100 100 0").unwrap();
        assert!(close(curve.at(0.5).x, 50.0) && close(curve.at(0.5).y, 50.0));
    }

    #[test]
    fn short_paths_are_skipped() {
        assert!(ArrowGlyph::for_path(ConnectionId(1), "").is_none());
        assert!(ArrowGlyph::for_path(ConnectionId(1), "M 1 2 L 3").is_none());
        assert!(ArrowGlyph::for_path(ConnectionId(1), "M 1 2").is_none());
    }

    #[test]
    fn triangle_points_along_direction() {
        let glyph = ArrowGlyph { connection: ConnectionId(1), at: Point::new(10.0, 10.0), angle_deg: 0.0 };
        let [tip, a, b] = glyph.points(10.0);
        assert!(close(tip.x, 15.0) && close(tip.y, 10.0));
        assert!(close(a.x, 5.0) && close(b.x, 5.0));
        assert!(close((a.y - b.y).abs(), 10.0));
    }
}
