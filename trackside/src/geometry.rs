//! Drawing-space points and the curve math segments need.

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    pub fn dist(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Samples used when measuring a curve.
const CURVE_SAMPLES: usize = 32;

/// Point on the quadratic Bezier curve `a - ctrl - b` at parameter `t`.
pub fn bezier(a: &Point, ctrl: &Point, b: &Point, t: f64) -> Point {
    let u = 1.0 - t;
    Point {
        x: u * u * a.x + 2.0 * u * t * ctrl.x + t * t * b.x,
        y: u * u * a.y + 2.0 * u * t * ctrl.y + t * t * b.y,
    }
}

/// Approximate arc length of a quadratic Bezier curve, in drawing units.
pub fn bezier_length(a: &Point, ctrl: &Point, b: &Point) -> f64 {
    let mut length = 0.0;
    let mut prev = *a;
    for i in 1..=CURVE_SAMPLES {
        let p = bezier(a, ctrl, b, i as f64 / CURVE_SAMPLES as f64);
        length += prev.dist(&p);
        prev = p;
    }
    length
}
