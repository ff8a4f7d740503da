//! Map geometry and the road collision resolver.
//!
//! Maps are authored on an integer grid; dogs move in continuous space. A
//! dog is only ever allowed inside the union of the padded road rectangles
//! it currently stands on, so "collision" here describes passable area
//! rather than obstacles.

use serde::{Deserialize, Serialize};

/// Half-width of a road, added on every side of its segment.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Integer grid coordinate used by map authoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Continuous runtime coordinate of a dog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Position {
    fn from(point: Point) -> Self {
        Position {
            x: f64::from(point.x),
            y: f64::from(point.y),
        }
    }
}

/// Velocity in map units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Axis-aligned road segment.
///
/// The orientation is stored rather than derived from the end points, so a
/// zero-length road still reports exactly one of horizontal or vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    start: Point,
    end: Point,
    orientation: Orientation,
}

impl Road {
    pub fn horizontal(start: Point, end_x: i32) -> Self {
        Self {
            start,
            end: Point::new(end_x, start.y),
            orientation: Orientation::Horizontal,
        }
    }

    pub fn vertical(start: Point, end_y: i32) -> Self {
        Self {
            start,
            end: Point::new(start.x, end_y),
            orientation: Orientation::Vertical,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    pub fn is_vertical(&self) -> bool {
        self.orientation == Orientation::Vertical
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    /// Padded bounding rectangle of this road.
    pub fn bounds(&self) -> Rect {
        Rect::around_road(self, ROAD_HALF_WIDTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Decorative building footprint. Not part of collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub position: Point,
    pub size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: String,
    pub position: Point,
    pub offset: Offset,
}

/// Axis-aligned rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Signed area of the parallelogram spanned by `a->b` and `a->p`.
///
/// Walking a rectangle clockwise (y grows downwards), a point on the inner
/// side of an edge yields a non-positive value.
pub fn cross(a: Position, b: Position, p: Position) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y)
}

impl Rect {
    pub fn around_road(road: &Road, half_width: f64) -> Self {
        let (start, end) = (road.start(), road.end());
        Rect {
            x_min: f64::from(start.x.min(end.x)) - half_width,
            x_max: f64::from(start.x.max(end.x)) + half_width,
            y_min: f64::from(start.y.min(end.y)) - half_width,
            y_max: f64::from(start.y.max(end.y)) + half_width,
        }
    }

    /// Corners in clockwise order, starting at the top-left.
    fn edges(&self) -> [(Position, Position); 4] {
        let top_left = Position::new(self.x_min, self.y_min);
        let bottom_left = Position::new(self.x_min, self.y_max);
        let bottom_right = Position::new(self.x_max, self.y_max);
        let top_right = Position::new(self.x_max, self.y_min);

        [
            (top_left, bottom_left),
            (bottom_left, bottom_right),
            (bottom_right, top_right),
            (top_right, top_left),
        ]
    }

    /// Inclusive point-in-rectangle test as four half-plane checks.
    pub fn contains(&self, point: Position) -> bool {
        self.edges()
            .iter()
            .all(|(a, b)| cross(*a, *b, point) <= 0.0)
    }

    /// Smallest rectangle covering both.
    pub fn merge(&self, other: &Rect) -> Rect {
        Rect {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Clamps `x` into `[x_min, x_max]`. The flag reports whether it moved.
    pub fn clamp_x(&self, x: f64) -> (f64, bool) {
        clamp_reporting(x, self.x_min, self.x_max)
    }

    pub fn clamp_y(&self, y: f64) -> (f64, bool) {
        clamp_reporting(y, self.y_min, self.y_max)
    }
}

fn clamp_reporting(value: f64, min: f64, max: f64) -> (f64, bool) {
    if value < min {
        (min, true)
    } else if value > max {
        (max, true)
    } else {
        (value, false)
    }
}

/// Padded rectangles of every road the position currently lies on.
///
/// At an intersection more than one rectangle is returned.
pub fn occupied_rects(position: Position, roads: &[Road]) -> Vec<Rect> {
    roads
        .iter()
        .map(Road::bounds)
        .filter(|rect| rect.contains(position))
        .collect()
}

/// Legal coordinate range for the next tick: the bounding box of all
/// occupied rectangles, or `None` when the set is empty.
pub fn legal_range(rects: &[Rect]) -> Option<Rect> {
    let (first, rest) = rects.split_first()?;
    Some(rest.iter().fold(*first, |acc, rect| acc.merge(rect)))
}
