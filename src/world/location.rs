use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the game world in tiles.
pub const MAX_X: i32 = 944;
/// Height of the game world in tiles, all four planes stacked.
pub const MAX_Y: i32 = 3776;
/// Height of a single map plane.
pub const PLANE_HEIGHT: i32 = 944;

/// Where mobs go while dead.
pub const DEATH_SPOT: Location = Location { x: 0, y: 0 };
/// Lumbridge, the default spawn and respawn point.
pub const SPAWN_POINT: Location = Location { x: 122, y: 647 };

/// Facing of a mob. The numbering follows the client's sprite order; note
/// that the x axis grows westward, so `West` is +x and `East` is -x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
    East,
    NorthEast,
    LeftFighting,
    RightFighting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn delta_x(self, other: Location) -> i32 {
        (self.x - other.x).abs()
    }

    pub fn delta_y(self, other: Location) -> i32 {
        (self.y - other.y).abs()
    }

    /// Signed offset from `self` to `other`.
    pub fn delta(self, other: Location) -> (i32, i32) {
        (other.x - self.x, other.y - self.y)
    }

    /// Chebyshev distance.
    pub fn longest_delta(self, other: Location) -> i32 {
        self.delta_x(other).max(self.delta_y(other))
    }

    pub fn within_range(self, other: Location, radius: i32) -> bool {
        self.longest_delta(other) <= radius
    }

    pub fn within_world(self) -> bool {
        within_world(self.x, self.y)
    }

    pub fn plane(self) -> i32 {
        self.y.max(0) / PLANE_HEIGHT
    }

    /// Wilderness level of this tile; 0 outside the wilderness. Only the
    /// surface and the dungeon plane below it carry wilderness levels.
    pub fn wilderness(self) -> i32 {
        let surface_y = match self.plane() {
            0 => self.y,
            3 => self.y - PLANE_HEIGHT * 3,
            _ => return 0,
        };
        let depth = 2203 - (surface_y + 1776);
        if depth < 0 {
            0
        } else {
            depth / 6 + 1
        }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

/// -1, 0 or 1: the single-axis step that takes `from` toward `to`.
pub fn axis_step(from: i32, to: i32) -> i32 {
    to.cmp(&from) as i32
}

pub fn within_world(x: i32, y: i32) -> bool {
    (0..=MAX_X).contains(&x) && (0..=MAX_Y).contains(&y)
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthWest => (1, -1),
            Direction::West => (1, 0),
            Direction::SouthWest => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthEast => (-1, 1),
            Direction::East => (-1, 0),
            Direction::NorthEast => (-1, -1),
            Direction::LeftFighting | Direction::RightFighting => (0, 0),
        }
    }

    /// Facing for a single step of `(dx, dy)`, if the step moves at all.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Direction::North),
            (1, -1) => Some(Direction::NorthWest),
            (1, 0) => Some(Direction::West),
            (1, 1) => Some(Direction::SouthWest),
            (0, 1) => Some(Direction::South),
            (-1, 1) => Some(Direction::SouthEast),
            (-1, 0) => Some(Direction::East),
            (-1, -1) => Some(Direction::NorthEast),
            _ => None,
        }
    }
}

/// Parses a direction name, long or short form. Unknown input falls back to
/// north.
pub fn parse_direction(name: &str) -> Direction {
    match name.trim().to_ascii_lowercase().as_str() {
        "northeast" | "ne" => Direction::NorthEast,
        "northwest" | "nw" => Direction::NorthWest,
        "east" | "e" => Direction::East,
        "west" | "w" => Direction::West,
        "south" | "s" => Direction::South,
        "southeast" | "se" => Direction::SouthEast,
        "southwest" | "sw" => Direction::SouthWest,
        _ => Direction::North,
    }
}
