use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Absolute position of a vehicle on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub x: i64,
    pub y: i64,
}

impl Location {
    pub fn new(x: i64, y: i64) -> Self {
        Location { x, y }
    }

    pub fn shifted(self, shift: Shift) -> Self {
        Location {
            x: self.x + shift.x,
            y: self.y + shift.y,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Change of a location produced by a single move. Not an absolute position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shift {
    pub x: i64,
    pub y: i64,
}

impl Shift {
    pub fn new(x: i64, y: i64) -> Self {
        Shift { x, y }
    }
}

/// Heading of a vehicle. `Up` points towards increasing y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector of a single step into this direction.
    pub fn unit_shift(self) -> Shift {
        match self {
            Direction::Up => Shift::new(0, 1),
            Direction::Down => Shift::new(0, -1),
            Direction::Left => Shift::new(-1, 0),
            Direction::Right => Shift::new(1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
