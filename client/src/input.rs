//! Local player movement on the bounded grid

use shared::Position;

/// One grid step. Screen coordinates: `Up` decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Maps the classic `w/a/s/d` keys, case-insensitively.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'w' => Some(Direction::Up),
            's' => Some(Direction::Down),
            'a' => Some(Direction::Left),
            'd' => Some(Direction::Right),
            _ => None,
        }
    }

    fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Position of the participant running this client
///
/// Always inside `[MIN_X, MAX_X] × [MIN_Y, MAX_Y]`; steps past an edge are
/// clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalPlayer {
    position: Position,
}

impl LocalPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Moves one cell and returns the resulting position.
    pub fn step(&mut self, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        self.position = Position::new(
            self.position.x.saturating_add(dx),
            self.position.y.saturating_add(dy),
        )
        .clamped();
        self.position
    }
}
