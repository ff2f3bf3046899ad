use engine::{InputAction, InputSnapshot, Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::collision::ObstacleSet;

pub const TELEPORT_COOLDOWN_SECONDS: f32 = 0.6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::None => "none",
        }
    }

    /// Facing for a movement delta, favouring the horizontal axis on ties.
    /// A zero delta keeps `previous`.
    pub fn from_delta(delta: Vec2, previous: Direction) -> Direction {
        if delta.x == 0.0 && delta.y == 0.0 {
            return previous;
        }
        if delta.x.abs() >= delta.y.abs() {
            if delta.x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if delta.y > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

/// Unit direction from held movement keys. Screen space: +y points down.
pub fn input_vector(input: &InputSnapshot) -> Vec2 {
    let mut x = 0.0f32;
    let mut y = 0.0f32;

    if input.is_down(InputAction::MoveRight) {
        x += 1.0;
    }
    if input.is_down(InputAction::MoveLeft) {
        x -= 1.0;
    }
    if input.is_down(InputAction::MoveDown) {
        y += 1.0;
    }
    if input.is_down(InputAction::MoveUp) {
        y -= 1.0;
    }

    let len_sq = x * x + y * y;
    if len_sq > 0.0 {
        let inv_len = len_sq.sqrt().recip();
        x *= inv_len;
        y *= inv_len;
    }
    Vec2 { x, y }
}

pub fn movement_delta(direction: Vec2, speed: f32, dt_seconds: f32) -> Vec2 {
    Vec2 {
        x: direction.x * speed * dt_seconds,
        y: direction.y * speed * dt_seconds,
    }
}

pub fn snap_to_grid(value: f32, tile_size: f32) -> f32 {
    if tile_size <= 0.0 {
        return value;
    }
    (value / tile_size).round() * tile_size
}

pub fn snap_position(position: Vec2, tile_size: f32) -> Vec2 {
    Vec2::new(
        snap_to_grid(position.x, tile_size),
        snap_to_grid(position.y, tile_size),
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    pub position: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

impl MoveResult {
    pub fn moved_from(&self, previous: Vec2) -> bool {
        self.position != previous
    }
}

/// Applies `delta` one axis at a time. A blocked axis discards its motion
/// and snaps that coordinate to the nearest tile boundary; the other axis
/// still moves, so sliding along walls works.
pub fn move_axis_separated(
    position: Vec2,
    delta: Vec2,
    tile_size: f32,
    obstacles: &ObstacleSet,
) -> MoveResult {
    let mut next = position;
    let mut blocked_x = false;
    let mut blocked_y = false;

    if delta.x != 0.0 {
        let candidate = Rect::new(next.x + delta.x, next.y, tile_size, tile_size);
        if obstacles.check_collision(&candidate) {
            next.x = snap_to_grid(next.x, tile_size);
            blocked_x = true;
        } else {
            next.x += delta.x;
        }
    }

    if delta.y != 0.0 {
        let candidate = Rect::new(next.x, next.y + delta.y, tile_size, tile_size);
        if obstacles.check_collision(&candidate) {
            next.y = snap_to_grid(next.y, tile_size);
            blocked_y = true;
        } else {
            next.y += delta.y;
        }
    }

    MoveResult {
        position: next,
        blocked_x,
        blocked_y,
    }
}

/// Debounce for teleports: after one fires, none can fire again until the
/// cooldown has run out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeleportCooldown {
    remaining: f32,
}

impl TeleportCooldown {
    pub fn tick(&mut self, dt_seconds: f32) {
        self.remaining = (self.remaining - dt_seconds).max(0.0);
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn arm(&mut self) {
        self.remaining = TELEPORT_COOLDOWN_SECONDS;
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}
