use engine::{Rect, Vec2};

use crate::monster::MonsterRecord;

use super::collision::TileCoord;
use super::map::TILE_SIZE;
use super::movement::Direction;

pub const PLAYER_SPEED_TILES_PER_SECOND: f32 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub position: Vec2,
    pub direction: Direction,
    pub moving: bool,
}

impl Player {
    pub fn at_tile(tile: TileCoord) -> Self {
        Self {
            position: tile.origin(TILE_SIZE),
            direction: Direction::Down,
            moving: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_position(self.position, TILE_SIZE, TILE_SIZE)
    }

    pub fn tile(&self) -> TileCoord {
        let center = self.rect().center();
        TileCoord::new(
            (center.x / TILE_SIZE).floor().max(0.0) as u32,
            (center.y / TILE_SIZE).floor().max(0.0) as u32,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyTrainer {
    pub name: String,
    pub tile: TileCoord,
    pub facing: Direction,
    pub monster: MonsterRecord,
    pub defeated: bool,
}

impl EnemyTrainer {
    pub fn rect(&self) -> Rect {
        self.tile.rect(TILE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShopKeeper {
    pub tile: TileCoord,
}

impl ShopKeeper {
    pub fn rect(&self) -> Rect {
        self.tile.rect(TILE_SIZE)
    }
}

/// Centre-to-centre check used for "talk to" interactions.
pub fn within_reach(a: Rect, b: Rect, tiles: f32) -> bool {
    a.center().distance(b.center()) <= tiles * TILE_SIZE
}
