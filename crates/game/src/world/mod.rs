pub mod collision;
pub mod entity;
pub mod map;
pub mod movement;
pub mod navigation;
pub mod pathfinder;

use engine::{Rect, Vec2};
use thiserror::Error;
use tracing::{debug, info, warn};

use collision::{GridCache, ObstacleSet, TileCoord, WalkGrid};
use entity::{within_reach, EnemyTrainer, Player, ShopKeeper, PLAYER_SPEED_TILES_PER_SECOND};
use map::{GameMap, TILE_SIZE};
use movement::{
    move_axis_separated, movement_delta, snap_position, Direction, TeleportCooldown,
};
use navigation::{NavPath, NavStep};
use pathfinder::find_path;

pub const ENCOUNTER_COOLDOWN_SECONDS: f32 = 2.0;
pub const INTERACT_REACH_TILES: f32 = 1.5;

/// Offsets, in tiles, tried in order when the player is stuck inside an
/// obstacle.
const UNSTUCK_OFFSETS: [(i32, i32); 13] = [
    (0, 0),
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
    (0, 2),
    (0, -2),
    (2, 0),
    (-2, 0),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("unknown map '{id}'")]
    UnknownMap { id: String },
    #[error("no navigation point named '{name}' on this map")]
    UnknownNavPoint { name: String },
    #[error("No route")]
    NoRoute,
}

/// One loaded map plus the entities that live on it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    pub map: GameMap,
    pub spawn: TileCoord,
    pub trainers: Vec<EnemyTrainer>,
    pub shop_keeper: Option<ShopKeeper>,
}

impl MapState {
    pub fn obstacles(&self) -> ObstacleSet {
        ObstacleSet::new(
            self.map.walls.clone(),
            self.shop_keeper.as_ref().map(ShopKeeper::rect),
            self.trainers.iter().map(EnemyTrainer::rect).collect(),
        )
        .with_bounds(self.map.pixel_rect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Teleported { from: String, to: String },
    Encounter,
    Arrived,
    PathBlocked,
}

pub struct World {
    maps: Vec<MapState>,
    current: usize,
    pub player: Player,
    speed: f32,
    teleport_cooldown: TeleportCooldown,
    encounter_cooldown: f32,
    obstacles: ObstacleSet,
    grid_cache: GridCache,
    nav_path: NavPath,
}

impl World {
    pub fn new(maps: Vec<MapState>, current_map: &str, player: Player) -> Result<Self, WorldError> {
        let current = maps
            .iter()
            .position(|state| state.map.id == current_map)
            .ok_or_else(|| WorldError::UnknownMap {
                id: current_map.to_string(),
            })?;
        let obstacles = maps[current].obstacles();
        let mut world = Self {
            maps,
            current,
            player,
            speed: PLAYER_SPEED_TILES_PER_SECOND * TILE_SIZE,
            teleport_cooldown: TeleportCooldown::default(),
            encounter_cooldown: 0.0,
            obstacles,
            grid_cache: GridCache::default(),
            nav_path: NavPath::default(),
        };
        world.relocate_if_stuck();
        Ok(world)
    }

    pub fn current(&self) -> &MapState {
        &self.maps[self.current]
    }

    pub fn current_map(&self) -> &GameMap {
        &self.maps[self.current].map
    }

    pub fn maps(&self) -> &[MapState] {
        &self.maps
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn nav_path(&self) -> &NavPath {
        &self.nav_path
    }

    pub fn teleport_cooldown(&self) -> f32 {
        self.teleport_cooldown.remaining()
    }

    pub fn walk_grid(&mut self) -> &WalkGrid {
        let map = &self.maps[self.current].map;
        self.grid_cache
            .refresh(map.width, map.height, TILE_SIZE, &self.obstacles)
    }

    /// Advances the player by one frame. `direction` is the unit input
    /// vector; any manual input cancels auto-walk.
    pub fn step(&mut self, direction: Vec2, dt_seconds: f32) -> Option<WorldEvent> {
        self.teleport_cooldown.tick(dt_seconds);
        self.encounter_cooldown = (self.encounter_cooldown - dt_seconds).max(0.0);

        let previous = self.player.position;
        let mut nav_event = None;
        if direction != Vec2::ZERO {
            if self.nav_path.is_active() {
                debug!("auto_walk_cancelled_by_input");
                self.nav_path.clear();
            }
            let delta = movement_delta(direction, self.speed, dt_seconds);
            let result = move_axis_separated(previous, delta, TILE_SIZE, &self.obstacles);
            self.player.position = result.position;
            self.player.direction = Direction::from_delta(delta, self.player.direction);
        } else if self.nav_path.is_active() {
            match self
                .nav_path
                .step(previous, self.speed, dt_seconds, TILE_SIZE, &self.obstacles)
            {
                NavStep::Moved { position, facing } => {
                    self.player.position = position;
                    self.player.direction = facing;
                }
                NavStep::Arrived { position } => {
                    self.player.position = position;
                    nav_event = Some(WorldEvent::Arrived);
                }
                NavStep::Blocked => nav_event = Some(WorldEvent::PathBlocked),
                NavStep::Idle => {}
            }
        }
        let moved = self.player.position != previous;
        self.player.moving = moved;

        if self.teleport_cooldown.is_ready() {
            let center = self.player.rect().center();
            if let Some(teleport) = self.current_map().teleport_at(center).cloned() {
                let from = self.current_map().id.clone();
                match self.switch_map(&teleport.destination, teleport.dest_tile) {
                    Ok(()) => {
                        self.teleport_cooldown.arm();
                        info!(from = %from, to = %teleport.destination, "teleported");
                        return Some(WorldEvent::Teleported {
                            from,
                            to: teleport.destination,
                        });
                    }
                    Err(err) => warn!(error = %err, "teleport_failed"),
                }
            }
        }

        if moved
            && self.encounter_cooldown <= 0.0
            && self.current_map().overlaps_bush(&self.player.rect())
        {
            self.encounter_cooldown = ENCOUNTER_COOLDOWN_SECONDS;
            return Some(WorldEvent::Encounter);
        }

        nav_event
    }

    /// Moves the player to `map_id`, at `dest_tile` or the map's spawn.
    pub fn switch_map(&mut self, map_id: &str, dest_tile: Option<TileCoord>) -> Result<(), WorldError> {
        let index = self
            .maps
            .iter()
            .position(|state| state.map.id == map_id)
            .ok_or_else(|| WorldError::UnknownMap {
                id: map_id.to_string(),
            })?;
        self.current = index;
        self.obstacles = self.maps[index].obstacles();
        self.nav_path.clear();
        let tile = dest_tile.unwrap_or(self.maps[index].spawn);
        self.player.position = snap_position(tile.origin(TILE_SIZE), TILE_SIZE);
        self.player.moving = false;
        self.relocate_if_stuck();
        Ok(())
    }

    /// Puts the player on the nearest free tile if it overlaps an obstacle.
    pub fn relocate_if_stuck(&mut self) {
        if !self.obstacles.check_collision(&self.player.rect()) {
            return;
        }
        let base = snap_position(self.player.position, TILE_SIZE);
        for (dx, dy) in UNSTUCK_OFFSETS {
            let candidate = Vec2::new(base.x + dx as f32 * TILE_SIZE, base.y + dy as f32 * TILE_SIZE);
            let rect = Rect::from_position(candidate, TILE_SIZE, TILE_SIZE);
            if !self.obstacles.check_collision(&rect) {
                info!(x = candidate.x, y = candidate.y, "player_unstuck");
                self.player.position = candidate;
                return;
            }
        }
        warn!(x = base.x, y = base.y, "player_stuck_no_free_tile");
    }

    /// Plans an auto-walk route to `goal`. An unreachable goal leaves any
    /// current route untouched.
    pub fn plan_route_to(&mut self, goal: TileCoord) -> Result<usize, WorldError> {
        let start = self.player.tile();
        let path = find_path(self.walk_grid(), start, goal);
        if path.is_empty() {
            info!(start = ?start, goal = ?goal, "route_not_found");
            return Err(WorldError::NoRoute);
        }
        let steps = path.len();
        self.nav_path = NavPath::new(path);
        info!(start = ?start, goal = ?goal, steps, "route_planned");
        Ok(steps)
    }

    pub fn plan_route_to_point(&mut self, name: &str) -> Result<usize, WorldError> {
        let goal = self
            .current_map()
            .nav_point(name)
            .map(|point| point.tile)
            .ok_or_else(|| WorldError::UnknownNavPoint {
                name: name.to_string(),
            })?;
        self.plan_route_to(goal)
    }

    pub fn cancel_route(&mut self) {
        self.nav_path.clear();
    }

    /// Index of an undefeated trainer within reach of the player.
    pub fn trainer_in_reach(&self) -> Option<usize> {
        let player = self.player.rect();
        self.current().trainers.iter().position(|trainer| {
            !trainer.defeated && within_reach(player, trainer.rect(), INTERACT_REACH_TILES)
        })
    }

    pub fn trainer(&self, index: usize) -> Option<&EnemyTrainer> {
        self.current().trainers.get(index)
    }

    pub fn mark_trainer_defeated(&mut self, index: usize) {
        if let Some(trainer) = self.maps[self.current].trainers.get_mut(index) {
            trainer.defeated = true;
            info!(trainer = %trainer.name, "trainer_defeated");
        }
    }

    pub fn near_shop_keeper(&self) -> bool {
        self.current()
            .shop_keeper
            .as_ref()
            .is_some_and(|keeper| within_reach(self.player.rect(), keeper.rect(), INTERACT_REACH_TILES))
    }
}
