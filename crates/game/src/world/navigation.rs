use std::collections::VecDeque;

use engine::{Rect, Vec2};

use super::collision::{ObstacleSet, TileCoord};
use super::movement::Direction;

const WAYPOINT_EPSILON_PX: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavStep {
    /// No path is being followed.
    Idle,
    Moved { position: Vec2, facing: Direction },
    /// The last waypoint was reached this frame.
    Arrived { position: Vec2 },
    /// The next step collided; the whole path was dropped.
    Blocked,
}

/// Auto-walk route, consumed from the front one waypoint at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavPath {
    waypoints: VecDeque<TileCoord>,
}

impl NavPath {
    pub fn new(tiles: Vec<TileCoord>) -> Self {
        Self {
            waypoints: tiles.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.waypoints.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &TileCoord> {
        self.waypoints.iter()
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    /// Moves along the dominant axis toward the front waypoint's tile.
    /// Collision abandons the path; there is no replanning.
    pub fn step(
        &mut self,
        position: Vec2,
        speed: f32,
        dt_seconds: f32,
        tile_size: f32,
        obstacles: &ObstacleSet,
    ) -> NavStep {
        let mut position = position;
        let mut popped = false;
        while let Some(front) = self.waypoints.front().copied() {
            let target = front.origin(tile_size);
            if within_epsilon(position, target) {
                position = target;
                self.waypoints.pop_front();
                popped = true;
                continue;
            }

            let dx = target.x - position.x;
            let dy = target.y - position.y;
            let max_step = speed * dt_seconds;
            let delta = if dx.abs() >= dy.abs() {
                Vec2::new(dx.signum() * max_step.min(dx.abs()), 0.0)
            } else {
                Vec2::new(0.0, dy.signum() * max_step.min(dy.abs()))
            };

            let candidate = Rect::new(position.x + delta.x, position.y + delta.y, tile_size, tile_size);
            if obstacles.check_collision(&candidate) {
                self.waypoints.clear();
                return NavStep::Blocked;
            }

            let facing = Direction::from_delta(delta, Direction::Down);
            position = Vec2::new(position.x + delta.x, position.y + delta.y);
            if within_epsilon(position, target) {
                position = target;
                self.waypoints.pop_front();
                if self.waypoints.is_empty() {
                    return NavStep::Arrived { position };
                }
            }
            return NavStep::Moved { position, facing };
        }
        if popped {
            NavStep::Arrived { position }
        } else {
            NavStep::Idle
        }
    }
}

fn within_epsilon(position: Vec2, target: Vec2) -> bool {
    (target.x - position.x).abs() <= WAYPOINT_EPSILON_PX
        && (target.y - position.y).abs() <= WAYPOINT_EPSILON_PX
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f32 = 32.0;
    const SPEED: f32 = 128.0;
    const DT: f32 = 1.0 / 60.0;

    fn walk(path: &mut NavPath, mut position: Vec2, obstacles: &ObstacleSet) -> (Vec2, NavStep, usize) {
        for frame in 0..600 {
            match path.step(position, SPEED, DT, TILE, obstacles) {
                NavStep::Moved { position: next, .. } => position = next,
                other => return (position, other, frame),
            }
        }
        panic!("path never finished");
    }

    #[test]
    fn follows_path_to_the_last_tile() {
        let mut path = NavPath::new(vec![
            TileCoord::new(0, 0),
            TileCoord::new(1, 0),
            TileCoord::new(1, 1),
        ]);
        let obstacles = ObstacleSet::default();
        let (_, step, _) = walk(&mut path, Vec2::ZERO, &obstacles);
        assert_eq!(step, NavStep::Arrived { position: Vec2::new(32.0, 32.0) });
        assert!(!path.is_active());
    }

    #[test]
    fn moves_one_axis_per_frame() {
        let mut path = NavPath::new(vec![TileCoord::new(1, 1)]);
        let step = path.step(Vec2::new(0.0, 20.0), SPEED, DT, TILE, &ObstacleSet::default());
        let NavStep::Moved { position, facing } = step else {
            panic!("expected movement, got {step:?}");
        };
        assert_eq!(position.y, 20.0);
        assert!(position.x > 0.0);
        assert_eq!(facing, Direction::Right);
    }

    #[test]
    fn collision_abandons_the_whole_path() {
        let mut path = NavPath::new(vec![TileCoord::new(1, 0), TileCoord::new(2, 0)]);
        let obstacles = ObstacleSet::new(Vec::new(), Some(Rect::new(32.0, 0.0, 32.0, 32.0)), Vec::new());
        assert_eq!(path.step(Vec2::ZERO, SPEED, DT, TILE, &obstacles), NavStep::Blocked);
        assert!(!path.is_active());
        assert_eq!(path.step(Vec2::ZERO, SPEED, DT, TILE, &obstacles), NavStep::Idle);
    }

    #[test]
    fn step_never_overshoots_waypoint() {
        let mut path = NavPath::new(vec![TileCoord::new(1, 0)]);
        let step = path.step(Vec2::new(30.0, 0.0), SPEED, 1.0, TILE, &ObstacleSet::default());
        assert_eq!(step, NavStep::Arrived { position: Vec2::new(32.0, 0.0) });
    }
}
