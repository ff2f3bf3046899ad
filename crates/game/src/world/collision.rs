use engine::{Rect, Vec2};

const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn origin(self, tile_size: f32) -> Vec2 {
        Vec2::new(self.x as f32 * tile_size, self.y as f32 * tile_size)
    }

    pub fn rect(self, tile_size: f32) -> Rect {
        Rect::from_position(self.origin(tile_size), tile_size, tile_size)
    }
}

/// Every rectangle that blocks movement on the current map. The NPC slot is
/// always present; a map without a shop keeper carries an empty rectangle
/// there, which collides with nothing. With `bounds` set, any rectangle not
/// fully inside them collides too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleSet {
    walls: Vec<Rect>,
    npc: Rect,
    hostiles: Vec<Rect>,
    bounds: Option<Rect>,
}

impl ObstacleSet {
    pub fn new(walls: Vec<Rect>, npc: Option<Rect>, hostiles: Vec<Rect>) -> Self {
        Self {
            walls,
            npc: npc.unwrap_or_default(),
            hostiles,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn npc(&self) -> Rect {
        self.npc
    }

    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.walls
            .iter()
            .chain(std::iter::once(&self.npc))
            .chain(self.hostiles.iter())
    }

    pub fn check_collision(&self, rect: &Rect) -> bool {
        let outside = self.bounds.is_some_and(|bounds| {
            rect.x < bounds.x
                || rect.y < bounds.y
                || rect.right() > bounds.right()
                || rect.bottom() > bounds.bottom()
        });
        outside || self.rects().any(|obstacle| obstacle.intersects(rect))
    }

    pub fn fingerprint(&self) -> u64 {
        let mut hash = FNV1A_OFFSET_BASIS_64;
        hash = fnv1a_update_u64(hash, self.walls.len() as u64);
        hash = fnv1a_update_u64(hash, self.hostiles.len() as u64);
        for rect in self.rects().chain(self.bounds.iter()) {
            for value in [rect.x, rect.y, rect.w, rect.h] {
                hash = fnv1a_update_u64(hash, value.to_bits() as u64);
            }
        }
        hash
    }
}

fn fnv1a_update_u64(mut hash: u64, value: u64) -> u64 {
    for byte in value.to_le_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
    }
    hash
}

/// Per-tile walkability, `true` meaning walkable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkGrid {
    width: u32,
    height: u32,
    walkable: Vec<bool>,
}

impl WalkGrid {
    pub fn open(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            walkable: vec![true; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, tile: TileCoord) -> bool {
        tile.x < self.width && tile.y < self.height
    }

    pub fn index_of(&self, tile: TileCoord) -> Option<usize> {
        if !self.in_bounds(tile) {
            return None;
        }
        Some(tile.y as usize * self.width as usize + tile.x as usize)
    }

    pub fn is_walkable(&self, tile: TileCoord) -> bool {
        self.index_of(tile)
            .and_then(|index| self.walkable.get(index))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_blocked(&mut self, tile: TileCoord) {
        if let Some(index) = self.index_of(tile) {
            self.walkable[index] = false;
        }
    }

    /// In-bounds neighbours in the fixed order +x, -x, +y, -y.
    pub fn neighbors(&self, tile: TileCoord) -> [Option<TileCoord>; 4] {
        let east = (tile.x + 1 < self.width).then(|| TileCoord::new(tile.x + 1, tile.y));
        let west = (tile.x > 0).then(|| TileCoord::new(tile.x - 1, tile.y));
        let south = (tile.y + 1 < self.height).then(|| TileCoord::new(tile.x, tile.y + 1));
        let north = (tile.y > 0).then(|| TileCoord::new(tile.x, tile.y - 1));
        [east, west, south, north]
    }

    /// Tile containing a world point, if it lies on the map.
    pub fn tile_at(&self, point: Vec2, tile_size: f32) -> Option<TileCoord> {
        if tile_size <= 0.0 {
            return None;
        }
        let x = (point.x / tile_size).floor();
        let y = (point.y / tile_size).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let tile = TileCoord::new(x as u32, y as u32);
        self.in_bounds(tile).then_some(tile)
    }
}

/// Marks every tile any obstacle overlaps, even partially, as blocked.
pub fn build_grid(width: u32, height: u32, tile_size: f32, obstacles: &ObstacleSet) -> WalkGrid {
    let mut grid = WalkGrid::open(width, height);
    if tile_size <= 0.0 {
        return grid;
    }
    for rect in obstacles.rects().filter(|rect| !rect.is_empty()) {
        let x0 = (rect.x / tile_size).floor().max(0.0) as u32;
        let y0 = (rect.y / tile_size).floor().max(0.0) as u32;
        let x1 = ((rect.right() / tile_size).ceil().max(0.0) as u32).min(width);
        let y1 = ((rect.bottom() / tile_size).ceil().max(0.0) as u32).min(height);
        for y in y0..y1 {
            for x in x0..x1 {
                grid.set_blocked(TileCoord::new(x, y));
            }
        }
    }
    grid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridKey {
    width: u32,
    height: u32,
    tile_size_bits: u32,
    obstacles_hash: u64,
}

/// Keeps the last built grid and rebuilds only when the obstacle set or map
/// dimensions change.
#[derive(Debug, Clone, Default)]
pub struct GridCache {
    key: Option<GridKey>,
    grid: WalkGrid,
    rebuilds: u32,
}

impl GridCache {
    pub fn refresh(
        &mut self,
        width: u32,
        height: u32,
        tile_size: f32,
        obstacles: &ObstacleSet,
    ) -> &WalkGrid {
        let key = GridKey {
            width,
            height,
            tile_size_bits: tile_size.to_bits(),
            obstacles_hash: obstacles.fingerprint(),
        };
        if self.key != Some(key) {
            self.grid = build_grid(width, height, tile_size, obstacles);
            self.key = Some(key);
            self.rebuilds = self.rebuilds.saturating_add(1);
        }
        &self.grid
    }

    pub fn rebuild_count(&self) -> u32 {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f32 = 32.0;

    #[test]
    fn missing_npc_is_an_empty_rect_that_never_collides() {
        let set = ObstacleSet::new(Vec::new(), None, Vec::new());
        assert!(set.npc().is_empty());
        assert!(!set.check_collision(&Rect::new(0.0, 0.0, 32.0, 32.0)));
    }

    #[test]
    fn rect_leaving_bounds_collides() {
        let set = ObstacleSet::new(Vec::new(), None, Vec::new())
            .with_bounds(Rect::new(0.0, 0.0, 64.0, 64.0));
        assert!(!set.check_collision(&Rect::new(0.0, 0.0, 32.0, 32.0)));
        assert!(!set.check_collision(&Rect::new(32.0, 32.0, 32.0, 32.0)));
        assert!(set.check_collision(&Rect::new(-0.5, 0.0, 32.0, 32.0)));
        assert!(set.check_collision(&Rect::new(0.0, -0.5, 32.0, 32.0)));
        assert!(set.check_collision(&Rect::new(32.5, 0.0, 32.0, 32.0)));
        assert!(set.check_collision(&Rect::new(0.0, 32.5, 32.0, 32.0)));

        let grid = build_grid(2, 2, TILE, &set);
        assert!(grid.is_walkable(TileCoord::new(1, 1)));
    }

    #[test]
    fn touching_obstacle_does_not_collide() {
        let set = ObstacleSet::new(vec![Rect::new(32.0, 0.0, 32.0, 32.0)], None, Vec::new());
        assert!(!set.check_collision(&Rect::new(0.0, 0.0, 32.0, 32.0)));
        assert!(set.check_collision(&Rect::new(0.5, 0.0, 32.0, 32.0)));
    }

    #[test]
    fn partial_overlap_blocks_whole_tile() {
        let set = ObstacleSet::new(vec![Rect::new(60.0, 60.0, 3.2, 3.2)], None, Vec::new());
        let grid = build_grid(4, 4, TILE, &set);
        assert!(!grid.is_walkable(TileCoord::new(1, 1)));
        assert!(grid.is_walkable(TileCoord::new(2, 2)));
        assert!(grid.is_walkable(TileCoord::new(0, 0)));
    }

    #[test]
    fn tile_aligned_rect_blocks_only_its_tiles() {
        let set = ObstacleSet::new(
            Vec::new(),
            Some(Rect::new(32.0, 32.0, 64.0, 32.0)),
            vec![Rect::new(192.0, -40.0, 32.0, 64.0)],
        );
        let grid = build_grid(8, 4, TILE, &set);
        let blocked: Vec<TileCoord> = (0..4)
            .flat_map(|y| (0..8).map(move |x| TileCoord::new(x, y)))
            .filter(|tile| !grid.is_walkable(*tile))
            .collect();
        assert_eq!(
            blocked,
            vec![
                TileCoord::new(6, 0),
                TileCoord::new(1, 1),
                TileCoord::new(2, 1)
            ]
        );
    }

    #[test]
    fn neighbours_follow_fixed_order() {
        let grid = WalkGrid::open(3, 3);
        assert_eq!(
            grid.neighbors(TileCoord::new(1, 1)),
            [
                Some(TileCoord::new(2, 1)),
                Some(TileCoord::new(0, 1)),
                Some(TileCoord::new(1, 2)),
                Some(TileCoord::new(1, 0))
            ]
        );
        assert_eq!(
            grid.neighbors(TileCoord::new(0, 0)),
            [Some(TileCoord::new(1, 0)), None, Some(TileCoord::new(0, 1)), None]
        );
    }

    #[test]
    fn cache_rebuilds_only_when_obstacles_change() {
        let mut cache = GridCache::default();
        let walls = ObstacleSet::new(vec![Rect::new(0.0, 0.0, 32.0, 32.0)], None, Vec::new());
        cache.refresh(4, 4, TILE, &walls);
        cache.refresh(4, 4, TILE, &walls);
        assert_eq!(cache.rebuild_count(), 1);

        let moved = ObstacleSet::new(
            vec![Rect::new(0.0, 0.0, 32.0, 32.0)],
            Some(Rect::new(64.0, 64.0, 32.0, 32.0)),
            Vec::new(),
        );
        let grid = cache.refresh(4, 4, TILE, &moved);
        assert!(!grid.is_walkable(TileCoord::new(2, 2)));
        assert_eq!(cache.rebuild_count(), 2);
    }

    #[test]
    fn tile_at_rejects_points_off_the_map() {
        let grid = WalkGrid::open(2, 2);
        assert_eq!(grid.tile_at(Vec2::new(40.0, 10.0), TILE), Some(TileCoord::new(1, 0)));
        assert_eq!(grid.tile_at(Vec2::new(-1.0, 10.0), TILE), None);
        assert_eq!(grid.tile_at(Vec2::new(64.0, 0.0), TILE), None);
    }
}
