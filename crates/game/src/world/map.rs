use std::path::{Path, PathBuf};

use engine::{load_tmx, Properties, Rect, TmxError, TmxMap, Vec2};
use thiserror::Error;
use tracing::{debug, info};

use super::collision::TileCoord;

pub const TILE_SIZE: f32 = 32.0;

const BLOCKING_LAYER_KEYWORDS: [&str; 7] =
    ["collision", "wall", "block", "tree", "house", "fence", "water"];
const BLOCKING_TILE_PROPERTIES: [&str; 3] = ["collide", "blocked", "solid"];
const WALL_GROUP_KEYWORDS: [&str; 3] = ["collision", "wall", "block"];
const BUSH_KEYWORDS: [&str; 3] = ["bush", "grass", "encounter"];

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("map {id} could not be loaded: {source}")]
    Tmx {
        id: String,
        #[source]
        source: TmxError,
    },
    #[error("map {id} has non-square tiles ({width}x{height})")]
    NonSquareTiles { id: String, width: u32, height: u32 },
    #[error("map {id} is empty")]
    Empty { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Ground,
    Blocked,
    Bush,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teleport {
    pub tile: TileCoord,
    pub destination: String,
    pub dest_tile: Option<TileCoord>,
}

impl Teleport {
    pub fn rect(&self) -> Rect {
        self.tile.rect(TILE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub name: String,
    pub tile: TileCoord,
}

/// Static geometry of one map, scaled to world pixels. Teleports, spawn
/// override and navigation points come from the save file and are attached
/// by the world.
#[derive(Debug, Clone, PartialEq)]
pub struct GameMap {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub walls: Vec<Rect>,
    pub bushes: Vec<Rect>,
    pub cells: Vec<CellKind>,
    pub default_spawn: TileCoord,
    pub music: Option<String>,
    pub teleports: Vec<Teleport>,
    pub nav_points: Vec<NavPoint>,
}

impl GameMap {
    pub fn load(maps_dir: &Path, id: &str) -> Result<Self, MapLoadError> {
        let path: PathBuf = maps_dir.join(id);
        let tmx = load_tmx(&path).map_err(|source| MapLoadError::Tmx {
            id: id.to_string(),
            source,
        })?;
        let map = Self::from_tmx(id, &tmx)?;
        info!(
            map = id,
            width = map.width,
            height = map.height,
            walls = map.walls.len(),
            bushes = map.bushes.len(),
            "map_loaded"
        );
        Ok(map)
    }

    pub fn from_tmx(id: &str, tmx: &TmxMap) -> Result<Self, MapLoadError> {
        if tmx.tile_width != tmx.tile_height {
            return Err(MapLoadError::NonSquareTiles {
                id: id.to_string(),
                width: tmx.tile_width,
                height: tmx.tile_height,
            });
        }
        if tmx.width == 0 || tmx.height == 0 {
            return Err(MapLoadError::Empty { id: id.to_string() });
        }
        let scale = TILE_SIZE / tmx.tile_width as f32;
        let mut cells = vec![CellKind::Empty; tmx.width as usize * tmx.height as usize];
        let mut walls = Vec::new();
        let mut bushes = Vec::new();

        for layer in &tmx.layers {
            let name = layer.name.to_ascii_lowercase();
            let layer_blocks = contains_any(&name, &BLOCKING_LAYER_KEYWORDS);
            let layer_bush = contains_any(&name, &["bush"]);
            for y in 0..layer.height.min(tmx.height) {
                for x in 0..layer.width.min(tmx.width) {
                    let gid = layer.gid_at(x, y);
                    if gid == 0 {
                        continue;
                    }
                    let tile = TileCoord::new(x, y);
                    let index = y as usize * tmx.width as usize + x as usize;
                    let tile_blocks = tmx
                        .tile_properties(gid)
                        .is_some_and(|props| flag_set(props, &BLOCKING_TILE_PROPERTIES));
                    if layer_blocks || tile_blocks {
                        walls.push(tile.rect(TILE_SIZE));
                        cells[index] = CellKind::Blocked;
                    } else if layer_bush {
                        bushes.push(tile.rect(TILE_SIZE));
                        if cells[index] != CellKind::Blocked {
                            cells[index] = CellKind::Bush;
                        }
                    } else if cells[index] == CellKind::Empty {
                        cells[index] = CellKind::Ground;
                    }
                }
            }
        }

        let mut default_spawn = None;
        for group in &tmx.object_groups {
            let name = group.name.to_ascii_lowercase();
            let is_wall_group = contains_any(&name, &WALL_GROUP_KEYWORDS);
            let is_bush_group = contains_any(&name, &BUSH_KEYWORDS);
            for object in &group.objects {
                let rect = Rect::new(
                    object.x * scale,
                    object.y * scale,
                    object.width * scale,
                    object.height * scale,
                );
                if object.name.eq_ignore_ascii_case("spawn") {
                    default_spawn = Some(tile_of_point(Vec2::new(rect.x, rect.y)));
                    continue;
                }
                if is_wall_group {
                    walls.push(rect);
                } else if is_bush_group {
                    mark_cells(&mut cells, tmx.width, tmx.height, rect, CellKind::Bush);
                    bushes.push(rect);
                }
            }
        }
        let default_spawn = default_spawn
            .or_else(|| spawn_from_properties(&tmx.properties))
            .unwrap_or(TileCoord::new(0, 0));

        debug!(map = id, scale, "map_geometry_scaled");
        Ok(Self {
            id: id.to_string(),
            width: tmx.width,
            height: tmx.height,
            walls,
            bushes,
            cells,
            default_spawn,
            music: tmx.properties.get("music").cloned(),
            teleports: Vec::new(),
            nav_points: Vec::new(),
        })
    }

    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(self.width as f32 * TILE_SIZE, self.height as f32 * TILE_SIZE)
    }

    pub fn pixel_rect(&self) -> Rect {
        let size = self.pixel_size();
        Rect::new(0.0, 0.0, size.x, size.y)
    }

    pub fn cell(&self, tile: TileCoord) -> CellKind {
        if tile.x >= self.width || tile.y >= self.height {
            return CellKind::Empty;
        }
        self.cells
            .get(tile.y as usize * self.width as usize + tile.x as usize)
            .copied()
            .unwrap_or(CellKind::Empty)
    }

    /// Teleport whose trigger tile contains `point`.
    pub fn teleport_at(&self, point: Vec2) -> Option<&Teleport> {
        self.teleports
            .iter()
            .find(|teleport| teleport.rect().contains_point(point))
    }

    pub fn overlaps_bush(&self, rect: &Rect) -> bool {
        self.bushes.iter().any(|bush| bush.intersects(rect))
    }

    pub fn nav_point(&self, name: &str) -> Option<&NavPoint> {
        self.nav_points
            .iter()
            .find(|point| point.name.eq_ignore_ascii_case(name))
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

fn flag_set(props: &Properties, keys: &[&str]) -> bool {
    keys.iter().any(|key| {
        props
            .get(*key)
            .is_some_and(|value| value.eq_ignore_ascii_case("true") || value == "1")
    })
}

fn tile_of_point(point: Vec2) -> TileCoord {
    TileCoord::new(
        (point.x / TILE_SIZE).floor().max(0.0) as u32,
        (point.y / TILE_SIZE).floor().max(0.0) as u32,
    )
}

fn spawn_from_properties(props: &Properties) -> Option<TileCoord> {
    let x = props.get("spawn_x")?.trim().parse().ok()?;
    let y = props.get("spawn_y")?.trim().parse().ok()?;
    Some(TileCoord::new(x, y))
}

fn mark_cells(cells: &mut [CellKind], width: u32, height: u32, rect: Rect, kind: CellKind) {
    if rect.is_empty() {
        return;
    }
    let x0 = (rect.x / TILE_SIZE).floor().max(0.0) as u32;
    let y0 = (rect.y / TILE_SIZE).floor().max(0.0) as u32;
    let x1 = ((rect.right() / TILE_SIZE).ceil().max(0.0) as u32).min(width);
    let y1 = ((rect.bottom() / TILE_SIZE).ceil().max(0.0) as u32).min(height);
    for y in y0..y1 {
        for x in x0..x1 {
            let index = y as usize * width as usize + x as usize;
            if cells[index] != CellKind::Blocked {
                cells[index] = kind;
            }
        }
    }
}
