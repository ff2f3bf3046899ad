use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{write_text_atomic, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::bag::{Bag, BagRecord};
use crate::monster::MonsterRecord;
use crate::world::collision::TileCoord;
use crate::world::entity::{EnemyTrainer, Player, ShopKeeper};
use crate::world::map::{GameMap, MapLoadError, NavPoint, Teleport, TILE_SIZE};
use crate::world::movement::Direction;
use crate::world::{MapState, World, WorldError};

pub const SAVE_VERSION: u32 = 1;
pub const SAVE_FILE: &str = "game0.json";
pub const NEW_GAME_FILE: &str = "data/new_game.json";

#[derive(Debug, Error)]
pub enum SaveLoadError {
    #[error("failed to read save {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write save {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse save json{}: {message}", location_suffix(.location))]
    Parse { location: String, message: String },
    #[error("encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
    #[error(transparent)]
    Map(#[from] MapLoadError),
    #[error(transparent)]
    World(#[from] WorldError),
}

fn location_suffix(location: &str) -> String {
    if location.is_empty() || location == "." {
        String::new()
    } else {
        format!(" at {location}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl From<TilePos> for TileCoord {
    fn from(pos: TilePos) -> Self {
        TileCoord::new(pos.x, pos.y)
    }
}

impl From<TileCoord> for TilePos {
    fn from(tile: TileCoord) -> Self {
        TilePos {
            x: tile.x,
            y: tile.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub save_version: u32,
    pub current_map: String,
    pub player: SavedPlayer,
    pub maps: Vec<MapEntry>,
    #[serde(default)]
    pub bag: BagRecord,
}

/// Position in tile units; fractional values keep mid-step positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlayer {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<TilePos>,
    #[serde(default)]
    pub teleports: Vec<TeleportEntry>,
    #[serde(default)]
    pub enemy_trainers: Vec<TrainerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_keeper: Option<TilePos>,
    #[serde(default)]
    pub nav_points: Vec<NavPointEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeleportEntry {
    pub x: u32,
    pub y: u32,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_y: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerEntry {
    pub name: String,
    pub x: u32,
    pub y: u32,
    #[serde(default)]
    pub facing: Direction,
    pub monster: MonsterRecord,
    #[serde(default)]
    pub defeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPointEntry {
    pub name: String,
    pub x: u32,
    pub y: u32,
}

pub fn parse_save_json(raw: &str) -> Result<SaveGame, SaveLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SaveGame>(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        let message = error.into_inner().to_string();
        SaveLoadError::Parse { location, message }
    })
}

fn validation_err(path: impl Into<String>, message: impl Into<String>) -> SaveLoadError {
    SaveLoadError::Validation {
        path: path.into(),
        message: message.into(),
    }
}

fn expected_actual(path: impl Into<String>, expected: impl Display, actual: impl Display) -> SaveLoadError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

pub fn validate_save(save: &SaveGame) -> Result<(), SaveLoadError> {
    if save.save_version != SAVE_VERSION {
        return Err(expected_actual("save_version", SAVE_VERSION, save.save_version));
    }
    if save.maps.is_empty() {
        return Err(validation_err("maps", "at least one map is required"));
    }
    if !save.player.x.is_finite() || save.player.x < 0.0 {
        return Err(expected_actual("player.x", "finite non-negative number", save.player.x));
    }
    if !save.player.y.is_finite() || save.player.y < 0.0 {
        return Err(expected_actual("player.y", "finite non-negative number", save.player.y));
    }

    let mut known = HashSet::with_capacity(save.maps.len());
    for (index, entry) in save.maps.iter().enumerate() {
        if !known.insert(entry.path.as_str()) {
            return Err(validation_err(
                format!("maps[{index}].path"),
                format!("duplicate map '{}'", entry.path),
            ));
        }
    }
    if !known.contains(save.current_map.as_str()) {
        return Err(validation_err(
            "current_map",
            format!("unknown map '{}'", save.current_map),
        ));
    }

    for (map_index, entry) in save.maps.iter().enumerate() {
        for (index, teleport) in entry.teleports.iter().enumerate() {
            let path = format!("maps[{map_index}].teleports[{index}]");
            if !known.contains(teleport.destination.as_str()) {
                return Err(validation_err(
                    format!("{path}.destination"),
                    format!("unknown map '{}'", teleport.destination),
                ));
            }
            if teleport.dest_x.is_some() != teleport.dest_y.is_some() {
                return Err(validation_err(path, "dest_x and dest_y must be given together"));
            }
        }
        for (index, trainer) in entry.enemy_trainers.iter().enumerate() {
            validate_monster(
                &trainer.monster,
                &format!("maps[{map_index}].enemy_trainers[{index}].monster"),
            )?;
        }
    }

    for (index, monster) in save.bag.monsters.iter().enumerate() {
        validate_monster(monster, &format!("bag.monsters[{index}]"))?;
    }
    Ok(())
}

fn validate_monster(monster: &MonsterRecord, path: &str) -> Result<(), SaveLoadError> {
    if monster.name.trim().is_empty() {
        return Err(validation_err(format!("{path}.name"), "name must not be empty"));
    }
    if let (Some(hp), Some(max_hp)) = (monster.hp, monster.max_hp) {
        if hp > max_hp {
            return Err(expected_actual(
                format!("{path}.hp"),
                format!("at most max_hp {max_hp}"),
                hp,
            ));
        }
    }
    if monster.max_hp == Some(0) {
        return Err(expected_actual(format!("{path}.max_hp"), "positive number", 0));
    }
    Ok(())
}

pub fn read_save(path: &Path) -> Result<SaveGame, SaveLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| SaveLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let save = parse_save_json(&raw)?;
    validate_save(&save)?;
    info!(path = %path.display(), maps = save.maps.len(), "save_loaded");
    Ok(save)
}

pub fn write_save(path: &Path, save: &SaveGame) -> Result<(), SaveLoadError> {
    let json = serde_json::to_string_pretty(save).map_err(SaveLoadError::Encode)?;
    write_text_atomic(path, &json).map_err(|source| SaveLoadError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "save_written");
    Ok(())
}

/// Builds the live world and bag from a validated save. `load_map` supplies
/// the static geometry for each map path.
pub fn build_world<F>(save: &SaveGame, mut load_map: F) -> Result<(World, Bag), SaveLoadError>
where
    F: FnMut(&str) -> Result<GameMap, MapLoadError>,
{
    let mut states = Vec::with_capacity(save.maps.len());
    for entry in &save.maps {
        let mut map = load_map(&entry.path)?;
        map.teleports = entry
            .teleports
            .iter()
            .map(|teleport| Teleport {
                tile: TileCoord::new(teleport.x, teleport.y),
                destination: teleport.destination.clone(),
                dest_tile: teleport
                    .dest_x
                    .zip(teleport.dest_y)
                    .map(|(x, y)| TileCoord::new(x, y)),
            })
            .collect();
        map.nav_points = entry
            .nav_points
            .iter()
            .map(|point| NavPoint {
                name: point.name.clone(),
                tile: TileCoord::new(point.x, point.y),
            })
            .collect();
        let spawn = entry.spawn.map(TileCoord::from).unwrap_or(map.default_spawn);
        states.push(MapState {
            map,
            spawn,
            trainers: entry
                .enemy_trainers
                .iter()
                .map(|trainer| EnemyTrainer {
                    name: trainer.name.clone(),
                    tile: TileCoord::new(trainer.x, trainer.y),
                    facing: trainer.facing,
                    monster: trainer.monster.clone(),
                    defeated: trainer.defeated,
                })
                .collect(),
            shop_keeper: entry.shop_keeper.map(|tile| ShopKeeper { tile: tile.into() }),
        });
    }

    let player = Player {
        position: Vec2::new(save.player.x * TILE_SIZE, save.player.y * TILE_SIZE),
        direction: save.player.direction,
        moving: false,
    };
    let world = World::new(states, &save.current_map, player)?;
    Ok((world, Bag::from_record(&save.bag)))
}

pub fn capture(world: &World, bag: &Bag) -> SaveGame {
    let maps = world
        .maps()
        .iter()
        .map(|state| MapEntry {
            path: state.map.id.clone(),
            spawn: Some(state.spawn.into()),
            teleports: state
                .map
                .teleports
                .iter()
                .map(|teleport| TeleportEntry {
                    x: teleport.tile.x,
                    y: teleport.tile.y,
                    destination: teleport.destination.clone(),
                    dest_x: teleport.dest_tile.map(|tile| tile.x),
                    dest_y: teleport.dest_tile.map(|tile| tile.y),
                })
                .collect(),
            enemy_trainers: state
                .trainers
                .iter()
                .map(|trainer| TrainerEntry {
                    name: trainer.name.clone(),
                    x: trainer.tile.x,
                    y: trainer.tile.y,
                    facing: trainer.facing,
                    monster: trainer.monster.clone(),
                    defeated: trainer.defeated,
                })
                .collect(),
            shop_keeper: state.shop_keeper.as_ref().map(|keeper| keeper.tile.into()),
            nav_points: state
                .map
                .nav_points
                .iter()
                .map(|point| NavPointEntry {
                    name: point.name.clone(),
                    x: point.tile.x,
                    y: point.tile.y,
                })
                .collect(),
        })
        .collect();

    SaveGame {
        save_version: SAVE_VERSION,
        current_map: world.current_map().id.clone(),
        player: SavedPlayer {
            x: world.player.position.x / TILE_SIZE,
            y: world.player.position.y / TILE_SIZE,
            direction: world.player.direction,
        },
        maps,
        bag: bag.to_record(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::Item;
    use crate::monster::Element;
    use crate::world::map::CellKind;
    use tempfile::TempDir;

    fn open_map(id: &str) -> Result<GameMap, MapLoadError> {
        Ok(GameMap {
            id: id.to_string(),
            width: 10,
            height: 10,
            walls: Vec::new(),
            bushes: Vec::new(),
            cells: vec![CellKind::Ground; 100],
            default_spawn: TileCoord::new(1, 1),
            music: None,
            teleports: Vec::new(),
            nav_points: Vec::new(),
        })
    }

    fn full_monster(name: &str, hp: u32) -> MonsterRecord {
        MonsterRecord {
            name: name.to_string(),
            hp: Some(hp),
            max_hp: Some(50),
            level: Some(4),
            sprite: Some("sprites/leafy".to_string()),
            element: Some(Element::Grass),
            atk: Some(10),
            def: Some(5),
            atk_buff: Some(0),
            def_buff: Some(0),
            evolve_level: Some(6),
            evolve_to_sprite: Some("sprites/leafy_big".to_string()),
            evolved: false,
        }
    }

    fn sample_save() -> SaveGame {
        SaveGame {
            save_version: SAVE_VERSION,
            current_map: "map.tmx".to_string(),
            player: SavedPlayer {
                x: 3.5,
                y: 2.0,
                direction: Direction::Left,
            },
            maps: vec![
                MapEntry {
                    path: "map.tmx".to_string(),
                    spawn: Some(TilePos { x: 2, y: 2 }),
                    teleports: vec![TeleportEntry {
                        x: 5,
                        y: 0,
                        destination: "gym.tmx".to_string(),
                        dest_x: Some(4),
                        dest_y: Some(8),
                    }],
                    enemy_trainers: Vec::new(),
                    shop_keeper: Some(TilePos { x: 7, y: 7 }),
                    nav_points: vec![NavPointEntry {
                        name: "Gym".to_string(),
                        x: 5,
                        y: 1,
                    }],
                },
                MapEntry {
                    path: "gym.tmx".to_string(),
                    spawn: Some(TilePos { x: 4, y: 8 }),
                    teleports: vec![TeleportEntry {
                        x: 4,
                        y: 9,
                        destination: "map.tmx".to_string(),
                        dest_x: None,
                        dest_y: None,
                    }],
                    enemy_trainers: vec![TrainerEntry {
                        name: "Brock".to_string(),
                        x: 4,
                        y: 2,
                        facing: Direction::Down,
                        monster: full_monster("Rocko", 40),
                        defeated: false,
                    }],
                    shop_keeper: None,
                    nav_points: Vec::new(),
                },
            ],
            bag: BagRecord {
                monsters: vec![full_monster("Leafy", 30)],
                items: vec![
                    Item {
                        name: "Coins".to_string(),
                        count: 25,
                        sprite: "ui/coin".to_string(),
                    },
                    Item {
                        name: "Heal Potion".to_string(),
                        count: 0,
                        sprite: "ui/heal_potion".to_string(),
                    },
                ],
            },
        }
    }

    #[test]
    fn build_then_capture_round_trips() {
        let save = sample_save();
        let (world, bag) = build_world(&save, open_map).expect("world");
        assert_eq!(world.player.position, Vec2::new(112.0, 64.0));
        assert_eq!(bag.coins(), 25);
        assert_eq!(capture(&world, &bag), save);
    }

    #[test]
    fn json_file_round_trips() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("saves").join(SAVE_FILE);
        let save = sample_save();
        write_save(&path, &save).expect("write");
        assert_eq!(read_save(&path).expect("read"), save);
    }

    #[test]
    fn parse_errors_carry_json_path() {
        let mut value = serde_json::to_value(sample_save()).expect("value");
        value["maps"][1]["teleports"][0]["x"] = serde_json::json!("left");
        let error = parse_save_json(&value.to_string()).expect_err("bad type");
        let message = error.to_string();
        assert!(message.contains("maps[1].teleports[0].x"), "{message}");
    }

    #[test]
    fn missing_version_is_reported() {
        let mut value = serde_json::to_value(sample_save()).expect("value");
        value.as_object_mut().expect("object").remove("save_version");
        let error = parse_save_json(&value.to_string()).expect_err("missing field");
        assert!(error.to_string().contains("save_version"));
    }

    #[test]
    fn validation_rejects_unknown_maps_and_bad_stats() {
        let mut save = sample_save();
        save.save_version = SAVE_VERSION + 1;
        assert!(matches!(validate_save(&save), Err(SaveLoadError::Validation { .. })));

        let mut save = sample_save();
        save.maps[0].teleports[0].destination = "moon.tmx".to_string();
        let error = validate_save(&save).expect_err("unknown destination");
        assert!(error.to_string().contains("maps[0].teleports[0].destination"));

        let mut save = sample_save();
        save.current_map = "moon.tmx".to_string();
        assert!(validate_save(&save).is_err());

        let mut save = sample_save();
        save.bag.monsters[0].hp = Some(99);
        let error = validate_save(&save).expect_err("hp above max");
        assert!(error.to_string().contains("bag.monsters[0].hp"));

        let mut save = sample_save();
        save.player.x = f32::NAN;
        assert!(validate_save(&save).is_err());

        let mut save = sample_save();
        save.maps[0].teleports[0].dest_y = None;
        assert!(validate_save(&save).is_err());
    }

    #[test]
    fn sparse_monster_fields_load_with_defaults() {
        let raw = r#"{
            "save_version": 1,
            "current_map": "map.tmx",
            "player": {"x": 1, "y": 1},
            "maps": [{"path": "map.tmx"}],
            "bag": {"monsters": [{"name": "Sparky", "sprite_path": "sprites/sparky"}], "items": []}
        }"#;
        let save = parse_save_json(raw).expect("parse");
        validate_save(&save).expect("valid");
        let (world, bag) = build_world(&save, open_map).expect("world");
        assert_eq!(world.current().spawn, TileCoord::new(1, 1));
        assert_eq!(bag.monsters[0].level, 1);
        assert_eq!(bag.monsters[0].hp, 50);
        assert_eq!(bag.monsters[0].sprite, "sprites/sparky");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = TempDir::new().expect("temp");
        assert!(matches!(
            read_save(&temp.path().join("none.json")),
            Err(SaveLoadError::Read { .. })
        ));
    }
}
