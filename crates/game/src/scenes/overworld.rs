use engine::{
    DrawList, InputAction, InputSnapshot, Rect, Rgba, Scene, SceneCommand, Vec2,
};
use tracing::{debug, info};

use crate::app::context::{BattleRequest, GameContext};
use crate::audio::OVERWORLD_BGM;
use crate::battle::BattleKind;
use crate::net::QUICK_CHAT_TEXT;
use crate::world::collision::TileCoord;
use crate::world::map::{CellKind, TILE_SIZE};
use crate::world::movement::input_vector;
use crate::world::WorldEvent;

use super::ui::{self, SCREEN_H, SCREEN_W};
use super::GameScene;

const GROUND: Rgba = [112, 176, 96, 255];
const BLOCKED: Rgba = [64, 84, 60, 255];
const BUSH: Rgba = [52, 132, 60, 255];
const VOID: Rgba = [16, 16, 20, 255];
const TELEPORT: Rgba = [120, 160, 255, 255];
const TRAINER: Rgba = [200, 64, 64, 255];
const SHOP_KEEPER: Rgba = [64, 96, 200, 255];
const PLAYER: Rgba = [250, 240, 120, 255];
const REMOTE_PLAYER: Rgba = [200, 120, 240, 255];
const PATH_DOT: Rgba = [255, 255, 255, 160];

pub struct OverworldScene {
    direction: Vec2,
}

impl OverworldScene {
    pub fn new() -> Self {
        Self {
            direction: Vec2::ZERO,
        }
    }
}

fn music_for(ctx: &GameContext) -> String {
    ctx.world
        .current_map()
        .music
        .clone()
        .unwrap_or_else(|| OVERWORLD_BGM.to_string())
}

impl Scene<GameScene, GameContext> for OverworldScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        self.direction = Vec2::ZERO;
        let track = music_for(ctx);
        ctx.audio.play_bgm(&track);
    }

    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        self.direction = input_vector(input);

        if input.was_pressed(InputAction::Cancel) && ctx.world.nav_path().is_active() {
            ctx.world.cancel_route();
            debug!("auto_walk_cancelled");
        }
        if input.was_pressed(InputAction::OpenBag) {
            return SceneCommand::SwitchTo(GameScene::Backpack);
        }
        if input.was_pressed(InputAction::OpenMap) {
            return SceneCommand::SwitchTo(GameScene::Navigation);
        }
        if input.was_pressed(InputAction::OpenSettings) {
            return SceneCommand::SwitchTo(GameScene::SettingsFromGame);
        }
        if input.was_pressed(InputAction::QuickChat) {
            if let Some(online) = ctx.online.as_mut() {
                online.send_chat(QUICK_CHAT_TEXT);
            }
        }
        if input.was_pressed(InputAction::Interact) {
            if let Some(index) = ctx.world.trainer_in_reach() {
                if let Some(trainer) = ctx.world.trainer(index) {
                    info!(trainer = %trainer.name, "trainer_challenged");
                    ctx.battle_request = Some(BattleRequest {
                        enemy: trainer.monster.clone(),
                        kind: BattleKind::Trainer(index),
                    });
                    return SceneCommand::SwitchTo(GameScene::Battle);
                }
            }
            if ctx.world.near_shop_keeper() {
                return SceneCommand::SwitchTo(GameScene::Shop);
            }
        }
        SceneCommand::None
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        ctx.toasts.tick(dt_seconds);
        let event = ctx.world.step(self.direction, dt_seconds);

        if let Some(online) = ctx.online.as_mut() {
            online.update(
                dt_seconds,
                &ctx.world.current_map().id,
                ctx.world.player.position,
                ctx.world.player.direction,
            );
        }

        match event {
            Some(WorldEvent::Encounter) => return SceneCommand::SwitchTo(GameScene::Catch),
            Some(WorldEvent::Teleported { .. }) => {
                let track = music_for(ctx);
                ctx.audio.play_bgm(&track);
            }
            Some(WorldEvent::Arrived) => ctx.toasts.push("Arrived"),
            Some(WorldEvent::PathBlocked) => ctx.toasts.push("Path blocked"),
            None => {}
        }
        SceneCommand::None
    }

    fn draw(&self, ctx: &GameContext, frame: &mut DrawList) {
        draw_world(ctx, frame);

        let map = ctx.world.current_map();
        ui::text_at(frame, 12.0, 12.0, map.id.trim_end_matches(".tmx"), ui::TEXT_LIGHT);
        ui::text_at(
            frame,
            12.0,
            32.0,
            format!("Coins: {}", ctx.bag.coins()),
            ui::TEXT_LIGHT,
        );
        let hint = if ctx.world.trainer_in_reach().is_some() {
            "E: battle"
        } else if ctx.world.near_shop_keeper() {
            "E: shop"
        } else {
            "B: bag  M: map  P: settings"
        };
        ui::text_at(frame, 12.0, SCREEN_H - 24.0, hint, ui::TEXT_LIGHT);
        ui::toasts(frame, &ctx.toasts);
    }

    fn debug_title(&self, ctx: &GameContext) -> Option<String> {
        let tile = ctx.world.player.tile();
        Some(format!(
            "{} ({}, {})",
            ctx.world.current_map().id,
            tile.x,
            tile.y
        ))
    }
}

/// Top-left of the view in world pixels. Follows the player, clamped to the
/// map; maps smaller than the screen are centred.
pub fn camera_offset(player_center: Vec2, map_size: Vec2) -> Vec2 {
    let axis = |center: f32, map: f32, view: f32| {
        if map <= view {
            (map - view) * 0.5
        } else {
            (center - view * 0.5).clamp(0.0, map - view)
        }
    };
    Vec2::new(
        axis(player_center.x, map_size.x, SCREEN_W),
        axis(player_center.y, map_size.y, SCREEN_H),
    )
}

fn to_screen(rect: Rect, camera: Vec2) -> Rect {
    Rect::new(rect.x - camera.x, rect.y - camera.y, rect.w, rect.h)
}

/// Map, entities and player without HUD. Also used as the overlay backdrop.
pub fn draw_world(ctx: &GameContext, frame: &mut DrawList) {
    frame.clear(VOID);
    let world = &ctx.world;
    let state = world.current();
    let map = &state.map;
    let camera = camera_offset(world.player.rect().center(), map.pixel_size());

    let first_x = (camera.x / TILE_SIZE).floor().max(0.0) as u32;
    let first_y = (camera.y / TILE_SIZE).floor().max(0.0) as u32;
    let last_x = (((camera.x + SCREEN_W) / TILE_SIZE).ceil().max(0.0) as u32).min(map.width);
    let last_y = (((camera.y + SCREEN_H) / TILE_SIZE).ceil().max(0.0) as u32).min(map.height);
    for y in first_y..last_y {
        for x in first_x..last_x {
            let tile = TileCoord::new(x, y);
            let color = match map.cell(tile) {
                CellKind::Empty => continue,
                CellKind::Ground => GROUND,
                CellKind::Blocked => BLOCKED,
                CellKind::Bush => BUSH,
            };
            frame.fill(to_screen(tile.rect(TILE_SIZE), camera), color);
        }
    }

    for teleport in &map.teleports {
        frame.outline(to_screen(teleport.rect(), camera), TELEPORT);
    }
    for waypoint in world.nav_path().waypoints() {
        let center = waypoint.rect(TILE_SIZE).center();
        frame.fill(
            Rect::new(center.x - camera.x - 3.0, center.y - camera.y - 3.0, 6.0, 6.0),
            PATH_DOT,
        );
    }
    for trainer in &state.trainers {
        frame.sprite("sprites/trainer", to_screen(trainer.rect(), camera), TRAINER);
    }
    if let Some(keeper) = &state.shop_keeper {
        frame.sprite("sprites/shopkeeper", to_screen(keeper.rect(), camera), SHOP_KEEPER);
    }

    if let Some(online) = &ctx.online {
        for remote in online.players_on(&map.id) {
            let rect = Rect::from_position(remote.position, TILE_SIZE, TILE_SIZE);
            let screen_rect = to_screen(rect, camera);
            frame.sprite("sprites/player", screen_rect, REMOTE_PLAYER);
            if let Some(bubble) = online.bubble(remote.id) {
                chat_bubble(frame, screen_rect, &bubble.text);
            }
        }
    }

    let player_rect = to_screen(world.player.rect(), camera);
    frame.sprite("sprites/player", player_rect, PLAYER);
    if let Some(bubble) = ctx
        .online
        .as_ref()
        .and_then(|online| online.bubble(online.local_id()))
    {
        chat_bubble(frame, player_rect, &bubble.text);
    }
}

fn chat_bubble(frame: &mut DrawList, anchor: Rect, text: &str) {
    let width = engine::text_width_px(text, 2) as f32 + 12.0;
    let rect = Rect::new(
        anchor.center().x - width * 0.5,
        anchor.y - 28.0,
        width,
        22.0,
    );
    frame.fill(rect, ui::PANEL);
    frame.outline(rect, ui::PANEL_EDGE);
    ui::text_centered(frame, rect, text, ui::TEXT, 2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::test_support::context;
    use crate::monster::MonsterRecord;
    use crate::world::entity::{EnemyTrainer, Player};
    use crate::world::movement::Direction;
    use crate::world::World;
    use tempfile::TempDir;

    #[test]
    fn camera_clamps_to_map_and_centres_small_maps() {
        let big = Vec2::new(3200.0, 3200.0);
        assert_eq!(camera_offset(Vec2::new(10.0, 10.0), big), Vec2::ZERO);
        assert_eq!(
            camera_offset(Vec2::new(1600.0, 1600.0), big),
            Vec2::new(1120.0, 1280.0)
        );
        assert_eq!(
            camera_offset(Vec2::new(3190.0, 3190.0), big),
            Vec2::new(2240.0, 2560.0)
        );
        assert_eq!(
            camera_offset(Vec2::new(10.0, 10.0), Vec2::new(320.0, 320.0)),
            Vec2::new(-320.0, -160.0)
        );
    }

    #[test]
    fn interact_next_to_trainer_queues_battle() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        let mut state = ctx.world.current().clone();
        state.trainers.push(EnemyTrainer {
            name: "Misty".to_string(),
            tile: TileCoord::new(2, 1),
            facing: Direction::Left,
            monster: MonsterRecord::named("Splashy"),
            defeated: false,
        });
        ctx.world = World::new(
            vec![state],
            "map.tmx",
            Player::at_tile(TileCoord::new(1, 1)),
        )
        .expect("world");

        let mut scene = OverworldScene::new();
        scene.enter(&mut ctx);
        let input = InputSnapshot::empty().with_action_pressed(InputAction::Interact);
        assert_eq!(
            scene.handle_input(&input, &mut ctx),
            SceneCommand::SwitchTo(GameScene::Battle)
        );
        assert_eq!(
            ctx.battle_request.as_ref().map(|request| request.kind),
            Some(BattleKind::Trainer(0))
        );
    }

    #[test]
    fn cancel_abandons_auto_walk() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        ctx.world.plan_route_to(TileCoord::new(5, 5)).expect("route");
        let mut scene = OverworldScene::new();
        let input = InputSnapshot::empty().with_action_pressed(InputAction::Cancel);
        assert_eq!(scene.handle_input(&input, &mut ctx), SceneCommand::None);
        assert!(!ctx.world.nav_path().is_active());
    }
}
