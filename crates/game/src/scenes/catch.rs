use engine::{DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand};
use rand::Rng;
use tracing::info;

use crate::app::context::{BattleRequest, GameContext};
use crate::battle::BattleKind;
use crate::monster::MonsterRecord;

use super::ui::{self, ButtonList, SCREEN_W};
use super::GameScene;

pub const WILD_LEVEL_RANGE: std::ops::RangeInclusive<u32> = 2..=10;

struct WildTemplate {
    name: &'static str,
    max_hp: u32,
    sprite: &'static str,
    evolve_level: u32,
    evolve_to_sprite: &'static str,
}

const WILD_POOL: [WildTemplate; 3] = [
    WildTemplate {
        name: "Leafy",
        max_hp: 30,
        sprite: "sprites/leafy",
        evolve_level: 6,
        evolve_to_sprite: "sprites/leafy_evolved",
    },
    WildTemplate {
        name: "Sparky",
        max_hp: 25,
        sprite: "sprites/sparky",
        evolve_level: 5,
        evolve_to_sprite: "sprites/sparky_evolved",
    },
    WildTemplate {
        name: "Rocko",
        max_hp: 40,
        sprite: "sprites/rocko",
        evolve_level: 7,
        evolve_to_sprite: "sprites/rocko_evolved",
    },
];

/// Random wild monster at full hp with a level in `2..=10`.
pub fn roll_wild(rng: &mut impl Rng) -> MonsterRecord {
    let template = &WILD_POOL[rng.gen_range(0..WILD_POOL.len())];
    MonsterRecord {
        hp: Some(template.max_hp),
        max_hp: Some(template.max_hp),
        level: Some(rng.gen_range(WILD_LEVEL_RANGE)),
        sprite: Some(template.sprite.to_string()),
        evolve_level: Some(template.evolve_level),
        evolve_to_sprite: Some(template.evolve_to_sprite.to_string()),
        ..MonsterRecord::named(template.name)
    }
}

const CATCH: usize = 0;
const FIGHT: usize = 1;
const RUN: usize = 2;

pub struct CatchScene {
    wild: Option<MonsterRecord>,
    buttons: ButtonList,
}

impl CatchScene {
    pub fn new() -> Self {
        Self {
            wild: None,
            buttons: ButtonList::horizontal(
                &["Catch", "Fight", "Run"],
                (SCREEN_W - 3.0 * 180.0 - 2.0 * 20.0) * 0.5,
                520.0,
                180.0,
                48.0,
                20.0,
            ),
        }
    }

    fn catch(&mut self, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        if let Some(wild) = self.wild.take() {
            info!(monster = %wild.name, level = ?wild.level, "monster_caught");
            ctx.toasts.push(format!("Caught {}!", wild.name));
            ctx.bag.monsters.push(wild.normalize(1));
        }
        SceneCommand::SwitchTo(GameScene::Overworld)
    }

    fn fight(&mut self, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        match self.wild.take() {
            Some(enemy) => {
                ctx.battle_request = Some(BattleRequest {
                    enemy,
                    kind: BattleKind::Wild,
                });
                SceneCommand::SwitchTo(GameScene::Battle)
            }
            None => SceneCommand::SwitchTo(GameScene::Overworld),
        }
    }
}

impl Scene<GameScene, GameContext> for CatchScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        let wild = roll_wild(&mut ctx.rng);
        info!(monster = %wild.name, level = ?wild.level, "wild_monster_appeared");
        self.wild = Some(wild);
        self.buttons.reset();
    }

    fn exit(&mut self, _ctx: &mut GameContext) {
        self.wild = None;
    }

    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        if input.was_pressed(InputAction::Catch) {
            return self.catch(ctx);
        }
        if input.was_pressed(InputAction::Cancel) {
            return SceneCommand::SwitchTo(GameScene::Overworld);
        }
        match self.buttons.handle(input) {
            Some(CATCH) => self.catch(ctx),
            Some(FIGHT) => self.fight(ctx),
            Some(RUN) => SceneCommand::SwitchTo(GameScene::Overworld),
            _ => SceneCommand::None,
        }
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        ctx.toasts.tick(dt_seconds);
        SceneCommand::None
    }

    fn draw(&self, ctx: &GameContext, frame: &mut DrawList) {
        frame.clear([0, 0, 0, 255]);
        if let Some(wild) = &self.wild {
            let sprite = wild.sprite.clone().unwrap_or_default();
            frame.sprite(sprite, Rect::new(390.0, 140.0, 180.0, 180.0), [90, 160, 90, 255]);
            ui::text_centered(
                frame,
                Rect::new(0.0, 340.0, SCREEN_W, 40.0),
                &format!("A wild {} (Lv {}) appeared!", wild.name, wild.level.unwrap_or(1)),
                ui::TEXT_LIGHT,
                3,
            );
            ui::text_centered(
                frame,
                Rect::new(0.0, 400.0, SCREEN_W, 30.0),
                "Press C to catch!",
                ui::TEXT_LIGHT,
                2,
            );
        }
        self.buttons.draw(frame);
        ui::toasts(frame, &ctx.toasts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::test_support::context;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn wild_monsters_come_from_pool_at_full_hp() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let wild = roll_wild(&mut rng);
            assert!(["Leafy", "Sparky", "Rocko"].contains(&wild.name.as_str()));
            assert_eq!(wild.hp, wild.max_hp);
            assert!(WILD_LEVEL_RANGE.contains(&wild.level.expect("level")));
        }
    }

    #[test]
    fn catching_adds_copy_to_bag() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        let mut scene = CatchScene::new();
        scene.enter(&mut ctx);
        let expected = scene.wild.clone().expect("wild");

        let input = InputSnapshot::empty().with_action_pressed(InputAction::Catch);
        assert_eq!(
            scene.handle_input(&input, &mut ctx),
            SceneCommand::SwitchTo(GameScene::Overworld)
        );
        let caught = ctx.bag.monsters.last().expect("caught");
        assert_eq!(caught.name, expected.name);
        assert_eq!(Some(caught.level), expected.level);
        assert_eq!(caught.hp, caught.max_hp);
    }

    #[test]
    fn fight_queues_wild_battle() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        let mut scene = CatchScene::new();
        scene.enter(&mut ctx);
        let input = InputSnapshot::empty()
            .with_action_pressed(InputAction::MoveRight)
            .with_action_pressed(InputAction::Confirm);
        assert_eq!(
            scene.handle_input(&input, &mut ctx),
            SceneCommand::SwitchTo(GameScene::Battle)
        );
        assert_eq!(
            ctx.battle_request.as_ref().map(|request| request.kind),
            Some(BattleKind::Wild)
        );
    }
}
