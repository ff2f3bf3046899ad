use engine::{DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand};
use tracing::{info, warn};

use crate::app::context::GameContext;
use crate::bag::Potion;
use crate::battle::{Battle, BattleKind, BattleOutcome, BattleState, ItemChoice, PlayerAction};
use crate::monster::Monster;

use super::ui::{self, ButtonList, SCREEN_H, SCREEN_W};
use super::GameScene;

const ACTIONS: [PlayerAction; 4] = [
    PlayerAction::Fight,
    PlayerAction::Item,
    PlayerAction::Switch,
    PlayerAction::Run,
];
const ITEM_CHOICES: [ItemChoice; 4] = [
    ItemChoice::Use(Potion::Heal),
    ItemChoice::Use(Potion::Strength),
    ItemChoice::Use(Potion::Defense),
    ItemChoice::Back,
];

const ENEMY_SPRITE: Rect = Rect::new(600.0, 70.0, 180.0, 180.0);
const PLAYER_SPRITE: Rect = Rect::new(160.0, 250.0, 180.0, 180.0);
const MESSAGE_BOX: Rect = Rect::new(20.0, 460.0, 920.0, 60.0);

/// Hosts one `Battle` at a time. The battle to run is taken from the
/// context on enter.
pub struct BattleScene {
    battle: Option<Battle>,
    actions: ButtonList,
    items: ButtonList,
}

impl BattleScene {
    pub fn new() -> Self {
        Self {
            battle: None,
            actions: ButtonList::horizontal(&["Fight", "Item", "Switch", "Run"], 40.0, 550.0, 200.0, 56.0, 26.0),
            items: ButtonList::horizontal(
                &["Heal", "Strength", "Defense", "Back"],
                40.0,
                550.0,
                200.0,
                56.0,
                26.0,
            ),
        }
    }

    fn finish(&mut self, outcome: BattleOutcome, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        let Some(battle) = self.battle.take() else {
            return SceneCommand::SwitchTo(GameScene::Overworld);
        };
        match (outcome, battle.kind()) {
            (BattleOutcome::Won, BattleKind::Trainer(index)) => {
                ctx.world.mark_trainer_defeated(index);
                ctx.toasts.push("You beat the trainer!");
            }
            (BattleOutcome::Won, BattleKind::Wild) => ctx.toasts.push("You won!"),
            (BattleOutcome::Lost, _) => ctx.toasts.push("Your monster fainted..."),
            (BattleOutcome::Fled, _) => ctx.toasts.push("Got away safely"),
        }
        SceneCommand::SwitchTo(GameScene::Overworld)
    }
}

impl Scene<GameScene, GameContext> for BattleScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        self.actions.reset();
        self.items.reset();
        self.battle = None;

        let Some(request) = ctx.battle_request.take() else {
            warn!("battle_entered_without_request");
            return;
        };
        let mut battle = Battle::prepare(&request.enemy, request.kind, &mut ctx.rng);
        match battle.start(&ctx.bag) {
            Ok(()) => {
                ctx.audio.play_sound("battle_start.ogg", crate::audio::DEFAULT_SOUND_VOLUME);
                self.battle = Some(battle);
            }
            Err(err) => {
                info!(error = %err, "battle_refused");
                ctx.toasts.push(err.to_string());
            }
        }
    }

    fn exit(&mut self, _ctx: &mut GameContext) {
        self.battle = None;
    }

    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        let Some(battle) = self.battle.as_mut() else {
            return SceneCommand::None;
        };
        match battle.state() {
            BattleState::PlayerTurn => {
                let action = self.actions.handle(input).and_then(|index| ACTIONS.get(index).copied());
                if let Some(action) = action {
                    if action == PlayerAction::Item {
                        self.items.reset();
                    }
                    if let Some(outcome) = battle.choose_action(action, &mut ctx.bag) {
                        return self.finish(outcome, ctx);
                    }
                }
            }
            BattleState::ItemMenu => {
                if input.was_pressed(InputAction::Cancel) {
                    battle.choose_item(ItemChoice::Back, &mut ctx.bag);
                } else if let Some(choice) =
                    self.items.handle(input).and_then(|index| ITEM_CHOICES.get(index).copied())
                {
                    battle.choose_item(choice, &mut ctx.bag);
                }
            }
            _ => {}
        }
        SceneCommand::None
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        ctx.toasts.tick(dt_seconds);
        let Some(battle) = self.battle.as_mut() else {
            return SceneCommand::SwitchTo(GameScene::Overworld);
        };
        match battle.update(dt_seconds, &mut ctx.bag) {
            Some(outcome) => self.finish(outcome, ctx),
            None => SceneCommand::None,
        }
    }

    fn draw(&self, ctx: &GameContext, frame: &mut DrawList) {
        frame.clear([232, 240, 248, 255]);
        let Some(battle) = &self.battle else {
            ui::toasts(frame, &ctx.toasts);
            return;
        };

        let enemy = battle.enemy();
        frame.sprite(enemy.sprite.clone(), ENEMY_SPRITE, [180, 90, 90, 255]);
        status_card(frame, Rect::new(60.0, 60.0, 360.0, 90.0), enemy);
        if let Some(player) = battle.player(&ctx.bag) {
            frame.sprite(player.sprite.clone(), PLAYER_SPRITE, [90, 120, 180, 255]);
            status_card(frame, Rect::new(540.0, 320.0, 360.0, 90.0), player);
        }

        ui::panel(frame, MESSAGE_BOX);
        let text = match (battle.message(), battle.state()) {
            (Some(message), _) => message.to_string(),
            (None, BattleState::PlayerTurn) => "What will you do?".to_string(),
            (None, BattleState::ItemMenu) => "Choose an item".to_string(),
            (None, BattleState::Win) => "You won!".to_string(),
            (None, BattleState::Lose) => "You lost...".to_string(),
            (None, _) => String::new(),
        };
        ui::text_at(frame, MESSAGE_BOX.x + 16.0, MESSAGE_BOX.y + 22.0, text, ui::TEXT);

        match battle.state() {
            BattleState::PlayerTurn => self.actions.draw(frame),
            BattleState::ItemMenu => {
                self.items.draw(frame);
                for (index, potion) in Potion::ALL.iter().enumerate() {
                    ui::text_at(
                        frame,
                        40.0 + index as f32 * 226.0,
                        SCREEN_H - 24.0,
                        format!("x{}", ctx.bag.potion_count(*potion)),
                        ui::TEXT,
                    );
                }
            }
            _ => {}
        }
        ui::text_at(frame, SCREEN_W - 200.0, 20.0, kind_label(battle.kind()), ui::TEXT);
        ui::toasts(frame, &ctx.toasts);
    }

    fn debug_title(&self, _ctx: &GameContext) -> Option<String> {
        self.battle
            .as_ref()
            .map(|battle| format!("battle {:?}", battle.state()))
    }
}

fn kind_label(kind: BattleKind) -> &'static str {
    match kind {
        BattleKind::Wild => "Wild battle",
        BattleKind::Trainer(_) => "Trainer battle",
    }
}

fn status_card(frame: &mut DrawList, rect: Rect, monster: &Monster) {
    ui::panel(frame, rect);
    ui::text_at(frame, rect.x + 12.0, rect.y + 10.0, &monster.name, ui::TEXT);
    ui::text_at(
        frame,
        rect.right() - 150.0,
        rect.y + 10.0,
        format!("Lv {} {}", monster.level, monster.element.label()),
        ui::TEXT,
    );
    ui::hp_bar(
        frame,
        Rect::new(rect.x + 12.0, rect.y + 40.0, rect.w - 24.0, 14.0),
        monster.hp,
        monster.max_hp,
    );
    ui::text_at(
        frame,
        rect.x + 12.0,
        rect.y + 64.0,
        format!("HP {}/{}", monster.hp, monster.max_hp),
        ui::TEXT,
    );
}
