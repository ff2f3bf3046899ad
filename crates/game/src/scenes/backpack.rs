use engine::{DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand};

use crate::app::context::GameContext;
use crate::bag::Potion;

use super::ui::{self, Backdrop, Pager};
use super::GameScene;

pub const MONSTER_ROWS: usize = 3;
const PANEL: Rect = Rect::new(130.0, 80.0, 700.0, 480.0);
const ROW_H: f32 = 110.0;

pub struct BackpackScene {
    cursor: usize,
    pager: Pager,
    backdrop: Backdrop,
}

impl BackpackScene {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            pager: Pager::new(MONSTER_ROWS),
            backdrop: Backdrop::default(),
        }
    }
}

impl Scene<GameScene, GameContext> for BackpackScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        let total = ctx.bag.monsters.len();
        self.cursor = self.cursor.min(total.saturating_sub(1));
        self.pager.clamp(total);
        self.backdrop.capture(ctx);
    }

    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        if input.was_pressed(InputAction::Cancel) || input.was_pressed(InputAction::OpenBag) {
            return SceneCommand::SwitchTo(GameScene::Overworld);
        }
        let total = ctx.bag.monsters.len();
        if total == 0 {
            return SceneCommand::None;
        }
        if input.was_pressed(InputAction::MoveUp) {
            self.cursor = self.cursor.saturating_sub(1);
            if self.cursor < self.pager.visible(total).start {
                self.pager.scroll_up();
            }
        }
        if input.was_pressed(InputAction::MoveDown) {
            self.cursor = (self.cursor + 1).min(total - 1);
            if self.cursor >= self.pager.visible(total).end {
                self.pager.scroll_down(total);
            }
        }
        if input.was_pressed(InputAction::Confirm) {
            match ctx.bag.use_potion(Potion::Heal, self.cursor) {
                Ok(effect) => ctx.toasts.push(effect.message()),
                Err(err) => ctx.toasts.push(err.to_string()),
            }
        }
        SceneCommand::None
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        ctx.toasts.tick(dt_seconds);
        SceneCommand::None
    }

    fn draw(&self, ctx: &GameContext, frame: &mut DrawList) {
        self.backdrop.draw(frame);
        ui::panel(frame, PANEL);
        ui::text_at(frame, PANEL.x + 24.0, PANEL.y + 20.0, "BAG", ui::TEXT);

        let monsters = &ctx.bag.monsters;
        if monsters.is_empty() {
            ui::text_at(frame, PANEL.x + 40.0, PANEL.y + 80.0, "No monsters", ui::TEXT);
        }
        for (row, index) in self.pager.visible(monsters.len()).enumerate() {
            let monster = &monsters[index];
            let top = PANEL.y + 70.0 + row as f32 * ROW_H;
            let card = Rect::new(PANEL.x + 24.0, top, 380.0, 95.0);
            frame.fill(card, if index == self.cursor { ui::HIGHLIGHT } else { ui::BUTTON });
            frame.outline(card, ui::PANEL_EDGE);
            frame.sprite(
                monster.sprite.clone(),
                Rect::new(card.x + 10.0, card.y + 16.0, 60.0, 60.0),
                [150, 150, 150, 255],
            );
            ui::text_at(frame, card.x + 84.0, card.y + 14.0, &monster.name, ui::TEXT);
            ui::text_at(
                frame,
                card.x + 84.0,
                card.y + 36.0,
                format!("Lv {}  {}", monster.level, monster.element.label()),
                ui::TEXT,
            );
            ui::hp_bar(
                frame,
                Rect::new(card.x + 84.0, card.y + 60.0, 180.0, 12.0),
                monster.hp,
                monster.max_hp,
            );
            ui::text_at(
                frame,
                card.x + 274.0,
                card.y + 58.0,
                format!("{}/{}", monster.hp, monster.max_hp),
                ui::TEXT,
            );
        }
        if monsters.len() > MONSTER_ROWS {
            ui::text_at(
                frame,
                PANEL.x + 24.0,
                PANEL.bottom() - 32.0,
                format!(
                    "Up/Down: select ({}-{} of {})",
                    self.pager.start() + 1,
                    (self.pager.start() + MONSTER_ROWS).min(monsters.len()),
                    monsters.len()
                ),
                ui::TEXT,
            );
        }

        let items_x = PANEL.x + 440.0;
        let mut y = PANEL.y + 70.0;
        for item in ctx.bag.items.iter().filter(|item| item.count > 0) {
            frame.sprite(
                item.sprite.clone(),
                Rect::new(items_x, y, 30.0, 30.0),
                [200, 180, 120, 255],
            );
            ui::text_at(
                frame,
                items_x + 40.0,
                y + 8.0,
                format!("{} x{}", item.name, item.count),
                ui::TEXT,
            );
            y += 40.0;
        }
        if !monsters.is_empty() {
            ui::text_at(frame, items_x, PANEL.bottom() - 32.0, "Enter: use Heal Potion", ui::TEXT);
        }
        ui::toasts(frame, &ctx.toasts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::test_support::context;
    use crate::monster::MonsterRecord;
    use tempfile::TempDir;

    #[test]
    fn scrolling_stops_at_last_page() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        for index in 0..4 {
            ctx.bag
                .monsters
                .push(MonsterRecord::named(format!("Mon{index}")).normalize(1));
        }
        let mut scene = BackpackScene::new();
        scene.enter(&mut ctx);
        let down = InputSnapshot::empty().with_action_pressed(InputAction::MoveDown);
        for _ in 0..5 {
            scene.handle_input(&down, &mut ctx);
        }
        assert_eq!(scene.cursor, 4);
        assert_eq!(scene.pager.visible(ctx.bag.monsters.len()), 2..5);
    }

    #[test]
    fn confirm_heals_selected_monster() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        ctx.bag.monsters[0].hp = 0;
        let mut scene = BackpackScene::new();
        scene.enter(&mut ctx);
        let confirm = InputSnapshot::empty().with_action_pressed(InputAction::Confirm);

        scene.handle_input(&confirm, &mut ctx);
        assert_eq!(ctx.bag.monsters[0].hp, 0);

        ctx.bag.add_item("Heal Potion", 1, "ui/heal_potion");
        scene.handle_input(&confirm, &mut ctx);
        assert_eq!(ctx.bag.monsters[0].hp, 25);
        assert_eq!(ctx.bag.item_count("Heal Potion"), 0);
    }
}
