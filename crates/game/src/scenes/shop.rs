use engine::{DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand};
use tracing::debug;

use crate::app::context::GameContext;
use crate::shop::{self, SellOffer, CATALOG, SELL_VISIBLE_ROWS};

use super::ui::{self, Backdrop, Pager};
use super::GameScene;

const PANEL: Rect = Rect::new(180.0, 90.0, 600.0, 460.0);
const BUY_TAB: Rect = Rect::new(200.0, 110.0, 120.0, 36.0);
const SELL_TAB: Rect = Rect::new(330.0, 110.0, 120.0, 36.0);
const ROW_H: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Buy,
    Sell,
}

pub struct ShopScene {
    tab: Tab,
    cursor: usize,
    pager: Pager,
    backdrop: Backdrop,
}

fn row_rect(row: usize) -> Rect {
    Rect::new(PANEL.x + 20.0, PANEL.y + 80.0 + row as f32 * ROW_H, PANEL.w - 40.0, ROW_H - 8.0)
}

impl ShopScene {
    pub fn new() -> Self {
        Self {
            tab: Tab::Buy,
            cursor: 0,
            pager: Pager::new(SELL_VISIBLE_ROWS),
            backdrop: Backdrop::default(),
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.cursor = 0;
            self.pager.reset();
        }
    }

    fn list_len(&self, ctx: &GameContext) -> usize {
        match self.tab {
            Tab::Buy => CATALOG.len(),
            Tab::Sell => ctx.bag.monsters.len(),
        }
    }

    fn visible_rows(&self, ctx: &GameContext) -> std::ops::Range<usize> {
        match self.tab {
            Tab::Buy => 0..CATALOG.len(),
            Tab::Sell => self.pager.visible(ctx.bag.monsters.len()),
        }
    }

    fn move_cursor(&mut self, up: bool, total: usize) {
        if total == 0 {
            return;
        }
        if up {
            self.cursor = self.cursor.saturating_sub(1);
        } else {
            self.cursor = (self.cursor + 1).min(total - 1);
        }
        if self.tab == Tab::Sell {
            let visible = self.pager.visible(total);
            if self.cursor < visible.start {
                self.pager.scroll_up();
            } else if self.cursor >= visible.end {
                self.pager.scroll_down(total);
            }
        }
    }

    fn activate(&mut self, ctx: &mut GameContext) {
        match self.tab {
            Tab::Buy => {
                let Some(entry) = CATALOG.get(self.cursor) else {
                    return;
                };
                match shop::buy(&mut ctx.bag, entry) {
                    Ok(_) => ctx.toasts.push(format!("Bought {}", entry.name)),
                    Err(err) => {
                        debug!(item = entry.name, error = %err, "shop_buy_refused");
                        ctx.toasts.push(err.to_string());
                    }
                }
            }
            Tab::Sell => match shop::sell(&mut ctx.bag, self.cursor) {
                Ok(price) => {
                    ctx.toasts.push(format!("Sold for {price} coins"));
                    let total = ctx.bag.monsters.len();
                    self.cursor = self.cursor.min(total.saturating_sub(1));
                    self.pager.clamp(total);
                }
                Err(err) => ctx.toasts.push(err.to_string()),
            },
        }
    }
}

impl Scene<GameScene, GameContext> for ShopScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        self.tab = Tab::Buy;
        self.cursor = 0;
        self.pager.reset();
        self.backdrop.capture(ctx);
    }

    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        if input.was_pressed(InputAction::Cancel) {
            return SceneCommand::SwitchTo(GameScene::Overworld);
        }
        if input.was_pressed(InputAction::MoveLeft) || ui::clicked(input, BUY_TAB) {
            self.switch_tab(Tab::Buy);
            return SceneCommand::None;
        }
        if input.was_pressed(InputAction::MoveRight) || ui::clicked(input, SELL_TAB) {
            self.switch_tab(Tab::Sell);
            return SceneCommand::None;
        }

        let total = self.list_len(ctx);
        if input.was_pressed(InputAction::MoveUp) {
            self.move_cursor(true, total);
        }
        if input.was_pressed(InputAction::MoveDown) {
            self.move_cursor(false, total);
        }

        let clicked_row = self
            .visible_rows(ctx)
            .enumerate()
            .find(|(row, _)| ui::clicked(input, row_rect(*row)))
            .map(|(_, index)| index);
        if let Some(index) = clicked_row {
            self.cursor = index;
            self.activate(ctx);
        } else if input.was_pressed(InputAction::Confirm) {
            self.activate(ctx);
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
        for (rect, label, tab) in [(BUY_TAB, "Buy", Tab::Buy), (SELL_TAB, "Sell", Tab::Sell)] {
            frame.fill(rect, if self.tab == tab { ui::HIGHLIGHT } else { ui::BUTTON });
            frame.outline(rect, ui::PANEL_EDGE);
            ui::text_centered(frame, rect, label, ui::TEXT, 2);
        }
        ui::text_at(
            frame,
            PANEL.right() - 180.0,
            PANEL.y + 122.0,
            format!("Coins: {}", ctx.bag.coins()),
            ui::TEXT,
        );

        match self.tab {
            Tab::Buy => {
                for (row, entry) in CATALOG.iter().enumerate() {
                    let rect = row_rect(row);
                    self.draw_row(frame, rect, row == self.cursor);
                    frame.sprite(
                        entry.sprite,
                        Rect::new(rect.x + 10.0, rect.y + 10.0, 36.0, 36.0),
                        [200, 180, 120, 255],
                    );
                    ui::text_at(frame, rect.x + 60.0, rect.y + 12.0, entry.name, ui::TEXT);
                    ui::text_at(
                        frame,
                        rect.x + 60.0,
                        rect.y + 32.0,
                        format!("Owned: {}", ctx.bag.item_count(entry.name)),
                        ui::TEXT,
                    );
                    ui::text_at(frame, rect.right() - 120.0, rect.y + 22.0, format!("{} c", entry.price), ui::TEXT);
                }
            }
            Tab::Sell => {
                let offers = shop::sell_offers(&ctx.bag);
                if offers.is_empty() {
                    ui::text_at(frame, PANEL.x + 40.0, PANEL.y + 100.0, "Nothing to sell", ui::TEXT);
                }
                for (row, index) in self.pager.visible(offers.len()).enumerate() {
                    self.draw_offer(ctx, frame, row, &offers[index]);
                }
            }
        }
        ui::toasts(frame, &ctx.toasts);
    }
}

impl ShopScene {
    fn draw_row(&self, frame: &mut DrawList, rect: Rect, selected: bool) {
        frame.fill(rect, if selected { ui::HIGHLIGHT } else { ui::BUTTON });
        frame.outline(rect, ui::PANEL_EDGE);
    }

    fn draw_offer(&self, ctx: &GameContext, frame: &mut DrawList, row: usize, offer: &SellOffer) {
        let rect = row_rect(row);
        self.draw_row(frame, rect, offer.monster_index == self.cursor);
        if let Some(monster) = ctx.bag.monsters.get(offer.monster_index) {
            frame.sprite(
                monster.sprite.clone(),
                Rect::new(rect.x + 10.0, rect.y + 6.0, 44.0, 44.0),
                [150, 150, 150, 255],
            );
        }
        ui::text_at(frame, rect.x + 60.0, rect.y + 12.0, &offer.name, ui::TEXT);
        ui::text_at(frame, rect.x + 60.0, rect.y + 32.0, format!("Lv {}", offer.level), ui::TEXT);
        ui::text_at(frame, rect.right() - 120.0, rect.y + 22.0, format!("{} c", offer.price), ui::TEXT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::COINS_ITEM;
    use crate::monster::MonsterRecord;
    use tempfile::TempDir;
    use crate::app::context::test_support::context;

    fn press(action: InputAction) -> InputSnapshot {
        InputSnapshot::empty().with_action_pressed(action)
    }

    #[test]
    fn confirm_buys_selected_entry() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        ctx.bag.add_item(COINS_ITEM, 12, "ui/coin");
        let mut scene = ShopScene::new();
        scene.enter(&mut ctx);
        scene.handle_input(&press(InputAction::MoveDown), &mut ctx);
        scene.handle_input(&press(InputAction::Confirm), &mut ctx);
        assert_eq!(ctx.bag.item_count("Strength Potion"), 1);
        assert_eq!(ctx.bag.coins(), 2);

        scene.handle_input(&press(InputAction::Confirm), &mut ctx);
        assert_eq!(ctx.bag.item_count("Strength Potion"), 1);
        assert_eq!(
            ctx.toasts.iter().last().map(|toast| toast.text.as_str()),
            Some("Not enough coins! (2/10)")
        );
    }

    #[test]
    fn selling_last_row_keeps_cursor_in_range() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        for level in [2, 3, 4, 5, 6] {
            ctx.bag.monsters.push(
                MonsterRecord {
                    level: Some(level),
                    ..MonsterRecord::named(format!("Mon{level}"))
                }
                .normalize(1),
            );
        }
        let mut scene = ShopScene::new();
        scene.enter(&mut ctx);
        scene.handle_input(&press(InputAction::MoveRight), &mut ctx);
        for _ in 0..10 {
            scene.handle_input(&press(InputAction::MoveDown), &mut ctx);
        }
        assert_eq!(scene.cursor, 5);
        assert_eq!(scene.pager.visible(6), 2..6);

        scene.handle_input(&press(InputAction::Confirm), &mut ctx);
        assert_eq!(ctx.bag.coins(), 120);
        assert_eq!(ctx.bag.monsters.len(), 5);
        assert_eq!(scene.cursor, 4);
        assert_eq!(scene.pager.visible(5), 1..5);
    }
}
