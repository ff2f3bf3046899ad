use engine::{DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand};
use tracing::{info, warn};

use crate::app::context::GameContext;

use super::ui::{self, Backdrop, ButtonList};
use super::GameScene;

const VOLUME_STEP: f32 = 0.1;
const SLIDER: Rect = Rect::new(330.0, 190.0, 300.0, 20.0);

const VOLUME_DOWN: usize = 0;
const VOLUME_UP: usize = 1;
const MUTE: usize = 2;
const SAVE: usize = 3;
const LOAD: usize = 4;
const BACK_TO_MENU: usize = 5;
const CLOSE: usize = 6;

/// Volume, mute, save/load. Each instance closes back to one fixed scene.
pub struct SettingsScene {
    previous: GameScene,
    buttons: ButtonList,
    backdrop: Backdrop,
}

impl SettingsScene {
    pub fn new(previous: GameScene) -> Self {
        Self {
            previous,
            buttons: ButtonList::vertical(
                &["Volume -", "Volume +", "Mute", "Save", "Load", "Back to Menu", "Close"],
                380.0,
                236.0,
                200.0,
                36.0,
                8.0,
            ),
            backdrop: Backdrop::default(),
        }
    }

    fn activate(&mut self, index: usize, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        match index {
            VOLUME_DOWN => ctx.set_volume(ctx.settings.bgm_volume - VOLUME_STEP),
            VOLUME_UP => ctx.set_volume(ctx.settings.bgm_volume + VOLUME_STEP),
            MUTE => ctx.toggle_mute(),
            SAVE => match ctx.save_game() {
                Ok(path) => {
                    info!(path = %path.display(), "game_saved");
                    ctx.toasts.push("Game saved");
                }
                Err(err) => {
                    warn!(error = %err, "game_save_failed");
                    ctx.toasts.push("Save failed");
                }
            },
            LOAD => match ctx.load_game() {
                Ok(()) => {
                    ctx.toasts.push("Game loaded");
                    self.refresh_backdrop(ctx);
                }
                Err(err) => {
                    warn!(error = %err, "game_load_failed");
                    ctx.toasts.push("Load failed");
                }
            },
            BACK_TO_MENU => return SceneCommand::SwitchTo(GameScene::Menu),
            CLOSE => return SceneCommand::SwitchTo(self.previous),
            _ => {}
        }
        SceneCommand::None
    }

    fn refresh_backdrop(&mut self, ctx: &GameContext) {
        if self.previous == GameScene::Overworld {
            self.backdrop.capture(ctx);
        }
    }
}

impl Scene<GameScene, GameContext> for SettingsScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        self.buttons.reset();
        self.refresh_backdrop(ctx);
    }

    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        if input.was_pressed(InputAction::Cancel) || input.was_pressed(InputAction::OpenSettings) {
            return SceneCommand::SwitchTo(self.previous);
        }
        if ui::clicked(input, SLIDER) {
            if let Some(cursor) = input.cursor_position_px() {
                ctx.set_volume((cursor.x - SLIDER.x) / SLIDER.w);
            }
            return SceneCommand::None;
        }
        match self.buttons.handle(input) {
            Some(index) => self.activate(index, ctx),
            None => SceneCommand::None,
        }
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        ctx.toasts.tick(dt_seconds);
        SceneCommand::None
    }

    fn draw(&self, ctx: &GameContext, frame: &mut DrawList) {
        if self.previous == GameScene::Overworld {
            self.backdrop.draw(frame);
        } else {
            frame.clear(ui::BACKGROUND);
        }
        let panel = Rect::new(300.0, 120.0, 360.0, 440.0);
        ui::panel(frame, panel);
        ui::text_centered(frame, Rect::new(panel.x, panel.y + 8.0, panel.w, 32.0), "Settings", ui::TEXT, 3);

        frame.fill(SLIDER, ui::BUTTON);
        let volume = ctx.settings.bgm_volume;
        frame.fill(Rect::new(SLIDER.x, SLIDER.y, SLIDER.w * volume, SLIDER.h), ui::HIGHLIGHT);
        frame.outline(SLIDER, ui::PANEL_EDGE);
        let label = if ctx.settings.muted {
            "Volume: muted".to_string()
        } else {
            format!("Volume: {}%", (volume * 100.0).round() as u32)
        };
        ui::text_at(frame, SLIDER.x, SLIDER.y - 22.0, label, ui::TEXT);

        self.buttons.draw(frame);
        ui::toasts(frame, &ctx.toasts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::test_support::context;
    use engine::Vec2;
    use tempfile::TempDir;

    #[test]
    fn slider_click_sets_volume() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        let mut scene = SettingsScene::new(GameScene::Overworld);
        scene.enter(&mut ctx);
        let click = InputSnapshot::empty()
            .with_cursor_position_px(Some(Vec2::new(SLIDER.x + SLIDER.w * 0.25, SLIDER.y + 5.0)))
            .with_left_click_pressed(true);
        scene.handle_input(&click, &mut ctx);
        assert!((ctx.settings.bgm_volume - 0.25).abs() < 1e-4);
        assert!((ctx.audio.bgm_volume() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn save_button_writes_the_save_file() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        let mut scene = SettingsScene::new(GameScene::Menu);
        assert_eq!(scene.activate(SAVE, &mut ctx), SceneCommand::None);
        assert!(ctx.save_path().is_file());
        assert_eq!(
            scene.activate(CLOSE, &mut ctx),
            SceneCommand::SwitchTo(GameScene::Menu)
        );
    }

    #[test]
    fn failed_load_reports_toast() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        let mut scene = SettingsScene::new(GameScene::Overworld);
        scene.activate(LOAD, &mut ctx);
        assert_eq!(
            ctx.toasts.iter().last().map(|toast| toast.text.as_str()),
            Some("Load failed")
        );
    }
}
