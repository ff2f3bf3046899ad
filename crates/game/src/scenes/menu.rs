use engine::{DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand};

use crate::app::context::GameContext;
use crate::audio::OVERWORLD_BGM;

use super::ui::{self, ButtonList, SCREEN_W};
use super::GameScene;

const START: usize = 0;
const SETTINGS: usize = 1;
const QUIT: usize = 2;

pub struct MenuScene {
    buttons: ButtonList,
}

impl MenuScene {
    pub fn new() -> Self {
        Self {
            buttons: ButtonList::vertical(
                &["Start", "Settings", "Quit"],
                (SCREEN_W - 240.0) * 0.5,
                300.0,
                240.0,
                48.0,
                16.0,
            ),
        }
    }
}

impl Scene<GameScene, GameContext> for MenuScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        self.buttons.reset();
        ctx.audio.play_bgm(OVERWORLD_BGM);
    }

    fn handle_input(&mut self, input: &InputSnapshot, _ctx: &mut GameContext) -> SceneCommand<GameScene> {
        if input.was_pressed(InputAction::Cancel) {
            return SceneCommand::Quit;
        }
        match self.buttons.handle(input) {
            Some(START) => SceneCommand::SwitchTo(GameScene::Overworld),
            Some(SETTINGS) => SceneCommand::SwitchTo(GameScene::SettingsFromMenu),
            Some(QUIT) => SceneCommand::Quit,
            _ => SceneCommand::None,
        }
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        ctx.toasts.tick(dt_seconds);
        SceneCommand::None
    }

    fn draw(&self, ctx: &GameContext, frame: &mut DrawList) {
        frame.clear(ui::BACKGROUND);
        ui::text_centered(
            frame,
            Rect::new(0.0, 120.0, SCREEN_W, 80.0),
            "TILEMON",
            ui::HIGHLIGHT,
            8,
        );
        self.buttons.draw(frame);
        ui::toasts(frame, &ctx.toasts);
    }
}
