use engine::{DrawList, InputAction, InputSnapshot, Rect, Scene, SceneCommand};
use tracing::info;

use crate::app::context::GameContext;

use super::ui::{self, Backdrop, ButtonList};
use super::GameScene;

/// Lists the current map's named places; picking one starts auto-walk.
pub struct NavigationScene {
    names: Vec<String>,
    buttons: ButtonList,
    backdrop: Backdrop,
}

impl NavigationScene {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            buttons: ButtonList::default(),
            backdrop: Backdrop::default(),
        }
    }

    fn choose(&self, index: usize, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        let Some(name) = self.names.get(index) else {
            return SceneCommand::None;
        };
        match ctx.world.plan_route_to_point(name) {
            Ok(steps) => {
                info!(destination = %name, steps, "auto_walk_started");
                ctx.toasts.push(format!("Walking to {name}"));
                SceneCommand::SwitchTo(GameScene::Overworld)
            }
            Err(err) => {
                ctx.toasts.push(err.to_string());
                SceneCommand::None
            }
        }
    }
}

impl Scene<GameScene, GameContext> for NavigationScene {
    fn enter(&mut self, ctx: &mut GameContext) {
        self.names = ctx
            .world
            .current_map()
            .nav_points
            .iter()
            .map(|point| point.name.clone())
            .collect();
        let labels: Vec<&str> = self.names.iter().map(String::as_str).collect();
        self.buttons = ButtonList::vertical(&labels, 360.0, 200.0, 240.0, 40.0, 10.0);
        self.backdrop.capture(ctx);
    }

    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        if input.was_pressed(InputAction::Cancel) || input.was_pressed(InputAction::OpenMap) {
            return SceneCommand::SwitchTo(GameScene::Overworld);
        }
        match self.buttons.handle(input) {
            Some(index) => self.choose(index, ctx),
            None => SceneCommand::None,
        }
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut GameContext) -> SceneCommand<GameScene> {
        ctx.toasts.tick(dt_seconds);
        SceneCommand::None
    }

    fn draw(&self, ctx: &GameContext, frame: &mut DrawList) {
        self.backdrop.draw(frame);
        let panel = Rect::new(330.0, 130.0, 300.0, 380.0);
        ui::panel(frame, panel);
        ui::text_centered(frame, Rect::new(panel.x, panel.y + 10.0, panel.w, 40.0), "Navigate", ui::TEXT, 3);
        if self.names.is_empty() {
            ui::text_centered(frame, panel, "No places on this map", ui::TEXT, 2);
        }
        self.buttons.draw(frame);
        ui::toasts(frame, &ctx.toasts);
    }
}
