mod draw;
mod geometry;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use draw::{DrawCommand, DrawList, Rgba};
pub use geometry::{Rect, Vec2};
pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{glyph_advance, text_width_px, Renderer, GLYPH_HEIGHT};
pub use scene::{Scene, SceneCommand, SceneError, SceneKey, SceneMachine, TickOutcome};
