mod canvas;
mod font;
mod renderer;

pub use font::{glyph_advance, text_width_px, GLYPH_HEIGHT};
pub use renderer::Renderer;
