use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::draw::{DrawCommand, DrawList};

use super::canvas::{Canvas, SpriteImage};
use super::font::draw_text;

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    asset_root: PathBuf,
    sprite_cache: HashMap<String, Option<SpriteImage>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
            asset_root,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width.max(1), height.max(1), surface)
    }

    pub(crate) fn render(&mut self, list: &DrawList) -> Result<(), Error> {
        let (width, height) = (self.width, self.height);
        let mut canvas = Canvas::new(self.pixels.frame_mut(), width, height);
        canvas.clear(CLEAR_COLOR);
        for command in list.commands() {
            execute_command(
                &mut canvas,
                &mut self.sprite_cache,
                &mut self.warned_missing_sprite_keys,
                &self.asset_root,
                command,
            );
        }
        self.pixels.render()
    }
}

fn execute_command(
    canvas: &mut Canvas<'_>,
    cache: &mut HashMap<String, Option<SpriteImage>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    asset_root: &Path,
    command: &DrawCommand,
) {
    match command {
        DrawCommand::Clear(color) => canvas.clear(*color),
        DrawCommand::FillRect { x, y, w, h, color } => canvas.fill_rect(*x, *y, *w, *h, *color),
        DrawCommand::RectOutline { x, y, w, h, color } => {
            canvas.rect_outline(*x, *y, *w, *h, *color)
        }
        DrawCommand::Sprite {
            key,
            x,
            y,
            w,
            h,
            fallback,
        } => match resolve_cached_sprite(cache, warned_missing_sprite_keys, asset_root, key) {
            Some(sprite) => canvas.blit_scaled(sprite, *x, *y, *w, *h),
            None => canvas.fill_rect(*x, *y, *w, *h, *fallback),
        },
        DrawCommand::Text {
            x,
            y,
            text,
            color,
            scale,
        } => draw_text(canvas, *x, *y, text, *color, *scale),
    }
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<SpriteImage>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    asset_root: &Path,
    key: &str,
) -> Option<&'a SpriteImage> {
    if !cache.contains_key(key) {
        let sprite = match resolve_sprite_image_path(asset_root, key) {
            Ok(path) => match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(warned_missing_sprite_keys, key, Some(&path), &reason);
                    None
                }
            },
            Err(reason) => {
                warn_sprite_load_once(warned_missing_sprite_keys, key, None, &reason);
                None
            }
        };
        cache.insert(key.to_string(), sprite);
    }
    cache.get(key).and_then(Option::as_ref)
}

/// Sprite keys are asset-relative paths. A key without an extension is
/// looked up as a PNG.
fn resolve_sprite_image_path(asset_root: &Path, key: &str) -> Result<PathBuf, String> {
    if key.trim().is_empty() {
        return Err("empty_key".to_string());
    }
    let relative = Path::new(key);
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err("invalid_key:must be a relative path without '..'".to_string());
    }
    let mut path = asset_root.join(relative);
    if path.extension().is_none() {
        path.set_extension("png");
    }
    Ok(path)
}

fn load_sprite_rgba(path: &Path) -> Result<SpriteImage, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(SpriteImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_placeholder"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sprite_path_appends_png_when_extension_missing() {
        let path = resolve_sprite_image_path(Path::new("/assets"), "sprites/Leafy").expect("path");
        assert_eq!(path, PathBuf::from("/assets/sprites/Leafy.png"));
    }

    #[test]
    fn sprite_path_rejects_parent_traversal_and_absolute_keys() {
        assert!(resolve_sprite_image_path(Path::new("/assets"), "../secret.png").is_err());
        assert!(resolve_sprite_image_path(Path::new("/assets"), "/etc/passwd").is_err());
        assert!(resolve_sprite_image_path(Path::new("/assets"), "  ").is_err());
    }

    #[test]
    fn missing_sprite_is_cached_as_none_and_warned_once() {
        let temp = TempDir::new().expect("temp");
        let mut cache = HashMap::new();
        let mut warned = HashSet::new();

        assert!(resolve_cached_sprite(&mut cache, &mut warned, temp.path(), "nope.png").is_none());
        assert!(resolve_cached_sprite(&mut cache, &mut warned, temp.path(), "nope.png").is_none());

        assert_eq!(cache.len(), 1);
        assert_eq!(warned.len(), 1);
    }

    #[test]
    fn png_sprite_loads_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("dot.png");
        image::RgbaImage::from_pixel(2, 3, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .expect("write png");

        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        let sprite =
            resolve_cached_sprite(&mut cache, &mut warned, temp.path(), "dot").expect("sprite");

        assert_eq!((sprite.width, sprite.height), (2, 3));
        assert_eq!(&sprite.rgba[0..4], &[1, 2, 3, 255]);
        assert!(warned.is_empty());
    }
}
