use super::geometry::Rect;

pub type Rgba = [u8; 4];

/// One retained drawing operation in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    FillRect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Rgba,
    },
    RectOutline {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Rgba,
    },
    /// `key` is resolved against the sprite directory; missing sprites fall
    /// back to `fallback`.
    Sprite {
        key: String,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        fallback: Rgba,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        color: Rgba,
        scale: i32,
    },
}

/// Frame-local command buffer. Scenes append, the renderer consumes.
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn clear(&mut self, color: Rgba) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { x, y, w, h, color });
    }

    pub fn fill(&mut self, rect: Rect, color: Rgba) {
        let (x, y, w, h) = rect_px(rect);
        self.fill_rect(x, y, w, h, color);
    }

    pub fn outline(&mut self, rect: Rect, color: Rgba) {
        let (x, y, w, h) = rect_px(rect);
        self.commands
            .push(DrawCommand::RectOutline { x, y, w, h, color });
    }

    pub fn sprite(&mut self, key: impl Into<String>, rect: Rect, fallback: Rgba) {
        let (x, y, w, h) = rect_px(rect);
        self.commands.push(DrawCommand::Sprite {
            key: key.into(),
            x,
            y,
            w,
            h,
            fallback,
        });
    }

    pub fn text(&mut self, x: i32, y: i32, text: impl Into<String>, color: Rgba) {
        self.text_scaled(x, y, text, color, 2);
    }

    pub fn text_scaled(&mut self, x: i32, y: i32, text: impl Into<String>, color: Rgba, scale: i32) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            text: text.into(),
            color,
            scale: scale.max(1),
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Copies another list's commands after this one's. Used to paint a
    /// captured backdrop underneath an overlay scene.
    pub fn extend_from(&mut self, other: &[DrawCommand]) {
        self.commands.extend_from_slice(other);
    }
}

fn rect_px(rect: Rect) -> (i32, i32, i32, i32) {
    (
        rect.x.round() as i32,
        rect.y.round() as i32,
        rect.w.round() as i32,
        rect.h.round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_previous_commands() {
        let mut list = DrawList::default();
        list.fill_rect(0, 0, 4, 4, [1, 2, 3, 255]);
        list.clear([0, 0, 0, 255]);
        assert_eq!(list.commands(), &[DrawCommand::Clear([0, 0, 0, 255])]);
    }

    #[test]
    fn world_rects_are_rounded_to_pixels() {
        let mut list = DrawList::default();
        list.fill(Rect::new(1.4, 2.6, 31.5, 32.0), [9, 9, 9, 255]);
        assert_eq!(
            list.commands()[0],
            DrawCommand::FillRect {
                x: 1,
                y: 3,
                w: 32,
                h: 32,
                color: [9, 9, 9, 255]
            }
        );
    }
}
