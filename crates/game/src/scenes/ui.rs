use std::ops::Range;

use engine::{text_width_px, DrawCommand, DrawList, InputAction, InputSnapshot, Rect, Rgba, GLYPH_HEIGHT};

use crate::app::context::GameContext;
use crate::toast::Toasts;

use super::overworld;

pub const SCREEN_W: f32 = 960.0;
pub const SCREEN_H: f32 = 640.0;

pub const BACKGROUND: Rgba = [24, 28, 40, 255];
pub const PANEL: Rgba = [236, 232, 218, 255];
pub const PANEL_EDGE: Rgba = [40, 40, 48, 255];
pub const TEXT: Rgba = [32, 32, 40, 255];
pub const TEXT_LIGHT: Rgba = [244, 244, 244, 255];
pub const HIGHLIGHT: Rgba = [250, 206, 92, 255];
pub const BUTTON: Rgba = [196, 210, 228, 255];
pub const DIM: Rgba = [0, 0, 0, 140];

pub fn screen() -> Rect {
    Rect::new(0.0, 0.0, SCREEN_W, SCREEN_H)
}

pub fn panel(frame: &mut DrawList, rect: Rect) {
    frame.fill(rect, PANEL);
    frame.outline(rect, PANEL_EDGE);
}

pub fn text_centered(frame: &mut DrawList, rect: Rect, text: &str, color: Rgba, scale: i32) {
    let width = text_width_px(text, scale);
    let x = rect.x.round() as i32 + (rect.w.round() as i32 - width) / 2;
    let y = rect.y.round() as i32 + (rect.h.round() as i32 - GLYPH_HEIGHT * scale) / 2;
    frame.text_scaled(x, y, text, color, scale);
}

pub fn text_at(frame: &mut DrawList, x: f32, y: f32, text: impl Into<String>, color: Rgba) {
    frame.text(x.round() as i32, y.round() as i32, text, color);
}

pub fn hp_bar(frame: &mut DrawList, rect: Rect, hp: u32, max_hp: u32) {
    frame.fill(rect, [60, 60, 60, 255]);
    let ratio = if max_hp == 0 {
        0.0
    } else {
        (hp as f32 / max_hp as f32).clamp(0.0, 1.0)
    };
    let color = if ratio > 0.5 {
        [88, 200, 96, 255]
    } else if ratio > 0.2 {
        [236, 196, 64, 255]
    } else {
        [220, 72, 64, 255]
    };
    frame.fill(Rect::new(rect.x, rect.y, rect.w * ratio, rect.h), color);
    frame.outline(rect, PANEL_EDGE);
}

pub fn toasts(frame: &mut DrawList, toasts: &Toasts) {
    let mut y = SCREEN_H - 48.0;
    for toast in toasts.iter().collect::<Vec<_>>().into_iter().rev() {
        let width = text_width_px(&toast.text, 2) as f32 + 24.0;
        let rect = Rect::new((SCREEN_W - width) * 0.5, y, width, 32.0);
        frame.fill(rect, [20, 20, 24, 220]);
        text_centered(frame, rect, &toast.text, TEXT_LIGHT, 2);
        y -= 40.0;
    }
}

pub fn clicked(input: &InputSnapshot, rect: Rect) -> bool {
    input.left_click_pressed()
        && input
            .cursor_position_px()
            .is_some_and(|cursor| rect.contains_point(cursor))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub rect: Rect,
    pub label: String,
}

impl Button {
    pub fn new(label: impl Into<String>, rect: Rect) -> Self {
        Self {
            rect,
            label: label.into(),
        }
    }

    pub fn draw(&self, frame: &mut DrawList, selected: bool) {
        frame.fill(self.rect, if selected { HIGHLIGHT } else { BUTTON });
        frame.outline(self.rect, PANEL_EDGE);
        text_centered(frame, self.rect, &self.label, TEXT, 2);
    }
}

/// Buttons picked with the movement keys and Confirm, or by clicking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ButtonList {
    buttons: Vec<Button>,
    selected: usize,
}

impl ButtonList {
    pub fn vertical(labels: &[&str], origin_x: f32, origin_y: f32, w: f32, h: f32, gap: f32) -> Self {
        let buttons = labels
            .iter()
            .enumerate()
            .map(|(index, label)| {
                Button::new(
                    *label,
                    Rect::new(origin_x, origin_y + index as f32 * (h + gap), w, h),
                )
            })
            .collect();
        Self {
            buttons,
            selected: 0,
        }
    }

    pub fn horizontal(labels: &[&str], origin_x: f32, origin_y: f32, w: f32, h: f32, gap: f32) -> Self {
        let buttons = labels
            .iter()
            .enumerate()
            .map(|(index, label)| {
                Button::new(
                    *label,
                    Rect::new(origin_x + index as f32 * (w + gap), origin_y, w, h),
                )
            })
            .collect();
        Self {
            buttons,
            selected: 0,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn reset(&mut self) {
        self.selected = 0;
    }

    /// Index of the activated button, if any.
    pub fn handle(&mut self, input: &InputSnapshot) -> Option<usize> {
        if self.buttons.is_empty() {
            return None;
        }
        if let Some(index) = self.buttons.iter().position(|button| clicked(input, button.rect)) {
            self.selected = index;
            return Some(index);
        }
        let last = self.buttons.len() - 1;
        if input.was_pressed(InputAction::MoveUp) || input.was_pressed(InputAction::MoveLeft) {
            self.selected = self.selected.saturating_sub(1);
        }
        if input.was_pressed(InputAction::MoveDown) || input.was_pressed(InputAction::MoveRight) {
            self.selected = (self.selected + 1).min(last);
        }
        input
            .was_pressed(InputAction::Confirm)
            .then_some(self.selected)
    }

    pub fn draw(&self, frame: &mut DrawList) {
        for (index, button) in self.buttons.iter().enumerate() {
            button.draw(frame, index == self.selected);
        }
    }
}

/// Scroll window over a list that shows `rows` entries at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    start: usize,
    rows: usize,
}

impl Pager {
    pub const fn new(rows: usize) -> Self {
        Self { start: 0, rows }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn reset(&mut self) {
        self.start = 0;
    }

    pub fn visible(&self, total: usize) -> Range<usize> {
        let start = self.start.min(self.max_start(total));
        start..(start + self.rows).min(total)
    }

    pub fn scroll_up(&mut self) {
        self.start = self.start.saturating_sub(1);
    }

    pub fn scroll_down(&mut self, total: usize) {
        self.start = (self.start + 1).min(self.max_start(total));
    }

    /// Re-clamps after the list shrank.
    pub fn clamp(&mut self, total: usize) {
        self.start = self.start.min(self.max_start(total));
    }

    fn max_start(&self, total: usize) -> usize {
        total.saturating_sub(self.rows)
    }
}

/// Overworld frame painted under an overlay scene. Re-captured on every
/// enter.
#[derive(Debug, Default)]
pub struct Backdrop {
    commands: Vec<DrawCommand>,
}

impl Backdrop {
    pub fn capture(&mut self, ctx: &GameContext) {
        let mut list = DrawList::default();
        overworld::draw_world(ctx, &mut list);
        self.commands = list.commands().to_vec();
    }

    pub fn draw(&self, frame: &mut DrawList) {
        frame.extend_from(&self.commands);
        frame.fill(screen(), DIM);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
