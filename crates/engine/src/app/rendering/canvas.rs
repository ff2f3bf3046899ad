/// Clipped RGBA drawing over a borrowed framebuffer.
pub(crate) struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

pub(crate) struct SpriteImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Alpha-blends `color` over the existing pixel. Fully opaque colors
    /// overwrite, fully transparent ones are skipped.
    pub(crate) fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let Some(offset) = (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize))
            .and_then(|pixel| pixel.checked_mul(4))
        else {
            return;
        };
        let Some(dst) = self.frame.get_mut(offset..offset + 4) else {
            return;
        };
        match color[3] {
            0 => {}
            255 => dst.copy_from_slice(&color),
            alpha => {
                let a = alpha as u16;
                for channel in 0..3 {
                    let src = color[channel] as u16;
                    let old = dst[channel] as u16;
                    dst[channel] = ((src * a + old * (255 - a)) / 255) as u8;
                }
                dst[3] = 255;
            }
        }
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(w).min(self.width as i32);
        let end_y = y.saturating_add(h).min(self.height as i32);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub(crate) fn rect_outline(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        if w <= 1 || h <= 1 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    /// Nearest-neighbour scale of `sprite` into the destination rectangle.
    pub(crate) fn blit_scaled(&mut self, sprite: &SpriteImage, x: i32, y: i32, w: i32, h: i32) {
        if sprite.width == 0 || sprite.height == 0 || w <= 0 || h <= 0 {
            return;
        }
        let expected_len = sprite.width as usize * sprite.height as usize * 4;
        if sprite.rgba.len() < expected_len {
            return;
        }
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(w).min(self.width as i32);
        let end_y = y.saturating_add(h).min(self.height as i32);
        for py in start_y..end_y {
            let src_y = (((py - y) as u32 * sprite.height) / h as u32).min(sprite.height - 1);
            for px in start_x..end_x {
                let src_x = (((px - x) as u32 * sprite.width) / w as u32).min(sprite.width - 1);
                let offset = (src_y as usize * sprite.width as usize + src_x as usize) * 4;
                let color = [
                    sprite.rgba[offset],
                    sprite.rgba[offset + 1],
                    sprite.rgba[offset + 2],
                    sprite.rgba[offset + 3],
                ];
                self.blend_pixel(px, py, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn fill_rect_clips_to_frame() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 4);
        canvas.fill_rect(-2, -2, 4, 4, [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn half_alpha_blends_toward_source() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        canvas.clear([0, 0, 0, 255]);
        canvas.blend_pixel(0, 0, [255, 255, 255, 128]);
        assert_eq!(pixel(&frame, 1, 0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn blit_scales_two_by_two_sprite_up() {
        let sprite = SpriteImage {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        let mut frame = vec![0u8; 4 * 2 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 2);
        canvas.blit_scaled(&sprite, 0, 0, 4, 2);
        assert_eq!(pixel(&frame, 4, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 2, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn drawing_far_outside_is_a_no_op() {
        let mut frame = vec![7u8; 2 * 2 * 4];
        let mut canvas = Canvas::new(&mut frame, 2, 2);
        canvas.fill_rect(100, 100, 5, 5, [1, 1, 1, 255]);
        canvas.rect_outline(-50, -50, 10, 10, [1, 1, 1, 255]);
        assert!(frame.iter().all(|byte| *byte == 7));
    }
}
