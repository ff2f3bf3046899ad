use super::canvas::Canvas;

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;

/// Each glyph is five 3-bit rows packed top to bottom, one octal digit per
/// row. Lowercase input renders with the uppercase shapes.
fn glyph_bits(ch: char) -> Option<u16> {
    let bits = match ch.to_ascii_uppercase() {
        ' ' => 0,
        '!' => 0o22202,
        '%' => 0o51245,
        '\'' => 0o22000,
        '(' => 0o12221,
        ')' => 0o42224,
        '+' => 0o02720,
        ',' => 0o00024,
        '-' => 0o00700,
        '.' => 0o00002,
        '/' => 0o11244,
        '0' => 0o75557,
        '1' => 0o26227,
        '2' => 0o71747,
        '3' => 0o71717,
        '4' => 0o55711,
        '5' => 0o74717,
        '6' => 0o74757,
        '7' => 0o71222,
        '8' => 0o75757,
        '9' => 0o75717,
        ':' => 0o02020,
        '<' => 0o12421,
        '=' => 0o07070,
        '>' => 0o42124,
        '?' => 0o71302,
        'A' => 0o25755,
        'B' => 0o65656,
        'C' => 0o74447,
        'D' => 0o65556,
        'E' => 0o74647,
        'F' => 0o74644,
        'G' => 0o74557,
        'H' => 0o55755,
        'I' => 0o72227,
        'J' => 0o71157,
        'K' => 0o55655,
        'L' => 0o44447,
        'M' => 0o57755,
        'N' => 0o57775,
        'O' => 0o75557,
        'P' => 0o65644,
        'Q' => 0o75571,
        'R' => 0o65655,
        'S' => 0o74717,
        'T' => 0o72222,
        'U' => 0o55557,
        'V' => 0o55552,
        'W' => 0o55775,
        'X' => 0o55255,
        'Y' => 0o55222,
        'Z' => 0o71247,
        '[' => 0o64446,
        ']' => 0o31113,
        '_' => 0o00007,
        _ => return None,
    };
    Some(bits)
}

const FALLBACK_GLYPH: u16 = 0o71302;

pub fn glyph_advance(scale: i32) -> i32 {
    (GLYPH_WIDTH + 1) * scale
}

pub fn text_width_px(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * glyph_advance(scale)
}

pub(crate) fn draw_text(canvas: &mut Canvas<'_>, x: i32, y: i32, text: &str, color: [u8; 4], scale: i32) {
    let scale = scale.max(1);
    let mut cursor_x = x;
    for ch in text.chars() {
        let bits = glyph_bits(ch).unwrap_or(FALLBACK_GLYPH);
        draw_glyph(canvas, cursor_x, y, bits, color, scale);
        cursor_x += glyph_advance(scale);
    }
}

fn draw_glyph(canvas: &mut Canvas<'_>, x: i32, y: i32, bits: u16, color: [u8; 4], scale: i32) {
    for row in 0..GLYPH_HEIGHT {
        let row_bits = (bits >> ((GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH)) & 0b111;
        for col in 0..GLYPH_WIDTH {
            if row_bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            canvas.fill_rect(x + col * scale, y + row * scale, scale, scale, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_game_text_has_glyphs() {
        for ch in "Heal Potion x3: 25/50 HP! (Lv.7) super effective?".chars() {
            assert!(glyph_bits(ch).is_some(), "missing glyph for {ch:?}");
        }
    }

    #[test]
    fn unknown_characters_use_fallback_without_panicking() {
        let mut frame = vec![0u8; 16 * 16 * 4];
        let mut canvas = Canvas::new(&mut frame, 16, 16);
        draw_text(&mut canvas, -2, -2, "é€", [255, 255, 255, 255], 1);
        assert!(glyph_bits('€').is_none());
    }

    #[test]
    fn digit_one_top_row_is_centered() {
        let bits = glyph_bits('1').expect("glyph");
        assert_eq!((bits >> 12) & 0b111, 0b010);
    }

    #[test]
    fn text_width_scales_with_length() {
        assert_eq!(text_width_px("ABC", 2), 24);
        assert_eq!(text_width_px("", 3), 0);
    }
}
