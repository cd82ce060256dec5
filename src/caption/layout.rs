//! Caption layout: resolving render-ready style parameters from media
//! dimensions and wrapping cue text to a bounded footprint.

use serde::{Deserialize, Serialize};

use crate::caption::color::{self, resolve_color};

/// Vertical caption placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    Top,
    Center,
    #[default]
    Bottom,
}

impl CaptionPosition {
    /// Numpad alignment code used by the subtitle renderer.
    pub fn alignment(&self) -> u8 {
        match self {
            CaptionPosition::Top => 8,
            CaptionPosition::Center => 5,
            CaptionPosition::Bottom => 2,
        }
    }
}

/// User-supplied style overrides. Everything left unset is derived from
/// the media dimensions.
#[derive(Debug, Clone, Default)]
pub struct CaptionOptions {
    pub font_size: Option<u32>,
    pub font_color: Option<String>,
    pub bg_color: Option<String>,
    pub position: CaptionPosition,
}

/// Fully resolved rendering parameters for one caption request.
///
/// Pure function of (media dimensions, overrides); every derived value is
/// clamped to its documented bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_name: String,
    pub font_size: u32,
    pub border_width: u32,
    pub box_padding: u32,
    pub primary_color: String,
    pub back_color: String,
    /// Whether an opaque box is drawn behind the text.
    pub boxed: bool,
    pub alignment: u8,
    pub margin_v: u32,
    pub side_margin: u32,
    pub max_chars_per_line: usize,
}

const FONT_HEIGHT_RATIO: f64 = 0.016;
const BORDER_FONT_RATIO: f64 = 0.12;
const PADDING_FONT_RATIO: f64 = 0.7;
const SIDE_MARGIN_RATIO: f64 = 0.06;
const TOP_MARGIN_RATIO: f64 = 0.06;
const BOTTOM_MARGIN_RATIO: f64 = 0.12;
/// Usable fraction of the frame width for caption text.
const TEXT_WIDTH_RATIO: f64 = 0.72;
/// Empirical average glyph width as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.6;

fn clamp_round(value: f64, min: u32, max: u32) -> u32 {
    (value.round() as i64).clamp(min as i64, max as i64) as u32
}

/// Resolve a caption style for a frame of the given dimensions.
pub fn build_style(
    width: u32,
    height: u32,
    font_name: &str,
    opts: &CaptionOptions,
) -> CaptionStyle {
    let font_size = opts
        .font_size
        .unwrap_or_else(|| clamp_round(FONT_HEIGHT_RATIO * height as f64, 8, 32));

    let border_width = clamp_round(BORDER_FONT_RATIO * font_size as f64, 2, 10);
    let box_padding = clamp_round(PADDING_FONT_RATIO * font_size as f64, 10, 20);

    let margin_v = match opts.position {
        CaptionPosition::Top => (TOP_MARGIN_RATIO * height as f64).round() as u32,
        CaptionPosition::Center => 0,
        CaptionPosition::Bottom => (BOTTOM_MARGIN_RATIO * height as f64).round() as u32,
    };

    let side_margin = (SIDE_MARGIN_RATIO * width as f64).round() as u32;

    let text_width = TEXT_WIDTH_RATIO * width as f64;
    let glyph_width = GLYPH_WIDTH_RATIO * font_size as f64;
    let max_chars_per_line = ((text_width / glyph_width).floor() as usize).max(1);

    let primary_color = resolve_color(
        opts.font_color.as_deref().unwrap_or("white"),
        color::WHITE,
    );
    let (back_color, boxed) = match opts.bg_color.as_deref() {
        Some(spec) => (resolve_color(spec, color::BACK_DEFAULT), true),
        None => (color::BACK_DEFAULT.to_string(), false),
    };

    CaptionStyle {
        font_name: font_name.to_string(),
        font_size,
        border_width,
        box_padding,
        primary_color,
        back_color,
        boxed,
        alignment: opts.position.alignment(),
        margin_v,
        side_margin,
        max_chars_per_line,
    }
}

/// Wrap caption text to at most two lines of `max_chars` columns.
///
/// Internal whitespace is collapsed first. When the wrapped text would run
/// past two lines, the first line is kept verbatim and the remaining words
/// collapse into a second line truncated with an ellipsis; burned-in
/// captions degrade quickly past two lines at typical video heights.
pub fn wrap_text(text: &str, max_chars: usize) -> String {
    let normalized: Vec<&str> = text.split_whitespace().collect();
    if normalized.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in normalized {
        for piece in split_long_word(word, max_chars) {
            let needed = if current.is_empty() {
                piece.chars().count()
            } else {
                current.chars().count() + 1 + piece.chars().count()
            };

            if needed <= max_chars {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&piece);
            } else {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.push_str(&piece);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() <= 2 {
        return lines.join("\n");
    }

    let second = lines[1..].join(" ");
    format!("{}\n{}", lines[0], truncate_with_ellipsis(&second, max_chars))
}

/// Break a single word that exceeds the line width into max-width chunks.
fn split_long_word(word: &str, max_chars: usize) -> Vec<String> {
    if word.chars().count() <= max_chars {
        return vec![word.to_string()];
    }
    word.chars()
        .collect::<Vec<_>>()
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_bounds_hold_universally() {
        for (w, h) in [(640, 500), (1280, 720), (1920, 1080), (3840, 2160), (720, 9000)] {
            let style = build_style(w, h, "Arial", &CaptionOptions::default());
            assert!((8..=32).contains(&style.font_size), "{}x{}", w, h);
            assert!((2..=10).contains(&style.border_width));
            assert!((10..=20).contains(&style.box_padding));
            assert!(style.max_chars_per_line >= 1);
        }
    }

    #[test]
    fn test_style_is_deterministic() {
        let opts = CaptionOptions {
            font_color: Some("yellow".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_style(1920, 1080, "Arial", &opts),
            build_style(1920, 1080, "Arial", &opts)
        );
    }

    #[test]
    fn test_1080p_derivation() {
        let style = build_style(1920, 1080, "Arial", &CaptionOptions::default());
        // 0.016 * 1080 = 17.28 -> 17
        assert_eq!(style.font_size, 17);
        // 0.12 * 17 = 2.04 -> 2
        assert_eq!(style.border_width, 2);
        // 0.7 * 17 = 11.9 -> 12
        assert_eq!(style.box_padding, 12);
        // bottom: 12% of height
        assert_eq!(style.margin_v, 130);
        assert_eq!(style.side_margin, 115);
        // 0.72 * 1920 / (0.6 * 17) = 135.5 -> 135
        assert_eq!(style.max_chars_per_line, 135);
        assert_eq!(style.alignment, 2);
    }

    #[test]
    fn test_position_margins() {
        let top = CaptionOptions {
            position: CaptionPosition::Top,
            ..Default::default()
        };
        let center = CaptionOptions {
            position: CaptionPosition::Center,
            ..Default::default()
        };
        assert_eq!(build_style(1000, 1000, "Arial", &top).margin_v, 60);
        assert_eq!(build_style(1000, 1000, "Arial", &top).alignment, 8);
        assert_eq!(build_style(1000, 1000, "Arial", &center).margin_v, 0);
        assert_eq!(build_style(1000, 1000, "Arial", &center).alignment, 5);
    }

    #[test]
    fn test_explicit_font_size_wins() {
        let opts = CaptionOptions {
            font_size: Some(48),
            ..Default::default()
        };
        let style = build_style(1920, 1080, "Arial", &opts);
        assert_eq!(style.font_size, 48);
        // Dependent values still derive from the chosen size, clamped.
        assert_eq!(style.border_width, 6);
        assert_eq!(style.box_padding, 20);
    }

    #[test]
    fn test_bg_color_toggles_box() {
        let boxed = CaptionOptions {
            bg_color: Some("black@0.5".to_string()),
            ..Default::default()
        };
        assert!(build_style(1280, 720, "Arial", &boxed).boxed);
        assert!(!build_style(1280, 720, "Arial", &CaptionOptions::default()).boxed);
    }

    #[test]
    fn test_wrap_collapses_whitespace() {
        assert_eq!(wrap_text("  hello   world  ", 40), "hello world");
        assert_eq!(wrap_text("a\tb\nc", 40), "a b c");
    }

    #[test]
    fn test_wrap_two_line_limit_and_width() {
        let text = "the quick brown fox jumps over the lazy dog again and again and again";
        for max in [10, 16, 24, 40] {
            let wrapped = wrap_text(text, max);
            let lines: Vec<&str> = wrapped.split('\n').collect();
            assert!(lines.len() <= 2, "max={}: {:?}", max, lines);
            for line in lines {
                assert!(line.chars().count() <= max, "max={}: {:?}", max, line);
            }
        }
    }

    #[test]
    fn test_wrap_keeps_first_line_verbatim() {
        let wrapped = wrap_text("one two three four five six seven", 9);
        let lines: Vec<&str> = wrapped.split('\n').collect();
        assert_eq!(lines[0], "one two");
        assert!(lines[1].ends_with('…'));
    }

    #[test]
    fn test_wrap_hard_breaks_long_words() {
        let wrapped = wrap_text("abcdefghijklmnop", 5);
        for line in wrapped.split('\n') {
            assert!(line.chars().count() <= 5);
        }
    }

    #[test]
    fn test_wrap_empty_input() {
        assert_eq!(wrap_text("   ", 20), "");
    }
}
