//! Subtitle script generation: turning timed cues and a resolved style
//! into the renderer's script format.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caption::layout::{wrap_text, CaptionStyle};
use crate::caption::timing::format_cue_time;

/// One timed caption cue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

/// Render a complete subtitle script for the given frame size.
///
/// One shared style is emitted, then one dialogue event per usable cue in
/// input order. Cues whose text is empty after whitespace normalization or
/// whose `end <= start` are skipped rather than failing the operation.
/// Identical inputs always produce byte-identical output.
pub fn render_script(
    width: u32,
    height: u32,
    captions: &[Caption],
    style: &CaptionStyle,
) -> String {
    let mut script = String::new();

    script.push_str("[Script Info]\n");
    script.push_str("ScriptType: v4.00+\n");
    script.push_str(&format!("PlayResX: {}\n", width));
    script.push_str(&format!("PlayResY: {}\n", height));
    script.push_str("WrapStyle: 2\n");
    script.push_str("ScaledBorderAndShadow: yes\n\n");

    script.push_str("[V4+ Styles]\n");
    script.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
         BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
         BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );

    // With an opaque box the renderer draws the box in the outline color
    // and the outline field carries the box padding; without a box the
    // outline field is the text border width.
    let (border_style, outline_width, outline_color) = if style.boxed {
        (3, style.box_padding, style.back_color.as_str())
    } else {
        (1, style.border_width, "&H00000000")
    };

    script.push_str(&format!(
        "Style: Caption,{},{},{},{},{},{},0,0,0,0,100,100,0,0,{},{},0,{},{},{},{},1\n\n",
        style.font_name,
        style.font_size,
        style.primary_color,
        style.primary_color,
        outline_color,
        style.back_color,
        border_style,
        outline_width,
        style.alignment,
        style.side_margin,
        style.side_margin,
        style.margin_v,
    ));

    script.push_str("[Events]\n");
    script.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    let mut skipped = 0usize;
    for caption in captions {
        if caption.end <= caption.start {
            skipped += 1;
            continue;
        }
        let wrapped = wrap_text(&caption.text, style.max_chars_per_line);
        if wrapped.is_empty() {
            skipped += 1;
            continue;
        }

        script.push_str(&format!(
            "Dialogue: 0,{},{},Caption,,0,0,0,,{}\n",
            format_cue_time(caption.start),
            format_cue_time(caption.end),
            escape_text(&wrapped),
        ));
    }

    if skipped > 0 {
        debug!("Skipped {} unusable caption cue(s)", skipped);
    }

    script
}

/// Escape cue text for the script grammar: backslashes and braces are
/// escaped, newlines become the renderer's line-break token.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', "\\N")
}
