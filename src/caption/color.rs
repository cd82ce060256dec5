//! Color resolution for the subtitle renderer.
//!
//! User-facing color specs (named colors, hex, either with an `@alpha`
//! suffix) are encoded into the renderer's native `&HAABBGGRR` form:
//! alpha, blue, green, red, where alpha `00` is opaque and `FF` is fully
//! transparent.

/// Fully opaque white in native encoding.
pub const WHITE: &str = "&H00FFFFFF";
/// Half-transparent black, the default caption box color.
pub const BACK_DEFAULT: &str = "&H80000000";

/// Resolve a user color spec into the native encoding.
///
/// Accepted forms: a named color (white/black/red/green/blue/yellow), six
/// hex digits with or without a leading `#`, or either of those with an
/// `@<alpha>` suffix where alpha is a float in [0,1] or a percentage.
/// Already-native values (`&H` + 8 hex digits) pass through untouched, so
/// resolving twice is safe. Anything unparseable returns `fallback`.
pub fn resolve_color(spec: &str, fallback: &str) -> String {
    let spec = spec.trim();

    if is_native(spec) {
        return spec.to_string();
    }

    let (body, alpha) = match spec.split_once('@') {
        Some((body, raw)) => match parse_alpha(raw) {
            Some(alpha) => (body, alpha),
            None => return fallback.to_string(),
        },
        None => (spec, 1.0),
    };

    match parse_rgb(body) {
        Some((r, g, b)) => encode(r, g, b, alpha),
        None => fallback.to_string(),
    }
}

fn is_native(spec: &str) -> bool {
    spec.len() == 10
        && (spec.starts_with("&H") || spec.starts_with("&h"))
        && spec[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_rgb(body: &str) -> Option<(u8, u8, u8)> {
    match body.to_ascii_lowercase().as_str() {
        "white" => return Some((0xFF, 0xFF, 0xFF)),
        "black" => return Some((0x00, 0x00, 0x00)),
        "red" => return Some((0xFF, 0x00, 0x00)),
        "green" => return Some((0x00, 0xFF, 0x00)),
        "blue" => return Some((0x00, 0x00, 0xFF)),
        "yellow" => return Some((0xFF, 0xFF, 0x00)),
        _ => {}
    }

    let hex = body.strip_prefix('#').unwrap_or(body);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Parse an alpha suffix: `0.5`, `50%`. Returns opacity in [0,1].
fn parse_alpha(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = if let Some(percent) = raw.strip_suffix('%') {
        percent.trim().parse::<f64>().ok()? / 100.0
    } else {
        raw.parse::<f64>().ok()?
    };

    if (0.0..=1.0).contains(&value) {
        Some(value)
    } else {
        None
    }
}

fn encode(r: u8, g: u8, b: u8, opacity: f64) -> String {
    // Native alpha is inverted: 0x00 opaque, 0xFF transparent.
    let alpha = ((1.0 - opacity) * 255.0).round() as u8;
    format!("&H{:02X}{:02X}{:02X}{:02X}", alpha, b, g, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors() {
        assert_eq!(resolve_color("white", WHITE), "&H00FFFFFF");
        assert_eq!(resolve_color("black", WHITE), "&H00000000");
        assert_eq!(resolve_color("red", WHITE), "&H000000FF");
        assert_eq!(resolve_color("blue", WHITE), "&H00FF0000");
        assert_eq!(resolve_color("yellow", WHITE), "&H0000FFFF");
    }

    #[test]
    fn test_hex_with_and_without_hash() {
        assert_eq!(resolve_color("#FF8800", WHITE), "&H000088FF");
        assert_eq!(resolve_color("ff8800", WHITE), "&H000088FF");
    }

    #[test]
    fn test_alpha_suffix_float_and_percent() {
        // 0.5 opacity -> alpha byte 0x80
        assert_eq!(resolve_color("black@0.5", WHITE), "&H80000000");
        assert_eq!(resolve_color("black@50%", WHITE), "&H80000000");
        // Full opacity keeps 00; zero opacity is FF
        assert_eq!(resolve_color("white@1", WHITE), "&H00FFFFFF");
        assert_eq!(resolve_color("white@0", WHITE), "&HFFFFFFFF");
    }

    #[test]
    fn test_unparseable_returns_fallback() {
        assert_eq!(resolve_color("chartreuse", WHITE), WHITE);
        assert_eq!(resolve_color("#12345", WHITE), WHITE);
        assert_eq!(resolve_color("white@2.0", WHITE), WHITE);
        assert_eq!(resolve_color("white@-1", WHITE), WHITE);
        assert_eq!(resolve_color("", BACK_DEFAULT), BACK_DEFAULT);
    }

    #[test]
    fn test_native_passthrough_is_idempotent() {
        let once = resolve_color("ffffff", WHITE);
        let twice = resolve_color(&once, WHITE);
        assert_eq!(once, twice);
        assert_eq!(resolve_color("&H80000000", WHITE), "&H80000000");
    }
}
