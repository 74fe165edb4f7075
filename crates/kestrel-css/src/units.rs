//! Unit conversion.
//!
//! [CSS Values and Units Level 4](https://www.w3.org/TR/css-values-4/)
//!
//! Every geometric value in the engine is an integer pixel count. This
//! module turns raw cascade strings into those integers. Nothing here
//! fails loudly: an unparseable value yields `None` and the caller falls
//! back to the property's initial value.

use image::Rgba;

/// Root font size in pixels (`medium`).
pub const DEFAULT_FONT_SIZE: i32 = 16;

/// Fully transparent black.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// [§ 6.2 Absolute lengths](https://www.w3.org/TR/css-values-4/#absolute-lengths)
///
/// "1in = 2.54cm = 96px", "1pt = 1/72th of 1in", "1pc = 1/6th of 1in".
const PX_PER_IN: f64 = 96.0;

/// Split a numeric token into its number and (lowercase) unit.
fn split_number(value: &str) -> Option<(f64, String)> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map_or(value.len(), |(i, _)| i);
    let number: f64 = value[..end].parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    Some((number, value[end..].to_ascii_lowercase()))
}

/// Round to the nearest pixel.
#[allow(clippy::cast_possible_truncation)]
fn to_px(value: f64) -> i32 {
    value.round() as i32
}

/// [§ 5 Distance Units](https://www.w3.org/TR/css-values-4/#lengths)
///
/// Convert a length or percentage to pixels.
///
/// - `em` is relative to `font_size` and `ex` is taken as half an em.
/// - `%` is relative to `percent_base`.
/// - A bare number is read as pixels, matching legacy HTML attributes.
///
/// Returns `None` for keywords (`auto`, `none`, ...) and malformed input.
#[must_use]
pub fn parse_length(value: &str, font_size: i32, percent_base: i32) -> Option<i32> {
    let (number, unit) = split_number(value)?;
    let em = f64::from(font_size);
    let px = match unit.as_str() {
        "" | "px" => number,
        "em" => number * em,
        "ex" => number * em / 2.0,
        "%" => number * f64::from(percent_base) / 100.0,
        "in" => number * PX_PER_IN,
        "cm" => number * PX_PER_IN / 2.54,
        "mm" => number * PX_PER_IN / 25.4,
        "pt" => number * PX_PER_IN / 72.0,
        "pc" => number * PX_PER_IN / 6.0,
        _ => return None,
    };
    Some(to_px(px))
}

/// [§ 8.5.1 Border width](https://www.w3.org/TR/CSS2/box.html#border-width-properties)
///
/// "The interpretation of the first three values depends on the user
/// agent." Kestrel uses thin = 1, medium = 3, thick = 5.
#[must_use]
pub fn parse_border_width(value: &str, font_size: i32) -> Option<i32> {
    match value.trim().to_ascii_lowercase().as_str() {
        "thin" => Some(1),
        "medium" => Some(3),
        "thick" => Some(5),
        other => parse_length(other, font_size, 0).map(|w| w.max(0)),
    }
}

/// [§ 15.7 Font size](https://www.w3.org/TR/CSS2/fonts.html#font-size-props)
///
/// Resolve a `font-size` value. Relative units (`em`, `%`, `smaller`,
/// `larger`) are taken against the parent's size.
#[must_use]
pub fn parse_font_size(value: &str, parent_size: i32) -> Option<i32> {
    let keyword = value.trim().to_ascii_lowercase();
    let size = match keyword.as_str() {
        "xx-small" => 9,
        "x-small" => 10,
        "small" => 13,
        "medium" => DEFAULT_FONT_SIZE,
        "large" => 18,
        "x-large" => 24,
        "xx-large" => 32,
        "smaller" => to_px(f64::from(parent_size) * 5.0 / 6.0),
        "larger" => to_px(f64::from(parent_size) * 1.2),
        other => parse_length(other, parent_size, parent_size)?,
    };
    (size > 0).then_some(size)
}

/// [§ 10.8.1 'line-height'](https://www.w3.org/TR/CSS2/visudet.html#propdef-line-height)
///
/// Resolve `line-height` against the element's font size. `normal`
/// returns `None`: the font's own line spacing applies.
#[must_use]
pub fn parse_line_height(value: &str, font_size: i32) -> Option<i32> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("normal") {
        return None;
    }
    // "<number>: The used value of the property is this number multiplied
    // by the element's font size."
    if let Ok(factor) = value.parse::<f64>() {
        return Some(to_px(factor * f64::from(font_size)).max(0));
    }
    parse_length(value, font_size, font_size).map(|h| h.max(0))
}

/// [CSS Color Level 4](https://www.w3.org/TR/css-color-4/)
///
/// Parse a color. `currentcolor` resolves to `current`.
#[must_use]
pub fn parse_color(value: &str, current: Rgba<u8>) -> Option<Rgba<u8>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("currentcolor") {
        return Some(current);
    }
    csscolorparser::parse(value)
        .ok()
        .map(|c| Rgba(c.to_rgba8()))
}

/// [§ 4.5 Resource Locators](https://www.w3.org/TR/css-values-4/#urls)
///
/// Extract the target of `url(...)`, with or without quotes.
#[must_use]
pub fn parse_url(value: &str) -> Option<&str> {
    let value = value.trim();
    let lower = value.get(..4)?.to_ascii_lowercase();
    if lower != "url(" || !value.ends_with(')') {
        return None;
    }
    let inner = value[4..value.len() - 1].trim();
    let inner = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(inner);
    (!inner.is_empty()).then_some(inner)
}
