//! Shorthand expansion.
//!
//! [CSS Cascading § 1.2 Shorthand Properties](https://www.w3.org/TR/css-cascade-4/#shorthand)
//!
//! "Some properties are shorthand properties, meaning that they allow
//! authors to specify the values of several properties with a single
//! property."
//!
//! Shorthands are expanded when a declaration is parsed, before it is
//! turned into rules. A later longhand in the same cascade therefore
//! overrides the side it names and nothing else.

use crate::style::Property;
use crate::units;
use crate::value::Declaration;

const MARGIN: [Property; 4] = [
    Property::MarginTop,
    Property::MarginRight,
    Property::MarginBottom,
    Property::MarginLeft,
];
const PADDING: [Property; 4] = [
    Property::PaddingTop,
    Property::PaddingRight,
    Property::PaddingBottom,
    Property::PaddingLeft,
];
const BORDER_WIDTH: [Property; 4] = [
    Property::BorderTopWidth,
    Property::BorderRightWidth,
    Property::BorderBottomWidth,
    Property::BorderLeftWidth,
];
const BORDER_COLOR: [Property; 4] = [
    Property::BorderTopColor,
    Property::BorderRightColor,
    Property::BorderBottomColor,
    Property::BorderLeftColor,
];
const BORDER_STYLE: [Property; 4] = [
    Property::BorderTopStyle,
    Property::BorderRightStyle,
    Property::BorderBottomStyle,
    Property::BorderLeftStyle,
];

/// Side indices into the arrays above.
const TOP: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const LEFT: usize = 3;

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

/// Result of expanding one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// The name is a supported longhand or a shorthand that expanded.
    Declarations(Vec<Declaration>),
    /// The name is known but the value has the wrong shape; drop silently.
    Invalid,
    /// The property is not supported at all.
    Unsupported,
}

/// Split a value into space-separated components, keeping parenthesized
/// groups and quoted strings whole: `1px rgb(0, 0, 0)` has two components.
#[must_use]
pub fn split_values(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_u32;
    let mut quote = None;
    let mut start = None;
    for (i, c) in value.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&value[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        parts.push(&value[s..]);
    }
    parts
}

/// Expand `name: value` into longhand declarations.
#[must_use]
pub fn expand(name: &str, value: &str, important: bool) -> Expansion {
    let decl = |p: Property, v: &str| Declaration::new(p, v, important);

    if let Some(property) = Property::from_name(name) {
        return Expansion::Declarations(vec![decl(property, value)]);
    }

    let values = split_values(value);
    let expanded = match name {
        "margin" => four_sides(&MARGIN, &values, important),
        "padding" => four_sides(&PADDING, &values, important),
        "border-width" => four_sides(&BORDER_WIDTH, &values, important),
        "border-color" => four_sides(&BORDER_COLOR, &values, important),
        "border-style" => four_sides(&BORDER_STYLE, &values, important),
        "border" => border(&[TOP, RIGHT, BOTTOM, LEFT], &values, important),
        "border-top" => border(&[TOP], &values, important),
        "border-right" => border(&[RIGHT], &values, important),
        "border-bottom" => border(&[BOTTOM], &values, important),
        "border-left" => border(&[LEFT], &values, important),
        "background" => background(&values, important),
        "font" => font(&values, important),
        _ => return Expansion::Unsupported,
    };
    expanded.map_or(Expansion::Invalid, Expansion::Declarations)
}

/// [§ 8.3 Margin properties](https://www.w3.org/TR/CSS2/box.html#margin-properties)
///
/// "If there is only one component value, it applies to all sides. If there
/// are two values, the top and bottom margins are set to the first value
/// and the right and left margins are set to the second. If there are three
/// values, the top is set to the first value, the left and right are set to
/// the second, and the bottom is set to the third. If there are four
/// values, they apply to the top, right, bottom, and left, respectively."
///
/// The same distribution applies to padding and the border-width,
/// border-color and border-style shorthands.
fn four_sides(sides: &[Property; 4], values: &[&str], important: bool) -> Option<Vec<Declaration>> {
    let [top, right, bottom, left] = match *values {
        // RULE 1-VALUE: "it applies to all sides."
        [all] => [all, all, all, all],
        // RULE 2-VALUE: "the top and bottom margins are set to the first
        //               value and the right and left margins are set to the second."
        [vertical, horizontal] => [vertical, horizontal, vertical, horizontal],
        // RULE 3-VALUE: "the top is set to the first value, the left and
        //               right are set to the second, and the bottom is set to the third."
        [top, horizontal, bottom] => [top, horizontal, bottom, horizontal],
        // RULE 4-VALUE: "they apply to the top, right, bottom, and left, respectively."
        [top, right, bottom, left] => [top, right, bottom, left],
        _ => return None,
    };
    Some(
        sides
            .iter()
            .zip([top, right, bottom, left])
            .map(|(&p, v)| Declaration::new(p, v, important))
            .collect(),
    )
}

/// [§ 8.5.4 Border shorthand properties](https://www.w3.org/TR/CSS2/box.html#border-shorthand-properties)
///
/// "<border-width> || <border-style> || <'border-top-color'>". Components
/// may come in any order; omitted ones reset to their initial values.
fn border(sides: &[usize], values: &[&str], important: bool) -> Option<Vec<Declaration>> {
    if values.is_empty() || values.len() > 3 {
        return None;
    }
    let (mut width, mut style, mut color) = (None, None, None);
    for &v in values {
        let lower = v.to_ascii_lowercase();
        if values.len() == 1 && lower == "inherit" {
            (width, style, color) = (Some(v), Some(v), Some(v));
        } else if style.is_none() && BORDER_STYLES.contains(&lower.as_str()) {
            style = Some(v);
        } else if width.is_none() && units::parse_border_width(v, units::DEFAULT_FONT_SIZE).is_some() {
            width = Some(v);
        } else if color.is_none() {
            color = Some(v);
        } else {
            return None;
        }
    }
    let width = width.unwrap_or("medium");
    let style = style.unwrap_or("none");
    let color = color.unwrap_or("currentcolor");

    let mut out = Vec::with_capacity(sides.len() * 3);
    for &side in sides {
        out.push(Declaration::new(BORDER_WIDTH[side], width, important));
        out.push(Declaration::new(BORDER_STYLE[side], style, important));
        out.push(Declaration::new(BORDER_COLOR[side], color, important));
    }
    Some(out)
}

/// [CSS Backgrounds § 3.10 'background'](https://www.w3.org/TR/css-backgrounds-3/#background)
///
/// Color, image and repeat are taken from the components. Positions and
/// attachment keywords are accepted and ignored.
fn background(values: &[&str], important: bool) -> Option<Vec<Declaration>> {
    if values.is_empty() {
        return None;
    }
    if let [single] = values {
        if single.eq_ignore_ascii_case("inherit") {
            return Some(vec![
                Declaration::new(Property::BackgroundColor, "inherit", important),
                Declaration::new(Property::BackgroundImage, "inherit", important),
                Declaration::new(Property::BackgroundRepeat, "inherit", important),
            ]);
        }
    }

    let (mut color, mut image, mut repeat) = ("transparent", "none", "repeat");
    for &v in values {
        let lower = v.to_ascii_lowercase();
        match lower.as_str() {
            "repeat" | "repeat-x" | "repeat-y" | "no-repeat" => repeat = v,
            "none" => image = v,
            "scroll" | "fixed" | "top" | "bottom" | "left" | "right" | "center" => {}
            _ if units::parse_url(v).is_some() => image = v,
            _ if units::parse_length(v, units::DEFAULT_FONT_SIZE, 0).is_some() => {}
            _ => color = v,
        }
    }
    Some(vec![
        Declaration::new(Property::BackgroundColor, color, important),
        Declaration::new(Property::BackgroundImage, image, important),
        Declaration::new(Property::BackgroundRepeat, repeat, important),
    ])
}

/// [§ 15.8 Shorthand font property](https://www.w3.org/TR/CSS2/fonts.html#font-shorthand)
///
/// "[ [ <'font-style'> || <'font-variant'> || <'font-weight'> ]?
/// <'font-size'> [ / <'line-height'> ]? <'font-family'> ]"
fn font(values: &[&str], important: bool) -> Option<Vec<Declaration>> {
    let mut style = "normal";
    let mut weight = "normal";
    let mut iter = values.iter().copied().enumerate();

    // STEP 1: Optional style / variant / weight keywords.
    let (size_index, size_token) = loop {
        let (i, v) = iter.next()?;
        let lower = v.to_ascii_lowercase();
        match lower.as_str() {
            "italic" | "oblique" => style = v,
            "bold" | "bolder" | "lighter" => weight = v,
            "normal" | "small-caps" => {}
            _ if v.len() == 3 && v.parse::<u16>().is_ok() => weight = v,
            _ => break (i, v),
        }
    };

    // STEP 2: <'font-size'> [ / <'line-height'> ]
    let (size, mut line_height) = match size_token.split_once('/') {
        Some((size, lh)) => (size, (!lh.is_empty()).then_some(lh)),
        None => (size_token, None),
    };
    let mut next = size_index + 1;
    if line_height.is_none() {
        let slash_pending = size_token.ends_with('/');
        match values.get(next) {
            Some(&v) if slash_pending => {
                line_height = Some(v);
                next += 1;
            }
            Some(&"/") => {
                line_height = values.get(next + 1).copied();
                next += 2;
            }
            Some(&v) if v.len() > 1 && v.starts_with('/') => {
                line_height = Some(&v[1..]);
                next += 1;
            }
            _ => {}
        }
    }
    let _ = units::parse_font_size(size, units::DEFAULT_FONT_SIZE)?;

    // STEP 3: The family is everything that follows.
    let family = values.get(next..).map(|f| f.join(" ")).unwrap_or_default();
    if family.is_empty() {
        return None;
    }

    Some(vec![
        Declaration::new(Property::FontStyle, style, important),
        Declaration::new(Property::FontWeight, weight, important),
        Declaration::new(Property::FontSize, size, important),
        Declaration::new(Property::LineHeight, line_height.unwrap_or("normal"), important),
        Declaration::new(Property::FontFamily, family, important),
    ])
}
