//! Resolved style records.
//!
//! [§ 4 Value Processing](https://www.w3.org/TR/css-cascade-4/#value-stages)
//!
//! After the cascade every node carries a [`StyleSet`]: three
//! [`ResolvedStyle`] records, one per pseudo-context. A record has one slot
//! per supported longhand, holding the winning raw value string, plus the
//! node's font size already resolved to pixels. Consumers turn the strings
//! into typed values on demand and fall back to the property's initial
//! value when a slot is empty or does not parse.

use std::str::FromStr;

use strum::EnumCount;
use strum_macros::{AsRefStr, Display, EnumCount as EnumCountMacro, EnumIter, EnumString};

use crate::layout::FontSpec;

/// Every longhand property the engine understands.
///
/// Names parse from and print as their CSS spelling (`margin-top`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
    EnumCountMacro,
)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum Property {
    Display,
    Float,
    Clear,
    Width,
    Height,
    MinWidth,
    MaxWidth,
    MinHeight,
    MaxHeight,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    BorderTopWidth,
    BorderRightWidth,
    BorderBottomWidth,
    BorderLeftWidth,
    BorderTopColor,
    BorderRightColor,
    BorderBottomColor,
    BorderLeftColor,
    BorderTopStyle,
    BorderRightStyle,
    BorderBottomStyle,
    BorderLeftStyle,
    Color,
    BackgroundColor,
    BackgroundImage,
    BackgroundRepeat,
    FontFamily,
    FontSize,
    FontStyle,
    FontWeight,
    LineHeight,
    TextAlign,
    TextIndent,
    TextDecoration,
    VerticalAlign,
    WhiteSpace,
}

impl Property {
    /// Parse a lowercase CSS property name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// [§ 7.1 Inherited Properties](https://www.w3.org/TR/css-cascade-4/#inherited-property)
    ///
    /// "Some properties are inherited from an ancestor element to its
    /// descendants."
    ///
    /// `text-decoration` is treated as inherited so decorations reach the
    /// text of nested inline elements.
    #[must_use]
    pub const fn inherited(self) -> bool {
        matches!(
            self,
            Self::Color
                | Self::FontFamily
                | Self::FontSize
                | Self::FontStyle
                | Self::FontWeight
                | Self::LineHeight
                | Self::TextAlign
                | Self::TextIndent
                | Self::TextDecoration
                | Self::WhiteSpace
        )
    }

    /// [§ 7.1 Initial Values](https://www.w3.org/TR/css-cascade-4/#initial-values)
    ///
    /// The value used when nothing in the cascade sets the property and it
    /// is not inherited.
    #[must_use]
    pub const fn initial(self) -> &'static str {
        match self {
            Self::Display => "inline",
            Self::Float | Self::Clear | Self::TextDecoration => "none",
            Self::Width | Self::Height => "auto",
            Self::MinWidth | Self::MinHeight | Self::TextIndent => "0",
            Self::MaxWidth | Self::MaxHeight | Self::BackgroundImage => "none",
            Self::MarginTop
            | Self::MarginRight
            | Self::MarginBottom
            | Self::MarginLeft
            | Self::PaddingTop
            | Self::PaddingRight
            | Self::PaddingBottom
            | Self::PaddingLeft => "0",
            Self::BorderTopWidth
            | Self::BorderRightWidth
            | Self::BorderBottomWidth
            | Self::BorderLeftWidth => "medium",
            Self::BorderTopColor
            | Self::BorderRightColor
            | Self::BorderBottomColor
            | Self::BorderLeftColor => "currentcolor",
            Self::BorderTopStyle
            | Self::BorderRightStyle
            | Self::BorderBottomStyle
            | Self::BorderLeftStyle => "none",
            Self::Color => "black",
            Self::BackgroundColor => "transparent",
            Self::BackgroundRepeat => "repeat",
            Self::FontFamily => "sans-serif",
            Self::FontSize => "medium",
            Self::FontStyle | Self::FontWeight | Self::LineHeight | Self::WhiteSpace => "normal",
            Self::TextAlign => "left",
            Self::VerticalAlign => "baseline",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// [CSS Display § 2](https://www.w3.org/TR/css-display-3/#the-display-properties)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum Display {
    Inline,
    Block,
    InlineBlock,
    ListItem,
    Table,
    None,
}

impl Display {
    /// Whether the box takes part in block flow as a block-level child.
    #[must_use]
    pub const fn is_block_level(self) -> bool {
        matches!(self, Self::Block | Self::ListItem | Self::Table)
    }
}

/// [§ 9.5.1 The 'float' property](https://www.w3.org/TR/CSS2/visuren.html#float-position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum Float {
    None,
    Left,
    Right,
}

/// [§ 9.5.2 The 'clear' property](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum Clear {
    None,
    Left,
    Right,
    Both,
}

/// [§ 16.6 White space](https://www.w3.org/TR/CSS2/text.html#white-space-prop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum WhiteSpace {
    Normal,
    Pre,
    Nowrap,
    PreWrap,
    PreLine,
}

impl WhiteSpace {
    /// Whether literal newlines split the text instead of word wrapping.
    #[must_use]
    pub const fn preserves_newlines(self) -> bool {
        matches!(self, Self::Pre | Self::PreWrap | Self::PreLine)
    }
}

/// [§ 16.2 Alignment](https://www.w3.org/TR/CSS2/text.html#alignment-prop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum TextAlign {
    Left,
    Right,
    Center,
    Justify,
}

/// [§ 10.8.1 'vertical-align'](https://www.w3.org/TR/CSS2/visudet.html#propdef-vertical-align)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum VerticalAlign {
    Baseline,
    TextTop,
    TextBottom,
    Middle,
}

/// [CSS Backgrounds § 3.4 'background-repeat'](https://www.w3.org/TR/css-backgrounds-3/#background-repeat)
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum BackgroundRepeat {
    Repeat,
    RepeatX,
    RepeatY,
    NoRepeat,
}

/// Which of a node's three style records applies.
///
/// [§ 7.1 ::first-line](https://www.w3.org/TR/css-pseudo-4/#first-line-pseudo)
/// [§ 7.2 ::first-letter](https://www.w3.org/TR/css-pseudo-4/#first-letter-pseudo)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StyleContext {
    /// Content not on the first formatted line.
    #[default]
    Unconditional,
    /// Content on the first formatted line of its block.
    FirstLine,
    /// The first letter of the first formatted line.
    FirstLetter,
}

/// A cascade-resolved style record: one raw value per property plus the
/// resolved font size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStyle {
    values: [Option<String>; Property::COUNT],
    font_size: i32,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| None),
            font_size: crate::units::DEFAULT_FONT_SIZE,
        }
    }
}

impl ResolvedStyle {
    /// The cascaded value, if any rule or inheritance supplied one.
    #[must_use]
    pub fn get(&self, property: Property) -> Option<&str> {
        self.values[property.index()].as_deref()
    }

    /// The cascaded value, or the property's initial value.
    #[must_use]
    pub fn value(&self, property: Property) -> &str {
        self.get(property).unwrap_or_else(|| property.initial())
    }

    /// Overwrite a slot.
    pub fn set(&mut self, property: Property, value: impl Into<String>) {
        self.values[property.index()] = Some(value.into());
    }

    /// Clear a slot back to "unset".
    pub fn unset(&mut self, property: Property) {
        self.values[property.index()] = None;
    }

    /// Resolved font size in pixels.
    #[must_use]
    pub const fn font_size(&self) -> i32 {
        self.font_size
    }

    /// Store the resolved font size.
    pub const fn set_font_size(&mut self, px: i32) {
        self.font_size = px;
    }

    fn keyword<T: FromStr>(&self, property: Property, fallback: T) -> T {
        T::from_str(&self.value(property).to_ascii_lowercase()).unwrap_or(fallback)
    }

    /// Used `display`.
    #[must_use]
    pub fn display(&self) -> Display {
        self.keyword(Property::Display, Display::Inline)
    }

    /// Used `float`.
    #[must_use]
    pub fn float(&self) -> Float {
        self.keyword(Property::Float, Float::None)
    }

    /// Used `clear`.
    #[must_use]
    pub fn clear(&self) -> Clear {
        self.keyword(Property::Clear, Clear::None)
    }

    /// Used `white-space`.
    #[must_use]
    pub fn white_space(&self) -> WhiteSpace {
        self.keyword(Property::WhiteSpace, WhiteSpace::Normal)
    }

    /// Used `text-align`.
    #[must_use]
    pub fn text_align(&self) -> TextAlign {
        self.keyword(Property::TextAlign, TextAlign::Left)
    }

    /// Used `vertical-align`. Lengths and unsupported keywords align on the
    /// baseline.
    #[must_use]
    pub fn vertical_align(&self) -> VerticalAlign {
        self.keyword(Property::VerticalAlign, VerticalAlign::Baseline)
    }

    /// Used `background-repeat`.
    #[must_use]
    pub fn background_repeat(&self) -> BackgroundRepeat {
        self.keyword(Property::BackgroundRepeat, BackgroundRepeat::Repeat)
    }

    /// Whether `text-decoration` asks for an underline.
    #[must_use]
    pub fn underline(&self) -> bool {
        self.value(Property::TextDecoration)
            .split_ascii_whitespace()
            .any(|v| v.eq_ignore_ascii_case("underline"))
    }

    /// The font this style selects, at its resolved size.
    #[must_use]
    pub fn font(&self) -> FontSpec {
        let weight = self.value(Property::FontWeight).to_ascii_lowercase();
        let bold = match weight.as_str() {
            "bold" | "bolder" => true,
            other => other.parse::<u16>().is_ok_and(|w| w >= 600),
        };
        let italic = matches!(
            self.value(Property::FontStyle).to_ascii_lowercase().as_str(),
            "italic" | "oblique"
        );
        let family = self
            .value(Property::FontFamily)
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        FontSpec {
            family,
            size: self.font_size.max(1),
            bold,
            italic,
        }
    }
}

/// The three style records of one node.
///
/// `first_line` is `unconditional` with `::first-line` rules layered on
/// top, and `first_letter` is `first_line` with `::first-letter` rules
/// layered on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSet {
    /// Style outside the first line.
    pub unconditional: ResolvedStyle,
    /// Style on the first formatted line.
    pub first_line: ResolvedStyle,
    /// Style of the first letter.
    pub first_letter: ResolvedStyle,
}

impl StyleSet {
    /// The record for `context`.
    #[must_use]
    pub const fn get(&self, context: StyleContext) -> &ResolvedStyle {
        match context {
            StyleContext::Unconditional => &self.unconditional,
            StyleContext::FirstLine => &self.first_line,
            StyleContext::FirstLetter => &self.first_letter,
        }
    }

    /// Whether `::first-letter` rules changed anything.
    #[must_use]
    pub fn has_first_letter(&self) -> bool {
        self.first_letter != self.first_line
    }
}
