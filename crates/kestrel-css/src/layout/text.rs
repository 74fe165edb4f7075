//! Words, inter-word spacing and a fixed-pitch shaper.
//!
//! [CSS Text Module Level 3](https://www.w3.org/TR/css-text-3/)
//!
//! The engine breaks text at white space and after hyphens. Spaces are not
//! measured glyphs: the gap after a word depends on how the word ends.

use image::{Rgba, RgbaImage};

use super::{FontMetrics, FontSpec, TextShaper};

/// A breakable piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    /// The text, without surrounding white space.
    pub text: &'a str,
    /// Whether white space follows in the source. A hyphen break inside a
    /// word has no gap after it.
    pub space_after: bool,
}

/// [§ 5.1 Line Breaking](https://www.w3.org/TR/css-text-3/#line-breaking)
///
/// Split at white space, and after each hyphen that sits between two
/// non-hyphen characters: `well-known` yields `well-` and `known`.
#[must_use]
pub fn words(text: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    let trailing_space = text.ends_with(char::is_whitespace);
    let chunks: Vec<&str> = text.split_whitespace().collect();
    let last = chunks.len().saturating_sub(1);

    for (index, chunk) in chunks.iter().enumerate() {
        let space_after = index < last || trailing_space;
        let mut start = 0;
        let chars: Vec<(usize, char)> = chunk.char_indices().collect();
        for (i, &(offset, c)) in chars.iter().enumerate() {
            let breakable = c == '-'
                && i > 0
                && chars.get(i + 1).is_some_and(|&(_, next)| next != '-')
                && chars[i - 1].1 != '-';
            if breakable {
                let end = offset + c.len_utf8();
                out.push(Word {
                    text: &chunk[start..end],
                    space_after: false,
                });
                start = end;
            }
        }
        out.push(Word {
            text: &chunk[start..],
            space_after,
        });
    }
    out
}

/// Gap after `word` at `font_size`: a full em after a sentence end, half an
/// em after other punctuation, a third of an em otherwise.
#[must_use]
pub fn space_after(word: &str, font_size: i32) -> i32 {
    match word.chars().last() {
        Some('.') => font_size,
        Some(',' | ';' | ':' | '!' | '?') => font_size / 2,
        _ => font_size / 3,
    }
}

/// Length in bytes of the `::first-letter` of `word`: leading punctuation
/// plus the first letter or digit.
///
/// [CSS Pseudo-Elements § 2.2](https://www.w3.org/TR/css-pseudo-4/#first-letter-pattern)
///
/// "Punctuation (i.e, characters that belong to the Punctuation (P*) Unicode
/// general category) that precedes or follows the first letter should be
/// included."
#[must_use]
pub fn first_letter_len(word: &str) -> usize {
    let mut len = 0;
    for c in word.chars() {
        len += c.len_utf8();
        if c.is_alphanumeric() {
            break;
        }
    }
    len
}

/// A deterministic shaper: every character is `advance` wide and glyphs are
/// solid blocks. Geometry computed with it is exact, which makes it the
/// shaper of choice for layout tests.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceShaper {
    /// Advance per character in pixels at size 16; scales with font size.
    pub advance: i32,
}

impl Default for MonospaceShaper {
    fn default() -> Self {
        Self { advance: 8 }
    }
}

impl MonospaceShaper {
    fn scaled_advance(&self, font: &FontSpec) -> i32 {
        (self.advance * font.size / 16).max(1)
    }
}

impl TextShaper for MonospaceShaper {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn measure(&self, text: &str, font: &FontSpec) -> i32 {
        text.chars().count() as i32 * self.scaled_advance(font)
    }

    fn metrics(&self, font: &FontSpec) -> FontMetrics {
        // Ascent 3/4 em, descent 1/4 em, no line gap.
        let ascent = font.size * 3 / 4;
        FontMetrics {
            ascent,
            descent: font.size - ascent,
            line_gap: 0,
            x_height: font.size / 2,
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn rasterize(&self, text: &str, font: &FontSpec, color: Rgba<u8>) -> Option<RgbaImage> {
        let advance = self.scaled_advance(font);
        let width = self.measure(text, font);
        let metrics = self.metrics(font);
        if width <= 0 || metrics.height() <= 0 {
            return None;
        }
        let glyph_top = metrics.ascent - metrics.x_height;
        let image = RgbaImage::from_fn(width as u32, metrics.height() as u32, |x, y| {
            let in_glyph = (x as i32 % advance) < advance - 1
                && (y as i32) >= glyph_top
                && (y as i32) < metrics.ascent;
            if in_glyph { color } else { Rgba([0, 0, 0, 0]) }
        });
        Some(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(words: &[Word<'a>]) -> Vec<&'a str> {
        words.iter().map(|w| w.text).collect()
    }

    #[test]
    fn test_words_split_on_white_space_and_hyphens() {
        let got = words("  a well-known  fact ");
        assert_eq!(texts(&got), vec!["a", "well-", "known", "fact"]);
        assert!(!got[1].space_after);
        assert!(got[2].space_after);
        assert!(got[3].space_after);
    }

    #[test]
    fn test_no_break_at_leading_trailing_or_doubled_hyphens() {
        assert_eq!(texts(&words("-x x- a--b")), vec!["-x", "x-", "a--b"]);
        assert!(!words("end").last().is_some_and(|w| w.space_after));
    }

    #[test]
    fn test_punctuation_spacing() {
        assert_eq!(space_after("end.", 12), 12);
        assert_eq!(space_after("list,", 12), 6);
        assert_eq!(space_after("what?", 12), 6);
        assert_eq!(space_after("word", 12), 4);
    }

    #[test]
    fn test_first_letter_includes_leading_punctuation() {
        assert_eq!(first_letter_len("Hello"), 1);
        assert_eq!(first_letter_len("\"Quote"), 2);
        assert_eq!(first_letter_len("élan"), 2);
    }

    #[test]
    fn test_monospace_shaper_scales_with_size() {
        let shaper = MonospaceShaper::default();
        let font = FontSpec {
            family: "serif".into(),
            size: 32,
            bold: false,
            italic: false,
        };
        assert_eq!(shaper.measure("abc", &font), 48);
        assert_eq!(shaper.metrics(&font).height(), 32);
        let raster = shaper.rasterize("ab", &font, Rgba([0, 0, 0, 255]));
        assert_eq!(raster.map(|r| r.dimensions()), Some((32, 32)));
    }
}
