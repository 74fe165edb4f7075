//! Tolerant stylesheet parser.
//!
//! [CSS Syntax Level 3 § 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing)
//!
//! "When errors occur in CSS, the parser attempts to recover gracefully,
//! throwing away only the minimum amount of content before returning to
//! parsing as normal."
//!
//! The parser works on characters rather than a token stream. It knows
//! enough about strings, comments and bracket nesting to find rule and
//! declaration boundaries, and hands selector text to [`Selector::parse`]
//! and declaration values to [`shorthand::expand`]. Nothing here returns an
//! error: malformed pieces are dropped and parsing continues.

use kestrel_common::warning::warn_once;

use crate::selector::Selector;
use crate::shorthand::{self, Expansion};
use crate::value::{Declaration, Origin, StyleRule, Stylesheet};

/// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
///
/// Parse stylesheet text into one rule per (selector, longhand) pair.
#[must_use]
pub fn parse_stylesheet(text: &str, origin: Origin) -> Stylesheet {
    let text = strip_comments(text);
    let mut sheet = Stylesheet::empty(origin);
    let mut rest = text.as_str();

    loop {
        rest = skip_trivia(rest);
        if rest.is_empty() {
            break;
        }

        // [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
        // At-rules are skipped whole, block included.
        if rest.starts_with('@') {
            rest = skip_at_rule(rest);
            continue;
        }

        // [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
        let Some(open) = find_unnested(rest, '{') else {
            // "If the input ends before a block is found, this is a parse
            // error. Return nothing."
            break;
        };
        let prelude = &rest[..open];
        let (block, after) = split_block(&rest[open + 1..]);
        rest = after;

        let declarations = parse_declarations(block);
        if declarations.is_empty() {
            continue;
        }
        for selector_text in split_unnested(prelude, ',') {
            let selector = Selector::parse(selector_text);
            if !selector.is_valid() {
                warn_once("CSS", &format!("ignoring selector '{}'", selector_text.trim()));
                continue;
            }
            for declaration in &declarations {
                sheet.rules.push(StyleRule {
                    selector: selector.clone(),
                    declaration: declaration.clone(),
                    origin,
                });
            }
        }
    }

    tracing::debug!(?origin, rules = sheet.rules.len(), "parsed stylesheet");
    sheet
}

/// Parse the contents of a `style` attribute. Every rule matches the
/// element the attribute belongs to.
#[must_use]
pub fn parse_inline_style(text: &str) -> Stylesheet {
    let text = strip_comments(text);
    let selector = Selector::universal();
    Stylesheet {
        origin: Origin::Inline,
        rules: parse_declarations(&text)
            .into_iter()
            .map(|declaration| StyleRule {
                selector: selector.clone(),
                declaration,
                origin: Origin::Inline,
            })
            .collect(),
    }
}

/// [§ 5.3.6 Parse a list of declarations](https://www.w3.org/TR/css-syntax-3/#parse-list-of-declarations)
///
/// Parse `name: value [!important]; ...` into expanded longhand
/// declarations.
#[must_use]
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    for item in split_unnested(block, ';') {
        let Some((name, value)) = item.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let (value, important) = strip_important(value.trim());
        if name.is_empty() || value.is_empty() {
            continue;
        }
        match shorthand::expand(&name, value, important) {
            Expansion::Declarations(decls) => out.extend(decls),
            Expansion::Invalid => {}
            Expansion::Unsupported => {
                warn_once("CSS", &format!("unsupported property '{name}'"));
            }
        }
    }
    out
}

/// [§ 5.4.4 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
///
/// "If the last two non-<whitespace-token>s in the declaration's value are a
/// <delim-token> with the value "!" followed by an <ident-token> with a
/// value that is an ASCII case-insensitive match for "important", remove
/// them from the declaration's value and set the declaration's important
/// flag to true."
fn strip_important(value: &str) -> (&str, bool) {
    if let Some(bang) = value.rfind('!') {
        let flag = value[bang + 1..].trim();
        if flag.eq_ignore_ascii_case("important") {
            return (value[..bang].trim_end(), true);
        }
    }
    (value, false)
}

/// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
///
/// Remove `/* ... */` outside of strings. An unterminated comment runs to
/// the end of input.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote = None;
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '/' && chars.peek() == Some(&'*') => {
                let _ = chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// Skip whitespace and the legacy `<!--` / `-->` markers.
fn skip_trivia(mut text: &str) -> &str {
    loop {
        let trimmed = text.trim_start();
        if let Some(rest) = trimmed
            .strip_prefix("<!--")
            .or_else(|| trimmed.strip_prefix("-->"))
        {
            text = rest;
        } else {
            return trimmed;
        }
    }
}

/// Skip an at-rule: up to the first top-level `;`, or through its block.
fn skip_at_rule(text: &str) -> &str {
    let semicolon = find_unnested(text, ';');
    let brace = find_unnested(text, '{');
    match (semicolon, brace) {
        (Some(s), Some(b)) if s < b => &text[s + 1..],
        (_, Some(b)) => split_block(&text[b + 1..]).1,
        (Some(s), None) => &text[s + 1..],
        (None, None) => "",
    }
}

/// Given text just after an opening `{`, return the block contents and the
/// text after the matching `}`. An unclosed block runs to end of input.
fn split_block(text: &str) -> (&str, &str) {
    let mut depth = 0_u32;
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') if depth == 0 => return (&text[..i], &text[i + 1..]),
            (None, '}') => depth -= 1,
            _ => {}
        }
    }
    (text, "")
}

/// Byte index of the first `needle` outside strings, parentheses and
/// square brackets.
fn find_unnested(text: &str, needle: char) -> Option<usize> {
    let mut depth = 0_u32;
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, c) if c == needle && depth == 0 => return Some(i),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Split on `separator` outside strings, parentheses and square brackets.
fn split_unnested(mut text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    while let Some(i) = find_unnested(text, separator) {
        parts.push(&text[..i]);
        text = &text[i + separator.len_utf8()..];
    }
    parts.push(text);
    parts.retain(|p| !p.trim().is_empty());
    parts
}
