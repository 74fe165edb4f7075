//! Style value model.
//!
//! [CSS Cascading and Inheritance Level 4](https://www.w3.org/TR/css-cascade-4/)
//!
//! A parsed stylesheet is a flat, ordered list of [`StyleRule`]s, one per
//! (selector, longhand property) pair. Shorthands are already expanded and
//! selector lists already split by the time a rule exists, so the cascade
//! only ever compares single declarations.

use crate::selector::Selector;
use crate::style::Property;

/// [§ 6.1 Cascade Origins](https://www.w3.org/TR/css-cascade-4/#origin)
///
/// "Each style rule has a cascade origin, which determines where it enters
/// the cascade."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The compiled-in default sheet.
    UserAgent,
    /// The reader's own sheet.
    User,
    /// `<style>` and `<link rel=stylesheet>` sheets.
    Author,
    /// A `style` attribute on the element itself.
    Inline,
}

/// Precedence bucket of a declaration, lowest first.
///
/// [§ 6.4 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
///
/// Inline declarations sit just above the author sheet at each importance
/// level, which makes them outrank any selector-based author rule. User
/// `!important` declarations beat everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CascadeLevel {
    /// User-agent declarations, important or not.
    UserAgent,
    /// Normal user declarations.
    UserNormal,
    /// Normal author declarations.
    AuthorNormal,
    /// Normal `style` attribute declarations.
    InlineNormal,
    /// `!important` author declarations.
    AuthorImportant,
    /// `!important` `style` attribute declarations.
    InlineImportant,
    /// `!important` user declarations.
    UserImportant,
}

impl CascadeLevel {
    /// Bucket for a declaration of the given origin and importance.
    #[must_use]
    pub const fn of(origin: Origin, important: bool) -> Self {
        match (origin, important) {
            (Origin::UserAgent, _) => Self::UserAgent,
            (Origin::User, false) => Self::UserNormal,
            (Origin::Author, false) => Self::AuthorNormal,
            (Origin::Inline, false) => Self::InlineNormal,
            (Origin::Author, true) => Self::AuthorImportant,
            (Origin::Inline, true) => Self::InlineImportant,
            (Origin::User, true) => Self::UserImportant,
        }
    }
}

/// [§ 5.4.4 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-a-declaration)
///
/// A single longhand declaration, e.g. `margin-left: 5px !important`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The longhand property.
    pub property: Property,
    /// The raw value text, trimmed, without `!important`.
    pub value: String,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

impl Declaration {
    /// Build a declaration.
    #[must_use]
    pub fn new(property: Property, value: impl Into<String>, important: bool) -> Self {
        Self {
            property,
            value: value.into(),
            important,
        }
    }
}

/// One selector paired with one declaration.
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// Parsed selector. Only valid selectors reach a stylesheet.
    pub selector: Selector,
    /// The declaration applied when the selector matches.
    pub declaration: Declaration,
    /// Where the rule came from.
    pub origin: Origin,
}

impl StyleRule {
    /// The cascade bucket of this rule.
    #[must_use]
    pub const fn level(&self) -> CascadeLevel {
        CascadeLevel::of(self.origin, self.declaration.important)
    }
}

/// An ordered sequence of rules from one source.
///
/// Rule order is significant: it is the final cascade tie-break.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    /// Origin shared by every rule in the sheet.
    pub origin: Origin,
    /// Rules in source order.
    pub rules: Vec<StyleRule>,
}

impl Stylesheet {
    /// An empty sheet.
    #[must_use]
    pub const fn empty(origin: Origin) -> Self {
        Self {
            origin,
            rules: Vec::new(),
        }
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the sheet has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_level_order() {
        let ua = CascadeLevel::of(Origin::UserAgent, false);
        let user = CascadeLevel::of(Origin::User, false);
        let author = CascadeLevel::of(Origin::Author, false);
        let inline = CascadeLevel::of(Origin::Inline, false);
        let author_imp = CascadeLevel::of(Origin::Author, true);
        let inline_imp = CascadeLevel::of(Origin::Inline, true);
        let user_imp = CascadeLevel::of(Origin::User, true);

        assert!(ua < user);
        assert!(user < author);
        assert!(author < inline);
        assert!(inline < author_imp);
        assert!(author_imp < inline_imp);
        assert!(inline_imp < user_imp);
    }
}
