//! CSS cascading and style resolution.
//!
//! [CSS Cascading and Inheritance Level 4](https://www.w3.org/TR/css-cascade-4/)
//!
//! The cascade runs once over the whole tree, depth first, producing one
//! [`StyleSet`] per node. Parents are resolved before children because a
//! child's inherited values and its relative font size both read the
//! parent's finished record.

use kestrel_dom::{DomTree, NodeId, NodeType};

use crate::parser::parse_inline_style;
use crate::selector::{MatchContext, PseudoElement, Specificity};
use crate::style::{Property, ResolvedStyle, StyleSet};
use crate::units;
use crate::value::{CascadeLevel, Declaration, StyleRule, Stylesheet};

/// [§ 6.4 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
///
/// A matched declaration with everything needed to order it.
struct MatchedDeclaration<'a> {
    level: CascadeLevel,
    specificity: Specificity,
    /// (sheet index, rule index): the "order of appearance" tie-break.
    order: (usize, usize),
    pseudo_element: Option<PseudoElement>,
    declaration: &'a Declaration,
}

impl MatchedDeclaration<'_> {
    fn sort_key(&self) -> (CascadeLevel, Specificity, (usize, usize)) {
        (self.level, self.specificity, self.order)
    }
}

/// The style resolver: an ordered list of stylesheets plus the root font
/// size.
///
/// Sheets are given in source order. Their origin decides precedence, their
/// position only breaks ties between rules of equal level and specificity.
pub struct Cascade<'a> {
    sheets: Vec<&'a Stylesheet>,
    root_font_size: i32,
}

impl<'a> Cascade<'a> {
    /// A resolver over `sheets`, in source order.
    #[must_use]
    pub fn new(sheets: impl IntoIterator<Item = &'a Stylesheet>) -> Self {
        Self {
            sheets: sheets.into_iter().collect(),
            root_font_size: units::DEFAULT_FONT_SIZE,
        }
    }

    /// Override the root element's inherited font size.
    #[must_use]
    pub fn with_root_font_size(mut self, px: i32) -> Self {
        self.root_font_size = px.max(1);
        self
    }

    /// [§ 6 Cascading](https://www.w3.org/TR/css-cascade-4/#cascading)
    ///
    /// Resolve every node of `tree`. The result is indexed by `NodeId`.
    #[must_use]
    pub fn resolve(&self, tree: &DomTree, ctx: &MatchContext<'_>) -> Vec<StyleSet> {
        let mut styles = vec![StyleSet::default(); tree.len()];

        // The document node acts as the initial containing block: a block
        // box at the root font size that every top-level node inherits from.
        let mut root = ResolvedStyle::default();
        root.set(Property::Display, "block");
        root.set_font_size(self.root_font_size);
        root.set(Property::FontSize, format!("{}px", self.root_font_size));
        let root = StyleSet {
            unconditional: root.clone(),
            first_line: root.clone(),
            first_letter: root,
        };

        for child in tree.children(tree.root()) {
            self.resolve_subtree(tree, *child, &root, ctx, &mut styles);
        }
        styles[tree.root().0] = root;

        tracing::debug!(nodes = tree.len(), sheets = self.sheets.len(), "cascade resolved");
        styles
    }

    fn resolve_subtree(
        &self,
        tree: &DomTree,
        id: NodeId,
        parent: &StyleSet,
        ctx: &MatchContext<'_>,
        styles: &mut [StyleSet],
    ) {
        let Some(node) = tree.get(id) else { return };
        let resolved = match &node.node_type {
            NodeType::Element(_) => self.resolve_element(tree, id, parent, ctx),
            // Text has no rules of its own: it carries what it inherits.
            NodeType::Text(_) => StyleSet {
                unconditional: inherit_only(&parent.unconditional),
                first_line: inherit_only(&parent.first_line),
                first_letter: inherit_only(&parent.first_letter),
            },
            NodeType::Document | NodeType::Comment(_) => parent.clone(),
        };

        for child in tree.children(id) {
            self.resolve_subtree(tree, *child, &resolved, ctx, styles);
        }
        if let Some(slot) = styles.get_mut(id.0) {
            *slot = resolved;
        }
    }

    /// Produce the three records of one element.
    ///
    /// STEP 1: collect matching declarations.
    /// STEP 2: sort ascending by (level, specificity, order).
    /// STEP 3: partition by pseudo-element and populate.
    #[must_use]
    pub fn resolve_element(
        &self,
        tree: &DomTree,
        id: NodeId,
        parent: &StyleSet,
        ctx: &MatchContext<'_>,
    ) -> StyleSet {
        // STEP 1: Collect.
        let inline = tree
            .as_element(id)
            .and_then(|element| element.attr("style"))
            .map(parse_inline_style);

        let mut matched: Vec<MatchedDeclaration<'_>> = Vec::new();
        for (sheet_index, sheet) in self.sheets.iter().enumerate() {
            collect(&mut matched, &sheet.rules, sheet_index, |rule| {
                rule.selector.matches(tree, id, ctx)
            });
        }
        // Inline declarations come after every sheet in source order.
        if let Some(inline) = &inline {
            collect(&mut matched, &inline.rules, usize::MAX, |_| true);
        }

        // STEP 2: Sort.
        // "The last declaration in document order wins": iterating the
        // sorted list and letting later writes replace earlier ones gives the
        // winning value in each slot.
        matched.sort_by_key(|m| m.sort_key());

        // STEP 3: Populate.
        let unconditional: Vec<_> = matched
            .iter()
            .filter(|m| m.pseudo_element.is_none())
            .map(|m| m.declaration)
            .collect();
        let first_line: Vec<_> = matched
            .iter()
            .filter(|m| m.pseudo_element == Some(PseudoElement::FirstLine))
            .map(|m| m.declaration)
            .collect();
        let first_letter: Vec<_> = matched
            .iter()
            .filter(|m| m.pseudo_element == Some(PseudoElement::FirstLetter))
            .map(|m| m.declaration)
            .collect();

        // [§ 7.1 ::first-line](https://www.w3.org/TR/css-pseudo-4/#first-line-inheritance)
        //
        // "During CSS inheritance, the portion of a child element that
        // occurs on the first line only inherits properties applicable to
        // the ::first-line pseudo-element from the ::first-line
        // pseudo-element."
        StyleSet {
            unconditional: populate(&parent.unconditional, &[unconditional.as_slice()]),
            first_line: populate(
                &parent.first_line,
                &[unconditional.as_slice(), first_line.as_slice()],
            ),
            first_letter: populate(
                &parent.first_letter,
                &[
                    unconditional.as_slice(),
                    first_line.as_slice(),
                    first_letter.as_slice(),
                ],
            ),
        }
    }
}

fn collect<'a>(
    out: &mut Vec<MatchedDeclaration<'a>>,
    rules: &'a [StyleRule],
    sheet_index: usize,
    matches: impl Fn(&StyleRule) -> bool,
) {
    for (rule_index, rule) in rules.iter().enumerate() {
        if matches(rule) {
            out.push(MatchedDeclaration {
                level: rule.level(),
                specificity: rule.selector.specificity(),
                order: (sheet_index, rule_index),
                pseudo_element: rule.selector.pseudo_element(),
                declaration: &rule.declaration,
            });
        }
    }
}

/// [§ 7 Inheritance](https://www.w3.org/TR/css-cascade-4/#inheriting)
///
/// A record holding only the inherited properties of `parent`.
fn inherit_only(parent: &ResolvedStyle) -> ResolvedStyle {
    let mut style = ResolvedStyle::default();
    for property in <Property as strum::IntoEnumIterator>::iter() {
        if property.inherited() {
            if let Some(value) = parent.get(property) {
                style.set(property, value);
            }
        }
    }
    style.set_font_size(parent.font_size());
    style
}

/// Start from what `parent` passes down, then apply each layer of
/// declarations in ascending precedence.
fn populate(parent: &ResolvedStyle, layers: &[&[&Declaration]]) -> ResolvedStyle {
    let mut style = inherit_only(parent);
    // Font size is re-derived below from this element's own declaration.
    style.unset(Property::FontSize);

    for declaration in layers.iter().flat_map(|layer| layer.iter()) {
        let value = declaration.value.trim();
        // [§ 7.3 Explicit Defaulting](https://www.w3.org/TR/css-cascade-4/#defaulting-keywords)
        if value.eq_ignore_ascii_case("inherit") {
            match parent.get(declaration.property) {
                Some(inherited) => style.set(declaration.property, inherited),
                None => style.unset(declaration.property),
            }
        } else if value.eq_ignore_ascii_case("initial") {
            style.unset(declaration.property);
        } else {
            style.set(declaration.property, value);
        }
    }

    // [§ 3.5 font-size](https://www.w3.org/TR/css-fonts-4/#font-size-prop)
    //
    // "Computed value: an absolute length". Relative sizes resolve against
    // the parent's computed size; an unparseable value keeps it.
    let parent_size = parent.font_size();
    let size = style
        .get(Property::FontSize)
        .and_then(|value| units::parse_font_size(value, parent_size))
        .unwrap_or(parent_size);
    style.set_font_size(size);
    style.set(Property::FontSize, format!("{size}px"));

    // Inherited lengths are computed here so descendants see absolute
    // values. A bare number line-height inherits as a number.
    absolutize(&mut style, Property::LineHeight, size);
    absolutize(&mut style, Property::TextIndent, size);
    style
}

/// Replace a font-relative length with pixels.
fn absolutize(style: &mut ResolvedStyle, property: Property, font_size: i32) {
    let Some(value) = style.get(property) else { return };
    let lower = value.to_ascii_lowercase();
    let font_relative = lower.ends_with("em") || lower.ends_with("ex");
    let percent_line_height = property == Property::LineHeight && lower.ends_with('%');
    if font_relative || percent_line_height {
        if let Some(px) = units::parse_length(&lower, font_size, font_size) {
            style.set(property, format!("{px}px"));
        }
    }
}
