//! CSS selector parsing and matching.
//!
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/)
//!
//! Supported grammar: compound selectors joined by the descendant
//! combinator only. A compound is an optional type selector (or `*`)
//! followed by any number of `.class`, `#id`, `[attr]`, `[attr=value]`,
//! `:link`, `:visited` and `:first-child` fragments. The subject compound
//! may end in `::first-line` or `::first-letter`.
//!
//! Parsing never fails. A selector that cannot be read comes back as an
//! invalid [`Selector`] that matches nothing; the stylesheet parser drops
//! those with a warning.

use kestrel_common::{History, Url, resolve_url};
use kestrel_dom::{DomTree, ElementData, NodeId};

/// [§ 5 Elemental selectors](https://www.w3.org/TR/selectors-4/#elemental-selectors)
/// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
///
/// A single condition on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
    ///
    /// Examples: `div`, `p`, `span`
    Type(String),

    /// [§ 5.2 Universal selector](https://www.w3.org/TR/selectors-4/#universal-selector)
    ///
    /// Example: `*`
    Universal,

    /// [§ 6.6 Class selector](https://www.w3.org/TR/selectors-4/#class-html)
    ///
    /// Examples: `.highlight`, `.nav-item`
    Class(String),

    /// [§ 6.7 ID selector](https://www.w3.org/TR/selectors-4/#id-selectors)
    ///
    /// Examples: `#main`, `#header`
    Id(String),

    /// [§ 6.4 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
    ///
    /// Examples: `[href]`, `[type=text]`
    Attribute(AttributeSelector),

    /// Link-state and structural pseudo-classes.
    PseudoClass(PseudoClass),

    /// A pseudo-class with no meaning in a static layout (`:hover`,
    /// `:focus`, `:active`, ...). The compound parses but never matches.
    NeverMatch,
}

/// [§ 6.4](https://www.w3.org/TR/selectors-4/#attribute-selectors)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSelector {
    /// `[attr]`: "Represents an element with the att attribute"
    Exists(String),
    /// `[attr=value]`: "Represents an element with the att attribute whose
    /// value is exactly 'val'."
    Equals(String, String),
    /// `[attr~=value]`: "whose value is a whitespace-separated list of
    /// words, one of which is exactly 'val'."
    Includes(String, String),
}

/// Pseudo-classes that depend on tree position or link history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    /// [§ 8.2 :link](https://www.w3.org/TR/selectors-4/#link)
    /// "The :link pseudo-class applies to links that have not yet been visited."
    Link,
    /// [§ 8.2 :visited](https://www.w3.org/TR/selectors-4/#link)
    /// "The :visited pseudo-class applies once the link has been visited by
    /// the user."
    Visited,
    /// [§ 14.3.1 :first-child](https://www.w3.org/TR/selectors-4/#the-first-child-pseudo)
    /// "The :first-child pseudo-class represents an element that is first
    /// among its inclusive siblings."
    FirstChild,
}

/// [CSS Pseudo-Elements § 2](https://www.w3.org/TR/css-pseudo-4/#typographic-pseudos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    /// `::first-line`
    FirstLine,
    /// `::first-letter`
    FirstLetter,
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// "A compound selector is a sequence of simple selectors that are not
/// separated by a combinator."
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    /// All of these must hold for the compound to match.
    pub simple_selectors: Vec<SimpleSelector>,
}

/// [§ 17 Calculating Specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
///
/// "count the number of ID selectors in the selector (= A); count the
/// number of class selectors, attributes selectors, and pseudo-classes in
/// the selector (= B); count the number of type selectors and
/// pseudo-elements in the selector (= C)"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

/// Dynamic state consulted while matching.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    /// Visited-link oracle.
    pub history: &'a dyn History,
    /// Document URL that `href` values are resolved against.
    pub base_url: Option<&'a Url>,
}

/// A parsed selector ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    text: String,
    /// Compounds from right to left: `compounds[0]` is the subject and each
    /// later entry must match some ancestor of the previous match.
    compounds: Vec<CompoundSelector>,
    pseudo_element: Option<PseudoElement>,
    specificity: Specificity,
    valid: bool,
}

impl Selector {
    /// Parse selector text. See the module docs for the grammar.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match parse_compounds(text) {
            Some((compounds, pseudo_element)) => {
                let specificity = calculate_specificity(&compounds, pseudo_element);
                Self {
                    text: text.to_string(),
                    compounds,
                    pseudo_element,
                    specificity,
                    valid: true,
                }
            }
            None => Self {
                text: text.to_string(),
                compounds: Vec::new(),
                pseudo_element: None,
                specificity: Specificity::default(),
                valid: false,
            },
        }
    }

    /// The selector used for `style` attribute declarations: matches the
    /// element it is attached to.
    #[must_use]
    pub fn universal() -> Self {
        Self {
            text: "*".to_string(),
            compounds: vec![CompoundSelector {
                simple_selectors: vec![SimpleSelector::Universal],
            }],
            pseudo_element: None,
            specificity: Specificity::default(),
            valid: true,
        }
    }

    /// Source text as written.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the selector parsed. Invalid selectors never match.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// The trailing pseudo-element, if any.
    #[must_use]
    pub const fn pseudo_element(&self) -> Option<PseudoElement> {
        self.pseudo_element
    }

    /// Specificity used as the cascade tie-break.
    #[must_use]
    pub const fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// [§ 4.1 Selector Matching](https://www.w3.org/TR/selectors-4/#match-a-selector-against-an-element)
    ///
    /// The subject compound must match `node`; each further compound must
    /// match a strict ancestor of the previous match.
    #[must_use]
    pub fn matches(&self, tree: &DomTree, node: NodeId, ctx: &MatchContext<'_>) -> bool {
        let Some((subject, rest)) = self.compounds.split_first() else {
            return false;
        };
        if !compound_matches(subject, tree, node, ctx) {
            return false;
        }

        // [§ 16.1 Descendant combinator](https://www.w3.org/TR/selectors-4/#descendant-combinators)
        // "A selector of the form 'A B' represents an element B that is an
        // arbitrary descendant of some ancestor element A."
        //
        // Taking the nearest matching ancestor each time is enough: a nearer
        // match leaves strictly more ancestors for the remaining compounds.
        let mut current = node;
        for compound in rest {
            let found = tree
                .ancestors(current)
                .find(|&ancestor| compound_matches(compound, tree, ancestor, ctx));
            match found {
                Some(ancestor) => current = ancestor,
                None => return false,
            }
        }
        true
    }
}

fn compound_matches(
    compound: &CompoundSelector,
    tree: &DomTree,
    node: NodeId,
    ctx: &MatchContext<'_>,
) -> bool {
    let Some(element) = tree.as_element(node) else {
        return false;
    };
    compound
        .simple_selectors
        .iter()
        .all(|simple| simple_matches(simple, tree, node, element, ctx))
}

fn simple_matches(
    simple: &SimpleSelector,
    tree: &DomTree,
    node: NodeId,
    element: &ElementData,
    ctx: &MatchContext<'_>,
) -> bool {
    match simple {
        SimpleSelector::Type(name) => element.tag_name.eq_ignore_ascii_case(name),
        SimpleSelector::Universal => true,
        SimpleSelector::Class(name) => element.has_class(name),
        SimpleSelector::Id(id) => element.id().is_some_and(|v| v.eq_ignore_ascii_case(id)),
        SimpleSelector::Attribute(attr) => match attr {
            AttributeSelector::Exists(name) => element.attr(name).is_some(),
            AttributeSelector::Equals(name, value) => element.attr(name) == Some(value.as_str()),
            AttributeSelector::Includes(name, value) => element
                .attr(name)
                .is_some_and(|v| v.split_ascii_whitespace().any(|w| w == value)),
        },
        SimpleSelector::PseudoClass(PseudoClass::Link) => link_state(element, ctx) == Some(false),
        SimpleSelector::PseudoClass(PseudoClass::Visited) => {
            link_state(element, ctx) == Some(true)
        }
        SimpleSelector::PseudoClass(PseudoClass::FirstChild) => {
            tree.parent(node).is_some_and(|parent| {
                tree.children(parent)
                    .iter()
                    .find(|&&c| tree.as_element(c).is_some())
                    == Some(&node)
            })
        }
        SimpleSelector::NeverMatch => false,
    }
}

/// `None` if the element is not a link, otherwise whether it was visited.
fn link_state(element: &ElementData, ctx: &MatchContext<'_>) -> Option<bool> {
    if !matches!(element.tag_name.as_str(), "a" | "area" | "link") {
        return None;
    }
    let href = element.attr("href")?;
    Some(resolve_url(href, ctx.base_url).is_some_and(|url| ctx.history.has_visited(&url)))
}

fn calculate_specificity(
    compounds: &[CompoundSelector],
    pseudo_element: Option<PseudoElement>,
) -> Specificity {
    let mut spec = Specificity::default();
    for simple in compounds.iter().flat_map(|c| &c.simple_selectors) {
        match simple {
            SimpleSelector::Id(_) => spec.0 += 1,
            SimpleSelector::Class(_)
            | SimpleSelector::Attribute(_)
            | SimpleSelector::PseudoClass(_)
            | SimpleSelector::NeverMatch => spec.1 += 1,
            SimpleSelector::Type(_) => spec.2 += 1,
            // "ignore the universal selector"
            SimpleSelector::Universal => {}
        }
    }
    if pseudo_element.is_some() {
        spec.2 += 1;
    }
    spec
}

/// Split on whitespace outside `[...]` and quotes.
fn split_compounds(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = None;
    let mut in_brackets = false;
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if in_brackets => quote = Some(c),
            (None, '[') => in_brackets = true,
            (None, ']') => in_brackets = false,
            (None, c) if c.is_whitespace() && !in_brackets => {
                if let Some(s) = start.take() {
                    parts.push(&text[s..i]);
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
        parts.push(&text[s..]);
    }
    parts
}

/// Split into compounds and parse each, right to left.
fn parse_compounds(text: &str) -> Option<(Vec<CompoundSelector>, Option<PseudoElement>)> {
    let parts = split_compounds(text);
    if parts.is_empty() {
        return None;
    }
    let last = parts.len() - 1;
    let mut compounds = Vec::with_capacity(parts.len());
    let mut pseudo_element = None;
    for (i, part) in parts.iter().enumerate().rev() {
        let (compound, pseudo) = parse_compound(part)?;
        if pseudo.is_some() {
            // Pseudo-elements may only appear on the subject.
            if i != last {
                return None;
            }
            pseudo_element = pseudo;
        }
        compounds.push(compound);
    }
    Some((compounds, pseudo_element))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Consume an identifier at the start of `input`.
fn take_ident(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(input.len(), |(i, _)| i);
    input.split_at(end)
}

/// Parse one compound such as `a.nav#home:link::first-line`.
///
/// Every pass of the loop must consume at least one fragment; input that
/// fails to shrink makes the whole selector invalid.
fn parse_compound(mut input: &str) -> Option<(CompoundSelector, Option<PseudoElement>)> {
    let mut simple_selectors = Vec::new();
    let mut pseudo_element = None;

    if let Some(rest) = input.strip_prefix('*') {
        simple_selectors.push(SimpleSelector::Universal);
        input = rest;
    } else {
        let (name, rest) = take_ident(input);
        if !name.is_empty() {
            simple_selectors.push(SimpleSelector::Type(name.to_ascii_lowercase()));
            input = rest;
        }
    }

    while !input.is_empty() {
        // Nothing may follow a pseudo-element.
        if pseudo_element.is_some() {
            return None;
        }
        let before = input.len();
        if let Some(rest) = input.strip_prefix('.') {
            let (name, rest) = take_ident(rest);
            if name.is_empty() {
                return None;
            }
            simple_selectors.push(SimpleSelector::Class(name.to_string()));
            input = rest;
        } else if let Some(rest) = input.strip_prefix('#') {
            let (name, rest) = take_ident(rest);
            if name.is_empty() {
                return None;
            }
            simple_selectors.push(SimpleSelector::Id(name.to_string()));
            input = rest;
        } else if let Some(rest) = input.strip_prefix('[') {
            let (inner, rest) = rest.split_once(']')?;
            simple_selectors.push(SimpleSelector::Attribute(parse_attribute(inner)?));
            input = rest;
        } else if let Some(rest) = input.strip_prefix(':') {
            let double = rest.starts_with(':');
            let (name, rest) = take_ident(rest.trim_start_matches(':'));
            match (name.to_ascii_lowercase().as_str(), double) {
                // CSS 2 allows the single-colon spelling for these two.
                ("first-line", _) => pseudo_element = Some(PseudoElement::FirstLine),
                ("first-letter", _) => pseudo_element = Some(PseudoElement::FirstLetter),
                ("link", false) => {
                    simple_selectors.push(SimpleSelector::PseudoClass(PseudoClass::Link));
                }
                ("visited", false) => {
                    simple_selectors.push(SimpleSelector::PseudoClass(PseudoClass::Visited));
                }
                ("first-child", false) => {
                    simple_selectors.push(SimpleSelector::PseudoClass(PseudoClass::FirstChild));
                }
                ("hover" | "active" | "focus" | "focus-within" | "target", false) => {
                    simple_selectors.push(SimpleSelector::NeverMatch);
                }
                _ => return None,
            }
            input = rest;
        } else {
            // Child and sibling combinators, functional notation, stray
            // punctuation.
            return None;
        }
        if input.len() >= before {
            return None;
        }
    }

    if simple_selectors.is_empty() {
        // A bare `::first-line` applies to every element.
        simple_selectors.push(SimpleSelector::Universal);
    }
    Some((CompoundSelector { simple_selectors }, pseudo_element))
}

fn parse_attribute(inner: &str) -> Option<AttributeSelector> {
    let unquote = |v: &str| {
        let v = v.trim();
        v.strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(v)
            .to_string()
    };
    if let Some((name, value)) = inner.split_once("~=") {
        return Some(AttributeSelector::Includes(
            name.trim().to_ascii_lowercase(),
            unquote(value),
        ));
    }
    if let Some((name, value)) = inner.split_once('=') {
        let name = name.trim();
        // `|=`, `^=`, `$=`, `*=` are not supported.
        if name.ends_with(|c: char| !is_ident_char(c)) {
            return None;
        }
        return Some(AttributeSelector::Equals(name.to_ascii_lowercase(), unquote(value)));
    }
    let name = inner.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some(AttributeSelector::Exists(name.to_ascii_lowercase()))
}
