//! CSS cascade, box model, layout, hit testing and painting for the Kestrel
//! renderer.
//!
//! # Scope
//!
//! This crate implements:
//! - **Stylesheets** ([CSS Syntax Level 3](https://www.w3.org/TR/css-syntax-3/))
//!   - A tolerant text parser producing origin-tagged rules
//!   - Shorthand expansion (margin, padding, border, background, font)
//!   - The compiled-in user-agent sheet
//!
//! - **Selectors** ([Selectors Level 4](https://www.w3.org/TR/selectors-4/))
//!   - Type, class, ID, universal and attribute selectors
//!   - Descendant combinators, `:first-child`, `:link` / `:visited`
//!   - `::first-line` and `::first-letter`
//!
//! - **Cascade** ([CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/))
//!   - Ordering by origin, importance, specificity and source order
//!   - Inheritance and `inherit`
//!   - Font sizes resolved to pixels down the tree
//!
//! - **Layout** ([CSS 2.1 Visual Formatting Model](https://www.w3.org/TR/CSS2/visuren.html))
//!   - Block flow with vertical margin collapsing
//!   - Inline flow with line breaking, baseline alignment and `text-align`
//!   - Left and right floats, `clear`
//!   - Inline-blocks and replaced images
//!
//! - **Output**
//!   - An image map for point queries
//!   - A draw pass onto an RGBA surface
//!
//! # Not Implemented
//!
//! - Positioned layout, tables, flex and grid
//! - Transforms
//! - Complex text shaping and bidi

/// Box dimensions and painted frames per [CSS Box Model Level 3](https://www.w3.org/TR/css-box-3/).
pub mod box_model;
/// The cascade per [CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/).
pub mod cascade;
/// Point queries against laid-out content.
pub mod image_map;
/// The layout engine per [CSS 2.1 § 9-10](https://www.w3.org/TR/CSS2/visuren.html).
pub mod layout;
/// The draw pass per [CSS 2.1 Appendix E](https://www.w3.org/TR/CSS2/zindex.html).
pub mod paint;
/// Stylesheet text parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
pub mod parser;
/// Selector parsing and matching per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
pub mod selector;
/// Shorthand expansion per [CSS Cascading Level 4 § 1.2](https://www.w3.org/TR/css-cascade-4/#shorthand).
pub mod shorthand;
/// Resolved style records.
pub mod style;
/// User-agent stylesheet per [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html).
pub mod ua_stylesheet;
/// Length, colour and URL values per [CSS Values Level 4](https://www.w3.org/TR/css-values-4/).
pub mod units;
/// Declarations, rules and stylesheets.
pub mod value;

// Re-exports for convenience
pub use box_model::{Edges, OuterBox, Rect, UsedBox};
pub use cascade::Cascade;
pub use image_map::{ImageMap, MapEntry};
pub use layout::{
    CancelToken, FontMetrics, FontSpec, ImageProvider, LayoutContext, LayoutError, LayoutNode,
    LayoutTree, LineBox, LineContent, MonospaceShaper, NoImages, TextShaper,
};
pub use paint::{DrawError, blend, draw, render};
pub use parser::{parse_declarations, parse_inline_style, parse_stylesheet};
pub use selector::{MatchContext, PseudoElement, Selector, Specificity};
pub use style::{Property, ResolvedStyle, StyleContext, StyleSet};
pub use ua_stylesheet::ua_stylesheet;
pub use value::{CascadeLevel, Declaration, Origin, StyleRule, Stylesheet};
