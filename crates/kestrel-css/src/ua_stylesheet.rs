//! User-agent stylesheet.
//!
//! [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html)
//!
//! "User agents are expected to have a default style sheet that presents
//! elements of HTML documents in ways consistent with general user
//! expectations."
//!
//! UA rules sit at the bottom of the cascade: any user, author or inline
//! declaration overrides them regardless of specificity.

use std::sync::OnceLock;

use crate::parser::parse_stylesheet;
use crate::value::{Origin, Stylesheet};

/// The subset of the suggested default sheet covering what the engine lays
/// out.
const UA_CSS: &str = r"
/* [§ 15.3.1 Hidden elements] */
area, base, head, link, meta, script, style, template, title {
    display: none;
}

/* [§ 15.3.3 Flow content] */
address, article, aside, blockquote, body, center, dd, div, dl, dt,
figure, footer, form, h1, h2, h3, h4, h5, h6, header, hr, html, main,
nav, ol, p, pre, section, ul {
    display: block;
}

li {
    display: list-item;
}

/* [§ 15.3.2 The page] */
body {
    margin: 8px;
}

/* [§ 15.3.6 Sections and headings] */
h1 { font-size: 2em; font-weight: bold; margin-top: 0.67em; margin-bottom: 0.67em; }
h2 { font-size: 1.5em; font-weight: bold; margin-top: 0.83em; margin-bottom: 0.83em; }
h3 { font-size: 1.17em; font-weight: bold; margin-top: 1em; margin-bottom: 1em; }
h4 { font-weight: bold; margin-top: 1.33em; margin-bottom: 1.33em; }
h5 { font-size: 0.83em; font-weight: bold; margin-top: 1.67em; margin-bottom: 1.67em; }
h6 { font-size: 0.67em; font-weight: bold; margin-top: 2.33em; margin-bottom: 2.33em; }

/* [§ 15.3.3 Flow content] */
p, blockquote, dl, figure, ul, ol, pre {
    margin-top: 1em;
    margin-bottom: 1em;
}

blockquote, figure {
    margin-left: 40px;
    margin-right: 40px;
}

ul, ol {
    padding-left: 40px;
}

dd {
    margin-left: 40px;
}

hr {
    border: 1px inset gray;
    margin-top: 0.5em;
    margin-bottom: 0.5em;
}

/* [§ 15.3.4 Phrasing content] */
b, strong, th {
    font-weight: bold;
}

i, em, cite, var, dfn {
    font-style: italic;
}

u, ins {
    text-decoration: underline;
}

pre, code, kbd, samp, tt {
    font-family: monospace;
}

pre {
    white-space: pre;
}

center {
    text-align: center;
}

/* [§ 15.3.4 Phrasing content] links */
a:link {
    color: #0000ee;
    text-decoration: underline;
}

a:visited {
    color: #551a8b;
    text-decoration: underline;
}
";

/// The parsed UA stylesheet, parsed on first use.
#[must_use]
pub fn ua_stylesheet() -> &'static Stylesheet {
    static STYLESHEET: OnceLock<Stylesheet> = OnceLock::new();
    STYLESHEET.get_or_init(|| parse_stylesheet(UA_CSS, Origin::UserAgent))
}
