//! Selector evaluation: one scoped CSS query plus attribute extraction.
//!
//! Attribute policies are parser-independent by construction. `textContent`
//! concatenates descendant text nodes verbatim. `href` reads the *raw*
//! attribute and resolves it against an explicit base URL; DOM parsers may
//! otherwise resolve links against an unpredictable base or double-encode
//! reserved characters, and the raw-attribute path sidesteps both.

use crate::error::{Error, Result};
use scraper::{ElementRef, Selector};
use url::Url;

/// Parse a CSS selector carried by a pattern. Unparsable selectors are
/// malformed patterns, so the error is permanent.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|err| Error::Pattern(format!("invalid selector {selector:?}: {err:?}")))
}

/// Evaluate one selector rule against `root`.
///
/// When `selector` is present the target is the first descendant match;
/// otherwise `root` itself. Returns null when nothing matches or the
/// requested attribute is absent.
pub fn run_selector(
    root: ElementRef<'_>,
    selector: Option<&str>,
    attr: &str,
    base: &Url,
) -> Result<Option<String>> {
    let element = match selector {
        Some(selector) => {
            let parsed = parse_selector(selector)?;
            match root.select(&parsed).next() {
                Some(element) => element,
                None => return Ok(None),
            }
        }
        None => root,
    };

    Ok(match attr {
        "textContent" => Some(text_content(element)),
        "href" => match element.value().attr("href") {
            None | Some("") => None,
            Some(raw) => base.join(raw).ok().map(|resolved| resolved.to_string()),
        },
        other => element.value().attr(other).map(str::to_string),
    })
}

/// Concatenated descendant text, with no injected separators.
pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}
