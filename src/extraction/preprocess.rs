//! Document preprocessing: prune directives.
//!
//! Prune runs before any input evaluation so selectors never see the
//! removed subtrees. `first` detaches at most one element per directive,
//! `all` detaches every match.

use crate::error::Result;
use crate::extraction::selector::parse_selector;
use crate::patterns::schema::PruneDirective;
use scraper::Html;

/// Apply the rule's prune directives to the parsed document, in order.
pub fn apply_prune(doc: &mut Html, directives: &[PruneDirective]) -> Result<()> {
    for directive in directives {
        let (selector, only_first) = match directive {
            PruneDirective::First(selector) => (selector, true),
            PruneDirective::All(selector) => (selector, false),
        };
        let parsed = parse_selector(selector)?;

        let mut ids: Vec<_> = doc.select(&parsed).map(|element| element.id()).collect();
        if only_first {
            ids.truncate(1);
        }
        for id in ids {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::selector::text_content;

    fn outer_div_text(doc: &Html) -> String {
        let sel = parse_selector("html > body > div").unwrap();
        text_content(doc.select(&sel).next().unwrap())
    }

    #[test]
    fn test_prune_first_removes_one_match() {
        let mut doc = Html::parse_document("<div><p>X</p>1<p>Y</p></div>");
        apply_prune(&mut doc, &[PruneDirective::First("div > p".into())]).unwrap();
        assert_eq!(outer_div_text(&doc), "1Y");
    }

    #[test]
    fn test_prune_all_removes_every_match() {
        let mut doc = Html::parse_document("<div>1<span>X</span>2<span>X</span>3</div>");
        apply_prune(&mut doc, &[PruneDirective::All("div > span".into())]).unwrap();
        assert_eq!(outer_div_text(&doc), "123");
    }

    #[test]
    fn test_prune_mixed_directives() {
        let html = concat!(
            r#"<div>1<p id="remove-me">X</p>2<p id="but-keep-me">3</p>4"#,
            "<div>X</div><div>X</div>5<div>X</div>6</div>"
        );
        let mut doc = Html::parse_document(html);
        apply_prune(
            &mut doc,
            &[
                PruneDirective::First("div > p".into()),
                PruneDirective::All("div > div".into()),
            ],
        )
        .unwrap();
        assert_eq!(outer_div_text(&doc), "123456");
    }

    #[test]
    fn test_prune_no_match_is_noop() {
        let mut doc = Html::parse_document("<div>keep</div>");
        apply_prune(&mut doc, &[PruneDirective::All("#nothing".into())]).unwrap();
        assert_eq!(outer_div_text(&doc), "keep");
    }
}
