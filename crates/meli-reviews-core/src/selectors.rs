//! CSS selectors for the Mercado Libre review widget.

use lazy_static::lazy_static;
use scraper::Selector;

pub const REVIEW: &str = r#"article[data-testid="comment-component"]"#;
pub const SHOW_MORE_BUTTON: &str = r#"button[data-testid="see-more"]"#;
pub const EXPANDED_CONTAINER: &str = "div.ui-review-capability__mobile__comments";

pub const DATE: &str = "span.ui-review-capability-comments__comment__date";
pub const CONTENT: &str = r#"p[data-testid="comment-content-component"]"#;
pub const FULL_STAR: &str = "svg.ui-review-capability-comments__comment__rating__star\
     :not(.ui-review-capability-comments__comment__rating__star-empty)";
pub const USEFUL_LABEL: &str = r#"button[data-testid="like-button"] .ui-review-capability-valorizations__button-like__text"#;

lazy_static! {
    pub static ref REVIEW_SELECTOR: Selector = compile(REVIEW);
    pub static ref DATE_SELECTOR: Selector = compile(DATE);
    pub static ref CONTENT_SELECTOR: Selector = compile(CONTENT);
    pub static ref FULL_STAR_SELECTOR: Selector = compile(FULL_STAR);
    pub static ref USEFUL_LABEL_SELECTOR: Selector = compile(USEFUL_LABEL);
}

fn compile(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_selectors_compile() {
        for css in [REVIEW, SHOW_MORE_BUTTON, EXPANDED_CONTAINER, DATE, CONTENT, FULL_STAR, USEFUL_LABEL] {
            assert!(Selector::parse(css).is_ok(), "{css}");
        }
    }
}
