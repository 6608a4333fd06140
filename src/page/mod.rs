//! Site integration for twitter.com / x.com.
//!
//! Everything that knows the site's markup lives here: the `data-testid`
//! selectors, how to find the post whose menu is open, how to read
//! framework-internal props, and how to add items to the site's menus.

pub mod media;
pub mod menu;
pub mod props;
pub mod selectors;

use crate::dom::{Document, NodeId};

pub use media::{best_variant, media_filename, VideoVariant};
pub use menu::{InjectionPoint, MenuItem};
pub use props::{find_property, FrameworkPropsReader, PropsQuery, ReactPropsReader};

/// The post whose "more" caret is currently expanded.
pub fn active_menu_post(doc: &Document) -> Option<NodeId> {
    doc.query_selector_all(doc.root(), &selectors::POST)
        .into_iter()
        .find(|&post| doc.query_selector(post, &selectors::EXPANDED_CARET).is_some())
}

/// Id of the post whose menu is open.
pub fn active_menu_post_id(doc: &Document) -> Option<String> {
    active_menu_post(doc).and_then(|post| post_id(doc, post))
}

/// Id of a post, read from its first status permalink.
pub fn post_id(doc: &Document, post: NodeId) -> Option<String> {
    doc.query_selector_all(post, &selectors::STATUS_LINK)
        .into_iter()
        .filter_map(|link| doc.attribute(link, "href"))
        .find_map(post_id_from_href)
        .map(str::to_string)
}

/// Digits following `/status/` in a permalink.
pub fn post_id_from_href(href: &str) -> Option<&str> {
    let (_, rest) = href.split_once("/status/")?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;

    #[test]
    fn test_post_id_from_href() {
        assert_eq!(post_id_from_href("/jack/status/20"), Some("20"));
        assert_eq!(post_id_from_href("/user42/status/1660339245607780359/photo/1"), Some("1660339245607780359"));
        assert_eq!(post_id_from_href("/jack/status/"), None);
        assert_eq!(post_id_from_href("/jack"), None);
    }

    #[test]
    fn test_active_menu_post() {
        let dom = Dom::new();
        dom.append_html(
            dom.body(),
            concat!(
                "<article data-testid='tweet'><a href='/a/status/1'>1</a>",
                "<button data-testid='caret' aria-expanded='false'></button></article>",
                "<article data-testid='tweet'><a href='/b/status/2'>2</a>",
                "<button data-testid='caret' aria-expanded='true'></button></article>",
            ),
        )
        .unwrap();

        assert_eq!(dom.with(active_menu_post_id), Some("2".to_string()));
    }

    #[test]
    fn test_no_active_menu() {
        let dom = Dom::new();
        dom.append_html(dom.body(), "<article data-testid='tweet'></article>")
            .unwrap();
        assert_eq!(dom.with(active_menu_post), None);
    }
}
