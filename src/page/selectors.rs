//! Selectors for the site's markup.

use once_cell::sync::Lazy;

use crate::dom::Selector;

fn parse(source: &str) -> Selector {
    Selector::parse(source).unwrap_or_else(|e| panic!("built-in selector: {e}"))
}

pub static POST: Lazy<Selector> = Lazy::new(|| parse("[data-testid='tweet']"));
pub static POST_TEXT: Lazy<Selector> = Lazy::new(|| parse("[data-testid='tweetText']"));
pub static POST_PHOTO: Lazy<Selector> = Lazy::new(|| parse("[data-testid='tweetPhoto']"));
pub static STATUS_LINK: Lazy<Selector> = Lazy::new(|| parse("a[href*='/status/']"));
pub static EXPANDED_CARET: Lazy<Selector> =
    Lazy::new(|| parse("[data-testid='caret'][aria-expanded='true']"));

pub static VIDEO_COMPONENT: Lazy<Selector> = Lazy::new(|| parse("[data-testid='videoComponent']"));
pub static MEDIA: Lazy<Selector> = Lazy::new(|| parse("[data-testid='videoComponent'] video"));
pub static VIDEO: Lazy<Selector> = Lazy::new(|| parse("video"));
pub static VOICE_POST: Lazy<Selector> = Lazy::new(|| parse("[aria-label='Voice post']"));

pub static MENU_ITEM: Lazy<Selector> = Lazy::new(|| parse("[role='menuitem']"));
pub static DROPDOWN: Lazy<Selector> = Lazy::new(|| parse("#layers [data-testid='Dropdown']"));
pub static MENU_LABEL: Lazy<Selector> = Lazy::new(|| parse("span"));
pub static MENU_ICON_PATH: Lazy<Selector> = Lazy::new(|| parse("svg path"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_selectors_parse() {
        for selector in [
            &POST,
            &POST_TEXT,
            &POST_PHOTO,
            &STATUS_LINK,
            &EXPANDED_CARET,
            &VIDEO_COMPONENT,
            &MEDIA,
            &VIDEO,
            &VOICE_POST,
            &MENU_ITEM,
            &DROPDOWN,
            &MENU_LABEL,
            &MENU_ICON_PATH,
        ] {
            assert!(!Lazy::force(selector).as_str().is_empty());
        }
    }
}
