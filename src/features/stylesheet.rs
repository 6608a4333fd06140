//! Features that are nothing but an injected stylesheet.

use crate::dom::{Document, Dom};

use super::{Feature, FeatureMeta, FeatureResult};

pub const HIDE_TRENDS: FeatureMeta = FeatureMeta {
    identifier: "hideTrends",
    name: "Hide What's Happening",
    description: "Hides the What's Happening section on the sidebar.",
};

pub const HIDE_RECOMMENDATIONS: FeatureMeta = FeatureMeta {
    identifier: "hideRecommendations",
    name: "Hide Who to Follow",
    description: "Hides the Who to Follow section on the sidebar.",
};

pub const ULTRA_WIDE: FeatureMeta = FeatureMeta {
    identifier: "ultraWide",
    name: "Ultra Wide",
    description: "Hides the sidebar and lets the timeline use the full window width.",
};

const HIDE_TRENDS_CSS: &str = r#"
[data-testid="sidebarColumn"] div:has(> div > section [data-testid="trend"]) {
    display: none;
}
"#;

const HIDE_RECOMMENDATIONS_CSS: &str = r#"
[data-testid="sidebarColumn"] div:has(> div > aside a[href*="/i/connect_people"]) {
    display: none;
}
"#;

const ULTRA_WIDE_CSS: &str = r#"
[data-testid="sidebarColumn"] {
    display: none;
}
[data-testid="primaryColumn"],
[data-testid="primaryColumn"] > div > div:last-child {
    max-width: none;
}
"#;

/// Append `<style id=…>` to the head unless an element with that id exists.
///
/// Returns whether a stylesheet was added.
pub fn install_stylesheet(doc: &mut Document, id: &str, css: &str) -> bool {
    if doc.get_element_by_id(id).is_some() {
        return false;
    }
    let style = doc.create_element("style");
    doc.set_attribute(style, "id", id);
    doc.set_text_content(style, css);
    let head = doc.head();
    doc.append_child(head, style);
    true
}

/// Remove the element with `id`, if any.
pub fn remove_stylesheet(doc: &mut Document, id: &str) -> bool {
    match doc.get_element_by_id(id) {
        Some(style) => {
            doc.remove(style);
            true
        }
        None => false,
    }
}

/// A feature whose whole effect is one stylesheet with id
/// `feature-<identifier>`.
pub struct StylesheetFeature {
    meta: FeatureMeta,
    css: &'static str,
    element_id: String,
    dom: Dom,
    enabled: bool,
}

impl StylesheetFeature {
    pub fn new(meta: FeatureMeta, css: &'static str, dom: Dom) -> Self {
        Self {
            element_id: format!("feature-{}", meta.identifier),
            meta,
            css,
            dom,
            enabled: false,
        }
    }

    pub fn hide_trends(dom: Dom) -> Self {
        Self::new(HIDE_TRENDS, HIDE_TRENDS_CSS, dom)
    }

    pub fn hide_recommendations(dom: Dom) -> Self {
        Self::new(HIDE_RECOMMENDATIONS, HIDE_RECOMMENDATIONS_CSS, dom)
    }

    pub fn ultra_wide(dom: Dom) -> Self {
        Self::new(ULTRA_WIDE, ULTRA_WIDE_CSS, dom)
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }
}

impl Feature for StylesheetFeature {
    fn meta(&self) -> &FeatureMeta {
        &self.meta
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn activate(&mut self) -> FeatureResult<()> {
        if self.enabled {
            return Ok(());
        }
        self.enabled = true;
        self.dom
            .with_mut(|doc| install_stylesheet(doc, &self.element_id, self.css));
        Ok(())
    }

    fn deactivate(&mut self) -> FeatureResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.enabled = false;
        self.dom
            .with_mut(|doc| remove_stylesheet(doc, &self.element_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_injects_style() {
        let dom = Dom::new();
        let mut feature = StylesheetFeature::hide_trends(dom.clone());

        feature.activate().unwrap();
        assert!(feature.is_enabled());
        let style = dom.with(|doc| doc.get_element_by_id("feature-hideTrends")).unwrap();
        dom.with(|doc| {
            assert_eq!(doc.parent(style), Some(doc.head()));
            assert!(doc.text_content(style).contains("data-testid=\"trend\""));
        });
    }

    #[test]
    fn test_deactivate_restores_head() {
        let dom = Dom::new();
        let before = dom.to_html(dom.head());
        let mut feature = StylesheetFeature::ultra_wide(dom.clone());

        feature.activate().unwrap();
        assert_ne!(dom.to_html(dom.head()), before);
        feature.deactivate().unwrap();
        assert!(!feature.is_enabled());
        assert_eq!(dom.to_html(dom.head()), before);
    }

    #[test]
    fn test_repeated_activate_and_deactivate() {
        let dom = Dom::new();
        let before = dom.to_html(dom.head());
        let mut feature = StylesheetFeature::hide_recommendations(dom.clone());

        feature.activate().unwrap();
        feature.activate().unwrap();
        dom.with(|doc| assert_eq!(doc.children(doc.head()).len(), 1));

        feature.deactivate().unwrap();
        feature.deactivate().unwrap();
        assert!(!feature.is_enabled());
        assert_eq!(dom.to_html(dom.head()), before);

        // A page-owned element that happens to share the id is left alone
        // while the feature is off.
        dom.with_mut(|doc| install_stylesheet(doc, feature.element_id(), "x {}"));
        feature.deactivate().unwrap();
        assert!(dom.with(|doc| doc.get_element_by_id("feature-hideRecommendations")).is_some());
    }

    #[test]
    fn test_install_is_idempotent() {
        let mut doc = Document::new();
        assert!(install_stylesheet(&mut doc, "s", "a {}"));
        assert!(!install_stylesheet(&mut doc, "s", "b {}"));
        let head = doc.head();
        assert_eq!(doc.children(head).len(), 1);
        assert!(remove_stylesheet(&mut doc, "s"));
        assert!(!remove_stylesheet(&mut doc, "s"));
    }
}
