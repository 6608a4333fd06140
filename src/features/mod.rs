//! Toggleable page enhancements.
//!
//! Every feature implements [`Feature`]: a stable identifier, a display name,
//! and a reversible activate/deactivate pair. Features that need to react to
//! content the site renders later also opt into added-node notifications.
//!
//! ```text
//! preference flip ──▶ FeatureEngine::reconcile ──▶ activate / deactivate
//! DOM insertion   ──▶ FeatureEngine::flush_mutations ──▶ on_added_nodes
//! ```

pub mod code_spans;
mod stylesheet;
mod tasks;
pub mod timecodes;
pub mod video_menu;
pub mod voice_posts;

use std::rc::Rc;

use thiserror::Error;

use crate::bridge::{BridgeClient, BridgeError};
use crate::dom::{Dom, NodeId};
use crate::page::FrameworkPropsReader;

pub use code_spans::FormatCodeBlocks;
pub use stylesheet::{install_stylesheet, remove_stylesheet, StylesheetFeature};
pub use tasks::LocalTasks;
pub use timecodes::Timecodes;
pub use video_menu::VideoMenu;
pub use voice_posts::DownloadVoicePosts;

/// Static description of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureMeta {
    /// Preference key; unique within a registry.
    pub identifier: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Errors raised while a feature touches the page.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Framework props missing on {0}")]
    MissingFrameworkProps(&'static str),

    #[error("Expected element not found: {0}")]
    MissingElement(&'static str),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for feature operations.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// A reversible page enhancement.
///
/// `activate` and `deactivate` are idempotent: a call that would not change
/// [`Feature::is_enabled`] does nothing, so no listener, stylesheet or
/// element is added or removed twice.
pub trait Feature {
    fn meta(&self) -> &FeatureMeta;

    fn identifier(&self) -> &'static str {
        self.meta().identifier
    }

    fn is_enabled(&self) -> bool;

    fn activate(&mut self) -> FeatureResult<()>;

    fn deactivate(&mut self) -> FeatureResult<()>;

    /// Opt into [`Feature::on_added_nodes`].
    fn observes_added_nodes(&self) -> bool {
        false
    }

    /// Nodes inserted into the document in one batch. Only called while
    /// enabled.
    fn on_added_nodes(&mut self, added: &[NodeId]) -> FeatureResult<()> {
        let _ = added;
        Ok(())
    }
}

/// Handles a feature may hold on to.
#[derive(Clone)]
pub struct FeatureContext {
    pub dom: Dom,
    pub bridge: BridgeClient,
    pub props: Rc<dyn FrameworkPropsReader>,
    pub tasks: LocalTasks,
}

impl std::fmt::Debug for FeatureContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureContext")
            .field("dom", &self.dom)
            .field("bridge", &self.bridge)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

/// Metadata of every preference-controlled feature, in registry order.
pub const CATALOG: &[FeatureMeta] = &[
    stylesheet::HIDE_TRENDS,
    stylesheet::HIDE_RECOMMENDATIONS,
    stylesheet::ULTRA_WIDE,
    code_spans::META,
    timecodes::META,
    voice_posts::META,
];

/// Look up catalog metadata by identifier.
pub fn find_meta(identifier: &str) -> Option<&'static FeatureMeta> {
    CATALOG.iter().find(|meta| meta.identifier == identifier)
}

/// Instantiate every preference-controlled feature, in [`CATALOG`] order.
pub fn builtin(ctx: &FeatureContext) -> Vec<Box<dyn Feature>> {
    vec![
        Box::new(StylesheetFeature::hide_trends(ctx.dom.clone())),
        Box::new(StylesheetFeature::hide_recommendations(ctx.dom.clone())),
        Box::new(StylesheetFeature::ultra_wide(ctx.dom.clone())),
        Box::new(FormatCodeBlocks::new(ctx.dom.clone())),
        Box::new(Timecodes::new(ctx.dom.clone())),
        Box::new(DownloadVoicePosts::new(
            ctx.dom.clone(),
            ctx.bridge.clone(),
            ctx.tasks.clone(),
        )),
    ]
}
