//! Twitter Extras - toggleable quality-of-life features for twitter.com / x.com.
//!
//! Users switch features on and off from an options surface; the choices
//! persist in a preference store and take effect on open pages immediately.
//!
//! # Architecture
//!
//! The library is organized into these main modules:
//!
//! - [`dom`] - The document the extension scripts operate on
//! - [`storage`] - Preference store and its backends
//! - [`bridge`] - Correlated messaging between the page and extension worlds
//! - [`engine`] - Feature registry and lifecycle engine
//! - [`features`] - The features themselves
//! - [`page`] - Site selectors, framework props and menu injection
//! - [`worlds`] - Page world, mediator and background scripts
//! - [`session`] - Everything above wired together for one page
//!
//! # Example
//!
//! ```ignore
//! use extras::{Config, Dom, PreferenceStore, Session};
//!
//! let store = PreferenceStore::in_memory();
//! let session = Session::start(&Config::load(), Dom::new(), store.clone(), downloads)?;
//!
//! store.write("hideTrends", true);
//! session.flush_mutations();
//! ```

// Public modules
pub mod bridge;
pub mod cli;
pub mod config;
pub mod dom;
pub mod engine;
pub mod features;
pub mod logging;
pub mod manifest;
pub mod page;
pub mod session;
pub mod storage;
pub mod worlds;

// Internal modules
mod error;

// Re-export commonly used types for convenience
pub use bridge::{BridgeClient, BridgeError, Window};
pub use config::Config;
pub use dom::{Document, Dom, NodeId};
pub use engine::{FeatureEngine, Registry};
pub use error::{ExtrasError, ExtrasResult};
pub use features::{Feature, FeatureContext, FeatureError, FeatureMeta};
pub use session::Session;
pub use storage::{PreferenceStore, PreferenceRecord};
pub use worlds::{Background, DownloadHost};
