//! The three script contexts of the extension.
//!
//! - [`PageWorld`]: runs in the page, reads framework props, owns the video
//!   context menu and answers `getVoicePostInfo`
//! - [`Mediator`]: isolated world, relays `downloadMedia` to the background
//! - [`Background`]: privileged, registers content scripts and downloads

mod background;
mod mediator;
mod page;

pub use background::{Background, DownloadHost};
pub use mediator::Mediator;
pub use page::{find_post_properties, PageWorld};
