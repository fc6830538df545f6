//! Herder core library: domain newtypes, path layout, user settings and errors.
//!
//! Public API surface:
//! - [`types`]: newtypes for target and herd identities
//! - [`layout`]: [`Layout`], every repo-relative path the engine touches
//! - [`settings`]: load `settings.json` and apply the command prefix
//! - [`error`]: [`CoreError`]

pub mod error;
pub mod layout;
pub mod settings;
pub mod types;

pub use error::CoreError;
pub use layout::Layout;
pub use settings::Settings;
pub use types::{HerdName, TargetName};
