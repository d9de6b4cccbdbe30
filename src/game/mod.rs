//! The embedded game frame: loading overlay, failure detection and retry.

pub mod embed;
pub mod loader;
pub mod overlay;

pub use embed::GameEmbed;
pub use loader::{Effect, Failure, GameLoader, Phase};
