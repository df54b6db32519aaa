//! Command implementations

pub mod clean;
pub mod plugins;
pub mod regenerate;
pub mod status;
pub mod sync;
pub mod time;
