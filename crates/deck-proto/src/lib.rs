pub mod catalog;
pub mod config;
pub mod favorites;
pub mod platform;
pub mod prefs;
pub mod protocol;
pub mod state;
pub mod store;
