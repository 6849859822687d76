pub mod defaults;
pub mod fetch;
pub mod loader;
pub mod navigation;
pub mod store;
pub mod theme_controller;
pub mod ticker;
