pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod session;
pub mod state;
pub mod ui;
