pub mod app;
pub mod config;
pub mod logging;
pub mod model;
pub mod platform;
pub mod player;
pub mod sequencer;
pub mod shell_cache;
pub mod storage;
pub mod ui;
pub mod widget;
