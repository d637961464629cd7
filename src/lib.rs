//! Terminal typing game: type the story as it is written, fill in the
//! blanks, and chase quests the story hands out along the way.

pub mod app;
pub mod config;
pub mod engine;
pub mod event;
pub mod oracle;
pub mod session;
pub mod ui;
