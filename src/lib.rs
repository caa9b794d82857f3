pub mod app;
pub mod cli;
pub mod config;
pub mod dates;
pub mod storage;
pub mod tasks;
pub mod text;
pub mod ui;
pub mod view;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use tasks::{TaskId, TaskList};
