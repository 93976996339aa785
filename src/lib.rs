pub mod catalog;
pub mod config;
pub mod error;
pub mod manager;
pub mod selection;
pub mod session;
pub mod task;
