pub mod app;
pub mod config;
pub mod runtime;
pub mod shared;
pub mod store;
pub mod workflow;
