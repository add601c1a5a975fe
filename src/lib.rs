pub mod api;
pub mod config;
pub mod curriculum;
pub mod draft;
pub mod error;
pub mod utils;
