// src/lib.rs

pub mod config;
pub mod error;
pub mod handlers;
pub mod helper;
pub mod host;
pub mod models;
pub mod routes;
pub mod services;

pub use error::HelperError;
pub use helper::Helper;
