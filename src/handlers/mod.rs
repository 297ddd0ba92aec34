// src/handlers/mod.rs
pub mod error;
pub mod plan;
pub mod report;
pub mod status;
