// src/models/mod.rs

pub mod assignment;
pub mod group;
pub mod module;
pub mod progress;
pub mod session;
