//! HTTP request handlers

pub mod beat;
pub mod coverage;
pub mod directory;
pub mod health;
pub mod visit;
