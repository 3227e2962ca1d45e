//! Core crate for outpaint canvas preparation, sorted image datasets and
//! prompt templates.

pub mod canvas;
pub mod config;
pub mod dataset;
pub mod descriptor;
pub mod error;
pub mod logging;
pub mod node;
pub mod nodes;
pub mod prompt;
pub mod registry;
pub mod types;
