//! Scrape professor review pages into a vector index.

pub mod app;
pub mod ask;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod gemini;
pub mod index;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod review;
pub mod utils;
