//! Upload a table, rank the correlations between its columns and render
//! charts of it, served as an htmx web app.

pub mod analysis;
pub mod app;
pub mod artifact;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod fonts;
pub mod plot;
pub mod state;
pub mod ui;
