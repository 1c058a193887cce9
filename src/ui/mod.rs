//! HTML served to the browser: the static page and the htmx fragments
//! swapped into it.

pub mod panels;
