pub mod models;
pub mod opening_hours;
pub mod reflow;
pub mod timeline;
