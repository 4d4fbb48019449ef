// Profile editing: draft model, completion scoring, the session engine, and
// its persistence and avatar storage boundaries.

pub mod avatar;
pub mod completeness;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod sessions;
pub mod store;
pub mod view;

#[cfg(test)]
pub mod testing;
