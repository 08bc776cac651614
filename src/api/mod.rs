//! REST surface over `PositionService`.

pub mod error;
pub mod handlers;
pub mod routes;
