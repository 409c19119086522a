/*
 * Responsibility
 * - HTTP surface (routes / handlers / extractors) の公開ポイント
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
