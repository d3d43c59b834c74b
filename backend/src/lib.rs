//! HTTP service exposing research runs over SSE.

pub mod config;
pub mod routes;
pub mod state;
