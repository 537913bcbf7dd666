//! Middleware del sistema
//!
//! Por ahora solo CORS; el trazado de requests lo agrega el router.

pub mod cors;

pub use cors::*;
