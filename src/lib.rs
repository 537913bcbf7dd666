//! Parqueadero
//!
//! Backend del parqueadero: usuarios y vehículos, eventos de portería,
//! ocupación y disponibilidad en vivo, y avisos por SMS.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
