//! DTOs de la API
//!
//! Formas de request/response en JSON, con nombres de campo en español.

pub mod event_dto;
pub mod user_dto;
