//! Chat Session Service - chat sessions with an append-only conversation log.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
