//! Library crate for quizdeck-back, exposing modules for the binary and tests.

pub mod config;
pub mod dao;
pub mod deck;
mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
