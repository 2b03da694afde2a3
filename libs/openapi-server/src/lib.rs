//! Wire models for the deployd HTTP API

pub mod models;
