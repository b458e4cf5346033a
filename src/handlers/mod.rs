//! HTTP handlers

pub mod health;
pub mod auth;
pub mod scans;
pub mod threats;
pub mod stats;
pub mod patterns;
