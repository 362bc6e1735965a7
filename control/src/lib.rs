//! Podgress Controller Library
//!
//! Exposes the pod reconciler, its store seam, and configuration for the
//! binary and tests

pub mod apis;
pub mod config;
pub mod error;
