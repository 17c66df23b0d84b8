//! Core domain types and utilities for deskbridge.
//!
//! This crate provides the foundational types and error handling shared by
//! the deskbridge support relay crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{FeedbackId, ParseIdError};
