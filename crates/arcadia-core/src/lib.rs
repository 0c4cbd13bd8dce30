//! # arcadia-core
//!
//! Core types and business vocabulary for Arcadia.
//!
//! This crate provides the building blocks shared across the admin
//! application's crates:
//! - The `Id` primary key alias
//! - The `EntityType` enumeration of business objects that can carry
//!   attachments

pub mod types;

pub use types::*;
