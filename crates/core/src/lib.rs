//! PyroWarden Core - Shared domain types.
//!
//! This crate provides the types used across all PyroWarden components:
//! - `storefront` - Public marketing and commerce site with the admin back-office
//! - `cli` - Operator tools (backend checks, seeding, admin role management)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Row types
//! that mirror backend tables live next to the backend client in the
//! storefront crate; the values they share (IDs, prices, statuses, roles)
//! live here.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
