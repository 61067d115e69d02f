//! # Studio Rust Backend
//!
//! Scheduling and capacity core for fixed-capacity class businesses.
//!
//! This crate provides the Rust core of the studio scheduling system: it
//! expands recurring class templates into concrete dated occurrences,
//! enforces enrollment capacity with priority-based displacement, tracks
//! per-enrollment attendance status, and computes pro-rata charges for
//! subscriptions that start mid billing-cycle. The presentation layer
//! (forms, dashboards, listings) consumes this crate as a library.
//!
//! ## Features
//!
//! - **Template Expansion**: recurrence rules (weekday set + time of day +
//!   date range) materialized into dated occurrences, idempotently
//! - **Capacity Enforcement**: atomic seat checks with two-phase
//!   displacement of lower-priority enrollees
//! - **Attendance Tracking**: flat Scheduled/Present/Absent status updates
//! - **Pro-Rata Billing**: pure partial-charge computation with decimal
//!   money math
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Typed domain entities and identifier newtypes
//! - [`config`]: Engine settings (capacity, timezone, billing cycle)
//! - [`db`]: Repository pattern and the in-memory storage backend
//! - [`models`]: Time resolution and store-boundary template parsing
//! - [`services`]: Business logic (expander, enrollment, attendance,
//!   billing)

// Allow large error types - RepositoryError carries structured context
#![allow(clippy::result_large_err)]

pub mod api;

pub mod config;
pub mod db;
pub mod models;

pub mod services;

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
