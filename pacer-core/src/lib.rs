//! # pacer-core
//!
//! The correction core of the pacer race-tracking service: it turns a
//! participant's noisy GPS fixes into a corrected position on the
//! course, monotone race progress, per-checkpoint split times and a
//! live leaderboard.
//!
//! The core is a library. HTTP transport, authentication and entity
//! CRUD are external collaborators; the public surface is
//! [`service::TrackingService`] with its five operations
//! (`correct_location`, `upload_course_from_bytes`, `get_course`,
//! `get_event_detail`, `reset_store`).
//!
//! Two stateful backends sit behind the service:
//!
//! - the **live store** ([`store::LiveStore`]): per-participant
//!   location records, per-checkpoint splits and the leaderboard sorted
//!   set, with an in-memory and a Redis implementation;
//! - the **relational read model** ([`db`]): event metadata,
//!   participant profiles and tracker relationships, read-only.

pub mod config;
pub mod course;
pub mod db;
pub mod engine;
pub mod error;
pub mod format;
pub mod retry;
pub mod service;
pub mod store;

pub use config::CoreConfig;
pub use error::CoreError;
pub use service::TrackingService;
