//! Core business logic for rapshare.
//!
//! [`ReactionService`] toggles likes on any [`ContentKind`](rapshare_db::entities::ContentKind)
//! and keeps the denormalized counters in step; [`ContentService`] owns the
//! lifecycle of posts, comments, beats and recordings.

pub mod services;

pub use services::*;
