//! Published-content caching: a two-tier cache of content and media
//! snapshots with request coalescing, the published views built from them,
//! and notification-driven invalidation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod invalidation;
pub mod notifications;
pub mod published;
pub mod schema;
