//! On-demand JavaScript library bundler.
//!
//! A bundle is the header set of a library version followed by the modules of an
//! optional preset and any extra modules requested by the caller. Builds are keyed
//! by a digest of the request and kept in an in-process cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
