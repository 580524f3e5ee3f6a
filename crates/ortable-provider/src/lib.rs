//! # ortable-provider
//!
//! HTTP provider library for the OR table demo.
//!
//! This library provides the API handlers, shared state and logging setup
//! used by the `ortable-provider` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
