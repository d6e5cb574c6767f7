//! Integration test suite for the session endpoints.
//!
//! Drives the full router (gatekeeper included) against an in-process
//! identity authority and a fixed clock.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
mod integration;
