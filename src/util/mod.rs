//! Shared HTTP plumbing.

pub mod http;
