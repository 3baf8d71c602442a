//! EtherealPod Kubernetes Operator
//!
//! This operator keeps a single Pod alive for every `EtherealPod` custom
//! resource, replacing it whenever it completes or fails, and mirrors the
//! Pod's health onto the resource status.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;

pub use error::{Error, Result};
