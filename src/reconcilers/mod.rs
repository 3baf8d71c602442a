//! Reconcilers for the EtherealPod CRD
//!
//! This module contains the business logic of a reconcile pass:
//! - Enumerating the Pods an EtherealPod owns
//! - Converging them to a single live Pod
//! - Publishing the live Pod's health on the EtherealPod status

pub mod children;
pub mod convergence;
pub mod ethereal_pod;
pub mod status;
