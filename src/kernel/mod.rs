//! Kernel collaborators of the abstract hasher.
//!
//! This module contains the expression model, environments, the type
//! context that synthesizes locals, and parameter classification.

pub mod context;
pub mod env;
pub mod error;
pub mod expr;
pub mod fun_info;
