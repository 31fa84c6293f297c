//! Core scheduling and lifecycle engine for workpool.
//!
//! This crate is the implementation; the `workpool` crate re-exports the parts meant for
//! application code. See [`service::Service`] for the entry point, [`scheduler`] for the
//! pluggable strategies, and [`group::ContractGroup`] for the collaborator contract a
//! registered work group must satisfy.

pub mod config;
pub mod error;
pub mod group;
pub mod log;
pub mod main_thread;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod worker;

mod epoch;
mod unwind;
