//! parley chat server library.
//! This crate exposes internal modules for integration testing and the
//! bundled terminal client. The server entry point is in main.rs.

pub mod chat;
pub mod config;
pub mod poll;
pub mod registry;
pub mod routes;
pub mod state;
pub mod ws;
