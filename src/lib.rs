//! # comanda
//!
//! Session and route-authorization core for the comanda restaurant client.
//! Staff sign in against the hosted user collection and are routed to the
//! layout for their role: `administrador`, `mesero` or `chef`.
//!
//! This crate contains the session store, the credential lookup backends,
//! durable local storage, the route table, the navigation guard and the
//! router that ties them together. [`state::AppState`] wires one of each.

pub mod config;
pub mod directory;
pub mod guard;
pub mod router;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod user;
