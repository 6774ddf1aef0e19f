//! Log dashboard comparing a rate-limited server (server 1) against an
//! unlimited one (server 2).
//!
//! The engine ([`record`], [`timestamp`], [`filter`], [`aggregate`],
//! [`pagination`], [`dashboard`]) is pure and synchronous. [`api`], [`app`]
//! and [`ui`] wire it to the backend and the terminal.

pub mod aggregate;
pub mod api;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod generator;
pub mod pagination;
pub mod record;
pub mod timestamp;
pub mod ui;
