//! HTTP server for contact form intake.
//!
//! Exposes the forwarder to the static marketing sites.
//!
//! # Endpoints
//!
//! - `GET  /health`      — Liveness probe
//! - `POST /api/contact` — Submit a contact form

pub mod routes;

pub use routes::{app_router, app_router_at, AppState, SubmitResponse, CONTACT_PATH};
