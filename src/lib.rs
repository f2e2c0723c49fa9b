//! SIGUM admin: client library for the municipal zoning and prior-viability back office.
//!
//! Talks to the SIGUM REST API (CNAEs, zones, users, consultas prévias), keeps
//! the login session on disk, imports zone boundaries from KMZ files and
//! renders request reports to PDF.

pub mod error;
pub mod config;
pub mod logging;
pub mod models;
// HTTP plumbing shared by every service module
pub mod client;
pub mod auth;
pub mod cnaes;
pub mod zoning;
pub mod users;
pub mod requests;
// Zone boundaries: KMZ import, manual polygons, GeoJSON normalization
pub mod kmz;
pub mod geometry;
pub mod forms;
pub mod format;
pub mod report;

pub use error::{Error, Result};
