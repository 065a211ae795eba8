//! Admin API plumbing
//!
//! Everything that talks to, or addresses, the admin API server.
//!
//! # Module Structure
//!
//! - [`error`] - Error taxonomy shared by the whole crate
//! - [`router`] - Logical routes and request targets
//! - [`http`] - Transport trait and the reqwest-backed client
//! - [`version`] - Server version parsing

pub mod error;
pub mod http;
pub mod router;
pub mod version;
