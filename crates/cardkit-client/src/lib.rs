//! # Cardkit Client
//!
//! Transport to the card registry.
//!
//! [`CardClient`] is the seam the card manager talks through. Two
//! implementations ship here:
//!
//! - [`HttpCardClient`] for the real registry over HTTPS
//! - [`memory::InMemoryCardService`] for tests and offline use
//!
//! Clients move signed models and bearer strings; they never verify cards.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;

pub use client::{CardClient, GetCardResponse};
pub use error::{ClientError, ErrorResponse, Result};
pub use http::{HttpCardClient, DEFAULT_SERVICE_URL, SUPERSEDED_HEADER};
