//! Linode API interaction module
//!
//! Thin authenticated access to the Linode REST API.
//!
//! # Module Structure
//!
//! - [`client`] - Main Linode client: base URL, token, object loading
//! - [`http`] - HTTP utilities and API error decoding
//!
//! # Example
//!
//! ```ignore
//! use crate::linode::client::LinodeClient;
//!
//! async fn example(settings: &ApiSettings) -> lincloud::error::Result<()> {
//!     let client = LinodeClient::new(settings)?;
//!     let profile = client.get("/profile").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;

pub use client::LinodeClient;
