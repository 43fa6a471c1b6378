//! Resource abstraction layer
//!
//! Collection access and the data-driven definitions behind the read-only
//! info/list modules.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches info/list definitions from embedded JSON
//! - [`fetcher`] - Fetches collections with pagination and `X-Filter` support
//!
//! # Resource Definitions
//!
//! Definitions live in JSON files under `src/resources/`:
//! - `info.json` - single-resource lookups with secondary results
//! - `list.json` - filtered collection listings
//!
//! # Example
//!
//! ```ignore
//! use crate::resource::{fetch_collection, get_list_module};
//!
//! async fn list_domains(client: &LinodeClient) -> lincloud::error::Result<Vec<Value>> {
//!     let def = get_list_module("domain_list").unwrap();
//!     fetch_collection(client, &def.endpoint, None, None).await
//! }
//! ```

mod fetcher;
mod registry;

pub use fetcher::{
    build_filter, fetch_collection, fetch_page, fill_template, PaginatedResult, ResourceFilter,
    PAGE_SIZE,
};
pub use registry::*;
