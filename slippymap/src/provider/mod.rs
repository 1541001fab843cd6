//! Tile sources.
//!
//! This module provides the HTTP transport used to download tiles, the URL
//! template describing the tile server, and bundled offline tiles that are
//! resolved before any network request.

mod bundle;
mod http;
mod types;
mod url;

pub use bundle::{parse_bundle_name, BundledTiles, MemoryBundle, NoBundle};
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_HTTP_TIMEOUT};
pub use types::ProviderError;
pub use url::{TemplateError, TileUrlTemplate, DEFAULT_URL_TEMPLATE};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
