//! Case lookup: fetches raw process records from the Rama Judicial public API
//! and normalises them.

mod lookup;
pub use lookup::{
    CaseLookup, ERROR_EXCERPT_LEN, FetchError, QueryKind, SearchQuery, parse_lookup_response,
};

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::LookupClient;
