//! Constants used throughout the EMR core crate.

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Default base URL of the upstream terminology/EMR API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1/namaste";

/// Default timeout for outbound HTTP calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default quiet period before a debounced search runs, in milliseconds.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Default minimum query length (in characters) for a debounced search.
pub const DEFAULT_SEARCH_MIN_CHARS: usize = 2;

/// Default dosage form for a new prescription row.
pub const DEFAULT_PRESCRIPTION_FORM: &str = "tablet";

/// Path of the bundle ingestion endpoint, relative to the API base URL.
pub const BUNDLE_UPLOAD_PATH: &str = "/bundles/upload";
