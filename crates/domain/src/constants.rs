//! Protocol constants
//!
//! Centralized location for values dictated by the Armis REST API or by the
//! token lifecycle.

/// Safety margin subtracted from the server-reported token expiry.
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 300;

/// API version segment used when none is configured.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Token endpoint, relative to `{base_url}/api/{version}/`.
pub const ACCESS_TOKEN_PATH: &str = "access_token/";

/// Form field carrying the credential key on the token endpoint.
pub const SECRET_KEY_FIELD: &str = "secret_key";

// Resource collections
/// Policy collection
pub const POLICIES_PATH: &str = "policies";
/// Boundary collection
pub const BOUNDARIES_PATH: &str = "boundaries";

// HTTP defaults
/// Per-attempt timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Attempts per request, initial try included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// `armis-client/<crate version>`
pub const DEFAULT_USER_AGENT: &str = concat!("armis-client/", env!("CARGO_PKG_VERSION"));

// Media types
/// Media type of every authenticated request and of all responses.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Media type of the token exchange.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
