//! Application-wide constants
//!
//! Centralized location for magic values to improve maintainability.

// =============================================================================
// Pagination
// =============================================================================

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed items per page to prevent excessive queries
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

// =============================================================================
// Authentication & Security
// =============================================================================

/// Default JWT token expiration in hours
pub const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24;

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Seconds per hour (for token expiration calculation)
pub const SECONDS_PER_HOUR: i64 = 3600;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Username of the administrator created on first start
pub const DEFAULT_SEED_ADMIN_USERNAME: &str = "admin";

/// Username of the optional demo account
pub const DEMO_USERNAME: &str = "demo";

// =============================================================================
// Accounts
// =============================================================================

/// Users an administrator may own
pub const DEFAULT_MAX_USERS_PER_ADMIN: u64 = 15;

/// Stored value for a user whose instance is running
pub const STATE_ACTIVE: &str = "active";

/// Stored value for a user whose instance is stopped
pub const STATE_INACTIVE: &str = "inactive";

// =============================================================================
// Server Configuration
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Origins allowed by CORS when none are configured
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://127.0.0.1:5173"];

// =============================================================================
// Database
// =============================================================================

/// Default database connection URL (for development)
pub const DEFAULT_DATABASE_URL: &str = "sqlite://portal.db?mode=rwc";

// =============================================================================
// GPU Provider
// =============================================================================

/// Base URL of the GPU rental API
pub const DEFAULT_VENDOR_BASE_URL: &str = "https://www.gpufree.cn/api/v1";

/// Per-request timeout for provider calls
pub const DEFAULT_VENDOR_TIMEOUT_SECS: u64 = 15;

/// Instance listing path
pub const VENDOR_LIST_PATH: &str = "jupyter/list_instance_pages";

/// Start/stop command path
pub const VENDOR_ACTION_PATH: &str = "inferring-api/webide/";

/// Envelope code the provider uses for success
pub const VENDOR_SUCCESS_CODE: i64 = 200;

/// Provider status code for a running instance
pub const VENDOR_STATUS_RUNNING: i32 = 3;

/// Provider status code for a stopped instance
pub const VENDOR_STATUS_STOPPED: i32 = 5;

/// Page size used when scanning the listing for one instance
pub const VENDOR_SCAN_PAGE_SIZE: u32 = 50;

/// Upper bound on pages scanned for one instance
pub const VENDOR_SCAN_MAX_PAGES: u32 = 20;

/// Start mode sent with every start/stop command
pub const VENDOR_START_MODE: &str = "gpu";

// =============================================================================
// Lifecycle Jobs
// =============================================================================

/// Minutes without a heartbeat before an active instance is stopped
pub const DEFAULT_INACTIVITY_TIMEOUT_MINUTES: i64 = 180;

/// Seconds between inactivity sweeps
pub const DEFAULT_INACTIVITY_POLL_SECONDS: u64 = 60;

/// Local hour of the nightly shutdown
pub const DEFAULT_DAILY_SHUTDOWN_HOUR: u32 = 23;

/// UTC offset (hours) used to interpret the shutdown hour
pub const DEFAULT_DAILY_SHUTDOWN_UTC_OFFSET_HOURS: i32 = 8;

/// Pause after a nightly shutdown before scheduling the next one
pub const DEFAULT_SHUTDOWN_BUFFER_SECONDS: u64 = 60;

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: u64 = 8;

/// Upper bound for `INACTIVITY_TIMEOUT_MINUTES` (one week)
pub const MAX_INACTIVITY_TIMEOUT_MINUTES: i64 = 7 * 24 * 60;

/// Upper bound for `JWT_EXPIRATION_HOURS` (one year)
pub const MAX_JWT_EXPIRATION_HOURS: i64 = 365 * 24;

/// Upper bound for `VENDOR_TIMEOUT_SECS`
pub const MAX_VENDOR_TIMEOUT_SECS: u64 = 600;
