//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_HANDOFF_TIMEOUT_SECS: u64 = 60;

/// identity tokens live 60 minutes; refresh well inside that
pub const CREDENTIAL_TTL_SECS: i64 = 55 * 60;
/// dev mode retries an unreachable metadata server after this long
pub const METADATA_RETRY_SECS: u64 = 5 * 60;

pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";
pub const DEFAULT_ADC_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_OUTPUT_PATH: &str = "/etc/traefik/dynamic/routes.yml";

pub const DEFAULT_LABEL_NAMESPACE: &str = "traefik";
pub const DEFAULT_IDENTITY_MARKER: &str = "home-index";
pub const DEFAULT_FORWARD_AUTH_MIDDLEWARES: [&str; 3] =
    ["lab1-auth-check", "lab2-auth-check", "lab3-auth-check"];

pub const ENV_CLOUD_RUN_SERVICE: &str = "K_SERVICE";
pub const ENV_ADC_PATH: &str = "GOOGLE_APPLICATION_CREDENTIALS";

// Emitted policy
pub const DEFAULT_ENTRY_POINT: &str = "web";
pub const DEFAULT_ROUTE_PRIORITY: i32 = 200;
pub const ADMIN_ROUTE_PRIORITY: i32 = 1000;
pub const INTERNAL_API_SERVICE: &str = "api@internal";
pub const CREDENTIAL_HEADER: &str = "X-Serverless-Authorization";
pub const CREDENTIAL_MIDDLEWARE_SUFFIX: &str = "-auth";
pub const RETRY_MIDDLEWARE: &str = "retry-cold-start@file";
pub const AUTH_CHECK_MARKER: &str = "auth-check";
pub const FORWARD_AUTH_PATH: &str = "/api/auth/check";
pub const SIGNED_TOKEN_PREFIX: &str = "eyJ";
