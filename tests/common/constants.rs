//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, limits, etc.), update only this file.
#![allow(dead_code)]

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user, registered on demand by `TestClient::authenticated()`
pub const TEST_USER_NAME: &str = "Test User";
pub const TEST_USER_EMAIL: &str = "testuser@example.com";
pub const TEST_USER_PASS: &str = "testpass123";

/// A second user, for ownership and isolation checks
pub const OTHER_USER_NAME: &str = "Other User";
pub const OTHER_USER_EMAIL: &str = "other@example.com";
pub const OTHER_USER_PASS: &str = "otherpass123";

// ============================================================================
// Server Settings
// ============================================================================

/// Secret the test server signs tokens with, so tests can forge their own
pub const TEST_JWT_SECRET: &str = "e2e-test-secret";

/// Upload ceiling of the test server, kept small so oversize uploads are cheap
pub const TEST_MAX_UPLOAD_BYTES: u64 = 64 * 1024;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout of a single request (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
