//! Global constants used throughout the stacksynth codebase.
//!
//! This module holds the contract values shared with the deployed workload
//! (health probe settings), naming conventions, and tuning numbers used by
//! more than one module.

/// Environment variable prefix for variable overrides.
///
/// `STACKSYNTH_VAR_region=eu-west-1` overrides the `region` variable.
pub const ENV_VAR_PREFIX: &str = "STACKSYNTH_VAR_";

/// Value of the `ManagedBy` global tag.
pub const MANAGED_BY: &str = "stacksynth";

/// Path the workload serves its liveness endpoint on.
///
/// The workload answers `GET /health` with HTTP 200 and `{ "status": "ok" }`.
pub const HEALTH_CHECK_PATH: &str = "/health";

/// Seconds between load balancer health probes.
pub const HEALTH_CHECK_INTERVAL_SECS: u32 = 30;

/// Seconds before a single load balancer health probe times out.
pub const HEALTH_CHECK_TIMEOUT_SECS: u32 = 5;

/// Consecutive successes before a target is considered healthy.
pub const HEALTHY_THRESHOLD: u32 = 2;

/// Consecutive failures before a target is considered unhealthy.
pub const UNHEALTHY_THRESHOLD: u32 = 2;

/// HTTP status codes the load balancer accepts as a passing probe.
pub const HEALTH_CHECK_MATCHER: &str = "200-399";

/// Port the public load balancer listens on.
pub const LISTENER_PORT: u16 = 80;

/// Maximum edit distance (as a percentage of the name length) for
/// "did you mean" suggestions.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

