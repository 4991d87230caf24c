//! Tracing/logging setup shared by binaries and tests.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
