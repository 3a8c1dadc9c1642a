//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger: request id, method, path, status, latency
//! 2. Role extractor: `X-User-Role` into request extensions (timeline routes only)

pub mod audit;
pub mod role;
