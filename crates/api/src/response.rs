//! Shared response envelope for administrative API handlers.
//!
//! Admin responses use a `{ "data": ... }` envelope. The public `/api`
//! generation surface intentionally does NOT use it -- those bodies are a
//! flat external contract consumed by pre-existing clients.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
