use serde::Serialize;

/// Body of a `DELETE /users/:id` response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}
