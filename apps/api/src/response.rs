use serde::Serialize;

/// Success envelope shared by every JSON endpoint: `{ success, count?, data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data,
        }
    }

    pub fn counted(data: T, count: usize) -> Self {
        Self {
            success: true,
            count: Some(count),
            data,
        }
    }
}

/// Body for operations that only report an outcome, e.g. deletes.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
