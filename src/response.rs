use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Pagination details attached to list responses.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
    pub total_pages: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            total_pages: Some(total_pages),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            total_pages: None,
        }
    }
}

/// Envelope shared by every JSON endpoint, successful or not.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorData {
    pub error: String,
    /// Per-field messages when validation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<ValidationErrors>,
}

impl ApiResponse<ErrorData> {
    pub fn error(message: impl Into<String>, fields: Option<ValidationErrors>) -> Self {
        let message = message.into();
        Self {
            data: Some(ErrorData {
                error: message.clone(),
                fields,
            }),
            message,
            meta: Some(Meta::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Meta::new(1, 20, 0).total_pages, Some(0));
        assert_eq!(Meta::new(1, 20, 20).total_pages, Some(1));
        assert_eq!(Meta::new(2, 20, 41).total_pages, Some(3));
    }

    #[test]
    fn error_envelope_repeats_message() {
        let body = serde_json::to_value(ApiResponse::error("Forbidden", None)).unwrap();
        assert_eq!(body["message"], "Forbidden");
        assert_eq!(body["data"]["error"], "Forbidden");
        assert!(body["data"].get("fields").is_none());
        assert!(body["meta"]["page"].is_null());
    }
}
