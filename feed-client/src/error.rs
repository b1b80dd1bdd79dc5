use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `feed-client`.
pub enum FeedClientError {
    /// Ошибка HTTP-транспорта (`reqwest`).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Запрошенный ресурс не найден.
    #[error("not found")]
    NotFound,

    /// Некорректный запрос или бизнес-ошибка на стороне бэкенда.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Тело ответа не удалось разобрать в ожидаемую структуру.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Результат операций `feed-client`.
pub type FeedClientResult<T> = Result<T, FeedClientError>;

impl FeedClientError {
    pub(crate) fn from_http_status(status: reqwest::StatusCode, message: Option<String>) -> Self {
        match status {
            reqwest::StatusCode::NOT_FOUND => Self::NotFound,
            _ => {
                let message = message.unwrap_or_else(|| format!("http status {status}"));
                Self::InvalidRequest(message)
            }
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_http_status(status, None);
        }
        Self::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_maps_to_not_found() {
        let err = FeedClientError::from_http_status(reqwest::StatusCode::NOT_FOUND, None);
        assert!(matches!(err, FeedClientError::NotFound));
    }

    #[test]
    fn other_status_keeps_server_message() {
        let err = FeedClientError::from_http_status(
            reqwest::StatusCode::BAD_REQUEST,
            Some("description is required".to_string()),
        );
        match err {
            FeedClientError::InvalidRequest(message) => {
                assert_eq!(message, "description is required");
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn other_status_without_message_uses_fallback() {
        let err =
            FeedClientError::from_http_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, None);
        match err {
            FeedClientError::InvalidRequest(message) => {
                assert!(message.contains("500"));
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }
}
