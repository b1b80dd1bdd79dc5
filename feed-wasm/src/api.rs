use gloo_net::http::Request;
use serde::de::DeserializeOwned;

use crate::models::{
    Comment, CreateCommentRequest, CreateImageRequest, CreatePostRequest, CreateUserRequest, Post,
    PostImage, PostPage, User,
};

const API_BASE_URL: &str = match option_env!("WASM_API_BASE_URL") {
    Some(value) => value,
    None => "http://localhost:3000",
};

#[derive(Debug, Clone)]
pub(crate) enum ApiError {
    Network(String),
    Http { status: u16, message: String },
    Decode(String),
}

impl core::fmt::Display for ApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Http { status, message } => write!(f, "http error {status}: {message}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

fn endpoint(path: &str) -> String {
    format!(
        "{}/api/{}",
        API_BASE_URL.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

async fn parse_json<T: DeserializeOwned>(response: gloo_net::http::Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))
}

async fn parse_error_body(response: gloo_net::http::Response) -> ApiError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "request failed".to_string());

    let fallback = match status {
        400 => "Некорректный запрос".to_string(),
        404 => "Ресурс не найден".to_string(),
        409 => "Конфликт данных (например, пользователь уже существует)".to_string(),
        500..=599 => "Ошибка сервера".to_string(),
        _ => format!("HTTP ошибка {status}"),
    };

    let message = if text.trim().is_empty() { fallback } else { text };

    ApiError::Http { status, message }
}

async fn get_json<T: DeserializeOwned>(path: &str) -> Result<T, ApiError> {
    let response = Request::get(&endpoint(path))
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(parse_error_body(response).await);
    }

    parse_json(response).await
}

pub(crate) async fn list_users() -> Result<Vec<User>, ApiError> {
    get_json("/users").await
}

pub(crate) async fn create_user(nick_name: &str, email: Option<&str>) -> Result<User, ApiError> {
    let payload = CreateUserRequest {
        nick_name: nick_name.to_string(),
        email: email.map(str::to_string),
    };

    let response = Request::post(&endpoint("/users"))
        .json(&payload)
        .map_err(|err| ApiError::Network(err.to_string()))?
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(parse_error_body(response).await);
    }

    parse_json(response).await
}

pub(crate) async fn list_posts(page: u32, limit: u32) -> Result<PostPage, ApiError> {
    get_json(&format!("/posts?page={page}&limit={limit}")).await
}

pub(crate) async fn comments_for_post(post_id: i64) -> Result<Vec<Comment>, ApiError> {
    get_json(&format!("/comments/post/{post_id}")).await
}

pub(crate) async fn images_for_post(post_id: i64) -> Result<Vec<PostImage>, ApiError> {
    get_json(&format!("/images/post/{post_id}")).await
}

pub(crate) async fn create_post(user_id: i64, description: &str) -> Result<Post, ApiError> {
    let payload = CreatePostRequest {
        description: description.to_string(),
        user_id,
    };

    let response = Request::post(&endpoint("/posts"))
        .json(&payload)
        .map_err(|err| ApiError::Network(err.to_string()))?
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(parse_error_body(response).await);
    }

    parse_json(response).await
}

pub(crate) async fn create_image(post_id: i64, url: &str) -> Result<PostImage, ApiError> {
    let payload = CreateImageRequest {
        url: url.to_string(),
        post_id,
    };

    let response = Request::post(&endpoint("/images"))
        .json(&payload)
        .map_err(|err| ApiError::Network(err.to_string()))?
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(parse_error_body(response).await);
    }

    parse_json(response).await
}

pub(crate) async fn delete_post(post_id: i64) -> Result<(), ApiError> {
    let response = Request::delete(&endpoint(&format!("/posts/{post_id}")))
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(parse_error_body(response).await);
    }

    Ok(())
}

pub(crate) async fn create_comment(
    post_id: i64,
    user_id: i64,
    text: &str,
) -> Result<Comment, ApiError> {
    let payload = CreateCommentRequest {
        text: text.to_string(),
        post_id,
        user_id,
    };

    let response = Request::post(&endpoint("/comments"))
        .json(&payload)
        .map_err(|err| ApiError::Network(err.to_string()))?
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(parse_error_body(response).await);
    }

    parse_json(response).await
}
