use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::error::{FeedClientError, FeedClientResult};
use crate::feed::FeedApi;
use crate::models::{Comment, Post, PostImage, PostPage, Tag, User};

#[derive(Debug, Serialize)]
struct CreateUserRequestDto<'a> {
    #[serde(rename = "nickName")]
    nick_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreatePostRequestDto<'a> {
    description: &'a str,
    #[serde(rename = "userId")]
    user_id: i64,
}

#[derive(Debug, Serialize)]
struct UpdatePostRequestDto<'a> {
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequestDto<'a> {
    text: &'a str,
    #[serde(rename = "postId")]
    post_id: i64,
    #[serde(rename = "userId")]
    user_id: i64,
}

#[derive(Debug, Serialize)]
struct CreateImageRequestDto<'a> {
    url: &'a str,
    #[serde(rename = "postId")]
    post_id: i64,
}

#[derive(Debug, Serialize)]
struct CreateTagRequestDto<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    error: Option<String>,
}

/// Разные хендлеры бэкенда возвращают пост то как `{...}`, то как
/// `{"post": {...}}`. Принимаем обе формы.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostResponseDto {
    Wrapped { post: Post },
    Bare(Post),
}

impl From<PostResponseDto> for Post {
    fn from(value: PostResponseDto) -> Self {
        match value {
            PostResponseDto::Wrapped { post } => post,
            PostResponseDto::Bare(post) => post,
        }
    }
}

#[derive(Serialize)]
struct ListPostsQuery {
    page: u32,
    limit: u32,
}

#[derive(Debug, Clone)]
/// HTTP-клиент для REST API соцсети.
///
/// Все пути идут через префикс `/api`; базовый URL задаётся без него,
/// например `http://localhost:3000`.
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Создаёт новый HTTP-клиент с базовым URL сервера.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn decode_error(response: reqwest::Response) -> FeedClientError {
        let status = response.status();

        let message = match response.json::<ErrorResponseDto>().await {
            Ok(body) => body
                .error
                .unwrap_or_else(|| format!("http status {status}")),
            Err(_) => format!("http status {status}"),
        };
        FeedClientError::from_http_status(status, Some(message))
    }

    async fn decode_body<T: DeserializeOwned>(response: reqwest::Response) -> FeedClientResult<T> {
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        let raw = response.text().await.map_err(FeedClientError::from_reqwest)?;
        decode_json(&raw)
    }

    /// универсальный helper для GET-запросов без тела
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FeedClientResult<T> {
        let url = self.endpoint(path);

        let response = self
            .client
            .request(Method::GET, url)
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;

        Self::decode_body(response).await
    }

    /// универсальный helper для отправки запросов с json-payload
    async fn send_json<TReq, TRes>(
        &self,
        method: Method,
        path: &str,
        body: &TReq,
    ) -> FeedClientResult<TRes>
    where
        TReq: Serialize,
        TRes: DeserializeOwned,
    {
        let url = self.endpoint(path);

        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;

        Self::decode_body(response).await
    }

    /// Возвращает страницу публикаций (`page` считается с единицы).
    pub async fn list_posts(&self, page: u32, limit: u32) -> FeedClientResult<PostPage> {
        let url = self.endpoint("/posts");
        let query = ListPostsQuery { page, limit };

        let response = self
            .client
            .request(Method::GET, url)
            .query(&query)
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;

        Self::decode_body(response).await
    }

    /// Получает публикацию по идентификатору (вместе с автором и тегами).
    pub async fn get_post(&self, id: i64) -> FeedClientResult<Post> {
        let dto: PostResponseDto = self.get_json(&format!("/posts/{id}")).await?;
        Ok(dto.into())
    }

    /// Создаёт публикацию от имени пользователя `user_id`.
    pub async fn create_post(&self, user_id: i64, description: &str) -> FeedClientResult<Post> {
        let payload = CreatePostRequestDto {
            description,
            user_id,
        };
        let dto: PostResponseDto = self
            .send_json(Method::POST, "/posts", &payload)
            .await?;
        Ok(dto.into())
    }

    /// Обновляет текст публикации.
    pub async fn update_post(&self, id: i64, description: &str) -> FeedClientResult<Post> {
        let payload = UpdatePostRequestDto { description };
        let dto: PostResponseDto = self
            .send_json(Method::PUT, &format!("/posts/{id}"), &payload)
            .await?;
        Ok(dto.into())
    }

    /// Удаляет публикацию по идентификатору.
    pub async fn delete_post(&self, id: i64) -> FeedClientResult<()> {
        let url = self.endpoint(&format!("/posts/{id}"));

        let response = self
            .client
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        Ok(())
    }

    /// Привязывает существующий тег к публикации.
    pub async fn add_tag_to_post(&self, post_id: i64, tag_id: i64) -> FeedClientResult<()> {
        let url = self.endpoint(&format!("/posts/{post_id}/addTag/{tag_id}"));

        let response = self
            .client
            .request(Method::POST, url)
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        Ok(())
    }

    /// Возвращает комментарии публикации.
    pub async fn comments_for_post(&self, post_id: i64) -> FeedClientResult<Vec<Comment>> {
        self.get_json(&format!("/comments/post/{post_id}")).await
    }

    /// Добавляет комментарий к публикации.
    pub async fn create_comment(
        &self,
        post_id: i64,
        user_id: i64,
        text: &str,
    ) -> FeedClientResult<Comment> {
        let payload = CreateCommentRequestDto {
            text,
            post_id,
            user_id,
        };
        self.send_json(Method::POST, "/comments", &payload).await
    }

    /// Возвращает картинки публикации.
    pub async fn images_for_post(&self, post_id: i64) -> FeedClientResult<Vec<PostImage>> {
        self.get_json(&format!("/images/post/{post_id}")).await
    }

    /// Привязывает картинку (по URL) к публикации.
    pub async fn create_image(&self, post_id: i64, url: &str) -> FeedClientResult<PostImage> {
        let payload = CreateImageRequestDto { url, post_id };
        self.send_json(Method::POST, "/images", &payload).await
    }

    /// Удаляет картинку по идентификатору.
    pub async fn delete_image(&self, id: i64) -> FeedClientResult<()> {
        let url = self.endpoint(&format!("/images/{id}"));

        let response = self
            .client
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        Ok(())
    }

    /// Возвращает все теги.
    pub async fn list_tags(&self) -> FeedClientResult<Vec<Tag>> {
        self.get_json("/tags").await
    }

    /// Создаёт тег.
    pub async fn create_tag(&self, name: &str) -> FeedClientResult<Tag> {
        let payload = CreateTagRequestDto { name };
        self.send_json(Method::POST, "/tags", &payload).await
    }

    /// Находит тег по имени (без учёта регистра) или создаёт новый.
    pub async fn get_or_create_tag(&self, name: &str) -> FeedClientResult<Tag> {
        let tags = self.list_tags().await?;
        if let Some(tag) = find_tag(&tags, name) {
            return Ok(tag.clone());
        }
        self.create_tag(name).await
    }

    /// Возвращает всех пользователей.
    ///
    /// Бэкенд не умеет искать по никнейму, поэтому «вход» — это поиск
    /// по полному списку на клиенте (так делает и веб-версия).
    pub async fn list_users(&self) -> FeedClientResult<Vec<User>> {
        self.get_json("/users").await
    }

    /// Регистрирует пользователя.
    pub async fn create_user(&self, nick_name: &str, email: Option<&str>) -> FeedClientResult<User> {
        let payload = CreateUserRequestDto { nick_name, email };
        self.send_json(Method::POST, "/users", &payload).await
    }

    /// Ищет пользователя по никнейму (без учёта регистра).
    pub async fn find_user(&self, nick_name: &str) -> FeedClientResult<Option<User>> {
        let users = self.list_users().await?;
        Ok(find_user_by_nick(&users, nick_name).cloned())
    }
}

/// Разбор успешного тела ответа: ошибка парсинга — это [`FeedClientError::Decode`],
/// а не HTTP-ошибка.
fn decode_json<T: DeserializeOwned>(raw: &str) -> FeedClientResult<T> {
    serde_json::from_str(raw).map_err(|err| FeedClientError::Decode(err.to_string()))
}

fn find_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a Tag> {
    let needle = name.trim().to_lowercase();
    tags.iter().find(|tag| tag.name.to_lowercase() == needle)
}

fn find_user_by_nick<'a>(users: &'a [User], nick_name: &str) -> Option<&'a User> {
    let needle = nick_name.trim().to_lowercase();
    users
        .iter()
        .find(|user| user.nick_name.to_lowercase() == needle)
}

#[async_trait]
impl FeedApi for ApiClient {
    async fn fetch_page(&self, page: u32, limit: u32) -> FeedClientResult<PostPage> {
        self.list_posts(page, limit).await
    }

    async fn comments_for_post(&self, post_id: i64) -> FeedClientResult<Vec<Comment>> {
        ApiClient::comments_for_post(self, post_id).await
    }

    async fn images_for_post(&self, post_id: i64) -> FeedClientResult<Vec<PostImage>> {
        ApiClient::images_for_post(self, post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalizes_slashes_and_adds_api_prefix() {
        let client = ApiClient::new("http://localhost:3000/");
        let full = client.endpoint("/posts");
        assert_eq!(full, "http://localhost:3000/api/posts");
    }

    #[test]
    fn post_response_decodes_bare_body() {
        let raw = r#"{"id":1,"description":"d","userId":2}"#;
        let dto: PostResponseDto = serde_json::from_str(raw).expect("should parse");
        let post = Post::from(dto);
        assert_eq!(post.id, 1);
    }

    #[test]
    fn post_response_decodes_wrapped_body() {
        let raw = r#"{"post":{"id":9,"description":"d","userId":2}}"#;
        let dto: PostResponseDto = serde_json::from_str(raw).expect("should parse");
        let post = Post::from(dto);
        assert_eq!(post.id, 9);
    }

    #[test]
    fn create_comment_payload_uses_camel_case_keys() {
        let payload = CreateCommentRequestDto {
            text: "hola",
            post_id: 1,
            user_id: 2,
        };
        let raw = serde_json::to_string(&payload).expect("should serialize");
        assert!(raw.contains("\"postId\":1"));
        assert!(raw.contains("\"userId\":2"));
    }

    #[test]
    fn find_tag_ignores_case_and_whitespace() {
        let tags = vec![
            Tag {
                id: 1,
                name: "Rust".to_string(),
            },
            Tag {
                id: 2,
                name: "web".to_string(),
            },
        ];
        let found = find_tag(&tags, "  rust ").expect("tag should be found");
        assert_eq!(found.id, 1);
        assert!(find_tag(&tags, "missing").is_none());
    }

    #[test]
    fn find_user_by_nick_ignores_case() {
        let users = vec![User {
            id: 4,
            nick_name: "Ana".to_string(),
            email: None,
        }];
        let found = find_user_by_nick(&users, "ana").expect("user should be found");
        assert_eq!(found.id, 4);
        assert!(find_user_by_nick(&users, "bob").is_none());
    }

    #[test]
    fn broken_success_body_maps_to_decode_error() {
        let err = decode_json::<Post>("<html>gateway timeout</html>").expect_err("should fail");
        assert!(matches!(err, FeedClientError::Decode(_)));
    }

    #[test]
    fn valid_success_body_decodes() {
        let post: Post =
            decode_json(r#"{"id":1,"description":"d","userId":2}"#).expect("should parse");
        assert_eq!(post.id, 1);
    }
}
