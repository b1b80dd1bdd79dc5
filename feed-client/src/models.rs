use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Публичная модель пользователя.
///
/// Бэкенд не хранит пароли: `nick_name` — единственный идентификатор входа.
pub struct User {
    /// Идентификатор пользователя.
    pub id: i64,
    /// Никнейм (логин).
    #[serde(rename = "nickName")]
    pub nick_name: String,
    /// Email (бэкенд может не возвращать).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Тег публикации.
pub struct Tag {
    /// Идентификатор тега.
    pub id: i64,
    /// Имя тега.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Комментарий к публикации.
pub struct Comment {
    /// Идентификатор комментария.
    pub id: i64,
    /// Текст комментария.
    pub text: String,
    /// Идентификатор публикации.
    #[serde(rename = "postId")]
    pub post_id: i64,
    /// Идентификатор автора.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Дата и время создания (UTC), если бэкенд их вернул.
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Данные автора, если бэкенд их вернул.
    #[serde(default)]
    pub author: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Картинка, привязанная к публикации (хранится отдельно от поста).
pub struct PostImage {
    /// Идентификатор картинки.
    pub id: i64,
    /// URL картинки.
    pub url: String,
    /// Идентификатор публикации.
    #[serde(rename = "postId")]
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публикация, как её возвращает бэкенд.
///
/// Счётчик комментариев и список картинок сюда не входят — их собирает
/// [`crate::FeedLoader`] отдельными запросами (см. [`crate::FeedPost`]).
pub struct Post {
    /// Идентификатор публикации.
    pub id: i64,
    /// Текст публикации.
    pub description: String,
    /// Идентификатор автора.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Данные автора, если бэкенд их вернул.
    #[serde(default)]
    pub author: Option<User>,
    /// Теги в порядке, который вернул бэкенд.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Дата и время создания (UTC), если бэкенд их вернул.
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Дата и время последнего обновления (UTC), если бэкенд их вернул.
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
/// Одна страница публикаций из `GET /posts?page&limit`.
pub struct PostPage {
    /// Публикации текущей страницы в порядке выдачи сервера.
    pub posts: Vec<Post>,
    /// Общее число страниц по данным сервера.
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}
