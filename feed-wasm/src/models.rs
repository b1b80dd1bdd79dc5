use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nickName")]
    pub nick_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    #[serde(rename = "postId")]
    pub post_id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub author: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostImage {
    pub id: i64,
    pub url: String,
    #[serde(rename = "postId")]
    pub post_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: i64,
    pub description: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

/// Публикация, обогащённая для ленты (счётчик комментариев + картинки).
#[derive(Debug, Clone)]
pub struct FeedPost {
    pub post: Post,
    pub comment_count: usize,
    pub image_urls: Vec<String>,
}

impl FeedPost {
    pub fn id(&self) -> i64 {
        self.post.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    #[serde(rename = "nickName")]
    pub nick_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePostRequest {
    pub description: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest {
    pub text: String,
    #[serde(rename = "postId")]
    pub post_id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateImageRequest {
    pub url: String,
    #[serde(rename = "postId")]
    pub post_id: i64,
}
