//! Клиентская библиотека соцсети: типизированный HTTP-клиент REST API
//! и ядро ленты.
//!
//! Основные части:
//! - [`ApiClient`] — тонкий клиент бэкенда (`reqwest`);
//! - [`FeedLoader`] — постраничный загрузчик ленты с обогащением,
//!   дедупликацией по id и реакцией на удаления;
//! - [`DeletionNotifier`] — внутрипроцессный канал «публикация удалена»
//!   для согласованности независимых лент (главная, профиль);
//! - [`PaginationTrigger`] — когда тянуть следующую страницу;
//! - [`SessionStore`] — сессия пользователя (бэкенд не хранит паролей,
//!   вход — подбор пользователя по никнейму).
#![warn(missing_docs)]

mod error;
mod feed;
mod http_client;
mod models;
mod notifier;
mod session;
mod trigger;
pub mod validate;

pub use error::{FeedClientError, FeedClientResult};
pub use feed::{FeedApi, FeedLoader, FeedPost, FeedState, LOAD_ERROR_MESSAGE};
pub use http_client::ApiClient;
pub use models::{Comment, Post, PostImage, PostPage, Tag, User};
pub use notifier::{DeletionNotifier, FeedEvent, Subscription};
pub use session::{FileSessionStore, SessionStore};
pub use trigger::PaginationTrigger;
