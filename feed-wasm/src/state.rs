use leptos::prelude::*;

use crate::models::{FeedPost, User};

/// Реактивное состояние приложения.
///
/// `deleted_post` — браузерный аналог канала «публикация удалена»: любой
/// компонент, удаливший публикацию, пишет сюда id, а каждая смонтированная
/// лента вычищает его у себя.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub(crate) user: RwSignal<Option<User>>,
    pub(crate) posts: RwSignal<Vec<FeedPost>>,
    pub(crate) page: RwSignal<u32>,
    pub(crate) has_more: RwSignal<bool>,
    pub(crate) loading: RwSignal<bool>,
    pub(crate) error: RwSignal<Option<String>>,
    pub(crate) deleted_post: RwSignal<Option<i64>>,
}

impl AppState {
    pub(crate) fn new() -> Self {
        Self {
            user: RwSignal::new(None),
            posts: RwSignal::new(Vec::new()),
            page: RwSignal::new(1),
            has_more: RwSignal::new(true),
            loading: RwSignal::new(false),
            error: RwSignal::new(None),
            deleted_post: RwSignal::new(None),
        }
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        self.error.set(Some(message.into()));
    }

    pub(crate) fn clear_error(&self) {
        self.error.set(None);
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.user.get().is_some()
    }

    /// Убирает публикацию из ленты; курсор пагинации не трогаем.
    pub(crate) fn prune_post(&self, post_id: i64) {
        self.posts.update(|posts| posts.retain(|p| p.id() != post_id));
    }
}
