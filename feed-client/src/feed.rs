use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::FeedClientResult;
use crate::models::{Comment, Post, PostImage, PostPage};
use crate::notifier::{DeletionNotifier, FeedEvent, Subscription};

/// Текст, попадающий в `last_error` при неудачной загрузке страницы.
pub const LOAD_ERROR_MESSAGE: &str = "Не удалось загрузить публикации. Попробуйте ещё раз.";

#[async_trait]
/// Поставщик данных ленты.
///
/// Шов для тестов: продакшен-реализация — [`crate::ApiClient`], в тестах
/// загрузчик получает mock со сценарными страницами и инъекцией ошибок.
pub trait FeedApi: Send + Sync {
    /// Возвращает страницу публикаций (`page` считается с единицы).
    async fn fetch_page(&self, page: u32, limit: u32) -> FeedClientResult<PostPage>;

    /// Возвращает комментарии публикации.
    async fn comments_for_post(&self, post_id: i64) -> FeedClientResult<Vec<Comment>>;

    /// Возвращает картинки публикации.
    async fn images_for_post(&self, post_id: i64) -> FeedClientResult<Vec<PostImage>>;
}

#[derive(Debug, Clone)]
/// Публикация, обогащённая производными данными для ленты.
pub struct FeedPost {
    /// Исходная публикация.
    pub post: Post,
    /// Число комментариев (0, если подзапрос не удался).
    pub comment_count: usize,
    /// URL картинок (пусто, если подзапрос не удался).
    pub image_urls: Vec<String>,
}

impl FeedPost {
    /// Идентификатор публикации — ключ дедупликации.
    pub fn id(&self) -> i64 {
        self.post.id
    }
}

#[derive(Debug, Clone)]
/// Накопленное состояние одной ленты.
///
/// Порядок `items` — порядок прихода публикаций по страницам, не порядок
/// идентификаторов. Для поиска дубликатов рядом с списком живёт множество
/// id; оба обновляются вместе при каждом добавлении и удалении.
pub struct FeedState {
    items: Vec<FeedPost>,
    seen_ids: HashSet<i64>,
    current_page: u32,
    has_more: bool,
    is_loading: bool,
    last_error: Option<String>,
}

impl FeedState {
    /// Пустая лента: ни одной загруженной страницы, `has_more` = true.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            seen_ids: HashSet::new(),
            current_page: 0,
            has_more: true,
            is_loading: false,
            last_error: None,
        }
    }

    /// Накопленные публикации в порядке прихода.
    pub fn items(&self) -> &[FeedPost] {
        &self.items
    }

    /// Публикации одного автора в порядке прихода.
    ///
    /// Профильная лента — та же лента, отфильтрованная на клиенте: сервер
    /// отдаёт только общий постраничный список.
    pub fn items_by_author(&self, user_id: i64) -> impl Iterator<Item = &FeedPost> {
        self.items
            .iter()
            .filter(move |item| item.post.user_id == user_id)
    }

    /// Последняя успешно загруженная страница (0, если лента пуста).
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Остались ли незагруженные страницы по данным сервера.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Идёт ли сейчас загрузка страницы.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Сообщение последней неудачной загрузки (сбрасывается при новой попытке).
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Ошибка, которую стоит показать вместо ленты.
    ///
    /// Пока накопленные публикации есть, ошибка не вытесняет их; лента и
    /// ошибка никогда не показываются одновременно.
    pub fn visible_error(&self) -> Option<&str> {
        if self.items.is_empty() {
            self.last_error()
        } else {
            None
        }
    }

    /// Дописывает страницу в конец ленты, пропуская уже известные id.
    ///
    /// Возвращает число реально добавленных публикаций.
    fn merge_page(&mut self, page: u32, total_pages: u32, enriched: Vec<FeedPost>) -> usize {
        let mut appended = 0;
        for item in enriched {
            if self.seen_ids.insert(item.id()) {
                self.items.push(item);
                appended += 1;
            }
        }

        self.current_page = page;
        self.has_more = page < total_pages;
        appended
    }

    /// Удаляет публикацию по id; отсутствующий id — no-op.
    ///
    /// `current_page` и `has_more` не трогаем: удаление ничего не говорит о
    /// числе страниц на сервере, следующая загрузка продолжается с того же
    /// курсора (страница может прийти «недозаполненной» — это ожидаемо).
    fn remove(&mut self, post_id: i64) -> bool {
        if !self.seen_ids.remove(&post_id) {
            return false;
        }
        self.items.retain(|item| item.id() != post_id);
        true
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Инкрементальный загрузчик ленты.
///
/// Постранично тянет публикации, обогащает каждую счётчиком комментариев и
/// списком картинок, сливает результат в дедуплицированный список и
/// реагирует на широковещательные уведомления об удалении.
pub struct FeedLoader<A: FeedApi + 'static> {
    api: Arc<A>,
    page_size: u32,
    state: Arc<Mutex<FeedState>>,
    _deletions: Option<Subscription>,
}

impl<A: FeedApi + 'static> FeedLoader<A> {
    /// Создаёт загрузчик без подписки на удаления.
    pub fn new(api: A, page_size: u32) -> Self {
        Self {
            api: Arc::new(api),
            page_size,
            state: Arc::new(Mutex::new(FeedState::new())),
            _deletions: None,
        }
    }

    /// Создаёт загрузчик и подписывает его на канал удалений.
    ///
    /// Подписка живёт ровно столько же, сколько загрузчик, и снимается
    /// при его drop.
    pub fn with_notifier(api: A, page_size: u32, notifier: &DeletionNotifier) -> Self {
        let mut loader = Self::new(api, page_size);

        let state = Arc::downgrade(&loader.state);
        let subscription = notifier.subscribe(move |event| {
            let FeedEvent::PostDeleted { post_id } = *event;
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut state = state.lock().expect("feed state poisoned");
            if state.remove(post_id) {
                debug!(post_id, "post pruned after deletion broadcast");
            }
        });

        loader._deletions = Some(subscription);
        loader
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().expect("feed state poisoned")
    }

    /// Копия текущего состояния ленты.
    pub fn snapshot(&self) -> FeedState {
        self.lock().clone()
    }

    /// Загружает страницу `page` (с единицы) и сливает её в ленту.
    ///
    /// Возвращает `false`, если загрузка уже идёт: повторный вызов во время
    /// полёта запроса молча игнорируется, это не ошибка. При ошибке самой
    /// страницы состояние остаётся как до попытки (кроме `last_error`),
    /// так что ту же страницу можно запросить повторно.
    pub async fn fetch_page(&self, page: u32) -> FeedClientResult<bool> {
        {
            let mut state = self.lock();
            if state.is_loading {
                debug!(page, "fetch skipped: a page load is already in flight");
                return Ok(false);
            }
            state.is_loading = true;
            state.last_error = None;
        }

        let fetched = match self.api.fetch_page(page, self.page_size).await {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(page, error = %err, "page fetch failed");
                let mut state = self.lock();
                state.is_loading = false;
                state.last_error = Some(LOAD_ERROR_MESSAGE.to_string());
                return Err(err);
            }
        };

        let total_pages = fetched.total_pages;
        let enriched = self.enrich_page(fetched.posts).await;

        let mut state = self.lock();
        let appended = state.merge_page(page, total_pages, enriched);
        state.is_loading = false;
        debug!(
            page,
            appended,
            total = state.items.len(),
            has_more = state.has_more,
            "page merged into feed"
        );
        Ok(true)
    }

    /// Загружает следующую страницу после уже накопленных.
    ///
    /// Возвращает `false`, если загрузка уже идёт или страницы закончились.
    pub async fn fetch_next(&self) -> FeedClientResult<bool> {
        let page = {
            let state = self.lock();
            if state.is_loading || !state.has_more {
                return Ok(false);
            }
            state.current_page + 1
        };

        self.fetch_page(page).await
    }

    /// Удаляет публикацию из локального представления. Идемпотентно.
    pub fn remove_post(&self, post_id: i64) {
        let mut state = self.lock();
        if state.remove(post_id) {
            debug!(post_id, "post removed from feed");
        }
    }

    /// Сбрасывает ленту в исходное пустое состояние (страница 1, items=[]).
    pub fn reset(&self) {
        *self.lock() = FeedState::new();
    }

    /// Обогащает публикации страницы параллельно, сохраняя порядок сервера.
    ///
    /// Это точка соединения: слияние страницы не начинается, пока не
    /// завершатся (или мягко не провалятся) все подзапросы.
    async fn enrich_page(&self, posts: Vec<Post>) -> Vec<FeedPost> {
        let total = posts.len();
        let mut tasks = JoinSet::new();
        for (index, post) in posts.into_iter().enumerate() {
            let api = Arc::clone(&self.api);
            tasks.spawn(async move { (index, enrich_post(api.as_ref(), post).await) });
        }

        let mut slots: Vec<Option<FeedPost>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, item)) => slots[index] = Some(item),
                Err(err) => warn!(error = %err, "enrichment task failed to join"),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

impl<A: FeedApi + 'static> std::fmt::Debug for FeedLoader<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedLoader")
            .field("page_size", &self.page_size)
            .field("state", &self.lock())
            .finish()
    }
}

/// Отказ любого подзапроса не выбрасывает публикацию и не валит страницу:
/// несработавшее поле просто остаётся пустым.
async fn enrich_post<A: FeedApi + ?Sized>(api: &A, post: Post) -> FeedPost {
    let (comments, images) = tokio::join!(
        api.comments_for_post(post.id),
        api.images_for_post(post.id)
    );

    let comment_count = match comments {
        Ok(comments) => comments.len(),
        Err(err) => {
            debug!(post_id = post.id, error = %err, "comment sub-fetch failed, count defaults to 0");
            0
        }
    };

    let image_urls = match images {
        Ok(images) => images.into_iter().map(|image| image.url).collect(),
        Err(err) => {
            debug!(post_id = post.id, error = %err, "image sub-fetch failed, urls default to empty");
            Vec::new()
        }
    };

    FeedPost {
        post,
        comment_count,
        image_urls,
    }
}
