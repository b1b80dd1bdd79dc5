use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use feed_client::{
    Comment, DeletionNotifier, FeedApi, FeedClientError, FeedClientResult, FeedEvent, FeedLoader,
    FeedPost, LOAD_ERROR_MESSAGE, PaginationTrigger, Post, PostImage, PostPage,
};

fn post(id: i64) -> Post {
    Post {
        id,
        description: format!("post {id}"),
        user_id: 1,
        author: None,
        tags: Vec::new(),
        created_at: None,
        updated_at: None,
    }
}

fn comment(id: i64, post_id: i64) -> Comment {
    Comment {
        id,
        text: format!("comment {id}"),
        post_id,
        user_id: 1,
        created_at: None,
        author: None,
    }
}

/// Сценарный поставщик данных: страницы по номерам, счётчики комментариев
/// и картинки по id публикации, инъекция ошибок на любом уровне.
#[derive(Default)]
struct ScriptedApi {
    pages: HashMap<u32, Vec<i64>>,
    total_pages: u32,
    comment_counts: HashMap<i64, usize>,
    image_urls: HashMap<i64, Vec<String>>,
    authors: HashMap<i64, i64>,
    failing_pages: Arc<Mutex<HashSet<u32>>>,
    failing_comments: HashSet<i64>,
    failing_images: HashSet<i64>,
    page_calls: Arc<AtomicUsize>,
    hold_pages: Option<Arc<Notify>>,
}

impl ScriptedApi {
    fn with_pages(pages: &[(u32, &[i64])], total_pages: u32) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(page, ids)| (*page, ids.to_vec()))
                .collect(),
            total_pages,
            ..Self::default()
        }
    }

    /// Handle для инъекции ошибок страниц после передачи API загрузчику.
    fn failures(&self) -> Arc<Mutex<HashSet<u32>>> {
        Arc::clone(&self.failing_pages)
    }

    /// Handle счётчика реальных запросов страниц.
    fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.page_calls)
    }
}

#[async_trait]
impl FeedApi for ScriptedApi {
    async fn fetch_page(&self, page: u32, _limit: u32) -> FeedClientResult<PostPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(hold) = &self.hold_pages {
            hold.notified().await;
        }

        if self
            .failing_pages
            .lock()
            .expect("failing pages lock")
            .contains(&page)
        {
            return Err(FeedClientError::InvalidRequest(format!(
                "page {page} is down"
            )));
        }

        let ids = self.pages.get(&page).cloned().unwrap_or_default();
        Ok(PostPage {
            posts: ids
                .into_iter()
                .map(|id| {
                    let mut item = post(id);
                    if let Some(user_id) = self.authors.get(&id) {
                        item.user_id = *user_id;
                    }
                    item
                })
                .collect(),
            total_pages: self.total_pages,
        })
    }

    async fn comments_for_post(&self, post_id: i64) -> FeedClientResult<Vec<Comment>> {
        if self.failing_comments.contains(&post_id) {
            return Err(FeedClientError::InvalidRequest(format!(
                "comments for {post_id} are down"
            )));
        }
        let count = self.comment_counts.get(&post_id).copied().unwrap_or(0);
        Ok((0..count).map(|n| comment(n as i64, post_id)).collect())
    }

    async fn images_for_post(&self, post_id: i64) -> FeedClientResult<Vec<PostImage>> {
        if self.failing_images.contains(&post_id) {
            return Err(FeedClientError::InvalidRequest(format!(
                "images for {post_id} are down"
            )));
        }
        let urls = self.image_urls.get(&post_id).cloned().unwrap_or_default();
        Ok(urls
            .into_iter()
            .enumerate()
            .map(|(n, url)| PostImage {
                id: n as i64,
                url,
                post_id,
            })
            .collect())
    }
}

fn ids(loader: &FeedLoader<ScriptedApi>) -> Vec<i64> {
    loader.snapshot().items().iter().map(FeedPost::id).collect()
}

#[tokio::test]
async fn overlapping_pages_are_deduplicated_in_order() {
    // сервер вернул id=5 дважды: конкурентная вставка сдвинула offset'ы
    let api = ScriptedApi::with_pages(&[(1, &[1, 2, 3, 4, 5]), (2, &[5, 6, 7, 8, 9])], 2);
    let loader = FeedLoader::new(api, 5);

    assert!(loader.fetch_page(1).await.expect("page 1 should load"));
    assert!(loader.fetch_page(2).await.expect("page 2 should load"));

    assert_eq!(ids(&loader), [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert!(!loader.snapshot().has_more());
}

#[tokio::test]
async fn successful_fetch_never_shrinks_the_feed() {
    let api = ScriptedApi::with_pages(&[(1, &[1, 2]), (2, &[1, 2])], 2);
    let loader = FeedLoader::new(api, 2);

    loader.fetch_page(1).await.expect("page 1 should load");
    let before = loader.snapshot().items().len();
    loader.fetch_page(2).await.expect("page 2 should load");

    assert!(loader.snapshot().items().len() >= before);
    assert_eq!(ids(&loader), [1, 2]);
}

#[tokio::test]
async fn enrichment_failure_keeps_the_post_with_defaults() {
    let mut api = ScriptedApi::with_pages(&[(1, &[1, 2, 3])], 1);
    api.comment_counts = HashMap::from([(1, 4), (2, 2), (3, 1)]);
    api.image_urls = HashMap::from([
        (1, vec!["a.png".to_string()]),
        (2, vec!["b.png".to_string()]),
        (3, vec!["c.png".to_string()]),
    ]);
    // у поста 2 падают комментарии, у поста 3 — картинки
    api.failing_comments = HashSet::from([2]);
    api.failing_images = HashSet::from([3]);

    let loader = FeedLoader::new(api, 3);
    loader.fetch_page(1).await.expect("page should load");

    let state = loader.snapshot();
    assert_eq!(ids(&loader), [1, 2, 3]);

    let by_id: HashMap<i64, &FeedPost> =
        state.items().iter().map(|item| (item.id(), item)).collect();
    assert_eq!(by_id[&1].comment_count, 4);
    assert_eq!(by_id[&1].image_urls, ["a.png"]);

    // упавшее поле по нулям, уцелевшее — как есть
    assert_eq!(by_id[&2].comment_count, 0);
    assert_eq!(by_id[&2].image_urls, ["b.png"]);
    assert_eq!(by_id[&3].comment_count, 1);
    assert!(by_id[&3].image_urls.is_empty());
}

#[tokio::test]
async fn trigger_stops_after_the_last_page() {
    let api = ScriptedApi::with_pages(&[(1, &[1]), (2, &[2]), (3, &[3])], 3);
    let calls = api.calls();
    let loader = FeedLoader::new(api, 1);
    let mut trigger = PaginationTrigger::new();

    // эмуляция UI-цикла: сторож виден, пока есть страницы
    loop {
        let state = loader.snapshot();
        if !trigger.on_visibility(true, state.is_loading(), state.has_more()) {
            break;
        }
        loader.fetch_next().await.expect("next page should load");
        trigger.rearm();
    }

    let state = loader.snapshot();
    assert_eq!(state.current_page(), 3);
    assert!(!state.has_more());
    assert_eq!(ids(&loader), [1, 2, 3]);

    // дальнейшие отчёты о видимости ничего не запускают
    for _ in 0..5 {
        let state = loader.snapshot();
        assert!(!trigger.on_visibility(true, state.is_loading(), state.has_more()));
        trigger.rearm();
    }
    assert!(!loader.fetch_next().await.expect("fetch_next should be a no-op"));
    assert_eq!(loader.snapshot().current_page(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn concurrent_fetches_collapse_into_one_request() {
    let hold = Arc::new(Notify::new());
    let mut api = ScriptedApi::with_pages(&[(1, &[1, 2, 3])], 1);
    api.hold_pages = Some(Arc::clone(&hold));
    let calls = api.calls();

    let loader = Arc::new(FeedLoader::new(api, 3));

    let mut handles = Vec::new();
    for _ in 0..3 {
        let loader = Arc::clone(&loader);
        handles.push(tokio::spawn(async move { loader.fetch_page(1).await }));
    }

    // даём задачам дойти до кооперативного замка
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    hold.notify_waiters();

    let mut fetched = 0;
    for handle in handles {
        if handle
            .await
            .expect("task should not panic")
            .expect("fetch should not fail")
        {
            fetched += 1;
        }
    }

    assert_eq!(fetched, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ids(&loader), [1, 2, 3]);
}

#[tokio::test]
async fn deletion_broadcast_prunes_without_touching_the_cursor() {
    let api = ScriptedApi::with_pages(&[(1, &[1, 2, 3, 4, 5])], 2);
    let notifier = DeletionNotifier::new();
    let loader = FeedLoader::with_notifier(api, 5, &notifier);

    loader.fetch_page(1).await.expect("page should load");
    assert_eq!(ids(&loader), [1, 2, 3, 4, 5]);

    notifier.broadcast(FeedEvent::PostDeleted { post_id: 3 });

    let state = loader.snapshot();
    assert_eq!(ids(&loader), [1, 2, 4, 5]);
    assert_eq!(state.current_page(), 1);
    assert!(state.has_more());

    // повторное удаление и незнакомый id — no-op
    notifier.broadcast(FeedEvent::PostDeleted { post_id: 3 });
    notifier.broadcast(FeedEvent::PostDeleted { post_id: 99 });
    assert_eq!(ids(&loader), [1, 2, 4, 5]);
}

#[tokio::test]
async fn profile_view_filters_the_loaded_feed_by_author() {
    // публикации разных авторов вперемешку, как их отдаёт сервер
    let mut api = ScriptedApi::with_pages(&[(1, &[1, 2]), (2, &[3, 4])], 2);
    api.authors = HashMap::from([(1, 7), (3, 7)]);
    let loader = FeedLoader::new(api, 2);

    loader.fetch_page(1).await.expect("page 1 should load");
    loader.fetch_page(2).await.expect("page 2 should load");

    let state = loader.snapshot();
    let mine: Vec<i64> = state.items_by_author(7).map(FeedPost::id).collect();
    assert_eq!(mine, [1, 3]);
    // общая лента тем же загрузчиком видна целиком
    assert_eq!(ids(&loader), [1, 2, 3, 4]);
}

#[tokio::test]
async fn independent_feeds_stay_consistent_through_the_notifier() {
    let notifier = DeletionNotifier::new();
    let home = FeedLoader::with_notifier(
        ScriptedApi::with_pages(&[(1, &[1, 2, 3])], 1),
        3,
        &notifier,
    );
    let profile = FeedLoader::with_notifier(
        ScriptedApi::with_pages(&[(1, &[2, 3])], 1),
        2,
        &notifier,
    );

    home.fetch_page(1).await.expect("home feed should load");
    profile.fetch_page(1).await.expect("profile feed should load");
    assert_eq!(notifier.listener_count(), 2);

    notifier.broadcast(FeedEvent::PostDeleted { post_id: 2 });
    assert_eq!(ids(&home), [1, 3]);
    assert_eq!(ids(&profile), [3]);

    // подписка умирает вместе с лентой
    drop(profile);
    assert_eq!(notifier.listener_count(), 1);
}

#[tokio::test]
async fn page_failure_rolls_back_and_allows_retry() {
    let api = ScriptedApi::with_pages(&[(1, &[1, 2])], 1);
    let failures = api.failures();
    failures.lock().expect("failures lock").insert(1);
    let loader = FeedLoader::new(api, 2);

    let err = loader
        .fetch_page(1)
        .await
        .expect_err("first attempt should fail");
    assert!(matches!(err, FeedClientError::InvalidRequest(_)));

    let state = loader.snapshot();
    assert!(state.items().is_empty());
    assert_eq!(state.current_page(), 0);
    assert!(state.has_more());
    assert!(!state.is_loading());
    assert_eq!(state.last_error(), Some(LOAD_ERROR_MESSAGE));
    // пока публикаций нет, ошибка видна пользователю
    assert_eq!(state.visible_error(), Some(LOAD_ERROR_MESSAGE));

    // сервер ожил — повтор той же страницы проходит
    failures.lock().expect("failures lock").remove(&1);
    assert!(loader.fetch_page(1).await.expect("retry should load"));
    let state = loader.snapshot();
    assert_eq!(ids(&loader), [1, 2]);
    assert!(state.last_error().is_none());
}

#[tokio::test]
async fn error_does_not_displace_already_loaded_items() {
    let api = ScriptedApi::with_pages(&[(1, &[1, 2]), (2, &[3, 4])], 2);
    let failures = api.failures();
    let loader = FeedLoader::new(api, 2);

    loader.fetch_page(1).await.expect("page 1 should load");
    failures.lock().expect("failures lock").insert(2);

    loader
        .fetch_page(2)
        .await
        .expect_err("page 2 should fail");

    let state = loader.snapshot();
    assert_eq!(ids(&loader), [1, 2]);
    assert_eq!(state.last_error(), Some(LOAD_ERROR_MESSAGE));
    // накопленная лента важнее баннера с ошибкой
    assert!(state.visible_error().is_none());
}

#[tokio::test]
async fn reset_starts_the_feed_from_scratch() {
    let api = ScriptedApi::with_pages(&[(1, &[1, 2])], 1);
    let loader = FeedLoader::new(api, 2);

    loader.fetch_page(1).await.expect("page should load");
    assert!(!loader.snapshot().has_more());

    loader.reset();
    let state = loader.snapshot();
    assert!(state.items().is_empty());
    assert_eq!(state.current_page(), 0);
    assert!(state.has_more());

    // та же страница загружается заново
    assert!(loader.fetch_next().await.expect("page should reload"));
    assert_eq!(ids(&loader), [1, 2]);
}
