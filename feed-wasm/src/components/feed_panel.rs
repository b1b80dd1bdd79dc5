use leptos::ev::SubmitEvent;
use leptos::html::Div;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{IntersectionObserver, IntersectionObserverEntry};

use crate::api;
use crate::models::{Comment, FeedPost, Post};
use crate::state::AppState;

const PAGE_SIZE: u32 = 5;
const LOAD_ERROR_MESSAGE: &str = "Не удалось загрузить публикации. Попробуйте ещё раз.";

/// Дописывает новые публикации в конец, пропуская уже известные id.
fn merge_new_posts(existing: &mut Vec<FeedPost>, fetched: Vec<FeedPost>) -> usize {
    let mut appended = 0;
    for item in fetched {
        if existing.iter().all(|old| old.id() != item.id()) {
            existing.push(item);
            appended += 1;
        }
    }
    appended
}

/// Профильный режим: лента того же загрузчика, отфильтрованная по автору.
fn posts_by_author(posts: &[FeedPost], user_id: i64) -> Vec<FeedPost> {
    posts
        .iter()
        .filter(|item| item.post.user_id == user_id)
        .cloned()
        .collect()
}

/// Обогащение одной публикации; упавший подзапрос не выбрасывает её из ленты.
async fn enrich_post(post: Post) -> FeedPost {
    let comment_count = match api::comments_for_post(post.id).await {
        Ok(comments) => comments.len(),
        Err(_) => 0,
    };
    let image_urls = match api::images_for_post(post.id).await {
        Ok(images) => images.into_iter().map(|image| image.url).collect(),
        Err(_) => Vec::new(),
    };

    FeedPost {
        post,
        comment_count,
        image_urls,
    }
}

fn load_page(state: AppState, page: u32) {
    if state.loading.get_untracked() {
        return;
    }
    state.loading.set(true);
    state.clear_error();

    spawn_local(async move {
        match api::list_posts(page, PAGE_SIZE).await {
            Ok(fetched) => {
                let total_pages = fetched.total_pages;
                let mut enriched = Vec::with_capacity(fetched.posts.len());
                for post in fetched.posts {
                    enriched.push(enrich_post(post).await);
                }

                state.posts.update(|posts| {
                    merge_new_posts(posts, enriched);
                });
                state.has_more.set(page < total_pages);
            }
            Err(err) => {
                web_sys::console::error_1(&format!("Ошибка загрузки постов: {err}").into());
                state.set_error(LOAD_ERROR_MESSAGE);
            }
        }
        state.loading.set(false);
    });
}

#[component]
pub(crate) fn FeedPanel(state: AppState) -> impl IntoView {
    let sentinel = NodeRef::<Div>::new();
    let sentinel_visible = RwSignal::new(false);
    let observer_attached = StoredValue::new(false);

    let new_description = RwSignal::new(String::new());
    let new_image_url = RwSignal::new(String::new());

    // «мои публикации»: профильный срез общей ленты
    let show_only_mine = RwSignal::new(false);

    // комментарии раскрытой публикации
    let open_comments = RwSignal::new(None::<(i64, Vec<Comment>)>);
    let new_comment = RwSignal::new(String::new());

    // загрузка страницы при каждом изменении курсора (включая первую)
    {
        let state = state.clone();
        Effect::new(move |_| {
            let page = state.page.get();
            load_page(state.clone(), page);
        });
    }

    // наблюдатель за сторожевым элементом после последней публикации
    Effect::new(move |_| {
        if observer_attached.get_value() {
            return;
        }
        let Some(element) = sentinel.get() else {
            return;
        };

        let callback = Closure::<dyn FnMut(js_sys::Array, IntersectionObserver)>::new(
            move |entries: js_sys::Array, _observer: IntersectionObserver| {
                let visible = entries.iter().any(|entry| {
                    entry
                        .unchecked_into::<IntersectionObserverEntry>()
                        .is_intersecting()
                });
                sentinel_visible.set(visible);
            },
        );

        match IntersectionObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => {
                observer.observe(&element);
                observer_attached.set_value(true);
                // наблюдатель живёт столько же, сколько страница
                callback.forget();
            }
            Err(_) => {
                web_sys::console::warn_1(&"IntersectionObserver недоступен".into());
                drop(callback);
            }
        }
    });

    // «сторож виден, ничего не грузится, страницы остались» → следующая страница.
    // Видимость храним в сигнале, поэтому переход срабатывает и тогда, когда
    // сторож остался на экране на всё время загрузки.
    {
        let state = state.clone();
        Effect::new(move |_| {
            let visible = sentinel_visible.get();
            let loading = state.loading.get();
            let has_more = state.has_more.get();
            if visible && !loading && has_more {
                state.page.update(|page| *page += 1);
            }
        });
    }

    // реакция на «публикация удалена» из любого компонента
    {
        let state = state.clone();
        Effect::new(move |_| {
            if let Some(post_id) = state.deleted_post.get() {
                state.prune_post(post_id);
            }
        });
    }

    let on_create = Callback::new({
        let state = state.clone();
        move |ev: SubmitEvent| {
            ev.prevent_default();
            state.clear_error();

            let description = new_description.get().trim().to_string();
            if description.chars().count() < 3 {
                state.set_error("Текст публикации должен быть не короче 3 символов");
                return;
            }
            let Some(user) = state.user.get() else {
                state.set_error("Нужен вход для создания публикации");
                return;
            };
            let image_url = new_image_url.get().trim().to_string();

            state.loading.set(true);
            let state2 = state.clone();
            spawn_local(async move {
                match api::create_post(user.id, &description).await {
                    Ok(post) => {
                        let mut image_urls = Vec::new();
                        if !image_url.is_empty() {
                            match api::create_image(post.id, &image_url).await {
                                Ok(image) => image_urls.push(image.url),
                                Err(err) => web_sys::console::warn_1(
                                    &format!("картинка не привязана: {err}").into(),
                                ),
                            }
                        }

                        state2.posts.update(|posts| {
                            posts.insert(
                                0,
                                FeedPost {
                                    post,
                                    comment_count: 0,
                                    image_urls,
                                },
                            );
                        });
                        new_description.set(String::new());
                        new_image_url.set(String::new());
                        state2.clear_error();
                    }
                    Err(err) => state2.set_error(err.to_string()),
                }
                state2.loading.set(false);
            });
        }
    });

    let on_delete = Callback::new({
        let state = state.clone();
        move |post_id: i64| {
            state.clear_error();

            let state2 = state.clone();
            spawn_local(async move {
                match api::delete_post(post_id).await {
                    // вещаем удаление: ленту чистит подписанный эффект
                    Ok(()) => state2.deleted_post.set(Some(post_id)),
                    Err(err) => state2.set_error(err.to_string()),
                }
            });
        }
    });

    let on_toggle_comments = Callback::new({
        let state = state.clone();
        move |post_id: i64| {
            if open_comments.get().map(|(id, _)| id) == Some(post_id) {
                open_comments.set(None);
                return;
            }

            let state2 = state.clone();
            spawn_local(async move {
                match api::comments_for_post(post_id).await {
                    Ok(comments) => open_comments.set(Some((post_id, comments))),
                    Err(err) => state2.set_error(err.to_string()),
                }
            });
        }
    });

    let on_submit_comment = Callback::new({
        let state = state.clone();
        move |ev: SubmitEvent| {
            ev.prevent_default();

            let text = new_comment.get().trim().to_string();
            if text.is_empty() {
                return;
            }
            let Some(user) = state.user.get() else {
                state.set_error("Нужен вход, чтобы комментировать");
                return;
            };
            let Some((post_id, _)) = open_comments.get() else {
                return;
            };

            let state2 = state.clone();
            spawn_local(async move {
                match api::create_comment(post_id, user.id, &text).await {
                    Ok(_) => {
                        new_comment.set(String::new());
                        // перезапрашиваем список и обновляем счётчик в карточке
                        if let Ok(comments) = api::comments_for_post(post_id).await {
                            let count = comments.len();
                            open_comments.set(Some((post_id, comments)));
                            state2.posts.update(|posts| {
                                if let Some(item) =
                                    posts.iter_mut().find(|item| item.id() == post_id)
                                {
                                    item.comment_count = count;
                                }
                            });
                        }
                    }
                    Err(err) => state2.set_error(err.to_string()),
                }
            });
        }
    });

    let state_for_toggle = state.clone();
    let state_for_error = state.clone();
    let state_for_each = state.clone();
    let state_for_cards = state.clone();
    let state_for_footer = state.clone();

    view! {
        <h2>"Лента"</h2>

        <Show when={
            let state = state.clone();
            move || state.is_authenticated()
        }>
            <form on:submit=move |ev| on_create.run(ev)>
                <input
                    placeholder="что нового?"
                    prop:value=move || new_description.get()
                    on:input=move |ev| new_description.set(event_target_value(&ev))
                />
                <input
                    placeholder="URL картинки (необязательно)"
                    prop:value=move || new_image_url.get()
                    on:input=move |ev| new_image_url.set(event_target_value(&ev))
                />
                <button type="submit" disabled=move || state.loading.get()>
                    "Опубликовать"
                </button>
            </form>
        </Show>

        <Show when={
            let state = state_for_toggle.clone();
            move || state.is_authenticated()
        }>
            <button on:click=move |_| show_only_mine.update(|mine| *mine = !*mine)>
                {move || {
                    if show_only_mine.get() {
                        "Все публикации"
                    } else {
                        "Мои публикации"
                    }
                }}
            </button>
        </Show>

        // ошибка вытесняет ленту только пока публикаций ещё нет
        <Show when={
            let state = state_for_error.clone();
            move || state.posts.get().is_empty() && state.error.get().is_some()
        }>
            <p class="error">{move || state_for_error.error.get().unwrap_or_default()}</p>
        </Show>

        <ul>
            <For
                each=move || {
                    let posts = state_for_each.posts.get();
                    match state_for_each.user.get().filter(|_| show_only_mine.get()) {
                        Some(user) => posts_by_author(&posts, user.id),
                        None => posts,
                    }
                }
                key=|item| item.id()
                children=move |item| {
                    let state = state_for_cards.clone();
                    let post_id = item.id();
                    let author_id = item.post.user_id;
                    let author = item
                        .post
                        .author
                        .as_ref()
                        .map(|a| a.nick_name.clone())
                        .unwrap_or_else(|| format!("user {author_id}"));
                    let tags: Vec<String> =
                        item.post.tags.iter().map(|t| format!("#{}", t.name)).collect();
                    let image_urls = item.image_urls.clone();
                    let comment_count = item.comment_count;
                    let description = item.post.description.clone();

                    let is_open = move || {
                        open_comments.get().map(|(id, _)| id) == Some(post_id)
                    };

                    view! {
                        <li>
                            <p><strong>{format!("@{author}")}</strong></p>
                            <p>{description}</p>
                            <p>{tags.join(" ")}</p>
                            <ul>
                                {image_urls
                                    .into_iter()
                                    .map(|url| view! { <li><img src=url /></li> })
                                    .collect_view()}
                            </ul>
                            <button on:click=move |_| on_toggle_comments.run(post_id)>
                                {format!("Комментарии ({comment_count})")}
                            </button>

                            <Show when={
                                let state = state.clone();
                                move || {
                                    state
                                        .user
                                        .get()
                                        .is_some_and(|user| user.id == author_id)
                                }
                            }>
                                <button on:click=move |_| on_delete.run(post_id)>
                                    "Удалить"
                                </button>
                            </Show>

                            <Show when=is_open>
                                <ul>
                                    {move || {
                                        open_comments
                                            .get()
                                            .map(|(_, comments)| comments)
                                            .unwrap_or_default()
                                            .into_iter()
                                            .map(|comment| {
                                                let author = comment
                                                    .author
                                                    .as_ref()
                                                    .map(|a| a.nick_name.clone())
                                                    .unwrap_or_else(|| {
                                                        format!("user {}", comment.user_id)
                                                    });
                                                view! {
                                                    <li>
                                                        <strong>{format!("@{author}: ")}</strong>
                                                        {comment.text.clone()}
                                                    </li>
                                                }
                                            })
                                            .collect_view()
                                    }}
                                </ul>
                                <form on:submit=move |ev| on_submit_comment.run(ev)>
                                    <input
                                        placeholder="Ваш комментарий..."
                                        prop:value=move || new_comment.get()
                                        on:input=move |ev| new_comment.set(event_target_value(&ev))
                                    />
                                    <button type="submit">"Отправить"</button>
                                </form>
                            </Show>
                        </li>
                    }
                }
            />
        </ul>

        <Show when={
            let state = state_for_footer.clone();
            move || state.loading.get()
        }>
            <p>"Загрузка..."</p>
        </Show>

        // сторож: его видимость решает, пора ли тянуть следующую страницу
        <div node_ref=sentinel></div>

        <Show when={
            let state = state_for_footer.clone();
            move || !state.has_more.get()
        }>
            <p>"Больше публикаций нет."</p>
        </Show>
    }
}
