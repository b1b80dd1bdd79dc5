use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::state::AppState;
use crate::storage;

/// Вход и регистрация по никнейму.
///
/// Пароля у бэкенда нет: вход — это поиск никнейма в списке пользователей,
/// регистрация — создание новой записи.
#[component]
pub(crate) fn AuthPanel(state: AppState) -> impl IntoView {
    let reg_nickname = RwSignal::new(String::new());
    let reg_email = RwSignal::new(String::new());

    let login_nickname = RwSignal::new(String::new());

    let on_register = {
        let state = state.clone();
        move |ev: SubmitEvent| {
            ev.prevent_default();
            state.clear_error();

            let nickname = reg_nickname.get().trim().to_string();
            let email = reg_email.get().trim().to_string();

            if nickname.chars().count() < 3 {
                state.set_error("Никнейм должен быть не короче 3 символов");
                return;
            }

            state.loading.set(true);
            let state2 = state.clone();
            spawn_local(async move {
                let email = if email.is_empty() { None } else { Some(email.as_str()) };
                match api::create_user(&nickname, email).await {
                    Ok(user) => {
                        if let Err(err) = storage::save_user(&user) {
                            state2.set_error(err);
                        } else {
                            state2.user.set(Some(user));
                            state2.clear_error();
                        }
                    }
                    Err(err) => state2.set_error(err.to_string()),
                }
                state2.loading.set(false);
            });
        }
    };

    let on_login = {
        let state = state.clone();
        move |ev: SubmitEvent| {
            ev.prevent_default();
            state.clear_error();

            let nickname = login_nickname.get().trim().to_string();
            if nickname.is_empty() {
                state.set_error("Введите никнейм");
                return;
            }

            state.loading.set(true);
            let state2 = state.clone();
            spawn_local(async move {
                match api::list_users().await {
                    Ok(users) => {
                        let found = users.into_iter().find(|user| {
                            user.nick_name.eq_ignore_ascii_case(&nickname)
                        });
                        match found {
                            Some(user) => {
                                if let Err(err) = storage::save_user(&user) {
                                    state2.set_error(err);
                                } else {
                                    state2.user.set(Some(user));
                                    state2.clear_error();
                                }
                            }
                            None => state2.set_error("Пользователь не найден"),
                        }
                    }
                    Err(err) => state2.set_error(err.to_string()),
                }
                state2.loading.set(false);
            });
        }
    };

    let on_logout = {
        let state = state.clone();
        move |_| {
            if let Err(err) = storage::clear_user() {
                state.set_error(err);
                return;
            }
            state.user.set(None);
            state.clear_error();
        }
    };

    view! {
        <Show when={
            let state = state.clone();
            move || state.is_authenticated()
        }>
            <button on:click=on_logout disabled={
                let state = state.clone();
                move || state.loading.get()
            }>
                "Выйти"
            </button>
        </Show>

        <h2>"Вход"</h2>
        <form on:submit=on_login>
            <input
                placeholder="никнейм"
                on:input=move |ev| login_nickname.set(event_target_value(&ev))
            />
            <button type="submit" disabled={
                let state = state.clone();
                move || state.loading.get()
            }>
                "Войти"
            </button>
        </form>

        <h2 style="margin-top: 1rem;">"Регистрация"</h2>
        <form on:submit=on_register>
            <input
                placeholder="никнейм"
                on:input=move |ev| reg_nickname.set(event_target_value(&ev))
            />
            <input
                placeholder="email (необязательно)"
                on:input=move |ev| reg_email.set(event_target_value(&ev))
            />
            <button type="submit" disabled=move || state.loading.get()>
                "Зарегистрироваться"
            </button>
        </form>

        <hr style="margin: 1rem 0;" />
    }
}
