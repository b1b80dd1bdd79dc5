use leptos::prelude::*;

use crate::components::auth_panel::AuthPanel;
use crate::components::feed_panel::FeedPanel;
use crate::state::AppState;
use crate::storage;

#[component]
pub fn App() -> impl IntoView {
    let state = AppState::new();

    // восстанавливаем сессию из localStorage
    if let Some(user) = storage::load_user() {
        state.user.set(Some(user));
    }

    let user_text = {
        let state = state.clone();
        move || {
            state
                .user
                .get()
                .map(|user| format!("@{}", user.nick_name))
                .unwrap_or_else(|| "гость".to_string())
        }
    };

    let error_text = {
        let state = state.clone();
        move || state.error.get().unwrap_or_default()
    };

    // баннер об ошибке не должен вытеснять уже показанную ленту
    let show_error = {
        let state = state.clone();
        move || state.error.get().is_some() && state.posts.get().is_empty()
    };

    view! {
        <main class="page">
            <section class="container">
                <h1>"UnaHur — анти-соцсеть"</h1>
                <p>"Вы вошли как: " {user_text}</p>

                <AuthPanel state=state.clone() />

                <Show when=show_error>
                    <div class="error-banner">
                        <strong>"Ошибка: "</strong>
                        {error_text}
                    </div>
                </Show>

                <FeedPanel state=state.clone() />
            </section>
        </main>
    }
}
