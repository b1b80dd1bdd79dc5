use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Типизированное сообщение широковещательного канала ленты.
pub enum FeedEvent {
    /// Публикация удалена (после подтверждённого удаления на сервере).
    PostDeleted {
        /// Идентификатор удалённой публикации.
        post_id: i64,
    },
}

type Listener = Arc<Mutex<dyn FnMut(&FeedEvent) + Send>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
}

#[derive(Clone, Default)]
/// Внутрипроцессный канал «публикация удалена».
///
/// Явный injectable-сервис вместо глобальной шины: каждая лента получает
/// [`Subscription`] при создании и отдаёт его при уничтожении. Доставка
/// синхронная, порядок слушателей не гарантируется, буферизации нет —
/// подписчик, появившийся после `broadcast`, событие не увидит.
pub struct DeletionNotifier {
    inner: Arc<Mutex<Registry>>,
}

impl DeletionNotifier {
    /// Создаёт канал без подписчиков.
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует слушателя и возвращает handle подписки.
    ///
    /// Подписка снимается при drop handle'а; «утёкшая» подписка — дефект
    /// владельца, а не канала.
    pub fn subscribe(&self, listener: impl FnMut(&FeedEvent) + Send + 'static) -> Subscription {
        let mut registry = self
            .inner
            .lock()
            .expect("deletion notifier registry poisoned");
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(Mutex::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Синхронно доставляет событие всем текущим подписчикам.
    ///
    /// Слушатели вызываются уже без блокировки реестра, поэтому из слушателя
    /// можно безопасно подписываться и вещать повторно.
    pub fn broadcast(&self, event: FeedEvent) {
        let listeners: Vec<Listener> = {
            let registry = self
                .inner
                .lock()
                .expect("deletion notifier registry poisoned");
            registry.listeners.values().cloned().collect()
        };

        debug!(?event, listeners = listeners.len(), "broadcasting feed event");
        for listener in listeners {
            let mut listener = listener.lock().expect("feed event listener poisoned");
            listener(&event);
        }
    }

    /// Число активных подписок.
    pub fn listener_count(&self) -> usize {
        self.inner
            .lock()
            .expect("deletion notifier registry poisoned")
            .listeners
            .len()
    }
}

impl std::fmt::Debug for DeletionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle подписки на [`DeletionNotifier`]; отписывается при drop.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if let Ok(mut registry) = registry.lock() {
            registry.listeners.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
