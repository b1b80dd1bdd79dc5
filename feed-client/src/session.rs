use std::fs;
use std::path::{Path, PathBuf};

use crate::models::User;

/// Хранилище сессии: кто сейчас «вошёл» в приложение.
///
/// Ядро ленты от него не зависит; хранилище внедряется в корень приложения
/// при старте (CLI хранит JSON-файл, браузерная версия — localStorage).
pub trait SessionStore {
    /// Возвращает сохранённого пользователя, если сессия есть и читается.
    fn load(&self) -> Option<User>;

    /// Сохраняет пользователя текущей сессии.
    fn save(&self, user: &User) -> Result<(), String>;

    /// Удаляет сессию. Отсутствующая сессия — не ошибка.
    fn clear(&self) -> Result<(), String>;
}

#[derive(Debug, Clone)]
/// Файловое хранилище сессии (JSON-файл рядом с рабочей директорией).
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Создаёт хранилище поверх указанного пути.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу сессии.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<User> {
        let raw = fs::read_to_string(&self.path).ok()?;
        parse_user(&raw)
    }

    fn save(&self, user: &User) -> Result<(), String> {
        let raw = serde_json::to_string(user).map_err(|_| "failed to serialize user".to_string())?;
        fs::write(&self.path, raw)
            .map_err(|err| format!("failed to save session to {}: {err}", self.path.display()))
    }

    fn clear(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Ok(());
        }
        fs::remove_file(&self.path)
            .map_err(|err| format!("failed to clear session {}: {err}", self.path.display()))
    }
}

fn parse_user(raw: &str) -> Option<User> {
    serde_json::from_str::<User>(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_store(tag: &str) -> FileSessionStore {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock must be after unix epoch")
            .as_nanos();
        FileSessionStore::new(std::env::temp_dir().join(format!("feed_session_{tag}_{nanos}")))
    }

    fn sample_user() -> User {
        User {
            id: 1,
            nick_name: "ana".to_string(),
            email: Some("ana@example.com".to_string()),
        }
    }

    #[test]
    fn save_then_load_roundtrips() {
        let store = temp_store("roundtrip");
        store.save(&sample_user()).expect("save should succeed");

        let loaded = store.load().expect("session should load");
        assert_eq!(loaded, sample_user());

        store.clear().expect("clear should succeed");
    }

    #[test]
    fn load_returns_none_without_session() {
        let store = temp_store("missing");
        assert!(store.load().is_none());
    }

    #[test]
    fn clear_is_a_noop_without_session() {
        let store = temp_store("clear_noop");
        assert!(store.clear().is_ok());
    }

    #[test]
    fn clear_removes_saved_session() {
        let store = temp_store("clear");
        store.save(&sample_user()).expect("save should succeed");
        store.clear().expect("clear should succeed");
        assert!(store.load().is_none());
    }

    #[test]
    fn parse_user_returns_none_for_invalid_json() {
        assert!(parse_user("{not-json}").is_none());
    }
}
