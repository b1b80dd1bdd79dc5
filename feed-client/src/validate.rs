//! Клиентская валидация форм — те же правила, что в веб-версии.

/// Минимальная длина никнейма и текста публикации.
pub const MIN_TEXT_LENGTH: usize = 3;

/// Поле заполнено (после обрезки пробелов).
pub fn required(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Поле не короче `min` символов (после обрезки пробелов).
pub fn min_length(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

/// Проверяет никнейм перед регистрацией или входом.
pub fn validate_nick_name(value: &str) -> Result<(), &'static str> {
    if !required(value) {
        return Err("никнейм не может быть пустым");
    }
    if !min_length(value, MIN_TEXT_LENGTH) {
        return Err("никнейм должен быть не короче 3 символов");
    }
    Ok(())
}

/// Проверяет текст публикации перед отправкой.
pub fn validate_description(value: &str) -> Result<(), &'static str> {
    if !required(value) {
        return Err("текст публикации не может быть пустым");
    }
    if !min_length(value, MIN_TEXT_LENGTH) {
        return Err("текст публикации должен быть не короче 3 символов");
    }
    Ok(())
}
