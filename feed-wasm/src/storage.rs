use crate::models::User;

const USER_KEY: &str = "feed_user";

fn parse_user(raw: &str) -> Option<User> {
    serde_json::from_str::<User>(raw).ok()
}

pub(crate) fn load_user() -> Option<User> {
    let window = web_sys::window()?;
    let storage = window.local_storage().ok()??;
    let raw = storage.get_item(USER_KEY).ok()??;
    parse_user(&raw)
}

pub(crate) fn save_user(user: &User) -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| "window is not available".to_string())?;
    let storage = window
        .local_storage()
        .map_err(|_| "failed to access localStorage".to_string())?
        .ok_or_else(|| "localStorage is not available".to_string())?;

    let raw = serde_json::to_string(user).map_err(|_| "failed to serialize user".to_string())?;
    storage
        .set_item(USER_KEY, &raw)
        .map_err(|_| "failed to save user".to_string())
}

pub(crate) fn clear_user() -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| "window is not available".to_string())?;
    let storage = window
        .local_storage()
        .map_err(|_| "failed to access localStorage".to_string())?
        .ok_or_else(|| "localStorage is not available".to_string())?;

    storage
        .remove_item(USER_KEY)
        .map_err(|_| "failed to clear user".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_user_returns_none_for_invalid_json() {
        assert!(parse_user("{not-json}").is_none());
    }

    #[test]
    fn parse_user_returns_some_for_valid_json() {
        let raw = r#"{"id":1,"nickName":"ana","email":"ana@example.com"}"#;
        let user = parse_user(raw).expect("user should parse");
        assert_eq!(user.id, 1);
        assert_eq!(user.nick_name, "ana");
    }
}
