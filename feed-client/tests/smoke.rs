use std::time::{SystemTime, UNIX_EPOCH};

use feed_client::{ApiClient, FeedClientError, FeedLoader};

fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock must be after unix epoch")
        .as_nanos();
    format!("{nanos}")
}

#[tokio::test]
#[ignore = "requires running REST backend"]
async fn http_smoke_flow() {
    let base_url =
        std::env::var("FEED_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = ApiClient::new(base_url);

    let suffix = unique_suffix();
    let nick_name = format!("smoke_user_{suffix}");

    let user = client
        .create_user(&nick_name, Some(&format!("smoke_{suffix}@example.com")))
        .await
        .expect("create_user must succeed");
    assert_eq!(user.nick_name, nick_name);

    let found = client
        .find_user(&nick_name)
        .await
        .expect("find_user must succeed")
        .expect("created user must be listed");
    assert_eq!(found.id, user.id);

    let created = client
        .create_post(user.id, "smoke post content")
        .await
        .expect("create_post must succeed");
    assert_eq!(created.user_id, user.id);

    let tag = client
        .get_or_create_tag(&format!("smoke_tag_{suffix}"))
        .await
        .expect("get_or_create_tag must succeed");
    client
        .add_tag_to_post(created.id, tag.id)
        .await
        .expect("add_tag_to_post must succeed");

    let image = client
        .create_image(created.id, "http://example.com/smoke.png")
        .await
        .expect("create_image must succeed");
    assert_eq!(image.post_id, created.id);

    let comment = client
        .create_comment(created.id, user.id, "smoke comment")
        .await
        .expect("create_comment must succeed");
    assert_eq!(comment.post_id, created.id);

    let fetched = client
        .get_post(created.id)
        .await
        .expect("get_post must succeed");
    assert_eq!(fetched.id, created.id);

    // лента: свежий пост должен прийти обогащённым
    let loader = FeedLoader::new(client.clone(), 5);
    loader.fetch_next().await.expect("feed page must load");
    let state = loader.snapshot();
    if let Some(item) = state.items().iter().find(|item| item.id() == created.id) {
        assert_eq!(item.comment_count, 1);
        assert_eq!(item.image_urls, ["http://example.com/smoke.png"]);
    }

    client
        .delete_post(created.id)
        .await
        .expect("delete_post must succeed");

    let after_delete = client.get_post(created.id).await;
    assert!(matches!(after_delete, Err(FeedClientError::NotFound)));
}
