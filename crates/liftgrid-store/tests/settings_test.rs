use liftgrid_store::models::keys;
use liftgrid_store::queries::settings;
use liftgrid_test_utils::create_test_pool;

#[tokio::test]
async fn missing_setting_is_none() {
    let pool = create_test_pool().await;
    let value = settings::get_setting(&pool, keys::DOCUMENT_URL)
        .await
        .expect("get should succeed");
    assert!(value.is_none());
}

#[tokio::test]
async fn put_then_overwrite() {
    let pool = create_test_pool().await;
    settings::put_setting(&pool, keys::DOCUMENT_URL, "first")
        .await
        .expect("put should succeed");
    settings::put_setting(&pool, keys::DOCUMENT_URL, "second")
        .await
        .expect("overwrite should succeed");

    let value = settings::get_setting(&pool, keys::DOCUMENT_URL)
        .await
        .expect("get should succeed");
    assert_eq!(value.as_deref(), Some("second"));

    let all = settings::list_settings(&pool).await.expect("list");
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn put_settings_writes_all_entries() {
    let pool = create_test_pool().await;
    settings::put_settings(
        &pool,
        &[
            (keys::ACCESS_TOKEN, "at"),
            (keys::TOKEN_EXPIRY, "2030-01-01T00:00:00Z"),
        ],
    )
    .await
    .expect("batch put should succeed");

    let all = settings::list_settings(&pool).await.expect("list");
    let keys_found: Vec<&str> = all.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys_found, vec![keys::ACCESS_TOKEN, keys::TOKEN_EXPIRY]);
}

#[tokio::test]
async fn delete_credential_keys_leaves_document_url() {
    let pool = create_test_pool().await;
    settings::put_setting(&pool, keys::DOCUMENT_URL, "https://example.com/d/abc/edit")
        .await
        .expect("put");
    settings::put_setting(&pool, keys::ACCESS_TOKEN, "at")
        .await
        .expect("put");
    settings::put_setting(&pool, keys::REFRESH_TOKEN, "rt")
        .await
        .expect("put");

    let removed = settings::delete_settings(&pool, &keys::CREDENTIAL)
        .await
        .expect("delete should succeed");
    assert_eq!(removed, 2);

    assert!(
        settings::get_setting(&pool, keys::ACCESS_TOKEN)
            .await
            .expect("get")
            .is_none()
    );
    assert!(
        settings::get_setting(&pool, keys::DOCUMENT_URL)
            .await
            .expect("get")
            .is_some()
    );
}
