//! End-to-end runs of `post::run` against a mocked storefront and X API.

use std::path::Path;

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront_bot::oauth::Credentials;
use storefront_bot::post::{self, PostOutcome};
use storefront_bot::tracker::{TrackerLock, TrackingState};
use storefront_bot::{BotError, Config, config, history};

fn credentials() -> Credentials {
    Credentials {
        api_key: "key".into(),
        api_secret: "secret".into(),
        access_token: "token".into(),
        access_token_secret: "token-secret".into(),
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

/// Writes a two-product feed and returns a config pointing at `server`.
fn setup(dir: &TempDir, server: &MockServer, extra: serde_json::Value) -> Config {
    let feed = json!([
        {
            "title": "قطاعة خضار متعددة الاستخدامات",
            "sku": "A.001147",
            "price": 25000,
            "old_price": 35000,
            "image": format!("{}/img/cutter.jpg", server.uri()),
            "category": "مطبخ"
        },
        {
            "name": "قلم اللحية",
            "id": 2,
            "price": "12,000",
            "category": "عناية"
        }
    ]);
    let products_path = dir.path().join("products.json");
    std::fs::write(&products_path, feed.to_string()).unwrap();

    let mut raw = json!({
        "base_url": server.uri(),
        "products_path": products_path,
        "state_path": dir.path().join("posted_products.json"),
        "history_db": dir.path().join("bot.db"),
        "hashtags": ["#العراق"],
        "twitter": { "api_base": server.uri(), "upload_base": server.uri() }
    });
    if let (Some(base), Some(extra)) = (raw.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    config::parse(&raw.to_string()).unwrap()
}

async fn mount_image(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/img/cutter.jpg"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFFu8; 512]),
        )
        .mount(server)
        .await;
}

async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"media_id_string": "555"})))
        .mount(server)
        .await;
}

fn lock_path(state_path: &Path) -> std::path::PathBuf {
    let mut p = state_path.as_os_str().to_owned();
    p.push(".lock");
    p.into()
}

#[tokio::test]
async fn posts_first_product_with_image_and_advances_tracker() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));

    mount_image(&server, 200).await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(body_partial_json(json!({"media": {"media_ids": ["555"]}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "9001", "text": "ok"}})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = post::run(&config, Some(credentials()), now()).await.unwrap();
    let PostOutcome::Posted(tweet) = outcome else {
        panic!("expected a published post, got {outcome:?}");
    };
    assert_eq!(tweet.id, "9001");

    let requests = server.received_requests().await.unwrap();
    let tweet_request = requests.iter().find(|r| r.url.path() == "/2/tweets").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&tweet_request.body).unwrap();
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("🛒 قطاعة خضار متعددة الاستخدامات\n💰 25,000 د.ع"));
    assert!(text.contains("🔥 خصم 29%"));
    assert!(text.contains(&format!("{}/products/قطاعة-خضار-متعددة-الاستخدامات-a001147.html", server.uri())));
    assert!(text.ends_with("#قطاعة #خضار #متعددة #مطبخ #العراق"));

    let state = TrackingState::load(&config.state_path, now()).unwrap();
    assert_eq!(state.last_index, Some(0));
    assert_eq!(state.posted_products, ["A.001147"]);
    assert_eq!(state.posts_this_month, 1);
    assert_eq!(state.current_month, "2026-03");
    assert!(!lock_path(&config.state_path).exists());

    let conn = Connection::open(&config.history_db).unwrap();
    let posts = history::recent_posts(&conn, 10).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].tweet_id, "9001");
    assert_eq!(posts[0].product_id, "A.001147");
}

#[tokio::test]
async fn second_run_moves_to_the_next_product() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));

    let mut state = TrackingState::new(now());
    state.last_index = Some(0);
    state.posts_this_month = 1;
    state.save(&config.state_path).unwrap();

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "2"}})))
        .mount(&server)
        .await;

    let outcome = post::run(&config, Some(credentials()), now()).await.unwrap();
    let PostOutcome::Posted(tweet) = outcome else {
        panic!("expected a published post, got {outcome:?}");
    };
    // The second product has no image, so nothing was uploaded.
    assert!(tweet.text.starts_with("🛒 قلم اللحية\n💰 12,000 د.ع\n\n"));

    let state = TrackingState::load(&config.state_path, now()).unwrap();
    assert_eq!(state.last_index, Some(1));
    assert_eq!(state.posts_this_month, 2);
}

#[tokio::test]
async fn history_failure_after_publishing_still_reports_the_post() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));

    // A `posts` table without the `text` column makes the insert fail.
    let conn = Connection::open(&config.history_db).unwrap();
    conn.execute_batch("CREATE TABLE posts (tweet_id TEXT PRIMARY KEY, product_id TEXT NOT NULL);")
        .unwrap();
    drop(conn);

    mount_image(&server, 200).await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "77"}})))
        .mount(&server)
        .await;

    let outcome = post::run(&config, Some(credentials()), now()).await.unwrap();
    assert!(matches!(outcome, PostOutcome::Posted(ref t) if t.id == "77"), "{outcome:?}");

    let state = TrackingState::load(&config.state_path, now()).unwrap();
    assert_eq!(state.last_index, Some(0));
    assert_eq!(state.posts_this_month, 1);
}

#[tokio::test]
async fn rejected_post_leaves_tracker_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));

    mount_image(&server, 200).await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let err = post::run(&config, Some(credentials()), now()).await.unwrap_err();
    assert!(matches!(err, BotError::PostRejected { .. }), "{err:?}");
    assert!(!config.state_path.exists());
    assert!(!lock_path(&config.state_path).exists());
}

#[tokio::test]
async fn broken_image_is_skipped_and_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));

    mount_image(&server, 404).await;
    Mock::given(method("POST"))
        .and(path("/1.1/media/upload.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "3"}})))
        .mount(&server)
        .await;

    let outcome = post::run(&config, Some(credentials()), now()).await.unwrap();
    assert!(matches!(outcome, PostOutcome::Posted(_)));

    let requests = server.received_requests().await.unwrap();
    let tweet_request = requests.iter().find(|r| r.url.path() == "/2/tweets").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&tweet_request.body).unwrap();
    assert!(body.get("media").is_none());

    let conn = Connection::open(&config.history_db).unwrap();
    let image_url = format!("{}/img/cutter.jpg", server.uri());
    assert!(history::should_skip_image(&conn, &image_url, now()).unwrap());
}

#[tokio::test]
async fn dry_run_composes_without_touching_anything() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));

    let outcome = post::run(&config, None, now()).await.unwrap();
    let PostOutcome::DryRun(text) = outcome else {
        panic!("expected a dry run, got {outcome:?}");
    };
    assert!(text.contains("قطاعة خضار"));

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!config.state_path.exists());
    assert!(!config.history_db.exists());
}

#[tokio::test]
async fn quota_stops_the_run_before_selection() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({"monthly_quota": 2}));

    let mut state = TrackingState::new(now());
    state.posts_this_month = 2;
    state.save(&config.state_path).unwrap();

    let outcome = post::run(&config, Some(credentials()), now()).await.unwrap();
    assert_eq!(outcome, PostOutcome::QuotaReached { posts_this_month: 2 });
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn quota_resets_in_a_new_month() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({"monthly_quota": 2}));

    let february = Utc.with_ymd_and_hms(2026, 2, 27, 9, 0, 0).unwrap();
    let mut state = TrackingState::new(february);
    state.last_index = Some(1);
    state.posts_this_month = 2;
    state.save(&config.state_path).unwrap();

    let outcome = post::run(&config, None, now()).await.unwrap();
    let PostOutcome::DryRun(text) = outcome else {
        panic!("expected a dry run, got {outcome:?}");
    };
    // Rotation wrapped back to the first product.
    assert!(text.starts_with("🛒 قطاعة خضار"));
}

#[tokio::test]
async fn held_lock_refuses_a_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));

    let _held = TrackerLock::acquire(&config.state_path).unwrap();
    let err = post::run(&config, Some(credentials()), now()).await.unwrap_err();
    assert!(matches!(err, BotError::Lock(_)), "{err:?}");
}

#[tokio::test]
async fn sitemap_and_shortener_shape_the_link() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(
        &dir,
        &server,
        json!({
            "resolve_via_sitemap": true,
            "shortener": format!("{}/shorten", server.uri())
        }),
    );

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<urlset><url><loc>https://shop.example.com/products/old-name-a001147.html</loc></url></urlset>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shorten"))
        .and(wiremock::matchers::query_param(
            "url",
            "https://shop.example.com/products/old-name-a001147.html",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://s.example/x1"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = post::run(&config, None, now()).await.unwrap();
    let PostOutcome::DryRun(text) = outcome else {
        panic!("expected a dry run, got {outcome:?}");
    };
    assert!(text.contains("🔗 https://s.example/x1\n"));
}

#[tokio::test]
async fn empty_feed_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = setup(&dir, &server, json!({}));
    std::fs::write(&config.products_path, "[]").unwrap();

    let err = post::run(&config, Some(credentials()), now()).await.unwrap_err();
    assert!(matches!(err, BotError::EmptyFeed));
}
