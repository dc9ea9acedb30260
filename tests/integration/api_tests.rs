use super::*;
use serde_json::json;

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let app = TestApp::new(Arc::new(ScriptedFetcher::default())).await?;

    let (status, body) = app.request(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_login_rejects_wrong_password() -> anyhow::Result<()> {
    let app = TestApp::new(Arc::new(ScriptedFetcher::default())).await?;

    let (status, body) = app
        .request(Method::POST, "/admin/login", None, Some(json!({ "password": "guess" })))
        .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn test_admin_routes_require_token() -> anyhow::Result<()> {
    let app = TestApp::new(Arc::new(ScriptedFetcher::default())).await?;

    let (status, _) = app.request(Method::GET, "/admin/products", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/admin/status", Some("not-a-token"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::POST, "/admin/threshold", None, Some(json!({ "threshold": 1 })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.threshold.get(), 500);

    let token = app.login().await?;
    let (status, body) = app.request(Method::GET, "/admin/products", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["threshold"], 500);
    Ok(())
}

#[tokio::test]
async fn test_threshold_update() -> anyhow::Result<()> {
    let app = TestApp::new(Arc::new(ScriptedFetcher::default())).await?;
    let token = app.login().await?;

    let (status, body) = app
        .request(Method::POST, "/admin/threshold", Some(&token), Some(json!({ "threshold": "800" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["threshold"], 800);
    assert_eq!(app.threshold.get(), 800);

    let persisted = std::fs::read_to_string(app.threshold_dir.path().join("limit.txt"))?;
    assert_eq!(persisted.trim(), "800");

    let (status, _) = app
        .request(Method::POST, "/admin/threshold", Some(&token), Some(json!({ "threshold": 650 })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.threshold.get(), 650);
    Ok(())
}

#[tokio::test]
async fn test_malformed_threshold_keeps_previous_value() -> anyhow::Result<()> {
    let app = TestApp::new(Arc::new(ScriptedFetcher::default())).await?;
    let token = app.login().await?;

    for bad in [json!({ "threshold": "lots" }), json!({ "threshold": -5 }), json!({ "threshold": 12.5 }), json!({})] {
        let (status, body) = app
            .request(Method::POST, "/admin/threshold", Some(&token), Some(bad))
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    assert_eq!(app.threshold.get(), 500);
    Ok(())
}

#[tokio::test]
async fn test_check_now_is_single_flight() -> anyhow::Result<()> {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let fetcher = Arc::new(ScriptedFetcher::gated(entered.clone(), release.clone()));
    fetcher.set_price("https://shop.example/kettle", "2 590 ₽");

    let app = TestApp::new(fetcher).await?;
    let kettle = app.add_product("kettle", "https://shop.example/kettle", 3000).await?;

    let (status, body) = app.request(Method::GET, "/check", None, None).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "started");

    entered.notified().await;
    let (status, body) = app.request(Method::GET, "/check", None, None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "already_running");

    release.notify_one();
    let scheduler = Arc::clone(&app.scheduler);
    assert!(
        wait_for_condition(
            || {
                let scheduler = Arc::clone(&scheduler);
                async move { scheduler.get_stats().await.passes_completed == 1 }
            },
            5
        )
        .await
    );
    assert_eq!(app.store.get(&kettle.id).await?.unwrap().last_observed_price, Some(2590));
    Ok(())
}

#[tokio::test]
async fn test_status_reports_last_pass() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.set_price("https://shop.example/kettle", "2 590 ₽");
    let app = TestApp::new(fetcher).await?;
    app.add_product("kettle", "https://shop.example/kettle", 3000).await?;
    app.scheduler.run_pass(pricewatch::PassTrigger::Startup).await?;

    let token = app.login().await?;
    let (status, body) = app.request(Method::GET, "/admin/status", Some(&token), None).await?;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["product_count"], 1);
    assert_eq!(data["threshold"], 500);
    assert_eq!(data["scheduler"]["passes_completed"], 1);
    assert_eq!(data["scheduler"]["is_running"], false);
    assert_eq!(data["scheduler"]["last_report"]["trigger"], "startup");
    assert_eq!(data["scheduler"]["last_report"]["updated"], 1);
    Ok(())
}
