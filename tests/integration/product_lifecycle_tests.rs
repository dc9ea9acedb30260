use super::*;
use serde_json::json;

#[tokio::test]
async fn test_add_edit_delete_product() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.set_price("https://shop.example/vacuum", "18 490 ₽");
    let app = TestApp::new(fetcher).await?;
    let token = app.login().await?;

    // Add runs an immediate check
    let (status, body) = app
        .request(
            Method::POST,
            "/admin/products",
            Some(&token),
            Some(json!({
                "name": "Robot vacuum",
                "url": "https://shop.example/vacuum",
                "reference_price": 19990
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let product = &body["data"]["product"];
    let id = product["id"].as_str().unwrap().to_string();
    assert_eq!(product["last_observed_price"], 18490);
    assert_eq!(body["data"]["check"]["status"], "priced");
    assert_eq!(body["data"]["check"]["alert"]["decision"], "fired");
    assert_eq!(body["data"]["check"]["alert"]["margin"], 1500);

    // Edit the reference price; the check now stays under the threshold
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/admin/products/{}", id),
            Some(&token),
            Some(json!({ "reference_price": 18700 })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["product"]["reference_price"], 18700);
    assert_eq!(body["data"]["check"]["alert"]["decision"], "skipped");
    assert_eq!(body["data"]["check"]["alert"]["margin"], 210);

    let (status, body) = app.request(Method::GET, "/admin/products", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(Method::DELETE, &format!("/admin/products/{}", id), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.count().await?, 0);

    let (status, body) = app
        .request(Method::DELETE, &format!("/admin/products/{}", id), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_add_keeps_product_when_page_fails() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.set_failure(
        "https://shop.example/captcha",
        ExtractionFailure::Navigation("net::ERR_BLOCKED_BY_RESPONSE".into()),
    );
    let app = TestApp::new(fetcher).await?;
    let token = app.login().await?;

    let (status, body) = app
        .request(
            Method::POST,
            "/admin/products",
            Some(&token),
            Some(json!({
                "name": "Stand mixer",
                "url": "https://shop.example/captcha",
                "reference_price": 25000
            })),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["check"]["status"], "failed");
    assert!(body["data"]["product"]["last_observed_price"].is_null());
    assert_eq!(app.store.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_product_is_rejected() -> anyhow::Result<()> {
    let app = TestApp::new(Arc::new(ScriptedFetcher::default())).await?;
    let token = app.login().await?;

    for bad in [
        json!({ "name": "", "url": "https://shop.example/a", "reference_price": 1000 }),
        json!({ "name": "toaster", "url": "not a url", "reference_price": 1000 }),
        json!({ "name": "toaster", "url": "https://shop.example/a", "reference_price": 0 }),
    ] {
        let (status, _) = app
            .request(Method::POST, "/admin/products", Some(&token), Some(bad))
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    assert_eq!(app.store.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_edit_unknown_product() -> anyhow::Result<()> {
    let app = TestApp::new(Arc::new(ScriptedFetcher::default())).await?;
    let token = app.login().await?;

    let (status, _) = app
        .request(
            Method::PUT,
            "/admin/products/does-not-exist",
            Some(&token),
            Some(json!({ "reference_price": 1000 })),
        )
        .await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
