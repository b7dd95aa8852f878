mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn product_crud() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/products"))
        .json(&json!({
            "product_name": "Travel Lite",
            "product_code": "TRL1",
            "currency": "USD",
            "platform_fee": "4.50",
            "product_family": "Travel"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let (status, body) = common::read(res).await?;
    let product = common::data(status, &body);
    let id = product["id"].as_i64().expect("product id");
    assert_eq!(product["is_active"], true);
    assert_eq!(product["wording_url"], "");

    let (status, body) = common::read(client.get(server.url(&format!("/products/{}", id))).send().await?).await?;
    assert_eq!(common::data(status, &body), product);

    let res = client
        .put(server.url(&format!("/products/{}", id)))
        .json(&json!({
            "product_name": "Travel Lite Annual",
            "product_code": "TRL1",
            "currency": "USD",
            "is_annual": true
        }))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    let updated = common::data(status, &body);
    assert_eq!(updated["product_name"], "Travel Lite Annual");
    assert_eq!(updated["is_annual"], true);

    let res = client.delete(server.url(&format!("/products/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url(&format!("/products/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn product_validation_and_conflict() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/products"))
        .json(&json!({
            "product_name": "Health",
            "product_code": "HLTH-LONG",
            "currency": "INR",
            "admin_fee": "1.234"
        }))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["product_code"].is_string(), "{}", body);
    assert!(body["field_errors"]["admin_fee"].is_string(), "{}", body);

    let product = json!({ "product_name": "Motor", "product_code": "MTR9", "currency": "INR" });
    let res = client.post(server.url("/products")).json(&product).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let (status, body) = common::read(client.post(server.url("/products")).json(&product).send().await?).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    Ok(())
}

#[tokio::test]
async fn wording_crud() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/wordings"))
        .json(&json!({
            "wording_name": "Standard",
            "external_id": "WRD-STD",
            "product": "ProductA",
            "start_date": "2024-01-01",
            "wording_url": "https://docs.example.com/standard.pdf"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let (status, body) = common::read(res).await?;
    let wording = common::data(status, &body);
    let id = wording["id"].as_i64().expect("wording id");

    let (status, body) = common::read(client.get(server.url("/wordings")).send().await?).await?;
    let listed = common::data(status, &body);
    assert!(listed.as_array().expect("wordings").iter().any(|w| w["id"] == id));

    let res = client
        .put(server.url(&format!("/wordings/{}", id)))
        .json(&json!({
            "wording_name": "Standard",
            "external_id": "WRD-STD",
            "product": "ProductB",
            "start_date": "2024-02-01",
            "wording_url": "ftp://docs.example.com/standard.pdf"
        }))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    let updated = common::data(status, &body);
    assert_eq!(updated["product"], "ProductB");
    assert_eq!(updated["start_date"], "2024-02-01");

    let res = client
        .post(server.url("/wordings"))
        .json(&json!({
            "wording_name": "Bad link",
            "external_id": "WRD-BAD",
            "product": "ProductA",
            "start_date": "2024-01-01",
            "wording_url": "not a url"
        }))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["wording_url"].is_string(), "{}", body);

    let res = client.delete(server.url("/wordings/424242")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn root_and_health() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/health")).send().await?;
    assert!(res.headers().contains_key("x-request-id"));
    let (status, body) = common::read(res).await?;
    assert_eq!(common::data(status, &body)["status"], "ok");

    let (status, body) = common::read(client.get(server.url("/")).send().await?).await?;
    assert_eq!(common::data(status, &body)["version"], env!("CARGO_PKG_VERSION"));

    Ok(())
}
