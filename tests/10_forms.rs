mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn claim_form(name: &str) -> Value {
    json!({
        "form_name": name,
        "submit_api_route": "https://api.example.com/claims",
        "table_name": "claims",
        "sections": [
            {
                "section_name": "Claimant",
                "section_order": 1,
                "rows": [
                    {
                        "row_name": "Identity",
                        "row_order": 1,
                        "columns": [
                            {
                                "column_name": "Left",
                                "column_order": 1,
                                "fields": [
                                    { "config": { "label": "Name" }, "data_type": "text", "is_required": true },
                                    { "config": { "label": "Email" }, "max_length": 120 }
                                ]
                            }
                        ]
                    }
                ]
            },
            {
                "section_name": "Trip",
                "is_collapsable": true,
                "section_order": 2,
                "rows": [
                    {
                        "row_name": "Dates",
                        "row_order": 1,
                        "columns": [
                            {
                                "column_name": "Only",
                                "column_order": 1,
                                "fields": [{ "config": { "label": "Departure" } }]
                            }
                        ]
                    }
                ]
            }
        ]
    })
}

async fn create(client: &reqwest::Client, server: &common::TestServer, name: &str) -> Result<Value> {
    let res = client
        .post(server.url("/form/create"))
        .json(&claim_form(name))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let (status, body) = common::read(res).await?;
    Ok(common::data(status, &body))
}

#[tokio::test]
async fn create_and_load_form_tree() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let created = create(&client, server, "Create and load").await?;
    let id = created["id"].as_i64().expect("form id");
    assert_eq!(created["sections"].as_array().map(Vec::len), Some(2));
    assert_eq!(created["sections"][0]["rows"][0]["columns"][0]["fields"][1]["max_length"], 120);

    let (status, body) = common::read(client.get(server.url(&format!("/form/{}", id))).send().await?).await?;
    assert_eq!(common::data(status, &body), created);

    Ok(())
}

#[tokio::test]
async fn resubmitting_loaded_tree_changes_nothing() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let created = create(&client, server, "Identity").await?;
    let id = created["id"].as_i64().expect("form id");

    let res = client
        .put(server.url(&format!("/form/{}", id)))
        .json(&created)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(common::data(status, &body), created);

    Ok(())
}

#[tokio::test]
async fn omitted_section_is_removed_and_new_field_added() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let created = create(&client, server, "Reshape").await?;
    let id = created["id"].as_i64().expect("form id");

    let mut submitted = created.clone();
    let sections = submitted["sections"].as_array_mut().expect("sections");
    sections.remove(1);
    sections[0]["rows"][0]["columns"][0]["fields"]
        .as_array_mut()
        .expect("fields")
        .push(json!({ "config": { "label": "Phone" } }));

    let res = client
        .put(server.url(&format!("/form/{}", id)))
        .json(&submitted)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    let updated = common::data(status, &body);

    assert_eq!(updated["sections"].as_array().map(Vec::len), Some(1));
    let fields = updated["sections"][0]["rows"][0]["columns"][0]["fields"]
        .as_array()
        .expect("fields");
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0]["id"], created["sections"][0]["rows"][0]["columns"][0]["fields"][0]["id"]);
    assert_eq!(fields[2]["config"]["label"], "Phone");

    Ok(())
}

#[tokio::test]
async fn out_of_range_row_order_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let mut form = claim_form("Bad order");
    form["sections"][0]["rows"][0]["row_order"] = json!(4);

    let res = client.post(server.url("/form/create")).json(&form).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["sections[0].rows[0].row_order"].is_string(), "{}", body);

    Ok(())
}

#[tokio::test]
async fn foreign_id_is_rejected_without_writes() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let first = create(&client, server, "Owner").await?;
    let second = create(&client, server, "Intruder").await?;
    let id = second["id"].as_i64().expect("form id");

    let mut submitted = second.clone();
    submitted["sections"][0]["id"] = first["sections"][0]["id"].clone();

    let res = client
        .put(server.url(&format!("/form/{}", id)))
        .json(&submitted)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);
    assert_eq!(body["error"], true);

    let (status, body) = common::read(client.get(server.url(&format!("/form/{}", id))).send().await?).await?;
    assert_eq!(common::data(status, &body), second);

    Ok(())
}

#[tokio::test]
async fn soft_deleted_form_leaves_listing_but_stays_loadable() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let created = create(&client, server, "Soft delete").await?;
    let id = created["id"].as_i64().expect("form id");

    let res = client
        .delete(server.url(&format!("/form/soft-delete/{}", id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = common::read(client.get(server.url("/form")).send().await?).await?;
    let listed = common::data(status, &body);
    assert!(listed
        .as_array()
        .expect("form list")
        .iter()
        .all(|form| form["id"].as_i64() != Some(id)));

    let (status, body) = common::read(client.get(server.url(&format!("/form/{}", id))).send().await?).await?;
    assert_eq!(common::data(status, &body)["is_deleted"], true);

    Ok(())
}

#[tokio::test]
async fn missing_form_and_malformed_body() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/form/999999")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(server.url("/form/create"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");

    let res = client
        .post(server.url("/form/create"))
        .json(&json!({ "form_name": "No route" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // A missing form is reported before the body is validated
    let mut invalid = claim_form("Nowhere");
    invalid["form_name"] = json!("");
    let res = client.put(server.url("/form/999999")).json(&invalid).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let mut oversized = claim_form("Huge");
    oversized["form_name"] = json!("x".repeat(80 * 1024));
    let res = client.post(server.url("/form/create")).json(&oversized).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");

    Ok(())
}
