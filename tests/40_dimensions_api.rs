mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use talent_api::database::models::Role;

async fn setup() -> Result<(common::TestApp, String, i64)> {
    let app = common::spawn_app().await?;
    app.seed_account("admin", Role::Admin, false, None).await?;
    let token = app.login("admin").await?;
    let (_, body) = app
        .request(
            Method::POST,
            "/api/people",
            Some(&token),
            Some(json!({ "name": "张三", "title": "工程师", "department": "研发部", "focus": "架构" })),
        )
        .await?;
    let person_id = body["data"]["id"].as_i64().unwrap();
    Ok((app, token, person_id))
}

#[tokio::test]
async fn partial_submission_reads_back_as_six_categories() -> Result<()> {
    let (app, token, person_id) = setup().await?;

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/people/{}/dimensions/2025-05", person_id),
            Some(&token),
            Some(json!({ "dimensions": [{ "category": "ideology", "detail": "good" }] })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/people/{}/dimensions?from=2025-05&to=2025-05", person_id),
            Some(&token),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let entries = body["data"][0]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0]["category"], "ideology");
    assert_eq!(entries[0]["detail"], "good");
    for entry in &entries[1..] {
        assert_eq!(entry["detail"], "无");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_category_rejects_the_whole_save() -> Result<()> {
    let (app, token, person_id) = setup().await?;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/people/{}/dimensions/2025-05", person_id),
            Some(&token),
            Some(json!({ "dimensions": [
                { "category": "ideology", "detail": "good" },
                { "category": "charisma", "detail": "high" },
            ]})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["violations"][0].as_str().unwrap().contains("charisma"));

    // nothing was written
    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/people/{}/dimensions?from=2025-05&to=2025-05", person_id),
            Some(&token),
            None,
        )
        .await?;
    let entries = body["data"][0]["entries"].as_array().unwrap();
    assert!(entries.iter().all(|e| e["detail"] == "无"));
    Ok(())
}

#[tokio::test]
async fn malformed_month_in_path_is_a_bad_request() -> Result<()> {
    let (app, token, person_id) = setup().await?;
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/people/{}/dimensions/2025-5", person_id),
            Some(&token),
            Some(json!({ "dimensions": [] })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn range_read_spans_year_boundaries() -> Result<()> {
    let (app, token, person_id) = setup().await?;
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/people/{}/dimensions?from=2024-12&to=2025-01", person_id),
            Some(&token),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let months: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["month"].as_str().unwrap())
        .collect();
    assert_eq!(months, vec!["2024-12", "2025-01"]);
    Ok(())
}

#[tokio::test]
async fn family_detail_is_masked_for_plain_viewers() -> Result<()> {
    let (app, token, person_id) = setup().await?;
    app.request(
        Method::PUT,
        &format!("/api/people/{}/dimensions/2025-05", person_id),
        Some(&token),
        Some(json!({ "dimensions": [{ "category": "family", "detail": "两名子女" }] })),
    )
    .await?;

    app.seed_account("wall", Role::Display, false, None).await?;
    let wall_token = app.login("wall").await?;
    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/people/{}/dimensions?from=2025-05&to=2025-05", person_id),
            Some(&wall_token),
            None,
        )
        .await?;
    let entries = body["data"][0]["entries"].as_array().unwrap();
    let family = entries.iter().find(|e| e["category"] == "family").unwrap();
    assert_eq!(family["detail"], "***");
    Ok(())
}

#[tokio::test]
async fn unrelated_standard_account_cannot_save_dimensions() -> Result<()> {
    let (app, _token, person_id) = setup().await?;
    app.seed_account("outsider", Role::Standard, false, None).await?;
    let token = app.login("outsider").await?;

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/people/{}/dimensions/2025-05", person_id),
            Some(&token),
            Some(json!({ "dimensions": [] })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
