mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use talent_api::database::models::Role;

fn import_row(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "title": "工程师",
        "department": "研发部",
        "focus": "架构",
        "month": "2025-06",
        "ideology": "good",
    })
}

async fn setup_admin() -> Result<(common::TestApp, String)> {
    let app = common::spawn_app().await?;
    app.seed_account("admin", Role::Admin, false, None).await?;
    let token = app.login("admin").await?;
    Ok((app, token))
}

#[tokio::test]
async fn dry_then_confirm_round_trip() -> Result<()> {
    let (app, token) = setup_admin().await?;

    // seed a known person the import will match by name
    app.request(
        Method::POST,
        "/api/people",
        Some(&token),
        Some(json!({ "name": "李四", "title": "x", "department": "y", "focus": "z" })),
    )
    .await?;

    let rows = json!([import_row("李四"), import_row("张三")]);

    // dry phase: match updated, unknown name deferred
    let (status, body) = app
        .request(
            Method::POST,
            "/api/people/import",
            Some(&token),
            Some(json!({ "allow_create": false, "rows": rows.clone() })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["updated"], 1);
    assert_eq!(data["created"], 0);
    assert_eq!(data["skipped"], 1);
    assert_eq!(data["needs_confirm"], true);
    assert_eq!(data["pending_names"], json!(["张三"]));

    // confirm phase: same payload, creations allowed
    let (status, body) = app
        .request(
            Method::POST,
            "/api/people/import",
            Some(&token),
            Some(json!({ "allow_create": true, "rows": rows })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["created"], 1);
    assert_eq!(data["updated"], 1);
    assert_eq!(data["skipped"], 0);
    assert_eq!(data["needs_confirm"], false);

    // exactly the pending name was created
    let (_, body) = app.request(Method::GET, "/api/people", Some(&token), None).await?;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"张三"));
    assert_eq!(names.len(), 2);
    Ok(())
}

#[tokio::test]
async fn invalid_rows_reject_the_batch_with_row_errors() -> Result<()> {
    let (app, token) = setup_admin().await?;

    let rows = json!([
        import_row("张三"),
        { "name": "王五", "title": "工程师" },
    ]);
    let (status, body) = app
        .request(
            Method::POST,
            "/api/people/import",
            Some(&token),
            Some(json!({ "allow_create": true, "rows": rows })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let violations = body["violations"].as_array().unwrap();
    assert!(violations.iter().all(|v| v.as_str().unwrap().starts_with("row 2:")));

    // no partial commit: the valid row was not applied
    let (_, body) = app.request(Method::GET, "/api/people", Some(&token), None).await?;
    assert!(body["data"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn import_requires_the_capability() -> Result<()> {
    let (app, _token) = setup_admin().await?;
    app.seed_account("viewer", Role::Display, false, None).await?;
    let viewer_token = app.login("viewer").await?;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/people/import",
            Some(&viewer_token),
            Some(json!({ "allow_create": false, "rows": [import_row("张三")] })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn export_mirrors_the_import_layout_with_masking() -> Result<()> {
    let (app, token) = setup_admin().await?;
    app.request(
        Method::POST,
        "/api/people",
        Some(&token),
        Some(json!({
            "name": "张三", "title": "工程师", "department": "研发部",
            "focus": "架构", "phone": "13812345678",
        })),
    )
    .await?;

    let (status, body) = app
        .request(Method::GET, "/api/people/export?months=1", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["name"], "张三");
    // admin has not toggled unmasked viewing: export is masked too
    assert_eq!(row["phone"], "138****5678");
    assert_eq!(row["ideology"], "无");
    Ok(())
}
