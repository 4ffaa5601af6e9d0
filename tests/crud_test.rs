mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{body_json, header_str, TestApp};

#[tokio::test]
async fn category_create_edit_update_delete() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/categories",
            Some(json!({ "name": "Engine Parts", "slug": "engine-parts", "description": null })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&response, header::LOCATION), Some("/categories"));

    let list = body_json(app.get("/categories").await).await;
    assert_eq!(list["records"]["total"], 1);
    let id = list["records"]["data"][0]["id"].as_i64().unwrap();
    assert_eq!(list["records"]["data"][0]["slug"], "engine-parts");
    assert!(list["records"]["data"][0]["description"].is_null());

    let edit = body_json(app.get(&format!("/categories/{}/edit", id)).await).await;
    assert_eq!(edit["record"]["name"], "Engine Parts");

    let response = app
        .request(
            Method::PUT,
            &format!("/categories/{}", id),
            Some(json!({ "name": "Engine", "slug": "engine", "description": "Internals" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let edit = body_json(app.get(&format!("/categories/{}/edit", id)).await).await;
    assert_eq!(edit["record"]["slug"], "engine");
    assert_eq!(edit["record"]["description"], "Internals");

    let response = app
        .request(Method::DELETE, &format!("/categories/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.get(&format!("/categories/{}/edit", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_unit_code_is_a_field_error() {
    let app = TestApp::new().await;
    app.unit("Pieces", "pcs").await;

    let response = app
        .request(
            Method::POST,
            "/units",
            Some(json!({ "name": "Pieces (loose)", "code": "pcs" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["errors"]["code"], "The code has already been taken.");
    assert!(body["errors"].get("name").is_none());
}

#[tokio::test]
async fn update_may_keep_its_own_unique_values() {
    let app = TestApp::new().await;
    let id = app.unit("Pieces", "pcs").await;
    app.unit("Set", "set").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/units/{}", id),
            Some(json!({ "name": "Pieces", "code": "pcs" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .request(
            Method::PUT,
            &format!("/units/{}", id),
            Some(json!({ "name": "Pieces", "code": "set" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["errors"]["code"], "The code has already been taken.");
}

#[tokio::test]
async fn partial_updates_are_rejected() {
    let app = TestApp::new().await;
    let id = app.category("Electrical", "electrical").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/categories/{}", id),
            Some(json!({ "name": "Electric" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["errors"]["slug"], "The slug field must be present.");
    assert_eq!(body["errors"]["description"], "The description field must be present.");

    let edit = body_json(app.get(&format!("/categories/{}/edit", id)).await).await;
    assert_eq!(edit["record"]["name"], "Electrical");
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let app = TestApp::new().await;

    for uri in ["/units/99/edit", "/vehicle-brands/99/edit", "/products/99/edit"] {
        assert_eq!(app.get(uri).await.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let response = app
        .request(
            Method::PUT,
            "/vehicle-brands/99",
            Some(json!({ "name": "Kawasaki" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request(Method::DELETE, "/units/99", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vehicle_variant_requires_existing_brand() {
    let app = TestApp::new().await;
    let honda = app.vehicle_brand("Honda").await;

    let response = app
        .request(
            Method::POST,
            "/vehicle-variants",
            Some(json!({ "name": "Beat", "vehicleBrandId": 4242 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(
        body["errors"]["vehicleBrandId"],
        "The selected vehicle brand id is invalid."
    );

    let response = app
        .request(
            Method::POST,
            "/vehicle-variants",
            Some(json!({ "name": "Beat", "vehicleBrandId": honda })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let list = body_json(app.get("/vehicle-variants").await).await;
    let row = &list["records"]["data"][0];
    assert_eq!(row["name"], "Beat");
    assert_eq!(row["vehicleBrandId"], honda);
    assert_eq!(row["vehicleBrand"]["name"], "Honda");
}

#[tokio::test]
async fn variant_form_lists_brands_by_name() {
    let app = TestApp::new().await;
    app.vehicle_brand("Yamaha").await;
    app.vehicle_brand("Honda").await;

    let form = body_json(app.get("/vehicle-variants/add").await).await;
    assert!(form["record"].is_null());
    let names: Vec<_> = form["vehicleBrands"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Honda", "Yamaha"]);
}

#[tokio::test]
async fn urlencoded_forms_are_accepted() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/vehicle-brands")
        .header(header::AUTHORIZATION, format!("Bearer {}", common::ADMIN_TOKEN))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(axum::body::Body::from("name=Suzuki"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let list = body_json(app.get("/vehicle-brands").await).await;
    assert_eq!(list["records"]["data"][0]["name"], "Suzuki");
}

#[tokio::test]
async fn unknown_relation_is_a_bad_request() {
    let app = TestApp::new().await;
    let response = app.get("/products?with=owner").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
