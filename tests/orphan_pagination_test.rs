mod common;

use axum::http::{Method, StatusCode};
use chrono::{TimeZone, Utc};
use inventory_admin::entities::unit;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};

use common::{body_json, TestApp};

#[tokio::test]
async fn deleting_a_category_orphans_its_products() {
    let app = TestApp::new().await;
    let category = app.category("Brake System", "brake-system").await;
    let unit = app.unit("Set", "set").await;

    let response = app
        .request(
            Method::POST,
            "/products",
            Some(json!({
                "name": "Brake Pad",
                "slug": "brake-pad",
                "description": null,
                "stock": 4,
                "cost": "35000",
                "price": "52500",
                "status": "on",
                "categoryId": category,
                "unitId": unit,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .request(Method::DELETE, &format!("/categories/{}", category), None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let list = body_json(app.get("/products").await).await;
    assert_eq!(list["records"]["total"], 1);
    let product = &list["records"]["data"][0];
    assert_eq!(product["name"], "Brake Pad");
    assert!(product["categoryId"].is_null());
    assert!(product["category"].is_null());
    assert_eq!(product["unitId"], unit);
    assert_eq!(product["unit"]["name"], "Set");

    let response = app
        .request(Method::DELETE, &format!("/units/{}", unit), None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let list = body_json(app.get("/products").await).await;
    assert!(list["records"]["data"][0]["unitId"].is_null());
}

#[tokio::test]
async fn deleting_a_brand_orphans_its_variants() {
    let app = TestApp::new().await;
    let honda = app.vehicle_brand("Honda").await;
    let yamaha = app.vehicle_brand("Yamaha").await;

    for (name, brand) in [("Beat", honda), ("Vario 125", honda), ("NMAX", yamaha)] {
        let response = app
            .request(
                Method::POST,
                "/vehicle-variants",
                Some(json!({ "name": name, "vehicleBrandId": brand })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = app
        .request(Method::DELETE, &format!("/vehicle-brands/{}", honda), None)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let list = body_json(app.get("/vehicle-variants").await).await;
    let rows = list["records"]["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    for row in rows {
        if row["name"] == "NMAX" {
            assert_eq!(row["vehicleBrandId"], yamaha);
            assert_eq!(row["vehicleBrand"]["name"], "Yamaha");
        } else {
            assert!(row["vehicleBrandId"].is_null());
            assert!(row["vehicleBrand"].is_null());
        }
    }

    // An orphaned variant must be given a brand again before it can be saved.
    let orphan = rows.iter().find(|r| r["name"] == "Beat").unwrap();
    let response = app
        .request(
            Method::PUT,
            &format!("/vehicle-variants/{}", orphan["id"]),
            Some(json!({ "name": "Beat", "vehicleBrandId": null })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(
        body["errors"]["vehicleBrandId"],
        "The vehicle brand id field is required."
    );
}

#[tokio::test]
async fn listings_page_newest_first() {
    let app = TestApp::new().await;
    for n in 1..=25 {
        app.unit(&format!("Unit {:02}", n), &format!("u{:02}", n)).await;
    }

    let first = body_json(app.get("/units").await).await;
    let records = &first["records"];
    assert_eq!(records["total"], 25);
    assert_eq!(records["last_page"], 3);
    assert_eq!(records["per_page"], 10);
    assert_eq!(records["from"], 1);
    assert_eq!(records["to"], 10);
    assert_eq!(records["data"][0]["code"], "u25");
    assert_eq!(records["data"][9]["code"], "u16");
    assert!(records["prev_page_url"].is_null());
    assert_eq!(records["next_page_url"], "/units?page=2");

    let last = body_json(app.get("/units?page=3").await).await;
    let records = &last["records"];
    assert_eq!(records["current_page"], 3);
    assert_eq!(records["data"].as_array().unwrap().len(), 5);
    assert_eq!(records["data"][4]["code"], "u01");
    assert!(records["next_page_url"].is_null());

    let beyond = body_json(app.get("/units?page=7").await).await;
    assert!(beyond["records"]["data"].as_array().unwrap().is_empty());
    assert_eq!(beyond["records"]["total"], 25);

    let mut concatenated = Vec::new();
    for page in 1..=3 {
        let list = body_json(app.get(&format!("/units?page={}", page)).await).await;
        concatenated.extend(codes(&list["records"]["data"]));
    }
    let expected: Vec<String> = (1..=25).rev().map(|n| format!("u{:02}", n)).collect();
    assert_eq!(concatenated, expected);
}

fn codes(rows: &Value) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["code"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn rows_created_together_fall_back_to_id_order() {
    let app = TestApp::new().await;
    let stamp = Utc.with_ymd_and_hms(2025, 7, 13, 8, 0, 0).unwrap();
    let mut ids = Vec::new();
    for n in 1..=12 {
        let row = unit::ActiveModel {
            name: Set(format!("Tied {:02}", n)),
            code: Set(format!("t{:02}", n)),
            created_at: Set(stamp),
            updated_at: Set(stamp),
            ..Default::default()
        }
        .insert(app.state.db.as_ref())
        .await
        .unwrap();
        ids.push(row.id);
    }

    let mut listed = Vec::new();
    for page in 1..=2 {
        let list = body_json(app.get(&format!("/units?page={}", page)).await).await;
        for row in list["records"]["data"].as_array().unwrap() {
            listed.push(row["id"].as_i64().unwrap() as i32);
        }
    }
    ids.reverse();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn out_of_range_or_unreadable_pages_do_not_fail() {
    let app = TestApp::new().await;
    app.unit("Pieces", "pcs").await;

    let response = app.get("/units?page=1000000000000000000").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["records"]["data"].as_array().unwrap().is_empty());
    assert_eq!(body["records"]["total"], 1);
    assert_eq!(body["records"]["last_page"], 1);

    for query in ["page=abc", "page=-4", "page="] {
        let response = app.get(&format!("/units?{}", query)).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", query);
        let body = body_json(response).await;
        assert_eq!(body["records"]["current_page"], 1, "{}", query);
        assert_eq!(codes(&body["records"]["data"]), vec!["pcs"], "{}", query);
    }
}

#[tokio::test]
async fn listings_accept_an_empty_relation_list() {
    let app = TestApp::new().await;
    let honda = app.vehicle_brand("Honda").await;
    app.request(
        Method::POST,
        "/vehicle-variants",
        Some(json!({ "name": "Beat", "vehicleBrandId": honda })),
    )
    .await;

    let list = body_json(app.get("/vehicle-variants?with=").await).await;
    let row = &list["records"]["data"][0];
    assert_eq!(row["vehicleBrandId"], honda);
    assert!(row["vehicleBrand"].is_null());

    let response = app.get("/vehicle-variants?with=vehicleBrand,owner").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Bad request: Unknown relation 'owner'");
}
