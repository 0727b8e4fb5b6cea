//! Review, user and search endpoints over HTTP.

mod common;

use common::{ids, spawn_app, TestApp};
use serde_json::{json, Value};

/// PATCH without a body, as the like endpoint expects.
async fn like(app: &TestApp, path: &str) -> (u16, Value) {
    TestApp::finish(app.client.patch(app.url(path)).send().await.unwrap()).await
}

struct Seeded {
    product: i64,
    user: i64,
    great: i64,
    died: i64,
    screen: i64,
}

async fn seed(app: &TestApp) -> Seeded {
    let category = app.category("Phones").await;
    let product = app.product(category, "Phone", 499.0, true).await;
    let user = app.user("reviewer").await;

    let great = app
        .create(
            "/reviews",
            json!({"productId": product, "userId": user, "rating": 5,
                   "title": "Great battery", "verifiedPurchase": true}),
        )
        .await;
    let died = app
        .create(
            "/reviews",
            json!({"productId": product, "userId": user, "rating": "2",
                   "content": "The BATTERY died fast", "verifiedPurchase": "false"}),
        )
        .await;
    let screen = app
        .create(
            "/reviews",
            json!({"productId": product, "userId": user, "rating": 3,
                   "title": "Nice screen", "pros": ["bright", "sharp"]}),
        )
        .await;

    Seeded {
        product,
        user,
        great,
        died,
        screen,
    }
}

#[tokio::test]
async fn create_applies_review_defaults() {
    let app = spawn_app().await;
    let s = seed(&app).await;

    let (status, body) = app.get(&format!("/reviews/{}", s.great)).await;
    assert_eq!(status, 200);
    let review = &body["data"];
    assert_eq!(review["likes"], json!(0));
    assert_eq!(review["cons"], json!([]));
    assert_eq!(review["verifiedPurchase"], json!(true));

    let (_, body) = app.get(&format!("/reviews/{}", s.screen)).await;
    assert_eq!(body["data"]["pros"], json!(["bright", "sharp"]));
    assert_eq!(body["data"]["verifiedPurchase"], json!(false));
}

#[tokio::test]
async fn patch_rating_round_trips() {
    let app = spawn_app().await;
    let s = seed(&app).await;
    let path = format!("/reviews/{}", s.died);

    let (status, body) = app.patch(&path, json!({"rating": 4})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["rating"], json!(4));

    let (status, body) = app.patch(&path, json!({})).await;
    assert_eq!(status, 400);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No valid fields provided"));

    let (status, _) = app.patch(&path, json!({"productId": 999})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn review_for_unknown_product_is_rejected() {
    let app = spawn_app().await;
    let user = app.user("ghostwriter").await;
    let (status, body) = app
        .post("/reviews", json!({"productId": 31337, "userId": user, "rating": 4}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], json!("Foreign key constraint violation."));
}

#[tokio::test]
async fn search_filters_conjunctively_and_sorts_by_rating() {
    let app = spawn_app().await;
    let s = seed(&app).await;

    let (status, body) = app.get("/reviews/search?searchText=battery").await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body), vec![s.great, s.died]);

    let (_, body) = app.get("/reviews/search?rating=6").await;
    assert_eq!(ids(&body), vec![s.great, s.screen, s.died]);

    let (_, body) = app.get("/reviews/search?rating=0").await;
    assert_eq!(ids(&body).len(), 3);

    let (_, body) = app.get("/reviews/search?rating=3").await;
    assert_eq!(ids(&body), vec![s.screen]);

    let (_, body) = app.get("/reviews/search?verifiedPurchase=false").await;
    assert_eq!(ids(&body), vec![s.screen, s.died]);

    let (_, body) = app.get("/reviews/search?searchText=battery&verifiedPurchase=true").await;
    assert_eq!(ids(&body), vec![s.great]);

    let (_, body) = app.get("/reviews/search?sortOrder=asc").await;
    assert_eq!(ids(&body), vec![s.died, s.screen, s.great]);
}

#[tokio::test]
async fn likes_increment_and_sort() {
    let app = spawn_app().await;
    let s = seed(&app).await;
    let path = format!("/reviews/{}/like", s.died);

    let (status, body) = like(&app, &path).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["likes"], json!(1));
    let (_, body) = like(&app, &path).await;
    assert_eq!(body["data"]["likes"], json!(2));

    let (_, body) = app.get("/reviews/search?sortField=likes&sortOrder=desc").await;
    assert_eq!(ids(&body), vec![s.died, s.great, s.screen]);

    let (status, _) = like(&app, "/reviews/999/like").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn reviews_by_product_paginate() {
    let app = spawn_app().await;
    let s = seed(&app).await;
    let base = format!("/reviews/product/{}", s.product);

    let (status, body) = app.get(&base).await;
    assert_eq!(status, 200);
    assert_eq!(ids(&body), vec![s.great, s.screen, s.died]);

    let (_, body) = app.get(&format!("{}?sortOrder=asc&limit=2", base)).await;
    assert_eq!(ids(&body), vec![s.died, s.screen]);

    let (_, body) = app.get(&format!("{}?limit=2&page=2", base)).await;
    assert_eq!(ids(&body), vec![s.died]);

    let (status, _) = app.get("/reviews/product/999").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn stats_summarise_ratings() {
    let app = spawn_app().await;
    let s = seed(&app).await;

    let (status, body) = app.get(&format!("/reviews/product/{}/stats", s.product)).await;
    assert_eq!(status, 200);
    let stats = &body["data"];
    assert_eq!(stats["totalReviews"], json!(3));
    assert!((stats["averageRating"].as_f64().unwrap() - 10.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats["ratingCounts"]["5"], json!(1));
    assert_eq!(stats["ratingCounts"]["4"], json!(0));

    let category = app.category("Empty").await;
    let lonely = app.product(category, "Unreviewed", 1.0, true).await;
    let (status, body) = app.get(&format!("/reviews/product/{}/stats", lonely)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["totalReviews"], json!(0));
    assert_eq!(body["data"]["averageRating"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = spawn_app().await;
    app.user("ada").await;
    let (status, body) = app
        .post(
            "/users",
            json!({"username": "ada", "email": "other@example.com", "passwordHash": "h"}),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["message"], json!("Duplicate value error."));
    assert!(body["detail"].is_string());

    let other = app.user("grace").await;
    let (status, _) = app
        .patch(&format!("/users/{}", other), json!({"email": "ada@example.com"}))
        .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn deleting_a_user_removes_their_reviews() {
    let app = spawn_app().await;
    let s = seed(&app).await;

    let (status, body) = app.get(&format!("/users/{}/details", s.user)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["reviews"].as_array().map(Vec::len), Some(3));

    let (status, _) = app.delete(&format!("/users/{}", s.user)).await;
    assert_eq!(status, 200);

    let (_, body) = app.get("/reviews").await;
    assert!(ids(&body).is_empty());
}

#[tokio::test]
async fn review_details_embed_product_and_author() {
    let app = spawn_app().await;
    let s = seed(&app).await;
    let (status, body) = app.get(&format!("/reviews/{}/details", s.screen)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["product"]["id"], json!(s.product));
    assert_eq!(body["data"]["user"]["username"], json!("reviewer"));
}

#[tokio::test]
async fn rating_and_likes_must_stay_in_range() {
    let app = spawn_app().await;
    let s = seed(&app).await;

    for body in [
        json!({"productId": s.product, "userId": s.user, "rating": 42}),
        json!({"productId": s.product, "userId": s.user, "rating": 0}),
        json!({"productId": s.product, "userId": s.user, "rating": 4, "likes": -7}),
    ] {
        let (status, resp) = app.post("/reviews", body).await;
        assert_eq!(status, 400);
        assert_eq!(resp["message"], json!("Check constraint violation."));
        assert!(resp["detail"].is_string());
    }

    let (status, _) = app.patch(&format!("/reviews/{}", s.great), json!({"rating": 6})).await;
    assert_eq!(status, 400);

    let (_, body) = app.get(&format!("/reviews/product/{}/stats", s.product)).await;
    assert_eq!(body["data"]["totalReviews"], json!(3));
    let counts = body["data"]["ratingCounts"].as_object().unwrap();
    assert_eq!(counts.len(), 5);
}
