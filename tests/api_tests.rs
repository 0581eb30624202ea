use axum_test::TestServer;
use serde_json::json;

use toolboxd::api::{create_router, AppState};
use toolboxd::services::recommender::{FactorModel, LatentFactors, ModelFile, ModelHandle};

fn factors(id: &str, bias: f64, factors: [f64; 2]) -> LatentFactors {
    LatentFactors {
        id: id.to_string(),
        bias,
        factors: factors.to_vec(),
    }
}

fn test_model() -> FactorModel {
    FactorModel::from_model_file(ModelFile {
        name: Some("TestModel".to_string()),
        n_factors: 2,
        global_mean: 3.5,
        min_rating: 0.5,
        max_rating: 5.0,
        reg: 0.005,
        init_std: 0.1,
        users: vec![factors("existing", 0.1, [0.5, 0.5])],
        items: vec![
            factors("123", 0.5, [1.0, 0.5]),
            factors("456", -0.3, [-0.5, 1.0]),
            factors("789", 2.5, [2.0, 2.0]),
            factors("abc", -4.0, [-1.0, 0.0]),
            factors("def", 0.0, [0.1, 0.1]),
        ],
    })
    .unwrap()
}

fn create_test_server() -> TestServer {
    let state = AppState::new(ModelHandle::new(test_model()));
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_root_describes_model() {
    let server = create_test_server();
    let response = server.get("/").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["message"].as_str().unwrap().starts_with("TestModel("));
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let server = create_test_server();
    let response = server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_model_users_and_items() {
    let server = create_test_server();

    let response = server.get("/model_users").await;
    response.assert_status_ok();
    let users: serde_json::Value = response.json();
    assert_eq!(users["count"], 1);
    assert_eq!(users["items"], json!(["existing"]));

    let response = server.get("/model_items").await;
    response.assert_status_ok();
    let items: serde_json::Value = response.json();
    assert_eq!(items["count"], 5);
    assert_eq!(items["items"][0], "123");
}

#[tokio::test]
async fn test_get_recommendations_path_endpoint() {
    let server = create_test_server();

    let response = server
        .post("/get_recommendations/user=newbie&item_list=123,456&rating_list=4.0,3.5")
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let results = body["results"].as_array().unwrap();

    // Every known film except the two just rated
    assert_eq!(results.len(), 3);
    let films: Vec<&str> = results.iter().map(|r| r["film"].as_str().unwrap()).collect();
    assert!(!films.contains(&"123") && !films.contains(&"456"));

    let predictions: Vec<f64> = results
        .iter()
        .map(|r| r["prediction"].as_f64().unwrap())
        .collect();
    assert!(predictions.iter().all(|p| (0.5..=5.0).contains(p)));
    assert!(predictions.windows(2).all(|w| w[0] >= w[1]));
    assert!(results.iter().all(|r| r["member"] == "newbie"));

    // The member is now known to the model
    let users: serde_json::Value = server.get("/model_users").await.json();
    assert_eq!(users["count"], 2);
}

#[tokio::test]
async fn test_get_recommendations_rejects_mismatched_lists() {
    let server = create_test_server();

    let response = server
        .post("/get_recommendations/user=newbie&item_list=123,456&rating_list=4.0")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_get_recommendations_unknown_films() {
    let server = create_test_server();

    let response = server
        .post("/get_recommendations/user=newbie&item_list=zzz&rating_list=4.0")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_json_recommendations_endpoint() {
    let server = create_test_server();

    let response = server
        .post("/recommendations")
        .json(&json!({
            "user": "existing",
            "ratings": [
                {"film": "789", "rating": 5.0},
                {"film": "unknown", "rating": 1.0}
            ]
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r["film"] != "789"));
}

#[tokio::test]
async fn test_json_recommendations_requires_ratings() {
    let server = create_test_server();

    let response = server
        .post("/recommendations")
        .json(&json!({ "user": "existing", "ratings": [] }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_recommendations_rejects_empty_slots() {
    let server = create_test_server();

    let response = server
        .post("/get_recommendations/user=newbie&item_list=123,,456&rating_list=4.0,3.5,")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    let users: serde_json::Value = server.get("/model_users").await.json();
    assert_eq!(users["count"], 1);
}
