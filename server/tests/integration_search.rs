use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use paper_core::persist::{save_index, IndexPaths};
use paper_core::{Document, Engine};
use serde_json::Value;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn papers() -> Vec<Document> {
    vec![
        Document {
            title: "Deep learning survey".into(),
            authors: "Yann LeCun Yoshua Bengio".into(),
            publication_date: "2015".into(),
            affiliations: "New York University".into(),
            address: "USA".into(),
            full_text: "Representation learning with deep networks.".into(),
        },
        Document {
            title: "Shallow learning".into(),
            authors: "Jane Roe".into(),
            publication_date: "2001".into(),
            affiliations: "University of Toronto".into(),
            address: "Canada".into(),
            full_text: "".into(),
        },
    ]
}

fn engine() -> Arc<Engine> {
    let engine = Engine::default();
    for doc in papers() {
        engine.add_document(doc).unwrap();
    }
    engine.finalize().unwrap();
    Arc::new(engine)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let app = paper_server::build_router(engine());
    let (status, json) = call(app, "/search?q=learning&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    // Doc 0 matches in title and full text
    assert_eq!(arr[0]["doc_id"].as_u64().unwrap(), 0);
    assert_eq!(arr[1]["doc_id"].as_u64().unwrap(), 1);
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
    assert_eq!(arr[1]["address"], "Canada");
    assert_eq!(arr[0]["publication_date"], "2015");
}

#[tokio::test]
async fn fields_parameter_restricts_search() {
    let app = paper_server::build_router(engine());
    let (status, json) = call(app.clone(), "/search?q=canada&fields=title&fields=full_text").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());

    let (_, json) = call(app, "/search?q=canada&fields=address,affiliations").await;
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn syntax_errors_are_bad_requests() {
    let app = paper_server::build_router(engine());
    let (status, json) = call(app.clone(), "/search?q=(title:foo%20AND").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["position"].is_u64());

    let (status, _) = call(app, "/search?q=foo&fields=body").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn zero_k_returns_no_results() {
    let app = paper_server::build_router(engine());
    let (status, json) = call(app, "/search?q=learning&k=0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn negative_k_returns_no_results() {
    let app = paper_server::build_router(engine());
    let (status, json) = call(app, "/search?q=learning&k=-1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deeply_nested_query_is_a_bad_request() {
    let app = paper_server::build_router(engine());
    let uri = format!("/search?q={}learning{}", "%28".repeat(5_000), "%29".repeat(5_000));
    let (status, json) = call(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "query nested too deeply");

    let (status, json) = call(app, "/search?q=%2Bdeep%20learning").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["doc_id"].as_u64().unwrap(), 0);
}

#[tokio::test]
async fn doc_lookup() {
    let app = paper_server::build_router(engine());
    let (status, json) = call(app.clone(), "/doc/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Shallow learning");

    let (status, _) = call(app, "/doc/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_a_snapshot_from_disk() {
    let dir = tempdir().unwrap();
    let built = engine();
    save_index(&IndexPaths::new(dir.path()), &built.index().unwrap(), "2024-01-01T00:00:00Z").unwrap();

    let app = paper_server::build_app(dir.path().to_string_lossy().to_string()).unwrap();
    let (status, json) = call(app, "/search?q=title:deep").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["authors"], "Yann LeCun Yoshua Bengio");
}
