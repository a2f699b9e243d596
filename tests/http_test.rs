use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use graphcat::catalog::{CatalogStore, Metric, NewGraph};
use graphcat::http::{router, AppState};
use graphcat::ServerConfig;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

fn app_with(graphs: u64) -> (Router, Arc<RwLock<CatalogStore>>) {
    let mut store = CatalogStore::new();
    for i in 0..graphs {
        let graph = NewGraph::new(format!("graph_{:02}.graphml", i))
            .with_metric(Metric::NumNodes, 10 + i)
            .with_metric(Metric::NumEdges, 2 * i)
            .planar(i % 2 == 0);
        // every fifth graph has no file
        let payload = if i % 5 == 4 { None } else { Some(format!("<graphml id=\"{}\"/>", i).into_bytes()) };
        store.insert(graph, payload).unwrap();
    }
    let store = Arc::new(RwLock::new(store));
    let app = router(AppState::new(Arc::clone(&store), ServerConfig::default()));
    (app, store)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn zip_names(bytes: Vec<u8>) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_list_graphs_paginates() {
    let (app, _) = app_with(25);

    let response = app.oneshot(get("/api/graphs?page=3&limit=10")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["totalRecords"], 25);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["currentPage"], 3);
    assert_eq!(body["graphs"].as_array().unwrap().len(), 5);
    assert_eq!(body["graphs"][0]["fileName"], "graph_20.graphml");
}

#[tokio::test]
async fn test_list_defaults() {
    let (app, _) = app_with(12);
    let body = body_json(app.oneshot(get("/api/graphs")).await.unwrap()).await;
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["graphs"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_filter_graphs() {
    let (app, _) = app_with(20);
    let request = post(
        "/api/graphs/filter",
        json!({
            "filters": {
                "numNodes": { "min": 12, "max": 20, "operator1": ">=", "operator2": "<" },
                "isPlanar": "true"
            },
            "limit": 50
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    // numNodes 12..=19 and even index: 12, 14, 16, 18
    assert_eq!(body["totalRecords"], 4);
    let names: Vec<&str> = body["graphs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["fileName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["graph_02.graphml", "graph_04.graphml", "graph_06.graphml", "graph_08.graphml"]);
}

#[tokio::test]
async fn test_invalid_filter_is_bad_request() {
    let (app, _) = app_with(3);

    let response = app
        .clone()
        .oneshot(post("/api/graphs/filter", json!({ "filters": { "numEdges": { "min": 9, "max": 1 } } })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("numEdges"));

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/graphs/filter")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());
}

#[tokio::test]
async fn test_add_graph() {
    let (app, store) = app_with(2);

    let response = app
        .clone()
        .oneshot(post(
            "/api/graphs/add",
            json!({ "fileName": "k5.graphml", "numNodes": 5, "numEdges": 10, "chromNum": 5, "isPlanar": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["fileName"], "k5.graphml");
    assert_eq!(body["id"], 3);
    assert!(body["dateAdded"].is_string());
    assert_eq!(store.read().await.len(), 3);

    let response = app.oneshot(post("/api/graphs/add", json!({ "fileName": "" }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_graph_rejects_paths() {
    let (app, store) = app_with(2);

    for name in ["/etc/passwd", "../outside.graphml", "nested/inner.graphml", ".."] {
        let response = app
            .clone()
            .oneshot(post("/api/graphs/add", json!({ "fileName": name })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", name);
        assert!(body_json(response).await["message"].as_str().unwrap().contains("fileName"));
    }
    assert_eq!(store.read().await.len(), 2);
}

#[tokio::test]
async fn test_download_filtered_zip() {
    let (app, _) = app_with(10);
    let response = app
        .oneshot(post("/api/graphs/download", json!({ "filters": { "numNodes": { "max": 14 } } })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("filtered_graph_files.zip"));

    // numNodes 10..=14 is graphs 0..=4; graph 4 has no file
    let names = zip_names(body_bytes(response).await);
    assert_eq!(
        names,
        vec!["graph_00.graphml", "graph_01.graphml", "graph_02.graphml", "graph_03.graphml"]
    );
}

#[tokio::test]
async fn test_download_sample_zip() {
    let (app, _) = app_with(30);

    for method in ["random", "representative", "cluster"] {
        let request = post(
            "/api/graphs/download-sample",
            json!({ "sampleSize": 6, "samplingMethod": method, "seed": 4, "filters": { "isPlanar": "both" } }),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", method);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("graph_sample.zip"));

        // sampled records without a file are left out of the archive
        let names = zip_names(body_bytes(response).await);
        assert!(!names.is_empty() && names.len() <= 6, "{}: {:?}", method, names);
    }
}

#[tokio::test]
async fn test_sample_size_zero_gives_empty_archive() {
    let (app, _) = app_with(5);
    let response = app
        .oneshot(post("/api/graphs/download-sample", json!({ "sampleSize": 0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(zip_names(body_bytes(response).await).is_empty());
}

#[tokio::test]
async fn test_unknown_method_falls_back_to_random() {
    let (app, _) = app_with(8);
    let response = app
        .oneshot(post("/api/graphs/download-sample", json!({ "sampleSize": 100, "samplingMethod": "stratified" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    // fewer matches than requested: every graph with a file
    assert_eq!(zip_names(body_bytes(response).await).len(), 7);
}

#[tokio::test]
async fn test_non_string_method_falls_back_to_random() {
    let (app, _) = app_with(8);
    for method in [json!(null), json!(3), json!(["cluster"])] {
        let response = app
            .clone()
            .oneshot(post("/api/graphs/download-sample", json!({ "sampleSize": 100, "samplingMethod": method })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", method);
        assert_eq!(zip_names(body_bytes(response).await).len(), 7);
    }
}

#[tokio::test]
async fn test_sample_entries_hold_the_stored_files() {
    let (app, _) = app_with(40);
    let response = app
        .oneshot(post(
            "/api/graphs/download-sample",
            json!({ "sampleSize": 10, "samplingMethod": "representative", "seed": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut archive = zip::ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
    assert!(archive.len() > 0 && archive.len() <= 10);
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let index: u64 = entry.name()["graph_".len()..entry.name().len() - ".graphml".len()].parse().unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut entry, &mut content).unwrap();
        assert_eq!(content, format!("<graphml id=\"{}\"/>", index));
    }
}

#[tokio::test]
async fn test_status_and_cors() {
    let (app, _) = app_with(4);
    let request = Request::builder()
        .uri("/api/status")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], graphcat::VERSION);
    assert_eq!(body["storage"]["graphs"], 4);
}
