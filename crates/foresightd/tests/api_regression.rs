//! API regression tests.
//!
//! Drives the full router the daemon serves: autoscaler lifecycle,
//! scale targets and metric readings, and the envelope every response
//! is wrapped in.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use foresight_api::build_router;
use foresight_autoscale::LocalCluster;
use foresight_state::*;
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_cluster() -> LocalCluster {
    LocalCluster::new(StateStore::open_in_memory().unwrap())
}

fn autoscaler_json(ns: &str, name: &str) -> Value {
    json!({
        "metadata": {"name": name, "namespace": ns},
        "spec": {
            "scaleTargetRef": {"apiVersion": "apps/v1", "kind": "Deployment", "name": name},
            "minReplicas": 1,
            "maxReplicas": 10,
            "metrics": [{
                "type": "Resource",
                "name": "cpu",
                "target": {"type": "Utilization", "value": 50.0}
            }],
            "models": [{
                "type": "Linear",
                "name": "trend",
                "linear": {"historySize": 6, "lookAhead": 30}
            }]
        }
    })
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn api_list_autoscalers_empty() {
    let router = build_router(test_cluster());

    let resp = router.oneshot(get("/api/v1/autoscalers")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn api_create_get_and_replace_autoscaler() {
    let router = build_router(test_cluster());
    let doc = autoscaler_json("prod", "web");

    let resp = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/autoscalers", &doc))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = router
        .clone()
        .oneshot(get("/api/v1/autoscalers/prod/web"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["spec"]["maxReplicas"], 10);
    assert_eq!(body["data"]["spec"]["models"][0]["name"], "trend");

    // Applying again replaces the spec in place.
    let mut changed = doc.clone();
    changed["spec"]["maxReplicas"] = json!(20);
    let resp = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/autoscalers", &changed))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router.oneshot(get("/api/v1/autoscalers")).await.unwrap();
    let body = body_json(resp).await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["spec"]["maxReplicas"], 20);
}

#[tokio::test]
async fn api_malformed_autoscaler_is_rejected() {
    let router = build_router(test_cluster());

    let resp = router
        .oneshot(json_request(
            "POST",
            "/api/v1/autoscalers",
            &json!({"metadata": {"name": "web"}}),
        ))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn api_delete_autoscaler() {
    let cluster = test_cluster();
    let autoscaler: PredictiveAutoscaler =
        serde_json::from_value(autoscaler_json("default", "api")).unwrap();
    cluster.apply_autoscaler(&autoscaler).unwrap();
    cluster
        .state()
        .create_state_document(&StateDocument::for_autoscaler(&autoscaler).unwrap())
        .unwrap();

    let router = build_router(cluster.clone());

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/autoscalers/default/api")
        .body(Body::empty())
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Confirm gone, along with its state document.
    let resp = router
        .clone()
        .oneshot(get("/api/v1/autoscalers/default/api"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = router
        .oneshot(get("/api/v1/autoscalers/default/api/data"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_autoscaler_data_returns_histories() {
    let cluster = test_cluster();
    let autoscaler: PredictiveAutoscaler =
        serde_json::from_value(autoscaler_json("prod", "web")).unwrap();
    cluster.apply_autoscaler(&autoscaler).unwrap();

    let mut doc = StateDocument::for_autoscaler(&autoscaler).unwrap();
    let mut data = PredictiveAutoscalerData::default();
    data.model_histories
        .insert("trend".to_string(), ModelHistory::new(ModelType::Linear));
    doc.store_data(&data).unwrap();
    cluster.state().create_state_document(&doc).unwrap();

    let router = build_router(cluster);
    let resp = router
        .oneshot(get("/api/v1/autoscalers/prod/web/data"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let trend = &body["data"]["modelHistories"]["trend"];
    assert_eq!(trend["type"], "Linear");
    assert_eq!(trend["syncPeriodsPassed"], 1);
}

#[tokio::test]
async fn api_put_and_get_scale() {
    let router = build_router(test_cluster());

    let resp = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/scales/prod/Deployment/web",
            &json!({"replicas": 3, "selector": "app=web", "apiVersion": "apps/v1"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .oneshot(get("/api/v1/scales/prod/Deployment/web"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["replicas"], 3);
    assert_eq!(body["data"]["selector"], "app=web");
    assert_eq!(body["data"]["target"]["kind"], "Deployment");
}

#[tokio::test]
async fn api_negative_scale_is_rejected() {
    let router = build_router(test_cluster());

    let resp = router
        .oneshot(json_request(
            "PUT",
            "/api/v1/scales/prod/Deployment/web",
            &json!({"replicas": -1}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("negative"));
}

#[tokio::test]
async fn api_put_readings_stores_them() {
    let cluster = test_cluster();
    let router = build_router(cluster.clone());

    let resp = router
        .oneshot(json_request(
            "PUT",
            "/api/v1/readings/prod",
            &json!({
                "selector": "app=web",
                "readings": [{
                    "name": "cpu",
                    "value": 80.0,
                    "readyPods": 2,
                    "timestamp": "2026-01-01T00:00:00Z"
                }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = cluster
        .state()
        .get_metric_readings("prod", "app=web")
        .unwrap()
        .unwrap();
    assert_eq!(stored.readings.len(), 1);
    assert_eq!(stored.readings[0].ready_pods, Some(2));
}

#[tokio::test]
async fn api_missing_resources_return_not_found() {
    let router = build_router(test_cluster());

    for uri in [
        "/api/v1/autoscalers/prod/missing",
        "/api/v1/autoscalers/prod/missing/data",
        "/api/v1/scales/prod/Deployment/missing",
    ] {
        let resp = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/autoscalers/prod/missing")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
