use actix_web::http::{Method, StatusCode};
use actix_web::{test, web, App};
use lung_cancer_api::inference::{ModelInfo, Predictor};
use lung_cancer_api::models::FeatureVector;
use lung_cancer_api::routes::{self, StaticDir};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Returns a fixed label and records every vector it is asked about.
struct StubPredictor {
    label: i64,
    calls: AtomicUsize,
    seen: Mutex<Vec<FeatureVector>>,
}

impl StubPredictor {
    fn returning(label: i64) -> Arc<Self> {
        Arc::new(StubPredictor {
            label,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl Predictor for StubPredictor {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(*features);
        Ok(self.label)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo::new(0.5)
    }
}

struct BrokenPredictor;

impl Predictor for BrokenPredictor {
    fn predict(&self, _features: &FeatureVector) -> anyhow::Result<i64> {
        anyhow::bail!("incompatible model artifact")
    }

    fn info(&self) -> ModelInfo {
        ModelInfo::new(0.5)
    }
}

fn scenario_a() -> Value {
    json!({
        "gender": 1, "age": 45, "smoking": 2, "yellow_fingers": 1,
        "anxiety": 1, "peer_pressure": 2, "chronic_disease": 1,
        "fatigue": 2, "allergy": 1, "wheezing": 2,
        "alcohol_consuming": 1, "coughing": 2, "shortness_of_breath": 1,
        "swallowing_difficulty": 1, "chest_pain": 2
    })
}

macro_rules! app_with {
    ($predictor:expr, $static_dir:expr) => {{
        let predictor: Arc<dyn Predictor> = $predictor;
        let static_dir = StaticDir($static_dir.to_path_buf());
        test::init_service(
            App::new()
                .app_data(web::Data::from(predictor))
                .app_data(web::Data::new(static_dir.clone()))
                .configure(|cfg| routes::configure(cfg, &static_dir)),
        )
        .await
    }};
}

#[actix_web::test]
async fn scenario_a_positive_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let stub = StubPredictor::returning(1);
    let app = app_with!(stub.clone(), dir.path());

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(scenario_a())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"prediction": 1, "result": "lung cancer Detected"}));

    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    let seen = stub.seen.lock().unwrap();
    assert_eq!(
        seen[0].values(),
        &[1, 45, 2, 1, 1, 2, 1, 2, 1, 2, 1, 2, 1, 1, 2]
    );
}

#[actix_web::test]
async fn negative_prediction_label() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with!(StubPredictor::returning(0), dir.path());

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(scenario_a())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["prediction"], 0);
    assert_eq!(body["result"], "No lung cancer Detected");
}

#[actix_web::test]
async fn missing_gender_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let stub = StubPredictor::returning(1);
    let app = app_with!(stub.clone(), dir.path());

    let mut payload = scenario_a();
    payload.as_object_mut().unwrap().remove("gender");
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    let detail = body["detail"].as_array().unwrap();
    assert_eq!(detail.len(), 1);
    assert_eq!(detail[0]["field"], "gender");
    assert_eq!(detail[0]["type"], "missing_field");
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn every_failing_field_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with!(StubPredictor::returning(1), dir.path());

    let mut payload = scenario_a();
    payload["age"] = json!(0);
    payload["smoking"] = json!("");
    payload["chest_pain"] = json!(3);
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    let detail = body["detail"].as_array().unwrap();
    let fields: Vec<&str> = detail.iter().map(|d| d["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["age", "smoking", "chest_pain"]);
    assert_eq!(detail[0]["type"], "out_of_range");
    assert_eq!(detail[0]["expected"], "> 0");
    assert_eq!(detail[1]["type"], "blank_value");
    assert_eq!(detail[2]["expected"], "[1, 2]");
    assert_eq!(detail[2]["value"], 3);
}

#[actix_web::test]
async fn non_object_body_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with!(StubPredictor::returning(1), dir.path());

    let req = test::TestRequest::post()
        .uri("/predict")
        .insert_header(("content-type", "application/json"))
        .set_payload("[1, 45, 2]")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"][0]["field"], "body");
    assert_eq!(body["detail"][0]["type"], "invalid_body");
}

#[actix_web::test]
async fn inference_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with!(Arc::new(BrokenPredictor), dir.path());

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(scenario_a())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn health_and_model_info() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with!(StubPredictor::returning(0), dir.path());

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    let req = test::TestRequest::get().uri("/model-info").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["input_shape"], json!([1, 15]));
    assert_eq!(body["data"]["features"][2], "smoking");
}

#[actix_web::test]
async fn index_and_static_assets_are_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>risk</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1);").unwrap();
    let app = app_with!(StubPredictor::returning(0), dir.path());

    let req = test::TestRequest::get().uri("/").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "<h1>risk</h1>".as_bytes());

    let req = test::TestRequest::get().uri("/static/app.js").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn missing_index_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with!(StubPredictor::returning(0), dir.path());

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn cors_echoes_origin_with_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let predictor: Arc<dyn Predictor> = StubPredictor::returning(0);
    let static_dir = StaticDir(dir.path().to_path_buf());
    let app = test::init_service(
        App::new()
            .wrap(routes::cors())
            .app_data(web::Data::from(predictor))
            .app_data(web::Data::new(static_dir.clone()))
            .configure(|cfg| routes::configure(cfg, &static_dir)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Origin", "http://localhost:3000"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/predict")
        .insert_header(("Origin", "http://localhost:3000"))
        .insert_header(("Access-Control-Request-Method", "POST"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-credentials").unwrap(),
        "true"
    );
}
