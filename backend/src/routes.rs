use crate::inference::{ModelInfo, Predictor};
use crate::models::{
    validate_and_encode, ApiResponse, FieldErrorDetail, PredictionResult, ValidationFailure,
};
use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::error::InternalError;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info, warn};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Directory holding `index.html` and the frontend assets.
#[derive(Debug, Clone)]
pub struct StaticDir(pub PathBuf);

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success("Lung cancer prediction API is running"))
}

pub async fn model_info(model: web::Data<dyn Predictor>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::<ModelInfo>::success(model.info()))
}

pub async fn predict(
    model: web::Data<dyn Predictor>,
    payload: web::Json<Map<String, Value>>,
) -> HttpResponse {
    let features = match validate_and_encode(&payload) {
        Ok(features) => features,
        Err(errors) => {
            warn!(
                "Rejected prediction request, invalid fields {:?}: {}",
                errors.fields(),
                errors
            );
            return HttpResponse::UnprocessableEntity().json(ValidationFailure::from(&errors));
        }
    };

    let model = model.into_inner();
    match web::block(move || model.predict(&features)).await {
        Ok(Ok(prediction)) => {
            let result = PredictionResult::new(prediction);
            info!("Prediction served: {} ({})", result.prediction, result.result);
            HttpResponse::Ok().json(result)
        }
        Ok(Err(e)) => {
            error!("Inference failed: {:#}", e);
            HttpResponse::InternalServerError().json(json!({ "detail": format!("Inference failed: {}", e) }))
        }
        Err(e) => {
            error!("Blocking inference task failed: {}", e);
            HttpResponse::InternalServerError().json(json!({ "detail": "Inference task failed" }))
        }
    }
}

pub async fn index(req: HttpRequest, static_dir: web::Data<StaticDir>) -> HttpResponse {
    let path = static_dir.0.join("index.html");
    match NamedFile::open_async(&path).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            error!("Could not open {}: {}", path.display(), e);
            HttpResponse::InternalServerError().body("Failed to load interface")
        }
    }
}

/// Rejections of the JSON extractor are reported in the same shape as field
/// validation failures.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            let failure = ValidationFailure {
                detail: vec![FieldErrorDetail {
                    field: "body".to_string(),
                    kind: "invalid_body",
                    msg: err.to_string(),
                    expected: Some("JSON object"),
                    value: None,
                }],
            };
            let response = HttpResponse::UnprocessableEntity().json(failure);
            InternalError::from_response(err, response).into()
        })
}

/// Any origin, method and header, with credentials. Origins are echoed back
/// rather than answered with `*`.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

/// Registers every route. The caller provides the `Data<dyn Predictor>` and
/// `Data<StaticDir>` app data.
pub fn configure(cfg: &mut web::ServiceConfig, static_dir: &StaticDir) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health_check))
        .route("/model-info", web::get().to(model_info))
        .route("/predict", web::post().to(predict))
        .route("/", web::get().to(index))
        .service(Files::new("/static", &static_dir.0).prefer_utf8(true));
}
