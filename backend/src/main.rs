use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use log::{error, info};
use lung_cancer_api::config::ServerConfig;
use lung_cancer_api::inference::{ModelInference, Predictor};
use lung_cancer_api::routes::{self, StaticDir};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Starting lung cancer prediction API v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env().map_err(|e| {
        error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let model: Arc<dyn Predictor> = match ModelInference::load(&config.model_path, config.threshold) {
        Ok(model) => {
            info!("✅ Model loaded from {}", config.model_path.display());
            Arc::new(model)
        }
        Err(e) => {
            error!("❌ {}", e);
            return Err(io::Error::other(e));
        }
    };

    let model_data = web::Data::from(model);
    let static_dir = StaticDir(config.static_dir.clone());
    let bind_address = config.bind_address();

    info!("🌐 Listening on http://{}", bind_address);
    info!("👷 Workers: {}", config.workers);
    info!("   GET  /            - Web interface");
    info!("   GET  /health      - Health check");
    info!("   GET  /model-info  - Model information");
    info!("   POST /predict     - Lung cancer prediction");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(routes::cors())
            .app_data(model_data.clone())
            .app_data(web::Data::new(static_dir.clone()))
            .configure(|cfg| routes::configure(cfg, &static_dir))
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await
}
