use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use log::{error, info, warn};

use aqi_forecast::{ModelState, ModelStore, ServiceConfig, routes};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ServiceConfig::from_env().context("invalid configuration")?;
    info!(
        "loading model from {} and columns from {}",
        config.model_path().display(),
        config.columns_path().display()
    );

    let state = match ModelStore::load(config.model_path(), config.columns_path()) {
        Ok(store) => ModelState::Ready(store),
        Err(e) if config.fail_fast() => {
            return Err(e).context("failed to load model artifacts");
        }
        Err(e) => {
            error!("failed to load model artifacts: {e}");
            ModelState::Unavailable(e)
        }
    };
    if state.is_ready() {
        info!("model ready");
    } else {
        warn!("serving without a model, every prediction will fail");
    }
    let state = web::Data::new(state);

    let addr = format!("{}:{}", config.host(), config.port());
    let server = HttpServer::new(move || {
        App::new()
            .wrap(routes::cors())
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(&addr)
    .with_context(|| format!("cannot bind {addr}"))?;

    info!("listening at {addr}");
    server.run().await?;

    info!("server stopped");
    Ok(())
}
