use actix_cors::Cors;
use actix_web::{
    HttpResponse, Responder, ResponseError,
    http::header::ContentType,
    web,
};
use log::{error, warn};

use crate::{
    error::PredictError,
    predict::{self, PredictionRequest, PredictionResponse},
    store::ModelState,
};

pub const ONLINE_MESSAGE: &str = "API is Online";

/// Largest prediction body read off the connection.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Registers the service's routes. The app must carry a `web::Data<ModelState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(online))
            .route(web::post().to(handle_predict)),
    )
    .service(web::resource("/predict").route(web::post().to(handle_predict)));
}

/// Any origin, method and header is allowed.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

async fn online() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(ONLINE_MESSAGE)
}

async fn handle_predict(
    state: web::Data<ModelState>,
    payload: web::Payload,
) -> Result<web::Json<PredictionResponse>, PredictError> {
    let body = match payload.to_bytes_limited(MAX_BODY_BYTES).await {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(e)) => Err(PredictError::Payload(e.to_string())),
        Err(_) => Err(PredictError::BodyTooLarge {
            limit: MAX_BODY_BYTES,
        }),
    };
    let result = body
        .and_then(|body| PredictionRequest::from_slice(&body))
        .and_then(|request| predict::predict(state.store()?, &request));

    match result {
        Ok(response) => Ok(web::Json(response)),
        Err(e) => {
            if e.status_code().is_client_error() {
                warn!("rejected prediction: {e}");
            } else {
                error!("prediction failed: {e}");
            }
            Err(e)
        }
    }
}
