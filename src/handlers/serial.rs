use actix_web::{HttpResponse, Result, web};

use crate::config::Config;
use crate::models::*;
use crate::services::SerialValidator;

#[utoipa::path(
    get,
    path = "/config",
    tag = "public",
    responses(
        (status = 200, description = "Client settings", body = PublicConfigResponse)
    )
)]
/// Campaign window and validation pacing for the front-end
pub async fn get_public_config(config: web::Data<Config>) -> Result<HttpResponse> {
    let data = PublicConfigResponse {
        campaign_name: config.campaign.name.clone(),
        campaign_starts_on: config.campaign.starts_on,
        campaign_ends_on: config.campaign.ends_on,
        validation_debounce_ms: config.validation.debounce_ms,
        draw_animation_frames: config.draw.animation_frames,
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

#[utoipa::path(
    post,
    path = "/serials/validate",
    tag = "serials",
    request_body = ValidateSerialRequest,
    responses(
        (status = 200, description = "Serial classified", body = ValidateSerialResponse)
    )
)]
/// Classify a serial typed into a registration form.
///
/// Always answers 200: not-found, blocked or failed lookups are statuses the
/// form displays, not errors.
pub async fn validate_serial(
    validator: web::Data<SerialValidator>,
    request: web::Json<ValidateSerialRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    let response = validator
        .validate(&request.form_id, request.role, &request.serial)
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

pub fn serial_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/config", web::get().to(get_public_config))
        .route("/serials/validate", web::post().to(validate_serial));
}
