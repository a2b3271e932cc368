use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::DrawService;

#[utoipa::path(
    post,
    path = "/admin/draw/start",
    tag = "draw",
    request_body = StartDrawRequest,
    responses(
        (status = 200, description = "Pool loaded, ready to spin", body = DrawStateResponse),
        (status = 409, description = "No eligible coupons or session superseded")
    )
)]
/// Fetch the active buyer coupons and open a new draw session.
/// Any winners of the previous session are discarded.
pub async fn start_draw(
    service: web::Data<DrawService>,
    request: web::Json<StartDrawRequest>,
) -> Result<HttpResponse> {
    match service.start(request.into_inner()).await {
        Ok(state) => Ok(HttpResponse::Ok().json(ApiResponse::success(state))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/draw/spin",
    tag = "draw",
    responses(
        (status = 200, description = "Winner drawn (or pool exhausted)", body = SpinResponse),
        (status = 409, description = "Draw not started or already complete")
    )
)]
pub async fn spin(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.spin().await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/draw/next",
    tag = "draw",
    responses(
        (status = 200, description = "Back to idle", body = DrawStateResponse),
        (status = 409, description = "Nothing being revealed")
    )
)]
pub async fn next(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.next().await {
        Ok(state) => Ok(HttpResponse::Ok().json(ApiResponse::success(state))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/draw/reset",
    tag = "draw",
    responses(
        (status = 200, description = "Session discarded", body = DrawStateResponse)
    )
)]
pub async fn reset(service: web::Data<DrawService>) -> Result<HttpResponse> {
    let state = service.reset().await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(state)))
}

#[utoipa::path(
    get,
    path = "/admin/draw",
    tag = "draw",
    responses(
        (status = 200, description = "Current session", body = DrawStateResponse)
    )
)]
pub async fn get_state(service: web::Data<DrawService>) -> Result<HttpResponse> {
    let state = service.state().await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(state)))
}

#[utoipa::path(
    post,
    path = "/admin/draw/save",
    tag = "draw",
    responses(
        (status = 200, description = "Result stored, coupons marked used", body = DrawStateResponse),
        (status = 400, description = "Draw not complete"),
        (status = 502, description = "Backend write failed, winners kept for retry")
    )
)]
pub async fn save(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.save().await {
        Ok(state) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            state,
            "Sorteo guardado".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/draw/export",
    tag = "draw",
    responses(
        (status = 200, description = "Winners as CSV", body = String, content_type = "text/csv")
    )
)]
pub async fn export(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.export_csv().await {
        Ok(csv) => Ok(HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ganadores.csv\"",
            ))
            .body(csv)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn draw_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/draw")
            .route("", web::get().to(get_state))
            .route("/start", web::post().to(start_draw))
            .route("/spin", web::post().to(spin))
            .route("/next", web::post().to(next))
            .route("/reset", web::post().to(reset))
            .route("/save", web::post().to(save))
            .route("/export", web::get().to(export)),
    );
}
