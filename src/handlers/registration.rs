use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::RegistrationService;

#[utoipa::path(
    post,
    path = "/registrations/buyer",
    tag = "registrations",
    request_body = BuyerRegistrationRequest,
    responses(
        (status = 200, description = "Purchase registered, coupons generated", body = BuyerRegistrationResponse),
        (status = 400, description = "Invalid form data"),
        (status = 404, description = "Serial not found"),
        (status = 422, description = "Serial blocked or already registered"),
        (status = 503, description = "Lookup failed, retry")
    )
)]
pub async fn register_buyer(
    service: web::Data<RegistrationService>,
    request: web::Json<BuyerRegistrationRequest>,
) -> Result<HttpResponse> {
    match service.register_buyer(request.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            data,
            "¡Compra registrada! Ya estás participando".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/registrations/seller",
    tag = "registrations",
    request_body = SellerRegistrationRequest,
    responses(
        (status = 200, description = "Sale registered, points awarded", body = SellerRegistrationResponse),
        (status = 400, description = "Invalid form data"),
        (status = 404, description = "Serial not found"),
        (status = 422, description = "Serial blocked, registered or from a previous campaign"),
        (status = 503, description = "Lookup failed, retry")
    )
)]
pub async fn register_seller(
    service: web::Data<RegistrationService>,
    request: web::Json<SellerRegistrationRequest>,
) -> Result<HttpResponse> {
    match service.register_seller(request.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            data,
            "Venta registrada".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn registration_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/registrations")
            .route("/buyer", web::post().to(register_buyer))
            .route("/seller", web::post().to(register_seller)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CampaignConfig, ValidationConfig};
    use crate::external::fake::{FakeGateway, serial};
    use crate::services::SerialValidator;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use std::sync::Arc;

    fn service(fake: FakeGateway) -> RegistrationService {
        let fake = Arc::new(fake);
        let validator = SerialValidator::new(fake.clone(), &ValidationConfig::default());
        RegistrationService::new(fake, validator, CampaignConfig::default())
    }

    fn buyer_body(serial: &str) -> serde_json::Value {
        serde_json::json!({
            "serial": serial,
            "full_name": "Juan Pérez",
            "dni": "45678912",
            "email": "juan@example.com",
            "phone": "987654321",
            "city": "Arequipa",
            "purchase_date": chrono::Local::now().date_naive(),
        })
    }

    #[actix_web::test]
    async fn test_buyer_registration_ok() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service(
                    FakeGateway::new().with_serial(serial("SKW1")),
                )))
                .configure(registration_config),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/registrations/buyer")
            .set_json(buyer_body("skw1"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["coupons"].as_array().map(Vec::len), Some(2));
    }

    #[actix_web::test]
    async fn test_unknown_serial_returns_404() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service(FakeGateway::new())))
                .configure(registration_config),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/registrations/buyer")
            .set_json(buyer_body("SKW999"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
