use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::serial::get_public_config,
        handlers::serial::validate_serial,
        handlers::registration::register_buyer,
        handlers::registration::register_seller,
        handlers::draw::start_draw,
        handlers::draw::spin,
        handlers::draw::next,
        handlers::draw::reset,
        handlers::draw::get_state,
        handlers::draw::save,
        handlers::draw::export,
    ),
    components(
        schemas(
            ApiError,
            PublicConfigResponse,
            Role,
            ValidateSerialRequest,
            ValidateSerialResponse,
            BuyerRegistrationRequest,
            BuyerRegistrationResponse,
            SellerRegistrationRequest,
            SellerRegistrationResponse,
            OwnerType,
            Coupon,
            WinnerIdentity,
            Winner,
            DrawPhase,
            StartDrawRequest,
            DrawStateResponse,
            SpinResponse,
        )
    ),
    tags(
        (name = "public", description = "Client settings"),
        (name = "serials", description = "Serial validation API"),
        (name = "registrations", description = "Buyer and seller registration API"),
        (name = "draw", description = "Tombola draw API"),
    ),
    info(
        title = "Skyworth Promo API",
        version = "1.0.0",
        description = "El Sueño del Hincha Skyworth promotion API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
