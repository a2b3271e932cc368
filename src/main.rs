use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use skyworth_promo::{
    config::Config,
    external::{BackendGateway, RestGateway},
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().context("Failed to load configuration")?;

    let gateway: Arc<dyn BackendGateway> = Arc::new(
        RestGateway::new(config.backend.clone()).context("Failed to build backend client")?,
    );

    let serial_validator = SerialValidator::new(gateway.clone(), &config.validation);
    let registration_service = RegistrationService::new(
        gateway.clone(),
        serial_validator.clone(),
        config.campaign.clone(),
    );
    let draw_service = DrawService::new(gateway.clone(), config.draw.clone());

    log::info!(
        "Starting HTTP server at {}:{} (backend {})",
        config.server.host,
        config.server.port,
        config.backend.base_url
    );

    let bind = (config.server.host.clone(), config.server.port);
    let shared_config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(shared_config.clone())
            .app_data(web::Data::new(serial_validator.clone()))
            .app_data(web::Data::new(registration_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::serial_config)
                    .configure(handlers::registration_config)
                    .configure(handlers::draw_config),
            )
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
