use std::time::Duration;

use actix_cors::Cors;
use actix_web::{dev::Server, http::{header, KeepAlive}, middleware::Logger, web, App, HttpServer};
use storefront_payment_engine::{OrderFlowApi, SqliteDatabase};
use stripe_tools::{StripeApi, StripeApiConfig};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    mailer::SmtpNotifier,
    middleware::SignatureMiddlewareFactory,
    routes::{health, CreateOrderRoute, CreatePaymentIntentRoute, PaymentWebhookRoute, UpdateOrderRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let stripe_api = StripeApi::new(StripeApiConfig::new(config.stripe_secret_key.clone()))
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let notifier = SmtpNotifier::from_config(config.email.as_ref());
        let orders_api = OrderFlowApi::new(db.clone(), notifier);
        // The webhook lives in its own scope so that only it pays for signature verification, and so the raw
        // body survives until the handler parses it.
        let webhook_scope = web::scope("/payment/webhook")
            .wrap(SignatureMiddlewareFactory::new(config.webhook_secret.clone(), config.signature_tolerance_secs))
            .service(PaymentWebhookRoute::<SqliteDatabase, SmtpNotifier>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .wrap(cors_for(config.frontend_url.as_deref()))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(stripe_api.clone()))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase, SmtpNotifier>::new())
            .service(UpdateOrderRoute::<SqliteDatabase, SmtpNotifier>::new())
            .service(CreatePaymentIntentRoute::<SqliteDatabase, SmtpNotifier>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

fn cors_for(frontend_url: Option<&str>) -> Cors {
    match frontend_url {
        Some(url) => Cors::default()
            .allowed_origin(url)
            .allowed_methods(vec!["GET", "POST", "PATCH"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
            .max_age(3600),
        None => Cors::permissive(),
    }
}
