//! Webhook signature middleware.
//!
//! The payment processor signs every webhook delivery; the signature arrives in the `Stripe-Signature` header
//! and covers the raw request body. This middleware verifies the signature (and the timestamp freshness bound)
//! before the payload reaches the webhook handler, and restores the body so the handler can parse it.
//!
//! Wrap the webhook scope with this middleware; unverifiable requests are rejected with 400 and the event is
//! never processed.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use spg_common::Secret;
use stripe_tools::webhook::{verify_signature, SIGNATURE_HEADER};

use crate::errors::ServerError;

pub struct SignatureMiddlewareFactory {
    key: Secret<String>,
    tolerance_secs: i64,
}

impl SignatureMiddlewareFactory {
    pub fn new(key: Secret<String>, tolerance_secs: i64) -> Self {
        SignatureMiddlewareFactory { key, tolerance_secs }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            key: self.key.clone(),
            tolerance_secs: self.tolerance_secs,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    key: Secret<String>,
    tolerance_secs: i64,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.clone();
        let tolerance_secs = self.tolerance_secs;
        Box::pin(async move {
            trace!("🔐️ Verifying webhook signature");
            if secret.is_empty() {
                warn!("🔐️ The webhook signing secret is not configured. Rejecting event.");
                return Err(ServerError::InvalidSignature(
                    "The webhook signing secret is not configured".to_string(),
                )
                .into());
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ServerError::InvalidRequestBody("Failed to extract request data".to_string())
            })?;
            let header = req
                .headers()
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No signature found in request. Rejecting event.");
                    ServerError::InvalidSignature("No signature header found".to_string())
                })?
                .to_string();
            let now = Utc::now().timestamp();
            match verify_signature(secret.reveal(), &header, data.as_ref(), tolerance_secs, now) {
                Ok(()) => {
                    trace!("🔐️ Webhook signature check ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Invalid webhook signature. Rejecting event. {e}");
                    Err(ServerError::InvalidSignature(e.to_string()).into())
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
