//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. Every store access and processor call below is a
//! future, so workers keep serving other requests while these are in flight.

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use spg_common::EUR_CURRENCY_CODE;
use storefront_payment_engine::{
    db_types::OrderId,
    traits::{OrderNotifier, StorefrontDatabase},
    NewOrderRequest,
    OrderFlowApi,
};
use stripe_tools::{PaymentEvent, StripeApi};

use crate::{
    data_objects::{ClientSecretResponse, CreatePaymentIntentParams, OrderUpdateParams, WebhookAck},
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so the route glue is implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl StorefrontDatabase, OrderNotifier);
/// Validate a cart submission and create a `Pending` order.
///
/// Any validation failure is a 400 with a specific message and nothing persisted. The created order is
/// returned in full, including the catalog-priced total.
pub async fn create_order<B, N>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    N: OrderNotifier,
{
    let req = body.into_inner();
    debug!("💻️ POST /orders with {} item(s)", req.items.len());
    let order = api.place_order(req).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(update_order => Patch "/orders/{id}" impl StorefrontDatabase, OrderNotifier);
/// Patch an order's status and/or payment intent reference.
pub async fn update_order<B, N>(
    path: web::Path<String>,
    body: web::Json<OrderUpdateParams>,
    api: web::Data<OrderFlowApi<B, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    N: OrderNotifier,
{
    let id = OrderId::from(path.into_inner());
    debug!("💻️ PATCH /orders/{id}");
    let update = body.into_inner().try_into()?;
    let order = api.update_order(&id, update).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_payment_intent => Post "/payment/create-payment-intent" impl StorefrontDatabase, OrderNotifier);
/// Bind an order to a new processor transaction and return the client-side continuation token.
///
/// Not idempotent: a repeat call asks the processor for a fresh transaction and overwrites the stored
/// reference. See DESIGN.md before "fixing" this.
pub async fn create_payment_intent<B, N>(
    body: web::Json<CreatePaymentIntentParams>,
    api: web::Data<OrderFlowApi<B, N>>,
    stripe: web::Data<StripeApi>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    N: OrderNotifier,
{
    let order_id = OrderId::from(body.into_inner().order_id);
    debug!("💻️ Creating payment intent for order {order_id}");
    let order = api.fetch_order(&order_id).await?;
    let intent = stripe.create_payment_intent(order.total, EUR_CURRENCY_CODE, order_id.as_str()).await?;
    api.attach_payment_intent(&order_id, &intent.id).await?;
    let client_secret = intent.client_secret.ok_or_else(|| {
        ServerError::PaymentProcessorError("Processor response did not include a client secret".to_string())
    })?;
    Ok(HttpResponse::Ok().json(ClientSecretResponse { client_secret }))
}

route!(payment_webhook => Post "" impl StorefrontDatabase, OrderNotifier);
/// Process a signed confirmation event. The signature middleware has already verified the payload by the time
/// this handler runs.
///
/// Only `payment_intent.succeeded` drives a state transition. Unknown transaction ids and redeliveries are
/// benign and acknowledged; the response is 200 `{"received": true}` in every case that reaches the end of
/// processing, skips included.
pub async fn payment_webhook<B, N>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    N: OrderNotifier,
{
    let event: PaymentEvent =
        serde_json::from_slice(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    debug!("💻️ Webhook event: {}", event.event_type);
    if event.is_payment_succeeded() {
        match event.object_id() {
            Some(payment_intent_id) => {
                api.confirm_payment(payment_intent_id).await?;
            },
            None => warn!("💻️ Event {} has no payment intent id. Acknowledging without action.", event.id),
        }
    } else {
        trace!("💻️ Ignoring event type {}", event.event_type);
    }
    Ok(HttpResponse::Ok().json(WebhookAck::ok()))
}
