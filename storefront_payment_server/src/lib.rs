//! # Storefront payment server
//! The HTTP face of the storefront payment gateway. It is responsible for:
//! * Accepting cart submissions and turning them into pending orders.
//! * Creating payment intents against the payment processor and handing the client secret back to the storefront.
//! * Receiving signed confirmation webhooks from the processor and driving the reconciliation flow.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: liveness probe, returns 200 OK.
//! * `POST /orders`: validate a cart and create a pending order.
//! * `PATCH /orders/{id}`: patch an order's status and/or payment intent reference.
//! * `POST /payment/create-payment-intent`: bind an order to a processor transaction.
//! * `POST /payment/webhook`: signed confirmation events from the processor.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
