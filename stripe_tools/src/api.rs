use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use spg_common::Cents;

use crate::{config::StripeApiConfig, data_objects::PaymentIntent, error::StripeApiError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A thin client over the payment processor's REST API.
///
/// The processor expects form-encoded request bodies and authenticates with the secret key as a bearer token.
#[derive(Clone)]
pub struct StripeApi {
    config: StripeApiConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeApiConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val =
            HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert("Authorization", val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Create a payment intent for `amount` in the given currency, tagged with the order id so that the
    /// transaction can be traced back from the processor's dashboard.
    ///
    /// Note that every call creates a brand-new external transaction; the caller is responsible for deciding
    /// what to do with any previously created intent for the same order.
    pub async fn create_payment_intent(
        &self,
        amount: Cents,
        currency: &str,
        order_id: &str,
    ) -> Result<PaymentIntent, StripeApiError> {
        let amount = amount.value().to_string();
        let params: Vec<(&str, &str)> = vec![
            ("amount", amount.as_str()),
            ("currency", currency),
            ("metadata[orderId]", order_id),
            ("payment_method_types[]", "card"),
            ("payment_method_types[]", "sepa_debit"),
        ];
        let url = self.url("/v1/payment_intents");
        trace!("💳️ Sending payment intent request: {url}");
        let response = self
            .client
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            let intent =
                response.json::<PaymentIntent>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))?;
            debug!("💳️ Payment intent {} created. Method types: {:?}", intent.id, intent.payment_method_types);
            Ok(intent)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }
}
