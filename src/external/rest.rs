use futures_util::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::BackendGateway;
use crate::config::BackendConfig;
use crate::error::{AppError, AppResult};
use crate::models::*;

const SERIAL_COLUMNS: &str = "serial_number,status,buyer_status,seller_status,campaign_type,\
product:products(model_name,coupon_multiplier,points_value)";
const COUPON_COLUMNS: &str = "id,code,owner_type,purchase_id";
const PURCHASE_COLUMNS: &str = "full_name,dni,city,email,phone";
const MARK_USED_CHUNK: usize = 100;

#[derive(Debug, Deserialize)]
struct PurchaseRow {
    full_name: Option<String>,
    dni: Option<String>,
    city: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl From<PurchaseRow> for WinnerIdentity {
    fn from(row: PurchaseRow) -> Self {
        let or_na = |v: Option<String>| {
            v.filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        WinnerIdentity {
            full_name: row
                .full_name
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_NAME.to_string()),
            dni: or_na(row.dni),
            city: or_na(row.city),
            email: or_na(row.email),
            phone: or_na(row.phone),
        }
    }
}

#[derive(Debug, Serialize)]
struct BuyerRpcArgs<'a> {
    p_serial_number: &'a str,
    p_full_name: &'a str,
    p_dni: &'a str,
    p_email: &'a str,
    p_phone: &'a str,
    p_city: &'a str,
    p_purchase_date: chrono::NaiveDate,
}

#[derive(Debug, Serialize)]
struct SellerRpcArgs<'a> {
    p_seller_id: &'a str,
    p_serial_number: &'a str,
    p_client_name: &'a str,
    p_client_phone: Option<&'a str>,
    p_invoice_number: Option<&'a str>,
    p_sale_date: chrono::NaiveDate,
}

/// Client for the PostgREST-style HTTP API of the backend platform.
#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    config: BackendConfig,
}

impl RestGateway {
    pub fn new(config: BackendConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("skyworth-promo/gateway")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> AppResult<Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, what).await
    }

    async fn rpc<A: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        name: &str,
        args: &A,
    ) -> AppResult<R> {
        let builder = self.client.post(self.url(&format!("rpc/{name}"))).json(args);
        let response = self.send(builder, name).await?;
        Ok(response.json().await?)
    }
}

/// Timeouts and connection failures can be retried as-is.
fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() || e.is_connect() {
        AppError::TransientLookup(e.to_string())
    } else {
        AppError::ReqwestError(e)
    }
}

async fn check_status(response: Response, what: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = format!("{what} failed: HTTP {}: {body}", status.as_u16());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(AppError::TransientLookup(message))
    } else {
        Err(AppError::ExternalApiError(message))
    }
}

/// PostgREST `in.(...)` list with every value quoted.
fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

impl BackendGateway for RestGateway {
    fn lookup_serial<'a>(
        &'a self,
        serial_number: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<SerialRecord>>> {
        Box::pin(async move {
            let builder = self.client.get(self.url("serials")).query(&[
                ("select", SERIAL_COLUMNS.to_string()),
                ("serial_number", format!("eq.{serial_number}")),
                ("limit", "1".to_string()),
            ]);
            let rows: Vec<SerialRecord> = self.send(builder, "serial lookup").await?.json().await?;
            Ok(rows.into_iter().next())
        })
    }

    fn register_buyer_serial<'a>(
        &'a self,
        registration: &'a BuyerRegistration,
    ) -> BoxFuture<'a, AppResult<BuyerRegistrationResult>> {
        Box::pin(async move {
            let args = BuyerRpcArgs {
                p_serial_number: &registration.serial_number,
                p_full_name: &registration.full_name,
                p_dni: &registration.dni,
                p_email: &registration.email,
                p_phone: &registration.phone,
                p_city: &registration.city,
                p_purchase_date: registration.purchase_date,
            };
            self.rpc("rpc_register_buyer_serial", &args).await
        })
    }

    fn register_seller_serial<'a>(
        &'a self,
        registration: &'a SellerRegistration,
    ) -> BoxFuture<'a, AppResult<SellerRegistrationResult>> {
        Box::pin(async move {
            let args = SellerRpcArgs {
                p_seller_id: &registration.seller_id,
                p_serial_number: &registration.serial_number,
                p_client_name: &registration.client_name,
                p_client_phone: registration.client_phone.as_deref(),
                p_invoice_number: registration.invoice_number.as_deref(),
                p_sale_date: registration.sale_date,
            };
            self.rpc("rpc_register_seller_serial", &args).await
        })
    }

    fn fetch_active_buyer_coupons(&self) -> BoxFuture<'_, AppResult<Vec<Coupon>>> {
        Box::pin(async move {
            let page_size = self.config.page_size.max(1) as usize;
            let mut all_coupons = Vec::new();
            let mut offset = 0usize;

            loop {
                let builder = self.client.get(self.url("coupons")).query(&[
                    ("select", COUPON_COLUMNS.to_string()),
                    ("status", "eq.ACTIVE".to_string()),
                    ("owner_type", "eq.BUYER".to_string()),
                    ("order", "code.asc".to_string()),
                    ("limit", page_size.to_string()),
                    ("offset", offset.to_string()),
                ]);
                let page: Vec<Coupon> = self.send(builder, "coupon fetch").await?.json().await?;
                let fetched = page.len();
                all_coupons.extend(page);

                if fetched < page_size {
                    break;
                }
                offset += fetched;
            }

            log::info!("Fetched {} active buyer coupons", all_coupons.len());
            Ok(all_coupons)
        })
    }

    fn fetch_purchase_identity<'a>(
        &'a self,
        purchase_id: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<WinnerIdentity>>> {
        Box::pin(async move {
            let builder = self.client.get(self.url("purchases")).query(&[
                ("select", PURCHASE_COLUMNS.to_string()),
                ("id", format!("eq.{purchase_id}")),
                ("limit", "1".to_string()),
            ]);
            let rows: Vec<PurchaseRow> = self.send(builder, "purchase lookup").await?.json().await?;
            Ok(rows.into_iter().next().map(WinnerIdentity::from))
        })
    }

    fn persist_draw_result<'a>(
        &'a self,
        result: &'a DrawResultRecord,
    ) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            let builder = self
                .client
                .post(self.url("draws"))
                .header("Prefer", "return=minimal")
                .json(result);
            self.send(builder, "draw persistence").await?;
            Ok(())
        })
    }

    fn mark_coupons_used<'a>(&'a self, codes: &'a [String]) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            for chunk in codes.chunks(MARK_USED_CHUNK) {
                let builder = self
                    .client
                    .patch(self.url("coupons"))
                    .query(&[("code", in_filter(chunk))])
                    .header("Prefer", "return=minimal")
                    .json(&serde_json::json!({ "status": "USED" }));
                self.send(builder, "coupon update").await?;
            }
            Ok(())
        })
    }
}
