use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BuyerRegistrationRequest {
    #[schema(example = "SKW2540415")]
    pub serial: String,
    #[schema(example = "Juan Pérez")]
    pub full_name: String,
    #[schema(example = "45678912")]
    pub dni: String,
    #[schema(example = "juan@example.com")]
    pub email: String,
    #[schema(example = "987654321")]
    pub phone: String,
    #[schema(example = "Lima")]
    pub city: String,
    pub purchase_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SellerRegistrationRequest {
    pub seller_id: String,
    pub serial: String,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub invoice_number: Option<String>,
    pub sale_date: NaiveDate,
}

/// Arguments of `rpc_register_buyer_serial`, serial already normalized.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuyerRegistration {
    pub serial_number: String,
    pub full_name: String,
    pub dni: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub purchase_date: NaiveDate,
}

/// Arguments of `rpc_register_seller_serial`, serial already normalized.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SellerRegistration {
    pub seller_id: String,
    pub serial_number: String,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub invoice_number: Option<String>,
    pub sale_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, ToSchema)]
pub struct BuyerRegistrationResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub coupons: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, ToSchema)]
pub struct SellerRegistrationResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub sale_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuyerRegistrationResponse {
    pub serial_number: String,
    pub product_name: String,
    pub coupons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SellerRegistrationResponse {
    pub serial_number: String,
    pub product_name: String,
    pub points: i64,
    pub sale_id: Option<String>,
}
