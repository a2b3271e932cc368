use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;
use crate::error::AppError;

/// Displayable outcome of checking a serial against the remote registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Idle,
    Checking,
    InvalidFormat { message: String },
    NotFound,
    Blocked,
    AlreadyRegistered { role: Role },
    Legacy,
    Valid { product_name: String, unit_value: i32 },
    LookupFailed { retryable: bool, message: String },
}

impl Classification {
    /// Registration may only be submitted for a valid serial.
    pub fn allows_submit(&self) -> bool {
        matches!(self, Classification::Valid { .. })
    }

    /// Message shown under the serial input.
    pub fn message(&self) -> Option<String> {
        match self {
            Classification::Idle | Classification::Checking => None,
            Classification::InvalidFormat { message } => Some(message.clone()),
            Classification::NotFound => {
                Some("El número de serie no existe en la promoción".to_string())
            }
            Classification::Blocked => Some("Este número de serie está bloqueado".to_string()),
            Classification::AlreadyRegistered { role: Role::Buyer } => {
                Some("Este número de serie ya fue registrado por un comprador".to_string())
            }
            Classification::AlreadyRegistered { role: Role::Seller } => {
                Some("Este número de serie ya fue registrado por un vendedor".to_string())
            }
            Classification::Legacy => Some(
                "Este número de serie pertenece a una campaña anterior y no suma puntos"
                    .to_string(),
            ),
            Classification::Valid {
                product_name,
                unit_value,
            } => Some(format!("{product_name} ({unit_value})")),
            Classification::LookupFailed { message, .. } => Some(message.clone()),
        }
    }

    /// Error a registration attempt fails with when the serial is not valid.
    pub fn rejection(&self) -> Option<AppError> {
        let message = self.message().unwrap_or_default();
        match self {
            Classification::Valid { .. } => None,
            Classification::NotFound => Some(AppError::NotFound(message)),
            Classification::Blocked
            | Classification::AlreadyRegistered { .. }
            | Classification::Legacy => Some(AppError::Ineligible(message)),
            Classification::LookupFailed {
                retryable: true, ..
            } => Some(AppError::TransientLookup(message)),
            Classification::LookupFailed { .. } => Some(AppError::ExternalApiError(message)),
            Classification::InvalidFormat { .. }
            | Classification::Idle
            | Classification::Checking => Some(AppError::ValidationError(message)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ValidateSerialRequest {
    /// Client-chosen id of the form being filled in
    #[schema(example = "buyer-form-3f2a")]
    pub form_id: String,
    pub role: Role,
    #[schema(example = " 2540415m-00039 ")]
    pub serial: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidateSerialResponse {
    pub request_id: u64,
    pub normalized: String,
    /// Result of this call
    #[schema(value_type = Object)]
    pub classification: Classification,
    /// False when a newer call for the same form superseded this one
    pub applied: bool,
    /// What the form should display now
    #[schema(value_type = Object)]
    pub current: Classification,
    pub can_submit: bool,
    pub message: Option<String>,
}
