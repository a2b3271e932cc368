use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const PLACEHOLDER_NAME: &str = "Participante";
pub const UNAVAILABLE_NAME: &str = "No se pudo cargar el ganador";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    Buyer,
    Seller,
}

/// Sweepstakes entry as read from the remote `coupons` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Coupon {
    pub id: String,
    #[schema(example = "SKY-001")]
    pub code: String,
    pub owner_type: OwnerType,
    #[serde(default)]
    pub purchase_id: Option<String>,
}

/// Buyer details from the purchase linked to a coupon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct WinnerIdentity {
    pub full_name: String,
    pub dni: String,
    pub city: String,
    pub email: String,
    pub phone: String,
}

impl WinnerIdentity {
    /// Used when the coupon has no linked purchase.
    pub fn placeholder() -> Self {
        Self::filled_with(PLACEHOLDER_NAME)
    }

    /// Used when the purchase lookup failed.
    pub fn unavailable() -> Self {
        Self::filled_with(UNAVAILABLE_NAME)
    }

    fn filled_with(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            dni: NOT_AVAILABLE.to_string(),
            city: NOT_AVAILABLE.to_string(),
            email: NOT_AVAILABLE.to_string(),
            phone: NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Winner {
    /// 1-based selection order
    pub position: usize,
    pub coupon_id: String,
    pub code: String,
    #[serde(skip)]
    pub purchase_id: Option<String>,
    #[serde(flatten)]
    pub identity: WinnerIdentity,
    /// True until the purchase details were attached
    pub placeholder: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DrawPhase {
    Idle,
    Spinning,
    Revealing,
    Complete,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StartDrawRequest {
    #[schema(example = "Sorteo final")]
    pub name: String,
    /// Winners to draw (defaults to the configured count)
    pub winner_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawStateResponse {
    pub session_id: Option<Uuid>,
    pub name: Option<String>,
    pub phase: DrawPhase,
    pub target: usize,
    pub pool_size: usize,
    pub remaining: usize,
    pub winners: Vec<Winner>,
    pub complete: bool,
    /// Pool ran out before the target was reached
    pub exhausted: bool,
    pub notice: Option<String>,
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpinResponse {
    /// Ticker codes for the slow-down animation
    pub frames: Vec<String>,
    pub winner: Option<Winner>,
    pub state: DrawStateResponse,
}

/// Payload for the remote `draws` table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResultRecord {
    pub name: String,
    pub preselected_count: usize,
    pub finalists_count: usize,
    pub executed_at: DateTime<Utc>,
    pub winners: Vec<Winner>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_serializes_flat_identity() {
        let winner = Winner {
            position: 1,
            coupon_id: "c1".into(),
            code: "SKY-001".into(),
            purchase_id: Some("p1".into()),
            identity: WinnerIdentity::placeholder(),
            placeholder: true,
        };
        let value = serde_json::to_value(&winner).unwrap();
        assert_eq!(value["full_name"], "Participante");
        assert_eq!(value["dni"], "N/A");
        assert_eq!(value["code"], "SKY-001");
        assert!(value.get("purchase_id").is_none());
    }
}
