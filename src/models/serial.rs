use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Who is registering a serial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Seller => write!(f, "seller"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerialStatus {
    Available,
    Blocked,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    NotRegistered,
    Registered,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignType {
    #[default]
    Standard,
    Legacy,
}

/// Product joined to a serial row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Product {
    pub model_name: String,
    /// Coupons a buyer earns per unit
    #[serde(default)]
    pub coupon_multiplier: i32,
    /// Points a seller earns per unit
    #[serde(default)]
    pub points_value: i32,
}

impl Product {
    pub fn unit_value(&self, role: Role) -> i32 {
        match role {
            Role::Buyer => self.coupon_multiplier,
            Role::Seller => self.points_value,
        }
    }
}

/// Read-only view of a row in the remote `serials` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SerialRecord {
    pub serial_number: String,
    pub status: SerialStatus,
    pub buyer_status: RegistrationStatus,
    pub seller_status: RegistrationStatus,
    #[serde(default)]
    pub campaign_type: Option<CampaignType>,
    pub product: Product,
}

impl SerialRecord {
    pub fn is_blocked(&self) -> bool {
        self.status == SerialStatus::Blocked
    }

    pub fn is_registered_by(&self, role: Role) -> bool {
        let status = match role {
            Role::Buyer => self.buyer_status,
            Role::Seller => self.seller_status,
        };
        status == RegistrationStatus::Registered
    }

    /// The registration that makes the serial ineligible for `role`.
    ///
    /// Sellers also need the serial free of a buyer registration; buyers
    /// ignore the seller side.
    pub fn blocking_registration(&self, role: Role) -> Option<Role> {
        if self.is_registered_by(Role::Buyer) {
            return Some(Role::Buyer);
        }
        (role == Role::Seller && self.is_registered_by(Role::Seller)).then_some(Role::Seller)
    }

    pub fn is_legacy(&self) -> bool {
        self.campaign_type == Some(CampaignType::Legacy)
    }
}
