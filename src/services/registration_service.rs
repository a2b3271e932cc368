use chrono::{Local, NaiveDate};
use std::sync::Arc;

use super::SerialValidator;
use crate::config::CampaignConfig;
use crate::error::{AppError, AppResult};
use crate::external::BackendGateway;
use crate::models::*;
use crate::utils::{format_phone, validate_dni, validate_email, validate_phone, validate_required};

#[derive(Clone)]
pub struct RegistrationService {
    gateway: Arc<dyn BackendGateway>,
    validator: SerialValidator,
    campaign: CampaignConfig,
}

impl RegistrationService {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        validator: SerialValidator,
        campaign: CampaignConfig,
    ) -> Self {
        Self {
            gateway,
            validator,
            campaign,
        }
    }

    /// Buyer registers a purchased TV and receives sweepstakes coupons.
    ///
    /// The remote procedure is only called for a serial classified `Valid`.
    pub async fn register_buyer(
        &self,
        request: BuyerRegistrationRequest,
    ) -> AppResult<BuyerRegistrationResponse> {
        validate_required(&request.full_name, "nombre completo")?;
        validate_required(&request.city, "ciudad")?;
        validate_dni(request.dni.trim())?;
        validate_email(request.email.trim())?;
        let phone = format_phone(&request.phone);
        validate_phone(&phone)?;
        self.check_date(request.purchase_date, "compra")?;

        let (serial_number, product_name) = self.require_valid(Role::Buyer, &request.serial).await?;

        let registration = BuyerRegistration {
            serial_number: serial_number.clone(),
            full_name: request.full_name.trim().to_string(),
            dni: request.dni.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            phone,
            city: request.city.trim().to_string(),
            purchase_date: request.purchase_date,
        };
        let result = self.gateway.register_buyer_serial(&registration).await?;
        if !result.success {
            return Err(AppError::Ineligible(result.error.unwrap_or_else(|| {
                "No se pudo registrar la compra".to_string()
            })));
        }

        let coupons = result.coupons.unwrap_or_default();
        log::info!(
            "Buyer registration for serial {serial_number} produced {} coupons",
            coupons.len()
        );
        Ok(BuyerRegistrationResponse {
            serial_number,
            product_name,
            coupons,
        })
    }

    /// Seller registers a sale and earns points (never coupons).
    pub async fn register_seller(
        &self,
        request: SellerRegistrationRequest,
    ) -> AppResult<SellerRegistrationResponse> {
        validate_required(&request.seller_id, "vendedor")?;
        validate_required(&request.client_name, "nombre del cliente")?;
        let client_phone = match request.client_phone.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => {
                let formatted = format_phone(p);
                validate_phone(&formatted)?;
                Some(formatted)
            }
            _ => None,
        };
        self.check_date(request.sale_date, "venta")?;

        let (serial_number, product_name) =
            self.require_valid(Role::Seller, &request.serial).await?;

        let registration = SellerRegistration {
            seller_id: request.seller_id.trim().to_string(),
            serial_number: serial_number.clone(),
            client_name: request.client_name.trim().to_string(),
            client_phone,
            invoice_number: request
                .invoice_number
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sale_date: request.sale_date,
        };
        let result = self.gateway.register_seller_serial(&registration).await?;
        if !result.success {
            return Err(AppError::Ineligible(result.error.unwrap_or_else(|| {
                "No se pudo registrar la venta".to_string()
            })));
        }

        let points = result.points.unwrap_or(0);
        log::info!(
            "Seller {} registered serial {serial_number} for {points} points",
            registration.seller_id
        );
        Ok(SellerRegistrationResponse {
            serial_number,
            product_name,
            points,
            sale_id: result.sale_id,
        })
    }

    /// Normalized serial and product name, or the rejection for its classification.
    async fn require_valid(&self, role: Role, raw: &str) -> AppResult<(String, String)> {
        let (normalized, rejected) = SerialValidator::prepare(role, raw);
        let classification = match rejected {
            Some(invalid) => invalid,
            None => self.validator.classify(role, &normalized).await,
        };
        match classification {
            Classification::Valid { product_name, .. } => Ok((normalized, product_name)),
            other => Err(other.rejection().unwrap_or_else(|| {
                AppError::InternalError("valid classification without product".to_string())
            })),
        }
    }

    fn check_date(&self, date: NaiveDate, what: &str) -> AppResult<()> {
        if date > Local::now().date_naive() {
            return Err(AppError::ValidationError(format!(
                "La fecha de {what} no puede ser futura"
            )));
        }
        if !self.campaign.contains(date) {
            return Err(AppError::ValidationError(format!(
                "La fecha de {what} está fuera del periodo de la promoción"
            )));
        }
        Ok(())
    }
}
