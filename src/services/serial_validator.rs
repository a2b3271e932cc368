use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::ValidationConfig;
use crate::external::BackendGateway;
use crate::models::{Classification, Role, SerialRecord, ValidateSerialResponse};
use crate::utils::{NormalizationRule, Sequenced, normalize_serial, validate_serial_format};

/// Classification of a looked-up serial for `role`.
///
/// Checks run in a fixed order: existence, block status, registration status
/// (a buyer registration rules out both roles), campaign type (sellers only).
pub fn classify_record(role: Role, record: Option<&SerialRecord>) -> Classification {
    let Some(record) = record else {
        return Classification::NotFound;
    };
    if record.is_blocked() {
        return Classification::Blocked;
    }
    if let Some(registered_by) = record.blocking_registration(role) {
        return Classification::AlreadyRegistered {
            role: registered_by,
        };
    }
    if role == Role::Seller && record.is_legacy() {
        return Classification::Legacy;
    }
    Classification::Valid {
        product_name: record.product.model_name.clone(),
        unit_value: record.product.unit_value(role),
    }
}

struct FormSlot {
    display: Sequenced<Classification>,
    touched: Instant,
}

#[derive(Default)]
struct FormTable {
    slots: HashMap<String, FormSlot>,
    /// Highest ticket id handed out; new slots continue from here.
    last_ticket: u64,
}

#[derive(Clone)]
pub struct SerialValidator {
    gateway: Arc<dyn BackendGateway>,
    forms: Arc<Mutex<FormTable>>,
    form_ttl: Duration,
}

impl SerialValidator {
    pub fn new(gateway: Arc<dyn BackendGateway>, config: &ValidationConfig) -> Self {
        Self {
            gateway,
            forms: Arc::new(Mutex::new(FormTable::default())),
            form_ttl: Duration::from_secs(config.form_ttl_secs),
        }
    }

    /// Normalize with the role's rule and check the format.
    pub fn prepare(role: Role, raw: &str) -> (String, Option<Classification>) {
        let normalized = normalize_serial(raw, NormalizationRule::for_role(role));
        let rejected = validate_serial_format(&normalized)
            .err()
            .map(|message| Classification::InvalidFormat { message });
        (normalized, rejected)
    }

    /// One read-only lookup. Remote failures become `LookupFailed`.
    pub async fn classify(&self, role: Role, normalized: &str) -> Classification {
        match self.gateway.lookup_serial(normalized).await {
            Ok(record) => classify_record(role, record.as_ref()),
            Err(e) => {
                let retryable = e.is_retryable();
                log::warn!("Serial lookup for {normalized} failed (retryable={retryable}): {e}");
                Classification::LookupFailed {
                    retryable,
                    message: if retryable {
                        "No se pudo verificar el número de serie, intenta nuevamente".to_string()
                    } else {
                        "Error al verificar el número de serie".to_string()
                    },
                }
            }
        }
    }

    /// Validate input typed into form `form_id`.
    ///
    /// Calls may overlap; only the latest one per form updates what the form
    /// displays, earlier results are reported back but not applied.
    pub async fn validate(&self, form_id: &str, role: Role, raw: &str) -> ValidateSerialResponse {
        let (normalized, rejected) = Self::prepare(role, raw);

        let ticket = {
            let mut forms = self.forms.lock().await;
            let ttl = self.form_ttl;
            forms.slots.retain(|_, slot| slot.touched.elapsed() < ttl);
            let last_ticket = forms.last_ticket;
            let slot = forms
                .slots
                .entry(form_id.to_string())
                .or_insert_with(|| FormSlot {
                    display: Sequenced::resume_after(last_ticket, Classification::Idle),
                    touched: Instant::now(),
                });
            slot.touched = Instant::now();
            let ticket = slot.display.issue_with(Classification::Checking);
            forms.last_ticket = forms.last_ticket.max(ticket.id());
            ticket
        };

        let classification = match rejected {
            Some(invalid) => invalid,
            None => self.classify(role, &normalized).await,
        };

        let mut forms = self.forms.lock().await;
        let (applied, current) = match forms.slots.get_mut(form_id) {
            Some(slot) => {
                let applied = slot.display.apply(ticket, classification.clone());
                (applied, slot.display.value().clone())
            }
            // Slot expired while the lookup was in flight
            None => (false, Classification::Idle),
        };
        if !applied {
            log::debug!(
                "Discarding superseded validation {} for form {form_id}",
                ticket.id()
            );
        }

        ValidateSerialResponse {
            request_id: ticket.id(),
            normalized,
            can_submit: current.allows_submit(),
            message: current.message(),
            classification,
            applied,
            current,
        }
    }
}
