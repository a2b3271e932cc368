//! In-memory `BackendGateway` for service and handler tests.

use futures_util::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::BackendGateway;
use crate::error::{AppError, AppResult};
use crate::models::*;

#[derive(Default)]
pub struct FakeGateway {
    pub serials: Mutex<HashMap<String, SerialRecord>>,
    pub lookup_gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub lookup_fails_transient: Mutex<bool>,
    pub lookup_calls: AtomicUsize,
    pub coupons: Mutex<Vec<Coupon>>,
    pub coupon_fetches: AtomicUsize,
    pub purchases: Mutex<HashMap<String, WinnerIdentity>>,
    pub purchase_gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub failing_purchases: Mutex<HashSet<String>>,
    pub buyer_result: Mutex<BuyerRegistrationResult>,
    pub seller_result: Mutex<SellerRegistrationResult>,
    pub buyer_registrations: Mutex<Vec<BuyerRegistration>>,
    pub seller_registrations: Mutex<Vec<SellerRegistration>>,
    pub persist_failures: AtomicUsize,
    pub mark_failures: AtomicUsize,
    pub persisted: Mutex<Vec<DrawResultRecord>>,
    pub marked: Mutex<Vec<Vec<String>>>,
}

pub fn serial(serial_number: &str) -> SerialRecord {
    SerialRecord {
        serial_number: serial_number.to_string(),
        status: SerialStatus::Available,
        buyer_status: RegistrationStatus::NotRegistered,
        seller_status: RegistrationStatus::NotRegistered,
        campaign_type: Some(CampaignType::Standard),
        product: Product {
            model_name: "Skyworth 55\" UHD".to_string(),
            coupon_multiplier: 2,
            points_value: 10,
        },
    }
}

pub fn coupon(code: &str, purchase_id: Option<&str>) -> Coupon {
    Coupon {
        id: format!("id-{code}"),
        code: code.to_string(),
        owner_type: OwnerType::Buyer,
        purchase_id: purchase_id.map(str::to_string),
    }
}

pub fn identity(full_name: &str) -> WinnerIdentity {
    WinnerIdentity {
        full_name: full_name.to_string(),
        dni: "45678912".to_string(),
        city: "Lima".to_string(),
        email: "ganador@example.com".to_string(),
        phone: "987654321".to_string(),
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        let fake = Self::default();
        *fake.buyer_result.lock().unwrap() = BuyerRegistrationResult {
            success: true,
            error: None,
            coupons: Some(vec!["CUP-0001".to_string(), "CUP-0002".to_string()]),
        };
        *fake.seller_result.lock().unwrap() = SellerRegistrationResult {
            success: true,
            error: None,
            points: Some(10),
            sale_id: Some("sale-1".to_string()),
        };
        fake
    }

    pub fn with_serial(self, record: SerialRecord) -> Self {
        self.serials
            .lock()
            .unwrap()
            .insert(record.serial_number.clone(), record);
        self
    }

    pub fn with_coupons(self, coupons: Vec<Coupon>) -> Self {
        *self.coupons.lock().unwrap() = coupons;
        self
    }

    pub fn with_purchase(self, purchase_id: &str, who: WinnerIdentity) -> Self {
        self.purchases
            .lock()
            .unwrap()
            .insert(purchase_id.to_string(), who);
        self
    }

    /// Hold lookups of `serial_number` until the returned handle is notified.
    pub fn gate_lookup(&self, serial_number: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lookup_gates
            .lock()
            .unwrap()
            .insert(serial_number.to_string(), gate.clone());
        gate
    }

    /// Hold identity fetches of `purchase_id` until the returned handle is notified.
    pub fn gate_purchase(&self, purchase_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.purchase_gates
            .lock()
            .unwrap()
            .insert(purchase_id.to_string(), gate.clone());
        gate
    }
}

impl BackendGateway for FakeGateway {
    fn lookup_serial<'a>(
        &'a self,
        serial_number: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<SerialRecord>>> {
        Box::pin(async move {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.lookup_gates.lock().unwrap().get(serial_number).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if *self.lookup_fails_transient.lock().unwrap() {
                return Err(AppError::TransientLookup("timeout".to_string()));
            }
            Ok(self.serials.lock().unwrap().get(serial_number).cloned())
        })
    }

    fn register_buyer_serial<'a>(
        &'a self,
        registration: &'a BuyerRegistration,
    ) -> BoxFuture<'a, AppResult<BuyerRegistrationResult>> {
        Box::pin(async move {
            self.buyer_registrations
                .lock()
                .unwrap()
                .push(registration.clone());
            Ok(self.buyer_result.lock().unwrap().clone())
        })
    }

    fn register_seller_serial<'a>(
        &'a self,
        registration: &'a SellerRegistration,
    ) -> BoxFuture<'a, AppResult<SellerRegistrationResult>> {
        Box::pin(async move {
            self.seller_registrations
                .lock()
                .unwrap()
                .push(registration.clone());
            Ok(self.seller_result.lock().unwrap().clone())
        })
    }

    fn fetch_active_buyer_coupons(&self) -> BoxFuture<'_, AppResult<Vec<Coupon>>> {
        Box::pin(async move {
            self.coupon_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.coupons.lock().unwrap().clone())
        })
    }

    fn fetch_purchase_identity<'a>(
        &'a self,
        purchase_id: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<WinnerIdentity>>> {
        Box::pin(async move {
            let gate = self.purchase_gates.lock().unwrap().get(purchase_id).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.failing_purchases.lock().unwrap().contains(purchase_id) {
                return Err(AppError::TransientLookup("purchase timeout".to_string()));
            }
            Ok(self.purchases.lock().unwrap().get(purchase_id).cloned())
        })
    }

    fn persist_draw_result<'a>(
        &'a self,
        result: &'a DrawResultRecord,
    ) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            // Let overlapping callers run while the write is in flight
            tokio::task::yield_now().await;
            if take_failure(&self.persist_failures) {
                return Err(AppError::ExternalApiError("draws insert failed".to_string()));
            }
            self.persisted.lock().unwrap().push(result.clone());
            Ok(())
        })
    }

    fn mark_coupons_used<'a>(&'a self, codes: &'a [String]) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            if take_failure(&self.mark_failures) {
                return Err(AppError::TransientLookup("coupons update failed".to_string()));
            }
            self.marked.lock().unwrap().push(codes.to_vec());
            Ok(())
        })
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
