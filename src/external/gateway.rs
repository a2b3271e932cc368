use futures_util::future::BoxFuture;

use crate::error::AppResult;
use crate::models::{
    BuyerRegistration, BuyerRegistrationResult, Coupon, DrawResultRecord, SellerRegistration,
    SellerRegistrationResult, SerialRecord, WinnerIdentity,
};

/// Remote procedures and tables of the promotion backend.
///
/// Storage, authorization and coupon/point arithmetic all live behind this
/// boundary; callers only see the shapes below.
pub trait BackendGateway: Send + Sync {
    /// Exact match on the normalized serial. Read-only.
    fn lookup_serial<'a>(&'a self, serial_number: &'a str)
    -> BoxFuture<'a, AppResult<Option<SerialRecord>>>;

    /// `rpc_register_buyer_serial`
    fn register_buyer_serial<'a>(
        &'a self,
        registration: &'a BuyerRegistration,
    ) -> BoxFuture<'a, AppResult<BuyerRegistrationResult>>;

    /// `rpc_register_seller_serial`
    fn register_seller_serial<'a>(
        &'a self,
        registration: &'a SellerRegistration,
    ) -> BoxFuture<'a, AppResult<SellerRegistrationResult>>;

    /// Every coupon with `status=ACTIVE` and `owner_type=BUYER`.
    fn fetch_active_buyer_coupons(&self) -> BoxFuture<'_, AppResult<Vec<Coupon>>>;

    fn fetch_purchase_identity<'a>(
        &'a self,
        purchase_id: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<WinnerIdentity>>>;

    fn persist_draw_result<'a>(&'a self, result: &'a DrawResultRecord)
    -> BoxFuture<'a, AppResult<()>>;

    fn mark_coupons_used<'a>(&'a self, codes: &'a [String]) -> BoxFuture<'a, AppResult<()>>;
}
