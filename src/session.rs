//! Cart session
//!
//! The per-customer state machine that owns the cart snapshot and the applied
//! coupon. Every change is applied optimistically, confirmed with the backend,
//! and re-synchronised from the server's answer. A failed confirmation is
//! compensated by refetching the authoritative cart.

use std::sync::Arc;

use jiff::Timestamp;
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cart::{CartError, CartMutation, CartSnapshot, CartsService},
    coupons::{AppliedCoupon, CouponError, CouponRejection, CouponRequest, CouponValidator, normalize_code},
    discounts::DiscountError,
    http::ApiError,
    ids::AddressId,
    offers::Offer,
    orders::CheckoutRequest,
    store::{AppliedCouponState, KeyValueStore, StoreError},
    totals::{CartTotals, PricingRules, TotalsError, calculate_totals, coupon_request},
};

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The change was refused before reaching the backend.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The coupon does not apply.
    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Persisted state could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Totals could not be calculated.
    #[error(transparent)]
    Totals(#[from] TotalsError),

    /// A discount could not be calculated.
    #[error(transparent)]
    Arithmetic(#[from] DiscountError),

    /// Some lines may not proceed to checkout.
    #[error("{} item(s) cannot be checked out", .0.len())]
    Unsellable(Vec<CartError>),

    /// The local cart has not been confirmed by the backend.
    #[error("cart is out of sync with the server, reload it first")]
    Desynced,
}

impl SessionError {
    /// Whether the credential was refused.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(error) if error.is_unauthorized())
    }
}

impl From<CouponError> for SessionError {
    fn from(error: CouponError) -> Self {
        match error {
            CouponError::Rejected(rejection) => Self::Coupon(rejection),
            CouponError::Arithmetic(error) => Self::Arithmetic(error),
            CouponError::Api(error) => Self::Api(error),
        }
    }
}

/// Whether the local snapshot matches the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// The snapshot is the server's latest answer.
    Synced,

    /// A mutation has been previewed locally and not yet confirmed.
    Optimistic(CartMutation),

    /// The snapshot could not be confirmed; reload before trusting it.
    Desynced,
}

/// A customer's cart session.
pub struct CartSession {
    carts: Arc<dyn CartsService>,
    coupons: Arc<dyn CouponValidator>,
    store: Box<dyn KeyValueStore>,
    offers: Vec<Offer<'static>>,
    rules: PricingRules<'static>,
    cart: CartSnapshot<'static>,
    coupon: Option<AppliedCoupon<'static>>,
    sync: SyncState,
}

impl CartSession {
    /// Create a session. The cart is empty and desynced until [`Self::load`].
    pub fn new(
        carts: Arc<dyn CartsService>,
        coupons: Arc<dyn CouponValidator>,
        store: Box<dyn KeyValueStore>,
        offers: Vec<Offer<'static>>,
        rules: PricingRules<'static>,
        currency: &'static Currency,
    ) -> Self {
        Self {
            carts,
            coupons,
            store,
            offers,
            rules,
            cart: CartSnapshot::new(currency),
            coupon: None,
            sync: SyncState::Desynced,
        }
    }

    /// The current cart snapshot.
    pub fn snapshot(&self) -> &CartSnapshot<'static> {
        &self.cart
    }

    /// The applied coupon, if any.
    pub fn applied_coupon(&self) -> Option<&AppliedCoupon<'static>> {
        self.coupon.as_ref()
    }

    /// Whether the snapshot matches the backend.
    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    /// Offers in effect.
    pub fn offers(&self) -> &[Offer<'static>] {
        &self.offers
    }

    /// Delivery pricing in effect.
    pub fn rules(&self) -> &PricingRules<'static> {
        &self.rules
    }

    /// Current totals breakdown.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Totals`] if an amount cannot be represented.
    pub fn totals(&self) -> Result<CartTotals<'static>, SessionError> {
        Ok(calculate_totals(
            &self.cart,
            &self.offers,
            self.coupon.as_ref(),
            &self.rules,
        )?)
    }

    /// Fetch the authoritative cart and restore the persisted coupon.
    ///
    /// A persisted coupon is re-validated against the fetched cart; if it no
    /// longer applies it is forgotten.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] if the cart cannot be fetched, or a store
    /// error if persisted state cannot be read.
    #[tracing::instrument(name = "session.load", skip(self), err)]
    pub async fn load(&mut self) -> Result<&CartSnapshot<'static>, SessionError> {
        let result = self.carts.get_cart().await;

        self.cart = self.check(result)?;
        self.sync = SyncState::Synced;

        if let Some(state) = AppliedCouponState::load(self.store.as_mut())? {
            debug!(code = %state.code, "re-validating persisted coupon");

            self.revalidate(state.code).await?;
        }

        Ok(&self.cart)
    }

    /// Apply a cart change.
    ///
    /// The change is checked and previewed locally first. The snapshot is then
    /// replaced by the server's cart, refetched when the server only returns a
    /// message, or refetched to undo the preview when the call fails. An applied
    /// coupon is re-validated against the resulting cart.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cart`] if the change is refused locally (nothing
    /// is sent), or [`SessionError::Api`] if the backend refuses it. In the
    /// latter case the snapshot has already been restored from the server, or
    /// the session is left [`SyncState::Desynced`] when that also failed.
    #[tracing::instrument(
        name = "session.mutate",
        skip(self, mutation),
        fields(mutation = mutation.to_str()),
        err
    )]
    pub async fn mutate(
        &mut self,
        mutation: CartMutation,
    ) -> Result<&CartSnapshot<'static>, SessionError> {
        let mut preview = self.cart.clone();

        match preview.apply(&mutation) {
            Ok(()) => {}
            // New lines are priced by the server; there is nothing to preview.
            Err(CartError::UnknownVariant(_)) if matches!(mutation, CartMutation::Add { .. }) => {}
            Err(error) => return Err(error.into()),
        }

        self.cart = preview;
        self.sync = SyncState::Optimistic(mutation.clone());

        match self.carts.apply(mutation).await {
            Ok(Some(cart)) => {
                self.cart = cart;
                self.sync = SyncState::Synced;
            }
            Ok(None) => {
                let result = self.carts.get_cart().await;
                self.resync(result)?;
            }
            Err(error) if error.is_unauthorized() => {
                self.invalidate();

                return Err(error.into());
            }
            Err(error) => {
                warn!(%error, "cart change failed, restoring server cart");

                let result = self.carts.get_cart().await;

                if let Err(refetch_error) = self.resync(result) {
                    if refetch_error.is_unauthorized() {
                        return Err(refetch_error);
                    }

                    warn!(error = %refetch_error, "failed to restore server cart");
                } else {
                    self.revalidate_applied().await?;
                }

                return Err(error.into());
            }
        }

        self.revalidate_applied().await?;

        Ok(&self.cart)
    }

    /// Validate a coupon against the current cart and apply it.
    ///
    /// The session changes only once the validator answers. A refused coupon
    /// leaves any previously applied coupon in place.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Desynced`] unless the cart is confirmed by the
    /// backend, [`SessionError::Coupon`] if the coupon does not apply, or
    /// [`SessionError::Api`] if it could not be checked.
    #[tracing::instrument(name = "session.apply_coupon", skip(self), err)]
    pub async fn apply_coupon(&mut self, code: &str) -> Result<&AppliedCoupon<'static>, SessionError> {
        if self.sync != SyncState::Synced {
            return Err(SessionError::Desynced);
        }

        let request = self.coupon_request(normalize_code(code))?;

        match self.coupons.validate_coupon(request).await {
            Ok(applied) => {
                AppliedCouponState::from_applied(&applied, Timestamp::now()).save(self.store.as_mut())?;

                info!(code = applied.code(), discount = %applied.discount_amount(), "coupon applied");

                Ok(self.coupon.insert(applied))
            }
            Err(CouponError::Api(error)) if error.is_unauthorized() => {
                self.invalidate();

                Err(error.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Remove the applied coupon, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the persisted state cannot be removed.
    pub fn remove_coupon(&mut self) -> Result<Option<AppliedCoupon<'static>>, SessionError> {
        AppliedCouponState::clear(self.store.as_mut())?;

        Ok(self.coupon.take())
    }

    /// Build a checkout request from the confirmed cart and its totals.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Desynced`] unless the cart is confirmed by the
    /// backend, or [`SessionError::Unsellable`] listing every line that may not
    /// proceed.
    pub fn checkout_request(
        &self,
        address_id: Option<AddressId>,
    ) -> Result<CheckoutRequest<'static>, SessionError> {
        if self.sync != SyncState::Synced {
            return Err(SessionError::Desynced);
        }

        let blockers = self.cart.checkout_blockers();

        if !blockers.is_empty() {
            return Err(SessionError::Unsellable(blockers));
        }

        let totals = self.totals()?;

        Ok(CheckoutRequest::from_totals(address_id, &self.cart, &totals)?)
    }

    fn coupon_request(&self, code: String) -> Result<CouponRequest<'static>, SessionError> {
        Ok(coupon_request(code, &self.cart, &self.offers, &self.rules)?)
    }

    async fn revalidate_applied(&mut self) -> Result<(), SessionError> {
        match self.coupon.as_ref().map(|applied| applied.code().to_string()) {
            Some(code) => self.revalidate(code).await,
            None => Ok(()),
        }
    }

    /// Re-run the validator for a previously accepted code. The outcome
    /// replaces the applied coupon.
    async fn revalidate(&mut self, code: String) -> Result<(), SessionError> {
        let request = self.coupon_request(code)?;

        match self.coupons.validate_coupon(request).await {
            Ok(applied) => {
                AppliedCouponState::from_applied(&applied, Timestamp::now()).save(self.store.as_mut())?;

                self.coupon = Some(applied);

                Ok(())
            }
            Err(CouponError::Rejected(rejection)) => {
                info!(reason = %rejection.reason(), "coupon no longer applies, removing it");

                self.coupon = None;
                AppliedCouponState::clear(self.store.as_mut())?;

                Ok(())
            }
            Err(CouponError::Api(error)) if error.is_unauthorized() => {
                self.invalidate();

                Err(error.into())
            }
            Err(CouponError::Api(error)) => {
                // Keep the persisted code so the next load can retry.
                warn!(%error, "coupon could not be re-validated, ignoring it for now");

                self.coupon = None;

                Ok(())
            }
            Err(CouponError::Arithmetic(error)) => {
                self.coupon = None;

                Err(error.into())
            }
        }
    }

    fn check<T>(&mut self, result: Result<T, ApiError>) -> Result<T, SessionError> {
        result.map_err(|error| {
            if error.is_unauthorized() {
                self.invalidate();
            }

            error.into()
        })
    }

    fn resync(&mut self, result: Result<CartSnapshot<'static>, ApiError>) -> Result<(), SessionError> {
        match self.check(result) {
            Ok(cart) => {
                self.cart = cart;
                self.sync = SyncState::Synced;

                Ok(())
            }
            Err(error) => {
                if !error.is_unauthorized() {
                    self.sync = SyncState::Desynced;
                }

                Err(error)
            }
        }
    }

    fn invalidate(&mut self) {
        warn!("credential refused, clearing session");

        self.cart = CartSnapshot::new(self.cart.currency());
        self.coupon = None;
        self.sync = SyncState::Desynced;

        if let Err(error) = AppliedCouponState::clear(self.store.as_mut()) {
            warn!(%error, "failed to clear persisted coupon");
        }
    }
}
