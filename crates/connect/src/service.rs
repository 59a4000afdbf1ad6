//! Case lifecycle orchestration.
//!
//! [`CaseService`] ties together the case store, the case builder, the
//! Signifyd API client and the host order store:
//!
//! - **Submission**: persist a `PENDING` record, build the case, post it,
//!   and remember the investigation id the service assigns
//! - **Cancellation**: ask for the guarantee to be cancelled once every line
//!   of the order has been cancelled or refunded, then record the outcome on
//!   both the case record and the order
//!
//! Submission and cancellation failures on the API side are logged and
//! reported as `None`/`false`. Store failures are returned as errors.

use chrono::Utc;
use signifyd_connect_core::{Case, CaseRecord, Guarantee};
use tracing::{debug, error, info, instrument};

use crate::builder::{CaseBuilder, CaseContext};
use crate::client::{CANCELED_DISPOSITION, CaseApi};
use crate::error::ConnectError;
use crate::fingerprint::{DeviceFingerprinter, StoreFingerprinter};
use crate::order::{Order, OrderSource};
use crate::store::CaseStore;

/// Result of [`CaseService::submit_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// A case record already existed; nothing was sent.
    AlreadySubmitted,
    /// The case was accepted and assigned an investigation id.
    Submitted { code: String },
    /// The case was not accepted. The `PENDING` record stays in place.
    Failed,
}

/// Drives case submission and guarantee cancellation for orders.
#[derive(Debug)]
pub struct CaseService<S, A, H, F = StoreFingerprinter> {
    store: S,
    api: A,
    host: H,
    builder: CaseBuilder<F>,
}

impl<S, A, H, F> CaseService<S, A, H, F>
where
    S: CaseStore,
    A: CaseApi,
    H: OrderSource,
    F: DeviceFingerprinter,
{
    #[must_use]
    pub const fn new(store: S, api: A, host: H, builder: CaseBuilder<F>) -> Self {
        Self {
            store,
            api,
            host,
            builder,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Case record for an order.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Store` if the record cannot be loaded.
    pub async fn get_case(&self, order: &Order) -> Result<Option<CaseRecord>, ConnectError> {
        Ok(self.store.load(&order.increment_id).await?)
    }

    /// Whether a case record exists for an order.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Store` if the record cannot be loaded.
    pub async fn does_case_exist(&self, order: &Order) -> Result<bool, ConnectError> {
        Ok(self.get_case(order).await?.is_some())
    }

    /// Persist a fresh `PENDING` record for an order.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Store` if the record cannot be written, including
    /// when a record for the order already exists.
    #[instrument(skip_all, fields(order_id = %order.increment_id))]
    pub async fn create_new_case(&self, order: &Order) -> Result<CaseRecord, ConnectError> {
        let record = CaseRecord::pending(order.increment_id.as_str(), Utc::now());
        self.store.create(&record).await?;
        debug!("Case record created");
        Ok(record)
    }

    /// Build the case document for an order.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Host` if customer data cannot be read.
    pub async fn process_order_data(
        &self,
        order: &Order,
        context: CaseContext,
    ) -> Result<Case, ConnectError> {
        self.builder.build(order, context, &self.host).await
    }

    /// Send a case to Signifyd.
    ///
    /// Returns the investigation id, or `None` when the service did not
    /// accept the case.
    #[instrument(skip_all, fields(order_id = %case.purchase.order_id))]
    pub async fn post_case(&self, case: &Case) -> Option<String> {
        match self.api.create_case(case).await {
            Ok(Some(code)) => {
                debug!(code = %code, "Case sent");
                Some(code)
            }
            Ok(None) => {
                error!("Case failed to send: no investigation id returned");
                None
            }
            Err(e) => {
                error!(error = %e, "Case failed to send");
                None
            }
        }
    }

    /// Submit an order for review unless it already has a case.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError` if the case store or host data store fails.
    #[instrument(skip_all, fields(order_id = %order.increment_id))]
    pub async fn submit_order(
        &self,
        order: &Order,
        context: CaseContext,
    ) -> Result<SubmissionOutcome, ConnectError> {
        if self.does_case_exist(order).await? {
            debug!("Case already exists, skipping submission");
            return Ok(SubmissionOutcome::AlreadySubmitted);
        }

        let mut record = self.create_new_case(order).await?;
        let case = self.process_order_data(order, context).await?;

        let Some(code) = self.post_case(&case).await else {
            return Ok(SubmissionOutcome::Failed);
        };

        record.code = Some(code.clone());
        record.updated = Utc::now();
        self.store.save(&record).await?;

        info!(code = %code, "Order submitted for review");
        Ok(SubmissionOutcome::Submitted { code })
    }

    /// Cancel the guarantee of an order that has been fully cancelled or
    /// refunded.
    ///
    /// Returns `true` only when Signifyd confirms the cancellation.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError` if the case store or host data store fails.
    #[instrument(skip_all, fields(order_id = %order.increment_id))]
    pub async fn cancel_case(&self, order: &Order) -> Result<bool, ConnectError> {
        debug!("Trying to cancel case");

        let Some(mut record) = self.get_case(order).await? else {
            debug!("Guarantee cancel skipped: case not found");
            return Ok(false);
        };

        let Some(guarantee) = record.guarantee.filter(Guarantee::is_cancelable) else {
            debug!(
                guarantee = ?record.guarantee.map(|g| g.as_str()),
                "Guarantee cancel skipped: guarantee not cancelable"
            );
            return Ok(false);
        };

        if order.items.iter().any(|item| item.has_open_quantity()) {
            debug!("Guarantee cancel skipped: items not yet canceled or refunded");
            return Ok(false);
        }

        let Some(code) = record.code.clone() else {
            debug!("Guarantee cancel skipped: case has no investigation id");
            return Ok(false);
        };

        debug!(code = %code, guarantee = %guarantee, "Cancelling case");
        let disposition = match self.api.cancel_guarantee(&code).await {
            Ok(disposition) => disposition,
            Err(e) => {
                error!(code = %code, error = %e, "Guarantee cancel request failed");
                return Ok(false);
            }
        };
        debug!(disposition = %disposition, "Cancel disposition result");

        if disposition != CANCELED_DISPOSITION {
            return Ok(false);
        }

        record.set_guarantee(Guarantee::Canceled, Utc::now());
        self.store.save(&record).await?;
        self.host
            .save_guarantee(&order.increment_id, Guarantee::Canceled)
            .await?;

        info!(code = %code, "Guarantee canceled");
        Ok(true)
    }

    /// Whether an order's case carries a guarantee.
    ///
    /// Only an explicit `N/A` counts as no guarantee; orders without a case
    /// record report `true`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Store` if the record cannot be loaded.
    pub async fn has_guaranty(&self, order: &Order) -> Result<bool, ConnectError> {
        let record = self.get_case(order).await?;
        Ok(record.and_then(|r| r.guarantee) != Some(Guarantee::NotApplicable))
    }
}
