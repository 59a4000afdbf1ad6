//! Integration tests for case submission and guarantee cancellation.
//!
//! Runs [`CaseService`] end to end with in-memory stores and a scripted
//! Signifyd API.

use std::sync::Mutex;

use rust_decimal::Decimal;
use signifyd_connect::client::ApiError;
use signifyd_connect::{
    CaseApi, CaseContext, CaseService, InMemoryCaseStore, InMemoryOrderSource, SubmissionOutcome,
};
use signifyd_connect_core::{Case, CaseStatus, Guarantee};
use signifyd_connect_integration_tests::{braintree_order, builder, host_with_history};

/// Signifyd stand-in that answers from a script and remembers every call.
#[derive(Debug)]
struct ScriptedApi {
    investigation_id: Option<String>,
    disposition: String,
    cases: Mutex<Vec<Case>>,
    cancellations: Mutex<Vec<String>>,
}

impl ScriptedApi {
    fn new(investigation_id: Option<&str>, disposition: &str) -> Self {
        Self {
            investigation_id: investigation_id.map(String::from),
            disposition: disposition.to_string(),
            cases: Mutex::new(Vec::new()),
            cancellations: Mutex::new(Vec::new()),
        }
    }

    fn case_count(&self) -> usize {
        self.cases.lock().expect("lock").len()
    }

    fn cancellations(&self) -> Vec<String> {
        self.cancellations.lock().expect("lock").clone()
    }
}

impl CaseApi for ScriptedApi {
    async fn create_case(&self, case: &Case) -> Result<Option<String>, ApiError> {
        self.cases.lock().expect("lock").push(case.clone());
        Ok(self.investigation_id.clone())
    }

    async fn cancel_guarantee(&self, code: &str) -> Result<String, ApiError> {
        self.cancellations.lock().expect("lock").push(code.to_string());
        Ok(self.disposition.clone())
    }
}

type Service = CaseService<InMemoryCaseStore, ScriptedApi, InMemoryOrderSource>;

fn service(api: ScriptedApi) -> Service {
    CaseService::new(InMemoryCaseStore::new(), api, host_with_history(), builder())
}

/// Simulate the guarantee decision arriving for a submitted case.
async fn decide(service: &Service, guarantee: Guarantee) {
    let order = braintree_order();
    let mut record = service
        .get_case(&order)
        .await
        .expect("load")
        .expect("case exists");
    record.set_guarantee(guarantee, chrono::Utc::now());
    signifyd_connect::CaseStore::save(service.store(), &record)
        .await
        .expect("save");
}

#[tokio::test]
async fn test_submit_then_cancel_fully_refunded_order() {
    let service = service(ScriptedApi::new(Some("4401"), "CANCELED"));
    let mut order = braintree_order();

    let outcome = service
        .submit_order(&order, CaseContext::new())
        .await
        .expect("submit");
    assert_eq!(
        outcome,
        SubmissionOutcome::Submitted {
            code: "4401".to_string()
        }
    );

    let record = service.get_case(&order).await.expect("load").expect("case");
    assert_eq!(record.signifyd_status, CaseStatus::Pending);
    assert_eq!(record.code.as_deref(), Some("4401"));
    assert!(service.has_guaranty(&order).await.expect("guaranty"));

    decide(&service, Guarantee::Approved).await;

    // Still refundable: nothing is sent.
    order.items[1].qty_to_refund = Decimal::ONE;
    assert!(!service.cancel_case(&order).await.expect("cancel"));
    assert!(service.api().cancellations().is_empty());
    let record = service.get_case(&order).await.expect("load").expect("case");
    assert_eq!(record.guarantee, Some(Guarantee::Approved));
    assert!(service.host().guarantee(&order.increment_id).is_none());

    order.items[1].qty_to_refund = Decimal::ZERO;
    assert!(service.cancel_case(&order).await.expect("cancel"));
    assert_eq!(service.api().cancellations(), vec!["4401".to_string()]);

    let record = service.get_case(&order).await.expect("load").expect("case");
    assert_eq!(record.guarantee, Some(Guarantee::Canceled));
    assert_eq!(
        service.host().guarantee(&order.increment_id),
        Some(Guarantee::Canceled)
    );
}

#[tokio::test]
async fn test_submit_is_idempotent_per_order() {
    let service = service(ScriptedApi::new(Some("4401"), "CANCELED"));
    let order = braintree_order();

    service
        .submit_order(&order, CaseContext::new())
        .await
        .expect("submit");
    let again = service
        .submit_order(&order, CaseContext::new())
        .await
        .expect("submit");

    assert_eq!(again, SubmissionOutcome::AlreadySubmitted);
    assert_eq!(service.api().case_count(), 1);
    assert_eq!(service.store().len(), 1);
}

#[tokio::test]
async fn test_rejected_submission_leaves_pending_record() {
    let service = service(ScriptedApi::new(None, "CANCELED"));
    let order = braintree_order();

    let outcome = service
        .submit_order(&order, CaseContext::new())
        .await
        .expect("submit");
    assert_eq!(outcome, SubmissionOutcome::Failed);

    let record = service.get_case(&order).await.expect("load").expect("case");
    assert!(record.code.is_none());
    assert_eq!(record.signifyd_status, CaseStatus::Pending);
}

#[tokio::test]
async fn test_declined_and_not_applicable_are_never_cancelled() {
    for guarantee in [Guarantee::Declined, Guarantee::NotApplicable] {
        let service = service(ScriptedApi::new(Some("4401"), "CANCELED"));
        let order = braintree_order();
        service
            .submit_order(&order, CaseContext::new())
            .await
            .expect("submit");
        decide(&service, guarantee).await;

        assert!(!service.cancel_case(&order).await.expect("cancel"));
        assert!(service.api().cancellations().is_empty());
    }
}

#[tokio::test]
async fn test_not_applicable_means_no_guaranty() {
    let service = service(ScriptedApi::new(Some("4401"), "CANCELED"));
    let order = braintree_order();
    service
        .submit_order(&order, CaseContext::new())
        .await
        .expect("submit");

    decide(&service, Guarantee::NotApplicable).await;
    assert!(!service.has_guaranty(&order).await.expect("guaranty"));
}

#[tokio::test]
async fn test_unexpected_disposition_changes_nothing() {
    let service = service(ScriptedApi::new(Some("4401"), "IN_REVIEW"));
    let order = braintree_order();
    service
        .submit_order(&order, CaseContext::new())
        .await
        .expect("submit");
    decide(&service, Guarantee::Approved).await;

    assert!(!service.cancel_case(&order).await.expect("cancel"));

    let record = service.get_case(&order).await.expect("load").expect("case");
    assert_eq!(record.guarantee, Some(Guarantee::Approved));
    assert!(service.host().guarantee(&order.increment_id).is_none());
}
