//! Integration tests for request coalescing on real dispatch schedulers
//!
//! Every scenario runs the core `Backend` on `DispatchScheduler` pools over a
//! scripted transport that sleeps 200ms per call, so concurrent callers
//! overlap with the in-flight request.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tollgate_core::completion;
use tollgate_domain::{
    BackendError, CatalogDirective, CustomerInfo, DelayPolicy, DiagnosticsEntry, DiagnosticsResponse,
    DirectedError, Endpoint, ErrorKind, Offerings, ReceiptDirective, ReceiptSubmission,
    RetryDirective, WebBillingProducts,
};

#[path = "support.rs"]
mod support;

use support::{ScenarioBackend, CALLBACK_TIMEOUT, CUSTOMER_BODY, OFFERINGS_BODY, TRANSPORT_LATENCY};

// ============================================================================
// Helpers
// ============================================================================

fn customer_path(user: &str) -> String {
    Endpoint::GetCustomerInfo { app_user_id: user.into() }.path()
}

fn offerings_path(user: &str) -> String {
    Endpoint::GetOfferings { app_user_id: user.into() }.path()
}

/// Run `count` callers that all start at the same instant and collect their
/// results in caller order.
fn concurrently<R, F>(count: usize, call: F) -> Vec<R>
where
    R: Send + 'static,
    F: Fn(usize) -> R + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(count));
    let call = Arc::new(call);
    let handles: Vec<_> = (0..count)
        .map(|index| {
            let barrier = Arc::clone(&barrier);
            let call = Arc::clone(&call);
            thread::spawn(move || {
                barrier.wait();
                call(index)
            })
        })
        .collect();
    handles.into_iter().map(|handle| handle.join().expect("caller thread")).collect()
}

// ============================================================================
// Coalescing
// ============================================================================

#[test]
fn concurrent_customer_info_requests_share_one_network_call() {
    let scenario = Arc::new(ScenarioBackend::new(DelayPolicy::immediate()));
    scenario.transport.respond(&customer_path("user-1"), 200, CUSTOMER_BODY);

    let shared = Arc::clone(&scenario);
    let results = concurrently(2, move |_| {
        let (on_done, handle) = completion::<CustomerInfo, BackendError>();
        shared.backend.get_customer_info("user-1", false, on_done);
        handle.recv_blocking()
    });

    assert_eq!(scenario.transport.calls_to(&customer_path("user-1")), 1);
    let first = results[0].as_ref().expect("first caller succeeds");
    let second = results[1].as_ref().expect("second caller succeeds");
    assert_eq!(first, second);
    assert_eq!(first.subscriber.original_app_user_id, "user-1");
    scenario.wait_idle();
    assert_eq!(scenario.backend.in_flight(), 0);
}

#[test]
fn offerings_for_different_users_are_not_coalesced() {
    let scenario = Arc::new(ScenarioBackend::new(DelayPolicy::immediate()));
    scenario.transport.respond(&offerings_path("user-1"), 200, OFFERINGS_BODY);
    scenario.transport.respond(&offerings_path("user-2"), 200, OFFERINGS_BODY);

    let shared = Arc::clone(&scenario);
    let results = concurrently(2, move |index| {
        let user = if index == 0 { "user-1" } else { "user-2" };
        let (on_done, handle) = completion::<Offerings, DirectedError<CatalogDirective>>();
        shared.backend.get_offerings(user, false, on_done);
        handle.recv_blocking()
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(scenario.transport.calls_to(&offerings_path("user-1")), 1);
    assert_eq!(scenario.transport.calls_to(&offerings_path("user-2")), 1);
}

#[test]
fn identical_diagnostics_batches_coalesce_until_completion() {
    let scenario = Arc::new(ScenarioBackend::new(DelayPolicy::immediate()));
    scenario.transport.respond("/diagnostics", 200, "{}");

    let batch = Arc::new(vec![
        DiagnosticsEntry::new("http_request_performed", Utc::now()).with_property("status", 200),
    ]);

    let shared = Arc::clone(&scenario);
    let shared_batch = Arc::clone(&batch);
    let results = concurrently(3, move |_| {
        let (on_done, handle) =
            completion::<DiagnosticsResponse, DirectedError<RetryDirective>>();
        shared.backend.post_diagnostics(&shared_batch, on_done);
        handle.recv_blocking()
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(scenario.transport.calls_to("/diagnostics"), 1);

    scenario.wait_idle();
    let (on_done, handle) = completion::<DiagnosticsResponse, DirectedError<RetryDirective>>();
    scenario.backend.post_diagnostics(&batch, on_done);
    handle.recv_blocking().expect("fourth post succeeds");
    assert_eq!(scenario.transport.calls_to("/diagnostics"), 2);
}

#[test]
fn receipts_with_different_offerings_are_sent_separately() {
    let scenario = Arc::new(ScenarioBackend::new(DelayPolicy::immediate()));
    scenario.transport.respond("/receipts", 200, CUSTOMER_BODY);

    let shared = Arc::clone(&scenario);
    let results = concurrently(2, move |index| {
        let receipt = ReceiptSubmission::new("user-1", "fetch-token")
            .with_presented_offering(if index == 0 { "default" } else { "holiday" });
        let (on_done, handle) = completion::<CustomerInfo, DirectedError<ReceiptDirective>>();
        shared.backend.post_receipt(&receipt, on_done);
        handle.recv_blocking()
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(scenario.transport.calls_to("/receipts"), 2);
}

/// Post two otherwise identical receipts concurrently, letting `vary` tell
/// them apart by caller index.
fn post_receipt_pair<F>(vary: F) -> Arc<ScenarioBackend>
where
    F: Fn(ReceiptSubmission, usize) -> ReceiptSubmission + Send + Sync + 'static,
{
    let scenario = Arc::new(ScenarioBackend::new(DelayPolicy::immediate()));
    scenario.transport.respond("/receipts", 200, CUSTOMER_BODY);

    let shared = Arc::clone(&scenario);
    let results = concurrently(2, move |index| {
        let receipt = vary(ReceiptSubmission::new("user-1", "fetch-token"), index);
        let (on_done, handle) = completion::<CustomerInfo, DirectedError<ReceiptDirective>>();
        shared.backend.post_receipt(&receipt, on_done);
        handle.recv_blocking()
    });

    assert!(results.iter().all(Result::is_ok));
    scenario
}

#[test]
fn receipts_with_different_base_plans_are_sent_separately() {
    let scenario = post_receipt_pair(|receipt, index| {
        receipt.with_base_plan_id(if index == 0 { "p1m" } else { "p1y" })
    });

    assert_eq!(scenario.transport.calls_to("/receipts"), 2);
    let mut plans: Vec<_> = scenario
        .transport
        .requests()
        .iter()
        .filter_map(|request| request.body.as_ref()?.get("base_plan_id").cloned())
        .collect();
    plans.sort_by_key(ToString::to_string);
    assert_eq!(plans, vec!["p1m", "p1y"]);
}

#[test]
fn receipts_with_different_store_user_ids_are_sent_separately() {
    let scenario = post_receipt_pair(|receipt, index| {
        receipt.with_store_user_id(if index == 0 { "store-a" } else { "store-b" })
    });

    assert_eq!(scenario.transport.calls_to("/receipts"), 2);
}

#[test]
fn identical_receipts_share_one_network_call() {
    let scenario = post_receipt_pair(|receipt, _| receipt.with_base_plan_id("p1m"));

    assert_eq!(scenario.transport.calls_to("/receipts"), 1);
}

#[test]
fn web_billing_lookups_coalesce_on_the_product_id_set() {
    let path = "/web-billing/user-1/products?id=annual&id=monthly";
    let scenario = Arc::new(ScenarioBackend::new(DelayPolicy::immediate()));
    scenario.transport.respond(path, 200, r#"{"product_details": []}"#);

    let shared = Arc::clone(&scenario);
    let results = concurrently(2, move |index| {
        let ids = if index == 0 { ["monthly", "annual"] } else { ["annual", "monthly"] };
        let (on_done, handle) = completion::<WebBillingProducts, BackendError>();
        shared.backend.get_web_billing_products("user-1", ids, on_done);
        handle.recv_blocking()
    });

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(scenario.transport.call_count(), 1);
    assert_eq!(scenario.transport.calls_to(path), 1);
}

#[test]
fn foreground_call_joins_pending_background_call() {
    let scenario = ScenarioBackend::new(DelayPolicy::fixed(100));
    scenario.transport.respond(&customer_path("user-1"), 200, CUSTOMER_BODY);

    let (background_done, background) = completion::<CustomerInfo, BackendError>();
    let (foreground_done, foreground) = completion::<CustomerInfo, BackendError>();
    scenario.backend.get_customer_info("user-1", true, background_done);
    scenario.backend.get_customer_info("user-1", false, foreground_done);

    let background = background.recv_blocking().expect("background result");
    let foreground = foreground.recv_blocking().expect("foreground result");
    assert_eq!(background, foreground);
    assert_eq!(scenario.transport.call_count(), 1);
}

#[test]
fn call_after_completion_starts_a_new_request() {
    let scenario = ScenarioBackend::new(DelayPolicy::immediate());
    scenario.transport.respond(&customer_path("user-1"), 200, CUSTOMER_BODY);

    for _ in 0..2 {
        let (on_done, handle) = completion::<CustomerInfo, BackendError>();
        scenario.backend.get_customer_info("user-1", false, on_done);
        handle.recv_blocking().expect("customer info");
        scenario.wait_idle();
    }

    assert_eq!(scenario.transport.call_count(), 2);
}

// ============================================================================
// Delay tiers
// ============================================================================

#[test]
fn background_calls_wait_out_their_delay_and_foreground_calls_do_not() {
    let delay = Duration::from_millis(400);
    let scenario = ScenarioBackend::new(DelayPolicy::fixed(400));
    scenario.transport.respond(&customer_path("background-user"), 200, CUSTOMER_BODY);
    scenario.transport.respond(&customer_path("foreground-user"), 200, CUSTOMER_BODY);

    let started = Instant::now();
    let (background_done, mut background) = completion::<CustomerInfo, BackendError>();
    let (foreground_done, foreground) = completion::<CustomerInfo, BackendError>();
    scenario.backend.get_customer_info("background-user", true, background_done);
    scenario.backend.get_customer_info("foreground-user", false, foreground_done);

    foreground.recv_blocking().expect("foreground result");
    assert!(started.elapsed() >= TRANSPORT_LATENCY);
    assert!(background.try_recv().is_none(), "background call must still be delayed");

    let deadline = Instant::now() + CALLBACK_TIMEOUT;
    let result = loop {
        if let Some(result) = background.try_recv() {
            break result;
        }
        assert!(Instant::now() < deadline, "background call never completed");
        thread::sleep(Duration::from_millis(10));
    };
    result.expect("background result");
    assert!(started.elapsed() >= delay + TRANSPORT_LATENCY);

    let requests = scenario.transport.requests();
    assert_eq!(requests[0].endpoint.path(), customer_path("foreground-user"));
    assert_eq!(requests[1].endpoint.path(), customer_path("background-user"));
}

// ============================================================================
// Error directives
// ============================================================================

#[test]
fn receipt_server_error_keeps_purchase_and_uses_cached_entitlements() {
    let scenario = ScenarioBackend::new(DelayPolicy::immediate());
    scenario.transport.respond("/receipts", 500, r#"{"message": "internal"}"#);

    let (on_done, handle) = completion::<CustomerInfo, DirectedError<ReceiptDirective>>();
    scenario.backend.post_receipt(&ReceiptSubmission::new("user-1", "token"), on_done);

    let error = handle.recv_blocking().expect_err("server error");
    assert_eq!(error.error.kind, ErrorKind::UnknownBackendError);
    assert_eq!(error.directive, ReceiptDirective::UseCachedEntitlementsAndDoNotConsume);
}

#[test]
fn receipt_with_malformed_product_ids_is_unsupported() {
    let scenario = ScenarioBackend::new(DelayPolicy::immediate());
    scenario
        .transport
        .respond("/receipts", 400, r#"{"code": 7662, "message": "product ids malformed"}"#);

    let (on_done, handle) = completion::<CustomerInfo, DirectedError<ReceiptDirective>>();
    scenario.backend.post_receipt(&ReceiptSubmission::new("user-1", "token"), on_done);

    let error = handle.recv_blocking().expect_err("client error");
    assert_eq!(error.error.kind, ErrorKind::UnsupportedError);
    assert_eq!(error.directive, ReceiptDirective::DoNotConsume);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn calls_after_shutdown_fail_without_touching_the_network() {
    let scenario = ScenarioBackend::new(DelayPolicy::immediate());
    scenario.transport.respond(&customer_path("user-1"), 200, CUSTOMER_BODY);
    scenario.backend.shutdown();

    let (on_done, handle) = completion::<CustomerInfo, BackendError>();
    scenario.backend.get_customer_info("user-1", false, on_done);

    let error = handle.recv_blocking().expect_err("dispatcher shut down");
    assert_eq!(error.kind, ErrorKind::UnknownError);
    assert_eq!(scenario.transport.call_count(), 0);
    assert_eq!(scenario.backend.in_flight(), 0);
}

#[test]
fn calls_accepted_before_shutdown_still_complete() {
    let scenario = ScenarioBackend::new(DelayPolicy::fixed(50));
    scenario.transport.respond(&customer_path("user-1"), 200, CUSTOMER_BODY);

    let (on_done, handle) = completion::<CustomerInfo, BackendError>();
    scenario.backend.get_customer_info("user-1", true, on_done);
    scenario.backend.shutdown();

    handle.recv_blocking().expect("accepted call completes");
    assert_eq!(scenario.transport.call_count(), 1);
}
