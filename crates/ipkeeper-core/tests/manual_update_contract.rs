//! Contract Test: Manual Updates
//!
//! Verifies how operator-triggered updates compose with the schedule:
//! - `update_sync` cancels the pending wait and continues the loop from its own attempt
//! - A replaced attempt that was already in flight cannot commit its result
//! - `update_async` runs out of band and never touches the schedule or the counters

mod common;

use common::*;
use ipkeeper_core::{ErrorCounters, ServiceStatus, UpdateErrorKind, UpdateResult, UpdateStatus};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn update_sync_requires_a_running_service() {
    let resolver = ScriptedResolver::always(Lookup::Ip(HOME_IP));
    let client = ScriptedClient::always(Reply::Accept);
    let service = service_with(&resolver, &client);

    assert_eq!(service.update_sync(true).await, None);
    assert_eq!(resolver.call_count(), 0);
    assert_eq!(service.status(), ServiceStatus::Ready);
}

#[tokio::test(start_paused = true)]
async fn update_sync_preempts_the_pending_wait() {
    let resolver = ScriptedResolver::always(Lookup::Ip(HOME_IP));
    let client = ScriptedClient::always(Reply::Accept);
    let service = service_with(&resolver, &client);

    service.start();
    minutes(1).await;
    assert_eq!(client.call_count(), 1);

    let result = service.update_sync(true).await;
    assert_eq!(result.map(|r| r.status()), Some(UpdateStatus::Success));
    assert_eq!(client.call_count(), 2, "Forced update must reach the API");
    assert_eq!(service.service_data().next_update_in, "10 min");

    // The replaced wait would have fired at 10 minutes
    minutes(9).await;
    assert_eq!(resolver.call_count(), 2);

    // The new schedule fires at 11 minutes, unforced and therefore skipped
    minutes(2).await;
    assert_eq!(resolver.call_count(), 3);
    assert_eq!(client.call_count(), 2);
    assert!(service.service_data().last_update_skipped);
}

#[tokio::test(start_paused = true)]
async fn replaced_attempt_in_flight_cannot_commit() {
    let resolver = ScriptedResolver::always(Lookup::Ip(HOME_IP));
    // The scheduled attempt hangs in the API for 8 minutes, then gets rejected
    let client =
        ScriptedClient::always(Reply::Accept).then(Duration::from_secs(8 * 60), Reply::Reject);
    let service = service_with(&resolver, &client);

    service.start();
    minutes(1).await;
    assert_eq!(client.call_count(), 1);

    let result = service.update_sync(true).await;
    assert_eq!(result.map(|r| r.status()), Some(UpdateStatus::Success));

    // The stray rejection lands at 8 minutes
    minutes(8).await;

    assert_eq!(
        service.last_result().map(|r| r.status()),
        Some(UpdateStatus::Success),
        "Stray completion must not overwrite the newer result"
    );
    assert_eq!(service.error_counters(), ErrorCounters::default());
    assert_eq!(service.status(), ServiceStatus::Running);
    assert_eq!(service.service_data().next_update_in, "2 min");
    assert_eq!(client.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn second_manual_update_supersedes_the_first() {
    let resolver = ScriptedResolver::always(Lookup::Ip(HOME_IP));
    let client = ScriptedClient::always(Reply::Accept);
    let service = service_with(&resolver, &client);

    service.start();
    minutes(1).await;

    let (first, second) = tokio::join!(service.update_sync(false), service.update_sync(true));

    assert_eq!(first, None, "The first request was canceled before it ran");
    assert_eq!(second.map(|r| r.status()), Some(UpdateStatus::Success));
    assert_eq!(resolver.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn update_async_leaves_the_schedule_alone() {
    let resolver = ScriptedResolver::always(Lookup::Ip(HOME_IP));
    let client = ScriptedClient::always(Reply::Reject).then(Duration::ZERO, Reply::Accept);
    let service = service_with(&resolver, &client);

    service.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    minutes(3).await;
    assert_eq!(service.service_data().next_update_in, "7 min");

    let result = service.update_async(true).await;

    assert_eq!(result.error_kind(), Some(UpdateErrorKind::Api));
    assert_eq!(service.last_result(), Some(result));
    assert_eq!(
        service.error_counters(),
        ErrorCounters::default(),
        "Out-of-band attempts do not feed the retry policy"
    );
    assert_eq!(service.status(), ServiceStatus::Running);
    assert_eq!(service.service_data().next_update_in, "7 min");
}

#[tokio::test(start_paused = true)]
async fn update_async_runs_without_start() {
    let resolver = ScriptedResolver::always(Lookup::Ip(HOME_IP));
    let client = ScriptedClient::always(Reply::Accept);
    let service = service_with(&resolver, &client);

    let result = service.update_async(false).await;
    assert_eq!(result.ip(), Some(HOME_IP));

    let snapshot = service.service_data();
    assert_eq!(snapshot.status, ServiceStatus::Ready);
    assert!(snapshot.last_successful_update_date.is_some());
    assert_eq!(snapshot.next_update_in, "-");

    // A second unforced call sees the committed result and skips
    assert_eq!(
        service.update_async(false).await,
        UpdateResult::Skipped { ip: HOME_IP }
    );
    assert_eq!(client.call_count(), 1);
}
