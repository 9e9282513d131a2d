//! Reconciliation between device caches and the session backend.

mod common;

use std::time::Duration;

use common::{backend, device, drain_event_names, profile};
use focus_crew::{
    error::ServiceError,
    services::{
        coordinator,
        events::{EVENT_SESSION_CLOSED, EVENT_TIMER_CHANGED},
        sync_agent::{self, Reconciliation},
        timer_service,
    },
    state::{SharedState, timer::TimerMode},
};
use tokio::task;

#[tokio::test(start_paused = true)]
async fn reconciliation_overwrites_optimistic_changes() {
    let backend = backend();
    let host = device(&backend);
    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    let id = session.id.clone();
    coordinator::start(&host, &id, "host").await.unwrap();

    // the pause never reaches the backend
    backend.set_online(false);
    let paused = coordinator::pause(&host, &id, "host").await.unwrap();
    assert!(!paused.is_running);
    assert!(!timer_service::snapshot(&host).await.is_running);

    backend.set_online(true);
    backend.advance(1);
    sync_agent::poll_once(&host).await.unwrap();

    let local = coordinator::get_session(&host, &id).await.unwrap();
    assert!(local.is_running);
    assert_eq!(local.time_remaining, common::DURATIONS.focus - 1);

    let timer = timer_service::snapshot(&host).await;
    assert_eq!(timer.mode, TimerMode::Focus);
    assert!(timer.is_running);
    assert_eq!(timer.time_remaining, common::DURATIONS.focus - 1);
}

#[tokio::test(start_paused = true)]
async fn stale_poll_results_are_discarded() {
    let backend = backend();
    let host = device(&backend);
    let viewer = device(&backend);
    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    let id = session.id.clone();

    let older = viewer.next_poll_sequence();
    let old_list = vec![backend.session(&id).unwrap()];

    coordinator::start(&host, &id, "host").await.unwrap();
    let newer = viewer.next_poll_sequence();
    let new_list = vec![backend.session(&id).unwrap()];
    assert!(new_list[0].is_running);

    // the newer request returns first
    assert_eq!(
        sync_agent::reconcile(&viewer, newer, new_list).await,
        Reconciliation::Applied
    );
    assert_eq!(
        sync_agent::reconcile(&viewer, older, old_list).await,
        Reconciliation::Stale
    );

    assert!(coordinator::get_session(&viewer, &id).await.unwrap().is_running);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_absorbed_and_healed() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);
    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    let id = session.id.clone();
    coordinator::join_session(&guest, &id, profile("a", "Ari"))
        .await
        .unwrap();

    backend.set_online(false);
    let err = sync_agent::poll_once(&host).await.unwrap_err();
    assert!(matches!(err, ServiceError::TransientSyncFailure(_)));

    // local mutation still succeeds; the push failure is only logged
    let updated = coordinator::set_ready(&guest, &id, "a", true).await.unwrap();
    assert!(updated.participant("a").unwrap().is_ready);
    assert!(!backend.session(&id).unwrap().participant("a").unwrap().is_ready);

    // a failed cycle keeps the loop alive; the next one applies the server copy
    tokio::time::sleep(Duration::from_secs(4)).await;
    backend.set_online(true);
    tokio::time::sleep(Duration::from_secs(4)).await;

    let healed = coordinator::get_session(&guest, &id).await.unwrap();
    assert!(!healed.participant("a").unwrap().is_ready);
    assert_eq!(sync_agent::tracked_session(&guest).await, Some(id.clone()));

    let host_view = coordinator::get_session(&host, &id).await.unwrap();
    assert_eq!(host_view.participants.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_deletion_closes_the_tracked_session() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);
    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    let id = session.id.clone();
    coordinator::join_session(&guest, &id, profile("a", "Ari"))
        .await
        .unwrap();
    sync_agent::poll_once(&host).await.unwrap();
    coordinator::start(&host, &id, "host").await.unwrap();
    sync_agent::poll_once(&guest).await.unwrap();
    assert!(timer_service::snapshot(&guest).await.is_running);

    let mut events = guest.events().subscribe();
    coordinator::delete_session(&host, &id, "host").await.unwrap();
    assert_eq!(sync_agent::tracked_session(&host).await, None);

    // the guest's loop notices on its next cycle
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(sync_agent::tracked_session(&guest).await, None);
    assert!(coordinator::list_sessions(&guest).await.is_empty());
    assert!(!timer_service::snapshot(&guest).await.is_running);
    assert!(guest.ticker().lock().await.is_none());

    let names = drain_event_names(&mut events);
    assert!(names.iter().any(|name| name == EVENT_SESSION_CLOSED));
    assert!(names.iter().any(|name| name == EVENT_TIMER_CHANGED));
}

#[tokio::test(start_paused = true)]
async fn poll_issued_before_registration_keeps_the_tracked_copy() {
    let backend = backend();
    let host = device(&backend);

    let early = host.next_poll_sequence();
    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();

    // a concurrent loop cycle may have applied a newer poll already; either
    // way the freshly created session must survive
    assert_ne!(
        sync_agent::reconcile(&host, early, Vec::new()).await,
        Reconciliation::Closed
    );
    assert_eq!(
        coordinator::get_session(&host, &session.id).await.unwrap().id,
        session.id
    );
    assert_eq!(
        sync_agent::tracked_session(&host).await,
        Some(session.id.clone())
    );
}

#[tokio::test(start_paused = true)]
async fn untracked_devices_mirror_the_full_list() {
    let backend = backend();
    let host = device(&backend);
    let observer = device(&backend);

    let first = coordinator::create_session(&host, "One", profile("h1", "Hana"), false)
        .await
        .unwrap();
    let second = coordinator::create_session(&host, "Two", profile("h2", "Hugo"), true)
        .await
        .unwrap();

    coordinator::refresh(&observer).await.unwrap();
    let ids: Vec<_> = coordinator::list_sessions(&observer)
        .await
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.id));
    assert!(ids.contains(&second.id));
    assert_eq!(sync_agent::tracked_session(&observer).await, None);
}

#[tokio::test(start_paused = true)]
async fn tracking_twice_keeps_a_single_poll_loop() {
    let backend = backend();
    let host = device(&backend);
    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    let id = session.id.clone();

    let first = poll_loop_id(&host).await.unwrap();
    sync_agent::track(&host, &id, "host").await;
    assert_eq!(poll_loop_id(&host).await, Some(first));

    // one loop polls once per 3 s interval: t = 3 and t = 6
    tokio::time::sleep(Duration::from_secs(1)).await;
    let before = host.last_poll_sequence();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(host.last_poll_sequence() - before, 2);
}

#[tokio::test(start_paused = true)]
async fn untracking_twice_leaves_nothing_running() {
    let backend = backend();
    let host = device(&backend);
    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    coordinator::start(&host, &session.id, "host").await.unwrap();

    let poll_loop = host
        .tracking()
        .lock()
        .await
        .as_ref()
        .and_then(|tracking| tracking.task.as_ref())
        .map(|handle| handle.abort_handle())
        .unwrap();

    assert_eq!(sync_agent::untrack(&host).await, Some(session.id.clone()));
    assert_eq!(sync_agent::untrack(&host).await, None);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(poll_loop.is_finished());
    assert!(host.tracking().lock().await.is_none());
    assert!(host.ticker().lock().await.is_none());
    assert!(!timer_service::snapshot(&host).await.is_running);

    let polled = host.last_poll_sequence();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(host.last_poll_sequence(), polled);
}

async fn poll_loop_id(state: &SharedState) -> Option<task::Id> {
    state
        .tracking()
        .lock()
        .await
        .as_ref()
        .and_then(|tracking| tracking.task.as_ref())
        .map(|handle| handle.id())
}
