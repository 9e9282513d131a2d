//! Team session lifecycle across several devices sharing one backend.

mod common;

use common::{backend, device, profile};
use focus_crew::{
    error::ServiceError,
    services::{coordinator, sync_agent, timer_service},
    state::timer::TimerMode,
};

#[tokio::test(start_paused = true)]
async fn morning_focus_cycles_into_a_long_break() {
    let backend = backend();
    let host = device(&backend);
    let session = coordinator::create_session(&host, "Morning Focus", profile("host", "Hana"), false)
        .await
        .unwrap();
    let id = session.id.clone();

    let mut observed = vec![session.current_mode];
    for _ in 0..4 {
        assert!(coordinator::start(&host, &id, "host").await.unwrap());
        backend.advance(common::DURATIONS.focus);
        sync_agent::poll_once(&host).await.unwrap();
        let current = coordinator::get_session(&host, &id).await.unwrap();
        observed.push(current.current_mode);

        if current.current_mode == TimerMode::ShortBreak {
            assert!(coordinator::start(&host, &id, "host").await.unwrap());
            backend.advance(common::DURATIONS.short_break);
            sync_agent::poll_once(&host).await.unwrap();
            observed.push(coordinator::get_session(&host, &id).await.unwrap().current_mode);
        }
    }

    assert_eq!(
        observed,
        vec![
            TimerMode::Focus,
            TimerMode::ShortBreak,
            TimerMode::Focus,
            TimerMode::ShortBreak,
            TimerMode::Focus,
            TimerMode::ShortBreak,
            TimerMode::Focus,
            TimerMode::LongBreak,
        ]
    );

    let local = coordinator::get_session(&host, &id).await.unwrap();
    assert_eq!(local.consecutive_sessions_count, 0);
    assert_eq!(local.time_remaining, common::DURATIONS.long_break);
    assert!(!local.is_running);

    let timer = timer_service::snapshot(&host).await;
    assert_eq!(timer.mode, TimerMode::LongBreak);
    assert_eq!(timer.time_remaining, common::DURATIONS.long_break);
}

#[tokio::test(start_paused = true)]
async fn joining_twice_keeps_one_participant_entry() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);

    let session = coordinator::create_session(&host, "Study Hall", profile("host", "Hana"), false)
        .await
        .unwrap();

    // the guest has never polled; the code alone is enough, typed loosely
    let typed = focus_crew::state::session::SessionId::from_code(&format!(
        "  {} ",
        session.id.as_str().to_lowercase()
    ));
    coordinator::join_session(&guest, &typed, profile("a", "Ari"))
        .await
        .unwrap();
    let joined = coordinator::join_session(&guest, &typed, profile("a", "Ari"))
        .await
        .unwrap();

    let ids: Vec<&str> = joined.participants.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["host", "a"]);
    assert_eq!(backend.session(&session.id).unwrap().participants.len(), 2);
    assert_eq!(
        sync_agent::tracked_session(&guest).await,
        Some(session.id.clone())
    );
}

#[tokio::test(start_paused = true)]
async fn readiness_gate_holds_back_non_host_start() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);
    let bystander = device(&backend);

    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    let id = session.id.clone();
    coordinator::join_session(&guest, &id, profile("a", "Ari"))
        .await
        .unwrap();
    coordinator::set_ready(&guest, &id, "a", true).await.unwrap();

    coordinator::refresh(&bystander).await.unwrap();
    let started = coordinator::start(&bystander, &id, "b").await.unwrap();
    assert!(!started, "host is not ready yet");
    assert!(!backend.session(&id).unwrap().is_running);
    assert!(!coordinator::get_session(&bystander, &id).await.unwrap().is_running);

    sync_agent::poll_once(&host).await.unwrap();
    coordinator::set_ready(&host, &id, "host", true).await.unwrap();
    coordinator::refresh(&bystander).await.unwrap();

    assert!(coordinator::start(&bystander, &id, "b").await.unwrap());
    assert!(backend.session(&id).unwrap().is_running);
}

#[tokio::test(start_paused = true)]
async fn host_may_start_without_readiness() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);

    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    coordinator::join_session(&guest, &session.id, profile("a", "Ari"))
        .await
        .unwrap();
    sync_agent::poll_once(&host).await.unwrap();

    assert!(coordinator::start(&host, &session.id, "host").await.unwrap());
    assert!(timer_service::snapshot(&host).await.is_running);

    let paused = coordinator::pause(&host, &session.id, "host").await.unwrap();
    assert!(!paused.is_running);
    assert!(!timer_service::snapshot(&host).await.is_running);
}

#[tokio::test(start_paused = true)]
async fn non_host_delete_is_forbidden_and_changes_nothing() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);

    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    let before = coordinator::join_session(&guest, &session.id, profile("a", "Ari"))
        .await
        .unwrap();

    let err = coordinator::delete_session(&guest, &session.id, "a")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    assert_eq!(
        coordinator::get_session(&guest, &session.id).await.unwrap(),
        before
    );
    assert!(backend.session(&session.id).is_some());
}

#[tokio::test(start_paused = true)]
async fn departed_host_is_not_replaced() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);

    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    coordinator::join_session(&guest, &session.id, profile("a", "Ari"))
        .await
        .unwrap();
    sync_agent::poll_once(&host).await.unwrap();

    coordinator::leave_session(&host, &session.id, "host")
        .await
        .unwrap();
    assert_eq!(sync_agent::tracked_session(&host).await, None);

    sync_agent::poll_once(&guest).await.unwrap();
    let remaining = coordinator::get_session(&guest, &session.id).await.unwrap();
    assert_eq!(remaining.host_id, "host");
    assert_eq!(remaining.participants.len(), 1);

    let err = coordinator::delete_session(&guest, &session.id, "a")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    // the departed host keeps the id but none of the privileges
    let err = coordinator::delete_session(&host, &session.id, "host")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let err = coordinator::set_mode(&host, &session.id, "host", TimerMode::LongBreak)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    assert!(!coordinator::start(&host, &session.id, "host").await.unwrap());

    let server = backend.session(&session.id).unwrap();
    assert_eq!(server.current_mode, TimerMode::Focus);
    assert!(!server.is_running);

    coordinator::set_ready(&guest, &session.id, "a", true)
        .await
        .unwrap();
    coordinator::refresh(&host).await.unwrap();
    assert!(coordinator::start(&host, &session.id, "host").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn leaving_stops_the_local_clock() {
    let backend = backend();
    let host = device(&backend);
    let guest = device(&backend);

    let session = coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();
    coordinator::join_session(&guest, &session.id, profile("a", "Ari"))
        .await
        .unwrap();
    sync_agent::poll_once(&host).await.unwrap();
    coordinator::start(&host, &session.id, "host").await.unwrap();
    sync_agent::poll_once(&guest).await.unwrap();
    assert!(timer_service::snapshot(&guest).await.is_running);

    coordinator::leave_session(&guest, &session.id, "a")
        .await
        .unwrap();

    assert_eq!(sync_agent::tracked_session(&guest).await, None);
    assert!(!timer_service::snapshot(&guest).await.is_running);
    assert!(guest.ticker().lock().await.is_none());

    // a second leave finds no participant entry
    let err = coordinator::leave_session(&guest, &session.id, "a")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn solo_controls_are_refused_while_following_a_session() {
    let backend = backend();
    let host = device(&backend);
    coordinator::create_session(&host, "Sprint", profile("host", "Hana"), false)
        .await
        .unwrap();

    let err = timer_service::start(&host).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}
