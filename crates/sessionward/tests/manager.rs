//! Integration tests for the session manager: CRUD contract, expiry and
//! concurrent access.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;
use sessionward::prelude::*;
use tokio::time::{Instant, sleep};

// =========================================================================
// Helpers
// =========================================================================

fn website(value: &str) -> SessionData {
    let mut data = SessionData::new();
    data.insert("website".into(), json!(value));
    data
}

fn bogus() -> SessionId {
    SessionId::from("bogus")
}

/// Sequential, predictable IDs.
struct SequentialIds(AtomicU64);

impl IdGenerator for SequentialIds {
    fn generate_id(&self) -> Result<SessionId, SessionError> {
        let n = self.0.fetch_add(1, Ordering::Relaxed);
        Ok(SessionId::new(format!("s-{n}")))
    }
}

/// Fails every time, like an exhausted entropy source.
struct FailingIds;

impl IdGenerator for FailingIds {
    fn generate_id(&self) -> Result<SessionId, SessionError> {
        Err(SessionError::IdGeneration("no entropy".into()))
    }
}

// =========================================================================
// CRUD contract
// =========================================================================

#[tokio::test]
async fn test_get_after_create_returns_empty_map() {
    let manager = SessionManager::new();

    let id = manager.create_session().await.unwrap();

    assert!(manager.get_session_data(&id).await.unwrap().is_empty());
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_then_get_returns_last_written_data() {
    let manager = SessionManager::new();
    let id = manager.create_session().await.unwrap();

    manager.update_session_data(&id, website("example.org")).await.unwrap();
    manager.update_session_data(&id, website("longhoang.de")).await.unwrap();

    assert_eq!(
        manager.get_session_data(&id).await.unwrap(),
        website("longhoang.de")
    );
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_id_get_and_update_fail_delete_succeeds() {
    let manager = SessionManager::new();

    assert!(matches!(
        manager.get_session_data(&bogus()).await,
        Err(SessionError::NotFound(id)) if id == bogus()
    ));
    assert!(matches!(
        manager.update_session_data(&bogus(), website("x")).await,
        Err(SessionError::NotFound(id)) if id == bogus()
    ));
    assert!(manager.delete_session(&bogus()).await.is_ok());
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_delete_twice_then_get_returns_not_found() {
    let manager = SessionManager::new();
    let id = manager.create_session().await.unwrap();

    manager.delete_session(&id).await.unwrap();
    manager.delete_session(&id).await.unwrap();

    assert!(matches!(
        manager.get_session_data(&id).await,
        Err(SessionError::NotFound(_))
    ));
    assert!(manager.is_empty().await);
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_custom_id_generator_is_used() {
    let manager = SessionManager::builder()
        .id_generator(SequentialIds(AtomicU64::new(7)))
        .build();

    assert_eq!(manager.create_session().await.unwrap(), SessionId::from("s-7"));
    assert_eq!(manager.create_session().await.unwrap(), SessionId::from("s-8"));
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_id_generation_failure_propagates() {
    let manager = SessionManager::builder().id_generator(FailingIds).build();

    let result = manager.create_session().await;

    assert!(matches!(result, Err(SessionError::IdGeneration(_))));
    assert!(manager.is_empty().await);
    manager.shutdown().await.unwrap();
}

// =========================================================================
// Expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_website_scenario_expires_after_six_seconds() {
    let manager = SessionManager::new();
    let id = manager.create_session().await.unwrap();
    manager
        .update_session_data(&id, website("longhoang.de"))
        .await
        .unwrap();
    assert_eq!(
        manager.get_session_data(&id).await.unwrap(),
        website("longhoang.de")
    );

    sleep(Duration::from_secs(6)).await;

    assert!(matches!(
        manager.get_session_data(&id).await,
        Err(SessionError::NotFound(_))
    ));
    let metrics = manager.shutdown().await.unwrap();
    assert_eq!(metrics.total_evicted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_lands_in_five_to_seven_second_window() {
    let manager = SessionManager::builder()
        .timeout(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(100))
        .build();
    let id = manager.create_session().await.unwrap();
    manager.update_session_data(&id, website("x")).await.unwrap();
    let t0 = Instant::now();

    let mut still_there_at = Duration::ZERO;
    while manager.get_session_data(&id).await.is_ok() {
        still_there_at = t0.elapsed();
        assert!(still_there_at < Duration::from_secs(7), "session outlived 7s");
        sleep(Duration::from_millis(20)).await;
    }

    let gone_at = t0.elapsed();

    assert!(still_there_at >= Duration::from_millis(4_980));
    assert!(gone_at >= Duration::from_secs(5), "evicted early at {gone_at:?}");
    assert!(gone_at < Duration::from_secs(7), "evicted late at {gone_at:?}");
    manager.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_update_renews_expiry() {
    let manager = SessionManager::new();
    let id = manager.create_session().await.unwrap();

    sleep(Duration::from_secs(4)).await;
    manager.update_session_data(&id, website("renewed")).await.unwrap();
    sleep(Duration::from_secs(4)).await;

    assert_eq!(
        manager.get_session_data(&id).await.unwrap(),
        website("renewed")
    );
    manager.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reaper_metrics_visible_before_shutdown() {
    let manager = SessionManager::new();
    manager.create_session().await.unwrap();
    manager.create_session().await.unwrap();

    sleep(Duration::from_secs(6)).await;

    let metrics = manager.reaper_metrics();
    assert_eq!(metrics.total_evicted, 2);
    assert!(metrics.total_scans > 0);
    manager.shutdown().await.unwrap();
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_have_unique_ids_and_no_lost_updates() {
    const TASKS: usize = 64;
    const ROUNDS: usize = 20;

    let manager = Arc::new(
        SessionManager::builder()
            .poll_interval(Duration::from_millis(1))
            .timeout(Duration::from_secs(60))
            .build(),
    );

    let mut handles = Vec::with_capacity(TASKS);
    for task in 0..TASKS {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            let id = manager.create_session().await.unwrap();
            for round in 0..ROUNDS {
                let mut data = SessionData::new();
                data.insert("task".into(), json!(task));
                data.insert("round".into(), json!(round));
                manager.update_session_data(&id, data.clone()).await.unwrap();
                assert_eq!(manager.get_session_data(&id).await.unwrap(), data);
            }
            id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }

    assert_eq!(ids.len(), TASKS, "every task must get a distinct id");
    assert_eq!(manager.len().await, TASKS);
    for id in &ids {
        let data = manager.get_session_data(id).await.unwrap();
        assert_eq!(data["round"], json!(ROUNDS - 1));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_one_session_leave_a_whole_record() {
    let manager = Arc::new(SessionManager::new());
    let id = manager.create_session().await.unwrap();

    let mut handles = Vec::new();
    for writer in 0..16u64 {
        let manager = Arc::clone(&manager);
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            let mut data = SessionData::new();
            data.insert("writer".into(), json!(writer));
            data.insert("check".into(), json!(writer * 2));
            manager.update_session_data(&id, data).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let data = manager.get_session_data(&id).await.unwrap();
    let writer = data["writer"].as_u64().unwrap();
    assert_eq!(data["check"], json!(writer * 2), "fields from different writes mixed");
}
