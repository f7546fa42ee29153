//! Alert evaluator branch tests.
//!
//! Covers the three decision branches (no change / suppressed inside the
//! debounce window / genuine transition), restored-alert duration, mailer
//! failure tolerance, and compare-and-set race loss.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use common::{MockStatusStore, RecordingMailer};
use sb_common::WebsiteStatus;
use sb_monitor::AlertEvaluator;

const DEBOUNCE: Duration = Duration::from_secs(300);

fn evaluator(
    store: &Arc<MockStatusStore>,
    mailer: &Arc<RecordingMailer>,
) -> AlertEvaluator {
    AlertEvaluator::new(store.clone(), mailer.clone(), DEBOUNCE)
}

#[tokio::test]
async fn unchanged_status_is_a_no_op() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    store.insert("w1", "example.com", WebsiteStatus::Up, None);

    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Up)
        .await
        .unwrap();

    assert_eq!(mailer.total_sent(), 0);
    let site = store.site("w1").unwrap();
    assert_eq!(site.last_status, WebsiteStatus::Up);
    assert!(site.last_notification_sent.is_none());
}

#[tokio::test]
async fn down_transition_outside_window_sends_one_email_and_commits() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    store.insert(
        "w1",
        "example.com",
        WebsiteStatus::Up,
        Some(Utc::now() - ChronoDuration::minutes(10)),
    );

    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Down)
        .await
        .unwrap();

    assert_eq!(mailer.down_alerts.lock().len(), 1);
    assert_eq!(mailer.restored_alerts.lock().len(), 0);
    let (to, url) = mailer.down_alerts.lock()[0].clone();
    assert_eq!(to, "owner-of-w1@example.com");
    assert_eq!(url, "example.com");

    let site = store.site("w1").unwrap();
    assert_eq!(site.last_status, WebsiteStatus::Down);
    assert!(site.last_notification_sent.unwrap() > Utc::now() - ChronoDuration::minutes(1));
}

#[tokio::test]
async fn first_transition_with_no_prior_notification_sends() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    store.insert("w1", "example.com", WebsiteStatus::Up, None);

    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Down)
        .await
        .unwrap();

    assert_eq!(mailer.down_alerts.lock().len(), 1);
    assert_eq!(store.site("w1").unwrap().last_status, WebsiteStatus::Down);
}

#[tokio::test]
async fn transition_inside_window_is_suppressed_without_state_update() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let sent = Utc::now() - ChronoDuration::minutes(2);
    store.insert("w1", "example.com", WebsiteStatus::Up, Some(sent));

    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Down)
        .await
        .unwrap();

    assert_eq!(mailer.total_sent(), 0);
    // Suppression leaves both fields untouched so the flap is re-evaluated
    // on every tick until the window elapses.
    let site = store.site("w1").unwrap();
    assert_eq!(site.last_status, WebsiteStatus::Up);
    assert_eq!(site.last_notification_sent, Some(sent));
}

#[tokio::test]
async fn restored_alert_carries_nonnegative_duration() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    store.insert(
        "w1",
        "example.com",
        WebsiteStatus::Down,
        Some(Utc::now() - ChronoDuration::minutes(10)),
    );

    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Up)
        .await
        .unwrap();

    let restored = mailer.restored_alerts.lock();
    assert_eq!(restored.len(), 1);
    let (_, _, downtime) = restored[0].clone();
    assert!(downtime >= ChronoDuration::zero());
    assert!(downtime >= ChronoDuration::minutes(9));
    drop(restored);

    assert_eq!(store.site("w1").unwrap().last_status, WebsiteStatus::Up);
}

#[tokio::test]
async fn up_from_unknown_commits_without_mail() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    store.insert("w1", "example.com", WebsiteStatus::Unknown, None);

    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Up)
        .await
        .unwrap();

    assert_eq!(mailer.total_sent(), 0);
    assert_eq!(store.site("w1").unwrap().last_status, WebsiteStatus::Up);
}

#[tokio::test]
async fn mailer_failure_is_swallowed_and_state_still_commits() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    store.insert("w1", "example.com", WebsiteStatus::Up, None);

    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Down)
        .await
        .unwrap();

    // No mail got out, but the transition is committed: a provider outage
    // must not retry-storm the alert on every subsequent tick.
    assert_eq!(mailer.total_sent(), 0);
    let site = store.site("w1").unwrap();
    assert_eq!(site.last_status, WebsiteStatus::Down);
    assert!(site.last_notification_sent.is_some());
}

#[tokio::test]
async fn losing_the_cas_race_drops_the_stale_update() {
    use sb_store::StatusStore;

    let store = Arc::new(MockStatusStore::new());
    store.insert("w1", "example.com", WebsiteStatus::Up, None);

    // Two workers read Up concurrently and both decide to commit Down.
    let rival_time = Utc::now();
    let first = store
        .update_website_status_if("w1", WebsiteStatus::Up, WebsiteStatus::Down, rival_time)
        .await
        .unwrap();
    let second = store
        .update_website_status_if("w1", WebsiteStatus::Up, WebsiteStatus::Down, Utc::now())
        .await
        .unwrap();

    assert!(first);
    assert!(!second, "the stale update must be dropped, not applied");
    // The first commit is intact, not clobbered by the loser.
    let site = store.site("w1").unwrap();
    assert_eq!(site.last_status, WebsiteStatus::Down);
    assert_eq!(site.last_notification_sent, Some(rival_time));
}

#[tokio::test]
async fn evaluation_against_a_concurrently_changed_row_does_not_clobber() {
    let store = Arc::new(MockStatusStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    store.insert("w1", "example.com", WebsiteStatus::Down, None);

    // A rival commits Up before this evaluator's Down tick is evaluated;
    // the evaluator then sees Up == Up and does nothing.
    store.force_status("w1", WebsiteStatus::Up);
    evaluator(&store, &mailer)
        .evaluate("w1", WebsiteStatus::Up)
        .await
        .unwrap();

    assert_eq!(mailer.total_sent(), 0);
    assert_eq!(store.site("w1").unwrap().last_status, WebsiteStatus::Up);
}
