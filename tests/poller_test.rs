use std::sync::Arc;
use std::time::Duration;

use listing_watch::notifier::Notifier;
use listing_watch::task::listing_poller::ListingPoller;
use listing_watch::task::listing_poller::SubscriptionOutcome;

mod common;

use common::SEARCH_URL;
use common::ad;

const OTHER_URL: &str = "https://www.example.com/furniture/";

fn setup_poller(
    services: &listing_watch::service::Services,
    notifier: Arc<common::RecordingNotifier>,
) -> Arc<ListingPoller> {
    let notifier: Arc<dyn Notifier> = notifier;
    ListingPoller::new(
        services.listing_watch.clone(),
        notifier,
        Duration::from_secs(3600),
        4,
    )
}

#[tokio::test]
async fn test_cycle_notifies_fresh_unseen_ads_once() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    source.set_pages(vec![vec![ad("/adv/x1/", "Today 09:00"), ad("/adv/x2/", "5 Mar")]]);
    let services = common::setup_services(db, &source);
    let notifier = common::RecordingNotifier::new();
    let poller = setup_poller(&services, notifier.clone());

    services
        .listing_watch
        .subscribe("100", SEARCH_URL)
        .await
        .unwrap();

    // Nothing changed since the baseline.
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.notified_total(), 0);
    assert!(notifier.notifications().is_empty());

    source.set_pages(vec![
        vec![ad("/adv/x3/", "Today 12:00"), ad("/adv/x1/", "Today 09:00")],
        vec![ad("/adv/x2/", "5 Mar")],
    ]);
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.notified_total(), 1);

    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, "100");
    assert_eq!(notifications[0].1.title, "Ad /adv/x3/");
    assert_eq!(notifications[0].1.link_url, "https://www.example.com/adv/x3/");
    assert_eq!(
        notifications[0].1.image_url,
        "https://cdn.example.com/adv/x3/.jpg"
    );

    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.notified_total(), 0);
    assert_eq!(notifier.notifications().len(), 1);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_failing_subscription_does_not_abort_cycle() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);
    let notifier = common::RecordingNotifier::new();
    let poller = setup_poller(&services, notifier.clone());

    let registry = &services.subscription_registry;
    let (broken, _) = registry.add("100", OTHER_URL).await.unwrap();
    let (healthy, _) = registry.add("200", SEARCH_URL).await.unwrap();

    source.set_failing_url(OTHER_URL);
    source.set_pages(vec![vec![ad("/adv/new/", "Today 10:00")]]);

    let report = poller.run_cycle().await.unwrap();
    assert!(matches!(
        report.outcome_of(broken.id),
        Some(SubscriptionOutcome::Failed { .. })
    ));
    assert_eq!(
        report.outcome_of(healthy.id),
        Some(&SubscriptionOutcome::Notified { count: 1 })
    );
    assert_eq!(report.failed_count(), 1);

    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, "200");

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_delivery_failure_still_marks_shown() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db.clone(), &source);
    let notifier = common::RecordingNotifier::new();
    *notifier.fail.write().unwrap() = true;
    let poller = setup_poller(&services, notifier.clone());

    let (subscription, _) = services
        .subscription_registry
        .add("100", SEARCH_URL)
        .await
        .unwrap();
    source.set_pages(vec![vec![ad("/adv/1/", "Today 10:00")]]);

    let report = poller.run_cycle().await.unwrap();
    assert_eq!(
        report.outcome_of(subscription.id),
        Some(&SubscriptionOutcome::Notified { count: 1 })
    );
    assert!(db.shown.exists("100", "/adv/1/").await.unwrap());

    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.notified_total(), 0);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_overlapping_cycles_skip_in_flight_subscription() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);
    let notifier = common::RecordingNotifier::new();
    let poller = setup_poller(&services, notifier.clone());

    let (subscription, _) = services
        .subscription_registry
        .add("100", SEARCH_URL)
        .await
        .unwrap();
    source.set_pages(vec![vec![ad("/adv/1/", "Today 10:00")]]);
    source.set_delay(Duration::from_millis(200));

    let (first, second) = tokio::join!(poller.run_cycle(), poller.run_cycle());
    let mut outcomes = vec![
        first.unwrap().outcome_of(subscription.id).cloned(),
        second.unwrap().outcome_of(subscription.id).cloned(),
    ];
    outcomes.sort_by_key(|o| matches!(o, Some(SubscriptionOutcome::InFlight)));

    assert_eq!(
        outcomes,
        vec![
            Some(SubscriptionOutcome::Notified { count: 1 }),
            Some(SubscriptionOutcome::InFlight),
        ]
    );
    assert_eq!(source.query_count(), 1);
    assert_eq!(notifier.notifications().len(), 1);

    // The slot is released once the check finishes.
    source.set_delay(Duration::ZERO);
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(
        report.outcome_of(subscription.id),
        Some(&SubscriptionOutcome::Notified { count: 0 })
    );

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_start_runs_first_cycle_immediately() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);
    let notifier = common::RecordingNotifier::new();
    let poller = setup_poller(&services, notifier.clone());

    services
        .subscription_registry
        .add("100", SEARCH_URL)
        .await
        .unwrap();
    source.set_pages(vec![vec![ad("/adv/1/", "")]]);

    poller.clone().start().unwrap();
    assert!(poller.is_running());

    let mut delivered = false;
    for _ in 0..50 {
        if !notifier.notifications().is_empty() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered);

    poller.clone().stop().unwrap();
    assert!(!poller.is_running());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_repeated_start_spawns_one_loop() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);
    let notifier = common::RecordingNotifier::new();
    let poller = setup_poller(&services, notifier.clone());

    services
        .subscription_registry
        .add("100", SEARCH_URL)
        .await
        .unwrap();
    source.set_pages(vec![vec![ad("/adv/1/", "")]]);

    let runtime = tokio::runtime::Handle::current();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let poller = poller.clone();
            let runtime = runtime.clone();
            std::thread::spawn(move || {
                let _guard = runtime.enter();
                poller.start()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert!(poller.is_running());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(source.query_count(), 1);
    assert_eq!(notifier.notifications().len(), 1);

    poller.clone().stop().unwrap();
    common::teardown_db(db_path).await;
}
