use listing_watch::listing::error::ListingError;
use listing_watch::service::error::ServiceError;
use listing_watch::service::listing_watch_service::SubscribeResult;

mod common;

use common::SEARCH_URL;
use common::ad;

#[tokio::test]
async fn test_mark_shown_twice_equals_once() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db.clone(), &source);

    let identities = vec!["/adv/1/".to_string(), "/adv/2/".to_string()];
    assert_eq!(services.ad_store.mark_shown("100", &identities).await.unwrap(), 2);
    assert_eq!(services.ad_store.mark_shown("100", &identities).await.unwrap(), 0);
    assert_eq!(services.ad_store.mark_shown("100", &[]).await.unwrap(), 0);

    assert_eq!(db.shown.count_by_subscriber_id("100").await.unwrap(), 2);
    assert!(services.ad_store.has_been_shown("100", "/adv/1/").await.unwrap());
    assert!(!services.ad_store.has_been_shown("100", "/adv/3/").await.unwrap());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_filter_unseen_preserves_order() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);

    services
        .ad_store
        .mark_shown("100", &["/adv/2/".to_string()])
        .await
        .unwrap();

    let unseen = services
        .ad_store
        .filter_unseen(
            "100",
            vec![ad("/adv/3/", ""), ad("/adv/2/", ""), ad("/adv/1/", "")],
        )
        .await
        .unwrap();
    let identities: Vec<&str> = unseen.iter().map(|a| a.identity.as_str()).collect();
    assert_eq!(identities, vec!["/adv/3/", "/adv/1/"]);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_registry_add_is_idempotent() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);
    let registry = &services.subscription_registry;

    let (first, created) = registry.add("100", SEARCH_URL).await.unwrap();
    assert!(created);
    let (second, created) = registry.add("100", SEARCH_URL).await.unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);

    assert_eq!(registry.list_for("100").await.unwrap().len(), 1);
    assert_eq!(registry.list_all().await.unwrap().len(), 1);
    assert_eq!(registry.get(first.id).await.unwrap(), Some(first.clone()));

    assert!(registry.remove(first.id).await.unwrap());
    assert!(!registry.remove(first.id).await.unwrap());
    assert!(registry.list_for("100").await.unwrap().is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_subscribe_records_baseline() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    source.set_pages(vec![
        vec![ad("/adv/1/", "Today 10:00"), ad("/adv/2/", "5 Mar")],
        vec![ad("/adv/2/", "5 Mar"), ad("/adv/3/", "")],
    ]);
    let services = common::setup_services(db.clone(), &source);

    let result = services
        .listing_watch
        .subscribe("100", SEARCH_URL)
        .await
        .unwrap();
    let SubscribeResult::Success {
        subscription,
        baseline,
    } = result
    else {
        panic!("Expected a new subscription");
    };
    assert_eq!(subscription.url, SEARCH_URL);
    assert_eq!(baseline, 3);
    assert_eq!(db.shown.count_by_subscriber_id("100").await.unwrap(), 3);

    let again = services
        .listing_watch
        .subscribe("100", SEARCH_URL)
        .await
        .unwrap();
    assert!(matches!(again, SubscribeResult::AlreadySubscribed { .. }));

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_subscribe_fetch_failure_creates_nothing() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    source.set_pages(vec![vec![ad("/adv/1/", "Today")]]);
    source.set_fail(true);
    let services = common::setup_services(db.clone(), &source);

    let result = services.listing_watch.subscribe("100", SEARCH_URL).await;
    assert!(matches!(
        result,
        Err(ServiceError::ListingError(ListingError::UnexpectedStatus { .. }))
    ));

    assert!(db.subscription.select_all_by_subscriber_id("100").await.unwrap().is_empty());
    assert_eq!(db.shown.count_by_subscriber_id("100").await.unwrap(), 0);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_subscribe_rejects_foreign_url() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);

    let result = services
        .listing_watch
        .subscribe("100", "https://other-site.org/search/")
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::ListingError(ListingError::UnsupportedUrl { .. }))
    ));
    assert_eq!(source.query_count(), 0);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_baseline_suppresses_next_check() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    source.set_pages(vec![vec![ad("/adv/1/", "Today 10:00"), ad("/adv/2/", "")]]);
    let services = common::setup_services(db, &source);

    let SubscribeResult::Success { subscription, .. } = services
        .listing_watch
        .subscribe("100", SEARCH_URL)
        .await
        .unwrap()
    else {
        panic!("Expected a new subscription");
    };

    let fresh = services
        .listing_watch
        .check_subscription(&subscription)
        .await
        .unwrap();
    assert!(fresh.is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_check_subscription_end_to_end() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    source.set_pages(vec![vec![ad("/adv/x1/", "Today 09:00"), ad("/adv/x2/", "5 Mar")]]);
    let services = common::setup_services(db.clone(), &source);

    let SubscribeResult::Success { subscription, .. } = services
        .listing_watch
        .subscribe("100", SEARCH_URL)
        .await
        .unwrap()
    else {
        panic!("Expected a new subscription");
    };

    source.set_pages(vec![vec![
        ad("/adv/x3/", "Today 11:30"),
        ad("/adv/x1/", "Today 09:00"),
        ad("/adv/x2/", "5 Mar"),
    ]]);

    let fresh = services
        .listing_watch
        .check_subscription(&subscription)
        .await
        .unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].identity, "/adv/x3/");
    assert!(db.shown.exists("100", "/adv/x3/").await.unwrap());

    let notification = services.listing_watch.notification_for(&fresh[0]);
    assert_eq!(notification.link_url, "https://www.example.com/adv/x3/");
    assert_eq!(notification.price_text, "100€");

    let fresh = services
        .listing_watch
        .check_subscription(&subscription)
        .await
        .unwrap();
    assert!(fresh.is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_stale_unseen_ads_are_never_notified() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db.clone(), &source);

    let (subscription, _) = services
        .subscription_registry
        .add("100", SEARCH_URL)
        .await
        .unwrap();
    source.set_pages(vec![vec![
        ad("/adv/today/", "Today 08:15"),
        ad("/adv/old/", "12 Mar"),
        ad("/adv/unlabelled/", ""),
    ]]);

    let fresh = services
        .listing_watch
        .check_subscription(&subscription)
        .await
        .unwrap();
    let identities: Vec<&str> = fresh.iter().map(|a| a.identity.as_str()).collect();
    assert_eq!(identities, vec!["/adv/today/", "/adv/unlabelled/"]);
    assert!(!db.shown.exists("100", "/adv/old/").await.unwrap());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_notification_resolves_relative_image() {
    let (db, db_path) = common::setup_db().await;
    let source = common::MockListingSource::new();
    let services = common::setup_services(db, &source);

    let mut relative = ad("/adv/1/", "Today");
    relative.image = "/media/x.jpg".to_string();
    let notification = services.listing_watch.notification_for(&relative);
    assert_eq!(notification.image_url, "https://www.example.com/media/x.jpg");

    let absolute = ad("/adv/2/", "Today");
    let notification = services.listing_watch.notification_for(&absolute);
    assert_eq!(notification.image_url, "https://cdn.example.com/adv/2/.jpg");

    let mut missing = ad("/adv/3/", "Today");
    missing.image = String::new();
    let notification = services.listing_watch.notification_for(&missing);
    assert!(notification.image_url.is_empty());

    common::teardown_db(db_path).await;
}
