use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use listing_watch::listing::Ad;
use listing_watch::listing::ListingSource;
use listing_watch::listing::SearchQuery;
use listing_watch::listing::SiteInfo;
use listing_watch::listing::aggregator::ListingAggregator;
use listing_watch::listing::error::ListingError;
use listing_watch::model::SubscriptionModel;
use listing_watch::notifier::Notification;
use listing_watch::notifier::Notifier;
use listing_watch::notifier::NotifierError;
use listing_watch::repository::Repository;
use listing_watch::service::Services;
use uuid::Uuid;

#[allow(dead_code)]
pub const SEARCH_URL: &str = "https://www.example.com/electronics/brand---apple/";

pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("listing-watch-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

pub async fn teardown_db(db_path: PathBuf) {
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}

#[allow(dead_code)]
pub fn ad(identity: &str, posted_label: &str) -> Ad {
    Ad {
        identity: identity.to_string(),
        name: format!("Ad {identity}"),
        price: "100".to_string(),
        image: format!("https://cdn.example.com{identity}.jpg"),
        posted_label: posted_label.to_string(),
    }
}

// MOCK LISTING SOURCE

#[derive(Default, Clone)]
#[allow(dead_code)]
pub struct MockListingState {
    pub pages: Vec<Vec<Ad>>,
    pub fail: bool,
    pub failing_urls: Vec<String>,
    pub delay: Duration,
    pub query_count: usize,
}

#[derive(Clone)]
#[allow(dead_code)]
pub struct MockListingSource {
    pub info: SiteInfo,
    pub state: Arc<RwLock<MockListingState>>,
}

#[allow(dead_code)]
impl MockListingSource {
    pub fn new() -> Self {
        Self {
            info: SiteInfo {
                name: "MockListing".to_string(),
                domain: "example.com".to_string(),
                base_url: "https://www.example.com".to_string(),
            },
            state: Arc::new(RwLock::new(MockListingState::default())),
        }
    }

    pub fn set_pages(&self, pages: Vec<Vec<Ad>>) {
        self.state.write().unwrap().pages = pages;
    }

    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    pub fn set_failing_url(&self, url: &str) {
        self.state.write().unwrap().failing_urls.push(url.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.write().unwrap().delay = delay;
    }

    pub fn query_count(&self) -> usize {
        self.state.read().unwrap().query_count
    }
}

#[async_trait]
impl ListingSource for MockListingSource {
    async fn fetch_query(&self, url: &str) -> Result<SearchQuery, ListingError> {
        let (fail, delay, page_count) = {
            let mut state = self.state.write().unwrap();
            state.query_count += 1;
            let fail = state.fail || state.failing_urls.iter().any(|u| u == url);
            (fail, state.delay, state.pages.len().max(1) as u32)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ListingError::UnexpectedStatus {
                status: 503,
                url: url.to_string(),
            });
        }
        Ok(SearchQuery {
            page_count,
            ..Default::default()
        })
    }

    async fn fetch_page(&self, _query: &SearchQuery, page: u32) -> Result<Vec<Ad>, ListingError> {
        let state = self.state.read().unwrap();
        Ok(state
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    fn get_info(&self) -> &SiteInfo {
        &self.info
    }
}

// RECORDING NOTIFIER

#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingNotifier {
    pub notifications: RwLock<Vec<(String, Notification)>>,
    pub replies: RwLock<Vec<(String, String)>>,
    pub lists: RwLock<Vec<(String, Vec<SubscriptionModel>)>>,
    pub fail: RwLock<bool>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<(String, Notification)> {
        self.notifications.read().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies
            .read()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.notifications.write().unwrap().clear();
        self.replies.write().unwrap().clear();
        self.lists.write().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        subscriber_id: &str,
        notification: &Notification,
    ) -> Result<(), NotifierError> {
        self.notifications
            .write()
            .unwrap()
            .push((subscriber_id.to_string(), notification.clone()));
        if *self.fail.read().unwrap() {
            return Err(NotifierError::DeliveryFailed {
                message: "chat blocked the bot".to_string(),
            });
        }
        Ok(())
    }

    async fn deliver_subscription_list(
        &self,
        subscriber_id: &str,
        subscriptions: &[SubscriptionModel],
    ) -> Result<(), NotifierError> {
        self.lists
            .write()
            .unwrap()
            .push((subscriber_id.to_string(), subscriptions.to_vec()));
        Ok(())
    }

    async fn send_reply(&self, subscriber_id: &str, text: &str) -> Result<(), NotifierError> {
        self.replies
            .write()
            .unwrap()
            .push((subscriber_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[allow(dead_code)]
pub fn setup_services(db: Arc<Repository>, source: &MockListingSource) -> Arc<Services> {
    let aggregator = Arc::new(ListingAggregator::new(Arc::new(source.clone()), 2));
    Arc::new(Services::new(db, aggregator))
}
