use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;

/// A saved search of one subscriber.
///
/// `(subscriber_id, url)` is unique: adding the same search twice keeps a single row.
/// Rows are created when a subscriber submits a search URL and deleted on unsubscribe,
/// never updated in between.
#[derive(FromRow, Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionModel {
    #[serde(default)]
    pub id: i32,
    /// Chat identifier of the subscriber.
    #[serde(default)]
    pub subscriber_id: String,
    /// Search-result URL exactly as the subscriber sent it.
    #[serde(default)]
    pub url: String,
}

/// Evidence that an ad has already been surfaced to a subscriber.
#[derive(FromRow, Serialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct ShownModel {
    pub subscriber_id: String,
    /// Ad identity, see [`crate::listing::Ad::identity`].
    pub ad: String,
}

/// Free-form per-subscriber conversational state.
#[derive(FromRow, Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct StateModel {
    #[serde(default)]
    pub subscriber_id: String,
    #[serde(default)]
    pub state: String,
}
