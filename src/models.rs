use chrono::serde::{ts_seconds, ts_seconds_option};
use chrono::{DateTime, Utc};
use log::{trace, warn};
use serde::de::{DeserializeOwned, Error as _};
use serde::Deserialize;

use crate::errors::Result;
use crate::params::Paging;

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Question,
    Answer,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Anonymous,
    Unregistered,
    Registered,
    Moderator,
    #[serde(other)]
    Unknown,
}

/// The short user block embedded in posts, comments and revisions.
#[derive(Debug, Clone, Deserialize)]
pub struct ShallowUser {
    pub user_id: u64,
    pub user_type: UserType,
    pub display_name: String,
    #[serde(default)]
    pub reputation: i64,
    #[serde(default)]
    pub email_hash: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BadgeCounts {
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub silver: u32,
    #[serde(default)]
    pub bronze: u32,
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub question_id: u64,
    pub title: String,
    /// Only present when requested with `FilterOption::IncludeBody`.
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner: Option<ShallowUser>,
    #[serde(default)]
    pub answer_count: u32,
    pub accepted_answer_id: Option<u64>,
    #[serde(default)]
    pub favorite_count: u32,
    #[serde(default)]
    pub up_vote_count: u32,
    #[serde(default)]
    pub down_vote_count: u32,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub community_owned: bool,
    #[serde(with = "ts_seconds")]
    pub creation_date: DateTime<Utc>,
    #[serde(default, with = "ts_seconds_option")]
    pub last_edit_date: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_seconds_option")]
    pub last_activity_date: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_seconds_option")]
    pub closed_date: Option<DateTime<Utc>>,
    pub closed_reason: Option<String>,
    #[serde(default, with = "ts_seconds_option")]
    pub bounty_closes_date: Option<DateTime<Utc>>,
    pub bounty_amount: Option<u32>,
    pub question_timeline_url: Option<String>,
    pub question_comments_url: Option<String>,
    pub question_answers_url: Option<String>,
    /// Only present when requested with `FilterOption::IncludeComments`.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Only present when requested with `FilterOption::IncludeAnswers`.
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    pub answer_id: u64,
    pub question_id: u64,
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub accepted: bool,
    pub owner: Option<ShallowUser>,
    #[serde(default)]
    pub up_vote_count: u32,
    #[serde(default)]
    pub down_vote_count: u32,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub community_owned: bool,
    #[serde(with = "ts_seconds")]
    pub creation_date: DateTime<Utc>,
    #[serde(default, with = "ts_seconds_option")]
    pub last_edit_date: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_seconds_option")]
    pub last_activity_date: Option<DateTime<Utc>>,
    pub answer_comments_url: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub comment_id: u64,
    pub post_id: u64,
    pub post_type: PostType,
    pub body: String,
    pub owner: Option<ShallowUser>,
    pub reply_to_user: Option<ShallowUser>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub edit_count: u32,
    #[serde(with = "ts_seconds")]
    pub creation_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Users, tags, badges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub user_type: UserType,
    pub display_name: String,
    #[serde(default)]
    pub reputation: i64,
    #[serde(default)]
    pub email_hash: String,
    #[serde(with = "ts_seconds")]
    pub creation_date: DateTime<Utc>,
    #[serde(default, with = "ts_seconds_option")]
    pub last_access_date: Option<DateTime<Utc>>,
    pub age: Option<u32>,
    pub website_url: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    #[serde(default)]
    pub question_count: u32,
    #[serde(default)]
    pub answer_count: u32,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub up_vote_count: u32,
    #[serde(default)]
    pub down_vote_count: u32,
    /// Percentage of the user's questions with an accepted answer.
    pub accept_rate: Option<u32>,
    pub association_id: Option<String>,
    #[serde(default)]
    pub badge_counts: BadgeCounts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    /// Only set on per-user tag lists.
    pub user_id: Option<u64>,
    #[serde(default)]
    pub restricted_to: Option<String>,
    #[serde(default)]
    pub fulltext: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeRank {
    Gold,
    Silver,
    Bronze,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Badge {
    pub badge_id: u64,
    pub name: String,
    pub rank: BadgeRank,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub award_count: u64,
    #[serde(default)]
    pub tag_based: bool,
    pub badges_recipients_url: Option<String>,
    /// Set when listing badges earned by specific users.
    pub user: Option<ShallowUser>,
}

// ---------------------------------------------------------------------------
// Timelines and reputation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostTimelineType {
    Question,
    Answer,
    Comment,
    Revision,
    Votes,
    AcceptedAnswer,
    PostStateChanged,
    #[serde(other)]
    Unknown,
}

/// One event on a question's timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct PostTimeline {
    pub timeline_type: PostTimelineType,
    pub post_id: u64,
    pub comment_id: Option<u64>,
    pub revision_guid: Option<String>,
    pub user: Option<ShallowUser>,
    pub owner: Option<ShallowUser>,
    #[serde(default)]
    pub action: String,
    #[serde(with = "ts_seconds")]
    pub creation_date: DateTime<Utc>,
    pub post_url: Option<String>,
    pub post_comment_url: Option<String>,
    pub post_revision_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTimelineType {
    Comment,
    Askoranswered,
    Badge,
    Revision,
    Accepted,
    #[serde(other)]
    Unknown,
}

/// One event on a user's timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct UserTimeline {
    pub user_id: u64,
    pub timeline_type: UserTimelineType,
    pub post_id: Option<u64>,
    pub comment_id: Option<u64>,
    pub post_type: Option<PostType>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    pub detail: Option<String>,
    #[serde(with = "ts_seconds")]
    pub creation_date: DateTime<Utc>,
}

/// A reputation change on one post.
#[derive(Debug, Clone, Deserialize)]
pub struct Reputation {
    pub user_id: u64,
    pub post_id: u64,
    pub post_type: PostType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub positive_rep: i64,
    #[serde(default)]
    pub negative_rep: i64,
    #[serde(with = "ts_seconds")]
    pub on_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionType {
    SingleUser,
    VoteBased,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Revision {
    pub post_id: u64,
    pub revision_guid: String,
    #[serde(default)]
    pub revision_number: u32,
    pub revision_type: RevisionType,
    #[serde(default)]
    pub is_question: bool,
    #[serde(default)]
    pub is_rollback: bool,
    #[serde(default)]
    pub set_community_wiki: bool,
    pub title: Option<String>,
    pub body: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub last_title: Option<String>,
    pub last_body: Option<String>,
    #[serde(default)]
    pub last_tags: Vec<String>,
    pub last_comment: Option<String>,
    pub user: Option<ShallowUser>,
    #[serde(with = "ts_seconds")]
    pub creation_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub total_questions: u64,
    #[serde(default)]
    pub total_unanswered: u64,
    #[serde(default)]
    pub total_accepted: u64,
    #[serde(default)]
    pub total_answers: u64,
    #[serde(default)]
    pub total_comments: u64,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub total_badges: u64,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub questions_per_minute: f64,
    #[serde(default)]
    pub answers_per_minute: f64,
    #[serde(default)]
    pub badges_per_minute: f64,
    #[serde(default)]
    pub views_per_day: f64,
    pub api_version: ApiVersion,
    pub site: Site,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVersion {
    pub version: String,
    pub revision: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteState {
    Normal,
    ClosedBeta,
    OpenBeta,
    LinkedMeta,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Site {
    pub name: String,
    /// Root URL of this site's API; the versioned path is appended to it.
    pub api_endpoint: String,
    pub site_url: String,
    #[serde(default)]
    pub description: String,
    pub logo_url: Option<String>,
    pub icon_url: Option<String>,
    pub state: Option<SiteState>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub styling: Option<Styling>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Styling {
    pub link_color: String,
    pub tag_foreground_color: String,
    pub tag_background_color: String,
}

// ---------------------------------------------------------------------------
// Paged results
// ---------------------------------------------------------------------------

/// One page of results plus the total number of matching items.
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    items: Vec<T>,
    total: u64,
    page: u32,
    page_size: u32,
}

impl<T> PagedList<T> {
    /// Total number of items across all pages. Never less than `len()`.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// `true` if a later page holds more items.
    pub fn has_more(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < self.total
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> std::ops::Deref for PagedList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> IntoIterator for PagedList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PagedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Internal deserialization helpers (not part of the public API surface)
// ---------------------------------------------------------------------------

/// An entity type and the key its items are listed under in a response.
pub(crate) trait Resource: DeserializeOwned {
    const COLLECTION: &'static str;
}

macro_rules! resource {
    ($($ty:ty => $key:literal),+ $(,)?) => {
        $(impl Resource for $ty {
            const COLLECTION: &'static str = $key;
        })+
    };
}

resource!(
    Question => "questions",
    Answer => "answers",
    Comment => "comments",
    User => "users",
    Tag => "tags",
    Badge => "badges",
    PostTimeline => "post_timelines",
    UserTimeline => "user_timelines",
    Reputation => "rep_changes",
    Revision => "revisions",
    Statistics => "statistics",
);

/// Pull a `u64` out of a JSON value, or `None`.
pub(crate) fn json_u64_opt(val: &serde_json::Value, key: &str) -> Option<u64> {
    val.get(key).and_then(|v| v.as_u64())
}

/// Pull a `u32` out of a JSON value, or `None`.
pub(crate) fn json_u32_opt(val: &serde_json::Value, key: &str) -> Option<u32> {
    json_u64_opt(val, key).and_then(|v| u32::try_from(v).ok())
}

/// Decode the item array stored under `T::COLLECTION`.
pub(crate) fn items_from_value<T: Resource>(val: &mut serde_json::Value) -> Result<Vec<T>> {
    let raw = val
        .get_mut(T::COLLECTION)
        .map(serde_json::Value::take)
        .ok_or_else(|| serde_json::Error::missing_field(T::COLLECTION))?;
    Ok(serde_json::from_value(raw)?)
}

/// Parse a list response into a [`PagedList`].
///
/// The page size is the one the caller asked for, falling back to the
/// response's `pagesize` and then to the item count for unpaged lists.
pub(crate) fn paged_list_from_value<T: Resource>(
    mut val: serde_json::Value,
    requested: Option<Paging>,
) -> Result<PagedList<T>> {
    let mut items: Vec<T> = items_from_value(&mut val)?;
    let count = u32::try_from(items.len()).unwrap_or(u32::MAX);

    let page = requested
        .map(|p| p.page())
        .or_else(|| json_u32_opt(&val, "page"))
        .unwrap_or(1);
    let page_size = requested
        .map(|p| p.page_size())
        .or_else(|| json_u32_opt(&val, "pagesize"))
        .unwrap_or(count);

    if count > page_size {
        warn!(
            "{}: got {count} items for a page of {page_size}, truncating",
            T::COLLECTION
        );
        items.truncate(page_size as usize);
    }

    let total = json_u64_opt(&val, "total")
        .unwrap_or(0)
        .max(items.len() as u64);

    trace!(
        "{}: page {page} ({} of {total} items)",
        T::COLLECTION,
        items.len()
    );

    Ok(PagedList {
        items,
        total,
        page,
        page_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(n: usize) -> Vec<serde_json::Value> {
        (0..n)
            .map(|i| json!({ "name": format!("tag{i}"), "count": i }))
            .collect()
    }

    #[test]
    fn paged_list_keeps_upstream_total() {
        let body = json!({ "total": 350, "page": 1, "pagesize": 100, "tags": tags(100) });
        let list: PagedList<Tag> =
            paged_list_from_value(body, Some(Paging::new(1, 100).unwrap())).unwrap();
        assert_eq!(list.len(), 100);
        assert_eq!(list.total(), 350);
        assert!(list.has_more());
    }

    #[test]
    fn paged_list_truncates_oversized_pages() {
        let body = json!({ "total": 12, "tags": tags(12) });
        let list: PagedList<Tag> =
            paged_list_from_value(body, Some(Paging::new(2, 5).unwrap())).unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list.page(), 2);
        assert_eq!(list.total(), 12);
    }

    #[test]
    fn unpaged_list_reports_item_count_as_total() {
        let body = json!({ "tags": tags(3) });
        let list: PagedList<Tag> = paged_list_from_value(body, None).unwrap();
        assert_eq!(list.total(), 3);
        assert_eq!(list.page_size(), 3);
        assert!(!list.has_more());
    }

    #[test]
    fn total_never_below_item_count() {
        let body = json!({ "total": 1, "tags": tags(4) });
        let list: PagedList<Tag> = paged_list_from_value(body, None).unwrap();
        assert_eq!(list.total(), 4);
    }

    #[test]
    fn missing_collection_is_a_decode_error() {
        let body = json!({ "total": 0 });
        let err = paged_list_from_value::<Tag>(body, None).unwrap_err();
        assert!(matches!(err, crate::StackExchangeError::Decode(_)));
    }

    #[test]
    fn unknown_enum_values_do_not_fail() {
        let badge: Badge = serde_json::from_value(json!({
            "badge_id": 1,
            "name": "Supporter",
            "rank": "platinum",
        }))
        .unwrap();
        assert_eq!(badge.rank, BadgeRank::Unknown);
    }

    #[test]
    fn question_dates_decode_from_epoch_seconds() {
        let q: Question = serde_json::from_value(json!({
            "question_id": 7,
            "title": "Why?",
            "creation_date": 1_278_000_000,
            "last_activity_date": 1_278_000_100,
            "tags": ["rust"],
        }))
        .unwrap();
        assert_eq!(q.creation_date.timestamp(), 1_278_000_000);
        assert_eq!(q.last_activity_date.map(|d| d.timestamp()), Some(1_278_000_100));
        assert!(q.last_edit_date.is_none());
        assert!(q.comments.is_empty());
    }
}
