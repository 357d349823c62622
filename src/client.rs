use std::time::Duration;

use chrono::Utc;
use log::debug;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::errors::{ErrorCode, Result, StackExchangeError};
use crate::models::{
    items_from_value, paged_list_from_value, Answer, Badge, Comment, PagedList, PostTimeline,
    Question, Reputation, Resource, Revision, Statistics, Tag, User, UserTimeline,
};
use crate::params::{
    AnswerSort, CommentSort, FavoriteSort, NoSort, QuestionSort, TagSort, TimePeriod,
    UnansweredSort, UserQuestionSort, UserSort,
};
use crate::query::{
    apply_time_period, join_ids, join_tags, validate_revision_guid, validate_tag, RequestOptions,
    RequestSpec, SearchQuery,
};

const DEFAULT_BASE_URL: &str = "https://api.stackoverflow.com/1.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("stackexchange-rs/", env!("CARGO_PKG_VERSION"));
const API_KEY_ENV: &str = "STACKEXCHANGE_API_KEY";

/// Builder for constructing a [`Client`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use stackexchange::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> stackexchange::Result<()> {
/// let client = ClientBuilder::new()
///     .api_key("your_app_key")
///     .base_url("https://api.superuser.com/1.0")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the application key sent as the `key` query parameter.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the versioned API root (defaults to `https://api.stackoverflow.com/1.0`).
    ///
    /// Any Stack Exchange site works; see [`Site::api_endpoint`](crate::Site).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the HTTP request timeout (defaults to 30 seconds).
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the [`Client`].
    ///
    /// If no API key was set via [`api_key`](Self::api_key), the builder will
    /// attempt to read the `STACKEXCHANGE_API_KEY` environment variable.
    ///
    /// Returns [`StackExchangeError::Authentication`] if no key is available.
    pub fn build(self) -> Result<Client> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StackExchangeError::Authentication {
                message: format!(
                    "API key is required. Pass it to ClientBuilder::api_key() \
                     or set the {API_KEY_ENV} environment variable."
                ),
            })?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(StackExchangeError::Http)?;

        Ok(Client {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key,
            user_agent: self.user_agent,
            http,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The Stack Exchange API client.
///
/// Every list operation takes a [`RequestOptions`] value in place of the
/// optional sort, paging, time window, range and filter arguments; pass
/// `RequestOptions::default()` for none. Operations on ids batch all of them
/// into a single request (at most 100 ids).
///
/// # Example
///
/// ```no_run
/// use stackexchange::{Client, Paging, RequestOptions, TagSort};
///
/// # async fn example() -> stackexchange::Result<()> {
/// let client = Client::new("your_app_key")?;
///
/// let opts = RequestOptions::new()
///     .sort(TagSort::Popular)
///     .paging(Paging::new(1, 100)?);
/// let tags = client.get_tags(&opts).await?;
/// println!("{} of {} tags", tags.len(), tags.total());
/// # Ok(())
/// # }
/// ```
pub struct Client {
    base_url: String,
    api_key: String,
    user_agent: String,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client with the given API key and default settings.
    ///
    /// Shorthand for `ClientBuilder::new().api_key(api_key).build()`, so a
    /// blank key fails with [`StackExchangeError::Authentication`] here too.
    /// For customization, use [`ClientBuilder`] instead.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().api_key(api_key).build()
    }

    // -----------------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------------

    /// `GET /questions`.
    pub async fn get_questions(
        &self,
        opts: &RequestOptions<QuestionSort>,
    ) -> Result<PagedList<Question>> {
        self.fetch_page(opts.apply(RequestSpec::new("/questions")))
            .await
    }

    /// `GET /questions/unanswered`.
    pub async fn get_unanswered_questions(
        &self,
        opts: &RequestOptions<UnansweredSort>,
    ) -> Result<PagedList<Question>> {
        self.fetch_page(opts.apply(RequestSpec::new("/questions/unanswered")))
            .await
    }

    /// Questions carrying every one of `tags`.
    pub async fn get_tagged_questions<I, T>(
        &self,
        tags: I,
        opts: &RequestOptions<QuestionSort>,
    ) -> Result<PagedList<Question>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tags = tags
            .into_iter()
            .map(|t| validate_tag(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if tags.is_empty() {
            return Err(StackExchangeError::invalid("at least one tag is required"));
        }
        let spec = opts
            .apply(RequestSpec::new("/questions"))
            .with_param("tagged", join_tags(&tags));
        self.fetch_page(spec).await
    }

    /// Questions asked by the given users.
    pub async fn get_questions_by_users(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<UserQuestionSort>,
    ) -> Result<PagedList<Question>> {
        let path = format!("/users/{}/questions", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    /// Questions the given users marked as favorite.
    pub async fn get_favorite_questions_by_users(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<FavoriteSort>,
    ) -> Result<PagedList<Question>> {
        let path = format!("/users/{}/favorites", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    pub async fn get_questions_by_ids(
        &self,
        question_ids: &[u64],
        opts: &RequestOptions<NoSort>,
    ) -> Result<PagedList<Question>> {
        let path = format!("/questions/{}", join_ids(question_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    pub async fn get_questions_timeline(
        &self,
        question_ids: &[u64],
        opts: &RequestOptions<NoSort>,
    ) -> Result<PagedList<PostTimeline>> {
        let path = format!("/questions/{}/timeline", join_ids(question_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    /// Run a [`SearchQuery`].
    ///
    /// Fails with [`StackExchangeError::UnconstrainedSearch`] before sending
    /// anything if the query has neither tags nor title text.
    pub async fn search_questions(&self, query: &SearchQuery) -> Result<PagedList<Question>> {
        let spec = query.to_request_spec()?;
        self.fetch_page(spec).await
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub async fn get_users(&self, opts: &RequestOptions<UserSort>) -> Result<PagedList<User>> {
        self.fetch_page(opts.apply(RequestSpec::new("/users"))).await
    }

    /// Users whose display name contains `filter`.
    pub async fn get_users_by_name(
        &self,
        filter: &str,
        opts: &RequestOptions<UserSort>,
    ) -> Result<PagedList<User>> {
        if filter.trim().is_empty() {
            return Err(StackExchangeError::invalid("user name filter must not be blank"));
        }
        let spec = opts
            .apply(RequestSpec::new("/users"))
            .with_param("filter", filter);
        self.fetch_page(spec).await
    }

    pub async fn get_users_by_ids(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<UserSort>,
    ) -> Result<PagedList<User>> {
        let path = format!("/users/{}", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    pub async fn get_users_timeline(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<NoSort>,
    ) -> Result<PagedList<UserTimeline>> {
        let path = format!("/users/{}/timeline", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    /// Comments that mention the given users.
    pub async fn get_users_mentions(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<CommentSort>,
    ) -> Result<PagedList<Comment>> {
        let path = format!("/users/{}/mentioned", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    pub async fn get_users_reputations(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<NoSort>,
    ) -> Result<PagedList<Reputation>> {
        let path = format!("/users/{}/reputation", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    // -----------------------------------------------------------------------
    // Badges
    // -----------------------------------------------------------------------

    /// Every badge on the site. Not paged.
    pub async fn get_badges(&self) -> Result<PagedList<Badge>> {
        self.fetch_page(RequestSpec::new("/badges")).await
    }

    /// Non-tag badges, ordered by name. Not paged.
    pub async fn get_badges_by_name(&self) -> Result<PagedList<Badge>> {
        self.fetch_page(RequestSpec::new("/badges/name")).await
    }

    /// Tag-based badges. Not paged.
    pub async fn get_badges_by_tags(&self) -> Result<PagedList<Badge>> {
        self.fetch_page(RequestSpec::new("/badges/tags")).await
    }

    /// Badges earned by the given users. Not paged.
    pub async fn get_badges_for_users(&self, user_ids: &[u64]) -> Result<PagedList<Badge>> {
        let path = format!("/users/{}/badges", join_ids(user_ids)?);
        self.fetch_page(RequestSpec::new(path)).await
    }

    /// Users who earned any of the given badges.
    pub async fn get_badges_recipients(
        &self,
        badge_ids: &[u64],
        opts: &RequestOptions<NoSort>,
    ) -> Result<PagedList<User>> {
        let path = format!("/badges/{}", join_ids(badge_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    // -----------------------------------------------------------------------
    // Tags
    // -----------------------------------------------------------------------

    pub async fn get_tags(&self, opts: &RequestOptions<TagSort>) -> Result<PagedList<Tag>> {
        self.fetch_page(opts.apply(RequestSpec::new("/tags"))).await
    }

    /// Tags the given users have posted in.
    pub async fn get_tags_for_users(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<NoSort>,
    ) -> Result<PagedList<Tag>> {
        let path = format!("/users/{}/tags", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    // -----------------------------------------------------------------------
    // Answers
    // -----------------------------------------------------------------------

    pub async fn get_answers_by_questions(
        &self,
        question_ids: &[u64],
        opts: &RequestOptions<AnswerSort>,
    ) -> Result<PagedList<Answer>> {
        let path = format!("/questions/{}/answers", join_ids(question_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    pub async fn get_answers_by_users(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<AnswerSort>,
    ) -> Result<PagedList<Answer>> {
        let path = format!("/users/{}/answers", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    pub async fn get_answers(
        &self,
        answer_ids: &[u64],
        opts: &RequestOptions<NoSort>,
    ) -> Result<PagedList<Answer>> {
        let path = format!("/answers/{}", join_ids(answer_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    /// Comments written by the given users.
    pub async fn get_users_comments(
        &self,
        user_ids: &[u64],
        opts: &RequestOptions<CommentSort>,
    ) -> Result<PagedList<Comment>> {
        let path = format!("/users/{}/comments", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    /// Comments written by the given users in reply to `to_user_id`.
    pub async fn get_users_comments_to_user(
        &self,
        user_ids: &[u64],
        to_user_id: u64,
        opts: &RequestOptions<CommentSort>,
    ) -> Result<PagedList<Comment>> {
        let path = format!("/users/{}/comments/{to_user_id}", join_ids(user_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    pub async fn get_comments(
        &self,
        comment_ids: &[u64],
        opts: &RequestOptions<CommentSort>,
    ) -> Result<PagedList<Comment>> {
        let path = format!("/comments/{}", join_ids(comment_ids)?);
        self.fetch_page(opts.apply(RequestSpec::new(path))).await
    }

    // -----------------------------------------------------------------------
    // Statistics and revisions
    // -----------------------------------------------------------------------

    /// Site-wide statistics, one entry per site block in the response.
    pub async fn get_statistics(&self) -> Result<Vec<Statistics>> {
        let mut value = self.get_json(&RequestSpec::new("/stats")).await?;
        items_from_value(&mut value)
    }

    /// Revisions of the given posts, optionally limited to a time window.
    pub async fn get_revisions_for_posts(
        &self,
        post_ids: &[u64],
        time_period: Option<TimePeriod>,
    ) -> Result<PagedList<Revision>> {
        let mut spec = RequestSpec::new(format!("/revisions/{}", join_ids(post_ids)?));
        if let Some(period) = time_period {
            spec = apply_time_period(spec, period);
        }
        self.fetch_page(spec).await
    }

    /// A single revision of one post.
    ///
    /// Returns [`StackExchangeError::NotFound`] if the API has no such revision.
    pub async fn get_revision_for_post(&self, post_id: u64, revision_guid: &str) -> Result<Revision> {
        let revision_guid = validate_revision_guid(revision_guid)?;
        let spec = RequestSpec::new(format!("/revisions/{post_id}/{revision_guid}"));
        let mut value = self.get_json(&spec).await?;
        let revisions: Vec<Revision> = items_from_value(&mut value)?;
        revisions
            .into_iter()
            .next()
            .ok_or_else(|| StackExchangeError::NotFound {
                message: format!("revision {revision_guid} of post {post_id}"),
            })
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    async fn fetch_page<T: Resource>(&self, spec: RequestSpec) -> Result<PagedList<T>> {
        let value = self.get_json(&spec).await?;
        paged_list_from_value(value, spec.paging())
    }

    /// Send one GET request and decode the body as JSON.
    ///
    /// Non-2xx responses are mapped to typed errors and returned as-is;
    /// nothing is retried.
    async fn get_json(&self, spec: &RequestSpec) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, spec.path());
        let params: Vec<(&str, &str)> = spec.params().collect();
        debug!("GET {} {:?}", spec.path(), params);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.user_agent.as_str())
            .query(&params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(StackExchangeError::Http)?;

        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await.map_err(StackExchangeError::Http)?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let status_code = status.as_u16();
        let response_text = response.text().await.unwrap_or_default();
        debug!("GET {} failed with {status_code}", spec.path());
        Err(error_from_response(status_code, &response_text))
    }
}

/// Map a non-2xx response to a typed error.
///
/// The API reports failures as `{"error": {"code": 4001, "message": "..."}}`;
/// when the body has no such block the HTTP status doubles as the code.
pub(crate) fn error_from_response(status_code: u16, body: &str) -> StackExchangeError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|b| b.get("error"));

    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_i64())
        .and_then(|c| i32::try_from(c).ok())
        .unwrap_or(i32::from(status_code));

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or(body)
        .to_string();

    match ErrorCode::from_code(code) {
        ErrorCode::UnconstrainedSearch => StackExchangeError::UnconstrainedSearch {
            message,
            timestamp: Utc::now(),
        },
        _ if status_code == 404 => StackExchangeError::NotFound { message },
        error_code => StackExchangeError::Api {
            status_code,
            error_code,
            message,
            timestamp: Utc::now(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_trailing_slash() {
        let client = ClientBuilder::new()
            .api_key("k")
            .base_url("http://localhost:1234/1.0/")
            .build()
            .unwrap();
        assert_eq!(client.base_url, "http://localhost:1234/1.0");
    }

    #[test]
    fn builder_rejects_blank_key() {
        let result = ClientBuilder::new().api_key("  ").build();
        assert!(matches!(
            result,
            Err(StackExchangeError::Authentication { .. })
        ));
    }

    #[test]
    fn new_rejects_blank_key_like_the_builder() {
        for key in ["", "   "] {
            assert!(matches!(
                Client::new(key),
                Err(StackExchangeError::Authentication { .. })
            ));
        }
        let client = Client::new("k").unwrap();
        assert_eq!(client.api_key, "k");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn upstream_error_block_is_parsed() {
        let err = error_from_response(400, r#"{"error":{"code":4001,"message":"bad pagesize"}}"#);
        match err {
            StackExchangeError::Api {
                status_code,
                error_code,
                message,
                ..
            } => {
                assert_eq!(status_code, 400);
                assert_eq!(error_code, ErrorCode::InvalidPageSize);
                assert_eq!(message, "bad pagesize");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn upstream_unconstrained_search_maps_to_its_own_kind() {
        let err = error_from_response(400, r#"{"error":{"code":4007,"message":"too broad"}}"#);
        assert!(matches!(err, StackExchangeError::UnconstrainedSearch { .. }));
    }

    #[test]
    fn plain_text_body_falls_back_to_status() {
        let err = error_from_response(502, "Bad Gateway");
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.error_code(), Some(ErrorCode::Other(502)));
        assert!(err.to_string().contains("Bad Gateway"));

        let err = error_from_response(404, "");
        assert!(matches!(err, StackExchangeError::NotFound { .. }));
    }
}
