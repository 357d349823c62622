//! # Stack Exchange API client for Rust
//!
//! Typed async client for the Stack Exchange 1.x REST API: questions,
//! answers, users, tags, badges, comments, revisions, timelines and site
//! statistics. Every call is one HTTP GET returning a typed [`PagedList`].
//!
//! ## Quick start
//!
//! ```no_run
//! use stackexchange::{Client, Paging, RequestOptions, TagSort};
//!
//! #[tokio::main]
//! async fn main() -> stackexchange::Result<()> {
//!     let client = Client::new("your_app_key")?;
//!
//!     let opts = RequestOptions::new()
//!         .sort(TagSort::Popular)
//!         .paging(Paging::new(1, 100)?);
//!     let tags = client.get_tags(&opts).await?;
//!
//!     println!("showing {} of {} tags", tags.len(), tags.total());
//!     for tag in &tags {
//!         println!("  {} ({})", tag.name, tag.count);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Searching
//!
//! ```no_run
//! use stackexchange::{Client, SearchQuery, UserQuestionSort};
//!
//! # async fn example(client: &Client) -> stackexchange::Result<()> {
//! let questions = SearchQuery::new()
//!     .with_tags(["rust"])?
//!     .with_in_title("borrow")?
//!     .with_sort(UserQuestionSort::Votes)?
//!     .execute(client)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Pages are 1-based and never aggregated; loop with [`Paging::next`] and
//! [`PagedList::has_more`] to walk a result set.

mod client;
mod errors;
mod models;
mod params;
mod query;

pub use client::{Client, ClientBuilder};
pub use errors::{ErrorCode, Result, StackExchangeError};
pub use models::{
    Answer, ApiVersion, Badge, BadgeCounts, BadgeRank, Comment, PagedList, PostTimeline,
    PostTimelineType, PostType, Question, Reputation, Revision, RevisionType, ShallowUser, Site,
    SiteState, Statistics, Styling, Tag, User, UserTimeline, UserTimelineType, UserType,
};
pub use params::{
    AnswerSort, CommentSort, FavoriteSort, FilterOption, NoSort, Order, Paging, QuestionSort,
    Range, Sort, TagSort, TimePeriod, UnansweredSort, UserQuestionSort, UserSort,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use query::{RequestOptions, RequestSpec, SearchQuery, MAX_IDS_PER_REQUEST};
