use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::errors::{Result, StackExchangeError};

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size the API uses when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// A 1-based page number and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    page: u32,
    page_size: u32,
}

impl Paging {
    /// Returns [`StackExchangeError::InvalidArgument`] if `page` is 0 or
    /// `page_size` is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page == 0 {
            return Err(StackExchangeError::invalid("page numbers start at 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(StackExchangeError::invalid(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The following page with the same size.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            page_size: self.page_size,
        }
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Inclusive `min..=max` bounds applied to the field the request sorts by.
///
/// For score-like sorts the bounds are plain numbers; for date sorts they are
/// epoch seconds (see [`Range::between_dates`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    min: i64,
    max: i64,
}

impl Range {
    pub fn new(min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(StackExchangeError::invalid(format!(
                "range minimum {min} is greater than maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn between_dates(min: DateTime<Utc>, max: DateTime<Utc>) -> Result<Self> {
        Self::new(min.timestamp(), max.timestamp())
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }
}

/// A time window; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimePeriod {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl TimePeriod {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(StackExchangeError::invalid(format!(
                    "time period starts at {s} but ends earlier at {e}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::new(Some(start), Some(end))
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Flags asking the API to include optional parts of each item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterOption {
    /// Include post bodies (`body=true`).
    IncludeBody,
    /// Include comments on each post (`comments=true`).
    IncludeComments,
    /// Include answers on each question (`answers=true`).
    IncludeAnswers,
}

impl FilterOption {
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::IncludeBody => "body",
            Self::IncludeComments => "comments",
            Self::IncludeAnswers => "answers",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A value of the `sort` query parameter accepted by some endpoint.
pub trait Sort: Copy + Eq + Debug {
    fn as_param(&self) -> &'static str;
}

macro_rules! sort_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $param:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Sort for $name {
            fn as_param(&self) -> &'static str {
                match self {
                    $(Self::$variant => $param),+
                }
            }
        }
    };
}

sort_enum!(
    /// Sorts for `/questions`.
    QuestionSort {
        Activity => "activity",
        Votes => "votes",
        Newest => "newest",
        Featured => "featured",
        Hot => "hot",
        Week => "week",
        Month => "month",
    }
);

sort_enum!(
    /// Sorts for `/questions/unanswered`.
    UnansweredSort {
        Newest => "newest",
        Votes => "votes",
    }
);

sort_enum!(
    /// Sorts for a user's questions and for `/search`.
    UserQuestionSort {
        Activity => "activity",
        Views => "views",
        Newest => "newest",
        Votes => "votes",
    }
);

sort_enum!(
    /// Sorts for a user's favorites.
    FavoriteSort {
        Activity => "activity",
        Views => "views",
        Newest => "newest",
        Added => "added",
        Votes => "votes",
    }
);

sort_enum!(
    UserSort {
        Reputation => "reputation",
        Newest => "newest",
        Oldest => "oldest",
        Name => "name",
    }
);

sort_enum!(
    TagSort {
        Popular => "popular",
        Activity => "activity",
        Name => "name",
    }
);

sort_enum!(
    AnswerSort {
        Activity => "activity",
        Views => "views",
        Newest => "newest",
        Votes => "votes",
    }
);

sort_enum!(
    CommentSort {
        Creation => "creation",
        Votes => "votes",
    }
);

/// Sort type for endpoints that take no `sort` parameter. Has no values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoSort {}

impl Sort for NoSort {
    fn as_param(&self) -> &'static str {
        match *self {}
    }
}
