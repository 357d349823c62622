//! Request assembly.
//!
//! [`RequestOptions`] carries the optional knobs every list endpoint shares
//! (sort, order, paging, time window, range, filter flags). [`SearchQuery`] is
//! the fluent builder for `/search`. Both serialize into a [`RequestSpec`],
//! which is what the client actually sends.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use crate::client::Client;
use crate::errors::{Result, StackExchangeError};
use crate::models::{PagedList, Question};
use crate::params::{
    FilterOption, NoSort, Order, Paging, Range, Sort, TimePeriod, UserQuestionSort,
};

/// Most ids the API accepts in one vector parameter.
pub const MAX_IDS_PER_REQUEST: usize = 100;

/// Separator the API uses for vector parameters (ids and tags).
const VECTOR_SEPARATOR: &str = ";";

/// A fully assembled GET request: path plus query parameters.
///
/// Parameters are kept sorted by name, so two specs built from the same
/// constraints compare equal whatever order the constraints were added in.
/// The API key is added by the client when the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    path: String,
    params: BTreeMap<&'static str, String>,
    paging: Option<Paging>,
}

impl RequestSpec {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
            paging: None,
        }
    }

    pub(crate) fn with_param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.insert(key, value.to_string());
        self
    }

    pub(crate) fn with_paging(self, paging: Paging) -> Self {
        let mut spec = self
            .with_param("page", paging.page())
            .with_param("pagesize", paging.page_size());
        spec.paging = Some(paging);
        spec
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.params.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// The paging this request was built with, if it is a paged request.
    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }
}

/// Optional parameters for a list request.
///
/// `RequestOptions::default()` means: no sort override, the first page at the
/// default size, an unbounded time window, no range and no filter flags.
///
/// ```
/// use stackexchange::{FilterOption, Paging, QuestionSort, RequestOptions};
///
/// # fn main() -> stackexchange::Result<()> {
/// let opts = RequestOptions::new()
///     .sort(QuestionSort::Votes)
///     .paging(Paging::new(2, 50)?)
///     .filter(FilterOption::IncludeBody);
/// assert_eq!(opts.paging.map(|p| p.page()), Some(2));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions<S = NoSort> {
    pub sort: Option<S>,
    pub order: Option<Order>,
    pub paging: Option<Paging>,
    pub time_period: Option<TimePeriod>,
    pub range: Option<Range>,
    pub filter_options: BTreeSet<FilterOption>,
}

impl<S> Default for RequestOptions<S> {
    fn default() -> Self {
        Self {
            sort: None,
            order: None,
            paging: None,
            time_period: None,
            range: None,
            filter_options: BTreeSet::new(),
        }
    }
}

impl<S: Sort> RequestOptions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: S) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn paging(mut self, paging: Paging) -> Self {
        self.paging = Some(paging);
        self
    }

    pub fn time_period(mut self, time_period: TimePeriod) -> Self {
        self.time_period = Some(time_period);
        self
    }

    pub fn range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn filter(mut self, option: FilterOption) -> Self {
        self.filter_options.insert(option);
        self
    }

    pub fn filters(mut self, options: impl IntoIterator<Item = FilterOption>) -> Self {
        self.filter_options.extend(options);
        self
    }

    /// Serialize these options into `spec` as a paged request.
    pub(crate) fn apply(&self, spec: RequestSpec) -> RequestSpec {
        let mut spec = spec.with_paging(self.paging.unwrap_or_default());

        if let Some(sort) = self.sort {
            spec = spec.with_param("sort", sort.as_param());
        }
        if let Some(order) = self.order {
            spec = spec.with_param("order", order.as_param());
        }
        if let Some(range) = self.range {
            spec = spec
                .with_param("min", range.min())
                .with_param("max", range.max());
        }
        if let Some(period) = self.time_period {
            spec = apply_time_period(spec, period);
        }
        for option in &self.filter_options {
            spec = spec.with_param(option.as_param(), "true");
        }
        spec
    }
}

pub(crate) fn apply_time_period(mut spec: RequestSpec, period: TimePeriod) -> RequestSpec {
    if let Some(start) = period.start() {
        spec = spec.with_param("fromdate", start.timestamp());
    }
    if let Some(end) = period.end() {
        spec = spec.with_param("todate", end.timestamp());
    }
    spec
}

/// Join ids into one vector path segment, e.g. `1;2;3`.
pub(crate) fn join_ids(ids: &[u64]) -> Result<String> {
    if ids.is_empty() {
        return Err(StackExchangeError::invalid("at least one id is required"));
    }
    if ids.len() > MAX_IDS_PER_REQUEST {
        return Err(StackExchangeError::invalid(format!(
            "at most {MAX_IDS_PER_REQUEST} ids per request, got {}",
            ids.len()
        )));
    }
    Ok(ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(VECTOR_SEPARATOR))
}

/// Check a single tag and return it owned.
pub(crate) fn validate_tag(tag: &str) -> Result<String> {
    if tag.is_empty() {
        return Err(StackExchangeError::invalid("tags must not be blank"));
    }
    if tag.chars().any(char::is_whitespace) || tag.contains(VECTOR_SEPARATOR) {
        return Err(StackExchangeError::invalid(format!(
            "tag {tag:?} contains whitespace or '{VECTOR_SEPARATOR}'"
        )));
    }
    Ok(tag.to_string())
}

/// Check a revision GUID before it is placed in a URL path.
///
/// Only ASCII hex digits and `-` are allowed, so the value can never add a
/// path segment, a query string or a fragment to the request.
pub(crate) fn validate_revision_guid(guid: &str) -> Result<&str> {
    if guid.is_empty() {
        return Err(StackExchangeError::invalid("revision guid must not be blank"));
    }
    if !guid.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return Err(StackExchangeError::invalid(format!(
            "revision guid {guid:?} may only contain hex digits and '-'"
        )));
    }
    Ok(guid)
}

pub(crate) fn join_tags<'a>(tags: impl IntoIterator<Item = &'a String>) -> String {
    tags.into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(VECTOR_SEPARATOR)
}

/// Store `value` in `slot` unless a different value is already there.
fn set_once<T: PartialEq + Debug>(slot: &mut Option<T>, value: T, what: &str) -> Result<()> {
    match slot {
        Some(existing) if *existing != value => Err(StackExchangeError::invalid(format!(
            "{what} is already set to {existing:?}, cannot change it to {value:?}"
        ))),
        _ => {
            *slot = Some(value);
            Ok(())
        }
    }
}

/// Fluent builder for a question search (`GET /search`).
///
/// Every `with_*` call consumes the query and returns a new one, or
/// [`StackExchangeError::InvalidArgument`] if the constraint conflicts with
/// one already present. A search needs at least one included tag or some
/// title text; otherwise building it fails with
/// [`StackExchangeError::UnconstrainedSearch`].
///
/// ```
/// use stackexchange::{Paging, SearchQuery, UserQuestionSort};
///
/// # fn main() -> stackexchange::Result<()> {
/// let query = SearchQuery::new()
///     .with_tags(["rust", "serde"])?
///     .without_tags(["json"])?
///     .with_sort(UserQuestionSort::Votes)?
///     .with_paging(Paging::new(1, 50)?)?;
/// let spec = query.to_request_spec()?;
/// assert_eq!(spec.param("tagged"), Some("rust;serde"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    tagged: BTreeSet<String>,
    not_tagged: BTreeSet<String>,
    in_title: Option<String>,
    options: RequestOptions<UserQuestionSort>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every one of `tags`.
    pub fn with_tags<I, T>(mut self, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for tag in tags {
            let tag = validate_tag(tag.as_ref())?;
            if self.not_tagged.contains(&tag) {
                return Err(StackExchangeError::invalid(format!(
                    "tag {tag:?} is already excluded"
                )));
            }
            self.tagged.insert(tag);
        }
        Ok(self)
    }

    /// Exclude questions carrying any of `tags`.
    pub fn without_tags<I, T>(mut self, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for tag in tags {
            let tag = validate_tag(tag.as_ref())?;
            if self.tagged.contains(&tag) {
                return Err(StackExchangeError::invalid(format!(
                    "tag {tag:?} is already required"
                )));
            }
            self.not_tagged.insert(tag);
        }
        Ok(self)
    }

    /// Match questions whose title contains `text`.
    pub fn with_in_title(mut self, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(StackExchangeError::invalid("title search text must not be blank"));
        }
        set_once(&mut self.in_title, text, "title search text")?;
        Ok(self)
    }

    pub fn with_sort(mut self, sort: UserQuestionSort) -> Result<Self> {
        set_once(&mut self.options.sort, sort, "sort")?;
        Ok(self)
    }

    pub fn with_order(mut self, order: Order) -> Result<Self> {
        set_once(&mut self.options.order, order, "order")?;
        Ok(self)
    }

    pub fn with_paging(mut self, paging: Paging) -> Result<Self> {
        set_once(&mut self.options.paging, paging, "paging")?;
        Ok(self)
    }

    pub fn with_time_period(mut self, time_period: TimePeriod) -> Result<Self> {
        set_once(&mut self.options.time_period, time_period, "time period")?;
        Ok(self)
    }

    pub fn with_range(mut self, range: Range) -> Result<Self> {
        set_once(&mut self.options.range, range, "range")?;
        Ok(self)
    }

    pub fn with_filter(mut self, option: FilterOption) -> Result<Self> {
        self.options.filter_options.insert(option);
        Ok(self)
    }

    /// `true` if the query carries a tag or title constraint.
    pub fn is_constrained(&self) -> bool {
        !self.tagged.is_empty() || self.in_title.is_some()
    }

    /// Validate the query and serialize it into a request.
    pub fn to_request_spec(&self) -> Result<RequestSpec> {
        if !self.is_constrained() {
            return Err(StackExchangeError::unconstrained(
                "a search needs at least one tag or some title text",
            ));
        }

        let mut spec = self.options.apply(RequestSpec::new("/search"));
        if !self.tagged.is_empty() {
            spec = spec.with_param("tagged", join_tags(&self.tagged));
        }
        if !self.not_tagged.is_empty() {
            spec = spec.with_param("nottagged", join_tags(&self.not_tagged));
        }
        if let Some(ref text) = self.in_title {
            spec = spec.with_param("intitle", text);
        }
        Ok(spec)
    }

    /// Run the search against `client`.
    pub async fn execute(&self, client: &Client) -> Result<PagedList<Question>> {
        client.search_questions(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{QuestionSort, TagSort};
    use chrono::{TimeZone, Utc};

    #[test]
    fn default_options_send_first_page_only() {
        let spec = RequestOptions::<TagSort>::default().apply(RequestSpec::new("/tags"));
        let params: Vec<_> = spec.params().collect();
        assert_eq!(params, vec![("page", "1"), ("pagesize", "30")]);
        assert_eq!(spec.paging(), Some(Paging::default()));
    }

    #[test]
    fn options_serialize_every_field() {
        let start = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2010, 2, 1, 0, 0, 0).unwrap();
        let spec = RequestOptions::new()
            .sort(QuestionSort::Votes)
            .order(Order::Asc)
            .paging(Paging::new(3, 10).unwrap())
            .range(Range::new(5, 10).unwrap())
            .time_period(TimePeriod::between(start, end).unwrap())
            .filters([FilterOption::IncludeComments, FilterOption::IncludeBody])
            .apply(RequestSpec::new("/questions"));

        assert_eq!(spec.param("sort"), Some("votes"));
        assert_eq!(spec.param("order"), Some("asc"));
        assert_eq!(spec.param("page"), Some("3"));
        assert_eq!(spec.param("pagesize"), Some("10"));
        assert_eq!(spec.param("min"), Some("5"));
        assert_eq!(spec.param("max"), Some("10"));
        assert_eq!(spec.param("fromdate"), Some("1262304000"));
        assert_eq!(spec.param("todate"), Some("1264982400"));
        assert_eq!(spec.param("body"), Some("true"));
        assert_eq!(spec.param("comments"), Some("true"));
        assert_eq!(spec.param("answers"), None);
    }

    #[test]
    fn duplicate_filter_options_collapse() {
        let opts = RequestOptions::<NoSort>::new()
            .filter(FilterOption::IncludeBody)
            .filter(FilterOption::IncludeBody);
        assert_eq!(opts.filter_options.len(), 1);
    }

    #[test]
    fn join_ids_batches_with_semicolons() {
        assert_eq!(join_ids(&[1, 22, 333]).unwrap(), "1;22;333");
        assert!(join_ids(&[]).is_err());
        let too_many: Vec<u64> = (0..=MAX_IDS_PER_REQUEST as u64).collect();
        assert!(join_ids(&too_many).is_err());
    }

    #[test]
    fn unconstrained_search_is_rejected() {
        let query = SearchQuery::new()
            .without_tags(["php"])
            .unwrap()
            .with_sort(UserQuestionSort::Votes)
            .unwrap();
        let err = query.to_request_spec().unwrap_err();
        assert!(matches!(err, StackExchangeError::UnconstrainedSearch { .. }));
        assert!(!SearchQuery::new().is_constrained());
    }

    #[test]
    fn with_calls_are_order_independent() {
        let a = SearchQuery::new()
            .with_tags(["java"])
            .unwrap()
            .with_sort(UserQuestionSort::Newest)
            .unwrap();
        let b = SearchQuery::new()
            .with_sort(UserQuestionSort::Newest)
            .unwrap()
            .with_tags(["java"])
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_request_spec().unwrap(), b.to_request_spec().unwrap());
    }

    #[test]
    fn tag_order_does_not_matter() {
        let a = SearchQuery::new().with_tags(["b", "a"]).unwrap();
        let b = SearchQuery::new().with_tags(["a"]).unwrap().with_tags(["b"]).unwrap();
        assert_eq!(a.to_request_spec().unwrap(), b.to_request_spec().unwrap());
        assert_eq!(a.to_request_spec().unwrap().param("tagged"), Some("a;b"));
    }

    #[test]
    fn conflicting_constraints_fail() {
        let query = SearchQuery::new().with_sort(UserQuestionSort::Votes).unwrap();
        assert!(query.clone().with_sort(UserQuestionSort::Votes).is_ok());
        assert!(matches!(
            query.with_sort(UserQuestionSort::Views),
            Err(StackExchangeError::InvalidArgument(_))
        ));

        let tagged = SearchQuery::new().with_tags(["java"]).unwrap();
        assert!(tagged.clone().without_tags(["java"]).is_err());
        let excluded = SearchQuery::new().without_tags(["java"]).unwrap();
        assert!(excluded.with_tags(["java"]).is_err());

        let paged = SearchQuery::new()
            .with_paging(Paging::new(1, 10).unwrap())
            .unwrap();
        assert!(paged.with_paging(Paging::new(2, 10).unwrap()).is_err());

        let ordered = SearchQuery::new().with_order(Order::Asc).unwrap();
        assert!(ordered.clone().with_order(Order::Asc).is_ok());
        assert!(matches!(
            ordered.with_order(Order::Desc),
            Err(StackExchangeError::InvalidArgument(_))
        ));

        let start = Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2011, 6, 1, 0, 0, 0).unwrap();
        let period = TimePeriod::between(start, end).unwrap();
        let windowed = SearchQuery::new().with_time_period(period).unwrap();
        assert!(windowed.clone().with_time_period(period).is_ok());
        assert!(matches!(
            windowed.with_time_period(TimePeriod::since(start)),
            Err(StackExchangeError::InvalidArgument(_))
        ));

        let ranged = SearchQuery::new()
            .with_range(Range::new(1, 5).unwrap())
            .unwrap();
        assert!(ranged.clone().with_range(Range::new(1, 5).unwrap()).is_ok());
        assert!(matches!(
            ranged.with_range(Range::new(1, 6).unwrap()),
            Err(StackExchangeError::InvalidArgument(_))
        ));

        let titled = SearchQuery::new().with_in_title("async").unwrap();
        assert!(titled.clone().with_in_title("async").is_ok());
        assert!(matches!(
            titled.with_in_title("await"),
            Err(StackExchangeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn revision_guids_are_hex_and_dashes_only() {
        let guid = "3A1B2C3D-0000-0000-0000-00000000abcd";
        assert_eq!(validate_revision_guid(guid).unwrap(), guid);
        for bad in ["", "  ", "../../users/1", "abc?x=1", "abc#frag", "ab/cd", "xyz"] {
            assert!(matches!(
                validate_revision_guid(bad),
                Err(StackExchangeError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn malformed_tags_and_titles_fail() {
        assert!(SearchQuery::new().with_tags([""]).is_err());
        assert!(SearchQuery::new().with_tags(["two words"]).is_err());
        assert!(SearchQuery::new().with_tags(["a;b"]).is_err());
        assert!(SearchQuery::new().with_in_title("   ").is_err());
    }

    #[test]
    fn search_spec_carries_all_constraints() {
        let spec = SearchQuery::new()
            .with_in_title("lifetime")
            .unwrap()
            .without_tags(["c++", "java"])
            .unwrap()
            .with_range(Range::new(5, 10).unwrap())
            .unwrap()
            .to_request_spec()
            .unwrap();
        assert_eq!(spec.path(), "/search");
        assert_eq!(spec.param("intitle"), Some("lifetime"));
        assert_eq!(spec.param("nottagged"), Some("c++;java"));
        assert_eq!(spec.param("tagged"), None);
        assert_eq!(spec.param("min"), Some("5"));
        assert_eq!(spec.param("max"), Some("10"));
    }
}
