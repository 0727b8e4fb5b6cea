//! Query composition for listing and search endpoints.
//!
//! Every parameter arrives as optional raw text. Unrecognised values resolve
//! to "unspecified" rather than an error, and every specified criterion
//! narrows the result set. The composer performs no I/O; storage backends
//! translate a [`QueryDescriptor`] into their native query.

use crate::domain::update::coercion::numeric_prefix;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Only the exact literals `asc` and `desc` are recognised.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw? {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: &'static str,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSpec {
    page: u32,
    limit: u32,
}

impl PageSpec {
    /// Missing, unparsable or zero values fall back to the defaults; negative
    /// values clamp to 1 and the page size is capped at [`MAX_PAGE_SIZE`].
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: positive_or(page, DEFAULT_PAGE),
            limit: positive_or(limit, DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    match raw.and_then(|s| numeric_prefix(s, false).parse::<i64>().ok()) {
        None | Some(0) => default,
        Some(n) => n.clamp(1, i64::from(u32::MAX)) as u32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Predicate {
    /// `field = value`.
    Equals {
        field: &'static str,
        value: FilterValue,
    },
    /// Case-insensitive substring match on any of `fields`.
    TextMatch {
        fields: &'static [&'static str],
        needle: String,
    },
}

/// Conjunction of predicates. Empty means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    predicates: Vec<Predicate>,
}

impl FilterCriteria {
    pub fn and(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// The equality constraint on `field`, if any.
    pub fn equality(&self, field: &str) -> Option<FilterValue> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::Equals { field: f, value } if *f == field => Some(*value),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDescriptor {
    pub filter: FilterCriteria,
    pub sort: Option<SortSpec>,
    pub page: PageSpec,
}

/// What the caller should run: the plain listing, or a composed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListQuery {
    Unfiltered,
    Filtered(QueryDescriptor),
}

/// Sort allow-list and default for one resource.
#[derive(Debug, Clone, Copy)]
pub struct SortProfile {
    pub fields: &'static [&'static str],
    pub default: Option<SortSpec>,
}

impl SortProfile {
    /// Picks the sort for a filtered query. An unknown field or direction is
    /// ignored; a known direction without a field applies to the default field.
    pub fn resolve(&self, field: Option<&str>, direction: Option<&str>) -> Option<SortSpec> {
        let field = field.and_then(|f| self.fields.iter().copied().find(|known| *known == f));
        let direction = SortDirection::parse(direction);
        match (field, self.default) {
            (Some(field), default) => Some(SortSpec {
                field,
                direction: direction
                    .or(default.map(|d| d.direction))
                    .unwrap_or(SortDirection::Desc),
            }),
            (None, Some(default)) => Some(SortSpec {
                field: default.field,
                direction: direction.unwrap_or(default.direction),
            }),
            (None, None) => None,
        }
    }
}

pub const REVIEW_SORT: SortProfile = SortProfile {
    fields: &["rating", "likes"],
    default: Some(SortSpec {
        field: "rating",
        direction: SortDirection::Desc,
    }),
};

const REVIEW_TEXT_FIELDS: &[&str] = &["title", "content"];

/// `"true"` / `"false"` literals only; anything else is unspecified.
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw? {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Integer rating in `1..=5`; anything else is unspecified.
pub fn parse_rating(raw: Option<&str>) -> Option<i64> {
    let rating = numeric_prefix(raw?, false).parse::<i64>().ok()?;
    (1..=5).contains(&rating).then_some(rating)
}

/// `GET /products` query parameters.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// `asc` or `desc`.
    pub sort_by_price: Option<String>,
    /// `true` or `false`.
    pub is_available: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ProductListParams {
    fn is_empty(&self) -> bool {
        self.sort_by_price.is_none()
            && self.is_available.is_none()
            && self.page.is_none()
            && self.limit.is_none()
    }
}

/// `GET /reviews/search` query parameters.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReviewSearchParams {
    /// Matched against review title and content.
    pub search_text: Option<String>,
    /// 1 to 5.
    pub rating: Option<String>,
    pub verified_purchase: Option<String>,
    /// `rating` or `likes`.
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ReviewSearchParams {
    fn is_empty(&self) -> bool {
        self.search_text.is_none()
            && self.rating.is_none()
            && self.verified_purchase.is_none()
            && self.sort_field.is_none()
            && self.sort_order.is_none()
            && self.page.is_none()
            && self.limit.is_none()
    }
}

/// `GET /reviews/product/:id` query parameters.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductReviewsParams {
    /// `rating` (default) or `likes`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub fn compose_product_listing(params: &ProductListParams) -> ListQuery {
    if params.is_empty() {
        return ListQuery::Unfiltered;
    }

    let mut filter = FilterCriteria::default();
    if let Some(available) = parse_flag(params.is_available.as_deref()) {
        filter.and(Predicate::Equals {
            field: "isAvailable",
            value: FilterValue::Bool(available),
        });
    }

    let sort = SortDirection::parse(params.sort_by_price.as_deref()).map(|direction| SortSpec {
        field: "price",
        direction,
    });

    ListQuery::Filtered(QueryDescriptor {
        filter,
        sort,
        page: PageSpec::from_raw(params.page.as_deref(), params.limit.as_deref()),
    })
}

pub fn compose_review_search(params: &ReviewSearchParams) -> ListQuery {
    if params.is_empty() {
        return ListQuery::Unfiltered;
    }

    let mut filter = FilterCriteria::default();
    if let Some(text) = params.search_text.as_deref().map(str::trim) {
        if !text.is_empty() {
            filter.and(Predicate::TextMatch {
                fields: REVIEW_TEXT_FIELDS,
                needle: text.to_string(),
            });
        }
    }
    if let Some(rating) = parse_rating(params.rating.as_deref()) {
        filter.and(Predicate::Equals {
            field: "rating",
            value: FilterValue::Int(rating),
        });
    }
    if let Some(verified) = parse_flag(params.verified_purchase.as_deref()) {
        filter.and(Predicate::Equals {
            field: "verifiedPurchase",
            value: FilterValue::Bool(verified),
        });
    }

    ListQuery::Filtered(QueryDescriptor {
        filter,
        sort: REVIEW_SORT.resolve(params.sort_field.as_deref(), params.sort_order.as_deref()),
        page: PageSpec::from_raw(params.page.as_deref(), params.limit.as_deref()),
    })
}

pub fn compose_product_reviews(product_id: i64, params: &ProductReviewsParams) -> QueryDescriptor {
    let mut filter = FilterCriteria::default();
    filter.and(Predicate::Equals {
        field: "productId",
        value: FilterValue::Int(product_id),
    });
    QueryDescriptor {
        filter,
        sort: REVIEW_SORT.resolve(params.sort_by.as_deref(), params.sort_order.as_deref()),
        page: PageSpec::from_raw(params.page.as_deref(), params.limit.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtered(q: ListQuery) -> QueryDescriptor {
        match q {
            ListQuery::Filtered(d) => d,
            ListQuery::Unfiltered => panic!("expected a filtered query"),
        }
    }

    #[test]
    fn no_parameters_means_unfiltered() {
        assert_eq!(compose_product_listing(&ProductListParams::default()), ListQuery::Unfiltered);
        assert_eq!(compose_review_search(&ReviewSearchParams::default()), ListQuery::Unfiltered);
    }

    #[test]
    fn availability_flag_narrows_only_when_literal() {
        let q = filtered(compose_product_listing(&ProductListParams {
            is_available: Some("true".into()),
            ..Default::default()
        }));
        assert_eq!(q.filter.predicates().len(), 1);
        assert_eq!(q.filter.equality("isAvailable"), Some(FilterValue::Bool(true)));
        assert_eq!(q.sort, None);

        let q = filtered(compose_product_listing(&ProductListParams {
            is_available: Some("false".into()),
            ..Default::default()
        }));
        assert_eq!(q.filter.equality("isAvailable"), Some(FilterValue::Bool(false)));

        let q = filtered(compose_product_listing(&ProductListParams {
            is_available: Some("banana".into()),
            ..Default::default()
        }));
        assert!(q.filter.is_empty());
    }

    #[test]
    fn price_sort_direction() {
        let q = filtered(compose_product_listing(&ProductListParams {
            sort_by_price: Some("desc".into()),
            ..Default::default()
        }));
        assert_eq!(
            q.sort,
            Some(SortSpec {
                field: "price",
                direction: SortDirection::Desc
            })
        );

        let q = filtered(compose_product_listing(&ProductListParams {
            sort_by_price: Some("sideways".into()),
            ..Default::default()
        }));
        assert_eq!(q.sort, None);
    }

    #[test]
    fn pagination_offsets() {
        let p = PageSpec::from_raw(Some("1"), Some("10"));
        assert_eq!((p.skip(), p.limit()), (0, 10));
        let p = PageSpec::from_raw(Some("3"), Some("5"));
        assert_eq!((p.skip(), p.limit()), (10, 5));
        let p = PageSpec::from_raw(None, None);
        assert_eq!((p.page(), p.skip(), p.limit()), (1, 0, 10));
    }

    #[test]
    fn pagination_never_goes_below_one() {
        let p = PageSpec::from_raw(Some("-4"), Some("-1"));
        assert_eq!((p.page(), p.limit()), (1, 1));
        let p = PageSpec::from_raw(Some("0"), Some("junk"));
        assert_eq!((p.page(), p.limit()), (1, 10));
        let p = PageSpec::from_raw(Some("2"), Some("5000"));
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn rating_bounds() {
        assert_eq!(parse_rating(Some("0")), None);
        assert_eq!(parse_rating(Some("6")), None);
        assert_eq!(parse_rating(Some("five")), None);
        assert_eq!(parse_rating(Some("3")), Some(3));

        let q = filtered(compose_review_search(&ReviewSearchParams {
            rating: Some("6".into()),
            ..Default::default()
        }));
        assert!(q.filter.is_empty());

        let q = filtered(compose_review_search(&ReviewSearchParams {
            rating: Some("3".into()),
            ..Default::default()
        }));
        assert_eq!(q.filter.equality("rating"), Some(FilterValue::Int(3)));
    }

    #[test]
    fn review_search_composes_conjunctively() {
        let q = filtered(compose_review_search(&ReviewSearchParams {
            search_text: Some("battery".into()),
            rating: Some("4".into()),
            verified_purchase: Some("false".into()),
            ..Default::default()
        }));
        assert_eq!(q.filter.predicates().len(), 3);
        assert_eq!(q.filter.equality("verifiedPurchase"), Some(FilterValue::Bool(false)));
        assert!(q.filter.predicates().contains(&Predicate::TextMatch {
            fields: REVIEW_TEXT_FIELDS,
            needle: "battery".into(),
        }));
    }

    #[test]
    fn review_search_defaults_to_rating_desc() {
        let q = filtered(compose_review_search(&ReviewSearchParams {
            verified_purchase: Some("true".into()),
            ..Default::default()
        }));
        assert_eq!(q.sort, REVIEW_SORT.default);

        let q = filtered(compose_review_search(&ReviewSearchParams {
            sort_field: Some("likes".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        }));
        assert_eq!(
            q.sort,
            Some(SortSpec {
                field: "likes",
                direction: SortDirection::Asc
            })
        );

        let q = filtered(compose_review_search(&ReviewSearchParams {
            sort_field: Some("title".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        }));
        assert_eq!(
            q.sort,
            Some(SortSpec {
                field: "rating",
                direction: SortDirection::Asc
            })
        );
    }

    #[test]
    fn product_reviews_always_filter_by_product() {
        let q = compose_product_reviews(7, &ProductReviewsParams::default());
        assert_eq!(q.filter.equality("productId"), Some(FilterValue::Int(7)));
        assert_eq!(q.sort, REVIEW_SORT.default);
        assert_eq!(q.page, PageSpec::default());
    }
}
