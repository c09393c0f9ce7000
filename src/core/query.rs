/*
 * Derived, read-only views over the list collection: the filtered and sorted
 * overview of lists, the filtered and sorted products of one list, the set of
 * categories used in a list and per-list progress figures.
 *
 * Everything here is a pure function of its inputs. Views are vectors of
 * references into the store's data; the underlying collections keep their
 * insertion order. All sorts are stable.
 */
use super::models::{Product, RestockList};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order '{other}' (expected asc or desc)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSortKey {
    Name,
    #[serde(rename = "count")]
    ItemCount,
    #[default]
    #[serde(rename = "date")]
    CreatedAt,
}

impl FromStr for ListSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(ListSortKey::Name),
            "count" | "items" | "quantity" => Ok(ListSortKey::ItemCount),
            "date" | "created" => Ok(ListSortKey::CreatedAt),
            other => Err(format!(
                "unknown list sort key '{other}' (expected name, count or date)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSortKey {
    #[default]
    Name,
    Quantity,
    Completion,
    Stock,
    Category,
}

impl FromStr for ProductSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(ProductSortKey::Name),
            "quantity" | "qty" => Ok(ProductSortKey::Quantity),
            "completion" | "completed" => Ok(ProductSortKey::Completion),
            "stock" => Ok(ProductSortKey::Stock),
            "category" => Ok(ProductSortKey::Category),
            other => Err(format!(
                "unknown product sort key '{other}' (expected name, quantity, completion, stock or category)"
            )),
        }
    }
}

/* Filter and sort state for the list overview. Defaults to newest first. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub sort_by: ListSortKey,
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            search: String::new(),
            sort_by: ListSortKey::CreatedAt,
            order: SortOrder::Descending,
        }
    }
}

/* Filter and sort state for the products of one list. */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: String,
    /* `None` (or an empty string) matches every product. */
    pub category: Option<String>,
    pub sort_by: ProductSortKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

/* The date shown under a list in the overview. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayDate {
    LastViewed(OffsetDateTime),
    Created(OffsetDateTime),
}

/*
 * Approximates a locale-aware collation: strings compare case-insensitively
 * first; on a case-only difference lowercase sorts before uppercase.
 */
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| b.cmp(a))
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    needle_lower.is_empty() || haystack.to_lowercase().contains(needle_lower)
}

fn compare_lists(a: &RestockList, b: &RestockList, sort_by: ListSortKey, order: SortOrder) -> Ordering {
    let a_done = a.is_fully_completed();
    let b_done = b.is_fully_completed();
    if a_done != b_done {
        return if a_done {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }

    let ordering = match sort_by {
        ListSortKey::Name => locale_compare(&a.name, &b.name),
        ListSortKey::ItemCount => a.products.len().cmp(&b.products.len()),
        ListSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    order.apply(ordering)
}

/*
 * Filters lists by a case-insensitive substring of name or description and
 * sorts them. Fully completed lists always come after lists that still have
 * open items, whatever the sort key and order.
 */
pub fn filter_and_sort_lists<'a>(lists: &'a [RestockList], query: &ListQuery) -> Vec<&'a RestockList> {
    let needle = query.search.to_lowercase();
    let mut view: Vec<&RestockList> = lists
        .iter()
        .filter(|list| {
            contains_ignore_case(&list.name, &needle)
                || contains_ignore_case(&list.description, &needle)
        })
        .collect();
    view.sort_by(|a, b| compare_lists(a, b, query.sort_by, query.order));
    log::trace!(
        "Query: {} of {} lists match '{}'",
        view.len(),
        lists.len(),
        query.search
    );
    view
}

fn compare_products(a: &Product, b: &Product, sort_by: ProductSortKey, order: SortOrder) -> Ordering {
    if a.is_out_of_stock != b.is_out_of_stock {
        return if a.is_out_of_stock {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }

    // Under the completion key the flag itself decides the order.
    if sort_by != ProductSortKey::Completion && a.is_completed != b.is_completed {
        return if a.is_completed {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }

    let ordering = match sort_by {
        ProductSortKey::Name | ProductSortKey::Stock => locale_compare(&a.name, &b.name),
        ProductSortKey::Quantity => a.quantity.cmp(&b.quantity),
        ProductSortKey::Completion => a.is_completed.cmp(&b.is_completed),
        ProductSortKey::Category => locale_compare(a.category_or_empty(), b.category_or_empty()),
    };
    let ordering = order.apply(ordering);

    if ordering == Ordering::Equal && sort_by != ProductSortKey::Name {
        return locale_compare(&a.name, &b.name);
    }
    ordering
}

/*
 * Filters a list's products by a case-insensitive name substring and an exact
 * category match, then sorts them: out-of-stock items last, completed items
 * after open ones (unless sorting by completion), then the chosen key. Ties on
 * any key other than name fall back to ascending name order.
 */
pub fn filter_and_sort_products<'a>(list: &'a RestockList, query: &ProductQuery) -> Vec<&'a Product> {
    let needle = query.search.to_lowercase();
    let category_filter = query.category.as_deref().filter(|c| !c.is_empty());
    let mut view: Vec<&Product> = list
        .products
        .iter()
        .filter(|p| contains_ignore_case(&p.name, &needle))
        .filter(|p| category_filter.is_none_or(|c| p.category.as_deref() == Some(c)))
        .collect();
    view.sort_by(|a, b| compare_products(a, b, query.sort_by, query.order));
    view
}

/* Distinct non-empty categories of a list, sorted. */
pub fn available_categories(list: &RestockList) -> Vec<String> {
    let mut categories: Vec<String> = list
        .products
        .iter()
        .filter_map(|p| p.category.as_deref())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    categories.sort();
    categories.dedup();
    categories
}

pub fn list_progress(list: &RestockList) -> ListProgress {
    let completed = list.completed_count();
    let total = list.products.len();
    let percentage = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    ListProgress {
        completed,
        total,
        percentage,
    }
}

pub fn display_date(list: &RestockList) -> DisplayDate {
    match list.last_viewed_at {
        Some(viewed) => DisplayDate::LastViewed(viewed),
        None => DisplayDate::Created(list.created_at),
    }
}
