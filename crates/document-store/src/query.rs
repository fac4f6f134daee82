use std::cmp::Ordering;

use common::{Document, DocumentId, DocumentKind, DocumentStatus, EntityId};
use serde::{Deserialize, Serialize};

/// Field a document query is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Reference,
    CreatedAt,
    DeliveryDate,
    SequentialId,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A sort specification. Ties are always broken by creation time, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(key: SortKey) -> Self {
        Self {
            key,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(key: SortKey) -> Self {
        Self {
            key,
            order: SortOrder::Desc,
        }
    }

    /// Parses `reference`, `-createdAt`, `deliveryDate`, `sequentialId`...
    /// A leading `-` means descending.
    pub fn parse(input: &str) -> Option<Self> {
        let (order, name) = match input.strip_prefix('-') {
            Some(rest) => (SortOrder::Desc, rest),
            None => (SortOrder::Asc, input),
        };
        let key = match name {
            "reference" | "ref" => SortKey::Reference,
            "createdAt" | "datec" => SortKey::CreatedAt,
            "deliveryDate" | "date_livraison" => SortKey::DeliveryDate,
            "sequentialId" | "ID" => SortKey::SequentialId,
            _ => return None,
        };
        Some(Self { key, order })
    }
}

/// Builder for filtering documents.
///
/// Removed documents are excluded unless `include_removed` is set.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Restrict to these ids.
    pub ids: Option<Vec<DocumentId>>,

    /// Restrict to these subtypes.
    pub kinds: Option<Vec<DocumentKind>>,

    /// Restrict to these statuses.
    pub statuses: Option<Vec<DocumentStatus>>,

    /// Documents whose parent order is this one.
    pub parent_order: Option<DocumentId>,

    /// Documents booked under this entity.
    pub entity: Option<EntityId>,

    /// Case-insensitive substring of the reference.
    pub search: Option<String>,

    /// Include soft-removed documents.
    pub include_removed: bool,

    pub sort: Sort,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents hanging off the given root order.
    pub fn linked_to(root: DocumentId) -> Self {
        Self {
            parent_order: Some(root),
            sort: Sort::asc(SortKey::CreatedAt),
            ..Default::default()
        }
    }

    pub fn ids(mut self, ids: Vec<DocumentId>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn kinds(mut self, kinds: &[DocumentKind]) -> Self {
        self.kinds = Some(kinds.to_vec());
        self
    }

    pub fn statuses(mut self, statuses: &[DocumentStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    pub fn parent_order(mut self, parent: DocumentId) -> Self {
        self.parent_order = Some(parent);
        self
    }

    pub fn entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn include_removed(mut self) -> Self {
        self.include_removed = true;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the document passes every filter of this query.
    pub fn matches(&self, doc: &Document) -> bool {
        if !self.include_removed && doc.is_removed {
            return false;
        }
        if let Some(ref ids) = self.ids
            && !ids.contains(&doc.id)
        {
            return false;
        }
        if let Some(ref kinds) = self.kinds
            && !kinds.contains(&doc.kind())
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&doc.status)
        {
            return false;
        }
        if let Some(parent) = self.parent_order
            && doc.parent_order != Some(parent)
        {
            return false;
        }
        if let Some(ref entity) = self.entity
            && doc.entity.as_ref() != Some(entity)
        {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let hit = doc
                .reference
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Orders two documents according to this query's sort.
    ///
    /// Missing values sort first in ascending order.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let primary = match self.sort.key {
            SortKey::Reference => a.reference.cmp(&b.reference),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::DeliveryDate => a.delivery_date.cmp(&b.delivery_date),
            SortKey::SequentialId => a.sequential_id.cmp(&b.sequential_id),
        };
        let primary = match self.sort.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    }
}

/// Default page size of listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a listing returns.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// A paged listing request.
#[derive(Debug, Clone, Default)]
pub struct ListingRequest {
    pub search: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
    pub max: Option<i64>,
    pub ids: Vec<DocumentId>,
    pub sort: Option<String>,
    pub filters: DocumentQuery,
}

impl ListingRequest {
    /// Zero-based page index, clamped to ≥0.
    pub fn page_index(&self) -> usize {
        self.index() as usize
    }

    /// Page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> usize {
        self.max.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE) as usize
    }

    /// Rows skipped before the requested page. Saturates at `i64::MAX`, which
    /// is still a valid SQL offset.
    pub fn offset(&self) -> usize {
        self.index().saturating_mul(self.page_size() as i64) as usize
    }

    fn index(&self) -> i64 {
        self.page.unwrap_or(1).saturating_sub(1).max(0)
    }

    /// Filter for counting every match, ignoring paging.
    pub fn count_query(&self) -> DocumentQuery {
        let mut query = self.filters.clone();
        if !self.ids.is_empty() {
            query.ids = Some(self.ids.clone());
        }
        if let Some(ref search) = self.search
            && !search.is_empty()
        {
            query.search = Some(search.clone());
        }
        query.sort = self
            .sort
            .as_deref()
            .and_then(Sort::parse)
            .unwrap_or_default();
        query.limit = None;
        query.offset = None;
        query
    }

    /// Filter for the requested page.
    pub fn page_query(&self) -> DocumentQuery {
        let size = self.page_size();
        self.count_query().limit(size).offset(self.offset())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Total number of matching documents.
    pub count: u64,
    /// 1-based page number.
    pub page: usize,
    pub pages: usize,
    pub limit: usize,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>, count: u64, request: &ListingRequest) -> Self {
        let limit = request.page_size();
        let pages = (count as usize).div_ceil(limit).max(1);
        Self {
            items,
            count,
            page: request.page_index().saturating_add(1),
            pages,
            limit,
        }
    }
}
