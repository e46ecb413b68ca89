//! Listing paginator
//!
//! Walks a bucket listing page by page, feeding the last key of each page
//! back as the `after` cursor. The resulting stream is lazy, finite and not
//! restartable: once a page has been pulled the cursor has moved on.

use futures::stream::{self, Stream, TryStreamExt};
use tracing::trace;

use crate::error::Result;
use crate::traits::{ListOptions, ListingEntry, ObjectStore};

/// Paginated enumeration of one bucket
pub struct Paginator<'a> {
    store: &'a dyn ObjectStore,
    bucket: String,
    prefix: Option<String>,
    page_limit: Option<i32>,
    max_count: Option<usize>,
}

struct Cursor {
    after: Option<String>,
    seen: usize,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: None,
            page_limit: None,
            max_count: None,
        }
    }

    /// Restrict to keys starting with `prefix`
    pub fn prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Per-request page limit; `None` leaves it to the service
    pub fn page_limit(mut self, limit: Option<i32>) -> Self {
        self.page_limit = limit;
        self
    }

    /// Stop after the first page that brings the total to at least `max`.
    ///
    /// This is a page-boundary cap, not a truncation: the last page may
    /// overshoot. `None` or `Some(0)` means no cap.
    pub fn max_count(mut self, max: Option<usize>) -> Self {
        self.max_count = max.filter(|m| *m > 0);
        self
    }

    /// Stream of non-empty pages
    pub fn pages(self) -> impl Stream<Item = Result<Vec<ListingEntry>>> + Send + 'a {
        let Paginator {
            store,
            bucket,
            prefix,
            page_limit,
            max_count,
        } = self;

        let start = Cursor {
            after: None,
            seen: 0,
            done: false,
        };

        stream::try_unfold(start, move |mut cursor| {
            let bucket = bucket.clone();
            let options = ListOptions {
                prefix: prefix.clone(),
                after: cursor.after.clone(),
                limit: page_limit,
            };
            async move {
                if cursor.done {
                    return Ok(None);
                }

                let page = store.list_objects(&bucket, &options).await?;
                let Some(last) = page.last() else {
                    trace!(bucket = %bucket, seen = cursor.seen, "Listing exhausted");
                    return Ok(None);
                };

                cursor.after = Some(last.key.clone());
                cursor.seen += page.len();
                cursor.done = max_count.is_some_and(|max| cursor.seen >= max);
                trace!(
                    bucket = %bucket,
                    page_len = page.len(),
                    cursor = ?cursor.after,
                    "Fetched listing page"
                );

                Ok(Some((page, cursor)))
            }
        })
    }

    /// Stream of individual entries, in service order
    pub fn entries(self) -> impl Stream<Item = Result<ListingEntry>> + Send + 'a {
        self.pages()
            .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
            .try_flatten()
    }

    /// Materialize the whole enumeration; any page failure discards everything
    pub async fn collect(self) -> Result<Vec<ListingEntry>> {
        self.pages().try_concat().await
    }

    /// Count matching entries without keeping them
    pub async fn count(self) -> Result<usize> {
        self.pages()
            .try_fold(0usize, |total, page| async move { Ok(total + page.len()) })
            .await
    }
}
