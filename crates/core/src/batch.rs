//! Bulk copy and bulk delete
//!
//! Both operators enumerate the matching keys up front through the
//! [`Paginator`], then run one independent action per key with at most
//! `workers` actions in flight. A failed item is tallied and reported; it
//! never aborts the batch and never rolls back earlier items.

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::error::Result;
use crate::paginate::Paginator;
use crate::traits::{ObjectStore, PutOptions, Status};

/// Success and failure counts of one batch command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn record(&mut self, success: bool) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Outcome of a batch command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The enumeration matched nothing; no action was attempted
    Empty,
    Completed(BatchResult),
}

impl BatchOutcome {
    /// Counts of a completed batch; `None` when nothing matched
    pub fn result(&self) -> Option<BatchResult> {
        match self {
            BatchOutcome::Empty => None,
            BatchOutcome::Completed(result) => Some(*result),
        }
    }
}

/// Per-item outcome handed to the caller as each action finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub key: String,
    /// `Err` carries the service status or error text
    pub outcome: std::result::Result<(), String>,
}

impl ItemReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Enumeration and fan-out settings shared by both operators
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub prefix: Option<String>,
    pub page_limit: Option<i32>,
    pub workers: usize,
}

impl BatchOptions {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    pub fn prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn page_limit(mut self, limit: Option<i32>) -> Self {
        self.page_limit = limit;
        self
    }
}

/// Copy one object by streaming it from `src` into `dst` under the same key.
///
/// The length reported by the source GET travels with the stream. Success is
/// a 200 from the store; anything else is returned as-is.
pub async fn copy_object(
    src: &dyn ObjectStore,
    dst: &dyn ObjectStore,
    src_bucket: &str,
    dst_bucket: &str,
    key: &str,
) -> Result<Status> {
    let stream = src.get_object_reader(src_bucket, key).await?;
    dst.put_object_reader(
        dst_bucket,
        key,
        stream.reader,
        stream.length,
        &PutOptions::default(),
    )
    .await
}

fn report(key: String, result: Result<Status>, success: fn(&Status) -> bool) -> ItemReport {
    let outcome = match result {
        Ok(status) if success(&status) => Ok(()),
        Ok(status) => Err(status.to_string()),
        Err(e) => Err(e.to_string()),
    };
    ItemReport { key, outcome }
}

/// Copy every key of `src_bucket` matching the prefix into `dst_bucket`.
///
/// `src` and `dst` may be the same store or stores for two different accounts.
pub async fn bulk_copy<F>(
    src: &dyn ObjectStore,
    dst: &dyn ObjectStore,
    src_bucket: &str,
    dst_bucket: &str,
    options: &BatchOptions,
    mut on_item: F,
) -> Result<BatchOutcome>
where
    F: FnMut(&ItemReport) + Send,
{
    let keys = enumerate(src, src_bucket, options).await?;
    if keys.is_empty() {
        return Ok(BatchOutcome::Empty);
    }

    let mut items = stream::iter(keys)
        .map(|key| async move {
            let result = copy_object(src, dst, src_bucket, dst_bucket, &key).await;
            report(key, result, Status::is_ok)
        })
        .buffer_unordered(options.workers.max(1));

    let mut result = BatchResult::default();
    while let Some(item) = items.next().await {
        debug!(key = %item.key, outcome = ?item.outcome, "Copy finished");
        result.record(item.is_success());
        on_item(&item);
    }

    info!(
        src = src_bucket,
        dst = dst_bucket,
        succeeded = result.succeeded,
        failed = result.failed,
        "Bulk copy complete"
    );
    Ok(BatchOutcome::Completed(result))
}

/// Delete every key of `bucket` matching the prefix.
///
/// The key set is enumerated exhaustively before the first delete, so the
/// deletions never disturb the listing cursor. Only a 204 counts as success.
pub async fn bulk_delete<F>(
    store: &dyn ObjectStore,
    bucket: &str,
    options: &BatchOptions,
    mut on_item: F,
) -> Result<BatchOutcome>
where
    F: FnMut(&ItemReport) + Send,
{
    let keys = enumerate(store, bucket, options).await?;
    if keys.is_empty() {
        return Ok(BatchOutcome::Empty);
    }

    let mut items = stream::iter(keys)
        .map(|key| async move {
            let result = store.delete_object(bucket, &key).await;
            report(key, result, Status::is_no_content)
        })
        .buffer_unordered(options.workers.max(1));

    let mut result = BatchResult::default();
    while let Some(item) = items.next().await {
        debug!(key = %item.key, outcome = ?item.outcome, "Delete finished");
        result.record(item.is_success());
        on_item(&item);
    }

    info!(
        bucket,
        succeeded = result.succeeded,
        failed = result.failed,
        "Bulk delete complete"
    );
    Ok(BatchOutcome::Completed(result))
}

async fn enumerate(
    store: &dyn ObjectStore,
    bucket: &str,
    options: &BatchOptions,
) -> Result<Vec<String>> {
    let entries = Paginator::new(store, bucket)
        .prefix(options.prefix.clone())
        .page_limit(options.page_limit)
        .collect()
        .await?;
    Ok(entries.into_iter().map(|e| e.key).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::MemoryStore;
    use crate::traits::MockObjectStore;

    fn seeded(bucket: &str, keys: &[&str]) -> MemoryStore {
        let store = MemoryStore::with_page_size("owner", 2);
        store.insert_bucket(bucket);
        for key in keys {
            store.insert_object(bucket, key, format!("data-{key}"));
        }
        store
    }

    #[tokio::test]
    async fn test_bulk_copy_same_account() {
        let store = seeded("srcb", &["a", "b", "c"]);
        store.insert_bucket("destb");

        let mut seen = Vec::new();
        let outcome = bulk_copy(
            &store,
            &store,
            "srcb",
            "destb",
            &BatchOptions::new(1),
            |item| seen.push(item.key.clone()),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome::Completed(BatchResult {
                succeeded: 3,
                failed: 0
            })
        );
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(store.keys("destb"), vec!["a", "b", "c"]);
        assert_eq!(store.object("destb", "b").unwrap(), b"data-b");
    }

    #[tokio::test]
    async fn test_bulk_copy_between_accounts() {
        let src = seeded("srcb", &["x/1", "x/2", "y/1"]);
        let dst = MemoryStore::new("other");
        dst.insert_bucket("destb");

        let outcome = bulk_copy(
            &src,
            &dst,
            "srcb",
            "destb",
            &BatchOptions::new(4).prefix(Some("x/".into())),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(outcome.result().unwrap().succeeded, 2);
        assert_eq!(dst.keys("destb"), vec!["x/1", "x/2"]);
        assert!(src.keys("srcb").contains(&"y/1".to_string()));
    }

    #[tokio::test]
    async fn test_bulk_copy_tallies_failures_and_continues() {
        let store = seeded("srcb", &["a", "b", "c", "d"]);
        store.insert_bucket("destb");
        store.fail_key("b");

        let mut failures = Vec::new();
        let outcome = bulk_copy(
            &store,
            &store,
            "srcb",
            "destb",
            &BatchOptions::new(3),
            |item| {
                if !item.is_success() {
                    failures.push(item.key.clone());
                }
            },
        )
        .await
        .unwrap();

        let result = outcome.result().unwrap();
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failed, 1);
        assert_eq!(failures, vec!["b"]);
    }

    #[tokio::test]
    async fn test_bulk_copy_empty_source() {
        let store = seeded("srcb", &[]);
        store.insert_bucket("destb");
        let outcome = bulk_copy(&store, &store, "srcb", "destb", &BatchOptions::new(1), |_| {})
            .await
            .unwrap();
        assert_eq!(outcome, BatchOutcome::Empty);
        assert!(outcome.result().is_none());
    }

    #[tokio::test]
    async fn test_copy_object_forwards_source_length() {
        let src = seeded("srcb", &["k1"]);
        let mut dst = MockObjectStore::new();
        dst.expect_put_object_reader()
            .times(1)
            .withf(|bucket, key, _, length, _| {
                bucket == "destb" && key == "k1" && *length == Some(7)
            })
            .returning(|_, _, _, _, _| Ok(Status::ok()));

        let status = copy_object(&src, &dst, "srcb", "destb", "k1").await.unwrap();
        assert!(status.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_delete_counts_match_enumeration() {
        let keys: Vec<String> = (0..25).map(|i| format!("k{i:02}")).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let store = seeded("b1", &refs);
        store.fail_key("k07");
        store.fail_key("k19");

        let mut reports = 0;
        let outcome = bulk_delete(&store, "b1", &BatchOptions::new(5), |_| reports += 1)
            .await
            .unwrap();

        let result = outcome.result().unwrap();
        assert_eq!(result.succeeded, 23);
        assert_eq!(result.failed, 2);
        assert_eq!(result.total(), 25);
        assert_eq!(reports, 25);
        assert_eq!(store.keys("b1"), vec!["k07", "k19"]);
    }

    #[tokio::test]
    async fn test_bulk_delete_empty_bucket() {
        let store = seeded("b1", &[]);
        let outcome = bulk_delete(&store, "b1", &BatchOptions::new(1), |_| {})
            .await
            .unwrap();
        assert_eq!(outcome, BatchOutcome::Empty);
    }

    #[tokio::test]
    async fn test_bulk_delete_requires_no_content_status() {
        let mut mock = MockObjectStore::new();
        mock.expect_list_objects()
            .returning(|_, opts| match opts.after {
                None => Ok(vec![
                    crate::traits::ListingEntry::new("a", 1),
                    crate::traits::ListingEntry::new("b", 1),
                ]),
                Some(_) => Ok(vec![]),
            });
        mock.expect_delete_object()
            .times(2)
            .returning(|_, key| {
                if key == "a" {
                    Ok(Status::no_content())
                } else {
                    Ok(Status::ok())
                }
            });

        let outcome = bulk_delete(&mock, "b1", &BatchOptions::new(1), |_| {})
            .await
            .unwrap();
        assert_eq!(
            outcome.result().unwrap(),
            BatchResult {
                succeeded: 1,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_before_any_action() {
        let store = seeded("b1", &["a", "b", "c"]);
        store.fail_listing_at(1);
        let before = store.keys("b1");

        let err = bulk_delete(&store, "b1", &BatchOptions::new(1), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(store.keys("b1"), before);
    }

    #[test]
    fn test_batch_result_record() {
        let mut result = BatchResult::default();
        result.record(true);
        result.record(false);
        result.record(true);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total(), 3);
    }
}
