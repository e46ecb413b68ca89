//! In-memory ObjectStore
//!
//! A self-contained backend that behaves like the service for the parts the
//! shell relies on: ordered listings with `after` cursors, 204 deletes, and
//! per-target policies. It counts every trait call and can inject failures,
//! which makes it the backend of choice for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::io::AsyncReadExt;

use crate::acl::CannedAcl;
use crate::error::{Error, Result};
use crate::policy::{self, Grantee, Permission, PolicyDocument};
use crate::traits::{
    AclTarget, BucketInfo, Connector, Credentials, ListOptions, ListingEntry, Metadata,
    ObjectReader, ObjectStore, ObjectStream, PutOptions, Status,
};

/// Page limit applied when a list request does not carry one
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: Option<String>,
    modified: Timestamp,
    policy: PolicyDocument,
}

#[derive(Debug, Clone)]
struct StoredBucket {
    created: Timestamp,
    policy: PolicyDocument,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, StoredBucket>,
    failing_keys: HashSet<String>,
    failing_page: Option<usize>,
    pages_served: usize,
}

#[derive(Debug)]
struct Inner {
    owner: String,
    page_size: usize,
    calls: AtomicUsize,
    state: Mutex<State>,
}

/// Shared handle to an in-memory object store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store whose policies are owned by `owner`
    pub fn new(owner: impl Into<String>) -> Self {
        Self::with_page_size(owner, DEFAULT_PAGE_LIMIT)
    }

    /// Create a store that never returns more than `page_size` entries per list call
    pub fn with_page_size(owner: impl Into<String>, page_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                owner: owner.into(),
                page_size: page_size.max(1),
                calls: AtomicUsize::new(0),
                state: Mutex::new(State::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_call(&self) {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn canned(&self, acl: Option<CannedAcl>) -> PolicyDocument {
        let owner = self.inner.owner.as_str();
        match acl {
            Some(CannedAcl::AuthenticatedRead) => PolicyDocument::new(owner)
                .grant(Grantee::user(owner), Permission::FullControl)
                .grant(
                    Grantee::Group {
                        uri: AUTHENTICATED_USERS_URI.to_string(),
                    },
                    Permission::Read,
                ),
            Some(level) => policy::synthesize(level, owner)
                .unwrap_or_else(|_| PolicyDocument::new(owner)),
            None => PolicyDocument::new(owner).grant(Grantee::user(owner), Permission::FullControl),
        }
    }

    /// Number of `ObjectStore` calls served so far
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Create a bucket without counting a call
    pub fn insert_bucket(&self, bucket: &str) {
        let policy = self.canned(None);
        self.state()
            .buckets
            .entry(bucket.to_string())
            .or_insert_with(|| StoredBucket {
                created: Timestamp::now(),
                policy,
                objects: BTreeMap::new(),
            });
    }

    /// Store an object without counting a call; creates the bucket if needed
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.insert_bucket(bucket);
        let policy = self.canned(None);
        if let Some(b) = self.state().buckets.get_mut(bucket) {
            b.objects.insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    content_type: None,
                    modified: Timestamp::now(),
                    policy,
                },
            );
        }
    }

    /// Current content of an object
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state()
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| o.data.clone())
    }

    /// Content type recorded for an object
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.state()
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .and_then(|o| o.content_type.clone())
    }

    /// Sorted keys of a bucket
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.state()
            .buckets
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.state().buckets.contains_key(bucket)
    }

    /// Make every read, write and delete of `key` fail
    pub fn fail_key(&self, key: &str) {
        self.state().failing_keys.insert(key.to_string());
    }

    /// Make the `page`-th list call (zero based) fail
    pub fn fail_listing_at(&self, page: usize) {
        let mut state = self.state();
        state.failing_page = Some(page);
        state.pages_served = 0;
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if self.state().failing_keys.contains(key) {
            Err(Error::Network(format!("injected failure for '{key}'")))
        } else {
            Ok(())
        }
    }

    fn store(&self, bucket: &str, key: &str, data: Vec<u8>, options: &PutOptions) -> Result<Status> {
        if self.state().failing_keys.contains(key) {
            return Ok(Status::new(500, "Internal Server Error"));
        }
        let policy = self.canned(options.acl);
        let mut state = self.state();
        let b = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))?;
        b.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: options.content_type.clone(),
                modified: Timestamp::now(),
                policy,
            },
        );
        Ok(Status::ok())
    }

    fn find<T>(
        &self,
        bucket: &str,
        key: &str,
        f: impl FnOnce(&StoredObject) -> T,
    ) -> Result<T> {
        self.check_key(key)?;
        let state = self.state();
        let b = state
            .buckets
            .get(bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))?;
        b.objects
            .get(key)
            .map(f)
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{key}")))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        self.record_call();
        Ok(self
            .state()
            .buckets
            .iter()
            .map(|(name, b)| BucketInfo {
                name: name.clone(),
                creation_time: Some(b.created),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        options: &ListOptions,
    ) -> Result<Vec<ListingEntry>> {
        self.record_call();
        let mut state = self.state();

        let page = state.pages_served;
        state.pages_served += 1;
        if state.failing_page == Some(page) {
            return Err(Error::Network(format!("injected listing failure on page {page}")));
        }

        let limit = options
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(self.inner.page_size);

        let b = state
            .buckets
            .get(bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))?;

        let owner = self.inner.owner.clone();
        Ok(b.objects
            .iter()
            .filter(|(key, _)| options.prefix.as_deref().is_none_or(|p| key.starts_with(p)))
            .filter(|(key, _)| options.after.as_deref().is_none_or(|a| key.as_str() > a))
            .take(limit)
            .map(|(key, o)| ListingEntry {
                key: key.clone(),
                size_bytes: o.data.len() as i64,
                last_modified: Some(o.modified),
                owner_display_name: Some(owner.clone()),
            })
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.record_call();
        self.find(bucket, key, |o| o.data.clone())
    }

    async fn get_object_reader(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
        self.record_call();
        let data = self.find(bucket, key, |o| o.data.clone())?;
        Ok(ObjectStream {
            length: Some(data.len() as u64),
            reader: Box::pin(std::io::Cursor::new(data)),
        })
    }

    async fn get_torrent(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.record_call();
        let length = self.find(bucket, key, |o| o.data.len())?;
        Ok(format!("d6:lengthi{length}e4:name{}:{key}e", key.len()).into_bytes())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<Status> {
        self.record_call();
        self.store(bucket, key, data, options)
    }

    async fn put_object_reader(
        &self,
        bucket: &str,
        key: &str,
        mut reader: ObjectReader,
        _length: Option<u64>,
        options: &PutOptions,
    ) -> Result<Status> {
        self.record_call();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.store(bucket, key, data, options)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<Status> {
        self.record_call();
        let mut state = self.state();
        if state.failing_keys.contains(key) {
            return Ok(Status::new(403, "Forbidden"));
        }
        let b = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))?;
        b.objects.remove(key);
        Ok(Status::no_content())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Metadata> {
        self.record_call();
        self.find(bucket, key, |o| {
            let mut meta = Metadata::new();
            meta.insert("Content-Length".into(), o.data.len().to_string());
            meta.insert(
                "Content-Type".into(),
                o.content_type
                    .clone()
                    .unwrap_or_else(|| "binary/octet-stream".into()),
            );
            meta.insert("Last-Modified".into(), o.modified.to_string());
            meta
        })
    }

    async fn head_bucket(&self, bucket: &str) -> Result<Metadata> {
        self.record_call();
        let state = self.state();
        let b = state
            .buckets
            .get(bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))?;
        let mut meta = Metadata::new();
        meta.insert("Creation-Date".into(), b.created.to_string());
        meta.insert("Object-Count".into(), b.objects.len().to_string());
        Ok(meta)
    }

    async fn get_acl(&self, target: &AclTarget) -> Result<PolicyDocument> {
        self.record_call();
        match target {
            AclTarget::Bucket(bucket) => self
                .state()
                .buckets
                .get(bucket)
                .map(|b| b.policy.clone())
                .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}"))),
            AclTarget::Item { bucket, key } => self.find(bucket, key, |o| o.policy.clone()),
        }
    }

    async fn put_acl(&self, target: &AclTarget, policy: &PolicyDocument) -> Result<Status> {
        self.record_call();
        let mut state = self.state();
        let slot = match target {
            AclTarget::Bucket(bucket) => state.buckets.get_mut(bucket).map(|b| &mut b.policy),
            AclTarget::Item { bucket, key } => state
                .buckets
                .get_mut(bucket)
                .and_then(|b| b.objects.get_mut(key))
                .map(|o| &mut o.policy),
        };
        match slot {
            Some(slot) => {
                *slot = policy.clone();
                Ok(Status::ok())
            }
            None => Err(Error::NotFound(target.to_string())),
        }
    }

    async fn create_bucket(&self, bucket: &str, acl: Option<CannedAcl>) -> Result<Status> {
        self.record_call();
        let policy = self.canned(acl);
        let mut state = self.state();
        if state.buckets.contains_key(bucket) {
            return Ok(Status::new(409, "Conflict"));
        }
        state.buckets.insert(
            bucket.to_string(),
            StoredBucket {
                created: Timestamp::now(),
                policy,
                objects: BTreeMap::new(),
            },
        );
        Ok(Status::ok())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<Status> {
        self.record_call();
        let mut state = self.state();
        let empty = match state.buckets.get(bucket) {
            None => return Ok(Status::new(404, "Not Found")),
            Some(b) => b.objects.is_empty(),
        };
        if !empty {
            return Ok(Status::new(409, "Conflict"));
        }
        state.buckets.remove(bucket);
        Ok(Status::no_content())
    }
}

/// Connector handing out in-memory stores keyed by access key
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    default: MemoryStore,
    accounts: HashMap<String, MemoryStore>,
    connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Every access key resolves to `store` unless registered with [`Self::with_account`]
    pub fn new(store: MemoryStore) -> Self {
        Self {
            default: store,
            accounts: HashMap::new(),
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_account(mut self, access_key: impl Into<String>, store: MemoryStore) -> Self {
        self.accounts.insert(access_key.into(), store);
        self
    }

    /// Number of connections handed out
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let store = self
            .accounts
            .get(&credentials.access_key)
            .unwrap_or(&self.default)
            .clone();
        Ok(Arc::new(store))
    }
}
