//! ObjectStore trait definition
//!
//! This trait is the storage-client seam of the shell. The engine treats it
//! as an opaque capability; the S3 adapter and the in-memory store implement it.

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::acl::CannedAcl;
use crate::error::Result;
use crate::policy::PolicyDocument;

/// HTTP status code for a successful read or write
pub const STATUS_OK: u16 = 200;

/// HTTP status code for a successful delete
pub const STATUS_NO_CONTENT: u16 = 204;

/// Streamed object payload
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Object payload stream with the size the service reported for it
pub struct ObjectStream {
    pub reader: ObjectReader,

    /// Content length in bytes, when known
    pub length: Option<u64>,
}

/// Object or bucket metadata, keyed by header name
pub type Metadata = BTreeMap<String, String>;

/// One entry of an object listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size_bytes: i64,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// Owner display name, when the service reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_display_name: Option<String>,
}

impl ListingEntry {
    pub fn new(key: impl Into<String>, size_bytes: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes,
            last_modified: None,
            owner_display_name: None,
        }
    }
}

/// A bucket as reported by `list_buckets`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<Timestamp>,
}

/// Options for one list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with this prefix
    pub prefix: Option<String>,

    /// Only keys strictly greater than this cursor
    pub after: Option<String>,

    /// Maximum number of entries in the page
    pub limit: Option<i32>,
}

/// Options for object uploads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub acl: Option<CannedAcl>,
}

/// Status line returned by write operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    pub message: String,
}

impl Status {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(STATUS_OK, "OK")
    }

    pub fn no_content() -> Self {
        Self::new(STATUS_NO_CONTENT, "No Content")
    }

    /// Success for reads and writes
    pub fn is_ok(&self) -> bool {
        self.code == STATUS_OK
    }

    /// Success for deletes
    pub fn is_no_content(&self) -> bool {
        self.code == STATUS_NO_CONTENT
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Target of a policy read or write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclTarget {
    Bucket(String),
    Item { bucket: String, key: String },
}

impl fmt::Display for AclTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AclTarget::Bucket(bucket) => write!(f, "{bucket}"),
            AclTarget::Item { bucket, key } => write!(f, "{bucket}/{key}"),
        }
    }
}

/// Host and key pair needed to reach the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Trait for S3-compatible storage operations
///
/// Reads return their payload or an error; writes return the service
/// [`Status`] so callers decide what counts as success.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List buckets owned by the credentials
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// Fetch one listing page, ordered by key
    async fn list_objects(&self, bucket: &str, options: &ListOptions)
    -> Result<Vec<ListingEntry>>;

    /// Get object content as bytes
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Get object content as a stream
    async fn get_object_reader(&self, bucket: &str, key: &str) -> Result<ObjectStream>;

    /// Get the torrent file describing an object
    async fn get_torrent(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Store bytes under a key
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<Status>;

    /// Store a stream under a key
    async fn put_object_reader(
        &self,
        bucket: &str,
        key: &str,
        reader: ObjectReader,
        length: Option<u64>,
        options: &PutOptions,
    ) -> Result<Status>;

    /// Delete one object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<Status>;

    /// Object metadata
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Metadata>;

    /// Bucket metadata
    async fn head_bucket(&self, bucket: &str) -> Result<Metadata>;

    /// Read the policy attached to a bucket or item
    async fn get_acl(&self, target: &AclTarget) -> Result<PolicyDocument>;

    /// Replace the policy attached to a bucket or item
    async fn put_acl(&self, target: &AclTarget, policy: &PolicyDocument) -> Result<Status>;

    /// Create a bucket, optionally with a canned policy
    async fn create_bucket(&self, bucket: &str, acl: Option<CannedAcl>) -> Result<Status>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, bucket: &str) -> Result<Status>;
}

/// Builds a store for a set of credentials
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStore>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(Status::ok().is_ok());
        assert!(!Status::ok().is_no_content());
        assert!(Status::no_content().is_no_content());
        assert!(!Status::new(404, "Not Found").is_ok());
        assert_eq!(Status::no_content().to_string(), "204 No Content");
    }

    #[test]
    fn test_acl_target_display() {
        assert_eq!(AclTarget::Bucket("b".into()).to_string(), "b");
        let item = AclTarget::Item {
            bucket: "b".into(),
            key: "k/1".into(),
        };
        assert_eq!(item.to_string(), "b/k/1");
    }

    #[test]
    fn test_listing_entry_new() {
        let entry = ListingEntry::new("a.txt", 12);
        assert_eq!(entry.key, "a.txt");
        assert_eq!(entry.size_bytes, 12);
        assert!(entry.owner_display_name.is_none());
    }
}
