//! sh3-core: engine of the sh3 object-storage shell
//!
//! This crate provides everything the shell needs that is independent of a
//! particular storage SDK:
//! - Session state and configuration
//! - The `ObjectStore` trait, plus an in-memory implementation behind the
//!   `testing` feature
//! - Listing pagination and bulk copy/delete
//! - Access-policy synthesis and RSS/Atom feed generation
//! - Runtime formatting

pub mod acl;
pub mod batch;
pub mod config;
pub mod error;
pub mod feed;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod paginate;
pub mod policy;
pub mod session;
pub mod timing;
pub mod traits;
pub mod xml;

pub use acl::CannedAcl;
pub use batch::{BatchOptions, BatchOutcome, BatchResult, ItemReport, bulk_copy, bulk_delete};
pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use feed::{FeedFormat, build_feed};
#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryConnector, MemoryStore};
pub use paginate::Paginator;
pub use policy::{PolicyDocument, apply_canned_policy, synthesize};
pub use session::Session;
pub use timing::{TimingMode, format_runtime};
pub use traits::{
    AclTarget, BucketInfo, Connector, Credentials, ListOptions, ListingEntry, Metadata,
    ObjectReader, ObjectStore, ObjectStream, PutOptions, Status,
};
