//! Access-control policy documents
//!
//! Policies are synthesized from fixed templates keyed by [`CannedAcl`] and
//! always replace the target's previous policy wholesale. The owner identity
//! is discovered from the policy currently attached to the target.

use tracing::debug;

use crate::acl::CannedAcl;
use crate::error::{Error, Result};
use crate::traits::{AclTarget, ObjectStore, Status};
use crate::xml::{self, Element};

/// Namespace of `AccessControlPolicy` documents
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Namespace used for the `xsi:type` grantee attribute
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Group URI for anonymous access
pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// Permission carried by a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    FullControl,
    Read,
    Write,
    ReadAcp,
    WriteAcp,
}

impl Permission {
    pub const fn as_str(self) -> &'static str {
        match self {
            Permission::FullControl => "FULL_CONTROL",
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::ReadAcp => "READ_ACP",
            Permission::WriteAcp => "WRITE_ACP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FULL_CONTROL" => Some(Permission::FullControl),
            "READ" => Some(Permission::Read),
            "WRITE" => Some(Permission::Write),
            "READ_ACP" => Some(Permission::ReadAcp),
            "WRITE_ACP" => Some(Permission::WriteAcp),
            _ => None,
        }
    }
}

/// Recipient of a grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grantee {
    CanonicalUser {
        id: String,
        display_name: Option<String>,
    },
    Group {
        uri: String,
    },
}

impl Grantee {
    pub fn user(id: impl Into<String>) -> Self {
        Grantee::CanonicalUser {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn all_users() -> Self {
        Grantee::Group {
            uri: ALL_USERS_URI.to_string(),
        }
    }

    fn to_element(&self) -> Element {
        let base = Element::new("Grantee").attr("xmlns:xsi", XSI_NAMESPACE);
        match self {
            Grantee::CanonicalUser { id, display_name } => {
                let el = base.attr("xsi:type", "CanonicalUser").text_child("ID", id);
                match display_name {
                    Some(name) => el.text_child("DisplayName", name),
                    None => el,
                }
            }
            Grantee::Group { uri } => base.attr("xsi:type", "Group").text_child("URI", uri),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: Permission,
}

impl Grant {
    pub fn new(grantee: Grantee, permission: Permission) -> Self {
        Self {
            grantee,
            permission,
        }
    }
}

/// Owner of a bucket or item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
    pub display_name: Option<String>,
}

/// An access-control policy: owner plus an ordered grant list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub owner: Owner,
    pub grants: Vec<Grant>,
}

impl PolicyDocument {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner: Owner {
                id: owner_id.into(),
                display_name: None,
            },
            grants: Vec::new(),
        }
    }

    pub fn grant(mut self, grantee: Grantee, permission: Permission) -> Self {
        self.grants.push(Grant::new(grantee, permission));
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner.id
    }

    /// Build the `AccessControlPolicy` element tree
    pub fn to_element(&self) -> Element {
        let mut owner = Element::new("Owner").text_child("ID", &self.owner.id);
        if let Some(name) = &self.owner.display_name {
            owner = owner.text_child("DisplayName", name);
        }

        let mut acl = Element::new("AccessControlList");
        for grant in &self.grants {
            acl.push(
                Element::new("Grant")
                    .child(grant.grantee.to_element())
                    .text_child("Permission", grant.permission.as_str()),
            );
        }

        Element::new("AccessControlPolicy")
            .attr("xmlns", S3_NAMESPACE)
            .child(owner)
            .child(acl)
    }

    /// Serialize as a complete XML document
    pub fn to_xml(&self) -> Result<String> {
        xml::to_document(&self.to_element())
    }
}

/// Produce the templated policy for `level` owned by `owner_id`.
///
/// `authenticated-read` has no template and is rejected.
pub fn synthesize(level: CannedAcl, owner_id: &str) -> Result<PolicyDocument> {
    let doc = PolicyDocument::new(owner_id).grant(Grantee::user(owner_id), Permission::FullControl);

    match level {
        CannedAcl::Private => Ok(doc),
        CannedAcl::PublicRead => Ok(doc.grant(Grantee::all_users(), Permission::Read)),
        CannedAcl::PublicReadWrite => Ok(doc
            .grant(Grantee::all_users(), Permission::Read)
            .grant(Grantee::all_users(), Permission::Write)),
        CannedAcl::AuthenticatedRead => Err(Error::UnsupportedAcl(level.to_string())),
    }
}

/// Replace the policy of `target` with the template for `level`.
///
/// Reads the current policy to learn the owner, then writes the synthesized
/// document. Returns the status of the write.
pub async fn apply_canned_policy(
    store: &dyn ObjectStore,
    target: &AclTarget,
    level: CannedAcl,
) -> Result<Status> {
    if level == CannedAcl::AuthenticatedRead {
        return Err(Error::UnsupportedAcl(level.to_string()));
    }

    let current = store.get_acl(target).await?;
    let doc = synthesize(level, current.owner_id())?;
    debug!(%target, %level, owner = current.owner_id(), "Replacing access policy");

    store.put_acl(target, &doc).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_grant_counts() {
        assert_eq!(synthesize(CannedAcl::Private, "o").unwrap().grants.len(), 1);
        assert_eq!(synthesize(CannedAcl::PublicRead, "o").unwrap().grants.len(), 2);
        assert_eq!(
            synthesize(CannedAcl::PublicReadWrite, "o").unwrap().grants.len(),
            3
        );
    }

    #[test]
    fn test_public_read_write_grants() {
        let doc = synthesize(CannedAcl::PublicReadWrite, "o").unwrap();
        assert_eq!(doc.grants[0].permission, Permission::FullControl);
        assert_eq!(doc.grants[0].grantee, Grantee::user("o"));
        assert_eq!(doc.grants[1].permission, Permission::Read);
        assert_eq!(doc.grants[1].grantee, Grantee::all_users());
        assert_eq!(doc.grants[2].permission, Permission::Write);
        assert_eq!(doc.grants[2].grantee, Grantee::all_users());
    }

    #[test]
    fn test_authenticated_read_is_unsupported() {
        let err = synthesize(CannedAcl::AuthenticatedRead, "o").unwrap_err();
        assert!(matches!(err, Error::UnsupportedAcl(_)));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        for level in [
            CannedAcl::Private,
            CannedAcl::PublicRead,
            CannedAcl::PublicReadWrite,
        ] {
            let a = synthesize(level, "owner-1").unwrap().to_xml().unwrap();
            let b = synthesize(level, "owner-1").unwrap().to_xml().unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_private_document() {
        let xml = synthesize(CannedAcl::Private, "owner-1")
            .unwrap()
            .to_xml()
            .unwrap();
        insta::assert_snapshot!(xml, @r#"<?xml version="1.0" encoding="UTF-8"?><AccessControlPolicy xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Owner><ID>owner-1</ID></Owner><AccessControlList><Grant><Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="CanonicalUser"><ID>owner-1</ID></Grantee><Permission>FULL_CONTROL</Permission></Grant></AccessControlList></AccessControlPolicy>"#);
    }

    #[test]
    fn test_public_read_structure() {
        let root = synthesize(CannedAcl::PublicRead, "abc")
            .unwrap()
            .to_element();
        assert_eq!(root.attribute("xmlns"), Some(S3_NAMESPACE));
        assert_eq!(
            root.find("Owner").unwrap().find("ID").unwrap().text_content(),
            "abc"
        );

        let grants: Vec<_> = root.find("AccessControlList").unwrap().elements().collect();
        assert_eq!(grants.len(), 2);
        let group = grants[1].find("Grantee").unwrap();
        assert_eq!(group.attribute("xsi:type"), Some("Group"));
        assert_eq!(group.find("URI").unwrap().text_content(), ALL_USERS_URI);
        assert_eq!(grants[1].find("Permission").unwrap().text_content(), "READ");
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!(Permission::parse("WRITE_ACP"), Some(Permission::WriteAcp));
        assert_eq!(Permission::parse("write"), None);
    }

    #[tokio::test]
    async fn test_apply_replaces_policy_with_existing_owner() {
        let store = MemoryStore::new("owner-42");
        store.insert_bucket("b1");
        let target = AclTarget::Bucket("b1".into());

        let status = apply_canned_policy(&store, &target, CannedAcl::PublicRead)
            .await
            .unwrap();
        assert!(status.is_ok());

        let doc = store.get_acl(&target).await.unwrap();
        assert_eq!(doc, synthesize(CannedAcl::PublicRead, "owner-42").unwrap());
    }

    #[tokio::test]
    async fn test_apply_fails_when_policy_missing() {
        let store = MemoryStore::new("owner");
        let target = AclTarget::Item {
            bucket: "nope".into(),
            key: "k".into(),
        };
        let err = apply_canned_policy(&store, &target, CannedAcl::Private)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_rejects_authenticated_read_without_requests() {
        let store = MemoryStore::new("owner");
        store.insert_bucket("b1");
        let before = store.call_count();
        let err = apply_canned_policy(
            &store,
            &AclTarget::Bucket("b1".into()),
            CannedAcl::AuthenticatedRead,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAcl(_)));
        assert_eq!(store.call_count(), before);
    }
}
