//! Conversion between policy documents and SDK ACL types

use aws_sdk_s3::types::{
    AccessControlPolicy, Grant as SdkGrant, Grantee as SdkGrantee, Owner as SdkOwner,
    Permission as SdkPermission, Type,
};
use tracing::debug;

use sh3_core::policy::{Grant, Grantee, Owner, Permission};
use sh3_core::{Error, PolicyDocument, Result};

/// Read a policy from an ACL response
pub fn policy_from_sdk(owner: Option<&SdkOwner>, grants: &[SdkGrant]) -> Result<PolicyDocument> {
    let owner = owner
        .and_then(|o| {
            o.id().map(|id| Owner {
                id: id.to_string(),
                display_name: o.display_name().map(str::to_string),
            })
        })
        .ok_or_else(|| Error::General("access policy has no owner".into()))?;

    let grants = grants
        .iter()
        .filter_map(|grant| {
            let grantee = grant.grantee().and_then(grantee_from_sdk);
            let permission = grant
                .permission()
                .and_then(|p| Permission::parse(p.as_str()));
            match (grantee, permission) {
                (Some(grantee), Some(permission)) => Some(Grant::new(grantee, permission)),
                _ => {
                    debug!(?grant, "Skipping unrepresentable grant");
                    None
                }
            }
        })
        .collect();

    Ok(PolicyDocument { owner, grants })
}

fn grantee_from_sdk(grantee: &SdkGrantee) -> Option<Grantee> {
    match grantee.r#type() {
        Type::CanonicalUser => Some(Grantee::CanonicalUser {
            id: grantee.id()?.to_string(),
            display_name: grantee.display_name().map(str::to_string),
        }),
        Type::Group => Some(Grantee::Group {
            uri: grantee.uri()?.to_string(),
        }),
        _ => None,
    }
}

/// Build the SDK request body for a policy
pub fn policy_to_sdk(policy: &PolicyDocument) -> Result<AccessControlPolicy> {
    let owner = SdkOwner::builder()
        .id(&policy.owner.id)
        .set_display_name(policy.owner.display_name.clone())
        .build();

    let grants = policy
        .grants
        .iter()
        .map(|grant| {
            let grantee = match &grant.grantee {
                Grantee::CanonicalUser { id, display_name } => SdkGrantee::builder()
                    .r#type(Type::CanonicalUser)
                    .id(id)
                    .set_display_name(display_name.clone())
                    .build(),
                Grantee::Group { uri } => SdkGrantee::builder().r#type(Type::Group).uri(uri).build(),
            }
            .map_err(|e| Error::General(e.to_string()))?;

            Ok(SdkGrant::builder()
                .grantee(grantee)
                .permission(SdkPermission::from(grant.permission.as_str()))
                .build())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AccessControlPolicy::builder()
        .owner(owner)
        .set_grants(Some(grants))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sh3_core::{CannedAcl, synthesize};

    #[test]
    fn test_policy_round_trips_through_sdk_types() {
        let doc = synthesize(CannedAcl::PublicReadWrite, "owner-1").unwrap();
        let sdk = policy_to_sdk(&doc).unwrap();

        assert_eq!(sdk.owner().and_then(|o| o.id()), Some("owner-1"));
        assert_eq!(sdk.grants().len(), 3);
        assert_eq!(
            sdk.grants()[2].permission(),
            Some(&SdkPermission::Write)
        );

        let back = policy_from_sdk(sdk.owner(), sdk.grants()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_missing_owner_is_an_error() {
        assert!(policy_from_sdk(None, &[]).is_err());
    }

    #[test]
    fn test_email_grantees_are_skipped() {
        let owner = SdkOwner::builder().id("o").build();
        let email = SdkGrant::builder()
            .grantee(
                SdkGrantee::builder()
                    .r#type(Type::AmazonCustomerByEmail)
                    .email_address("a@example.com")
                    .build()
                    .unwrap(),
            )
            .permission(SdkPermission::Read)
            .build();

        let doc = policy_from_sdk(Some(&owner), &[email]).unwrap();
        assert_eq!(doc.owner_id(), "o");
        assert!(doc.grants.is_empty());
    }
}
