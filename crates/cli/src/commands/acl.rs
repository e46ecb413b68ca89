//! Access policies: getacl, setacl

use async_trait::async_trait;

use sh3_core::{CannedAcl, Result, Status, apply_canned_policy};

use super::{Command, CommandTable, Context, Flow, Line, check_status, resolve_target};

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(GetAcl));
    table.register(Box::new(SetAcl));
}

/// Print the policy document of a bucket or item
struct GetAcl;

#[async_trait]
impl Command for GetAcl {
    fn name(&self) -> &'static str {
        "getacl"
    }

    fn usage(&self) -> &'static str {
        "getacl {bucket|item} <id>"
    }

    fn arity(&self) -> (usize, usize) {
        (2, 2)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let (Some(kind), Some(id)) = (line.arg(0), line.arg(1)) else {
            return Err(self.usage_error());
        };
        let target = resolve_target(ctx, kind, id).ok_or_else(|| self.usage_error())??;
        let store = ctx.store()?;

        let policy = store.get_acl(&target).await?;
        ctx.out.println(&policy.to_xml()?);
        Ok(Flow::Continue)
    }
}

/// Replace the policy of a bucket or item with a canned template
struct SetAcl;

#[async_trait]
impl Command for SetAcl {
    fn name(&self) -> &'static str {
        "setacl"
    }

    fn usage(&self) -> &'static str {
        "setacl {bucket|item} <id> <level>"
    }

    fn arity(&self) -> (usize, usize) {
        (3, 3)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let (Some(kind), Some(id), Some(level)) = (line.arg(0), line.arg(1), line.arg(2)) else {
            return Err(self.usage_error());
        };
        let level = level.parse::<CannedAcl>()?;
        let target = resolve_target(ctx, kind, id).ok_or_else(|| self.usage_error())??;
        let store = ctx.store()?;

        let status = apply_canned_policy(store.as_ref(), &target, level).await?;
        check_status(status, Status::is_ok)?;

        ctx.out
            .println(&format!("Set ACL for {kind} '{target}' to {level}"));
        Ok(Flow::Continue)
    }
}
