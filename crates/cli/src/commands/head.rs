//! head command - Show bucket or item metadata

use async_trait::async_trait;

use sh3_core::{AclTarget, Result};

use super::{Command, CommandTable, Context, Flow, Line, resolve_target};

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(Head));
}

struct Head;

#[async_trait]
impl Command for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    fn usage(&self) -> &'static str {
        "head {bucket|item} <id>"
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

        let metadata = match &target {
            AclTarget::Bucket(bucket) => store.head_bucket(bucket).await?,
            AclTarget::Item { bucket, key } => store.head_object(bucket, key).await?,
        };

        ctx.out.println(&format!("Metadata for {kind} '{target}'"));
        ctx.out.json(&metadata);
        Ok(Flow::Continue)
    }
}
