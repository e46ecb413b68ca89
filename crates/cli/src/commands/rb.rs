//! deletebucket command - Delete the active bucket

use async_trait::async_trait;

use sh3_core::{Result, Status};

use super::{Command, CommandTable, Context, Flow, Line, check_status};

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(DeleteBucket));
}

struct DeleteBucket;

#[async_trait]
impl Command for DeleteBucket {
    fn name(&self) -> &'static str {
        "deletebucket"
    }

    fn usage(&self) -> &'static str {
        "deletebucket"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 0)
    }

    async fn execute(&self, ctx: &mut Context<'_>, _line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let store = ctx.store()?;

        let status = store.delete_bucket(&bucket).await?;
        check_status(status, Status::is_no_content)?;

        ctx.session.bucket = None;
        ctx.out.println(&format!("Deleted bucket '{bucket}'"));
        Ok(Flow::Continue)
    }
}
