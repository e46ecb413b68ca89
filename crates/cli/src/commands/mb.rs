//! createbucket command - Create the active bucket

use async_trait::async_trait;
use tracing::debug;

use sh3_core::{CannedAcl, Result, Status};

use super::{Command, CommandTable, Context, Flow, Line, check_status};

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(CreateBucket));
}

struct CreateBucket;

#[async_trait]
impl Command for CreateBucket {
    fn name(&self) -> &'static str {
        "createbucket"
    }

    fn usage(&self) -> &'static str {
        "createbucket [level]"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        // Every canned level goes to the service as a header, including
        // authenticated-read which has no local template.
        let acl = line.arg(0).map(str::parse::<CannedAcl>).transpose()?;
        let store = ctx.store()?;

        debug!(bucket = %bucket, acl = ?acl, "Creating bucket");
        let status = store.create_bucket(&bucket, acl).await?;
        check_status(status, Status::is_ok)?;

        ctx.out.println(&format!("Created bucket '{bucket}'"));
        Ok(Flow::Continue)
    }
}
