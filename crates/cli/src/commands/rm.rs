//! Object removal: delete, deleteall

use async_trait::async_trait;

use sh3_core::{BatchOptions, BatchOutcome, ItemReport, Result, Status, bulk_delete};

use super::{Command, CommandTable, Context, Flow, Line, check_status};
use crate::output::ProgressBar;

/// Successful deletions between two progress updates
pub const DELETES_PER_TICK: usize = 10;

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(Delete));
    table.register(Box::new(DeleteAll));
}

struct Delete;

#[async_trait]
impl Command for Delete {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn usage(&self) -> &'static str {
        "delete <id>"
    }

    fn arity(&self) -> (usize, usize) {
        (1, 1)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let id = line.arg(0).ok_or_else(|| self.usage_error())?;
        let store = ctx.store()?;

        let status = store.delete_object(&bucket, id).await?;
        check_status(status, Status::is_no_content)?;

        ctx.out.println(&format!("Deleted '{bucket}/{id}'"));
        Ok(Flow::Continue)
    }
}

/// Delete every item of the active bucket, optionally under a prefix
struct DeleteAll;

#[async_trait]
impl Command for DeleteAll {
    fn name(&self) -> &'static str {
        "deleteall"
    }

    fn usage(&self) -> &'static str {
        "deleteall [prefix]"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let store = ctx.store()?;
        let options = BatchOptions::new(ctx.session.threads())
            .prefix(line.arg(0).map(str::to_string))
            .page_limit(ctx.page_size);

        let progress = ProgressBar::counter(ctx.output, "Deleting");
        let out = &mut *ctx.out;
        let mut deleted = 0usize;

        let outcome = bulk_delete(store.as_ref(), &bucket, &options, |item: &ItemReport| {
            match &item.outcome {
                Ok(()) => {
                    deleted += 1;
                    if deleted % DELETES_PER_TICK == 0 {
                        progress.set_position(deleted as u64);
                    }
                }
                Err(reason) => {
                    out.error(&format!("could not delete '{bucket}/{}': {reason}", item.key));
                }
            }
        })
        .await;
        progress.finish_and_clear();

        match outcome? {
            BatchOutcome::Empty => ctx.out.println(&format!("No items in bucket '{bucket}'")),
            BatchOutcome::Completed(result) => ctx.out.println(&format!(
                "Deleted {} item(s), could not delete {} item(s)",
                result.succeeded, result.failed
            )),
        }
        Ok(Flow::Continue)
    }
}
