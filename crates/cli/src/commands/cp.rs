//! Object copies: copy, copyall
//!
//! Both commands copy between buckets under the same key, streaming each
//! object from the source into the destination. A trailing access key and
//! secret key pair makes the destination a second account on the same host.

use std::sync::Arc;

use async_trait::async_trait;

use sh3_core::batch::copy_object;
use sh3_core::{BatchOptions, BatchOutcome, ItemReport, ObjectStore, Result, Status, bulk_copy};

use super::{Command, CommandTable, Context, Flow, Line, check_status};

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(Copy));
    table.register(Box::new(CopyAll));
}

/// Destination store: the session account unless a key pair follows the buckets
async fn destination(ctx: &Context<'_>, keys: &[String]) -> Result<Arc<dyn ObjectStore>> {
    match keys {
        [] => ctx.store(),
        [access_key, secret_key] => ctx.connect_as(access_key, secret_key).await,
        _ => Err(sh3_core::Error::InvalidArgument(
            "a second account needs both an access key and a secret key".into(),
        )),
    }
}

struct Copy;

#[async_trait]
impl Command for Copy {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn usage(&self) -> &'static str {
        "copy <id> <src> <dst> [user] [pass]"
    }

    fn arity(&self) -> (usize, usize) {
        (3, 5)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let [id, src_bucket, dst_bucket, keys @ ..] = line.args() else {
            return Err(self.usage_error());
        };
        if keys.len() == 1 {
            return Err(self.usage_error());
        }

        let src = ctx.store()?;
        let dst = destination(ctx, keys).await?;

        let status = copy_object(src.as_ref(), dst.as_ref(), src_bucket, dst_bucket, id).await?;
        check_status(status, Status::is_ok)?;

        ctx.out
            .println(&format!("Copied '{src_bucket}/{id}' to '{dst_bucket}/{id}'"));
        Ok(Flow::Continue)
    }
}

/// Copy every item of one bucket, optionally under a prefix, into another
struct CopyAll;

/// Split `copyall` arguments into prefix, buckets and optional key pair
fn split_copyall_args(args: &[String]) -> Option<(Option<&str>, &str, &str, &[String])> {
    match args {
        [src, dst] => Some((None, src.as_str(), dst.as_str(), &[])),
        [prefix, src, dst] => Some((Some(prefix.as_str()), src.as_str(), dst.as_str(), &[])),
        [src, dst, _, _] => Some((None, src.as_str(), dst.as_str(), &args[2..])),
        [prefix, src, dst, _, _] => Some((
            Some(prefix.as_str()),
            src.as_str(),
            dst.as_str(),
            &args[3..],
        )),
        _ => None,
    }
}

#[async_trait]
impl Command for CopyAll {
    fn name(&self) -> &'static str {
        "copyall"
    }

    fn usage(&self) -> &'static str {
        "copyall [prefix] <src> <dst> [user] [pass]"
    }

    fn arity(&self) -> (usize, usize) {
        (2, 5)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let (prefix, src_bucket, dst_bucket, keys) =
            split_copyall_args(line.args()).ok_or_else(|| self.usage_error())?;

        let src = ctx.store()?;
        let dst = destination(ctx, keys).await?;
        let options = BatchOptions::new(ctx.session.threads())
            .prefix(prefix.map(str::to_string))
            .page_limit(ctx.page_size);

        let out = &mut *ctx.out;
        let outcome = bulk_copy(
            src.as_ref(),
            dst.as_ref(),
            src_bucket,
            dst_bucket,
            &options,
            |item: &ItemReport| match &item.outcome {
                Ok(()) => out.println(&format!(
                    "Copied '{src_bucket}/{key}' to '{dst_bucket}/{key}'",
                    key = item.key
                )),
                Err(reason) => out.error(&format!(
                    "could not copy '{src_bucket}/{}': {reason}",
                    item.key
                )),
            },
        )
        .await?;

        match outcome {
            BatchOutcome::Empty => ctx
                .out
                .println(&format!("No items to copy in bucket '{src_bucket}'")),
            BatchOutcome::Completed(result) => ctx.out.println(&format!(
                "Copied {} item(s), could not copy {} item(s)",
                result.succeeded, result.failed
            )),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_split_copyall_args() {
        let a = args(&["src", "dst"]);
        assert_eq!(split_copyall_args(&a), Some((None, "src", "dst", &[][..])));

        let a = args(&["logs/", "src", "dst"]);
        assert_eq!(split_copyall_args(&a).unwrap().0, Some("logs/"));

        let a = args(&["src", "dst", "ak", "sk"]);
        let (prefix, src, dst, keys) = split_copyall_args(&a).unwrap();
        assert_eq!((prefix, src, dst), (None, "src", "dst"));
        assert_eq!(keys, ["ak", "sk"]);

        let a = args(&["p", "src", "dst", "ak", "sk"]);
        let (prefix, _, _, keys) = split_copyall_args(&a).unwrap();
        assert_eq!(prefix, Some("p"));
        assert_eq!(keys.len(), 2);

        assert!(split_copyall_args(&args(&["only"])).is_none());
    }
}
