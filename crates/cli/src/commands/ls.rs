//! Listings: list, listrss, listatom, count, listbuckets

use async_trait::async_trait;
use jiff::Timestamp;

use sh3_core::{Error, FeedFormat, ListingEntry, Paginator, Result, build_feed};

use super::{Command, CommandTable, Context, Flow, Line};

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(List { feed: None }));
    table.register(Box::new(List {
        feed: Some(FeedFormat::Rss),
    }));
    table.register(Box::new(List {
        feed: Some(FeedFormat::Atom),
    }));
    table.register(Box::new(Count));
    table.register(Box::new(ListBuckets));
}

/// Prefix argument; `*` stands for every key
fn prefix_arg(arg: Option<&str>) -> Option<String> {
    arg.filter(|p| *p != "*").map(str::to_string)
}

/// Plain listing, or an RSS/Atom feed of the active bucket
struct List {
    feed: Option<FeedFormat>,
}

#[async_trait]
impl Command for List {
    fn name(&self) -> &'static str {
        match self.feed {
            None => "list",
            Some(FeedFormat::Rss) => "listrss",
            Some(FeedFormat::Atom) => "listatom",
        }
    }

    fn usage(&self) -> &'static str {
        match self.feed {
            None => "list [prefix] [max]",
            Some(FeedFormat::Rss) => "listrss [prefix] [max]",
            Some(FeedFormat::Atom) => "listatom [prefix] [max]",
        }
    }

    fn arity(&self) -> (usize, usize) {
        (0, 2)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let prefix = prefix_arg(line.arg(0));
        let max = match line.arg(1) {
            Some(arg) => arg.parse::<usize>().map_err(|_| self.usage_error())?,
            None => 0,
        };
        let page_limit = if max > 0 {
            Some(i32::try_from(max).unwrap_or(i32::MAX))
        } else {
            ctx.page_size
        };

        let store = ctx.store()?;
        let entries = Paginator::new(store.as_ref(), bucket.as_str())
            .prefix(prefix)
            .page_limit(page_limit)
            .max_count(Some(max))
            .collect()
            .await?;

        match self.feed {
            None => {
                ctx.out.println(&format!("Item list for bucket '{bucket}'"));
                for entry in &entries {
                    ctx.out.println(&listing_line(entry));
                }
            }
            Some(format) => {
                let host = ctx.session.host.as_deref().ok_or(Error::NotConnected)?;
                let document = build_feed(format, host, &bucket, &entries, Timestamp::now())?;
                ctx.out.write_raw(document.as_bytes());
            }
        }
        Ok(Flow::Continue)
    }
}

fn listing_line(entry: &ListingEntry) -> String {
    let modified = entry
        .last_modified
        .map(|ts| ts.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "key={}, owner={}, size={} bytes, last modified={modified}",
        entry.key,
        entry.owner_display_name.as_deref().unwrap_or("unknown"),
        entry.size_bytes,
    )
}

struct Count;

#[async_trait]
impl Command for Count {
    fn name(&self) -> &'static str {
        "count"
    }

    fn usage(&self) -> &'static str {
        "count [prefix]"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let store = ctx.store()?;
        let count = Paginator::new(store.as_ref(), bucket.as_str())
            .prefix(prefix_arg(line.arg(0)))
            .page_limit(ctx.page_size)
            .count()
            .await?;

        ctx.out.println(&format!("{count} item(s)"));
        Ok(Flow::Continue)
    }
}

struct ListBuckets;

#[async_trait]
impl Command for ListBuckets {
    fn name(&self) -> &'static str {
        "listbuckets"
    }

    fn usage(&self) -> &'static str {
        "listbuckets"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 0)
    }

    async fn execute(&self, ctx: &mut Context<'_>, _line: &Line) -> Result<Flow> {
        let store = ctx.store()?;
        for bucket in store.list_buckets().await? {
            let created = bucket
                .creation_time
                .map(|ts| ts.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            ctx.out.println(&format!("{} - {created}", bucket.name));
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_wildcard() {
        assert_eq!(prefix_arg(Some("*")), None);
        assert_eq!(prefix_arg(Some("logs/")), Some("logs/".to_string()));
        assert_eq!(prefix_arg(None), None);
    }

    #[test]
    fn test_listing_line() {
        let mut entry = ListingEntry::new("a.txt", 12);
        assert_eq!(
            listing_line(&entry),
            "key=a.txt, owner=unknown, size=12 bytes, last modified=unknown"
        );

        entry.owner_display_name = Some("alice".into());
        entry.last_modified = Some("2024-05-01T10:00:00Z".parse().unwrap());
        assert_eq!(
            listing_line(&entry),
            "key=a.txt, owner=alice, size=12 bytes, last modified=2024-05-01T10:00:00Z"
        );
    }
}
