//! Shell commands
//!
//! Every command is a value implementing [`Command`], registered by name in a
//! [`CommandTable`]. The dispatcher looks the first word of a line up in the
//! table, applies connection gating and the arity check, then calls
//! [`Command::execute`] with a [`Context`] borrowing the session.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use sh3_core::{AclTarget, Connector, Error, ObjectStore, Result, Session, Status};

use crate::output::{Formatter, OutputConfig};

mod acl;
mod cat;
mod cp;
mod head;
mod ls;
mod mb;
mod put;
mod rb;
mod rm;
mod session;

/// Whether the read loop goes on after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One tokenized input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    raw: String,
    name: String,
    args: Vec<String>,
}

impl Line {
    /// Split on whitespace; `None` for a blank line
    pub fn parse(raw: &str) -> Option<Self> {
        let mut words = raw.split_whitespace().map(str::to_string);
        let name = words.next()?;
        Some(Self {
            raw: raw.trim_end_matches(['\r', '\n']).to_string(),
            name,
            args: words.collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Text of the line after the command name and the first `skip` arguments,
    /// with its inner spacing preserved
    pub fn rest(&self, skip: usize) -> &str {
        let mut rest = self.raw.trim_start();
        for _ in 0..=skip {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            rest = rest[end..].trim_start();
        }
        rest
    }
}

/// Everything a command may touch while it runs
pub struct Context<'a> {
    pub session: &'a mut Session,
    pub out: &'a mut Formatter,
    pub output: OutputConfig,
    pub connector: &'a dyn Connector,
    pub commands: &'a CommandTable,
    /// Page limit for enumerations made by bulk commands
    pub page_size: Option<i32>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl<'a> Context<'a> {
    pub fn new(
        session: &'a mut Session,
        out: &'a mut Formatter,
        output: OutputConfig,
        connector: &'a dyn Connector,
        commands: &'a CommandTable,
    ) -> Self {
        Self {
            session,
            out,
            output,
            connector,
            commands,
            page_size: None,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Option<Arc<dyn ObjectStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_page_size(mut self, page_size: Option<i32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// The session account's store
    pub fn store(&self) -> Result<Arc<dyn ObjectStore>> {
        self.store.clone().ok_or(Error::NotConnected)
    }

    /// The active bucket, owned so the session can be mutated afterwards
    pub fn bucket(&self) -> Result<String> {
        self.session.require_bucket().map(str::to_string)
    }

    /// A store for a second account on the session host
    pub async fn connect_as(&self, access_key: &str, secret_key: &str) -> Result<Arc<dyn ObjectStore>> {
        let credentials = self
            .session
            .credentials_for(access_key, secret_key)
            .ok_or(Error::NotConnected)?;
        self.connector.connect(&credentials).await
    }
}

/// A shell command
#[async_trait]
pub trait Command: Send + Sync {
    /// Name typed at the prompt
    fn name(&self) -> &'static str;

    /// Argument synopsis shown in usage errors and help
    fn usage(&self) -> &'static str;

    /// Accepted argument counts, inclusive
    fn arity(&self) -> (usize, usize);

    /// Commands that may run before host and keys are set return `false`
    fn needs_connection(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow>;

    fn usage_error(&self) -> Error {
        Error::Usage(self.usage().to_string())
    }

    fn accepts(&self, count: usize) -> bool {
        let (min, max) = self.arity();
        (min..=max).contains(&count)
    }
}

/// Name-to-command lookup table
pub struct CommandTable {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl CommandTable {
    pub fn empty() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| &**c)
    }

    /// Commands in name order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|c| &**c)
    }

    /// Every command the shell understands
    pub fn standard() -> Self {
        let mut table = Self::empty();
        session::register(&mut table);
        cat::register(&mut table);
        put::register(&mut table);
        rm::register(&mut table);
        cp::register(&mut table);
        ls::register(&mut table);
        head::register(&mut table);
        acl::register(&mut table);
        mb::register(&mut table);
        rb::register(&mut table);
        table
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Turn a write status the caller does not accept into an error
pub(crate) fn check_status(status: Status, accept: fn(&Status) -> bool) -> Result<()> {
    if accept(&status) {
        Ok(())
    } else {
        Err(Error::Remote {
            status: status.code,
            message: status.message,
        })
    }
}

/// Resolve a `{bucket|item} <id>` argument pair; `None` for an unknown kind.
///
/// Items live in the active bucket, so `item` fails when no bucket is set.
pub(crate) fn resolve_target(ctx: &Context<'_>, kind: &str, id: &str) -> Option<Result<AclTarget>> {
    match kind {
        "bucket" => Some(Ok(AclTarget::Bucket(id.to_string()))),
        "item" => Some(ctx.bucket().map(|bucket| AclTarget::Item {
            bucket,
            key: id.to_string(),
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_parse() {
        let line = Line::parse("  copy  k1 src   dst ").unwrap();
        assert_eq!(line.name(), "copy");
        assert_eq!(line.args(), ["k1", "src", "dst"]);
        assert_eq!(line.arg(1), Some("src"));
        assert!(line.arg(3).is_none());
        assert!(Line::parse("   ").is_none());
    }

    #[test]
    fn test_line_rest_keeps_spacing() {
        let line = Line::parse("put k1 hello   big  world\n").unwrap();
        assert_eq!(line.rest(1), "hello   big  world");
        assert_eq!(line.rest(0), "k1 hello   big  world");
        assert_eq!(Line::parse("put k1").unwrap().rest(1), "");
    }

    #[test]
    fn test_standard_table_names() {
        let table = CommandTable::standard();
        for name in [
            "bucket",
            "copy",
            "copyall",
            "count",
            "createbucket",
            "delete",
            "deleteall",
            "deletebucket",
            "exit",
            "get",
            "getacl",
            "getfile",
            "getfilez",
            "gettorrent",
            "head",
            "help",
            "host",
            "list",
            "listatom",
            "listbuckets",
            "listrss",
            "pass",
            "put",
            "putdir",
            "putdirwacl",
            "putfile",
            "putfilecontenttype",
            "putfilewacl",
            "putfilez",
            "putfilezwacl",
            "quit",
            "setacl",
            "threads",
            "time",
            "user",
        ] {
            assert!(table.get(name).is_some(), "missing {name}");
        }
        assert_eq!(table.iter().count(), 35);
    }

    #[test]
    fn test_offline_allow_list() {
        let table = CommandTable::standard();
        let offline: Vec<_> = table
            .iter()
            .filter(|c| !c.needs_connection())
            .map(|c| c.name())
            .collect();
        assert_eq!(
            offline,
            vec!["exit", "help", "host", "pass", "quit", "threads", "time", "user"]
        );
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(Status::ok(), Status::is_ok).is_ok());
        let err = check_status(Status::ok(), Status::is_no_content).unwrap_err();
        assert_eq!(err.to_string(), "OK (200)");
    }

    #[test]
    fn test_arity_bounds() {
        let table = CommandTable::standard();
        let put = table.get("put").unwrap();
        assert!(!put.accepts(1));
        assert!(put.accepts(2));
        assert!(put.accepts(40));

        let get = table.get("get").unwrap();
        assert!(get.accepts(1));
        assert!(!get.accepts(0));
        assert!(!get.accepts(2));
    }
}
