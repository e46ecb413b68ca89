//! Session parameter commands: host, user, pass, bucket, threads, time, help, quit
//!
//! All but `bucket` run while disconnected.

use async_trait::async_trait;

use sh3_core::{Error, Result, TimingMode};

use super::{Command, CommandTable, Context, Flow, Line};

pub(super) fn register(table: &mut CommandTable) {
    for field in [Field::Host, Field::User, Field::Pass] {
        table.register(Box::new(Param { field }));
    }
    table.register(Box::new(Bucket));
    table.register(Box::new(Threads));
    table.register(Box::new(Time));
    table.register(Box::new(Help));
    table.register(Box::new(Quit { name: "quit" }));
    table.register(Box::new(Quit { name: "exit" }));
}

#[derive(Clone, Copy)]
enum Field {
    Host,
    User,
    Pass,
}

/// `host`, `user` and `pass`
struct Param {
    field: Field,
}

#[async_trait]
impl Command for Param {
    fn name(&self) -> &'static str {
        match self.field {
            Field::Host => "host",
            Field::User => "user",
            Field::Pass => "pass",
        }
    }

    fn usage(&self) -> &'static str {
        match self.field {
            Field::Host => "host [name]",
            Field::User => "user [access-key]",
            Field::Pass => "pass [secret-key]",
        }
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    fn needs_connection(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let slot = match self.field {
            Field::Host => &mut ctx.session.host,
            Field::User => &mut ctx.session.access_key,
            Field::Pass => &mut ctx.session.secret_key,
        };

        match line.arg(0) {
            Some(value) => *slot = Some(value.to_string()),
            None => match (slot.as_deref(), self.field) {
                (None, _) => ctx.out.error(&format!("{} is not set", self.name())),
                (Some(_), Field::Pass) => ctx.out.println("pass = ********"),
                (Some(value), _) => ctx.out.println(&format!("{} = {value}", self.name())),
            },
        }
        Ok(Flow::Continue)
    }
}

struct Bucket;

#[async_trait]
impl Command for Bucket {
    fn name(&self) -> &'static str {
        "bucket"
    }

    fn usage(&self) -> &'static str {
        "bucket [name]"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        match line.arg(0) {
            Some(name) => {
                ctx.session.bucket = Some(name.to_string());
                ctx.out.println(&format!("Bucket set to '{name}'"));
            }
            None => {
                let bucket = ctx.session.require_bucket()?;
                ctx.out.println(&format!("bucket = {bucket}"));
            }
        }
        Ok(Flow::Continue)
    }
}

struct Threads;

#[async_trait]
impl Command for Threads {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn usage(&self) -> &'static str {
        "threads [n]"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    fn needs_connection(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        if let Some(arg) = line.arg(0) {
            let threads = arg
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("'{arg}' is not a number")))?;
            ctx.session.set_threads(threads)?;
        }
        ctx.out
            .println(&format!("threads = {}", ctx.session.threads()));
        Ok(Flow::Continue)
    }
}

struct Time;

#[async_trait]
impl Command for Time {
    fn name(&self) -> &'static str {
        "time"
    }

    fn usage(&self) -> &'static str {
        "time [none|long|all]"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    fn needs_connection(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        if let Some(arg) = line.arg(0) {
            ctx.session.timing = arg.parse::<TimingMode>()?;
        }
        ctx.out.println(&format!("time = {}", ctx.session.timing));
        Ok(Flow::Continue)
    }
}

struct Help;

#[async_trait]
impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn usage(&self) -> &'static str {
        "help"
    }

    fn arity(&self) -> (usize, usize) {
        (0, 0)
    }

    fn needs_connection(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &mut Context<'_>, _line: &Line) -> Result<Flow> {
        ctx.out.println("Commands:");
        for command in ctx.commands.iter() {
            ctx.out.println(&format!("  {}", command.usage()));
        }
        ctx.out
            .println("Access levels: private, public-read, public-read-write, authenticated-read");
        Ok(Flow::Continue)
    }
}

struct Quit {
    name: &'static str,
}

#[async_trait]
impl Command for Quit {
    fn name(&self) -> &'static str {
        self.name
    }

    fn usage(&self) -> &'static str {
        self.name
    }

    fn arity(&self) -> (usize, usize) {
        (0, 0)
    }

    fn needs_connection(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &mut Context<'_>, _line: &Line) -> Result<Flow> {
        ctx.out.println("Goodbye");
        Ok(Flow::Quit)
    }
}
