//! Read loop and dispatcher
//!
//! The shell reads one line at a time, applies connection gating, looks the
//! command up, checks its arity, runs the command to completion and
//! renders any error as one `Error: ...` line. Command errors never end the
//! loop; only `quit`, end of input, or a failed read or write do.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use sh3_core::{Connector, Credentials, Error, ObjectStore, Result, Session, format_runtime};

use crate::commands::{CommandTable, Context, Flow, Line};
use crate::output::{Formatter, OutputConfig};

/// Interactive object-storage shell
pub struct Shell {
    session: Session,
    connector: Box<dyn Connector>,
    commands: CommandTable,
    out: Formatter,
    output: OutputConfig,
    page_size: Option<i32>,
    /// Store for the credentials it was built from
    connection: Option<(Credentials, Arc<dyn ObjectStore>)>,
}

impl Shell {
    pub fn new(session: Session, connector: Box<dyn Connector>, out: Formatter) -> Self {
        Self {
            session,
            connector,
            commands: CommandTable::standard(),
            out,
            output: OutputConfig::default(),
            page_size: None,
            connection: None,
        }
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Page limit used by bulk commands
    pub fn with_page_size(mut self, page_size: Option<i32>) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until `quit`, end of input, or an unrecoverable I/O failure
    pub async fn run<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.out
            .println(&format!("Welcome to sh3 {}", env!("CARGO_PKG_VERSION")));
        self.out.println("Type 'help' for command list.");

        let mut lines = input.lines();
        loop {
            self.out.prompt(&self.session.prompt);
            self.check_output()?;

            let Some(raw) = lines.next_line().await? else {
                debug!("End of input");
                break;
            };
            let flow = self.dispatch(&raw).await;
            self.check_output()?;
            if flow == Flow::Quit {
                break;
            }
        }

        self.out.flush();
        self.check_output()
    }

    /// Execute one input line and write its response
    pub async fn dispatch(&mut self, raw: &str) -> Flow {
        let Some(line) = Line::parse(raw) else {
            return Flow::Continue;
        };

        let (result, elapsed) = self.execute(&line).await;

        let flow = match result {
            Ok(flow) => flow,
            Err(e) => {
                debug!(command = line.name(), error = ?e, "Command failed");
                self.out.error(&e.to_string());
                Flow::Continue
            }
        };

        if let Some(elapsed) = elapsed
            && self.session.timing.should_report(elapsed)
        {
            self.out
                .println(&format!("[runtime: {}]", format_runtime(elapsed)));
        }
        flow
    }

    /// Run a parsed line; the duration is set only when the command itself ran
    async fn execute(&mut self, line: &Line) -> (Result<Flow>, Option<Duration>) {
        let command = self.commands.get(line.name());
        // Disconnected, only the offline commands get past this point
        if !self.session.is_connected() && !command.is_some_and(|c| !c.needs_connection()) {
            return (Err(Error::NotConnected), None);
        }
        let Some(command) = command else {
            return (Err(Error::UnknownCommand(line.name().to_string())), None);
        };
        if !command.accepts(line.args().len()) {
            return (Err(command.usage_error()), None);
        }

        let store = if command.needs_connection() {
            match connect(&self.session, self.connector.as_ref(), &mut self.connection).await {
                Ok(store) => Some(store),
                Err(e) => return (Err(e), None),
            }
        } else {
            None
        };

        debug!(command = line.name(), args = line.args().len(), "Dispatching");
        let mut ctx = Context::new(
            &mut self.session,
            &mut self.out,
            self.output,
            self.connector.as_ref(),
            &self.commands,
        )
        .with_store(store)
        .with_page_size(self.page_size);

        let started = Instant::now();
        let result = command.execute(&mut ctx, line).await;
        let elapsed = started.elapsed();
        debug!(command = line.name(), elapsed_ms = elapsed.as_millis() as u64, "Command finished");
        (result, Some(elapsed))
    }

    fn check_output(&mut self) -> Result<()> {
        match self.out.take_error() {
            Some(e) => Err(Error::Io(e)),
            None => Ok(()),
        }
    }
}

/// Store for the session credentials, reusing the cached one while they are unchanged
async fn connect(
    session: &Session,
    connector: &dyn Connector,
    cache: &mut Option<(Credentials, Arc<dyn ObjectStore>)>,
) -> Result<Arc<dyn ObjectStore>> {
    let credentials = session.credentials().ok_or(Error::NotConnected)?;
    if let Some((cached, store)) = cache.as_ref()
        && *cached == credentials
    {
        return Ok(Arc::clone(store));
    }

    info!(host = %credentials.host, "Connecting");
    let store = connector.connect(&credentials).await?;
    *cache = Some((credentials, Arc::clone(&store)));
    Ok(store)
}
