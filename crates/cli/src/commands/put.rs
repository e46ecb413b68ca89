//! Object uploads: put, putfile and its variants, putdir, putdirwacl

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use futures::stream::{self, StreamExt};
use tracing::debug;

use sh3_core::{BatchResult, CannedAcl, Error, ObjectStore, PutOptions, Result, Status};

use super::{Command, CommandTable, Context, Flow, Line, check_status};

/// Largest object a single upload may carry
pub const MAX_FILE_SIZE: u64 = 5_368_709_120;

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(Put));
    for (name, usage, compressed, extra) in [
        ("putfile", "putfile <id> <file>", false, Extra::None),
        ("putfilez", "putfilez <id> <file>", true, Extra::None),
        ("putfilewacl", "putfilewacl <id> <file> <level>", false, Extra::Acl),
        ("putfilezwacl", "putfilezwacl <id> <file> <level>", true, Extra::Acl),
        (
            "putfilecontenttype",
            "putfilecontenttype <id> <file> <type>",
            false,
            Extra::ContentType,
        ),
    ] {
        table.register(Box::new(PutFile {
            name,
            usage,
            compressed,
            extra,
        }));
    }
    table.register(Box::new(PutDir { with_acl: false }));
    table.register(Box::new(PutDir { with_acl: true }));
}

/// Store the rest of the line as an object
struct Put;

#[async_trait]
impl Command for Put {
    fn name(&self) -> &'static str {
        "put"
    }

    fn usage(&self) -> &'static str {
        "put <id> <data...>"
    }

    fn arity(&self) -> (usize, usize) {
        (2, usize::MAX)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let id = line.arg(0).ok_or_else(|| self.usage_error())?;
        let data = line.rest(1).as_bytes().to_vec();
        let store = ctx.store()?;

        let status = store
            .put_object(&bucket, id, data, &PutOptions::default())
            .await?;
        check_status(status, Status::is_ok)?;

        ctx.out.println(&format!("Stored item '{bucket}/{id}'"));
        Ok(Flow::Continue)
    }
}

/// Third argument of a putfile variant
#[derive(Clone, Copy, PartialEq, Eq)]
enum Extra {
    None,
    Acl,
    ContentType,
}

struct PutFile {
    name: &'static str,
    usage: &'static str,
    compressed: bool,
    extra: Extra,
}

#[async_trait]
impl Command for PutFile {
    fn name(&self) -> &'static str {
        self.name
    }

    fn usage(&self) -> &'static str {
        self.usage
    }

    fn arity(&self) -> (usize, usize) {
        match self.extra {
            Extra::None => (2, 2),
            Extra::Acl | Extra::ContentType => (3, 3),
        }
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let (Some(id), Some(file)) = (line.arg(0), line.arg(1)) else {
            return Err(self.usage_error());
        };

        let mut options = PutOptions::default();
        match (self.extra, line.arg(2)) {
            (Extra::None, _) => {}
            (Extra::Acl, Some(level)) => options.acl = Some(level.parse::<CannedAcl>()?),
            (Extra::ContentType, Some(ct)) => options.content_type = Some(ct.to_string()),
            (_, None) => return Err(self.usage_error()),
        }

        let store = ctx.store()?;
        let status = upload_file(store.as_ref(), &bucket, id, Path::new(file), self.compressed, options)
            .await?;
        check_status(status, Status::is_ok)?;

        ctx.out.println(&format!("Stored item '{bucket}/{id}'"));
        Ok(Flow::Continue)
    }
}

/// Upload every regular file of a directory under its file name
struct PutDir {
    with_acl: bool,
}

#[async_trait]
impl Command for PutDir {
    fn name(&self) -> &'static str {
        if self.with_acl { "putdirwacl" } else { "putdir" }
    }

    fn usage(&self) -> &'static str {
        if self.with_acl {
            "putdirwacl <dir> <level>"
        } else {
            "putdir <dir>"
        }
    }

    fn arity(&self) -> (usize, usize) {
        if self.with_acl { (2, 2) } else { (1, 1) }
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let dir = line.arg(0).ok_or_else(|| self.usage_error())?;

        let mut options = PutOptions::default();
        if self.with_acl {
            let level = line.arg(1).ok_or_else(|| self.usage_error())?;
            options.acl = Some(level.parse::<CannedAcl>()?);
        }

        let files = regular_files(Path::new(dir)).await?;
        if files.is_empty() {
            ctx.out.println(&format!("No files in directory '{dir}'"));
            return Ok(Flow::Continue);
        }

        let store = ctx.store()?;
        let store = store.as_ref();
        let (bucket_ref, options_ref) = (bucket.as_str(), &options);

        let mut uploads = stream::iter(files)
            .map(|(key, path)| async move {
                let result = upload_file(store, bucket_ref, &key, &path, false, options_ref.clone())
                    .await
                    .and_then(|status| check_status(status, Status::is_ok));
                (key, result)
            })
            .buffer_unordered(ctx.session.threads());

        let mut result = BatchResult::default();
        while let Some((key, outcome)) = uploads.next().await {
            debug!(key = %key, ok = outcome.is_ok(), "Upload finished");
            result.record(outcome.is_ok());
            match outcome {
                Ok(()) => ctx.out.println(&format!("Stored item '{bucket}/{key}'")),
                Err(e) => ctx.out.error(&format!("could not store '{key}': {e}")),
            }
        }

        ctx.out.println(&format!(
            "Stored {} item(s), could not store {} item(s)",
            result.succeeded, result.failed
        ));
        Ok(Flow::Continue)
    }
}

/// Regular files directly inside `dir`, sorted by name, keyed by file name
async fn regular_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

/// Upload one local file; zlib-compress it first when asked
async fn upload_file(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    path: &Path,
    compressed: bool,
    mut options: PutOptions,
) -> Result<Status> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not a regular file",
            path.display()
        )));
    }
    if meta.len() > MAX_FILE_SIZE {
        return Err(Error::InvalidArgument(format!(
            "'{}' is larger than {MAX_FILE_SIZE} bytes",
            path.display()
        )));
    }

    if compressed {
        let data = tokio::fs::read(path).await?;
        return store.put_object(bucket, key, deflate(&data)?, &options).await;
    }

    if options.content_type.is_none() {
        options.content_type = mime_guess::from_path(path).first_raw().map(str::to_string);
    }
    let file = tokio::fs::File::open(path).await?;
    store
        .put_object_reader(bucket, key, Box::pin(file), Some(meta.len()), &options)
        .await
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
