//! Object retrieval: get, getfile, getfilez, gettorrent

use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use flate2::read::ZlibDecoder;
use tokio::io::AsyncWriteExt;

use sh3_core::{Error, Result};

use super::{Command, CommandTable, Context, Flow, Line};

pub(super) fn register(table: &mut CommandTable) {
    table.register(Box::new(Get));
    table.register(Box::new(GetFile { compressed: false }));
    table.register(Box::new(GetFile { compressed: true }));
    table.register(Box::new(GetTorrent));
}

/// Print an object as text
struct Get;

#[async_trait]
impl Command for Get {
    fn name(&self) -> &'static str {
        "get"
    }

    fn usage(&self) -> &'static str {
        "get <id>"
    }

    fn arity(&self) -> (usize, usize) {
        (1, 1)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let id = line.arg(0).ok_or_else(|| self.usage_error())?;
        let store = ctx.store()?;

        match store.get_object(&bucket, id).await {
            Ok(data) => ctx.out.write_raw(&data),
            Err(Error::NotFound(_)) => ctx.out.println(&format!("Item '{id}' not found")),
            Err(e) => return Err(e),
        }
        Ok(Flow::Continue)
    }
}

/// Save an object to a local file, optionally inflating zlib data
struct GetFile {
    compressed: bool,
}

#[async_trait]
impl Command for GetFile {
    fn name(&self) -> &'static str {
        if self.compressed { "getfilez" } else { "getfile" }
    }

    fn usage(&self) -> &'static str {
        if self.compressed {
            "getfilez <id> <file>"
        } else {
            "getfile <id> <file>"
        }
    }

    fn arity(&self) -> (usize, usize) {
        (2, 2)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let (Some(id), Some(file)) = (line.arg(0), line.arg(1)) else {
            return Err(self.usage_error());
        };
        let store = ctx.store()?;

        if self.compressed {
            let data = store.get_object(&bucket, id).await?;
            tokio::fs::write(file, inflate(&data)?).await?;
        } else {
            let mut stream = store.get_object_reader(&bucket, id).await?;
            let mut target = tokio::fs::File::create(file).await?;
            tokio::io::copy(&mut stream.reader, &mut target).await?;
            target.flush().await?;
        }

        ctx.out
            .println(&format!("Got item '{bucket}/{id}' as '{file}'"));
        Ok(Flow::Continue)
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::General(format!("could not decompress item: {e}")))?;
    Ok(out)
}

/// Save the torrent of an object as `<id>.torrent`
struct GetTorrent;

#[async_trait]
impl Command for GetTorrent {
    fn name(&self) -> &'static str {
        "gettorrent"
    }

    fn usage(&self) -> &'static str {
        "gettorrent <id>"
    }

    fn arity(&self) -> (usize, usize) {
        (1, 1)
    }

    async fn execute(&self, ctx: &mut Context<'_>, line: &Line) -> Result<Flow> {
        let bucket = ctx.bucket()?;
        let id = line.arg(0).ok_or_else(|| self.usage_error())?;
        let store = ctx.store()?;

        let torrent = store.get_torrent(&bucket, id).await?;
        let name = torrent_file_name(id);
        tokio::fs::write(&name, torrent).await?;

        ctx.out.println(&format!("Got torrent '{name}'"));
        Ok(Flow::Continue)
    }
}

/// Local file name for a torrent; keys with slashes keep only their last segment
fn torrent_file_name(id: &str) -> String {
    let base = Path::new(id)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(id);
    format!("{base}.torrent")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    #[test]
    fn test_inflate() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello hello hello").unwrap();
        let packed = encoder.finish().unwrap();
        assert_eq!(inflate(&packed).unwrap(), b"hello hello hello");
    }

    #[test]
    fn test_inflate_rejects_plain_data() {
        assert!(inflate(b"not zlib").is_err());
    }

    #[test]
    fn test_torrent_file_name() {
        assert_eq!(torrent_file_name("song.mp3"), "song.mp3.torrent");
        assert_eq!(torrent_file_name("music/song.mp3"), "song.mp3.torrent");
    }
}
