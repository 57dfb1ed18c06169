//! Append-only, timestamped log file shared by a plugin's handlers.

use std::path::{Path, PathBuf};

use {
    time::{OffsetDateTime, format_description::well_known::Rfc3339},
    tokio::{fs::File, io::AsyncWriteExt, sync::Mutex},
};

/// Each entry is written as one `"<RFC 3339 UTC timestamp> <entry>"` line and
/// is durable on disk before `write` returns.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, entry: &str) -> std::io::Result<()> {
        let ts = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(std::io::Error::other)?;
        let line = format!("{ts} {}\n", entry.trim_end_matches('\n'));

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_timestamped_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("math.log");
        std::fs::write(&path, "existing line\n").unwrap();

        let sink = LogSink::open(&path).await.unwrap();
        sink.write("sum 1+2=3").await.unwrap();
        sink.write("product 3*4=12\n").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing line");

        let (ts, entry) = lines[1].split_once(' ').unwrap();
        assert!(OffsetDateTime::parse(ts, &Rfc3339).is_ok(), "{ts}");
        assert_eq!(entry, "sum 1+2=3");
        assert!(lines[2].ends_with(" product 3*4=12"));
    }

    #[tokio::test]
    async fn open_fails_for_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(LogSink::open(tmp.path()).await.is_err());
        assert!(LogSink::open(tmp.path().join("missing/dir/math.log")).await.is_err());
    }
}
