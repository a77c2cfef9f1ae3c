//! Append-only JSON-lines streams.
//!
//! Writers append one compact JSON document per line. Readers skip blank and
//! malformed lines with a warning; a torn final line from an interrupted
//! writer never makes the stream unreadable.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::domain::Result;

/// Append `record` as one line, creating the file and its parents.
pub async fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}

/// Parse every well-formed line of `path`. A missing file is empty.
///
/// Lines are split on raw bytes, so a line that is not UTF-8 is skipped like
/// any other malformed line.
pub async fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match tokio::fs::read(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (index, line) in content.split(|b| *b == b'\n').enumerate() {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                path = %path.display(),
                line = index + 1,
                error = %e,
                "skipping malformed jsonl line"
            ),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        n: u32,
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/rows.jsonl");
        append(&path, &Row { n: 1 }).await.unwrap();
        append(&path, &Row { n: 2 }).await.unwrap();

        let rows: Vec<Row> = read_all(&path).await.unwrap();
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 2 }]);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        std::fs::write(&path, "{\"n\":1}\nnot json\n\n{\"n\":3}\n{\"n\":").unwrap();

        let rows: Vec<Row> = read_all(&path).await.unwrap();
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 3 }]);
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        let mut bytes = b"{\"n\":1}\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"{\"n\":2}\r\n");
        std::fs::write(&path, bytes).unwrap();

        let rows: Vec<Row> = read_all(&path).await.unwrap();
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 2 }]);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Row> = read_all(&dir.path().join("none.jsonl")).await.unwrap();
        assert!(rows.is_empty());
    }
}
