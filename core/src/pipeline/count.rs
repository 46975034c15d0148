use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};

/// Counts lines that contain anything besides whitespace.
pub async fn count_non_empty_lines(path: &Path) -> std::io::Result<u64> {
    let file = tokio::fs::File::open(path).await?;
    let mut segments = BufReader::new(file).split(b'\n');
    let mut count = 0u64;
    while let Some(seg) = segments.next_segment().await? {
        if seg.iter().any(|b| !b.is_ascii_whitespace()) {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("puzzles.epd");
        std::fs::write(&path, "a\n\n   \r\nb\nc").unwrap();
        assert_eq!(count_non_empty_lines(&path).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(count_non_empty_lines(&dir.path().join("none.epd"))
            .await
            .is_err());
    }
}
