use crate::client::part::{PartBody, PartNumber};
use crate::error::{ErrorRepr, Result};

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Reads a file sequentially in chunks of a fixed size, numbering each chunk
/// with the next part number.
///
/// Every chunk is exactly `part_size` bytes except the last one, which holds
/// what remains. A zero-length file yields one empty part. Read errors are
/// reported against `path`.
#[derive(Debug)]
pub(crate) struct PartReader<R = BufReader<File>> {
    path: PathBuf,
    inner: R,
    part_size: usize,
    part_number: PartNumber,
    bytes_read: u64,
    eof: bool,
}

impl PartReader {
    /// Open `path` for reading parts of `part_size` bytes.
    pub(crate) async fn open(path: &Path, part_size: usize) -> Result<Self> {
        let file = File::open(path)
            .await
            .map_err(ErrorRepr::from_io_err(path))?;
        let meta = file.metadata().await.map_err(ErrorRepr::from_io_err(path))?;
        if !meta.is_file() {
            let e = io::Error::new(io::ErrorKind::InvalidInput, "not a regular file");
            return Err(ErrorRepr::from_io_err(path)(e).into());
        }

        Ok(Self::new(path, BufReader::new(file), part_size))
    }
}

impl<R: AsyncRead + Unpin> PartReader<R> {
    /// Read parts of `part_size` bytes from `inner`, the open file at `path`.
    pub(crate) fn new(path: &Path, inner: R, part_size: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            inner,
            part_size: part_size.max(1),
            part_number: PartNumber::default(),
            bytes_read: 0,
            eof: false,
        }
    }

    /// Read the next part, or `None` when the file is exhausted.
    pub(crate) async fn next_part(&mut self) -> Result<Option<(PartNumber, PartBody)>> {
        if self.eof {
            return Ok(None);
        }

        let mut body = PartBody::with_capacity(self.part_size);
        while body.size() < self.part_size {
            let remaining = (self.part_size - body.size()) as u64;
            let n = (&mut self.inner)
                .take(remaining)
                .read_buf(&mut *body)
                .await
                .map_err(ErrorRepr::from_io_err(&self.path))?;
            if n == 0 {
                self.eof = true;
                break;
            }
        }

        // The first part of an empty file is still sent.
        if body.is_empty() && self.bytes_read > 0 {
            return Ok(None);
        }
        self.bytes_read += body.size() as u64;
        Ok(Some((self.part_number.increment(), body)))
    }

    /// Total bytes read so far.
    pub(crate) fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// Yields its bytes, then fails every read.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct FailingRead(&'static [u8]);

#[cfg(test)]
impl FailingRead {
    pub(crate) fn new(data: &'static [u8]) -> Self {
        Self(data)
    }
}

#[cfg(test)]
impl AsyncRead for FailingRead {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        if self.0.is_empty() {
            return std::task::Poll::Ready(Err(io::Error::other("device went away")));
        }
        let n = self.0.len().min(buf.remaining());
        buf.put_slice(&self.0[..n]);
        self.0 = &self.0[n..];
        std::task::Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    async fn read_all(data: &[u8], part_size: usize) -> Vec<(i32, Vec<u8>)> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        let mut reader = PartReader::open(file.path(), part_size).await.unwrap();

        let mut parts = Vec::new();
        while let Some((n, body)) = reader.next_part().await.unwrap() {
            parts.push((*n, body.to_vec()));
        }
        assert_eq!(reader.bytes_read(), data.len() as u64);
        parts
    }

    #[tokio::test]
    async fn last_part_holds_the_remainder() {
        let data = (0..12u8).collect::<Vec<_>>();
        let parts = read_all(&data, 5).await;
        let sizes = parts.iter().map(|(_, b)| b.len()).collect::<Vec<_>>();
        let numbers = parts.iter().map(|(n, _)| *n).collect::<Vec<_>>();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(numbers, vec![1, 2, 3]);
        let joined = parts.into_iter().flat_map(|(_, b)| b).collect::<Vec<_>>();
        assert_eq!(joined, data);
    }

    #[tokio::test]
    async fn exact_multiple_has_no_trailing_empty_part() {
        let parts = read_all(&[7u8; 10], 5).await;
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|(_, b)| b.len() == 5));
    }

    #[tokio::test]
    async fn small_file_is_one_part() {
        let parts = read_all(b"abc", 5).await;
        assert_eq!(parts, vec![(1, b"abc".to_vec())]);
    }

    #[tokio::test]
    async fn empty_file_is_one_empty_part() {
        let parts = read_all(b"", 5).await;
        assert_eq!(parts, vec![(1, Vec::new())]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = PartReader::open(&dir.path().join("missing.json"), 5)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = PartReader::open(dir.path(), 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn read_error_is_not_found_after_full_parts() {
        let path = Path::new("broken.json");
        let mut reader = PartReader::new(path, FailingRead::new(b"0123456"), 5);

        let (n, body) = reader.next_part().await.unwrap().unwrap();
        assert_eq!((*n, body.size()), (1, 5));
        let err = reader.next_part().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(reader.bytes_read(), 5);
    }
}
