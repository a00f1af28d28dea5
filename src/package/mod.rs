//! Artifact packaging
//!
//! Reads the built binary once. A [`HashingReader`] sits between the file and
//! the gzip encoder, so the SHA-256 in the release record is computed over
//! exactly the bytes that went into the compressed package.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use flate2::{Compression, GzBuilder};
use sha2::{Digest, Sha256};
use tracing::info;

use distkit_protocol::{ReleaseKey, ReleaseRecord};

/// Packaging failures
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to compress {path}: {source}")]
    Compress {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Record(#[from] distkit_protocol::ProtocolError),
}

/// Reader adapter that hashes everything read through it
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    len: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            len: 0,
        }
    }

    /// Bytes read so far and their digest
    pub fn finish(self) -> (u64, [u8; 32]) {
        (self.len, self.hasher.finalize().into())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }
}

/// A built binary ready for upload
#[derive(Debug, Clone)]
pub struct PackagedArtifact {
    /// Size of the uncompressed binary
    pub size: u64,
    pub sha256: [u8; 32],
    /// Gzip stream whose payload hashes to `sha256`
    pub compressed: Vec<u8>,
    /// Storage object key (`{name}-{version}-{os}-{arch}.gz`)
    pub storage_key: String,
}

impl PackagedArtifact {
    pub fn sha256_hex(&self) -> String {
        hex::encode(self.sha256)
    }

    /// Registry record for this artifact
    pub fn record(&self) -> Result<ReleaseRecord, PackagingError> {
        Ok(ReleaseRecord::new(self.sha256.to_vec())?)
    }
}

/// Fingerprint and compress `binary` for `key`.
pub fn package(binary: &Path, key: &ReleaseKey) -> Result<PackagedArtifact, PackagingError> {
    let path = binary.display().to_string();
    let file = File::open(binary).map_err(|source| PackagingError::Open {
        path: path.clone(),
        source,
    })?;

    let (size, sha256, compressed) =
        compress(file, &key.release_name()).map_err(|source| PackagingError::Compress {
            path: path.clone(),
            source,
        })?;

    let artifact = PackagedArtifact {
        size,
        sha256,
        compressed,
        storage_key: key.package_key(),
    };
    info!(
        binary = %path,
        size = artifact.size,
        compressed = artifact.compressed.len(),
        sha256 = %artifact.sha256_hex(),
        "packaged"
    );
    Ok(artifact)
}

fn compress<R: Read>(source: R, internal_name: &str) -> io::Result<(u64, [u8; 32], Vec<u8>)> {
    let mut reader = HashingReader::new(source);
    let mut encoder = GzBuilder::new()
        .filename(internal_name)
        .write(Vec::new(), Compression::best());
    io::copy(&mut reader, &mut encoder)?;
    encoder.flush()?;
    let compressed = encoder.finish()?;
    let (size, digest) = reader.finish();
    Ok((size, digest, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    fn key() -> ReleaseKey {
        ReleaseKey::new("widget", "1.2.3", "linux-amd64".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_hashing_reader_counts_and_hashes() {
        let mut reader = HashingReader::new(&b"hello"[..]);
        let mut sink = Vec::new();
        reader.read_to_end(&mut sink).unwrap();
        let (len, digest) = reader.finish();
        assert_eq!(len, 5);
        assert_eq!(
            hex::encode(digest),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_package_digest_matches_payload() {
        let tmp = tempfile::tempdir().unwrap();
        let binary = tmp.path().join("widget");
        let contents: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        std::fs::write(&binary, &contents).unwrap();

        let artifact = package(&binary, &key()).unwrap();

        assert_eq!(artifact.size, contents.len() as u64);
        assert_eq!(artifact.storage_key, "widget-1.2.3-linux-amd64.gz");
        assert!(artifact.compressed.len() < contents.len());

        let mut decoder = GzDecoder::new(&artifact.compressed[..]);
        let mut payload = Vec::new();
        decoder.read_to_end(&mut payload).unwrap();
        assert_eq!(payload, contents);
        assert_eq!(Sha256::digest(&payload).as_slice(), &artifact.sha256[..]);

        let header = decoder.header().unwrap();
        assert_eq!(header.filename(), Some(&b"widget-1.2.3"[..]));
    }

    #[test]
    fn test_record_carries_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let binary = tmp.path().join("widget");
        std::fs::write(&binary, b"hello").unwrap();

        let record = package(&binary, &key()).unwrap().record().unwrap();
        assert_eq!(
            record.sha256_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_missing_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let err = package(&tmp.path().join("nope"), &key()).unwrap_err();
        assert!(matches!(err, PackagingError::Open { .. }));
    }
}
