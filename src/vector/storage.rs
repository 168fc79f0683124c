//! Persisted corpus artifacts: embedding vectors plus clip metadata.
//!
//! The offline embedding job writes one artifact directory per content
//! type. Each directory holds two files:
//!
//! - `vectors.bin` — binary vector payload, memory-mapped on load:
//!   header (16 bytes: magic, version, dimension, count) followed by
//!   contiguous little-endian f32 data, row-major, one row per clip.
//! - `metadata.json` — `{"filenames": [...], "file_paths": [...]}`,
//!   positionally aligned with the vector rows.
//!
//! Artifacts are read-only at serving time; a reindex re-reads them from
//! disk and swaps in a freshly built index.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::MmapOptions;
use serde::{Deserialize, Serialize};

use crate::vector::types::{VectorDimension, VectorError};

/// Current artifact format version.
const ARTIFACT_VERSION: u32 = 1;

/// Size of the vectors.bin header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes identifying audio embedding vector files.
const MAGIC_BYTES: &[u8; 4] = b"AVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// File name of the binary vector payload inside an artifact directory.
pub const VECTORS_FILE: &str = "vectors.bin";

/// File name of the metadata sidecar inside an artifact directory.
pub const METADATA_FILE: &str = "metadata.json";

/// One indexed audio clip: stable identity plus its embedding vector.
#[derive(Debug, Clone)]
pub struct CorpusItem {
    /// Display name, typically the bare file name.
    pub filename: String,
    /// Path of the source audio file, relative to the audio root or
    /// absolute. Used to build the serving URL.
    pub source_path: String,
    /// Embedding vector. Normalized to unit length when the index is
    /// built, not necessarily on disk.
    pub embedding: Vec<f32>,
}

/// A fully loaded artifact directory.
#[derive(Debug)]
pub struct CorpusArtifacts {
    pub dimension: VectorDimension,
    pub items: Vec<CorpusItem>,
}

/// Metadata sidecar schema. Arrays are positionally aligned with the
/// vector rows in `vectors.bin`.
#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    filenames: Vec<String>,
    #[serde(default)]
    file_paths: Vec<String>,
}

/// Loads corpus artifacts from a directory.
///
/// Validates the header (magic, version, payload size) and the positional
/// alignment between vectors and metadata. When `file_paths` is shorter
/// than `filenames`, the filename doubles as the path (flat corpus layout).
pub fn load_artifacts(dir: &Path) -> Result<CorpusArtifacts, VectorError> {
    let vectors_path = dir.join(VECTORS_FILE);
    let metadata_path = dir.join(METADATA_FILE);

    if !vectors_path.exists() {
        return Err(VectorError::Storage(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Vector file not found: {}", vectors_path.display()),
        )));
    }

    let file = File::open(&vectors_path)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };

    if mmap.len() < HEADER_SIZE {
        return Err(VectorError::InvalidFormat(format!(
            "{} is too small to contain a header",
            vectors_path.display()
        )));
    }
    if &mmap[0..4] != MAGIC_BYTES {
        return Err(VectorError::InvalidFormat(format!(
            "{} has wrong magic bytes",
            vectors_path.display()
        )));
    }

    let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
    if version != ARTIFACT_VERSION {
        return Err(VectorError::VersionMismatch {
            expected: ARTIFACT_VERSION,
            actual: version,
        });
    }

    let dim = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]) as usize;
    let count = u32::from_le_bytes([mmap[12], mmap[13], mmap[14], mmap[15]]) as usize;
    let dimension = VectorDimension::new(dim)?;

    let expected_len = HEADER_SIZE + count * dim * BYTES_PER_F32;
    if mmap.len() < expected_len {
        return Err(VectorError::InvalidFormat(format!(
            "{} truncated: expected {} bytes for {} vectors, found {}",
            vectors_path.display(),
            expected_len,
            count,
            mmap.len()
        )));
    }

    let metadata = load_metadata(&metadata_path)?;
    if metadata.filenames.len() != count {
        return Err(VectorError::Metadata(format!(
            "metadata lists {} filenames but {} holds {} vectors",
            metadata.filenames.len(),
            vectors_path.display(),
            count
        )));
    }

    let mut items = Vec::with_capacity(count);
    for row in 0..count {
        let start = HEADER_SIZE + row * dim * BYTES_PER_F32;
        let mut embedding = Vec::with_capacity(dim);
        for i in 0..dim {
            let offset = start + i * BYTES_PER_F32;
            embedding.push(f32::from_le_bytes([
                mmap[offset],
                mmap[offset + 1],
                mmap[offset + 2],
                mmap[offset + 3],
            ]));
        }

        let filename = metadata.filenames[row].clone();
        let source_path = metadata
            .file_paths
            .get(row)
            .cloned()
            .unwrap_or_else(|| filename.clone());

        items.push(CorpusItem {
            filename,
            source_path,
            embedding,
        });
    }

    Ok(CorpusArtifacts { dimension, items })
}

fn load_metadata(path: &Path) -> Result<MetadataFile, VectorError> {
    if !path.exists() {
        return Err(VectorError::Storage(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Metadata file not found: {}", path.display()),
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| VectorError::Metadata(format!("invalid JSON in {}: {e}", path.display())))
}

/// Writes corpus artifacts to a directory, replacing any prior content.
///
/// Used by the offline embedding job and by tests to build fixtures.
pub fn write_artifacts(
    dir: &Path,
    dimension: VectorDimension,
    items: &[CorpusItem],
) -> Result<(), VectorError> {
    for item in items {
        dimension.validate_vector(&item.embedding)?;
    }

    std::fs::create_dir_all(dir)?;

    let vectors_path = dir.join(VECTORS_FILE);
    let mut file = File::create(&vectors_path)?;
    file.write_all(MAGIC_BYTES)?;
    file.write_all(&ARTIFACT_VERSION.to_le_bytes())?;
    file.write_all(&(dimension.get() as u32).to_le_bytes())?;
    file.write_all(&(items.len() as u32).to_le_bytes())?;
    for item in items {
        for &value in &item.embedding {
            file.write_all(&value.to_le_bytes())?;
        }
    }
    file.flush()?;

    let metadata = MetadataFile {
        filenames: items.iter().map(|i| i.filename.clone()).collect(),
        file_paths: items.iter().map(|i| i.source_path.clone()).collect(),
    };
    let metadata_path = dir.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| VectorError::Metadata(e.to_string()))?;
    std::fs::write(&metadata_path, json)?;

    Ok(())
}
