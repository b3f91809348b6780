//! Binary storage for the flat index.
//!
//! File format: faiss_index.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - row_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Rows (repeated, in catalog order):
//! - embedding: [f32; dimensions] (little-endian)
//!
//! Row ids live next to the index in `<index>.meta.csv` with a single `id`
//! column, so a rebuilt catalog can be checked against the index.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::semantic::index::{FlatIndex, IndexError};

const FORMAT_VERSION: u8 = 1;

/// version(1) + model_id(32) + dimensions(2) + row_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: index was built with a different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// An index as read back from disk, with its row ids.
#[derive(Debug)]
pub struct StoredIndex {
    pub index: FlatIndex,
    pub ids: Vec<i64>,
}

pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the row-id sidecar.
    pub fn meta_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".meta.csv");
        PathBuf::from(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<StoredIndex, IndexStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        validate_header(&header, expected_model_id, expected_dimensions)?;

        let dimensions = header.dimensions as usize;
        let mut data = Vec::with_capacity(dimensions * header.row_count as usize);
        let mut float_bytes = [0u8; 4];
        for _ in 0..(header.row_count as usize * dimensions) {
            reader.read_exact(&mut float_bytes)?;
            data.push(f32::from_le_bytes(float_bytes));
        }

        let index = FlatIndex::from_raw(dimensions, data)?;
        let ids = self.load_ids()?;

        Ok(StoredIndex { index, ids })
    }

    /// Save index and row ids.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(
        &self,
        index: &FlatIndex,
        ids: &[i64],
        model_id: &[u8; 32],
    ) -> Result<(), IndexStorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");

        let result = write_to_file(&temp_path, index, model_id);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;
        self.save_ids(ids)?;

        Ok(())
    }

    fn save_ids(&self, ids: &[i64]) -> Result<(), IndexStorageError> {
        let mut csv_wrt = csv::Writer::from_path(self.meta_path())?;
        csv_wrt.write_record(["id"])?;
        for id in ids {
            csv_wrt.write_record([id.to_string()])?;
        }
        csv_wrt.flush()?;
        Ok(())
    }

    fn load_ids(&self) -> Result<Vec<i64>, IndexStorageError> {
        let meta_path = self.meta_path();
        if !meta_path.exists() {
            return Ok(vec![]);
        }

        #[derive(serde::Deserialize)]
        struct Row {
            id: i64,
        }

        let mut csv_reader = csv::Reader::from_path(meta_path)?;
        let mut ids = vec![];
        for row in csv_reader.deserialize() {
            let row: Row = row?;
            ids.push(row.id);
        }
        Ok(ids)
    }
}

#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    row_count: u64,
}

fn write_to_file(
    path: &Path,
    index: &FlatIndex,
    model_id: &[u8; 32],
) -> Result<(), IndexStorageError> {
    let dimensions =
        u16::try_from(index.dimensions()).map_err(|_| IndexStorageError::DimensionMismatch {
            expected: u16::MAX as usize,
            got: index.dimensions(),
        })?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let header = Header {
        version: FORMAT_VERSION,
        model_id: *model_id,
        dimensions,
        row_count: index.len() as u64,
    };
    write_header(&mut writer, &header)?;

    for value in index.raw() {
        writer.write_all(&value.to_le_bytes())?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    Ok(())
}

fn read_header(reader: &mut impl Read) -> Result<Header, IndexStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes)?;

    let version = header_bytes[0];
    if version > FORMAT_VERSION {
        return Err(IndexStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let stored_checksum = u32::from_le_bytes([
        header_bytes[43],
        header_bytes[44],
        header_bytes[45],
        header_bytes[46],
    ]);
    if stored_checksum != crc32fast::hash(&header_bytes[0..43]) {
        return Err(IndexStorageError::ChecksumMismatch);
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[1..33]);

    let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header_bytes[35..43]);
    let row_count = u64::from_le_bytes(count_bytes);

    Ok(Header {
        version,
        model_id,
        dimensions,
        row_count,
    })
}

fn validate_header(
    header: &Header,
    expected_model_id: &[u8; 32],
    expected_dimensions: usize,
) -> Result<(), IndexStorageError> {
    if header.model_id != *expected_model_id {
        return Err(IndexStorageError::ModelMismatch);
    }

    if header.dimensions as usize != expected_dimensions {
        return Err(IndexStorageError::DimensionMismatch {
            expected: expected_dimensions,
            got: header.dimensions as usize,
        });
    }

    log::debug!(
        "index header ok: version {}, {} rows",
        header.version,
        header.row_count
    );

    Ok(())
}

fn write_header(writer: &mut impl Write, header: &Header) -> Result<(), IndexStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = header.version;
    header_bytes[1..33].copy_from_slice(&header.model_id);
    header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[35..43].copy_from_slice(&header.row_count.to_le_bytes());

    let checksum = crc32fast::hash(&header_bytes[0..43]);
    header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)?;
    Ok(())
}
