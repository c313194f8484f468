use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;
use crate::processing::wav_format;

/// Streaming WAV file writer.
///
/// Two-phase format: `open` writes a provisional 44-byte header whose
/// size fields are zero, `append` streams raw PCM sequentially (never
/// seeking backward), `close` flushes and releases the handle. After the
/// file is closed, `finalize_header` re-opens it and patches the size
/// fields from the on-disk length.
pub struct WavFileWriter {
    file_path: PathBuf,
    file: Option<File>,
    total_bytes_written: u64,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            file: None,
            total_bytes_written: 0,
        }
    }

    /// Create the file (and any missing parent directories) and write the
    /// provisional header. The handle is positioned at byte 44.
    pub fn open(&mut self, config: &RecorderConfig) -> Result<(), RecorderError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RecorderError::Storage(format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&self.file_path)
            .map_err(|e| RecorderError::Storage(format!("failed to create file: {}", e)))?;
        self.file = Some(file);

        let header = wav_format::generate_header(config.sample_rate, config.bit_depth, config.channels);
        self.append(&header)
    }

    /// Write PCM bytes sequentially.
    pub fn append(&mut self, data: &[u8]) -> Result<(), RecorderError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RecorderError::Storage("file is not open for writing".into()))?;
        file.write_all(data)
            .map_err(|e| RecorderError::Storage(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush and release the file handle. Header sizes stay provisional;
    /// call `finalize_header` afterwards.
    pub fn close(&mut self) -> Result<(), RecorderError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .map_err(|e| RecorderError::Storage(format!("flush failed: {}", e)))?;
        }
        Ok(())
    }

    /// Total bytes written so far (including the WAV header).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Patch the provisional header sizes from the on-disk file length.
///
/// Writes `len - 8` at offset 4 (RIFF chunk size) and `len - 44` at
/// offset 40 (data chunk size), both u32 LE. Returns `Ok(false)` without
/// touching anything when the file is missing or no larger than the bare
/// header — the guard for an empty or aborted recording.
pub fn finalize_header(path: &Path) -> Result<bool, RecorderError> {
    let file_size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(false),
    };
    if file_size <= wav_format::WAV_HEADER_SIZE as u64 {
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| RecorderError::Storage(format!("failed to reopen file: {}", e)))?;

    let riff_size = size_field(file_size - 8);
    file.seek(SeekFrom::Start(wav_format::RIFF_SIZE_OFFSET))
        .map_err(|e| RecorderError::Storage(e.to_string()))?;
    file.write_all(&riff_size.to_le_bytes())
        .map_err(|e| RecorderError::Storage(e.to_string()))?;

    let data_size = size_field(file_size - wav_format::WAV_HEADER_SIZE as u64);
    file.seek(SeekFrom::Start(wav_format::DATA_SIZE_OFFSET))
        .map_err(|e| RecorderError::Storage(e.to_string()))?;
    file.write_all(&data_size.to_le_bytes())
        .map_err(|e| RecorderError::Storage(e.to_string()))?;

    file.flush().map_err(|e| RecorderError::Storage(e.to_string()))?;
    Ok(true)
}

/// Convert a byte count to a u32 WAV header size field.
///
/// The RIFF format caps at 4 GiB; anything past that is pinned to
/// `u32::MAX` rather than wrapped.
fn size_field(value: u64) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        log::warn!("recording of {} bytes exceeds the WAV 4 GiB limit; size field capped", value);
        u32::MAX
    })
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let data = fs::read(path)
        .map_err(|e| RecorderError::Storage(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
