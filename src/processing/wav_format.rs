//! WAV file format utilities.
//!
//! Generates the canonical 44-byte RIFF WAV header. The two size fields
//! (RIFF chunk size at offset 4, data chunk size at offset 40) are written
//! as zero placeholders; `storage::wav_writer::finalize_header` patches
//! them once the total file length is known.

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Byte offset of the RIFF chunk size field (`file size - 8`).
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Byte offset of the data chunk size field (`file size - 44`).
pub const DATA_SIZE_OFFSET: u64 = 40;

/// Generate a provisional 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (placeholder: 0)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data size (placeholder: 0)
/// ```
pub fn generate_header(sample_rate: u32, bit_depth: u16, channels: u16) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor; chunk size stays zero until finalization
    header[0..4].copy_from_slice(b"RIFF");
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes()); // PCM format size
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM format code
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk; data size stays zero until finalization
    header[36..40].copy_from_slice(b"data");

    header
}
