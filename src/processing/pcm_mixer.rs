//! Pure-math additive PCM mixer.
//!
//! All operations work on byte slices of interleaved little-endian 16-bit
//! samples with no platform dependencies and no state across calls.

use std::sync::Arc;

/// Mix one microphone buffer with a registry snapshot of remote buffers.
///
/// - `mic`: 16-bit LE mono PCM bytes; drives the output length.
/// - `remotes`: zero or more remote PCM buffers of arbitrary length.
///
/// For each sample index, the mic sample and every remote sample available
/// at the same byte offset are summed in a 32-bit accumulator, clamped once
/// to the i16 range, and re-encoded. Remote buffers shorter than the mic
/// buffer contribute nothing past their own end. Hard clipping is the
/// documented behavior; there is no soft limiting or gain normalization.
///
/// Output length always equals `mic.len()`. A trailing odd byte (malformed
/// input) is copied through unmixed.
pub fn mix(mic: &[u8], remotes: &[Arc<Vec<u8>>]) -> Vec<u8> {
    let mut out = vec![0u8; mic.len()];

    for (i, pair) in mic.chunks_exact(2).enumerate() {
        let offset = i * 2;
        let mut sum = i16::from_le_bytes([pair[0], pair[1]]) as i32;

        for remote in remotes {
            if let Some(bytes) = remote.get(offset..offset + 2) {
                sum += i16::from_le_bytes([bytes[0], bytes[1]]) as i32;
            }
        }

        let clamped = sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        out[offset..offset + 2].copy_from_slice(&clamped.to_le_bytes());
    }

    if mic.len() % 2 == 1 {
        out[mic.len() - 1] = mic[mic.len() - 1];
    }

    out
}
