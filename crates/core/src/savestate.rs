//! Save state for the synth.
//!
//! Captures the full [`Synth`] state, including synchronizer stages, any
//! half-finished register write and in-flight CORDIC rotations, so that a
//! restored synth continues tick for tick exactly as the original would have.
//! An active [`PwmCapture`](crate::PwmCapture) is not part of the state.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "PWMS"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use std::path::Path;

use crate::Synth;

/// Magic bytes identifying a pwm-synth save state.
const MAGIC: &[u8; 4] = b"PWMS";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

/// Serialize `synth` with header and deflate compression.
pub fn encode(synth: &Synth) -> Result<Vec<u8>, String> {
    let payload = bincode::serialize(synth)
        .map_err(|e| format!("Serialize error: {}", e))?;

    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Parse a save state, verifying magic and version.
pub fn decode(data: &[u8]) -> Result<Synth, String> {
    if data.len() < HEADER_LEN {
        return Err("Save state too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid save state (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!("Unsupported save state version {} (expected {})",
            version, FORMAT_VERSION));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;

    bincode::deserialize(&decompressed)
        .map_err(|e| format!("Deserialize error: {}", e))
}

pub fn save_to_file(synth: &Synth, path: &Path) -> Result<(), String> {
    let data = encode(synth)?;
    std::fs::write(path, &data)
        .map_err(|e| format!("Write error: {}", e))?;
    log::debug!("savestate: wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<Synth, String> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Read error: {}", e))?;
    decode(&data)
}
