//! On-disk save files.
//!
//! ```text
//! +-----------+--------------+------------------------------------+
//! | "EMSV"    | file version | lz4(size-prepended, postcard(tag)) |
//! | 4 bytes   | u8           | rest                               |
//! +-----------+--------------+------------------------------------+
//! ```
//!
//! A file that does not start with the magic is handed to the legacy stream
//! loader. Writes are synchronous; the session layer runs them off the tick.

use std::path::{Path, PathBuf};

use crate::persistence::{PersistedFields, PersistenceCodec, PersistenceError, SaveTag};

/// Magic prefix of current-format save files.
pub const SAVE_MAGIC: [u8; 4] = *b"EMSV";

/// File-format version following the magic.
pub const SAVE_FILE_VERSION: u8 = 1;

/// File extension used for player saves.
pub const SAVE_EXTENSION: &str = "emsave";

/// Encodes a tag into save-file bytes.
pub fn encode_save(tag: &SaveTag) -> Result<Vec<u8>, PersistenceError> {
    let body = postcard::to_allocvec(tag).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    let compressed = lz4_flex::compress_prepend_size(&body);
    let mut out = Vec::with_capacity(SAVE_MAGIC.len() + 1 + compressed.len());
    out.extend_from_slice(&SAVE_MAGIC);
    out.push(SAVE_FILE_VERSION);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decodes save-file bytes, falling back to the legacy stream when the magic
/// is absent.
pub fn decode_save(bytes: &[u8]) -> Result<PersistedFields, PersistenceError> {
    let Some(rest) = bytes.strip_prefix(&SAVE_MAGIC) else {
        tracing::info!("save has no header, reading legacy stream");
        return PersistenceCodec::load_legacy(bytes);
    };
    let (&version, body) = rest
        .split_first()
        .ok_or_else(|| PersistenceError::Malformed("missing file version".to_string()))?;
    if version != SAVE_FILE_VERSION {
        return Err(PersistenceError::UnsupportedFileVersion(version));
    }
    let raw = lz4_flex::decompress_size_prepended(body)
        .map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    let tag: SaveTag =
        postcard::from_bytes(&raw).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    PersistenceCodec::load(&tag)
}

/// Path of `player_name`'s save under `save_dir`.
///
/// ASCII letters, digits and `-` are kept; every other byte of the UTF-8
/// name, `_` included, becomes `_XX` (uppercase hex). Distinct names always
/// map to distinct files and no name can leave the directory.
pub fn save_path(save_dir: &Path, player_name: &str) -> PathBuf {
    let mut stem = String::with_capacity(player_name.len());
    for byte in player_name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{byte:02X}"));
        }
    }
    if stem.is_empty() {
        stem.push('_');
    }
    save_dir.join(format!("{stem}.{SAVE_EXTENSION}"))
}

/// Writes `tag` as `player_name`'s save. Returns the path written.
pub fn write_save_file(
    save_dir: &Path,
    player_name: &str,
    tag: &SaveTag,
) -> Result<PathBuf, PersistenceError> {
    let bytes = encode_save(tag)?;
    let path = save_path(save_dir, player_name);
    std::fs::create_dir_all(save_dir)?;
    // Replace via rename; readers never observe a partial file.
    let tmp = path.with_extension(format!("{SAVE_EXTENSION}.tmp"));
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

/// Loads `player_name`'s save. `Ok(None)` if no save exists yet.
pub fn load_save_file(
    save_dir: &Path,
    player_name: &str,
) -> Result<Option<PersistedFields>, PersistenceError> {
    let path = save_path(save_dir, player_name);
    match std::fs::read(&path) {
        Ok(bytes) => decode_save(&bytes).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Moves `player_name`'s save to the first free `<save>.bak-<n>` so a later
/// write cannot replace a file this build failed to read. Returns the
/// backup path, or `Ok(None)` if there was no save.
pub fn quarantine_save_file(
    save_dir: &Path,
    player_name: &str,
) -> Result<Option<PathBuf>, PersistenceError> {
    let path = save_path(save_dir, player_name);
    if !path.exists() {
        return Ok(None);
    }
    let backup = (0..u32::MAX)
        .map(|n| path.with_extension(format!("{SAVE_EXTENSION}.bak-{n}")))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| PersistenceError::Malformed("no free backup name".to_string()))?;
    std::fs::rename(&path, &backup)?;
    Ok(Some(backup))
}
