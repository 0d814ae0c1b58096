//! Replay container encoding and file IO.
//!
//! MessagePack (named fields) compressed with LZ4, size-prepended so decoding
//! needs no external framing.

use std::fs;
use std::path::Path;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use thiserror::Error;

use super::frame::{ReplayDoc, REPLAY_VERSION};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("decompression failed")]
    Decompression,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported replay version: found {found}, expected <= {expected}")]
    VersionMismatch { found: u8, expected: u8 },
}

/// Serialize and compress a replay document.
pub fn encode_doc(doc: &ReplayDoc) -> Result<Vec<u8>, ReplayError> {
    let msgpack = to_vec_named(doc)?;
    Ok(compress_prepend_size(&msgpack))
}

/// Decompress and deserialize a replay document.
pub fn decode_doc(bytes: &[u8]) -> Result<ReplayDoc, ReplayError> {
    let msgpack = decompress_size_prepended(bytes).map_err(|_| ReplayError::Decompression)?;
    let doc: ReplayDoc = from_slice(&msgpack)?;
    if doc.version > REPLAY_VERSION {
        return Err(ReplayError::VersionMismatch { found: doc.version, expected: REPLAY_VERSION });
    }
    Ok(doc)
}

/// Write a replay container file.
pub fn save_replay<P: AsRef<Path>>(doc: &ReplayDoc, path: P) -> Result<(), ReplayError> {
    let bytes = encode_doc(doc)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a replay container file.
pub fn load_replay<P: AsRef<Path>>(path: P) -> Result<ReplayDoc, ReplayError> {
    let bytes = fs::read(path)?;
    decode_doc(&bytes)
}
