//! Compact quantized replay format and its container IO.

pub mod frame;
pub mod io;

pub use frame::{EntitySnap, ReplayDoc, ReplayFrame, ReplayMeta, REPLAY_TRACKS, REPLAY_VERSION};
pub use io::{decode_doc, encode_doc, load_replay, save_replay, ReplayError};
