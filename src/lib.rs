//! Streaming-friendly extractor of width, height, bit depth, and channel
//! count from the leading bytes of an AVIF file.
//!
//! This crate does not decode pixel data. It walks just enough of the
//! ISOBMFF box structure — `ftyp`, `meta/pitm`, `meta/iprp/ipma`/`ipco`, and
//! a handful of property boxes within it — to answer four numbers, and it
//! is built to do that from a prefix of the file rather than the whole
//! thing: callers that only have the first few kilobytes of an upload or a
//! streamed download get a definite answer (`Ok`/`InvalidFile`/`TooComplex`)
//! or a clear signal to come back with more bytes (`NotEnoughData`).
//!
//! No heap allocation happens anywhere in the core walk; every container is
//! a borrowed slice of the caller's own buffer.
//!
//! See [`get`] and [`get_with_size`] for the two buffer-based entry points,
//! and [`stream`] for the callback-driven variant used when the whole file
//! never sits in memory at once.

#[macro_use]
extern crate log;

mod boxes;
mod features;
mod outcome;
pub mod stream;
mod walker;
mod window;

#[cfg(feature = "capi")]
pub mod c_api;

pub use features::Features;

use crate::outcome::Outcome;
use crate::window::{BoxBudget, Container};

/// Result of a parse attempt (spec §6 "Status enum").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Features were fully determined; the returned [`Features`] is
    /// populated and every field is nonzero.
    Ok,
    /// The bytes examined so far neither confirm nor rule out a valid AVIF;
    /// calling again with more bytes may resolve it.
    NotEnoughData,
    /// The parser's box-count budget was exhausted before a decision could
    /// be reached.
    TooComplex,
    /// The bytes examined so far violate the format; no amount of
    /// additional data will change the outcome.
    InvalidFile,
}

/// Parses `data`, treating the file as being of the maximum size this
/// parser can address (2³²−1 bytes). Equivalent to
/// `get_with_size(data, u32::MAX)`.
///
/// On any status other than `Ok`, the returned [`Features`] is all-zero.
pub fn get(data: &[u8]) -> (Status, Features) {
    get_with_size(data, u32::MAX)
}

/// Parses `data` against a known total `file_size`. `data` is clipped to
/// `file_size` if it's longer; if it's shorter, the parser treats the
/// missing bytes as not yet available rather than as part of the file.
///
/// On any status other than `Ok`, the returned [`Features`] is all-zero.
pub fn get_with_size(data: &[u8], file_size: u32) -> (Status, Features) {
    let data_size = data.len().min(u32::MAX as usize) as u32;
    let top = Container::top_level(data, file_size);
    let mut budget = BoxBudget::new();

    trace!("get_with_size: data_size={data_size} file_size={file_size}");

    match walker::walk(&top, &mut budget) {
        Outcome::Found(record) => (Status::Ok, record.into_features()),
        Outcome::NotFound => {
            let status = if data_size < file_size {
                Status::NotEnoughData
            } else {
                Status::InvalidFile
            };
            (status, Features::default())
        }
        Outcome::Truncated => (Status::NotEnoughData, Features::default()),
        Outcome::Invalid => (Status::InvalidFile, Features::default()),
        Outcome::Aborted => (Status::TooComplex, Features::default()),
    }
}
