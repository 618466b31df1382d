//! The streaming adapter (spec §6 "Streaming variant"): pulls bytes through
//! caller-supplied read/skip callbacks into a bounded local buffer and
//! re-invokes the slice-based core ([`crate::get_with_size`]) against
//! growing prefixes of it.
//!
//! This is glue, not "the core" (spec §1): the walker itself never retains
//! a pointer past the single top-level call it's handed a `&[u8]` for, and
//! this module is what turns a pull-based byte source into that borrow. It
//! is the one place in this crate that allocates, since it must buffer
//! whatever prefix of the file the walker currently needs to see.

use crate::{get_with_size, Features, Status};

/// Upper bound on a single [`ByteSource::read`] request, mirroring the
/// historical `AVIFINFO_MAX_NUM_READ_BYTES` cap from the C streaming API
/// this crate's streaming variant is drawn from (spec §6).
pub const AVIFINFO_MAX_NUM_READ_BYTES: usize = 1 << 16;

/// A pull-based byte source, implemented by the caller over whatever I/O
/// primitive they have (a `std::io::Read`, a socket, a cache). Only two
/// operations are required, matching spec §6 exactly.
pub trait ByteSource {
    /// Returns exactly `n` bytes (`1 <= n <= AVIFINFO_MAX_NUM_READ_BYTES`),
    /// or `None` at end of stream. The returned slice only needs to remain
    /// valid until the next call to `read` or `skip` — this adapter copies
    /// every byte out before making another callback (spec §9 Open
    /// Questions: "implementers who want zero-copy must copy-out critical
    /// bytes immediately after each read").
    fn read(&mut self, n: usize) -> Option<&[u8]>;

    /// Advances the stream by `n` bytes (`n >= 1`) without returning them.
    fn skip(&mut self, n: usize);
}

/// Bytes buffered before giving up and reporting [`Status::TooComplex`].
/// Distinct from the walker's own 4096-box budget: a file could stay under
/// that box count while still declaring an implausibly large `meta` whose
/// content this adapter would otherwise buffer without limit while the
/// walker kept asking for "more data". 16 MiB comfortably covers any
/// `meta` box a real AVIF encoder emits.
const MAX_BUFFERED_BYTES: usize = 16 * 1024 * 1024;

/// Size of the first chunk pulled from `source`, doubling on each retry
/// that the walker reports `NotEnoughData` for.
const INITIAL_CHUNK_BYTES: usize = 4096;

/// Parses a file exposed only through `source`'s read/skip callbacks,
/// mirroring [`crate::get`]'s buffer-based semantics: the file is treated
/// as being of unknown total size until `source` reports end of stream, at
/// which point the bytes actually read become the declared file size.
pub fn get(source: &mut impl ByteSource) -> (Status, Features) {
    let mut buf: Vec<u8> = Vec::new();
    let mut target = INITIAL_CHUNK_BYTES;

    loop {
        while buf.len() < target {
            let want = (target - buf.len()).min(AVIFINFO_MAX_NUM_READ_BYTES);
            match source.read(want) {
                Some(chunk) => buf.extend_from_slice(chunk),
                None => {
                    // End of stream: the bytes collected so far are the
                    // whole file.
                    return get_with_size(&buf, buf.len() as u32);
                }
            }
        }

        let (status, features) = get_with_size(&buf, u32::MAX);
        if status != Status::NotEnoughData {
            return (status, features);
        }
        if buf.len() >= MAX_BUFFERED_BYTES {
            return (Status::TooComplex, Features::default());
        }
        target = (target.saturating_mul(2)).min(MAX_BUFFERED_BYTES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An in-memory [`ByteSource`] that hands out bytes in small chunks, so
    /// tests exercise the adapter's retry/grow loop rather than resolving
    /// in a single `read`.
    struct SliceSource<'a> {
        data: &'a [u8],
        pos: usize,
        max_chunk: usize,
    }

    impl<'a> ByteSource for SliceSource<'a> {
        fn read(&mut self, n: usize) -> Option<&[u8]> {
            if self.pos >= self.data.len() {
                return None;
            }
            let want = n.min(self.max_chunk).min(self.data.len() - self.pos);
            let slice = &self.data[self.pos..self.pos + want];
            self.pos += want;
            Some(slice)
        }

        fn skip(&mut self, n: usize) {
            self.pos = (self.pos + n).min(self.data.len());
        }
    }

    fn boxed(fourcc: &[u8; 4], content: &[u8]) -> Vec<u8> {
        let size = 8 + content.len() as u32;
        let mut out = size.to_be_bytes().to_vec();
        out.extend_from_slice(fourcc);
        out.extend_from_slice(content);
        out
    }

    #[test]
    fn reads_a_short_invalid_stream_to_completion() {
        let data = boxed(b"qqqq", &[]);
        let mut source = SliceSource { data: &data, pos: 0, max_chunk: 3 };
        let (status, features) = get(&mut source);
        assert_eq!(status, Status::InvalidFile);
        assert_eq!(features, Features::default());
    }

    #[test]
    fn empty_stream_is_invalid_as_a_complete_zero_byte_file() {
        // Immediate end of stream means the file is fully known to be zero
        // bytes long; an empty file has no `ftyp` at all, which spec §4.3
        // treats as unconditionally `Invalid` rather than retryable.
        let data: [u8; 0] = [];
        let mut source = SliceSource { data: &data, pos: 0, max_chunk: 1 };
        let (status, _) = get(&mut source);
        assert_eq!(status, Status::InvalidFile);
    }
}
