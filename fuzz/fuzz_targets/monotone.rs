#![no_main]
//! The "monotone determinism" oracle of spec §8: for any buffer and any
//! two prefix lengths `s1 <= s2`, if parsing at `s1` yields a terminal
//! status other than `NotEnoughData`, parsing at `s2` must yield the same
//! status and the same features. This is the one property this crate's
//! five-valued internal outcome exists to guarantee, so it's also the
//! crate's only fuzz target: thin glue around the walker, per spec §1.
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    // First 4 bytes pick two prefix lengths into the remaining bytes
    // (the actual candidate file); the rest is the buffer under test.
    let a = u16::from_le_bytes([data[0], data[1]]) as usize;
    let b = u16::from_le_bytes([data[2], data[3]]) as usize;
    let buf = &data[4..];
    if buf.is_empty() {
        return;
    }
    let (mut s1, mut s2) = (a % (buf.len() + 1), b % (buf.len() + 1));
    if s1 > s2 {
        std::mem::swap(&mut s1, &mut s2);
    }

    let file_size = buf.len() as u32;
    let (status1, features1) = avif_info::get_with_size(&buf[..s1], file_size);
    let (status2, features2) = avif_info::get_with_size(&buf[..s2], file_size);

    if status1 == avif_info::Status::NotEnoughData {
        return;
    }
    assert_eq!(status1, status2, "prefix {s1} vs {s2} of {} bytes disagreed", buf.len());
    assert_eq!(features1, features2);
});
