//! C ABI surface (ambient stack item, carried from the teacher's own
//! `c_api.rs`, reshaped around this crate's four-valued [`crate::Status`]
//! and [`crate::Features`] instead of the teacher's heap-owning
//! `AvifData`/`avif_data_t`).
//!
//! Mirrors the historical `avifinfo.h` entry points this crate's semantics
//! are drawn from: `avifinfo_get` and `avifinfo_get_with_size`, both
//! returning a status code and writing through an out-parameter rather than
//! allocating, since the core never allocates (spec §3, §5).

use crate::{Features, Status};

/// C-ABI mirror of [`crate::Status`]. Numeric values are part of the ABI
/// and must not be reordered once published.
#[allow(bad_style)]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum avifinfo_status_t {
    AVIFINFO_OK = 0,
    AVIFINFO_NOT_ENOUGH_DATA = 1,
    AVIFINFO_TOO_COMPLEX = 2,
    AVIFINFO_INVALID_FILE = 3,
}

impl From<Status> for avifinfo_status_t {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => Self::AVIFINFO_OK,
            Status::NotEnoughData => Self::AVIFINFO_NOT_ENOUGH_DATA,
            Status::TooComplex => Self::AVIFINFO_TOO_COMPLEX,
            Status::InvalidFile => Self::AVIFINFO_INVALID_FILE,
        }
    }
}

/// C-ABI mirror of [`crate::Features`]. Always zeroed by both entry points
/// before parsing, matching the Rust API's "no partial success" contract
/// (spec §7).
#[allow(bad_style)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct avifinfo_features_t {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub num_channels: u32,
}

impl From<Features> for avifinfo_features_t {
    fn from(features: Features) -> Self {
        Self {
            width: features.width,
            height: features.height,
            bit_depth: features.bit_depth,
            num_channels: features.num_channels,
        }
    }
}

/// Parses `data[..data_size]`, treating the file as being of the maximum
/// size this parser can address. `features` may be null; if non-null it is
/// always written, zeroed on any non-`AVIFINFO_OK` status.
///
/// # Safety
/// `data` must be valid for reads of `data_size` bytes, or null (in which
/// case `data_size` is ignored and `AVIFINFO_NOT_ENOUGH_DATA` is returned).
/// `features`, if non-null, must be valid for writes of one
/// `avifinfo_features_t`.
#[no_mangle]
pub unsafe extern "C" fn avifinfo_get(
    data: *const u8,
    data_size: usize,
    features: *mut avifinfo_features_t,
) -> avifinfo_status_t {
    avifinfo_get_with_size(data, data_size, features, u32::MAX)
}

/// As [`avifinfo_get`] but against a known total `file_size`. `data_size` is
/// clipped to `file_size` internally, matching [`crate::get_with_size`].
///
/// # Safety
/// Same requirements as [`avifinfo_get`].
#[no_mangle]
pub unsafe extern "C" fn avifinfo_get_with_size(
    data: *const u8,
    data_size: usize,
    features: *mut avifinfo_features_t,
    file_size: u32,
) -> avifinfo_status_t {
    let slice = if data.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts(data, data_size)
    };
    let (status, parsed) = crate::get_with_size(slice, file_size);
    if let Some(out) = features.as_mut() {
        *out = parsed.into();
    }
    status.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_data_is_not_enough_data() {
        let mut features = avifinfo_features_t::default();
        let status = unsafe { avifinfo_get(std::ptr::null(), 0, &mut features) };
        assert_eq!(status, avifinfo_status_t::AVIFINFO_NOT_ENOUGH_DATA);
        assert_eq!(features.width, 0);
    }

    #[test]
    fn null_features_pointer_is_tolerated() {
        let data = b"\x00\x00\x00\x08qqqq";
        let status =
            unsafe { avifinfo_get_with_size(data.as_ptr(), data.len(), std::ptr::null_mut(), data.len() as u32) };
        assert_eq!(status, avifinfo_status_t::AVIFINFO_INVALID_FILE);
    }
}
