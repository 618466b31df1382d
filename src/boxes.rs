//! The box reader: parses one ISOBMFF box header at a given offset inside
//! a parent container (spec §4.2).
//!
//! Only the box types this walker actually inspects get their own
//! [`BoxType`] variant; everything else is [`BoxType::Other`] and is always
//! skipped by the caller. This mirrors the teacher crate's `BoxType` fourcc
//! enum, trimmed to this crate's much smaller vocabulary since there's no
//! item-data extraction here to name every ISOBMFF box for.

use crate::outcome::{found_or_return, Outcome};
use crate::window::{BoxBudget, Container};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoxType {
    FileType,
    Meta,
    PrimaryItem,
    ItemProperties,
    ItemPropertyContainer,
    ItemPropertyAssociation,
    ImageSpatialExtents,
    PixelInformation,
    Av1Config,
    ItemReference,
    DerivedImage,
    AuxiliaryType,
    MediaData,
    /// Any box this walker has no special interest in.
    Other([u8; 4]),
    /// A full box whose version this walker doesn't understand. Per spec
    /// §4.2 step 8, this is not `Invalid`; the type is rewritten to this
    /// sentinel so enclosing scans skip over it like any other box.
    UnsupportedVersion,
}

impl BoxType {
    fn from_fourcc(fourcc: [u8; 4]) -> Self {
        match &fourcc {
            b"ftyp" => Self::FileType,
            b"meta" => Self::Meta,
            b"pitm" => Self::PrimaryItem,
            b"iprp" => Self::ItemProperties,
            b"ipco" => Self::ItemPropertyContainer,
            b"ipma" => Self::ItemPropertyAssociation,
            b"ispe" => Self::ImageSpatialExtents,
            b"pixi" => Self::PixelInformation,
            b"av1C" => Self::Av1Config,
            b"iref" => Self::ItemReference,
            b"dimg" => Self::DerivedImage,
            b"auxC" => Self::AuxiliaryType,
            b"mdat" => Self::MediaData,
            _ => Self::Other(fourcc),
        }
    }

    /// Box types parsed as ISOBMFF "full boxes" (12-byte header: size, type,
    /// version, 24-bit flags) per spec §4.2 step 7. `dimg` entries inside
    /// `iref` are plain (non-full) boxes whose content starts immediately
    /// after the 8-byte header; `iref`'s own version controls the item-ID
    /// width used when reading them.
    fn is_full_box(self) -> bool {
        matches!(
            self,
            Self::Meta
                | Self::PrimaryItem
                | Self::ItemPropertyAssociation
                | Self::ImageSpatialExtents
                | Self::PixelInformation
                | Self::ItemReference
                | Self::AuxiliaryType
        )
    }

    /// Highest full-box version this walker understands for this type
    /// (spec §4.2 step 8).
    fn max_supported_version(self) -> u8 {
        match self {
            Self::Meta => 0,
            Self::PrimaryItem => 1,
            Self::ItemPropertyAssociation => 1,
            Self::ImageSpatialExtents => 0,
            Self::PixelInformation => 0,
            Self::ItemReference => 1,
            Self::AuxiliaryType => 0,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BoxHeader {
    pub(crate) box_type: BoxType,
    pub(crate) size: u32,
    pub(crate) content_offset: u32,
    pub(crate) content_size: u32,
    pub(crate) version: Option<u8>,
    pub(crate) flags: Option<u32>,
}

/// Parses one box header starting at `position` inside `container`,
/// charging the shared box-count budget. Implements spec §4.2 steps 1–9
/// in order.
pub(crate) fn read_box_header(
    container: &Container<'_>,
    position: u32,
    budget: &mut BoxBudget,
) -> Outcome<BoxHeader> {
    // Step 1: refuse positions within 8 bytes of 2^32-1.
    if position > u32::MAX - 8 {
        return Outcome::Aborted;
    }

    // Step 2: need the 8-byte minimal header to fit the container's logical
    // bound, and the 4-byte size field to already be available.
    if position + 8 > container.max_bytes() {
        return Outcome::Invalid;
    }
    if position + 4 > container.available() {
        return Outcome::Truncated;
    }
    let size = found_or_return!(container.read_u32(position));

    // Step 3: extends-to-end and 64-bit sizes are unsupported by this core.
    if size == 0 || size == 1 {
        return Outcome::Aborted;
    }
    // Step 4.
    if size < 8 {
        return Outcome::Invalid;
    }
    // Step 5.
    let end = match position.checked_add(size) {
        Some(e) => e,
        None => return Outcome::Aborted,
    };
    if end > container.max_bytes() {
        return Outcome::Invalid;
    }

    // Step 6: read the four-byte type, `Truncated` if not yet available.
    if position + 8 > container.available() {
        return Outcome::Truncated;
    }
    let fourcc = found_or_return!(container.read_bytes(position + 4, 4));
    let box_type = BoxType::from_fourcc([fourcc[0], fourcc[1], fourcc[2], fourcc[3]]);

    // Step 7/8: full-box header, version bound check.
    let (content_offset, version, flags, box_type) = if box_type.is_full_box() {
        if size < 12 {
            return Outcome::Invalid;
        }
        if position + 12 > container.available() {
            return Outcome::Truncated;
        }
        let version = found_or_return!(container.read_u8(position + 8));
        let flags = found_or_return!(container.read_u24(position + 9));
        let box_type = if version > box_type.max_supported_version() {
            BoxType::UnsupportedVersion
        } else {
            box_type
        };
        (12u32, Some(version), Some(flags), box_type)
    } else {
        (8u32, None, None, box_type)
    };

    // Step 9.
    found_or_return!(budget.charge());

    Outcome::Found(BoxHeader {
        box_type,
        size,
        content_offset,
        content_size: size - content_offset,
        version,
        flags,
    })
}

/// Walks sibling boxes of `container` from offset 0, invoking `f` with each
/// box's header and its content sub-container. `f` returns `true` to keep
/// scanning or `false` to stop early (the caller has found what it wanted
/// and will report its own `Outcome`). Terminates `Found(())` only once
/// every byte of `container` has been consumed by a box; any other reason
/// the scan stops is returned unchanged.
pub(crate) fn for_each_child<'a>(
    container: &Container<'a>,
    budget: &mut BoxBudget,
    mut f: impl FnMut(&BoxHeader, &Container<'a>) -> Outcome<bool>,
) -> Outcome<()> {
    let mut position = 0u32;
    while position < container.max_bytes() {
        let header = found_or_return!(read_box_header(container, position, budget));
        // `header.content_offset` is the header's own size (8 or 12),
        // relative to the box itself; the content window inside `container`
        // starts `position` bytes further in than that.
        let child = found_or_return!(container.child(position + header.content_offset, header.content_size));
        let keep_going = found_or_return!(f(&header, &child));
        if !keep_going {
            return Outcome::Found(());
        }
        position += header.size;
    }
    Outcome::Found(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> BoxBudget {
        BoxBudget::new()
    }

    #[test]
    fn reads_a_plain_box_header() {
        let data = b"\x00\x00\x00\x08ftyp";
        let c = Container::top_level(data, data.len() as u32);
        let mut b = budget();
        let header = match read_box_header(&c, 0, &mut b) {
            Outcome::Found(h) => h,
            _ => panic!("expected Found"),
        };
        assert_eq!(header.box_type, BoxType::FileType);
        assert_eq!(header.size, 8);
        assert_eq!(header.content_offset, 8);
        assert_eq!(header.content_size, 0);
    }

    #[test]
    fn size_zero_is_aborted() {
        let data = b"\x00\x00\x00\x00ftyp";
        let c = Container::top_level(data, data.len() as u32);
        let mut b = budget();
        assert_eq!(read_box_header(&c, 0, &mut b), Outcome::Aborted);
    }

    #[test]
    fn size_one_is_aborted() {
        let data = b"\x00\x00\x00\x01ftypabcdefgh";
        let c = Container::top_level(data, data.len() as u32);
        let mut b = budget();
        assert_eq!(read_box_header(&c, 0, &mut b), Outcome::Aborted);
    }

    #[test]
    fn short_size_is_invalid() {
        let data = b"\x00\x00\x00\x04ftyp";
        let c = Container::top_level(data, data.len() as u32);
        let mut b = budget();
        assert_eq!(read_box_header(&c, 0, &mut b), Outcome::Invalid);
    }

    #[test]
    fn truncated_before_type_is_truncated() {
        let data = b"\x00\x00\x00\x08fty"; // declares 8, only 3 name bytes present
        let c = Container::top_level(data, 8);
        let mut b = budget();
        assert_eq!(read_box_header(&c, 0, &mut b), Outcome::Truncated);
    }

    #[test]
    fn full_box_unsupported_version_becomes_sentinel() {
        // meta, version 7 (only version 0 supported)
        let data = b"\x00\x00\x00\x0cmeta\x07\x00\x00\x00";
        let c = Container::top_level(data, data.len() as u32);
        let mut b = budget();
        let header = match read_box_header(&c, 0, &mut b) {
            Outcome::Found(h) => h,
            _ => panic!("expected Found"),
        };
        assert_eq!(header.box_type, BoxType::UnsupportedVersion);
    }

    #[test]
    fn budget_exhaustion_aborts() {
        let data = b"\x00\x00\x00\x08abcd";
        let c = Container::top_level(data, data.len() as u32);
        let mut b = budget();
        for _ in 0..crate::window::MAX_BOXES - 1 {
            assert!(read_box_header(&c, 0, &mut b).is_found());
        }
        assert_eq!(read_box_header(&c, 0, &mut b), Outcome::Aborted);
    }
}
