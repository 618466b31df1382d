//! The AVIF walker: the four passes over a top-level [`Container`] that turn
//! a box tree into a [`FeatureRecord`] (spec §4, §9).
//!
//! Nothing here materializes a box tree. Each pass re-derives whatever
//! sub-containers it needs from borrowed slices of the original buffer;
//! the one exception is `meta`'s content, which is resolved once by
//! [`walk`] and threaded as a parameter into every later pass, since all of
//! them search within it.

use crate::boxes::{for_each_child, BoxHeader, BoxType};
use crate::features::FeatureRecord;
use crate::outcome::{found_or_return, Outcome};
use crate::window::{BoxBudget, Container};

/// `urn:mpeg:mpegB:cicp:systems:auxiliary:alpha`, including the terminating
/// nul, as an `auxC` item's `aux_type` must read to be alpha (spec §4.7).
const ALPHA_URN: &[u8; 44] = b"urn:mpeg:mpegB:cicp:systems:auxiliary:alpha\0";

/// Runs all four passes over the top-level container and returns the
/// extracted [`FeatureRecord`], or whichever non-`Found` [`Outcome`]
/// terminated the walk first (spec §4.8).
pub(crate) fn walk(top: &Container<'_>, budget: &mut BoxBudget) -> Outcome<FeatureRecord> {
    found_or_return!(check_ftyp(top, budget));

    let meta = match find_first_child(top, budget, BoxType::Meta) {
        Outcome::Found((_, content)) => content,
        Outcome::NotFound => return Outcome::Invalid,
        other => return other.erase(),
    };

    let primary_item_id = found_or_return!(find_primary_item_id(&meta, budget));

    let mut record = found_or_return!(extract_item_features(&meta, budget, primary_item_id));

    if !record.has_pixel_format() {
        match tile_fallback(&meta, budget, primary_item_id, &mut record) {
            Outcome::Found(()) => {}
            Outcome::NotFound => return Outcome::NotFound,
            other => return other.erase(),
        }
        if !record.has_pixel_format() {
            return Outcome::NotFound;
        }
    }

    // Alpha presence is an enhancement, not a requirement: a clean scan
    // that simply finds no auxC is not an error for the overall walk.
    match detect_alpha(&meta, budget, &mut record) {
        Outcome::Found(()) | Outcome::NotFound => {}
        other => return other.erase(),
    }

    Outcome::Found(record)
}

/// Finds the first top-level `ftyp` box and requires it to declare a
/// recognized AVIF brand (spec §4.3: "succeeds on first `avif` or `avis`
/// encountered"). Stops scanning as soon as that `ftyp` is resolved, since
/// `get()`'s unbounded `file_size` (`u32::MAX`) means a scan-to-end never
/// terminates for a real, finite file; absence of `ftyp` is `Invalid`.
fn check_ftyp(top: &Container<'_>, budget: &mut BoxBudget) -> Outcome<()> {
    match find_first_child(top, budget, BoxType::FileType) {
        Outcome::Found((_, content)) => match has_avif_brand(&content) {
            Outcome::Found(true) => Outcome::Found(()),
            Outcome::Found(false) => Outcome::Invalid,
            other => other.erase(),
        },
        Outcome::NotFound => Outcome::Invalid,
        other => other.erase(),
    }
}

/// Looks for `avif` or `avis` among an `ftyp` box's major brand and
/// compatible-brands list (spec §4.3: the major-brand slot at offset 0 is
/// skipped since it's checked as just another 4-byte slot here too, matching
/// the "major brand OR any compatible brand" wording).
fn has_avif_brand(ftyp: &Container<'_>) -> Outcome<bool> {
    if ftyp.max_bytes() < 8 {
        return Outcome::Invalid;
    }
    let mut offset = 0u32;
    while offset + 4 <= ftyp.max_bytes() {
        // offset 4..8 is minor_version, not a brand slot.
        if offset != 4 {
            let brand = found_or_return!(ftyp.read_bytes(offset, 4));
            if brand == b"avif" || brand == b"avis" {
                return Outcome::Found(true);
            }
        }
        offset += 4;
    }
    Outcome::Found(false)
}

/// `meta`'s `pitm` box: the 16- or 32-bit item ID of the primary item,
/// depending on `pitm`'s own version (spec §4.4).
fn find_primary_item_id(meta: &Container<'_>, budget: &mut BoxBudget) -> Outcome<u32> {
    let (header, content) = match find_first_child(meta, budget, BoxType::PrimaryItem) {
        Outcome::Found(found) => found,
        Outcome::NotFound => return Outcome::Invalid,
        other => return other.erase(),
    };
    let item_id = match header.version {
        Some(0) => found_or_return!(content.read_u16(0)) as u32,
        _ => found_or_return!(content.read_u32(0)),
    };
    Outcome::Found(item_id)
}

/// The shared per-item feature extraction of spec §4.5, reused verbatim for
/// the primary item and, per §4.6, for each tile candidate in turn.
///
/// `Found` whenever the item's dimensions are known, whether or not its
/// pixel format is too (callers distinguish those cases by checking
/// `has_pixel_format()` on the returned record). `Invalid` only when the
/// item has no dimensions at all, since every item this walker is asked
/// about must have an `ispe`.
fn extract_item_features(
    meta: &Container<'_>,
    budget: &mut BoxBudget,
    item_id: u32,
) -> Outcome<FeatureRecord> {
    let iprp = match find_first_child(meta, budget, BoxType::ItemProperties) {
        Outcome::Found((_, content)) => content,
        Outcome::NotFound => return Outcome::Invalid,
        other => return other.erase(),
    };
    let ipco = match find_first_child(&iprp, budget, BoxType::ItemPropertyContainer) {
        Outcome::Found((_, content)) => content,
        Outcome::NotFound => return Outcome::Invalid,
        other => return other.erase(),
    };
    let (ipma_header, ipma) = match find_first_child(&iprp, budget, BoxType::ItemPropertyAssociation)
    {
        Outcome::Found(found) => found,
        Outcome::NotFound => return Outcome::Invalid,
        other => return other.erase(),
    };

    let mut record = FeatureRecord::new();
    found_or_return!(apply_associations(
        &ipma,
        ipma_header.version,
        ipma_header.flags.unwrap_or(0),
        &ipco,
        budget,
        item_id,
        &mut record,
    ));

    if record.has_dimensions() {
        Outcome::Found(record)
    } else {
        Outcome::Invalid
    }
}

/// Walks `ipma`'s per-item association entries, and for the one matching
/// `item_id`, applies every associated `ipco` property this walker
/// understands to `record` (spec §4.5).
fn apply_associations(
    ipma: &Container<'_>,
    version: Option<u8>,
    flags: u32,
    ipco: &Container<'_>,
    budget: &mut BoxBudget,
    item_id: u32,
    record: &mut FeatureRecord,
) -> Outcome<()> {
    let wide_index = (flags & 1) != 0;
    let wide_item_id = version.unwrap_or(0) >= 1;

    let entry_count = found_or_return!(ipma.read_u32(0));
    let mut offset = 4u32;
    for _ in 0..entry_count {
        let entry_item_id = if wide_item_id {
            let v = found_or_return!(ipma.read_u32(offset));
            offset += 4;
            v
        } else {
            let v = found_or_return!(ipma.read_u16(offset));
            offset += 2;
            v as u32
        };
        let association_count = found_or_return!(ipma.read_u8(offset));
        offset += 1;

        for _ in 0..association_count {
            // The essential bit (0x8000 / 0x80) doesn't change which
            // properties this walker reads, so only the index is kept.
            let property_index = if wide_index {
                let raw = found_or_return!(ipma.read_u16(offset));
                offset += 2;
                (raw & 0x7fff) as u32
            } else {
                let raw = found_or_return!(ipma.read_u8(offset));
                offset += 1;
                (raw & 0x7f) as u32
            };

            if entry_item_id == item_id && property_index >= 1 {
                match find_nth_child(ipco, budget, property_index) {
                    Outcome::Found((header, content)) => {
                        found_or_return!(apply_property(header.box_type, &content, record));
                    }
                    Outcome::NotFound => return Outcome::Invalid,
                    other => return other.erase(),
                }
            }
        }
    }
    Outcome::Found(())
}

/// Interprets one `ipco` child already known to be associated with the item
/// under consideration (spec §4.5: `ispe`, `pixi`, `av1C`; everything else
/// is ignored).
fn apply_property(
    box_type: BoxType,
    content: &Container<'_>,
    record: &mut FeatureRecord,
) -> Outcome<()> {
    match box_type {
        BoxType::ImageSpatialExtents => {
            let width = found_or_return!(content.read_u32(0));
            let height = found_or_return!(content.read_u32(4));
            if !record.set_dimensions(width, height) {
                return Outcome::Invalid;
            }
        }
        BoxType::PixelInformation => {
            let num_channels = found_or_return!(content.read_u8(0));
            if num_channels == 0 {
                return Outcome::Invalid;
            }
            let mut bit_depth = None;
            for i in 0..num_channels {
                let depth = found_or_return!(content.read_u8(1 + i as u32));
                match bit_depth {
                    None => bit_depth = Some(depth),
                    Some(first) if first != depth => return Outcome::Invalid,
                    Some(_) => {}
                }
            }
            let bit_depth = match bit_depth {
                Some(d) if d > 0 => d as u32,
                _ => return Outcome::Invalid,
            };
            record.set_pixel_format(bit_depth, num_channels as u32);
        }
        BoxType::Av1Config => {
            // Third byte of the av1C content: bit 7 unused, bits 6/5/4 are
            // high-bitdepth/twelve-bit/monochrome, bits 3/2 subsampling_x/y
            // (spec §4.5).
            if content.max_bytes() < 3 {
                return Outcome::Invalid;
            }
            let third = found_or_return!(content.read_u8(2));
            let high_bitdepth = third & 0x40 != 0;
            let twelve_bit = third & 0x20 != 0;
            let monochrome = third & 0x10 != 0;
            let bit_depth = if high_bitdepth {
                if twelve_bit {
                    12
                } else {
                    10
                }
            } else {
                8
            };
            let num_channels = if monochrome { 1 } else { 3 };
            record.set_pixel_format_from_av1c(bit_depth, num_channels);
        }
        _ => {}
    }
    Outcome::Found(())
}

/// Re-enters `meta`'s `iref` box to find tiles derived from the primary
/// item, trying each in turn until one yields a pixel format (spec §4.6).
///
/// `Found(())` once `record` has a pixel format (possibly unchanged, if it
/// already had one — callers only invoke this when it didn't). `NotFound`
/// if `iref`/`dimg` is absent or no tile resolves a pixel format; this is
/// not `Invalid`, since lacking a working fallback is itself the
/// NotEnoughData-at-this-prefix or ordinary-failure case the public API
/// reports as such.
fn tile_fallback(
    meta: &Container<'_>,
    budget: &mut BoxBudget,
    primary_item_id: u32,
    record: &mut FeatureRecord,
) -> Outcome<()> {
    let (iref_header, iref) = match find_first_child(meta, budget, BoxType::ItemReference) {
        Outcome::Found(found) => found,
        Outcome::NotFound => return Outcome::NotFound,
        other => return other.erase(),
    };
    // dimg entries are plain boxes nested inside iref; it's iref's own
    // version (not anything on dimg itself) that sets the item-ID width
    // used to read from-item-id and to-item-id (spec §4.6, mirroring the
    // version-dependent ID width pitm uses for its own item_ID).
    let wide = iref_header.version.unwrap_or(0) >= 1;
    let id_size = if wide { 4u32 } else { 2u32 };

    let mut resolved = false;
    let scan = for_each_child(&iref, budget, |dimg_header, dimg_content| {
        if dimg_header.box_type != BoxType::DerivedImage {
            return Outcome::Found(true);
        }
        let from_item_id = if wide {
            found_or_return!(dimg_content.read_u32(0))
        } else {
            found_or_return!(dimg_content.read_u16(0)) as u32
        };
        if from_item_id != primary_item_id {
            return Outcome::Found(true);
        }
        // reference_count is always 16-bit regardless of iref's version
        // (spec §4.6: "reads the 16-bit reference_count").
        let reference_count = found_or_return!(dimg_content.read_u16(id_size)) as u32;
        let mut offset = id_size + 2;
        for _ in 0..reference_count {
            let tile_item_id = found_or_return!(if wide {
                dimg_content.read_u32(offset)
            } else {
                dimg_content.read_u16(offset).map(|v| v as u32)
            });
            offset += id_size;

            match extract_item_features(meta, budget, tile_item_id) {
                Outcome::Found(tile) if tile.has_pixel_format() => {
                    let (bit_depth, num_channels) = tile.pixel_format();
                    record.set_pixel_format(bit_depth, num_channels);
                    resolved = true;
                    return Outcome::Found(false);
                }
                Outcome::Found(_) | Outcome::Invalid => {}
                other => return other.erase(),
            }
        }
        Outcome::Found(true)
    });

    match scan {
        Outcome::Found(()) => {
            if resolved {
                Outcome::Found(())
            } else {
                Outcome::NotFound
            }
        }
        other => other.erase(),
    }
}

/// Scans `meta`'s `iprp`/`ipco` for an `auxC` property declaring the alpha
/// URN, widening `record`'s channel count if one is found (spec §4.7).
///
/// This is an approximation: it does not check that the `auxC` is actually
/// associated with the primary item (or its tiles) via `ipma`, since doing
/// so exactly would require re-running the association scan against every
/// item id under consideration. Any `auxC` anywhere in `ipco` declaring the
/// alpha URN is treated as alpha presence for the file as a whole.
fn detect_alpha(meta: &Container<'_>, budget: &mut BoxBudget, record: &mut FeatureRecord) -> Outcome<()> {
    let iprp = match find_first_child(meta, budget, BoxType::ItemProperties) {
        Outcome::Found((_, content)) => content,
        Outcome::NotFound => return Outcome::NotFound,
        other => return other.erase(),
    };
    let ipco = match find_first_child(&iprp, budget, BoxType::ItemPropertyContainer) {
        Outcome::Found((_, content)) => content,
        Outcome::NotFound => return Outcome::NotFound,
        other => return other.erase(),
    };

    let mut found_alpha = false;
    let scan = for_each_child(&ipco, budget, |header, content| {
        if header.box_type != BoxType::AuxiliaryType {
            return Outcome::Found(true);
        }
        match is_alpha_aux(content) {
            Outcome::Found(true) => {
                found_alpha = true;
                Outcome::Found(false)
            }
            Outcome::Found(false) => Outcome::Found(true),
            other => other,
        }
    });

    match scan {
        Outcome::Found(()) => {
            if found_alpha {
                record.add_alpha_channel();
                Outcome::Found(())
            } else {
                Outcome::NotFound
            }
        }
        other => other.erase(),
    }
}

fn is_alpha_aux(auxc: &Container<'_>) -> Outcome<bool> {
    if auxc.max_bytes() < ALPHA_URN.len() as u32 {
        return Outcome::Found(false);
    }
    let urn = found_or_return!(auxc.read_bytes(0, ALPHA_URN.len() as u32));
    Outcome::Found(urn == ALPHA_URN.as_slice())
}

/// Finds the first direct child of `container` whose type matches
/// `wanted`, scanning every sibling in order (spec: "first matching box
/// wins").
fn find_first_child<'a>(
    container: &Container<'a>,
    budget: &mut BoxBudget,
    wanted: BoxType,
) -> Outcome<(BoxHeader, Container<'a>)> {
    let mut found = None;
    let scan = for_each_child(container, budget, |header, content| {
        if header.box_type == wanted {
            found = Some((*header, *content));
            Outcome::Found(false)
        } else {
            Outcome::Found(true)
        }
    });
    match scan {
        Outcome::Found(()) => match found {
            Some(result) => Outcome::Found(result),
            None => Outcome::NotFound,
        },
        other => other.erase(),
    }
}

/// Finds the `n`th direct child of `container` in 1-based order (spec
/// §4.5's `ipma`-to-`ipco` association index).
fn find_nth_child<'a>(
    container: &Container<'a>,
    budget: &mut BoxBudget,
    n: u32,
) -> Outcome<(BoxHeader, Container<'a>)> {
    let mut index = 0u32;
    let mut found = None;
    let scan = for_each_child(container, budget, |header, content| {
        index += 1;
        if index == n {
            found = Some((*header, *content));
            Outcome::Found(false)
        } else {
            Outcome::Found(true)
        }
    });
    match scan {
        Outcome::Found(()) => match found {
            Some(result) => Outcome::Found(result),
            None => Outcome::NotFound,
        },
        other => other.erase(),
    }
}
