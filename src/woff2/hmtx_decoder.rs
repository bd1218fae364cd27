//! Inverse transform reconstructing the 'hmtx' table.
//!
//! <https://www.w3.org/TR/WOFF2/#hmtx_table_format>

use bytes::{Buf, BufMut};

use crate::error::{Error, bail_if};
use crate::tags;

/// Decode a WOFF2 transformed hmtx table, resupplying the elided left side
/// bearings from the x_min values harvested while rebuilding 'glyf'.
pub(crate) fn reconstruct_hmtx(
    data: &[u8],
    num_glyphs: u16,
    num_hmetrics: u16,
    x_mins: &[i16],
) -> Result<Vec<u8>, Error> {
    reconstruct_impl(data, num_glyphs, num_hmetrics, x_mins).map_err(|err| match err {
        Error::Truncated { .. } => Error::bad_transform(tags::HMTX, "transformed hmtx is short"),
        other => other,
    })
}

fn reconstruct_impl(
    mut input: &[u8],
    num_glyphs: u16,
    num_hmetrics: u16,
    x_mins: &[i16],
) -> Result<Vec<u8>, Error> {
    let hmtx_flags = input.try_get_u8()?;
    let has_proportional_lsbs = (hmtx_flags & 1) == 0;
    let has_monospace_lsbs = (hmtx_flags & 2) == 0;

    // Bits 2-7 are reserved and MUST be zero
    bail_if!(
        hmtx_flags & 0xFC != 0,
        Error::bad_transform(tags::HMTX, "reserved flag bits 2-7 are set")
    );

    // You say you transformed but there is little evidence of it
    bail_if!(
        has_proportional_lsbs && has_monospace_lsbs,
        Error::bad_transform(tags::HMTX, "transform with no elided bearings")
    );

    // A zero glyph count is fine for a font without 'glyf', but such a font
    // cannot have a transformed 'hmtx'. This also rejects a transformed hmtx
    // paired with an untransformed (passthrough) glyf, where no x_min vector
    // exists to reconstruct from.
    bail_if!(
        num_hmetrics > num_glyphs,
        Error::bad_transform(tags::HMTX, "more hmetrics than glyphs")
    );

    // "...only one entry need be in the array, but that entry is required."
    // <https://www.microsoft.com/typography/otspec/hmtx.htm>
    bail_if!(
        num_hmetrics < 1,
        Error::bad_transform(tags::HMTX, "zero hmetrics")
    );

    debug_assert!(x_mins.len() == num_glyphs as usize);

    let mut advance_widths: Vec<u16> = Vec::with_capacity(num_hmetrics as usize);
    for _ in 0..num_hmetrics {
        advance_widths.push(input.try_get_u16()?);
    }

    // lsb (proportional) and leftSideBearing (monospaced) values, sharing
    // one Vec since the output interleaving doesn't care
    let mut lsbs: Vec<i16> = Vec::with_capacity(num_glyphs as usize);
    for i in 0..num_hmetrics as usize {
        lsbs.push(if has_proportional_lsbs {
            input.try_get_i16()?
        } else {
            x_mins[i]
        });
    }
    for i in num_hmetrics as usize..num_glyphs as usize {
        lsbs.push(if has_monospace_lsbs {
            input.try_get_i16()?
        } else {
            x_mins[i]
        });
    }

    // Bake the standard hmtx layout
    let output_size = 2 * num_glyphs as usize + 2 * num_hmetrics as usize;
    let mut hmtx_table: Vec<u8> = Vec::with_capacity(output_size);
    for i in 0..num_glyphs as usize {
        if i < num_hmetrics as usize {
            hmtx_table.put_u16(advance_widths[i]);
        }
        hmtx_table.put_i16(lsbs[i]);
    }

    Ok(hmtx_table)
}
