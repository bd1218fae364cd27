//! Forward transform eliding redundant left side bearings from 'hmtx'.
//!
//! A TrueType font's per-glyph lsb usually equals the glyph's x_min; when a
//! whole range (proportional or monospaced) matches, that range is dropped
//! and the decoder resupplies it from the reconstructed 'glyf'.

use bytes::{Buf, BufMut};

use crate::error::{Error, bail_if};

/// Apply the hmtx transform.
///
/// Returns `None` when the table must stay untransformed: no range can be
/// elided, or eliding would not actually shrink the table.
pub(crate) fn transform_hmtx(
    hmtx: &[u8],
    num_glyphs: u16,
    num_hmetrics: u16,
    x_mins: &[i16],
) -> Result<Option<Vec<u8>>, Error> {
    bail_if!(
        num_hmetrics < 1 || num_hmetrics > num_glyphs,
        Error::SfntInvalid {
            reason: "numberOfHMetrics out of range"
        }
    );
    debug_assert!(x_mins.len() == num_glyphs as usize);

    let num_glyphs = num_glyphs as usize;
    let num_hmetrics = num_hmetrics as usize;
    bail_if!(
        hmtx.len() != 4 * num_hmetrics + 2 * (num_glyphs - num_hmetrics),
        Error::SfntInvalid {
            reason: "hmtx length does not match hhea/maxp"
        }
    );

    let mut input = hmtx;
    let mut advance_widths: Vec<u16> = Vec::with_capacity(num_hmetrics);
    let mut lsbs: Vec<i16> = Vec::with_capacity(num_glyphs);
    for _ in 0..num_hmetrics {
        advance_widths.push(input.try_get_u16()?);
        lsbs.push(input.try_get_i16()?);
    }
    for _ in num_hmetrics..num_glyphs {
        lsbs.push(input.try_get_i16()?);
    }

    // Empty glyphs have x_min recorded as 0, so an empty glyph with a zero
    // lsb never blocks elision.
    let proportional_elidable = (0..num_hmetrics).all(|i| lsbs[i] == x_mins[i]);
    let monospace_elidable = (num_hmetrics..num_glyphs).all(|i| lsbs[i] == x_mins[i]);

    let mut flags: u8 = 0;
    if proportional_elidable {
        flags |= 1;
    }
    if monospace_elidable {
        flags |= 2;
    }
    if flags == 0 {
        return Ok(None);
    }

    let transformed_size = 1
        + 2 * num_hmetrics
        + if proportional_elidable { 0 } else { 2 * num_hmetrics }
        + if monospace_elidable {
            0
        } else {
            2 * (num_glyphs - num_hmetrics)
        };
    if transformed_size >= hmtx.len() {
        return Ok(None);
    }

    let mut out: Vec<u8> = Vec::with_capacity(transformed_size);
    out.put_u8(flags);
    for &advance_width in &advance_widths {
        out.put_u16(advance_width);
    }
    if !proportional_elidable {
        for &lsb in &lsbs[..num_hmetrics] {
            out.put_i16(lsb);
        }
    }
    if !monospace_elidable {
        for &lsb in &lsbs[num_hmetrics..] {
            out.put_i16(lsb);
        }
    }

    Ok(Some(out))
}
