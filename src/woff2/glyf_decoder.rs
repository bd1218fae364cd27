//! Inverse transform reconstructing the 'glyf' and 'loca' tables.
//!
//! <https://www.w3.org/TR/WOFF2/#glyf_table_format>

use arrayvec::ArrayVec;
use bytes::{Buf, BufMut};

use super::Point;
use crate::checksum::{compute_checksum, round4};
use crate::error::{Error, bail, bail_if, u32_will_overflow, usize_will_overflow};
use crate::tags;
use crate::variable_length::BufVariableExt as _;

// simple glyph flags
const GLYF_ON_CURVE: u8 = 1 << 0;
const GLYF_X_SHORT: u8 = 1 << 1;
const GLYF_Y_SHORT: u8 = 1 << 2;
const GLYF_REPEAT: u8 = 1 << 3;
const GLYF_THIS_X_IS_SAME: u8 = 1 << 4;
const GLYF_THIS_Y_IS_SAME: u8 = 1 << 5;
const GLYF_OVERLAP_SIMPLE: u8 = 1 << 6;

// composite glyph flags
pub(super) const FLAG_ARG_1_AND_2_ARE_WORDS: u16 = 1 << 0;
pub(super) const FLAG_WE_HAVE_A_SCALE: u16 = 1 << 3;
pub(super) const FLAG_MORE_COMPONENTS: u16 = 1 << 5;
pub(super) const FLAG_WE_HAVE_AN_X_AND_Y_SCALE: u16 = 1 << 6;
pub(super) const FLAG_WE_HAVE_A_TWO_BY_TWO: u16 = 1 << 7;
pub(super) const FLAG_WE_HAVE_INSTRUCTIONS: u16 = 1 << 8;

pub(super) const NUM_SUB_STREAMS: usize = 7;
pub(super) const OPTION_OVERLAP_SIMPLE_BITMAP: u16 = 1 << 0;

// 98% of Google Fonts have no glyph above 5k bytes.
// The largest glyph ever observed was 72k bytes.
const DEFAULT_GLYPH_BUF_SIZE: usize = 5120;

pub(crate) struct GlyfAndLocaData {
    /// The number of glyphs in the glyf table
    pub num_glyphs: u16,
    /// loca index format
    pub index_format: u16,
    /// The minimum x coordinate of each glyph (0 for empty glyphs).
    /// Used to reconstruct the hmtx table.
    pub x_mins: Vec<i16>,
    /// Reconstructed OpenType 'glyf' table
    pub glyf_table: Vec<u8>,
    /// Checksum of the 'glyf' table
    pub glyf_checksum: u32,
    /// Reconstructed OpenType 'loca' table
    pub loca_table: Vec<u8>,
    /// Checksum of the 'loca' table
    pub loca_checksum: u32,
}

/// Decode a WOFF2 transformed glyf table, regenerating loca alongside it.
pub(crate) fn reconstruct_glyf_and_loca(data: &[u8]) -> Result<GlyfAndLocaData, Error> {
    GlyfDecoder::new(data)
        .and_then(GlyfDecoder::reconstruct)
        .map_err(|err| match err {
            // Within the transform payload, running out of bytes means a
            // substream overran its declared bounds.
            Error::Truncated { .. } => Error::bad_transform(tags::GLYF, "glyph substream overrun"),
            other => other,
        })
}

struct GlyfDecoder<'a> {
    n_contour_stream: &'a [u8],
    n_points_stream: &'a [u8],
    flag_stream: &'a [u8],
    glyph_stream: &'a [u8],
    composite_stream: &'a [u8],
    bbox_bitmap: &'a [u8],
    bbox_stream: &'a [u8],
    instruction_stream: &'a [u8],
    overlap_bitmap: Option<&'a [u8]>,
    /// Scratch buffer the current glyph is assembled into
    glyph_buf: Vec<u8>,

    num_glyphs: u16,
    index_format: u16,
}

impl GlyfDecoder<'_> {
    fn new(data: &[u8]) -> Result<GlyfDecoder<'_>, Error> {
        let mut input = data;
        let _reserved: u16 = input.try_get_u16()?;
        let option_flags: u16 = input.try_get_u16()?;
        let has_overlap_bitmap = (option_flags & OPTION_OVERLAP_SIMPLE_BITMAP) != 0;
        let num_glyphs = input.try_get_u16()?;
        let index_format = input.try_get_u16()?;

        let mut offset: usize = (2 + NUM_SUB_STREAMS) * 4;
        bail_if!(
            offset > data.len(),
            Error::bad_transform(tags::GLYF, "transform header is short")
        );

        // Invariant from here on: data.len() >= offset
        let mut substreams: ArrayVec<&[u8], NUM_SUB_STREAMS> = ArrayVec::new();
        for i in 0..NUM_SUB_STREAMS {
            let substream_size = input.try_get_u32()? as usize;
            bail_if!(
                substream_size > data.len() - offset,
                Error::bad_transform(tags::GLYF, format!("substream {i} overflows the payload"))
            );
            substreams.push(&data[offset..(offset + substream_size)]);
            offset += substream_size;
        }

        // The front of the bbox substream is a bitmap with one bit per glyph,
        // padded to a whole number of 4-byte words.
        let bitmap_length: usize = ((num_glyphs as usize + 31) >> 5) << 2;
        bail_if!(
            bitmap_length > substreams[5].len(),
            Error::bad_transform(tags::GLYF, "bbox bitmap overflows its substream")
        );
        let (bbox_bitmap, bbox_stream) = substreams[5].split_at(bitmap_length);

        let mut overlap_bitmap: Option<&[u8]> = None;
        if has_overlap_bitmap {
            let overlap_bitmap_length = (num_glyphs as usize + 7) >> 3;
            bail_if!(
                overlap_bitmap_length > data.len() - offset,
                Error::bad_transform(tags::GLYF, "overlap bitmap overflows the payload")
            );
            overlap_bitmap = Some(&data[offset..(offset + overlap_bitmap_length)]);
        }

        Ok(GlyfDecoder {
            n_contour_stream: substreams[0],
            n_points_stream: substreams[1],
            flag_stream: substreams[2],
            glyph_stream: substreams[3],
            composite_stream: substreams[4],
            bbox_bitmap,
            bbox_stream,
            instruction_stream: substreams[6],
            overlap_bitmap,
            glyph_buf: Vec::with_capacity(DEFAULT_GLYPH_BUF_SIZE),
            num_glyphs,
            index_format,
        })
    }

    fn reconstruct(mut self) -> Result<GlyfAndLocaData, Error> {
        let mut glyf_checksum: u32 = 0;
        let mut glyf_table: Vec<u8> = Vec::with_capacity(self.num_glyphs as usize * 12);
        let mut loca_values: Vec<u32> = Vec::with_capacity(self.num_glyphs as usize + 1);
        let mut x_mins: Vec<i16> = Vec::with_capacity(self.num_glyphs as usize);

        for i in 0..(self.num_glyphs as usize) {
            loca_values.push(glyf_table.len() as u32);

            let n_contours: i16 = self.n_contour_stream.try_get_i16()?;
            let glyph_has_bbox = (self.bbox_bitmap[i >> 3] & (0x80 >> (i & 7))) != 0;

            self.glyph_buf.clear();
            if n_contours == -1 {
                // Composite glyphs must have an explicit bbox
                bail_if!(
                    !glyph_has_bbox,
                    Error::bad_transform(tags::GLYF, format!("composite glyph {i} has no bbox"))
                );
                self.decode_composite_glyph()?;
            } else if n_contours > 0 {
                // Note: same indexing expression as glyph_has_bbox above, but
                // into a different bitmap.
                let has_overlap_bit = self
                    .overlap_bitmap
                    .is_some_and(|bitmap| (bitmap[i >> 3] & (0x80 >> (i & 7))) != 0);
                self.decode_simple_glyph(n_contours as usize, glyph_has_bbox, has_overlap_bit)?;
            } else if n_contours == 0 {
                // Empty glyph; must NOT have a bbox
                bail_if!(
                    glyph_has_bbox,
                    Error::bad_transform(tags::GLYF, format!("empty glyph {i} has a bbox"))
                );
            } else {
                bail!(Error::bad_transform(
                    tags::GLYF,
                    format!("glyph {i} has {n_contours} contours")
                ));
            }

            glyf_checksum = glyf_checksum.wrapping_add(compute_checksum(&self.glyph_buf));

            // The x_min of any non-empty glyph sits at bytes 2..4 of its
            // header; keep it around in case hmtx needs reconstructing.
            if !self.glyph_buf.is_empty() {
                x_mins.push(i16::from_be_bytes(self.glyph_buf[2..4].try_into().unwrap()));
            } else {
                x_mins.push(0);
            }

            // Write the glyph into the output table, keeping glyphs 4-byte
            // aligned so short loca offsets stay representable.
            glyf_table.extend_from_slice(&self.glyph_buf);
            glyf_table.resize(round4(glyf_table.len()), 0);
        }

        // loca[numGlyphs] equals the length of the glyph data table
        loca_values.push(glyf_table.len() as u32);

        let (loca_table, loca_checksum) = generate_loca_table(&loca_values, self.index_format)?;

        Ok(GlyfAndLocaData {
            num_glyphs: self.num_glyphs,
            index_format: self.index_format,
            x_mins,
            loca_table,
            loca_checksum,
            glyf_table,
            glyf_checksum,
        })
    }

    /// Decode one composite glyph into `self.glyph_buf`.
    fn decode_composite_glyph(&mut self) -> Result<(), Error> {
        // Scan a copy of the composite stream to size the record chain, then
        // copy exactly that many bytes off the real stream below.
        let mut scan_stream = self.composite_stream;
        let (composite_size, have_instructions) = composite_record_chain_size(&mut scan_stream)?;

        let instruction_size: u16 = if have_instructions {
            self.glyph_stream.try_get_variable_255_u16()?
        } else {
            0
        };

        let size_needed = 12 + composite_size + instruction_size as usize;
        self.glyph_buf.reserve(size_needed);

        self.glyph_buf.put_i16(-1); // nContours
        self.bbox_stream.try_read_bytes_into(8, &mut self.glyph_buf)?;
        self.composite_stream
            .try_read_bytes_into(composite_size, &mut self.glyph_buf)?;

        if have_instructions {
            self.glyph_buf.put_u16(instruction_size);
            self.instruction_stream
                .try_read_bytes_into(instruction_size as usize, &mut self.glyph_buf)?;
        }

        Ok(())
    }

    /// Decode one simple glyph into `self.glyph_buf`.
    fn decode_simple_glyph(
        &mut self,
        n_contours: usize,
        glyph_has_bbox: bool,
        has_overlap_bit: bool,
    ) -> Result<(), Error> {
        let mut n_points_vec: Vec<u16> = Vec::with_capacity(n_contours);
        let mut total_n_points: u32 = 0;
        for _ in 0..n_contours {
            let n_points_contour = self.n_points_stream.try_get_variable_255_u16()?;
            n_points_vec.push(n_points_contour);
            bail_if!(
                u32_will_overflow(total_n_points, n_points_contour as u32),
                Error::bad_transform(tags::GLYF, "point count overflow")
            );
            total_n_points += n_points_contour as u32;
        }

        let flag_size = total_n_points as usize;
        bail_if!(
            flag_size > self.flag_stream.len(),
            Error::Truncated {
                context: "flag substream"
            }
        );

        let mut points = Vec::with_capacity(total_n_points as usize);
        let triplet_bytes_consumed = decode_triplets(
            &self.flag_stream[0..flag_size],
            self.glyph_stream,
            &mut points,
        )?;
        self.flag_stream.advance(flag_size);
        self.glyph_stream.advance(triplet_bytes_consumed);

        let instruction_size = self.glyph_stream.try_get_variable_255_u16()?;
        bail_if!(
            total_n_points >= (1 << 27),
            Error::bad_transform(tags::GLYF, "implausible point count")
        );

        let size_needed = 12 + 2 * n_contours + 5 * total_n_points as usize + instruction_size as usize;
        self.glyph_buf.reserve(size_needed);

        self.glyph_buf.put_i16(n_contours as i16);

        if glyph_has_bbox {
            self.bbox_stream.try_read_bytes_into(8, &mut self.glyph_buf)?;
        } else {
            write_bbox(&points, &mut self.glyph_buf);
        }

        let mut end_point: i32 = -1;
        for contour in n_points_vec {
            end_point += contour as i32;
            bail_if!(
                end_point >= 65536,
                Error::bad_transform(tags::GLYF, "contour end point out of range")
            );
            self.glyph_buf.put_u16(end_point as u16);
        }

        self.glyph_buf.put_u16(instruction_size);
        self.instruction_stream
            .try_read_bytes_into(instruction_size as usize, &mut self.glyph_buf)?;

        write_glyph_points(&points, has_overlap_bit, &mut self.glyph_buf);

        Ok(())
    }
}

/// Walk a chain of composite glyph records and return its total byte size
/// and whether any record carries instructions.
///
/// The argument block of each record is sized by its flag word; the chain
/// ends at the first record without MORE_COMPONENTS.
pub(super) fn composite_record_chain_size(
    composite_stream: &mut impl Buf,
) -> Result<(usize, bool), Error> {
    let mut bytes_read: usize = 0;
    let mut we_have_instructions = false;
    let mut flags = FLAG_MORE_COMPONENTS;
    while flags & FLAG_MORE_COMPONENTS != 0 {
        flags = composite_stream.try_get_u16()?;
        we_have_instructions |= (flags & FLAG_WE_HAVE_INSTRUCTIONS) != 0;
        let mut arg_size: usize = 2; // glyph index
        if flags & FLAG_ARG_1_AND_2_ARE_WORDS != 0 {
            arg_size += 4;
        } else {
            arg_size += 2;
        }
        if flags & FLAG_WE_HAVE_A_SCALE != 0 {
            arg_size += 2;
        } else if flags & FLAG_WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            arg_size += 4;
        } else if flags & FLAG_WE_HAVE_A_TWO_BY_TWO != 0 {
            arg_size += 8;
        }
        bail_if!(
            composite_stream.remaining() < arg_size,
            Error::Truncated {
                context: "composite glyph record"
            }
        );
        composite_stream.advance(arg_size);

        bytes_read += 2 + arg_size;
    }

    Ok((bytes_read, we_have_instructions))
}

/// Decode `flags_in.len()` triplet-encoded points from `data`, pushing
/// absolute coordinates into `result`. Returns how many bytes of `data`
/// were consumed.
///
/// <https://www.w3.org/TR/WOFF2/#triplet_decoding>
fn decode_triplets(flags_in: &[u8], data: &[u8], result: &mut Vec<Point>) -> Result<usize, Error> {
    #[inline(always)]
    fn with_sign(flag: i32, baseval: i32) -> i32 {
        // Precondition: 0 <= baseval < 65536 (to avoid integer overflow)
        if (flag & 1) != 0 { baseval } else { -baseval }
    }

    #[inline(always)]
    fn safe_add(a: i32, b: i32) -> Result<i32, Error> {
        a.checked_add(b)
            .ok_or_else(|| Error::bad_transform(tags::GLYF, "coordinate overflow"))
    }

    let mut x: i32 = 0;
    let mut y: i32 = 0;

    bail_if!(
        flags_in.len() > data.len(),
        Error::Truncated {
            context: "triplet data"
        }
    );

    let mut triplet_index: usize = 0;

    for &flag in flags_in {
        let on_curve = (flag >> 7) == 0;
        let flag = (flag & 0x7F) as i32;

        let n_data_bytes: usize = if flag < 84 {
            1
        } else if flag < 120 {
            2
        } else if flag < 124 {
            3
        } else {
            4
        };

        bail_if!(
            usize_will_overflow(triplet_index, n_data_bytes)
                || triplet_index + n_data_bytes > data.len(),
            Error::Truncated {
                context: "triplet data"
            }
        );

        let dx: i32;
        let dy: i32;
        if flag < 10 {
            dx = 0;
            dy = with_sign(flag, ((flag & 14) << 7) + data[triplet_index] as i32);
        } else if flag < 20 {
            dx = with_sign(flag, (((flag - 10) & 14) << 7) + data[triplet_index] as i32);
            dy = 0;
        } else if flag < 84 {
            let b0 = flag - 20;
            let b1 = data[triplet_index] as i32;
            dx = with_sign(flag, 1 + (b0 & 0x30) + (b1 >> 4));
            dy = with_sign(flag >> 1, 1 + ((b0 & 0x0C) << 2) + (b1 & 0x0F));
        } else if flag < 120 {
            let b0 = flag - 84;
            dx = with_sign(flag, 1 + ((b0 / 12) << 8) + data[triplet_index] as i32);
            dy = with_sign(
                flag >> 1,
                1 + (((b0 % 12) >> 2) << 8) + data[triplet_index + 1] as i32,
            );
        } else if flag < 124 {
            let b2 = data[triplet_index + 1] as i32;
            dx = with_sign(flag, ((data[triplet_index] as i32) << 4) + (b2 >> 4));
            dy = with_sign(flag >> 1, ((b2 & 0x0F) << 8) + data[triplet_index + 2] as i32);
        } else {
            dx = with_sign(
                flag,
                ((data[triplet_index] as i32) << 8) + data[triplet_index + 1] as i32,
            );
            dy = with_sign(
                flag >> 1,
                ((data[triplet_index + 2] as i32) << 8) + data[triplet_index + 3] as i32,
            );
        }
        triplet_index += n_data_bytes;
        x = safe_add(x, dx)?;
        y = safe_add(y, dy)?;

        result.push(Point { x, y, on_curve });
    }

    Ok(triplet_index)
}

/// Serialize point data in the TrueType simple-glyph wire format: run-length
/// compressed flags followed by packed x then y deltas.
///
/// On entry `dst` holds the glyph record up to and including the
/// instructions.
fn write_glyph_points(points: &[Point], has_overlap_bit: bool, dst: &mut impl BufMut) {
    // Not a valid flag value, so the first point never extends a run
    let mut last_flag: u16 = u16::MAX;
    let mut repeat_count: u8 = 0;
    let mut last_x: i32 = 0;
    let mut last_y: i32 = 0;

    // Flags. A flag equal to its predecessor extends a run; a run is flushed
    // as the flag byte with GLYF_REPEAT set followed by the repeat count.
    // Flushing is deferred until the run is known to be over so that writes
    // stay strictly append-only.
    for (i, point) in points.iter().enumerate() {
        let flag = {
            let mut flag: u8 = 0;
            if point.on_curve {
                flag |= GLYF_ON_CURVE;
            }
            if has_overlap_bit && i == 0 {
                flag |= GLYF_OVERLAP_SIMPLE;
            }

            let dx = point.x - last_x;
            if dx == 0 {
                flag |= GLYF_THIS_X_IS_SAME;
            } else if dx > -256 && dx < 256 {
                flag |= GLYF_X_SHORT | (if dx > 0 { GLYF_THIS_X_IS_SAME } else { 0 });
            }

            let dy = point.y - last_y;
            if dy == 0 {
                flag |= GLYF_THIS_Y_IS_SAME;
            } else if dy > -256 && dy < 256 {
                flag |= GLYF_Y_SHORT | (if dy > 0 { GLYF_THIS_Y_IS_SAME } else { 0 });
            }

            flag as u16
        };

        if flag == last_flag && repeat_count < 255 {
            repeat_count += 1;
        } else {
            if i > 0 {
                flush_flag_run(last_flag as u8, repeat_count, dst);
            }
            repeat_count = 0;
        }

        last_x = point.x;
        last_y = point.y;
        last_flag = flag;
    }
    if !points.is_empty() {
        flush_flag_run(last_flag as u8, repeat_count, dst);
    }

    // x coordinates
    last_x = 0;
    for point in points {
        let dx = point.x - last_x;
        if dx == 0 {
            // elided
        } else if dx > -256 && dx < 256 {
            dst.put_u8(dx.unsigned_abs() as u8);
        } else {
            // always fits for valid input, and overflow is harmless
            dst.put_i16(dx as i16);
        }
        last_x = point.x;
    }

    // y coordinates
    last_y = 0;
    for point in points {
        let dy = point.y - last_y;
        if dy == 0 {
            // elided
        } else if dy > -256 && dy < 256 {
            dst.put_u8(dy.unsigned_abs() as u8);
        } else {
            dst.put_i16(dy as i16);
        }
        last_y = point.y;
    }
}

fn flush_flag_run(flag: u8, repeat_count: u8, dst: &mut impl BufMut) {
    if repeat_count > 0 {
        dst.put_u8(flag | GLYF_REPEAT);
        dst.put_u8(repeat_count);
    } else {
        dst.put_u8(flag);
    }
}

/// Compute the bounding box of `points` and append it as four s16 values.
fn write_bbox(points: &[Point], dst: &mut impl BufMut) {
    let mut x_min: i32 = 0;
    let mut y_min: i32 = 0;
    let mut x_max: i32 = 0;
    let mut y_max: i32 = 0;

    if let Some(first) = points.first() {
        x_min = first.x;
        x_max = first.x;
        y_min = first.y;
        y_max = first.y;
    }
    for &Point { x, y, .. } in points.iter().skip(1) {
        x_min = x.min(x_min);
        x_max = x.max(x_max);
        y_min = y.min(y_min);
        y_max = y.max(y_max);
    }

    dst.put_i16(x_min as i16);
    dst.put_i16(y_min as i16);
    dst.put_i16(x_max as i16);
    dst.put_i16(y_max as i16);
}

/// Serialize a loca table from glyph offsets.
///
/// See <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6loca.html>
pub(super) fn generate_loca_table(
    loca_values: &[u32],
    index_format: u16,
) -> Result<(Vec<u8>, u32), Error> {
    let offset_size: usize = if index_format != 0 { 4 } else { 2 };

    let mut loca_content: Vec<u8> = Vec::with_capacity(loca_values.len() * offset_size);
    if index_format != 0 {
        for &value in loca_values {
            loca_content.put_u32(value);
        }
    } else {
        // The short version stores offset / 2; offsets are 4-byte aligned so
        // halving is exact, but the halved value must still fit in a u16.
        for &value in loca_values {
            bail_if!(
                value >> 1 > u16::MAX as u32,
                Error::bad_transform(tags::LOCA, "glyph offset too large for short loca")
            );
            loca_content.put_u16((value >> 1) as u16);
        }
    }

    let checksum = compute_checksum(&loca_content);

    Ok((loca_content, checksum))
}

#[cfg(test)]
pub(super) mod tests_support {
    use super::*;

    /// Decode exactly one triplet; panics if `data` is not fully consumed.
    pub(in crate::woff2) fn decode_single_triplet(flag: u8, data: &[u8]) -> (i32, i32, bool) {
        let mut points = Vec::new();
        let consumed = decode_triplets(&[flag], data, &mut points).unwrap();
        assert_eq!(consumed, data.len(), "not all data bytes consumed");
        let point = points[0];
        (point.x, point.y, point.on_curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_runs_round_length_255() {
        // 300 identical points: a full 256-long run plus a 44-long run
        let points: Vec<Point> = (0..300)
            .map(|i| Point {
                x: 10 * (i + 1),
                y: 0,
                on_curve: true,
            })
            .collect();
        let mut out: Vec<u8> = Vec::new();
        write_glyph_points(&points, false, &mut out);

        // flags: [flag | REPEAT, 255, flag | REPEAT, 43], then 300 x-bytes
        assert_eq!(out.len(), 4 + 300);
        assert_eq!(out[0] & GLYF_REPEAT, GLYF_REPEAT);
        assert_eq!(out[1], 255);
        assert_eq!(out[3], 43);
    }

    #[test]
    fn composite_chain_sizes() {
        let mut record: Vec<u8> = Vec::new();
        record.put_u16(FLAG_ARG_1_AND_2_ARE_WORDS | FLAG_MORE_COMPONENTS);
        record.put_u16(4); // glyph index
        record.put_i16(1); // word-sized args
        record.put_i16(2);
        record.put_u16(FLAG_WE_HAVE_A_TWO_BY_TWO | FLAG_WE_HAVE_INSTRUCTIONS);
        record.put_u16(5);
        record.put_i8(-1); // byte-sized args
        record.put_i8(-2);
        record.put_slice(&[0; 8]); // 2x2 matrix

        let mut stream = record.as_slice();
        let (size, have_instructions) = composite_record_chain_size(&mut stream).unwrap();
        assert_eq!(size, (2 + 6) + (2 + 12));
        assert!(stream.is_empty());
        assert!(have_instructions);
    }

    #[test]
    fn composite_chain_rejects_truncation() {
        let mut record: Vec<u8> = Vec::new();
        record.put_u16(FLAG_MORE_COMPONENTS);
        record.put_u16(4);
        // chain claims more components but the stream ends here
        let mut stream = &record.as_slice()[..record.len() - 1];
        assert!(composite_record_chain_size(&mut stream).is_err());
    }

    #[test]
    fn short_loca_halves_offsets() {
        let (loca, _) = generate_loca_table(&[0, 4, 12], 0).unwrap();
        assert_eq!(loca, [0, 0, 0, 2, 0, 6]);
    }

    #[test]
    fn long_loca_stores_offsets_verbatim() {
        let (loca, _) = generate_loca_table(&[0, 0x2_0000], 1).unwrap();
        assert_eq!(loca, [0, 0, 0, 0, 0, 2, 0, 0]);
    }
}
