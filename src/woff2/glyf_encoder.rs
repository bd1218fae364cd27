//! Forward transform turning the 'glyf' and 'loca' tables into the WOFF2
//! substream representation.
//!
//! The inverse of [`super::glyf_decoder`]: glyphs are taken apart into
//! contour counts, per-point triplets, composite records, bounding boxes and
//! instructions, each concatenated into its own substream so Brotli sees
//! like-typed data back to back.

use bytes::{Buf, BufMut};

use super::glyf_decoder::{
    NUM_SUB_STREAMS, OPTION_OVERLAP_SIMPLE_BITMAP, composite_record_chain_size,
};
use crate::error::{Error, bail, bail_if};
use crate::variable_length::BufMutVariableExt as _;

// simple glyph flags, as stored in the original TrueType table
const GLYF_ON_CURVE: u8 = 1 << 0;
const GLYF_X_SHORT: u8 = 1 << 1;
const GLYF_Y_SHORT: u8 = 1 << 2;
const GLYF_REPEAT: u8 = 1 << 3;
const GLYF_THIS_X_IS_SAME: u8 = 1 << 4;
const GLYF_THIS_Y_IS_SAME: u8 = 1 << 5;
const GLYF_OVERLAP_SIMPLE: u8 = 1 << 6;

pub(crate) struct GlyfTransform {
    /// The transformed glyf table, ready for the compressed data block.
    /// The paired loca transform is the empty byte string.
    pub table: Vec<u8>,
    /// The minimum x coordinate of each glyph (0 for empty glyphs), for the
    /// hmtx transform's LSB comparison.
    pub x_mins: Vec<i16>,
    pub num_glyphs: u16,
}

/// Apply the WOFF2 glyph transform.
///
/// `loca_offsets` must hold `num_glyphs + 1` monotonic offsets into `glyf`
/// (see [`crate::sfnt::parse_loca`]).
pub(crate) fn transform_glyf_and_loca(
    glyf: &[u8],
    loca_offsets: &[u32],
    num_glyphs: u16,
    index_format: u16,
) -> Result<GlyfTransform, Error> {
    let mut encoder = GlyfEncoder::new(num_glyphs);

    for i in 0..num_glyphs as usize {
        let start = loca_offsets[i] as usize;
        let end = loca_offsets[i + 1] as usize;
        encoder
            .encode_glyph(i, &glyf[start..end])
            .map_err(|err| match err {
                Error::Truncated { .. } => Error::SfntInvalid {
                    reason: "glyph record is truncated",
                },
                other => other,
            })?;
    }

    Ok(GlyfTransform {
        table: encoder.serialize(num_glyphs, index_format),
        x_mins: encoder.x_mins,
        num_glyphs,
    })
}

struct GlyfEncoder {
    n_contour_stream: Vec<u8>,
    n_points_stream: Vec<u8>,
    flag_stream: Vec<u8>,
    glyph_stream: Vec<u8>,
    composite_stream: Vec<u8>,
    bbox_bitmap: Vec<u8>,
    bbox_stream: Vec<u8>,
    instruction_stream: Vec<u8>,
    overlap_bitmap: Vec<u8>,
    any_overlap: bool,
    x_mins: Vec<i16>,
}

impl GlyfEncoder {
    fn new(num_glyphs: u16) -> Self {
        let n = num_glyphs as usize;
        Self {
            n_contour_stream: Vec::with_capacity(2 * n),
            n_points_stream: Vec::with_capacity(n),
            flag_stream: Vec::with_capacity(4 * n),
            glyph_stream: Vec::with_capacity(8 * n),
            composite_stream: Vec::new(),
            // One bit per glyph, padded to a whole number of u32 words
            bbox_bitmap: vec![0; ((n + 31) >> 5) << 2],
            bbox_stream: Vec::new(),
            instruction_stream: Vec::new(),
            overlap_bitmap: vec![0; (n + 7) >> 3],
            any_overlap: false,
            x_mins: Vec::with_capacity(n),
        }
    }

    fn set_bbox_bit(&mut self, glyph: usize) {
        self.bbox_bitmap[glyph >> 3] |= 0x80 >> (glyph & 7);
    }

    fn set_overlap_bit(&mut self, glyph: usize) {
        self.overlap_bitmap[glyph >> 3] |= 0x80 >> (glyph & 7);
        self.any_overlap = true;
    }

    fn encode_glyph(&mut self, index: usize, mut glyph: &[u8]) -> Result<(), Error> {
        if glyph.is_empty() {
            // Empty glyph: a zero contour count and nothing else
            self.n_contour_stream.put_i16(0);
            self.x_mins.push(0);
            return Ok(());
        }

        let n_contours = glyph.try_get_i16()?;
        if n_contours == 0 {
            // A degenerate non-empty record for an empty glyph; normalize it
            // away like the reference encoder does.
            self.n_contour_stream.put_i16(0);
            self.x_mins.push(0);
            return Ok(());
        }

        self.n_contour_stream.put_i16(n_contours);
        let bbox = [
            glyph.try_get_i16()?,
            glyph.try_get_i16()?,
            glyph.try_get_i16()?,
            glyph.try_get_i16()?,
        ];
        self.x_mins.push(bbox[0]);

        if n_contours == -1 {
            self.encode_composite_glyph(index, glyph, bbox)
        } else if n_contours > 0 {
            self.encode_simple_glyph(index, glyph, n_contours as usize, bbox)
        } else {
            bail!(Error::SfntInvalid {
                reason: "glyph has a negative contour count other than -1"
            })
        }
    }

    fn encode_composite_glyph(
        &mut self,
        index: usize,
        mut glyph: &[u8],
        bbox: [i16; 4],
    ) -> Result<(), Error> {
        // Composite glyphs always carry their bbox explicitly
        self.set_bbox_bit(index);
        for value in bbox {
            self.bbox_stream.put_i16(value);
        }

        let mut scan = glyph;
        let (composite_size, have_instructions) = composite_record_chain_size(&mut scan)?;
        self.composite_stream.extend_from_slice(&glyph[..composite_size]);
        glyph.advance(composite_size);

        if have_instructions {
            let instruction_size = glyph.try_get_u16()?;
            bail_if!(
                glyph.remaining() < instruction_size as usize,
                Error::Truncated {
                    context: "composite glyph instructions"
                }
            );
            self.glyph_stream.put_variable_255_u16(instruction_size);
            self.instruction_stream
                .extend_from_slice(&glyph[..instruction_size as usize]);
        }

        Ok(())
    }

    fn encode_simple_glyph(
        &mut self,
        index: usize,
        mut glyph: &[u8],
        n_contours: usize,
        bbox: [i16; 4],
    ) -> Result<(), Error> {
        // endPtsOfContours -> per-contour point counts
        let mut n_points: usize = 0;
        let mut counts = Vec::with_capacity(n_contours);
        for _ in 0..n_contours {
            let end_point = glyph.try_get_u16()? as usize + 1;
            bail_if!(
                end_point <= n_points,
                Error::SfntInvalid {
                    reason: "contour end points do not increase"
                }
            );
            counts.push((end_point - n_points) as u16);
            n_points = end_point;
        }
        for count in counts {
            self.n_points_stream.put_variable_255_u16(count);
        }

        let instruction_size = glyph.try_get_u16()?;
        bail_if!(
            glyph.remaining() < instruction_size as usize,
            Error::Truncated {
                context: "simple glyph instructions"
            }
        );
        let instructions = &glyph[..instruction_size as usize];
        glyph.advance(instruction_size as usize);

        let points = parse_points(&mut glyph, n_points)?;

        if let Some(first) = points.first()
            && first.raw_flag & GLYF_OVERLAP_SIMPLE != 0
        {
            self.set_overlap_bit(index);
        }

        // Triplet-encode the point deltas
        let mut last_x: i32 = 0;
        let mut last_y: i32 = 0;
        for point in &points {
            encode_triplet(
                point.x - last_x,
                point.y - last_y,
                point.on_curve(),
                &mut self.flag_stream,
                &mut self.glyph_stream,
            );
            last_x = point.x;
            last_y = point.y;
        }

        self.glyph_stream.put_variable_255_u16(instruction_size);
        self.instruction_stream.extend_from_slice(instructions);

        // The bbox can be recomputed from the points on decode; only keep it
        // when the font stored something different from the computed one.
        if bbox != computed_bbox(&points) {
            self.set_bbox_bit(index);
            for value in bbox {
                self.bbox_stream.put_i16(value);
            }
        }

        Ok(())
    }

    /// Assemble the transformed table: header, substream lengths, substream
    /// bodies, and the overlap bitmap when any glyph needs it.
    fn serialize(&self, num_glyphs: u16, index_format: u16) -> Vec<u8> {
        let substreams: [&[u8]; NUM_SUB_STREAMS] = [
            &self.n_contour_stream,
            &self.n_points_stream,
            &self.flag_stream,
            &self.glyph_stream,
            &self.composite_stream,
            // bbox bitmap and explicit boxes share a substream
            &[], // placeholder, handled below
            &self.instruction_stream,
        ];
        let bbox_size = self.bbox_bitmap.len() + self.bbox_stream.len();
        let total: usize = (2 + NUM_SUB_STREAMS) * 4
            + substreams.iter().map(|s| s.len()).sum::<usize>()
            + bbox_size
            + if self.any_overlap {
                self.overlap_bitmap.len()
            } else {
                0
            };

        let mut out: Vec<u8> = Vec::with_capacity(total);
        out.put_u16(0); // reserved
        out.put_u16(if self.any_overlap {
            OPTION_OVERLAP_SIMPLE_BITMAP
        } else {
            0
        });
        out.put_u16(num_glyphs);
        out.put_u16(index_format);

        out.put_u32(self.n_contour_stream.len() as u32);
        out.put_u32(self.n_points_stream.len() as u32);
        out.put_u32(self.flag_stream.len() as u32);
        out.put_u32(self.glyph_stream.len() as u32);
        out.put_u32(self.composite_stream.len() as u32);
        out.put_u32(bbox_size as u32);
        out.put_u32(self.instruction_stream.len() as u32);

        out.extend_from_slice(&self.n_contour_stream);
        out.extend_from_slice(&self.n_points_stream);
        out.extend_from_slice(&self.flag_stream);
        out.extend_from_slice(&self.glyph_stream);
        out.extend_from_slice(&self.composite_stream);
        out.extend_from_slice(&self.bbox_bitmap);
        out.extend_from_slice(&self.bbox_stream);
        out.extend_from_slice(&self.instruction_stream);
        if self.any_overlap {
            out.extend_from_slice(&self.overlap_bitmap);
        }

        out
    }
}

/// A point parsed from the TrueType wire format, keeping the raw flag byte
/// for the overlap bit.
struct RawPoint {
    x: i32,
    y: i32,
    raw_flag: u8,
}

impl RawPoint {
    fn on_curve(&self) -> bool {
        self.raw_flag & GLYF_ON_CURVE != 0
    }
}

fn computed_bbox(points: &[RawPoint]) -> [i16; 4] {
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
    for point in points.iter().skip(1) {
        x_min = point.x.min(x_min);
        x_max = point.x.max(x_max);
        y_min = point.y.min(y_min);
        y_max = point.y.max(y_max);
    }

    [x_min as i16, y_min as i16, x_max as i16, y_max as i16]
}

/// Read `n_points` run-length compressed flags and the packed coordinate
/// arrays that follow them.
fn parse_points(glyph: &mut &[u8], n_points: usize) -> Result<Vec<RawPoint>, Error> {
    // Flags
    let mut flags: Vec<u8> = Vec::with_capacity(n_points);
    while flags.len() < n_points {
        let flag = glyph.try_get_u8()?;
        flags.push(flag);
        if flag & GLYF_REPEAT != 0 {
            let repeats = glyph.try_get_u8()? as usize;
            bail_if!(
                flags.len() + repeats > n_points,
                Error::SfntInvalid {
                    reason: "glyph flag run overruns the point count"
                }
            );
            for _ in 0..repeats {
                flags.push(flag);
            }
        }
    }

    let mut points: Vec<RawPoint> = Vec::with_capacity(n_points);

    // x coordinates
    let mut x: i32 = 0;
    for &flag in &flags {
        let dx: i32 = if flag & GLYF_X_SHORT != 0 {
            let magnitude = glyph.try_get_u8()? as i32;
            if flag & GLYF_THIS_X_IS_SAME != 0 {
                magnitude
            } else {
                -magnitude
            }
        } else if flag & GLYF_THIS_X_IS_SAME != 0 {
            0
        } else {
            glyph.try_get_i16()? as i32
        };
        x += dx;
        points.push(RawPoint {
            x,
            y: 0,
            raw_flag: flag,
        });
    }

    // y coordinates
    let mut y: i32 = 0;
    for point in &mut points {
        let flag = point.raw_flag;
        let dy: i32 = if flag & GLYF_Y_SHORT != 0 {
            let magnitude = glyph.try_get_u8()? as i32;
            if flag & GLYF_THIS_Y_IS_SAME != 0 {
                magnitude
            } else {
                -magnitude
            }
        } else if flag & GLYF_THIS_Y_IS_SAME != 0 {
            0
        } else {
            glyph.try_get_i16()? as i32
        };
        y += dy;
        point.y = y;
    }

    Ok(points)
}

/// Encode one point delta as a triplet: a 7-bit flag (plus the off-curve
/// high bit) and one to four data bytes.
///
/// Always picks the lowest-numbered encoding whose ranges accept the
/// magnitudes, which is also the shortest.
fn encode_triplet(dx: i32, dy: i32, on_curve: bool, flags: &mut Vec<u8>, data: &mut Vec<u8>) {
    let on_curve_bit: i32 = if on_curve { 0 } else { 128 };
    let abs_x = dx.abs();
    let abs_y = dy.abs();
    let x_sign = (dx >= 0) as i32;
    let y_sign = (dy >= 0) as i32;
    let xy_signs = x_sign + 2 * y_sign;

    if dx == 0 && abs_y < 1280 {
        flags.push((on_curve_bit + ((abs_y & 0xF00) >> 7) + y_sign) as u8);
        data.push((abs_y & 0xFF) as u8);
    } else if dy == 0 && abs_x < 1280 {
        flags.push((on_curve_bit + 10 + ((abs_x & 0xF00) >> 7) + x_sign) as u8);
        data.push((abs_x & 0xFF) as u8);
    } else if abs_x <= 64 && abs_y <= 64 {
        // Both deltas known nonzero here
        flags.push(
            (on_curve_bit + 20 + ((abs_x - 1) & 0x30) + (((abs_y - 1) & 0x30) >> 2) + xy_signs)
                as u8,
        );
        data.push(((((abs_x - 1) & 0x0F) << 4) | ((abs_y - 1) & 0x0F)) as u8);
    } else if abs_x <= 768 && abs_y <= 768 {
        flags.push(
            (on_curve_bit + 84 + 12 * ((abs_x - 1) >> 8) + 4 * ((abs_y - 1) >> 8) + xy_signs)
                as u8,
        );
        data.push(((abs_x - 1) & 0xFF) as u8);
        data.push(((abs_y - 1) & 0xFF) as u8);
    } else if abs_x < 4096 && abs_y < 4096 {
        flags.push((on_curve_bit + 120 + xy_signs) as u8);
        data.push((abs_x >> 4) as u8);
        data.push((((abs_x & 0x0F) << 4) | (abs_y >> 8)) as u8);
        data.push((abs_y & 0xFF) as u8);
    } else {
        flags.push((on_curve_bit + 124 + xy_signs) as u8);
        data.push((abs_x >> 8) as u8);
        data.push((abs_x & 0xFF) as u8);
        data.push((abs_y >> 8) as u8);
        data.push((abs_y & 0xFF) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::super::glyf_decoder::tests_support::decode_single_triplet;
    use super::*;

    #[test]
    fn triplets_round_trip_across_every_case_boundary() {
        let magnitudes = [
            0, 1, 2, 63, 64, 65, 255, 256, 767, 768, 769, 1279, 1280, 4095, 4096, 16000, 65535,
        ];
        for &mx in &magnitudes {
            for &my in &magnitudes {
                for (sx, sy) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
                    for on_curve in [true, false] {
                        let dx = sx * mx;
                        let dy = sy * my;
                        let mut flags = Vec::new();
                        let mut data = Vec::new();
                        encode_triplet(dx, dy, on_curve, &mut flags, &mut data);
                        assert_eq!(flags.len(), 1);

                        let decoded = decode_single_triplet(flags[0], &data);
                        assert_eq!(decoded, (dx, dy, on_curve), "dx={dx} dy={dy}");
                    }
                }
            }
        }
    }

    #[test]
    fn triplet_encoding_is_minimal() {
        // one data byte when either axis is zero and the other is small
        let mut flags = Vec::new();
        let mut data = Vec::new();
        encode_triplet(0, 1279, true, &mut flags, &mut data);
        assert_eq!(data.len(), 1);

        // one data byte for small diagonal moves
        data.clear();
        flags.clear();
        encode_triplet(-64, 64, true, &mut flags, &mut data);
        assert_eq!(data.len(), 1);

        data.clear();
        flags.clear();
        encode_triplet(65, 1, true, &mut flags, &mut data);
        assert_eq!(data.len(), 2);

        data.clear();
        flags.clear();
        encode_triplet(4095, 4095, true, &mut flags, &mut data);
        assert_eq!(data.len(), 3);

        data.clear();
        flags.clear();
        encode_triplet(4096, 1, true, &mut flags, &mut data);
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn truetype_point_parsing_round_trips_flag_runs() {
        // flags: on-curve, x short positive, y same; repeated 4 times
        let record: Vec<u8> = vec![
            GLYF_ON_CURVE | GLYF_X_SHORT | GLYF_THIS_X_IS_SAME | GLYF_THIS_Y_IS_SAME | GLYF_REPEAT,
            3,
            7,
            7,
            7,
            7,
        ];
        let mut input = record.as_slice();
        let points = parse_points(&mut input, 4).unwrap();
        assert!(input.is_empty());
        assert_eq!(points.len(), 4);
        assert_eq!(points[3].x, 28);
        assert_eq!(points[3].y, 0);
        assert!(points[3].on_curve());
    }

    #[test]
    fn long_coordinates_parse() {
        let mut record: Vec<u8> = vec![GLYF_ON_CURVE, GLYF_ON_CURVE | GLYF_THIS_X_IS_SAME];
        record.put_i16(-300); // x0
        record.put_i16(1000); // y0, x1 elided
        record.put_i16(-1000); // y1
        let mut input = record.as_slice();
        let points = parse_points(&mut input, 2).unwrap();
        assert_eq!((points[0].x, points[0].y), (-300, 1000));
        assert_eq!((points[1].x, points[1].y), (-300, 0));
    }
}
