//! Programmatic SFNT fixtures.
//!
//! The builders produce *normalized* fonts: tables in tag order, bodies
//! 4-byte padded and laid out back to back, binary-search fields and
//! checkSumAdjustment computed for real, and glyph records packed exactly
//! the way the reconstruction writes them. A normalized font survives a
//! WOFF2 encode/decode round trip byte for byte, which is what the
//! end-to-end tests lean on.
#![allow(dead_code)]

pub const TRUETYPE_FLAVOR: [u8; 4] = [0x00, 0x01, 0x00, 0x00];
pub const OTTO_FLAVOR: [u8; 4] = *b"OTTO";

pub fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// The standard SFNT table checksum: wrapping sum of big-endian u32 words,
/// zero-padding any trailing remainder.
pub fn checksum(buf: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    for chunk in buf.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

pub struct SfntBuilder {
    flavor: [u8; 4],
    tables: Vec<([u8; 4], Vec<u8>)>,
}

impl SfntBuilder {
    pub fn new(flavor: [u8; 4]) -> Self {
        Self {
            flavor,
            tables: Vec::new(),
        }
    }

    pub fn table(mut self, tag: &[u8; 4], data: Vec<u8>) -> Self {
        self.tables.push((*tag, data));
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.tables.sort_by_key(|(tag, _)| *tag);
        let num_tables = self.tables.len() as u16;

        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(&self.flavor);
        put_u16(&mut out, num_tables);
        let mut entry_selector: u16 = 0;
        while 1u16 << (entry_selector + 1) <= num_tables {
            entry_selector += 1;
        }
        let search_range = (1u16 << entry_selector) << 4;
        put_u16(&mut out, search_range);
        put_u16(&mut out, entry_selector);
        put_u16(&mut out, num_tables * 16 - search_range);

        // Directory, then bodies; offsets assigned in tag order
        let mut offset = 12 + 16 * self.tables.len();
        let mut head_offset: Option<usize> = None;
        for (tag, data) in &self.tables {
            if tag == b"head" {
                head_offset = Some(offset);
            }
            out.extend_from_slice(tag);
            put_u32(&mut out, checksum(data));
            put_u32(&mut out, offset as u32);
            put_u32(&mut out, data.len() as u32);
            offset += data.len().div_ceil(4) * 4;
        }
        for (_, data) in &self.tables {
            out.extend_from_slice(data);
            pad4(&mut out);
        }

        // checkSumAdjustment: the head fixture arrives with the field zeroed,
        // so the whole-file sum can be taken directly.
        if let Some(head_offset) = head_offset {
            let adjustment = 0xB1B0AFBAu32.wrapping_sub(checksum(&out));
            out[head_offset + 8..head_offset + 12].copy_from_slice(&adjustment.to_be_bytes());
        }

        out
    }
}

/// 'head' with checkSumAdjustment zeroed (SfntBuilder fills it in) and the
/// WOFF2-mandated bit 11 already set in flags.
pub fn head_table(index_format: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(54);
    put_u32(&mut out, 0x0001_0000); // version
    put_u32(&mut out, 0x0001_0000); // fontRevision
    put_u32(&mut out, 0); // checkSumAdjustment, patched by SfntBuilder
    put_u32(&mut out, 0x5F0F_3CF5); // magicNumber
    put_u16(&mut out, 0x0800 | 0x0003); // flags, bit 11 set
    put_u16(&mut out, 1000); // unitsPerEm
    out.extend_from_slice(&[0; 16]); // created + modified
    put_i16(&mut out, 5); // xMin
    put_i16(&mut out, -7); // yMin
    put_i16(&mut out, 175); // xMax
    put_i16(&mut out, 95); // yMax
    put_u16(&mut out, 0); // macStyle
    put_u16(&mut out, 8); // lowestRecPPEM
    put_i16(&mut out, 2); // fontDirectionHint
    put_u16(&mut out, index_format); // indexToLocFormat
    put_u16(&mut out, 0); // glyphDataFormat
    out
}

/// 'maxp' version 1.0.
pub fn maxp_table(num_glyphs: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    put_u32(&mut out, 0x0001_0000);
    put_u16(&mut out, num_glyphs);
    put_u16(&mut out, 10); // maxPoints
    put_u16(&mut out, 1); // maxContours
    put_u16(&mut out, 3); // maxCompositePoints
    put_u16(&mut out, 1); // maxCompositeContours
    put_u16(&mut out, 2); // maxZones
    put_u16(&mut out, 0); // maxTwilightPoints
    put_u16(&mut out, 0); // maxStorage
    put_u16(&mut out, 0); // maxFunctionDefs
    put_u16(&mut out, 0); // maxInstructionDefs
    put_u16(&mut out, 64); // maxStackElements
    put_u16(&mut out, 4); // maxSizeOfInstructions
    put_u16(&mut out, 1); // maxComponentElements
    put_u16(&mut out, 1); // maxComponentDepth
    out
}

pub fn hhea_table(num_hmetrics: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(36);
    put_u32(&mut out, 0x0001_0000);
    put_i16(&mut out, 800); // ascender
    put_i16(&mut out, -200); // descender
    put_i16(&mut out, 90); // lineGap
    put_u16(&mut out, 600); // advanceWidthMax
    put_i16(&mut out, 0); // minLeftSideBearing
    put_i16(&mut out, 0); // minRightSideBearing
    put_i16(&mut out, 175); // xMaxExtent
    put_i16(&mut out, 1); // caretSlopeRise
    put_i16(&mut out, 0); // caretSlopeRun
    put_i16(&mut out, 0); // caretOffset
    out.extend_from_slice(&[0; 8]); // reserved
    put_i16(&mut out, 0); // metricDataFormat
    put_u16(&mut out, num_hmetrics);
    out
}

pub fn hmtx_table(metrics: &[(u16, i16)], bearings: &[i16]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(advance_width, lsb) in metrics {
        put_u16(&mut out, advance_width);
        put_i16(&mut out, lsb);
    }
    for &lsb in bearings {
        put_i16(&mut out, lsb);
    }
    out
}

/// Pack a simple glyph the way the WOFF2 reconstruction does: computed (or
/// overridden) bbox, run-length compressed flags, short deltas with sign
/// bits where they fit.
pub fn simple_glyph(
    contours: &[&[(i32, i32, bool)]],
    instructions: &[u8],
    bbox_override: Option<[i16; 4]>,
) -> Vec<u8> {
    simple_glyph_full(contours, instructions, bbox_override, false)
}

pub fn simple_glyph_full(
    contours: &[&[(i32, i32, bool)]],
    instructions: &[u8],
    bbox_override: Option<[i16; 4]>,
    overlap_first: bool,
) -> Vec<u8> {
    const ON_CURVE: u8 = 0x01;
    const X_SHORT: u8 = 0x02;
    const Y_SHORT: u8 = 0x04;
    const REPEAT: u8 = 0x08;
    const X_SAME_OR_POSITIVE: u8 = 0x10;
    const Y_SAME_OR_POSITIVE: u8 = 0x20;
    const OVERLAP_SIMPLE: u8 = 0x40;

    let points: Vec<(i32, i32, bool)> = contours.concat();

    let mut out = Vec::new();
    put_i16(&mut out, contours.len() as i16);

    let bbox = bbox_override.unwrap_or_else(|| {
        let (x0, y0, _) = points[0];
        let mut bbox = [x0 as i16, y0 as i16, x0 as i16, y0 as i16];
        for &(x, y, _) in &points[1..] {
            bbox[0] = bbox[0].min(x as i16);
            bbox[1] = bbox[1].min(y as i16);
            bbox[2] = bbox[2].max(x as i16);
            bbox[3] = bbox[3].max(y as i16);
        }
        bbox
    });
    for value in bbox {
        put_i16(&mut out, value);
    }

    let mut end_point: i32 = -1;
    for contour in contours {
        end_point += contour.len() as i32;
        put_u16(&mut out, end_point as u16);
    }

    put_u16(&mut out, instructions.len() as u16);
    out.extend_from_slice(instructions);

    // Per-point flags
    let mut flags: Vec<u8> = Vec::with_capacity(points.len());
    let (mut last_x, mut last_y) = (0i32, 0i32);
    for (i, &(x, y, on_curve)) in points.iter().enumerate() {
        let mut flag = if on_curve { ON_CURVE } else { 0 };
        if overlap_first && i == 0 {
            flag |= OVERLAP_SIMPLE;
        }
        let dx = x - last_x;
        if dx == 0 {
            flag |= X_SAME_OR_POSITIVE;
        } else if dx.abs() < 256 {
            flag |= X_SHORT | if dx > 0 { X_SAME_OR_POSITIVE } else { 0 };
        }
        let dy = y - last_y;
        if dy == 0 {
            flag |= Y_SAME_OR_POSITIVE;
        } else if dy.abs() < 256 {
            flag |= Y_SHORT | if dy > 0 { Y_SAME_OR_POSITIVE } else { 0 };
        }
        flags.push(flag);
        last_x = x;
        last_y = y;
    }

    // Run-length compress the flags
    let mut i = 0;
    while i < flags.len() {
        let mut run = 1usize;
        while i + run < flags.len() && flags[i + run] == flags[i] && run < 256 {
            run += 1;
        }
        if run > 1 {
            out.push(flags[i] | REPEAT);
            out.push((run - 1) as u8);
        } else {
            out.push(flags[i]);
        }
        i += run;
    }

    // x deltas then y deltas
    let mut last_x = 0i32;
    for &(x, _, _) in &points {
        let dx = x - last_x;
        if dx != 0 {
            if dx.abs() < 256 {
                out.push(dx.unsigned_abs() as u8);
            } else {
                put_i16(&mut out, dx as i16);
            }
        }
        last_x = x;
    }
    let mut last_y = 0i32;
    for &(_, y, _) in &points {
        let dy = y - last_y;
        if dy != 0 {
            if dy.abs() < 256 {
                out.push(dy.unsigned_abs() as u8);
            } else {
                put_i16(&mut out, dy as i16);
            }
        }
        last_y = y;
    }

    out
}

/// A composite glyph record chain, passed through the codec verbatim.
pub fn composite_glyph(bbox: [i16; 4], records: &[u8], instructions: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    put_i16(&mut out, -1);
    for value in bbox {
        put_i16(&mut out, value);
    }
    out.extend_from_slice(records);
    if let Some(instructions) = instructions {
        put_u16(&mut out, instructions.len() as u16);
        out.extend_from_slice(instructions);
    }
    out
}

/// Lay glyphs out 4-byte padded and derive the short-format loca.
pub fn build_glyf_and_loca(glyphs: &[Vec<u8>]) -> (Vec<u8>, Vec<u8>) {
    let mut glyf: Vec<u8> = Vec::new();
    let mut loca: Vec<u8> = Vec::new();
    for glyph in glyphs {
        put_u16(&mut loca, (glyf.len() / 2) as u16);
        glyf.extend_from_slice(glyph);
        pad4(&mut glyf);
    }
    put_u16(&mut loca, (glyf.len() / 2) as u16);
    (glyf, loca)
}

pub struct TestFontSpec {
    /// Include a DSIG table (the WOFF2 encoder must drop it)
    pub dsig: bool,
    /// Include fvar/gvar passthrough tables
    pub variable: bool,
    /// Give glyph 0 an lsb that differs from its xMin, defeating the hmtx
    /// transform
    pub lsb_mismatch: bool,
    /// Store a bbox on glyph 0 that differs from the computed one, forcing
    /// the explicit-bbox path
    pub explicit_bbox: bool,
    /// Set OVERLAP_SIMPLE on the staircase glyph's first point, forcing the
    /// overlap bitmap
    pub overlap: bool,
}

impl Default for TestFontSpec {
    fn default() -> Self {
        Self {
            dsig: false,
            variable: false,
            lsb_mismatch: false,
            explicit_bbox: false,
            overlap: false,
        }
    }
}

/// A four-glyph normalized TrueType font: a triangle, an empty glyph, a
/// composite with instructions, and a staircase exercising flag runs.
pub fn truetype_font(spec: &TestFontSpec) -> Vec<u8> {
    let triangle: &[(i32, i32, bool)] = &[(10, 0, true), (50, 0, true), (30, 40, false)];
    let staircase: Vec<(i32, i32, bool)> =
        (0..10).map(|i| (5 + 10 * i, 5 + 10 * i, true)).collect();

    let glyph0_bbox = if spec.explicit_bbox {
        Some([10, 0, 50, 41]) // yMax off by one from the computed 40
    } else {
        None
    };

    // Composite: ARGS_ARE_WORDS | WE_HAVE_INSTRUCTIONS, component glyph 0
    // translated by (125, 0)
    let mut records = Vec::new();
    put_u16(&mut records, 0x0101);
    put_u16(&mut records, 0); // component glyph index
    put_i16(&mut records, 125);
    put_i16(&mut records, 0);

    let glyphs = [
        simple_glyph(&[triangle], &[0xB0, 0x01], glyph0_bbox),
        Vec::new(),
        composite_glyph([135, 0, 175, 40], &records, Some(&[0xB1, 0x00])),
        simple_glyph_full(&[staircase.as_slice()], &[], None, spec.overlap),
    ];
    let (glyf, loca) = build_glyf_and_loca(&glyphs);

    let glyph0_lsb = if spec.lsb_mismatch { 11 } else { 10 };
    let hmtx = hmtx_table(&[(500, glyph0_lsb), (250, 0), (600, 135)], &[5]);

    let mut builder = SfntBuilder::new(TRUETYPE_FLAVOR)
        .table(b"cvt ", vec![0x00, 0x32, 0x00, 0x64])
        .table(b"glyf", glyf)
        .table(b"head", head_table(0))
        .table(b"hhea", hhea_table(3))
        .table(b"hmtx", hmtx)
        .table(b"loca", loca)
        .table(b"maxp", maxp_table(4));
    if spec.dsig {
        builder = builder.table(b"DSIG", vec![0, 0, 0, 1, 0, 0, 0, 0]);
    }
    if spec.variable {
        // zzzz is not in the known-tag table, so its tag is spelled out in
        // the WOFF2 directory
        builder = builder
            .table(b"fvar", vec![0xAA; 16])
            .table(b"gvar", vec![0xBB; 12])
            .table(b"zzzz", vec![1, 2, 3, 4, 5]);
    }
    builder.build()
}

/// A minimal CFF-flavored font.
pub fn cff_font() -> Vec<u8> {
    let mut maxp = Vec::new();
    put_u32(&mut maxp, 0x0000_5000); // version 0.5
    put_u16(&mut maxp, 2);

    SfntBuilder::new(OTTO_FLAVOR)
        .table(b"CFF ", (0u8..20).collect())
        .table(b"head", head_table(0))
        .table(b"maxp", maxp)
        .build()
}

// ---------------------------------------------------------------------------
// Assertion helpers: a minimal read side for the reconstructed output
// ---------------------------------------------------------------------------

pub fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

pub fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Table directory of a single-font SFNT as (tag, checksum, offset, length).
pub fn sfnt_tables(data: &[u8]) -> Vec<([u8; 4], u32, u32, u32)> {
    sfnt_tables_at(data, 0)
}

/// Table directory of the font whose offset table lives at `base`.
pub fn sfnt_tables_at(data: &[u8], base: usize) -> Vec<([u8; 4], u32, u32, u32)> {
    let num_tables = read_u16(data, base + 4) as usize;
    (0..num_tables)
        .map(|i| {
            let entry = base + 12 + 16 * i;
            (
                data[entry..entry + 4].try_into().unwrap(),
                read_u32(data, entry + 4),
                read_u32(data, entry + 8),
                read_u32(data, entry + 12),
            )
        })
        .collect()
}

pub fn table_slice<'a>(data: &'a [u8], tag: &[u8; 4]) -> Option<&'a [u8]> {
    let (_, _, offset, length) = *sfnt_tables(data).iter().find(|(t, ..)| t == tag)?;
    Some(&data[offset as usize..(offset + length) as usize])
}

pub fn num_glyphs(sfnt: &[u8]) -> u16 {
    read_u16(table_slice(sfnt, b"maxp").expect("maxp present"), 4)
}

pub fn num_hmetrics(sfnt: &[u8]) -> u16 {
    read_u16(table_slice(sfnt, b"hhea").expect("hhea present"), 34)
}
