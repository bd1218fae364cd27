//! Parsing and serialization of the uncompressed SFNT container.

use bytes::{Buf, BufMut};
use font_types::Tag;

use crate::error::{Error, bail_if};
use crate::tags;

pub(crate) const SFNT_HEADER_SIZE: usize = 12;
pub(crate) const SFNT_ENTRY_SIZE: usize = 16;

/// 'true' type outlines
pub const TRUETYPE_FLAVOR: Tag = Tag::new(&[0x00, 0x01, 0x00, 0x00]);
/// CFF outlines
pub const CFF_FLAVOR: Tag = Tag::new(b"OTTO");
/// TrueType collection
pub const TTC_FLAVOR: Tag = Tag::new(b"ttcf");

/// One entry of an SFNT table directory together with the bytes it points at.
pub struct SfntTableEntry<'a> {
    pub tag: Tag,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
    pub data: &'a [u8],
}

/// A parsed single-font SFNT: the offset table plus a table directory whose
/// entries borrow from the input.
pub struct SfntFont<'a> {
    pub flavor: Tag,
    pub tables: Vec<SfntTableEntry<'a>>,
}

impl<'a> SfntFont<'a> {
    /// Parse an uncompressed single-font SFNT.
    ///
    /// Only the flavors the web font encoders accept are allowed here;
    /// collections ('ttcf') are rejected.
    pub fn parse(data: &'a [u8]) -> Result<Self, Error> {
        let mut input = data;
        let flavor = Tag::from_u32(input.try_get_u32()?);
        bail_if!(
            flavor != TRUETYPE_FLAVOR && flavor != CFF_FLAVOR,
            Error::SfntInvalid {
                reason: "flavor is neither 0x00010000 nor 'OTTO'"
            }
        );

        let num_tables = input.try_get_u16()?;
        bail_if!(
            num_tables == 0,
            Error::SfntInvalid {
                reason: "sfnt has no tables"
            }
        );
        // searchRange / entrySelector / rangeShift; derived values, not trusted
        input.advance(6.min(input.remaining()));
        bail_if!(
            data.len() < SFNT_HEADER_SIZE + SFNT_ENTRY_SIZE * num_tables as usize,
            Error::Truncated {
                context: "sfnt table directory"
            }
        );

        let mut tables = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            let tag = Tag::from_u32(input.try_get_u32()?);
            let checksum = input.try_get_u32()?;
            let offset = input.try_get_u32()?;
            let length = input.try_get_u32()?;

            let end = (offset as usize).checked_add(length as usize);
            let table_data = end
                .and_then(|end| data.get(offset as usize..end))
                .ok_or(Error::Truncated {
                    context: "sfnt table body",
                })?;

            tables.push(SfntTableEntry {
                tag,
                checksum,
                offset,
                length,
                data: table_data,
            });
        }

        Ok(Self { flavor, tables })
    }

    pub fn table(&self, tag: Tag) -> Option<&SfntTableEntry<'a>> {
        self.tables.iter().find(|table| table.tag == tag)
    }

    pub fn table_data(&self, tag: Tag) -> Option<&'a [u8]> {
        self.table(tag).map(|table| table.data)
    }
}

/// Write the 12-byte offset table ("sfnt header") with its derived binary
/// search fields.
pub(crate) fn write_offset_table(out: &mut impl BufMut, flavor: Tag, num_tables: u16) {
    let mut max_pow2: u16 = 0;
    while 1u16 << (max_pow2 + 1) <= num_tables {
        max_pow2 += 1;
    }
    let search_range: u16 = (1u16 << max_pow2) << 4;

    out.put_slice(&flavor.to_be_bytes());
    out.put_u16(num_tables);
    out.put_u16(search_range);
    out.put_u16(max_pow2); // entrySelector
    out.put_u16(num_tables * 16 - search_range); // rangeShift
}

/// numGlyphs lives at offset 4 of 'maxp'.
pub(crate) fn maxp_num_glyphs(maxp: &[u8]) -> Result<u16, Error> {
    let mut input = maxp.get(4..).ok_or(Error::SfntInvalid {
        reason: "maxp table too short",
    })?;
    input.try_get_u16().map_err(|_| Error::SfntInvalid {
        reason: "maxp table too short",
    })
}

/// numberOfHMetrics lives at offset 34 of 'hhea'.
///
/// <https://www.microsoft.com/typography/otspec/hhea.htm>
pub(crate) fn hhea_num_hmetrics(hhea: &[u8]) -> Result<u16, Error> {
    let mut input = hhea.get(34..).ok_or(Error::Truncated {
        context: "hhea numberOfHMetrics",
    })?;
    Ok(input.try_get_u16()?)
}

/// indexToLocFormat lives at offset 50 of 'head'.
pub(crate) fn head_index_format(head: &[u8]) -> Result<u16, Error> {
    let mut input = head.get(50..).ok_or(Error::SfntInvalid {
        reason: "head table too short",
    })?;
    input.try_get_u16().map_err(|_| Error::SfntInvalid {
        reason: "head table too short",
    })
}

/// Decode a 'loca' table into glyph offsets and validate it against the
/// glyph count and the 'glyf' table it indexes into.
pub(crate) fn parse_loca(
    loca: &[u8],
    index_format: u16,
    num_glyphs: u16,
    glyf_length: usize,
) -> Result<Vec<u32>, Error> {
    let entry_size: usize = if index_format != 0 { 4 } else { 2 };
    bail_if!(
        loca.len() != (num_glyphs as usize + 1) * entry_size,
        Error::SfntInvalid {
            reason: "loca length does not match numGlyphs"
        }
    );

    let mut input = loca;
    let mut offsets = Vec::with_capacity(num_glyphs as usize + 1);
    for _ in 0..=num_glyphs {
        let offset = if index_format != 0 {
            input.try_get_u32()?
        } else {
            // The short format stores offset / 2
            (input.try_get_u16()? as u32) * 2
        };
        if let Some(&previous) = offsets.last() {
            bail_if!(
                offset < previous,
                Error::SfntInvalid {
                    reason: "loca offsets decrease"
                }
            );
        }
        offsets.push(offset);
    }
    bail_if!(
        *offsets.last().unwrap() as usize > glyf_length,
        Error::SfntInvalid {
            reason: "loca points past the end of glyf"
        }
    );

    Ok(offsets)
}
