//! The WOFF and WOFF2 container structures.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use bytes::{Buf, BufMut};
use font_types::Tag;

use crate::error::{Error, bail, bail_if, usize_will_overflow};
use crate::tags::{self, KNOWN_TABLE_TAGS};
use crate::variable_length::BufVariableExt;

pub const WOFF1_SIG: Tag = Tag::new(b"wOFF");
pub const WOFF2_SIG: Tag = Tag::new(b"wOF2");

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum WoffVersion {
    Woff1 = 1,
    Woff2 = 2,
}

/// WOFF header that can represent either a WOFF1 or WOFF2 header
///
/// <https://www.w3.org/TR/WOFF2/#woff20Header>
pub struct WoffHeader {
    // This isn't in the header, but we compute it from the signature and store it for convenience.
    pub woff_version: WoffVersion,
    /// b"wOFF" or b"wOF2"
    pub signature: Tag,
    /// The "sfnt version" of the input font.
    pub flavor: Tag,
    /// Total size of the WOFF file.
    pub length: u32,
    /// Number of entries in directory of font tables.
    pub num_tables: u16,
    /// Reserved; set to 0.
    pub reserved: u16,
    /// Total size needed for the uncompressed font data, including the sfnt
    /// header, directory, and font tables (including padding).
    pub total_sfnt_size: u32,
    /// (WOFF2 only) Total length of the compressed data block.
    pub total_compressed_size: u32,
    /// Major version of the WOFF file.
    pub major_version: u16,
    /// Minor version of the WOFF file.
    pub minor_version: u16,
    /// Offset to metadata block, from beginning of WOFF file.
    pub meta_offset: u32,
    /// Length of compressed metadata block.
    pub meta_length: u32,
    /// Uncompressed size of metadata block.
    pub meta_orig_length: u32,
    /// Offset to private data block, from beginning of WOFF file.
    pub priv_offset: u32,
    /// Length of private data block.
    pub priv_length: u32,
}

impl WoffHeader {
    pub fn parse(input: &mut impl Buf) -> Result<Self, Error> {
        let input_len_u32 = input.remaining() as u32;

        // Read signature, validate it, and determine WOFF version. An input
        // without even four bytes of magic is a signature problem, not a
        // truncation problem.
        bail_if!(
            input.remaining() < 4,
            Error::BadSignature { found: 0 }
        );
        let signature_raw = input.try_get_u32()?;
        let signature = Tag::from_u32(signature_raw);
        let woff_version = if signature == WOFF1_SIG {
            WoffVersion::Woff1
        } else if signature == WOFF2_SIG {
            WoffVersion::Woff2
        } else {
            bail!(Error::BadSignature {
                found: signature_raw
            });
        };

        // Parse other fields
        let header = Self {
            woff_version,
            signature,
            flavor: Tag::from_u32(input.try_get_u32()?),
            length: input.try_get_u32()?,
            num_tables: input.try_get_u16()?,
            reserved: input.try_get_u16()?,
            total_sfnt_size: input.try_get_u32()?,
            // The totalCompressedSize field only exists in WOFF2 headers.
            total_compressed_size: match woff_version {
                WoffVersion::Woff1 => 0,
                WoffVersion::Woff2 => input.try_get_u32()?,
            },
            major_version: input.try_get_u16()?,
            minor_version: input.try_get_u16()?,
            meta_offset: input.try_get_u32()?,
            meta_length: input.try_get_u32()?,
            meta_orig_length: input.try_get_u32()?,
            priv_offset: input.try_get_u32()?,
            priv_length: input.try_get_u32()?,
        };

        // Validate
        bail_if!(
            header.length != input_len_u32,
            Error::Truncated {
                context: "woff body (header length field disagrees)"
            }
        );
        bail_if!(
            header.num_tables == 0,
            Error::BadDirectory {
                reason: "woff has no tables"
            }
        );
        bail_if!(
            header.reserved != 0,
            Error::BadDirectory {
                reason: "reserved header field is nonzero"
            }
        );
        if header.meta_offset != 0 {
            bail_if!(
                header.meta_offset >= input_len_u32
                    || input_len_u32 - header.meta_offset < header.meta_length,
                Error::Truncated {
                    context: "metadata block"
                }
            );
        }
        if header.priv_offset != 0 {
            bail_if!(
                header.priv_offset >= input_len_u32
                    || input_len_u32 - header.priv_offset < header.priv_length,
                Error::Truncated {
                    context: "private data block"
                }
            );
        }

        Ok(header)
    }

    /// Serialize the header. The inverse of [`WoffHeader::parse`].
    pub fn write(&self, out: &mut impl BufMut) {
        out.put_slice(&self.signature.to_be_bytes());
        out.put_slice(&self.flavor.to_be_bytes());
        out.put_u32(self.length);
        out.put_u16(self.num_tables);
        out.put_u16(self.reserved);
        out.put_u32(self.total_sfnt_size);
        if self.woff_version == WoffVersion::Woff2 {
            out.put_u32(self.total_compressed_size);
        }
        out.put_u16(self.major_version);
        out.put_u16(self.minor_version);
        out.put_u32(self.meta_offset);
        out.put_u32(self.meta_length);
        out.put_u32(self.meta_orig_length);
        out.put_u32(self.priv_offset);
        out.put_u32(self.priv_length);
    }

    pub fn is_collection(&self) -> bool {
        self.flavor == Tag::new(b"ttcf")
    }
}

pub struct TableDirectory<T> {
    pub tables: Vec<T>,
}
pub type Woff2TableDirectory = TableDirectory<Woff2TableDirectoryEntry>;
pub type Woff1TableDirectory = TableDirectory<Woff1TableDirectoryEntry>;

impl<T> Deref for TableDirectory<T> {
    type Target = Vec<T>;
    fn deref(&self) -> &Self::Target {
        &self.tables
    }
}
impl<T> DerefMut for TableDirectory<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tables
    }
}

impl Woff2TableDirectory {
    pub fn parse(input: &mut impl Buf, num_tables: usize) -> Result<Self, Error> {
        // Tables in the compressed data block of a WOFF2 are stored directly
        // after each other in directory order, so the offset of each table is
        // the sum of the (transformed) lengths of the tables before it.
        //
        // <https://www.w3.org/TR/WOFF2/#table_format>
        let mut offset_in_woff: usize = 0;

        let mut tables = Vec::with_capacity(num_tables);
        for _ in 0..num_tables {
            let mut table = Woff2TableDirectoryEntry::parse(input)?;
            table.woff_offset = offset_in_woff as u32;

            bail_if!(
                usize_will_overflow(offset_in_woff, table.woff_length as usize),
                Error::BadDirectory {
                    reason: "table offsets overflow"
                }
            );
            offset_in_woff += table.woff_length as usize;

            tables.push(table);
        }

        Ok(Self { tables })
    }

    /// Total size of the decompressed data block: the end of the last table.
    pub fn uncompressed_size(&self) -> usize {
        self.tables
            .last()
            .map(|table| table.woff_offset as usize + table.woff_length as usize)
            .unwrap_or(0)
    }
}

/// <https://www.w3.org/TR/WOFF2/#table_dir_format>
pub struct Woff2TableDirectoryEntry {
    /// 4-byte table tag
    pub tag: Tag,
    /// 2-bit preprocessing transformation version number
    pub transform_version: u8,
    /// Length of the original (untransformed) table
    pub orig_length: u32, // UIntBase128
    /// Offset of this table's data within the decompressed data block.
    /// Computed, not stored.
    pub woff_offset: u32,
    /// Length of this table's data within the decompressed data block:
    /// `transformLength` when the table is transformed, `origLength` when not.
    pub woff_length: u32,
}

impl Woff2TableDirectoryEntry {
    pub fn parse(input: &mut impl Buf) -> Result<Self, Error> {
        let flags = input.try_get_u8()?;
        let (known_tag, transform_version) = Self::parse_flags(flags);

        // The tag field is only present in the input when it is not covered
        // by the known-tag table.
        let tag = match known_tag {
            Some(tag) => tag,
            None => Tag::from_u32(input.try_get_u32()?),
        };

        // For glyf and loca, versions 1 and 2 are reserved.
        if (tag == tags::GLYF || tag == tags::LOCA) && matches!(transform_version, 1 | 2) {
            bail!(Error::bad_transform(
                tag,
                format!("reserved transformation version {transform_version}"),
            ));
        }

        let orig_length = input.try_get_variable_128_u32()?;
        let transformed = is_transformed(tag, transform_version);
        let woff_length = if transformed {
            let transform_length = input.try_get_variable_128_u32()?;
            // A transformed loca is regenerated from glyf in its entirety
            bail_if!(
                tag == tags::LOCA && transform_length != 0,
                Error::BadDirectory {
                    reason: "transformed loca has a nonzero transformLength"
                }
            );
            transform_length
        } else {
            orig_length
        };

        Ok(Self {
            tag,
            transform_version,
            orig_length,
            woff_offset: 0, // Set by TableDirectory::parse
            woff_length,
        })
    }

    /// Split a directory flags byte into "known tag" and transform version.
    ///
    /// Bits [0..6] index the known-tag table (63 = explicit tag follows);
    /// bits [6..8] are the transformation version.
    pub fn parse_flags(flags: u8) -> (Option<Tag>, u8) {
        const TAG_MASK: u8 = 0b0011_1111;
        let tag_bits = flags & TAG_MASK;
        let transform_version = flags >> 6;
        let tag = KNOWN_TABLE_TAGS.get(tag_bits as usize).copied();
        (tag, transform_version)
    }

    /// Build the directory flags byte for a tag/version pair.
    /// The inverse of [`Self::parse_flags`].
    pub fn flags_byte(tag: Tag, transform_version: u8) -> u8 {
        let tag_bits = tags::known_tag_index(tag).unwrap_or(63);
        tag_bits | (transform_version << 6)
    }

    /// Whether the table data in the WOFF has been transformed.
    ///
    /// For all tables except 'glyf' and 'loca', transformation version 0 is
    /// the null transform. For 'glyf' and 'loca' it is the other way around:
    /// version 3 is the null transform and version 0 the glyph transform.
    pub fn is_transformed(&self) -> bool {
        is_transformed(self.tag, self.transform_version)
    }

    pub fn data_as_slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], Error> {
        let end = self.woff_offset as usize + self.woff_length as usize;
        data.get((self.woff_offset as usize)..end)
            .ok_or(Error::Truncated {
                context: "table data in decompressed block",
            })
    }
}

fn is_transformed(tag: Tag, transform_version: u8) -> bool {
    if tag == tags::GLYF || tag == tags::LOCA {
        transform_version == 0
    } else {
        transform_version != 0
    }
}

/// <https://www.w3.org/TR/WOFF/#TableDirectory>
pub struct Woff1TableDirectoryEntry {
    /// 4-byte table tag
    pub tag: Tag,
    /// Offset of the table data from the start of the WOFF file
    pub woff_offset: u32,
    /// Compressed length of the table
    pub comp_length: u32,
    /// Length of the uncompressed table
    pub orig_length: u32,
    /// Checksum of the uncompressed table
    pub orig_checksum: u32,
}

impl Woff1TableDirectory {
    pub fn parse(input: &mut impl Buf, num_tables: usize) -> Result<Self, Error> {
        let mut tables = Vec::with_capacity(num_tables);
        for _ in 0..num_tables {
            let entry = Woff1TableDirectoryEntry {
                tag: Tag::from_u32(input.try_get_u32()?),
                woff_offset: input.try_get_u32()?,
                comp_length: input.try_get_u32()?,
                orig_length: input.try_get_u32()?,
                orig_checksum: input.try_get_u32()?,
            };
            bail_if!(
                entry.comp_length > entry.orig_length,
                Error::BadDirectory {
                    reason: "compressed table is larger than the original"
                }
            );
            tables.push(entry);
        }
        Ok(Self { tables })
    }
}

impl Woff1TableDirectoryEntry {
    pub fn is_compressed(&self) -> bool {
        self.comp_length < self.orig_length
    }

    pub fn data_as_slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], Error> {
        let end = self.woff_offset as usize + self.comp_length as usize;
        data.get((self.woff_offset as usize)..end)
            .ok_or(Error::Truncated {
                context: "woff1 table data",
            })
    }
}

/// <https://www.w3.org/TR/WOFF2/#collection_dir_format>
pub struct CollectionDirectory {
    /// The version of the TTC header in the original font.
    pub version: u32,
    /// The fonts in the file
    pub fonts: Vec<CollectionDirectoryEntry>,
}

impl CollectionDirectory {
    pub fn parse(input: &mut impl Buf, table_directory: &Woff2TableDirectory) -> Result<Self, Error> {
        let version = input.try_get_u32()?;
        bail_if!(
            version != 0x0001_0000 && version != 0x0002_0000,
            Error::BadDirectory {
                reason: "unknown TTC header version"
            }
        );

        let num_fonts = input.try_get_variable_255_u16()?;
        bail_if!(
            num_fonts == 0,
            Error::BadDirectory {
                reason: "collection has no fonts"
            }
        );

        let mut fonts = Vec::with_capacity(num_fonts as usize);
        for _ in 0..num_fonts {
            fonts.push(CollectionDirectoryEntry::parse(input, table_directory)?);
        }

        Ok(Self { version, fonts })
    }

    /// Generate a `CollectionDirectory` for a single font so that collection
    /// and single fonts can share the reconstruction logic.
    pub fn generate_for_single_font(flavor: Tag, table_directory: &Woff2TableDirectory) -> Self {
        let table_indices: Vec<u16> = (0..(table_directory.len() as u16)).collect();
        let mut glyf_idx: Option<u16> = None;
        let mut loca_idx: Option<u16> = None;
        for (table_index, table) in table_directory.tables.iter().enumerate() {
            if table.tag == tags::GLYF {
                glyf_idx = Some(table_index as u16);
            } else if table.tag == tags::LOCA {
                loca_idx = Some(table_index as u16);
            }
        }
        Self {
            version: 0, // Not a collection; never serialized
            fonts: vec![CollectionDirectoryEntry {
                flavor,
                table_indices,
                glyf_idx,
                loca_idx,
            }],
        }
    }

    pub fn sort_tables_within_each_font(&mut self, tables: &Woff2TableDirectory) {
        for font in &mut self.fonts {
            font.table_indices
                .sort_by_cached_key(|idx| tables[*idx as usize].tag);
        }
    }
}

/// <https://www.w3.org/TR/WOFF2/#collection_dir_format>
pub struct CollectionDirectoryEntry {
    /// The "sfnt version" of the font
    pub flavor: Tag,
    /// Which of the file's tables this font references. Fonts in a collection
    /// are expected to share tables.
    pub table_indices: Vec<u16>, // 255UInt16

    // Indices of the tables the reconstruction needs random access to
    pub glyf_idx: Option<u16>,
    pub loca_idx: Option<u16>,
}

impl CollectionDirectoryEntry {
    pub fn parse(input: &mut impl Buf, tables: &Woff2TableDirectory) -> Result<Self, Error> {
        let num_tables = input.try_get_variable_255_u16()?;
        let flavor = Tag::from_u32(input.try_get_u32()?);

        bail_if!(
            num_tables == 0,
            Error::BadDirectory {
                reason: "collection font has no tables"
            }
        );

        let mut glyf_idx: Option<u16> = None;
        let mut loca_idx: Option<u16> = None;
        let mut table_indices = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            let table_index = input.try_get_variable_255_u16()?;
            bail_if!(
                table_index as usize >= tables.len(),
                Error::BadDirectory {
                    reason: "collection font references a table index out of range"
                }
            );

            let tag = tables[table_index as usize].tag;
            if tag == tags::GLYF {
                glyf_idx = Some(table_index);
            } else if tag == tags::LOCA {
                loca_idx = Some(table_index);
            }

            table_indices.push(table_index);
        }

        // If we have both glyf and loca make sure they are consecutive.
        // Reject if we only have one.
        match (glyf_idx, loca_idx) {
            (Some(glyf_idx), Some(loca_idx)) => {
                bail_if!(
                    glyf_idx > loca_idx || loca_idx - glyf_idx != 1,
                    Error::BadDirectory {
                        reason: "collection font has non-consecutive glyf/loca"
                    }
                );
            }
            (Some(_), None) | (None, Some(_)) => bail!(Error::BadDirectory {
                reason: "collection font has only one of glyf/loca"
            }),
            (None, None) => {}
        };

        Ok(Self {
            flavor,
            table_indices,
            glyf_idx,
            loca_idx,
        })
    }

    pub fn num_tables(&self) -> usize {
        self.table_indices.len()
    }
}

/// Accumulates the state needed to reconstruct a single font.
///
/// For a TTC we keep one per font in the collection; for a single font
/// exactly one of these exists in total.
#[derive(Default)]
pub(crate) struct FontInfo {
    /// The total number of glyphs in the font
    pub num_glyphs: u16,
    /// The number of hmetrics (= number of proportional glyphs).
    /// The number of monospaced glyphs is `num_glyphs - num_hmetrics`.
    pub num_hmetrics: u16,
    /// The minimum x coordinate of each glyph, harvested while rebuilding
    /// 'glyf'. Needed to undo the 'hmtx' transform.
    pub x_mins: Vec<i16>,
    /// Byte offset of each table's directory entry in the output file, so
    /// checksum/offset/length can be patched in once they are known.
    pub table_entry_by_tag: HashMap<Tag, usize>,
    /// Checksum of this font's offset table and (zero-filled) directory.
    pub header_checksum: u32,
}
