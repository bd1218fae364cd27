//! The WOFF2 container codec.
//!
//! [`decode_woff2`] rebuilds an uncompressed SFNT from a WOFF2 file;
//! [`encode_woff2`] packs an uncompressed single-font SFNT into a WOFF2
//! file. Both are pure functions from bytes to bytes.
//!
//! The Brotli boundary is pluggable: the `*_with_custom_*` variants take the
//! codec as a closure so a host can substitute a platform compressor, and
//! the plain variants (behind the `brotli` feature) bundle the pure-Rust
//! one.
//!
//! <https://www.w3.org/TR/WOFF2/>

mod glyf_decoder;
mod glyf_encoder;
mod hmtx_decoder;
mod hmtx_encoder;

use std::collections::BTreeMap;

use bytes::Buf;
use font_types::Tag;
use log::debug;

use crate::checksum::{
    CHECKSUM_ADJUSTMENT_MAGIC, CHECKSUM_ADJUSTMENT_OFFSET, compute_checksum, round4,
};
use crate::error::{Error, bail, bail_if};
use crate::sfnt::{
    self, SFNT_ENTRY_SIZE, SFNT_HEADER_SIZE, SfntFont, SfntTableEntry, write_offset_table,
};
use crate::tags;
use crate::types::{
    CollectionDirectory, CollectionDirectoryEntry, FontInfo, WOFF2_SIG, Woff2TableDirectory,
    Woff2TableDirectoryEntry, WoffHeader, WoffVersion,
};
use crate::variable_length::BufMutVariableExt as _;

/// Over 14k test fonts the max compression ratio seen to date was ~20.
/// >100 suggests someone wrote a bad uncompressed size.
const MAX_PLAUSIBLE_COMPRESSION_RATIO: f32 = 100.0;

const WOFF2_HEADER_SIZE: usize = 48;

/// A decoded glyph outline point in absolute coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Point {
    pub x: i32,
    pub y: i32,
    pub on_curve: bool,
}

/// Options for [`encode_woff2`].
#[derive(Copy, Clone, Debug)]
pub struct Woff2EncodeOptions {
    /// Brotli quality, 0..=11. Defaults to 11 (maximum compression).
    pub quality: u32,
}

impl Default for Woff2EncodeOptions {
    fn default() -> Self {
        Self { quality: 11 }
    }
}

/// Decode a WOFF2 file to an uncompressed SFNT using the built-in Brotli
/// decompressor.
#[cfg(feature = "brotli")]
pub fn decode_woff2(data: &[u8]) -> Result<Vec<u8>, Error> {
    use brotli_decompressor::{BrotliResult, brotli_decode};

    decode_woff2_with_custom_brotli(data, &mut |compressed, size_hint| {
        let mut uncompressed: Vec<u8> = Vec::with_capacity(size_hint);
        let info = brotli_decode(compressed, &mut uncompressed);
        if !matches!(info.result, BrotliResult::ResultSuccess) {
            return Err("brotli stream did not decode cleanly".into());
        }
        Ok(uncompressed)
    })
}

/// Decode a WOFF2 file to an uncompressed SFNT using a caller-supplied
/// Brotli decompressor.
///
/// The closure receives the compressed block and a size hint (the exact
/// decompressed size the table directory promises).
#[allow(clippy::type_complexity)]
pub fn decode_woff2_with_custom_brotli(
    raw_woff_data: &[u8],
    brotli_decode: &mut dyn FnMut(&[u8], usize) -> Result<Vec<u8>, Box<dyn std::error::Error>>,
) -> Result<Vec<u8>, Error> {
    // `input` is a second view over `raw_woff_data`: the parsing functions
    // advance the slice itself, while `raw_woff_data` keeps the whole file.
    let mut input = raw_woff_data;

    let header = WoffHeader::parse(&mut input)?;
    bail_if!(
        header.woff_version != WoffVersion::Woff2,
        Error::BadSignature {
            found: u32::from_be_bytes(header.signature.to_be_bytes())
        }
    );

    let table_directory = Woff2TableDirectory::parse(&mut input, header.num_tables as usize)?;
    let mut collection_directory = if header.is_collection() {
        CollectionDirectory::parse(&mut input, &table_directory)?
    } else {
        CollectionDirectory::generate_for_single_font(header.flavor, &table_directory)
    };

    let uncompressed_size = table_directory.uncompressed_size();
    bail_if!(
        uncompressed_size == 0,
        Error::BadDirectory {
            reason: "all tables are empty"
        }
    );
    let compression_ratio = (uncompressed_size as f32) / (raw_woff_data.len() as f32);
    bail_if!(
        compression_ratio > MAX_PLAUSIBLE_COMPRESSION_RATIO,
        Error::BadDirectory {
            reason: "implausible compression ratio"
        }
    );

    debug!(
        "decoding woff2: flavor {}, {} tables, {} fonts, {} compressed bytes",
        header.flavor,
        header.num_tables,
        collection_directory.fonts.len(),
        header.total_compressed_size,
    );

    bail_if!(
        input.remaining() < header.total_compressed_size as usize,
        Error::Truncated {
            context: "compressed data block"
        }
    );
    let compressed_data = &input[0..header.total_compressed_size as usize];
    let uncompressed_data = brotli_decode(compressed_data, uncompressed_size).map_err(|err| {
        debug!("brotli decode failed: {err}");
        Error::BrotliFailed
    })?;
    // https://www.w3.org/TR/WOFF2/#conform-mustNotRejectIncorrectTotalSize
    // The *uncompressed* size however must agree with the directory exactly.
    bail_if!(
        uncompressed_data.len() != uncompressed_size,
        Error::BrotliFailed
    );

    // Re-order tables into output (OTSpec) order
    collection_directory.sort_tables_within_each_font(&table_directory);

    let out = reconstruct_fonts(
        &header,
        &table_directory,
        &collection_directory,
        &uncompressed_data,
    )?;
    debug!("reconstructed sfnt: {} bytes", out.len());
    Ok(out)
}

#[derive(Copy, Clone)]
struct TableMetadata {
    checksum: u32,
    dst_offset: u32,
    dst_length: u32,
}

/// Write the offset tables and zero-filled table directories for every font,
/// recording where each directory entry lives so it can be patched later.
fn write_header_block(
    out: &mut Vec<u8>,
    header: &WoffHeader,
    table_directory: &Woff2TableDirectory,
    collection: &CollectionDirectory,
) -> Vec<FontInfo> {
    let mut font_infos: Vec<FontInfo> = Vec::with_capacity(collection.fonts.len());

    let mut offset_table_positions: usize = 0;
    if header.is_collection() {
        // TTC header
        out.extend_from_slice(&header.flavor.to_be_bytes()); // 'ttcf'
        out.extend_from_slice(&collection.version.to_be_bytes());
        out.extend_from_slice(&(collection.fonts.len() as u32).to_be_bytes());
        offset_table_positions = out.len();
        // OffsetTable[numFonts], patched below once positions are known
        out.resize(out.len() + 4 * collection.fonts.len(), 0);
        if collection.version == 0x0002_0000 {
            // ulDsigTag, ulDsigLength, ulDsigOffset
            out.resize(out.len() + 12, 0);
        }
    }

    for font in &collection.fonts {
        let font_start = out.len();
        if header.is_collection() {
            out[offset_table_positions..offset_table_positions + 4]
                .copy_from_slice(&(font_start as u32).to_be_bytes());
            offset_table_positions += 4;
        }

        let mut info = FontInfo::default();
        write_offset_table(out, font.flavor, font.num_tables() as u16);
        for &table_index in &font.table_indices {
            let tag = table_directory[table_index as usize].tag;
            info.table_entry_by_tag.insert(tag, out.len());
            out.extend_from_slice(&tag.to_be_bytes());
            out.resize(out.len() + 12, 0); // checksum/offset/length placeholders
        }
        info.header_checksum = compute_checksum(&out[font_start..]);
        font_infos.push(info);
    }

    font_infos
}

fn reconstruct_fonts(
    header: &WoffHeader,
    table_directory: &Woff2TableDirectory,
    collection: &CollectionDirectory,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    let mut out: Vec<u8> = Vec::with_capacity(header.total_sfnt_size as usize);
    let mut font_infos = write_header_block(&mut out, header, table_directory, collection);

    // Metadata for tables that have been written already, so fonts in a
    // collection can share them. Keyed by (tag, src offset) because a
    // transformed loca has no length to tell it apart by.
    let mut written: BTreeMap<(Tag, u32), TableMetadata> = BTreeMap::new();

    for (font_index, font) in collection.fonts.iter().enumerate() {
        reconstruct_font(
            &mut out,
            data,
            table_directory,
            font,
            &mut font_infos[font_index],
            &mut written,
            font_index,
        )?;
    }

    Ok(out)
}

fn reconstruct_font(
    out: &mut Vec<u8>,
    data: &[u8],
    table_directory: &Woff2TableDirectory,
    font: &CollectionDirectoryEntry,
    info: &mut FontInfo,
    written: &mut BTreeMap<(Tag, u32), TableMetadata>,
    font_index: usize,
) -> Result<(), Error> {
    // Check that glyf and loca are compatible with each other: both present
    // or neither, and transformed in lockstep.
    let glyf_entry = font.glyf_idx.map(|idx| &table_directory[idx as usize]);
    let loca_entry = font.loca_idx.map(|idx| &table_directory[idx as usize]);
    match (glyf_entry, loca_entry) {
        (Some(glyf), Some(loca)) => {
            bail_if!(
                glyf.is_transformed() != loca.is_transformed(),
                Error::BadDirectory {
                    reason: "cannot transform just one of glyf/loca"
                }
            );
        }
        (Some(_), None) | (None, Some(_)) => bail!(Error::BadDirectory {
            reason: "cannot have just one of glyf/loca"
        }),
        (None, None) => {}
    }

    let mut font_checksum: u32 = info.header_checksum;
    let mut head_metadata: Option<TableMetadata> = None;
    // The loca table is regenerated while glyf is; parked here until the
    // directory walk reaches loca's slot.
    let mut pending_loca: Option<(Vec<u8>, u32)> = None;

    for &table_index in &font.table_indices {
        let table = &table_directory[table_index as usize];
        let src = table.data_as_slice(data)?;

        // numberOfHMetrics is needed before hmtx can be rebuilt; tables are
        // processed in tag order so hhea always comes first.
        if table.tag == tags::HHEA {
            info.num_hmetrics = sfnt::hhea_num_hmetrics(src)?;
        }

        let reuse_key = (table.tag, table.woff_offset);
        let metadata = match written.get(&reuse_key) {
            Some(metadata) => {
                // Sharing only makes sense across fonts of a collection
                bail_if!(
                    font_index == 0,
                    Error::BadDirectory {
                        reason: "font repeats a table"
                    }
                );
                *metadata
            }
            None => {
                let metadata = if !table.is_transformed() {
                    reconstruct_passthrough_table(out, table, src)?
                } else if table.tag == tags::GLYF {
                    let dst_offset = out.len() as u32;
                    let decoded = glyf_decoder::reconstruct_glyf_and_loca(src)?;

                    // https://dev.w3.org/webfonts/WOFF2/spec/#conform-mustRejectLoca
                    let loca_entry =
                        loca_entry.expect("glyf/loca pairing was validated before the table walk");
                    bail_if!(
                        loca_entry.orig_length as usize != decoded.loca_table.len(),
                        Error::bad_transform(
                            tags::LOCA,
                            "origLength disagrees with the reconstructed loca",
                        )
                    );

                    out.extend_from_slice(&decoded.glyf_table);
                    info.num_glyphs = decoded.num_glyphs;
                    info.x_mins = decoded.x_mins;
                    pending_loca = Some((decoded.loca_table, decoded.loca_checksum));

                    TableMetadata {
                        checksum: decoded.glyf_checksum,
                        dst_offset,
                        dst_length: decoded.glyf_table.len() as u32,
                    }
                } else if table.tag == tags::LOCA {
                    let (loca_table, loca_checksum) =
                        pending_loca.take().ok_or_else(|| {
                            Error::bad_transform(tags::LOCA, "transformed loca without glyf")
                        })?;
                    let dst_offset = out.len() as u32;
                    let dst_length = loca_table.len() as u32;
                    out.extend_from_slice(&loca_table);
                    TableMetadata {
                        checksum: loca_checksum,
                        dst_offset,
                        dst_length,
                    }
                } else if table.tag == tags::HMTX && table.transform_version == 1 {
                    // Tables are in tag order, so glyf (x_mins) and hhea
                    // (numberOfHMetrics) have both been seen already.
                    let hmtx = hmtx_decoder::reconstruct_hmtx(
                        src,
                        info.num_glyphs,
                        info.num_hmetrics,
                        &info.x_mins,
                    )?;
                    let dst_offset = out.len() as u32;
                    let checksum = compute_checksum(&hmtx);
                    out.extend_from_slice(&hmtx);
                    TableMetadata {
                        checksum,
                        dst_offset,
                        dst_length: hmtx.len() as u32,
                    }
                } else {
                    bail!(Error::bad_transform(
                        table.tag,
                        format!(
                            "transformation version {} is not defined",
                            table.transform_version
                        ),
                    ));
                };

                written.insert(reuse_key, metadata);
                metadata
            }
        };

        if table.tag == tags::HEAD {
            head_metadata = Some(metadata);
        }
        font_checksum = font_checksum.wrapping_add(metadata.checksum);

        // Patch the real values into this table's directory entry and fold
        // the replaced zeros into the running checksum.
        let entry_offset = info.table_entry_by_tag[&table.tag];
        let entry = &mut out[entry_offset + 4..entry_offset + SFNT_ENTRY_SIZE];
        entry[0..4].copy_from_slice(&metadata.checksum.to_be_bytes());
        entry[4..8].copy_from_slice(&metadata.dst_offset.to_be_bytes());
        entry[8..12].copy_from_slice(&metadata.dst_length.to_be_bytes());
        font_checksum = font_checksum
            .wrapping_add(compute_checksum(&out[entry_offset + 4..entry_offset + SFNT_ENTRY_SIZE]));

        // Keep every table 4-byte aligned
        out.resize(round4(out.len()), 0);
    }

    // head.checkSumAdjustment was zeroed before summing; write the fixup.
    if let Some(head) = head_metadata {
        bail_if!(
            head.dst_length < 12,
            Error::BadDirectory {
                reason: "head table too short"
            }
        );
        let adjustment = CHECKSUM_ADJUSTMENT_MAGIC.wrapping_sub(font_checksum);
        let offset = head.dst_offset as usize + CHECKSUM_ADJUSTMENT_OFFSET;
        out[offset..offset + 4].copy_from_slice(&adjustment.to_be_bytes());
    }

    Ok(())
}

/// Copy an untransformed table into the output. 'head' gets its
/// checkSumAdjustment zeroed on the way through so per-font sums can be
/// taken over the finished file.
fn reconstruct_passthrough_table(
    out: &mut Vec<u8>,
    table: &Woff2TableDirectoryEntry,
    src: &[u8],
) -> Result<TableMetadata, Error> {
    let dst_offset = out.len() as u32;
    let checksum = if table.tag == tags::HEAD {
        bail_if!(
            src.len() < CHECKSUM_ADJUSTMENT_OFFSET + 4,
            Error::BadDirectory {
                reason: "head table too short"
            }
        );
        let mut head = src.to_vec();
        head[CHECKSUM_ADJUSTMENT_OFFSET..CHECKSUM_ADJUSTMENT_OFFSET + 4].fill(0);
        let checksum = compute_checksum(&head);
        out.extend_from_slice(&head);
        checksum
    } else {
        out.extend_from_slice(src);
        compute_checksum(src)
    };

    Ok(TableMetadata {
        checksum,
        dst_offset,
        dst_length: src.len() as u32,
    })
}

/// Encode an uncompressed single-font SFNT as WOFF2 using the built-in
/// Brotli compressor (mode FONT).
#[cfg(feature = "brotli")]
pub fn encode_woff2(data: &[u8], options: &Woff2EncodeOptions) -> Result<Vec<u8>, Error> {
    use brotli::enc::BrotliEncoderParams;
    use brotli::enc::backward_references::BrotliEncoderMode;

    encode_woff2_with_custom_brotli(data, options, &mut |payload, quality| {
        let params = BrotliEncoderParams {
            quality: quality as i32,
            mode: BrotliEncoderMode::BROTLI_MODE_FONT,
            size_hint: payload.len(),
            ..BrotliEncoderParams::default()
        };
        let mut compressed: Vec<u8> = Vec::new();
        brotli::BrotliCompress(&mut &payload[..], &mut compressed, &params)?;
        Ok(compressed)
    })
}

/// Encode an uncompressed single-font SFNT as WOFF2 using a caller-supplied
/// Brotli compressor.
///
/// The closure receives the concatenated table payload and the requested
/// quality; its output lands in the file verbatim.
#[allow(clippy::type_complexity)]
pub fn encode_woff2_with_custom_brotli(
    data: &[u8],
    options: &Woff2EncodeOptions,
    brotli_encode: &mut dyn FnMut(&[u8], u32) -> Result<Vec<u8>, Box<dyn std::error::Error>>,
) -> Result<Vec<u8>, Error> {
    let quality = options.quality.min(11);
    let font = SfntFont::parse(data)?;

    // Working directory: DSIG dropped, tags sorted. The sort decides both
    // directory order and payload concatenation order.
    let mut source_tables: Vec<&SfntTableEntry> = font
        .tables
        .iter()
        .filter(|table| table.tag != tags::DSIG)
        .collect();
    source_tables.sort_by_key(|table| table.tag);
    bail_if!(
        source_tables.windows(2).any(|pair| pair[0].tag == pair[1].tag),
        Error::SfntInvalid {
            reason: "duplicate table tag"
        }
    );

    let head = font.table_data(tags::HEAD).ok_or(Error::SfntInvalid {
        reason: "missing head table",
    })?;
    bail_if!(
        head.len() < 54,
        Error::SfntInvalid {
            reason: "head table too short"
        }
    );

    // Glyph transform, for TrueType-flavored fonts carrying glyf + loca
    let glyf = font.table_data(tags::GLYF);
    let loca = font.table_data(tags::LOCA);
    bail_if!(
        glyf.is_some() != loca.is_some(),
        Error::SfntInvalid {
            reason: "font has only one of glyf/loca"
        }
    );
    let mut glyf_transform: Option<glyf_encoder::GlyfTransform> = None;
    let mut hmtx_transform: Option<Vec<u8>> = None;
    if let (Some(glyf), Some(loca)) = (glyf, loca) {
        let maxp = font.table_data(tags::MAXP).ok_or(Error::SfntInvalid {
            reason: "missing maxp table",
        })?;
        let num_glyphs = sfnt::maxp_num_glyphs(maxp)?;
        let index_format = sfnt::head_index_format(head)?;
        let loca_offsets = sfnt::parse_loca(loca, index_format, num_glyphs, glyf.len())?;

        let transform =
            glyf_encoder::transform_glyf_and_loca(glyf, &loca_offsets, num_glyphs, index_format)?;

        if let (Some(hmtx), Some(hhea)) = (
            font.table_data(tags::HMTX),
            font.table_data(tags::HHEA),
        ) {
            let num_hmetrics = sfnt::hhea_num_hmetrics(hhea)?;
            hmtx_transform =
                hmtx_encoder::transform_hmtx(hmtx, num_glyphs, num_hmetrics, &transform.x_mins)?;
        }
        glyf_transform = Some(transform);
    }

    // Any font coming out of WOFF2 must have bit 11 ("font transformed")
    // set in head.flags; set it on a defensive copy before compression.
    let mut head_copy = head.to_vec();
    head_copy[16] |= 0x08;

    debug!(
        "encoding woff2: flavor {}, {} tables, glyf transform {}, hmtx transform {}",
        font.flavor,
        source_tables.len(),
        if glyf_transform.is_some() { "on" } else { "off" },
        if hmtx_transform.is_some() { "on" } else { "off" },
    );

    // Directory and concatenated payload
    let mut directory: Vec<u8> = Vec::new();
    let mut payload: Vec<u8> = Vec::with_capacity(data.len());
    let mut total_sfnt_size: usize = SFNT_HEADER_SIZE + SFNT_ENTRY_SIZE * source_tables.len();
    for table in &source_tables {
        let (transform_version, body): (u8, &[u8]) = if table.tag == tags::GLYF {
            let transform = glyf_transform.as_ref().expect("glyf implies the transform");
            (0, transform.table.as_slice())
        } else if table.tag == tags::LOCA {
            // Fully regenerated from glyf on decode
            (0, &[])
        } else if table.tag == tags::HMTX
            && let Some(hmtx) = &hmtx_transform
        {
            (1, hmtx.as_slice())
        } else if table.tag == tags::HEAD {
            (0, head_copy.as_slice())
        } else {
            (0, table.data)
        };
        let transformed = transform_version != 0 || table.tag == tags::GLYF || table.tag == tags::LOCA;

        directory.push(Woff2TableDirectoryEntry::flags_byte(
            table.tag,
            transform_version,
        ));
        if tags::known_tag_index(table.tag).is_none() {
            directory.extend_from_slice(&table.tag.to_be_bytes());
        }
        directory.put_variable_128_u32(table.length);
        if transformed {
            directory.put_variable_128_u32(body.len() as u32);
        }

        total_sfnt_size += round4(table.length as usize);
        payload.extend_from_slice(body);
    }

    let compressed = brotli_encode(&payload, quality).map_err(|err| {
        debug!("brotli encode failed: {err}");
        Error::BrotliFailed
    })?;
    debug!(
        "compressed {} payload bytes to {} at quality {quality}",
        payload.len(),
        compressed.len()
    );

    let header = WoffHeader {
        woff_version: WoffVersion::Woff2,
        signature: WOFF2_SIG,
        flavor: font.flavor,
        length: (WOFF2_HEADER_SIZE + directory.len() + compressed.len()) as u32,
        num_tables: source_tables.len() as u16,
        reserved: 0,
        total_sfnt_size: total_sfnt_size as u32,
        total_compressed_size: compressed.len() as u32,
        major_version: 0,
        minor_version: 0,
        meta_offset: 0,
        meta_length: 0,
        meta_orig_length: 0,
        priv_offset: 0,
        priv_length: 0,
    };

    let mut out: Vec<u8> = Vec::with_capacity(header.length as usize);
    header.write(&mut out);
    out.extend_from_slice(&directory);
    out.extend_from_slice(&compressed);
    Ok(out)
}
