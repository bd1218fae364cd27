//! The WOFF 1.0 container codec: a per-table zlib wrapper around SFNT.
//!
//! <https://www.w3.org/TR/WOFF/>

use log::debug;

use crate::checksum::{compute_checksum, round4};
use crate::error::{Error, bail_if};
use crate::sfnt::{SFNT_ENTRY_SIZE, SFNT_HEADER_SIZE, SfntFont, SfntTableEntry, write_offset_table};
use crate::types::{
    WOFF1_SIG, Woff1TableDirectory, Woff1TableDirectoryEntry, WoffHeader, WoffVersion,
};

const WOFF1_HEADER_SIZE: usize = 44;
const WOFF1_ENTRY_SIZE: usize = 20;

/// Options for [`encode_woff1`].
#[derive(Copy, Clone, Debug)]
pub struct Woff1EncodeOptions {
    /// zlib compression level, 1..=9. Defaults to 9 (best compression).
    pub level: u32,
}

impl Default for Woff1EncodeOptions {
    fn default() -> Self {
        Self { level: 9 }
    }
}

/// Decode a WOFF 1.0 file to an uncompressed SFNT using the built-in zlib
/// decompressor.
#[cfg(feature = "z")]
pub fn decode_woff1(data: &[u8]) -> Result<Vec<u8>, Error> {
    decode_woff1_with_custom_z(data, &mut inflate)
}

#[cfg(feature = "z")]
fn inflate(compressed: &[u8], size_hint: usize) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use flate2::{Decompress, FlushDecompress};

    let mut output: Vec<u8> = Vec::with_capacity(size_hint);
    let mut decompressor = Decompress::new(true);
    decompressor.decompress_vec(compressed, &mut output, FlushDecompress::Finish)?;
    Ok(output)
}

/// Decode a WOFF 1.0 file to an uncompressed SFNT using a caller-supplied
/// zlib decompressor.
///
/// The closure receives a compressed table and the exact size it should
/// inflate back to.
#[allow(clippy::type_complexity)]
pub fn decode_woff1_with_custom_z(
    raw_woff_data: &[u8],
    inflate: &mut dyn FnMut(&[u8], usize) -> Result<Vec<u8>, Box<dyn std::error::Error>>,
) -> Result<Vec<u8>, Error> {
    // `input` is a second view over `raw_woff_data`: the parsing functions
    // advance the slice itself, while `raw_woff_data` keeps the whole file.
    let mut input = raw_woff_data;

    let header = WoffHeader::parse(&mut input)?;
    bail_if!(
        header.woff_version != WoffVersion::Woff1,
        Error::BadSignature {
            found: u32::from_be_bytes(header.signature.to_be_bytes())
        }
    );
    let mut table_directory = Woff1TableDirectory::parse(&mut input, header.num_tables as usize)?;

    debug!(
        "decoding woff1: flavor {}, {} tables",
        header.flavor, header.num_tables
    );

    // Directory entries are emitted in tag order; table data keeps the order
    // it had in the WOFF file.
    table_directory.sort_by_key(|table| table.tag);

    let mut out: Vec<u8> =
        Vec::with_capacity((header.total_sfnt_size as usize).min(raw_woff_data.len() * 16));
    write_offset_table(&mut out, header.flavor, table_directory.len() as u16);

    // Reserve the table directory; filled in as tables are written
    let directory_start = out.len();
    out.resize(out.len() + table_directory.len() * SFNT_ENTRY_SIZE, 0);

    struct TableWithTagIdx<'a> {
        table: &'a Woff1TableDirectoryEntry,
        tag_index: usize,
    }
    let mut tables_by_offset: Vec<TableWithTagIdx> = table_directory
        .iter()
        .enumerate()
        .map(|(tag_index, table)| TableWithTagIdx { table, tag_index })
        .collect();
    tables_by_offset.sort_by_key(|entry| entry.table.woff_offset);

    for TableWithTagIdx { table, tag_index } in tables_by_offset {
        let table_offset = out.len();

        // Directory entry for this table, in its tag-sorted slot
        let entry_start = directory_start + tag_index * SFNT_ENTRY_SIZE;
        let entry = &mut out[entry_start..entry_start + SFNT_ENTRY_SIZE];
        entry[0..4].copy_from_slice(&table.tag.to_be_bytes());
        entry[4..8].copy_from_slice(&table.orig_checksum.to_be_bytes());
        entry[8..12].copy_from_slice(&(table_offset as u32).to_be_bytes());
        entry[12..16].copy_from_slice(&table.orig_length.to_be_bytes());

        // Table data, inflated where the stored form is smaller
        let stored = table.data_as_slice(raw_woff_data)?;
        if table.is_compressed() {
            let inflated = inflate(stored, table.orig_length as usize).map_err(|err| {
                debug!("zlib inflate failed: {err}");
                Error::DeflateFailed
            })?;
            bail_if!(
                inflated.len() != table.orig_length as usize,
                Error::DeflateFailed
            );
            out.extend_from_slice(&inflated);
        } else {
            out.extend_from_slice(stored);
        }

        out.resize(round4(out.len()), 0);
    }

    debug!("reconstructed sfnt: {} bytes", out.len());
    Ok(out)
}

/// Encode an uncompressed single-font SFNT as WOFF 1.0 using the built-in
/// zlib compressor.
#[cfg(feature = "z")]
pub fn encode_woff1(data: &[u8], options: &Woff1EncodeOptions) -> Result<Vec<u8>, Error> {
    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    encode_woff1_with_custom_z(data, options, &mut |table, level| {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
        encoder.write_all(table)?;
        Ok(encoder.finish()?)
    })
}

/// Encode an uncompressed single-font SFNT as WOFF 1.0 using a
/// caller-supplied zlib compressor.
#[allow(clippy::type_complexity)]
pub fn encode_woff1_with_custom_z(
    data: &[u8],
    options: &Woff1EncodeOptions,
    deflate: &mut dyn FnMut(&[u8], u32) -> Result<Vec<u8>, Box<dyn std::error::Error>>,
) -> Result<Vec<u8>, Error> {
    let level = options.level.clamp(1, 9);
    let font = SfntFont::parse(data)?;

    let mut source_tables: Vec<&SfntTableEntry> = font.tables.iter().collect();
    source_tables.sort_by_key(|table| table.tag);
    bail_if!(
        source_tables.windows(2).any(|pair| pair[0].tag == pair[1].tag),
        Error::SfntInvalid {
            reason: "duplicate table tag"
        }
    );

    debug!(
        "encoding woff1: flavor {}, {} tables, level {level}",
        font.flavor,
        source_tables.len()
    );

    let directory_end = WOFF1_HEADER_SIZE + WOFF1_ENTRY_SIZE * source_tables.len();
    let mut directory: Vec<Woff1TableDirectoryEntry> = Vec::with_capacity(source_tables.len());
    let mut body: Vec<u8> = Vec::with_capacity(data.len());
    let mut total_sfnt_size = SFNT_HEADER_SIZE + SFNT_ENTRY_SIZE * source_tables.len();

    for table in &source_tables {
        let compressed = deflate(table.data, level).map_err(|err| {
            debug!("zlib deflate failed: {err}");
            Error::DeflateFailed
        })?;
        // A table whose compressed form saves nothing is stored raw
        let stored: &[u8] = if compressed.len() < table.data.len() {
            &compressed
        } else {
            table.data
        };

        directory.push(Woff1TableDirectoryEntry {
            tag: table.tag,
            woff_offset: (directory_end + body.len()) as u32,
            comp_length: stored.len() as u32,
            orig_length: table.length,
            orig_checksum: compute_checksum(table.data),
        });
        body.extend_from_slice(stored);
        body.resize(round4(body.len()), 0);

        total_sfnt_size += round4(table.length as usize);
    }

    let header = WoffHeader {
        woff_version: WoffVersion::Woff1,
        signature: WOFF1_SIG,
        flavor: font.flavor,
        length: (directory_end + body.len()) as u32,
        num_tables: source_tables.len() as u16,
        reserved: 0,
        total_sfnt_size: total_sfnt_size as u32,
        total_compressed_size: 0, // WOFF2 only; not serialized for WOFF1
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
    for entry in &directory {
        out.extend_from_slice(&entry.tag.to_be_bytes());
        out.extend_from_slice(&entry.woff_offset.to_be_bytes());
        out.extend_from_slice(&entry.comp_length.to_be_bytes());
        out.extend_from_slice(&entry.orig_length.to_be_bytes());
        out.extend_from_slice(&entry.orig_checksum.to_be_bytes());
    }
    out.extend_from_slice(&body);
    Ok(out)
}
