//! SFNT checksum arithmetic.

/// Offset of `checkSumAdjustment` within the 'head' table.
pub(crate) const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

/// `checkSumAdjustment` is chosen so that the sum of the whole file comes
/// out to this constant.
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/head>
pub(crate) const CHECKSUM_ADJUSTMENT_MAGIC: u32 = 0xB1B0AFBA;

/// Round a value up to the nearest multiple of 4. Saturates instead of
/// overflowing for values within 3 of `usize::MAX`.
pub(crate) fn round4(value: usize) -> usize {
    match value.checked_add(3) {
        Some(value_plus_3) => value_plus_3 & !3,
        None => value,
    }
}

/// Compute the wrapping sum of the big-endian u32 words of `buf`.
///
/// A length not aligned on 4 is treated as if it were padded to 4 with 0's,
/// which is also why padding a table never changes its checksum.
pub(crate) fn compute_checksum(buf: &[u8]) -> u32 {
    let mut checksum: u32 = 0;
    let mut iter = buf.chunks_exact(4);
    for chunk in &mut iter {
        let bytes: [u8; 4] = chunk.try_into().unwrap();
        checksum = checksum.wrapping_add(u32::from_be_bytes(bytes));
    }

    checksum.wrapping_add(match *iter.remainder() {
        [a, b, c] => u32::from_be_bytes([a, b, c, 0]),
        [a, b] => u32::from_be_bytes([a, b, 0, 0]),
        [a] => u32::from_be_bytes([a, 0, 0, 0]),
        [] => 0,
        _ => unreachable!("chunk size was 4 so the remainder is shorter than 4"),
    })
}
