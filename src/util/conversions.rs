use crate::util::constants::*;
use crate::util::Address;

pub fn page_align_down(address: Address) -> Address {
    address.align_down(BYTES_IN_PAGE)
}

pub fn is_page_aligned(address: Address) -> bool {
    address.is_aligned_to(BYTES_IN_PAGE)
}

// const function cannot have conditional expression
pub const fn chunk_align_up(addr: Address) -> Address {
    addr.align_up(BYTES_IN_CHUNK)
}

pub const fn raw_align_up(val: usize, align: usize) -> usize {
    // See https://github.com/rust-lang/rust/blob/e620d0f337d0643c757bab791fc7d88d63217704/src/libcore/alloc.rs#L192
    val.wrapping_add(align).wrapping_sub(1) & !align.wrapping_sub(1)
}

pub const fn raw_align_down(val: usize, align: usize) -> usize {
    val & !align.wrapping_sub(1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/// Align a byte size up to a whole number of chunks.
pub const fn raw_chunk_align_up(bytes: usize) -> usize {
    raw_align_up(bytes, BYTES_IN_CHUNK)
}

pub fn pages_to_bytes(pages: usize) -> usize {
    pages << LOG_BYTES_IN_PAGE
}

pub fn bytes_to_pages_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_PAGE - 1) >> LOG_BYTES_IN_PAGE
}

pub fn bytes_to_pages(bytes: usize) -> usize {
    let pages = bytes_to_pages_up(bytes);

    if cfg!(debug_assertions) {
        let computed_extent = pages << LOG_BYTES_IN_PAGE;
        let bytes_match_pages = computed_extent == bytes;
        assert!(
            bytes_match_pages,
            "ERROR: number of bytes computed from pages must match original byte amount!\
             \n           bytes = {}\
             \n           pages = {}\
             \n           bytes computed from pages = {}",
            bytes, pages, computed_extent
        );
    }

    pages
}

pub fn bytes_to_words_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_WORD - 1) >> LOG_BYTES_IN_WORD
}

/// Format a byte count the way our heap size options are written, e.g. `64M`.
pub fn bytes_to_formatted_string(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut i = 0;
    let mut num = bytes;
    while i < UNITS.len() - 1 && num >= 1024 && num % 1024 == 0 {
        num >>= 10;
        i += 1;
    }
    format!("{}{}", num, UNITS[i])
}

#[cfg(test)]
mod tests {
    use crate::util::constants::*;
    use crate::util::conversions::*;
    use crate::util::Address;

    #[test]
    fn test_page_align() {
        let addr = Address::from_usize(0x2345_6789);
        assert_eq!(page_align_down(addr), Address::from_usize(0x2345_6000));
        assert!(!is_page_aligned(addr));
        assert!(is_page_aligned(page_align_down(addr)));
    }

    #[test]
    fn test_chunk_align() {
        let addr = Address::from_usize(0x2345_6789);
        // 1 MB chunks.
        assert_eq!(chunk_align_up(addr), Address::from_usize(0x2350_0000));
        assert_eq!(chunk_align_up(addr) - BYTES_IN_CHUNK, Address::from_usize(0x2340_0000));
        assert_eq!(chunk_align_up(Address::from_usize(0x2350_0000)), Address::from_usize(0x2350_0000));
        assert_eq!(raw_chunk_align_up(1), BYTES_IN_CHUNK);
    }

    #[test]
    fn test_pages() {
        assert_eq!(bytes_to_pages_up(1), 1);
        assert_eq!(bytes_to_pages_up(BYTES_IN_PAGE), 1);
        assert_eq!(bytes_to_pages_up(BYTES_IN_PAGE + 1), 2);
        assert_eq!(pages_to_bytes(3), 3 * BYTES_IN_PAGE);
    }

    #[test]
    fn test_bytes_to_formatted_string() {
        assert_eq!(bytes_to_formatted_string(100), "100B");
        assert_eq!(bytes_to_formatted_string(64 << 20), "64M");
        assert_eq!(bytes_to_formatted_string(1025), "1025B");
    }
}
