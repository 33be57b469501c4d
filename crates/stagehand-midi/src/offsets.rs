use crate::record::header::IDENTITY_TAGS;

/// Finds every byte-aligned occurrence of each recognised identity tag in
/// `buffer`, returning the offsets in ascending order. Records must be
/// decoded in this order since body decoders rely on being able to reset
/// the cursor from one offset to the next.
pub fn scan(buffer: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    for tag in IDENTITY_TAGS {
        let mut start = 0;
        while let Some(pos) = find_subslice(&buffer[start..], tag) {
            offsets.push(start + pos);
            start += pos + 1;
        }
    }
    offsets.sort_unstable();
    offsets
}

fn find_subslice(haystack: &[u8], needle: &[u8; 4]) -> Option<usize> {
    haystack.windows(4).position(|window| window == needle)
}
