/// Find the first occurrence of `needle` in `haystack`, at or after
/// `start`.
///
/// Returns the index where the match begins. An empty needle, a needle
/// longer than the haystack, or a start past the last possible match
/// all find nothing.
pub fn find_sequence(haystack: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    let (&first, rest) = needle.split_first()?;
    if haystack.len() < needle.len() {
        return None;
    }

    // past here no match is possible
    let endpoint = haystack.len() - needle.len() + 1;
    let mut pos = start;
    while pos < endpoint {
        if haystack[pos] == first && haystack[pos + 1..pos + needle.len()] == *rest {
            return Some(pos);
        }
        pos += 1;
    }

    None
}
