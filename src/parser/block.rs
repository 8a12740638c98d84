use super::types::Line;

/// Length of the parameter block owned by the directive at `directive`.
///
/// Counts the non-blank lines right after the directive line, stopping at
/// the first blank line or the end of the buffer.
pub fn block_len(lines: &[Line], directive: usize) -> usize {
    lines
        .iter()
        .skip(directive + 1)
        .take_while(|line| !line.is_blank())
        .count()
}
