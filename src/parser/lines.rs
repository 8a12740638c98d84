use super::types::{Line, LineEnding};

/// Split file contents into lines, recording each line's terminator.
///
/// A trailing newline does not produce an extra empty line; a final line
/// without one is kept with `LineEnding::None`.
pub fn split_lines(contents: &str) -> Vec<Line> {
    let mut out = Vec::new();
    let mut rest = contents;

    while !rest.is_empty() {
        match rest.find('\n') {
            Some(nl) => {
                let (text, ending) = match rest[..nl].strip_suffix('\r') {
                    Some(text) => (text, LineEnding::CrLf),
                    None => (&rest[..nl], LineEnding::Lf),
                };
                out.push(Line::new(text, ending));
                rest = &rest[nl + 1..];
            }
            None => {
                out.push(Line::new(rest, LineEnding::None));
                rest = "";
            }
        }
    }

    out
}

/// Join lines back into file contents, terminators verbatim.
pub fn join_lines(lines: &[Line]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.text.len() + 2).sum());
    for line in lines {
        out.push_str(&line.text);
        out.push_str(line.ending.as_str());
    }
    out
}

/// Terminator to use for lines inserted into this buffer: the first one seen.
pub fn dominant_ending(lines: &[Line]) -> LineEnding {
    lines
        .iter()
        .map(|l| l.ending)
        .find(|e| *e != LineEnding::None)
        .unwrap_or(LineEnding::Lf)
}
