/// The marker character that singles out one occurrence among duplicates.
pub const MARKER: char = '^';

/// The comment/command prefix of a directive token.
pub const HASH: char = '#';

/// A word character in the `\w` sense: ASCII alphanumeric or underscore.
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// True if `text` is exactly one word, so it can be found by [`has_word`].
pub fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_word_char)
}

/// One word found on a line, with the byte offset just past its end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Word<'a> {
    pub text: &'a str,
    pub end: usize,
}

/// Split a line into words: maximal runs of word characters.
///
/// Everything else (whitespace, brackets, `^`, `/`, `#`) separates words, so
/// `case2^` yields `case2` and `[J/m^2/s/T]` yields `J`, `m`, `2`, `s`, `T`.
pub fn words(line: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in line.char_indices() {
        match (is_word_char(ch), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                out.push(Word {
                    text: &line[s..idx],
                    end: idx,
                });
                start = None;
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        out.push(Word {
            text: &line[s..],
            end: line.len(),
        });
    }

    out
}

/// True if `word` occurs on the line as a standalone word.
pub fn has_word(line: &str, word: &str) -> bool {
    words(line).iter().any(|w| w.text == word)
}

/// True if `word` occurs immediately followed by the marker, and the marker
/// is not itself followed by a word character. The word comparison ignores
/// ASCII case.
pub fn has_marked_word(line: &str, word: &str) -> bool {
    words(line).iter().any(|w| {
        if !w.text.eq_ignore_ascii_case(word) {
            return false;
        }
        let mut rest = line[w.end..].chars();
        rest.next() == Some(MARKER) && !rest.next().is_some_and(is_word_char)
    })
}

/// True if the marker appears anywhere on the line.
pub fn has_marker(line: &str) -> bool {
    line.contains(MARKER)
}

/// First whitespace-delimited token of a line.
pub fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Split one leading `#` off a token. Returns whether it was present and the
/// remaining name.
pub fn split_hash(token: &str) -> (bool, &str) {
    match token.strip_prefix(HASH) {
        Some(rest) => (true, rest),
        None => (false, token),
    }
}

/// Byte span of the leading value token of a block line.
pub fn leading_token_span(line: &str) -> Option<(usize, usize)> {
    let start = line.find(|c: char| !c.is_whitespace())?;
    let len = line[start..]
        .find(char::is_whitespace)
        .unwrap_or(line.len() - start);
    Some((start, start + len))
}

/// Replace the leading value token of a block line, keeping indentation and
/// the trailing comment byte-for-byte.
pub fn replace_leading_token(line: &str, value: &str) -> String {
    match leading_token_span(line) {
        Some((start, end)) => {
            let mut out = String::with_capacity(line.len() + value.len());
            out.push_str(&line[..start]);
            out.push_str(value);
            out.push_str(&line[end..]);
            out
        }
        None => value.to_string(),
    }
}
