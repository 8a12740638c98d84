use crate::parser::{
    block_len, dominant_ending, find_directives, find_key_lines, replace_leading_token, select,
    Activation, Line, LineEnding, Selector, HASH,
};

/// Result of looking up one Replace target.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Occurrences whose blocks were rewritten, and the parameter lines
    /// written across all of them.
    Rewritten { blocks: usize, lines: usize },
    /// The marker asked for exactly one occurrence but more survived.
    Ambiguous(usize),
}

/// Add or strip one leading `#` on every selected occurrence of `name`.
///
/// Turning a directive on looks only at inactive occurrences and vice versa,
/// so a second identical call finds nothing. Returns the number of lines
/// changed.
pub fn toggle(
    lines: &mut [Line],
    name: &str,
    turn_on: bool,
    selector: &Selector,
    activation: Activation,
) -> usize {
    let candidates = find_directives(lines, name, !turn_on, activation);
    let hits = select(lines, &candidates, selector);

    for &i in &hits {
        flip_hash(&mut lines[i]);
    }
    hits.len()
}

fn flip_hash(line: &mut Line) {
    let start = line
        .text
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(line.text.len());
    if line.text[start..].starts_with(HASH) {
        line.text.remove(start);
    } else {
        line.text.insert(start, HASH);
    }
}

/// Rewrite every line mentioning `key` as `value<separator>key`.
///
/// The original trailing comment is dropped; the key becomes the label.
pub fn set_value(
    lines: &mut [Line],
    key: &str,
    value: &str,
    selector: &Selector,
    separator: &str,
) -> usize {
    let hits = find_key_lines(lines, key, selector);
    for &i in &hits {
        lines[i].text = format!("{value}{separator}{key}");
    }
    hits.len()
}

/// Replace the parameter block of each selected active occurrence of `name`.
///
/// When the new value count equals the block length only the leading value
/// of each line changes and comments are kept; otherwise the block becomes
/// bare value lines. Blocks are processed bottom-up so a resize never shifts
/// an occurrence not yet visited.
pub fn replace(
    lines: &mut Vec<Line>,
    name: &str,
    values: &[String],
    selector: &Selector,
    activation: Activation,
) -> ReplaceOutcome {
    let candidates = find_directives(lines, name, true, activation);
    let hits = select(lines, &candidates, selector);

    if selector.use_marker && hits.len() > 1 {
        return ReplaceOutcome::Ambiguous(hits.len());
    }

    let written = hits
        .iter()
        .rev()
        .map(|&pos| replace_block(lines, pos, values))
        .sum();
    ReplaceOutcome::Rewritten {
        blocks: hits.len(),
        lines: written,
    }
}

/// Returns the number of block lines written.
fn replace_block(lines: &mut Vec<Line>, pos: usize, values: &[String]) -> usize {
    let len = block_len(lines, pos);

    if values.len() == len {
        for (line, value) in lines[pos + 1..=pos + len].iter_mut().zip(values) {
            line.text = replace_leading_token(&line.text, value);
        }
        return len;
    }

    let ending = dominant_ending(lines);
    let end = pos + 1 + len;
    let open_tail = end == lines.len() && lines[end - 1].ending == LineEnding::None;

    let fresh = values.iter().map(|v| Line::new(v.as_str(), ending));
    lines.splice(pos + 1..end, fresh);

    if open_tail {
        lines[pos].ending = ending;
        lines[pos + values.len()].ending = LineEnding::None;
    }
    tracing::debug!(
        directive = pos,
        from = len,
        to = values.len(),
        "resized parameter block"
    );
    values.len()
}
