use super::tokens::{first_token, has_marked_word, has_marker, has_word, split_hash};
use super::types::{Activation, Line, Selector};

/// Positions of directive lines named `name` whose activity equals `want_active`.
///
/// The first whitespace token must equal `name` exactly once one leading `#`
/// is removed, so `#MAGNETOGRAMFILE` never matches `MAGNETOGRAM`.
pub fn find_directives(
    lines: &[Line],
    name: &str,
    want_active: bool,
    activation: Activation,
) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let token = first_token(&line.text)?;
            let (hashed, bare) = split_hash(token);
            let active = hashed == activation.hash_is_active();
            (bare == name && active == want_active).then_some(i)
        })
        .collect()
}

/// True if the line survives the selector.
pub fn line_selected(text: &str, selector: &Selector) -> bool {
    match (&selector.tag, selector.use_marker) {
        (None, false) => true,
        (Some(tag), false) => has_word(text, tag),
        (Some(tag), true) => has_marked_word(text, tag),
        (None, true) => has_marker(text),
    }
}

/// Keep the candidate positions whose lines survive the selector.
pub fn select(lines: &[Line], positions: &[usize], selector: &Selector) -> Vec<usize> {
    positions
        .iter()
        .copied()
        .filter(|&i| line_selected(&lines[i].text, selector))
        .collect()
}

/// Positions of every line mentioning `key` as a standalone word, or as
/// `key^` when the selector asks for the marker. A selector tag must also be
/// present on the line.
pub fn find_key_lines(lines: &[Line], key: &str, selector: &Selector) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            let key_hit = if selector.use_marker {
                has_marked_word(&line.text, key)
            } else {
                has_word(&line.text, key)
            };
            key_hit
                && selector
                    .tag
                    .as_deref()
                    .map_or(true, |tag| has_word(&line.text, tag))
        })
        .map(|(i, _)| i)
        .collect()
}
