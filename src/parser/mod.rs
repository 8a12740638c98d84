mod block;
mod lines;
mod matcher;
mod tokens;
mod types;

pub use block::block_len;
pub use lines::{dominant_ending, join_lines, split_lines};
pub use matcher::{find_directives, find_key_lines, line_selected, select};
pub use tokens::{
    first_token, has_marked_word, has_marker, has_word, is_word, replace_leading_token,
    split_hash, words, Word, HASH, MARKER,
};
pub use types::{Activation, Line, LineEnding, Selector};
