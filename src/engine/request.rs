use crate::parser::Selector;
use serde::{Deserialize, Serialize};

/// One mutation applied to a directive file as part of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationRequest {
    /// Switch every selected occurrence of each name on or off.
    Toggle {
        names: Vec<String>,
        turn_on: bool,
        #[serde(default)]
        selector: Selector,
    },
    /// Rewrite every line mentioning a key as `value<sep>key`.
    SetValue {
        values: Vec<(String, String)>,
        #[serde(default)]
        selector: Selector,
    },
    /// Replace the parameter block of each named directive.
    Replace {
        blocks: Vec<(String, Vec<String>)>,
        #[serde(default)]
        selector: Selector,
    },
}

impl MutationRequest {
    pub fn toggle<I, S>(names: I, turn_on: bool, selector: Selector) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MutationRequest::Toggle {
            names: names.into_iter().map(Into::into).collect(),
            turn_on,
            selector,
        }
    }

    pub fn set_values<I, K, V>(values: I, selector: Selector) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        MutationRequest::SetValue {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            selector,
        }
    }

    /// Build a Replace from `name -> "v1,v2,..."` pairs.
    pub fn replace_joined<I, K, V>(blocks: I, selector: Selector) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        MutationRequest::Replace {
            blocks: blocks
                .into_iter()
                .map(|(k, v)| (k.into(), split_values(v.as_ref())))
                .collect(),
            selector,
        }
    }

    pub fn selector(&self) -> &Selector {
        match self {
            MutationRequest::Toggle { selector, .. }
            | MutationRequest::SetValue { selector, .. }
            | MutationRequest::Replace { selector, .. } => selector,
        }
    }
}

/// Split a comma-joined value list, trimming each entry.
pub fn split_values(joined: &str) -> Vec<String> {
    joined.split(',').map(|v| v.trim().to_string()).collect()
}

/// Human-readable label of one request entry: `NAME`, `NAME(TAG)`,
/// `NAME(TAG^)` or `NAME^`.
pub fn entry_label(name: &str, selector: &Selector) -> String {
    let marker = if selector.use_marker { "^" } else { "" };
    match &selector.tag {
        Some(tag) => format!("{name}({tag}{marker})"),
        None => format!("{name}{marker}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_show_tag_and_marker() {
        assert_eq!(entry_label("END", &Selector::all()), "END");
        assert_eq!(entry_label("END", &Selector::tagged("x")), "END(x)");
        assert_eq!(entry_label("END", &Selector::marked(Some("x".into()))), "END(x^)");
        assert_eq!(entry_label("END", &Selector::marked(None)), "END^");
    }

    #[test]
    fn joined_values_are_trimmed() {
        assert_eq!(split_values("2020, 1,1 "), vec!["2020", "1", "1"]);
    }
}
