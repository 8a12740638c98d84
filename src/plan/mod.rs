//! Mutation plans: the add / rm / replace / change tables a run asks for,
//! and their conversion into engine requests.

mod runlist;

pub use runlist::{parse_run_ids, RunBatches, RunEntry, RunList, RunSpec};

use crate::engine::MutationRequest;
use crate::error::{PlanError, RewriteError};
use crate::parser::{is_word, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A directive name with an optional disambiguating tag: `NAME` or `NAME(TAG)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandRef {
    pub name: String,
    pub tag: Option<String>,
}

impl CommandRef {
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let text = text.trim();
        let bad = || PlanError::InvalidCommand(text.to_string());

        let (name, tag) = match text.split_once('(') {
            Some((name, rest)) => {
                let tag = rest.strip_suffix(')').ok_or_else(bad)?.trim();
                if !is_word(tag) {
                    return Err(bad());
                }
                (name.trim(), Some(tag.to_string()))
            }
            None if text.contains(')') => return Err(bad()),
            None => (text, None),
        };

        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(bad());
        }
        Ok(Self {
            name: name.to_string(),
            tag,
        })
    }

    /// Selector for this reference. The marker only applies to tagged
    /// references; an untagged one always means every occurrence.
    pub fn selector(&self, use_marker: bool) -> Selector {
        Selector {
            tag: self.tag.clone(),
            use_marker: use_marker && self.tag.is_some(),
        }
    }
}

impl fmt::Display for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}({})", self.name, tag),
            None => f.write_str(&self.name),
        }
    }
}

impl TryFrom<String> for CommandRef {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommandRef> for String {
    fn from(value: CommandRef) -> Self {
        value.to_string()
    }
}

/// Parse a comma-separated list of command references.
pub fn parse_commands(list: &str) -> Result<Vec<CommandRef>, PlanError> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(CommandRef::parse)
        .collect()
}

/// Everything one run wants changed in one directive file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MutationPlan {
    /// Directives to switch on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<CommandRef>,
    /// Directives to switch off.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rm: Vec<CommandRef>,
    /// Directive (optionally `NAME(TAG)`) to comma-joined block values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replace: BTreeMap<String, String>,
    /// Key to single value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub change: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlan {
    #[serde(default)]
    add: Vec<CommandRef>,
    #[serde(default)]
    rm: Vec<CommandRef>,
    #[serde(default)]
    replace: BTreeMap<String, Value>,
    #[serde(default)]
    change: BTreeMap<String, Value>,
}

impl MutationPlan {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.rm.is_empty()
            && self.replace.is_empty()
            && self.change.is_empty()
    }

    /// Read a JSON plan. Values may be strings, numbers or booleans; block
    /// values may also be arrays of those.
    pub fn from_json(text: &str) -> Result<Self, PlanError> {
        let raw: RawPlan = serde_json::from_str(text)?;

        let replace: BTreeMap<String, String> = raw
            .replace
            .iter()
            .map(|(name, value)| render_block(name, value).map(|v| (name.clone(), v)))
            .collect::<Result<_, RewriteError>>()?;
        let change: BTreeMap<String, String> = raw
            .change
            .iter()
            .map(|(key, value)| render_value(key, value).map(|v| (key.clone(), v)))
            .collect::<Result<_, RewriteError>>()?;

        Ok(Self {
            add: raw.add,
            rm: raw.rm,
            replace,
            change,
        })
    }

    /// Move every entry named in `names` into a second plan.
    pub fn split_off(&mut self, names: &[String]) -> MutationPlan {
        let wanted = |name: &str| names.iter().any(|n| n == name);
        let mut other = MutationPlan::default();

        let (moved, kept): (Vec<_>, Vec<_>) = self
            .add
            .drain(..)
            .partition(|c| wanted(c.name.as_str()));
        other.add = moved;
        self.add = kept;

        let (moved, kept): (Vec<_>, Vec<_>) = self
            .rm
            .drain(..)
            .partition(|c| wanted(c.name.as_str()));
        other.rm = moved;
        self.rm = kept;

        let keys: Vec<String> = self
            .replace
            .keys()
            .filter(|k| CommandRef::parse(k).is_ok_and(|c| wanted(c.name.as_str())))
            .cloned()
            .collect();
        for key in keys {
            if let Some(v) = self.replace.remove(&key) {
                other.replace.insert(key, v);
            }
        }

        let keys: Vec<String> = self
            .change
            .keys()
            .filter(|k| wanted(k.as_str()))
            .cloned()
            .collect();
        for key in keys {
            if let Some(v) = self.change.remove(&key) {
                other.change.insert(key, v);
            }
        }

        other
    }

    /// Convert to an ordered batch: switch on, switch off, replace blocks,
    /// then change values.
    pub fn to_requests(&self, use_marker: bool) -> Result<Vec<MutationRequest>, PlanError> {
        let mut out = Vec::new();

        for (cmds, turn_on) in [(&self.add, true), (&self.rm, false)] {
            for cmd in cmds {
                out.push(MutationRequest::toggle(
                    [cmd.name.as_str()],
                    turn_on,
                    cmd.selector(use_marker),
                ));
            }
        }

        for (target, values) in &self.replace {
            let cmd = CommandRef::parse(target)?;
            out.push(MutationRequest::replace_joined(
                [(cmd.name.as_str(), values.as_str())],
                cmd.selector(use_marker),
            ));
        }

        if !self.change.is_empty() {
            out.push(MutationRequest::set_values(
                self.change.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                Selector {
                    tag: None,
                    use_marker,
                },
            ));
        }

        Ok(out)
    }
}

/// Render one JSON scalar as a parameter value. Booleans use the solver's
/// `T`/`F` logicals.
pub fn render_value(label: &str, value: &Value) -> Result<String, RewriteError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("T".to_string()),
        Value::Bool(false) => Ok("F".to_string()),
        other => Err(RewriteError::ValueConversion {
            label: label.to_string(),
            reason: format!("{} is not a scalar", json_kind(other)),
        }),
    }
}

fn render_block(label: &str, value: &Value) -> Result<String, RewriteError> {
    match value {
        Value::Array(items) => {
            let rendered = items
                .iter()
                .map(|v| render_value(label, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rendered.join(","))
        }
        scalar => render_value(label, scalar),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
