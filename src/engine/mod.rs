//! The directive-rewriting engine: applies a batch of mutation requests to
//! one file and writes the result only if every request took effect.

mod ops;
mod request;
mod tracker;

pub use ops::ReplaceOutcome;
pub use request::{entry_label, split_values, MutationRequest};
pub use tracker::{ApplyReport, ApplyTracker, EntryOutcome};

use crate::config::RewriteConfig;
use crate::error::{Result, RewriteError};
use crate::parser::{is_word, join_lines, Line, Selector};
use crate::store;
use std::path::Path;

/// Applies mutation batches under one configuration.
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    config: RewriteConfig,
}

impl Rewriter {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite `path` in place.
    pub fn apply(&self, path: &Path, requests: &[MutationRequest]) -> Result<ApplyReport> {
        self.rewrite(path, path, requests)
    }

    /// Read `input`, apply the batch, and write the result to `output`.
    ///
    /// On any failure nothing is written and `output` keeps its old content.
    pub fn rewrite(
        &self,
        input: &Path,
        output: &Path,
        requests: &[MutationRequest],
    ) -> Result<ApplyReport> {
        let mut lines = store::load(input)?;
        let tracker = self.transform(input, &mut lines, requests)?;
        store::save(output, &lines)?;

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            entries = tracker.entries().len(),
            "directive file rewritten"
        );
        Ok(tracker.into_report(output.to_path_buf(), true))
    }

    /// Apply the batch to `input` in memory and return the new contents
    /// without writing anything.
    pub fn render(
        &self,
        input: &Path,
        requests: &[MutationRequest],
    ) -> Result<(String, ApplyReport)> {
        let mut lines = store::load(input)?;
        let tracker = self.transform(input, &mut lines, requests)?;
        Ok((
            join_lines(&lines),
            tracker.into_report(input.to_path_buf(), false),
        ))
    }

    /// Apply every request to the buffer, failing if any entry matched nothing.
    pub fn transform(
        &self,
        path: &Path,
        lines: &mut Vec<Line>,
        requests: &[MutationRequest],
    ) -> Result<ApplyTracker> {
        requests.iter().try_for_each(check_request)?;

        let mut tracker = ApplyTracker::new();
        for request in requests {
            self.apply_one(lines, request, &mut tracker);
        }

        if !tracker.all_matched() {
            let labels = tracker.failures();
            tracing::warn!(
                path = %path.display(),
                failed = %labels.join(", "),
                "batch aborted, nothing written"
            );
            return Err(RewriteError::NotFound {
                path: path.to_path_buf(),
                labels,
            });
        }
        Ok(tracker)
    }

    fn apply_one(
        &self,
        lines: &mut Vec<Line>,
        request: &MutationRequest,
        tracker: &mut ApplyTracker,
    ) {
        let activation = self.config.activation;

        match request {
            MutationRequest::Toggle {
                names,
                turn_on,
                selector,
            } => {
                for name in names {
                    let n = ops::toggle(lines, name, *turn_on, selector, activation);
                    tracker.record(entry_label(name, selector), n);
                }
            }
            MutationRequest::SetValue { values, selector } => {
                for (key, value) in values {
                    let n = ops::set_value(lines, key, value, selector, &self.config.separator);
                    tracker.record(entry_label(key, selector), n);
                }
            }
            MutationRequest::Replace { blocks, selector } => {
                for (name, values) in blocks {
                    let label = entry_label(name, selector);
                    match ops::replace(lines, name, values, selector, activation) {
                        ReplaceOutcome::Rewritten { blocks, lines: n } => {
                            tracker.record_lines(label, blocks, n)
                        }
                        ReplaceOutcome::Ambiguous(n) => {
                            tracing::debug!(
                                %label,
                                occurrences = n,
                                "marker matched more than one directive"
                            );
                            tracker.reject(label, n);
                        }
                    }
                }
            }
        }
    }
}

/// Reject names, tags and values that cannot be matched or written.
fn check_request(request: &MutationRequest) -> Result<()> {
    if let Some(tag) = &request.selector().tag {
        check_word(tag)?;
    }
    match request {
        MutationRequest::Toggle { names, .. } => names.iter().try_for_each(|n| check_name(n)),
        MutationRequest::SetValue { values, .. } => values.iter().try_for_each(|(key, value)| {
            check_word(key)?;
            check_value(key, value)
        }),
        MutationRequest::Replace { blocks, .. } => blocks.iter().try_for_each(|(name, values)| {
            check_name(name)?;
            values.iter().try_for_each(|value| check_value(name, value))
        }),
    }
}

fn invalid_name(name: &str, reason: &str) -> RewriteError {
    RewriteError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Directive names are compared against a whole leading token.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(invalid_name(name, "a directive name is one non-empty token"));
    }
    Ok(())
}

/// Keys and tags are found as words: letters, digits and underscores only.
fn check_word(word: &str) -> Result<()> {
    if !is_word(word) {
        return Err(invalid_name(
            word,
            "keys and tags may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

fn check_value(label: &str, value: &str) -> Result<()> {
    let reason = if value.trim().is_empty() {
        "value is empty"
    } else if value.contains(['\n', '\r']) {
        "value contains a line break"
    } else {
        return Ok(());
    };
    Err(RewriteError::ValueConversion {
        label: label.to_string(),
        reason: reason.to_string(),
    })
}

/// Switch each of `names` on or off in `path`.
pub fn toggle<I, S>(names: I, turn_on: bool, path: &Path, selector: Selector) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let request = MutationRequest::toggle(names, turn_on, selector);
    Rewriter::default().apply(path, &[request]).map(|_| ())
}

/// Rewrite the line of each key in `path` as `value<tab>key`.
pub fn set_values<I, K, V>(values: I, path: &Path, selector: Selector) -> Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let request = MutationRequest::set_values(values, selector);
    Rewriter::default().apply(path, &[request]).map(|_| ())
}

/// Replace the parameter block of each directive with comma-joined values.
pub fn replace_blocks<I, K, V>(blocks: I, path: &Path, selector: Selector) -> Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    let request = MutationRequest::replace_joined(blocks, selector);
    Rewriter::default().apply(path, &[request]).map(|_| ())
}
