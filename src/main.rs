use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use directive_rewriter::engine::split_values;
use directive_rewriter::{
    ApplyReport, MutationPlan, MutationRequest, RewriteConfig, RewriteError, Rewriter, RunList,
    Selector,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Rewrite solver directive files (PARAM.in and friends).
#[derive(Debug, Parser)]
#[command(name = "param-edit", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, default_value = "param-edit.toml")]
    config: PathBuf,

    /// Print the rewritten text instead of writing it.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print a JSON report on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Target {
    /// Only occurrences carrying this tag word.
    #[arg(long)]
    tag: Option<String>,

    /// Only the occurrence marked with `^`.
    #[arg(long)]
    marker: bool,
}

impl Target {
    fn selector(&self) -> Selector {
        Selector {
            tag: self.tag.clone(),
            use_marker: self.marker,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Switch directives on.
    On {
        file: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Switch directives off.
    Off {
        file: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Set single values: KEY=VALUE ...
    Set {
        file: PathBuf,
        #[arg(required = true)]
        pairs: Vec<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Replace parameter blocks: NAME=v1,v2,... ...
    Replace {
        file: PathBuf,
        #[arg(required = true)]
        pairs: Vec<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Apply a JSON mutation plan.
    Apply {
        file: PathBuf,
        #[arg(long)]
        plan: PathBuf,
    },
    /// Show how one run of a run list is classified.
    Plan {
        list: PathBuf,
        #[arg(long)]
        id: u32,
    },
    /// Apply one run of a run list to the directive file (and the
    /// auxiliary solver file, if configured).
    Run {
        list: PathBuf,
        #[arg(long)]
        id: u32,
        #[arg(long, default_value = "PARAM.in")]
        file: PathBuf,
        /// Write the main file here instead of in place.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Auxiliary solver file; overrides the config.
        #[arg(long)]
        aux: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // stdout carries reports and dry-run text
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json {
                let failed = err
                    .downcast_ref::<RewriteError>()
                    .map(|e| e.failed_labels().to_vec())
                    .unwrap_or_default();
                println!(
                    "{}",
                    json!({ "ok": false, "error": format!("{err:#}"), "failed": failed })
                );
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = RewriteConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let out = Output {
        rewriter: Rewriter::new(config),
        dry_run: cli.dry_run,
        json: cli.json,
    };

    match cli.command {
        Command::On {
            file,
            names,
            target,
        } => out.batch(&file, &file, &[MutationRequest::toggle(names, true, target.selector())]),
        Command::Off {
            file,
            names,
            target,
        } => out.batch(&file, &file, &[MutationRequest::toggle(names, false, target.selector())]),
        Command::Set {
            file,
            pairs,
            target,
        } => {
            let values = split_pairs(&pairs)?;
            out.batch(&file, &file, &[MutationRequest::set_values(values, target.selector())])
        }
        Command::Replace {
            file,
            pairs,
            target,
        } => {
            let blocks = split_pairs(&pairs)?
                .into_iter()
                .map(|(name, joined)| (name, split_values(&joined)))
                .collect();
            let request = MutationRequest::Replace {
                blocks,
                selector: target.selector(),
            };
            out.batch(&file, &file, &[request])
        }
        Command::Apply { file, plan } => {
            let text = std::fs::read_to_string(&plan)
                .with_context(|| format!("reading {}", plan.display()))?;
            let plan = MutationPlan::from_json(&text)?;
            let requests = plan.to_requests(out.rewriter.config().use_marker)?;
            out.batch(&file, &file, &requests)
        }
        Command::Plan { list, id } => {
            let runs = RunList::load(&list)?;
            let spec = runs.run(id)?.to_spec()?;
            println!("{}", serde_json::to_string_pretty(&spec)?);
            Ok(())
        }
        Command::Run {
            list,
            id,
            file,
            output,
            aux,
        } => {
            let runs = RunList::load(&list)?;
            let spec = runs.run(id)?.to_spec()?;

            let config = out.rewriter.config();
            let use_marker = config.use_marker;
            let batches = spec.into_batches(config, aux)?;
            let main_requests = batches.main.to_requests(use_marker)?;
            let aux_batch = match batches.aux {
                Some((path, plan)) => Some((path, plan.to_requests(use_marker)?)),
                None => None,
            };

            // Both files must accept their batch before either is written.
            out.check(&file, &main_requests)?;
            if let Some((path, requests)) = &aux_batch {
                out.check(path, requests)?;
            }

            let output = output.unwrap_or_else(|| file.clone());
            out.batch(&file, &output, &main_requests)?;
            if let Some((path, requests)) = aux_batch {
                out.batch(&path, &path, &requests)?;
            }
            Ok(())
        }
    }
}

/// Split `KEY=VALUE` arguments.
fn split_pairs(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|p| match p.split_once('=') {
            Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
            _ => bail!("`{p}` is not of the form KEY=VALUE"),
        })
        .collect()
}

struct Output {
    rewriter: Rewriter,
    dry_run: bool,
    json: bool,
}

impl Output {
    /// Apply a batch in memory only, surfacing any failure without writing.
    fn check(&self, input: &Path, requests: &[MutationRequest]) -> Result<()> {
        if !requests.is_empty() {
            self.rewriter.render(input, requests)?;
        }
        Ok(())
    }

    fn batch(&self, input: &Path, output: &Path, requests: &[MutationRequest]) -> Result<()> {
        if requests.is_empty() {
            tracing::info!(file = %input.display(), "nothing to change");
            return Ok(());
        }

        if self.dry_run {
            let (text, report) = self.rewriter.render(input, requests)?;
            if self.json {
                println!("{}", json!({ "ok": true, "report": report, "text": text }));
            } else {
                print!("{text}");
            }
            return Ok(());
        }

        let report = self.rewriter.rewrite(input, output, requests)?;
        self.print(&report)
    }

    fn print(&self, report: &ApplyReport) -> Result<()> {
        if self.json {
            println!("{}", json!({ "ok": true, "report": report }));
            return Ok(());
        }
        for entry in &report.entries {
            println!("{}: {} line(s)", entry.label, entry.lines);
        }
        println!(
            "wrote {} ({} line(s) changed)",
            report.output.display(),
            report.lines_changed()
        );
        Ok(())
    }
}
