use super::{parse_commands, CommandRef, MutationPlan};
use crate::config::RewriteConfig;
use crate::error::PlanError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SELECTION_PREFIX: &str = "selected run IDs";
const START_PREFIX: &str = "#START";

/// Widest `a-b` range accepted in a run ID list.
const MAX_RANGE: u32 = 10_000;

/// The `time` value that asks for the magnetogram's own timestamp.
const MAP_TIME: &str = "MapTime";

/// Parameters that configure a run rather than a directive file.
const RUN_SETTINGS: &[&str] = &[
    "map",
    "pfss",
    "time",
    "model",
    "scheme",
    "param",
    "realization",
    "realizations",
    "restartdir",
];

/// One row of a run list: an ID and its raw `key=value` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEntry {
    pub id: u32,
    pub params: Vec<String>,
}

/// A parsed run list: which runs are selected and every run row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunList {
    pub selected: Vec<u32>,
    pub runs: Vec<RunEntry>,
}

/// A run row split into run settings and the directive-file plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSpec {
    pub id: u32,
    /// Lower-cased setting name to value (`map`, `pfss`, `time`, ...).
    pub settings: BTreeMap<String, String>,
    pub plan: MutationPlan,
}

/// The batches one run applies: the main directive file and, when any entry
/// is routed there, the auxiliary solver file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunBatches {
    pub main: MutationPlan,
    pub aux: Option<(PathBuf, MutationPlan)>,
}

/// Parse `1,3-5,8` into `[1, 3, 4, 5, 8]`.
pub fn parse_run_ids(list: &str) -> Result<Vec<u32>, PlanError> {
    let bad = || PlanError::InvalidRunIds(list.trim().to_string());
    let mut ids = Vec::new();

    for piece in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Ok(id) = piece.parse::<u32>() {
            ids.push(id);
            continue;
        }
        let (lo, hi) = piece.split_once('-').ok_or_else(bad)?;
        let lo: u32 = lo.trim().parse().map_err(|_| bad())?;
        let hi: u32 = hi.trim().parse().map_err(|_| bad())?;
        if lo > hi {
            return Err(bad());
        }
        if hi - lo >= MAX_RANGE {
            return Err(PlanError::RangeTooLarge(piece.to_string(), MAX_RANGE));
        }
        ids.extend(lo..=hi);
    }

    Ok(ids)
}

impl RunList {
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a run list.
    ///
    /// The `selected run IDs = ...` line picks runs. Rows begin two lines
    /// after `#START` (the line in between is a column header); each row is
    /// split shell-style and starts with an integer run ID.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let lines: Vec<&str> = text.lines().collect();

        let mut selection = None;
        let mut start = None;
        for (i, line) in lines.iter().enumerate() {
            if line.starts_with(SELECTION_PREFIX) {
                selection = Some(*line);
            }
            if line.starts_with(START_PREFIX) {
                start = Some(i + 2);
                break;
            }
        }

        let selection = selection.ok_or(PlanError::MissingSelection)?;
        let start = start.ok_or(PlanError::MissingStart)?;

        let ids_text = selection
            .split_once('=')
            .map(|(_, rest)| rest)
            .ok_or_else(|| PlanError::InvalidRunIds(selection.to_string()))?;
        let selected = parse_run_ids(ids_text)?;

        let mut runs = Vec::new();
        for (i, line) in lines.iter().enumerate().skip(start) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = shlex::split(line).ok_or_else(|| PlanError::InvalidRow {
                line: i + 1,
                reason: "unbalanced quotes".to_string(),
            })?;
            if tokens.is_empty() {
                continue;
            }
            let id = tokens[0].parse::<u32>().map_err(|_| PlanError::InvalidRow {
                line: i + 1,
                reason: format!("run ID `{}` is not an integer", tokens[0]),
            })?;
            tokens.remove(0);
            runs.push(RunEntry { id, params: tokens });
        }

        tracing::debug!(selected = selected.len(), rows = runs.len(), "parsed run list");
        Ok(Self { selected, runs })
    }

    /// Rows whose ID is selected, in file order.
    pub fn selected_runs(&self) -> impl Iterator<Item = &RunEntry> {
        self.runs.iter().filter(|r| self.selected.contains(&r.id))
    }

    pub fn run(&self, id: u32) -> Result<&RunEntry, PlanError> {
        self.runs
            .iter()
            .find(|r| r.id == id)
            .ok_or(PlanError::UnknownRun(id))
    }
}

impl RunEntry {
    /// Classify each parameter: run settings, `add`/`rm` command lists,
    /// `[...]` block replacements, and plain value changes.
    pub fn to_spec(&self) -> Result<RunSpec, PlanError> {
        let mut spec = RunSpec {
            id: self.id,
            ..RunSpec::default()
        };

        for param in &self.params {
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| PlanError::InvalidParam(param.clone()))?;
            if key.is_empty() {
                return Err(PlanError::InvalidParam(param.clone()));
            }

            let lower = key.to_lowercase();
            if RUN_SETTINGS.contains(&lower.as_str()) {
                spec.settings.insert(lower, value.to_string());
            } else if key == "add" {
                spec.plan.add.extend(parse_commands(value)?);
            } else if key == "rm" {
                spec.plan.rm.extend(parse_commands(value)?);
            } else if let Some(inner) = value
                .strip_prefix('[')
                .and_then(|v| v.strip_suffix(']'))
            {
                spec.plan.replace.insert(key.to_string(), inner.to_string());
            } else {
                spec.plan.change.insert(key.to_string(), value.to_string());
            }
        }

        spec.derive_from_settings()?;
        Ok(spec)
    }
}

fn invalid_setting(name: &str, value: &str, reason: &str) -> PlanError {
    PlanError::InvalidSetting {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// `2020-01-01T06:30:00` as `#STARTTIME` block values, with the fractional
/// second appended.
fn start_time_values(time: &str) -> Option<String> {
    let pieces: Vec<&str> = time.split(['-', 'T', ':']).collect();
    let numeric = pieces
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    (pieces.len() == 6 && numeric).then(|| format!("{},0.0", pieces.join(",")))
}

impl RunSpec {
    /// Turn the settings that change the directive file into plan entries:
    ///
    /// - `pfss=FDIPS` switches on `LOOKUPTABLE(FDIPS)` and switches off
    ///   `HARMONICSFILE` and `HARMONICSGRID`; `HARMONICS` is the template
    ///   default and changes nothing.
    /// - `scheme=5` switches off `END(END_2nd_scheme)`; `scheme=2` changes
    ///   nothing.
    /// - `time=YYYY-MM-DDTHH:MM:SS` replaces the `STARTTIME` block, unless the
    ///   run restarts from `restartdir`.
    ///
    /// The remaining settings pick maps, templates and realizations for the
    /// job and never touch a directive file.
    fn derive_from_settings(&mut self) -> Result<(), PlanError> {
        if let Some(pfss) = self.settings.get("pfss") {
            match pfss.to_ascii_uppercase().as_str() {
                "FDIPS" => {
                    push_unique(&mut self.plan.add, command("LOOKUPTABLE", Some("FDIPS")));
                    push_unique(&mut self.plan.rm, command("HARMONICSFILE", None));
                    push_unique(&mut self.plan.rm, command("HARMONICSGRID", None));
                }
                "HARMONICS" => {}
                _ => return Err(invalid_setting("pfss", pfss, "expected FDIPS or HARMONICS")),
            }
        }

        if let Some(scheme) = self.settings.get("scheme") {
            match scheme.trim().parse::<u32>() {
                Ok(2) => {}
                Ok(5) => {
                    push_unique(&mut self.plan.rm, command("END", Some("END_2nd_scheme")));
                }
                _ => return Err(invalid_setting("scheme", scheme, "expected 2 or 5")),
            }
        }

        if let Some(time) = self.settings.get("time") {
            if self.settings.contains_key("restartdir") {
                tracing::debug!(run = self.id, "restart run keeps its STARTTIME");
            } else if time.eq_ignore_ascii_case(MAP_TIME) {
                return Err(invalid_setting(
                    "time",
                    time,
                    "the magnetogram time cannot be read here; give YYYY-MM-DDTHH:MM:SS",
                ));
            } else {
                let values = start_time_values(time).ok_or_else(|| {
                    invalid_setting("time", time, "expected YYYY-MM-DDTHH:MM:SS")
                })?;
                self.plan.replace.insert("STARTTIME".to_string(), values);
            }
        }

        Ok(())
    }

    /// Auxiliary solver file named by the run's `pfss` setting.
    pub fn pfss_file(&self) -> Option<PathBuf> {
        self.settings
            .get("pfss")
            .map(|pfss| PathBuf::from(format!("{}.in", pfss.to_ascii_uppercase())))
    }

    /// Split the plan between the main and auxiliary files.
    ///
    /// The auxiliary file is `aux_override`, else the run's `pfss` file, else
    /// the configured one. Fails before anything is written when entries are
    /// routed to the auxiliary file but none is known.
    pub fn into_batches(
        self,
        config: &RewriteConfig,
        aux_override: Option<PathBuf>,
    ) -> Result<RunBatches, PlanError> {
        let aux_file = aux_override
            .or_else(|| self.pfss_file())
            .or_else(|| config.aux_file.clone());

        let mut main = self.plan;
        let aux_plan = main.split_off(&config.aux_params);
        if aux_plan.is_empty() {
            return Ok(RunBatches { main, aux: None });
        }

        let aux_file = aux_file.ok_or(PlanError::MissingAuxFile(self.id))?;
        Ok(RunBatches {
            main,
            aux: Some((aux_file, aux_plan)),
        })
    }
}

fn command(name: &str, tag: Option<&str>) -> CommandRef {
    CommandRef {
        name: name.to_string(),
        tag: tag.map(str::to_string),
    }
}

fn push_unique(list: &mut Vec<CommandRef>, cmd: CommandRef) {
    if !list.contains(&cmd) {
        list.push(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
selected run IDs = 1-2,4
#START
ID   params
1    map=adapt.fits BrFactor=1.2 add=FACTORB0 rm=END(END_2nd_scheme)
2    model=AWSoMR STARTTIME=[2020,1,1,0,0,0,0.0] 'Label=two words'

4    PFSS=FDIPS add=LOOKUPTABLE(FDIPS),CHANGEWEAKFIELD
5    BrMin=5.0
";

    #[test]
    fn run_id_ranges() {
        assert_eq!(parse_run_ids("1, 3-5,8\n").unwrap(), vec![1, 3, 4, 5, 8]);
        assert!(parse_run_ids("1,a").is_err());
        assert!(parse_run_ids("5-3").is_err());
        assert_eq!(parse_run_ids("1-10000").unwrap().len(), 10_000);
        assert!(matches!(
            parse_run_ids("1-4000000000"),
            Err(PlanError::RangeTooLarge(_, MAX_RANGE))
        ));
    }

    #[test]
    fn parses_rows_after_header() {
        let list = RunList::parse(LIST).unwrap();
        assert_eq!(list.selected, vec![1, 2, 4]);
        assert_eq!(list.runs.len(), 4);
        let ids: Vec<u32> = list.selected_runs().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(list.run(2).unwrap().params[2], "Label=two words");
        assert!(matches!(list.run(9), Err(PlanError::UnknownRun(9))));
    }

    #[test]
    fn params_are_classified() {
        let list = RunList::parse(LIST).unwrap();

        let one = list.run(1).unwrap().to_spec().unwrap();
        assert_eq!(one.settings["map"], "adapt.fits");
        assert_eq!(one.plan.change["BrFactor"], "1.2");
        assert_eq!(one.plan.add[0].name, "FACTORB0");
        assert_eq!(one.plan.rm[0].tag.as_deref(), Some("END_2nd_scheme"));

        let two = list.run(2).unwrap().to_spec().unwrap();
        assert_eq!(two.settings["model"], "AWSoMR");
        assert_eq!(two.plan.replace["STARTTIME"], "2020,1,1,0,0,0,0.0");
        assert_eq!(two.plan.change["Label"], "two words");

        let four = list.run(4).unwrap().to_spec().unwrap();
        assert_eq!(four.settings["pfss"], "FDIPS");
        assert_eq!(four.plan.add.len(), 2, "LOOKUPTABLE(FDIPS) is not added twice");
    }

    fn entry(params: &[&str]) -> RunEntry {
        RunEntry {
            id: 7,
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn fdips_switches_lookup_table_and_harmonics() {
        let spec = entry(&["pfss=FDIPS"]).to_spec().unwrap();
        let added: Vec<String> = spec.plan.add.iter().map(|c| c.to_string()).collect();
        let removed: Vec<String> = spec.plan.rm.iter().map(|c| c.to_string()).collect();
        assert_eq!(added, vec!["LOOKUPTABLE(FDIPS)"]);
        assert_eq!(removed, vec!["HARMONICSFILE", "HARMONICSGRID"]);
        assert_eq!(spec.pfss_file(), Some(PathBuf::from("FDIPS.in")));

        let spec = entry(&["pfss=HARMONICS"]).to_spec().unwrap();
        assert!(spec.plan.is_empty());
        assert_eq!(spec.pfss_file(), Some(PathBuf::from("HARMONICS.in")));
    }

    #[test]
    fn fifth_order_scheme_drops_second_order_end() {
        let spec = entry(&["scheme=5", "rm=FACTORB0"]).to_spec().unwrap();
        let removed: Vec<String> = spec.plan.rm.iter().map(|c| c.to_string()).collect();
        assert_eq!(removed, vec!["FACTORB0", "END(END_2nd_scheme)"]);

        assert!(entry(&["scheme=2"]).to_spec().unwrap().plan.is_empty());
    }

    #[test]
    fn time_becomes_start_time_block() {
        let spec = entry(&["time=2021-03-04T05:06:07"]).to_spec().unwrap();
        assert_eq!(spec.plan.replace["STARTTIME"], "2021,03,04,05,06,07,0.0");

        let restart = entry(&["time=2021-03-04T05:06:07", "restartdir=run01"])
            .to_spec()
            .unwrap();
        assert!(restart.plan.replace.is_empty());
    }

    #[test]
    fn unusable_settings_are_rejected() {
        for params in [
            &["pfss=PFSSPY"][..],
            &["scheme=3"][..],
            &["time=MapTime"][..],
            &["time=2021-03-04"][..],
        ] {
            let err = entry(params).to_spec().unwrap_err();
            assert!(matches!(err, PlanError::InvalidSetting { .. }), "{params:?}");
        }
    }

    #[test]
    fn aux_entries_need_an_aux_file() {
        let config = RewriteConfig {
            aux_params: vec!["BrFactor".to_string()],
            ..RewriteConfig::default()
        };

        let spec = entry(&["BrFactor=1.2", "BrMin=5.0"]).to_spec().unwrap();
        assert!(matches!(
            spec.clone().into_batches(&config, None),
            Err(PlanError::MissingAuxFile(7))
        ));

        let batches = spec.into_batches(&config, Some("HARMONICS.in".into())).unwrap();
        assert_eq!(batches.main.change.len(), 1);
        let (path, aux) = batches.aux.unwrap();
        assert_eq!(path, PathBuf::from("HARMONICS.in"));
        assert_eq!(aux.change["BrFactor"], "1.2");

        let spec = entry(&["pfss=FDIPS", "BrFactor=1.2"]).to_spec().unwrap();
        let (path, _) = spec.into_batches(&config, None).unwrap().aux.unwrap();
        assert_eq!(path, PathBuf::from("FDIPS.in"));
    }

    #[test]
    fn missing_markers_are_errors() {
        assert!(matches!(RunList::parse("#START\n"), Err(PlanError::MissingSelection)));
        assert!(matches!(
            RunList::parse("selected run IDs = 1\n"),
            Err(PlanError::MissingStart)
        ));
    }

    #[test]
    fn param_without_equals_is_rejected() {
        let entry = RunEntry {
            id: 1,
            params: vec!["BrFactor".to_string()],
        };
        assert!(matches!(entry.to_spec(), Err(PlanError::InvalidParam(_))));
    }
}
