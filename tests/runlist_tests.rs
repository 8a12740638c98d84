// tests/runlist_tests.rs
// Drives run-list rows through plans into PARAM.in-style files

use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod runlist_tests {
    use super::*;
    use directive_rewriter::{
        Activation, MutationPlan, PlanError, RewriteConfig, RewriteError, Rewriter, RunList,
    };
    use std::path::PathBuf;

    const PARAM_IN: &str = "#STARTTIME
2014\t\t\tiYear
9\t\t\tiMonth
1\t\t\tiDay
0\t\t\tiHour
0\t\t\tiMinute
0\t\t\tiSecond
0.0\t\t\tFracSecond

#POYNTINGFLUX
1.0e6\t\t\tPoyntingFluxPerBSi^ [J/m^2/s/T]

FACTORB0
1.0\t\t\tFactorB0

LOOKUPTABLE FDIPS^
B0\t\t\tNameTable

#HARMONICSFILE
SC/harmonics_adapt.dat\tNameHarmonicsFile

#HARMONICSGRID
1.0\t\t\trMagnetogram

#END END_2nd_scheme^

#END
";

    const HARMONICS_IN: &str = "CHANGEWEAKFIELD
3.0\t\t\tBrFactor^
5.0\t\t\tBrMin

#END
";

    const RUN_LIST: &str = "selected run IDs = 1,3
#START
ID   params
1    map=adapt.fits add=FACTORB0,LOOKUPTABLE(FDIPS) rm=HARMONICSFILE,END(END_2nd_scheme) STARTTIME=[2020,1,1,0,0,0,0.0] PoyntingFluxPerBSi=3.0e5 BrFactor=1.2 add=CHANGEWEAKFIELD
2    NoSuchKey=1
3    add=NOSUCHCOMMAND PoyntingFluxPerBSi=2.0e5
";

    fn command_rewriter(use_marker: bool) -> Rewriter {
        Rewriter::new(RewriteConfig {
            activation: Activation::Command,
            use_marker,
            aux_params: vec!["CHANGEWEAKFIELD".into(), "BrFactor".into(), "BrMin".into()],
            ..RewriteConfig::default()
        })
    }

    #[test]
    fn test_run_applies_to_main_and_aux_files() {
        let dir = TempDir::new().unwrap();
        let param = dir.path().join("PARAM.in");
        let harmonics = dir.path().join("HARMONICS.in");
        fs::write(&param, PARAM_IN).unwrap();
        fs::write(&harmonics, HARMONICS_IN).unwrap();

        let list = RunList::parse(RUN_LIST).unwrap();
        let spec = list.run(1).unwrap().to_spec().unwrap();
        assert_eq!(spec.settings["map"], "adapt.fits");

        let rewriter = command_rewriter(true);
        let mut main_plan = spec.plan;
        let aux_plan = main_plan.split_off(&rewriter.config().aux_params);

        rewriter
            .apply(&param, &main_plan.to_requests(true).unwrap())
            .expect("main file batch");
        rewriter
            .apply(&harmonics, &aux_plan.to_requests(true).unwrap())
            .expect("aux file batch");

        let text = fs::read_to_string(&param).unwrap();
        assert!(text.starts_with("#STARTTIME\n2020\t\t\tiYear\n1\t\t\tiMonth\n1\t\t\tiDay\n"));
        assert!(text.contains("#FACTORB0\n"));
        assert!(text.contains("#LOOKUPTABLE FDIPS^\n"));
        assert!(text.contains("\nHARMONICSFILE\n"));
        assert!(text.contains("\nEND END_2nd_scheme^\n"));
        assert!(text.ends_with("\n#END\n"), "final END untouched");
        assert!(text.contains("3.0e5\tPoyntingFluxPerBSi\n"));

        assert_eq!(
            fs::read_to_string(&harmonics).unwrap(),
            "#CHANGEWEAKFIELD\n1.2\tBrFactor\n5.0\t\t\tBrMin\n\n#END\n"
        );
    }

    #[test]
    fn test_unmatched_run_entry_aborts_only_that_file() {
        let dir = TempDir::new().unwrap();
        let param = dir.path().join("PARAM.in");
        fs::write(&param, PARAM_IN).unwrap();

        let list = RunList::parse(RUN_LIST).unwrap();
        let selected: Vec<u32> = list.selected_runs().map(|r| r.id).collect();
        assert_eq!(selected, vec![1, 3]);

        let plan = list.run(3).unwrap().to_spec().unwrap().plan;
        let err = command_rewriter(false)
            .apply(&param, &plan.to_requests(false).unwrap())
            .unwrap_err();

        match err {
            RewriteError::NotFound { labels, .. } => assert_eq!(labels, vec!["NOSUCHCOMMAND"]),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&param).unwrap(), PARAM_IN);
    }

    #[test]
    fn test_json_plan_round_trip_through_engine() {
        let dir = TempDir::new().unwrap();
        let param = dir.path().join("PARAM.in");
        fs::write(&param, PARAM_IN).unwrap();

        let plan = MutationPlan::from_json(
            r#"{"replace": {"POYNTINGFLUX": 4.0e5}, "rm": ["END(END_2nd_scheme)"]}"#,
        )
        .unwrap();
        let (text, report) = command_rewriter(false)
            .render(&param, &plan.to_requests(false).unwrap())
            .unwrap();

        assert_eq!(report.entries.len(), 2);
        assert!(text.contains("400000.0\t\t\tPoyntingFluxPerBSi^ [J/m^2/s/T]"));
        assert!(text.contains("\nEND END_2nd_scheme^\n"));
        assert_eq!(fs::read_to_string(&param).unwrap(), PARAM_IN);
    }

    #[test]
    fn test_bad_command_reference_in_row() {
        let list = RunList::parse("selected run IDs = 1\n#START\nID\n1 add=END(\n").unwrap();
        let err = list.run(1).unwrap().to_spec().unwrap_err();
        assert!(matches!(err, PlanError::InvalidCommand(_)));
    }

    #[test]
    fn test_run_settings_switch_solver_directives() {
        let dir = TempDir::new().unwrap();
        let param = dir.path().join("PARAM.in");
        fs::write(&param, PARAM_IN).unwrap();

        let list = RunList::parse(
            "selected run IDs = 2\n#START\nID\n\
             2 pfss=FDIPS scheme=5 time=2021-03-04T05:06:07 PoyntingFluxPerBSi=2.0e5\n",
        )
        .unwrap();
        let spec = list.run(2).unwrap().to_spec().unwrap();

        let rewriter = command_rewriter(true);
        let batches = spec.into_batches(rewriter.config(), None).unwrap();
        assert!(batches.aux.is_none());

        let report = rewriter
            .apply(&param, &batches.main.to_requests(true).unwrap())
            .expect("derived entries all match");
        assert!(report.entries.iter().all(|e| e.matched));

        let text = fs::read_to_string(&param).unwrap();
        assert!(text.starts_with("#STARTTIME\n2021\t\t\tiYear\n03\t\t\tiMonth\n"));
        assert!(text.contains("\n04\t\t\tiDay\n05\t\t\tiHour\n"));
        assert!(text.contains("\n#LOOKUPTABLE FDIPS^\n"));
        assert!(text.contains("\nHARMONICSFILE\n"));
        assert!(text.contains("\nHARMONICSGRID\n"));
        assert!(text.contains("\nEND END_2nd_scheme^\n"));
        assert!(text.contains("2.0e5\tPoyntingFluxPerBSi\n"));
        assert!(text.ends_with("\n#END\n"));
    }

    #[test]
    fn test_missing_aux_file_is_caught_before_writing() {
        let dir = TempDir::new().unwrap();
        let param = dir.path().join("PARAM.in");
        fs::write(&param, PARAM_IN).unwrap();

        let list = RunList::parse(
            "selected run IDs = 1\n#START\nID\n1 PoyntingFluxPerBSi=3.0e5 BrFactor=1.2\n",
        )
        .unwrap();
        let spec = list.run(1).unwrap().to_spec().unwrap();
        let rewriter = command_rewriter(false);

        let err = spec
            .clone()
            .into_batches(rewriter.config(), None)
            .unwrap_err();
        assert!(matches!(err, PlanError::MissingAuxFile(1)));
        assert_eq!(fs::read_to_string(&param).unwrap(), PARAM_IN);

        let batches = spec
            .into_batches(rewriter.config(), Some(PathBuf::from("HARMONICS.in")))
            .unwrap();
        assert_eq!(batches.main.change.len(), 1);
        assert!(batches.aux.is_some());
    }
}
