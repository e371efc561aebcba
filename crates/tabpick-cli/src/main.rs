// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;
mod table;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::SubmitRuntime;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use tabpick_app::{PackedLists, PopupId, Session, Table};
use tabpick_http::Requester;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tabpick --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let table = if options.demo {
        tabpick_testkit::demo_table()
    } else {
        let path = options.table_path.as_ref().ok_or_else(|| {
            anyhow!("no table given; pass a CSV file path or --demo (see --help)")
        })?;
        table::load_table(
            path,
            config.delimiter()?,
            config.first_row(),
            config.first_column(),
        )?
    };

    let mut session = Session::from_table(&table, options.next_id, config.session_options());
    if let Some(list) = &options.headers {
        session
            .restore_headers(list)
            .with_context(|| format!("--headers {list:?} does not fit the table"))?;
    }
    if let Some(list) = &options.popups {
        session
            .restore_popups(list)
            .with_context(|| format!("--popups {list:?} does not fit the table"))?;
    }

    let requester = match config.submit_url() {
        Some(_) => Some(Requester::new(config.submit_timeout()?).with_context(|| {
            format!(
                "invalid [submit] config in {}; fix url/method/timeout values",
                options.config_path.display()
            )
        })?),
        None => None,
    };

    if options.check_only {
        let summary = check_summary(&table, &mut session);
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("encode check summary")?
        );
        return Ok(());
    }

    if let Some(path) = config.log_path() {
        logging::start_logging(&path, config.log_level())?;
    }

    let mut runtime = match (requester, config.submit_url()) {
        (Some(requester), Some(url)) => {
            SubmitRuntime::http(requester, url, config.submit_method())
        }
        _ => SubmitRuntime::local(),
    };

    let submitted = tabpick_tui::run_app(
        &mut session,
        table,
        config.render_options(),
        &mut runtime,
    )?;
    if let Some(lists) = submitted {
        print_lists(&lists);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CheckSummary {
    rows: usize,
    columns: usize,
    first_row: usize,
    first_column: usize,
    header_cells: usize,
    popups: usize,
    next_id: Option<PopupId>,
    lists: PackedLists,
}

fn check_summary(table: &Table, session: &mut Session) -> CheckSummary {
    let (lists, _) = session.pack();
    CheckSummary {
        rows: table.rows.len(),
        columns: table.width(),
        first_row: table.first_row,
        first_column: table.first_col,
        header_cells: session.headers().header_cells().count(),
        popups: session.picker().complete_pairs().len(),
        next_id: session.picker().next_id(),
        lists,
    }
}

fn print_lists(lists: &PackedLists) {
    println!("hlist={}", lists.headers);
    println!("plist={}", lists.popups);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    table_path: Option<PathBuf>,
    headers: Option<String>,
    popups: Option<String>,
    next_id: PopupId,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        table_path: None,
        headers: None,
        popups: None,
        next_id: PopupId::FIRST,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--headers" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--headers requires a list such as \"r1c1;r1c2;\""))?;
                options.headers = Some(value.as_ref().to_owned());
            }
            "--popups" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--popups requires a list such as \"a1b3;\""))?;
                options.popups = Some(value.as_ref().to_owned());
            }
            "--next-id" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--next-id requires a positive integer"))?;
                let id = value
                    .as_ref()
                    .parse::<u32>()
                    .ok()
                    .filter(|id| *id > 0)
                    .ok_or_else(|| {
                        anyhow!(
                            "--next-id must be a positive integer, got {:?}",
                            value.as_ref()
                        )
                    })?;
                options.next_id = PopupId::new(id);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown if unknown.starts_with('-') => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
            path => {
                if let Some(previous) = &options.table_path {
                    return Err(anyhow!(
                        "more than one table given ({} and {path}); pass a single CSV file",
                        previous.display()
                    ));
                }
                options.table_path = Some(PathBuf::from(path));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("tabpick [options] <table.csv>");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Edit a built-in sample table");
    println!("  --check                  Load config, table and lists, print a summary, exit");
    println!("  --headers <hlist>        Start with these header cells (r1c1;r1c2;)");
    println!("  --popups <plist>         Start with these popups (a1b3;)");
    println!("  --next-id <n>            First popup id to hand out (default 1)");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, check_summary, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;
    use tabpick_app::{PopupId, Session, SessionOptions};
    use tabpick_testkit::grid_table;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/tabpick-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                table_path: None,
                headers: None,
                popups: None,
                next_id: PopupId::FIRST,
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        for (flag, expected) in [
            ("--config", "--config requires a file path"),
            ("--headers", "--headers requires a list"),
            ("--popups", "--popups requires a list"),
            ("--next-id", "--next-id requires a positive integer"),
        ] {
            let error = parse_cli_args(vec![flag], default_options_path())
                .expect_err("missing value should fail");
            assert!(error.to_string().contains(expected), "{flag}: {error}");
        }
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_takes_table_and_seed_lists() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "report.csv",
                "--headers",
                "r1c1;",
                "--popups",
                "a1b2;",
                "--next-id",
                "4",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.table_path, Some(PathBuf::from("report.csv")));
        assert_eq!(options.headers.as_deref(), Some("r1c1;"));
        assert_eq!(options.popups.as_deref(), Some("a1b2;"));
        assert_eq!(options.next_id, PopupId::new(4));
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_second_table_and_bad_next_id() {
        let error = parse_cli_args(vec!["a.csv", "b.csv"], default_options_path())
            .expect_err("two tables should fail");
        assert!(error.to_string().contains("more than one table"));

        for value in ["0", "-3", "many"] {
            let error = parse_cli_args(vec!["--next-id", value], default_options_path())
                .expect_err("bad next id should fail");
            assert!(error.to_string().contains("positive integer"));
        }
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check", "--demo"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.demo);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn check_summary_reports_restored_lists() -> Result<()> {
        let table = grid_table(3, 4);
        let mut session = Session::from_table(&table, PopupId::new(5), SessionOptions::default());
        session.restore_headers("r1c1;r1c2;")?;
        session.restore_popups("a1b4;")?;

        let summary = check_summary(&table, &mut session);
        assert_eq!((summary.rows, summary.columns), (3, 4));
        assert_eq!(summary.header_cells, 2);
        assert_eq!(summary.popups, 1);
        assert_eq!(summary.next_id, Some(PopupId::new(6)));
        assert_eq!(summary.lists.popups, "a1b4;");

        let json = serde_json::to_value(&summary)?;
        assert_eq!(json["lists"]["headers"], "r1c1;r1c2;");
        assert_eq!(json["next_id"], 6);
        Ok(())
    }

    #[test]
    fn check_summary_reports_exhausted_ids_as_null() -> Result<()> {
        let table = grid_table(1, 2);
        let mut session =
            Session::from_table(&table, PopupId::new(u32::MAX), SessionOptions::default());
        session.restore_popups("a1b2;")?;

        let summary = check_summary(&table, &mut session);
        assert_eq!(summary.next_id, None);
        assert!(serde_json::to_value(&summary)?["next_id"].is_null());
        Ok(())
    }
}
