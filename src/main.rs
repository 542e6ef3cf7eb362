use clap::{Arg, ArgAction, ArgMatches, Command, builder::ValueParser, value_parser};

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::time::Instant;

mod address;
mod catalog;
mod config;
mod listing;
mod reconcile;
mod report;
mod title;
mod topology;
mod xef;

use config::{HardwareConfig, OffsetSelection};
use listing::IoListing;
use report::ReportOptions;

// file name of the export, if no input is given on the command line
const DEFAULT_INPUT: &str = "unitpro.xef";

fn main() {
    match core() {
        Ok(()) => {}
        Err(err) => {
            println!("{err}");
            std::process::exit(1);
        }
    }
}

// Implement all the operations supported by remote-io
// For each input file they are always performed in this order:
//  1) load the export
//  2) build the listing: variables, hardware, channel names, comments, title
//  3) check for skipped modules (strict mode)
//  4) write the xlsx report
fn core() -> Result<(), String> {
    let arg_matches = get_args();

    let strict = arg_matches.get_flag("STRICT");
    let verbose = arg_matches.get_flag("VERBOSE");
    let debugprint = arg_matches.get_flag("DEBUGPRINT");

    cond_print(
        verbose,
        &format!("\nremote-io v{}\n\n", env!("CARGO_PKG_VERSION")),
    );

    let offset_selection = if arg_matches.get_flag("NUMERIC_OFFSETS") {
        OffsetSelection::Numeric
    } else {
        OffsetSelection::Lexicographic
    };
    let config = HardwareConfig::default().with_offset_selection(offset_selection);

    let today = chrono::Local::now().date_naive();
    let mut report_options = ReportOptions::new(today);
    if let Some(owner) = arg_matches.get_one::<String>("OWNER") {
        report_options.owner.clone_from(owner);
    }
    if let Some(first_io_slot) = arg_matches.get_one::<u32>("FIRST_IO_SLOT") {
        report_options.first_io_slot = *first_io_slot;
    }

    let mut input_messages = Vec::new();
    let input_files = match arg_matches.get_many::<OsString>("INPUT") {
        Some(patterns) => expand_input_patterns(patterns, &mut input_messages),
        None => vec![default_input_file()],
    };
    for msg in input_messages {
        println!("{msg}");
    }
    if input_files.is_empty() {
        return Err("No input files found".to_string());
    }

    let output_filename = arg_matches.get_one::<OsString>("OUTPUT");
    if output_filename.is_some() && input_files.len() > 1 {
        return Err(format!(
            "--output can only be used with a single input file, but {} were given",
            input_files.len()
        ));
    }

    let mut failed = 0;
    for input_filename in &input_files {
        let result = process_file(
            input_filename,
            output_filename.map(PathBuf::from),
            &config,
            &report_options,
            strict,
            verbose,
            debugprint,
        );
        if let Err(errmsg) = result {
            println!("{errmsg}");
            failed += 1;
        }
    }

    cond_print(verbose, "\nRun complete. Have a nice day!\n\n");

    if failed == 0 {
        Ok(())
    } else {
        Err(format!("{failed} of {} input files could not be processed", input_files.len()))
    }
}

fn process_file(
    input_filename: &OsStr,
    output_filename: Option<PathBuf>,
    config: &HardwareConfig,
    report_options: &ReportOptions,
    strict: bool,
    verbose: bool,
    debugprint: bool,
) -> Result<(), String> {
    // 1) load the export
    let now = Instant::now();
    let xml_text = std::fs::read_to_string(input_filename).map_err(|ioerr| {
        format!(
            "Error: could not read \"{}\": {ioerr}",
            input_filename.to_string_lossy()
        )
    })?;

    // 2) build the listing
    let listing = listing::process_export(&xml_text, config);
    let elapsed = now.elapsed();
    for msg in &listing.log_msgs {
        cond_print(verbose, &format!("{msg}\n"));
    }
    cond_print(
        verbose,
        &format!(
            "Input \"{}\" loaded ({elapsed:?})\n",
            input_filename.to_string_lossy()
        ),
    );
    print_summary(&listing, verbose);
    if debugprint {
        // why not cond_print? in that case the output string must always be
        // formatted before cond_print can decide whether to print it
        println!("================\n{:#?}\n================\n", listing.topology);
    }

    // 3) strict mode: every module must be usable
    let skipped_count = listing.skipped_modules().count();
    if strict && skipped_count > 0 {
        for (position, reason) in listing.skipped_modules() {
            println!("Module {position}: {reason}");
        }
        return Err(format!(
            "Error: {skipped_count} modules in \"{}\" could not be processed (strict mode)",
            input_filename.to_string_lossy()
        ));
    }

    // 4) write the report
    let now = Instant::now();
    let out_path = output_filename.unwrap_or_else(|| {
        PathBuf::from(report::default_output_name(
            &listing.title,
            report_options.revision,
        ))
    });
    let blocks = report::write_report(&listing, report_options, &out_path).map_err(|err| {
        format!(
            "Error: could not write \"{}\": {err}",
            out_path.to_string_lossy()
        )
    })?;
    cond_print(
        verbose,
        &format!(
            "Output written to \"{}\": {blocks} slots ({:?})\n",
            out_path.to_string_lossy(),
            now.elapsed()
        ),
    );

    Ok(())
}

fn print_summary(listing: &IoListing, verbose: bool) {
    cond_print(verbose, &format!("Project: {} ({})\n", listing.title, listing.plc_model));
    cond_print(
        verbose,
        &format!(
            "   modules: {} placed, {} skipped\n",
            listing.module_outcomes.len() - listing.skipped_modules().count(),
            listing.skipped_modules().count()
        ),
    );
    cond_print(
        verbose,
        &format!(
            "   drops: {}, slots: {}, channels: {}\n",
            listing.topology.racks.len(),
            listing.topology.slot_count(),
            listing.topology.channel_count()
        ),
    );
    cond_print(
        verbose,
        &format!(
            "   variables: {}, named by address: {}, named by alias: {}, undeclared DDT instances: {}, comments: {}\n",
            listing.variable_count,
            listing.names.address_matches,
            listing.names.alias_matches,
            listing.names.missing_instances,
            listing.comments_filled
        ),
    );
}

// try to expand each input pattern using glob
// patterns that are not valid unicode or not understood by glob are used as plain file names
fn expand_input_patterns<'a>(
    patterns: impl Iterator<Item = &'a OsString>,
    messages: &mut Vec<String>,
) -> Vec<OsString> {
    let mut input_files = Vec::new();

    for pattern in patterns {
        if let Some(pattern_str) = pattern.to_str() {
            match glob::glob(pattern_str) {
                Ok(glob_iter) => {
                    let expanded = glob_iter
                        .filter_map(Result::ok)
                        .map(OsString::from)
                        .collect::<Vec<_>>();
                    if expanded.is_empty() {
                        // no match: keep the name, so that reading it produces a useful error
                        input_files.push(pattern.clone());
                    } else {
                        input_files.extend(expanded);
                    }
                }
                Err(pattern_error) => {
                    messages.push(format!(
                        "Error expanding glob pattern '{pattern_str}': {pattern_error}"
                    ));
                    input_files.push(pattern.clone());
                }
            }
        } else {
            input_files.push(pattern.clone());
        }
    }

    input_files
}

// the export is expected next to the executable; fall back to the working directory
fn default_input_file() -> OsString {
    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let candidate = exe_dir.join(DEFAULT_INPUT);
        if candidate.is_file() {
            return candidate.into_os_string();
        }
    }
    OsString::from(DEFAULT_INPUT)
}

// set up the entire command line handling.
// fortunately clap makes this painless
fn get_args() -> ArgMatches {
    let args = argfile::expand_args_from(std::env::args_os(), argfile::parse_response, argfile::PREFIX)
        .unwrap_or_else(|_| std::env::args_os().collect());

    build_command().get_matches_from(args)
}

fn build_command() -> Command {
    Command::new("remote-io")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate a remote I/O wiring list from a Unity Pro / Control Expert XEF export.\nArguments can also be read from a response file given as @file.")
        .arg(Arg::new("INPUT")
            .help(format!("Input XEF file(s); glob patterns are expanded.\nDefault: {DEFAULT_INPUT} next to the executable or in the current directory"))
            .num_args(1..)
            .value_parser(ValueParser::os_string())
            .index(1)
        )
        .arg(Arg::new("OUTPUT")
            .help("Set the output filename. Only possible with a single input file.\nDefault: REMOTE_IO_<TITLE>_<DATE>.xlsx in the current directory")
            .short('o')
            .long("output")
            .num_args(1)
            .value_parser(ValueParser::os_string())
            .value_name("XLSXFILE")
        )
        .arg(Arg::new("OWNER")
            .help(format!("Label of the top-left header cell of each slot. Default: {}", report::DEFAULT_OWNER))
            .long("owner")
            .num_args(1)
            .value_name("LABEL")
        )
        .arg(Arg::new("FIRST_IO_SLOT")
            .help(format!("First slot included in the report. Lower slots usually hold power supply and CPU. Default: {}", report::DEFAULT_FIRST_IO_SLOT))
            .long("first-io-slot")
            .num_args(1)
            .value_parser(value_parser!(u32))
            .value_name("SLOT")
        )
        .arg(Arg::new("NUMERIC_OFFSETS")
            .help("Compare the input and output offsets of state RAM modules as numbers instead of text when choosing the base address")
            .long("numeric-offsets")
            .action(ArgAction::SetTrue)
        )
        .arg(Arg::new("STRICT")
            .help("Treat modules that cannot be processed as an error. No report is written for the affected input file.")
            .short('s')
            .long("strict")
            .action(ArgAction::SetTrue)
        )
        .arg(Arg::new("VERBOSE")
            .help("Display additional information")
            .short('v')
            .long("verbose")
            .action(ArgAction::SetTrue)
        )
        .arg(Arg::new("DEBUGPRINT")
            .help("Display internal data for debugging")
            .long("debug-print")
            .action(ArgAction::SetTrue)
        )
}

fn cond_print(cond: bool, text: &str) {
    if cond {
        print!("{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command() {
        build_command().debug_assert();
    }

    #[test]
    fn test_arguments() {
        let matches = build_command()
            .try_get_matches_from([
                "remote-io",
                "plant.xef",
                "-o",
                "out.xlsx",
                "--owner",
                "ACME",
                "--first-io-slot",
                "2",
                "--numeric-offsets",
                "-v",
            ])
            .unwrap();
        let inputs: Vec<&OsString> = matches.get_many::<OsString>("INPUT").unwrap().collect();
        assert_eq!(inputs, vec![&OsString::from("plant.xef")]);
        assert_eq!(
            matches.get_one::<OsString>("OUTPUT"),
            Some(&OsString::from("out.xlsx"))
        );
        assert_eq!(matches.get_one::<String>("OWNER").map(String::as_str), Some("ACME"));
        assert_eq!(matches.get_one::<u32>("FIRST_IO_SLOT"), Some(&2));
        assert!(matches.get_flag("NUMERIC_OFFSETS"));
        assert!(matches.get_flag("VERBOSE"));
        assert!(!matches.get_flag("STRICT"));
    }

    #[test]
    fn test_invalid_first_slot() {
        let result = build_command().try_get_matches_from(["remote-io", "--first-io-slot", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_input_patterns() {
        let tempdir = tempfile::tempdir().unwrap();
        std::fs::write(tempdir.path().join("a.xef"), "<a/>").unwrap();
        std::fs::write(tempdir.path().join("b.xef"), "<b/>").unwrap();
        std::fs::write(tempdir.path().join("c.txt"), "").unwrap();

        let pattern = OsString::from(tempdir.path().join("*.xef"));
        let missing = OsString::from(tempdir.path().join("missing.xef"));
        let mut messages = Vec::new();
        let files = expand_input_patterns([&pattern, &missing].into_iter(), &mut messages);

        assert_eq!(files.len(), 3);
        assert!(files[0].to_string_lossy().ends_with("a.xef"));
        assert!(files[1].to_string_lossy().ends_with("b.xef"));
        assert_eq!(files[2], missing);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_process_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let input = tempdir.path().join("unitpro.xef");
        std::fs::write(
            &input,
            r#"<FEFExchangeFile>
  <contentHeader name="Line3"/>
  <moduleQuantum IOVision="state ram full">
    <partItem partNumber="140DDI84100"/>
    <moduleInfo inputRefOffset="1" outputRefOffset="0"/>
    <equipInfo topoAddress="\2.1\1.4"/>
  </moduleQuantum>
  <moduleQuantum IOVision="state ram full">
    <partItem partNumber="140DDI84100"/>
  </moduleQuantum>
</FEFExchangeFile>"#,
        )
        .unwrap();
        let output = tempdir.path().join("out.xlsx");
        let config = HardwareConfig::default();
        let options = ReportOptions::new(chrono::NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());

        let result = process_file(input.as_os_str(), Some(output.clone()), &config, &options, false, false, false);
        assert!(result.is_ok());
        assert!(output.exists());

        // the second module has no topological address
        let strict_output = tempdir.path().join("strict.xlsx");
        let result = process_file(input.as_os_str(), Some(strict_output.clone()), &config, &options, true, false, false);
        assert!(result.is_err());
        assert!(!strict_output.exists());

        let missing = tempdir.path().join("missing.xef");
        let result = process_file(missing.as_os_str(), Some(output), &config, &options, false, false, false);
        assert!(result.unwrap_err().contains("could not read"));
    }
}
