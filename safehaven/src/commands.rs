use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("safehaven")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("safehaven")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-v --"verbose" "Log attribution and accounting details (overrides RUST_LOG)")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("JSON configuration file with thresholds and the list path")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            arg!(-l --"lists" <PATH>)
                .required(false)
                .global(true)
                .help("White/black list file (default: ~/.config/safehaven/SafeHavenList.txt)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .subcommand_required(true)
        .subcommand(
            command!("replay")
                .about(
                    "Replay a recorded navigation trace through the detector and report which \
                requests would be cancelled.",
                )
                .arg(
                    arg!(-t --"trace" <PATH>)
                        .required(true)
                        .help("JSON array of open/close/state events")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"no-report")
                        .required(false)
                        .help("Only print decisions, skip the per-tab lineage report")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(command!("lists").about("Print the parsed whitelist and blacklist"))
}
