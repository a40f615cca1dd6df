use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitecrawl")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitecrawl")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress progress output and warnings").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site breadth-first from a seed URL and print every accepted \
                page as it arrives.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The seed URL to crawl")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed URLs, crawled one after another")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("JSON crawler config; flags given on the command line take precedence")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum link depth from the seed [default: 2]")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-t --"concurrency" <NUM>)
                        .required(false)
                        .help("Number of pages fetched per batch [default: 3]")
                        .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds [default: 60]")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    arg!(-p --"prefix" <PREFIX>)
                        .required(false)
                        .help("Only follow URLs starting with this prefix (default: derived from the seed)"),
                )
                .arg(
                    arg!(-F --"filter" <REGEX>)
                        .required(false)
                        .help("Only follow URLs matching this regular expression"),
                )
                .arg(
                    arg!(-l --"limit" <NUM>)
                        .required(false)
                        .help("Stop after this many pages; -1 for no limit [default: -1]")
                        .value_parser(clap::value_parser!(i64))
                        .allow_negative_numbers(true),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, markdown, json")
                        .value_parser(["text", "markdown", "md", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"truncate" <CHARS>)
                        .required(false)
                        .help("Truncate text and markdown page content to this many characters; 0 prints everything")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("200"),
                )
                .arg(
                    arg!(--"skip-url")
                        .required(false)
                        .help("Leave the page URL out of text and markdown output")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
