use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use sia_cli::commands;
use sia_cli::logging::{init_logging, LogConfig, LogFormat};
use std::path::PathBuf;

fn cli() -> Command {
    let section = || {
        Arg::new("section")
            .required(true)
            .help("Section id, e.g. 3.1.4.A.1.2")
    };

    Command::new("sia")
        .version(sia_cli::VERSION)
        .about("Grouped questionnaire store")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("store-dir")
                .long("store-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Storage directory (overrides the config)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
        .subcommand(
            Command::new("get")
                .about("Read a field as a section sees it")
                .arg(section())
                .arg(Arg::new("field").required(true).help("Base field name")),
        )
        .subcommand(
            Command::new("set")
                .about("Write a field from a section")
                .arg(section())
                .arg(Arg::new("field").required(true).help("Base field name"))
                .arg(
                    Arg::new("value")
                        .required(true)
                        .help("JSON value, or plain text"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print the restored field bag of a section")
                .arg(section())
                .arg(
                    Arg::new("structured")
                        .long("structured")
                        .action(ArgAction::SetTrue)
                        .help("Print the structured entry instead"),
                ),
        )
        .subcommand(
            Command::new("merge")
                .about("Overlay a backend dataset onto a section")
                .arg(section())
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON dataset keyed by section id"),
                )
                .arg(
                    Arg::new("fields")
                        .long("fields")
                        .value_delimiter(',')
                        .help("Only these fields (comma separated)"),
                )
                .arg(
                    Arg::new("recompute")
                        .long("recompute")
                        .action(ArgAction::SetTrue)
                        .help("Recompute percentages of merged tables"),
                ),
        )
        .subcommand(Command::new("sections").about("List stored fields per group"))
        .subcommand(Command::new("export").about("Print the whole flat record"))
        .subcommand(Command::new("clear").about("Forget every answer"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name).map_or("", String::as_str)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let format = if matches.get_flag("log-json") {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_logging(&LogConfig::from_verbosity(matches.get_count("verbose")).with_format(format));

    let store = commands::open_store(
        matches.get_one::<PathBuf>("config").map(PathBuf::as_path),
        matches.get_one::<PathBuf>("store-dir").map(PathBuf::as_path),
    )?;

    match matches.subcommand() {
        Some(("get", args)) => {
            print_json(&commands::get(&store, required(args, "section"), required(args, "field")))?;
        }
        Some(("set", args)) => {
            let key = commands::set(
                &store,
                required(args, "section"),
                required(args, "field"),
                required(args, "value"),
            );
            println!("{key}");
        }
        Some(("show", args)) => {
            let fields = commands::show(&store, required(args, "section"), args.get_flag("structured"));
            print_json(&fields)?;
        }
        Some(("merge", args)) => {
            let dataset = args
                .get_one::<PathBuf>("dataset")
                .cloned()
                .unwrap_or_default();
            let fields: Vec<String> = args
                .get_many::<String>("fields")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let report = commands::merge(
                &store,
                required(args, "section"),
                &dataset,
                &fields,
                args.get_flag("recompute"),
            )
            .await?;
            print_json(&report)?;
        }
        Some(("sections", _)) => print_json(&commands::sections(&store))?,
        Some(("export", _)) => print_json(&commands::export(&store))?,
        Some(("clear", _)) => {
            commands::clear(&store);
            println!("cleared");
        }
        _ => {}
    }

    Ok(())
}
