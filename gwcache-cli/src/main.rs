mod build;
mod get;
mod len;

use anyhow::Result;
use clap::{Arg, ArgAction, Command};

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "gwcache";

    pub const CONFIG_ARG: &str = "config";
    pub const VERBOSE_ARG: &str = "verbose";
}

/// The `-c/--config` argument every subcommand takes.
pub fn config_arg() -> Arg {
    Arg::new(consts::CONFIG_ARG)
        .long("config")
        .short('c')
        .required(true)
        .help("Dataset configuration file (.toml, .yaml or .yml)")
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Build and query multi-resolution summary caches of genomic signal tracks.")
        .subcommand_required(true)
        .arg(
            Arg::new(consts::VERBOSE_ARG)
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
        .subcommand(build::cli::create_build_cli())
        .subcommand(len::cli::create_len_cli())
        .subcommand(get::cli::create_get_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    env_logger::Builder::new()
        .filter_level(match matches.get_count(consts::VERBOSE_ARG) {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    match matches.subcommand() {
        //
        // BUILD
        //
        Some((build::cli::BUILD_CMD, matches)) => {
            build::handlers::run_build(matches)?;
        }

        //
        // LEN
        //
        Some((len::cli::LEN_CMD, matches)) => {
            len::handlers::run_len(matches)?;
        }

        //
        // GET
        //
        Some((get::cli::GET_CMD, matches)) => {
            get::handlers::run_get(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
