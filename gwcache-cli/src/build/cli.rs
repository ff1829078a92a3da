use clap::{Arg, ArgAction, Command};

use crate::config_arg;

pub const BUILD_CMD: &str = "build";

pub fn create_build_cli() -> Command {
    Command::new(BUILD_CMD)
        .about("Extract every track into the cache and consolidate the summary tables.")
        .arg(config_arg())
        .arg(
            Arg::new("rebuild")
                .long("rebuild")
                .action(ArgAction::SetTrue)
                .help("Rebuild entries that are already cached"),
        )
}
