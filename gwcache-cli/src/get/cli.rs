use clap::{Arg, ArgAction, Command, value_parser};

use crate::config_arg;

pub const GET_CMD: &str = "get";

pub fn create_get_cli() -> Command {
    Command::new(GET_CMD)
        .about("Assemble one sample from the built cache and print it.")
        .arg(config_arg())
        .arg(
            Arg::new("index")
                .long("index")
                .short('i')
                .required(true)
                .value_parser(value_parser!(u64))
                .help("Sample index, from 0 to len - 1"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the sample as JSON instead of a table"),
        )
}
