use clap::Command;

use crate::config_arg;

pub const LEN_CMD: &str = "len";

pub fn create_len_cli() -> Command {
    Command::new(LEN_CMD)
        .about("Print the number of samples the dataset yields.")
        .arg(config_arg())
}
