//! Command-line argument parsing for the `apx-tool` demo binary.
//!
//! Uses `clap`'s derive API the way the teacher's CLI module does: a single
//! `Parser` struct with per-field doc comments clap renders as `--help` text.

use clap::{
    builder::styling::{AnsiColor, Styles},
    Parser,
};
use std::path::PathBuf;

/// Defines the styles for the help message to replicate clap v3's appearance.
fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Yellow.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// apx-tool - Inspect `.apx` node definitions
///
/// Parses a node definition file, runs the finalize pass (type resolution,
/// sequential id assignment, init value derivation), and prints the
/// resulting port layout: names, packed offsets, sizes, and signatures.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None, styles = styles())]
pub struct Args {
    /// Path to the `.apx` node definition file to inspect
    pub path: PathBuf,

    /// Also print each port's derived canonical signature string
    #[arg(short = 's', long)]
    pub signatures: bool,

    /// Print the port layout as JSON instead of the human-readable listing
    #[arg(long)]
    pub json: bool,

    /// Increase diagnostic log verbosity on stderr.
    ///
    /// Can be used multiple times to increase detail:
    ///  -v: debug
    ///  -vv: trace
    /// By default, only INFO and above is shown.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Silence all user-facing informational output on stdout
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }
}
