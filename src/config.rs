// system configuration and command line processing

use crate::messages::DebugLevel;
use argh::FromArgs;
use std::path::PathBuf;

pub const VERSION: &str = "0.1.0";
pub const DEFAULT_CORE_SIZE: usize = crate::kernel::DEFAULT_CORE_SIZE;

/// A small self-hosting Forth interpreter.
#[derive(FromArgs)]
pub struct Cli {
    /// source files to load in order before the interactive loop starts
    #[argh(positional)]
    pub files: Vec<PathBuf>,

    /// diagnostic verbosity: error, warning, info, or debug
    #[argh(option)]
    pub debug_level: Option<String>,

    /// load a previously dumped core image instead of cold-starting
    #[argh(option)]
    pub core: Option<PathBuf>,

    /// request a core dump to forth.core after the session ends, per the
    /// reference CLI's `-d` switch
    #[argh(switch, short = 'd')]
    pub dump: bool,

    /// dump the core image to this path instead of the default forth.core
    #[argh(option)]
    pub dump_to: Option<PathBuf>,

    /// cell count for a freshly cold-started image
    #[argh(option, default = "DEFAULT_CORE_SIZE")]
    pub core_size: usize,
}

pub const DEFAULT_DUMP_PATH: &str = "forth.core";

pub struct Config {
    pub debug_level: DebugLevel,
    pub files: Vec<PathBuf>,
    pub core: Option<PathBuf>,
    pub dump: Option<PathBuf>,
    pub core_size: usize,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Config {
        let debug_level = match cli.debug_level.as_deref() {
            Some("error") => DebugLevel::Error,
            Some("info") => DebugLevel::Info,
            Some("debug") => DebugLevel::Debug,
            _ => DebugLevel::Warning,
        };
        let dump = cli
            .dump_to
            .or_else(|| cli.dump.then(|| PathBuf::from(DEFAULT_DUMP_PATH)));
        Config {
            debug_level,
            files: cli.files,
            core: cli.core,
            dump,
            core_size: cli.core_size,
        }
    }

    /// process_args parses `std::env::args` with `argh`, the CLI crate
    /// this build's manifest actually depends on.
    pub fn process_args() -> Config {
        let cli: Cli = argh::from_env();
        Config::from_cli(cli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cli_defaults_to_warning_level() {
        let cli = Cli {
            files: vec![],
            debug_level: None,
            core: None,
            dump: false,
            dump_to: None,
            core_size: DEFAULT_CORE_SIZE,
        };
        let config = Config::from_cli(cli);
        assert_eq!(config.debug_level, DebugLevel::Warning);
        assert_eq!(config.dump, None);
    }

    #[test]
    fn from_cli_parses_named_level() {
        let cli = Cli {
            files: vec![],
            debug_level: Some("debug".to_string()),
            core: None,
            dump: false,
            dump_to: None,
            core_size: DEFAULT_CORE_SIZE,
        };
        let config = Config::from_cli(cli);
        assert_eq!(config.debug_level, DebugLevel::Debug);
    }

    #[test]
    fn from_cli_dash_d_switch_defaults_to_forth_core() {
        let cli = Cli {
            files: vec![],
            debug_level: None,
            core: None,
            dump: true,
            dump_to: None,
            core_size: DEFAULT_CORE_SIZE,
        };
        let config = Config::from_cli(cli);
        assert_eq!(config.dump, Some(PathBuf::from(DEFAULT_DUMP_PATH)));
    }

    #[test]
    fn from_cli_dump_to_overrides_default_path() {
        let cli = Cli {
            files: vec![],
            debug_level: None,
            core: None,
            dump: true,
            dump_to: Some(PathBuf::from("custom.core")),
            core_size: DEFAULT_CORE_SIZE,
        };
        let config = Config::from_cli(cli);
        assert_eq!(config.dump, Some(PathBuf::from("custom.core")));
    }
}
