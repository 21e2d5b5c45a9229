//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Swap Node: cross-ledger HTLC swap coordinator
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "swap-node", version)]
#[command(about = "Coordinates HTLC swaps between EVM ledgers and NEAR")]
pub struct Cli {
    /// TOML configuration file (built-in defaults when absent)
    #[arg(short, long, env = "SWAP_NODE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_config_flag_forms() {
        for argv in [
            ["swap-node", "--config", "a.toml"].as_slice(),
            ["swap-node", "--config=a.toml"].as_slice(),
            ["swap-node", "-c", "a.toml"].as_slice(),
        ] {
            let cli = Cli::try_parse_from(argv).unwrap();
            assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
        }
    }

    #[test]
    fn test_config_flag_requires_value() {
        let err = Cli::try_parse_from(["swap-node", "--config"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = Cli::try_parse_from(["swap-node", "--confg", "x.toml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_help_is_displayed() {
        let err = Cli::try_parse_from(["swap-node", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
