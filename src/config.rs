use clap::Parser;

pub const DEFAULT_ITERATIONS: u64 = 50_000_000;
pub const DEFAULT_WARM_UP_ROUNDS: u32 = 3;
pub const DEFAULT_MEASURED_ROUNDS: u32 = 5;

/// Measure the per-operation cost of incrementing a counter with no lock,
/// a monitor lock and an explicit lock
#[derive(Parser, Copy, Clone, Debug, PartialEq, Eq)]
#[command(about, disable_help_flag = true, disable_version_flag = true)]
pub struct Config {
    /// Counter increments per round
    #[arg(default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u64,

    /// Untimed rounds of every strategy before measuring
    #[arg(default_value_t = DEFAULT_WARM_UP_ROUNDS)]
    pub warm_up_rounds: u32,

    /// Timed rounds per strategy; the fastest one is reported
    #[arg(default_value_t = DEFAULT_MEASURED_ROUNDS)]
    pub measured_rounds: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            warm_up_rounds: DEFAULT_WARM_UP_ROUNDS,
            measured_rounds: DEFAULT_MEASURED_ROUNDS,
        }
    }
}

#[test]
fn test_defaults_without_arguments() {
    let config = Config::try_parse_from(["lock-overhead"]).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.iterations, 50_000_000);
    assert_eq!(config.warm_up_rounds, 3);
    assert_eq!(config.measured_rounds, 5);
}

#[test]
fn test_partial_arguments() {
    let config = Config::try_parse_from(["lock-overhead", "1000", "1"]).unwrap();
    assert_eq!(config.iterations, 1000);
    assert_eq!(config.warm_up_rounds, 1);
    assert_eq!(config.measured_rounds, DEFAULT_MEASURED_ROUNDS);
}

#[test]
fn test_rejects_malformed_numbers() {
    assert!(Config::try_parse_from(["lock-overhead", "abc"]).is_err());
    assert!(Config::try_parse_from(["lock-overhead", "10", "1.5"]).is_err());
    assert!(Config::try_parse_from(["lock-overhead", "10", "1", "x"]).is_err());
    assert!(Config::try_parse_from(["lock-overhead", "1", "2", "3", "4"]).is_err());
}

#[test]
fn test_zero_rounds_are_valid() {
    let config = Config::try_parse_from(["lock-overhead", "0", "0", "0"]).unwrap();
    assert_eq!(config.iterations, 0);
    assert_eq!(config.warm_up_rounds, 0);
    assert_eq!(config.measured_rounds, 0);
}

#[test]
fn test_no_flags_accepted() {
    for flag in ["-h", "--help", "-V", "--version"] {
        let err = Config::try_parse_from(["lock-overhead", flag]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument, "{flag}");
    }
}
