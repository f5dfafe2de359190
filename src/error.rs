//! Error types for every stage of the wrapper

use std::io;

use thiserror::Error;

use crate::radio::Standard;

/// Startup errors. All of these are fatal before any child is spawned.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid wireless standard '{0}', please specify with --std (WLAN_G, ZIGBEE, BLUETOOTH)")]
    InvalidStandard(String),

    #[error("invalid detector mode '{0}', please specify with --detector_mode (COR, AVG, MAX, MIN)")]
    InvalidMode(String),

    #[error("missing first channel, please specify with --first_channel")]
    MissingFirstChannel,

    #[error("invalid first channel {channel} for {standard}, must be within [{min},{max}]")]
    InvalidChannelRange {
        standard: Standard,
        channel: i64,
        min: i64,
        max: i64,
    },

    #[error("invalid output mode '{0}', allowed values: STDOUT, FILE, OML")]
    InvalidOutputMode(String),

    #[error(
        "invalid USRP address, please specify with --args or make sure the USRP falls into the pattern 192.168.xx.2"
    )]
    NoDeviceAddress,

    #[error("invalid experiment ID, please specify a whitespace-free value with --expid")]
    InvalidSessionId,

    #[error("invalid OML collect URI '{0}', expected tcp:<host>:<port>")]
    InvalidCollectUri(String),
}

/// Errors from the telemetry sink
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to connect to OML server {uri}: {source}")]
    Connect { uri: String, source: io::Error },

    #[error("telemetry write failed: {0}")]
    Io(#[from] io::Error),

    #[error("record has {actual} values, schema {name} expects {expected}")]
    SchemaMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("no schema registered before inject")]
    Unregistered,
}

/// Errors raised while running the sensing binary
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("failed to allocate a pseudo-terminal: {0}")]
    Pty(nix::Error),

    #[error("failed to spawn {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("error reading child output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to signal child {pid}: {source}")]
    Signal { pid: i32, source: nix::Error },

    #[error("failed to install signal handler: {0}")]
    Handler(#[from] ctrlc::Error),
}

/// Top level error for the binary
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("output file error: {0}")]
    Output(#[from] io::Error),
}
