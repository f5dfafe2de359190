//! Where relayed output lines end up besides the console

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    net::TcpStream,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    error::{ConfigError, Error},
    telemetry::{OmlSink, Reporter, TelemetrySink},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Stdout,
    File,
    Oml,
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STDOUT" => Ok(OutputMode::Stdout),
            "FILE" => Ok(OutputMode::File),
            "OML" => Ok(OutputMode::Oml),
            _ => Err(ConfigError::InvalidOutputMode(s.to_owned())),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputMode::Stdout => "STDOUT",
            OutputMode::File => "FILE",
            OutputMode::Oml => "OML",
        })
    }
}

/// Capture file name for a run started at `time`
pub fn capture_file_name(time: &DateTime<Utc>) -> String {
    format!("usrpse-{}.csv", time.format("%Y-%m-%d-%H:%M:%S"))
}

/// Per-line destination. The console copy is written by the supervisor.
pub enum Output<S = OmlSink<BufWriter<TcpStream>>> {
    Stdout,
    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
    Oml(Reporter<S>),
}

impl<S: TelemetrySink> Output<S> {
    /// Create a new timestamped capture file in `dir`
    pub fn create_file(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(capture_file_name(&Utc::now()));
        let writer = BufWriter::new(File::create(&path)?);
        info!("Writing output to {}", path.display());
        Ok(Output::File { path, writer })
    }

    pub fn handle_line(&mut self, line: &str) -> Result<(), Error> {
        match self {
            Output::Stdout => {}
            Output::File { writer, .. } => {
                // The pty turns \n into \r\n
                writeln!(writer, "{}", line.trim_end_matches(['\r', '\n']))?;
            }
            Output::Oml(reporter) => {
                reporter.report(line)?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<(), Error> {
        match self {
            Output::Stdout => {}
            Output::File { path, mut writer } => {
                writer.flush()?;
                info!("Output saved to {}", path.display());
            }
            Output::Oml(reporter) => {
                let (forwarded, skipped) = reporter.counts();
                info!(forwarded, skipped, "Telemetry reporting finished");
            }
        }
        Ok(())
    }
}
