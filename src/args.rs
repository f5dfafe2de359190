//! Argument parsing for running from the command line

use std::path::PathBuf;

use clap::Parser;

use crate::{
    error::ConfigError,
    output::OutputMode,
    radio::{DetectorMode, RadioConfig, RadioOptions, Standard},
    telemetry::DEFAULT_COLLECT_URI,
    DEFAULT_FFT_SIZE, DEFAULT_GAIN_DB, DEFAULT_THRESHOLD_DB,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "e.g.: usrpse_wrapper --std WLAN_G --args 192.168.60.2 -m MAX")]
pub struct Args {
    /// RF gain in dB
    #[clap(short, long, default_value_t = DEFAULT_GAIN_DB)]
    pub gain: f64,
    /// Samples per buffer. Defaults to 16777216 in COR mode, else 4194304
    #[clap(short, long)]
    pub spb: Option<u64>,
    /// FFT size used in processing
    #[clap(short = 'n', long, default_value_t = DEFAULT_FFT_SIZE)]
    pub fftsize: u32,
    /// USRP IP address, detected from the 192.168.xx.0 subnets when omitted
    #[clap(short, long)]
    pub args: Option<String>,
    /// First channel to measure, required for COR mode and ignored otherwise
    #[clap(short = 'k', long = "first_channel", allow_hyphen_values = true)]
    pub first_channel: Option<i64>,
    /// Detector: COR, AVG, MAX or MIN
    #[clap(short = 'm', long = "detector_mode", default_value = "AVG")]
    pub detector_mode: String,
    /// Wireless standard: WLAN_G, ZIGBEE or BLUETOOTH
    #[clap(short = 'd', long = "std")]
    pub standard: String,
    /// Where to collect data: STDOUT, FILE or OML
    #[clap(short, long, default_value = "STDOUT")]
    pub output: String,
    /// OMF experiment ID, required for OML output
    #[clap(short, long)]
    pub expid: Option<String>,
    /// Channel free threshold in dB for COR mode
    #[clap(long, default_value_t = DEFAULT_THRESHOLD_DB, allow_hyphen_values = true)]
    pub threshold: f64,
    /// Directory holding the usrpse binaries
    #[clap(long = "bin_dir", default_value = ".")]
    pub bin_dir: PathBuf,
    /// OML collection server
    #[clap(long = "oml_collect", default_value = DEFAULT_COLLECT_URI)]
    pub oml_collect: String,
    /// Don't touch the kernel network buffer sizes
    #[clap(long = "no_tune")]
    pub no_tune: bool,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

impl Args {
    /// Validate the radio options and derive the full configuration
    pub fn radio_config(&self) -> Result<RadioConfig, ConfigError> {
        let mode: DetectorMode = self.detector_mode.parse()?;
        let standard: Standard = self.standard.parse()?;
        let opts = RadioOptions {
            gain_db: self.gain,
            fft_size: self.fftsize,
            samples_per_buffer: self.spb,
            first_channel: self.first_channel,
            threshold_db: self.threshold,
        };
        RadioConfig::derive(standard, mode, &opts)
    }

    pub fn output_mode(&self) -> Result<OutputMode, ConfigError> {
        self.output.parse()
    }
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}
