//! Builds the command line for the sensing binaries

use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

use crate::radio::{RadioConfig, Tuning};

/// Binary for the fixed frequency (correlation) detector
pub const NONSWEEP_BINARY: &str = "usrpse_nonesweep";
/// Binary for the band sweeping detectors
pub const SWEEP_BINARY: &str = "usrpse_sweeping";

/// A fully resolved call of one of the sensing binaries
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    /// Ordered `(flag, value)` pairs, flags without the leading dashes
    pub args: Vec<(&'static str, String)>,
}

impl Invocation {
    /// Never fails, the config has already been validated by derivation
    pub fn build(config: &RadioConfig, device_addr: &str, bin_dir: &Path) -> Self {
        let mut args = Vec::with_capacity(13);
        let binary = match config.tuning {
            Tuning::Fixed {
                center_freq_hz,
                sample_rate_hz,
                ..
            } => {
                args.push(("freq", center_freq_hz.to_string()));
                args.push(("rate", sample_rate_hz.to_string()));
                NONSWEEP_BINARY
            }
            Tuning::Sweep { .. } => SWEEP_BINARY,
        };
        args.push(("gain", config.gain_db.to_string()));
        args.push(("spb", config.samples_per_buffer.to_string()));
        args.push(("fftsize", config.fft_size.to_string()));
        args.push(("numofchannel", config.num_channels.to_string()));
        args.push(("firstchannel", config.first_channel_freq_hz.to_string()));
        args.push(("channelwidth", config.channel_width_hz.to_string()));
        args.push(("channeloffset", config.channel_offset_hz.to_string()));
        args.push(("args", format!("addr={device_addr}")));
        match config.tuning {
            Tuning::Fixed { threshold_db, .. } => {
                args.push(("mode", config.mode.code().to_string()));
                args.push(("threshold", threshold_db.to_string()));
            }
            Tuning::Sweep {
                sweep_start_freq_hz,
                blocks_per_sweep,
            } => {
                args.push(("bps", blocks_per_sweep.to_string()));
                args.push(("freqbegin", sweep_start_freq_hz.to_string()));
                args.push(("mode", config.mode.code().to_string()));
            }
        }
        Self {
            program: bin_dir.join(binary),
            args,
        }
    }

    /// Flattened argument vector, `--flag value ...`
    pub fn argv(&self) -> Vec<String> {
        self.args
            .iter()
            .flat_map(|(flag, value)| [format!("--{flag}"), value.clone()])
            .collect()
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.argv());
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in self.argv() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::radio::{DetectorMode, RadioOptions, Standard};

    /// Recover a config from the flags, the way the sensing binary sees them
    fn reparse(inv: &Invocation) -> RadioConfig {
        let argv = inv.argv();
        let flags: HashMap<&str, &str> = argv
            .chunks_exact(2)
            .map(|kv| (kv[0].trim_start_matches("--"), kv[1].as_str()))
            .collect();
        let num = |k: &str| flags[k].parse::<u64>().unwrap();
        let standard = match num("channelwidth") {
            20_000_000 => Standard::WlanG,
            4_000_000 => Standard::Zigbee,
            2_000_000 => Standard::Bluetooth,
            w => panic!("unknown channel width {w}"),
        };
        let mode = DetectorMode::from_code(flags["mode"].parse().unwrap()).unwrap();
        let tuning = if flags.contains_key("freq") {
            Tuning::Fixed {
                center_freq_hz: num("freq"),
                sample_rate_hz: num("rate"),
                threshold_db: flags["threshold"].parse().unwrap(),
            }
        } else {
            Tuning::Sweep {
                sweep_start_freq_hz: num("freqbegin"),
                blocks_per_sweep: num("bps") as u32,
            }
        };
        RadioConfig {
            standard,
            mode,
            gain_db: flags["gain"].parse().unwrap(),
            fft_size: num("fftsize") as u32,
            samples_per_buffer: num("spb"),
            channel_width_hz: num("channelwidth"),
            channel_offset_hz: num("channeloffset"),
            num_channels: num("numofchannel") as u32,
            first_channel_freq_hz: num("firstchannel"),
            tuning,
        }
    }

    #[test]
    fn test_round_trip() {
        for std in Standard::ALL {
            for mode in DetectorMode::ALL {
                let opts = RadioOptions {
                    gain_db: 12.5,
                    fft_size: 1024,
                    threshold_db: -71.5,
                    first_channel: Some(*std.first_channel_range().end()),
                    ..Default::default()
                };
                let cfg = RadioConfig::derive(std, mode, &opts).unwrap();
                let inv = Invocation::build(&cfg, "192.168.60.2", Path::new("."));
                assert_eq!(cfg, reparse(&inv), "{std} {mode}");
            }
        }
    }

    #[test]
    fn test_correlation_command() {
        let opts = RadioOptions {
            first_channel: Some(1),
            ..Default::default()
        };
        let cfg = RadioConfig::derive(Standard::WlanG, DetectorMode::Correlation, &opts).unwrap();
        let inv = Invocation::build(&cfg, "192.168.60.2", Path::new("/opt/usrpse"));
        assert_eq!(PathBuf::from("/opt/usrpse/usrpse_nonesweep"), inv.program);
        assert_eq!(
            "/opt/usrpse/usrpse_nonesweep --freq 2412000000 --rate 25000000 --gain 30 \
             --spb 16777216 --fftsize 512 --numofchannel 1 --firstchannel 2412000000 \
             --channelwidth 20000000 --channeloffset 5000000 --args addr=192.168.60.2 \
             --mode 0 --threshold -80",
            inv.to_string()
        );
    }

    #[test]
    fn test_sweep_command() {
        let cfg = RadioConfig::derive(
            Standard::Zigbee,
            DetectorMode::Average,
            &RadioOptions::default(),
        )
        .unwrap();
        let inv = Invocation::build(&cfg, "10.0.0.2", Path::new("."));
        assert_eq!(PathBuf::from("./usrpse_sweeping"), inv.program);
        let argv = inv.argv();
        assert_eq!(22, argv.len());
        assert_eq!(["--bps", "4"], argv[16..18]);
        assert_eq!(["--freqbegin", "2412000000"], argv[18..20]);
        assert_eq!(["--mode", "1"], argv[20..22]);
        assert!(!argv.iter().any(|a| a == "--threshold"));
    }
}
