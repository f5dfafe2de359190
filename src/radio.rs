//! Parameter derivation
//!
//! Maps a wireless standard, a detector mode and a handful of user options onto
//! the frequency plan the sensing binaries expect. Everything in here is pure.

use std::{fmt, ops::RangeInclusive, str::FromStr};

use crate::{
    error::ConfigError, BLOCKS_PER_SWEEP, CORRELATION_SAMPLE_RATE_HZ, CORRELATION_SPB,
    DEFAULT_FFT_SIZE, DEFAULT_GAIN_DB, DEFAULT_THRESHOLD_DB, SWEEP_SPB,
};

/// The wireless technology whose channel plan we measure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Standard {
    WlanG,
    Zigbee,
    Bluetooth,
}

/// Fixed per-standard channel plan
struct ChannelPlan {
    width_hz: u64,
    offset_hz: u64,
    correlation_channels: u32,
    sweep_channels: u32,
    first_channel: RangeInclusive<i64>,
    sweep_first_channel_hz: u64,
    sweep_start_hz: u64,
}

impl Standard {
    pub const ALL: [Standard; 3] = [Standard::WlanG, Standard::Zigbee, Standard::Bluetooth];

    pub fn name(&self) -> &'static str {
        match self {
            Standard::WlanG => "WLAN_G",
            Standard::Zigbee => "ZIGBEE",
            Standard::Bluetooth => "BLUETOOTH",
        }
    }

    fn plan(&self) -> ChannelPlan {
        match self {
            Standard::WlanG => ChannelPlan {
                width_hz: 20_000_000,
                offset_hz: 5_000_000,
                correlation_channels: 1,
                sweep_channels: 13,
                first_channel: 1..=13,
                sweep_first_channel_hz: 2_412_000_000,
                sweep_start_hz: 2_410_000_000,
            },
            Standard::Zigbee => ChannelPlan {
                width_hz: 4_000_000,
                offset_hz: 5_000_000,
                correlation_channels: 4,
                sweep_channels: 16,
                first_channel: 11..=23,
                sweep_first_channel_hz: 2_405_000_000,
                sweep_start_hz: 2_412_000_000,
            },
            Standard::Bluetooth => ChannelPlan {
                width_hz: 2_000_000,
                offset_hz: 1_000_000,
                correlation_channels: 20,
                sweep_channels: 79,
                first_channel: 1..=61,
                sweep_first_channel_hz: 2_402_000_000,
                sweep_start_hz: 2_410_000_000,
            },
        }
    }

    /// Valid (1-based) first channel indices in correlation mode
    pub fn first_channel_range(&self) -> RangeInclusive<i64> {
        self.plan().first_channel
    }

    /// Returns `(center, first channel)` frequencies in Hz for correlation mode.
    /// `channel` must already be range checked.
    fn correlation_freqs(&self, channel: i64) -> (u64, u64) {
        let offset = self.plan().offset_hz as i64;
        let (center, first) = match self {
            Standard::WlanG => {
                let center = 2_412_000_000 + offset * (channel - 1);
                (center, center)
            }
            // Centered 1.5 channel offsets above the first channel
            Standard::Zigbee => (
                2_400_000_000 + offset * (channel - 10) + offset * 3 / 2,
                2_400_000_000 + offset * (channel - 10),
            ),
            Standard::Bluetooth => (
                2_401_000_000 + offset * (channel + 10),
                2_401_000_000 + offset * channel,
            ),
        };
        (center as u64, first as u64)
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Standard {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WLAN_G" => Ok(Standard::WlanG),
            "ZIGBEE" => Ok(Standard::Zigbee),
            "BLUETOOTH" => Ok(Standard::Bluetooth),
            _ => Err(ConfigError::InvalidStandard(s.to_owned())),
        }
    }
}

/// How the sensing engine treats the band
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetectorMode {
    /// Fixed frequency channel occupancy
    Correlation,
    Average,
    Max,
    Min,
}

impl DetectorMode {
    pub const ALL: [DetectorMode; 4] = [
        DetectorMode::Correlation,
        DetectorMode::Average,
        DetectorMode::Max,
        DetectorMode::Min,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DetectorMode::Correlation => "COR",
            DetectorMode::Average => "AVG",
            DetectorMode::Max => "MAX",
            DetectorMode::Min => "MIN",
        }
    }

    /// Numeric detector code understood by the sensing binaries
    pub fn code(&self) -> u8 {
        match self {
            DetectorMode::Correlation => 0,
            DetectorMode::Average => 1,
            DetectorMode::Max => 2,
            DetectorMode::Min => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    pub fn is_sweeping(&self) -> bool {
        !matches!(self, DetectorMode::Correlation)
    }
}

impl fmt::Display for DetectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ConfigError::InvalidMode(s.to_owned()))
    }
}

/// User tunables that feed into derivation
#[derive(Clone, Debug, PartialEq)]
pub struct RadioOptions {
    pub gain_db: f64,
    pub fft_size: u32,
    /// Overrides the mode-dependent default when set
    pub samples_per_buffer: Option<u64>,
    pub first_channel: Option<i64>,
    pub threshold_db: f64,
}

impl Default for RadioOptions {
    fn default() -> Self {
        Self {
            gain_db: DEFAULT_GAIN_DB,
            fft_size: DEFAULT_FFT_SIZE,
            samples_per_buffer: None,
            first_channel: None,
            threshold_db: DEFAULT_THRESHOLD_DB,
        }
    }
}

/// Frequency parameters, exactly one group per mode class
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tuning {
    Fixed {
        center_freq_hz: u64,
        sample_rate_hz: u64,
        /// Channel free threshold, only the correlation detector has one
        threshold_db: f64,
    },
    Sweep {
        sweep_start_freq_hz: u64,
        blocks_per_sweep: u32,
    },
}

/// Fully derived, internally consistent radio configuration
#[derive(Clone, Debug, PartialEq)]
pub struct RadioConfig {
    pub standard: Standard,
    pub mode: DetectorMode,
    pub gain_db: f64,
    pub fft_size: u32,
    pub samples_per_buffer: u64,
    pub channel_width_hz: u64,
    pub channel_offset_hz: u64,
    pub num_channels: u32,
    pub first_channel_freq_hz: u64,
    pub tuning: Tuning,
}

impl RadioConfig {
    pub fn derive(
        standard: Standard,
        mode: DetectorMode,
        opts: &RadioOptions,
    ) -> Result<Self, ConfigError> {
        let plan = standard.plan();
        let (num_channels, first_channel_freq_hz, tuning, default_spb) = if mode.is_sweeping() {
            (
                plan.sweep_channels,
                plan.sweep_first_channel_hz,
                Tuning::Sweep {
                    sweep_start_freq_hz: plan.sweep_start_hz,
                    blocks_per_sweep: BLOCKS_PER_SWEEP,
                },
                SWEEP_SPB,
            )
        } else {
            let channel = opts.first_channel.ok_or(ConfigError::MissingFirstChannel)?;
            if !plan.first_channel.contains(&channel) {
                return Err(ConfigError::InvalidChannelRange {
                    standard,
                    channel,
                    min: *plan.first_channel.start(),
                    max: *plan.first_channel.end(),
                });
            }
            let (center_freq_hz, first_hz) = standard.correlation_freqs(channel);
            (
                plan.correlation_channels,
                first_hz,
                Tuning::Fixed {
                    center_freq_hz,
                    sample_rate_hz: CORRELATION_SAMPLE_RATE_HZ,
                    threshold_db: opts.threshold_db,
                },
                CORRELATION_SPB,
            )
        };
        Ok(Self {
            standard,
            mode,
            gain_db: opts.gain_db,
            fft_size: opts.fft_size,
            samples_per_buffer: opts.samples_per_buffer.unwrap_or(default_spb),
            channel_width_hz: plan.width_hz,
            channel_offset_hz: plan.offset_hz,
            num_channels,
            first_channel_freq_hz,
            tuning,
        })
    }

    pub fn center_freq_hz(&self) -> Option<u64> {
        match self.tuning {
            Tuning::Fixed { center_freq_hz, .. } => Some(center_freq_hz),
            Tuning::Sweep { .. } => None,
        }
    }

    pub fn sample_rate_hz(&self) -> Option<u64> {
        match self.tuning {
            Tuning::Fixed { sample_rate_hz, .. } => Some(sample_rate_hz),
            Tuning::Sweep { .. } => None,
        }
    }

    pub fn threshold_db(&self) -> Option<f64> {
        match self.tuning {
            Tuning::Fixed { threshold_db, .. } => Some(threshold_db),
            Tuning::Sweep { .. } => None,
        }
    }

    pub fn sweep_start_freq_hz(&self) -> Option<u64> {
        match self.tuning {
            Tuning::Sweep {
                sweep_start_freq_hz,
                ..
            } => Some(sweep_start_freq_hz),
            Tuning::Fixed { .. } => None,
        }
    }

    /// Front end frequency reported with each telemetry row, in MHz.
    /// For sweeps this is the frequency of the first block.
    pub fn freq_mhz(&self) -> i32 {
        let hz = match self.tuning {
            Tuning::Fixed { center_freq_hz, .. } => center_freq_hz,
            Tuning::Sweep {
                sweep_start_freq_hz,
                ..
            } => sweep_start_freq_hz,
        };
        (hz / 1_000_000) as i32
    }
}
