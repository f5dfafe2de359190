//! Configures, launches and supervises the USRP sensing engine binaries,
//! republishing their measurement rows as telemetry.

pub mod args;
pub mod command;
pub mod device;
pub mod error;
pub mod output;
pub mod radio;
pub mod schema;
pub mod supervisor;
pub mod telemetry;

pub const DEFAULT_GAIN_DB: f64 = 30.0;
pub const DEFAULT_FFT_SIZE: u32 = 512;
pub const DEFAULT_THRESHOLD_DB: f64 = -80.0;
/// Sample rate of the correlation detector
pub const CORRELATION_SAMPLE_RATE_HZ: u64 = 25_000_000;
/// Default samples per buffer in correlation mode
pub const CORRELATION_SPB: u64 = 16_777_216;
/// A quarter of the correlation buffer, there are 4 blocks per sweep
pub const SWEEP_SPB: u64 = CORRELATION_SPB / BLOCKS_PER_SWEEP as u64;
/// 20 MHz blocks needed to cover the 80 MHz 2.4 GHz ISM band
pub const BLOCKS_PER_SWEEP: u32 = 4;
