//! Telemetry row layout and decoding of the sensing binaries' output lines

use std::fmt;

use tracing::trace;

use crate::radio::{DetectorMode, RadioConfig};

/// Index of the first metric value in a comma separated output line
const FIRST_VALUE_FIELD: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Int32,
    Double,
}

impl FieldType {
    /// Type name as used in an OML schema declaration
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::Double => "double",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

/// Column layout of one measurement record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetrySchema {
    /// Record type name, e.g. `wlan_g_cor`
    pub name: String,
    pub fields: Vec<Field>,
}

impl TelemetrySchema {
    pub fn new(config: &RadioConfig) -> Self {
        let prefix = match config.mode {
            DetectorMode::Correlation => "cor",
            _ => "psd",
        };
        let mut fields = Vec::with_capacity(2 + config.num_channels as usize);
        fields.push(Field {
            name: "nodeId".to_owned(),
            ty: FieldType::Int32,
        });
        fields.push(Field {
            name: "freqMHz".to_owned(),
            ty: FieldType::Int32,
        });
        fields.extend((1..=config.num_channels).map(|i| Field {
            name: format!("{prefix}{i}"),
            ty: FieldType::Double,
        }));
        Self {
            name: format!("{}_{}", config.standard, config.mode).to_lowercase(),
            fields,
        }
    }

    /// Number of per-channel values in each record
    pub fn num_values(&self) -> usize {
        self.fields.len() - 2
    }
}

/// One decoded output line
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryRecord {
    /// Passed through as-is, the binaries print whatever identifies the node
    pub node_id: String,
    pub freq_mhz: i32,
    pub values: Vec<f64>,
}

/// Turns output lines into [`TelemetryRecord`]s
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowDecoder {
    freq_mhz: i32,
    num_channels: usize,
}

/// Finite measurement value, `nan` and `inf` are not measurements
fn parse_value(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl RowDecoder {
    pub fn new(config: &RadioConfig) -> Self {
        Self {
            freq_mhz: config.freq_mhz(),
            num_channels: config.num_channels as usize,
        }
    }

    /// Cheap check whether a line looks like a measurement row at all.
    /// Status and log lines from the binaries fail this.
    pub fn is_candidate(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();
        fields.len() >= 3
            && fields
                .get(FIRST_VALUE_FIELD)
                .and_then(|f| parse_value(f))
                .is_some()
    }

    /// Decodes a line, or `None` if it should be skipped
    pub fn decode(&self, line: &str) -> Option<TelemetryRecord> {
        if !Self::is_candidate(line) {
            return None;
        }
        let fields: Vec<&str> = line.split(',').collect();
        // The gate only looks at the first value, so a row can still be too short
        let Some(raw) = fields.get(FIRST_VALUE_FIELD..FIRST_VALUE_FIELD + self.num_channels) else {
            trace!(
                have = fields.len(),
                want = FIRST_VALUE_FIELD + self.num_channels,
                "Skipping short telemetry row"
            );
            return None;
        };
        let values = raw
            .iter()
            .map(|f| parse_value(f))
            .collect::<Option<Vec<_>>>()?;
        Some(TelemetryRecord {
            node_id: fields[1].trim().to_owned(),
            freq_mhz: self.freq_mhz,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::{RadioOptions, Standard};

    fn config(std: Standard, mode: DetectorMode) -> RadioConfig {
        let opts = RadioOptions {
            first_channel: Some(*std.first_channel_range().start()),
            ..Default::default()
        };
        RadioConfig::derive(std, mode, &opts).unwrap()
    }

    #[test]
    fn test_schema_shape() {
        for std in Standard::ALL {
            for mode in DetectorMode::ALL {
                let cfg = config(std, mode);
                let schema = TelemetrySchema::new(&cfg);
                assert_eq!(2 + cfg.num_channels as usize, schema.fields.len());
                assert_eq!(cfg.num_channels as usize, schema.num_values());
                assert_eq!("nodeId", schema.fields[0].name);
                assert_eq!("freqMHz", schema.fields[1].name);
                assert_eq!(FieldType::Int32, schema.fields[0].ty);
                assert_eq!(FieldType::Int32, schema.fields[1].ty);
                assert!(schema.fields[2..].iter().all(|f| f.ty == FieldType::Double));
            }
        }
    }

    #[test]
    fn test_schema_names() {
        let schema = TelemetrySchema::new(&config(Standard::WlanG, DetectorMode::Correlation));
        assert_eq!("wlan_g_cor", schema.name);
        assert_eq!("cor1", schema.fields[2].name);
        let schema = TelemetrySchema::new(&config(Standard::Bluetooth, DetectorMode::Max));
        assert_eq!("bluetooth_max", schema.name);
        assert_eq!("psd1", schema.fields[2].name);
        assert_eq!("psd79", schema.fields[80].name);
    }

    #[test]
    fn test_decode_row() {
        let dec = RowDecoder::new(&config(Standard::WlanG, DetectorMode::Correlation));
        assert_eq!(
            Some(TelemetryRecord {
                node_id: "node1".to_owned(),
                freq_mhz: 2412,
                values: vec![-50.0],
            }),
            dec.decode("x,node1,2412,-50.0,-60.0")
        );
    }

    #[test]
    fn test_decode_strips_line_endings() {
        let dec = RowDecoder::new(&config(Standard::Zigbee, DetectorMode::Correlation));
        let rec = dec.decode("t,17,2412,1.5,2.5,3.5,4.5\r\n").unwrap();
        assert_eq!(vec![1.5, 2.5, 3.5, 4.5], rec.values);
        assert_eq!("17", rec.node_id);
        assert_eq!(2412, rec.freq_mhz);
    }

    #[test]
    fn test_gate_rejects() {
        let dec = RowDecoder::new(&config(Standard::WlanG, DetectorMode::Correlation));
        assert_eq!(None, dec.decode("status,ok"));
        assert_eq!(None, dec.decode("x,node1,abc,foo"));
        assert_eq!(None, dec.decode("x,node1,2412"));
        assert_eq!(None, dec.decode(""));
        assert!(!RowDecoder::is_candidate("-- UHD linux_x86_64; UHD_003.008"));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let dec = RowDecoder::new(&config(Standard::WlanG, DetectorMode::Correlation));
        for line in ["x,node1,2412,nan", "x,n,1,inf", "x,n,1,-Infinity", "x,n,1,NaN"] {
            assert!(!RowDecoder::is_candidate(line), "{line}");
            assert_eq!(None, dec.decode(line), "{line}");
        }
        let dec = RowDecoder::new(&config(Standard::Zigbee, DetectorMode::Correlation));
        assert_eq!(None, dec.decode("x,n,2412,-50.0,nan,-52.0,-53.0"));
    }

    #[test]
    fn test_short_row_passes_gate_but_is_skipped() {
        let dec = RowDecoder::new(&config(Standard::Zigbee, DetectorMode::Correlation));
        let line = "x,node1,2412,-50.0";
        assert!(RowDecoder::is_candidate(line));
        assert_eq!(None, dec.decode(line));
    }

    #[test]
    fn test_bad_channel_value_skipped() {
        let dec = RowDecoder::new(&config(Standard::Zigbee, DetectorMode::Correlation));
        assert_eq!(None, dec.decode("x,node1,2412,-50.0,-51.0,nan?,-53.0"));
    }
}
