//! Reporting of decoded measurement rows to an OML collection server

use std::{
    fmt,
    io::{BufWriter, Write},
    net::TcpStream,
    str::FromStr,
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use crate::{
    error::{ConfigError, TelemetryError},
    radio::RadioConfig,
    schema::{RowDecoder, TelemetryRecord, TelemetrySchema},
};

/// Application name announced to the collection server
pub const APP_NAME: &str = "usrpse";
/// Default OML collection endpoint of the testbed
pub const DEFAULT_COLLECT_URI: &str = "tcp:am.wilab2.ilabt.iminds.be:3004";

/// Anything that accepts a registered schema and then rows of it
pub trait TelemetrySink {
    fn register(&mut self, schema: &TelemetrySchema) -> Result<(), TelemetryError>;
    fn inject(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}

/// Experiment identifier the measurements are filed under
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: Option<&str>) -> Result<Self, ConfigError> {
        match id {
            Some(id) if !id.is_empty() && !id.chars().any(char::is_whitespace) => {
                Ok(Self(id.to_owned()))
            }
            _ => Err(ConfigError::InvalidSessionId),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `tcp:<host>:<port>` style endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectUri {
    pub host: String,
    pub port: u16,
}

impl FromStr for CollectUri {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ConfigError::InvalidCollectUri(s.to_owned());
        let rest = s.strip_prefix("tcp:").unwrap_or(s);
        let (host, port) = rest.rsplit_once(':').ok_or_else(err)?;
        if host.is_empty() {
            return Err(err());
        }
        Ok(Self {
            host: host.to_owned(),
            port: port.parse().map_err(|_| err())?,
        })
    }
}

impl fmt::Display for CollectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp:{}:{}", self.host, self.port)
    }
}

/// Registered measurement point
struct MeasurementPoint {
    index: usize,
    name: String,
    num_values: usize,
    seq: u64,
}

/// OML text protocol client
pub struct OmlSink<W: Write> {
    writer: W,
    domain: SessionId,
    sender_id: String,
    start: DateTime<Utc>,
    point: Option<MeasurementPoint>,
}

impl OmlSink<BufWriter<TcpStream>> {
    pub fn connect(uri: &CollectUri, domain: SessionId) -> Result<Self, TelemetryError> {
        let stream = TcpStream::connect((uri.host.as_str(), uri.port)).map_err(|source| {
            TelemetryError::Connect {
                uri: uri.to_string(),
                source,
            }
        })?;
        debug!(%uri, "Connected to OML server");
        let sender_id = nix::unistd::gethostname()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| APP_NAME.to_owned());
        Ok(Self::new(BufWriter::new(stream), domain, sender_id))
    }
}

impl<W: Write> OmlSink<W> {
    pub fn new(writer: W, domain: SessionId, sender_id: String) -> Self {
        Self {
            writer,
            domain,
            sender_id,
            start: Utc::now(),
            point: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TelemetrySink for OmlSink<W> {
    fn register(&mut self, schema: &TelemetrySchema) -> Result<(), TelemetryError> {
        let name = format!("{APP_NAME}_{}", schema.name);
        let columns: Vec<String> = schema
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.ty))
            .collect();
        writeln!(self.writer, "protocol: 4")?;
        writeln!(self.writer, "domain: {}", self.domain.as_str())?;
        writeln!(self.writer, "start-time: {}", self.start.timestamp())?;
        writeln!(self.writer, "sender-id: {}", self.sender_id)?;
        writeln!(self.writer, "app-name: {APP_NAME}")?;
        writeln!(
            self.writer,
            "schema: 0 _experiment_metadata subject:string key:string value:string"
        )?;
        writeln!(self.writer, "schema: 1 {name} {}", columns.join(" "))?;
        writeln!(self.writer, "content: text")?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        self.point = Some(MeasurementPoint {
            index: 1,
            name,
            num_values: schema.num_values(),
            seq: 0,
        });
        Ok(())
    }

    fn inject(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let point = self.point.as_mut().ok_or(TelemetryError::Unregistered)?;
        if record.values.len() != point.num_values {
            return Err(TelemetryError::SchemaMismatch {
                name: point.name.clone(),
                expected: point.num_values,
                actual: record.values.len(),
            });
        }
        let elapsed = (Utc::now() - self.start)
            .num_microseconds()
            .unwrap_or_default() as f64
            / 1e6;
        write!(
            self.writer,
            "{elapsed:.6}\t{}\t{}\t{}\t{}",
            point.index, point.seq, record.node_id, record.freq_mhz
        )?;
        for v in &record.values {
            write!(self.writer, "\t{v}")?;
        }
        writeln!(self.writer)?;
        // Rows arrive at human rates, push each one out immediately
        self.writer.flush()?;
        point.seq += 1;
        Ok(())
    }
}

/// Decodes output lines and forwards the good ones to a sink
pub struct Reporter<S> {
    decoder: RowDecoder,
    sink: S,
    injected: u64,
    skipped: u64,
}

impl<S: TelemetrySink> Reporter<S> {
    /// Registers the schema for `config` with the sink
    pub fn new(config: &RadioConfig, mut sink: S) -> Result<Self, TelemetryError> {
        let schema = TelemetrySchema::new(config);
        for field in &schema.fields {
            debug!(field = %field.name, ty = %field.ty, "Schema field");
        }
        sink.register(&schema)?;
        info!("Measurement class {} created", schema.name);
        Ok(Self {
            decoder: RowDecoder::new(config),
            sink,
            injected: 0,
            skipped: 0,
        })
    }

    /// Returns whether the line was forwarded
    pub fn report(&mut self, line: &str) -> Result<bool, TelemetryError> {
        match self.decoder.decode(line) {
            Some(record) => {
                self.sink.inject(&record)?;
                self.injected += 1;
                Ok(true)
            }
            None => {
                trace!(line = line.trim_end(), "Not a telemetry row");
                self.skipped += 1;
                Ok(false)
            }
        }
    }

    /// `(forwarded, skipped)` line counts
    pub fn counts(&self) -> (u64, u64) {
        (self.injected, self.skipped)
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
