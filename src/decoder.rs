//! Telemetry decoder and connection state machine.
//!
//! [`TelemetryDecoder`] owns a [`SharedRegion`] and turns it into an immutable
//! [`Catalog`] once per [`poll`](TelemetryDecoder::poll):
//!
//! ```text
//! Disconnected ──(connected bit set, layout valid)──► Connected
//!      ▲                                                  │
//!      └──────(bit dropped, or any decode error)──────────┘
//! ```
//!
//! While connected, each poll waits for the writer's signal, re-reads the
//! header, and decodes the most recent value buffer. Catalogs are published
//! through a `tokio::sync::watch` channel, so a reader always sees one whole
//! decode pass.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::codec::{i32_at, non_negative};
use crate::region::SharedRegion;
use crate::schema::header::HEADER_SIZE;
use crate::schema::{Header, SessionInfo, SessionInfoParser, parse_variable_schema};
use crate::types::{Catalog, Value, VarData, VarValue, Variable, VariableSchema};
use crate::{Result, TelemetryError};

/// Decoder tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// How long a decoded catalog stays valid without a fresh decode.
    pub staleness_window: Duration,
    /// Copies attempted before a value buffer that keeps changing is reported
    /// as a torn read.
    pub read_attempts: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { staleness_window: Duration::from_secs(30), read_attempts: 2 }
    }
}

/// What one [`TelemetryDecoder::poll`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing new: not connected, timed out, or the simulator went away.
    NoData,
    /// A fresh catalog was published. `new_version` is set when the
    /// data-version counter differs from the previous catalog's.
    Data { new_version: bool },
}

#[derive(Debug)]
struct Epoch {
    header: Header,
    schema: Arc<VariableSchema>,
    session: Arc<SessionInfo>,
    last_good: Instant,
}

#[derive(Debug)]
enum ConnectionState {
    Disconnected,
    Connected(Epoch),
}

/// Decodes a telemetry region into published catalogs.
pub struct TelemetryDecoder {
    region: Box<dyn SharedRegion>,
    config: DecoderConfig,
    state: ConnectionState,
    session_parser: SessionInfoParser,
    catalog_tx: watch::Sender<Arc<Catalog>>,
}

impl std::fmt::Debug for TelemetryDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryDecoder")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TelemetryDecoder {
    pub fn new(region: impl SharedRegion + 'static, config: DecoderConfig) -> Self {
        let (catalog_tx, _) = watch::channel(Arc::new(Catalog::default()));
        Self {
            region: Box::new(region),
            config,
            state: ConnectionState::Disconnected,
            session_parser: SessionInfoParser::new(),
            catalog_tx,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Advance the state machine by one read pass.
    ///
    /// Any error leaves the decoder disconnected with an empty catalog; the
    /// next call starts over with a full re-read.
    pub async fn poll(&mut self, timeout: Duration) -> Result<PollOutcome> {
        let result = match self.state {
            ConnectionState::Disconnected => self.try_connect(timeout).await,
            ConnectionState::Connected(_) => self.refresh(timeout).await,
        };

        if let Err(e) = &result {
            warn!(
                error = %e,
                decode = e.is_decode_error(),
                "Telemetry poll failed, dropping connection"
            );
            self.disconnect();
        }
        result
    }

    async fn try_connect(&mut self, timeout: Duration) -> Result<PollOutcome> {
        let header = self.read_header()?;
        if !header.is_connected() {
            trace!("Simulator not connected");
            // Paces callers that poll in a tight loop while nothing is running
            self.region.wait_for_signal(timeout).await;
            return Ok(PollOutcome::NoData);
        }

        header.validate(self.region.len())?;

        self.session_parser.clear_cache();
        let session = self.read_session(&header)?;
        let schema = Arc::new(self.read_schema(&header)?);
        let catalog = self.read_catalog(header, &schema)?;

        info!(
            version = catalog.version(),
            tick = catalog.tick(),
            variables = schema.variable_count(),
            "Connected to telemetry"
        );

        self.state = ConnectionState::Connected(Epoch {
            header,
            schema,
            session,
            last_good: Instant::now(),
        });
        self.catalog_tx.send_replace(Arc::new(catalog));
        Ok(PollOutcome::Data { new_version: true })
    }

    async fn refresh(&mut self, timeout: Duration) -> Result<PollOutcome> {
        if !self.region.wait_for_signal(timeout).await {
            trace!("No telemetry signal before timeout");
            return Ok(PollOutcome::NoData);
        }

        let header = self.read_header()?;
        if !header.is_connected() {
            info!("Simulator disconnected");
            self.disconnect();
            return Ok(PollOutcome::NoData);
        }
        header.validate(self.region.len())?;

        let ConnectionState::Connected(epoch) = &self.state else {
            return Ok(PollOutcome::NoData);
        };

        let layout_changed = header.num_vars != epoch.header.num_vars
            || header.var_header_offset != epoch.header.var_header_offset
            || header.buf_len != epoch.header.buf_len;
        let schema = if layout_changed {
            debug!(num_vars = header.num_vars, buf_len = header.buf_len, "Descriptor table changed");
            Arc::new(self.read_schema(&header)?)
        } else {
            Arc::clone(&epoch.schema)
        };

        let previous_version = epoch.header.session_info_update;
        let session = if self.session_parser.cached_version() == Some(header.session_info_update) {
            Arc::clone(&epoch.session)
        } else {
            self.read_session(&header)?
        };

        let catalog = self.read_catalog(header, &schema)?;
        let new_version = catalog.version() != previous_version;
        if new_version {
            debug!(from = previous_version, to = catalog.version(), "Data version changed");
        }

        self.state = ConnectionState::Connected(Epoch {
            header,
            schema,
            session,
            last_good: Instant::now(),
        });
        self.catalog_tx.send_replace(Arc::new(catalog));
        Ok(PollOutcome::Data { new_version })
    }

    fn read_header(&self) -> Result<Header> {
        Header::parse(&self.region.read_at(0, HEADER_SIZE)?)
    }

    fn read_session(&mut self, header: &Header) -> Result<Arc<SessionInfo>> {
        let offset = non_negative(header.session_info_offset, "Session info", "offset")?;
        let length = non_negative(header.session_info_len, "Session info", "length")?;
        let block = self.region.read_at(offset, length)?;
        self.session_parser.parse_block(&block, header.session_info_update)
    }

    fn read_schema(&self, header: &Header) -> Result<VariableSchema> {
        let num_vars = non_negative(header.num_vars, "Variable headers", "count")?;
        let offset = non_negative(header.var_header_offset, "Variable headers", "offset")?;
        let buf_len = non_negative(header.buf_len, "Variable headers", "buffer length")?;
        let table_len = num_vars
            .checked_mul(crate::schema::variables::VAR_HEADER_SIZE)
            .ok_or_else(|| TelemetryError::out_of_range(offset, usize::MAX, self.region.len()))?;

        let table = self.region.read_at(offset, table_len)?;
        parse_variable_schema(&table, num_vars, buf_len)
    }

    /// Copy the newest value buffer, re-reading its tick afterwards so a
    /// buffer the writer touched mid-copy is never decoded.
    fn read_catalog(&self, mut header: Header, schema: &VariableSchema) -> Result<Catalog> {
        let attempts = self.config.read_attempts.max(1);
        let mut last_index = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                header = self.read_header()?;
            }

            let slot = header.latest_buffer().ok_or_else(|| {
                TelemetryError::buffer_operation_error("No active value buffers", None)
            })?;
            last_index = Some(slot.index);

            let bytes = self.region.read_at(slot.offset, schema.frame_size)?;
            let tick_field = Header::tick_field_offset(slot.index);
            let tick_after = i32_at(&self.region.read_at(tick_field, 4)?, 0)?;

            if tick_after == slot.tick_count {
                trace!(tick = slot.tick_count, buffer = slot.index, "Decoding value buffer");
                return Catalog::decode(schema, &bytes, header.session_info_update, slot.tick_count);
            }

            debug!(
                attempt,
                before = slot.tick_count,
                after = tick_after,
                buffer = slot.index,
                "Value buffer changed during read"
            );
        }

        Err(TelemetryError::buffer_operation_error(
            format!("Value buffer kept changing across {} reads", attempts),
            last_index,
        ))
    }

    fn disconnect(&mut self) {
        if matches!(self.state, ConnectionState::Connected(_)) {
            debug!("Clearing telemetry catalog");
        }
        self.state = ConnectionState::Disconnected;
        self.session_parser.clear_cache();
        self.catalog_tx.send_replace(Arc::new(Catalog::default()));
    }

    /// Connected, the simulator's status bit was set at the last read, and a
    /// decode succeeded within the staleness window.
    pub fn is_connected(&self) -> bool {
        match &self.state {
            ConnectionState::Connected(epoch) => {
                epoch.header.is_connected()
                    && epoch.last_good.elapsed() < self.config.staleness_window
            }
            ConnectionState::Disconnected => false,
        }
    }

    /// Data-version counter of the current catalog, `-1` when not connected.
    pub fn version(&self) -> i32 {
        match &self.state {
            ConnectionState::Connected(epoch) if self.is_connected() => {
                epoch.header.session_info_update
            }
            _ => -1,
        }
    }

    /// Session metadata for the current connection epoch.
    pub fn session(&self) -> Option<Arc<SessionInfo>> {
        match &self.state {
            ConnectionState::Connected(epoch) => Some(Arc::clone(&epoch.session)),
            ConnectionState::Disconnected => None,
        }
    }

    /// The most recently published catalog. Empty while disconnected.
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog_tx.borrow())
    }

    /// Receive every catalog the decoder publishes, e.g. on another task.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Catalog>> {
        self.catalog_tx.subscribe()
    }

    /// Look up a decoded variable.
    ///
    /// [`TelemetryError::NotFound`] when not connected, stale, or the name is
    /// not described.
    pub fn get_variable(&self, name: &str) -> Result<Variable> {
        if !self.is_connected() {
            return Err(TelemetryError::not_found(name));
        }
        self.catalog().get(name).cloned().ok_or_else(|| TelemetryError::not_found(name))
    }

    /// A variable's single value. Arrays are a conversion error.
    pub fn get_scalar(&self, name: &str) -> Result<Value> {
        match self.get_variable(name)?.value {
            VarValue::Scalar(value) => Ok(value),
            VarValue::Sequence(values) => Err(TelemetryError::TypeConversion {
                details: format!("'{}' is an array of {} elements", name, values.len()),
            }),
        }
    }

    /// A variable's elements in index order. Scalars yield one element.
    pub fn get_sequence(&self, name: &str) -> Result<Vec<Value>> {
        Ok(match self.get_variable(name)?.value {
            VarValue::Scalar(value) => vec![value],
            VarValue::Sequence(values) => values,
        })
    }

    /// Typed scalar lookup.
    pub fn scalar<T: VarData>(&self, name: &str) -> Result<T> {
        T::from_value(&self.get_scalar(name)?)
    }

    /// Typed array lookup.
    pub fn sequence<T: VarData>(&self, name: &str) -> Result<Vec<T>> {
        self.get_sequence(name)?.iter().map(T::from_value).collect()
    }

    /// Release the region. Further polls fail until a new decoder is built.
    pub fn close(&mut self) {
        self.disconnect();
        self.region.close();
    }
}
