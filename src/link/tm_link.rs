//! Telemetry frame intake: strips the earth-reception header and hands the
//! packet to the next stage.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::core::errors::{ParamError, Result};
use crate::core::time::{Instant, MissionClock};

/// Seconds (i64) followed by picoseconds (u32), both big-endian
const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct TmPacket {
    pub reception_time: Instant,
    pub earth_reception_time: Instant,
    pub data: Vec<u8>,
}

pub trait TmPacketSink: Send + Sync {
    fn process_packet(&self, packet: TmPacket);
}

pub struct TmLink {
    name: String,
    disabled: AtomicBool,
    packet_count: AtomicU64,
    clock: Arc<dyn MissionClock>,
    sink: Arc<dyn TmPacketSink>,
}

impl TmLink {
    pub fn new(
        name: impl Into<String>,
        clock: Arc<dyn MissionClock>,
        sink: Arc<dyn TmPacketSink>,
    ) -> Self {
        Self {
            name: name.into(),
            disabled: AtomicBool::new(false),
            packet_count: AtomicU64::new(0),
            clock,
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process_message(&self, message: &[u8]) -> Result<()> {
        if self.is_disabled() {
            trace!(link = %self.name, len = message.len(), "Link disabled, ignoring message");
            return Ok(());
        }
        let reception_time = self.clock.now();
        if message.len() < HEADER_LEN {
            return Err(ParamError::malformed_frame(
                &self.name,
                format!("{} bytes, need at least {}", message.len(), HEADER_LEN),
            ));
        }

        let (header, data) = message.split_at(HEADER_LEN);
        let mut secs = [0u8; 8];
        secs.copy_from_slice(&header[..8]);
        let mut picos = [0u8; 4];
        picos.copy_from_slice(&header[8..]);
        let secs = i64::from_be_bytes(secs);
        let earth_reception_time =
            Instant::checked_from_unix_picos(secs, u32::from_be_bytes(picos) as u64).ok_or_else(
                || {
                    ParamError::malformed_frame(
                        &self.name,
                        format!("earth reception time of {} seconds is out of range", secs),
                    )
                },
            )?;

        self.packet_count.fetch_add(1, Ordering::Relaxed);
        self.sink.process_packet(TmPacket {
            reception_time,
            earth_reception_time,
            data: data.to_vec(),
        });
        Ok(())
    }

    pub fn enable(&self) {
        if self.disabled.swap(false, Ordering::SeqCst) {
            debug!(link = %self.name, "Link enabled");
        }
    }

    pub fn disable(&self) {
        if !self.disabled.swap(true, Ordering::SeqCst) {
            debug!(link = %self.name, "Link disabled");
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    pub fn packet_count(&self) -> u64 {
        self.packet_count.load(Ordering::Relaxed)
    }
}
