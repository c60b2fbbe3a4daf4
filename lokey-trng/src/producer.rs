use crate::bus::SecureElementBus;
use lokey_api::{Result, Source};
use lokey_queue::TrngQueue;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Producer lifecycle states. `HardwareFailed` and `SoftwareMode` are both
/// terminal: once entered, the producer never attempts hardware again for
/// the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Uninitialized,
    HardwareActive,
    HardwareFailed,
    SoftwareMode,
}

/// Periodic entropy harvester: draws a 32-byte block from the secure
/// element (or the OS CSPRNG once fallen back), hashes it, and appends the
/// result to the TRNG queue with provenance attached.
pub struct TrngProducer {
    bus: Box<dyn SecureElementBus>,
    state: ProducerState,
    last_error: Option<String>,
    queue: Arc<TrngQueue>,
}

impl TrngProducer {
    /// Initializes the bus once: wakes the secure element unless
    /// `force_mock_mode` is set, in which case the producer starts in
    /// software mode directly and never touches the bus. A wake failure
    /// also lands in software mode. There is no per-call hardware retry, to
    /// avoid bus-lockup cascades.
    pub fn init(mut bus: Box<dyn SecureElementBus>, force_mock_mode: bool, queue: Arc<TrngQueue>) -> Self {
        if force_mock_mode {
            log::info!("FORCE_MOCK_MODE set; starting in software mode");
            return TrngProducer { bus, state: ProducerState::SoftwareMode, last_error: None, queue };
        }

        match bus.wake() {
            Ok(()) => {
                log::info!("secure element woke; starting in hardware mode");
                TrngProducer { bus, state: ProducerState::HardwareActive, last_error: None, queue }
            }
            Err(e) => {
                log::warn!("secure element wake failed, falling back to software mode: {e}");
                TrngProducer {
                    bus,
                    state: ProducerState::HardwareFailed,
                    last_error: Some(e.to_string()),
                    queue,
                }
            }
        }
    }

    pub fn state(&self) -> ProducerState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Runs one production tick: acquire 32 random bytes, hash them, append
    /// the record. A hardware failure mid-life permanently demotes the
    /// producer to software mode for the remainder of this tick onward, but
    /// the tick itself still produces a software-tagged record rather than
    /// being dropped, so the queue never starves on a bus fault.
    pub async fn tick(&mut self) -> Result<()> {
        let (raw, source) = match self.state {
            ProducerState::HardwareActive => match self.bus.read_random() {
                Ok(bytes) => (bytes, Source::Hardware),
                Err(e) => {
                    log::error!("hardware TRNG read failed, falling back to software mode: {e}");
                    self.state = ProducerState::HardwareFailed;
                    self.last_error = Some(e.to_string());
                    (os_random(), Source::Software)
                }
            },
            ProducerState::SoftwareMode | ProducerState::HardwareFailed | ProducerState::Uninitialized => {
                (os_random(), Source::Software)
            }
        };

        let hash = self.hash(&raw, source);
        self.queue.append(hash.to_vec(), source, 32).await?;
        Ok(())
    }

    fn hash(&mut self, raw: &[u8; 32], source: Source) -> [u8; 32] {
        if source == Source::Hardware {
            if let Ok(digest) = self.bus.sha256_hardware(raw) {
                return digest;
            }
        }
        let mut hasher = Sha256::new();
        hasher.update(raw);
        hasher.finalize().into()
    }

    /// Revalidates the hardware path by attempting a fresh draw, without
    /// advancing the queue or changing producer state. No-op (reports ok)
    /// in software mode; health checks only revalidate real hardware.
    pub fn health_check(&mut self) -> bool {
        match self.state {
            ProducerState::HardwareActive => self.bus.read_random().is_ok(),
            _ => true,
        }
    }
}

fn os_random() -> [u8; 32] {
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}
