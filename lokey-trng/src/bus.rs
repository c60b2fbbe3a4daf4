use lokey_api::{Error, Result};

/// The two-wire bus contract to the secure element: a wake sequence, a
/// random-fetch command, and an optional hardware SHA-256 path. Mirrors a
/// typical I2C service API (`i2c_read`/`i2c_write` addressed by device and
/// register), generalized to the three operations this producer needs.
pub trait SecureElementBus: Send {
    /// Writes the wake opcode with its single-byte parameter, then waits
    /// out the device's wake latency. Called exactly once, at startup.
    fn wake(&mut self) -> Result<()>;

    /// Sends the framed random-fetch command and reads back 32 bytes.
    /// Returns `Error::HardwareTransient` on a mid-operation bus failure.
    fn read_random(&mut self) -> Result<[u8; 32]>;

    /// Sends the framed SHA-start/data commands and reads back the 32-byte
    /// digest. Producers that have no hardware SHA unit return
    /// `Error::HardwareUnavailable` so the caller falls back to software.
    fn sha256_hardware(&mut self, data: &[u8]) -> Result<[u8; 32]>;
}

/// Framing and opcode constants for the hardware protocol.
pub mod protocol {
    pub const FRAME_COMMAND: u8 = 0x03;
    pub const FRAME_DATA: u8 = 0x04;
    pub const OPCODE_RANDOM_FETCH: u8 = 0x1B;
    pub const OPCODE_SHA_START: u8 = 0x47;

    pub const WAKE_SETTLE: std::time::Duration = std::time::Duration::from_millis(10);
    pub const RANDOM_FETCH_SETTLE: std::time::Duration = std::time::Duration::from_millis(5);
    pub const SHA_START_SETTLE: std::time::Duration = std::time::Duration::from_millis(5);
    pub const SHA_DATA_SETTLE: std::time::Duration = std::time::Duration::from_millis(10);
}

/// A secure element stand-in for hosts with no I2C character device
/// available, the production path on commodity hardware. Draws from the
/// OS CSPRNG so the simulated hardware path is itself cryptographically
/// sound. `force_fail` lets tests simulate a bus falling over mid-life.
pub struct MockBus {
    awake: bool,
    force_fail: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl MockBus {
    pub fn new() -> Self {
        MockBus { awake: false, force_fail: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)) }
    }

    /// A handle the test harness can flip to make the next bus operation
    /// fail, simulating hardware falling over mid-life.
    pub fn failure_switch(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.force_fail.clone()
    }

    fn check_failure(&self) -> Result<()> {
        if self.force_fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::HardwareTransient("simulated bus fault".into()));
        }
        Ok(())
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureElementBus for MockBus {
    fn wake(&mut self) -> Result<()> {
        self.check_failure()?;
        self.awake = true;
        Ok(())
    }

    fn read_random(&mut self) -> Result<[u8; 32]> {
        if !self.awake {
            return Err(Error::HardwareUnavailable("bus not woken".into()));
        }
        self.check_failure()?;
        use rand::RngCore;
        let mut buf = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut buf);
        Ok(buf)
    }

    fn sha256_hardware(&mut self, _data: &[u8]) -> Result<[u8; 32]> {
        // This simulated element has no SHA unit; callers fall back to
        // the software digest.
        Err(Error::HardwareUnavailable("no hardware SHA unit on mock bus".into()))
    }
}

/// Real Linux `i2cdev`-style secure element driver, compiled only when the
/// deployment target has an actual I2C character device. Left as a stub:
/// wiring `I2C_BUS_NUMBER` to `/dev/i2c-N` ioctls is a deployment concern
/// outside this crate's test surface.
#[cfg(feature = "hw-i2c")]
pub struct LinuxI2cBus {
    pub bus_number: u8,
}

#[cfg(feature = "hw-i2c")]
impl SecureElementBus for LinuxI2cBus {
    fn wake(&mut self) -> Result<()> {
        Err(Error::HardwareUnavailable(format!(
            "i2c-{} wake not implemented on this build",
            self.bus_number
        )))
    }

    fn read_random(&mut self) -> Result<[u8; 32]> {
        Err(Error::HardwareUnavailable("hw-i2c read not implemented".into()))
    }

    fn sha256_hardware(&mut self, _data: &[u8]) -> Result<[u8; 32]> {
        Err(Error::HardwareUnavailable("hw-i2c sha not implemented".into()))
    }
}
