//! # thermohub-adapter-virtual
//!
//! Simulated GTW-08 gateway holding its registers in memory.
//!
//! ## Seeded appliance
//!
//! | Zone | Type | Short name | Mode | Setpoints |
//! |------|------|------------|------|-----------|
//! | 1 | DHW (primary) | `DHW` | scheduling, `schedule_1` | comfort 55 °C, reduced 40 °C |
//! | 2 | CH (mixing circuit) | `CIRCA1` | scheduling, `schedule_1` | room 20 °C |
//!
//! Every time program holds comfort from 06:00 to 08:00 and 17:00 to 22:00.
//!
//! Faults can be scripted through a [`FaultHandle`] to exercise retries and
//! failed schedule commits.
//!
//! ## Dependency rule
//!
//! Depends on `thermohub-app` (port traits) and `thermohub-domain` only.

mod seed;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thermohub_app::ports::RegisterTransport;
use thermohub_domain::error::{ConnectionError, ProtocolError, ThermoHubError};

const EXCEPTION_ILLEGAL_ADDRESS: &str = "IllegalDataAddress";

#[derive(Debug, Default)]
struct Bank {
    registers: HashMap<u16, u16>,
    faults: Faults,
}

/// Scripted failures of the simulated gateway.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Faults {
    /// The next N requests time out and drop the connection.
    pub timeouts: u32,
    /// Every write fails with a broken link while set.
    pub refuse_writes: bool,
    /// Requests covering this register answer with a device exception.
    pub exception_at: Option<u16>,
}

/// Handle for scripting faults on a gateway moved into a hub.
#[derive(Clone)]
pub struct FaultHandle {
    bank: Arc<Mutex<Bank>>,
}

impl FaultHandle {
    /// Replace the fault script.
    pub fn set(&self, faults: Faults) {
        lock(&self.bank).faults = faults;
    }

    /// Clear every scripted fault.
    pub fn clear(&self) {
        self.set(Faults::default());
    }

    /// Raw register content, for assertions.
    #[must_use]
    pub fn peek(&self, address: u16, count: u16) -> Vec<u16> {
        let bank = lock(&self.bank);
        (address..address.saturating_add(count))
            .map(|a| bank.registers.get(&a).copied().unwrap_or(0))
            .collect()
    }
}

fn lock(bank: &Mutex<Bank>) -> MutexGuard<'_, Bank> {
    bank.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory gateway implementing [`RegisterTransport`].
pub struct VirtualGateway {
    bank: Arc<Mutex<Bank>>,
    connected: bool,
}

impl VirtualGateway {
    /// A gateway with every register at zero.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            bank: Arc::new(Mutex::new(Bank::default())),
            connected: false,
        }
    }

    /// A gateway seeded with the demo appliance.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Protocol`] if a seed value does not encode.
    pub fn seeded() -> Result<Self, ThermoHubError> {
        let gateway = Self::empty();
        seed::appliance(&mut lock(&gateway.bank))?;
        Ok(gateway)
    }

    #[must_use]
    pub fn fault_handle(&self) -> FaultHandle {
        FaultHandle {
            bank: Arc::clone(&self.bank),
        }
    }

    fn admit(&mut self, bank: &mut Bank, address: u16, count: u16) -> Result<(), ThermoHubError> {
        if !self.connected {
            return Err(ConnectionError::NotConnected.into());
        }
        if bank.faults.timeouts > 0 {
            bank.faults.timeouts -= 1;
            self.connected = false;
            tracing::debug!(address, "virtual gateway simulating a timeout");
            return Err(ConnectionError::Timeout {
                address,
                timeout_ms: 0,
            }
            .into());
        }
        let end = address.checked_add(count).ok_or_else(|| ProtocolError::DeviceException {
            address,
            code: EXCEPTION_ILLEGAL_ADDRESS.to_string(),
        })?;
        if bank
            .faults
            .exception_at
            .is_some_and(|at| (address..end).contains(&at))
        {
            return Err(ProtocolError::DeviceException {
                address,
                code: EXCEPTION_ILLEGAL_ADDRESS.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn read(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ThermoHubError> {
        let bank = Arc::clone(&self.bank);
        let mut bank = lock(&bank);
        self.admit(&mut bank, address, count)?;
        Ok((address..address + count)
            .map(|a| bank.registers.get(&a).copied().unwrap_or(0))
            .collect())
    }

    fn write(&mut self, address: u16, words: &[u16]) -> Result<(), ThermoHubError> {
        let bank = Arc::clone(&self.bank);
        let mut bank = lock(&bank);
        let count = u16::try_from(words.len()).map_err(|_| ProtocolError::DeviceException {
            address,
            code: EXCEPTION_ILLEGAL_ADDRESS.to_string(),
        })?;
        self.admit(&mut bank, address, count)?;
        if bank.faults.refuse_writes {
            self.connected = false;
            return Err(ConnectionError::Transport {
                address,
                reason: "connection reset by peer".to_string(),
            }
            .into());
        }
        for (a, word) in (address..).zip(words) {
            bank.registers.insert(a, *word);
        }
        tracing::trace!(address, count, "virtual gateway stored registers");
        Ok(())
    }
}

impl RegisterTransport for VirtualGateway {
    fn connect(&mut self) -> impl Future<Output = Result<(), ThermoHubError>> + Send {
        self.connected = true;
        async { Ok(()) }
    }

    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, ThermoHubError>> + Send {
        let result = self.read(address, count);
        async move { result }
    }

    fn write_registers(
        &mut self,
        address: u16,
        words: &[u16],
    ) -> impl Future<Output = Result<(), ThermoHubError>> + Send {
        let result = self.write(address, words);
        async move { result }
    }

    fn close(&mut self) -> impl Future<Output = Result<(), ThermoHubError>> + Send {
        self.connected = false;
        async { Ok(()) }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
