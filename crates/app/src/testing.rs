//! In-memory gateway used by the service tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thermohub_domain::appliance::{BoardCategory, BoardType, SeasonalMode, Version};
use thermohub_domain::error::{ConnectionError, ProtocolError, ThermoHubError};
use thermohub_domain::register::{self, Codec, Field};
use thermohub_domain::schedule::ScheduleId;
use thermohub_domain::zone::{HeatingMode, ZoneFunction, ZoneMode, ZoneTypeCode};

use crate::hub::{Hub, RetryPolicy};
use crate::ports::RegisterTransport;

#[derive(Default)]
pub(crate) struct Bank {
    pub registers: HashMap<u16, u16>,
    pub connected: bool,
    pub connects: usize,
    pub closes: usize,
    pub reads: usize,
    pub writes: Vec<(u16, Vec<u16>)>,
    /// The next N reads or writes time out.
    pub failing_requests: u32,
    /// Every write after this many successful ones fails.
    pub failing_writes_after: Option<usize>,
    /// Requests covering this address get a device exception.
    pub exception_at: Option<u16>,
    /// Writes to this address are acknowledged but not stored.
    pub ignored_write_at: Option<u16>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    bank: Arc<Mutex<Bank>>,
}

impl FakeTransport {
    pub fn bank(&self) -> MutexGuard<'_, Bank> {
        self.bank.lock().unwrap()
    }

    pub fn seed<C: Codec>(&self, field: &Field<C>, value: &C::Value) {
        let words = field.encode(value).unwrap();
        let mut bank = self.bank();
        for (address, word) in (field.address..).zip(words) {
            bank.registers.insert(address, word);
        }
    }

    pub fn words(&self, address: u16, count: u16) -> Vec<u16> {
        let bank = self.bank();
        (address..address + count)
            .map(|a| bank.registers.get(&a).copied().unwrap_or(0))
            .collect()
    }

    fn check(bank: &mut Bank, address: u16, count: u16) -> Result<(), ThermoHubError> {
        if !bank.connected {
            return Err(ConnectionError::NotConnected.into());
        }
        if bank.failing_requests > 0 {
            bank.failing_requests -= 1;
            bank.connected = false;
            return Err(ConnectionError::Timeout {
                address,
                timeout_ms: 5,
            }
            .into());
        }
        if let Some(at) = bank.exception_at
            && (address..address + count).contains(&at)
        {
            return Err(ProtocolError::DeviceException {
                address,
                code: "IllegalDataAddress".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn handle_read(&self, address: u16, count: u16) -> Result<Vec<u16>, ThermoHubError> {
        let mut bank = self.bank();
        Self::check(&mut bank, address, count)?;
        bank.reads += 1;
        Ok((address..address + count)
            .map(|a| bank.registers.get(&a).copied().unwrap_or(0))
            .collect())
    }

    fn handle_write(&self, address: u16, words: &[u16]) -> Result<(), ThermoHubError> {
        let mut bank = self.bank();
        let count = u16::try_from(words.len()).unwrap();
        Self::check(&mut bank, address, count)?;
        if bank
            .failing_writes_after
            .is_some_and(|limit| bank.writes.len() >= limit)
        {
            bank.connected = false;
            return Err(ConnectionError::Transport {
                address,
                reason: "broken pipe".to_string(),
            }
            .into());
        }
        bank.writes.push((address, words.to_vec()));
        if bank.ignored_write_at != Some(address) {
            for (a, word) in (address..).zip(words) {
                bank.registers.insert(a, *word);
            }
        }
        Ok(())
    }
}

impl RegisterTransport for FakeTransport {
    fn connect(&mut self) -> impl Future<Output = Result<(), ThermoHubError>> + Send {
        let mut bank = self.bank();
        bank.connected = true;
        bank.connects += 1;
        async { Ok(()) }
    }

    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, ThermoHubError>> + Send {
        let result = self.handle_read(address, count);
        async move { result }
    }

    fn write_registers(
        &mut self,
        address: u16,
        words: &[u16],
    ) -> impl Future<Output = Result<(), ThermoHubError>> + Send {
        let result = self.handle_write(address, words);
        async move { result }
    }

    fn close(&mut self) -> impl Future<Output = Result<(), ThermoHubError>> + Send {
        let mut bank = self.bank();
        if bank.connected {
            bank.connected = false;
            bank.closes += 1;
        }
        async { Ok(()) }
    }

    fn is_connected(&self) -> bool {
        self.bank().connected
    }
}

/// A heat pump mainboard in summer mode, with no active error, and a
/// gateway holding a DHW zone (1) and a CH zone (2).
pub(crate) fn seeded_gateway() -> FakeTransport {
    let gateway = FakeTransport::default();
    gateway.seed(&register::NUMBER_OF_DEVICES, &1);
    gateway.seed(
        &register::DEVICE_BOARD,
        &BoardCategory {
            board_type: BoardType::Ehc,
            generation: 4,
        },
    );
    gateway.seed(&register::DEVICE_SW_VERSION, &Version { major: 5, minor: 3 });
    gateway.seed(&register::DEVICE_HW_VERSION, &Version { major: 1, minor: 0 });
    gateway.seed(&register::DEVICE_ARTICLE_NUMBER, &Some(7_722_144));
    gateway.seed(&register::CURRENT_ERROR, &None);
    gateway.seed(&register::ERROR_PRIORITY, &None);
    gateway.seed(&register::APPLIANCE_STATUS_1, &0b0000_0010);
    gateway.seed(&register::APPLIANCE_STATUS_2, &0b0001_0001);
    gateway.seed(&register::SEASON_MODE, &SeasonalMode::Summer);
    gateway.seed(&register::NUMBER_OF_ZONES, &2);

    gateway.seed(&register::ZONE_TYPE, &ZoneTypeCode::Dhw);
    gateway.seed(&register::ZONE_FUNCTION, &ZoneFunction::DhwPrimary);
    gateway.seed(&register::ZONE_SHORT_NAME, &"DHW".to_string());
    gateway.seed(&register::ZONE_MODE, &ZoneMode::Scheduling);
    gateway.seed(&register::SELECTED_TIME_PROGRAM, &Some(ScheduleId::Schedule1));
    gateway.seed(&register::DHW_COMFORT_SETPOINT, &Some(55.0));
    gateway.seed(&register::DHW_REDUCED_SETPOINT, &Some(40.0));
    gateway.seed(&register::DHW_TANK_TEMPERATURE, &Some(48.5));
    gateway.seed(&register::HEATING_MODE, &Some(HeatingMode::Standby));
    gateway.seed(&register::ROOM_MANUAL_SETPOINT, &None);
    gateway.seed(&register::ROOM_TEMPERATURE, &None);

    seed_ch_zone(&gateway, 2, "CH1");
    gateway
}

/// Seed a CH zone in manual mode at 20.5 °C.
pub(crate) fn seed_ch_zone(gateway: &FakeTransport, id: u8, name: &str) {
    gateway.seed(&register::ZONE_TYPE.for_zone(id), &ZoneTypeCode::ChOnly);
    gateway.seed(
        &register::ZONE_FUNCTION.for_zone(id),
        &ZoneFunction::MixingCircuit,
    );
    gateway.seed(&register::ZONE_SHORT_NAME.for_zone(id), &name.to_string());
    gateway.seed(&register::ZONE_MODE.for_zone(id), &ZoneMode::Manual);
    gateway.seed(
        &register::SELECTED_TIME_PROGRAM.for_zone(id),
        &Some(ScheduleId::Schedule2),
    );
    gateway.seed(&register::ROOM_MANUAL_SETPOINT.for_zone(id), &Some(20.5));
    gateway.seed(&register::ROOM_TEMPERATURE.for_zone(id), &Some(19.8));
    gateway.seed(&register::DHW_COMFORT_SETPOINT.for_zone(id), &None);
    gateway.seed(&register::DHW_REDUCED_SETPOINT.for_zone(id), &None);
    gateway.seed(&register::DHW_TANK_TEMPERATURE.for_zone(id), &None);
    gateway.seed(
        &register::HEATING_MODE.for_zone(id),
        &Some(HeatingMode::Heating),
    );
}

/// A hub over `gateway` with millisecond retries and no pacing.
pub(crate) fn fast_hub(gateway: FakeTransport) -> Hub<FakeTransport> {
    Hub::new(
        "test",
        gateway,
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        },
        Duration::ZERO,
    )
}
