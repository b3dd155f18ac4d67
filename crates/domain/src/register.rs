//! Register map: typed descriptors for the gateway's holding registers.
//!
//! Every logical value lives in a [`Field`]: a name, a base address and a
//! [`Codec`] that converts between raw 16-bit words and a domain value.
//! Codecs never clamp: unknown codes, out-of-range values and wrong word
//! counts are reported as [`ProtocolError`]s.
//!
//! Zone fields are declared for zone 1; [`Field::for_zone`] shifts them into
//! the register window of another zone. Device instance fields are declared
//! for instance 0 and shifted with [`Field::for_device`].

use std::marker::PhantomData;

use chrono::Weekday;

use crate::appliance::{BoardCategory, BoardType, ErrorPriority, SeasonalMode, Version};
use crate::error::ProtocolError;
use crate::schedule::{Activity, ScheduleId, Setpoint, SwitchPoint, MINUTES_PER_DAY};
use crate::zone::{HeatingMode, ZoneFunction, ZoneMode, ZoneTypeCode};

/// Registers reserved per zone.
pub const ZONE_WINDOW: u16 = 512;
/// Highest zone number addressable without leaving the register space.
pub const MAX_ZONES: u8 = 64;
/// Registers reserved per device instance.
pub const DEVICE_WINDOW: u16 = 6;
/// Most switch points a day program can hold.
pub const MAX_SWITCH_POINTS: usize = 6;

const NULL_U8: u8 = 0xFF;
const NULL_U16: u16 = 0xFFFF;
const NULL_I16: u16 = 0x8000;
const NULL_U32: u32 = 0xFFFF_0000;
const TIME_PROGRAM_WORDS: u16 = 10;
const TIME_PROGRAM_SLOT_STRIDE: u16 = 70;
const TIME_STEP_MINUTES: u16 = 10;

/// Conversion between raw register words and a domain value.
pub trait Codec {
    type Value;

    /// Number of registers the value occupies.
    fn count(&self) -> u16;

    /// Decode exactly [`count`](Codec::count) words.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the content is not a legal value.
    fn decode(&self, field: &'static str, words: &[u16]) -> Result<Self::Value, ProtocolError>;

    /// Encode a value into [`count`](Codec::count) words.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the value cannot be represented.
    fn encode(&self, field: &'static str, value: &Self::Value) -> Result<Vec<u16>, ProtocolError>;
}

/// A named register field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<C> {
    pub name: &'static str,
    pub address: u16,
    pub codec: C,
}

impl<C: Codec> Field<C> {
    pub const fn new(name: &'static str, address: u16, codec: C) -> Self {
        Self {
            name,
            address,
            codec,
        }
    }

    #[must_use]
    pub fn count(&self) -> u16 {
        self.codec.count()
    }

    /// Decode the words read from [`address`](Field::address).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::WordCount`] when `words` has the wrong
    /// length, or the codec's error for illegal content.
    pub fn decode(&self, words: &[u16]) -> Result<C::Value, ProtocolError> {
        let expected = usize::from(self.count());
        if words.len() != expected {
            return Err(ProtocolError::WordCount {
                field: self.name,
                expected,
                actual: words.len(),
            });
        }
        self.codec.decode(self.name, words)
    }

    /// Encode `value` into the words to write at [`address`](Field::address).
    ///
    /// # Errors
    ///
    /// Returns the codec's error when `value` is not representable.
    pub fn encode(&self, value: &C::Value) -> Result<Vec<u16>, ProtocolError> {
        self.codec.encode(self.name, value)
    }
}

impl<C: Codec + Copy> Field<C> {
    /// The same field inside the register window of `zone_id` (one-based).
    #[must_use]
    pub fn for_zone(&self, zone_id: u8) -> Self {
        Self {
            address: self.address.wrapping_add(zone_offset(zone_id)),
            ..*self
        }
    }
}

impl<C: Codec + Copy> Field<C> {
    /// The same field inside the register window of device instance
    /// `device_id` (zero-based).
    #[must_use]
    pub fn for_device(&self, device_id: u8) -> Self {
        Self {
            address: self
                .address
                .wrapping_add(u16::from(device_id).wrapping_mul(DEVICE_WINDOW)),
            ..*self
        }
    }
}

/// First-register offset of a zone window.
#[must_use]
pub fn zone_offset(zone_id: u8) -> u16 {
    u16::from(zone_id.saturating_sub(1)).wrapping_mul(ZONE_WINDOW)
}

/// Enumerations stored as a code in the low byte of one register.
pub trait RegisterCode: Copy + Sized {
    fn code(self) -> u8;
    fn from_code(code: u8) -> Option<Self>;
}

macro_rules! register_codes {
    ($($name:ident { $($variant:ident = $code:literal),+ $(,)? })+) => {
        $(
            impl RegisterCode for $name {
                fn code(self) -> u8 {
                    match self {
                        $(Self::$variant => $code,)+
                    }
                }

                fn from_code(code: u8) -> Option<Self> {
                    match code {
                        $($code => Some(Self::$variant),)+
                        _ => None,
                    }
                }
            }
        )+
    };
}

register_codes! {
    ZoneMode { Scheduling = 0, Manual = 1, AntiFrost = 2 }
    ScheduleId { Schedule1 = 0, Schedule2 = 1, Schedule3 = 2 }
    HeatingMode { Standby = 0, Heating = 1, Cooling = 2 }
    ZoneTypeCode {
        NotPresent = 0,
        ChOnly = 1,
        ChAndCooling = 2,
        Dhw = 3,
        ProcessHeat = 4,
        SwimmingPool = 5,
        Other = 254,
    }
    ZoneFunction {
        Disabled = 0,
        Direct = 1,
        MixingCircuit = 2,
        SwimmingPool = 3,
        HighTemperature = 4,
        FanConvector = 5,
        DhwTank = 6,
        ElectricalDhwTank = 7,
        TimeProgram = 8,
        ProcessHeat = 9,
        DhwLayered = 10,
        DhwBic = 11,
        DhwCommercialTank = 12,
        DhwPrimary = 254,
    }
    Setpoint { Eco = 0x00, Comfort = 0x10, Away = 0x20, Morning = 0x30, Evening = 0x40 }
    Activity { HeatCool = 0xC8, Dhw = 0x00 }
    BoardType {
        CuGh = 0x00,
        CuOh = 0x01,
        Ehc = 0x02,
        Mk = 0x14,
        Scb = 0x19,
        Eec = 0x1B,
        Gateway = 0x1E,
    }
    SeasonalMode { Winter = 0, WinterFrostProtection = 1, SummerNeutralBand = 2, Summer = 3 }
    ErrorPriority { Locking = 0, Blocking = 3, Warning = 6 }
}

fn low_byte(word: u16) -> u8 {
    word.to_be_bytes()[1]
}

/// Unsigned byte with an upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Byte {
    pub max: u8,
}

impl Codec for Byte {
    type Value = u8;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<u8, ProtocolError> {
        let value = low_byte(words[0]);
        if value > self.max {
            return Err(ProtocolError::OutOfRange {
                field,
                value: f64::from(value),
                min: 0.0,
                max: f64::from(self.max),
            });
        }
        Ok(value)
    }

    fn encode(&self, field: &'static str, value: &u8) -> Result<Vec<u16>, ProtocolError> {
        if *value > self.max {
            return Err(ProtocolError::OutOfRange {
                field,
                value: f64::from(*value),
                min: 0.0,
                max: f64::from(self.max),
            });
        }
        Ok(vec![u16::from(*value)])
    }
}

/// Boolean stored as 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag;

impl Codec for Flag {
    type Value = bool;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<bool, ProtocolError> {
        match low_byte(words[0]) {
            0 => Ok(false),
            1 => Ok(true),
            code => Err(ProtocolError::UnknownCode {
                field,
                code: u16::from(code),
            }),
        }
    }

    fn encode(&self, _field: &'static str, value: &bool) -> Result<Vec<u16>, ProtocolError> {
        Ok(vec![u16::from(*value)])
    }
}

/// Mandatory enumeration code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code<E>(PhantomData<fn() -> E>);

impl<E> Code<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for Code<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RegisterCode> Codec for Code<E> {
    type Value = E;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<E, ProtocolError> {
        let code = low_byte(words[0]);
        E::from_code(code).ok_or(ProtocolError::UnknownCode {
            field,
            code: u16::from(code),
        })
    }

    fn encode(&self, _field: &'static str, value: &E) -> Result<Vec<u16>, ProtocolError> {
        Ok(vec![u16::from(value.code())])
    }
}

/// Enumeration code where `0xFF` means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalCode<E>(PhantomData<fn() -> E>);

impl<E> OptionalCode<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for OptionalCode<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RegisterCode> Codec for OptionalCode<E> {
    type Value = Option<E>;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<Option<E>, ProtocolError> {
        let code = low_byte(words[0]);
        if code == NULL_U8 {
            return Ok(None);
        }
        E::from_code(code)
            .map(Some)
            .ok_or(ProtocolError::UnknownCode {
                field,
                code: u16::from(code),
            })
    }

    fn encode(&self, _field: &'static str, value: &Option<E>) -> Result<Vec<u16>, ProtocolError> {
        Ok(vec![u16::from(value.map_or(NULL_U8, RegisterCode::code))])
    }
}

/// Fixed-point number: `raw / divisor`, with a null sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaled {
    pub signed: bool,
    pub divisor: u16,
    pub min: f64,
    pub max: f64,
}

impl Scaled {
    #[must_use]
    pub const fn unsigned(divisor: u16, min: f64, max: f64) -> Self {
        Self {
            signed: false,
            divisor,
            min,
            max,
        }
    }

    #[must_use]
    pub const fn signed(divisor: u16, min: f64, max: f64) -> Self {
        Self {
            signed: true,
            divisor,
            min,
            max,
        }
    }

    /// Round `value` to the nearest step this field can hold.
    #[must_use]
    pub fn quantize(&self, value: f64) -> f64 {
        let divisor = f64::from(self.divisor);
        (value * divisor).round() / divisor
    }

    fn null(&self) -> u16 {
        if self.signed { NULL_I16 } else { NULL_U16 }
    }

    fn out_of_range(&self, field: &'static str, value: f64) -> ProtocolError {
        ProtocolError::OutOfRange {
            field,
            value,
            min: self.min,
            max: self.max,
        }
    }
}

impl Codec for Scaled {
    type Value = Option<f64>;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<Option<f64>, ProtocolError> {
        let word = words[0];
        if word == self.null() {
            return Ok(None);
        }
        #[allow(clippy::cast_possible_wrap)]
        let raw = if self.signed {
            f64::from(word as i16)
        } else {
            f64::from(word)
        };
        let value = raw / f64::from(self.divisor);
        if value < self.min || value > self.max {
            return Err(self.out_of_range(field, value));
        }
        Ok(Some(value))
    }

    fn encode(&self, field: &'static str, value: &Option<f64>) -> Result<Vec<u16>, ProtocolError> {
        let Some(value) = *value else {
            return Ok(vec![self.null()]);
        };
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(self.out_of_range(field, value));
        }
        let scaled = value * f64::from(self.divisor);
        let raw = scaled.round();
        if (scaled - raw).abs() > 1e-6 {
            return Err(ProtocolError::NotRepresentable {
                field,
                value,
                scale: 1.0 / f64::from(self.divisor),
            });
        }
        // The range check above keeps `raw` within the register width.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let word = if self.signed {
            (raw as i16).cast_unsigned()
        } else {
            raw as u16
        };
        if word == self.null() {
            return Err(self.out_of_range(field, value));
        }
        Ok(vec![word])
    }
}

/// Unsigned word with a null sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    pub null: u16,
}

impl Codec for Word {
    type Value = Option<u16>;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, _field: &'static str, words: &[u16]) -> Result<Option<u16>, ProtocolError> {
        Ok(Some(words[0]).filter(|word| *word != self.null))
    }

    fn encode(&self, field: &'static str, value: &Option<u16>) -> Result<Vec<u16>, ProtocolError> {
        match *value {
            Some(word) if word == self.null => Err(ProtocolError::OutOfRange {
                field,
                value: f64::from(word),
                min: 0.0,
                max: f64::from(self.null) - 1.0,
            }),
            Some(word) => Ok(vec![word]),
            None => Ok(vec![self.null]),
        }
    }
}

/// Unsigned 32-bit value, high word first, with `0xFFFF0000` as null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleWord;

impl Codec for DoubleWord {
    type Value = Option<u32>;

    fn count(&self) -> u16 {
        2
    }

    fn decode(&self, _field: &'static str, words: &[u16]) -> Result<Option<u32>, ProtocolError> {
        let value = (u32::from(words[0]) << 16) | u32::from(words[1]);
        Ok(Some(value).filter(|value| *value != NULL_U32))
    }

    fn encode(&self, field: &'static str, value: &Option<u32>) -> Result<Vec<u16>, ProtocolError> {
        let raw = match *value {
            Some(NULL_U32) => {
                return Err(ProtocolError::NotRepresentable {
                    field,
                    value: f64::from(NULL_U32),
                    scale: 1.0,
                });
            }
            Some(raw) => raw,
            None => NULL_U32,
        };
        let [a, b, c, d] = raw.to_be_bytes();
        Ok(vec![u16::from_be_bytes([a, b]), u16::from_be_bytes([c, d])])
    }
}

/// Board type in the high byte, generation in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board;

impl Codec for Board {
    type Value = BoardCategory;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<BoardCategory, ProtocolError> {
        let [code, generation] = words[0].to_be_bytes();
        let board_type = BoardType::from_code(code).ok_or(ProtocolError::UnknownCode {
            field,
            code: u16::from(code),
        })?;
        Ok(BoardCategory {
            board_type,
            generation,
        })
    }

    fn encode(&self, _field: &'static str, value: &BoardCategory) -> Result<Vec<u16>, ProtocolError> {
        Ok(vec![u16::from_be_bytes([
            value.board_type.code(),
            value.generation,
        ])])
    }
}

/// Major version in the high byte, minor in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision;

impl Codec for Revision {
    type Value = Version;

    fn count(&self) -> u16 {
        1
    }

    fn decode(&self, _field: &'static str, words: &[u16]) -> Result<Version, ProtocolError> {
        let [major, minor] = words[0].to_be_bytes();
        Ok(Version { major, minor })
    }

    fn encode(&self, _field: &'static str, value: &Version) -> Result<Vec<u16>, ProtocolError> {
        Ok(vec![u16::from_be_bytes([value.major, value.minor])])
    }
}

/// ASCII text, two characters per register, high byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Text {
    pub words: u16,
}

impl Codec for Text {
    type Value = String;

    fn count(&self) -> u16 {
        self.words
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<String, ProtocolError> {
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        let text = &bytes[..end];
        if !text.is_ascii() {
            return Err(ProtocolError::InvalidText { field });
        }
        Ok(String::from_utf8_lossy(text).trim_end().to_string())
    }

    fn encode(&self, field: &'static str, value: &String) -> Result<Vec<u16>, ProtocolError> {
        let capacity = usize::from(self.words) * 2;
        if !value.is_ascii() || value.len() > capacity || value.contains('\0') {
            return Err(ProtocolError::InvalidText { field });
        }
        let mut bytes = value.as_bytes().to_vec();
        bytes.resize(capacity, 0);
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }
}

/// One day of a zone time program: a switch point count followed by up to
/// six `(setpoint, activity, time step)` triples, zero padded to 20 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeProgram;

impl Codec for TimeProgram {
    type Value = Vec<SwitchPoint>;

    fn count(&self) -> u16 {
        TIME_PROGRAM_WORDS
    }

    fn decode(&self, field: &'static str, words: &[u16]) -> Result<Vec<SwitchPoint>, ProtocolError> {
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
        let count = usize::from(bytes[0]);
        if count > MAX_SWITCH_POINTS {
            return Err(ProtocolError::TooManySwitchPoints {
                count,
                max: MAX_SWITCH_POINTS,
            });
        }
        bytes[1..]
            .chunks_exact(3)
            .take(count)
            .map(|chunk| {
                let setpoint =
                    Setpoint::from_code(chunk[0]).ok_or(ProtocolError::UnknownCode {
                        field,
                        code: u16::from(chunk[0]),
                    })?;
                let activity =
                    Activity::from_code(chunk[1]).ok_or(ProtocolError::UnknownCode {
                        field,
                        code: u16::from(chunk[1]),
                    })?;
                let minute = u16::from(chunk[2]) * TIME_STEP_MINUTES;
                if minute >= MINUTES_PER_DAY {
                    return Err(ProtocolError::InvalidSwitchTime { minute });
                }
                Ok(SwitchPoint {
                    minute,
                    setpoint,
                    activity,
                })
            })
            .collect()
    }

    fn encode(
        &self,
        _field: &'static str,
        value: &Vec<SwitchPoint>,
    ) -> Result<Vec<u16>, ProtocolError> {
        let too_many = || ProtocolError::TooManySwitchPoints {
            count: value.len(),
            max: MAX_SWITCH_POINTS,
        };
        if value.len() > MAX_SWITCH_POINTS {
            return Err(too_many());
        }
        let mut bytes = Vec::with_capacity(usize::from(TIME_PROGRAM_WORDS) * 2);
        bytes.push(u8::try_from(value.len()).map_err(|_| too_many())?);
        for point in value {
            if point.minute >= MINUTES_PER_DAY || point.minute % TIME_STEP_MINUTES != 0 {
                return Err(ProtocolError::InvalidSwitchTime {
                    minute: point.minute,
                });
            }
            #[allow(clippy::cast_possible_truncation)]
            let step = (point.minute / TIME_STEP_MINUTES) as u8;
            bytes.extend([point.setpoint.code(), point.activity.code(), step]);
        }
        bytes.resize(usize::from(TIME_PROGRAM_WORDS) * 2, 0);
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }
}

pub const NUMBER_OF_DEVICES: Field<Byte> = Field::new("number_of_devices", 128, Byte { max: 0xFE });
pub const NUMBER_OF_ZONES: Field<Byte> = Field::new("number_of_zones", 189, Byte { max: MAX_ZONES });
pub const OUTSIDE_TEMPERATURE: Field<Scaled> =
    Field::new("outside_temperature", 384, Scaled::signed(100, -60.0, 80.0));
pub const COOLING_FORCED: Field<Flag> = Field::new("cooling_forced", 503, Flag);

pub const CURRENT_ERROR: Field<Word> = Field::new("current_error", 277, Word { null: 0xFF00 });
pub const ERROR_PRIORITY: Field<OptionalCode<ErrorPriority>> =
    Field::new("error_priority", 278, OptionalCode::new());
pub const APPLIANCE_STATUS_1: Field<Byte> = Field::new("appliance_status_1", 279, Byte { max: 0xFF });
pub const APPLIANCE_STATUS_2: Field<Byte> = Field::new("appliance_status_2", 280, Byte { max: 0xFF });
pub const SEASON_MODE: Field<Code<SeasonalMode>> = Field::new("season_mode", 385, Code::new());

pub const DEVICE_BOARD: Field<Board> = Field::new("device_board", 129, Board);
pub const DEVICE_SW_VERSION: Field<Revision> = Field::new("device_sw_version", 130, Revision);
pub const DEVICE_HW_VERSION: Field<Revision> = Field::new("device_hw_version", 132, Revision);
pub const DEVICE_ARTICLE_NUMBER: Field<DoubleWord> =
    Field::new("device_article_number", 133, DoubleWord);

pub const ZONE_TYPE: Field<Code<ZoneTypeCode>> = Field::new("zone_type", 640, Code::new());
pub const ZONE_FUNCTION: Field<Code<ZoneFunction>> = Field::new("zone_function", 641, Code::new());
pub const ZONE_SHORT_NAME: Field<Text> = Field::new("zone_short_name", 642, Text { words: 3 });
pub const ZONE_MODE: Field<Code<ZoneMode>> = Field::new("zone_mode", 649, Code::new());
pub const ROOM_MANUAL_SETPOINT: Field<Scaled> =
    Field::new("room_manual_setpoint", 664, Scaled::unsigned(10, 6.0, 30.0));
pub const DHW_COMFORT_SETPOINT: Field<Scaled> =
    Field::new("dhw_comfort_setpoint", 665, Scaled::unsigned(100, 10.0, 65.0));
pub const DHW_REDUCED_SETPOINT: Field<Scaled> =
    Field::new("dhw_reduced_setpoint", 666, Scaled::unsigned(100, 10.0, 65.0));
pub const DHW_CALORIFIER_HYSTERESIS: Field<Scaled> =
    Field::new("dhw_calorifier_hysteresis", 686, Scaled::unsigned(100, 0.0, 40.0));
pub const SELECTED_TIME_PROGRAM: Field<OptionalCode<ScheduleId>> =
    Field::new("selected_time_program", 688, OptionalCode::new());
pub const ROOM_TEMPERATURE: Field<Scaled> =
    Field::new("room_temperature", 1104, Scaled::signed(10, -50.0, 100.0));
pub const HEATING_MODE: Field<OptionalCode<HeatingMode>> =
    Field::new("heating_mode", 1109, OptionalCode::new());
pub const PUMP_RUNNING: Field<Flag> = Field::new("pump_running", 1110, Flag);
pub const DHW_TANK_TEMPERATURE: Field<Scaled> =
    Field::new("dhw_tank_temperature", 1119, Scaled::signed(100, -50.0, 120.0));

const TIME_PROGRAM_BASE: u16 = 689;

/// The day program register block of a zone's schedule slot.
#[must_use]
pub fn time_program(zone_id: u8, schedule: ScheduleId, weekday: Weekday) -> Field<TimeProgram> {
    #[allow(clippy::cast_possible_truncation)]
    let day = weekday.num_days_from_monday() as u16;
    let address = TIME_PROGRAM_BASE
        + u16::from(schedule.index()) * TIME_PROGRAM_SLOT_STRIDE
        + day * TIME_PROGRAM_WORDS;
    Field::new("time_program", address, TimeProgram).for_zone(zone_id)
}
