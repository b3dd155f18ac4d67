//! Register content of the simulated appliance.

use chrono::Weekday;

use thermohub_domain::appliance::{BoardCategory, BoardType, SeasonalMode, Version};
use thermohub_domain::error::ProtocolError;
use thermohub_domain::register::{
    self, APPLIANCE_STATUS_1, APPLIANCE_STATUS_2, COOLING_FORCED, CURRENT_ERROR, Codec,
    DEVICE_ARTICLE_NUMBER, DEVICE_BOARD, DEVICE_HW_VERSION, DEVICE_SW_VERSION,
    DHW_CALORIFIER_HYSTERESIS, DHW_COMFORT_SETPOINT, DHW_REDUCED_SETPOINT, DHW_TANK_TEMPERATURE,
    ERROR_PRIORITY, Field, HEATING_MODE, NUMBER_OF_DEVICES, NUMBER_OF_ZONES, OUTSIDE_TEMPERATURE,
    PUMP_RUNNING, ROOM_MANUAL_SETPOINT, ROOM_TEMPERATURE, SEASON_MODE, SELECTED_TIME_PROGRAM,
    ZONE_FUNCTION, ZONE_MODE, ZONE_SHORT_NAME, ZONE_TYPE,
};
use thermohub_domain::schedule::{Activity, Schedule, ScheduleId, Setpoint};
use thermohub_domain::zone::{HeatingMode, ZoneFunction, ZoneMode, ZoneTypeCode};

use crate::Bank;

pub(crate) const DHW_ZONE: u8 = 1;
pub(crate) const CH_ZONE: u8 = 2;

fn put<C: Codec>(bank: &mut Bank, field: &Field<C>, value: &C::Value) -> Result<(), ProtocolError> {
    let words = field.encode(value)?;
    for (address, word) in (field.address..).zip(words) {
        bank.registers.insert(address, word);
    }
    Ok(())
}

/// Heat pump mainboard and GTW-08 gateway, as `(board, generation, sw, hw, article)`.
const DEVICES: [(BoardType, u8, (u8, u8), (u8, u8), u32); 2] = [
    (BoardType::Ehc, 4, (5, 3), (1, 0), 7_722_144),
    (BoardType::Gateway, 8, (1, 4), (2, 1), 7_696_412),
];

/// Fill `bank` with a heat pump appliance in winter mode, one DHW zone and
/// one CH zone running their default programs.
pub(crate) fn appliance(bank: &mut Bank) -> Result<(), ProtocolError> {
    put(bank, &NUMBER_OF_DEVICES, &2)?;
    for (id, (board_type, generation, sw, hw, article)) in (0..).zip(DEVICES) {
        let board = BoardCategory {
            board_type,
            generation,
        };
        put(bank, &DEVICE_BOARD.for_device(id), &board)?;
        put(bank, &DEVICE_SW_VERSION.for_device(id), &Version { major: sw.0, minor: sw.1 })?;
        put(bank, &DEVICE_HW_VERSION.for_device(id), &Version { major: hw.0, minor: hw.1 })?;
        put(bank, &DEVICE_ARTICLE_NUMBER.for_device(id), &Some(article))?;
    }
    put(bank, &CURRENT_ERROR, &None)?;
    put(bank, &ERROR_PRIORITY, &None)?;
    // Heat pump on, main pump on, CH active.
    put(bank, &APPLIANCE_STATUS_1, &0b0000_0010)?;
    put(bank, &APPLIANCE_STATUS_2, &0b0010_0001)?;
    put(bank, &SEASON_MODE, &SeasonalMode::Winter)?;

    put(bank, &NUMBER_OF_ZONES, &CH_ZONE)?;
    put(bank, &OUTSIDE_TEMPERATURE, &Some(12.5))?;
    put(bank, &COOLING_FORCED, &false)?;

    let dhw = DHW_ZONE;
    put(bank, &ZONE_TYPE.for_zone(dhw), &ZoneTypeCode::Dhw)?;
    put(bank, &ZONE_FUNCTION.for_zone(dhw), &ZoneFunction::DhwPrimary)?;
    put(bank, &ZONE_SHORT_NAME.for_zone(dhw), &"DHW".to_string())?;
    put(bank, &ZONE_MODE.for_zone(dhw), &ZoneMode::Scheduling)?;
    put(bank, &SELECTED_TIME_PROGRAM.for_zone(dhw), &Some(ScheduleId::Schedule1))?;
    put(bank, &DHW_COMFORT_SETPOINT.for_zone(dhw), &Some(55.0))?;
    put(bank, &DHW_REDUCED_SETPOINT.for_zone(dhw), &Some(40.0))?;
    put(bank, &DHW_CALORIFIER_HYSTERESIS.for_zone(dhw), &Some(5.0))?;
    put(bank, &DHW_TANK_TEMPERATURE.for_zone(dhw), &Some(47.3))?;
    put(bank, &ROOM_MANUAL_SETPOINT.for_zone(dhw), &None)?;
    put(bank, &ROOM_TEMPERATURE.for_zone(dhw), &None)?;
    put(bank, &HEATING_MODE.for_zone(dhw), &Some(HeatingMode::Standby))?;
    put(bank, &PUMP_RUNNING.for_zone(dhw), &false)?;

    let ch = CH_ZONE;
    put(bank, &ZONE_TYPE.for_zone(ch), &ZoneTypeCode::ChOnly)?;
    put(bank, &ZONE_FUNCTION.for_zone(ch), &ZoneFunction::MixingCircuit)?;
    put(bank, &ZONE_SHORT_NAME.for_zone(ch), &"CIRCA1".to_string())?;
    put(bank, &ZONE_MODE.for_zone(ch), &ZoneMode::Scheduling)?;
    put(bank, &SELECTED_TIME_PROGRAM.for_zone(ch), &Some(ScheduleId::Schedule1))?;
    put(bank, &ROOM_MANUAL_SETPOINT.for_zone(ch), &Some(20.0))?;
    put(bank, &ROOM_TEMPERATURE.for_zone(ch), &Some(19.5))?;
    put(bank, &DHW_COMFORT_SETPOINT.for_zone(ch), &None)?;
    put(bank, &DHW_REDUCED_SETPOINT.for_zone(ch), &None)?;
    put(bank, &DHW_TANK_TEMPERATURE.for_zone(ch), &None)?;
    put(bank, &HEATING_MODE.for_zone(ch), &Some(HeatingMode::Heating))?;
    put(bank, &PUMP_RUNNING.for_zone(ch), &true)?;

    for weekday in WEEK {
        for schedule in ScheduleId::ALL {
            put(
                bank,
                &register::time_program(dhw, schedule, weekday),
                &morning_and_evening(schedule, weekday, Activity::Dhw).switch_points(),
            )?;
            put(
                bank,
                &register::time_program(ch, schedule, weekday),
                &morning_and_evening(schedule, weekday, Activity::HeatCool).switch_points(),
            )?;
        }
    }
    Ok(())
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Comfort from 06:00 to 08:00 and from 17:00 to 22:00.
fn morning_and_evening(schedule: ScheduleId, weekday: Weekday, activity: Activity) -> Schedule {
    let mut hourly = [Setpoint::Eco; 24];
    for hour in (6..8).chain(17..22) {
        hourly[hour] = Setpoint::Comfort;
    }
    Schedule::from_hourly(schedule, weekday, activity, &hourly)
}
