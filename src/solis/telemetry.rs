use crate::prelude::*;

use nom_derive::{Nom, Parse};
use serde::Serialize;

// {{{ TelemetryReading
/// Inverter telemetry carried by a data frame.
///
/// Parsing starts at the timestamp (absolute frame offset 22); the offsets in
/// the field comments are absolute within the frame. Spans marked reserved
/// are not understood and are skipped rather than guessed at.
#[derive(Clone, Debug, PartialEq, Serialize, Nom)]
#[nom(LittleEndian)]
pub struct TelemetryReading {
    pub timestamp: u32, // 22

    #[nom(SkipBefore(6))] // reserved 26..32
    #[nom(Parse = "Utils::ascii_serial")]
    pub serial_number: String, // 32, 16 bytes

    #[nom(Parse = "Utils::le_u16_div10")]
    pub inverter_temperature: f64, // 48, °C
    #[nom(Parse = "Utils::le_u16_div10")]
    pub dc_voltage_1: f64, // 50, V
    #[nom(Parse = "Utils::le_u16_div10")]
    pub dc_voltage_2: f64, // 52, V
    #[nom(Parse = "Utils::le_u16_div10")]
    pub dc_current_1: f64, // 54, A
    #[nom(Parse = "Utils::le_u16_div10")]
    pub dc_current_2: f64, // 56, A

    #[nom(SkipBefore(4))] // reserved 58..62
    #[nom(Parse = "Utils::le_u16_div10")]
    pub solar_ac_current: f64, // 62, A

    #[nom(SkipBefore(4))] // reserved 64..68
    #[nom(Parse = "Utils::le_u16_div10")]
    pub ac_voltage: f64, // 68, V
    #[nom(Parse = "Utils::le_u16_div100")]
    pub ac_frequency: f64, // 70, Hz

    pub solar_active_power: u32, // 72, W
    #[nom(Parse = "Utils::le_u32_div100")]
    pub solar_active_energy_today: f64, // 76, kWh

    #[nom(SkipBefore(36))] // reserved 80..116
    pub dc_power: u32, // 116, W
    pub solar_active_energy_this_month: u32, // 120, kWh

    #[nom(SkipBefore(4))] // reserved 124..128
    #[nom(Parse = "Utils::le_u16_div10")]
    pub solar_active_energy_yesterday: f64, // 128, kWh
    pub solar_active_energy_total: u32, // 130, kWh

    #[nom(SkipBefore(8))] // reserved 134..142
    pub solar_apparent_power: u32, // 142, W

    // 194 seems to repeat this value
    #[nom(SkipBefore(36))] // reserved 146..182
    pub export_active_power: i32, // 182, W, negative when importing

    // 226 seems to repeat this value
    #[nom(SkipBefore(28))] // reserved 186..214
    pub load_apparent_power: u32, // 214, W
}

impl TelemetryReading {
    pub const TIMESTAMP_OFFSET: usize = 22;
    /// A data frame must reach at least the end of `load_apparent_power`.
    pub const MIN_FRAME_LEN: usize = 218;

    /// Decodes a data frame.
    ///
    /// Returns `Ok(None)` when the logger sent a placeholder with a zero
    /// timestamp; those carry no usable values and are dropped.
    pub fn decode(frame: &Frame) -> Result<Option<Self>> {
        if frame.kind() != MessageKind::Data {
            bail!("TelemetryReading::decode called on a {:?} frame", frame.kind());
        }

        let raw = frame.bytes();
        if raw.len() < Self::MIN_FRAME_LEN {
            bail!(
                "data frame too short for telemetry: {} bytes, need {}",
                raw.len(),
                Self::MIN_FRAME_LEN
            );
        }

        let reading = match Self::parse(&raw[Self::TIMESTAMP_OFFSET..]) {
            Ok((_, r)) => r,
            Err(e) => bail!("failed to parse telemetry: {:?}", e),
        };

        if reading.timestamp == 0 {
            debug!(
                "data frame from {} has a zero timestamp, ignoring it",
                reading.serial_number
            );
            return Ok(None);
        }

        Ok(Some(reading))
    }

    /// Serial number as used for keying, lower-cased.
    pub fn inverter_id(&self) -> String {
        self.serial_number.to_lowercase()
    }

    pub fn time(&self) -> Option<UnixTime> {
        UnixTime::from_timestamp(self.timestamp)
    }

    pub fn grid_net_power(&self) -> i32 {
        self.export_active_power
    }

    pub fn grid_export_power(&self) -> i64 {
        i64::from(self.export_active_power).max(0)
    }

    pub fn grid_import_power(&self) -> i64 {
        (-i64::from(self.export_active_power)).max(0)
    }

    /// What the house is drawing: generation minus what goes to the grid.
    pub fn load_active_power(&self) -> i64 {
        i64::from(self.solar_active_power) - i64::from(self.export_active_power)
    }

    /// Field name to value, including derived power figures.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("load_active_power".to_string(), self.load_active_power().into());
            map.insert("grid_net_power".to_string(), self.grid_net_power().into());
            map.insert("grid_export_power".to_string(), self.grid_export_power().into());
            map.insert("grid_import_power".to_string(), self.grid_import_power().into());
        }
        Ok(value)
    }
}
// }}}
