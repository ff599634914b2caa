#![allow(dead_code)]

pub use solis_gateway::prelude::*;
use solis_gateway::solis::packet::{FOOTER_LEN, HEADER_LEN};

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;

impl Factory {
    pub const SERIAL: &'static str = "110CD22170500290";
    pub const LOGGER_SERIAL: u32 = 0x1150_0590;
    pub const TIMESTAMP: u32 = 1_700_000_000;
    pub const DATA_FRAME_LEN: usize = 248;

    pub fn heartbeat() -> Frame {
        Self::heartbeat_for(Self::LOGGER_SERIAL, 0x07)
    }

    pub fn heartbeat_for(logger_serial: u32, req_index: u8) -> Frame {
        let payload = [0x02, 0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38];
        Frame::encode(0x00, 0x41, 0x00, req_index, logger_serial, &payload).unwrap()
    }

    pub fn unknown(msg_type: u8) -> Frame {
        Frame::encode(0x00, msg_type, 0x00, 0x03, Self::LOGGER_SERIAL, &[0x05, 0x00, 0x00]).unwrap()
    }

    pub fn data(timestamp: u32, serial: &str) -> Frame {
        Self::data_with(timestamp, serial, 2980, -1362)
    }

    /// A data frame laid out like a real logger's, with reserved spans
    /// filled with `filler`.
    pub fn data_filled(timestamp: u32, serial: &str, filler: u8) -> Frame {
        let raw = Self::data_bytes(timestamp, serial, 2980, -1362, filler);
        Self::frame_from(&raw)
    }

    pub fn data_with(
        timestamp: u32,
        serial: &str,
        solar_active_power: u32,
        export_active_power: i32,
    ) -> Frame {
        let raw = Self::data_bytes(timestamp, serial, solar_active_power, export_active_power, 0);
        Self::frame_from(&raw)
    }

    fn frame_from(raw: &[u8]) -> Frame {
        Frame::encode(
            0x00,
            0x42,
            0x00,
            0x08,
            Self::LOGGER_SERIAL,
            &raw[HEADER_LEN..raw.len() - FOOTER_LEN],
        )
        .unwrap()
    }

    fn data_bytes(
        timestamp: u32,
        serial: &str,
        solar_active_power: u32,
        export_active_power: i32,
        filler: u8,
    ) -> Vec<u8> {
        let mut raw = vec![filler; Self::DATA_FRAME_LEN];
        raw[HEADER_LEN] = 0x01;

        let mut serial_bytes = [b' '; 16];
        serial_bytes[..serial.len()].copy_from_slice(serial.as_bytes());

        put(&mut raw, 22, &timestamp.to_le_bytes());
        put(&mut raw, 32, &serial_bytes);
        put(&mut raw, 48, &623u16.to_le_bytes()); // 62.3 °C
        put(&mut raw, 50, &2828u16.to_le_bytes()); // 282.8 V
        put(&mut raw, 52, &1500u16.to_le_bytes()); // 150.0 V
        put(&mut raw, 54, &108u16.to_le_bytes()); // 10.8 A
        put(&mut raw, 56, &0u16.to_le_bytes());
        put(&mut raw, 62, &131u16.to_le_bytes()); // 13.1 A
        put(&mut raw, 68, &2275u16.to_le_bytes()); // 227.5 V
        put(&mut raw, 70, &4997u16.to_le_bytes()); // 49.97 Hz
        put(&mut raw, 72, &solar_active_power.to_le_bytes());
        put(&mut raw, 76, &1320u32.to_le_bytes()); // 13.2 kWh
        put(&mut raw, 116, &3054u32.to_le_bytes());
        put(&mut raw, 120, &70u32.to_le_bytes());
        put(&mut raw, 128, &225u16.to_le_bytes()); // 22.5 kWh
        put(&mut raw, 130, &1234u32.to_le_bytes());
        put(&mut raw, 142, &2990u32.to_le_bytes());
        put(&mut raw, 182, &export_active_power.to_le_bytes());
        put(&mut raw, 214, &1618u32.to_le_bytes());

        raw
    }
}

fn put(raw: &mut [u8], offset: usize, bytes: &[u8]) {
    raw[offset..offset + bytes.len()].copy_from_slice(bytes);
}
