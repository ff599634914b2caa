use crate::prelude::*;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Debug)]
pub struct InverterState {
    pub latest: TelemetryReading,
    pub readings: u64,
    pub first_seen: UnixTime,
    pub last_seen: UnixTime,
}

/// Keeps the most recent reading for every inverter that has reported,
/// keyed by lower-cased serial number.
///
/// This is the consumer side of the gateway: it is handed to the server as
/// a [`TelemetrySink`] and may be called from many sessions at once.
#[derive(Clone, Debug, Default)]
pub struct InverterRegistry {
    inverters: Arc<Mutex<HashMap<String, InverterState>>>,
}

impl InverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, InverterState>> {
        self.inverters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Known inverter ids, sorted.
    pub fn inverters(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn latest(&self, inverter_id: &str) -> Option<TelemetryReading> {
        self.lock()
            .get(&inverter_id.to_lowercase())
            .map(|s| s.latest.clone())
    }

    pub fn readings(&self, inverter_id: &str) -> u64 {
        self.lock()
            .get(&inverter_id.to_lowercase())
            .map_or(0, |s| s.readings)
    }

    pub fn print_summary(&self) {
        let inverters = self.lock();
        info!("Inverter summary: {} seen", inverters.len());

        let mut ids: Vec<&String> = inverters.keys().collect();
        ids.sort();
        for id in ids {
            let state = &inverters[id];
            info!("  {}:", id);
            info!("    Readings: {}", state.readings);
            info!("    First seen: {}", state.first_seen);
            info!("    Last seen: {}", state.last_seen);
            info!(
                "    Last power: {} W solar, {} W load, {} W to grid",
                state.latest.solar_active_power,
                state.latest.load_active_power(),
                state.latest.grid_net_power()
            );
        }
    }
}

impl TelemetrySink for InverterRegistry {
    fn on_telemetry(&self, reading: TelemetryReading) {
        let inverter_id = reading.inverter_id();

        match reading.to_json() {
            Ok(json) => info!("inverter {}: {}", inverter_id, json),
            Err(e) => warn!("inverter {}: failed to serialize reading: {}", inverter_id, e),
        }

        let now = UnixTime::now();
        match self.lock().entry(inverter_id) {
            Entry::Vacant(entry) => {
                info!("discovered new inverter {}", entry.key());
                entry.insert(InverterState {
                    latest: reading,
                    readings: 1,
                    first_seen: now,
                    last_seen: now,
                });
            }
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                state.latest = reading;
                state.readings += 1;
                state.last_seen = now;
            }
        }
    }
}
