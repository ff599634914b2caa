use crate::solis::telemetry::TelemetryReading;

/// Receives every decoded reading, once per valid data frame.
///
/// Called from whichever session task decoded the frame, so implementations
/// must cope with concurrent calls from several loggers.
pub trait TelemetrySink: Send + Sync {
    fn on_telemetry(&self, reading: TelemetryReading);
}

impl<F> TelemetrySink for F
where
    F: Fn(TelemetryReading) + Send + Sync,
{
    fn on_telemetry(&self, reading: TelemetryReading) {
        self(reading)
    }
}
