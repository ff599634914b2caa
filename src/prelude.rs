pub use anyhow::{anyhow, bail, Error, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::broadcast;

pub use crate::config::{self, Config, ConfigWrapper, GatewayConfig};
pub use crate::error::{ForwardError, FrameError};
pub use crate::options::Options;
pub use crate::sink::TelemetrySink;
pub use crate::solis::{
    self,
    forwarder::Forwarder,
    packet::{Frame, FrameHeader, MessageKind, MsgType, ReplyFactory},
    packet_decoder::PacketDecoder,
    telemetry::TelemetryReading,
};
pub use crate::unixtime::UnixTime;
pub use crate::utils::Utils;
