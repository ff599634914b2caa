pub mod forwarder;
pub mod packet;
pub mod packet_decoder;
pub mod session;
pub mod telemetry;
