// src/link/mod.rs
//
// Half-duplex serial link: one owned device handle, line settings fixed at
// open time, RTS driven in software as the direction signal.

mod config;
mod error;
mod port;

pub use config::{LinkConfig, Parity, TimingPolicy};
pub use error::LinkError;
pub use port::{list_ports, PortInfo, ReadOutcome, SerialLink, WriteOutcome};
