// src/lib.rs
//
// serial-link: minimal half-duplex serial transport for RTS-gated devices.
//
// The attached target multiplexes one 9600 baud 8N1 line in both
// directions and watches the host's RTS pin to know who is talking: RTS
// low while the host transmits, RTS high while it is ready to receive.
// This crate owns that handshake and exposes plain byte-oriented blocking
// reads and writes on an owned port handle. Protocol framing, command
// sets, and device management live above it.

#[macro_use]
mod logging;

pub mod link;

pub use link::{
    list_ports, LinkConfig, LinkError, Parity, PortInfo, ReadOutcome, SerialLink, TimingPolicy,
    WriteOutcome,
};
