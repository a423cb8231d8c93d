//! Ferrous Resolver Application Layer
//!
//! Ports the resolution engine depends on or exposes.
pub mod ports;
