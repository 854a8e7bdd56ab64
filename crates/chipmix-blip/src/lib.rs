//! Band-limited accumulation buffer built on Shay Green's blip_buf (1.1.0).
//!
//! The buffer takes clock-tagged amplitude deltas from a sound chip and
//! produces 16-bit PCM at the host sample rate. On top of the stock
//! blip_buf behaviour it carries the knobs a tracker mixer needs:
//! - fallible sizing from a sample rate and a buffered duration,
//! - an adjustable bass (low-cut) integrator leak,
//! - a treble damping shelf ([`TrebleEq`]).

mod blip;
mod eq;

pub use blip::{BlipBuf, BlipError, MAX_BUFFER_SAMPLES, MAX_DELTA};
pub use eq::TrebleEq;

#[cfg(test)]
mod tests;
