//! Benchmarks for low-level DSP primitives.

mod curve;
mod envelope;
mod limiter;
mod oscillator;

pub use curve::bench_curve;
pub use envelope::bench_envelope;
pub use limiter::bench_limiter;
pub use oscillator::bench_oscillator;
