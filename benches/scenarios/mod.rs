//! Benchmarks for complete patches and control-domain bookkeeping.

mod allocator;
mod voices;

pub use allocator::bench_allocator;
pub use voices::bench_voices;
