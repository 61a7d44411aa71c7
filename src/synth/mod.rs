// Purpose: voice management and the render loop
// The allocator lives in the control domain; PolySynth is the render domain.

pub mod allocator;
pub mod message;
pub mod meter;
pub mod poly;

pub use allocator::{AllocationState, RuntimeSnapshot, VoiceAllocator};
pub use poly::PolySynth;
