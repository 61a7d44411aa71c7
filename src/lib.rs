pub mod config;
pub mod dsp;
pub mod graph; // Per-voice nodes and the control-side patch runtime
pub mod io;
pub mod synth; // Voice allocation, render loop, message vocabulary

pub use config::EngineConfig;

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Upper bound on polyphony. Render-domain state is pre-sized to this.
pub const MAX_VOICES: usize = 32;

/// Upper bound on envelope phases carried in a single params message.
pub const MAX_PHASES: usize = 16;
