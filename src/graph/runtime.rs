use std::sync::Arc;

use rtrb::{Producer, PushError, RingBuffer};

use crate::{
    config::EngineConfig,
    dsp::{
        envelope::EnvelopeParams,
        limiter::{Limiter, LimiterParams},
        oscillator::Waveform,
    },
    graph::{
        envelope::{EnvNode, EnvelopeHandle},
        events::DispatchedEvent,
        lfo::LfoNode,
        node::{ConsumerId, GraphId, PortAddress, Processor},
        oscillator::OscNode,
    },
    io::{
        converter::{MidiOutcome, MidiToCv},
        midi::MidiEvent,
    },
    synth::{
        allocator::{RuntimeSnapshot, VoiceAllocator},
        message::{CvMessage, EnvelopeMessage, MessageSender},
        meter::VoiceMeters,
        poly::PolySynth,
    },
};

/// Node id of the allocator's gate output.
pub const GATE_NODE: &str = "voices";
/// Port id of the allocator's gate output.
pub const GATE_PORT: &str = "gate";

/*
Patch Runtime
=============

The control-domain half of a patch. Everything that may allocate, log or
make a decision lives here; the render side (`PolySynth`) only executes.

    MIDI ──→ MidiToCv ──→ VoiceAllocator ──→ outbox ──→ EnvelopeHandle ──→ rtrb ──→ EnvNode
                 │                                          ↑                        │
                 └──────── CvMessage (rtrb) ──→ PolySynth    └── ReleaseComplete ←───┘

The allocator dispatches gate events into a `Vec` outbox instead of calling
consumers directly, so it never needs a reference back into the runtime.
After every operation the runtime routes the outbox to the envelope
handles listening on the event's source port, in dispatch order.

CV is staged the same way and pushed only after the envelope messages.
The render loop relies on that order to hold a stolen voice's new note
until its fade has finished.
*/

/// Assembles a processor chain and the runtime that drives it.
///
/// ```
/// use saavy_modular::{
///     dsp::{envelope::EnvelopeParams, oscillator::Waveform},
///     graph::runtime::PatchRuntime,
///     EngineConfig,
/// };
///
/// let (runtime, _synth) = PatchRuntime::builder(EngineConfig::default())
///     .oscillator(Waveform::Saw)
///     .envelope("amp", EnvelopeParams::adsr(5.0, 100.0, 0.6, 300.0))
///     .build();
/// assert_eq!(runtime.snapshot().voices.len(), 8);
/// ```
pub struct PatchBuilder {
    config: EngineConfig,
    graph: GraphId,
    chain: Vec<Processor>,
    envelopes: Vec<EnvelopeHandle>,
    gain: f32,
    limiter: Option<LimiterParams>,
}

impl PatchBuilder {
    pub fn graph(mut self, graph: GraphId) -> Self {
        self.graph = graph;
        self
    }

    pub fn oscillator(mut self, waveform: Waveform) -> Self {
        let node = OscNode::new(waveform, self.config.sample_rate, self.config.reference_hz);
        self.chain.push(node.into());
        self
    }

    pub fn detuned_oscillator(mut self, waveform: Waveform, cents: f32) -> Self {
        let node = OscNode::new(waveform, self.config.sample_rate, self.config.reference_hz)
            .with_detune(cents);
        self.chain.push(node.into());
        self
    }

    /// Add an envelope whose gate input is wired to the allocator.
    pub fn envelope(mut self, node_id: &str, params: EnvelopeParams) -> Self {
        let address = PortAddress::new(self.graph, node_id, GATE_PORT);
        let (node, mut handle) = EnvNode::new(
            self.config.sample_rate,
            params,
            &address,
            self.config.queue_capacity,
        );
        handle.connect(gate_address(self.graph));
        self.chain.push(node.into());
        self.envelopes.push(handle);
        self
    }

    pub fn tremolo(mut self, waveform: Waveform, rate_hz: f32, depth: f32) -> Self {
        let node = LfoNode::tremolo(waveform, rate_hz, depth, self.config.sample_rate);
        self.chain.push(node.into());
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Limit the mixed output.
    pub fn limiter(mut self, params: LimiterParams) -> Self {
        self.limiter = Some(params);
        self
    }

    pub fn build(self) -> (PatchRuntime, PolySynth) {
        let (cv, cv_rx) = RingBuffer::<CvMessage>::new(self.config.queue_capacity);
        let meters = Arc::new(VoiceMeters::new());
        let allocator = VoiceAllocator::new(
            self.config.voice_count,
            gate_address(self.graph),
            Vec::new(),
        );
        log::info!(
            "patch built: {} voices, {} processors, {} envelopes",
            self.config.voice_count,
            self.chain.len(),
            self.envelopes.len()
        );

        let mut synth = PolySynth::new(cv_rx, self.chain)
            .with_gain(self.gain)
            .with_meters(meters.clone());
        if let Some(params) = self.limiter {
            synth = synth.with_limiter(Limiter::new(self.config.sample_rate, params));
        }
        let runtime = PatchRuntime {
            translator: MidiToCv::new(&self.config),
            cv_outbox: Vec::with_capacity(self.config.queue_capacity),
            has_limiter: self.limiter.is_some(),
            config: self.config,
            allocator,
            cv,
            envelopes: self.envelopes,
            meters,
        };
        (runtime, synth)
    }
}

pub struct PatchRuntime {
    config: EngineConfig,
    allocator: VoiceAllocator<Vec<DispatchedEvent>>,
    translator: MidiToCv,
    cv: Producer<CvMessage>,
    /// CV staged until the matching envelope messages are queued.
    cv_outbox: Vec<CvMessage>,
    envelopes: Vec<EnvelopeHandle>,
    meters: Arc<VoiceMeters>,
    has_limiter: bool,
}

impl PatchRuntime {
    /// Start a patch. The config is sanitized first.
    pub fn builder(config: EngineConfig) -> PatchBuilder {
        PatchBuilder {
            config: config.sanitized(),
            graph: GraphId::default(),
            chain: Vec::new(),
            envelopes: Vec::new(),
            gain: 1.0,
            limiter: None,
        }
    }

    /// Translate and apply one MIDI event.
    pub fn handle_midi(&mut self, event: MidiEvent) -> MidiOutcome {
        let outcome = self
            .translator
            .handle(event, &mut self.allocator, &mut self.cv_outbox);
        if outcome == MidiOutcome::AllSoundOff {
            self.panic();
        }
        self.route_events();
        self.flush_cv();
        outcome
    }

    /// Drain render-side notifications. Returns how many holds were released.
    pub fn poll(&mut self) -> usize {
        let mut released = 0;
        for handle in &mut self.envelopes {
            released += handle.poll(&mut self.allocator);
        }
        self.route_events();
        released
    }

    pub fn request_resize(&mut self, voice_count: usize) {
        self.allocator.request_resize(voice_count);
        self.route_events();
    }

    /// Silence everything: force-release every voice and fade every
    /// envelope. Oscillators are parked once their voice's fade is over.
    pub fn panic(&mut self) {
        log::info!("panic: releasing all voices");
        for voice in 0..self.allocator.voice_count() as u32 {
            self.allocator.force_release(voice);
        }
        // ReleaseAll below covers every consumer.
        self.allocator.sink_mut().clear();
        self.translator.reset();

        for handle in &mut self.envelopes {
            let _ = handle.release_all();
        }
        self.cv_outbox.clear();
        for voice in 0..self.allocator.voice_count() as u32 {
            self.cv_outbox.push(CvMessage::Silence { voice });
        }
        self.flush_cv();
    }

    /// Change the output limiter settings. Patches built without a limiter
    /// ignore this.
    pub fn set_limiter_params(&mut self, params: LimiterParams) -> Result<(), PushError<CvMessage>> {
        if !self.has_limiter {
            log::debug!("patch has no limiter, params ignored");
            return Ok(());
        }
        self.cv.send(CvMessage::Limiter(params))
    }

    /// Replace the phases of the envelope registered as `consumer`.
    /// Unknown consumers are ignored.
    pub fn set_envelope_params(
        &mut self,
        consumer: &ConsumerId,
        params: EnvelopeParams,
    ) -> Result<(), PushError<EnvelopeMessage>> {
        match self.envelope_mut(consumer) {
            Some(handle) => handle.set_params(params),
            None => {
                log::debug!("no envelope {consumer}, params ignored");
                Ok(())
            }
        }
    }

    /// Re-wire an envelope's gate input to the allocator.
    pub fn connect_consumer(&mut self, consumer: &ConsumerId) -> bool {
        let source = self.allocator.source().clone();
        match self.envelope_mut(consumer) {
            Some(handle) => {
                handle.connect(source);
                true
            }
            None => false,
        }
    }

    /// Unwire an envelope. Its holds are dropped, which may complete a
    /// pending shrink.
    pub fn disconnect_consumer(&mut self, consumer: &ConsumerId) {
        let Some(index) = self.envelopes.iter().position(|h| h.consumer_id() == consumer) else {
            // Still clear any holds registered under the name.
            self.allocator.consumer_disconnected(consumer);
            return;
        };
        self.envelopes[index].disconnect(&mut self.allocator);
        log::debug!("disconnected {consumer}");
    }

    pub fn is_consumer_connected(&self, consumer: &ConsumerId) -> bool {
        self.envelopes
            .iter()
            .any(|h| h.consumer_id() == consumer && h.is_connected())
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.allocator.snapshot()
    }

    pub fn meters(&self) -> Arc<VoiceMeters> {
        self.meters.clone()
    }

    pub fn allocator(&self) -> &VoiceAllocator<Vec<DispatchedEvent>> {
        &self.allocator
    }

    pub fn translator(&self) -> &MidiToCv {
        &self.translator
    }

    pub fn consumers(&self) -> impl Iterator<Item = &ConsumerId> {
        self.envelopes.iter().map(EnvelopeHandle::consumer_id)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn envelope_mut(&mut self, consumer: &ConsumerId) -> Option<&mut EnvelopeHandle> {
        self.envelopes
            .iter_mut()
            .find(|h| h.consumer_id() == consumer)
    }

    /// Push staged CV to the render side, in order.
    fn flush_cv(&mut self) {
        for msg in self.cv_outbox.drain(..) {
            if self.cv.send(msg).is_err() {
                log::warn!("cv queue full, dropped {msg:?}");
            }
        }
    }

    /// Deliver queued allocator events to every handle listening on their port.
    fn route_events(&mut self) {
        loop {
            let pending = std::mem::take(self.allocator.sink_mut());
            if pending.is_empty() {
                break;
            }
            for DispatchedEvent { source, event } in pending {
                for handle in &mut self.envelopes {
                    if handle.is_listening_to(&source) {
                        // Overflow is logged by the handle.
                        let _ = handle.on_event(event, &mut self.allocator);
                    }
                }
            }
        }
    }
}

fn gate_address(graph: GraphId) -> PortAddress {
    PortAddress::new(graph, GATE_NODE, GATE_PORT)
}
