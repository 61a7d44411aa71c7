use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::{
    dsp::envelope::{EnvelopeEngine, EnvelopeParams, EnvelopeStage},
    graph::{
        events::{EventSink, VoiceEvent},
        node::{ConsumerId, PortAddress},
    },
    synth::{
        allocator::VoiceAllocator,
        message::{EnvelopeMessage, EnvelopeNotification, MessageReceiver, MessageSender},
    },
    MAX_VOICES,
};

/// Render-domain half of an envelope node: the engine plus its queues.
pub struct EnvNode {
    engine: EnvelopeEngine,
    rx: Consumer<EnvelopeMessage>,
    notify: Producer<EnvelopeNotification>,
}

/// Control-domain half: turns gate events into envelope messages and
/// keeps the allocator holds in step with the render side.
pub struct EnvelopeHandle {
    tx: Producer<EnvelopeMessage>,
    notifications: Consumer<EnvelopeNotification>,
    consumer_id: ConsumerId,
    /// Gate port this envelope listens to; `None` once disconnected.
    source: Option<PortAddress>,
    generations: [u32; MAX_VOICES],
    held: [bool; MAX_VOICES],
}

impl EnvNode {
    /// Create an envelope node and the handle that controls it.
    ///
    /// `address` is the node's own gate input; holds are registered under
    /// its consumer id.
    pub fn new(
        sample_rate: f32,
        params: EnvelopeParams,
        address: &PortAddress,
        queue_capacity: usize,
    ) -> (Self, EnvelopeHandle) {
        let (tx, rx) = RingBuffer::<EnvelopeMessage>::new(queue_capacity);
        let (notify, notifications) = RingBuffer::<EnvelopeNotification>::new(queue_capacity);

        let node = Self {
            engine: EnvelopeEngine::new(sample_rate, params),
            rx,
            notify,
        };
        let handle = EnvelopeHandle {
            tx,
            notifications,
            consumer_id: address.consumer_id(),
            source: None,
            generations: [0; MAX_VOICES],
            held: [false; MAX_VOICES],
        };
        (node, handle)
    }

    /// Apply every pending control message, in order, and retry any
    /// completions that did not fit in the notification queue last time.
    pub fn drain_messages(&mut self) {
        self.engine.flush_notifications(&mut self.notify);
        while let Some(msg) = MessageReceiver::pop(&mut self.rx) {
            self.engine.apply(msg);
        }
    }

    /// Whether `voice` is in its force-release fade.
    pub fn is_fading(&self, voice: usize) -> bool {
        self.engine.stage(voice) == EnvelopeStage::ForceRelease
    }

    #[inline]
    pub fn process(&mut self, voice: usize) -> f32 {
        self.engine.process(voice, &mut self.notify)
    }

    #[inline]
    pub fn advance(&mut self) {
        self.engine.advance();
    }

    /// Render one voice into `out`, draining messages first.
    pub fn render_voice(&mut self, voice: usize, out: &mut [f32]) {
        self.drain_messages();
        self.engine.render(voice, out, &mut self.notify);
    }

    pub fn is_active(&self, voice: usize) -> bool {
        self.engine.is_active(voice)
    }

    pub fn level(&self, voice: usize) -> f32 {
        self.engine.level(voice)
    }

    pub fn stage(&self, voice: usize) -> EnvelopeStage {
        self.engine.stage(voice)
    }

    pub fn engine(&self) -> &EnvelopeEngine {
        &self.engine
    }
}

impl EnvelopeHandle {
    pub fn consumer_id(&self) -> &ConsumerId {
        &self.consumer_id
    }

    /// Wire this envelope's gate input to `source`.
    pub fn connect(&mut self, source: PortAddress) {
        self.source = Some(source);
    }

    /// False once the gate connection is gone; events are then ignored.
    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_listening_to(&self, source: &PortAddress) -> bool {
        self.source.as_ref() == Some(source)
    }

    /// Unwire and drop every hold this envelope has on `allocator`.
    pub fn disconnect<S: EventSink>(&mut self, allocator: &mut VoiceAllocator<S>) {
        self.source = None;
        self.held = [false; MAX_VOICES];
        allocator.consumer_disconnected(&self.consumer_id);
    }

    /// React to a gate-port event: hold on gate-on, forward to the render side.
    pub fn on_event<S: EventSink>(
        &mut self,
        event: VoiceEvent,
        allocator: &mut VoiceAllocator<S>,
    ) -> Result<(), PushError<EnvelopeMessage>> {
        if !self.is_connected() {
            return Ok(());
        }
        let voice = event.voice();
        let slot = voice as usize;
        if slot >= MAX_VOICES {
            return Ok(());
        }

        match event {
            VoiceEvent::Gate { on: true, .. } => {
                let generation = self.generations[slot].wrapping_add(1);
                self.generations[slot] = generation;
                allocator.hold(voice, &self.consumer_id);
                self.held[slot] = true;

                let sent = self.send(EnvelopeMessage::Gate {
                    voice,
                    on: true,
                    generation,
                });
                if sent.is_err() {
                    // The envelope will never start, so it will never finish either.
                    self.held[slot] = false;
                    allocator.release(voice, &self.consumer_id);
                }
                sent
            }
            VoiceEvent::Gate { on: false, .. } => self.send(EnvelopeMessage::Gate {
                voice,
                on: false,
                generation: self.generations[slot],
            }),
            VoiceEvent::ForceRelease { .. } => {
                // The allocator already cleared the hold.
                self.held[slot] = false;
                self.send(EnvelopeMessage::ForceRelease { voice })
            }
        }
    }

    /// Drain render-side notifications, releasing holds whose tails finished.
    ///
    /// Completions from an older gate-on than the latest one are stale and
    /// ignored.
    pub fn poll<S: EventSink>(&mut self, allocator: &mut VoiceAllocator<S>) -> usize {
        let mut released = 0;
        while let Some(note) = MessageReceiver::pop(&mut self.notifications) {
            let EnvelopeNotification::ReleaseComplete { voice, generation } = note;
            let slot = voice as usize;
            if slot >= MAX_VOICES || !self.held[slot] || self.generations[slot] != generation {
                log::trace!("ignoring stale release of voice {voice} ({generation})");
                continue;
            }
            self.held[slot] = false;
            allocator.release(voice, &self.consumer_id);
            released += 1;
        }
        released
    }

    pub fn set_params(&mut self, params: EnvelopeParams) -> Result<(), PushError<EnvelopeMessage>> {
        self.send(EnvelopeMessage::Params(params))
    }

    /// Fade every voice of this envelope. Holds are forgotten; the caller is
    /// expected to force-release the allocator side as well.
    pub fn release_all(&mut self) -> Result<(), PushError<EnvelopeMessage>> {
        self.held = [false; MAX_VOICES];
        self.send(EnvelopeMessage::ReleaseAll)
    }

    pub fn is_holding(&self, voice: u32) -> bool {
        self.held.get(voice as usize).copied().unwrap_or(false)
    }

    fn send(&mut self, msg: EnvelopeMessage) -> Result<(), PushError<EnvelopeMessage>> {
        let result = self.tx.send(msg);
        if result.is_err() {
            log::warn!("envelope queue for {} full, dropped {:?}", self.consumer_id, msg);
        }
        result
    }
}
