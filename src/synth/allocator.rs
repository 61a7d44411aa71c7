use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    graph::{
        events::{EventSink, VoiceEvent},
        node::{ConsumerId, PortAddress},
    },
    MAX_VOICES,
};

/*
Consumer-Hold Voice Allocation
==============================

The allocator maps notes onto a bounded pool of voice indices. It lives in
the control domain: it may allocate and log, but it never touches render
state. The only thing it shares with the render domain is the voice index.

Vocabulary
----------

  note active   The key is still down.

  hold          A named claim a downstream consumer (an envelope's gate
                input, say) places on a voice while it is still using it.
                A release tail keeps its hold until the tail finishes.

  free          Not note-active AND no holds. Only free voices are handed
                out without stealing.

  releasing     Not note-active but still held: the note ended, its tail
                is still sounding.


Stealing Priority
-----------------

When a note arrives, `allocate()` picks:

    1. the lowest-index free voice
    2. else the releasing voice allocated longest ago   (release order)
    3. else the oldest note-active voice                (allocation order)
    4. else voice 0                                     (bookkeeping desync only)

Steps 2-4 force-release the victim first, which clears its holds and
announces `VoiceEvent::ForceRelease` so consumers fade out instead of
clicking.

The two orders are derived indexes, kept in step with every mutation:

    allocation order   note-active voices, oldest allocation first
    release order      releasing voices, oldest allocation first

Each activation stamps the voice from a monotonic counter, and the release
order is kept sorted by that stamp. A voice whose key went up last but
whose note began first is still the first releasing voice to go.


Resizing
--------

Growing appends free voices immediately. Shrinking is deferred until every
voice in [target, current) is free; until then the state is `Shrinking`
and new notes only land below `target`. Every note_off, release, force
release and consumer disconnect re-checks, and the shrink commits on the
first call that finds the range free.

    Stable(8) ──resize(4), voices 5,6 busy──→ Shrinking(8 → 4)
                                                   │ 5 and 6 freed
                                                   ↓
                                               Stable(4)


Failure Semantics
-----------------

Voice indices arrive asynchronously from a pool that may have shrunk in
the meantime. Every operation on an out-of-range index is a silent no-op.
*/

/// One slot in the polyphony pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    index: u32,
    note_active: bool,
    consumers: BTreeSet<ConsumerId>,
    /// Activation stamp; larger is more recent. Zero if never allocated.
    allocated_at: u64,
}

impl Voice {
    fn new(index: u32) -> Self {
        Self {
            index,
            note_active: false,
            consumers: BTreeSet::new(),
            allocated_at: 0,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn note_active(&self) -> bool {
        self.note_active
    }

    pub fn consumers(&self) -> impl Iterator<Item = &ConsumerId> {
        self.consumers.iter()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn allocated_at(&self) -> u64 {
        self.allocated_at
    }

    pub fn is_free(&self) -> bool {
        !self.note_active && self.consumers.is_empty()
    }

    fn is_releasing(&self) -> bool {
        !self.note_active && !self.consumers.is_empty()
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    Stable {
        voice_count: usize,
    },
    /// Voices in `[target_count, current_count)` are draining.
    Shrinking {
        current_count: usize,
        target_count: usize,
    },
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSnapshot {
    pub index: u32,
    pub note_active: bool,
    pub consumer_count: usize,
}

/// Diagnostic copy of the allocator state for UIs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    pub voices: Vec<VoiceSnapshot>,
    pub allocation_state: AllocationState,
}

impl RuntimeSnapshot {
    pub fn busy_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.note_active || v.consumer_count > 0)
            .count()
    }
}

/// Assigns voice indices to notes with the consumer-hold stealing policy.
///
/// `S` receives force-release announcements (and any gate events the owner
/// routes through [`announce`](Self::announce)).
pub struct VoiceAllocator<S: EventSink> {
    voices: Vec<Voice>,
    allocation_order: Vec<u32>,
    release_order: Vec<u32>,
    /// Last activation stamp handed out.
    clock: u64,
    state: AllocationState,
    /// Gate-output port events are dispatched from.
    source: PortAddress,
    sink: S,
}

impl<S: EventSink> VoiceAllocator<S> {
    pub fn new(voice_count: usize, source: PortAddress, sink: S) -> Self {
        let voice_count = clamp_count(voice_count);
        Self {
            voices: (0..voice_count as u32).map(Voice::new).collect(),
            allocation_order: Vec::with_capacity(voice_count),
            release_order: Vec::with_capacity(voice_count),
            clock: 0,
            state: AllocationState::Stable { voice_count },
            source,
            sink,
        }
    }

    /// Assign a voice to a new note. `None` only when the pool is empty.
    pub fn allocate(&mut self) -> Option<u32> {
        let limit = self.assignable_count();
        if limit == 0 {
            return None;
        }

        if let Some(free) = self.voices[..limit].iter().position(Voice::is_free) {
            let index = free as u32;
            self.activate(index);
            log::debug!("allocated free voice {index}");
            return Some(index);
        }

        let in_range = |v: &u32| (*v as usize) < limit;
        let victim = if let Some(v) = self.release_order.iter().copied().find(in_range) {
            log::debug!("stealing releasing voice {v}");
            v
        } else if let Some(v) = self.allocation_order.iter().copied().find(in_range) {
            log::debug!("stealing active voice {v}");
            v
        } else {
            // Only reachable if the orders fell out of step with the voices.
            log::warn!("allocation order empty with no free voice, stealing voice 0");
            0
        };

        self.force_release(victim);
        self.activate(victim);
        Some(victim)
    }

    /// The note on `voice` ended. It stays allocated until its holds are released.
    pub fn note_off(&mut self, voice: u32) {
        let Some(v) = self.voices.get_mut(voice as usize) else {
            return;
        };

        if v.note_active {
            v.note_active = false;
            let releasing = v.is_releasing();
            remove(&mut self.allocation_order, voice);
            if releasing {
                self.enqueue_release(voice);
            }
        }
        self.check_shrink();
    }

    /// Register a named hold on `voice`.
    pub fn hold(&mut self, voice: u32, consumer: &ConsumerId) {
        let Some(v) = self.voices.get_mut(voice as usize) else {
            return;
        };

        let was_free = v.is_free();
        v.consumers.insert(consumer.clone());
        if was_free {
            self.enqueue_release(voice);
        }
    }

    /// Drop a named hold on `voice`.
    pub fn release(&mut self, voice: u32, consumer: &ConsumerId) {
        let Some(v) = self.voices.get_mut(voice as usize) else {
            return;
        };

        if v.consumers.remove(consumer) && v.is_free() {
            remove(&mut self.release_order, voice);
        }
        self.check_shrink();
    }

    /// Clear the note and every hold on `voice`, telling consumers to fade out
    /// if anything was using it.
    pub fn force_release(&mut self, voice: u32) {
        let Some(v) = self.voices.get_mut(voice as usize) else {
            return;
        };

        let was_busy = !v.is_free();
        v.note_active = false;
        v.consumers.clear();
        remove(&mut self.allocation_order, voice);
        remove(&mut self.release_order, voice);

        if was_busy {
            log::debug!("force releasing voice {voice}");
            self.announce(VoiceEvent::ForceRelease { voice });
        }
        self.check_shrink();
    }

    /// Remove every hold `consumer` has, e.g. after its node was deleted.
    pub fn consumer_disconnected(&mut self, consumer: &ConsumerId) {
        for v in self.voices.iter_mut() {
            if v.consumers.remove(consumer) && v.is_free() {
                remove(&mut self.release_order, v.index);
            }
        }
        self.check_shrink();
    }

    /// Change polyphony. Growing is immediate; shrinking waits for the removed
    /// range to drain. Callers must not assume synchronous completion.
    pub fn request_resize(&mut self, new_count: usize) {
        let new_count = clamp_count(new_count);
        let current = self.voices.len();

        if new_count >= current {
            self.voices
                .extend((current as u32..new_count as u32).map(Voice::new));
            if matches!(self.state, AllocationState::Shrinking { .. }) {
                log::info!("shrink cancelled, voice count {new_count}");
            } else if new_count != current {
                log::info!("voice count grew {current} -> {new_count}");
            }
            self.state = AllocationState::Stable {
                voice_count: new_count,
            };
            return;
        }

        self.state = AllocationState::Shrinking {
            current_count: current,
            target_count: new_count,
        };
        self.check_shrink();
        if let AllocationState::Shrinking { .. } = self.state {
            log::info!("shrinking {current} -> {new_count}, waiting for voices to drain");
        }
    }

    /// Dispatch an event from this allocator's gate port.
    pub fn announce(&mut self, event: VoiceEvent) {
        let source = &self.source;
        self.sink
            .dispatch(source.graph, &source.node_id, &source.port_id, event);
    }

    pub fn is_voice_free(&self, voice: u32) -> bool {
        self.voices
            .get(voice as usize)
            .is_some_and(Voice::is_free)
    }

    pub fn is_note_active(&self, voice: u32) -> bool {
        self.voices
            .get(voice as usize)
            .is_some_and(|v| v.note_active)
    }

    /// Current size of the voice array. Unchanged while a shrink is pending.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn allocation_state(&self) -> AllocationState {
        self.state
    }

    pub fn voice(&self, voice: u32) -> Option<&Voice> {
        self.voices.get(voice as usize)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Note-active voices, oldest first.
    pub fn allocation_order(&self) -> &[u32] {
        &self.allocation_order
    }

    /// Releasing voices, oldest allocation first.
    pub fn release_order(&self) -> &[u32] {
        &self.release_order
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            voices: self
                .voices
                .iter()
                .map(|v| VoiceSnapshot {
                    index: v.index,
                    note_active: v.note_active,
                    consumer_count: v.consumers.len(),
                })
                .collect(),
            allocation_state: self.state,
        }
    }

    pub fn source(&self) -> &PortAddress {
        &self.source
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Voices new notes may land on: all of them, or only those below the
    /// shrink target.
    fn assignable_count(&self) -> usize {
        match self.state {
            AllocationState::Stable { .. } => self.voices.len(),
            AllocationState::Shrinking { target_count, .. } => target_count.min(self.voices.len()),
        }
    }

    fn activate(&mut self, voice: u32) {
        self.clock += 1;
        let v = &mut self.voices[voice as usize];
        v.note_active = true;
        v.allocated_at = self.clock;
        remove(&mut self.release_order, voice);
        remove(&mut self.allocation_order, voice);
        self.allocation_order.push(voice);
    }

    /// Insert `voice` into the release order behind every voice allocated
    /// no later than it.
    fn enqueue_release(&mut self, voice: u32) {
        let stamp = self.voices[voice as usize].allocated_at;
        let voices = &self.voices;
        let at = self
            .release_order
            .partition_point(|&v| voices[v as usize].allocated_at <= stamp);
        self.release_order.insert(at, voice);
    }

    fn check_shrink(&mut self) {
        let AllocationState::Shrinking {
            current_count,
            target_count,
        } = self.state
        else {
            return;
        };

        let end = current_count.min(self.voices.len());
        if !self.voices[target_count.min(end)..end].iter().all(Voice::is_free) {
            return;
        }

        self.voices.truncate(target_count);
        self.allocation_order.retain(|&v| (v as usize) < target_count);
        self.release_order.retain(|&v| (v as usize) < target_count);
        self.state = AllocationState::Stable {
            voice_count: target_count,
        };
        log::info!("shrink complete, voice count {target_count}");
    }
}

fn clamp_count(count: usize) -> usize {
    if count > MAX_VOICES {
        log::warn!("requested {count} voices, clamping to {MAX_VOICES}");
    }
    count.min(MAX_VOICES)
}

fn remove(order: &mut Vec<u32>, voice: u32) {
    order.retain(|&v| v != voice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{events::DispatchedEvent, node::GraphId};

    type TestAllocator = VoiceAllocator<Vec<DispatchedEvent>>;

    fn allocator(voices: usize) -> TestAllocator {
        VoiceAllocator::new(voices, PortAddress::new(GraphId(0), "midi", "gate"), Vec::new())
    }

    fn env() -> ConsumerId {
        ConsumerId::new("env", "gate")
    }

    fn force_releases(alloc: &TestAllocator) -> Vec<u32> {
        alloc
            .sink()
            .iter()
            .filter_map(|d| match d.event {
                VoiceEvent::ForceRelease { voice } => Some(voice),
                _ => None,
            })
            .collect()
    }

    /// The derived orders must always agree with the voice records.
    fn assert_consistent(alloc: &TestAllocator) {
        for v in alloc.voices() {
            let i = v.index();
            assert_eq!(alloc.is_voice_free(i), !v.note_active() && v.consumer_count() == 0);
            assert_eq!(
                alloc.allocation_order().contains(&i),
                v.note_active(),
                "allocation order out of step for voice {i}"
            );
            assert_eq!(
                alloc.release_order().contains(&i),
                !v.note_active() && v.consumer_count() > 0,
                "release order out of step for voice {i}"
            );
        }
        let mut seen = alloc.allocation_order().to_vec();
        seen.extend_from_slice(alloc.release_order());
        let unique: BTreeSet<u32> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len(), "voice listed twice");
    }

    #[test]
    fn allocates_lowest_free_voice_first() {
        let mut alloc = allocator(4);
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));
        alloc.note_off(0);
        assert_eq!(alloc.allocate(), Some(0));
        assert_consistent(&alloc);
        assert!(alloc.sink().is_empty());
    }

    #[test]
    fn priority_free_then_releasing_then_active() {
        let mut alloc = allocator(3);
        let id = env();
        alloc.allocate(); // 0: releasing
        alloc.allocate(); // 1: active
        alloc.allocate(); // 2: freed below
        alloc.hold(0, &id);
        alloc.note_off(0);
        alloc.note_off(2);

        assert_eq!(alloc.allocate(), Some(2), "free voice wins");
        assert_eq!(alloc.allocate(), Some(0), "releasing voice beats active");
        assert_eq!(alloc.allocate(), Some(1), "then the oldest active voice");
        assert_consistent(&alloc);
    }

    #[test]
    fn oldest_releasing_voice_is_stolen_first() {
        let mut alloc = allocator(3);
        let id = env();
        for _ in 0..3 {
            alloc.allocate();
        }
        // Keys go up in a different order than they went down.
        for voice in [2, 0, 1] {
            alloc.hold(voice, &id);
            alloc.note_off(voice);
        }
        assert_eq!(alloc.release_order(), &[0, 1, 2]);
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(force_releases(&alloc), vec![0]);
        assert_consistent(&alloc);
    }

    #[test]
    fn reallocated_voice_moves_to_the_back_of_release_order() {
        let mut alloc = allocator(3);
        let id = env();
        for _ in 0..3 {
            alloc.allocate();
        }
        alloc.note_off(0);
        assert_eq!(alloc.allocate(), Some(0), "free voice, newest stamp");
        assert!(alloc.voice(0).unwrap().allocated_at() > alloc.voice(2).unwrap().allocated_at());

        for voice in [0, 2, 1] {
            alloc.hold(voice, &id);
            alloc.note_off(voice);
        }
        assert_eq!(alloc.release_order(), &[1, 2, 0]);
        assert_eq!(alloc.allocate(), Some(1));
        assert_consistent(&alloc);
    }

    #[test]
    fn active_voices_are_stolen_fifo() {
        let mut alloc = allocator(2);
        alloc.allocate();
        alloc.allocate();
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(force_releases(&alloc), vec![0, 1, 0]);
        assert_consistent(&alloc);
    }

    #[test]
    fn two_voice_pool_scenario() {
        let mut alloc = allocator(2);
        let id = env();
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));

        alloc.hold(0, &id);
        alloc.note_off(0);

        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(force_releases(&alloc), vec![0]);
        let event = &alloc.sink()[0];
        assert_eq!(event.source, PortAddress::new(GraphId(0), "midi", "gate"));
        assert!(alloc.is_note_active(0));
        assert_eq!(alloc.voice(0).unwrap().consumer_count(), 0);
        assert_consistent(&alloc);
    }

    #[test]
    fn stealing_notifies_exactly_once() {
        let mut alloc = allocator(1);
        let a = ConsumerId::from("a:gate");
        let b = ConsumerId::from("b:gate");
        alloc.allocate();
        alloc.hold(0, &a);
        alloc.hold(0, &b);

        alloc.allocate();
        assert_eq!(force_releases(&alloc), vec![0]);
    }

    #[test]
    fn force_release_of_free_voice_is_silent() {
        let mut alloc = allocator(2);
        alloc.force_release(1);
        assert!(alloc.sink().is_empty());

        alloc.allocate();
        alloc.force_release(0);
        alloc.force_release(0);
        assert_eq!(force_releases(&alloc), vec![0]);
        assert!(alloc.is_voice_free(0));
    }

    #[test]
    fn voice_stays_busy_until_holds_released() {
        let mut alloc = allocator(2);
        let id = env();
        let v = alloc.allocate().unwrap();
        alloc.hold(v, &id);
        alloc.note_off(v);
        assert!(!alloc.is_voice_free(v));

        alloc.release(v, &id);
        assert!(alloc.is_voice_free(v));
        assert_consistent(&alloc);
    }

    #[test]
    fn release_and_disconnect_are_idempotent() {
        let mut alloc = allocator(2);
        let a = ConsumerId::from("a:gate");
        let b = ConsumerId::from("b:gate");
        alloc.allocate();
        alloc.hold(0, &a);
        alloc.hold(0, &b);
        alloc.note_off(0);

        alloc.release(0, &a);
        let after_first = alloc.snapshot();
        alloc.release(0, &a);
        assert_eq!(alloc.snapshot(), after_first);

        alloc.consumer_disconnected(&b);
        let after_first = alloc.snapshot();
        alloc.consumer_disconnected(&b);
        assert_eq!(alloc.snapshot(), after_first);
        assert!(alloc.is_voice_free(0));
        assert_consistent(&alloc);
    }

    #[test]
    fn out_of_range_indices_are_no_ops() {
        let mut alloc = allocator(2);
        let id = env();
        let before = alloc.snapshot();
        alloc.note_off(7);
        alloc.hold(7, &id);
        alloc.release(7, &id);
        alloc.force_release(u32::MAX);
        assert_eq!(alloc.snapshot(), before);
        assert!(!alloc.is_voice_free(7));
        assert!(alloc.sink().is_empty());
    }

    #[test]
    fn empty_pool_allocates_nothing() {
        let mut alloc = allocator(0);
        assert_eq!(alloc.allocate(), None);
        alloc.request_resize(1);
        assert_eq!(alloc.allocate(), Some(0));
    }

    #[test]
    fn growing_is_immediate() {
        let mut alloc = allocator(2);
        alloc.request_resize(5);
        assert_eq!(alloc.voice_count(), 5);
        assert_eq!(alloc.allocation_state(), AllocationState::Stable { voice_count: 5 });
        assert!(alloc.is_voice_free(4));
    }

    #[test]
    fn resize_is_clamped_to_max_voices() {
        let mut alloc = allocator(2);
        alloc.request_resize(MAX_VOICES + 10);
        assert_eq!(alloc.voice_count(), MAX_VOICES);
    }

    #[test]
    fn shrink_with_free_voices_completes_immediately() {
        let mut alloc = allocator(4);
        alloc.allocate();
        alloc.request_resize(2);
        assert_eq!(alloc.voice_count(), 2);
        assert_eq!(alloc.allocation_state(), AllocationState::Stable { voice_count: 2 });
        assert_consistent(&alloc);
    }

    #[test]
    fn shrink_waits_for_busy_voices() {
        let mut alloc = allocator(4);
        let a = ConsumerId::from("a:gate");
        let b = ConsumerId::from("b:gate");
        for _ in 0..4 {
            alloc.allocate();
        }
        alloc.hold(2, &a);
        alloc.hold(3, &b);

        alloc.request_resize(2);
        let shrinking = AllocationState::Shrinking {
            current_count: 4,
            target_count: 2,
        };
        assert_eq!(alloc.voice_count(), 4);
        assert_eq!(alloc.allocation_state(), shrinking);

        alloc.note_off(3);
        alloc.release(3, &b);
        alloc.note_off(2);
        assert_eq!(alloc.allocation_state(), shrinking);

        alloc.consumer_disconnected(&a);
        assert_eq!(alloc.allocation_state(), AllocationState::Stable { voice_count: 2 });
        assert_eq!(alloc.voice_count(), 2);
        assert_consistent(&alloc);
    }

    #[test]
    fn shrinking_pool_never_assigns_draining_voices() {
        let mut alloc = allocator(4);
        for _ in 0..4 {
            alloc.allocate();
        }
        alloc.request_resize(2);

        // 0 and 1 are active, so they get stolen rather than 2 or 3.
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));

        alloc.note_off(2);
        assert!(matches!(alloc.allocation_state(), AllocationState::Shrinking { .. }));
        alloc.note_off(3);
        assert_eq!(alloc.allocation_state(), AllocationState::Stable { voice_count: 2 });
    }

    #[test]
    fn growing_cancels_pending_shrink() {
        let mut alloc = allocator(4);
        for _ in 0..4 {
            alloc.allocate();
        }
        alloc.request_resize(1);
        alloc.request_resize(6);
        assert_eq!(alloc.allocation_state(), AllocationState::Stable { voice_count: 6 });
        assert_eq!(alloc.voice_count(), 6);
        assert_eq!(alloc.allocate(), Some(4));
    }

    #[test]
    fn retargeting_a_shrink_rechecks_immediately() {
        let mut alloc = allocator(4);
        alloc.allocate();
        alloc.allocate();
        alloc.request_resize(1);
        assert!(matches!(alloc.allocation_state(), AllocationState::Shrinking { .. }));

        alloc.request_resize(2);
        assert_eq!(alloc.allocation_state(), AllocationState::Stable { voice_count: 2 });
    }

    #[test]
    fn hold_on_released_voice_keeps_it_busy() {
        let mut alloc = allocator(2);
        let id = env();
        alloc.hold(1, &id);
        assert!(!alloc.is_voice_free(1));
        assert_eq!(alloc.release_order(), &[1]);
        assert_eq!(alloc.allocate(), Some(0));
        assert_consistent(&alloc);
    }

    #[test]
    fn snapshot_reports_counts() {
        let mut alloc = allocator(3);
        let id = env();
        alloc.allocate();
        alloc.hold(0, &id);
        let snapshot = alloc.snapshot();
        assert_eq!(snapshot.voices.len(), 3);
        assert_eq!(
            snapshot.voices[0],
            VoiceSnapshot {
                index: 0,
                note_active: true,
                consumer_count: 1
            }
        );
        assert_eq!(snapshot.busy_count(), 1);
        assert_eq!(snapshot.allocation_state, AllocationState::Stable { voice_count: 3 });
    }

    #[test]
    fn invariants_hold_across_mixed_sequence() {
        let mut alloc = allocator(4);
        let a = ConsumerId::from("a:gate");
        let b = ConsumerId::from("b:gate");

        for step in 0..64u32 {
            match step % 7 {
                0 | 3 => {
                    if let Some(v) = alloc.allocate() {
                        alloc.hold(v, if step % 2 == 0 { &a } else { &b });
                    }
                }
                1 => alloc.note_off(step % 4),
                2 => alloc.release(step % 5, &a),
                4 => alloc.consumer_disconnected(&b),
                5 => alloc.request_resize((step as usize % 4) + 1),
                _ => alloc.force_release(step % 3),
            }
            assert_consistent(&alloc);
        }
    }
}
