//! Event dispatch from the voice allocator to whatever is wired to its gate port.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::node::{GraphId, PortAddress};

/// Voice lifecycle transitions announced on a gate-output port.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    Gate { voice: u32, on: bool, velocity: u8 },
    /// The voice was reclaimed; consumers should fade out now.
    ForceRelease { voice: u32 },
}

impl VoiceEvent {
    pub fn voice(&self) -> u32 {
        match *self {
            VoiceEvent::Gate { voice, .. } | VoiceEvent::ForceRelease { voice } => voice,
        }
    }
}

/// Receiver of voice events, provided by the surrounding graph runtime.
///
/// The allocator does not know who is listening; it only names the port the
/// event leaves from.
pub trait EventSink {
    fn dispatch(&mut self, graph: GraphId, node_id: &str, port_id: &str, event: VoiceEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn dispatch(&mut self, _graph: GraphId, _node_id: &str, _port_id: &str, _event: VoiceEvent) {}
}

/// An event together with the port it was dispatched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub source: PortAddress,
    pub event: VoiceEvent,
}

/// Records events in order so the owner can route them afterwards.
impl EventSink for Vec<DispatchedEvent> {
    fn dispatch(&mut self, graph: GraphId, node_id: &str, port_id: &str, event: VoiceEvent) {
        self.push(DispatchedEvent {
            source: PortAddress::new(graph, node_id, port_id),
            event,
        });
    }
}
