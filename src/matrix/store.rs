use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::channel::SensoryChannel;
use super::event::SensoryEvent;

/// Bounded sensory memory: one global ring holding insertion order across all
/// channels, one independent ring per channel, and a correlation index.
///
/// Eviction is FIFO with no special treatment of severity; a critical event
/// ages out like any other once capacity is exceeded. The correlation index
/// never evicts: callers needing bounded memory must pair it with an external
/// TTL sweep, which this engine does not implement.
#[derive(Debug)]
pub struct SensoryStore {
    capacity: usize,
    channel_capacity: usize,
    memory: VecDeque<Arc<SensoryEvent>>,
    channels: HashMap<SensoryChannel, VecDeque<Arc<SensoryEvent>>>,
    correlations: HashMap<String, Vec<Arc<SensoryEvent>>>,
}

impl SensoryStore {
    pub fn new(capacity: usize, channel_capacity: usize) -> Self {
        let mut channels = HashMap::with_capacity(SensoryChannel::ALL.len());
        for channel in SensoryChannel::ALL {
            channels.insert(channel, VecDeque::new());
        }
        Self {
            capacity,
            channel_capacity,
            memory: VecDeque::with_capacity(capacity.min(1024)),
            channels,
            correlations: HashMap::new(),
        }
    }

    /// Record one event into the global ring, its channel ring, and (when a
    /// correlation id is present) the correlation index. O(1) amortized.
    pub fn push(&mut self, event: Arc<SensoryEvent>) {
        if self.memory.len() >= self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(event.clone());

        let ring = self.channels.entry(event.channel).or_default();
        if ring.len() >= self.channel_capacity {
            ring.pop_front();
        }
        ring.push_back(event.clone());

        if let Some(id) = &event.correlation_id {
            self.correlations.entry(id.clone()).or_default().push(event);
        }
    }

    /// Current (post-eviction) global ring length.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Borrowing walk over the global ring in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SensoryEvent>> {
        self.memory.iter()
    }

    /// The most recent `limit` events in insertion order.
    pub fn recent(&self, limit: usize) -> Vec<Arc<SensoryEvent>> {
        let skip = self.memory.len().saturating_sub(limit);
        self.memory.iter().skip(skip).cloned().collect()
    }

    /// The most recent `limit` events of one channel, insertion order.
    pub fn recent_channel(&self, channel: SensoryChannel, limit: usize) -> Vec<Arc<SensoryEvent>> {
        match self.channels.get(&channel) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(limit);
                ring.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Every event recorded under a correlation id, insertion order.
    pub fn correlated(&self, correlation_id: &str) -> Vec<Arc<SensoryEvent>> {
        self.correlations
            .get(correlation_id)
            .cloned()
            .unwrap_or_default()
    }
}
