use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    pub loss_percent: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
}

impl PacketLossSimulation {
    pub fn should_drop(&self, rng: &mut impl Rng) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rng.gen_bool((self.loss_percent as f64 / 100.0).clamp(0.0, 1.0))
    }

    pub fn delay_ms(&self, rng: &mut impl Rng) -> u32 {
        if !self.enabled || self.max_latency_ms == 0 {
            return 0;
        }
        let base = self.min_latency_ms;
        let range = self.max_latency_ms.saturating_sub(self.min_latency_ms);
        let jitter = if self.jitter_ms > 0 {
            rng.gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        base + rng.gen_range(0..=range) + jitter
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelStats {
    pub sent: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub bytes_sent: u64,
}

#[derive(Debug)]
struct InFlight {
    deliver_at: f32,
    bytes: Vec<u8>,
}

/// One-way datagram link with simulated loss and latency. Jitter lets later
/// packets overtake earlier ones.
#[derive(Debug)]
pub struct LossyChannel {
    simulation: PacketLossSimulation,
    rng: StdRng,
    in_flight: Vec<InFlight>,
    stats: ChannelStats,
}

impl LossyChannel {
    pub fn new(simulation: PacketLossSimulation, seed: u64) -> Self {
        Self {
            simulation,
            rng: StdRng::seed_from_u64(seed),
            in_flight: Vec::new(),
            stats: ChannelStats::default(),
        }
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn send(&mut self, now: f32, bytes: Vec<u8>) {
        self.stats.sent += 1;
        self.stats.bytes_sent += bytes.len() as u64;

        if self.simulation.should_drop(&mut self.rng) {
            self.stats.dropped += 1;
            return;
        }

        let delay = self.simulation.delay_ms(&mut self.rng) as f32 / 1000.0;
        self.in_flight.push(InFlight {
            deliver_at: now + delay,
            bytes,
        });
    }

    /// Packets whose delivery time has come, in arrival order.
    pub fn receive(&mut self, now: f32) -> Vec<Vec<u8>> {
        let (mut ready, pending): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|packet| packet.deliver_at <= now);
        self.in_flight = pending;

        ready.sort_by(|a, b| a.deliver_at.total_cmp(&b.deliver_at));
        self.stats.delivered += ready.len() as u64;
        ready.into_iter().map(|packet| packet.bytes).collect()
    }
}
