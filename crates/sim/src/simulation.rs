use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use netmotion::{
    CharacterTransform, MovementPacket, MovementSender, NetworkMessageEncoder,
    RemotePlayerMovement, sequence_greater_than,
};

use crate::channel::{ChannelStats, LossyChannel};
use crate::config::SimConfig;
use crate::script::ScriptedAvatar;
use crate::timestep::FixedTimestep;

#[derive(Debug, Default)]
pub struct SimReport {
    pub duration: f32,
    pub ticks: u64,
    /// Frame time dropped by the fixed-step cap.
    pub clipped: f32,
    pub channel: ChannelStats,
    pub reordered: u64,
    pub rejected: u64,
    pub reasons: BTreeMap<&'static str, u64>,
    pub error_sum: f64,
    pub error_max: f32,
    pub error_samples: u64,
}

impl SimReport {
    pub fn mean_error(&self) -> f32 {
        if self.error_samples == 0 {
            0.0
        } else {
            (self.error_sum / self.error_samples as f64) as f32
        }
    }

    pub fn messages_per_second(&self) -> f32 {
        if self.duration > 0.0 {
            self.channel.sent as f32 / self.duration
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        log::info!(
            "simulated {:.1}s in {} ticks",
            self.duration,
            self.ticks
        );
        if self.clipped > 0.0 {
            log::warn!("{:.2}s of frame time clipped", self.clipped);
        }
        log::info!(
            "packets: {} sent, {} dropped, {} delivered, {} reordered, {} rejected ({:.1} msg/s, {} bytes)",
            self.channel.sent,
            self.channel.dropped,
            self.channel.delivered,
            self.reordered,
            self.rejected,
            self.messages_per_second(),
            self.channel.bytes_sent
        );
        for (reason, count) in &self.reasons {
            log::info!("  {reason}: {count}");
        }
        log::info!(
            "remote error: mean {:.3}, max {:.3}",
            self.mean_error(),
            self.error_max
        );
    }
}

/// Local avatar -> sender -> lossy channel -> remote playback, all on one
/// simulated clock.
pub struct Simulation {
    config: SimConfig,
    encoder: NetworkMessageEncoder,
    sender: MovementSender,
    channel: LossyChannel,
    avatar: ScriptedAvatar,
    remote: RemotePlayerMovement,
    remote_transform: CharacterTransform,
    timestep: FixedTimestep,
    frame_rng: StdRng,
    next_sequence: u32,
    newest_sequence: Option<u32>,
    report: SimReport,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        let encoder = NetworkMessageEncoder::new(config.movement.encoding.clone())
            .context("invalid encoding settings")?;

        Ok(Self {
            sender: MovementSender::from_settings(&config.movement),
            channel: LossyChannel::new(config.network.clone(), config.seed),
            avatar: ScriptedAvatar::new(),
            remote: RemotePlayerMovement::new(&config.movement.receiver),
            remote_transform: CharacterTransform::default(),
            timestep: FixedTimestep::new(config.tick_rate, config.max_frame_time),
            frame_rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            next_sequence: 0,
            newest_sequence: None,
            report: SimReport::default(),
            encoder,
            config,
        })
    }

    pub fn run(mut self) -> Result<SimReport> {
        log::info!(
            "running {:.1}s at {} Hz, spline {:?}",
            self.config.duration,
            self.timestep.tick_rate(),
            self.config.movement.interpolation.interpolation_type
        );

        let mut clock = 0.0;
        while clock < self.config.duration {
            let frame = self.frame_rng.gen_range(0.004..0.03);
            clock += frame;
            self.timestep.accumulate(frame);

            while let Some(now) = self.timestep.next_tick() {
                self.tick(now)?;
            }
        }

        self.report.duration = self.timestep.elapsed();
        self.report.ticks = self.timestep.ticks();
        self.report.clipped = self.timestep.clipped();
        self.report.channel = self.channel.stats();
        Ok(self.report)
    }

    fn tick(&mut self, now: f32) -> Result<()> {
        let dt = self.timestep.dt();

        let sample = self.avatar.sample(now);
        if let Some(reason) = self.sender.poll(now, sample) {
            *self.report.reasons.entry(reason.label()).or_default() += 1;

            if let Some(message) = self.sender.last_sent() {
                let packet = MovementPacket::new(self.next_sequence, self.encoder.compress(message));
                self.next_sequence = self.next_sequence.wrapping_add(1);

                let bytes = packet.serialize().context("failed to serialize movement packet")?;
                self.channel.send(now, bytes.to_vec());
            }
        }

        for bytes in self.channel.receive(now) {
            match MovementPacket::deserialize(&bytes) {
                Ok(packet) => {
                    self.track_sequence(packet.header.sequence);
                    self.remote.receive(&self.encoder, &packet.payload);
                }
                Err(err) => {
                    log::warn!("dropping malformed packet: {err}");
                    self.report.rejected += 1;
                }
            }
        }

        self.remote
            .update(dt, &mut self.remote_transform, &self.config.movement);

        if self.remote.is_initialized() {
            let error = self.remote_transform.position.distance(sample.position);
            self.report.error_sum += error as f64;
            self.report.error_max = self.report.error_max.max(error);
            self.report.error_samples += 1;
        }

        Ok(())
    }

    fn track_sequence(&mut self, sequence: u32) {
        match self.newest_sequence {
            Some(newest) if !sequence_greater_than(sequence, newest) => {
                log::debug!("packet {sequence} arrived after {newest}");
                self.report.reordered += 1;
            }
            _ => self.newest_sequence = Some(sequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PacketLossSimulation;

    fn config(network: PacketLossSimulation) -> SimConfig {
        SimConfig {
            duration: 10.0,
            network,
            ..Default::default()
        }
    }

    #[test]
    fn perfect_network_tracks_closely() {
        let report = Simulation::new(config(PacketLossSimulation::default()))
            .unwrap()
            .run()
            .unwrap();

        assert!(report.ticks >= 590);
        assert_eq!(report.clipped, 0.0);
        assert_eq!(report.channel.dropped, 0);
        assert_eq!(report.reordered, 0);
        assert_eq!(report.channel.delivered, report.channel.sent);
        assert!(report.messages_per_second() <= 10.0);
        assert!(report.mean_error() < 3.0);
    }

    #[test]
    fn slow_frames_are_clipped_by_config() {
        let config = SimConfig {
            max_frame_time: 0.01,
            ..config(PacketLossSimulation::default())
        };
        let report = Simulation::new(config).unwrap().run().unwrap();

        assert!(report.clipped > 0.0);
        assert!(report.ticks < 590);
    }

    #[test]
    fn lossy_network_is_deterministic() {
        let network = PacketLossSimulation {
            enabled: true,
            loss_percent: 20.0,
            min_latency_ms: 40,
            max_latency_ms: 120,
            jitter_ms: 60,
        };
        let first = Simulation::new(config(network.clone())).unwrap().run().unwrap();
        let second = Simulation::new(config(network)).unwrap().run().unwrap();

        assert_eq!(first.channel.sent, second.channel.sent);
        assert_eq!(first.channel.dropped, second.channel.dropped);
        assert_eq!(first.reordered, second.reordered);
        assert_eq!(first.error_max, second.error_max);
        assert!(first.channel.dropped > 0);
    }
}
