use std::collections::BTreeMap;

use labscene_input::Action;
use labscene_render::ProxyRenderer;

use crate::sim_loop::{LoopError, NextFrame, SimulationLoop};

/// Something the host delivers between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    KeyDown(String),
    KeyUp(String),
    Action(Action),
}

/// Totals over one headless run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostSummary {
    pub frames: u64,
    pub steps: u64,
    pub draw_failures: u64,
    /// The loop asked not to be scheduled again before the frame limit.
    pub cancelled: bool,
}

/// Cooperative driver standing in for a display's frame callback.
///
/// Feeds synthetic elapsed time at a fixed interval, delivers scripted
/// events before the frame they are scheduled for and re-schedules while the
/// loop reports [`NextFrame::Scheduled`].
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    frame_interval: f64,
    elapsed: f64,
    frame: u64,
    script: BTreeMap<u64, Vec<HostEvent>>,
}

impl HeadlessHost {
    /// Host advancing `frame_interval` seconds per frame.
    pub fn new(frame_interval: f64) -> Self {
        Self {
            frame_interval,
            elapsed: 0.0,
            frame: 0,
            script: BTreeMap::new(),
        }
    }

    /// Deliver `event` just before frame `frame` (0-based) is ticked.
    pub fn schedule(&mut self, frame: u64, event: HostEvent) -> &mut Self {
        self.script.entry(frame).or_default().push(event);
        self
    }

    /// Synthetic seconds handed to the loop so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Tick `sim` until `max_frames` frames ran or the loop cancels itself.
    /// Can be called again to continue from where the last run ended.
    pub fn run<R: ProxyRenderer>(
        &mut self,
        sim: &mut SimulationLoop<R>,
        max_frames: u64,
    ) -> Result<HostSummary, LoopError> {
        let _span = tracing::info_span!("headless_run", max_frames).entered();
        let failures_before = sim.draw_failures();
        let mut summary = HostSummary::default();

        for _ in 0..max_frames {
            if let Some(events) = self.script.remove(&self.frame) {
                for event in events {
                    match event {
                        HostEvent::KeyDown(code) => sim.on_key_down(&code),
                        HostEvent::KeyUp(code) => sim.on_key_up(&code),
                        HostEvent::Action(action) => sim.handle_action(action)?,
                    }
                }
            }

            self.frame += 1;
            self.elapsed += self.frame_interval;
            let report = sim.tick(self.elapsed)?;
            if report.next == NextFrame::Cancelled {
                summary.cancelled = true;
                break;
            }
            summary.frames += 1;
            summary.steps += u64::from(report.steps);
        }

        summary.draw_failures = sim.draw_failures() - failures_before;
        tracing::info!(frames = summary.frames, steps = summary.steps, "headless run finished");
        Ok(summary)
    }
}

impl Default for HeadlessHost {
    /// 60 frames per second.
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::scene::LabScene;
    use labscene_render::DebugTextRenderer;
    use labscene_sync::SeededRandom;

    fn spawner_scene(seed: u64) -> SimulationLoop<DebugTextRenderer> {
        let scene = LabScene::Spawner;
        scene
            .build(
                &scene.default_config(),
                DebugTextRenderer::new(),
                Box::new(SeededRandom::new(seed)),
            )
            .unwrap()
    }

    #[test]
    fn runs_the_requested_number_of_frames() {
        let mut sim = spawner_scene(1);
        sim.start().unwrap();
        let mut host = HeadlessHost::new(0.02);
        let summary = host.run(&mut sim, 50).unwrap();
        assert_eq!(summary.frames, 50);
        assert!(summary.steps >= 50);
        assert!(!summary.cancelled);
        assert_eq!(sim.renderer().frames(), 50);
    }

    #[test]
    fn stop_action_cancels_scheduling() {
        let mut sim = spawner_scene(1);
        sim.start().unwrap();
        let mut host = HeadlessHost::new(0.02);
        host.schedule(10, HostEvent::Action(Action::Stop));
        let summary = host.run(&mut sim, 100).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.frames, 10);
    }

    #[test]
    fn scripted_spawns_and_keys_are_delivered() {
        let mut sim = spawner_scene(1);
        sim.start().unwrap();
        let player = sim.controller().player().unwrap();
        let mut host = HeadlessHost::new(0.02);
        host.schedule(0, HostEvent::Action(Action::SpawnRandomBox))
            .schedule(0, HostEvent::Action(Action::SpawnRandomSphere))
            .schedule(0, HostEvent::KeyDown("right".into()))
            .schedule(20, HostEvent::KeyUp("right".into()));
        host.run(&mut sim, 30).unwrap();
        assert_eq!(sim.world().body_count(), 9);
        assert!(sim.world().body(player).unwrap().position().x > 0.1);
        assert!(!sim.input().is_pressed("right"));
    }

    #[test]
    fn same_seed_same_run() {
        let run = |seed| {
            let mut sim = spawner_scene(seed);
            sim.start().unwrap();
            let mut host = HeadlessHost::new(0.02);
            for frame in 0..5 {
                host.schedule(frame * 10, HostEvent::Action(Action::SpawnRandomBox));
            }
            host.run(&mut sim, 120).unwrap();
            sim.world().state_hash()
        };
        assert_eq!(run(4), run(4));
    }

    #[test]
    fn idle_loop_is_cancelled_immediately() {
        let mut sim = SimulationLoop::new(
            &SimConfig::default(),
            DebugTextRenderer::new(),
            Box::new(SeededRandom::new(0)),
        );
        let summary = HeadlessHost::default().run(&mut sim, 10).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.frames, 0);
    }
}
