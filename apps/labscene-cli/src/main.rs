use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec3;
use labscene_common::{MassClass, Shape};
use labscene_input::Action;
use labscene_kernel::{BodyDesc, World, WorldConfig};
use labscene_render::DebugTextRenderer;
use labscene_runtime::{HeadlessHost, HostEvent, LabScene, SimConfig, SimulationLoop};
use labscene_sync::SeededRandom;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "labscene", about = "Headless runner for the physics lab scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SceneArg {
    Spawner,
    Rolling,
}

impl From<SceneArg> for LabScene {
    fn from(arg: SceneArg) -> Self {
        match arg {
            SceneArg::Spawner => LabScene::Spawner,
            SceneArg::Rolling => LabScene::Rolling,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run a lab scene headlessly
    Run {
        #[arg(short, long, value_enum, default_value = "spawner")]
        scene: SceneArg,
        /// Number of frames to run
        #[arg(short, long, default_value = "300")]
        frames: u64,
        /// Host frame rate
        #[arg(long, default_value = "60")]
        fps: u32,
        /// Seed for randomized spawns
        #[arg(long, default_value = "42")]
        seed: u64,
        /// YAML config replacing the scene's defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Random boxes to spawn, one every 10 frames
        #[arg(long, default_value = "0")]
        spawn_boxes: u32,
        /// Random spheres to spawn, one every 10 frames
        #[arg(long, default_value = "0")]
        spawn_spheres: u32,
        /// Input codes held for the whole run (e.g. forward, KeyA, ArrowUp)
        #[arg(long)]
        hold: Vec<String>,
        /// Hide auxiliary entities
        #[arg(long)]
        hide_auxiliary: bool,
        /// Print final body states as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop a sphere on the floor and report its height over time
    Drop {
        #[arg(long, default_value = "3.0")]
        height: f32,
        /// Simulated seconds
        #[arg(long, default_value = "4.0")]
        seconds: f32,
    },
    /// Print a scene's default configuration as YAML
    Config {
        #[arg(short, long, value_enum, default_value = "spawner")]
        scene: SceneArg,
    },
}

#[derive(Serialize)]
struct BodyReport {
    id: u64,
    dynamic: bool,
    position: [f32; 3],
    orientation: [f32; 4],
    linear_velocity: [f32; 3],
}

#[derive(Serialize)]
struct RunReport {
    scene: String,
    frames: u64,
    steps: u64,
    tick: u64,
    state_hash: String,
    bodies: Vec<BodyReport>,
}

fn body_reports(world: &World) -> Vec<BodyReport> {
    world
        .bodies()
        .iter()
        .map(|b| BodyReport {
            id: b.id().0,
            dynamic: b.is_dynamic(),
            position: b.position().to_array(),
            orientation: b.pose().orientation.to_array(),
            linear_velocity: b.linear_velocity().to_array(),
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("labscene v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", labscene_common::crate_info());
            println!("kernel: {}", labscene_kernel::crate_info());
            println!("input: {}", labscene_input::crate_info());
            println!("render: {}", labscene_render::crate_info());
            println!("sync: {}", labscene_sync::crate_info());
            println!("runtime: {}", labscene_runtime::crate_info());
        }
        Commands::Run {
            scene,
            frames,
            fps,
            seed,
            config,
            spawn_boxes,
            spawn_spheres,
            hold,
            hide_auxiliary,
            json,
        } => {
            let scene = LabScene::from(scene);
            let config = match config {
                Some(path) => SimConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => scene.default_config(),
            };
            anyhow::ensure!(fps > 0, "--fps must be positive");

            let mut sim = scene.build(
                &config,
                DebugTextRenderer::new(),
                Box::new(SeededRandom::new(seed)),
            )?;
            sim.start()?;

            let mut host = HeadlessHost::new(1.0 / f64::from(fps));
            for code in hold {
                host.schedule(0, HostEvent::KeyDown(code));
            }
            if hide_auxiliary {
                host.schedule(0, HostEvent::Action(Action::SetAuxiliaryVisible(false)));
            }
            for i in 0..spawn_boxes {
                host.schedule(u64::from(i) * 10, HostEvent::Action(Action::SpawnRandomBox));
            }
            for i in 0..spawn_spheres {
                host.schedule(
                    u64::from(i) * 10 + 5,
                    HostEvent::Action(Action::SpawnRandomSphere),
                );
            }

            let summary = host.run(&mut sim, frames)?;
            tracing::info!(
                %scene,
                frames = summary.frames,
                steps = summary.steps,
                draw_failures = summary.draw_failures,
                bodies = sim.world().body_count(),
                "run finished"
            );
            let report = RunReport {
                scene: scene.to_string(),
                frames: summary.frames,
                steps: summary.steps,
                tick: sim.world().tick(),
                state_hash: format!("{:#018x}", sim.world().state_hash()),
                bodies: body_reports(sim.world()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&sim, &report, summary.draw_failures);
            }
            sim.teardown();
        }
        Commands::Drop { height, seconds } => {
            let mut world = World::new(WorldConfig::default());
            world.add_body(BodyDesc::new(Shape::Plane, MassClass::Static));
            let ball = world.add_body(
                BodyDesc::new(Shape::Sphere { radius: 0.5 }, MassClass::dynamic(1.0))
                    .with_position(Vec3::new(0.0, height, 0.0)),
            );

            let dt = 1.0 / 60.0;
            let steps = (seconds / dt).ceil() as u32;
            println!("Drop: sphere r=0.5 from y={height:.2}, {steps} steps of {dt:.4}s");
            for step in 1..=steps {
                world.step_fixed(dt)?;
                if step % 30 == 0 || step == steps {
                    let body = world.body(ball).context("ball vanished")?;
                    println!(
                        "  t={:5.2}s  y={:.4}  vy={:+.4}",
                        world.time(),
                        body.position().y,
                        body.linear_velocity().y
                    );
                }
            }
        }
        Commands::Config { scene } => {
            let config = LabScene::from(scene).default_config();
            print!("{}", config.to_yaml_string()?);
        }
    }

    Ok(())
}

fn print_summary(sim: &SimulationLoop<DebugTextRenderer>, report: &RunReport, draw_failures: u64) {
    println!(
        "Scene {}: frames={}, steps={}, tick={}, bodies={}, draw failures={}",
        report.scene,
        report.frames,
        report.steps,
        report.tick,
        report.bodies.len(),
        draw_failures
    );
    println!("Hash: {}", report.state_hash);
    for body in report.bodies.iter().filter(|b| b.dynamic) {
        let [x, y, z] = body.position;
        println!("  body#{} pos=({x:.3}, {y:.3}, {z:.3})", body.id);
    }
    if let Some(player) = sim.controller().player() {
        println!("Player: {player}");
    }
    print!("{}", sim.renderer().last_frame());
}
