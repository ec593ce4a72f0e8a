//! Headless demo driving the render and audio jobs from a user-logic job.

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use engine::{Engine, EngineConfig};
use services_audio::{AudioContext, PlayState, SimulatedAudioBackend};
use services_gpu::{
    BufferDesc, BufferUsage, ClearDesc, FrameStats, HeadlessBackend, RenderContext, ResourceKind,
    Topology,
};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

const DEMO_TRACK: &str = "demo.ogg";
const DEMO_TRACK_MS: u32 = 90_000;

/// Run the threaded render/audio core against headless backends.
#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the engine jobs headlessly", long_about = None)]
struct Cli {
    /// TOML engine config; defaults apply to anything it leaves out.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Frames the user job presents before shutdown.
    #[arg(short, long, default_value_t = 120)]
    frames: u64,

    /// Buffers created and released every frame.
    #[arg(long, default_value_t = 4)]
    churn: u32,

    /// Override `render.ring_capacity`.
    #[arg(long)]
    ring_capacity: Option<usize>,

    /// Override `render.release_latency_frames`.
    #[arg(long)]
    release_latency: Option<u64>,

    /// Skip starting the audio job.
    #[arg(long)]
    no_audio: bool,

    /// Print a line every N frames.
    #[arg(long, default_value_t = 30)]
    report_every: u64,
}

#[derive(Clone, Copy, Debug)]
struct FrameReport {
    frame: u64,
    stats: FrameStats,
    slots_in_use: usize,
    audio_position_ms: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if cli.frames == 0 {
        bail!("--frames must be at least 1");
    }

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading engine config {path:?}"))?,
        None => EngineConfig::default(),
    };
    if let Some(capacity) = cli.ring_capacity {
        config.render.ring_capacity = capacity;
    }
    if let Some(latency) = cli.release_latency {
        config.render.release_latency_frames = latency;
    }
    config.validate().context("invalid command-line overrides")?;
    log::debug!("engine config: {config:?}");

    let mut engine = Engine::new(config);
    let render = engine
        .start_render(HeadlessBackend::new)
        .context("starting render job")?;
    let audio = if cli.no_audio {
        None
    } else {
        let ctx = engine
            .start_audio(|| SimulatedAudioBackend::new().with_sound(DEMO_TRACK, DEMO_TRACK_MS))
            .context("starting audio job")?;
        Some(ctx)
    };

    let (reports, received) = bounded(8);
    let frames = cli.frames;
    let churn = cli.churn;
    engine
        .spawn_user("game", move |job| {
            let mut demo = Demo::new(render, audio, churn);
            for _ in 0..frames {
                if job.exit_requested() {
                    return;
                }
                if reports.send(demo.frame()).is_err() {
                    break;
                }
            }
            while !job.exit_requested() {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .context("starting user job")?;

    let started = Instant::now();
    print_reports(&received, frames, cli.report_every.max(1))?;
    let elapsed = started.elapsed();

    engine.shutdown().context("shutting down engine")?;
    println!(
        "{frames} frames in {:.1} ms ({:.0} fps)",
        elapsed.as_secs_f64() * 1e3,
        frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}

fn print_reports(received: &Receiver<FrameReport>, frames: u64, every: u64) -> Result<()> {
    println!("frame  draws  cmds  releases  live  slots  audio_ms");
    for n in 1..=frames {
        let report = received
            .recv_timeout(Duration::from_secs(10))
            .context("user job stopped reporting")?;
        if n % every == 0 || n == frames {
            let audio = report
                .audio_position_ms
                .map(|ms| ms.to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "{:>5}  {:>5}  {:>4}  {:>8}  {:>4}  {:>5}  {:>8}",
                report.frame,
                report.stats.draw_calls,
                report.stats.commands,
                report.stats.releases,
                report.stats.live_resources,
                report.slots_in_use,
                audio
            );
        }
    }
    Ok(())
}

/// Per-frame workload run on the user job.
struct Demo {
    render: RenderContext,
    audio: Option<AudioContext>,
    channel: u32,
    clear: u32,
    churn: u32,
    transient: Vec<u32>,
}

impl Demo {
    fn new(mut render: RenderContext, mut audio: Option<AudioContext>, churn: u32) -> Self {
        render.new_frame();
        let clear = render.create_clear_state(ClearDesc {
            colour: Some([0.1, 0.1, 0.12, 1.0]),
            depth: Some(1.0),
            stencil: None,
        });
        render.present();

        let channel = match audio.as_mut() {
            Some(audio) => {
                let track = audio.create_stream(DEMO_TRACK);
                let group = audio.create_channel_group();
                let channel = audio.create_channel_for_sound(track);
                audio.add_channel_to_group(channel, group);
                audio.group_set_volume(group, 0.8);
                audio.consume();
                channel
            }
            None => 0,
        };

        Self {
            render,
            audio,
            channel,
            clear,
            churn,
            transient: Vec::new(),
        }
    }

    fn frame(&mut self) -> FrameReport {
        let render = &mut self.render;
        render.new_frame();

        for slot in self.transient.drain(..) {
            render.release(ResourceKind::Buffer, slot);
        }
        for i in 0..self.churn {
            let slot = render.create_buffer(BufferDesc {
                usage: BufferUsage::Vertex,
                byte_size: 256 * (i as usize + 1),
                data: Vec::new(),
            });
            self.transient.push(slot);
        }

        render.set_back_buffer();
        render.clear(self.clear);
        render.push_perf_marker("scene");
        for &vb in &self.transient {
            render.set_vertex_buffer(vb, 16, 0);
            render.draw(3, 0, Topology::TriangleList);
        }
        render.pop_perf_marker();
        render.present();

        let audio_position_ms = self.audio.as_ref().and_then(|audio| {
            audio.consume();
            audio
                .channel_state(self.channel)
                .ok()
                .filter(|state| state.play_state != PlayState::NotPlaying)
                .map(|state| state.position_ms)
        });

        FrameReport {
            frame: render.frame(),
            stats: render.frame_stats(),
            slots_in_use: render.slots_in_use(),
            audio_position_ms,
        }
    }
}
