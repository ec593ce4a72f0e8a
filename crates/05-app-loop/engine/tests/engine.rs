use crossbeam_channel::bounded;
use dispatch::Status;
use engine::{Engine, EngineConfig, EngineError};
use jobs::{JobError, JobSpec, JobState};
use parking_lot::Mutex;
use services_audio::SimulatedAudioBackend;
use services_gpu::{BufferDesc, BufferUsage, HeadlessBackend, ResourceKind, Topology};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn recording(order: &Arc<Mutex<Vec<String>>>, name: &str) -> JobSpec {
    let order = Arc::clone(order);
    JobSpec::new(name).on_complete(move |job| order.lock().push(job.name().to_owned()))
}

#[test]
fn user_job_drives_render_until_shutdown() {
    init_logging();
    let mut engine = Engine::new(EngineConfig::default());
    let mut render = engine.start_render(HeadlessBackend::new).expect("render");
    let (reports, frames) = bounded(16);

    engine
        .spawn_user("game", move |job| {
            render.new_frame();
            let vb = render.create_buffer(BufferDesc {
                usage: BufferUsage::Vertex,
                byte_size: 96,
                data: Vec::new(),
            });
            render.present();
            let _ = reports.send((render.frame(), render.resource_status(vb, ResourceKind::Buffer)));

            while !job.exit_requested() {
                render.new_frame();
                render.set_vertex_buffer(vb, 12, 0);
                render.draw(3, 0, Topology::TriangleList);
                render.present();
                let _ = reports.try_send((render.frame(), Status::Ok));
            }
        })
        .expect("user job");

    let (frame, status) = frames.recv_timeout(Duration::from_secs(5)).expect("first frame");
    assert_eq!(frame, 1);
    assert_eq!(status, Status::Ok);
    frames.recv_timeout(Duration::from_secs(5)).expect("later frame");

    assert_eq!(engine.live_jobs(), 2);
    engine.shutdown().expect("clean shutdown");
}

#[test]
fn shutdown_runs_newest_job_first() {
    init_logging();
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(EngineConfig::default());

    for name in ["a", "b", "c"] {
        engine
            .spawn_user_with(recording(&order, name), |job| {
                while !job.exit_requested() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .expect("spawn");
    }
    let handles: Vec<_> = engine.jobs().cloned().collect();
    engine.shutdown().expect("shutdown");

    assert_eq!(*order.lock(), ["c", "b", "a"]);
    assert!(handles.iter().all(|job| job.state() == JobState::Terminated));
}

#[test]
fn stuck_job_is_reported_as_leaked() {
    init_logging();
    let config = EngineConfig::from_toml_str("[jobs]\nshutdown_timeout_ms = 20\n").expect("config");
    let mut engine = Engine::new(config);
    let (release, stuck) = bounded::<()>(1);

    engine
        .spawn_user("stuck", move |_job| {
            let _ = stuck.recv_timeout(Duration::from_secs(5));
        })
        .expect("spawn");

    match engine.shutdown() {
        Err(EngineError::Job(JobError::Leaked { names })) => assert_eq!(names, ["stuck"]),
        other => panic!("expected leaked job, got {other:?}"),
    }
    let _ = release.send(());
}

#[test]
fn subsystems_start_once() {
    init_logging();
    let mut engine = Engine::new(EngineConfig::default());
    let _audio = engine.start_audio(SimulatedAudioBackend::new).expect("audio");
    assert!(matches!(
        engine.start_audio(SimulatedAudioBackend::new),
        Err(EngineError::AlreadyStarted { subsystem: "audio" })
    ));
    engine.shutdown().expect("shutdown");
}
