//! Producer API through the job thread and back through published state.

use dispatch::{QueryError, Status};
use engine::{Engine, EngineConfig};
use services_audio::{PlayState, SimulatedAudioBackend};
use services_gpu::{
    AddressMode, Filter, HeadlessBackend, RenderTargetDesc, ResourceKind, SamplerDesc,
    TextureDesc, TextureFormat,
};
use std::thread;
use std::time::{Duration, Instant};

fn texture(width: u32, height: u32) -> TextureDesc {
    TextureDesc {
        width,
        height,
        mip_levels: 1,
        format: TextureFormat::Rgba8,
        data: vec![0x7f; (width * height * 4) as usize],
    }
}

#[test]
fn render_resource_goes_from_not_ready_to_ok_in_one_frame() {
    crate::init_logging();
    let mut engine = Engine::new(EngineConfig::default());
    let mut render = engine.start_render(HeadlessBackend::new).expect("render");

    render.new_frame();
    let tex = render.create_texture(texture(32, 16));
    let sampler = render.create_sampler(SamplerDesc {
        filter: Filter::Linear,
        address: AddressMode::Clamp,
    });
    assert_eq!(render.resource_status(tex, ResourceKind::Texture), Status::NotReady);
    assert_eq!(render.resource_status(sampler, ResourceKind::Sampler), Status::NotReady);
    render.present();

    let info = render
        .resource_info(tex, ResourceKind::Texture)
        .expect("texture after one frame");
    assert_eq!((info.width, info.height), (32, 16));
    assert_eq!(info.byte_size, 32 * 16 * 4);
    assert_eq!(render.resource_status(sampler, ResourceKind::Sampler), Status::Ok);
    assert_eq!(
        render.resource_info(sampler, ResourceKind::Texture),
        Err(QueryError::Failed)
    );

    drop(render);
    engine.shutdown().expect("shutdown");
}

#[test]
fn deferred_release_reuses_slot_after_latency() {
    crate::init_logging();
    let config = EngineConfig::from_toml_str("[render]\nrelease_latency_frames = 3\n")
        .expect("config");
    let mut engine = Engine::new(config);
    let mut render = engine.start_render(HeadlessBackend::new).expect("render");

    render.new_frame();
    let target = render.create_render_target(RenderTargetDesc {
        width: 64,
        height: 64,
        format: TextureFormat::Rgba16F,
        samples: 1,
    });
    render.present();

    render.new_frame();
    assert!(render.release(ResourceKind::RenderTarget, target));
    render.present();
    let released_at = render.frame();

    // Still live while the GPU may be using it.
    while render.frame() < released_at + 2 {
        render.new_frame();
        render.present();
        assert_eq!(
            render.resource_status(target, ResourceKind::RenderTarget),
            Status::Ok
        );
        assert_eq!(render.slots_in_use(), 1);
    }

    render.new_frame();
    render.present();
    assert_eq!(
        render.resource_status(target, ResourceKind::RenderTarget),
        Status::NotReady
    );

    render.new_frame();
    assert_eq!(render.slots_in_use(), 0);
    let reused = render.create_texture(texture(4, 4));
    assert_eq!(reused, target);
    render.present();
    assert_eq!(render.resource_status(reused, ResourceKind::Texture), Status::Ok);

    drop(render);
    engine.shutdown().expect("shutdown");
}

#[test]
fn audio_channel_state_is_published_after_consume() {
    crate::init_logging();
    let mut engine = Engine::new(EngineConfig::default());
    let mut audio = engine
        .start_audio(|| SimulatedAudioBackend::new().with_sound("loop.ogg", 5_000))
        .expect("audio");

    let sound = audio.create_stream("loop.ogg");
    let channel = audio.create_channel_for_sound(sound);
    assert_eq!(audio.channel_state(channel), Err(QueryError::NotReady));

    let deadline = Instant::now() + Duration::from_secs(5);
    let state = loop {
        audio.consume();
        match audio.channel_state(channel) {
            Err(QueryError::NotReady) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(1));
            }
            other => break other.expect("channel state"),
        }
    };
    assert_eq!(state.play_state, PlayState::Playing);
    assert!(state.position_ms > 0);

    drop(audio);
    engine.shutdown().expect("shutdown");
}
