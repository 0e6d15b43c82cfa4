//! Split-screen stereo view of one textured cube.
//! Two viewports, one per eye; hold the left/right arrows to turn both cameras.
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    dpi::PhysicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

mod camera;
mod config;
mod cube;
mod frame;
mod shader;
mod state;
mod texture;
mod vertex;
use state::{GpuContext, State};

fn init_logging() {
    let mut builder = env_logger::Builder::new();
    if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        // wgpu is chatty at info
        builder
            .filter_level(log::LevelFilter::Info)
            .filter_module("wgpu_core", log::LevelFilter::Warn)
            .filter_module("wgpu_hal", log::LevelFilter::Warn);
    }
    builder.init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let settings = config::ContextSettings::default();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config::WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(config::WINDOW_WIDTH, config::WINDOW_HEIGHT))
            .with_resizable(false)
            .build(&event_loop)?,
    );

    let (ctx, mut surface) = pollster::block_on(GpuContext::new(window.clone(), settings))?;
    let mut state = Some(State::new(ctx, Path::new(config::TEXTURE_PATH)));
    let mut last_fps_print = Instant::now();
    let mut frames = 0;

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { ref event, window_id } if window_id == window.id() => {
                let Some(state) = state.as_mut() else { return };
                if !state.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => state.resize(&mut surface, *physical_size),
                        WindowEvent::RedrawRequested => {
                            state.update();
                            match state.render_to_surface(&surface) {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    let size = surface.size();
                                    state.resize(&mut surface, size);
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                                Err(e) => log::warn!("Render error: {:?}", e),
                            }
                        }
                        _ => {}
                    }
                }
            },
            Event::AboutToWait => {
                frames += 1;
                if last_fps_print.elapsed().as_secs_f32() >= 1.0 {
                    log::debug!("FPS: {}", frames);
                    frames = 0;
                    last_fps_print = Instant::now();
                }
                window.request_redraw();
            },
            Event::LoopExiting => {
                if let Some(state) = state.take() {
                    state.unload();
                }
            },
            _ => {}
        }
    })?;
    Ok(())
}
