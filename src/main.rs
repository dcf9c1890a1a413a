use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyboardInput, WindowEvent},
    event_loop::EventLoop,
    window::{Fullscreen, WindowBuilder},
};

mod audio;
mod controls;
mod vulkan;

use audio::Audio;
use controls::{Action, Keyboard};
use vulkan::Graphics;

#[derive(Parser)]
#[command(version, about = "A spinning cube that barks when you press a key")]
struct Args {
    /// Directory containing .registry.txt and the wav files it lists
    #[arg(long, default_value = "sounds")]
    sounds: PathBuf,

    /// Run in a window instead of borderless fullscreen
    #[arg(long)]
    windowed: bool,
}

fn main() {
    pretty_env_logger::init_custom_env("SPINCUBE_LOG");
    let args = Args::parse();

    let event_loop = EventLoop::new();
    let builder = WindowBuilder::new().with_title("spincube");
    let builder = if args.windowed {
        builder.with_inner_size(LogicalSize::<u32>::new(1280, 720))
    } else {
        builder.with_fullscreen(Some(Fullscreen::Borderless(None)))
    };
    let window = match builder.build(&event_loop) {
        Ok(window) => window,
        Err(e) => {
            error!("failed to open a window: {}", e);
            return;
        }
    };

    // A broken audio setup should not take the cube down with it.
    let audio = match Audio::new(&args.sounds) {
        Ok(audio) => Some(audio),
        Err(e) => {
            warn!("audio unavailable, running silent: {:?}", e);
            None
        }
    };

    let mut graphics = match Graphics::new(&window) {
        Ok(graphics) => graphics,
        Err(e) => {
            error!("failed to initialise vulkan: {:?}", e);
            return;
        }
    };

    let mut keyboard = Keyboard::default();
    event_loop.run(move |event, _, control_flow| {
        control_flow.set_poll();
        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => control_flow.set_exit(),
            Event::WindowEvent {
                event: WindowEvent::KeyboardInput { input, .. },
                ..
            } => match input {
                KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(key),
                    ..
                } => match keyboard.press(key) {
                    Some(Action::Exit) => control_flow.set_exit(),
                    Some(Action::Poke) => {
                        graphics.toggle_spin();
                        if let Some(audio) = &audio {
                            audio.play_random();
                        }
                    }
                    None => {}
                },
                KeyboardInput {
                    state: ElementState::Released,
                    virtual_keycode: Some(key),
                    ..
                } => keyboard.release(key),
                _ => {}
            },
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            Event::RedrawRequested(_) => {
                if let Err(e) = graphics.render() {
                    error!("could not render frame: {:?}", e);
                    control_flow.set_exit();
                }
            }
            Event::LoopDestroyed => {
                info!("shutting down");
            }
            _ => {}
        }
    });
}
