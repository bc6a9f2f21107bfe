//! Helio renderer - main entry point.
//!
//! Creates the window and renderer, then drives the frame loop from winit
//! events. The renderer instance lives in the event handler and is passed
//! by reference everywhere it is needed.

use std::path::Path;

use anyhow::Result;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use helio_assets::{MeshData, TextureData};
use helio_platform::{InputState, Window};
use helio_renderer::Renderer;

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 1024;
const WINDOW_TITLE: &str = "Helio";

/// Startup scene selection.
#[derive(Clone, Copy)]
enum SceneAsset {
    /// Built-in textured quad pair.
    Quad,
    /// OBJ model with its texture.
    #[allow(dead_code)]
    Obj {
        model: &'static str,
        texture: &'static str,
    },
}

const SCENE: SceneAsset = SceneAsset::Quad;
const QUAD_TEXTURE: &str = "assets/textures/checker.png";

/// Loads the selected scene's mesh and texture data.
fn load_scene() -> Result<(MeshData, TextureData)> {
    match SCENE {
        SceneAsset::Quad => {
            let mesh = MeshData::quad();
            let texture = TextureData::load_or_checkerboard(Path::new(QUAD_TEXTURE))?;
            Ok((mesh, texture))
        }
        SceneAsset::Obj { model, texture } => {
            let mesh = MeshData::load_obj(Path::new(model))?;
            let texture = TextureData::load_or_checkerboard(Path::new(texture))?;
            Ok((mesh, texture))
        }
    }
}

struct App {
    window: Option<Window>,
    renderer: Option<Renderer>,
    input: InputState,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            input: InputState::new(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_TITLE) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let (mesh, texture) = match load_scene() {
            Ok(assets) => assets,
            Err(e) => {
                error!("Failed to load scene assets: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(&window, &mesh, &texture) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                error!("Failed to create renderer: {:?}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut window) = self.window {
                    window.resize(size.width, size.height);
                }
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(ref mut renderer) = self.renderer {
                    if let Err(e) = renderer.render_frame() {
                        // Unexpected API failures are unrecoverable.
                        error!("Render error, aborting: {:?}", e);
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state.is_pressed() {
                        self.input.on_key_pressed(key);
                    } else {
                        self.input.on_key_released(key);
                    }
                }

                if self.input.is_key_just_pressed(KeyCode::Escape) {
                    info!("Escape pressed, shutting down");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.input.begin_frame();
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    helio_core::init_logging();
    info!("Starting Helio");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
