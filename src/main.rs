use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

// Import from the library crate
use garden::{
    assets::AssetLoader,
    config::{self, GameConfig},
    controller::{input::native::key_to_input, FrameLoopContext, Game, InputEvent, InputState, KeyBindings},
    logging,
    model::SceneAssets,
    ui::{self, OverlayPainter},
    view::{GpuContext, RenderState},
};

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    render_state: RenderState,

    // egui
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    painter: OverlayPainter,

    // Game state
    input_state: Rc<RefCell<InputState>>,
    frame_ctx: FrameLoopContext,
    started: Instant,
}

impl App {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let gpu = GpuContext::new_native(window.clone(), size.width, size.height)
            .await
            .context("initializing GPU")?;

        let mut loader = AssetLoader::new(config::ASSET_ROOT);
        let assets = SceneAssets::load(&mut loader).await.context("loading assets")?;
        let overlay_fonts = [assets.title_font];

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let mut rng = StdRng::seed_from_u64(seed);
        let game = Game::new(
            assets,
            GameConfig::DEFAULT,
            KeyBindings::default(),
            gpu.config.width,
            gpu.config.height,
            &mut rng,
        );

        let store = loader.into_store();
        let render_state = RenderState::new(&gpu.device, &gpu.queue, &gpu.config, &store);

        let egui_ctx = egui::Context::default();
        let painter = OverlayPainter::new(&egui_ctx, &store, &overlay_fonts);
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        let input_state = Rc::new(RefCell::new(InputState::new()));
        let frame_ctx = FrameLoopContext::new(game, input_state.clone());

        Ok(Self {
            window,
            gpu,
            render_state,
            egui_ctx,
            egui_state,
            painter,
            input_state,
            frame_ctx,
            started: Instant::now(),
        })
    }

    fn input(&mut self, event: &WindowEvent) {
        // Nothing in the overlay is interactive; egui only sees events for its own bookkeeping
        let _ = self.egui_state.on_window_event(self.window.as_ref(), event);

        let input_event = match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, .. },
                ..
            } => key_to_input(*code, *state),
            WindowEvent::Focused(false) => InputEvent::FocusLost,
            WindowEvent::Occluded(occluded) => InputEvent::VisibilityChanged { visible: !occluded },
            _ => return,
        };
        self.input_state.borrow_mut().process_event(&input_event);
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.render_state
            .resize(&self.gpu.device, &self.gpu.surface, new_size.width, new_size.height);
        if new_size.width > 0 && new_size.height > 0 {
            self.frame_ctx.game.resize(new_size.width, new_size.height);
        }
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// When the pacer wants the next frame, or `None` if it is already due.
    fn next_frame_at(&self) -> Option<Instant> {
        let due = self.frame_ctx.pacer.next_due_ms()?;
        let at = self.started + Duration::from_secs_f64(due / 1000.0);
        (at > Instant::now()).then_some(at)
    }

    fn redraw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let Some(frame) = self.frame_ctx.tick(self.now_ms()) else { return Ok(()) };

        let ppp = self.window.scale_factor() as f32;
        let viewport = Vec2::new(
            self.render_state.width as f32 / ppp,
            self.render_state.height as f32 / ppp,
        );
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut full_output = ui::build_ui(&self.egui_ctx, raw_input, &self.painter, &frame, viewport);
        self.egui_state
            .handle_platform_output(&self.window, std::mem::take(&mut full_output.platform_output));
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), ppp);
        self.render_state.egui_primitives = Some(primitives);
        self.render_state.egui_full_output = Some(full_output);
        self.render_state.egui_dpr = ppp;

        self.render_state
            .draw_frame(&self.gpu.device, &self.gpu.queue, &self.gpu.surface, &frame)
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("The Garden Game")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window))?;
    info!("starting event loop");

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => {
            app.input(event);
            match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                WindowEvent::RedrawRequested => {
                    if let Err(e) = app.redraw() {
                        error!(error = %e, "unrecoverable surface error");
                        elwt.exit();
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => match app.next_frame_at() {
            Some(at) => elwt.set_control_flow(ControlFlow::WaitUntil(at)),
            None => app.window.request_redraw(),
        },
        Event::LoopExiting => info!("event loop exiting"),
        _ => {}
    })?;

    Ok(())
}
