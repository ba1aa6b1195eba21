pub mod assets;
pub mod config;
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tracing::{error, info};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::convert::FromWasmAbi;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, Event, EventTarget, HtmlCanvasElement, KeyboardEvent, Window};

    use crate::assets::AssetLoader;
    use crate::config::{self, GameConfig};
    use crate::controller::input::wasm::keyboard_event_to_input;
    use crate::controller::{FrameLoopContext, Game, InputEvent, InputProcessor, InputState, KeyBindings};
    use crate::logging;
    use crate::model::SceneAssets;
    use crate::ui::{self, OverlayPainter};
    use crate::view::{GpuContext, RenderState};

    const DEFAULT_SIZE: (u32, u32) = (800, 600);

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        logging::init();
        let (window, document, canvas) = init_canvas()?;
        setup_app(&window, &document, &canvas).await
    }

    /// Load everything, then hand the game to the animation loop.
    async fn setup_app(
        window: &Window,
        document: &Document,
        canvas: &HtmlCanvasElement,
    ) -> Result<(), JsValue> {
        let gpu = GpuContext::new(canvas, canvas.width(), canvas.height())
            .await
            .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
        let width = gpu.config.width;
        let height = gpu.config.height;

        // Nothing is drawn until every asset is in
        let mut loader = AssetLoader::new(config::ASSET_ROOT);
        let assets = match SceneAssets::load(&mut loader).await {
            Ok(assets) => assets,
            Err(e) => {
                error!(error = %e, "asset loading failed");
                return Err(js_error(format!("asset loading failed: {e}")));
            }
        };
        let overlay_fonts = [assets.title_font];

        let mut rng = StdRng::seed_from_u64(js_sys::Date::now().to_bits());
        let bindings = KeyBindings::default();
        let game = Game::new(assets, GameConfig::DEFAULT, bindings.clone(), width, height, &mut rng);

        let store = loader.into_store();
        let mut render_state = RenderState::new(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.config, &store);

        let egui_ctx = egui::Context::default();
        let painter = OverlayPainter::new(&egui_ctx, &store, &overlay_fonts);
        drop(store);

        let input_state = Rc::new(RefCell::new(InputState::new()));
        setup_input_listeners(document, window, input_state.clone(), InputProcessor::new(bindings))?;

        let mut frame_ctx = FrameLoopContext::new(game, input_state);
        info!(width, height, "starting frame loop");

        let frame_loop = AnimationLoop::new(window.clone(), {
            let window = window.clone();
            let canvas = canvas.clone();

            move || {
                let now = window.performance().map(|p| p.now()).unwrap_or(0.0);
                handle_resize(&window, &canvas, &gpu, &mut render_state, &mut frame_ctx);

                let Some(frame) = frame_ctx.tick(now) else { return };

                let viewport = Vec2::new(render_state.width as f32, render_state.height as f32);
                let raw_input = ui::raw_input(render_state.width, render_state.height, 1.0, now);
                let mut full_output = ui::build_ui(&egui_ctx, raw_input, &painter, &frame, viewport);
                let primitives = egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), 1.0);
                render_state.egui_primitives = Some(primitives);
                render_state.egui_full_output = Some(full_output);
                render_state.egui_dpr = 1.0;

                if let Err(e) = render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, &frame) {
                    error!(error = %e, "unrecoverable surface error");
                }
            }
        });
        frame_loop.start();

        Ok(())
    }

    fn window_size(window: &Window) -> (u32, u32) {
        let dim = |v: Result<JsValue, JsValue>, fallback: u32| {
            v.ok().and_then(|v| v.as_f64()).map(|v| v as u32).unwrap_or(fallback)
        };
        (dim(window.inner_width(), DEFAULT_SIZE.0), dim(window.inner_height(), DEFAULT_SIZE.1))
    }

    fn handle_resize(
        window: &Window,
        canvas: &HtmlCanvasElement,
        gpu: &GpuContext,
        render_state: &mut RenderState,
        frame_ctx: &mut FrameLoopContext,
    ) {
        let (w, h) = window_size(window);
        if w == 0 || h == 0 || (w == render_state.width && h == render_state.height) {
            return;
        }
        canvas.set_width(w);
        canvas.set_height(h);
        render_state.resize(gpu.device.as_ref(), &gpu.surface, w, h);
        frame_ctx.game.resize(w, h);
    }

    /// Attach `handler` to `target` for the lifetime of the page.
    fn listen<E>(target: &EventTarget, event: &str, handler: impl FnMut(E) + 'static) -> Result<(), JsValue>
    where
        E: FromWasmAbi + 'static,
    {
        let closure = Closure::<dyn FnMut(E)>::new(handler);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    /// Keyboard, focus and visibility listeners feeding the shared key state.
    fn setup_input_listeners(
        document: &Document,
        window: &Window,
        input_state: Rc<RefCell<InputState>>,
        processor: InputProcessor,
    ) -> Result<(), JsValue> {
        for (event, down) in [("keydown", true), ("keyup", false)] {
            let input_state = input_state.clone();
            let processor = processor.clone();
            listen(document, event, move |e: KeyboardEvent| {
                // arrows and space would scroll the page
                if processor.is_game_key(&e.code()) {
                    e.prevent_default();
                }
                input_state.borrow_mut().process_event(&keyboard_event_to_input(&e, down));
            })?;
        }

        let on_blur = input_state.clone();
        listen(window, "blur", move |_: Event| {
            on_blur.borrow_mut().process_event(&InputEvent::FocusLost);
        })?;

        let doc = document.clone();
        listen(document, "visibilitychange", move |_: Event| {
            let visible = !doc.hidden();
            input_state.borrow_mut().process_event(&InputEvent::VisibilityChanged { visible });
        })?;

        Ok(())
    }

    fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
        let window = web_sys::window().ok_or(js_error("no global `window`"))?;
        let document = window.document().ok_or(js_error("no document on window"))?;
        let body = document.body().ok_or(js_error("no body on document"))?;
        let canvas_el = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        let (width, height) = window_size(&window);
        canvas_el.set_width(width);
        canvas_el.set_height(height);
        body.append_child(&canvas_el)?;
        Ok((window, document, canvas_el))
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }

    /// Calls a frame callback on every `requestAnimationFrame` until the page
    /// goes away.
    struct AnimationLoop {
        window: Window,
        on_frame: Box<dyn FnMut()>,
    }

    impl AnimationLoop {
        fn new(window: Window, on_frame: impl FnMut() + 'static) -> Self {
            Self { window, on_frame: Box::new(on_frame) }
        }

        fn start(self) {
            let Self { window, mut on_frame } = self;
            // the closure has to hold a handle to itself to re-arm
            let slot: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
            let rearm = slot.clone();
            let raf_window = window.clone();

            *slot.borrow_mut() = Some(Closure::new(move || {
                on_frame();
                if let Some(cb) = rearm.borrow().as_ref() {
                    request_frame(&raf_window, cb);
                }
            }));

            if let Some(cb) = slot.borrow().as_ref() {
                request_frame(&window, cb);
            }
            // never dropped: the loop lives as long as the page
            std::mem::forget(slot);
        }
    }

    fn request_frame(window: &Window, cb: &Closure<dyn FnMut()>) {
        if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            error!(error = ?e, "requestAnimationFrame failed");
        }
    }
}
