use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Icon, Window, WindowAttributes, WindowId, WindowLevel};

use crate::assets::{self, ClipStore};
use crate::config::{PetConfig, DEFAULT_SPAWN_POS, MAX_ACCUMULATOR, SPAWN_OFFSET, TICK_RATE};
use crate::ecs::systems::input::PressOutcome;
use crate::ecs::systems::TickInput;
use crate::error::{PetError, Result};
use crate::manager::{PetManager, PetView};
use crate::menu::{self, MenuCommand, MenuOutcome};
use crate::platform;
use crate::render::{GpuContext, SpriteSurface};
use crate::screen::ScreenGeometry;

/// How often to log frame stats (seconds).
const FPS_LOG_INTERVAL: f64 = 5.0;
/// How often to re-read monitor layout (seconds).
const SCREEN_REFRESH_INTERVAL: f64 = 2.0;

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

struct FrameStats {
    frame_count: u64,
    last_log_time: Instant,
    frame_time_sum: f64,
    frame_time_max: f64,
    frames_since_log: u32,
    ticks_since_log: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frame_count: 0,
            last_log_time: Instant::now(),
            frame_time_sum: 0.0,
            frame_time_max: 0.0,
            frames_since_log: 0,
            ticks_since_log: 0,
        }
    }

    fn record_frame(&mut self, dt: f64, ticks: u32, pets: usize) {
        self.frame_count += 1;
        self.frames_since_log += 1;
        self.ticks_since_log += ticks;
        self.frame_time_sum += dt;
        self.frame_time_max = self.frame_time_max.max(dt);

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= FPS_LOG_INTERVAL {
            let avg_ms = (self.frame_time_sum / self.frames_since_log as f64) * 1000.0;
            log::debug!(
                "updates/s: {:.0} | ticks/s: {:.0} | avg: {:.2}ms | max: {:.2}ms | pets: {} | \
                 total: {}",
                self.frames_since_log as f64 / elapsed,
                self.ticks_since_log as f64 / elapsed,
                avg_ms,
                self.frame_time_max * 1000.0,
                pets,
                self.frame_count,
            );
            self.last_log_time = Instant::now();
            self.frame_time_sum = 0.0;
            self.frame_time_max = 0.0;
            self.frames_since_log = 0;
            self.ticks_since_log = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Pet windows
// ---------------------------------------------------------------------------

/// Where a window was asked to go versus where the OS last said it is.
/// Moves are asynchronous on some platforms, and cursor events stay
/// relative to the reported origin until the move lands.
#[derive(Debug, Clone, Copy)]
struct Placement {
    requested: PhysicalPosition<i32>,
    reported: PhysicalPosition<i32>,
}

impl Placement {
    fn new(pos: PhysicalPosition<i32>) -> Self {
        Self {
            requested: pos,
            reported: pos,
        }
    }

    /// Record a move request. Returns `false` when the window is already
    /// headed there.
    fn request(&mut self, pos: PhysicalPosition<i32>) -> bool {
        if pos == self.requested {
            return false;
        }
        self.requested = pos;
        true
    }

    fn moved(&mut self, pos: PhysicalPosition<i32>) {
        self.reported = pos;
    }

    /// Screen position of a window-relative cursor position.
    fn to_screen(&self, local: PhysicalPosition<f64>) -> Vec2 {
        Vec2::new(
            self.reported.x as f32 + local.x as f32,
            self.reported.y as f32 + local.y as f32,
        )
    }
}

/// A window showing one pet.
struct PetWindow {
    window: Arc<Window>,
    surface: SpriteSurface,
    entity: hecs::Entity,
    placement: Placement,
    /// Size we last asked for.
    requested: PhysicalSize<u32>,
    hit_test: bool,
    view: Option<PetView>,
}

fn window_size(extent: Vec2) -> PhysicalSize<u32> {
    PhysicalSize::new(
        extent.x.round().max(1.0) as u32,
        extent.y.round().max(1.0) as u32,
    )
}

fn window_pos(pos: Vec2) -> PhysicalPosition<i32> {
    PhysicalPosition::new(pos.x.round() as i32, pos.y.round() as i32)
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

struct App {
    config: PetConfig,
    manager: PetManager,
    gpu: Option<GpuContext>,
    windows: HashMap<WindowId, PetWindow>,
    icon: Option<Icon>,
    screens: ScreenGeometry,
    screens_read_at: f64,

    /// Last cursor position seen in window events (screen pixels).
    cursor: Vec2,
    /// Pet currently held by the left button.
    dragging: Option<hecs::Entity>,

    // Fixed timestep
    started: Instant,
    last_frame_time: Option<Instant>,
    accumulator: f64,
    tick_count: u64,

    frame_stats: FrameStats,
    initialized: bool,
    fatal: Option<PetError>,
}

impl App {
    fn new(config: PetConfig) -> Self {
        let clips = ClipStore::new(config.asset_dir(), config.bg_mode);
        Self {
            config,
            manager: PetManager::new(clips, fastrand::Rng::new()),
            gpu: None,
            windows: HashMap::new(),
            icon: None,
            screens: ScreenGeometry::new(Vec::new(), 0),
            screens_read_at: 0.0,
            cursor: Vec2::ZERO,
            dragging: None,
            started: Instant::now(),
            last_frame_time: None,
            accumulator: 0.0,
            tick_count: 0,
            frame_stats: FrameStats::new(),
            initialized: false,
            fatal: None,
        }
    }

    /// Seconds since startup; the clock every pet deadline is measured on.
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn cursor_now(&self) -> Vec2 {
        platform::cursor_position().unwrap_or(self.cursor)
    }

    fn load_icon(&mut self) {
        let Some(path) = self.config.icon_path() else {
            log::info!("No window icon found");
            return;
        };
        let Some((rgba, w, h)) = assets::load_icon(&path) else {
            return;
        };
        match Icon::from_rgba(rgba, w, h) {
            Ok(icon) => self.icon = Some(icon),
            Err(e) => log::warn!("Bad window icon {}: {e}", path.display()),
        }
    }

    /// Create the window (and GPU surface) for `entity`.
    fn open_window(&mut self, event_loop: &ActiveEventLoop, entity: hecs::Entity) -> Result<()> {
        let now = self.now();
        let Some(view) = self.manager.view(entity, now) else {
            return Ok(());
        };
        let size = window_size(view.extent);
        let pos = window_pos(view.pos);

        // Windows gets its transparency from DirectComposition; the layered
        // style winit uses for with_transparent would fight it.
        let attrs = WindowAttributes::default()
            .with_title(format!("{} #{}", self.config.character, self.manager.len()))
            .with_decorations(false)
            .with_transparent(cfg!(not(windows)))
            .with_resizable(false)
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_window_icon(self.icon.clone())
            .with_inner_size(size)
            .with_position(pos);

        let window = Arc::new(event_loop.create_window(attrs)?);
        platform::prepare_pet_window(&window);

        let surface = match &self.gpu {
            Some(gpu) => gpu.create_surface(window.clone())?,
            None => {
                let (gpu, surface) = GpuContext::new(window.clone())?;
                self.gpu = Some(gpu);
                surface
            }
        };

        let id = window.id();
        let mut placement = Placement::new(pos);
        placement.moved(window.inner_position().unwrap_or(pos));
        log::info!(
            "Pet window {:?} for {entity:?}: {}x{} at ({}, {})",
            id,
            size.width,
            size.height,
            pos.x,
            pos.y
        );

        // Show only once styles and GPU resources are ready, so DWM never
        // caches a white frame.
        window.set_visible(true);

        self.manager.attach(id, entity);
        self.windows.insert(
            id,
            PetWindow {
                window,
                surface,
                entity,
                placement,
                requested: size,
                hit_test: true,
                view: Some(view),
            },
        );
        Ok(())
    }

    fn spawn_pet(&mut self, event_loop: &ActiveEventLoop, pos: Option<Vec2>) {
        let entity = self.manager.spawn(pos, self.now());
        if let Err(e) = self.open_window(event_loop, entity) {
            log::error!("Could not open a window for {entity:?}: {e}");
            if self.manager.remove(entity) {
                self.fail(event_loop, e);
            }
        }
    }

    fn close_pet(&mut self, event_loop: &ActiveEventLoop, entity: hecs::Entity) {
        if let Some(id) = self.manager.window_for(entity) {
            self.windows.remove(&id);
        }
        if self.dragging == Some(entity) {
            self.dragging = None;
        }
        if self.manager.remove(entity) {
            log::info!("Last pet closed, exiting");
            event_loop.exit();
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: PetError) {
        self.fatal = Some(e);
        event_loop.exit();
    }

    fn run_command(
        &mut self,
        event_loop: &ActiveEventLoop,
        entity: hecs::Entity,
        command: MenuCommand,
    ) {
        match self.manager.command(entity, command, self.now()) {
            MenuOutcome::None => {}
            MenuOutcome::Spawn(pos) => self.spawn_pet(event_loop, Some(pos)),
            MenuOutcome::Close => self.close_pet(event_loop, entity),
            MenuOutcome::QuitAll => {
                log::info!("Quit requested from the menu");
                // Oldest first; closing the last one exits the loop.
                for pet in self.manager.pets().to_vec() {
                    self.close_pet(event_loop, pet);
                }
            }
        }
    }

    fn open_menu(&mut self, event_loop: &ActiveEventLoop, id: WindowId, entity: hecs::Entity) {
        let Some((movement, body)) = self.manager.controls(entity) else {
            return;
        };
        let Some(pet_window) = self.windows.get(&id) else {
            return;
        };
        if let Some(command) = menu::show(&pet_window.window, &movement, &body) {
            self.run_command(event_loop, entity, command);
        }
    }

    /// Run fixed-timestep simulation ticks.
    fn run_fixed_update(&mut self, dt: f64) -> u32 {
        self.accumulator += dt;

        if self.accumulator > MAX_ACCUMULATOR {
            self.accumulator = MAX_ACCUMULATOR;
        }

        // Cursor and clock once per frame, not per tick
        let now = self.now();
        let cursor = self.cursor_now();

        let mut ticks = 0;
        while self.accumulator >= TICK_RATE {
            self.tick_count += 1;
            self.manager.tick(&TickInput {
                now,
                tick: self.tick_count,
                cursor,
                screens: &self.screens,
            });

            self.accumulator -= TICK_RATE;
            ticks += 1;
        }
        ticks
    }

    /// Move and resize windows to match their pets, and update click-through.
    fn sync_windows(&mut self) {
        let now = self.now();
        let global_cursor = platform::cursor_position();
        for pet_window in self.windows.values_mut() {
            let Some(view) = self.manager.view(pet_window.entity, now) else {
                continue;
            };

            let pos = window_pos(view.pos);
            if pet_window.placement.request(pos) {
                pet_window.window.set_outer_position(pos);
            }

            let size = window_size(view.extent);
            if size != pet_window.requested {
                // The surface follows in the Resized event.
                let _ = pet_window.window.request_inner_size(size);
                pet_window.requested = size;
            }

            // Without a global cursor we could never turn hit-testing back
            // on, so only click through where the OS tells us where it is.
            if let Some(cursor) = global_cursor {
                let hit = self.dragging == Some(pet_window.entity)
                    || view.is_opaque_at(cursor - view.pos);
                if hit != pet_window.hit_test {
                    if platform::set_click_through(&pet_window.window, !hit) {
                        pet_window.hit_test = hit;
                    } else {
                        log::debug!("Click-through unsupported for {:?}", pet_window.entity);
                    }
                }
            }

            if let Some(prev) = &pet_window.view {
                if prev.mode != view.mode {
                    log::debug!("Pet {:?}: {} -> {}", pet_window.entity, prev.mode, view.mode);
                }
            }
            pet_window.view = Some(view);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        self.screens = platform::screen_geometry(event_loop);
        self.screens_read_at = self.now();
        let primary = self.screens.primary();
        let desktop = self.screens.virtual_bounds();
        log::info!(
            "{} monitor(s) spanning {}x{}, primary usable area {}x{} at ({}, {})",
            self.screens.monitors.len(),
            desktop.w,
            desktop.h,
            primary.w,
            primary.h,
            primary.x,
            primary.y
        );

        self.load_icon();
        let loaded = self.manager.preload();
        log::info!(
            "Character '{}': {loaded} clip(s) loaded from {}",
            self.config.character,
            self.config.asset_dir().display()
        );

        // Extra startup pets cascade from the default spot.
        let origin = Vec2::new(DEFAULT_SPAWN_POS.0, DEFAULT_SPAWN_POS.1);
        let offset = Vec2::new(SPAWN_OFFSET.0, SPAWN_OFFSET.1);
        for i in 0..self.config.initial_pets {
            self.spawn_pet(event_loop, Some(origin + offset * i as f32));
            if self.fatal.is_some() {
                return;
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.manager.is_empty() {
            return;
        }

        let now = self.now();
        if now - self.screens_read_at >= SCREEN_REFRESH_INTERVAL {
            self.screens = platform::screen_geometry(event_loop);
            self.screens_read_at = now;
        }

        // --- Timing ---
        let frame_start = Instant::now();
        if let Some(last) = self.last_frame_time {
            let dt = frame_start.duration_since(last).as_secs_f64();
            let ticks = self.run_fixed_update(dt);
            self.frame_stats.record_frame(dt, ticks, self.manager.len());
        }
        self.last_frame_time = Some(frame_start);

        self.sync_windows();
        for pet_window in self.windows.values() {
            pet_window.window.request_redraw();
        }

        // Sleep until the next tick is due instead of spinning.
        event_loop.set_control_flow(ControlFlow::WaitUntil(
            frame_start + Duration::from_secs_f64(TICK_RATE),
        ));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entity) = self.manager.entity_for(window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested for {entity:?}");
                self.close_pet(event_loop, entity);
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(gpu), Some(pet_window)) = (&self.gpu, self.windows.get_mut(&window_id))
                {
                    pet_window.surface.resize(gpu, new_size.width, new_size.height);
                }
            }
            WindowEvent::Moved(pos) => {
                if let Some(pet_window) = self.windows.get_mut(&window_id) {
                    pet_window.placement.moved(pos);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let Some(pet_window) = self.windows.get(&window_id) else {
                    return;
                };
                self.cursor = pet_window.placement.to_screen(position);
                if self.dragging == Some(entity) {
                    let now = self.now();
                    let cursor = self.cursor_now();
                    self.manager.drag_to(entity, now, cursor);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let now = self.now();
                let cursor = self.cursor_now();
                match (button, state) {
                    (MouseButton::Left, ElementState::Pressed) => {
                        let outcome = self.manager.press(entity, now, cursor);
                        log::debug!("Press on {entity:?}: {outcome:?}");
                        if outcome == Some(PressOutcome::Grabbed) {
                            self.dragging = Some(entity);
                        }
                    }
                    (MouseButton::Left, ElementState::Released) => {
                        if self.dragging == Some(entity) {
                            self.dragging = None;
                            self.manager.release(entity, now, &self.screens);
                        }
                    }
                    (MouseButton::Right, ElementState::Pressed) => {
                        self.open_menu(event_loop, window_id, entity);
                    }
                    _ => {}
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match &event.logical_key {
                    Key::Named(NamedKey::Escape) => {
                        log::info!("Esc on {entity:?}, closing it");
                        self.close_pet(event_loop, entity);
                    }
                    Key::Character(s) => {
                        if let Some(command) = menu::shortcut(s) {
                            self.run_command(event_loop, entity, command);
                        }
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                if let (Some(gpu), Some(pet_window)) = (&self.gpu, self.windows.get_mut(&window_id))
                {
                    let frame = pet_window.view.as_ref().and_then(|v| v.frame.as_ref());
                    pet_window.surface.draw(gpu, frame);
                }
            }
            _ => {}
        }
    }
}

/// Entry point: create the event loop and run until the last pet is gone.
pub fn run() -> Result<()> {
    let config = PetConfig::from_env();
    log::info!(
        "Config: character '{}', background {:?}, {} pet(s), home {}",
        config.character,
        config.bg_mode,
        config.initial_pets,
        config.base_dir.display()
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.fatal.take() {
        return Err(e);
    }
    log::info!("Ran {} ticks", app.tick_count);
    Ok(())
}
