use std::collections::HashMap;

use glam::Vec2;
use winit::window::WindowId;

use crate::assets::{ClipStore, Frame};
use crate::config::DEFAULT_SPAWN_POS;
use crate::ecs::components::{Animation, Body, Mode, Movement, Position};
use crate::ecs::systems::{self, input, TickInput};
use crate::menu::{self, MenuCommand, MenuOutcome};
use crate::pet;
use crate::screen::ScreenGeometry;

/// What the renderer and hit-tester need to know about one pet.
#[derive(Debug, Clone)]
pub struct PetView {
    pub pos: Vec2,
    /// Window size in pixels (frame size times scale).
    pub extent: Vec2,
    pub scale: f32,
    /// Current animation frame, `None` until any clip has loaded.
    pub frame: Option<Frame>,
    pub mode: &'static str,
}

impl PetView {
    /// Whether the pixel under `local` (window coordinates) is visible.
    /// Transparent pixels let clicks fall through to the desktop.
    pub fn is_opaque_at(&self, local: Vec2) -> bool {
        let Some(frame) = &self.frame else {
            return false;
        };
        let p = local / self.scale;
        frame.alpha_at(p.x.floor() as i32, p.y.floor() as i32) > 0
    }
}

/// Owns every pet: the ECS world, the shared clip cache, and which window
/// shows which pet.
pub struct PetManager {
    world: hecs::World,
    clips: ClipStore,
    rng: fastrand::Rng,
    windows: HashMap<WindowId, hecs::Entity>,
    /// Spawn order.
    order: Vec<hecs::Entity>,
}

impl PetManager {
    pub fn new(clips: ClipStore, rng: fastrand::Rng) -> Self {
        Self {
            world: hecs::World::new(),
            clips,
            rng,
            windows: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Add a pet at `pos` (default top-left corner area), idle.
    pub fn spawn(&mut self, pos: Option<Vec2>, now: f64) -> hecs::Entity {
        let pos = pos.unwrap_or(Vec2::new(DEFAULT_SPAWN_POS.0, DEFAULT_SPAWN_POS.1));
        let entity = pet::spawn_pet(&mut self.world, &mut self.clips, pos, now);
        self.order.push(entity);
        log::info!(
            "Spawned pet {entity:?} at ({:.0}, {:.0}), {} total",
            pos.x,
            pos.y,
            self.order.len()
        );
        entity
    }

    /// Bind a window to a pet.
    pub fn attach(&mut self, window: WindowId, entity: hecs::Entity) {
        self.windows.insert(window, entity);
    }

    /// Despawn a pet. Returns `true` when no pets remain.
    pub fn remove(&mut self, entity: hecs::Entity) -> bool {
        if self.world.despawn(entity).is_ok() {
            log::info!("Removed pet {entity:?}");
        }
        self.order.retain(|&e| e != entity);
        self.windows.retain(|_, &mut e| e != entity);
        self.order.is_empty()
    }

    /// Every pet, oldest first.
    pub fn pets(&self) -> &[hecs::Entity] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn entity_for(&self, window: WindowId) -> Option<hecs::Entity> {
        self.windows.get(&window).copied()
    }

    pub fn window_for(&self, entity: hecs::Entity) -> Option<WindowId> {
        self.windows
            .iter()
            .find_map(|(&w, &e)| (e == entity).then_some(w))
    }

    /// Decode every clip now instead of on first use.
    pub fn preload(&mut self) -> usize {
        self.clips.preload()
    }

    /// One fixed physics/behaviour step for every pet.
    pub fn tick(&mut self, input: &TickInput) {
        systems::tick(&mut self.world, &mut self.clips, input, &mut self.rng);
    }

    pub fn press(
        &mut self,
        entity: hecs::Entity,
        now: f64,
        cursor: Vec2,
    ) -> Option<input::PressOutcome> {
        input::press(&mut self.world, entity, &mut self.clips, now, cursor)
    }

    pub fn drag_to(&mut self, entity: hecs::Entity, now: f64, cursor: Vec2) -> bool {
        input::drag_to(&mut self.world, entity, &mut self.clips, now, cursor)
    }

    pub fn release(&mut self, entity: hecs::Entity, now: f64, screens: &ScreenGeometry) {
        input::release(&mut self.world, entity, &mut self.clips, now, screens);
    }

    pub fn command(&mut self, entity: hecs::Entity, command: MenuCommand, now: f64) -> MenuOutcome {
        menu::apply(command, &mut self.world, entity, &mut self.clips, now, &mut self.rng)
    }

    /// Menu toggle state for a pet.
    pub fn controls(&self, entity: hecs::Entity) -> Option<(Movement, Body)> {
        let movement = *self.world.get::<&Movement>(entity).ok()?;
        let body = *self.world.get::<&Body>(entity).ok()?;
        Some((movement, body))
    }

    /// Snapshot of a pet for drawing at time `now`.
    pub fn view(&self, entity: hecs::Entity, now: f64) -> Option<PetView> {
        let mut query = self
            .world
            .query_one::<(&Position, &Body, &Animation, &Mode)>(entity)
            .ok()?;
        let (pos, body, anim, mode) = query.get()?;
        let frame = self
            .clips
            .cached(anim.action)
            .map(|clip| clip.frame_at(anim.elapsed(now)).clone());
        Some(PetView {
            pos: pos.0,
            extent: body.extent(),
            scale: body.scale,
            frame,
            mode: mode.label(),
        })
    }
}
