pub mod ambient;
pub mod deadlines;
pub mod input;
pub mod movement;

use glam::Vec2;

use crate::assets::ClipStore;
use crate::screen::ScreenGeometry;

/// Per-tick inputs shared by every system.
pub struct TickInput<'a> {
    /// Seconds since startup.
    pub now: f64,
    /// Fixed ticks run so far, counting this one.
    pub tick: u64,
    /// Global cursor position in screen pixels.
    pub cursor: Vec2,
    pub screens: &'a ScreenGeometry,
}

/// Run all pet systems for one fixed tick.
pub fn tick(
    world: &mut hecs::World,
    clips: &mut ClipStore,
    input: &TickInput,
    rng: &mut fastrand::Rng,
) {
    log::trace!("tick {} at {:.3}s", input.tick, input.now);

    // 1. Expire performances, clip holds, cleaning and games
    deadlines::update(world, clips, input.now);

    // 2. Ambient clip picks for unattended pets
    ambient::update(world, clips, input.now, rng);

    // 3. Gravity, climbing and walking
    movement::integrate(world, clips, input, rng);
}
