use glam::Vec2;

use crate::assets::{Action, ClipStore};
use crate::config::*;
use crate::ecs::components::{
    AfterPerform, Animation, Body, ClickHistory, ClickKind, Drag, DragSample, Mode, Position,
    Velocity,
};
use crate::pet;
use crate::screen::ScreenGeometry;
use crate::util::ring::RingBuffer;

/// What a left-button press on a pet turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Grabbed,
    DoubleClick,
    /// Too many clicks too fast.
    Angry,
    /// A catch during the chase game; carries the new score.
    Caught(u32),
}

type PointerQuery<'a> = (
    &'a mut Position,
    &'a mut Velocity,
    &'a mut Body,
    &'a mut Animation,
    &'a mut Mode,
    &'a mut Drag,
    &'a mut ClickHistory,
);

/// Left button pressed over `entity` with the cursor at `cursor`.
pub fn press(
    world: &mut hecs::World,
    entity: hecs::Entity,
    clips: &mut ClipStore,
    now: f64,
    cursor: Vec2,
) -> Option<PressOutcome> {
    let (pos, vel, body, anim, mode, drag, clicks) =
        world.query_one_mut::<PointerQuery>(entity).ok()?;

    let kind = clicks.record(now, cursor);

    if clicks.take_rapid(now) {
        log::info!("Pet {entity:?} is annoyed by rapid clicking");
        pet::perform(mode, anim, body, clips, Action::Angry, HOLD_MED, AfterPerform::Idle, now);
        return Some(PressOutcome::Angry);
    }

    if let Mode::Game(game) = mode {
        game.score += 1;
        vel.0.y = GAME_HOP_VELOCITY;
        pet::show_held(anim, body, clips, Action::Surprise, HOLD_WALL_JUMP, now);
        log::debug!("Pet {entity:?} caught ({} so far)", game.score);
        return Some(PressOutcome::Caught(game.score));
    }

    if kind == ClickKind::Double {
        let then = if *mode == Mode::Sleep {
            AfterPerform::Wake
        } else {
            AfterPerform::Idle
        };
        pet::perform(mode, anim, body, clips, Action::Surprise, HOLD_SHORT, then, now);
        return Some(PressOutcome::DoubleClick);
    }

    // A sleeper only wakes once it is actually moved, so the first half of
    // a double-click leaves it asleep.
    let asleep = *mode == Mode::Sleep;
    if !asleep {
        *mode = Mode::Free;
    }
    drag.active = true;
    drag.offset = cursor - pos.0;
    drag.samples.clear();
    drag.samples.push(DragSample { t: now, pos: cursor });
    vel.0 = Vec2::ZERO;
    body.bounces = 0;
    anim.hold_until = None;
    if !asleep {
        pet::show(anim, body, clips, Action::Hang, now);
    }
    Some(PressOutcome::Grabbed)
}

/// Cursor moved while the button is down. Returns whether the pet moved.
pub fn drag_to(
    world: &mut hecs::World,
    entity: hecs::Entity,
    clips: &mut ClipStore,
    now: f64,
    cursor: Vec2,
) -> bool {
    let Ok((pos, body, anim, mode, drag)) = world
        .query_one_mut::<(&mut Position, &mut Body, &mut Animation, &mut Mode, &mut Drag)>(entity)
    else {
        return false;
    };
    if !drag.active {
        return false;
    }
    if drag.samples.last().is_some_and(|s| s.pos == cursor) {
        return false;
    }
    if *mode == Mode::Sleep {
        log::info!("Pet {entity:?} woke up when picked up");
        *mode = Mode::Free;
        pet::show(anim, body, clips, Action::Hang, now);
    }
    pos.0 = cursor - drag.offset;
    drag.samples.push(DragSample { t: now, pos: cursor });
    true
}

/// Left button released. Dropping near a side edge grabs the wall;
/// anywhere else the pet is thrown with the recent drag velocity.
pub fn release(
    world: &mut hecs::World,
    entity: hecs::Entity,
    clips: &mut ClipStore,
    now: f64,
    screens: &ScreenGeometry,
) {
    let Ok((pos, vel, body, anim, mode, drag, _clicks)) =
        world.query_one_mut::<PointerQuery>(entity)
    else {
        return;
    };
    if !drag.active {
        return;
    }
    drag.active = false;
    // Pressed and let go without moving: still asleep where it lay.
    if *mode == Mode::Sleep {
        return;
    }

    let extent = body.extent();
    let screen = screens.monitor_at(pos.0 + extent * 0.5);
    let left = screen.x as f32;
    let right = screen.right() as f32 - extent.x;

    if pos.0.x <= left + EDGE_MARGIN && pet::show(anim, body, clips, Action::ClimbLeft, now) {
        pos.0.x = left;
        vel.0 = Vec2::ZERO;
        return;
    }
    if pos.0.x >= right - EDGE_MARGIN && pet::show(anim, body, clips, Action::ClimbRight, now) {
        pos.0.x = right;
        vel.0 = Vec2::ZERO;
        return;
    }

    vel.0 = throw_velocity(&drag.samples, now);
    body.bounces = 0;
    if vel.0 != Vec2::ZERO {
        log::debug!("Pet {entity:?} thrown at {:?}", vel.0);
    }
}

/// Average cursor velocity (pixels per tick) over the last `THROW_WINDOW`
/// seconds of the drag, capped at `MAX_THROW_SPEED`.
pub fn throw_velocity(samples: &RingBuffer<DragSample>, now: f64) -> Vec2 {
    if samples.is_empty() {
        return Vec2::ZERO;
    }
    let mut recent = samples.iter().filter(|s| now - s.t <= THROW_WINDOW);
    let Some(first) = recent.next().copied() else {
        return Vec2::ZERO;
    };
    let Some(last) = recent.last().copied() else {
        return Vec2::ZERO;
    };
    let dt = last.t - first.t;
    if dt <= 0.0 {
        return Vec2::ZERO;
    }
    let ticks = (dt / TICK_RATE) as f32;
    ((last.pos - first.pos) / ticks).clamp_length_max(MAX_THROW_SPEED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::ChaseGame;
    use crate::pet::testutil::full_store;
    use crate::screen::Rect;

    fn setup() -> (hecs::World, hecs::Entity, ClipStore, ScreenGeometry) {
        let mut world = hecs::World::new();
        let mut clips = full_store();
        let e = pet::spawn_pet(&mut world, &mut clips, Vec2::new(400.0, 520.0), 0.0);
        (world, e, clips, ScreenGeometry::single(Rect::new(0, 0, 1000, 600)))
    }

    fn action(world: &hecs::World, e: hecs::Entity) -> Action {
        world.get::<&Animation>(e).unwrap().action
    }

    #[test]
    fn press_grabs_and_drag_moves_with_cursor() {
        let (mut world, e, mut clips, _) = setup();
        let out = press(&mut world, e, &mut clips, 1.0, Vec2::new(410.0, 530.0));
        assert_eq!(out, Some(PressOutcome::Grabbed));
        assert_eq!(action(&world, e), Action::Hang);

        assert!(drag_to(&mut world, e, &mut clips, 1.1, Vec2::new(510.0, 330.0)));
        assert_eq!(world.get::<&Position>(e).unwrap().0, Vec2::new(500.0, 320.0));
    }

    #[test]
    fn drag_without_press_is_ignored() {
        let (mut world, e, mut clips, _) = setup();
        assert!(!drag_to(&mut world, e, &mut clips, 1.0, Vec2::new(0.0, 0.0)));
        assert_eq!(world.get::<&Position>(e).unwrap().0, Vec2::new(400.0, 520.0));
    }

    #[test]
    fn release_at_left_edge_starts_climbing() {
        let (mut world, e, mut clips, screens) = setup();
        press(&mut world, e, &mut clips, 1.0, Vec2::new(410.0, 530.0));
        drag_to(&mut world, e, &mut clips, 1.1, Vec2::new(15.0, 300.0));
        release(&mut world, e, &mut clips, 1.2, &screens);
        assert_eq!(action(&world, e), Action::ClimbLeft);
        assert_eq!(world.get::<&Position>(e).unwrap().0.x, 0.0);
        assert!(!world.get::<&Drag>(e).unwrap().active);
    }

    #[test]
    fn release_at_right_edge_starts_climbing() {
        let (mut world, e, mut clips, screens) = setup();
        press(&mut world, e, &mut clips, 1.0, Vec2::new(410.0, 530.0));
        drag_to(&mut world, e, &mut clips, 1.1, Vec2::new(940.0, 300.0));
        release(&mut world, e, &mut clips, 1.2, &screens);
        assert_eq!(action(&world, e), Action::ClimbRight);
        assert_eq!(world.get::<&Position>(e).unwrap().0.x, 936.0);
    }

    #[test]
    fn release_mid_screen_throws() {
        let (mut world, e, mut clips, screens) = setup();
        let t0 = 1.0;
        press(&mut world, e, &mut clips, t0, Vec2::new(410.0, 530.0));
        for i in 1..=6 {
            let t = t0 + i as f64 * TICK_RATE;
            let cursor = Vec2::new(410.0 + i as f32 * 10.0, 530.0 - i as f32 * 5.0);
            drag_to(&mut world, e, &mut clips, t, cursor);
        }
        release(&mut world, e, &mut clips, t0 + 6.0 * TICK_RATE, &screens);
        let v = world.get::<&Velocity>(e).unwrap().0;
        assert!((v.x - 10.0).abs() < 0.01, "vx = {}", v.x);
        assert!((v.y + 5.0).abs() < 0.01, "vy = {}", v.y);
        assert_eq!(action(&world, e), Action::Hang);
    }

    #[test]
    fn stale_drag_samples_do_not_throw() {
        let mut samples = RingBuffer::new(8);
        samples.push(DragSample { t: 0.0, pos: Vec2::ZERO });
        samples.push(DragSample { t: 0.05, pos: Vec2::new(100.0, 0.0) });
        assert_eq!(throw_velocity(&samples, 2.0), Vec2::ZERO);
    }

    #[test]
    fn throw_speed_is_capped() {
        let mut samples = RingBuffer::new(8);
        samples.push(DragSample { t: 1.0, pos: Vec2::ZERO });
        samples.push(DragSample { t: 1.0 + TICK_RATE, pos: Vec2::new(500.0, 0.0) });
        let v = throw_velocity(&samples, 1.0 + TICK_RATE);
        assert!((v.length() - MAX_THROW_SPEED).abs() < 1e-3);
    }

    #[test]
    fn double_click_surprises() {
        let (mut world, e, mut clips, screens) = setup();
        let p = Vec2::new(410.0, 530.0);
        press(&mut world, e, &mut clips, 1.0, p);
        release(&mut world, e, &mut clips, 1.05, &screens);
        let out = press(&mut world, e, &mut clips, 1.2, p);
        assert_eq!(out, Some(PressOutcome::DoubleClick));
        assert_eq!(action(&world, e), Action::Surprise);
        assert!(!world.get::<&Drag>(e).unwrap().active);
    }

    fn put_to_sleep(world: &mut hecs::World, e: hecs::Entity, clips: &mut ClipStore) {
        let mut rng = fastrand::Rng::with_seed(1);
        crate::menu::apply(crate::menu::MenuCommand::Sleep, world, e, clips, 0.5, &mut rng);
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Sleep);
    }

    #[test]
    fn double_click_on_sleeper_wakes_it_afterwards() {
        let (mut world, e, mut clips, screens) = setup();
        put_to_sleep(&mut world, e, &mut clips);
        let p = Vec2::new(410.0, 530.0);

        assert_eq!(press(&mut world, e, &mut clips, 1.0, p), Some(PressOutcome::Grabbed));
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Sleep);
        assert_eq!(action(&world, e), Action::Sleep);
        release(&mut world, e, &mut clips, 1.05, &screens);
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Sleep);
        assert_eq!(world.get::<&Velocity>(e).unwrap().0, Vec2::ZERO);

        let out = press(&mut world, e, &mut clips, 1.1, p);
        assert_eq!(out, Some(PressOutcome::DoubleClick));
        assert_eq!(action(&world, e), Action::Surprise);
        assert_eq!(
            *world.get::<&Mode>(e).unwrap(),
            Mode::Perform {
                until: 1.1 + HOLD_SHORT,
                then: AfterPerform::Wake,
            }
        );
    }

    #[test]
    fn dragging_a_sleeper_wakes_it() {
        let (mut world, e, mut clips, _) = setup();
        put_to_sleep(&mut world, e, &mut clips);
        press(&mut world, e, &mut clips, 1.0, Vec2::new(410.0, 530.0));

        // Same spot: not a move.
        assert!(!drag_to(&mut world, e, &mut clips, 1.02, Vec2::new(410.0, 530.0)));
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Sleep);

        assert!(drag_to(&mut world, e, &mut clips, 1.04, Vec2::new(420.0, 500.0)));
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Free);
        assert_eq!(action(&world, e), Action::Hang);
        assert_eq!(world.get::<&Position>(e).unwrap().0, Vec2::new(410.0, 490.0));
    }

    #[test]
    fn five_quick_presses_make_the_pet_angry() {
        let (mut world, e, mut clips, screens) = setup();
        let mut last = None;
        for i in 0..5 {
            let t = 1.0 + i as f64 * 0.15;
            // Spread presses out so they never pair into double clicks.
            let p = Vec2::new(400.0 + i as f32 * 10.0, 530.0);
            last = press(&mut world, e, &mut clips, t, p);
            release(&mut world, e, &mut clips, t + 0.01, &screens);
        }
        assert_eq!(last, Some(PressOutcome::Angry));
        assert_eq!(action(&world, e), Action::Angry);
        assert!(!world.get::<&Drag>(e).unwrap().active);
    }

    #[test]
    fn presses_during_the_game_score() {
        let (mut world, e, mut clips, _) = setup();
        *world.get::<&mut Mode>(e).unwrap() = Mode::Game(ChaseGame {
            until: 20.0,
            score: 0,
        });
        let out = press(&mut world, e, &mut clips, 1.0, Vec2::new(410.0, 530.0));
        assert_eq!(out, Some(PressOutcome::Caught(1)));
        assert!(!world.get::<&Drag>(e).unwrap().active);
        assert_eq!(world.get::<&Velocity>(e).unwrap().0.y, GAME_HOP_VELOCITY);
    }

    #[test]
    fn grabbing_interrupts_a_performance() {
        let (mut world, e, mut clips, _) = setup();
        *world.get::<&mut Mode>(e).unwrap() = Mode::Perform {
            until: 10.0,
            then: AfterPerform::Idle,
        };
        press(&mut world, e, &mut clips, 1.0, Vec2::new(410.0, 530.0));
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Free);
        assert_eq!(action(&world, e), Action::Hang);
    }
}
