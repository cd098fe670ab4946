use crate::assets::{Action, ClipStore};
use crate::config::{AMBIENT_INTERVAL, HOLD_AMBIENT_DANCE, HOLD_JUMP, JUMP_VELOCITY};
use crate::ecs::components::{
    AfterPerform, Ambient, Animation, Body, Drag, Mode, Movement, Velocity,
};
use crate::pet;

/// What an unattended pet does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientPick {
    Idle,
    WalkLeft,
    WalkRight,
    Dance,
    Jump,
}

/// Weighted pick: idle 55%, walk left 18%, walk right 17%, dance 5%, jump 5%.
pub fn pick(roll: f32) -> AmbientPick {
    if roll < 0.55 {
        AmbientPick::Idle
    } else if roll < 0.73 {
        AmbientPick::WalkLeft
    } else if roll < 0.90 {
        AmbientPick::WalkRight
    } else if roll < 0.95 {
        AmbientPick::Dance
    } else {
        AmbientPick::Jump
    }
}

/// Every few seconds, give pets with no explicit movement mode something to do.
pub fn update(world: &mut hecs::World, clips: &mut ClipStore, now: f64, rng: &mut fastrand::Rng) {
    for (_, (ambient, movement, mode, drag, anim, body, vel)) in world.query_mut::<(
        &mut Ambient,
        &Movement,
        &mut Mode,
        &Drag,
        &mut Animation,
        &mut Body,
        &mut Velocity,
    )>() {
        if now < ambient.next_at {
            continue;
        }
        ambient.next_at = now + AMBIENT_INTERVAL;

        let unattended = movement.always_active
            && !drag.active
            && !movement.stop_move
            && !movement.random_walk
            && !movement.follow_mouse
            && !anim.action.is_climb()
            && *mode == Mode::Free;
        if !unattended {
            continue;
        }

        match pick(rng.f32()) {
            AmbientPick::Idle => {
                pet::show(anim, body, clips, Action::Idle, now);
            }
            AmbientPick::WalkLeft => {
                pet::show(anim, body, clips, Action::WalkLeft, now);
            }
            AmbientPick::WalkRight => {
                pet::show(anim, body, clips, Action::WalkRight, now);
            }
            AmbientPick::Dance => {
                pet::perform(
                    mode,
                    anim,
                    body,
                    clips,
                    Action::Dance,
                    HOLD_AMBIENT_DANCE,
                    AfterPerform::Idle,
                    now,
                );
            }
            AmbientPick::Jump => {
                pet::show_held(anim, body, clips, Action::Jump, HOLD_JUMP, now);
                vel.0.y = JUMP_VELOCITY;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::pet::testutil::full_store;

    #[test]
    fn pick_thresholds() {
        assert_eq!(pick(0.0), AmbientPick::Idle);
        assert_eq!(pick(0.549), AmbientPick::Idle);
        assert_eq!(pick(0.55), AmbientPick::WalkLeft);
        assert_eq!(pick(0.80), AmbientPick::WalkRight);
        assert_eq!(pick(0.93), AmbientPick::Dance);
        assert_eq!(pick(0.99), AmbientPick::Jump);
    }

    #[test]
    fn follow_mode_suppresses_ambient_picks() {
        let mut world = hecs::World::new();
        let mut clips = full_store();
        let mut rng = fastrand::Rng::with_seed(7);
        let e = pet::spawn_pet(&mut world, &mut clips, Vec2::ZERO, 0.0);
        world.get::<&mut Animation>(e).unwrap().action = Action::Hang;

        update(&mut world, &mut clips, AMBIENT_INTERVAL, &mut rng);
        assert_eq!(world.get::<&Animation>(e).unwrap().action, Action::Hang);
        // The timer still rolls forward.
        assert_eq!(world.get::<&Ambient>(e).unwrap().next_at, AMBIENT_INTERVAL * 2.0);
    }

    #[test]
    fn unattended_pet_changes_clip_over_time() {
        let mut world = hecs::World::new();
        let mut clips = full_store();
        let mut rng = fastrand::Rng::with_seed(42);
        let e = pet::spawn_pet(&mut world, &mut clips, Vec2::ZERO, 0.0);
        world.get::<&mut Movement>(e).unwrap().follow_mouse = false;

        let mut seen = std::collections::HashSet::new();
        for i in 1..=200 {
            let now = i as f64 * AMBIENT_INTERVAL;
            // Let any dance finish so the pet is free again.
            *world.get::<&mut Mode>(e).unwrap() = Mode::Free;
            update(&mut world, &mut clips, now, &mut rng);
            seen.insert(world.get::<&Animation>(e).unwrap().action);
        }
        assert!(seen.contains(&Action::Idle));
        assert!(seen.contains(&Action::WalkLeft));
        assert!(seen.contains(&Action::WalkRight));
    }

    #[test]
    fn sleeping_pet_is_left_alone() {
        let mut world = hecs::World::new();
        let mut clips = full_store();
        let mut rng = fastrand::Rng::with_seed(1);
        let e = pet::spawn_pet(&mut world, &mut clips, Vec2::ZERO, 0.0);
        world.get::<&mut Movement>(e).unwrap().follow_mouse = false;
        *world.get::<&mut Mode>(e).unwrap() = Mode::Sleep;
        world.get::<&mut Animation>(e).unwrap().action = Action::Sleep;

        for i in 1..=20 {
            update(&mut world, &mut clips, i as f64 * AMBIENT_INTERVAL, &mut rng);
        }
        assert_eq!(world.get::<&Animation>(e).unwrap().action, Action::Sleep);
        assert_eq!(world.get::<&Velocity>(e).unwrap().0, Vec2::ZERO);
    }

    #[test]
    fn climbing_pet_stays_on_the_wall() {
        let mut world = hecs::World::new();
        let mut clips = full_store();
        let mut rng = fastrand::Rng::with_seed(42);
        let e = pet::spawn_pet(&mut world, &mut clips, Vec2::ZERO, 0.0);
        world.get::<&mut Movement>(e).unwrap().follow_mouse = false;
        world.get::<&mut Animation>(e).unwrap().action = Action::ClimbLeft;

        for i in 1..=50 {
            update(&mut world, &mut clips, i as f64 * AMBIENT_INTERVAL, &mut rng);
        }
        assert_eq!(world.get::<&Animation>(e).unwrap().action, Action::ClimbLeft);
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Free);
    }
}
