use glam::Vec2;

use crate::assets::{Action, ClipStore};
use crate::config::AMBIENT_INTERVAL;
use crate::ecs::components::*;

/// Frame size assumed until the first clip loads.
const PLACEHOLDER_SIZE: Vec2 = Vec2::new(128.0, 128.0);

/// Spawn one pet at `pos`, showing the idle clip.
pub fn spawn_pet(
    world: &mut hecs::World,
    clips: &mut ClipStore,
    pos: Vec2,
    now: f64,
) -> hecs::Entity {
    let mut body = Body {
        size: PLACEHOLDER_SIZE,
        scale: 1.0,
        bounces: 0,
    };
    let anim = Animation {
        action: Action::Idle,
        started_at: now,
        hold_until: None,
    };
    if let Some(clip) = clips.get(Action::Idle) {
        let (w, h) = clip.size();
        body.size = Vec2::new(w as f32, h as f32);
    }

    world.spawn((
        Position(pos),
        Velocity(Vec2::ZERO),
        body,
        anim,
        Movement::default(),
        Mode::Free,
        Drag::default(),
        ClickHistory::default(),
        Ambient {
            next_at: now + AMBIENT_INTERVAL,
        },
    ))
}

/// Switch to `action` if its clip is available. Returns whether `action` is
/// now showing; a missing clip leaves the current one in place.
pub fn show(
    anim: &mut Animation,
    body: &mut Body,
    clips: &mut ClipStore,
    action: Action,
    now: f64,
) -> bool {
    if anim.action == action {
        return true;
    }
    let Some(clip) = clips.get(action) else {
        return false;
    };
    let (w, h) = clip.size();
    body.size = Vec2::new(w as f32, h as f32);
    anim.action = action;
    anim.started_at = now;
    log::trace!("clip -> {}", action.key());
    true
}

/// Show `action` for `hold` seconds, then fall back to idle.
pub fn show_held(
    anim: &mut Animation,
    body: &mut Body,
    clips: &mut ClipStore,
    action: Action,
    hold: f64,
    now: f64,
) {
    show(anim, body, clips, action, now);
    anim.hold_until = Some(now + hold);
}

/// Enter `Mode::Perform` playing `action` for `hold` seconds. A newer
/// performance replaces an older one. Without the clip nothing changes and
/// this returns `false`.
#[allow(clippy::too_many_arguments)]
pub fn perform(
    mode: &mut Mode,
    anim: &mut Animation,
    body: &mut Body,
    clips: &mut ClipStore,
    action: Action,
    hold: f64,
    then: AfterPerform,
    now: f64,
) -> bool {
    if !show(anim, body, clips, action, now) {
        return false;
    }
    anim.hold_until = None;
    *mode = Mode::Perform {
        until: now + hold,
        then,
    };
    true
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::PathBuf;

    use super::*;
    use crate::assets::clip::solid_clip;
    use crate::config::BackgroundMode;

    /// A store with every clip preloaded as a 64x80 single frame.
    pub fn full_store() -> ClipStore {
        let mut store = ClipStore::new(PathBuf::from("/nowhere"), BackgroundMode::Chroma);
        for action in Action::ALL {
            store.insert(action, solid_clip(64, 80, &[0.1, 0.1]));
        }
        store
    }

    /// A store that only knows `actions`.
    pub fn store_with(actions: &[Action]) -> ClipStore {
        let mut store = ClipStore::new(PathBuf::from("/nowhere"), BackgroundMode::Chroma);
        for &action in actions {
            store.insert(action, solid_clip(64, 80, &[0.1]));
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use crate::assets::clip::solid_clip;

    #[test]
    fn spawned_pet_takes_idle_clip_size() {
        let mut world = hecs::World::new();
        let mut clips = full_store();
        let e = spawn_pet(&mut world, &mut clips, Vec2::new(100.0, 100.0), 0.0);
        let body = world.get::<&Body>(e).unwrap();
        assert_eq!(body.size, Vec2::new(64.0, 80.0));
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Free);
        assert!(world.get::<&Movement>(e).unwrap().follow_mouse);
    }

    #[test]
    fn missing_clip_keeps_current_action() {
        let mut clips = store_with(&[Action::Idle]);
        let mut body = Body {
            size: Vec2::new(64.0, 80.0),
            scale: 1.0,
            bounces: 0,
        };
        let mut anim = Animation {
            action: Action::Idle,
            started_at: 0.0,
            hold_until: None,
        };
        assert!(!show(&mut anim, &mut body, &mut clips, Action::Dance, 1.0));
        assert_eq!(anim.action, Action::Idle);
        assert_eq!(anim.started_at, 0.0);
    }

    #[test]
    fn switching_clip_resizes_body() {
        let mut clips = store_with(&[Action::Idle]);
        clips.insert(Action::Sleep, solid_clip(120, 40, &[0.2]));
        let mut body = Body {
            size: Vec2::new(64.0, 80.0),
            scale: 2.0,
            bounces: 0,
        };
        let mut anim = Animation {
            action: Action::Idle,
            started_at: 0.0,
            hold_until: None,
        };
        assert!(show(&mut anim, &mut body, &mut clips, Action::Sleep, 3.0));
        assert_eq!(anim.started_at, 3.0);
        assert_eq!(body.extent(), Vec2::new(240.0, 80.0));
    }

    #[test]
    fn newer_performance_replaces_older() {
        let mut clips = full_store();
        let mut body = Body {
            size: Vec2::ONE,
            scale: 1.0,
            bounces: 0,
        };
        let mut anim = Animation {
            action: Action::Idle,
            started_at: 0.0,
            hold_until: Some(5.0),
        };
        let mut mode = Mode::Free;
        let then = AfterPerform::Idle;
        let (m, a, b, c) = (&mut mode, &mut anim, &mut body, &mut clips);
        assert!(perform(m, a, b, c, Action::Dance, 2.0, then, 0.0));
        assert!(perform(m, a, b, c, Action::Eat, 1.5, then, 1.0));
        assert_eq!(anim.action, Action::Eat);
        assert_eq!(anim.hold_until, None);
        assert_eq!(
            mode,
            Mode::Perform {
                until: 2.5,
                then: AfterPerform::Idle
            }
        );
    }

    #[test]
    fn performance_without_its_clip_is_skipped() {
        let mut clips = store_with(&[Action::Idle]);
        let mut body = Body {
            size: Vec2::new(64.0, 80.0),
            scale: 1.0,
            bounces: 0,
        };
        let mut anim = Animation {
            action: Action::WalkLeft,
            started_at: 0.0,
            hold_until: Some(2.0),
        };
        let mut mode = Mode::Free;
        let then = AfterPerform::Idle;
        let (m, a, b, c) = (&mut mode, &mut anim, &mut body, &mut clips);
        assert!(!perform(m, a, b, c, Action::Dance, 2.0, then, 1.0));
        assert_eq!(mode, Mode::Free);
        assert_eq!(anim.action, Action::WalkLeft);
        assert_eq!(anim.hold_until, Some(2.0));
    }
}
