use crate::assets::{Action, ClipStore};
use crate::config::{AMBIENT_INTERVAL, GAME_WIN_SCORE, HOLD_AMBIENT_DANCE, HOLD_MED};
use crate::ecs::components::{AfterPerform, Ambient, Animation, Body, Drag, Mode};
use crate::pet;

/// End modes and clip holds whose time is up.
pub fn update(world: &mut hecs::World, clips: &mut ClipStore, now: f64) {
    for (entity, (mode, anim, body, drag, ambient)) in
        world.query_mut::<(&mut Mode, &mut Animation, &mut Body, &Drag, &mut Ambient)>()
    {
        match *mode {
            Mode::Perform { until, then } if now >= until => {
                if then == AfterPerform::Wake {
                    // A full ambient interval awake before the next pick.
                    log::info!("Pet {entity:?} woke up");
                    ambient.next_at = now + AMBIENT_INTERVAL;
                }
                *mode = Mode::Free;
                if !drag.active {
                    pet::show(anim, body, clips, Action::Idle, now);
                }
            }
            Mode::Clean { until, .. } if now >= until => {
                log::info!("Pet {entity:?} finished cleaning");
                *mode = Mode::Free;
                pet::show(anim, body, clips, Action::Idle, now);
            }
            Mode::Game(game) if now >= game.until => {
                let won = game.score >= GAME_WIN_SCORE;
                log::info!(
                    "Pet {entity:?} chase game over: {} catches ({})",
                    game.score,
                    if won { "you win" } else { "pet wins" }
                );
                let (action, hold) = if won {
                    (Action::Dance, HOLD_AMBIENT_DANCE)
                } else {
                    (Action::Angry, HOLD_MED)
                };
                pet::perform(mode, anim, body, clips, action, hold, AfterPerform::Idle, now);
            }
            _ => {}
        }

        if let Some(until) = anim.hold_until {
            if now >= until {
                anim.hold_until = None;
                if *mode == Mode::Free && !drag.active {
                    pet::show(anim, body, clips, Action::Idle, now);
                }
            }
        }
    }
}
