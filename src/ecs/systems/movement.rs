use glam::Vec2;

use super::TickInput;
use crate::assets::{Action, ClipStore};
use crate::config::*;
use crate::ecs::components::{Animation, Body, Drag, Mode, Movement, Position, Velocity};
use crate::pet;
use crate::screen::Rect;

/// Walls, floor and ceiling for a pet of a given size on one monitor.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    left: f32,
    right: f32,
    top: f32,
    floor: f32,
}

impl Bounds {
    fn new(screen: Rect, extent: Vec2) -> Self {
        let left = screen.x as f32;
        let top = screen.y as f32;
        Self {
            left,
            right: (screen.right() as f32 - extent.x).max(left),
            top,
            floor: (screen.bottom() as f32 - extent.y).max(top),
        }
    }
}

/// Advance every pet one tick: gravity and bounces, wall climbing, then
/// whichever horizontal behaviour is active.
pub fn integrate(
    world: &mut hecs::World,
    clips: &mut ClipStore,
    input: &TickInput,
    rng: &mut fastrand::Rng,
) {
    let now = input.now;

    for (_, (pos, vel, body, anim, movement, mode, drag)) in world.query_mut::<(
        &mut Position,
        &mut Velocity,
        &mut Body,
        &mut Animation,
        &mut Movement,
        &mut Mode,
        &Drag,
    )>() {
        // Grabbed and napping pets stay exactly where they are.
        if drag.active || *mode == Mode::Sleep {
            continue;
        }

        let extent = body.extent();
        let center = pos.0 + extent * 0.5;
        let bounds = Bounds::new(input.screens.monitor_at(center), extent);

        // --- Wall climbing: holds on until picked up ---
        if anim.action.is_climb() {
            climb(pos, anim, bounds, now);
            continue;
        }

        // --- Falling / bouncing ---
        if pos.0.y < bounds.floor || vel.0.y < 0.0 {
            fall(pos, vel, body, anim, clips, bounds, now);
            continue;
        }
        // Grounded: nothing left of a throw or bounce carries over.
        pos.0.y = bounds.floor;
        vel.0 = Vec2::ZERO;
        body.bounces = 0;
        if !anim.is_held(now) && matches!(anim.action, Action::Hang | Action::Jump) {
            pet::show(anim, body, clips, Action::Idle, now);
        }

        // --- Mode-driven movement ---
        match *mode {
            Mode::Perform { .. } | Mode::Sleep => continue,
            Mode::Clean { until, dir } => {
                let dir = sweep(pos, body, anim, clips, bounds, dir, now);
                *mode = Mode::Clean { until, dir };
                continue;
            }
            Mode::Game(_) => {
                flee(pos, vel, body, anim, clips, bounds, input.cursor, now);
                continue;
            }
            Mode::Free => {}
        }

        if movement.stop_move {
            continue;
        }

        if movement.follow_mouse {
            follow(pos, vel, body, anim, movement, clips, bounds, input.cursor, now);
        } else if movement.random_walk {
            if movement.walk_dir == 0 {
                movement.walk_dir = if rng.bool() {
                    RANDOM_WALK_SPEED
                } else {
                    -RANDOM_WALK_SPEED
                };
            }
            let step = movement.walk_dir as f32;
            pos.0.x = (pos.0.x + step).clamp(bounds.left, bounds.right);
            if !anim.is_held(now) {
                pet::show(anim, body, clips, Action::walk(step), now);
            }
            edge_jump(pos, vel, body, anim, movement, clips, bounds, now);
        } else if !anim.is_held(now) && anim.action.heading() != 0.0 && !anim.action.is_run() {
            // Ambient stroll: drift the way the clip faces, turning at walls.
            let heading = anim.action.heading();
            pos.0.x = (pos.0.x + heading * AMBIENT_WALK_SPEED).clamp(bounds.left, bounds.right);
            if pos.0.x <= bounds.left || pos.0.x >= bounds.right {
                pet::show(anim, body, clips, Action::walk(-heading), now);
            }
        }
    }
}

/// Shuffle up and down the wall, flipping direction every half second.
fn climb(pos: &mut Position, anim: &Animation, bounds: Bounds, now: f64) {
    let phase = (now / CLIMB_FLIP_INTERVAL) as i64 % 2;
    let dy = if phase == 0 { -1.0 } else { 1.0 };
    pos.0.y = (pos.0.y + dy).clamp(bounds.top, bounds.floor);
    pos.0.x = if anim.action == Action::ClimbLeft {
        bounds.left
    } else {
        bounds.right
    };
}

/// Gravity plus horizontal throw drift. Landing bounces a few times with
/// damping, then settles.
fn fall(
    pos: &mut Position,
    vel: &mut Velocity,
    body: &mut Body,
    anim: &mut Animation,
    clips: &mut ClipStore,
    bounds: Bounds,
    now: f64,
) {
    vel.0.y = (vel.0.y + GRAVITY).min(FALL_SPEED_MAX);

    if vel.0.x != 0.0 {
        pos.0.x += vel.0.x;
        vel.0.x *= AIR_DRAG;
        if pos.0.x < bounds.left {
            pos.0.x = bounds.left;
            vel.0.x = vel.0.x.abs() * WALL_RESTITUTION;
        } else if pos.0.x > bounds.right {
            pos.0.x = bounds.right;
            vel.0.x = -vel.0.x.abs() * WALL_RESTITUTION;
        }
        if vel.0.x.abs() < 0.1 {
            vel.0.x = 0.0;
        }
    }

    let ny = (pos.0.y + vel.0.y.trunc()).min(bounds.floor);
    if ny < bounds.top {
        // Bonk on the top of the screen.
        pos.0.y = bounds.top;
        vel.0.y = 0.0;
        return;
    }
    pos.0.y = ny;
    if ny < bounds.floor {
        return;
    }

    let impact = vel.0.y;
    if impact >= BOUNCE_MIN_SPEED && body.bounces < MAX_BOUNCES {
        vel.0.y = -impact * BOUNCE_DAMPING;
        body.bounces += 1;
        return;
    }

    vel.0 = Vec2::ZERO;
    body.bounces = 0;
    let landed_from = anim.action.is_run() || matches!(anim.action, Action::Hang | Action::Jump);
    if landed_from && !anim.is_held(now) {
        pet::show(anim, body, clips, Action::Idle, now);
    }
}

/// Chase the cursor along the floor: walk when near, run when far.
#[allow(clippy::too_many_arguments)]
fn follow(
    pos: &mut Position,
    vel: &mut Velocity,
    body: &mut Body,
    anim: &mut Animation,
    movement: &mut Movement,
    clips: &mut ClipStore,
    bounds: Bounds,
    cursor: Vec2,
    now: f64,
) {
    let extent = body.extent();
    let dx = cursor.x - (pos.0.x + extent.x * 0.5);
    let dist = dx.abs();

    if dist <= FOLLOW_WALK_DISTANCE {
        if !anim.is_held(now) {
            pet::show(anim, body, clips, Action::Idle, now);
        }
        return;
    }

    let dir = dx.signum();
    let speed = if dist > FOLLOW_FAR_DISTANCE {
        FOLLOW_SPEED_FAR
    } else {
        FOLLOW_SPEED_NEAR
    };
    pos.0.x = (pos.0.x + dir * speed).clamp(bounds.left, bounds.right);

    if !anim.is_held(now) {
        let action = if dist > FOLLOW_RUN_DISTANCE {
            Action::run(dir)
        } else {
            Action::walk(dir)
        };
        pet::show(anim, body, clips, action, now);
    }
    edge_jump(pos, vel, body, anim, movement, clips, bounds, now);
}

/// Touching a side wall turns a walker around with a little hop.
#[allow(clippy::too_many_arguments)]
fn edge_jump(
    pos: &mut Position,
    vel: &mut Velocity,
    body: &mut Body,
    anim: &mut Animation,
    movement: &mut Movement,
    clips: &mut ClipStore,
    bounds: Bounds,
    now: f64,
) {
    let hit_left = pos.0.x <= bounds.left;
    let hit_right = pos.0.x >= bounds.right;
    if !hit_left && !hit_right {
        return;
    }
    movement.walk_dir = -movement.walk_dir;
    vel.0.y = WALL_JUMP_VELOCITY;
    pet::show_held(anim, body, clips, Action::Jump, HOLD_WALL_JUMP, now);
    pos.0.x = if hit_left {
        bounds.left + 1.0
    } else {
        bounds.right - 1.0
    };
}

/// Cleaning sweep. Returns the (possibly reversed) direction.
fn sweep(
    pos: &mut Position,
    body: &mut Body,
    anim: &mut Animation,
    clips: &mut ClipStore,
    bounds: Bounds,
    dir: f32,
    now: f64,
) -> f32 {
    pos.0.x = (pos.0.x + dir * CLEAN_SPEED).clamp(bounds.left, bounds.right);
    let dir = if pos.0.x <= bounds.left {
        1.0
    } else if pos.0.x >= bounds.right {
        -1.0
    } else {
        dir
    };
    if !pet::show(anim, body, clips, Action::Clean, now) {
        pet::show(anim, body, clips, Action::walk(dir), now);
    }
    dir
}

/// Mini-game: keep away from the cursor, hopping when cornered.
#[allow(clippy::too_many_arguments)]
fn flee(
    pos: &mut Position,
    vel: &mut Velocity,
    body: &mut Body,
    anim: &mut Animation,
    clips: &mut ClipStore,
    bounds: Bounds,
    cursor: Vec2,
    now: f64,
) {
    let center = pos.0 + body.extent() * 0.5;
    if center.distance(cursor) > GAME_FLEE_DISTANCE {
        if !anim.is_held(now) {
            pet::show(anim, body, clips, Action::Idle, now);
        }
        return;
    }

    let dir = if center.x >= cursor.x { 1.0 } else { -1.0 };
    pos.0.x = (pos.0.x + dir * GAME_FLEE_SPEED).clamp(bounds.left, bounds.right);
    if pos.0.x <= bounds.left || pos.0.x >= bounds.right {
        vel.0.y = GAME_HOP_VELOCITY;
        pet::show_held(anim, body, clips, Action::Jump, HOLD_WALL_JUMP, now);
    } else if !anim.is_held(now) {
        pet::show(anim, body, clips, Action::run(dir), now);
    }
}
