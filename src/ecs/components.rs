use glam::Vec2;

use crate::assets::Action;
use crate::config::{
    CLICK_HISTORY, DOUBLE_CLICK_SLOP, DOUBLE_CLICK_WINDOW, RAPID_CLICK_COUNT, RAPID_CLICK_WINDOW,
};
use crate::util::ring::RingBuffer;

/// Top-left corner of the pet window in screen pixels.
#[derive(Debug, Clone, Copy)]
pub struct Position(pub Vec2);

/// Velocity in pixels per tick. `x` is only used while airborne (throws).
#[derive(Debug, Clone, Copy)]
pub struct Velocity(pub Vec2);

/// Sprite footprint.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    /// Unscaled size of the current clip's frames.
    pub size: Vec2,
    /// 1.0 normally, `GIANT_SCALE` in giant mode.
    pub scale: f32,
    /// Floor bounces since the pet last came to rest.
    pub bounces: u8,
}

impl Body {
    pub fn extent(&self) -> Vec2 {
        self.size * self.scale
    }

    pub fn is_giant(&self) -> bool {
        self.scale > 1.0
    }
}

/// Which clip is showing, since when, and until when it is held before
/// reverting to idle.
#[derive(Debug, Clone, Copy)]
pub struct Animation {
    pub action: Action,
    pub started_at: f64,
    pub hold_until: Option<f64>,
}

impl Animation {
    pub fn is_held(&self, now: f64) -> bool {
        self.hold_until.is_some_and(|t| now < t)
    }

    /// Seconds into the current clip.
    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.started_at).max(0.0)
    }
}

/// Menu toggles. These are independent checkboxes; when several are on,
/// stop beats follow beats random.
#[derive(Debug, Clone, Copy)]
pub struct Movement {
    pub follow_mouse: bool,
    pub random_walk: bool,
    pub stop_move: bool,
    pub always_active: bool,
    /// Random-walk step in pixels per tick (0 = pick one).
    pub walk_dir: i8,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            follow_mouse: true,
            random_walk: false,
            stop_move: false,
            always_active: true,
            walk_dir: 0,
        }
    }
}

/// What happens when a performed clip ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterPerform {
    Idle,
    /// Wake the pet if the performance interrupted a nap.
    Wake,
}

/// Score keeping for the catch-me mini-game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseGame {
    pub until: f64,
    pub score: u32,
}

/// Behaviour mode. Anything other than `Free` suspends walking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Free,
    /// Playing a one-shot clip (dance, eat, exercise...).
    Perform { until: f64, then: AfterPerform },
    Sleep,
    /// Sweeping back and forth along the floor.
    Clean { until: f64, dir: f32 },
    Game(ChaseGame),
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Free => "free",
            Mode::Perform { .. } => "perform",
            Mode::Sleep => "sleep",
            Mode::Clean { .. } => "clean",
            Mode::Game(_) => "game",
        }
    }
}

/// One cursor sample recorded while dragging.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragSample {
    pub t: f64,
    pub pos: Vec2,
}

#[derive(Debug, Clone)]
pub struct Drag {
    pub active: bool,
    /// Cursor position relative to the window's top-left at grab time.
    pub offset: Vec2,
    pub samples: RingBuffer<DragSample>,
}

impl Default for Drag {
    fn default() -> Self {
        Self {
            active: false,
            offset: Vec2::ZERO,
            samples: RingBuffer::new(16),
        }
    }
}

/// Kind of press, as classified by `ClickHistory::record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Single,
    Double,
}

/// Recent left-button presses, for double-click and rapid-click detection.
#[derive(Debug, Clone)]
pub struct ClickHistory {
    presses: RingBuffer<f64>,
    last_single: Option<(f64, Vec2)>,
}

impl Default for ClickHistory {
    fn default() -> Self {
        Self {
            presses: RingBuffer::new(CLICK_HISTORY),
            last_single: None,
        }
    }
}

impl ClickHistory {
    /// Record a press and classify it. A double click consumes the single
    /// click before it, so a third press starts a new pair.
    pub fn record(&mut self, now: f64, pos: Vec2) -> ClickKind {
        self.presses.push(now);
        match self.last_single {
            Some((t, p))
                if now - t <= DOUBLE_CLICK_WINDOW && p.distance(pos) <= DOUBLE_CLICK_SLOP =>
            {
                self.last_single = None;
                ClickKind::Double
            }
            _ => {
                self.last_single = Some((now, pos));
                ClickKind::Single
            }
        }
    }

    /// True once enough presses land inside the rapid-click window.
    /// Clears the history when it fires.
    pub fn take_rapid(&mut self, now: f64) -> bool {
        self.presses.drop_oldest_while(|&t| now - t > RAPID_CLICK_WINDOW);
        if self.presses.len() >= RAPID_CLICK_COUNT {
            self.presses.clear();
            self.last_single = None;
            return true;
        }
        false
    }
}

/// When the next ambient clip is rolled.
#[derive(Debug, Clone, Copy)]
pub struct Ambient {
    pub next_at: f64,
}
