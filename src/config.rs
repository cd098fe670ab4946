use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Fixed simulation step (seconds). All per-tick physics constants below
/// assume this rate.
pub const TICK_RATE: f64 = 1.0 / 60.0;
/// Max accumulated time before we clamp (prevents spiral of death).
pub const MAX_ACCUMULATOR: f64 = 0.25;
/// How often an idle pet rolls a new ambient clip (seconds).
pub const AMBIENT_INTERVAL: f64 = 4.0;
/// Climbing pets shuffle up then down, flipping on this period (seconds).
pub const CLIMB_FLIP_INTERVAL: f64 = 0.5;

// ---------------------------------------------------------------------------
// Physics (pixels per tick)
// ---------------------------------------------------------------------------

pub const GRAVITY: f32 = 1.1;
pub const FALL_SPEED_MAX: f32 = 30.0;
/// Fraction of downward speed kept as upward speed on a floor bounce.
pub const BOUNCE_DAMPING: f32 = 0.45;
pub const MAX_BOUNCES: u8 = 3;
/// Landings slower than this just stop.
pub const BOUNCE_MIN_SPEED: f32 = 4.0;
pub const JUMP_VELOCITY: f32 = -12.0;
pub const WALL_JUMP_VELOCITY: f32 = -10.0;
pub const GAME_HOP_VELOCITY: f32 = -8.0;
/// Horizontal speed multiplier applied every airborne tick.
pub const AIR_DRAG: f32 = 0.98;
/// Fraction of horizontal speed kept when a thrown pet hits a wall.
pub const WALL_RESTITUTION: f32 = 0.6;
pub const MAX_THROW_SPEED: f32 = 40.0;
/// Only drag samples this recent contribute to the throw (seconds).
pub const THROW_WINDOW: f64 = 0.1;

pub const FOLLOW_SPEED_NEAR: f32 = 3.0;
pub const FOLLOW_SPEED_FAR: f32 = 6.0;
pub const FOLLOW_FAR_DISTANCE: f32 = 400.0;
pub const FOLLOW_RUN_DISTANCE: f32 = 200.0;
pub const FOLLOW_WALK_DISTANCE: f32 = 20.0;
pub const RANDOM_WALK_SPEED: i8 = 2;
pub const AMBIENT_WALK_SPEED: f32 = 1.0;
pub const CLEAN_SPEED: f32 = 2.0;
pub const GAME_FLEE_SPEED: f32 = 7.0;
pub const GAME_FLEE_DISTANCE: f32 = 250.0;

/// Distance from a screen edge at which a dropped pet grabs the wall.
pub const EDGE_MARGIN: f32 = 10.0;

// ---------------------------------------------------------------------------
// Clip hold times (seconds)
// ---------------------------------------------------------------------------

pub const HOLD_SHORT: f64 = 1.2;
pub const HOLD_MED: f64 = 2.0;
pub const HOLD_LONG: f64 = 3.2;
pub const HOLD_TREAT: f64 = 1.6;
pub const HOLD_AMBIENT_DANCE: f64 = 2.2;
pub const HOLD_JUMP: f64 = 0.8;
pub const HOLD_WALL_JUMP: f64 = 0.6;
pub const CLEAN_DURATION: f64 = 12.0;
pub const GAME_DURATION: f64 = 20.0;
/// Catches needed to win the chase game.
pub const GAME_WIN_SCORE: u32 = 3;

// ---------------------------------------------------------------------------
// Clicks
// ---------------------------------------------------------------------------

pub const CLICK_HISTORY: usize = 8;
pub const RAPID_CLICK_COUNT: usize = 5;
pub const RAPID_CLICK_WINDOW: f64 = 0.9;
pub const DOUBLE_CLICK_WINDOW: f64 = 0.3;
pub const DOUBLE_CLICK_SLOP: f32 = 4.0;

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

pub const DEFAULT_SPAWN_POS: (f32, f32) = (100.0, 100.0);
pub const SPAWN_OFFSET: (f32, f32) = (40.0, 20.0);
pub const GIANT_SCALE: f32 = 2.0;
pub const MAX_INITIAL_PETS: usize = 16;

const DEFAULT_CHARACTER: &str = "Yujeong";

/// How transparent pixels are derived from the sprite images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundMode {
    /// Pure white is keyed out.
    Chroma,
    /// The image's own alpha channel is used as-is.
    Alpha,
}

impl BackgroundMode {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("alpha") {
            BackgroundMode::Alpha
        } else {
            BackgroundMode::Chroma
        }
    }
}

/// Startup settings, resolved once from defaults and the environment.
#[derive(Debug, Clone)]
pub struct PetConfig {
    pub base_dir: PathBuf,
    pub character: String,
    pub bg_mode: BackgroundMode,
    pub initial_pets: usize,
}

impl PetConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup` (the process environment in
    /// production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_dir = lookup("DESKPET_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(default_base_dir);
        let character = lookup("DESKPET_CHARACTER")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHARACTER.to_string());
        let bg_mode = lookup("DESKPET_BG_MODE")
            .map(|s| BackgroundMode::parse(&s))
            .unwrap_or(BackgroundMode::Chroma);
        let initial_pets = lookup("DESKPET_COUNT")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_INITIAL_PETS);

        Self {
            base_dir,
            character,
            bg_mode,
            initial_pets,
        }
    }

    /// `<base>/assets/<character>`
    pub fn asset_dir(&self) -> PathBuf {
        self.base_dir.join("assets").join(&self.character)
    }

    /// Window icon, if one ships next to the assets.
    pub fn icon_path(&self) -> Option<PathBuf> {
        let icons = self.base_dir.join("icons");
        ["icon.ico", "icon.png"]
            .iter()
            .map(|name| icons.join(name))
            .find(|p| p.exists())
    }
}

fn default_base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .filter(|dir| dir.join("assets").is_dir())
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = PetConfig::from_lookup(lookup(&[("DESKPET_HOME", "/opt/pet")]));
        assert_eq!(cfg.character, "Yujeong");
        assert_eq!(cfg.bg_mode, BackgroundMode::Chroma);
        assert_eq!(cfg.initial_pets, 1);
        assert_eq!(cfg.asset_dir(), PathBuf::from("/opt/pet/assets/Yujeong"));
    }

    #[test]
    fn environment_overrides() {
        let cfg = PetConfig::from_lookup(lookup(&[
            ("DESKPET_HOME", "/tmp/x"),
            ("DESKPET_CHARACTER", "Mochi"),
            ("DESKPET_BG_MODE", "ALPHA"),
            ("DESKPET_COUNT", "99"),
        ]));
        assert_eq!(cfg.character, "Mochi");
        assert_eq!(cfg.bg_mode, BackgroundMode::Alpha);
        assert_eq!(cfg.initial_pets, MAX_INITIAL_PETS);
    }

    #[test]
    fn unknown_bg_mode_falls_back_to_chroma() {
        assert_eq!(BackgroundMode::parse("rembg"), BackgroundMode::Chroma);
        assert_eq!(BackgroundMode::parse(" alpha "), BackgroundMode::Alpha);
    }

    #[test]
    fn missing_icon_is_none() {
        let cfg = PetConfig::from_lookup(lookup(&[("DESKPET_HOME", "/definitely/not/here")]));
        assert!(cfg.icon_path().is_none());
    }
}
