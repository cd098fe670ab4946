pub mod clip;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::BackgroundMode;
use crate::error::{PetError, Result};

pub use self::clip::{decode_clip, Clip, Frame};

/// Named animation clips. Each maps to `<asset_dir>/<key>/<key>.gif`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Idle,
    WalkLeft,
    WalkRight,
    ClimbLeft,
    ClimbRight,
    Hang,
    Dance,
    Eat,
    RunLeft,
    RunRight,
    Surprise,
    Angry,
    Pet,
    Jump,
    Squat,
    Boxing,
    Plank,
    JumpingJacks,
    Sleep,
    Clean,
}

impl Action {
    pub const ALL: [Action; 20] = [
        Action::Idle,
        Action::WalkLeft,
        Action::WalkRight,
        Action::ClimbLeft,
        Action::ClimbRight,
        Action::Hang,
        Action::Dance,
        Action::Eat,
        Action::RunLeft,
        Action::RunRight,
        Action::Surprise,
        Action::Angry,
        Action::Pet,
        Action::Jump,
        Action::Squat,
        Action::Boxing,
        Action::Plank,
        Action::JumpingJacks,
        Action::Sleep,
        Action::Clean,
    ];

    /// Clips the "exercise" menu entry picks from.
    pub const EXERCISES: [Action; 4] = [
        Action::Squat,
        Action::Boxing,
        Action::Plank,
        Action::JumpingJacks,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::WalkLeft => "walk_left",
            Action::WalkRight => "walk_right",
            Action::ClimbLeft => "climb_left",
            Action::ClimbRight => "climb_right",
            Action::Hang => "hang",
            Action::Dance => "dance",
            Action::Eat => "eat",
            Action::RunLeft => "run_left",
            Action::RunRight => "run_right",
            Action::Surprise => "surprise",
            Action::Angry => "angry",
            Action::Pet => "pet",
            Action::Jump => "jump",
            Action::Squat => "squat",
            Action::Boxing => "boxing",
            Action::Plank => "plank",
            Action::JumpingJacks => "jumping_jacks",
            Action::Sleep => "sleep",
            Action::Clean => "clean",
        }
    }

    /// Inverse of `key`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }

    pub fn is_climb(self) -> bool {
        matches!(self, Action::ClimbLeft | Action::ClimbRight)
    }

    pub fn is_run(self) -> bool {
        matches!(self, Action::RunLeft | Action::RunRight)
    }

    pub fn walk(dir: f32) -> Self {
        if dir > 0.0 {
            Action::WalkRight
        } else {
            Action::WalkLeft
        }
    }

    pub fn run(dir: f32) -> Self {
        if dir > 0.0 {
            Action::RunRight
        } else {
            Action::RunLeft
        }
    }

    /// Horizontal direction implied by a walk/run clip, 0 for the rest.
    pub fn heading(self) -> f32 {
        match self {
            Action::WalkLeft | Action::RunLeft => -1.0,
            Action::WalkRight | Action::RunRight => 1.0,
            _ => 0.0,
        }
    }
}

/// Path of the clip for `action`: the GIF if present, else a PNG still.
pub fn clip_path(asset_dir: &Path, action: Action) -> PathBuf {
    let dir = asset_dir.join(action.key());
    let gif = dir.join(format!("{}.gif", action.key()));
    if gif.exists() {
        return gif;
    }
    let png = dir.join(format!("{}.png", action.key()));
    if png.exists() {
        png
    } else {
        gif
    }
}

/// Read and decode one clip from disk.
pub fn load_clip(path: &Path, bg_mode: BackgroundMode) -> Result<Clip> {
    let bytes = std::fs::read(path).map_err(|source| PetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_clip(path, &bytes, bg_mode)
}

/// Decoded clips shared by every pet. Each action is decoded at most once;
/// actions that fail to load are remembered so we warn once and then skip.
pub struct ClipStore {
    asset_dir: PathBuf,
    bg_mode: BackgroundMode,
    clips: HashMap<Action, Arc<Clip>>,
    missing: HashSet<Action>,
}

impl ClipStore {
    pub fn new(asset_dir: PathBuf, bg_mode: BackgroundMode) -> Self {
        Self {
            asset_dir,
            bg_mode,
            clips: HashMap::new(),
            missing: HashSet::new(),
        }
    }

    /// Cached clip for `action`, loading it on first use.
    pub fn get(&mut self, action: Action) -> Option<Arc<Clip>> {
        if let Some(clip) = self.clips.get(&action) {
            return Some(clip.clone());
        }
        if self.missing.contains(&action) {
            return None;
        }

        let path = clip_path(&self.asset_dir, action);
        match load_clip(&path, self.bg_mode) {
            Ok(clip) => {
                let (w, h) = clip.size();
                log::info!(
                    "Loaded clip '{}' ({} frames, {}x{}, {:.1}s loop)",
                    action.key(),
                    clip.frames.len(),
                    w,
                    h,
                    clip.total_duration()
                );
                let clip = Arc::new(clip);
                self.clips.insert(action, clip.clone());
                Some(clip)
            }
            Err(e) => {
                log::warn!("Clip '{}' unavailable, skipping: {e}", action.key());
                self.missing.insert(action);
                None
            }
        }
    }

    /// Peek without loading.
    pub fn cached(&self, action: Action) -> Option<&Arc<Clip>> {
        self.clips.get(&action)
    }

    pub fn insert(&mut self, action: Action, clip: Clip) {
        self.missing.remove(&action);
        self.clips.insert(action, Arc::new(clip));
    }

    /// Subdirectories of the asset dir that no `Action` maps to, usually
    /// misspelled clip folders.
    fn unknown_dirs(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.asset_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| Action::from_key(name).is_none())
            .collect();
        names.sort();
        names
    }

    /// Load every known clip up front so the first frames don't stutter.
    pub fn preload(&mut self) -> usize {
        for name in self.unknown_dirs() {
            log::warn!(
                "Ignoring '{name}' in {}: not a clip name",
                self.asset_dir.display()
            );
        }
        Action::ALL
            .iter()
            .filter(|&&a| self.get(a).is_some())
            .count()
    }
}

/// Window icon as (rgba, width, height). Failures are logged and ignored.
pub fn load_icon(path: &Path) -> Option<(Vec<u8>, u32, u32)> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("Icon {} unreadable: {e}", path.display());
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            Some((rgba.into_raw(), w, h))
        }
        Err(e) => {
            log::warn!("Icon {} undecodable: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_directory_names() {
        let keys: HashSet<&str> = Action::ALL.iter().map(|a| a.key()).collect();
        assert_eq!(keys.len(), Action::ALL.len());
        assert_eq!(Action::JumpingJacks.key(), "jumping_jacks");
    }

    #[test]
    fn keys_map_back_to_actions() {
        for action in Action::ALL {
            assert_eq!(Action::from_key(action.key()), Some(action));
        }
        assert_eq!(Action::from_key("walk-left"), None);
        assert_eq!(Action::from_key(""), None);
    }

    #[test]
    fn misnamed_clip_folders_are_reported() {
        let dir = std::env::temp_dir().join(format!("deskpet-assets-{}", std::process::id()));
        for sub in ["idle", "Dance", "run_left", "extras"] {
            std::fs::create_dir_all(dir.join(sub)).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), b"not a folder").unwrap();

        let store = ClipStore::new(dir.clone(), BackgroundMode::Chroma);
        let unknown = store.unknown_dirs();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(unknown, vec!["Dance".to_string(), "extras".to_string()]);
    }

    #[test]
    fn clip_path_follows_directory_convention() {
        let p = clip_path(Path::new("/nowhere/assets/Yujeong"), Action::WalkLeft);
        assert_eq!(
            p,
            PathBuf::from("/nowhere/assets/Yujeong/walk_left/walk_left.gif")
        );
    }

    #[test]
    fn missing_clip_is_skipped_and_remembered() {
        let mut store = ClipStore::new(PathBuf::from("/nowhere"), BackgroundMode::Chroma);
        assert!(store.get(Action::Dance).is_none());
        assert!(store.missing.contains(&Action::Dance));
        assert!(store.get(Action::Dance).is_none());
    }

    #[test]
    fn inserted_clip_is_served_from_cache() {
        let mut store = ClipStore::new(PathBuf::from("/nowhere"), BackgroundMode::Chroma);
        assert!(store.get(Action::Idle).is_none());
        store.insert(Action::Idle, clip::solid_clip(4, 6, &[0.1]));
        let clip = store.get(Action::Idle).expect("cached");
        assert_eq!(clip.size(), (4, 6));
    }

    #[test]
    fn headings() {
        assert_eq!(Action::walk(-2.0), Action::WalkLeft);
        assert_eq!(Action::run(3.0), Action::RunRight);
        assert_eq!(Action::RunLeft.heading(), -1.0);
        assert_eq!(Action::Dance.heading(), 0.0);
    }
}
