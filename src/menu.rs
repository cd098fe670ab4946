//! Per-pet right-click context menu.
//! On Windows this is a native popup built with the Win32 menu API; every
//! platform also gets single-key shortcuts on the focused pet.
use glam::Vec2;

use crate::assets::{Action, ClipStore};
use crate::config::*;
use crate::ecs::components::{
    AfterPerform, Animation, Body, ChaseGame, Mode, Movement, Position, Velocity,
};
use crate::pet;

/// Everything the menu can ask a pet (or the app) to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuCommand {
    ToggleFollow,
    ToggleRandom,
    ToggleStop,
    Dance,
    Eat,
    Pet,
    Exercise,
    Sleep,
    Clean,
    MiniGame,
    ToggleGiant,
    Spawn,
    Close,
    ToggleAlwaysActive,
    QuitAll,
}

/// One row of the menu.
#[derive(Debug, Clone, Copy)]
pub enum MenuItem {
    Command {
        command: MenuCommand,
        label: &'static str,
        checkable: bool,
    },
    Separator,
}

const fn item(command: MenuCommand, label: &'static str) -> MenuItem {
    MenuItem::Command {
        command,
        label,
        checkable: false,
    }
}

const fn toggle(command: MenuCommand, label: &'static str) -> MenuItem {
    MenuItem::Command {
        command,
        label,
        checkable: true,
    }
}

const ENTRIES: [MenuItem; 19] = [
    toggle(MenuCommand::ToggleFollow, "Follow mouse\tF"),
    toggle(MenuCommand::ToggleRandom, "Random walk\tR"),
    toggle(MenuCommand::ToggleStop, "Stop moving\tS"),
    MenuItem::Separator,
    item(MenuCommand::Dance, "Dance\tD"),
    item(MenuCommand::Eat, "Give a snack\tE"),
    item(MenuCommand::Pet, "Pet\tP"),
    item(MenuCommand::Exercise, "Exercise (random)\tX"),
    item(MenuCommand::Sleep, "Sleep\tZ"),
    item(MenuCommand::Clean, "Clean up\tC"),
    item(MenuCommand::MiniGame, "Play catch me\tG"),
    toggle(MenuCommand::ToggleGiant, "Giant mode\tB"),
    MenuItem::Separator,
    item(MenuCommand::Spawn, "Add a pet\tN"),
    item(MenuCommand::Close, "Close this pet\tW"),
    MenuItem::Separator,
    toggle(MenuCommand::ToggleAlwaysActive, "Always active\tA"),
    MenuItem::Separator,
    item(MenuCommand::QuitAll, "Quit\tQ"),
];

/// Menu layout, top to bottom.
pub fn items() -> &'static [MenuItem] {
    &ENTRIES
}

/// Whether a checkable entry is currently ticked.
pub fn checked(command: MenuCommand, movement: &Movement, body: &Body) -> bool {
    match command {
        MenuCommand::ToggleFollow => movement.follow_mouse,
        MenuCommand::ToggleRandom => movement.random_walk,
        MenuCommand::ToggleStop => movement.stop_move,
        MenuCommand::ToggleAlwaysActive => movement.always_active,
        MenuCommand::ToggleGiant => body.is_giant(),
        _ => false,
    }
}

/// Keyboard shortcut for a command.
pub fn shortcut(key: &str) -> Option<MenuCommand> {
    let cmd = match key.to_ascii_lowercase().as_str() {
        "f" => MenuCommand::ToggleFollow,
        "r" => MenuCommand::ToggleRandom,
        "s" => MenuCommand::ToggleStop,
        "d" => MenuCommand::Dance,
        "e" => MenuCommand::Eat,
        "p" => MenuCommand::Pet,
        "x" => MenuCommand::Exercise,
        "z" => MenuCommand::Sleep,
        "c" => MenuCommand::Clean,
        "g" => MenuCommand::MiniGame,
        "b" => MenuCommand::ToggleGiant,
        "n" => MenuCommand::Spawn,
        "w" => MenuCommand::Close,
        "a" => MenuCommand::ToggleAlwaysActive,
        "q" => MenuCommand::QuitAll,
        _ => return None,
    };
    Some(cmd)
}

/// Follow-up work the caller must do after a command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuOutcome {
    None,
    /// Spawn a new pet at this position.
    Spawn(Vec2),
    /// Close the pet the menu belongs to.
    Close,
    QuitAll,
}

/// Apply `command` to `entity`.
pub fn apply(
    command: MenuCommand,
    world: &mut hecs::World,
    entity: hecs::Entity,
    clips: &mut ClipStore,
    now: f64,
    rng: &mut fastrand::Rng,
) -> MenuOutcome {
    let Ok((pos, vel, body, anim, movement, mode)) = world.query_one_mut::<(
        &Position,
        &mut Velocity,
        &mut Body,
        &mut Animation,
        &mut Movement,
        &mut Mode,
    )>(entity) else {
        return MenuOutcome::None;
    };

    log::debug!("Pet {entity:?} menu: {command:?}");

    match command {
        MenuCommand::ToggleFollow => {
            movement.follow_mouse = !movement.follow_mouse;
            movement.walk_dir = 0;
        }
        MenuCommand::ToggleRandom => {
            movement.random_walk = !movement.random_walk;
            movement.walk_dir = 0;
        }
        MenuCommand::ToggleStop => movement.stop_move = !movement.stop_move,
        MenuCommand::ToggleAlwaysActive => movement.always_active = !movement.always_active,
        MenuCommand::Dance => {
            pet::perform(mode, anim, body, clips, Action::Dance, HOLD_MED, AfterPerform::Idle, now);
        }
        MenuCommand::Eat => {
            pet::perform(mode, anim, body, clips, Action::Eat, HOLD_TREAT, AfterPerform::Idle, now);
        }
        MenuCommand::Pet => {
            pet::perform(mode, anim, body, clips, Action::Pet, HOLD_TREAT, AfterPerform::Idle, now);
        }
        MenuCommand::Exercise => {
            let action = Action::EXERCISES[rng.usize(..Action::EXERCISES.len())];
            log::info!("Pet {entity:?} exercises: {}", action.key());
            pet::perform(mode, anim, body, clips, action, HOLD_LONG, AfterPerform::Idle, now);
        }
        MenuCommand::Sleep => {
            log::info!("Pet {entity:?} goes to sleep");
            *mode = Mode::Sleep;
            anim.hold_until = None;
            vel.0.x = 0.0;
            pet::show(anim, body, clips, Action::Sleep, now);
        }
        MenuCommand::Clean => {
            log::info!("Pet {entity:?} starts cleaning");
            let dir = if rng.bool() { 1.0 } else { -1.0 };
            *mode = Mode::Clean {
                until: now + CLEAN_DURATION,
                dir,
            };
            anim.hold_until = None;
        }
        MenuCommand::MiniGame => {
            log::info!("Pet {entity:?}: catch me if you can!");
            *mode = Mode::Game(ChaseGame {
                until: now + GAME_DURATION,
                score: 0,
            });
            anim.hold_until = None;
        }
        MenuCommand::ToggleGiant => {
            body.scale = if body.is_giant() { 1.0 } else { GIANT_SCALE };
            log::info!("Pet {entity:?} scale -> {}", body.scale);
        }
        MenuCommand::Spawn => {
            return MenuOutcome::Spawn(pos.0 + Vec2::new(SPAWN_OFFSET.0, SPAWN_OFFSET.1));
        }
        MenuCommand::Close => return MenuOutcome::Close,
        MenuCommand::QuitAll => return MenuOutcome::QuitAll,
    }
    MenuOutcome::None
}

// ---------------------------------------------------------------------------
// Native popup
// ---------------------------------------------------------------------------

#[cfg(windows)]
mod native {
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{HWND, POINT};
    use windows::Win32::UI::WindowsAndMessaging::{
        AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, SetForegroundWindow,
        TrackPopupMenu, MF_CHECKED, MF_SEPARATOR, MF_STRING, TPM_LEFTALIGN, TPM_NONOTIFY,
        TPM_RETURNCMD, TPM_RIGHTBUTTON, TPM_TOPALIGN,
    };

    use super::{MenuCommand, MenuItem};

    /// Menu item IDs start here; entry index is added.
    const ID_BASE: usize = 1000;

    /// Show the popup at the cursor and block until the user picks or
    /// dismisses it.
    pub fn show(
        hwnd: HWND,
        entries: &[MenuItem],
        is_checked: impl Fn(MenuCommand) -> bool,
    ) -> Option<MenuCommand> {
        unsafe {
            let hmenu = match CreatePopupMenu() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Failed to create popup menu: {e}");
                    return None;
                }
            };

            for (i, entry) in entries.iter().enumerate() {
                match *entry {
                    MenuItem::Separator => {
                        let _ = AppendMenuW(hmenu, MF_SEPARATOR, 0, PCWSTR::null());
                    }
                    MenuItem::Command {
                        command,
                        label,
                        checkable,
                    } => {
                        let wide: Vec<u16> =
                            label.encode_utf16().chain(std::iter::once(0)).collect();
                        let mut flags = MF_STRING;
                        if checkable && is_checked(command) {
                            flags |= MF_CHECKED;
                        }
                        let _ = AppendMenuW(hmenu, flags, ID_BASE + i, PCWSTR(wide.as_ptr()));
                    }
                }
            }

            let mut pt = POINT::default();
            let _ = GetCursorPos(&mut pt);

            // Required so menu closes when clicking outside
            let _ = SetForegroundWindow(hwnd);

            let picked = TrackPopupMenu(
                hmenu,
                TPM_LEFTALIGN | TPM_TOPALIGN | TPM_RIGHTBUTTON | TPM_RETURNCMD | TPM_NONOTIFY,
                pt.x,
                pt.y,
                0,
                hwnd,
                None,
            );

            let _ = DestroyMenu(hmenu);

            let id = picked.0 as usize;
            if id < ID_BASE {
                return None;
            }
            match entries.get(id - ID_BASE) {
                Some(MenuItem::Command { command, .. }) => Some(*command),
                _ => None,
            }
        }
    }
}

/// Pop up the context menu for a pet window. Returns the picked command.
#[cfg(windows)]
pub fn show(
    window: &winit::window::Window,
    movement: &Movement,
    body: &Body,
) -> Option<MenuCommand> {
    let hwnd = crate::platform::win32::get_hwnd(window)?;
    native::show(hwnd, items(), |cmd| checked(cmd, movement, body))
}

/// No native popup here; pets are driven by keyboard shortcuts instead.
#[cfg(not(windows))]
pub fn show(
    _window: &winit::window::Window,
    _movement: &Movement,
    _body: &Body,
) -> Option<MenuCommand> {
    log::info!(
        "Context menu: use the keyboard shortcuts on the focused pet \
         (F/R/S/D/E/P/X/Z/C/G/B/N/W/A/Q)"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::testutil::full_store;

    fn setup() -> (hecs::World, hecs::Entity, ClipStore, fastrand::Rng) {
        let mut world = hecs::World::new();
        let mut clips = full_store();
        let e = pet::spawn_pet(&mut world, &mut clips, Vec2::new(200.0, 300.0), 0.0);
        (world, e, clips, fastrand::Rng::with_seed(9))
    }

    #[test]
    fn every_command_has_one_entry_and_one_shortcut() {
        let commands: Vec<MenuCommand> = items()
            .iter()
            .filter_map(|e| match e {
                MenuItem::Command { command, .. } => Some(*command),
                MenuItem::Separator => None,
            })
            .collect();
        assert_eq!(commands.len(), 15);
        let unique: std::collections::HashSet<_> = commands.iter().collect();
        assert_eq!(unique.len(), commands.len());
        for key in ["f", "r", "s", "d", "e", "p", "x", "z", "c", "g", "b", "n", "w", "a", "q"] {
            let cmd = shortcut(key).unwrap();
            assert!(commands.contains(&cmd));
        }
        assert_eq!(shortcut("F"), Some(MenuCommand::ToggleFollow));
        assert_eq!(shortcut("y"), None);
    }

    #[test]
    fn toggles_flip_and_report_checked() {
        let (mut world, e, mut clips, mut rng) = setup();
        apply(MenuCommand::ToggleFollow, &mut world, e, &mut clips, 0.0, &mut rng);
        apply(MenuCommand::ToggleRandom, &mut world, e, &mut clips, 0.0, &mut rng);
        let movement = *world.get::<&Movement>(e).unwrap();
        let body = *world.get::<&Body>(e).unwrap();
        assert!(!checked(MenuCommand::ToggleFollow, &movement, &body));
        assert!(checked(MenuCommand::ToggleRandom, &movement, &body));
        assert!(checked(MenuCommand::ToggleAlwaysActive, &movement, &body));
    }

    #[test]
    fn treats_and_dances_are_timed_performances() {
        let (mut world, e, mut clips, mut rng) = setup();
        apply(MenuCommand::Eat, &mut world, e, &mut clips, 1.0, &mut rng);
        assert_eq!(world.get::<&Animation>(e).unwrap().action, Action::Eat);
        let mode = *world.get::<&Mode>(e).unwrap();
        match mode {
            Mode::Perform { until, .. } => assert!((until - (1.0 + HOLD_TREAT)).abs() < 1e-9),
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn exercise_picks_one_of_the_workouts() {
        let (mut world, e, mut clips, mut rng) = setup();
        apply(MenuCommand::Exercise, &mut world, e, &mut clips, 0.0, &mut rng);
        let action = world.get::<&Animation>(e).unwrap().action;
        assert!(Action::EXERCISES.contains(&action));
    }

    #[test]
    fn sleep_enters_sleep_mode() {
        let (mut world, e, mut clips, mut rng) = setup();
        apply(MenuCommand::Sleep, &mut world, e, &mut clips, 0.0, &mut rng);
        assert_eq!(*world.get::<&Mode>(e).unwrap(), Mode::Sleep);
        assert_eq!(world.get::<&Animation>(e).unwrap().action, Action::Sleep);
    }

    #[test]
    fn spawn_offsets_from_this_pet() {
        let (mut world, e, mut clips, mut rng) = setup();
        let out = apply(MenuCommand::Spawn, &mut world, e, &mut clips, 0.0, &mut rng);
        assert_eq!(out, MenuOutcome::Spawn(Vec2::new(240.0, 320.0)));
    }

    #[test]
    fn giant_mode_doubles_the_footprint() {
        let (mut world, e, mut clips, mut rng) = setup();
        let before = world.get::<&Body>(e).unwrap().extent();
        apply(MenuCommand::ToggleGiant, &mut world, e, &mut clips, 0.0, &mut rng);
        assert_eq!(world.get::<&Body>(e).unwrap().extent(), before * GIANT_SCALE);
        apply(MenuCommand::ToggleGiant, &mut world, e, &mut clips, 0.0, &mut rng);
        assert_eq!(world.get::<&Body>(e).unwrap().extent(), before);
    }

    #[test]
    fn game_and_cleaning_are_timed_modes() {
        let (mut world, e, mut clips, mut rng) = setup();
        apply(MenuCommand::MiniGame, &mut world, e, &mut clips, 5.0, &mut rng);
        assert_eq!(
            *world.get::<&Mode>(e).unwrap(),
            Mode::Game(ChaseGame {
                until: 5.0 + GAME_DURATION,
                score: 0
            })
        );
        apply(MenuCommand::Clean, &mut world, e, &mut clips, 6.0, &mut rng);
        assert!(matches!(*world.get::<&Mode>(e).unwrap(), Mode::Clean { .. }));
    }

    #[test]
    fn close_and_quit_are_passed_up() {
        let (mut world, e, mut clips, mut rng) = setup();
        assert_eq!(
            apply(MenuCommand::Close, &mut world, e, &mut clips, 0.0, &mut rng),
            MenuOutcome::Close
        );
        assert_eq!(
            apply(MenuCommand::QuitAll, &mut world, e, &mut clips, 0.0, &mut rng),
            MenuOutcome::QuitAll
        );
    }
}
