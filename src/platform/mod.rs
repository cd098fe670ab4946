#[cfg(windows)]
pub mod win32;

use glam::Vec2;
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;
use winit::window::Window;

use crate::screen::{Rect, ScreenGeometry};

// Win32 extended window styles.
const WS_EX_TRANSPARENT: isize = 0x0000_0020;
const WS_EX_TOOLWINDOW: isize = 0x0000_0080;
const WS_EX_LAYERED: isize = 0x0008_0000;
const WS_EX_NOREDIRECTIONBITMAP: isize = 0x0020_0000;

/// Ex-style for a pet window: no taskbar button, and no layered or GDI
/// redirection surface competing with the DirectComposition visual.
#[cfg_attr(not(windows), allow(dead_code))]
fn pet_window_style(style: isize) -> isize {
    (style & !WS_EX_LAYERED) | WS_EX_TOOLWINDOW | WS_EX_NOREDIRECTIONBITMAP
}

/// `style` with only the click-through bit changed.
#[cfg_attr(not(windows), allow(dead_code))]
fn click_through_style(style: isize, through: bool) -> isize {
    if through {
        style | WS_EX_TRANSPARENT
    } else {
        style & !WS_EX_TRANSPARENT
    }
}

/// Global cursor position, where the OS lets us ask for it. Elsewhere the
/// app tracks the cursor from window events.
pub fn cursor_position() -> Option<Vec2> {
    #[cfg(windows)]
    {
        Some(win32::get_mouse_pos())
    }
    #[cfg(not(windows))]
    {
        None
    }
}

/// Platform touches on a new pet window.
pub fn prepare_pet_window(window: &Window) {
    #[cfg(windows)]
    win32::setup_pet_window(window);
    #[cfg(not(windows))]
    let _ = window;
}

/// Let clicks on `window` fall through to the desktop, or catch them again.
/// Returns `false` where this is not supported.
pub fn set_click_through(window: &Window, through: bool) -> bool {
    #[cfg(windows)]
    {
        win32::set_click_through(window, through)
    }
    #[cfg(not(windows))]
    {
        let _ = (window, through);
        false
    }
}

fn usable_area(monitor: &MonitorHandle) -> Rect {
    #[cfg(windows)]
    if let Some(rect) = win32::work_area(monitor) {
        return rect;
    }
    let pos = monitor.position();
    let size = monitor.size();
    Rect::new(pos.x, pos.y, size.width as i32, size.height as i32)
}

/// Usable area of every connected monitor.
pub fn screen_geometry(event_loop: &ActiveEventLoop) -> ScreenGeometry {
    let primary = event_loop.primary_monitor();
    let mut primary_index = 0;
    let monitors: Vec<Rect> = event_loop
        .available_monitors()
        .enumerate()
        .map(|(i, m)| {
            if primary.as_ref() == Some(&m) {
                primary_index = i;
            }
            usable_area(&m)
        })
        .collect();
    for (i, r) in monitors.iter().enumerate() {
        log::debug!("Monitor {i}: {}x{} at ({}, {})", r.w, r.h, r.x, r.y);
    }
    ScreenGeometry::new(monitors, primary_index)
}
