use glam::Vec2;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::Graphics::Dwm::{DwmSetWindowAttribute, DWMWINDOWATTRIBUTE};
use windows::Win32::Graphics::Gdi::{GetMonitorInfoW, HMONITOR, MONITORINFO};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetWindowLongPtrW, SetWindowLongPtrW, SetWindowPos, GWL_EXSTYLE,
    SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
};
use winit::monitor::MonitorHandle;
use winit::platform::windows::MonitorHandleExtWindows;

use crate::screen::Rect;

/// Extract the Win32 HWND from a winit window.
pub fn get_hwnd(window: &winit::window::Window) -> Option<HWND> {
    let handle = match window.window_handle() {
        Ok(h) => h,
        Err(e) => {
            log::warn!("Window handle unavailable: {e}");
            return None;
        }
    };
    match handle.as_raw() {
        RawWindowHandle::Win32(h) => Some(HWND(h.hwnd.get() as *mut core::ffi::c_void)),
        _ => None,
    }
}

unsafe fn set_dwm_u32(hwnd: HWND, attribute: i32, value: u32) {
    let _ = DwmSetWindowAttribute(
        hwnd,
        DWMWINDOWATTRIBUTE(attribute),
        &value as *const u32 as *const core::ffi::c_void,
        4,
    );
}

/// Tool-window style (no taskbar button) with no DWM border or rounding.
unsafe fn make_pet_window(hwnd: HWND) {
    // All pixels come from the DirectComposition visual wgpu creates via
    // DxgiFromVisual.
    let style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
    let new_style = super::pet_window_style(style);
    SetWindowLongPtrW(hwnd, GWL_EXSTYLE, new_style);
    log::debug!("Pet window ex-style 0x{:08X} -> 0x{:08X}", style, new_style);

    let _ = SetWindowPos(
        hwnd,
        HWND::default(),
        0,
        0,
        0,
        0,
        SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
    );

    // DWMWA_NCRENDERING_POLICY = DWMNCRP_DISABLED
    set_dwm_u32(hwnd, 2, 2);
    // DWMWA_WINDOW_CORNER_PREFERENCE = DWMWCP_DONOTROUND
    set_dwm_u32(hwnd, 33, 1);
    // DWMWA_BORDER_COLOR = DWMWA_COLOR_NONE
    set_dwm_u32(hwnd, 34, 0xFFFF_FFFE);
    // DWMWA_SYSTEMBACKDROP_TYPE = DWMSBT_NONE
    set_dwm_u32(hwnd, 38, 1);
}

pub fn setup_pet_window(window: &winit::window::Window) {
    let Some(hwnd) = get_hwnd(window) else {
        return;
    };
    unsafe {
        make_pet_window(hwnd);
    }
}

/// Flip WS_EX_TRANSPARENT alone. winit's `set_cursor_hittest` rewrites the
/// whole ex-style and would bring back the layered style and taskbar button.
pub fn set_click_through(window: &winit::window::Window, through: bool) -> bool {
    let Some(hwnd) = get_hwnd(window) else {
        return false;
    };
    unsafe {
        let style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
        let new_style = super::click_through_style(style, through);
        if new_style != style {
            SetWindowLongPtrW(hwnd, GWL_EXSTYLE, new_style);
        }
    }
    true
}

/// Get the current global mouse cursor position in screen pixels.
pub fn get_mouse_pos() -> Vec2 {
    let mut point = POINT::default();
    unsafe {
        let _ = GetCursorPos(&mut point);
    }
    Vec2::new(point.x as f32, point.y as f32)
}

/// Monitor area minus the taskbar and docked toolbars.
pub fn work_area(monitor: &MonitorHandle) -> Option<Rect> {
    let hmonitor = HMONITOR(monitor.hmonitor() as *mut core::ffi::c_void);
    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    let ok = unsafe { GetMonitorInfoW(hmonitor, &mut info) };
    if !ok.as_bool() {
        return None;
    }
    let r = info.rcWork;
    Some(Rect::new(r.left, r.top, r.right - r.left, r.bottom - r.top))
}
