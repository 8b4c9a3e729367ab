//! Win32 window backend

use tracing::warn;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowTextLengthW, GetWindowTextW, IsIconic, IsWindow, IsWindowVisible,
    SetForegroundWindow, ShowWindow, SW_MINIMIZE, SW_RESTORE,
};

use super::{match_title, DesktopError, GameWindow, WindowFocus, WindowHandle, WindowLocator};

#[derive(Debug, Clone)]
pub struct Win32Desktop {
    marker: String,
}

impl Win32Desktop {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as usize as *mut core::ffi::c_void)
}

/// Titles of every visible top-level window
fn visible_windows() -> Vec<(WindowHandle, String)> {
    unsafe extern "system" fn enum_cb(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let out = &mut *(lparam.0 as *mut Vec<(WindowHandle, String)>);
        if IsWindowVisible(hwnd).as_bool() {
            let len = GetWindowTextLengthW(hwnd);
            if len > 0 {
                let mut buf = vec![0u16; len as usize + 1];
                let read = GetWindowTextW(hwnd, &mut buf);
                let text = String::from_utf16_lossy(&buf[..read as usize]);
                out.push((WindowHandle(hwnd.0 as usize as u64), text));
            }
        }
        BOOL(1)
    }

    let mut out: Vec<(WindowHandle, String)> = Vec::new();
    unsafe {
        let out_ptr = &mut out as *mut Vec<(WindowHandle, String)>;
        if let Err(e) = EnumWindows(Some(enum_cb), LPARAM(out_ptr as isize)) {
            warn!("EnumWindows failed: {}", e);
        }
    }
    out
}

impl WindowLocator for Win32Desktop {
    fn enumerate(&self, active_titles: &[String]) -> Vec<GameWindow> {
        visible_windows()
            .into_iter()
            .filter_map(|(handle, text)| {
                match_title(&text, active_titles, &self.marker)
                    .map(|title| GameWindow::new(handle, title))
            })
            .collect()
    }
}

impl WindowFocus for Win32Desktop {
    fn focus(&self, handle: WindowHandle) -> Result<(), DesktopError> {
        let hwnd = to_hwnd(handle);
        unsafe {
            if !IsWindow(hwnd).as_bool() {
                return Err(DesktopError::NotFound(handle));
            }
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                return Err(DesktopError::Backend(format!(
                    "SetForegroundWindow refused window {}",
                    handle
                )));
            }
        }
        Ok(())
    }

    fn minimize(&self, handle: WindowHandle) {
        unsafe {
            let _ = ShowWindow(to_hwnd(handle), SW_MINIMIZE);
        }
    }
}
