//! Low-level keyboard hook backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::error::{InputError, Result};
use crate::pipeline::RawKeySink;
use crate::translate::KeyTranslator;

use super::{CaptureReady, CaptureSource};

/// Where the hook procedure sends translated events. The hook procedure has
/// no user data pointer, so the target lives in a process-wide slot.
struct HookTarget {
    sink: Arc<dyn RawKeySink>,
    translator: KeyTranslator,
}

static HOOK_TARGET: RwLock<Option<Arc<HookTarget>>> = RwLock::new(None);

/// Captures system-wide keyboard input through a `WH_KEYBOARD_LL` hook.
///
/// Only one instance can be registered per process.
#[derive(Debug, Default)]
pub struct LowLevelKeyboardCapture {
    hook_thread: AtomicU32,
}

impl LowLevelKeyboardCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

fn set_target(target: Option<Arc<HookTarget>>) {
    *HOOK_TARGET.write().unwrap_or_else(PoisonError::into_inner) = target;
}

/// Installs `target` unless another registration already holds the slot.
fn claim_target(target: Arc<HookTarget>) -> Result<()> {
    let mut slot = HOOK_TARGET.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(InputError::Capture(
            "a keyboard hook is already registered in this process".to_string(),
        ));
    }
    *slot = Some(target);
    Ok(())
}

fn current_target() -> Option<Arc<HookTarget>> {
    HOOK_TARGET
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

impl CaptureSource for LowLevelKeyboardCapture {
    fn name(&self) -> &'static str {
        "low_level_keyboard_hook"
    }

    fn begin_capture(&self, sink: Arc<dyn RawKeySink>, ready: CaptureReady) -> Result<()> {
        claim_target(Arc::new(HookTarget {
            sink,
            translator: KeyTranslator::new(),
        }))?;

        let hook = match unsafe { SetWindowsHookExA(WH_KEYBOARD_LL, Some(keyboard_proc), None, 0) }
        {
            Ok(hook) if !hook.0.is_null() => hook,
            Ok(_) => {
                set_target(None);
                return Err(InputError::Capture("SetWindowsHookExA returned null".to_string()));
            }
            Err(e) => {
                set_target(None);
                return Err(InputError::Capture(e.to_string()));
            }
        };

        // Force creation of the thread message queue before anyone posts to it
        unsafe {
            let mut msg = MSG::default();
            let _ = PeekMessageA(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
        }
        self.hook_thread
            .store(unsafe { GetCurrentThreadId() }, Ordering::Release);
        debug!("keyboard hook installed");
        ready.notify();

        unsafe {
            let mut msg = MSG::default();
            loop {
                let result = GetMessageA(&mut msg, None, 0, 0);
                if result.0 == 0 || result.0 == -1 {
                    break;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageA(&msg);
            }
            let _ = UnhookWindowsHookEx(hook);
        }

        self.hook_thread.store(0, Ordering::Release);
        set_target(None);
        debug!("keyboard hook removed");
        Ok(())
    }

    fn end_capture(&self) -> Result<()> {
        let thread_id = self.hook_thread.load(Ordering::Acquire);
        if thread_id == 0 {
            return Ok(());
        }
        if thread_id == unsafe { GetCurrentThreadId() } {
            return Err(InputError::Capture(
                "end_capture called from the hook thread".to_string(),
            ));
        }
        unsafe { PostThreadMessageA(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
            .map_err(|e| InputError::Capture(e.to_string()))
    }
}

unsafe extern "system" fn keyboard_proc(code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    if code < 0 {
        return unsafe { CallNextHookEx(None, code, w_param, l_param) };
    }

    let kb_struct = unsafe { &*(l_param.0 as *const KBDLLHOOKSTRUCT) };
    let down = match w_param.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => Some(true),
        WM_KEYUP | WM_SYSKEYUP => Some(false),
        _ => None,
    };

    if let (Some(down), Some(target)) = (down, current_target()) {
        for raw in target.translator.translate(kb_struct.vkCode, down) {
            target.sink.on_raw_key_event(raw);
        }
    }

    unsafe { CallNextHookEx(None, code, w_param, l_param) }
}
