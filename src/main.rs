use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use keyrelay::keys::vk;
use keyrelay::{
    CaptureSource, InputConfig, InputSystem, KeyEvent, KeyListener, ListenerDispatcher,
};
use log::{info, warn};

const TICK: Duration = Duration::from_millis(16);

/// Logs every key event and raises `exit` when ESC is released.
struct LoggingListener {
    exit: Arc<AtomicBool>,
}

impl KeyListener for LoggingListener {
    fn key_typed(&self, event: &KeyEvent) -> Result<()> {
        info!("{}", event);
        Ok(())
    }

    fn key_pressed(&self, event: &KeyEvent) -> Result<()> {
        info!("{}", event);
        Ok(())
    }

    fn key_released(&self, event: &KeyEvent) -> Result<()> {
        info!("{}", event);
        if event.virtual_key() == vk::ESCAPE {
            self.exit.store(true, Ordering::Release);
        }
        Ok(())
    }
}

#[cfg(windows)]
fn native_capture() -> Result<Arc<dyn CaptureSource>> {
    Ok(Arc::new(
        keyrelay::capture::windows::LowLevelKeyboardCapture::new(),
    ))
}

#[cfg(not(windows))]
fn native_capture() -> Result<Arc<dyn CaptureSource>> {
    anyhow::bail!("no native keyboard capture backend for this platform")
}

fn main() -> Result<()> {
    // Load config or create default if not exists
    let config = InputConfig::load_or_create("Config.toml")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let capture = native_capture()?;
    let exit = Arc::new(AtomicBool::new(false));
    let dispatcher = Arc::new(ListenerDispatcher::with_action_duration(
        LoggingListener {
            exit: Arc::clone(&exit),
        },
        config.action_duration(),
    ));

    let system = InputSystem::new(config, capture);
    system.set_dispatcher(dispatcher)?;
    system.initialize()?;
    info!("capturing keyboard input, release ESC to quit");

    let mut failures = 0usize;
    let mut last = Instant::now();
    while !exit.load(Ordering::Acquire) {
        thread::sleep(TICK);
        let now = Instant::now();
        system.update(now - last);
        last = now;

        failures += system.failures().try_iter().count();
    }

    system.shutdown()?;
    info!(
        "{} events received, {} dispatched",
        system.events_received(),
        system.events_dispatched()
    );
    if failures > 0 {
        warn!("{} events were not handled cleanly", failures);
    }
    Ok(())
}
