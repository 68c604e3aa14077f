use crate::{Error, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Install a ctrl-c handler that flips the shared running flag instead of exiting immediately.
pub(super) fn create_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_handle = running.clone();

    ctrlc::set_handler(move || {
        running_handle.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(running)
}

/// Stop feeds, release the serial device and leave presenters showing
/// an all-zero, `off` readout before the daemon exits.
pub(super) fn render_shutdown(event_loop: &mut super::EventLoop<'_>) {
    event_loop.shutdown();
    event_loop.logger.info("offline");
}
