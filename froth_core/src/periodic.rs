//! Fixed-rate background work on a dedicated thread.
//!
//! Each `PeriodicTask` owns exactly one thread. The body runs once on start
//! and then on every tick until `stop` (or drop) disconnects the cancel
//! channel; `stop` joins the thread, so no task outlives its handle.
use crossbeam_channel as xch;
use std::thread::JoinHandle;
use std::time::Duration;

pub struct PeriodicTask {
    name: String,
    cancel: Option<xch::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn<F>(name: impl Into<String>, period: Duration, mut body: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (cancel_tx, cancel_rx) = xch::bounded::<()>(0);
        let ticker = xch::tick(period);
        let thread_name = name.clone();

        let join_handle = std::thread::Builder::new().name(name.clone()).spawn(move || {
            tracing::debug!(task = %thread_name, ?period, "periodic task started");
            body();
            loop {
                xch::select! {
                    recv(cancel_rx) -> _ => break,
                    recv(ticker) -> _ => body(),
                }
            }
            tracing::trace!(task = %thread_name, "periodic task exiting cleanly");
        })?;

        Ok(Self {
            name,
            cancel: Some(cancel_tx),
            join_handle: Some(join_handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Cancel and join. Safe to call repeatedly.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the select with a disconnect.
        drop(self.cancel.take());
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::error!(task = %self.name, "periodic task panicked");
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
