//! Reference releases from other threads
//!
//! The loader's tables are only touched on the thread that owns the
//! [`RuntimeLoader`](super::RuntimeLoader). Worker threads hand releases to a
//! [`ReleaseSender`]; the loader drains them at the start of every public
//! operation, or explicitly through `pump_releases`.

use tokio::sync::mpsc;

/// A reference to give back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// One reference on a cached asset, by logical name
    Asset(String),
    /// One unpinned reference on a package
    Package(String),
}

/// Cloneable handle for queueing releases from any thread
#[derive(Debug, Clone)]
pub struct ReleaseSender {
    tx: mpsc::UnboundedSender<Release>,
}

impl ReleaseSender {
    pub fn release_asset(&self, logical_name: impl Into<String>) -> bool {
        self.send(Release::Asset(logical_name.into()))
    }

    pub fn release_package(&self, package: impl Into<String>) -> bool {
        self.send(Release::Package(package.into()))
    }

    /// Queue a release; false when the loader is gone
    pub fn send(&self, release: Release) -> bool {
        match self.tx.send(release) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Loader dropped, ignoring {:?}", e.0);
                false
            }
        }
    }
}

/// Receiving side, owned by the loader
#[derive(Debug)]
pub(crate) struct ReleaseQueue {
    tx: mpsc::UnboundedSender<Release>,
    rx: mpsc::UnboundedReceiver<Release>,
}

impl ReleaseQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> ReleaseSender {
        ReleaseSender {
            tx: self.tx.clone(),
        }
    }

    /// Everything queued so far, in send order
    pub(crate) fn drain(&mut self) -> Vec<Release> {
        let mut pending = Vec::new();
        while let Ok(release) = self.rx.try_recv() {
            pending.push(release);
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_across_threads() {
        let mut queue = ReleaseQueue::new();
        let sender = queue.sender();

        let worker = sender.clone();
        std::thread::spawn(move || {
            worker.release_asset("icon");
            worker.release_package("ui");
        })
        .join()
        .ok();
        sender.release_asset("late");

        assert_eq!(
            queue.drain(),
            vec![
                Release::Asset("icon".to_string()),
                Release::Package("ui".to_string()),
                Release::Asset("late".to_string()),
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_send_after_drop_reports_false() {
        let queue = ReleaseQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.release_package("ui"));
    }
}
