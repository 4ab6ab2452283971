use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};

use rivulet_terrain::{RivuletConfig, load_config_from_path};

/// Starts a background watcher on `path`; every create, modify or remove
/// event sends a unit on the returned channel.
pub fn spawn_config_watcher(path: PathBuf) -> Receiver<()> {
    let (tx, rx) = channel::<()>();
    std::thread::spawn(move || {
        use notify::{EventKind, RecursiveMode, Watcher};
        match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                match event.kind {
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) | EventKind::Any => {
                        let _ = tx.send(());
                    }
                    _ => {}
                }
            }
        }) {
            Ok(mut watcher) => {
                if let Err(e) = watcher.watch(path.as_path(), RecursiveMode::NonRecursive) {
                    log::warn!("cannot watch {}: {}", path.display(), e);
                    return;
                }
                log::info!("watching {} for changes", path.display());
                loop {
                    std::thread::sleep(std::time::Duration::from_secs(3600));
                }
            }
            Err(e) => log::warn!("config watcher unavailable: {}", e),
        }
    });
    rx
}

/// Config file plus the change events for it.
pub struct ConfigWatch {
    path: PathBuf,
    rx: Receiver<()>,
}

impl ConfigWatch {
    pub fn new(path: PathBuf, rx: Receiver<()>) -> Self {
        Self { path, rx }
    }

    pub fn spawn(path: PathBuf) -> Self {
        let rx = spawn_config_watcher(path.clone());
        Self::new(path, rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains pending events and re-reads the file once if any arrived.
    /// A missing or invalid file is logged and yields `None`, keeping the
    /// current config in place.
    pub fn poll(&self) -> Option<RivuletConfig> {
        let mut changed = false;
        for _ in self.rx.try_iter() {
            changed = true;
        }
        if !changed {
            return None;
        }
        if !self.path.exists() {
            log::warn!("rivulet config missing: {}", self.path.display());
            return None;
        }
        match load_config_from_path(&self.path) {
            Ok(cfg) => {
                log::info!("rivulet config reloaded from {}", self.path.display());
                Some(cfg)
            }
            Err(e) => {
                log::warn!("rivulet config reload failed ({}): {}", self.path.display(), e);
                None
            }
        }
    }
}
