// Decodes the background photo off the frame thread.
// The frame loop polls once per frame; nothing blocks while the decode runs.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::RgbaImage;
use log::debug;

use crate::error::Error;

pub struct PlateLoader {
    rx: Option<Receiver<Result<RgbaImage, Error>>>,
}

impl PlateLoader {
    /// Start decoding `path` on a worker thread.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            debug!("decoding plate {}", path.display());
            let result = image::open(&path)
                .map(|img| img.to_rgba8())
                .map_err(|e| Error::ImageLoad(format!("{}: {e}", path.display())));
            // The receiver may be gone if the app already quit.
            let _ = tx.send(result);
        });
        Self { rx: Some(rx) }
    }

    /// A loader that never delivers anything.
    pub fn none() -> Self {
        Self { rx: None }
    }

    pub fn is_pending(&self) -> bool {
        self.rx.is_some()
    }

    /// Some(result) exactly once, when the decode has finished.
    pub fn poll(&mut self) -> Option<Result<RgbaImage, Error>> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.rx = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                Some(Err(Error::ImageLoad("plate loader thread exited".into())))
            }
        }
    }
}
