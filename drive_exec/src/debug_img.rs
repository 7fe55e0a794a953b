//! # Debug images
//!
//! Intermediate images from the edge map pipeline can be handed to a [`DebugSink`] for
//! diagnostics. Sinks only observe, nothing they do feeds back into control.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;

use comms_if::eqpt::cam::Frame;
use image::GrayImage;
use log::warn;
use util::session::Session;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Receiver for intermediate pipeline images.
pub trait DebugSink {
    /// Receive a single channel image for the given topic.
    fn put(&mut self, topic: Topic, image: &GrayImage);

    /// Receive the raw colour frame.
    fn put_frame(&mut self, _frame: &Frame) {}
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The stage an image was captured at.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topic {
    Rgb,
    Grayscale,
    GaussianBlur,
    Canny,
    Birdview,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sink which drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

/// Sink saving images as PNGs into the session directory.
///
/// Only every `interval`th frame is saved, images go to `debug/<frame>_<topic>.png`.
pub struct SessionImageSink {
    root: PathBuf,
    interval: u64,
    frame_id: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::Rgb => "rgb",
            Topic::Grayscale => "grayscale",
            Topic::GaussianBlur => "gaussian_blur",
            Topic::Canny => "canny",
            Topic::Birdview => "birdview",
        }
    }
}

impl DebugSink for NullSink {
    fn put(&mut self, _topic: Topic, _image: &GrayImage) {}
}

impl SessionImageSink {
    /// Create a new sink saving every `interval`th frame. An interval of 0 disables saving.
    pub fn new(session: &Session, interval: u64) -> Result<Self, std::io::Error> {
        let root = session.session_root.join("debug");
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            interval,
            frame_id: 0,
        })
    }

    /// Move on to the next frame.
    pub fn next_frame(&mut self) {
        self.frame_id += 1;
    }

    fn active(&self) -> bool {
        self.interval > 0 && self.frame_id % self.interval == 0
    }

    fn path(&self, topic: Topic) -> PathBuf {
        self.root
            .join(format!("{:06}_{}.png", self.frame_id, topic.name()))
    }
}

impl DebugSink for SessionImageSink {
    fn put(&mut self, topic: Topic, image: &GrayImage) {
        if !self.active() {
            return;
        }

        let path = self.path(topic);
        if let Err(e) = image.save(&path) {
            warn!("Could not save debug image {:?}: {}", path, e);
        }
    }

    fn put_frame(&mut self, frame: &Frame) {
        if !self.active() {
            return;
        }

        let path = self.path(Topic::Rgb);
        if let Err(e) = frame.save(&path) {
            warn!("Could not save debug image {:?}: {}", path, e);
        }
    }
}
