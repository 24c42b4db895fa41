use std::collections::VecDeque;

use image::RgbImage;

use super::{FrameSink, FrameSource, VideoInfo};
use crate::error::{PipelineError, Result};

/// Frames already decoded by the caller.
#[derive(Debug)]
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<RgbImage>,
}

impl MemorySource {
    /// All frames must share the resolution recorded in `info`.
    pub fn new(info: VideoInfo, frames: Vec<RgbImage>) -> Result<Self> {
        if let Some(bad) = frames
            .iter()
            .position(|f| f.dimensions() != (info.width, info.height))
        {
            return Err(PipelineError::DecodeError(format!(
                "frame {} is {:?}, stream is {}x{}",
                bad,
                frames[bad].dimensions(),
                info.width,
                info.height
            )));
        }
        Ok(Self {
            info,
            frames: frames.into(),
        })
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

/// Collects annotated frames and serialises them as raw RGB24, frame after
/// frame, when finished.
#[derive(Debug)]
pub struct MemorySink {
    info: VideoInfo,
    frames: Vec<RgbImage>,
}

impl MemorySink {
    pub fn new(info: VideoInfo) -> Self {
        Self {
            info,
            frames: Vec::new(),
        }
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<RgbImage> {
        self.frames
    }
}

impl FrameSink for MemorySink {
    fn push(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.info.width, self.info.height) {
            return Err(PipelineError::EncodeError(format!(
                "frame is {:?}, stream is {}x{}",
                frame.dimensions(),
                self.info.width,
                self.info.height
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(self
            .frames
            .into_iter()
            .flat_map(|f| f.into_raw())
            .collect())
    }
}
