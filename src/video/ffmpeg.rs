//! FFmpeg-backed MP4 decode and encode.
//!
//! FFmpeg reads and writes files, so input bytes are spooled to a temporary
//! file and output is written to another one that is read back on `finish`.
//! Both files are removed when the source/sink is dropped, including on
//! failure, so an aborted run leaves nothing behind.

use std::io::Write;

use anyhow::{anyhow, Context};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use tempfile::NamedTempFile;

use super::{FrameSink, FrameSource, VideoInfo};
use crate::error::{PipelineError, Result};

/// Largest time base denominator the MPEG-4 encoder accepts.
const MAX_TIME_BASE_DEN: i32 = 65535;

pub struct FfmpegSource {
    _spool: NamedTempFile,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    info: VideoInfo,
    eof_sent: bool,
}

impl FfmpegSource {
    /// Open an in-memory container. Fails with `DecodeError`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::open(bytes).map_err(|e| PipelineError::DecodeError(PipelineError::detail(&e)))
    }

    fn open(bytes: &[u8]) -> anyhow::Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;

        let mut spool = tempfile::Builder::new()
            .prefix("parkwatch-in-")
            .suffix(".mp4")
            .tempfile()
            .context("create input spool file")?;
        spool.write_all(bytes).context("write input spool file")?;
        spool.flush().context("flush input spool file")?;

        let input = ffmpeg::format::input(&spool.path())
            .context("failed to open video input with ffmpeg")?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("container has no video track"))?;
        let stream_index = input_stream.index();
        let mut rate = input_stream.avg_frame_rate();
        if rate.numerator() <= 0 || rate.denominator() <= 0 {
            rate = input_stream.rate();
        }
        if rate.numerator() <= 0 || rate.denominator() <= 0 {
            return Err(anyhow!("video track has no usable frame rate"));
        }
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        let info = VideoInfo {
            width: decoder.width(),
            height: decoder.height(),
            fps: (rate.numerator(), rate.denominator()),
        };
        log::debug!(
            "opened video {}x{} @ {}/{} fps",
            info.width,
            info.height,
            info.fps.0,
            info.fps.1
        );

        Ok(Self {
            _spool: spool,
            input,
            stream_index,
            decoder,
            scaler,
            info,
            eof_sent: false,
        })
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
    }

    fn decode_next(&mut self) -> anyhow::Result<Option<RgbImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg::frame::Video::empty();
                self.scaler
                    .run(&decoded, &mut rgb_frame)
                    .context("scale frame to RGB")?;
                return frame_to_image(&rgb_frame).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    self.decoder.send_eof().context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        self.decode_next()
            .map_err(|e| PipelineError::DecodeError(PipelineError::detail(&e)))
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> anyhow::Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(
            data.get(start..start + row_bytes)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    RgbImage::from_raw(width, height, pixels).ok_or_else(|| anyhow!("frame buffer size mismatch"))
}

/// MPEG-4 Part 2 encoder writing an MP4 container.
pub struct FfmpegSink {
    spool: NamedTempFile,
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    info: VideoInfo,
    next_pts: i64,
}

impl FfmpegSink {
    /// Prepare an output stream matching `info`. Fails with `EncodeError`.
    pub fn new(info: VideoInfo) -> Result<Self> {
        Self::open(info).map_err(|e| PipelineError::EncodeError(PipelineError::detail(&e)))
    }

    fn open(info: VideoInfo) -> anyhow::Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        if info.width % 2 != 0 || info.height % 2 != 0 {
            return Err(anyhow!(
                "MPEG-4 output needs even dimensions, got {}x{}",
                info.width,
                info.height
            ));
        }

        let spool = tempfile::Builder::new()
            .prefix("parkwatch-out-")
            .suffix(".mp4")
            .tempfile()
            .context("create output spool file")?;
        let mut output =
            ffmpeg::format::output(&spool.path()).context("open ffmpeg output container")?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| anyhow!("MPEG-4 encoder not available in this ffmpeg build"))?;
        let (fps_num, fps_den) = info.bounded_fps(MAX_TIME_BASE_DEN);
        if (fps_num, fps_den) != info.fps {
            log::debug!(
                "output frame rate {}/{} approximated as {}/{}",
                info.fps.0,
                info.fps.1,
                fps_num,
                fps_den
            );
        }
        let frame_rate = ffmpeg::Rational::new(fps_num, fps_den);
        let encoder_time_base = frame_rate.invert();

        let mut stream = output.add_stream(codec).context("add output stream")?;
        let stream_index = stream.index();
        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .context("create ffmpeg video encoder")?;
        encoder.set_width(info.width);
        encoder.set_height(info.height);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_frame_rate(Some(frame_rate));
        encoder.set_time_base(encoder_time_base);
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder.open_as(codec).context("open ffmpeg video encoder")?;
        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);

        output.write_header().context("write container header")?;
        let stream_time_base = output
            .stream(stream_index)
            .ok_or_else(|| anyhow!("output stream disappeared"))?
            .time_base();

        let scaler = ffmpeg::software::scaling::context::Context::get(
            ffmpeg::format::Pixel::RGB24,
            info.width,
            info.height,
            ffmpeg::format::Pixel::YUV420P,
            info.width,
            info.height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            spool,
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            info,
            next_pts: 0,
        })
    }

    fn encode(&mut self, image: &RgbImage) -> anyhow::Result<()> {
        if image.dimensions() != (self.info.width, self.info.height) {
            return Err(anyhow!(
                "frame is {:?}, stream is {}x{}",
                image.dimensions(),
                self.info.width,
                self.info.height
            ));
        }

        let mut rgb_frame =
            ffmpeg::frame::Video::new(ffmpeg::format::Pixel::RGB24, self.info.width, self.info.height);
        let row_bytes = self.info.width as usize * 3;
        let stride = rgb_frame.stride(0);
        let data = rgb_frame.data_mut(0);
        for (row, src) in image.as_raw().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            data.get_mut(start..start + row_bytes)
                .context("ffmpeg frame row is out of bounds")?
                .copy_from_slice(src);
        }

        let mut yuv_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb_frame, &mut yuv_frame)
            .context("scale frame to YUV420P")?;
        yuv_frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&yuv_frame)
            .context("send frame to ffmpeg encoder")?;
        self.drain()
    }

    fn drain(&mut self) -> anyhow::Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("write packet")?;
        }
        Ok(())
    }

    fn finalize(mut self) -> anyhow::Result<Vec<u8>> {
        self.encoder.send_eof().context("flush ffmpeg encoder")?;
        self.drain()?;
        self.output
            .write_trailer()
            .context("write container trailer")?;

        let Self { spool, output, .. } = self;
        drop(output);
        std::fs::read(spool.path()).context("read encoded video")
    }
}

impl FrameSink for FfmpegSink {
    fn push(&mut self, frame: &RgbImage) -> Result<()> {
        self.encode(frame)
            .map_err(|e| PipelineError::EncodeError(PipelineError::detail(&e)))
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.finalize()
            .map_err(|e| PipelineError::EncodeError(PipelineError::detail(&e)))
    }
}
