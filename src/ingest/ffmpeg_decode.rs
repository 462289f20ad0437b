//! Video file and stream source using FFmpeg.
//!
//! Decodes the best video track of a local file or a stream URL to RGB24, one
//! frame per `read`. The URL is handed to libavformat as-is.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::{FrameSource, ReadOutcome};
use crate::frame::Frame;

/// What a `receive_frame` call means for the decode loop.
#[derive(Debug, PartialEq, Eq)]
enum Receive {
    Frame,
    NeedInput,
    Drained,
}

/// EAGAIN asks for another packet and EOF means the flushed decoder is empty.
/// Every other error is a decode failure.
fn receive_step(result: std::result::Result<(), ffmpeg::Error>) -> Result<Receive> {
    match result {
        Ok(()) => Ok(Receive::Frame),
        Err(ffmpeg::Error::Eof) => Ok(Receive::Drained),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {
            Ok(Receive::NeedInput)
        }
        Err(e) => Err(anyhow!(e).context("receive frame from ffmpeg decoder")),
    }
}

pub struct FfmpegSource {
    target: String,
    state: Option<DecodeState>,
    frame_count: u64,
}

struct DecodeState {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    eof_sent: bool,
}

impl FfmpegSource {
    pub fn open(target: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&target)
            .with_context(|| format!("failed to open '{}' with ffmpeg", target))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("'{}' has no video track", target))?;
        let stream_index = input_stream.index();
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

        log::info!(
            "FfmpegSource: opened {} ({}x{})",
            target,
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            target: target.to_string(),
            state: Some(DecodeState {
                input,
                stream_index,
                decoder,
                scaler,
                eof_sent: false,
            }),
            frame_count: 0,
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            match receive_step(state.decoder.receive_frame(&mut decoded))? {
                Receive::Frame => {
                    let mut rgb_frame = ffmpeg::frame::Video::empty();
                    state
                        .scaler
                        .run(&decoded, &mut rgb_frame)
                        .context("scale frame to RGB")?;
                    let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
                    self.frame_count += 1;
                    return Frame::from_rgb(pixels, width, height, self.frame_count).map(Some);
                }
                Receive::Drained => return Ok(None),
                Receive::NeedInput => {}
            }
            if state.eof_sent {
                return Ok(None);
            }

            let mut packet = None;
            for (stream, candidate) in state.input.packets() {
                if stream.index() == state.stream_index {
                    packet = Some(candidate);
                    break;
                }
            }
            match packet {
                Some(packet) => state
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    state.decoder.send_eof().context("flush ffmpeg decoder")?;
                    state.eof_sent = true;
                }
            }
        }
    }
}

impl FrameSource for FfmpegSource {
    fn describe(&self) -> String {
        format!("{} (ffmpeg)", self.target)
    }

    fn read(&mut self) -> ReadOutcome {
        match self.next_frame() {
            Ok(Some(frame)) => ReadOutcome::Frame(frame),
            Ok(None) => ReadOutcome::EndOfStream,
            Err(e) => ReadOutcome::Failed(e),
        }
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!(
                "FfmpegSource: closed {} after {} frame(s)",
                self.target,
                self.frame_count
            );
        }
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data[..row_bytes * height as usize].to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
