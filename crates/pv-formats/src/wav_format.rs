//! 16-bit PCM WAV encoding for rendered audio.

use std::io::Write;

use pv_ir::AudioBuffer;

/// Write planar f32 channels as an interleaved 16-bit WAV stream.
///
/// All planes must have the same length. Samples are clamped to [-1, 1].
pub fn write_wav(w: &mut impl Write, planes: &[&[f32]], sample_rate: u32) -> std::io::Result<()> {
    let num_channels = planes.len() as u16;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let frames = planes.first().map_or(0, |p| p.len());
    let data_size = frames as u32 * block_align as u32;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, sample_rate, block_align, bits_per_sample)?;
    write_data_chunk(w, planes, frames, data_size)
}

/// Encode a whole buffer into an in-memory WAV file.
pub fn buffer_to_wav(buffer: &AudioBuffer, sample_rate: u32) -> Vec<u8> {
    let planes = buffer.planes(buffer.frames());
    let mut buf = Vec::with_capacity(44 + buffer.frames() * buffer.channels() * 2);
    write_wav(&mut buf, &planes, sample_rate).expect("Vec<u8> write cannot fail");
    buf
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(
    w: &mut impl Write,
    planes: &[&[f32]],
    frames: usize,
    data_size: u32,
) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for i in 0..frames {
        for plane in planes {
            w.write_all(&to_pcm16(plane[i]).to_le_bytes())?;
        }
    }
    Ok(())
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
