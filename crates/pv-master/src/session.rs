//! Offline rendering of timed MIDI scripts.

use std::path::Path;

use pv_engine::Engine;
use pv_ir::{AudioBuffer, DspUnit};
use tracing::{debug, info};

use crate::{MasterError, Settings};

/// A raw MIDI message due at an absolute frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptEvent {
    pub frame: usize,
    pub message: Vec<u8>,
}

impl ScriptEvent {
    pub fn new(frame: usize, message: &[u8]) -> Self {
        Self {
            frame,
            message: message.to_vec(),
        }
    }
}

/// Play `notes` as a chord from frame 0, released at `release_at`.
pub fn chord_script(notes: &[u8], velocity: u8, release_at: usize) -> Vec<ScriptEvent> {
    let ons = notes
        .iter()
        .map(|&n| ScriptEvent::new(0, &[0x90, n & 0x7F, velocity & 0x7F]));
    let offs = notes
        .iter()
        .map(|&n| ScriptEvent::new(release_at, &[0x80, n & 0x7F, 0]));
    ons.chain(offs).collect()
}

/// An engine plus the scratch buffers to drive it block by block.
pub struct Session<D: DspUnit> {
    engine: Engine<D>,
    inputs: AudioBuffer,
    block: AudioBuffer,
}

impl<D: DspUnit> Session<D> {
    /// Build an engine from `factory` and install the configured tuning bank.
    pub fn new(factory: impl FnMut() -> D, settings: &Settings) -> Result<Self, MasterError> {
        let mut engine = Engine::new(factory, settings.engine_config())?;
        let bank = settings.tuning_bank();
        if !bank.is_empty() {
            engine.set_tuning_bank(bank);
        }
        Ok(Self::from_engine(engine))
    }

    pub fn from_engine(engine: Engine<D>) -> Self {
        let frames = engine.max_block_size();
        Self {
            inputs: AudioBuffer::new(engine.num_inputs(), frames),
            block: AudioBuffer::new(engine.num_outputs(), frames),
            engine,
        }
    }

    pub fn engine(&self) -> &Engine<D> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<D> {
        &mut self.engine
    }

    /// Send one `.syx` tuning file to the engine as if it arrived over MIDI.
    pub fn apply_tuning_file(&mut self, path: &Path) -> Result<(), MasterError> {
        let frame = pv_formats::load_tuning_file(path)?;
        debug!(name = %frame.name, "applying tuning file");
        self.engine.handle_midi(&frame.data);
        Ok(())
    }

    /// Render `frames` samples, delivering each script event at the start
    /// of the block that begins on its frame.
    ///
    /// Events must be sorted by frame. Blocks are split at event frames so
    /// timing is sample accurate.
    pub fn render(&mut self, script: &[ScriptEvent], frames: usize) -> AudioBuffer {
        let mut out = AudioBuffer::new(self.engine.num_outputs(), frames);
        let max_block = self.block.frames().max(1);
        let mut pending = script.iter().peekable();
        let mut pos = 0;

        while pos < frames {
            while let Some(event) = pending.next_if(|e| e.frame <= pos) {
                self.engine.handle_midi(&event.message);
            }
            let next_event = pending.peek().map_or(frames, |e| e.frame.min(frames));
            let len = (frames - pos).min(max_block).min(next_event - pos);
            self.render_block(&mut out, pos, len);
            pos += len;
        }
        debug!(frames, events = script.len(), "script rendered");
        out
    }

    fn render_block(&mut self, out: &mut AudioBuffer, pos: usize, len: usize) {
        let inputs = self.inputs.planes(len);
        let mut block = self.block.planes_mut(len);
        self.engine.process(len, &inputs, &mut block[..]);
        for (ch, plane) in block.iter().enumerate() {
            out.channel_mut(ch)[pos..pos + len].copy_from_slice(plane);
        }
    }

    /// Render and encode as a 16-bit WAV file.
    pub fn render_to_wav(&mut self, script: &[ScriptEvent], frames: usize) -> Vec<u8> {
        let buffer = self.render(script, frames);
        info!(
            frames,
            channels = buffer.channels(),
            sample_rate = self.engine.sample_rate(),
            "rendered to wav"
        );
        pv_formats::buffer_to_wav(&buffer, self.engine.sample_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SineVoice;
    use pv_engine::EngineConfig;

    fn session(block: usize) -> Session<SineVoice> {
        let config = EngineConfig::default()
            .with_sample_rate(48_000)
            .with_max_block_size(block);
        Session::from_engine(Engine::new(SineVoice::new, config).unwrap())
    }

    fn energy(plane: &[f32]) -> f32 {
        plane.iter().map(|s| s * s).sum()
    }

    #[test]
    fn silence_without_events() {
        let mut s = session(64);
        let out = s.render(&[], 1000);
        assert_eq!(out.frames(), 1000);
        assert_eq!(out.channels(), 2);
        assert_eq!(energy(out.channel(0)), 0.0);
    }

    #[test]
    fn note_starts_on_its_frame() {
        let mut s = session(256);
        let out = s.render(&[ScriptEvent::new(100, &[0x90, 69, 127])], 400);
        let left = out.channel(0);
        assert_eq!(energy(&left[..100]), 0.0);
        assert!(energy(&left[100..]) > 0.0);
        assert_eq!(left, out.channel(1));
    }

    #[test]
    fn chord_allocates_and_releases_voices() {
        let mut s = session(128);
        let script = chord_script(&[60, 64, 67], 100, 4800);
        s.render(&script, 4000);
        assert_eq!(s.engine().voices().used().len(), 3);
        s.render(&[], 2000);
        assert_eq!(s.engine().voices().used().len(), 3);

        let mut s = session(128);
        s.render(&script, 6000);
        assert!(s.engine().voices().used().is_empty());
    }

    #[test]
    fn volume_cc_reaches_voices() {
        let mut s = session(64);
        let script = [
            ScriptEvent::new(0, &[0x90, 60, 100]),
            ScriptEvent::new(0, &[0xB0, 7, 0]),
        ];
        let out = s.render(&script, 64);
        assert_eq!(s.engine().channel_value(0, 0), Some(0.0));
        assert_eq!(energy(out.channel(0)), 0.0);
    }

    #[test]
    fn wav_size_matches_render() {
        let mut s = session(64);
        let wav = s.render_to_wav(&chord_script(&[60], 90, 100), 200);
        assert_eq!(wav.len(), 44 + 200 * 2 * 2);
    }

    #[test]
    fn tuning_file_retunes_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat_a.syx");
        let mut dump = vec![0xF0, 0x7E, 0x7F, 0x08, 0x08, 0x03, 0x7F, 0x7F];
        dump.extend_from_slice(&[64; 12]);
        dump[8 + 9] = 0;
        dump.push(0xF7);
        std::fs::write(&path, dump).unwrap();

        let mut s = session(64);
        s.apply_tuning_file(&path).unwrap();
        let flat_a = 440.0 * 2f32.powf(-0.64 / 12.0);
        let tuning = s.engine().tuning();
        assert!((tuning.frequency(69, 0) - flat_a).abs() < 0.01);
        assert!((tuning.frequency(60, 15) - 261.6256).abs() < 0.01);
    }

    #[test]
    fn bad_tuning_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.syx");
        std::fs::write(&path, [0xF0, 0x00, 0xF7]).unwrap();
        let mut s = session(64);
        assert!(matches!(
            s.apply_tuning_file(&path),
            Err(MasterError::Format(_))
        ));
    }

    #[test]
    fn chord_script_layout() {
        let script = chord_script(&[60, 200], 127, 10);
        assert_eq!(script.len(), 4);
        assert_eq!(script[1].message, [0x90, 200 & 0x7F, 127]);
        assert_eq!(script[3], ScriptEvent::new(10, &[0x80, 200 & 0x7F, 0]));
    }
}
