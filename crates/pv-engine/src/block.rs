//! Per-block processing.
//!
//! Runs once per host block after that block's MIDI has been handled:
//!
//! 1. free queued zero-length releases
//! 2. apply a pending polyphony change
//! 3. push host control changes into the voices
//! 4. compute every active voice into the mixdown buffer and sum
//! 5. aggregate output controls across voices by maximum
//! 6. record each voice's gate for the next retrigger decision
//!
//! Frequencies are pushed into voices when they change (note on, bend,
//! RPN, realtime tuning), so there is no per-block pitch pass.

use arrayvec::ArrayVec;
use pv_ir::{DspUnit, MAX_CHANNELS};

use crate::engine::{gate_off, Engine};

impl<D: DspUnit> Engine<D> {
    /// Render `frames` samples into `outputs`.
    ///
    /// Every input and output slice must hold at least `frames` samples.
    /// Missing input channels read as silence; extra output channels are
    /// left untouched. Blocks longer than the configured maximum are
    /// rendered in chunks.
    pub fn process(&mut self, frames: usize, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.process_block(frames, inputs, outputs));
        #[cfg(not(feature = "alloc_check"))]
        self.process_block(frames, inputs, outputs);
    }

    fn process_block(&mut self, frames: usize, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let cells = self.controls.cells();

        if !self.is_effect() {
            let dsps = &mut self.dsps;
            self.pool.commit_queued(|v| gate_off(dsps, cells.gate, v));
        }

        if !self.active {
            self.bypass(frames, inputs, outputs);
            return;
        }

        if !self.is_effect() && self.polyphony != self.pool.active_count() {
            let dsps = &mut self.dsps;
            let polyphony = self.polyphony;
            self.pool
                .set_active_count(polyphony, |v| gate_off(dsps, cells.gate, v));
        }

        self.commit_ports();

        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(self.max_block_size);
            self.render_chunk(offset, len, inputs, outputs);
            offset += len;
        }

        let rendered = self.rendered_voices();
        for (port, value) in self.outputs.iter_mut().enumerate() {
            let id = self.controls.output_id(port);
            *value = self.dsps[..rendered]
                .iter()
                .map(|dsp| dsp.control(id))
                .fold(f32::NEG_INFINITY, f32::max);
        }

        if let Some(gate) = cells.gate {
            if !self.is_effect() {
                for v in 0..rendered {
                    self.pool.set_last_gate(v, self.dsps[v].control(gate));
                }
            }
        }
    }

    /// Number of replicas computed each block.
    fn rendered_voices(&self) -> usize {
        if self.is_effect() {
            1
        } else {
            self.pool.active_count()
        }
    }

    /// Push host-side port changes to the voices and to every channel's
    /// cached controller value.
    fn commit_ports(&mut self) {
        let effect = self.is_effect();
        let Self {
            ports,
            baseline,
            channel_values,
            controls,
            pool,
            dsps,
            ..
        } = self;

        for (port, (&value, committed)) in ports.iter().zip(baseline.iter_mut()).enumerate() {
            if value == *committed {
                continue;
            }
            let id = controls.input_id(port);
            if effect {
                dsps[0].set_control(id, value);
            } else {
                for &v in pool.used() {
                    dsps[v].set_control(id, value);
                }
            }
            channel_values[port].fill(value);
            *committed = value;
        }
    }

    fn render_chunk(
        &mut self,
        offset: usize,
        len: usize,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
    ) {
        let silent = self.silent_inputs.planes(len);
        let ins: ArrayVec<&[f32], MAX_CHANNELS> = (0..self.num_inputs)
            .map(|ch| match inputs.get(ch) {
                Some(plane) => &plane[offset..offset + len],
                None => silent[ch],
            })
            .collect();

        if self.is_effect() && outputs.len() >= self.num_outputs {
            let mut outs: ArrayVec<&mut [f32], MAX_CHANNELS> = outputs
                .iter_mut()
                .take(self.num_outputs)
                .map(|plane| &mut plane[offset..offset + len])
                .collect();
            self.dsps[0].compute(len, &ins, &mut outs);
            return;
        }

        for out in outputs.iter_mut().take(self.num_outputs) {
            out[offset..offset + len].fill(0.0);
        }
        let voices = if self.is_effect() {
            1
        } else {
            self.pool.active_count()
        };
        for dsp in &mut self.dsps[..voices] {
            let mut planes = self.mixdown.planes_mut(len);
            dsp.compute(len, &ins, &mut planes);
            for (out, plane) in outputs.iter_mut().zip(planes.iter()) {
                for (o, s) in out[offset..offset + len].iter_mut().zip(plane.iter()) {
                    *o += *s;
                }
            }
        }
    }

    /// Inactive: copy inputs through when the channel counts match, else
    /// write silence.
    fn bypass(&self, frames: usize, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let through = self.num_inputs == self.num_outputs;
        for (ch, out) in outputs.iter_mut().enumerate() {
            match inputs.get(ch) {
                Some(input) if through => out[..frames].copy_from_slice(&input[..frames]),
                _ => out[..frames].fill(0.0),
            }
        }
    }
}
