//! Convolution reverb.
//!
//! Uniformly partitioned overlap-save convolution: the impulse response is
//! split into blocks of `block_size` taps, each transformed once at
//! construction. Every completed input block costs one forward FFT, one
//! multiply-accumulate per partition and one inverse FFT, so multi-second
//! impulse responses stay affordable. Output lags input by one block.

use rand::Rng;
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Decaying white noise, the classic synthetic room response.
///
/// Samples are `noise * (1 - i / len)^2`, scaled to unit energy so the wet
/// path stays level-comparable to the dry one.
pub fn decaying_noise_ir<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<f32> {
    let mut ir: Vec<f32> = (0..len)
        .map(|i| {
            let decay = 1.0 - i as f32 / len as f32;
            rng.gen_range(-1.0..=1.0f32) * decay * decay
        })
        .collect();

    let energy: f32 = ir.iter().map(|s| s * s).sum::<f32>().sqrt();
    if energy > 0.0 {
        for s in &mut ir {
            *s /= energy;
        }
    }
    ir
}

/// Streaming convolver for a fixed impulse response.
pub struct ConvolutionReverb {
    block_size: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Spectra of each impulse response partition.
    partitions: Vec<Vec<Complex32>>,
    /// Spectra of recent input frames, newest at `head`.
    history: Vec<Vec<Complex32>>,
    head: usize,
    previous: Vec<f32>,
    input: Vec<f32>,
    output: Vec<f32>,
    position: usize,
    spectrum: Vec<Complex32>,
    accum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl ConvolutionReverb {
    /// Build a convolver for `ir`. `block_size` must be non-zero.
    pub fn new(ir: &[f32], block_size: usize) -> Self {
        let block_size = block_size.max(1);
        let fft_len = block_size * 2;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![Complex32::new(0.0, 0.0); scratch_len];

        let partition_count = ir.len().div_ceil(block_size).max(1);
        let partitions: Vec<Vec<Complex32>> = (0..partition_count)
            .map(|p| {
                let mut spectrum = vec![Complex32::new(0.0, 0.0); fft_len];
                let start = (p * block_size).min(ir.len());
                let end = ((p + 1) * block_size).min(ir.len());
                for (slot, &tap) in spectrum.iter_mut().zip(&ir[start..end]) {
                    slot.re = tap;
                }
                fft.process_with_scratch(&mut spectrum, &mut scratch);
                spectrum
            })
            .collect();

        Self {
            block_size,
            fft,
            ifft,
            history: vec![vec![Complex32::new(0.0, 0.0); fft_len]; partition_count],
            partitions,
            head: 0,
            previous: vec![0.0; block_size],
            input: vec![0.0; block_size],
            output: vec![0.0; block_size],
            position: 0,
            spectrum: vec![Complex32::new(0.0, 0.0); fft_len],
            accum: vec![Complex32::new(0.0, 0.0); fft_len],
            scratch,
        }
    }

    /// Samples of delay between input and output.
    pub fn latency(&self) -> usize {
        self.block_size
    }

    /// Number of impulse response partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Push one input sample, get one output sample.
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let y = self.output[self.position];
        self.input[self.position] = x;
        self.position += 1;
        if self.position == self.block_size {
            self.process_block();
            self.position = 0;
        }
        y
    }

    /// Clear all internal state; the impulse response is kept.
    pub fn reset(&mut self) {
        for frame in &mut self.history {
            frame.fill(Complex32::new(0.0, 0.0));
        }
        self.previous.fill(0.0);
        self.input.fill(0.0);
        self.output.fill(0.0);
        self.position = 0;
        self.head = 0;
    }

    fn process_block(&mut self) {
        let n = self.block_size;
        let count = self.partitions.len();

        for i in 0..n {
            self.spectrum[i] = Complex32::new(self.previous[i], 0.0);
            self.spectrum[n + i] = Complex32::new(self.input[i], 0.0);
        }
        self.previous.copy_from_slice(&self.input);

        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);
        self.history[self.head].copy_from_slice(&self.spectrum);

        self.accum.fill(Complex32::new(0.0, 0.0));
        for (p, partition) in self.partitions.iter().enumerate() {
            let frame = &self.history[(self.head + count - p) % count];
            for ((acc, x), h) in self.accum.iter_mut().zip(frame).zip(partition) {
                *acc += *x * *h;
            }
        }
        self.head = (self.head + 1) % count;

        self.ifft.process_with_scratch(&mut self.accum, &mut self.scratch);
        let scale = 1.0 / (2 * n) as f32;
        for i in 0..n {
            self.output[i] = self.accum[n + i].re * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn direct_convolution(x: &[f32], h: &[f32]) -> Vec<f32> {
        let mut y = vec![0.0; x.len()];
        for (i, &xi) in x.iter().enumerate() {
            for (j, &hj) in h.iter().enumerate() {
                if i + j < y.len() {
                    y[i + j] += xi * hj;
                }
            }
        }
        y
    }

    #[test]
    fn test_impulse_returns_ir() {
        let ir: Vec<f32> = (0..10).map(|i| 0.8f32.powi(i)).collect();
        let mut reverb = ConvolutionReverb::new(&ir, 4);
        assert_eq!(reverb.partition_count(), 3);

        let out: Vec<f32> = (0..24)
            .map(|n| reverb.process_sample(if n == 0 { 1.0 } else { 0.0 }))
            .collect();

        let latency = reverb.latency();
        for (n, &y) in out.iter().enumerate() {
            let expected = n
                .checked_sub(latency)
                .and_then(|k| ir.get(k))
                .copied()
                .unwrap_or(0.0);
            assert!((y - expected).abs() < 1e-5, "sample {}: {} vs {}", n, y, expected);
        }
    }

    #[test]
    fn test_matches_direct_convolution() {
        let mut rng = SmallRng::seed_from_u64(5);
        let ir: Vec<f32> = (0..37).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let x: Vec<f32> = (0..200).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let mut reverb = ConvolutionReverb::new(&ir, 8);
        let mut out: Vec<f32> = x.iter().map(|&s| reverb.process_sample(s)).collect();
        // Drain the block of latency.
        out.extend((0..reverb.latency()).map(|_| reverb.process_sample(0.0)));
        let out = &out[reverb.latency()..];

        let expected = direct_convolution(&x, &ir);
        for (n, (a, b)) in out.iter().zip(&expected).enumerate() {
            assert!((a - b).abs() < 1e-3, "sample {}: {} vs {}", n, a, b);
        }
    }

    #[test]
    fn test_reset_silences_tail() {
        let ir = vec![1.0; 16];
        let mut reverb = ConvolutionReverb::new(&ir, 4);
        for _ in 0..8 {
            reverb.process_sample(1.0);
        }
        reverb.reset();
        for _ in 0..32 {
            assert_eq!(reverb.process_sample(0.0), 0.0);
        }
    }

    #[test]
    fn test_decaying_noise_ir() {
        let mut rng = SmallRng::seed_from_u64(1);
        let ir = decaying_noise_ir(4000, &mut rng);
        assert_eq!(ir.len(), 4000);

        let energy: f32 = ir.iter().map(|s| s * s).sum();
        assert!((energy - 1.0).abs() < 1e-3);

        let head: f32 = ir[..1000].iter().map(|s| s.abs()).sum();
        let tail: f32 = ir[3000..].iter().map(|s| s.abs()).sum();
        assert!(head > tail * 4.0);
    }

    #[test]
    fn test_empty_ir_is_silent() {
        let mut reverb = ConvolutionReverb::new(&[], 4);
        for n in 0..16 {
            assert_eq!(reverb.process_sample(n as f32), 0.0);
        }
    }
}
