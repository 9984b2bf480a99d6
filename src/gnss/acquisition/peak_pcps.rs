
use std::f64::consts;
use std::sync::Arc;

use log::debug;

use rustfft::FFT;
use rustfft::num_complex::Complex;

use crate::gnss::acquisition::{extrema, AcqOutcome, AcquisitionResult};

/* Parallel code phase search that can return any peak of the correlation grid
by rank, not just the strongest.  Rank 1 is the ordinary primary peak.  Rank
2 and up select the k-th strongest peak that does not overlap a stronger one,
which lets a second channel track a second correlation peak of the same PRN.
Rank 0 asks whether any auxiliary peak exists at all: a healthy satellite
presents exactly one dominant peak, so a second one above the threshold is
itself worth a look. */

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
	pub code_phase:usize,
	pub doppler_hz:f64,
	pub mag:f64,
}

pub struct PeakAcquisition {
	pub fs:f64,
	pub prn:usize,
	pub test_statistic_threshold:f64,
	pub if_freq_hz:f64,
	pub doppler_max_hz:f64,
	pub doppler_step_hz:f64,
	pub peak_rank:usize,
	pub max_dwells:usize,
	pub bit_transition_flag:bool,
	pub samples_per_code:usize,
	pub len_fft:usize,
	pub fft:Arc<dyn FFT<f64>>,
	pub ifft:Arc<dyn FFT<f64>>,
	pub local_code_freq_domain:Vec<Complex<f64>>,
	pub fft_out:Vec<Complex<f64>>,
	pub ifft_out:Vec<Complex<f64>>,
	pub dwell_count:usize,
	pub test_statistics:f64,
	pub selection:Option<AcquisitionResult>,
}

/// Magnitude-ordered de-duplication: walk candidates from strongest to
/// weakest and keep a peak only if it is non-overlapping with every peak
/// already kept, where overlap means within two samples of code phase AND
/// within one Doppler step.
pub fn reduce_peaks(mut candidates:Vec<Peak>, doppler_step_hz:f64) -> Vec<Peak> {
	candidates.sort_by(|a, b| b.mag.partial_cmp(&a.mag).unwrap_or(std::cmp::Ordering::Equal));

	let mut kept:Vec<Peak> = vec![];
	for c in candidates {
		let overlaps = kept.iter().any(|k| {
			let d_code  = (c.code_phase as i64 - k.code_phase as i64).abs();
			let d_dopp  = (c.doppler_hz - k.doppler_hz).abs();
			d_code <= 2 && d_dopp <= doppler_step_hz
		});
		if !overlaps { kept.push(c); }
	}
	kept
}

impl PeakAcquisition {

	pub fn set_local_code(&mut self, code:&[Complex<f64>]) {
		let mut time_domain:Vec<Complex<f64>> = code.to_vec();
		time_domain.resize(self.len_fft, Complex{ re: 0.0, im: 0.0 });
		self.fft.process(&mut time_domain, &mut self.fft_out);
		self.local_code_freq_domain = (&self.fft_out).into_iter().map(|p| p.conj()).collect();
	}

	pub fn set_peak(&mut self, peak_rank:usize) { self.peak_rank = peak_rank; }

	pub fn set_threshold(&mut self, threshold:f64) { self.test_statistic_threshold = threshold; }

	/// CFAR threshold: the (1-pfa)^(1/ncells) quantile of an exponential
	/// distribution whose rate is the FFT length
	pub fn set_pfa(&mut self, pfa:f64) {
		let ncells:usize = self.len_fft * self.num_doppler_bins();
		let exponent:f64 = 1.0 / (ncells as f64);
		let val:f64 = (1.0 - pfa).powf(exponent);
		let lambda:f64 = self.len_fft as f64;
		self.test_statistic_threshold = -(1.0 - val).ln() / lambda;
	}

	pub fn set_doppler_max(&mut self, doppler_max_hz:f64) { self.doppler_max_hz = doppler_max_hz; }

	pub fn set_doppler_step(&mut self, doppler_step_hz:f64) { self.doppler_step_hz = doppler_step_hz; }

	pub fn num_doppler_bins(&self) -> usize {
		let mut n:usize = 0;
		let mut doppler:f64 = -self.doppler_max_hz;
		while doppler <= self.doppler_max_hz {
			n += 1;
			doppler += self.doppler_step_hz;
		}
		n
	}

	fn doppler_bins(&self) -> Vec<f64> {
		let n = self.num_doppler_bins();
		(0..n).map(|i| -self.doppler_max_hz + (i as f64)*self.doppler_step_hz).collect()
	}

	fn reset_dwell(&mut self) {
		self.dwell_count = 0;
		self.test_statistics = 0.0;
		self.selection = None;
	}

	fn finish_positive(&mut self) -> AcqOutcome {
		// A selection always exists once the test statistic is above a
		// nonnegative threshold, but a missing one degrades to Negative
		// rather than panicking
		let ans = match self.selection.take() {
			Some(result) => AcqOutcome::Positive(result),
			None => AcqOutcome::Negative,
		};
		self.reset_dwell();
		ans
	}

	/// One dwell over one code period of samples.  Terminal verdicts are
	/// Positive and Negative; StillDwelling asks the caller for more samples.
	/// Numerical trouble of any kind collapses to Negative.
	pub fn run(&mut self, signal:&[Complex<f64>], sample_counter:usize) -> AcqOutcome {
		if signal.len() < self.len_fft { return AcqOutcome::StillDwelling; }
		let signal = &signal[..self.len_fft];

		self.dwell_count += 1;

		// 1- Input signal power estimation
		let input_power:f64 = signal.iter().map(|c| c.norm_sqr()).sum::<f64>() / (self.len_fft as f64);
		if input_power <= 0.0 || !input_power.is_finite() {
			self.reset_dwell();
			return AcqOutcome::Negative;
		}

		// Scale factor of one unnormalized FFT pass, applied once per pass
		let fft_norm:f64 = (self.len_fft as f64) * (self.len_fft as f64);

		let acquire_auxiliary_peaks:bool = self.peak_rank != 1;

		let mut best_mag:f64 = 0.0;
		let mut best_code_phase:usize = 0;
		let mut best_doppler:f64 = 0.0;
		let mut rows:Vec<(f64, Vec<f64>)> = vec![];

		// 2- Doppler search loop with one circular correlation per bin
		for doppler in self.doppler_bins() {

			// Wipe the carrier off the input signal
			let phase_step_rad:f64 = (-2.0 * consts::PI * (self.if_freq_hz + doppler)) / self.fs;
			let mut doppler_wiped_time_domain:Vec<Complex<f64>> = (0..signal.len())
				.map(|idx| {
					let phase = phase_step_rad * (idx as f64);
					signal[idx] * Complex{ re: phase.cos(), im: phase.sin() }
				}).collect();

			self.fft.process(&mut doppler_wiped_time_domain, &mut self.fft_out);

			// 3- Multiplication in the frequency domain is circular
			// convolution in the time domain
			let mut convolution_freq_domain:Vec<Complex<f64>> = (&self.fft_out).into_iter()
				.zip((&self.local_code_freq_domain).into_iter())
				.map(|(a, b)| a*b)
				.collect();

			self.ifft.process(&mut convolution_freq_domain, &mut self.ifft_out);

			let row:Vec<f64> = self.ifft_out.iter().map(|c| c.norm_sqr() / (fft_norm * fft_norm)).collect();

			// 4- Track the maximum over the whole grid
			for (idx, mag) in row.iter().enumerate() {
				if *mag > best_mag {
					best_mag = *mag;
					best_code_phase = idx % self.samples_per_code;
					best_doppler = doppler;
				}
			}

			if acquire_auxiliary_peaks { rows.push((doppler, row)); }
		}

		// 5- Primary test statistic; in multidwell operation with the bit
		// transition flag the statistic is not restarted between dwells, so
		// only a better dwell replaces the running value
		if self.test_statistics < best_mag / input_power || !self.bit_transition_flag {
			self.test_statistics = best_mag / input_power;
			self.selection = Some(AcquisitionResult{
				code_phase: best_code_phase,
				doppler_hz: best_doppler,
				test_stat: self.test_statistics,
				sample_stamp: sample_counter,
			});
		}

		// 6- Auxiliary peak extraction and rank selection; found_peak is
		// evaluated fresh every dwell
		let mut found_peak:bool = false;
		if acquire_auxiliary_peaks {
			let mag_threshold:f64 = self.test_statistic_threshold * input_power;

			let mut candidates:Vec<Peak> = vec![];
			for (doppler, row) in &rows {
				if row.iter().cloned().fold(0.0, f64::max) < mag_threshold { continue; }
				for pair in extrema::paired_maxima(row, mag_threshold) {
					candidates.push(Peak{
						code_phase: pair.max_idx % self.samples_per_code,
						doppler_hz: *doppler,
						mag: row[pair.max_idx],
					});
				}
			}

			let reduced:Vec<Peak> = reduce_peaks(candidates, self.doppler_step_hz);
			debug!("PRN {}: {} non-overlapping peaks above threshold, rank {} requested",
				self.prn, reduced.len(), self.peak_rank);

			let selected:Option<Peak> = if self.peak_rank == 0 {
				// Rank zero succeeds only when an auxiliary peak exists next
				// to the primary, and then reports the primary
				if reduced.len() >= 2 { Some(reduced[0]) } else { None }
			} else if reduced.len() >= self.peak_rank {
				Some(reduced[self.peak_rank - 1])
			} else {
				None
			};

			if let Some(p) = selected {
				found_peak = true;
				self.test_statistics = p.mag / input_power;
				self.selection = Some(AcquisitionResult{
					code_phase: p.code_phase,
					doppler_hz: p.doppler_hz,
					test_stat: self.test_statistics,
					sample_stamp: sample_counter,
				});
			}
		}

		if !self.test_statistics.is_finite() {
			self.reset_dwell();
			return AcqOutcome::Negative;
		}

		// 7- Verdict
		if !self.bit_transition_flag {
			if acquire_auxiliary_peaks && !found_peak {
				self.reset_dwell();
				AcqOutcome::Negative
			} else if self.test_statistics > self.test_statistic_threshold {
				self.finish_positive()
			} else if self.dwell_count >= self.max_dwells {
				self.reset_dwell();
				AcqOutcome::Negative
			} else {
				AcqOutcome::StillDwelling
			}
		} else {
			if self.dwell_count >= self.max_dwells {
				if acquire_auxiliary_peaks && !found_peak {
					self.reset_dwell();
					AcqOutcome::Negative
				} else if self.test_statistics > self.test_statistic_threshold {
					self.finish_positive()
				} else {
					self.reset_dwell();
					AcqOutcome::Negative
				}
			} else {
				AcqOutcome::StillDwelling
			}
		}
	}

}

#[cfg(test)]
mod tests {

	use rustfft::num_complex::Complex;

	use crate::gnss::acquisition::{make_peak_acquisition, AcqOutcome};
	use crate::gnss::gps_l1_ca::signal_modulation;

	use super::{reduce_peaks, Peak};

	const FS:f64 = 1.023e6;

	fn delayed_replica(prn:usize, delay:usize, doppler_hz:f64, amplitude:f64) -> Vec<Complex<f64>> {
		let code = signal_modulation::prn_complex_sampled(prn, FS);
		let n = code.len();
		(0..n).map(|i| {
			let phase = 2.0 * std::f64::consts::PI * doppler_hz * (i as f64) / FS;
			code[(i + n - delay) % n] * Complex{ re: phase.cos(), im: phase.sin() } * amplitude
		}).collect()
	}

	fn add(a:&[Complex<f64>], b:&[Complex<f64>]) -> Vec<Complex<f64>> {
		a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
	}

	#[test]
	fn primary_peak_recovers_delay_and_doppler() {
		let symbol = signal_modulation::prn_int_sampled(7, FS);
		let mut acq = make_peak_acquisition(symbol, FS, 7, 0.05, 5000.0, 250.0, 1, 1, false);

		let signal = delayed_replica(7, 123, 1000.0, 1.0);
		match acq.run(&signal, 1023) {
			AcqOutcome::Positive(res) => {
				assert_eq!(res.code_phase, 123);
				assert_eq!(res.doppler_hz, 1000.0);
				assert_eq!(res.sample_stamp, 1023);
				assert!(res.test_stat > 0.05);
			},
			other => panic!("expected positive acquisition, got {:?}", other),
		}
	}

	#[test]
	fn acquisition_is_deterministic() {
		let symbol = signal_modulation::prn_int_sampled(3, FS);
		let mut acq_a = make_peak_acquisition(symbol.clone(), FS, 3, 0.05, 2000.0, 250.0, 1, 1, false);
		let mut acq_b = make_peak_acquisition(symbol, FS, 3, 0.05, 2000.0, 250.0, 1, 1, false);

		let signal = delayed_replica(3, 700, -500.0, 1.0);
		assert_eq!(acq_a.run(&signal, 0), acq_b.run(&signal, 0));
	}

	#[test]
	fn silent_input_is_negative() {
		let symbol = signal_modulation::prn_int_sampled(5, FS);
		let mut acq = make_peak_acquisition(symbol, FS, 5, 0.05, 2000.0, 250.0, 1, 1, false);
		let silence = vec![Complex{ re: 0.0, im: 0.0 }; 1023];
		assert_eq!(acq.run(&silence, 0), AcqOutcome::Negative);
	}

	/* The auxiliary-peak tests use a 500 Hz Doppler step: with one millisecond
	of coherent integration a strong peak leaks into the bins one step away,
	and the overlap rule only folds leakage within a single step back into its
	parent peak. */

	#[test]
	fn rank_two_selects_the_weaker_replica() {
		let symbol = signal_modulation::prn_int_sampled(7, FS);
		let mut acq = make_peak_acquisition(symbol, FS, 7, 0.02, 2000.0, 500.0, 2, 1, false);

		let strong = delayed_replica(7, 100, 0.0, 1.0);
		let weak   = delayed_replica(7, 400, 0.0, 0.6);
		match acq.run(&add(&strong, &weak), 0) {
			AcqOutcome::Positive(res) => assert_eq!(res.code_phase, 400),
			other => panic!("expected positive acquisition, got {:?}", other),
		}
	}

	#[test]
	fn rank_two_fails_with_single_peak() {
		let symbol = signal_modulation::prn_int_sampled(7, FS);
		let mut acq = make_peak_acquisition(symbol, FS, 7, 0.02, 2000.0, 500.0, 2, 1, false);
		let signal = delayed_replica(7, 100, 0.0, 1.0);
		assert_eq!(acq.run(&signal, 0), AcqOutcome::Negative);
	}

	#[test]
	fn rank_zero_requires_an_auxiliary_peak() {
		let symbol = signal_modulation::prn_int_sampled(9, FS);
		let mut acq = make_peak_acquisition(symbol.clone(), FS, 9, 0.02, 2000.0, 500.0, 0, 1, false);

		// One clean replica: no auxiliary peak, so rank zero must fail
		let single = delayed_replica(9, 250, 0.0, 1.0);
		assert_eq!(acq.run(&single, 0), AcqOutcome::Negative);

		// Two replicas: rank zero succeeds and reports the stronger one
		let mut acq = make_peak_acquisition(symbol, FS, 9, 0.02, 2000.0, 500.0, 0, 1, false);
		let pair = add(&delayed_replica(9, 250, 0.0, 1.0), &delayed_replica(9, 600, 0.0, 0.6));
		match acq.run(&pair, 0) {
			AcqOutcome::Positive(res) => assert_eq!(res.code_phase, 250),
			other => panic!("expected positive acquisition, got {:?}", other),
		}
	}

	#[test]
	fn bit_transition_flag_takes_two_dwells() {
		let symbol = signal_modulation::prn_int_sampled(4, FS);
		let mut acq = make_peak_acquisition(symbol, FS, 4, 0.05, 2000.0, 250.0, 1, 1, true);
		assert_eq!(acq.max_dwells, 2);

		let signal = delayed_replica(4, 50, 0.0, 1.0);
		assert_eq!(acq.run(&signal, 0), AcqOutcome::StillDwelling);
		match acq.run(&signal, 1023) {
			AcqOutcome::Positive(res) => assert_eq!(res.code_phase, 50),
			other => panic!("expected positive acquisition, got {:?}", other),
		}
	}

	#[test]
	fn pfa_threshold_is_monotone() {
		let symbol = signal_modulation::prn_int_sampled(1, FS);
		let mut acq = make_peak_acquisition(symbol, FS, 1, 0.0, 5000.0, 250.0, 1, 1, false);

		acq.set_pfa(0.001);
		let strict = acq.test_statistic_threshold;
		acq.set_pfa(0.1);
		let loose = acq.test_statistic_threshold;

		assert!(strict > loose);
		assert!(loose > 0.0);
	}

	#[test]
	fn reduced_peaks_are_non_overlapping() {
		let candidates = vec![
			Peak{ code_phase: 100, doppler_hz:    0.0, mag: 1.00 },
			Peak{ code_phase: 101, doppler_hz:    0.0, mag: 0.90 },	// overlaps the first
			Peak{ code_phase: 100, doppler_hz:  500.0, mag: 0.80 },	// distinct Doppler
			Peak{ code_phase: 400, doppler_hz:    0.0, mag: 0.70 },
			Peak{ code_phase: 399, doppler_hz:  250.0, mag: 0.60 },	// overlaps the fourth
		];
		let reduced = reduce_peaks(candidates, 250.0);
		assert_eq!(reduced.len(), 3);

		for i in 0..reduced.len() {
			for j in 0..reduced.len() {
				if i == j { continue; }
				let d_code = (reduced[i].code_phase as i64 - reduced[j].code_phase as i64).abs();
				let d_dopp = (reduced[i].doppler_hz - reduced[j].doppler_hz).abs();
				assert!(d_code > 2 || d_dopp > 250.0);
			}
		}

		// Strongest first
		assert!(reduced.windows(2).all(|w| w[0].mag >= w[1].mag));
	}

}
