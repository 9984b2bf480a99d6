
use rustfft::FFTplanner;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

pub mod extrema;
pub mod peak_pcps;

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionResult {
	pub code_phase:usize,
	pub doppler_hz:f64,
	pub test_stat:f64,
	pub sample_stamp:usize,
}

// Terminal or non-terminal verdict of one call to PeakAcquisition::run
#[derive(Debug, Clone, PartialEq)]
pub enum AcqOutcome {
	Positive(AcquisitionResult),
	Negative,
	StillDwelling,
}

pub fn make_peak_acquisition(symbol:Vec<i8>, fs:f64, prn:usize, test_statistic_threshold:f64,
	doppler_max_hz:f64, doppler_step_hz:f64, peak_rank:usize, max_dwells:usize,
	bit_transition_flag:bool) -> peak_pcps::PeakAcquisition {

	let len_fft:usize = symbol.len();

	// Forward FFT of the local code, conjugated once here so the search loop
	// only multiplies
	let mut local_code_time_domain: Vec<Complex<f64>> = symbol.into_iter().map(|b| Complex{ re: b as f64, im: 0.0 }).collect();
	let mut fft_out: Vec<Complex<f64>> = vec![Complex::zero(); len_fft];
	let mut planner = FFTplanner::new(false);
	let fft = planner.plan_fft(len_fft);
	fft.process(&mut local_code_time_domain, &mut fft_out);

	let local_code_freq_domain: Vec<Complex<f64>> = (&fft_out).into_iter().map(|p| p.conj() ).collect();

	let mut inv_planner = FFTplanner::new(true);
	let ifft = inv_planner.plan_fft(len_fft);
	let ifft_out: Vec<Complex<f64>> = vec![Complex::zero(); len_fft];

	// The flag forces exactly two dwells before a terminal verdict
	let max_dwells = if bit_transition_flag { 2 } else { max_dwells.max(1) };

	peak_pcps::PeakAcquisition { fs, prn, test_statistic_threshold, if_freq_hz: 0.0,
		doppler_max_hz, doppler_step_hz, peak_rank, max_dwells, bit_transition_flag,
		samples_per_code: len_fft, len_fft, fft, ifft,
		local_code_freq_domain, fft_out, ifft_out,
		dwell_count: 0, test_statistics: 0.0, selection: None }
}
