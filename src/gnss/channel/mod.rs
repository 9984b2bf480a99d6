
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use rustfft::num_complex::Complex;

use crate::{BlockResult, DigSigProcErr as DSPErr, Sample};
use crate::assistance::records::{GpsAlmanac, GpsEphemeris, GpsIono, GpsUtcModel};
use crate::gnss::acquisition::peak_pcps::PeakAcquisition;
use crate::gnss::acquisition::{make_peak_acquisition, AcqOutcome};
use crate::gnss::telemetry_decode::TelemetryDecoder;
use crate::receiver::ledger::{GpsTimeRecord, SubframeRecord};
use crate::receiver::ReceiverContext;

// The step matches the coherent integration time: narrower bins would leave
// spectral leakage of a strong peak outside the overlap fold and the
// auxiliary-peak search would chase its own aliases
pub const DEFAULT_DOPPLER_STEP_HZ:f64 = 500.0;
pub const DEFAULT_DOPPLER_MAX_HZ:f64 = 10000.0;
pub const DEFAULT_TEST_STAT_THRESHOLD:f64 = 0.008;

/// One tracking observation per accumulated bit
#[derive(Debug, Clone)]
pub struct TrackReport {
	pub timestamp_ms:f64,
	pub cn0_db_hz:f64,
	pub pseudorange_m:f64,
	pub valid:bool,
	pub prompt_i:f64,
	pub sample_idx:usize,
}

/// Decoded navigation records the telemetry collaborator hands the detector
#[derive(Debug, Clone)]
pub enum NavMessage {
	Ephemeris(GpsEphemeris),
	Iono(GpsIono),
	Utc(GpsUtcModel),
	Almanac(GpsAlmanac),
}

/// One successfully decoded subframe
#[derive(Debug, Clone)]
pub struct NavUpdate {
	pub subframe_id:u8,
	// 300 characters of '0'/'1', parity already stripped
	pub bits:String,
	pub week:i32,
	pub tow_s:f64,
	pub messages:Vec<NavMessage>,
}

/* The PLL/DLL loops and the bit-level telemetry decoder are collaborators
behind these two seams; the channel only routes their outputs into the shared
ledgers and onward to the detector. */

pub trait TrackingLoop {
	fn initialize(&mut self, doppler_hz:f64, code_phase:usize);
	fn apply(&mut self, sample:&Sample) -> BlockResult<TrackReport>;
}

pub trait NavDecoder {
	fn initialize(&mut self);
	fn apply(&mut self, bit:(bool, usize)) -> BlockResult<NavUpdate>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelState {
	Acquisition,
	PullIn(usize),
	Tracking,
}

#[derive(Debug)]
pub struct ChannelReport {
	pub new_subframe:Option<NavUpdate>,
	pub cn0_db_hz:Option<f64>,
}

pub struct Channel<T:TrackingLoop, N:NavDecoder> {
	pub uid:usize,
	pub prn:usize,
	pub peak_rank:usize,
	pub fs:f64,
	pub acq:PeakAcquisition,
	pub trk:T,
	pub tlm:N,
	state:ChannelState,
	stop_flag:Arc<AtomicBool>,
	acq_buffer:Vec<Complex<f64>>,
	last_acq_doppler:f64,
	last_acq_test_stat:f64,
	pub last_cn0_db_hz:f64,
}

impl<T:TrackingLoop, N:NavDecoder> Channel<T, N> {

	pub fn new(uid:usize, prn:usize, peak_rank:usize, fs:f64, acq:PeakAcquisition, trk:T, tlm:N) -> Self {
		Channel{ uid, prn, peak_rank, fs, acq, trk, tlm,
			state: ChannelState::Acquisition,
			stop_flag: Arc::new(AtomicBool::new(false)),
			acq_buffer: vec![],
			last_acq_doppler: 0.0,
			last_acq_test_stat: 0.0,
			last_cn0_db_hz: 0.0 }
	}

	// Read-only getter methods
	pub fn state(&self) -> ChannelState { self.state }
	pub fn last_acq_doppler(&self) -> f64 { self.last_acq_doppler }
	pub fn last_acq_test_stat(&self) -> f64 { self.last_acq_test_stat }

	/// Cooperative stop: the flag is observed at the next bit or dwell
	/// boundary, never mid-correlation
	pub fn stop_handle(&self) -> Arc<AtomicBool> { self.stop_flag.clone() }

	pub fn apply(&mut self, s:&Sample, ctx:&ReceiverContext) -> BlockResult<ChannelReport> {
		match self.state {
			ChannelState::Acquisition => {
				self.acq_buffer.push(s.val);
				if self.acq_buffer.len() < self.acq.len_fft { return BlockResult::NotReady; }

				if self.stop_flag.load(Ordering::Relaxed) { return self.unwind(ctx); }

				let outcome = self.acq.run(&self.acq_buffer, s.idx);
				self.acq_buffer.clear();

				match outcome {
					AcqOutcome::Positive(res) => {
						info!("PRN {} peak {} acquired: {} [Hz] doppler, code phase {}, test stat {:.4}",
							self.prn, self.peak_rank, res.doppler_hz, res.code_phase, res.test_stat);
						self.last_acq_doppler = res.doppler_hz;
						self.last_acq_test_stat = res.test_stat;
						self.trk.initialize(res.doppler_hz, res.code_phase);
						self.tlm.initialize();
						self.state = match res.code_phase {
							0 => ChannelState::Tracking,
							n => ChannelState::PullIn(n),
						};
						BlockResult::NotReady
					},
					AcqOutcome::Negative => BlockResult::NotReady,
					AcqOutcome::StillDwelling => BlockResult::NotReady,
				}
			},
			ChannelState::PullIn(n) => {
				self.state = match n {
					1 => ChannelState::Tracking,
					_ => ChannelState::PullIn(n-1),
				};
				BlockResult::NotReady
			},
			ChannelState::Tracking => {
				match self.trk.apply(s) {
					BlockResult::Ready(report) => {
						// Bit boundary: honor a pending stop before doing
						// anything else with this report
						if self.stop_flag.load(Ordering::Relaxed) { return self.unwind(ctx); }

						self.last_cn0_db_hz = report.cn0_db_hz;
						let bit = report.prompt_i > 0.0;

						match self.tlm.apply((bit, report.sample_idx)) {
							BlockResult::Ready(update) => {
								if !crate::utils::is_subframe_payload(&update.bits) {
									warn!("channel {} decoded a malformed subframe payload of {} characters",
										self.uid, update.bits.len());
								}
								ctx.subframes.write(self.uid, SubframeRecord{
									uid: self.uid,
									prn: self.prn,
									subframe_id: update.subframe_id,
									bits: update.bits.clone(),
									timestamp_ms: report.timestamp_ms,
								});
								ctx.gps_times.write(self.uid, GpsTimeRecord{
									week: update.week,
									tow_s: update.tow_s,
									timestamp_ms: report.timestamp_ms,
									subframe_id: update.subframe_id,
								});
								BlockResult::Ready(ChannelReport{ new_subframe: Some(update), cn0_db_hz: Some(report.cn0_db_hz) })
							},
							BlockResult::NotReady =>
								BlockResult::Ready(ChannelReport{ new_subframe: None, cn0_db_hz: Some(report.cn0_db_hz) }),
							BlockResult::Err(e) => {
								debug!("channel {} telemetry error {:?}, back to acquisition", self.uid, e);
								self.state = ChannelState::Acquisition;
								BlockResult::Err(e)
							},
						}
					},
					BlockResult::NotReady => BlockResult::NotReady,
					BlockResult::Err(e) => {
						self.state = ChannelState::Acquisition;
						BlockResult::Err(e)
					},
				}
			},
		}
	}

	fn unwind(&mut self, ctx:&ReceiverContext) -> BlockResult<ChannelReport> {
		info!("channel {} stopping on request", self.uid);
		ctx.stop_tracking(self.uid);
		self.state = ChannelState::Acquisition;
		BlockResult::Err(DSPErr::Other("stop requested"))
	}

}

/// A channel wired to the stock telemetry decoder, chasing the given peak
/// rank with default search settings
pub fn new_channel<T:TrackingLoop>(uid:usize, prn:usize, peak_rank:usize, fs:f64,
	test_stat_threshold:f64, trk:T) -> Channel<T, TelemetryDecoder> {

	let symbol:Vec<i8> = crate::gnss::gps_l1_ca::signal_modulation::prn_int_sampled(prn, fs);
	let acq = make_peak_acquisition(symbol, fs, prn, test_stat_threshold,
		DEFAULT_DOPPLER_MAX_HZ, DEFAULT_DOPPLER_STEP_HZ, peak_rank, 1, false);
	let tlm = TelemetryDecoder::new(prn, uid);

	Channel::new(uid, prn, peak_rank, fs, acq, trk, tlm)
}
