
use std::collections::VecDeque;

use log::debug;

use crate::{BlockResult, DigSigProcErr};
use crate::assistance::records::{GpsAlmanac, GpsEphemeris, GpsIono, GpsUtcModel, AODO_LSB};
use crate::gnss::channel::{NavDecoder, NavMessage, NavUpdate};
use crate::utils::bools_to_bit_string;

pub mod subframe;

use self::subframe::{Subframe1, Subframe2, SubframeBody};

/*	GPS navigation message pipeline:
	- Preamble detector
	- Subframe framer with parity stripping
	- Subframe field decode
	- Record assembly for the detector (ephemeris over subframes 1-3,
	  iono/UTC from subframe 4 page 18, almanac pages)
*/

const SUBFRAME_SIZE_W_PARITY_BITS:usize = 300;

const POS_PREAMBLE:[bool; 8] = [true,  false, false, false, true,  false, true,  true ];
const NEG_PREAMBLE:[bool; 8] = [false, true,  true,  true,  false, true,  false, false];

fn parity_check(word:&[bool], last_d29:bool, last_d30:bool) -> bool {
	if word.len() != 30 { return false; }

	let d:Vec<bool> = word.iter().take(24).map(|b| b ^ last_d30).collect();
	let parity = parity_bits(&d, last_d29, last_d30);

	word.iter().skip(24).zip(parity.iter()).all(|(a, b)| a == b)
}

/// The six Hamming parity bits over 24 recovered data bits
fn parity_bits(d:&[bool], last_d29:bool, last_d30:bool) -> [bool; 6] {
	[
		last_d29 ^ d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[5] ^ d[9]  ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[16] ^ d[17] ^ d[19] ^ d[22],
		last_d30 ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[6] ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[17] ^ d[18] ^ d[20] ^ d[23],
		last_d29 ^ d[0] ^ d[2] ^ d[3] ^ d[4] ^ d[6] ^ d[7]  ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[18] ^ d[19] ^ d[21],
		last_d30 ^ d[1] ^ d[3] ^ d[4] ^ d[5] ^ d[7] ^ d[8]  ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[19] ^ d[20] ^ d[22],
		last_d30 ^ d[0] ^ d[2] ^ d[4] ^ d[5] ^ d[6] ^ d[8]  ^ d[9]  ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[17] ^ d[20] ^ d[21] ^ d[23],
		last_d29 ^ d[2] ^ d[4] ^ d[5] ^ d[7] ^ d[8] ^ d[9]  ^ d[10] ^ d[12] ^ d[14] ^ d[18] ^ d[21] ^ d[22] ^ d[23],
	]
}

/// Parity-checks all ten words and strips them down to 240 data bits
fn data_recover(frame:&[bool; SUBFRAME_SIZE_W_PARITY_BITS]) -> Result<[bool; subframe::DATA_BITS], DigSigProcErr> {
	for w in 0..10 {
		let (last_d29, last_d30) = if w == 0 { (false, false) } else { (frame[30*w - 2], frame[30*w - 1]) };
		if !parity_check(&frame[30*w..30*(w+1)], last_d29, last_d30) {
			return Err(DigSigProcErr::InvalidTelemetryData("Bad parity check"));
		}
	}

	let mut ans = [false; subframe::DATA_BITS];
	for bit_idx in 0..24 { ans[bit_idx] = frame[bit_idx]; }
	for w in 1..10 {
		for bit_idx in 0..24 { ans[24*w + bit_idx] = frame[30*w + bit_idx] ^ frame[30*w - 1]; }
	}

	Ok(ans)
}

struct PreambleDetector {
	buffer:VecDeque<bool>,
	current_bit:usize,
	inverse_sense:Option<bool>,
	preamble_location:Option<usize>,
}

impl PreambleDetector {

	fn new() -> Self {
		PreambleDetector{ buffer: VecDeque::new(), current_bit: 0, inverse_sense: None, preamble_location: None }
	}

	fn initialize(&mut self) {
		self.buffer.clear();
		self.current_bit = 0;
		self.inverse_sense = None;
		self.preamble_location = None;
	}

	fn apply(&mut self, b:bool) {
		self.buffer.push_back(b);
		self.current_bit += 1;

		while self.buffer.len() > 30 { self.buffer.pop_front(); }

		if self.buffer.len() == 30 && self.preamble_location.is_none() {
			let first_eight:Vec<bool> = self.buffer.iter().copied().take(8).collect();
			if first_eight == POS_PREAMBLE {
				let whole_word:Vec<bool> = self.buffer.iter().copied().collect();
				if parity_check(&whole_word, false, false) {
					self.inverse_sense = Some(false);
					self.preamble_location = Some(self.current_bit - 30);
				}
			}
			else if first_eight == NEG_PREAMBLE {
				let whole_word:Vec<bool> = self.buffer.iter().map(|b| !b).collect();
				if parity_check(&whole_word, false, false) {
					self.inverse_sense = Some(true);
					self.preamble_location = Some(self.current_bit - 30);
				}
			}
		}
	}

	fn result(&self) -> Option<(usize, bool)> {
		match (self.preamble_location, self.inverse_sense) {
			(Some(loc), Some(inv)) => Some((loc, inv)),
			_ => None,
		}
	}

}

enum DecoderState {
	LookingForPreamble,
	DecodingSubframes{ inverse_sense:bool },
}

/// Frames the bit stream into subframes, decodes them, and assembles the
/// navigation records the spoofing checks consume
pub struct TelemetryDecoder {
	prn:usize,
	uid:usize,
	detector:PreambleDetector,
	detection_buffer:VecDeque<(bool, usize)>,
	state:DecoderState,
	last_week:i32,
	last_sf1:Option<Subframe1>,
	last_sf2:Option<Subframe2>,
}

impl TelemetryDecoder {

	pub fn new(prn:usize, uid:usize) -> Self {
		TelemetryDecoder{
			prn,
			uid,
			detector: PreambleDetector::new(),
			detection_buffer: VecDeque::new(),
			state: DecoderState::LookingForPreamble,
			last_week: 0,
			last_sf1: None,
			last_sf2: None,
		}
	}

	fn assemble_messages(&mut self, sf:&subframe::Subframe) -> Vec<NavMessage> {
		let mut messages:Vec<NavMessage> = vec![];

		match sf.body {
			SubframeBody::Eph1(sf1) => {
				self.last_week = sf1.week_number as i32;
				self.last_sf1 = Some(sf1);
			},
			SubframeBody::Eph2(sf2) => { self.last_sf2 = Some(sf2); },
			SubframeBody::Eph3(sf3) => {
				// A complete broadcast ephemeris needs a matching issue-of-
				// data across all three subframes
				if let (Some(sf1), Some(sf2)) = (self.last_sf1, self.last_sf2) {
					if (sf1.iodc % 256) as u8 == sf2.iode && sf2.iode == sf3.iode {
						messages.push(NavMessage::Ephemeris(GpsEphemeris{
							i_satellite_PRN: self.prn as u32,
							i_peak: self.uid as u32,
							d_TOW: sf.time_of_week(),
							i_GPS_week: self.last_week,
							i_code_on_L2: sf1.code_on_l2 as i32,
							i_SV_accuracy: sf1.ura_index as i32,
							i_SV_health: sf1.sv_health as i32,
							d_IODC: sf1.iodc as f64,
							d_TGD: sf1.t_gd,
							d_Toc: sf1.t_oc,
							d_A_f0: sf1.a_f0,
							d_A_f1: sf1.a_f1,
							d_A_f2: sf1.a_f2,
							d_Crs: sf2.crs,
							d_Delta_n: sf2.dn,
							d_M_0: sf2.m0,
							d_Cuc: sf2.cuc,
							d_e_eccentricity: sf2.e,
							d_Cus: sf2.cus,
							d_sqrt_A: sf2.sqrt_a,
							d_Toe: sf2.t_oe,
							i_AODO: (sf2.aodo as i32) * (AODO_LSB as i32),
							b_fit_interval_flag: sf2.fit_interval,
							d_Cic: sf3.cic,
							d_OMEGA0: sf3.omega0,
							d_Cis: sf3.cis,
							d_i_0: sf3.i0,
							d_Crc: sf3.crc,
							d_OMEGA: sf3.omega,
							d_OMEGA_DOT: sf3.omega_dot,
							d_IDOT: sf3.idot,
							..GpsEphemeris::default()
						}));
					}
				}
			},
			SubframeBody::IonoUtc(page) => {
				messages.push(NavMessage::Iono(GpsIono{
					d_alpha0: page.alpha0, d_alpha1: page.alpha1, d_alpha2: page.alpha2, d_alpha3: page.alpha3,
					d_beta0: page.beta0, d_beta1: page.beta1, d_beta2: page.beta2, d_beta3: page.beta3,
					valid: true,
				}));
				messages.push(NavMessage::Utc(GpsUtcModel{
					d_A1: page.a1,
					d_A0: page.a0,
					d_t_OT: page.t_ot as f64,
					i_WN_T: page.wn_t as i32,
					d_DeltaT_LS: page.delta_t_ls as f64,
					i_WN_LSF: page.wn_lsf as i32,
					i_DN: 0,
					d_DeltaT_LSF: page.delta_t_lsf as f64,
					valid: true,
				}));
			},
			SubframeBody::Almanac(page) => {
				messages.push(NavMessage::Almanac(GpsAlmanac{
					i_satellite_PRN: page.sv_id as u32,
					d_Delta_i: page.delta_i,
					i_Toa: page.t_oa as i32,
					d_M_0: page.m0,
					d_e_eccentricity: page.e,
					d_sqrt_A: page.sqrt_a,
					d_OMEGA0: page.omega0,
					d_OMEGA: page.omega,
					d_OMEGA_DOT: page.omega_dot,
					i_SV_health: page.sv_health as i32,
					d_A_f0: page.af0,
					d_A_f1: page.af1,
				}));
			},
			SubframeBody::Other => {},
		}

		messages
	}

}

impl NavDecoder for TelemetryDecoder {

	fn initialize(&mut self) {
		self.detector.initialize();
		self.detection_buffer.clear();
		self.state = DecoderState::LookingForPreamble;
		self.last_week = 0;
		self.last_sf1 = None;
		self.last_sf2 = None;
	}

	fn apply(&mut self, bit:(bool, usize)) -> BlockResult<NavUpdate> {
		match self.state {
			DecoderState::LookingForPreamble => {
				self.detector.apply(bit.0);
				self.detection_buffer.push_back(bit);

				if let Some((location, inverse_sense)) = self.detector.result() {
					debug!("channel {} found the preamble at bit {}, inverse sense {}", self.uid, location, inverse_sense);
					self.state = DecoderState::DecodingSubframes{ inverse_sense };

					// Drop everything before the start of the subframe
					for _ in 0..location { self.detection_buffer.pop_front(); }
				}
				BlockResult::NotReady
			},
			DecoderState::DecodingSubframes{ inverse_sense } => {
				self.detection_buffer.push_back(bit);

				if self.detection_buffer.len() < SUBFRAME_SIZE_W_PARITY_BITS { return BlockResult::NotReady; }

				let mut frame = [false; SUBFRAME_SIZE_W_PARITY_BITS];
				for slot in frame.iter_mut() {
					match self.detection_buffer.pop_front() {
						Some((b, _)) => *slot = b ^ inverse_sense,
						None => return BlockResult::Err(DigSigProcErr::InvalidTelemetryData("Not enough bits in detection buffer")),
					}
				}

				match data_recover(&frame).and_then(|data| subframe::decode(&data)) {
					Ok(sf) => {
						let messages = self.assemble_messages(&sf);
						BlockResult::Ready(NavUpdate{
							subframe_id: sf.subframe_id,
							bits: bools_to_bit_string(&frame),
							week: self.last_week,
							tow_s: sf.time_of_week(),
							messages,
						})
					},
					Err(e) => BlockResult::Err(e),
				}
			},
		}
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	/* Test-side encoder: lays source data bits into ten words, computes the
	parity chain, and solves the two reserved bits of the last word so the
	subframe ends with both parity bits clear, exactly as broadcast frames
	do.  This keeps the next subframe's first word checkable against assumed
	zeros. */

	fn set_field(frame:&mut [bool], start:usize, len:usize, value:u64) {
		for i in 0..len {
			frame[start + i] = (value >> (len - 1 - i)) & 1 == 1;
		}
	}

	fn encode_subframe(data:&mut [bool; subframe::DATA_BITS]) -> Vec<bool> {
		// Solve the last word's two reserved data bits so its parity ends 00
		let mut solved = false;
		for fill in 0..4u8 {
			data[238] = fill & 2 != 0;
			data[239] = fill & 1 != 0;
			let mut d29 = false;
			let mut d30 = false;
			for w in 0..10 {
				let parity = parity_bits(&data[24*w..24*(w+1)], d29, d30);
				d29 = parity[4];
				d30 = parity[5];
			}
			if !d29 && !d30 { solved = true; break; }
		}
		assert!(solved, "no reserved-bit fill zeroes the final parity");

		let mut out:Vec<bool> = vec![];
		let mut d29 = false;
		let mut d30 = false;
		for w in 0..10 {
			let source = &data[24*w..24*(w+1)];
			let parity = parity_bits(source, d29, d30);
			for &b in source { out.push(b ^ d30); }
			out.extend_from_slice(&parity);
			d29 = parity[4];
			d30 = parity[5];
		}
		assert_eq!(out.len(), 300);
		out
	}

	fn blank_subframe(tow:u64, subframe_id:u64) -> [bool; subframe::DATA_BITS] {
		let mut data = [false; subframe::DATA_BITS];
		set_field(&mut data, 0, 8, 0b10001011);	// preamble
		set_field(&mut data, 24, 17, tow);
		set_field(&mut data, 43, 3, subframe_id);
		data
	}

	fn feed(decoder:&mut TelemetryDecoder, stream:&[bool], start_idx:usize) -> Vec<NavUpdate> {
		let mut updates = vec![];
		for (i, b) in stream.iter().enumerate() {
			if let BlockResult::Ready(update) = decoder.apply((*b, start_idx + i)) {
				updates.push(update);
			}
		}
		updates
	}

	#[test]
	fn parity_round_trip() {
		let mut data = blank_subframe(57600, 1);
		let encoded = encode_subframe(&mut data);

		let mut frame = [false; 300];
		frame.copy_from_slice(&encoded);
		let recovered = data_recover(&frame).unwrap();
		assert_eq!(recovered[..], data[..]);
	}

	#[test]
	fn corrupted_word_fails_parity() {
		let mut data = blank_subframe(57600, 1);
		let mut encoded = encode_subframe(&mut data);
		encoded[95] = !encoded[95];

		let mut frame = [false; 300];
		frame.copy_from_slice(&encoded);
		assert!(data_recover(&frame).is_err());
	}

	#[test]
	fn decoder_frames_subframes_after_junk() {
		let mut decoder = TelemetryDecoder::new(7, 1);

		let mut stream:Vec<bool> = vec![true, false, false, true, false];	// leading junk
		let mut data = blank_subframe(57600, 1);
		set_field(&mut data, 48, 10, 1000);
		stream.extend(encode_subframe(&mut data));

		let updates = feed(&mut decoder, &stream, 0);
		assert_eq!(updates.len(), 1);
		assert_eq!(updates[0].subframe_id, 1);
		assert_eq!(updates[0].week, 1000);
		assert_eq!(updates[0].tow_s, 345600.0);
		assert_eq!(updates[0].bits.len(), 300);
	}

	#[test]
	fn inverted_stream_is_recovered() {
		let mut decoder = TelemetryDecoder::new(7, 1);

		let mut data = blank_subframe(57600, 4);
		let stream:Vec<bool> = encode_subframe(&mut data).iter().map(|b| !b).collect();

		let updates = feed(&mut decoder, &stream, 0);
		assert_eq!(updates.len(), 1);
		assert_eq!(updates[0].subframe_id, 4);
	}

	#[test]
	fn ephemeris_assembles_over_three_subframes() {
		let mut decoder = TelemetryDecoder::new(7, 42);
		let mut stream:Vec<bool> = vec![];

		let mut sf1 = blank_subframe(57600, 1);
		set_field(&mut sf1, 48, 10, 1000);	// week
		set_field(&mut sf1, 70, 2, 0);		// IODC high
		set_field(&mut sf1, 168, 8, 0x37);	// IODC low
		stream.extend(encode_subframe(&mut sf1));

		let mut sf2 = blank_subframe(57601, 2);
		set_field(&mut sf2, 48, 8, 0x37);	// IODE
		set_field(&mut sf2, 184, 32, 2702931556);	// sqrt A raw
		stream.extend(encode_subframe(&mut sf2));

		let mut sf3 = blank_subframe(57602, 3);
		set_field(&mut sf3, 216, 8, 0x37);	// IODE
		stream.extend(encode_subframe(&mut sf3));

		let updates = feed(&mut decoder, &stream, 0);
		assert_eq!(updates.len(), 3);

		let messages:Vec<&NavMessage> = updates.iter().flat_map(|u| u.messages.iter()).collect();
		assert_eq!(messages.len(), 1);
		match messages[0] {
			NavMessage::Ephemeris(eph) => {
				assert_eq!(eph.i_satellite_PRN, 7);
				assert_eq!(eph.i_peak, 42);
				assert_eq!(eph.i_GPS_week, 1000);
				assert_eq!(eph.d_IODC, 55.0);
				assert!((eph.d_sqrt_A - 2702931556.0 * (2.0_f64).powi(-19)).abs() < 1e-9);
			},
			other => panic!("expected an ephemeris message, got {:?}", other),
		}
	}

	#[test]
	fn mismatched_issue_of_data_blocks_assembly() {
		let mut decoder = TelemetryDecoder::new(7, 1);
		let mut stream:Vec<bool> = vec![];

		let mut sf1 = blank_subframe(57600, 1);
		set_field(&mut sf1, 168, 8, 0x37);
		stream.extend(encode_subframe(&mut sf1));

		let mut sf2 = blank_subframe(57601, 2);
		set_field(&mut sf2, 48, 8, 0x38);	// different IODE
		stream.extend(encode_subframe(&mut sf2));

		let mut sf3 = blank_subframe(57602, 3);
		set_field(&mut sf3, 216, 8, 0x38);
		stream.extend(encode_subframe(&mut sf3));

		let updates = feed(&mut decoder, &stream, 0);
		assert_eq!(updates.len(), 3);
		assert!(updates.iter().all(|u| u.messages.is_empty()));
	}

	#[test]
	fn iono_and_utc_come_from_subframe_4_page_18() {
		let mut decoder = TelemetryDecoder::new(7, 1);

		let mut data = blank_subframe(57600, 4);
		set_field(&mut data, 50, 6, 56);
		set_field(&mut data, 56, 8, 2);		// alpha0 raw
		set_field(&mut data, 192, 8, 18);	// delta t LS

		let updates = feed(&mut decoder, &encode_subframe(&mut data), 0);
		assert_eq!(updates.len(), 1);
		assert_eq!(updates[0].messages.len(), 2);

		let has_iono = updates[0].messages.iter().any(|m| match m {
			NavMessage::Iono(iono) => iono.valid && iono.d_alpha0 == 2.0*(2.0_f64).powi(-30),
			_ => false,
		});
		let has_utc = updates[0].messages.iter().any(|m| match m {
			NavMessage::Utc(utc) => utc.valid && utc.d_DeltaT_LS == 18.0,
			_ => false,
		});
		assert!(has_iono);
		assert!(has_utc);
	}

}
