
use crate::DigSigProcErr;
use crate::utils::{bits_to_signed, bits_to_unsigned};

/* Bit-field extraction for the five subframe types, operating on the 240
data bits left after parity stripping.  Scale factors are the IS-GPS-200
LSBs; angle fields stay in semicircles so they compare directly against the
assistance records. */

pub const DATA_BITS:usize = 240;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subframe {
	pub time_of_week_truncated:u32,
	pub subframe_id:u8,
	pub body:SubframeBody,
}

impl Subframe {

	/// Seconds into the week at the leading edge of the next subframe
	pub fn time_of_week(&self) -> f64 { (self.time_of_week_truncated as f64) * 6.0 }

}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubframeBody {
	Eph1(Subframe1),
	Eph2(Subframe2),
	Eph3(Subframe3),
	IonoUtc(IonoUtcPage),
	Almanac(AlmanacPage),
	Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subframe1 {
	pub week_number:u16,
	pub code_on_l2:u8,
	pub ura_index:u8,
	pub sv_health:u8,
	pub iodc:u16,
	pub t_gd:f64,
	pub t_oc:f64,
	pub a_f2:f64,
	pub a_f1:f64,
	pub a_f0:f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subframe2 {
	pub iode:u8,
	pub crs:f64,
	pub dn:f64,
	pub m0:f64,
	pub cuc:f64,
	pub e:f64,
	pub cus:f64,
	pub sqrt_a:f64,
	pub t_oe:f64,
	pub fit_interval:bool,
	pub aodo:u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subframe3 {
	pub cic:f64,
	pub omega0:f64,
	pub cis:f64,
	pub i0:f64,
	pub crc:f64,
	pub omega:f64,
	pub omega_dot:f64,
	pub iode:u8,
	pub idot:f64,
}

/// Subframe 4 page 18: ionospheric model plus UTC parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonoUtcPage {
	pub alpha0:f64, pub alpha1:f64, pub alpha2:f64, pub alpha3:f64,
	pub beta0:f64, pub beta1:f64, pub beta2:f64, pub beta3:f64,
	pub a1:f64,
	pub a0:f64,
	pub t_ot:u32,
	pub wn_t:u8,
	pub delta_t_ls:i8,
	pub wn_lsf:u8,
	pub delta_t_lsf:i8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlmanacPage {
	pub sv_id:u8,
	pub e:f64,
	pub t_oa:u32,
	pub delta_i:f64,
	pub omega_dot:f64,
	pub sv_health:u8,
	pub sqrt_a:f64,
	pub omega0:f64,
	pub omega:f64,
	pub m0:f64,
	pub af0:f64,
	pub af1:f64,
}

fn decode_almanac_page(bits:&[bool], sv_id:u8) -> AlmanacPage {
	let af0_bits:Vec<bool> = [&bits[216..224], &bits[235..238]].concat();
	AlmanacPage{
		sv_id,
		e:         (bits_to_unsigned(&bits[ 56..72 ]) as f64) * (2.0_f64).powi(-21),
		t_oa:       bits_to_unsigned(&bits[ 72..80 ]) * 2_u32.pow(12),
		delta_i:   (bits_to_signed(  &bits[ 80..96 ]) as f64) * (2.0_f64).powi(-19),
		omega_dot: (bits_to_signed(  &bits[ 96..112]) as f64) * (2.0_f64).powi(-38),
		sv_health:  bits_to_unsigned(&bits[112..120]) as u8,
		sqrt_a:    (bits_to_unsigned(&bits[120..144]) as f64) * (2.0_f64).powi(-11),
		omega0:    (bits_to_signed(  &bits[144..168]) as f64) * (2.0_f64).powi(-23),
		omega:     (bits_to_signed(  &bits[168..192]) as f64) * (2.0_f64).powi(-23),
		m0:        (bits_to_signed(  &bits[192..216]) as f64) * (2.0_f64).powi(-23),
		af0:       (bits_to_signed(  &af0_bits      ) as f64) * (2.0_f64).powi(-20),
		af1:       (bits_to_signed(  &bits[224..235]) as f64) * (2.0_f64).powi(-38),
	}
}

pub fn decode(bits:&[bool]) -> Result<Subframe, DigSigProcErr> {
	if bits.len() != DATA_BITS {
		return Err(DigSigProcErr::InvalidTelemetryData("Subframe data must be 240 bits"));
	}

	let time_of_week_truncated:u32 = bits_to_unsigned(&bits[24..41]);
	let subframe_id:u8 = bits_to_unsigned(&bits[43..46]) as u8;

	let body = match subframe_id {
		1 => {
			let iodc_bits:Vec<bool> = [&bits[70..72], &bits[168..176]].concat();
			SubframeBody::Eph1(Subframe1{
				week_number: bits_to_unsigned(&bits[48..58]) as u16,
				code_on_l2:  bits_to_unsigned(&bits[58..60]) as u8,
				ura_index:   bits_to_unsigned(&bits[60..64]) as u8,
				sv_health:   bits_to_unsigned(&bits[64..70]) as u8,
				iodc:        bits_to_unsigned(&iodc_bits) as u16,
				t_gd: (bits_to_signed(  &bits[160..168]) as f64) * (2.0_f64).powi(-31),
				t_oc: (bits_to_unsigned(&bits[176..192]) as f64) * 16.0,
				a_f2: (bits_to_signed(  &bits[192..200]) as f64) * (2.0_f64).powi(-55),
				a_f1: (bits_to_signed(  &bits[200..216]) as f64) * (2.0_f64).powi(-43),
				a_f0: (bits_to_signed(  &bits[216..238]) as f64) * (2.0_f64).powi(-31),
			})
		},
		2 => SubframeBody::Eph2(Subframe2{
			iode:    bits_to_unsigned(&bits[48..56]) as u8,
			crs:    (bits_to_signed(  &bits[ 56..72 ]) as f64) * (2.0_f64).powi(-5),
			dn:     (bits_to_signed(  &bits[ 72..88 ]) as f64) * (2.0_f64).powi(-43),
			m0:     (bits_to_signed(  &bits[ 88..120]) as f64) * (2.0_f64).powi(-31),
			cuc:    (bits_to_signed(  &bits[120..136]) as f64) * (2.0_f64).powi(-29),
			e:      (bits_to_unsigned(&bits[136..168]) as f64) * (2.0_f64).powi(-33),
			cus:    (bits_to_signed(  &bits[168..184]) as f64) * (2.0_f64).powi(-29),
			sqrt_a: (bits_to_unsigned(&bits[184..216]) as f64) * (2.0_f64).powi(-19),
			t_oe:   (bits_to_unsigned(&bits[216..232]) as f64) * (2.0_f64).powi(4),
			fit_interval: bits[233],
			aodo:    bits_to_unsigned(&bits[234..239]) as u8,
		}),
		3 => SubframeBody::Eph3(Subframe3{
			cic:       (bits_to_signed(&bits[ 48..64 ]) as f64) * (2.0_f64).powi(-29),
			omega0:    (bits_to_signed(&bits[ 64..96 ]) as f64) * (2.0_f64).powi(-31),
			cis:       (bits_to_signed(&bits[ 96..112]) as f64) * (2.0_f64).powi(-29),
			i0:        (bits_to_signed(&bits[112..144]) as f64) * (2.0_f64).powi(-31),
			crc:       (bits_to_signed(&bits[144..160]) as f64) * (2.0_f64).powi(-5),
			omega:     (bits_to_signed(&bits[160..192]) as f64) * (2.0_f64).powi(-31),
			omega_dot: (bits_to_signed(&bits[192..216]) as f64) * (2.0_f64).powi(-43),
			iode:       bits_to_unsigned(&bits[216..224]) as u8,
			idot:      (bits_to_signed(&bits[224..238]) as f64) * (2.0_f64).powi(-43),
		}),
		4 => {
			let sv_id:u8 = bits_to_unsigned(&bits[50..56]) as u8;
			match sv_id {
				// Pages carrying almanac data for SVs 25 through 32
				25..=32 => SubframeBody::Almanac(decode_almanac_page(bits, sv_id)),
				// Page 18: ionospheric and UTC data
				56 => SubframeBody::IonoUtc(IonoUtcPage{
					alpha0: (bits_to_signed(&bits[ 56..64 ]) as f64) * (2.0_f64).powi(-30),
					alpha1: (bits_to_signed(&bits[ 64..72 ]) as f64) * (2.0_f64).powi(-27),
					alpha2: (bits_to_signed(&bits[ 72..80 ]) as f64) * (2.0_f64).powi(-24),
					alpha3: (bits_to_signed(&bits[ 80..88 ]) as f64) * (2.0_f64).powi(-24),
					beta0:  (bits_to_signed(&bits[ 88..96 ]) as f64) * (2.0_f64).powi(11),
					beta1:  (bits_to_signed(&bits[ 96..104]) as f64) * (2.0_f64).powi(14),
					beta2:  (bits_to_signed(&bits[104..112]) as f64) * (2.0_f64).powi(16),
					beta3:  (bits_to_signed(&bits[112..120]) as f64) * (2.0_f64).powi(16),
					a1:     (bits_to_signed(&bits[120..144]) as f64) * (2.0_f64).powi(-50),
					a0:     (bits_to_signed(&bits[144..176]) as f64) * (2.0_f64).powi(-30),
					t_ot:    bits_to_unsigned(&bits[176..184]) * 2_u32.pow(12),
					wn_t:    bits_to_unsigned(&bits[184..192]) as u8,
					delta_t_ls:  bits_to_signed(&bits[192..200]) as i8,
					wn_lsf:  bits_to_unsigned(&bits[200..208]) as u8,
					delta_t_lsf: bits_to_signed(&bits[208..216]) as i8,
				}),
				_ => SubframeBody::Other,
			}
		},
		5 => {
			let sv_id:u8 = bits_to_unsigned(&bits[50..56]) as u8;
			match sv_id {
				1..=24 => SubframeBody::Almanac(decode_almanac_page(bits, sv_id)),
				_ => SubframeBody::Other,
			}
		},
		_ => return Err(DigSigProcErr::InvalidTelemetryData("Subframe number other than 1 through 5")),
	};

	Ok(Subframe{ time_of_week_truncated, subframe_id, body })
}

#[cfg(test)]
mod tests {

	use super::*;

	fn set_field(frame:&mut [bool], start:usize, len:usize, value:u64) {
		for i in 0..len {
			frame[start + i] = (value >> (len - 1 - i)) & 1 == 1;
		}
	}

	fn frame_with_header(tow:u64, subframe_id:u64) -> [bool; DATA_BITS] {
		let mut frame = [false; DATA_BITS];
		set_field(&mut frame, 24, 17, tow);
		set_field(&mut frame, 43, 3, subframe_id);
		frame
	}

	#[test]
	fn subframe_1_fields() {
		let mut frame = frame_with_header(57600, 1);
		set_field(&mut frame, 48, 10, 1000);	// week number
		set_field(&mut frame, 70, 2, 0b01);		// IODC high bits
		set_field(&mut frame, 168, 8, 0x37);	// IODC low bits
		set_field(&mut frame, 176, 16, 2250);	// t_oc

		let sf = decode(&frame).unwrap();
		assert_eq!(sf.subframe_id, 1);
		assert_eq!(sf.time_of_week_truncated, 57600);
		assert_eq!(sf.time_of_week(), 345600.0);

		match sf.body {
			SubframeBody::Eph1(sf1) => {
				assert_eq!(sf1.week_number, 1000);
				assert_eq!(sf1.iodc, 0x137);
				assert_eq!(sf1.t_oc, 36000.0);
			},
			other => panic!("wrong body {:?}", other),
		}
	}

	#[test]
	fn subframe_2_scalings() {
		let mut frame = frame_with_header(100, 2);
		set_field(&mut frame, 48, 8, 0x37);		// IODE
		set_field(&mut frame, 184, 32, 2702931556);	// sqrt A raw
		set_field(&mut frame, 216, 16, 225);	// t_oe raw

		let sf = decode(&frame).unwrap();
		match sf.body {
			SubframeBody::Eph2(sf2) => {
				assert_eq!(sf2.iode, 0x37);
				assert!((sf2.sqrt_a - 2702931556.0 * (2.0_f64).powi(-19)).abs() < 1e-9);
				assert_eq!(sf2.t_oe, 3600.0);
			},
			other => panic!("wrong body {:?}", other),
		}
	}

	#[test]
	fn negative_fields_sign_extend() {
		let mut frame = frame_with_header(100, 3);
		// crc is a signed 16-bit field; all ones is minus one LSB
		set_field(&mut frame, 144, 16, 0xFFFF);

		let sf = decode(&frame).unwrap();
		match sf.body {
			SubframeBody::Eph3(sf3) => {
				assert_eq!(sf3.crc, -(2.0_f64).powi(-5));
			},
			other => panic!("wrong body {:?}", other),
		}
	}

	#[test]
	fn subframe_4_page_18_carries_iono_and_utc() {
		let mut frame = frame_with_header(100, 4);
		set_field(&mut frame, 50, 6, 56);	// page 18 SV id
		set_field(&mut frame, 56, 8, 2);	// alpha0 raw
		set_field(&mut frame, 192, 8, 18);	// delta t LS

		let sf = decode(&frame).unwrap();
		match sf.body {
			SubframeBody::IonoUtc(page) => {
				assert_eq!(page.alpha0, 2.0 * (2.0_f64).powi(-30));
				assert_eq!(page.delta_t_ls, 18);
			},
			other => panic!("wrong body {:?}", other),
		}
	}

	#[test]
	fn subframe_5_almanac_page() {
		let mut frame = frame_with_header(100, 5);
		set_field(&mut frame, 50, 6, 7);	// almanac for SV 7
		set_field(&mut frame, 120, 24, 11000000);	// sqrt A raw

		let sf = decode(&frame).unwrap();
		match sf.body {
			SubframeBody::Almanac(page) => {
				assert_eq!(page.sv_id, 7);
				assert!((page.sqrt_a - 11000000.0 * (2.0_f64).powi(-11)).abs() < 1e-9);
			},
			other => panic!("wrong body {:?}", other),
		}
	}

	#[test]
	fn invalid_subframe_id_is_rejected() {
		let frame = frame_with_header(100, 7);
		assert!(decode(&frame).is_err());
	}

}
