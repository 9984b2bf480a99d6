
use rustfft::num_complex::Complex;

use super::{CA_CODE_LENGTH_CHIPS, CA_CODE_RATE_CHIPS_PER_SEC};

// G2 output tap pairs per PRN (IS-GPS-200 table 3-I, PRNs 1 through 32)
const G2_TAPS:[(usize, usize); 32] = [
	(2,6), (3,7), (4,8), (5,9), (1,9), (2,10), (1,8), (2,9), (3,10), (2,3),
	(3,4), (5,6), (6,7), (7,8), (8,9), (9,10), (1,4), (2,5), (3,6), (4,7),
	(5,8), (6,9), (1,3), (4,6), (5,7), (6,8), (7,9), (8,10), (1,6), (2,7),
	(3,8), (4,9)];

/// One period of the C/A Gold code for this PRN as plus/minus one chips
pub fn ca_code(prn:usize) -> Vec<i8> {
	assert!(prn >= 1 && prn <= 32, "PRN must be in 1..=32");
	let (t1, t2) = G2_TAPS[prn-1];

	let mut g1:[bool; 10] = [true; 10];
	let mut g2:[bool; 10] = [true; 10];
	let mut chips:Vec<i8> = Vec::with_capacity(CA_CODE_LENGTH_CHIPS);

	for _ in 0..CA_CODE_LENGTH_CHIPS {
		let chip = g1[9] ^ (g2[t1-1] ^ g2[t2-1]);
		chips.push(if chip { 1 } else { -1 });

		let g1_fb = g1[2] ^ g1[9];
		let g2_fb = g2[1] ^ g2[2] ^ g2[5] ^ g2[7] ^ g2[8] ^ g2[9];
		for i in (1..10).rev() {
			g1[i] = g1[i-1];
			g2[i] = g2[i-1];
		}
		g1[0] = g1_fb;
		g2[0] = g2_fb;
	}

	chips
}

/// The C/A code sampled at fs over one code period
pub fn prn_int_sampled(prn:usize, fs:f64) -> Vec<i8> {
	let code = ca_code(prn);
	let n:usize = (fs * super::CA_CODE_PERIOD_SEC).round() as usize;
	(0..n).map(|i| {
		let chip_idx:usize = ((i as f64) * CA_CODE_RATE_CHIPS_PER_SEC / fs).floor() as usize;
		code[chip_idx % CA_CODE_LENGTH_CHIPS]
	}).collect()
}

pub fn prn_complex_sampled(prn:usize, fs:f64) -> Vec<Complex<f64>> {
	prn_int_sampled(prn, fs).into_iter().map(|b| Complex{ re: b as f64, im: 0.0 }).collect()
}

#[cfg(test)]
mod tests {

	use super::*;

	fn first_ten_chips_octal(prn:usize) -> u16 {
		let code = ca_code(prn);
		let mut ans:u16 = 0;
		for chip in code.iter().take(10) {
			ans = (ans << 1) | if *chip > 0 { 1 } else { 0 };
		}
		ans
	}

	#[test]
	fn known_first_chips() {
		// First ten chips from IS-GPS-200, given there in octal
		assert_eq!(first_ten_chips_octal(1), 0o1440);
		assert_eq!(first_ten_chips_octal(2), 0o1620);
		assert_eq!(first_ten_chips_octal(3), 0o1710);
		assert_eq!(first_ten_chips_octal(4), 0o1744);
	}

	#[test]
	fn code_is_balanced() {
		// Gold codes of length 1023 carry 512 ones and 511 zeros
		for prn in [1usize, 7, 19, 32].iter() {
			let ones = ca_code(*prn).iter().filter(|c| **c > 0).count();
			assert_eq!(ones, 512, "PRN {}", prn);
		}
	}

	#[test]
	fn sampled_length_matches_fs() {
		assert_eq!(prn_int_sampled(5, 1.023e6).len(), 1023);
		assert_eq!(prn_int_sampled(5, 2.046e6).len(), 2046);
	}

	#[test]
	fn autocorrelation_peak_at_zero_lag() {
		let code = ca_code(9);
		let zero_lag:i32 = code.iter().map(|c| (*c as i32) * (*c as i32)).sum();
		assert_eq!(zero_lag, 1023);

		// Any nonzero circular lag correlates far below the main peak
		for lag in [1usize, 100, 511].iter() {
			let r:i32 = (0..1023).map(|i| (code[i] as i32) * (code[(i+lag) % 1023] as i32)).sum();
			assert!(r.abs() < 100, "lag {} gave {}", lag, r);
		}
	}

}
