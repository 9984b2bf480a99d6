
use std::fs::File;

use byteorder::{LittleEndian, ReadBytesExt};

use rustfft::num_complex::Complex;

use crate::Sample;

/// Streams interleaved little-endian i16 I/Q pairs from a capture file as
/// complex samples with a running sample index
pub struct IqFileSource {
	f:File,
	idx:usize,
	scale:f64,
}

pub fn iq_file_source(filename:&str) -> Result<IqFileSource, &'static str> {
	let f = File::open(filename).map_err(|_| "Unable to open I/Q capture file")?;
	Ok(IqFileSource{ f, idx: 0, scale: 1.0 })
}

impl IqFileSource {

	pub fn with_scale(mut self, scale:f64) -> Self {
		self.scale = scale;
		self
	}

	pub fn skip(&mut self, n:usize) {
		for _ in 0..n {
			if self.next().is_none() { break; }
		}
	}

}

impl Iterator for IqFileSource {
	type Item = Sample;

	fn next(&mut self) -> Option<Sample> {
		match (self.f.read_i16::<LittleEndian>(), self.f.read_i16::<LittleEndian>()) {
			(Ok(re_i16), Ok(im_i16)) => {
				let val = Complex{ re: (re_i16 as f64) * self.scale, im: (im_i16 as f64) * self.scale };
				let ans = Sample{ val, idx: self.idx };
				self.idx += 1;
				Some(ans)
			},
			(_, _) => None,
		}
	}
}

#[cfg(test)]
mod tests {

	use std::io::Write;

	use super::*;

	#[test]
	fn reads_interleaved_iq_pairs() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("capture.dat");
		{
			let mut f = std::fs::File::create(&path).unwrap();
			// Two samples: (1, -2) and (300, 400)
			for v in [1i16, -2, 300, 400].iter() {
				f.write_all(&v.to_le_bytes()).unwrap();
			}
		}

		let samples:Vec<Sample> = iq_file_source(path.to_str().unwrap()).unwrap().collect();
		assert_eq!(samples.len(), 2);
		assert_eq!(samples[0].val, Complex{ re: 1.0, im: -2.0 });
		assert_eq!(samples[0].idx, 0);
		assert_eq!(samples[1].val, Complex{ re: 300.0, im: 400.0 });
		assert_eq!(samples[1].idx, 1);
	}

	#[test]
	fn truncated_file_ends_the_stream() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("short.dat");
		std::fs::write(&path, &[0x01u8, 0x00, 0x02]).unwrap();

		let samples:Vec<Sample> = iq_file_source(path.to_str().unwrap()).unwrap().collect();
		assert!(samples.is_empty());
	}

}
