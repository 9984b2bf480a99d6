
use rustfft::num_complex::Complex;

pub mod assistance;
pub mod gnss;
pub mod io;
pub mod receiver;
pub mod spoofing;

pub mod utils;

#[derive(Debug, Clone)]
pub struct Sample {
	pub val: Complex<f64>,
	pub idx: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DigSigProcErr {
    LossOfLock,
    InvalidTelemetryData(&'static str),
    Other(&'static str),
}

// A processing step consumes one input and either produces an output, needs
// more input, or fails
pub enum BlockResult<U> {
	NotReady,
	Ready(U),
	Err(DigSigProcErr),
}

impl<U> BlockResult<U> {

	pub fn unwrap(self) -> U {
		match self {
			Self::Ready(u) => u,
			_ => panic!("Called unwrap on something other than BlockResult::Ready")
		}
	}

}
