
use std::collections::{HashMap, VecDeque};

use log::warn;

/* Per-PRN windows of recent C/N0 readings.  Under a single-transmitter
spoofer every replica shares the attacker's power profile, so the spread of
C/N0 across channels collapses and their pairwise correlation rises; the
detector reads both statistics off these windows. */

pub const DEFAULT_WINDOW_LEN:usize = 1000;

pub fn mean(values:&VecDeque<f64>) -> f64 {
	if values.is_empty() { return 0.0; }
	values.iter().sum::<f64>() / (values.len() as f64)
}

/// Population standard deviation
pub fn std_deviation(values:&[f64]) -> f64 {
	if values.is_empty() { return 0.0; }
	let n = values.len() as f64;
	let m = values.iter().sum::<f64>() / n;
	let sq_sum:f64 = values.iter().map(|v| (v - m)*(v - m)).sum();
	(sq_sum / n).sqrt()
}

pub fn covariance(a:&VecDeque<f64>, b:&VecDeque<f64>) -> f64 {
	if a.len() != b.len() {
		warn!("windows are not the same length, can't calculate covariance");
		return 0.0;
	}
	if a.is_empty() { return 0.0; }
	let mean_a = mean(a);
	let mean_b = mean(b);
	let sum:f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - mean_a)*(y - mean_b)).sum();
	sum / (a.len() as f64)
}

// Covariance normalized by the product of the two auto-covariances, not by
// the product of the standard deviations
pub fn normalized_covariance(a:&VecDeque<f64>, b:&VecDeque<f64>) -> f64 {
	covariance(a, b) / (covariance(a, a) * covariance(b, b))
}

pub struct SnrWindowStore {
	window_len:usize,
	buffers:HashMap<usize, VecDeque<f64>>,
}

impl SnrWindowStore {

	pub fn new(window_len:usize) -> Self {
		SnrWindowStore{ window_len, buffers: HashMap::new() }
	}

	pub fn push(&mut self, prn:usize, cn0_db_hz:f64) {
		let window_len = self.window_len;
		let buffer = self.buffers.entry(prn).or_insert_with(|| VecDeque::with_capacity(window_len));
		buffer.push_back(cn0_db_hz);
		while buffer.len() > window_len { buffer.pop_front(); }
	}

	/// Drops the windows of satellites no longer being tracked
	pub fn retain(&mut self, live_prns:&[usize]) {
		self.buffers.retain(|prn, _| live_prns.contains(prn));
	}

	pub fn buffer(&self, prn:usize) -> Option<&VecDeque<f64>> {
		self.buffers.get(&prn)
	}

	pub fn is_full(&self, prn:usize) -> bool {
		self.buffers.get(&prn).map(|b| b.len() >= self.window_len).unwrap_or(false)
	}

	pub fn prns(&self) -> Vec<usize> {
		let mut prns:Vec<usize> = self.buffers.keys().copied().collect();
		prns.sort();
		prns
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn window_is_bounded() {
		let mut store = SnrWindowStore::new(4);
		for i in 0..10 { store.push(5, i as f64); }
		let buffer = store.buffer(5).unwrap();
		assert_eq!(buffer.len(), 4);
		assert_eq!(*buffer.front().unwrap(), 6.0);
		assert!(store.is_full(5));
	}

	#[test]
	fn retain_evicts_dead_satellites() {
		let mut store = SnrWindowStore::new(4);
		store.push(1, 45.0);
		store.push(2, 44.0);
		store.push(3, 43.0);
		store.retain(&[1, 3]);
		assert_eq!(store.prns(), vec![1, 3]);
		assert!(store.buffer(2).is_none());
	}

	#[test]
	fn std_deviation_of_constant_is_zero() {
		assert_eq!(std_deviation(&[42.0; 8]), 0.0);
	}

	#[test]
	fn std_deviation_known_value() {
		// Population stdev of 2,4,4,4,5,5,7,9 is exactly 2
		let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
		assert!((std_deviation(&v) - 2.0).abs() < 1e-12);
	}

	#[test]
	fn covariance_of_identical_windows() {
		let a:VecDeque<f64> = vec![1.0, 2.0, 3.0, 4.0].into();
		assert!((covariance(&a, &a) - 1.25).abs() < 1e-12);
	}

	#[test]
	fn mismatched_lengths_give_zero() {
		let a:VecDeque<f64> = vec![1.0, 2.0].into();
		let b:VecDeque<f64> = vec![1.0, 2.0, 3.0].into();
		assert_eq!(covariance(&a, &b), 0.0);
	}

}
