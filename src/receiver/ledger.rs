
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use serde::{Serialize, Deserialize};

/* Shared key/value stores written by the tracking, telemetry, and PVT
threads and read by the spoofing detector.  Every reader gets a clone; a
reference into the live map never leaves the lock. */

pub struct Ledger<K:Copy + Eq + Hash, V:Clone> {
	inner: Mutex<HashMap<K, V>>,
}

impl<K:Copy + Eq + Hash, V:Clone> Ledger<K, V> {

	pub fn new() -> Self {
		Ledger{ inner: Mutex::new(HashMap::new()) }
	}

	// Last writer wins
	pub fn write(&self, key:K, value:V) {
		self.inner.lock().unwrap().insert(key, value);
	}

	pub fn read(&self, key:K) -> Option<V> {
		self.inner.lock().unwrap().get(&key).cloned()
	}

	pub fn remove(&self, key:K) -> Option<V> {
		self.inner.lock().unwrap().remove(&key)
	}

	pub fn snapshot(&self) -> HashMap<K, V> {
		self.inner.lock().unwrap().clone()
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool { self.len() == 0 }

}

/// Latest decoded subframe for one channel UID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubframeRecord {
	pub uid:usize,
	pub prn:usize,
	pub subframe_id:u8,
	// 300 characters of '0'/'1', parity already stripped by telemetry
	pub bits:String,
	pub timestamp_ms:f64,
}

impl SubframeRecord {

	pub fn has_payload(&self) -> bool { !self.bits.is_empty() }

}

/// Latest (week, TOW) pair decoded on one channel UID
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsTimeRecord {
	pub week:i32,
	pub tow_s:f64,
	pub timestamp_ms:f64,
	pub subframe_id:u8,
}

impl GpsTimeRecord {

	pub fn total_gps_seconds(&self) -> i64 {
		(self.week as i64) * crate::gnss::gps_l1_ca::SECONDS_PER_WEEK + (self.tow_s as i64)
	}

}

/// Latest ECEF position reported by the PVT thread for one PRN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SatPosRecord {
	pub x:f64,
	pub y:f64,
	pub z:f64,
	pub timestamp_ms:f64,
}

pub type SubframeLedger = Ledger<usize, SubframeRecord>;
pub type GpsTimeLedger  = Ledger<usize, GpsTimeRecord>;
pub type SatPosLedger   = Ledger<usize, SatPosRecord>;
