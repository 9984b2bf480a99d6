
use std::collections::HashMap;
use std::sync::Mutex;

use log::info;

/* Binds (PRN, peak rank) pairs to channel UIDs.  A UID names one tracker
instance for its whole life; the counter is monotone so a value can never
come back, even after its channel stops. */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidStatus {
	Pending,
	Checking,
	Verified,
	Alerted,
}

struct RegistryInner {
	next_uid: usize,
	bindings: HashMap<(usize, usize), usize>,
	by_uid:   HashMap<usize, (usize, usize)>,
	status:   HashMap<usize, UidStatus>,
}

pub struct ChannelPeakRegistry {
	inner: Mutex<RegistryInner>,
}

impl ChannelPeakRegistry {

	pub fn new() -> Self {
		ChannelPeakRegistry{ inner: Mutex::new(RegistryInner{
			next_uid: 1,
			bindings: HashMap::new(),
			by_uid:   HashMap::new(),
			status:   HashMap::new(),
		})}
	}

	/// Returns the UID already bound to this (PRN, peak rank) or mints a
	/// fresh one
	pub fn allocate(&self, prn:usize, peak_rank:usize) -> usize {
		let mut inner = self.inner.lock().unwrap();
		if let Some(uid) = inner.bindings.get(&(prn, peak_rank)) {
			return *uid;
		}
		let uid = inner.next_uid;
		inner.next_uid += 1;
		inner.bindings.insert((prn, peak_rank), uid);
		inner.by_uid.insert(uid, (prn, peak_rank));
		inner.status.insert(uid, UidStatus::Pending);
		info!("channel {} bound to PRN {} peak {}", uid, prn, peak_rank);
		uid
	}

	/// Releases the binding; the UID value itself is retired for good
	pub fn stop_tracking(&self, uid:usize) {
		let mut inner = self.inner.lock().unwrap();
		if let Some((prn, peak_rank)) = inner.by_uid.remove(&uid) {
			inner.bindings.remove(&(prn, peak_rank));
			info!("channel {} released (PRN {} peak {})", uid, prn, peak_rank);
		}
		inner.status.remove(&uid);
	}

	/// PVT cleared this UID of suspicion; the detector can stop repeating
	/// the auxiliary-peak checks on it
	pub fn confirm(&self, uid:usize) {
		let mut inner = self.inner.lock().unwrap();
		if inner.by_uid.contains_key(&uid) {
			inner.status.insert(uid, UidStatus::Verified);
		}
	}

	pub fn set_status(&self, uid:usize, status:UidStatus) {
		let mut inner = self.inner.lock().unwrap();
		if inner.by_uid.contains_key(&uid) {
			inner.status.insert(uid, status);
		}
	}

	pub fn status(&self, uid:usize) -> Option<UidStatus> {
		self.inner.lock().unwrap().status.get(&uid).copied()
	}

	pub fn uids_for_prn(&self, prn:usize) -> Vec<usize> {
		let inner = self.inner.lock().unwrap();
		let mut uids:Vec<usize> = inner.by_uid.iter()
			.filter(|(_, (p, _))| *p == prn)
			.map(|(uid, _)| *uid)
			.collect();
		uids.sort();
		uids
	}

	pub fn live_uids(&self) -> Vec<(usize, usize, usize)> {
		let inner = self.inner.lock().unwrap();
		let mut out:Vec<(usize, usize, usize)> = inner.by_uid.iter()
			.map(|(uid, (prn, rank))| (*uid, *prn, *rank))
			.collect();
		out.sort();
		out
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap().by_uid.len()
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn allocate_is_idempotent_per_binding() {
		let reg = ChannelPeakRegistry::new();
		let a = reg.allocate(7, 1);
		let b = reg.allocate(7, 1);
		let c = reg.allocate(7, 2);
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(reg.uids_for_prn(7), vec![a, c]);
	}

	#[test]
	fn uid_values_are_never_reused() {
		let reg = ChannelPeakRegistry::new();
		let mut seen:Vec<usize> = vec![];
		for round in 0..3 {
			for rank in 1..=4 {
				let uid = reg.allocate(round + 1, rank);
				assert!(!seen.contains(&uid), "UID {} minted twice", uid);
				seen.push(uid);
				reg.stop_tracking(uid);
			}
		}
	}

	#[test]
	fn confirm_marks_verified() {
		let reg = ChannelPeakRegistry::new();
		let uid = reg.allocate(12, 1);
		assert_eq!(reg.status(uid), Some(UidStatus::Pending));
		reg.confirm(uid);
		assert_eq!(reg.status(uid), Some(UidStatus::Verified));

		reg.stop_tracking(uid);
		assert_eq!(reg.status(uid), None);

		// Confirming a dead UID is a no-op
		reg.confirm(uid);
		assert_eq!(reg.status(uid), None);
	}

}
