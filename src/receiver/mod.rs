
pub mod ledger;
pub mod registry;

use crate::assistance::AssistanceCache;

use self::ledger::{Ledger, SubframeLedger, GpsTimeLedger, SatPosLedger};
use self::registry::ChannelPeakRegistry;

/* Root context of one receiver run.  Everything that used to be a process
global in receivers of this kind lives here and is handed out by reference;
each ledger carries its own lock, so the context itself can be shared freely
across the channel, PVT, and detector threads. */

pub struct ReceiverContext {
	pub subframes:     SubframeLedger,
	pub gps_times:     GpsTimeLedger,
	pub sat_positions: SatPosLedger,
	pub registry:      ChannelPeakRegistry,
	pub assistance:    AssistanceCache,
}

impl ReceiverContext {

	pub fn new(assistance:AssistanceCache) -> Self {
		ReceiverContext{
			subframes:     Ledger::new(),
			gps_times:     Ledger::new(),
			sat_positions: Ledger::new(),
			registry:      ChannelPeakRegistry::new(),
			assistance,
		}
	}

	/// Tears down one channel: the registry binding goes away and the
	/// ledger entries written under this UID are released with it
	pub fn stop_tracking(&self, uid:usize) {
		self.registry.stop_tracking(uid);
		self.subframes.remove(uid);
		self.gps_times.remove(uid);
	}

}

#[cfg(test)]
mod tests {

	use crate::assistance::AssistanceCache;

	use super::*;

	#[test]
	fn stop_tracking_releases_ledger_entries() {
		let ctx = ReceiverContext::new(AssistanceCache::disabled());
		let uid = ctx.registry.allocate(7, 1);

		ctx.subframes.write(uid, ledger::SubframeRecord{
			uid, prn: 7, subframe_id: 1, bits: "01".repeat(150), timestamp_ms: 10.0 });
		ctx.gps_times.write(uid, ledger::GpsTimeRecord{
			week: 2048, tow_s: 1000.0, timestamp_ms: 10.0, subframe_id: 1 });

		ctx.stop_tracking(uid);

		assert!(ctx.subframes.read(uid).is_none());
		assert!(ctx.gps_times.read(uid).is_none());
		assert!(ctx.registry.status(uid).is_none());
	}

}
