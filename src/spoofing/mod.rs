
use crossbeam::channel::{unbounded, Receiver, Sender};

use serde::{Serialize, Deserialize};

pub mod detector;
pub mod snr_window;

/* Spoofing cases, stable across releases:
     0  external-source mismatch
     1  RX-time inconsistency between peaks of the same PRN
     2  ephemeris/subframe payload mismatch
     3  TOW jump inconsistent with wall-clock duration
     4  position out of sane range, or inter-satellite GPS-time disagreement
     5  orbit element implausible
     10 C/N0 statistical anomaly */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoofingAlert {
	pub spoofing_case:u8,
	pub description:String,
	pub timestamp_ms:f64,
}

pub type AlertSender   = Sender<SpoofingAlert>;
pub type AlertReceiver = Receiver<SpoofingAlert>;

/// Unbounded multi-producer queue carrying alerts to the UI or log; FIFO per
/// producer, never drops
pub fn alert_bus() -> (AlertSender, AlertReceiver) {
	unbounded()
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn bus_is_fifo_per_producer() {
		let (tx, rx) = alert_bus();
		for i in 0..5 {
			tx.send(SpoofingAlert{ spoofing_case: 2, description: format!("alert {}", i), timestamp_ms: i as f64 }).unwrap();
		}
		let received:Vec<SpoofingAlert> = rx.try_iter().collect();
		assert_eq!(received.len(), 5);
		assert!(received.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
	}

}
