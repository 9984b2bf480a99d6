
pub mod signal_modulation;

pub const CA_CODE_LENGTH_CHIPS:usize = 1023;
pub const CA_CODE_RATE_CHIPS_PER_SEC:f64 = 1.023e6;
pub const CA_CODE_PERIOD_SEC:f64 = 1.0e-3;

pub const CARRIER_FREQ_HZ:f64 = 1.57542e9;

// One subframe is 300 bits at 50 bps
pub const SUBFRAME_PERIOD_SEC:f64 = 6.0;
pub const SUBFRAME_PAYLOAD_BITS:usize = 300;

pub const SECONDS_PER_WEEK:i64 = 604800;
