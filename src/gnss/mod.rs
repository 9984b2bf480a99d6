
/// FFT-based acquisition, including the auxiliary-peak search
pub mod acquisition;

pub mod channel;

pub mod gps_l1_ca;

pub mod telemetry_decode;
