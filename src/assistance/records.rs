
#![allow(non_snake_case)]

use serde::{Serialize, Deserialize};

/* Assistance records compared field-for-field against the broadcast
navigation message.  Field names follow the receiver's long-standing XML
archive schema, so they carry their historical prefixes; the archives are
consumed by external tools and the names cannot drift.

Angle fields stay in semicircles exactly as the subframe decoder emits them,
so broadcast and assistance values compare without a unit conversion. */

// IS-GPS-200 LSB scalings applied when ingesting raw RRLP assistance integers
pub const T_GD_LSB:f64      = 4.656612873077393e-10;	// 2^-31
pub const T_OC_LSB:f64      = 16.0;						// 2^4
pub const A_F0_LSB:f64      = 4.656612873077393e-10;	// 2^-31
pub const A_F1_LSB:f64      = 1.1368683772161603e-13;	// 2^-43
pub const A_F2_LSB:f64      = 2.7755575615628914e-17;	// 2^-55
pub const C_RS_LSB:f64      = 0.03125;					// 2^-5
pub const C_RC_LSB:f64      = 0.03125;					// 2^-5
pub const DELTA_N_LSB:f64   = 1.1368683772161603e-13;	// 2^-43
pub const M_0_LSB:f64       = 4.656612873077393e-10;	// 2^-31
pub const C_UC_LSB:f64      = 1.862645149230957e-9;		// 2^-29
pub const C_US_LSB:f64      = 1.862645149230957e-9;		// 2^-29
pub const C_IC_LSB:f64      = 1.862645149230957e-9;		// 2^-29
pub const C_IS_LSB:f64      = 1.862645149230957e-9;		// 2^-29
pub const E_LSB:f64         = 1.1641532182693481e-10;	// 2^-33
pub const SQRT_A_LSB:f64    = 1.9073486328125e-6;		// 2^-19
pub const T_OE_LSB:f64      = 16.0;						// 2^4
pub const OMEGA_0_LSB:f64   = 4.656612873077393e-10;	// 2^-31
pub const I_0_LSB:f64       = 4.656612873077393e-10;	// 2^-31
pub const OMEGA_LSB:f64     = 4.656612873077393e-10;	// 2^-31
pub const OMEGA_DOT_LSB:f64 = 1.1368683772161603e-13;	// 2^-43
pub const I_DOT_LSB:f64     = 1.1368683772161603e-13;	// 2^-43
pub const AODO_LSB:f64      = 900.0;

pub const ALM_A_F0_LSB:f64    = 9.5367431640625e-7;		// 2^-20
pub const ALM_A_F1_LSB:f64    = 3.637978807091713e-12;	// 2^-38
pub const ALM_DELTA_I_LSB:f64 = 1.9073486328125e-6;		// 2^-19
pub const ALM_ANGLE_LSB:f64   = 1.1920928955078125e-7;	// 2^-23
pub const ALM_SQRT_A_LSB:f64  = 4.8828125e-4;			// 2^-11
pub const ALM_OMEGA_DOT_LSB:f64 = 3.637978807091713e-12;	// 2^-38
pub const ALM_E_LSB:f64       = 4.76837158203125e-7;	// 2^-21
pub const ALM_T_OA_LSB:f64    = 4096.0;					// 2^12

pub const UTC_A0_LSB:f64   = 9.313225746154785e-10;		// 2^-30
pub const UTC_A1_LSB:f64   = 8.881784197001252e-16;		// 2^-50
pub const UTC_T_OT_LSB:f64 = 4096.0;					// 2^12

// TS 44.031: GPS TOW at 0.08 s resolution
pub const REF_TIME_TOW_LSB:f64 = 0.08;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsEphemeris {
	pub i_satellite_PRN:u32,
	// Which channel UID decoded this record; zero for external assistance
	pub i_peak:u32,
	pub d_TOW:f64,
	pub d_Crs:f64,
	pub d_Delta_n:f64,
	pub d_M_0:f64,
	pub d_Cuc:f64,
	pub d_e_eccentricity:f64,
	pub d_Cus:f64,
	pub d_sqrt_A:f64,
	pub d_Toe:f64,
	pub d_Toc:f64,
	pub d_Cic:f64,
	pub d_OMEGA0:f64,
	pub d_Cis:f64,
	pub d_i_0:f64,
	pub d_Crc:f64,
	pub d_OMEGA:f64,
	pub d_OMEGA_DOT:f64,
	pub d_IDOT:f64,
	pub i_code_on_L2:i32,
	pub i_GPS_week:i32,
	pub b_L2_P_data_flag:bool,
	pub i_SV_accuracy:i32,
	pub i_SV_health:i32,
	pub d_TGD:f64,
	pub d_IODC:f64,
	pub i_AODO:i32,
	pub b_fit_interval_flag:bool,
	pub d_spare1:f64,
	pub d_spare2:f64,
	pub d_A_f0:f64,
	pub d_A_f1:f64,
	pub d_A_f2:f64,
	pub b_integrity_status_flag:bool,
	pub b_alert_flag:bool,
	pub b_antispoofing_flag:bool,
}

impl GpsEphemeris {

	/// Names of every field whose value differs, excluding the channel tag
	pub fn differing_fields(&self, other:&GpsEphemeris) -> Vec<&'static str> {
		let mut diff:Vec<&'static str> = vec![];
		if self.d_TOW != other.d_TOW { diff.push("d_TOW"); }
		if self.d_Crs != other.d_Crs { diff.push("d_Crs"); }
		if self.d_Delta_n != other.d_Delta_n { diff.push("d_Delta_n"); }
		if self.d_M_0 != other.d_M_0 { diff.push("d_M_0"); }
		if self.d_Cuc != other.d_Cuc { diff.push("d_Cuc"); }
		if self.d_e_eccentricity != other.d_e_eccentricity { diff.push("d_e_eccentricity"); }
		if self.d_Cus != other.d_Cus { diff.push("d_Cus"); }
		if self.d_sqrt_A != other.d_sqrt_A { diff.push("d_sqrt_A"); }
		if self.d_Toe != other.d_Toe { diff.push("d_Toe"); }
		if self.d_Toc != other.d_Toc { diff.push("d_Toc"); }
		if self.d_Cic != other.d_Cic { diff.push("d_Cic"); }
		if self.d_OMEGA0 != other.d_OMEGA0 { diff.push("d_OMEGA0"); }
		if self.d_Cis != other.d_Cis { diff.push("d_Cis"); }
		if self.d_i_0 != other.d_i_0 { diff.push("d_i_0"); }
		if self.d_Crc != other.d_Crc { diff.push("d_Crc"); }
		if self.d_OMEGA != other.d_OMEGA { diff.push("d_OMEGA"); }
		if self.d_OMEGA_DOT != other.d_OMEGA_DOT { diff.push("d_OMEGA_DOT"); }
		if self.d_IDOT != other.d_IDOT { diff.push("d_IDOT"); }
		if self.i_code_on_L2 != other.i_code_on_L2 { diff.push("i_code_on_L2"); }
		if self.i_GPS_week != other.i_GPS_week { diff.push("i_GPS_week"); }
		if self.b_L2_P_data_flag != other.b_L2_P_data_flag { diff.push("b_L2_P_data_flag"); }
		if self.i_SV_accuracy != other.i_SV_accuracy { diff.push("i_SV_accuracy"); }
		if self.i_SV_health != other.i_SV_health { diff.push("i_SV_health"); }
		if self.d_TGD != other.d_TGD { diff.push("d_TGD"); }
		if self.d_IODC != other.d_IODC { diff.push("d_IODC"); }
		if self.i_AODO != other.i_AODO { diff.push("i_AODO"); }
		if self.b_fit_interval_flag != other.b_fit_interval_flag { diff.push("b_fit_interval_flag"); }
		if self.d_spare1 != other.d_spare1 { diff.push("d_spare1"); }
		if self.d_spare2 != other.d_spare2 { diff.push("d_spare2"); }
		if self.d_A_f0 != other.d_A_f0 { diff.push("d_A_f0"); }
		if self.d_A_f1 != other.d_A_f1 { diff.push("d_A_f1"); }
		if self.d_A_f2 != other.d_A_f2 { diff.push("d_A_f2"); }
		if self.b_integrity_status_flag != other.b_integrity_status_flag { diff.push("b_integrity_status_flag"); }
		if self.b_alert_flag != other.b_alert_flag { diff.push("b_alert_flag"); }
		if self.b_antispoofing_flag != other.b_antispoofing_flag { diff.push("b_antispoofing_flag"); }
		diff
	}

}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsIono {
	pub d_alpha0:f64,
	pub d_alpha1:f64,
	pub d_alpha2:f64,
	pub d_alpha3:f64,
	pub d_beta0:f64,
	pub d_beta1:f64,
	pub d_beta2:f64,
	pub d_beta3:f64,
	pub valid:bool,
}

impl GpsIono {

	pub fn differing_fields(&self, other:&GpsIono) -> Vec<&'static str> {
		let mut diff:Vec<&'static str> = vec![];
		if self.d_alpha0 != other.d_alpha0 { diff.push("d_alpha0"); }
		if self.d_alpha1 != other.d_alpha1 { diff.push("d_alpha1"); }
		if self.d_alpha2 != other.d_alpha2 { diff.push("d_alpha2"); }
		if self.d_alpha3 != other.d_alpha3 { diff.push("d_alpha3"); }
		if self.d_beta0 != other.d_beta0 { diff.push("d_beta0"); }
		if self.d_beta1 != other.d_beta1 { diff.push("d_beta1"); }
		if self.d_beta2 != other.d_beta2 { diff.push("d_beta2"); }
		if self.d_beta3 != other.d_beta3 { diff.push("d_beta3"); }
		if self.valid != other.valid { diff.push("valid"); }
		diff
	}

}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsUtcModel {
	pub d_A1:f64,
	pub d_A0:f64,
	pub d_t_OT:f64,
	pub i_WN_T:i32,
	pub d_DeltaT_LS:f64,
	pub i_WN_LSF:i32,
	pub i_DN:i32,
	pub d_DeltaT_LSF:f64,
	pub valid:bool,
}

impl GpsUtcModel {

	pub fn differing_fields(&self, other:&GpsUtcModel) -> Vec<&'static str> {
		let mut diff:Vec<&'static str> = vec![];
		if self.valid != other.valid { diff.push("valid"); }
		if self.d_A1 != other.d_A1 { diff.push("d_A1"); }
		if self.d_A0 != other.d_A0 { diff.push("d_A0"); }
		if self.d_t_OT != other.d_t_OT { diff.push("d_t_OT"); }
		if self.i_WN_T != other.i_WN_T { diff.push("i_WN_T"); }
		if self.d_DeltaT_LS != other.d_DeltaT_LS { diff.push("d_DeltaT_LS"); }
		if self.i_WN_LSF != other.i_WN_LSF { diff.push("i_WN_LSF"); }
		if self.i_DN != other.i_DN { diff.push("i_DN"); }
		if self.d_DeltaT_LSF != other.d_DeltaT_LSF { diff.push("d_DeltaT_LSF"); }
		diff
	}

}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsAlmanac {
	pub i_satellite_PRN:u32,
	pub d_Delta_i:f64,
	pub i_Toa:i32,
	pub d_M_0:f64,
	pub d_e_eccentricity:f64,
	pub d_sqrt_A:f64,
	pub d_OMEGA0:f64,
	pub d_OMEGA:f64,
	pub d_OMEGA_DOT:f64,
	pub i_SV_health:i32,
	pub d_A_f0:f64,
	pub d_A_f1:f64,
}

impl GpsAlmanac {

	pub fn differing_fields(&self, other:&GpsAlmanac) -> Vec<&'static str> {
		let mut diff:Vec<&'static str> = vec![];
		if self.d_Delta_i != other.d_Delta_i { diff.push("d_Delta_i"); }
		if self.i_Toa != other.i_Toa { diff.push("i_Toa"); }
		if self.d_M_0 != other.d_M_0 { diff.push("d_M_0"); }
		if self.d_e_eccentricity != other.d_e_eccentricity { diff.push("d_e_eccentricity"); }
		if self.d_sqrt_A != other.d_sqrt_A { diff.push("d_sqrt_A"); }
		if self.d_OMEGA0 != other.d_OMEGA0 { diff.push("d_OMEGA0"); }
		if self.d_OMEGA != other.d_OMEGA { diff.push("d_OMEGA"); }
		if self.d_OMEGA_DOT != other.d_OMEGA_DOT { diff.push("d_OMEGA_DOT"); }
		// SV health words routinely differ between broadcast and assistance
		// sources and are not compared
		if self.d_A_f0 != other.d_A_f0 { diff.push("d_A_f0"); }
		if self.d_A_f1 != other.d_A_f1 { diff.push("d_A_f1"); }
		diff
	}

}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsRefTime {
	pub d_TOW:f64,
	pub d_Week:f64,
	pub d_tv_sec:f64,
	pub d_tv_usec:f64,
	pub valid:bool,
}

/* Raw RRLP assistance integers as the SUPL transport hands them over; the
scaled() constructors apply the IS-GPS-200 LSBs exactly once, at ingestion. */

#[derive(Debug, Clone, Copy, Default)]
pub struct RawSuplEphemeris {
	pub prn:u8,
	pub delta_n:i16,
	pub M0:i32,
	pub A_sqrt:u32,
	pub OMEGA_0:i32,
	pub i0:i32,
	pub w:i32,
	pub OMEGA_dot:i32,
	pub i_dot:i16,
	pub e:u32,
	pub Cuc:i16,
	pub Cus:i16,
	pub Crc:i16,
	pub Crs:i16,
	pub Cic:i16,
	pub Cis:i16,
	pub toe:u16,
	pub IODC:u16,
	pub toc:u16,
	pub AF0:i32,
	pub AF1:i16,
	pub AF2:i8,
	pub bits:u8,
	pub ura:u8,
	pub health:u8,
	pub tgd:i8,
	pub AODA:u8,
}

impl RawSuplEphemeris {

	pub fn scaled(&self, week:i32, tow:f64) -> GpsEphemeris {
		GpsEphemeris{
			i_satellite_PRN: self.prn as u32,
			i_peak: 0,
			d_TOW: tow,
			i_GPS_week: week,
			i_code_on_L2: self.bits as i32,
			i_SV_accuracy: self.ura as i32,
			i_SV_health: self.health as i32,
			d_IODC: self.IODC as f64,
			d_TGD: (self.tgd as f64) * T_GD_LSB,
			d_Toc: (self.toc as f64) * T_OC_LSB,
			d_A_f0: (self.AF0 as f64) * A_F0_LSB,
			d_A_f1: (self.AF1 as f64) * A_F1_LSB,
			d_A_f2: (self.AF2 as f64) * A_F2_LSB,
			d_Crc: (self.Crc as f64) * C_RC_LSB,
			d_Crs: (self.Crs as f64) * C_RS_LSB,
			d_Delta_n: (self.delta_n as f64) * DELTA_N_LSB,
			d_M_0: (self.M0 as f64) * M_0_LSB,
			d_Cuc: (self.Cuc as f64) * C_UC_LSB,
			d_Cus: (self.Cus as f64) * C_US_LSB,
			d_e_eccentricity: (self.e as f64) * E_LSB,
			d_sqrt_A: (self.A_sqrt as f64) * SQRT_A_LSB,
			d_Toe: (self.toe as f64) * T_OE_LSB,
			i_AODO: (self.AODA as i32) * (AODO_LSB as i32),
			d_Cic: (self.Cic as f64) * C_IC_LSB,
			d_OMEGA0: (self.OMEGA_0 as f64) * OMEGA_0_LSB,
			d_Cis: (self.Cis as f64) * C_IS_LSB,
			d_i_0: (self.i0 as f64) * I_0_LSB,
			d_OMEGA: (self.w as f64) * OMEGA_LSB,
			d_OMEGA_DOT: (self.OMEGA_dot as f64) * OMEGA_DOT_LSB,
			d_IDOT: (self.i_dot as f64) * I_DOT_LSB,
			..GpsEphemeris::default()
		}
	}

}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawSuplAlmanac {
	pub prn:u8,
	pub e:u16,
	pub toa:u8,
	pub Ksii:i16,
	pub OMEGA_dot:i16,
	pub A_sqrt:u32,
	pub OMEGA_0:i32,
	pub w:i32,
	pub M0:i32,
	pub AF0:i16,
	pub AF1:i16,
	pub health:u8,
}

impl RawSuplAlmanac {

	pub fn scaled(&self) -> GpsAlmanac {
		GpsAlmanac{
			i_satellite_PRN: self.prn as u32,
			d_A_f0: (self.AF0 as f64) * ALM_A_F0_LSB,
			d_A_f1: (self.AF1 as f64) * ALM_A_F1_LSB,
			d_Delta_i: (self.Ksii as f64) * ALM_DELTA_I_LSB,
			d_OMEGA: (self.w as f64) * ALM_ANGLE_LSB,
			d_OMEGA0: (self.OMEGA_0 as f64) * ALM_ANGLE_LSB,
			d_sqrt_A: (self.A_sqrt as f64) * ALM_SQRT_A_LSB,
			d_OMEGA_DOT: (self.OMEGA_dot as f64) * ALM_OMEGA_DOT_LSB,
			i_Toa: (self.toa as i32) * (ALM_T_OA_LSB as i32),
			d_e_eccentricity: (self.e as f64) * ALM_E_LSB,
			d_M_0: (self.M0 as f64) * ALM_ANGLE_LSB,
			i_SV_health: self.health as i32,
		}
	}

}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawSuplUtc {
	pub a0:i32,
	pub a1:i32,
	pub delta_tls:i8,
	pub tot:u8,
	pub wnt:u8,
	pub wnlsf:u8,
	pub dn:u8,
	pub delta_tlsf:i8,
}

impl RawSuplUtc {

	pub fn scaled(&self) -> GpsUtcModel {
		GpsUtcModel{
			d_A0: (self.a0 as f64) * UTC_A0_LSB,
			d_A1: (self.a1 as f64) * UTC_A1_LSB,
			d_DeltaT_LS: self.delta_tls as f64,
			d_DeltaT_LSF: self.delta_tlsf as f64,
			d_t_OT: (self.tot as f64) * UTC_T_OT_LSB,
			i_DN: self.dn as i32,
			i_WN_T: self.wnt as i32,
			i_WN_LSF: self.wnlsf as i32,
			valid: true,
		}
	}

}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawSuplIono {
	pub a0:i8,
	pub a1:i8,
	pub a2:i8,
	pub a3:i8,
	pub b0:i8,
	pub b1:i8,
	pub b2:i8,
	pub b3:i8,
}

impl RawSuplIono {

	pub fn scaled(&self) -> GpsIono {
		GpsIono{
			d_alpha0: (self.a0 as f64) * (2.0_f64).powi(-30),
			d_alpha1: (self.a1 as f64) * (2.0_f64).powi(-27),
			d_alpha2: (self.a2 as f64) * (2.0_f64).powi(-24),
			d_alpha3: (self.a3 as f64) * (2.0_f64).powi(-24),
			d_beta0: (self.b0 as f64) * (2.0_f64).powi(11),
			d_beta1: (self.b1 as f64) * (2.0_f64).powi(14),
			d_beta2: (self.b2 as f64) * (2.0_f64).powi(16),
			d_beta3: (self.b3 as f64) * (2.0_f64).powi(16),
			valid: true,
		}
	}

}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawSuplRefTime {
	pub gps_week:u16,
	pub gps_tow:u32,
	pub tv_sec:i64,
	pub tv_usec:i64,
}

impl RawSuplRefTime {

	pub fn scaled(&self) -> GpsRefTime {
		GpsRefTime{
			d_TOW: (self.gps_tow as f64) * REF_TIME_TOW_LSB,
			d_Week: self.gps_week as f64,
			d_tv_sec: self.tv_sec as f64,
			d_tv_usec: self.tv_usec as f64,
			valid: true,
		}
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn ephemeris_scaling_applies_lsbs() {
		let raw = RawSuplEphemeris{ prn: 3, AF0: 1, AF1: 1, AF2: 1, toc: 1, toe: 1, A_sqrt: 1, ..RawSuplEphemeris::default() };
		let eph = raw.scaled(2048, 350000.0);

		assert_eq!(eph.i_satellite_PRN, 3);
		assert_eq!(eph.i_GPS_week, 2048);
		assert_eq!(eph.d_A_f0, (2.0_f64).powi(-31));
		assert_eq!(eph.d_A_f1, (2.0_f64).powi(-43));
		assert_eq!(eph.d_A_f2, (2.0_f64).powi(-55));
		assert_eq!(eph.d_Toc, 16.0);
		assert_eq!(eph.d_Toe, 16.0);
		assert_eq!(eph.d_sqrt_A, (2.0_f64).powi(-19));
	}

	#[test]
	fn ref_time_tow_resolution() {
		let raw = RawSuplRefTime{ gps_week: 2048, gps_tow: 100, tv_sec: 0, tv_usec: 0 };
		assert_eq!(raw.scaled().d_TOW, 8.0);
	}

	#[test]
	fn differing_fields_names_the_field() {
		let a = GpsEphemeris{ d_IODC: 55.0, ..GpsEphemeris::default() };
		let b = GpsEphemeris{ d_IODC: 56.0, ..GpsEphemeris::default() };
		assert_eq!(a.differing_fields(&b), vec!["d_IODC"]);
		assert!(a.differing_fields(&a).is_empty());
	}

	#[test]
	fn peak_tag_is_not_compared() {
		let a = GpsEphemeris{ i_peak: 1, ..GpsEphemeris::default() };
		let b = GpsEphemeris{ i_peak: 2, ..GpsEphemeris::default() };
		assert!(a.differing_fields(&b).is_empty());
	}

}
