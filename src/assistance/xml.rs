
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::assistance::records::{GpsAlmanac, GpsEphemeris, GpsIono, GpsRefTime, GpsUtcModel};

/* Explicit XML mapping for the assistance archives.  The element names equal
the record field names and the archives are read by tools outside this
receiver, so the schema here is the contract; serde stays out of it on
purpose.  Floats are written in shortest round-trip form, which makes a
save/load cycle bit-exact. */

pub trait XmlMapped: Sized {
	// Root element of the archive holding this record type
	const TAG:&'static str;

	fn to_fields(&self) -> Vec<(&'static str, String)>;
	fn from_fields(fields:&HashMap<String, String>) -> Result<Self, &'static str>;
}

fn fmt_f64(v:f64) -> String { format!("{:?}", v) }

fn get<'a>(fields:&'a HashMap<String, String>, name:&str) -> Result<&'a str, &'static str> {
	fields.get(name).map(|s| s.as_str()).ok_or("missing field in XML record")
}

fn get_f64(fields:&HashMap<String, String>, name:&str) -> Result<f64, &'static str> {
	get(fields, name)?.parse().map_err(|_| "malformed float in XML record")
}

fn get_i32(fields:&HashMap<String, String>, name:&str) -> Result<i32, &'static str> {
	get(fields, name)?.parse().map_err(|_| "malformed integer in XML record")
}

fn get_u32(fields:&HashMap<String, String>, name:&str) -> Result<u32, &'static str> {
	get(fields, name)?.parse().map_err(|_| "malformed integer in XML record")
}

fn get_bool(fields:&HashMap<String, String>, name:&str) -> Result<bool, &'static str> {
	match get(fields, name)? {
		"true"  | "1" => Ok(true),
		"false" | "0" => Ok(false),
		_ => Err("malformed boolean in XML record"),
	}
}

/// Every `<entry key="N">...</entry>` block under the archive root
fn parse_entries(text:&str) -> Vec<(usize, &str)> {
	let mut out:Vec<(usize, &str)> = vec![];
	let mut rest = text;
	while let Some(start) = rest.find("<entry key=\"") {
		let after = &rest[start + "<entry key=\"".len()..];
		let key_end = match after.find('"') { Some(i) => i, None => break };
		let key:usize = match after[..key_end].parse() { Ok(k) => k, Err(_) => break };
		let body_start = match after.find('>') { Some(i) => i + 1, None => break };
		let body = &after[body_start..];
		let end = match body.find("</entry>") { Some(i) => i, None => break };
		out.push((key, &body[..end]));
		rest = &body[end..];
	}
	out
}

/// Flat `<name>value</name>` pairs inside one entry
fn parse_fields(block:&str) -> HashMap<String, String> {
	let mut fields:HashMap<String, String> = HashMap::new();
	let mut rest = block;
	while let Some(start) = rest.find('<') {
		let after = &rest[start+1..];
		if after.starts_with('/') {
			rest = &after[1..];
			continue;
		}
		let name_end = match after.find('>') { Some(i) => i, None => break };
		let name = &after[..name_end];
		if name.is_empty() || name.starts_with('?') || name.contains(' ') {
			rest = &after[name_end+1..];
			continue;
		}
		let body = &after[name_end+1..];
		let close = format!("</{}>", name);
		match body.find(&close) {
			Some(i) => {
				fields.insert(name.to_string(), body[..i].trim().to_string());
				rest = &body[i + close.len()..];
			},
			None => break,
		}
	}
	fields
}

pub fn save_map_xml<R:XmlMapped>(path:&Path, map:&HashMap<usize, R>) -> Result<(), &'static str> {
	let mut s = String::new();
	s.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
	s.push_str(&format!("<{}>\n", R::TAG));

	let mut keys:Vec<usize> = map.keys().copied().collect();
	keys.sort();
	for key in keys {
		s.push_str(&format!("\t<entry key=\"{}\">\n", key));
		for (name, value) in map[&key].to_fields() {
			s.push_str(&format!("\t\t<{}>{}</{}>\n", name, value, name));
		}
		s.push_str("\t</entry>\n");
	}

	s.push_str(&format!("</{}>\n", R::TAG));
	fs::write(path, s).map_err(|_| "unable to write XML archive")
}

pub fn load_map_xml<R:XmlMapped>(path:&Path) -> Result<HashMap<usize, R>, &'static str> {
	let text = fs::read_to_string(path).map_err(|_| "unable to read XML archive")?;
	let mut map:HashMap<usize, R> = HashMap::new();
	for (key, block) in parse_entries(&text) {
		let fields = parse_fields(block);
		map.insert(key, R::from_fields(&fields)?);
	}
	Ok(map)
}

impl XmlMapped for GpsEphemeris {

	const TAG:&'static str = "gps_ephemeris_map";

	fn to_fields(&self) -> Vec<(&'static str, String)> {
		vec![
			("i_satellite_PRN", self.i_satellite_PRN.to_string()),
			("i_peak", self.i_peak.to_string()),
			("d_TOW", fmt_f64(self.d_TOW)),
			("d_Crs", fmt_f64(self.d_Crs)),
			("d_Delta_n", fmt_f64(self.d_Delta_n)),
			("d_M_0", fmt_f64(self.d_M_0)),
			("d_Cuc", fmt_f64(self.d_Cuc)),
			("d_e_eccentricity", fmt_f64(self.d_e_eccentricity)),
			("d_Cus", fmt_f64(self.d_Cus)),
			("d_sqrt_A", fmt_f64(self.d_sqrt_A)),
			("d_Toe", fmt_f64(self.d_Toe)),
			("d_Toc", fmt_f64(self.d_Toc)),
			("d_Cic", fmt_f64(self.d_Cic)),
			("d_OMEGA0", fmt_f64(self.d_OMEGA0)),
			("d_Cis", fmt_f64(self.d_Cis)),
			("d_i_0", fmt_f64(self.d_i_0)),
			("d_Crc", fmt_f64(self.d_Crc)),
			("d_OMEGA", fmt_f64(self.d_OMEGA)),
			("d_OMEGA_DOT", fmt_f64(self.d_OMEGA_DOT)),
			("d_IDOT", fmt_f64(self.d_IDOT)),
			("i_code_on_L2", self.i_code_on_L2.to_string()),
			("i_GPS_week", self.i_GPS_week.to_string()),
			("b_L2_P_data_flag", self.b_L2_P_data_flag.to_string()),
			("i_SV_accuracy", self.i_SV_accuracy.to_string()),
			("i_SV_health", self.i_SV_health.to_string()),
			("d_TGD", fmt_f64(self.d_TGD)),
			("d_IODC", fmt_f64(self.d_IODC)),
			("i_AODO", self.i_AODO.to_string()),
			("b_fit_interval_flag", self.b_fit_interval_flag.to_string()),
			("d_spare1", fmt_f64(self.d_spare1)),
			("d_spare2", fmt_f64(self.d_spare2)),
			("d_A_f0", fmt_f64(self.d_A_f0)),
			("d_A_f1", fmt_f64(self.d_A_f1)),
			("d_A_f2", fmt_f64(self.d_A_f2)),
			("b_integrity_status_flag", self.b_integrity_status_flag.to_string()),
			("b_alert_flag", self.b_alert_flag.to_string()),
			("b_antispoofing_flag", self.b_antispoofing_flag.to_string()),
		]
	}

	fn from_fields(fields:&HashMap<String, String>) -> Result<Self, &'static str> {
		Ok(GpsEphemeris{
			i_satellite_PRN: get_u32(fields, "i_satellite_PRN")?,
			i_peak: get_u32(fields, "i_peak")?,
			d_TOW: get_f64(fields, "d_TOW")?,
			d_Crs: get_f64(fields, "d_Crs")?,
			d_Delta_n: get_f64(fields, "d_Delta_n")?,
			d_M_0: get_f64(fields, "d_M_0")?,
			d_Cuc: get_f64(fields, "d_Cuc")?,
			d_e_eccentricity: get_f64(fields, "d_e_eccentricity")?,
			d_Cus: get_f64(fields, "d_Cus")?,
			d_sqrt_A: get_f64(fields, "d_sqrt_A")?,
			d_Toe: get_f64(fields, "d_Toe")?,
			d_Toc: get_f64(fields, "d_Toc")?,
			d_Cic: get_f64(fields, "d_Cic")?,
			d_OMEGA0: get_f64(fields, "d_OMEGA0")?,
			d_Cis: get_f64(fields, "d_Cis")?,
			d_i_0: get_f64(fields, "d_i_0")?,
			d_Crc: get_f64(fields, "d_Crc")?,
			d_OMEGA: get_f64(fields, "d_OMEGA")?,
			d_OMEGA_DOT: get_f64(fields, "d_OMEGA_DOT")?,
			d_IDOT: get_f64(fields, "d_IDOT")?,
			i_code_on_L2: get_i32(fields, "i_code_on_L2")?,
			i_GPS_week: get_i32(fields, "i_GPS_week")?,
			b_L2_P_data_flag: get_bool(fields, "b_L2_P_data_flag")?,
			i_SV_accuracy: get_i32(fields, "i_SV_accuracy")?,
			i_SV_health: get_i32(fields, "i_SV_health")?,
			d_TGD: get_f64(fields, "d_TGD")?,
			d_IODC: get_f64(fields, "d_IODC")?,
			i_AODO: get_i32(fields, "i_AODO")?,
			b_fit_interval_flag: get_bool(fields, "b_fit_interval_flag")?,
			d_spare1: get_f64(fields, "d_spare1")?,
			d_spare2: get_f64(fields, "d_spare2")?,
			d_A_f0: get_f64(fields, "d_A_f0")?,
			d_A_f1: get_f64(fields, "d_A_f1")?,
			d_A_f2: get_f64(fields, "d_A_f2")?,
			b_integrity_status_flag: get_bool(fields, "b_integrity_status_flag")?,
			b_alert_flag: get_bool(fields, "b_alert_flag")?,
			b_antispoofing_flag: get_bool(fields, "b_antispoofing_flag")?,
		})
	}

}

impl XmlMapped for GpsIono {

	const TAG:&'static str = "gps_iono_map";

	fn to_fields(&self) -> Vec<(&'static str, String)> {
		vec![
			("d_alpha0", fmt_f64(self.d_alpha0)),
			("d_alpha1", fmt_f64(self.d_alpha1)),
			("d_alpha2", fmt_f64(self.d_alpha2)),
			("d_alpha3", fmt_f64(self.d_alpha3)),
			("d_beta0", fmt_f64(self.d_beta0)),
			("d_beta1", fmt_f64(self.d_beta1)),
			("d_beta2", fmt_f64(self.d_beta2)),
			("d_beta3", fmt_f64(self.d_beta3)),
			("valid", self.valid.to_string()),
		]
	}

	fn from_fields(fields:&HashMap<String, String>) -> Result<Self, &'static str> {
		Ok(GpsIono{
			d_alpha0: get_f64(fields, "d_alpha0")?,
			d_alpha1: get_f64(fields, "d_alpha1")?,
			d_alpha2: get_f64(fields, "d_alpha2")?,
			d_alpha3: get_f64(fields, "d_alpha3")?,
			d_beta0: get_f64(fields, "d_beta0")?,
			d_beta1: get_f64(fields, "d_beta1")?,
			d_beta2: get_f64(fields, "d_beta2")?,
			d_beta3: get_f64(fields, "d_beta3")?,
			valid: get_bool(fields, "valid")?,
		})
	}

}

impl XmlMapped for GpsUtcModel {

	const TAG:&'static str = "gps_utc_map";

	fn to_fields(&self) -> Vec<(&'static str, String)> {
		vec![
			("d_A1", fmt_f64(self.d_A1)),
			("d_A0", fmt_f64(self.d_A0)),
			("d_t_OT", fmt_f64(self.d_t_OT)),
			("i_WN_T", self.i_WN_T.to_string()),
			("d_DeltaT_LS", fmt_f64(self.d_DeltaT_LS)),
			("i_WN_LSF", self.i_WN_LSF.to_string()),
			("i_DN", self.i_DN.to_string()),
			("d_DeltaT_LSF", fmt_f64(self.d_DeltaT_LSF)),
			("valid", self.valid.to_string()),
		]
	}

	fn from_fields(fields:&HashMap<String, String>) -> Result<Self, &'static str> {
		Ok(GpsUtcModel{
			d_A1: get_f64(fields, "d_A1")?,
			d_A0: get_f64(fields, "d_A0")?,
			d_t_OT: get_f64(fields, "d_t_OT")?,
			i_WN_T: get_i32(fields, "i_WN_T")?,
			d_DeltaT_LS: get_f64(fields, "d_DeltaT_LS")?,
			i_WN_LSF: get_i32(fields, "i_WN_LSF")?,
			i_DN: get_i32(fields, "i_DN")?,
			d_DeltaT_LSF: get_f64(fields, "d_DeltaT_LSF")?,
			valid: get_bool(fields, "valid")?,
		})
	}

}

impl XmlMapped for GpsAlmanac {

	const TAG:&'static str = "gps_almanac_map";

	fn to_fields(&self) -> Vec<(&'static str, String)> {
		vec![
			("i_satellite_PRN", self.i_satellite_PRN.to_string()),
			("d_Delta_i", fmt_f64(self.d_Delta_i)),
			("i_Toa", self.i_Toa.to_string()),
			("d_M_0", fmt_f64(self.d_M_0)),
			("d_e_eccentricity", fmt_f64(self.d_e_eccentricity)),
			("d_sqrt_A", fmt_f64(self.d_sqrt_A)),
			("d_OMEGA0", fmt_f64(self.d_OMEGA0)),
			("d_OMEGA", fmt_f64(self.d_OMEGA)),
			("d_OMEGA_DOT", fmt_f64(self.d_OMEGA_DOT)),
			("i_SV_health", self.i_SV_health.to_string()),
			("d_A_f0", fmt_f64(self.d_A_f0)),
			("d_A_f1", fmt_f64(self.d_A_f1)),
		]
	}

	fn from_fields(fields:&HashMap<String, String>) -> Result<Self, &'static str> {
		Ok(GpsAlmanac{
			i_satellite_PRN: get_u32(fields, "i_satellite_PRN")?,
			d_Delta_i: get_f64(fields, "d_Delta_i")?,
			i_Toa: get_i32(fields, "i_Toa")?,
			d_M_0: get_f64(fields, "d_M_0")?,
			d_e_eccentricity: get_f64(fields, "d_e_eccentricity")?,
			d_sqrt_A: get_f64(fields, "d_sqrt_A")?,
			d_OMEGA0: get_f64(fields, "d_OMEGA0")?,
			d_OMEGA: get_f64(fields, "d_OMEGA")?,
			d_OMEGA_DOT: get_f64(fields, "d_OMEGA_DOT")?,
			i_SV_health: get_i32(fields, "i_SV_health")?,
			d_A_f0: get_f64(fields, "d_A_f0")?,
			d_A_f1: get_f64(fields, "d_A_f1")?,
		})
	}

}

impl XmlMapped for GpsRefTime {

	const TAG:&'static str = "gps_ref_time_map";

	fn to_fields(&self) -> Vec<(&'static str, String)> {
		vec![
			("d_TOW", fmt_f64(self.d_TOW)),
			("d_Week", fmt_f64(self.d_Week)),
			("d_tv_sec", fmt_f64(self.d_tv_sec)),
			("d_tv_usec", fmt_f64(self.d_tv_usec)),
			("valid", self.valid.to_string()),
		]
	}

	fn from_fields(fields:&HashMap<String, String>) -> Result<Self, &'static str> {
		Ok(GpsRefTime{
			d_TOW: get_f64(fields, "d_TOW")?,
			d_Week: get_f64(fields, "d_Week")?,
			d_tv_sec: get_f64(fields, "d_tv_sec")?,
			d_tv_usec: get_f64(fields, "d_tv_usec")?,
			valid: get_bool(fields, "valid")?,
		})
	}

}

#[cfg(test)]
mod tests {

	use std::collections::HashMap;

	use crate::assistance::records::{GpsEphemeris, GpsRefTime, RawSuplEphemeris};

	use super::*;

	#[test]
	fn ephemeris_round_trip_is_exact() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ephemeris.xml");

		let raw = RawSuplEphemeris{ prn: 3, delta_n: -1234, M0: 987654, A_sqrt: 2702931556,
			e: 13441524, AF0: -317, AF1: 7, AF2: 1, toe: 3600, toc: 3600, IODC: 55,
			tgd: -12, ..RawSuplEphemeris::default() };
		let mut map:HashMap<usize, GpsEphemeris> = HashMap::new();
		map.insert(3, raw.scaled(2048, 345600.0));

		save_map_xml(&path, &map).unwrap();
		let loaded:HashMap<usize, GpsEphemeris> = load_map_xml(&path).unwrap();

		assert_eq!(loaded.len(), 1);
		assert_eq!(loaded[&3], map[&3]);

		// Saving what was loaded reproduces the file byte for byte
		let first = std::fs::read(&path).unwrap();
		save_map_xml(&path, &loaded).unwrap();
		let second = std::fs::read(&path).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn ref_time_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ref_time.xml");

		let mut map:HashMap<usize, GpsRefTime> = HashMap::new();
		map.insert(0, GpsRefTime{ d_TOW: 345600.08, d_Week: 2048.0, d_tv_sec: 1.0, d_tv_usec: 250.0, valid: true });

		save_map_xml(&path, &map).unwrap();
		let loaded:HashMap<usize, GpsRefTime> = load_map_xml(&path).unwrap();
		assert_eq!(loaded[&0], map[&0]);
	}

	#[test]
	fn missing_field_is_an_error() {
		let mut fields:HashMap<String, String> = HashMap::new();
		fields.insert("d_TOW".to_string(), "1.0".to_string());
		assert!(GpsRefTime::from_fields(&fields).is_err());
	}

	#[test]
	fn load_of_absent_file_fails_cleanly() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nope.xml");
		assert!(load_map_xml::<GpsRefTime>(&path).is_err());
	}

}
