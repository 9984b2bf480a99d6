
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use log::{info, warn};

pub mod records;
pub mod xml;

use self::records::{GpsAlmanac, GpsEphemeris, GpsIono, GpsRefTime, GpsUtcModel,
	RawSuplAlmanac, RawSuplEphemeris, RawSuplIono, RawSuplRefTime, RawSuplUtc};
use self::xml::{load_map_xml, save_map_xml};

/* Second, independent source of navigation data for the detector to compare
the broadcast message against.  Single writer (refresh), many readers; an
empty cache is a valid state and simply means the external checks stand
down. */

pub const EPHEMERIS_XML:&str   = "ephemeris.xml";
pub const UTC_XML:&str         = "utc.xml";
pub const IONO_XML:&str        = "iono.xml";
pub const REF_TIME_XML:&str    = "ref_time.xml";
pub const GPS_ALMANAC_XML:&str = "gps_almanac.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistanceKind {
	Ephemeris,
	Iono,
	Utc,
	Almanac,
	RefTime,
}

#[derive(Debug, Clone)]
pub enum AssistanceSource {
	/// No external source configured; the cache stays empty
	Disabled,
	SuplServer{ server:String, port:u16, mcc:i32, mns:i32, lac:i32, ci:i32 },
	LocalFiles{ directory:PathBuf },
}

/// Raw decoded assistance as the SUPL/RRLP transport delivers it
#[derive(Debug, Clone, Default)]
pub struct RawAssistance {
	pub ref_time:Option<RawSuplRefTime>,
	pub utc:Option<RawSuplUtc>,
	pub iono:Option<RawSuplIono>,
	pub ephemerides:Vec<RawSuplEphemeris>,
	pub almanacs:Vec<RawSuplAlmanac>,
}

/// The over-the-wire SUPL client lives outside this crate; the cache only
/// sees decoded records through this seam
pub trait SuplTransport: Send + Sync {
	fn get_assistance(&self, mcc:i32, mns:i32, lac:i32, ci:i32, kind:AssistanceKind)
		-> Result<RawAssistance, &'static str>;
}

#[derive(Default)]
struct CacheInner {
	ephemeris: HashMap<usize, GpsEphemeris>,
	iono:      Option<GpsIono>,
	utc:       Option<GpsUtcModel>,
	almanac:   HashMap<usize, GpsAlmanac>,
	ref_time:  Option<GpsRefTime>,
}

pub struct AssistanceCache {
	source:    AssistanceSource,
	cache_dir: PathBuf,
	transport: Option<Box<dyn SuplTransport>>,
	inner:     RwLock<CacheInner>,
}

/// Default location for the XML archives
pub fn default_cache_dir() -> PathBuf {
	dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("sentry_radio")
}

impl AssistanceCache {

	pub fn disabled() -> Self {
		AssistanceCache{ source: AssistanceSource::Disabled, cache_dir: PathBuf::new(),
			transport: None, inner: RwLock::new(CacheInner::default()) }
	}

	pub fn from_directory(directory:PathBuf) -> Self {
		AssistanceCache{ source: AssistanceSource::LocalFiles{ directory: directory.clone() },
			cache_dir: directory, transport: None, inner: RwLock::new(CacheInner::default()) }
	}

	pub fn from_supl(server:String, port:u16, mcc:i32, mns:i32, lac:i32, ci:i32,
		transport:Box<dyn SuplTransport>, cache_dir:PathBuf) -> Self {
		AssistanceCache{ source: AssistanceSource::SuplServer{ server, port, mcc, mns, lac, ci },
			cache_dir, transport: Some(transport), inner: RwLock::new(CacheInner::default()) }
	}

	/// Repopulates one kind of record from the configured source.  A SUPL
	/// refresh that succeeds is persisted to the XML archives so the next
	/// run can fall back to files.
	pub fn refresh(&self, kind:AssistanceKind) -> Result<(), &'static str> {
		match &self.source {
			AssistanceSource::Disabled => Ok(()),
			AssistanceSource::LocalFiles{ directory } => self.load_from_files(directory.clone(), kind),
			AssistanceSource::SuplServer{ server, mcc, mns, lac, ci, .. } => {
				let transport = self.transport.as_ref().ok_or("SUPL source configured without a transport")?;
				info!("requesting {:?} assistance from {}", kind, server);
				let raw = transport.get_assistance(*mcc, *mns, *lac, *ci, kind)?;
				self.ingest_raw(&raw);
				self.persist(kind)?;
				Ok(())
			},
		}
	}

	fn load_from_files(&self, directory:PathBuf, kind:AssistanceKind) -> Result<(), &'static str> {
		let mut inner = self.inner.write().unwrap();
		match kind {
			AssistanceKind::Ephemeris => {
				inner.ephemeris = load_map_xml::<GpsEphemeris>(&directory.join(EPHEMERIS_XML))?;
				info!("loaded {} ephemeris records from {:?}", inner.ephemeris.len(), directory);
			},
			AssistanceKind::Iono => {
				let map = load_map_xml::<GpsIono>(&directory.join(IONO_XML))?;
				inner.iono = map.get(&0).copied();
			},
			AssistanceKind::Utc => {
				let map = load_map_xml::<GpsUtcModel>(&directory.join(UTC_XML))?;
				inner.utc = map.get(&0).copied();
			},
			AssistanceKind::Almanac => {
				inner.almanac = load_map_xml::<GpsAlmanac>(&directory.join(GPS_ALMANAC_XML))?;
			},
			AssistanceKind::RefTime => {
				let map = load_map_xml::<GpsRefTime>(&directory.join(REF_TIME_XML))?;
				inner.ref_time = map.get(&0).copied();
			},
		}
		Ok(())
	}

	/// Applies the IS-GPS-200 LSB scalings and stores the results
	pub fn ingest_raw(&self, raw:&RawAssistance) {
		let mut inner = self.inner.write().unwrap();

		if let Some(rt) = raw.ref_time { inner.ref_time = Some(rt.scaled()); }
		if let Some(utc) = raw.utc { inner.utc = Some(utc.scaled()); }
		if let Some(iono) = raw.iono { inner.iono = Some(iono.scaled()); }

		// Ephemeris week and TOW are stamped from reference time when we
		// have one
		let (week, tow) = match inner.ref_time {
			Some(rt) if rt.valid => (rt.d_Week as i32, rt.d_TOW),
			_ => (0, 0.0),
		};
		for raw_eph in &raw.ephemerides {
			inner.ephemeris.insert(raw_eph.prn as usize, raw_eph.scaled(week, tow));
		}
		for raw_alm in &raw.almanacs {
			inner.almanac.insert(raw_alm.prn as usize, raw_alm.scaled());
		}
	}

	fn persist(&self, kind:AssistanceKind) -> Result<(), &'static str> {
		if self.cache_dir.as_os_str().is_empty() { return Ok(()); }
		std::fs::create_dir_all(&self.cache_dir).map_err(|_| "unable to create assistance cache directory")?;

		let inner = self.inner.read().unwrap();
		match kind {
			AssistanceKind::Ephemeris => save_map_xml(&self.cache_dir.join(EPHEMERIS_XML), &inner.ephemeris),
			AssistanceKind::Almanac   => save_map_xml(&self.cache_dir.join(GPS_ALMANAC_XML), &inner.almanac),
			AssistanceKind::Iono => {
				let mut map:HashMap<usize, GpsIono> = HashMap::new();
				if let Some(iono) = inner.iono { map.insert(0, iono); }
				save_map_xml(&self.cache_dir.join(IONO_XML), &map)
			},
			AssistanceKind::Utc => {
				let mut map:HashMap<usize, GpsUtcModel> = HashMap::new();
				if let Some(utc) = inner.utc { map.insert(0, utc); }
				save_map_xml(&self.cache_dir.join(UTC_XML), &map)
			},
			AssistanceKind::RefTime => {
				let mut map:HashMap<usize, GpsRefTime> = HashMap::new();
				if let Some(rt) = inner.ref_time { map.insert(0, rt); }
				save_map_xml(&self.cache_dir.join(REF_TIME_XML), &map)
			},
		}
	}

	/// Loads every kind the configured source can provide, logging rather
	/// than failing on the ones it cannot
	pub fn refresh_all(&self) {
		for kind in [AssistanceKind::RefTime, AssistanceKind::Utc, AssistanceKind::Iono,
			AssistanceKind::Almanac, AssistanceKind::Ephemeris].iter() {
			if let Err(e) = self.refresh(*kind) {
				warn!("assistance refresh of {:?} failed: {}", kind, e);
			}
		}
	}

	pub fn get_ephemeris(&self, prn:usize) -> Option<GpsEphemeris> {
		self.inner.read().unwrap().ephemeris.get(&prn).cloned()
	}

	pub fn get_iono(&self) -> Option<GpsIono> {
		self.inner.read().unwrap().iono
	}

	pub fn get_utc(&self) -> Option<GpsUtcModel> {
		self.inner.read().unwrap().utc
	}

	pub fn get_almanac_map(&self) -> HashMap<usize, GpsAlmanac> {
		self.inner.read().unwrap().almanac.clone()
	}

	pub fn get_ref_time(&self) -> Option<GpsRefTime> {
		self.inner.read().unwrap().ref_time
	}

	pub fn is_empty(&self) -> bool {
		let inner = self.inner.read().unwrap();
		inner.ephemeris.is_empty() && inner.iono.is_none() && inner.utc.is_none()
			&& inner.almanac.is_empty() && inner.ref_time.is_none()
	}

	// Direct insertion, used by tests and by receivers fed from RINEX-style
	// side channels
	pub fn insert_ephemeris(&self, prn:usize, eph:GpsEphemeris) {
		self.inner.write().unwrap().ephemeris.insert(prn, eph);
	}

	pub fn set_iono(&self, iono:GpsIono) { self.inner.write().unwrap().iono = Some(iono); }

	pub fn set_utc(&self, utc:GpsUtcModel) { self.inner.write().unwrap().utc = Some(utc); }

	pub fn insert_almanac(&self, prn:usize, alm:GpsAlmanac) {
		self.inner.write().unwrap().almanac.insert(prn, alm);
	}

	pub fn set_ref_time(&self, rt:GpsRefTime) { self.inner.write().unwrap().ref_time = Some(rt); }

}

#[cfg(test)]
mod tests {

	use super::*;

	struct CannedTransport {
		raw: RawAssistance,
	}

	impl SuplTransport for CannedTransport {
		fn get_assistance(&self, _mcc:i32, _mns:i32, _lac:i32, _ci:i32, _kind:AssistanceKind)
			-> Result<RawAssistance, &'static str> {
			Ok(self.raw.clone())
		}
	}

	#[test]
	fn disabled_cache_is_empty_and_refreshable() {
		let cache = AssistanceCache::disabled();
		assert!(cache.is_empty());
		assert!(cache.refresh(AssistanceKind::Ephemeris).is_ok());
		assert!(cache.is_empty());
	}

	#[test]
	fn supl_refresh_scales_and_persists() {
		let dir = tempfile::tempdir().unwrap();

		let raw = RawAssistance{
			ref_time: Some(RawSuplRefTime{ gps_week: 2048, gps_tow: 4320000, tv_sec: 0, tv_usec: 0 }),
			ephemerides: vec![RawSuplEphemeris{ prn: 3, IODC: 55, A_sqrt: 2702931556, ..RawSuplEphemeris::default() }],
			..RawAssistance::default()
		};
		let cache = AssistanceCache::from_supl("supl.example.net".to_string(), 7275,
			244, 5, 0x59e2, 0x31b0, Box::new(CannedTransport{ raw }), dir.path().to_path_buf());

		cache.refresh(AssistanceKind::RefTime).unwrap();
		cache.refresh(AssistanceKind::Ephemeris).unwrap();

		let eph = cache.get_ephemeris(3).unwrap();
		assert_eq!(eph.d_IODC, 55.0);
		assert_eq!(eph.i_GPS_week, 2048);
		assert!(dir.path().join(EPHEMERIS_XML).exists());

		// A second cache pointed at the archive directory sees the same data
		let reloaded = AssistanceCache::from_directory(dir.path().to_path_buf());
		reloaded.refresh(AssistanceKind::Ephemeris).unwrap();
		assert_eq!(reloaded.get_ephemeris(3).unwrap(), eph);
	}

	#[test]
	fn file_refresh_from_empty_directory_fails_but_cache_survives() {
		let dir = tempfile::tempdir().unwrap();
		let cache = AssistanceCache::from_directory(dir.path().to_path_buf());
		assert!(cache.refresh(AssistanceKind::Iono).is_err());
		assert!(cache.is_empty());
	}

}
