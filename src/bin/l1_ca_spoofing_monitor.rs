
use std::collections::VecDeque;
use std::path::PathBuf;

use clap::{App, Arg};
use colored::*;
use serde::{Serialize, Deserialize};

use sentry_radio::assistance::AssistanceCache;
use sentry_radio::gnss::acquisition::{make_peak_acquisition, AcqOutcome};
use sentry_radio::gnss::acquisition::peak_pcps::PeakAcquisition;
use sentry_radio::gnss::gps_l1_ca::signal_modulation;
use sentry_radio::io;
use sentry_radio::receiver::ReceiverContext;
use sentry_radio::spoofing::{alert_bus, SpoofingAlert};
use sentry_radio::spoofing::detector::{DetectorConfig, SpoofingDetector};

#[derive(Debug, Serialize, Deserialize)]
struct AcquisitionHit {
	prn:usize,
	peak_rank:usize,
	uid:usize,
	code_phase:usize,
	doppler_hz:f64,
	test_stat:f64,
	sample_stamp:usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct MonitorSummary {
	acquisitions:Vec<AcquisitionHit>,
	alerts:Vec<SpoofingAlert>,
}

fn main() {

	env_logger::init();

	let matches = App::new("GPS L1 C/A Spoofing Monitor")
		.version("0.1.0")
		.about("Takes IQ samples centered on 1575.42 MHz, chases auxiliary correlation peaks, and reports spoofing indications")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input filename with interleaved LE i16 I/Q samples")
			.required(true).takes_value(true))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true).required(true))
		.arg(Arg::with_name("num_peaks_per_prn")
			.short("p").long("num_peaks_per_prn")
			.help("How many auxiliary correlation peaks to chase per PRN")
			.takes_value(true).default_value("2"))
		.arg(Arg::with_name("test_stat_threshold")
			.short("t").long("test_stat_threshold")
			.takes_value(true).default_value("0.008"))
		.arg(Arg::with_name("pfa")
			.long("pfa")
			.help("Derive the acquisition threshold from a false alarm probability instead")
			.takes_value(true))
		.arg(Arg::with_name("doppler_max_hz")
			.long("doppler_max_hz")
			.takes_value(true).default_value("10000"))
		.arg(Arg::with_name("doppler_step_hz")
			.long("doppler_step_hz")
			.takes_value(true).default_value("500"))
		.arg(Arg::with_name("assistance_dir")
			.short("a").long("assistance_dir")
			.help("Directory holding the assistance XML archives; enables the external navigation checks")
			.takes_value(true))
		.arg(Arg::with_name("max_alt_km")
			.long("max_alt_km")
			.takes_value(true).default_value("20"))
		.get_matches();

	let fname:&str = matches.value_of("filename").unwrap();
	let fs:f64 = matches.value_of("sample_rate_sps").unwrap().parse().unwrap();
	let num_peaks:usize = matches.value_of("num_peaks_per_prn").unwrap().parse().unwrap();
	let threshold:f64 = matches.value_of("test_stat_threshold").unwrap().parse().unwrap();
	let doppler_max_hz:f64 = matches.value_of("doppler_max_hz").unwrap().parse().unwrap();
	let doppler_step_hz:f64 = matches.value_of("doppler_step_hz").unwrap().parse().unwrap();
	let max_alt_km:f64 = matches.value_of("max_alt_km").unwrap().parse().unwrap();
	let assistance_dir:Option<PathBuf> = matches.value_of("assistance_dir").map(PathBuf::from);

	eprintln!("Monitoring {} at {} [samples/sec], {} peaks per PRN", &fname, &fs, &num_peaks);

	let cache = match &assistance_dir {
		Some(dir) => {
			let cache = AssistanceCache::from_directory(dir.clone());
			cache.refresh_all();
			cache
		},
		None => AssistanceCache::disabled(),
	};
	let ctx = ReceiverContext::new(cache);

	let (alert_tx, alert_rx) = alert_bus();
	let config = DetectorConfig{
		external_nav_check: assistance_dir.is_some(),
		max_alt_km,
		..DetectorConfig::default()
	};
	let mut detector = SpoofingDetector::new(&config, alert_tx);

	// One engine per (PRN, peak rank); rank 1 is the ordinary primary-peak
	// search, higher ranks chase replicas
	let mut engines:VecDeque<(usize, usize, PeakAcquisition)> = (1..=32_usize)
		.flat_map(|prn| (1..=num_peaks).map(move |rank| (prn, rank)))
		.map(|(prn, rank)| {
			let symbol = signal_modulation::prn_int_sampled(prn, fs);
			let mut acq = make_peak_acquisition(symbol, fs, prn, threshold,
				doppler_max_hz, doppler_step_hz, rank, 1, false);
			if let Some(pfa) = matches.value_of("pfa") {
				acq.set_pfa(pfa.parse().unwrap());
			}
			(prn, rank, acq)
		}).collect();

	let block_len:usize = engines.front().map(|(_, _, acq)| acq.len_fft).unwrap_or(0);
	let tick_interval_blocks:usize = 100;	// one detector pass per 100 ms of signal

	let mut block:Vec<_> = Vec::with_capacity(block_len);
	let mut block_count:usize = 0;
	let mut summary = MonitorSummary{ acquisitions: vec![], alerts: vec![] };

	for s in io::iq_file_source(&fname).expect("cannot open the capture file") {
		block.push(s.val);
		if block.len() < block_len { continue; }

		block_count += 1;
		let timestamp_ms:f64 = (s.idx as f64) / fs * 1e3;

		// Round-robin: one engine gets this block, so a full constellation
		// sweep costs num_engines milliseconds of signal
		if let Some((prn, rank, mut acq)) = engines.pop_front() {
			if let AcqOutcome::Positive(res) = acq.run(&block, s.idx) {
				let uid = ctx.registry.allocate(prn, rank);
				eprintln!("{}", format!("PRN {} peak {}: acquired as channel {} at {} [Hz], code phase {}, test stat {:.4}",
					prn, rank, uid, res.doppler_hz, res.code_phase, res.test_stat).green());
				summary.acquisitions.push(AcquisitionHit{ prn, peak_rank: rank, uid,
					code_phase: res.code_phase, doppler_hz: res.doppler_hz,
					test_stat: res.test_stat, sample_stamp: res.sample_stamp });
			}
			engines.push_back((prn, rank, acq));
		}

		if block_count % tick_interval_blocks == 0 {
			detector.tick(&ctx, &[], timestamp_ms);
		}

		for alert in alert_rx.try_iter() {
			eprintln!("{}", format!("SPOOFING case {}: {}", alert.spoofing_case, alert.description).red().bold());
			summary.alerts.push(alert);
		}

		block.clear();
	}

	for alert in alert_rx.try_iter() {
		summary.alerts.push(alert);
	}

	println!("{}", serde_json::to_string_pretty(&summary).unwrap());

}
