// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::{tempdir, Builder};

use super::*;
use crate::{
    constants::RFI_SENTINEL,
    io::{write_byte_mask, write_spectrogram},
    spectrogram::Spectrogram,
};

/// 10 channels at 100, 110, ..., 190 MHz; every sample is 1.
fn flat_band(height: usize) -> Spectrogram<'static> {
    let mut s = Spectrogram::from_vec(10, height, vec![1.0; 10 * height]).unwrap();
    s.calibration.start_freq = 100.0;
    s.calibration.stop_freq = 190.0;
    s.calibration.integration_time = 1.0;
    s
}

#[test]
fn test_flag_with_mask() {
    let mut s = Spectrogram::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let mask = Spectrogram::from_vec(2, 2, vec![0.0, 1.0, 0.5, -1.0]).unwrap();
    assert_eq!(s.flag_row_with_mask(0, &mask), 1);
    assert_eq!(s.to_vec(), vec![1.0, RFI_SENTINEL, 3.0, 4.0]);
    assert_eq!(s.flag_row_with_mask(5, &mask), 0);
    assert_eq!(s.flag_all_with_mask(&mask), 2);
    assert_eq!(s.to_vec(), vec![1.0, RFI_SENTINEL, RFI_SENTINEL, 4.0]);

    let wrong = Spectrogram::new(3, 2);
    assert_eq!(s.flag_all_with_mask(&wrong), 0);
}

#[test]
fn test_rfi_mask_path() {
    let path = rfi_mask_path("/masks".as_ref(), "/data/2013/obs_001.fits".as_ref());
    assert_eq!(path.unwrap().to_str(), Some("/masks/obs_001_flag.fits"));
    assert!(rfi_mask_path("/masks".as_ref(), "/".as_ref()).is_none());
}

#[test]
fn test_flag_with_mask_from_dir() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("obs.fits");
    let mask_dir = dir.path().join("masks");

    write_spectrogram(&data_path, &flat_band(2)).unwrap();
    let mut mask = Spectrogram::new(10, 2);
    mask.set(3, 0, 1.0);
    mask.set(4, 1, 1.0);
    write_byte_mask(mask_dir.join("obs_flag.fits"), &mask).unwrap();

    let mut s = crate::io::read_spectrogram(&data_path, &Default::default()).unwrap();
    // No mask directory, no mask.
    assert!(!s.load_rfi_mask());
    assert_eq!(s.flag_all(), 0);

    s.set_mask_dir(Some(&mask_dir));
    assert_eq!(s.rfi_mask_path(), Some(mask_dir.join("obs_flag.fits")));
    assert!(s.load_rfi_mask());
    assert_eq!(s.rfi_mask().map(|m| m.width()), Some(10));
    assert_eq!(s.flag_row(1), 1);
    assert_abs_diff_eq!(s.get(4, 1), RFI_SENTINEL);
    assert_abs_diff_eq!(s.get(3, 0), 1.0);
    assert_eq!(s.flag_all(), 2);
    assert_abs_diff_eq!(s.get(3, 0), RFI_SENTINEL);

    // A data file without a mask.
    s.set_file_name(dir.path().join("other.fits"));
    assert!(!s.load_rfi_mask());
    assert_eq!(s.flag_all(), 0);
}

#[test]
fn test_mask_cache_follows_the_source() {
    let dir = tempdir().unwrap();
    let a = Spectrogram::from_vec(2, 1, vec![1.0, 0.0]).unwrap();
    let b = Spectrogram::from_vec(2, 1, vec![0.0, 1.0]).unwrap();
    write_byte_mask(dir.path().join("a_flag.fits"), &a).unwrap();
    write_byte_mask(dir.path().join("b_flag.fits"), &b).unwrap();

    let mut cache = MaskCache::new(dir.path());
    assert!(cache.cached().is_none());
    let mask = cache.resolve(Some("/data/a.fits".as_ref())).unwrap();
    assert_eq!(mask.to_vec(), vec![1.0, 0.0]);
    let mask = cache.resolve(Some("/data/b.fits".as_ref())).unwrap();
    assert_eq!(mask.to_vec(), vec![0.0, 1.0]);
    assert!(cache.resolve(Some("/data/c.fits".as_ref())).is_none());
    assert!(cache.cached().is_none());
    assert!(cache.resolve(None).is_none());

    cache.set_dir(None::<&str>);
    assert!(cache.resolve(Some("/data/a.fits".as_ref())).is_none());
}

#[test]
fn test_unreadable_mask_is_not_read_again() {
    let dir = tempdir().unwrap();
    let mut cache = MaskCache::new(dir.path());
    assert!(cache.resolve(Some("/data/a.fits".as_ref())).is_none());

    // The mask appears, but the failure for this path is remembered.
    let a = Spectrogram::from_vec(2, 1, vec![1.0, 0.0]).unwrap();
    write_byte_mask(dir.path().join("a_flag.fits"), &a).unwrap();
    assert!(cache.resolve(Some("/data/a.fits".as_ref())).is_none());

    // Looking for another mask and coming back reads it.
    assert!(cache.resolve(Some("/data/b.fits".as_ref())).is_none());
    let mask = cache.resolve(Some("/data/a.fits".as_ref())).unwrap();
    assert_eq!(mask.to_vec(), vec![1.0, 0.0]);

    // So does changing the directory.
    let mut cache = MaskCache::new(dir.path().join("nowhere"));
    assert!(cache.resolve(Some("/data/a.fits".as_ref())).is_none());
    cache.set_dir(Some(dir.path()));
    assert!(cache.resolve(Some("/data/a.fits".as_ref())).is_some());
}

#[test]
fn test_flagging_rows_with_a_missing_mask() {
    let dir = tempdir().unwrap();
    let mut s = flat_band(3);
    s.set_file_name(dir.path().join("obs.fits"));
    s.set_mask_dir(Some(dir.path()));
    for y in 0..3 {
        assert_eq!(s.flag_row(y), 0);
    }
    assert!(!s.load_rfi_mask());
    assert_eq!(s.to_vec(), vec![1.0; 30]);
}

#[test]
fn test_quiet_integration_is_accepted() {
    let s = flat_band(1);
    let outcome = s.check_integration(0, &RejectionConfig::default());
    assert!(outcome.accepted());
    assert_eq!(outcome.reasons.to_string(), "OK");
    assert_abs_diff_eq!(outcome.total_power, 10.0);
    assert_abs_diff_eq!(outcome.max_channel_power_dbm, 0.0);
    // Ties go to the later channel.
    assert_abs_diff_eq!(outcome.max_channel_freq, 190.0);
    assert_abs_diff_eq!(outcome.interference_power_dbm, 0.0);
    assert_abs_diff_eq!(outcome.local_threshold, -1.0);
    assert!(!outcome.flagged);
}

#[test]
fn test_total_power_limit() {
    let s = flat_band(2);
    let config = RejectionConfig {
        total_power_limits: vec![TotalPowerLimit {
            start: 0.0,
            end: 1.0,
            max_total_power: 5.0,
        }],
        ..Default::default()
    };
    assert_eq!(
        s.check_integration(0, &config).reasons,
        RejectionReasons::TOTAL_POWER
    );
    // Integration 1 starts at t = 1, outside the window.
    assert!(s.check_integration(1, &config).accepted());
}

#[test]
fn test_band_cut() {
    let s = flat_band(1);
    let config = RejectionConfig {
        band_cuts: vec![BandCut {
            start_mhz: 100.0,
            end_mhz: 120.0,
            max_total_power: 1.0,
        }],
        ..Default::default()
    };
    assert_eq!(
        s.check_integration(0, &config).reasons,
        RejectionReasons::BAND_POWER
    );
}

#[test]
fn test_channel_power() {
    let mut s = flat_band(1);
    s.set(6, 0, 1000.0);
    let config = RejectionConfig {
        max_channel_power_dbm: 20.0,
        interference_band_mhz: (500.0, 600.0),
        ..Default::default()
    };
    let outcome = s.check_integration(0, &config);
    assert_eq!(outcome.reasons, RejectionReasons::CHANNEL_POWER);
    assert_abs_diff_eq!(outcome.max_channel_power_dbm, 30.0, epsilon = 1e-9);
    assert_abs_diff_eq!(outcome.max_channel_freq, 160.0);
}

#[test]
fn test_interference_power() {
    let mut s = flat_band(1);
    // 137.1 - 138.5 MHz is channel 4 here.
    s.set(4, 0, 1000.0);
    let config = RejectionConfig {
        max_channel_power_dbm: 20.0,
        max_frequency_mhz: 105.0,
        ..Default::default()
    };
    let outcome = s.check_integration(0, &config);
    assert_eq!(outcome.reasons, RejectionReasons::INTERFERENCE_POWER);
    assert_abs_diff_eq!(outcome.interference_power_dbm, 30.0, epsilon = 1e-9);
}

#[test]
fn test_local_cut_and_combined_reasons() {
    let s = flat_band(1);
    let config = RejectionConfig {
        local_median_sigma: vec![LocalMedianSigma {
            unix_time: 0.0,
            median: 5.0,
            sigma: 1.0,
        }],
        band_cuts: vec![BandCut {
            start_mhz: 100.0,
            end_mhz: 120.0,
            max_total_power: 1.0,
        }],
        ..Default::default()
    };
    let outcome = s.check_integration(0, &config);
    assert_abs_diff_eq!(outcome.local_threshold, 8.0);
    assert_eq!(
        outcome.reasons,
        RejectionReasons::LOCAL_CUT | RejectionReasons::BAND_POWER
    );
    assert_eq!(outcome.reasons.bits(), 0x18);
    assert_eq!(outcome.reasons.to_string(), "BAND_POWER|LOCAL_CUT");
    assert!(!outcome.accepted());
}

#[test]
fn test_flagged_integrations_are_reported_only() {
    let mut s = flat_band(3);
    s.set_keyword_int("flag", 2);
    let config = RejectionConfig {
        flagged_integrations: vec![1],
        ..Default::default()
    };
    let outcomes = s.check_all_integrations(&config);
    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes.iter().map(|o| o.flagged).collect::<Vec<_>>(),
        vec![true, true, false]
    );
    assert!(outcomes.iter().all(|o| o.accepted()));
}

#[test]
fn test_rejection_reasons() {
    let mut r = RejectionReasons::empty();
    assert!(r.is_empty());
    r |= RejectionReasons::TOTAL_POWER;
    r.insert(RejectionReasons::CHANNEL_POWER);
    assert!(r.contains(RejectionReasons::TOTAL_POWER));
    assert!(!r.contains(RejectionReasons::LOCAL_CUT));
    assert_eq!(r.bits(), 0x03);
    assert_eq!(r.to_string(), "TOTAL_POWER|CHANNEL_POWER");
    assert_eq!(RejectionReasons::from_bits(0xff).bits(), 0x1f);
}

#[test]
fn test_tabulated_response() {
    let r = TabulatedResponse::new(vec![(200.0, 4.0), (100.0, 2.0)]);
    assert_eq!(r.points()[0], (100.0, 2.0));
    assert_abs_diff_eq!(r.gain(150.0), 3.0);
    assert_abs_diff_eq!(r.gain(50.0), 2.0);
    assert_abs_diff_eq!(r.power_to_mw(150.0, 30.0), 10.0);
    assert_abs_diff_eq!(r.power_to_dbm(150.0, 30.0), 10.0);
    assert_abs_diff_eq!(FlatResponse::default().power_to_dbm(0.0, 100.0), 20.0);
}

#[test]
fn test_config_time_lookups() {
    let config = RejectionConfig {
        total_power_limits: vec![
            TotalPowerLimit {
                start: 0.0,
                end: 10.0,
                max_total_power: 1.0,
            },
            TotalPowerLimit {
                start: 5.0,
                end: 20.0,
                max_total_power: 2.0,
            },
        ],
        local_median_sigma: vec![
            LocalMedianSigma {
                unix_time: 0.0,
                median: 10.0,
                sigma: 1.0,
            },
            LocalMedianSigma {
                unix_time: 10.0,
                median: 20.0,
                sigma: 3.0,
            },
        ],
        ..Default::default()
    };
    assert_eq!(config.total_power_limit(7.0), Some(1.0));
    assert_eq!(config.total_power_limit(10.0), Some(2.0));
    assert_eq!(config.total_power_limit(20.0), None);
    let (median, sigma) = config.local_median_sigma_at(5.0).unwrap();
    assert_abs_diff_eq!(median, 15.0);
    assert_abs_diff_eq!(sigma, 2.0);
    assert!(RejectionConfig::default().local_median_sigma_at(5.0).is_none());
}

#[test]
fn test_config_from_toml() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        indoc! {r#"
            max_channel_power_dbm = -30.0
            interference_band_mhz = [137.0, 139.0]
            flagged_integrations = [3, 7]
            response = [[100.0, 2.0], [200.0, 4.0]]

            [[total_power_limits]]
            start = 1400000000.0
            end = 1400086400.0
            max_total_power = 1e6

            [[band_cuts]]
            start_mhz = 88.0
            end_mhz = 108.0
            max_total_power = 50.0
        "#}
        .as_bytes(),
    )
    .unwrap();

    let config = RejectionConfig::from_file(file.path()).unwrap();
    assert_abs_diff_eq!(config.max_channel_power_dbm, -30.0);
    assert_eq!(config.interference_band_mhz, (137.0, 139.0));
    assert_eq!(config.flagged_integrations, vec![3, 7]);
    assert_eq!(config.total_power_limits.len(), 1);
    assert_eq!(config.band_cuts[0].start_mhz, 88.0);
    assert_eq!(config.response.as_ref().map(|r| r.points().len()), Some(2));
    // Unset fields keep their defaults.
    assert_eq!(
        config.max_frequency_mhz,
        RejectionConfig::default().max_frequency_mhz
    );
}

#[test]
fn test_config_from_json() {
    let mut file = Builder::new().suffix(".JSON").tempfile().unwrap();
    file.write_all(
        indoc! {r#"
            {
                "local_cut_sigmas": 5.0,
                "local_median_sigma": [
                    {"unix_time": 0.0, "median": 1.0, "sigma": 0.1}
                ]
            }
        "#}
        .as_bytes(),
    )
    .unwrap();

    let config = RejectionConfig::from_file(file.path()).unwrap();
    assert_abs_diff_eq!(config.local_cut_sigmas, 5.0);
    assert_eq!(config.local_median_sigma.len(), 1);
}

#[test]
fn test_config_errors() {
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"local_cut_sigmas: 5.0").unwrap();
    let result = RejectionConfig::from_file(file.path());
    assert!(matches!(
        result,
        Err(RejectionConfigError::UnknownExtension { .. })
    ));

    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(b"no_such_field = 1").unwrap();
    let result = RejectionConfig::from_file(file.path());
    assert!(matches!(result, Err(RejectionConfigError::Toml { .. })));

    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        indoc! {r#"
            [[band_cuts]]
            start_mhz = 108.0
            end_mhz = 88.0
            max_total_power = 50.0
        "#}
        .as_bytes(),
    )
    .unwrap();
    let result = RejectionConfig::from_file(file.path());
    assert!(matches!(
        result,
        Err(RejectionConfigError::BadBandCut { .. })
    ));

    let config = RejectionConfig {
        total_power_limits: vec![TotalPowerLimit {
            start: 10.0,
            end: 10.0,
            max_total_power: 1.0,
        }],
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(RejectionConfigError::BadTimeWindow { .. })
    ));
}
