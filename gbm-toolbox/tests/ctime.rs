mod common;

use anyhow::Result;
use approx::assert_abs_diff_eq;
use gbm_toolbox::errors::Error;
use gbm_toolbox::export::write_series_npz;
use gbm_toolbox::gbm_tools::rebin::{RebinParams, TailPolicy};
use gbm_toolbox::time::{epoch_to_met, met_to_epoch};
use gbm_toolbox::{bin_down_ctime, load_ctime, slice_ctime};
use uom::si::energy::kiloelectronvolt;
use uom::si::time::second;

fn counts(rows: usize, channels: usize) -> Vec<Vec<f32>> {
    (0..rows)
        .map(|i| (0..channels).map(|j| (i + 3 * j) as f32).collect())
        .collect()
}

#[test]
fn load_builds_one_more_edge_than_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("glg_ctime_n0.pha");
    common::ctime_file(&path, 600_000_000.0, &[0.256; 5], &counts(5, 8));

    let series = load_ctime(&path)?;
    assert_eq!(series.rows(), 5);
    assert_eq!(series.channels(), 8);
    assert_eq!(series.time_bins().len(), 6);
    assert_eq!(series.dt().len(), 5);
    assert_abs_diff_eq!(epoch_to_met(series.time_bins()[0]), 600_000_000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(
        epoch_to_met(series.time_bins()[5]),
        600_000_000.0 + 5.0 * 0.256,
        epsilon = 1e-6
    );
    assert_abs_diff_eq!(
        series.energy_bins()[[0, 0]].get::<kiloelectronvolt>(),
        4.0,
        epsilon = 1e-9
    );
    assert_abs_diff_eq!(series.counts()[[2, 1]], 5.0);
    Ok(())
}

#[test]
fn exposure_follows_its_declared_unit() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("glg_ctime_ms.pha");
    common::FitsWriter::new()
        .primary_key("DATATYPE", &common::text("CTIME"))
        .table(
            common::Table::new("EBOUNDS")
                .column(common::Column::f32("E_MIN", &[4.0]).with_unit("keV"))
                .column(common::Column::f32("E_MAX", &[8.0]).with_unit("keV")),
        )
        .table(
            common::Table::new("SPECTRUM")
                .column(common::Column::f32_vec("COUNTS", &[vec![3.0], vec![5.0]]))
                .column(common::Column::f64("EXPOSURE", &[256.0, 64.0]).with_unit("ms"))
                .column(common::Column::f64("TIME", &[100.0, 100.256]).with_unit("s")),
        )
        .write(&path);

    let series = load_ctime(&path)?;
    assert_abs_diff_eq!(series.dt()[0].get::<second>(), 0.256, epsilon = 1e-12);
    assert_abs_diff_eq!(series.dt()[1].get::<second>(), 0.064, epsilon = 1e-12);
    assert_abs_diff_eq!(epoch_to_met(series.time_bins()[2]), 100.32, epsilon = 1e-6);
    assert_abs_diff_eq!(series.count_rate()[[1, 0]], 5.0 / 0.064, epsilon = 1e-9);
    Ok(())
}

#[test]
fn exposure_in_an_energy_unit_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("glg_ctime_bad_unit.pha");
    common::FitsWriter::new()
        .table(
            common::Table::new("EBOUNDS")
                .column(common::Column::f32("E_MIN", &[4.0]))
                .column(common::Column::f32("E_MAX", &[8.0])),
        )
        .table(
            common::Table::new("SPECTRUM")
                .column(common::Column::f32_vec("COUNTS", &[vec![3.0]]))
                .column(common::Column::f64("EXPOSURE", &[1.0]).with_unit("keV"))
                .column(common::Column::f64("TIME", &[100.0])),
        )
        .write(&path);

    assert!(matches!(
        load_ctime(&path),
        Err(Error::IncompatibleUnits { .. })
    ));
    Ok(())
}

#[test]
fn missing_file_is_reported() {
    let out = load_ctime("/no/such/ctime.pha");
    assert!(matches!(out, Err(Error::FileNotAvailable(_))));
}

#[test]
fn file_without_spectrum_is_a_format_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("partial.pha");
    common::FitsWriter::new()
        .table(
            common::Table::new("EBOUNDS")
                .column(common::Column::f32("E_MIN", &[4.0]))
                .column(common::Column::f32("E_MAX", &[8.0])),
        )
        .write(&path);

    assert!(matches!(load_ctime(&path), Err(Error::Format(_))));
    Ok(())
}

#[test]
fn load_then_slice_round_trips() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("glg_ctime_n1.pha");
    common::ctime_file(&path, 1000.0, &[1.0; 20], &counts(20, 4));
    let series = load_ctime(&path)?;

    let edges = series.time_bins();
    let whole = slice_ctime(&series, edges[0], edges[20])?;
    assert_eq!(whole, series);

    let part = slice_ctime(&series, met_to_epoch(1004.3), met_to_epoch(1011.6))?;
    assert_eq!(part.rows(), 8);
    assert_eq!(part.time_bins().len(), part.rows() + 1);
    assert_eq!(part.counts().row(0), series.counts().row(4));
    assert_eq!(slice_ctime(&part, met_to_epoch(1004.3), met_to_epoch(1011.6))?, part);
    Ok(())
}

#[test]
fn bin_down_restores_nominal_cadence() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("glg_ctime_burst.pha");
    let mut dt = vec![0.256; 3];
    dt.extend([0.064; 10]);
    common::ctime_file(&path, 0.0, &dt, &counts(13, 2));
    let series = load_ctime(&path)?;

    let binned = bin_down_ctime(&series)?;
    assert_eq!(binned.rows(), 3 + 2 + 1);
    assert_eq!(binned.time_bins().len(), binned.rows() + 1);
    assert_eq!(binned.total_counts(), series.total_counts());
    assert!(binned.dt().iter().all(|d| (d.get::<second>() - 0.256).abs() < 1e-12));

    let carried = series.rebin(&RebinParams {
        tail: TailPolicy::CarryForward,
        ..RebinParams::default()
    })?;
    assert_eq!(carried.rows(), 3 + 2 + 2);
    assert_eq!(carried.total_counts(), series.total_counts());
    Ok(())
}

#[test]
fn series_exports_to_npz() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fits = dir.path().join("glg_ctime_n2.pha");
    common::ctime_file(&fits, 0.0, &[1.0; 3], &counts(3, 2));
    let out = dir.path().join("series.npz");
    write_series_npz(&load_ctime(&fits)?, &out)?;
    assert!(std::fs::metadata(&out)?.len() > 0);
    Ok(())
}
