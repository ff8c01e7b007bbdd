mod common;

use anyhow::Result;
use common::{text, Column, FitsWriter, Table};
use gbm_toolbox::errors::Error;
use gbm_toolbox::gbm_tools::{load, Product};

#[test]
fn dispatches_on_datatype() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let ctime = dir.path().join("glg_ctime_b0.pha");
    common::ctime_file(&ctime, 0.0, &[1.0; 4], &vec![vec![1.0, 2.0]; 4]);
    assert!(matches!(load(&ctime)?, Product::Histogram(s) if s.rows() == 4));

    let tte = dir.path().join("glg_tte_b0.fit");
    FitsWriter::new()
        .primary_key("DATATYPE", &text("TTE"))
        .table(
            Table::new("EBOUNDS")
                .column(Column::i16("CHANNEL", &[0, 1]))
                .column(Column::f32("E_MIN", &[4.0, 8.0]))
                .column(Column::f32("E_MAX", &[8.0, 16.0])),
        )
        .table(
            Table::new("EVENTS")
                .column(Column::f64("TIME", &[1.0, 2.0, 3.0]))
                .column(Column::i16("PHA", &[0, 1, 1])),
        )
        .write(&tte);
    assert!(matches!(load(&tte)?, Product::Events(e) if e.len() == 3));

    let other = dir.path().join("glg_poshist.fit");
    FitsWriter::new()
        .primary_key("DATATYPE", &text("POSHIST"))
        .write(&other);
    assert!(matches!(load(&other), Err(Error::NotImplemented(_))));
    Ok(())
}

#[test]
fn non_fits_input_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("junk.fits");
    std::fs::write(&path, vec![b'x'; 2880])?;
    assert!(matches!(load(&path), Err(Error::InvalidHeader(_))));
    Ok(())
}
