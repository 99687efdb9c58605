use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::formats::ReviewRecord;

pub fn ensure_artifact_path_is_free(out_path: &Path) -> anyhow::Result<()> {
    if out_path.exists() {
        anyhow::bail!("output artifact already exists: {}", out_path.display());
    }
    Ok(())
}

/// Writes the accumulated records as a CSV artifact: header row, one row
/// per review, traversal order preserved, absent fields left empty. The
/// file appears atomically; a failed write leaves nothing behind.
pub fn write_csv(records: &[ReviewRecord], out_path: &Path) -> anyhow::Result<()> {
    let out_dir = match out_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create artifact output dir: {}", out_dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(out_dir)
        .with_context(|| format!("create temporary artifact in: {}", out_dir.display()))?;

    {
        let mut writer = csv::Writer::from_writer(&mut tmp);
        for record in records {
            writer.serialize(record).context("serialize review record")?;
        }
        writer.flush().context("flush csv writer")?;
    }
    tmp.flush().context("flush temporary artifact")?;

    tmp.persist_noclobber(out_path)
        .with_context(|| format!("persist artifact: {}", out_path.display()))?;

    tracing::info!(rows = records.len(), out = %out_path.display(), "wrote review artifact");
    Ok(())
}

/// Reads an artifact back into records, in file order.
pub fn read_csv(path: &Path) -> anyhow::Result<Vec<ReviewRecord>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open artifact: {}", path.display()))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ReviewRecord = row.context("parse artifact row")?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ReviewRecord;

    fn sample_records() -> Vec<ReviewRecord> {
        vec![
            ReviewRecord {
                rating: Some(7.0),
                author: Some("moviefan42".to_owned()),
                date: Some("12 September 2022".to_owned()),
                title: Some("Great episode".to_owned()),
                body: Some("Loved it, commas and all".to_owned()),
                helpful_count: Some(128),
                total_count: Some(150),
                episode_index: 0,
                season_index: 0,
            },
            ReviewRecord {
                rating: None,
                author: None,
                date: None,
                title: None,
                body: Some("Only a body".to_owned()),
                helpful_count: None,
                total_count: None,
                episode_index: 3,
                season_index: 1,
            },
        ]
    }

    #[test]
    fn round_trip_preserves_order_and_null_placement() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reviews.csv");

        let records = sample_records();
        write_csv(&records, &out).unwrap();
        let reread = read_csv(&out).unwrap();

        assert_eq!(reread, records);
    }

    #[test]
    fn artifact_has_header_row_and_empty_cells_for_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reviews.csv");
        write_csv(&sample_records(), &out).unwrap();

        let contents = std::fs::read_to_string(&out).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("rating,author,date,title,body,helpful_count,total_count,episode_index,season_index")
        );
        let second_row = lines.nth(1).unwrap();
        assert!(second_row.starts_with(",,,,"));
    }

    #[test]
    fn write_refuses_to_clobber_an_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reviews.csv");
        std::fs::write(&out, "already here").unwrap();

        assert!(ensure_artifact_path_is_free(&out).is_err());
        assert!(write_csv(&sample_records(), &out).is_err());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "already here");
    }
}
