// ============================================================
// Layer 6 — Submission Files
// ============================================================
// Per-fold predictions and the ensembled result.
//
//   <fold_output>/sub.csv       id,label_0,label_1
//                               0,0.912,0.088
//
//   <out>.prob                  0.871,0.129        (no header)
//   <out>                       0<TAB>0            (no header)
//
// A Submission keeps rows in file order; combining several of
// them requires the same ids in the same order.

use anyhow::{bail, ensure, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::ml::scoring::argmax;

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRow {
    pub id:    String,
    pub probs: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Submission {
    pub rows: Vec<SubmissionRow>,
}

impl Submission {
    pub fn new(rows: Vec<SubmissionRow>) -> Self {
        Self { rows }
    }

    pub fn num_labels(&self) -> usize {
        self.rows.first().map_or(0, |r| r.probs.len())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut w = csv::Writer::from_path(path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        let mut header = vec!["id".to_string()];
        header.extend((0..self.num_labels()).map(|j| format!("label_{j}")));
        w.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.id.clone()];
            record.extend(row.probs.iter().map(f32::to_string));
            w.write_record(&record)?;
        }
        w.flush()
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::info!("Wrote {} predictions to '{}'", self.rows.len(), path.display());
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut r = csv::Reader::from_path(path)
            .with_context(|| format!("Cannot open submission '{}'", path.display()))?;

        let mut rows = Vec::new();
        for (n, record) in r.records().enumerate() {
            let record = record
                .with_context(|| format!("Bad row {} in '{}'", n + 2, path.display()))?;
            let id = record
                .get(0)
                .with_context(|| format!("Row {} of '{}' has no id", n + 2, path.display()))?
                .to_string();
            let probs = record
                .iter()
                .skip(1)
                .map(|v| v.trim().parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Row {} of '{}' has a bad probability", n + 2, path.display()))?;
            rows.push(SubmissionRow { id, probs });
        }
        Ok(Self { rows })
    }

    /// Row-wise argmax.
    pub fn labels(&self) -> Vec<usize> {
        self.rows.iter().map(|r| argmax(&r.probs)).collect()
    }
}

/// Average several fold submissions row by row.
pub fn combine(subs: &[Submission]) -> Result<Submission> {
    let Some(first) = subs.first() else {
        bail!("Nothing to combine");
    };
    let k = subs.len() as f32;

    let mut rows: Vec<SubmissionRow> = first
        .rows
        .iter()
        .map(|r| SubmissionRow { id: r.id.clone(), probs: vec![0.0; r.probs.len()] })
        .collect();

    for (fold, sub) in subs.iter().enumerate() {
        ensure!(
            sub.rows.len() == rows.len(),
            "Submission {} has {} rows, expected {}",
            fold,
            sub.rows.len(),
            rows.len()
        );
        for (acc, row) in rows.iter_mut().zip(&sub.rows) {
            ensure!(
                acc.id == row.id && acc.probs.len() == row.probs.len(),
                "Submission {} disagrees on row '{}'",
                fold,
                acc.id
            );
            for (a, p) in acc.probs.iter_mut().zip(&row.probs) {
                *a += p / k;
            }
        }
    }
    Ok(Submission { rows })
}

/// `<out>.prob` next to `out`.
pub fn prob_path(out: &Path) -> PathBuf {
    let mut s = out.as_os_str().to_os_string();
    s.push(".prob");
    PathBuf::from(s)
}

/// Write the ensembled probabilities and labels, both without a header.
pub fn write_ensemble(sub: &Submission, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).ok();
    }

    let prob = prob_path(out);
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&prob)
        .with_context(|| format!("Cannot create '{}'", prob.display()))?;
    for row in &sub.rows {
        w.write_record(row.probs.iter().map(f32::to_string))?;
    }
    w.flush()
        .with_context(|| format!("Cannot write '{}'", prob.display()))?;

    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_path(out)
        .with_context(|| format!("Cannot create '{}'", out.display()))?;
    for (row, label) in sub.rows.iter().zip(sub.labels()) {
        w.write_record([row.id.clone(), label.to_string()])?;
    }
    w.flush()
        .with_context(|| format!("Cannot write '{}'", out.display()))?;

    tracing::debug!("Wrote '{}' and '{}'", prob.display(), out.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sub(rows: &[(&str, [f32; 2])]) -> Submission {
        Submission::new(
            rows.iter()
                .map(|(id, p)| SubmissionRow { id: id.to_string(), probs: p.to_vec() })
                .collect(),
        )
    }

    #[test]
    fn test_csv_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.csv");
        let s    = sub(&[("0", [0.25, 0.75]), ("1", [0.5, 0.5])]);
        s.write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,label_0,label_1\n0,0.25,0.75\n"));
        assert_eq!(Submission::read_csv(&path).unwrap(), s);
    }

    #[test]
    fn test_combine_averages_and_sums_to_one() {
        let a = sub(&[("0", [0.9, 0.1]), ("1", [0.2, 0.8])]);
        let b = sub(&[("0", [0.7, 0.3]), ("1", [0.6, 0.4])]);
        let c = combine(&[a, b]).unwrap();
        assert!((c.rows[0].probs[0] - 0.8).abs() < 1e-6);
        assert!((c.rows[1].probs[1] - 0.6).abs() < 1e-6);
        for row in &c.rows {
            assert!((row.probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
        assert_eq!(c.labels(), vec![0, 1]);
    }

    #[test]
    fn test_combine_rejects_mismatched_ids() {
        let a = sub(&[("0", [0.9, 0.1])]);
        let b = sub(&[("7", [0.9, 0.1])]);
        assert!(combine(&[a, b]).is_err());
        assert!(combine(&[]).is_err());
    }

    #[test]
    fn test_write_ensemble_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result.txt");
        write_ensemble(&sub(&[("3", [0.25, 0.75]), ("4", [0.5, 0.5])]), &out).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "3\t1\n4\t0\n");
        let prob = fs::read_to_string(prob_path(&out)).unwrap();
        assert_eq!(prob, "0.25,0.75\n0.5,0.5\n");
        assert!(prob_path(&out).ends_with("result.txt.prob"));
    }

    #[test]
    fn test_ensemble_ids_are_quoted_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("result.txt");
        write_ensemble(&sub(&[("a\tb", [0.1, 0.9]), ("c,d", [0.6, 0.4])]), &out).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text, "\"a\tb\"\t1\nc,d\t0\n");
        let labels: Vec<(String, String)> = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .from_path(&out)
            .unwrap()
            .deserialize()
            .map(Result::unwrap)
            .collect();
        assert_eq!(labels[0], ("a\tb".to_string(), "1".to_string()));
        assert_eq!(labels[1].0, "c,d");
    }
}
