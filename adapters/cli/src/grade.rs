//! Compares a map artifact against the ground-truth layout.

use std::collections::BTreeSet;

use serde::Serialize;

const VALID_SYMBOLS: [char; 4] = ['#', '.', 'S', 'T'];

/// First cell where the candidate and the ground truth differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct Mismatch {
    pub(crate) row: usize,
    pub(crate) column: usize,
    pub(crate) expected: char,
    pub(crate) found: char,
}

/// Verdict for one candidate map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct GradeReport {
    pub(crate) passed: bool,
    pub(crate) score: f64,
    pub(crate) feedback: String,
    pub(crate) mismatch: Option<Mismatch>,
}

impl GradeReport {
    fn fail(feedback: String) -> Self {
        Self {
            passed: false,
            score: 0.0,
            feedback,
            mismatch: None,
        }
    }

    /// Report for a candidate file that does not exist.
    pub(crate) fn missing(name: &str) -> Self {
        Self::fail(format!("Missing {name}"))
    }
}

/// Grades `candidate` against `truth`.
///
/// Shape is checked before content: row count, then each row's length and
/// symbols, then the first differing cell in row-major order.
pub(crate) fn grade(truth: &str, candidate: &str) -> GradeReport {
    let truth: Vec<Vec<char>> = truth
        .trim_matches(['\n', '\r'])
        .lines()
        .map(|line| line.chars().collect())
        .collect();
    let candidate: Vec<Vec<char>> = candidate
        .lines()
        .map(|line| line.chars().collect())
        .collect();

    if candidate.len() != truth.len() {
        return GradeReport::fail(format!(
            "Wrong number of rows: expected {}, got {}",
            truth.len(),
            candidate.len()
        ));
    }

    for (row, (expected, found)) in truth.iter().zip(&candidate).enumerate() {
        if found.len() != expected.len() {
            return GradeReport::fail(format!(
                "Row {row} length mismatch: expected {}, got {}",
                expected.len(),
                found.len()
            ));
        }
        let invalid: BTreeSet<char> = found
            .iter()
            .copied()
            .filter(|symbol| !VALID_SYMBOLS.contains(symbol))
            .collect();
        if !invalid.is_empty() {
            return GradeReport::fail(format!(
                "Invalid characters in row {row}: {:?}",
                invalid.into_iter().collect::<Vec<_>>()
            ));
        }
    }

    let mismatch = truth
        .iter()
        .zip(&candidate)
        .enumerate()
        .find_map(|(row, (expected, found))| {
            expected.iter().zip(found).enumerate().find_map(
                |(column, (&expected, &found))| {
                    (expected != found).then_some(Mismatch {
                        row,
                        column,
                        expected,
                        found,
                    })
                },
            )
        });

    match mismatch {
        None => GradeReport {
            passed: true,
            score: 1.0,
            feedback: "Perfect match with ground truth".to_owned(),
            mismatch: None,
        },
        Some(mismatch) => GradeReport {
            passed: false,
            score: 0.0,
            feedback: format!(
                "First mismatch at (row {}, col {}): expected '{}', got '{}'\n\
                 Ground truth:\n{}\nCandidate map:\n{}",
                mismatch.row,
                mismatch.column,
                mismatch.expected,
                mismatch.found,
                join_rows(&truth),
                join_rows(&candidate),
            ),
            mismatch: Some(mismatch),
        },
    }
}

fn join_rows(rows: &[Vec<char>]) -> String {
    rows.iter()
        .map(|row| row.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
