//! The MPD (point-estimate dump) file codec: read/write the
//! format verbatim, line by line, aborting with a fatal error citing the
//! offending line on any unexpected token.
//!
//! ```text
//! *mpd[<label>]
//! estimate_values:
//! <parameter1> <parameter2> ... <parameterN>
//! <value1> <value2> ... <valueN>
//! covariance_matrix:
//! <N rows of N space-separated doubles>
//! *end
//! ```

use fsc_core::Matrix;
use fsc_error::{FscResult, fsc_err};

#[derive(Clone, Debug)]
pub struct MpdFile {
    pub label: String,
    pub parameter_labels: Vec<String>,
    pub values: Vec<f64>,
    pub covariance: Matrix,
}

/// Normalises tabs to spaces and trims trailing whitespace
/// ("tabs are normalised to spaces; trailing whitespace trimmed").
fn normalise(line: &str) -> String {
    line.replace('\t', " ").trim_end().to_string()
}

fn parse_row(line: &str, line_no: usize) -> FscResult<Vec<f64>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| fsc_err!(Fatal: "mpd file line {}: unexpected token '{}', expected a number", line_no, tok))
        })
        .collect()
}

impl MpdFile {
    pub fn parse(input: &str) -> FscResult<Self> {
        let lines: Vec<String> = input.lines().map(normalise).collect();
        let mut iter = lines.iter().enumerate().peekable();

        let (header_no, header_line) = iter
            .next()
            .ok_or_else(|| fsc_err!(Fatal: "mpd file is empty, expected '*mpd[<label>]'"))?;
        let label = header_line
            .strip_prefix("*mpd[")
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| fsc_err!(Fatal: "mpd file line {}: expected '*mpd[<label>]', got '{}'", header_no + 1, header_line))?
            .to_string();

        let (marker_no, marker_line) = iter
            .next()
            .ok_or_else(|| fsc_err!(Fatal: "mpd file truncated after header, expected 'estimate_values:'"))?;
        if marker_line != "estimate_values:" {
            return Err(fsc_err!(Fatal: "mpd file line {}: expected 'estimate_values:', got '{}'", marker_no + 1, marker_line));
        }

        let (labels_no, labels_line) = iter
            .next()
            .ok_or_else(|| fsc_err!(Fatal: "mpd file truncated, expected parameter labels"))?;
        let parameter_labels: Vec<String> = labels_line.split_whitespace().map(String::from).collect();
        if parameter_labels.is_empty() {
            return Err(fsc_err!(Fatal: "mpd file line {}: expected at least one parameter label", labels_no + 1));
        }

        let (values_no, values_line) = iter
            .next()
            .ok_or_else(|| fsc_err!(Fatal: "mpd file truncated, expected estimate values"))?;
        let values = parse_row(values_line, values_no + 1)?;
        if values.len() != parameter_labels.len() {
            return Err(fsc_err!(
                Fatal: "mpd file line {}: {} values but {} parameter labels",
                values_no + 1,
                values.len(),
                parameter_labels.len()
            ));
        }

        let (cov_marker_no, cov_marker_line) = iter
            .next()
            .ok_or_else(|| fsc_err!(Fatal: "mpd file truncated, expected 'covariance_matrix:'"))?;
        if cov_marker_line != "covariance_matrix:" {
            return Err(fsc_err!(
                Fatal: "mpd file line {}: expected 'covariance_matrix:', got '{}'",
                cov_marker_no + 1,
                cov_marker_line
            ));
        }

        let n = parameter_labels.len();
        let mut rows = Vec::with_capacity(n);
        for _ in 0..n {
            let (row_no, row_line) = iter
                .next()
                .ok_or_else(|| fsc_err!(Fatal: "mpd file truncated, expected {} covariance rows", n))?;
            let row = parse_row(row_line, row_no + 1)?;
            if row.len() != n {
                return Err(fsc_err!(Fatal: "mpd file line {}: covariance row has {} entries, expected {}", row_no + 1, row.len(), n));
            }
            rows.push(row);
        }

        let (end_no, end_line) = iter
            .next()
            .ok_or_else(|| fsc_err!(Fatal: "mpd file truncated, expected '*end'"))?;
        if end_line != "*end" {
            return Err(fsc_err!(Fatal: "mpd file line {}: expected '*end', got '{}'", end_no + 1, end_line));
        }

        Ok(MpdFile {
            label,
            parameter_labels,
            values,
            covariance: Matrix::from_rows(rows),
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("*mpd[{}]\n", self.label));
        out.push_str("estimate_values:\n");
        out.push_str(&self.parameter_labels.join(" "));
        out.push('\n');
        out.push_str(&self.values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" "));
        out.push('\n');
        out.push_str("covariance_matrix:\n");
        for row in self.covariance.to_rows() {
            out.push_str(&row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" "));
            out.push('\n');
        }
        out.push_str("*end\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        "*mpd[TwoSex]\n\
         estimate_values:\n\
         q R0\n\
         1.5 2.5\n\
         covariance_matrix:\n\
         1.0 0.0\n\
         0.0 2.0\n\
         *end\n"
    }

    #[test]
    fn parses_well_formed_file() {
        let mpd = MpdFile::parse(sample()).unwrap();
        assert_eq!(mpd.label, "TwoSex");
        assert_eq!(mpd.parameter_labels, vec!["q", "R0"]);
        assert_eq!(mpd.values, vec![1.5, 2.5]);
        assert_eq!(mpd.covariance.get(1, 1), 2.0);
    }

    #[test]
    fn render_then_parse_round_trips() {
        let mpd = MpdFile::parse(sample()).unwrap();
        let rendered = mpd.render();
        let reparsed = MpdFile::parse(&rendered).unwrap();
        assert_eq!(reparsed.values, mpd.values);
        assert_eq!(reparsed.covariance.to_rows(), mpd.covariance.to_rows());
    }

    #[test]
    fn mismatched_value_count_is_fatal() {
        let bad = "*mpd[x]\nestimate_values:\na b\n1.0\ncovariance_matrix:\n1.0\n*end\n";
        assert!(MpdFile::parse(bad).is_err());
    }

    #[test]
    fn tabs_are_normalised_and_trailing_whitespace_trimmed() {
        let tabbed = "*mpd[x]\nestimate_values:\na\t\n2.0  \t\ncovariance_matrix:\n1.0  \n*end\n";
        let mpd = MpdFile::parse(tabbed).unwrap();
        assert_eq!(mpd.parameter_labels, vec!["a"]);
        assert_eq!(mpd.values, vec![2.0]);
    }

    #[test]
    fn unexpected_token_cites_file_and_line() {
        let bad = "*mpd[x]\nestimate_values:\na\nnot_a_number\ncovariance_matrix:\n1.0\n*end\n";
        let err = MpdFile::parse(bad).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }
}
