//! Run-indexed tables in TWiki, LaTeX or CSV layout.

use std::fmt::Write as _;
use std::str::FromStr;

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    /// `| run | x | ... |`
    #[default]
    Twiki,
    /// `run & x & ... \\`
    Latex,
    /// `run, x, ...`
    Csv,
}

impl FromStr for TableStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "twiki" => Ok(TableStyle::Twiki),
            "latex" => Ok(TableStyle::Latex),
            "csv" => Ok(TableStyle::Csv),
            _ => Err(format!("unknown style '{s}' (choices: twiki, latex, csv)")),
        }
    }
}

/// A table whose first column is the run number.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTable {
    /// Names of the value columns (the run column is implicit).
    pub columns: Vec<String>,
    /// Run numbers, one per row.
    pub runs: Vec<i64>,
    /// Values, one vector per column.
    pub values: Vec<Vec<f64>>,
}

impl RunTable {
    /// Render header and rows, each line newline-terminated.
    pub fn render(&self, style: TableStyle) -> String {
        let mut out = String::new();
        let header: Vec<&str> = std::iter::once("run").chain(self.columns.iter().map(String::as_str)).collect();

        match style {
            TableStyle::Twiki => {
                let cells = centred(&header);
                let _ = writeln!(out, "| {} |", cells.join(" | "));
            }
            TableStyle::Latex => {
                let cells = centred(&header);
                let _ = writeln!(out, "{} \\\\\n\\hline", cells.join(" & "));
            }
            TableStyle::Csv => {
                let _ = writeln!(out, "{}", header.join(", "));
            }
        }

        for (i, run) in self.runs.iter().enumerate() {
            let values = self.values.iter().map(|col| col.get(i).copied().unwrap_or(f64::NAN));
            let line = match style {
                TableStyle::Twiki | TableStyle::Latex => {
                    let cells: Vec<String> =
                        std::iter::once(format!("{run:6}")).chain(values.map(|v| format!("{v:9.6}"))).collect();
                    if style == TableStyle::Twiki {
                        format!("| {} |", cells.join(" | "))
                    } else {
                        format!("{} \\\\", cells.join(" & "))
                    }
                }
                TableStyle::Csv => {
                    let cells: Vec<String> =
                        std::iter::once(run.to_string()).chain(values.map(|v| format!("{v:.6}"))).collect();
                    cells.join(", ")
                }
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// Run column centred in 6 characters, value columns in 9.
fn centred(header: &[&str]) -> Vec<String> {
    header
        .iter()
        .enumerate()
        .map(|(i, h)| if i == 0 { format!("{h:^6}") } else { format!("{h:^9}") })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RunTable {
        RunTable {
            columns: vec!["BPIX.x".into(), "BPIX.y".into(), "BPIX.z".into()],
            runs: vec![355100, 1],
            values: vec![vec![0.5, -0.0125], vec![-0.25, 1.0], vec![12.3456789, 0.0]],
        }
    }

    #[test]
    fn twiki() {
        assert_eq!(
            table().render(TableStyle::Twiki),
            "|  run   |  BPIX.x   |  BPIX.y   |  BPIX.z   |\n\
             | 355100 |  0.500000 | -0.250000 | 12.345679 |\n\
             |      1 | -0.012500 |  1.000000 |  0.000000 |\n"
        );
    }

    #[test]
    fn latex() {
        assert_eq!(
            table().render(TableStyle::Latex),
            " run   &  BPIX.x   &  BPIX.y   &  BPIX.z   \\\\\n\\hline\n\
             355100 &  0.500000 & -0.250000 & 12.345679 \\\\\n\
             \x20    1 & -0.012500 &  1.000000 &  0.000000 \\\\\n"
        );
    }

    #[test]
    fn csv() {
        assert_eq!(
            table().render(TableStyle::Csv),
            "run, BPIX.x, BPIX.y, BPIX.z\n\
             355100, 0.500000, -0.250000, 12.345679\n\
             1, -0.012500, 1.000000, 0.000000\n"
        );
    }

    #[test]
    fn style_is_case_insensitive() {
        assert_eq!("LaTeX".parse::<TableStyle>().unwrap(), TableStyle::Latex);
        assert!("markdown".parse::<TableStyle>().is_err());
    }
}
