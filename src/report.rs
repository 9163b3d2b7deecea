use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::info;

use crate::record::Dataset;
use crate::stats::{Bin, GroupStatistics, Summary};

pub const DATASET_FILE: &str = "techpays.json";

/// Quote a CSV field when it holds a separator, quote or line break.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn fmt_stat(v: f64) -> String {
    format!("{:.2}", v)
}

/// Describe rows print the count as an integer, every other statistic with two decimals.
fn fmt_row(label: &str, v: f64) -> String {
    if label == "count" {
        format!("{:.0}", v)
    } else {
        fmt_stat(v)
    }
}

pub fn describe_csv(field: &str, summary: &Summary) -> String {
    let mut out = format!(",{}\n", csv_field(field));
    for (label, value) in summary.rows() {
        let v = value.map(|v| fmt_row(label, v)).unwrap_or_default();
        out.push_str(&format!("{},{}\n", label, v));
    }
    out
}

pub fn describe_table(field: &str, summary: &Summary) -> String {
    let rows: Vec<(&str, String)> = summary
        .rows()
        .into_iter()
        .map(|(label, v)| {
            let v = v.map(|v| fmt_row(label, v)).unwrap_or_else(|| "NaN".into());
            (label, v)
        })
        .collect();
    let width = rows
        .iter()
        .map(|(_, v)| v.len())
        .chain([field.len()])
        .max()
        .unwrap_or(0);
    let mut out = format!("{:<6} {:>width$}\n", "", field, width = width);
    for (label, v) in rows {
        out.push_str(&format!("{:<6} {:>width$}\n", label, v, width = width));
    }
    out
}

pub fn histogram_table(field: &str, bins: &[Bin]) -> String {
    let peak = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let mut out = format!("Histogram of {}\n", field);
    for b in bins {
        let bar = "#".repeat(b.count * 40 / peak);
        out.push_str(&format!(
            "{:>12} - {:<12} {:>5} {}\n",
            fmt_stat(b.lower),
            fmt_stat(b.upper),
            b.count,
            bar
        ));
    }
    out
}

pub fn groups_csv(group_field: &str, groups: &[GroupStatistics]) -> String {
    let mut out = format!("{},mean,median,count\n", csv_field(group_field));
    for g in groups {
        let row = [csv_field(&g.key), fmt_stat(g.mean), fmt_stat(g.median), g.count.to_string()];
        out.push_str(&row.iter().join(","));
        out.push('\n');
    }
    out
}

pub fn groups_table(group_field: &str, groups: &[GroupStatistics]) -> String {
    let key_w = groups
        .iter()
        .map(|g| g.key.chars().count())
        .chain([group_field.len()])
        .max()
        .unwrap_or(0);
    let mut out = format!(
        "{:<key_w$} | {:>12} | {:>12} | {:>5}\n",
        group_field,
        "mean",
        "median",
        "count",
        key_w = key_w
    );
    out.push_str(&"-".repeat(key_w + 38));
    out.push('\n');
    for g in groups {
        out.push_str(&format!(
            "{:<key_w$} | {:>12} | {:>12} | {:>5}\n",
            g.key,
            fmt_stat(g.mean),
            fmt_stat(g.median),
            g.count,
            key_w = key_w
        ));
    }
    out
}

fn write(path: PathBuf, contents: &str) -> Result<PathBuf> {
    fs::write(&path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    info!(path = ?path, "wrote");
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))
}

pub fn write_dataset(dir: &Path, dataset: &Dataset) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let json = dataset.to_json_pretty()?;
    write(dir.join(DATASET_FILE), &json)
}

/// `<prefix>-<stem>.csv` / `.txt` plus the histogram as `<prefix>-<stem>-histogram.txt`.
pub fn write_description(
    dir: &Path,
    prefix: &str,
    stem: &str,
    field: &str,
    summary: &Summary,
    bins: &[Bin],
) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    Ok(vec![
        write(dir.join(format!("{prefix}-{stem}.csv")), &describe_csv(field, summary))?,
        write(dir.join(format!("{prefix}-{stem}.txt")), &describe_table(field, summary))?,
        write(
            dir.join(format!("{prefix}-{stem}-histogram.txt")),
            &histogram_table(field, bins),
        )?,
    ])
}

pub fn write_ranking(
    dir: &Path,
    stem: &str,
    group_field: &str,
    groups: &[GroupStatistics],
) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    Ok(vec![
        write(
            dir.join(format!("bestPayingCompanies-{stem}.csv")),
            &groups_csv(group_field, groups),
        )?,
        write(
            dir.join(format!("bestPayingCompanies-{stem}.txt")),
            &groups_table(group_field, groups),
        )?,
    ])
}

/// Export-file prefix for a numeric field, e.g. `baseSalaryNumber` → `baseSalary`.
pub fn field_prefix(field: &str) -> &str {
    field.strip_suffix("Number").unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<GroupStatistics> {
        vec![
            GroupStatistics {
                key: "Booking.com".into(),
                count: 3,
                mean: 96666.666,
                median: 100000.0,
            },
            GroupStatistics {
                key: "Acme, Inc".into(),
                count: 2,
                mean: 15.0,
                median: 15.0,
            },
        ]
    }

    #[test]
    fn groups_csv_escapes_keys() {
        let csv = groups_csv("companyName", &groups());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "companyName,mean,median,count");
        assert_eq!(lines[1], "Booking.com,96666.67,100000.00,3");
        assert_eq!(lines[2], "\"Acme, Inc\",15.00,15.00,2");
    }

    #[test]
    fn groups_table_aligns_columns() {
        let table = groups_table("companyName", &groups());
        let widths: Vec<usize> = table.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn describe_outputs() {
        let s = Summary {
            count: 1,
            mean: 5.0,
            std: None,
            min: 5.0,
            q25: 5.0,
            q50: 5.0,
            q75: 5.0,
            max: 5.0,
        };
        let csv = describe_csv("baseSalaryNumber", &s);
        assert!(csv.starts_with(",baseSalaryNumber\ncount,1\nmean,5.00\n"));
        assert!(csv.contains("\nstd,\n"));
        let table = describe_table("baseSalaryNumber", &s);
        assert!(table.contains("NaN"));
        assert!(table.lines().any(|l| l.starts_with("count") && l.ends_with(" 1")));
    }

    #[test]
    fn csv_field_quotes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn prefix_strips_number_suffix() {
        assert_eq!(field_prefix("baseSalaryNumber"), "baseSalary");
        assert_eq!(field_prefix("extraCompensation"), "extraCompensation");
    }
}
