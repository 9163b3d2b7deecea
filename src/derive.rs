use tracing::warn;

use crate::error::Result;
use crate::record::{Dataset, Scalar};

pub const BASE_SALARY: &str = "baseSalaryNumber";
pub const TOTAL_COMPENSATION: &str = "totalCompensationNumber";
pub const EXTRA_COMPENSATION: &str = "extraCompensation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }
}

/// `name = lhs <op> rhs`, evaluated per record.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedField {
    pub name: String,
    pub op: BinaryOp,
    pub lhs: String,
    pub rhs: String,
}

impl DerivedField {
    pub fn new(name: &str, op: BinaryOp, lhs: &str, rhs: &str) -> Self {
        DerivedField {
            name: name.to_string(),
            op,
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }

    /// `extraCompensation = totalCompensationNumber - baseSalaryNumber`
    pub fn extra_compensation() -> Self {
        DerivedField::new(EXTRA_COMPENSATION, BinaryOp::Sub, TOTAL_COMPENSATION, BASE_SALARY)
    }

    /// Whether every record in `dataset` carries both source fields.
    pub fn applies_to(&self, dataset: &Dataset) -> bool {
        dataset.has_field(&self.lhs) && dataset.has_field(&self.rhs)
    }

    /// Index of the first record where a source field is not a number.
    fn first_non_numeric(&self, dataset: &Dataset) -> Option<usize> {
        dataset.iter().position(|r| {
            [&self.lhs, &self.rhs]
                .iter()
                .any(|f| r.get(f).and_then(Scalar::as_f64).is_none())
        })
    }
}

/// New dataset where every record also carries `rule.name`.
pub fn derive(dataset: &Dataset, rule: &DerivedField) -> Result<Dataset> {
    dataset
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let a = rec.require_f64(i, &rule.lhs)?;
            let b = rec.require_f64(i, &rule.rhs)?;
            Ok(rec.with_field(&rule.name, Scalar::Number(rule.op.apply(a, b))))
        })
        .collect()
}

/// Add `extraCompensation` when every record has numbers in both compensation
/// fields; otherwise return the dataset as is. Use [`derive`] directly to fail
/// on gaps instead.
pub fn with_extra_compensation(dataset: &Dataset) -> Result<Dataset> {
    let rule = DerivedField::extra_compensation();
    if !rule.applies_to(dataset) {
        return Ok(dataset.clone());
    }
    if let Some(record) = rule.first_non_numeric(dataset) {
        warn!(record, field = %rule.name, "source value is not a number, skipping derived field");
        return Ok(dataset.clone());
    }
    derive(dataset, &rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::record::Record;

    fn comp(base: f64, total: f64) -> Record {
        Record::new(vec![
            ("companyName".into(), Scalar::Text("A".into())),
            (BASE_SALARY.into(), Scalar::Number(base)),
            (TOTAL_COMPENSATION.into(), Scalar::Number(total)),
        ])
    }

    #[test]
    fn extra_compensation_per_record() {
        let ds = Dataset::new(vec![comp(100.0, 150.0), comp(80.0, 80.0)]);
        let out = derive(&ds, &DerivedField::extra_compensation()).unwrap();
        let extras: Vec<f64> = out
            .iter()
            .map(|r| r.get(EXTRA_COMPENSATION).and_then(Scalar::as_f64).unwrap())
            .collect();
        assert_eq!(extras, [50.0, 0.0]);
        // input untouched
        assert!(ds.iter().all(|r| r.get(EXTRA_COMPENSATION).is_none()));
    }

    #[test]
    fn reapplying_is_idempotent() {
        let ds = Dataset::new(vec![comp(100.0, 150.0)]);
        let rule = DerivedField::extra_compensation();
        let once = derive(&ds, &rule).unwrap();
        let twice = derive(&once, &rule).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_source_field() {
        let partial = Record::new(vec![(BASE_SALARY.into(), Scalar::Number(1.0))]);
        let ds = Dataset::new(vec![comp(1.0, 2.0), partial]);
        let err = derive(&ds, &DerivedField::extra_compensation()).unwrap_err();
        assert!(
            matches!(err, Error::MissingField { record: 1, ref field } if field == TOTAL_COMPENSATION)
        );
    }

    #[test]
    fn non_numeric_source_field() {
        let rec = comp(1.0, 2.0).with_field(BASE_SALARY, Scalar::Text("n/a".into()));
        let err = derive(&Dataset::new(vec![rec]), &DerivedField::extra_compensation()).unwrap_err();
        assert!(matches!(err, Error::NotNumeric { record: 0, .. }));
    }

    #[test]
    fn applies_to_checks_both_sources() {
        let rule = DerivedField::extra_compensation();
        assert!(rule.applies_to(&Dataset::new(vec![comp(1.0, 2.0)])));
        let no_total = Record::new(vec![(BASE_SALARY.into(), Scalar::Number(1.0))]);
        assert!(!rule.applies_to(&Dataset::new(vec![no_total])));
    }

    #[test]
    fn extra_compensation_skipped_without_sources() {
        let only_base = Record::new(vec![(BASE_SALARY.into(), Scalar::Number(1.0))]);
        let ds = Dataset::new(vec![only_base]);
        assert_eq!(with_extra_compensation(&ds).unwrap(), ds);
        let full = Dataset::new(vec![comp(10.0, 15.0)]);
        let out = with_extra_compensation(&full).unwrap();
        assert_eq!(out.records()[0].get(EXTRA_COMPENSATION), Some(&Scalar::Number(5.0)));
    }

    #[test]
    fn null_total_skips_extra_compensation() {
        let html = "<script>COMPENSATION_LIST = [\n  {\n    baseSalaryNumber: 90000,\n    totalCompensationNumber: null\n  },\n  {\n    baseSalaryNumber: 70000,\n    totalCompensationNumber: 80000\n  },\n];\n</script>";
        let ds = crate::parser::parse_page(html).unwrap();
        assert_eq!(ds.records()[0].get(TOTAL_COMPENSATION), Some(&Scalar::Null));

        let out = with_extra_compensation(&ds).unwrap();
        assert_eq!(out, ds);
        // explicit derivation stays strict
        let err = derive(&ds, &DerivedField::extra_compensation()).unwrap_err();
        assert!(
            matches!(err, Error::NotNumeric { record: 0, ref field } if field == TOTAL_COMPENSATION)
        );
    }

    #[test]
    fn other_operators() {
        let ds = Dataset::new(vec![comp(4.0, 8.0)]);
        let ratio = DerivedField::new("ratio", BinaryOp::Div, TOTAL_COMPENSATION, BASE_SALARY);
        let out = derive(&ds, &ratio).unwrap();
        assert_eq!(out.records()[0].get("ratio"), Some(&Scalar::Number(2.0)));
    }
}
