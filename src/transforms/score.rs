use crate::core::error::{NodeError, NodeResult};
use crate::core::frame::{Column, Scalar, StorageKind, TabularFrame};
use crate::core::node::NodeLogic;
use crate::core::signature::{ColumnKind, Signature};

pub const DEFAULT_SOURCE: &str = "amount";
pub const DEFAULT_TARGET: &str = "score";
pub const DEFAULT_FACTOR: f64 = 1.1;

/// Appends `target = source * factor` to the primary input.
///
/// Rows keep their order and every existing column is left untouched.
/// A null source value yields a null score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLogic {
    source: String,
    target: String,
    factor: f64,
}

impl Default for ScoreLogic {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE, DEFAULT_TARGET, DEFAULT_FACTOR)
    }
}

impl ScoreLogic {
    pub fn new(source: impl Into<String>, target: impl Into<String>, factor: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            factor,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl NodeLogic for ScoreLogic {
    fn signature(&self) -> Signature {
        Signature::new()
            .input(&self.source, ColumnKind::Numeric)
            .output(&self.target, ColumnKind::Double)
    }

    fn exec(&self, inputs: Vec<TabularFrame>) -> NodeResult<TabularFrame> {
        let mut frame = inputs
            .into_iter()
            .next()
            .ok_or_else(|| NodeError::schema(&self.source, "no input frame to score"))?;

        if frame.has_column(&self.target) {
            return Err(NodeError::schema(
                &self.target,
                "input already has the derived column",
            ));
        }

        let scores = frame
            .numeric_values(&self.source)?
            .into_iter()
            .map(|v| v.map(|x| Scalar::Double(x * self.factor)).unwrap_or(Scalar::Null))
            .collect();
        frame.push_column(Column::new(&self.target, StorageKind::Double, scores))?;
        Ok(frame)
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn orders(amounts: Vec<Scalar>) -> TabularFrame {
        let n = amounts.len();
        TabularFrame::from_columns(vec![
            Column::new(
                "id",
                StorageKind::Integer,
                (1..=n as i64).map(Scalar::Integer).collect(),
            ),
            Column::new("amount", StorageKind::Integer, amounts),
        ])
        .unwrap()
    }

    #[test]
    fn test_appends_score_after_existing_columns() {
        let input = orders(vec![Scalar::Integer(10), Scalar::Integer(20)]);
        let output = ScoreLogic::default().exec(vec![input.clone()]).unwrap();

        assert_eq!(output.column_names(), vec!["id", "amount", "score"]);
        assert_eq!(output.row_count(), input.row_count());
        for name in ["id", "amount"] {
            assert_eq!(output.column(name), input.column(name));
        }

        let scores = output.numeric_values("score").unwrap();
        assert!((scores[0].unwrap() - 11.0).abs() < 1e-9);
        assert!((scores[1].unwrap() - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_null_amount_gives_null_score() {
        let output = ScoreLogic::default()
            .exec(vec![orders(vec![Scalar::Null, Scalar::Integer(5)])])
            .unwrap();
        let score = output.column("score").unwrap();
        assert!(score.values()[0].is_null());
        assert_eq!(score.values()[1], Scalar::Double(5.0 * 1.1));
    }

    #[test]
    fn test_missing_amount_is_schema_error() {
        let frame = TabularFrame::from_columns(vec![Column::new(
            "price",
            StorageKind::Double,
            vec![Scalar::Double(1.0)],
        )])
        .unwrap();
        let err = ScoreLogic::default().exec(vec![frame]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.to_string().contains("'amount'"));
    }

    #[test]
    fn test_text_amount_is_schema_error() {
        let frame = TabularFrame::from_columns(vec![Column::new(
            "amount",
            StorageKind::Text,
            vec![Scalar::Text("ten".into())],
        )])
        .unwrap();
        let err = ScoreLogic::default().exec(vec![frame]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_existing_target_is_rejected() {
        let mut frame = orders(vec![Scalar::Integer(1)]);
        frame
            .push_column(Column::new("score", StorageKind::Double, vec![Scalar::Double(0.0)]))
            .unwrap();
        assert!(ScoreLogic::default().exec(vec![frame]).is_err());
    }

    #[test]
    fn test_custom_columns_and_factor() {
        let logic = ScoreLogic::new("amount", "doubled", 2.0);
        let output = logic.exec(vec![orders(vec![Scalar::Integer(4)])]).unwrap();
        assert_eq!(output.column("doubled").unwrap().values()[0], Scalar::Double(8.0));

        let sig = logic.signature();
        assert_eq!(sig.inputs[0].name, "amount");
        assert_eq!(sig.outputs[0].name, "doubled");
    }

    #[test]
    fn test_empty_input_still_produces_score_column() {
        let output = ScoreLogic::default().exec(vec![orders(Vec::new())]).unwrap();
        assert_eq!(output.row_count(), 0);
        assert!(output.has_column("score"));
    }
}
