//! Held-out evaluation of the fitted classifier

use serde::{Deserialize, Serialize};

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1, p == 1) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Metrics persisted in the metadata contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub recall: f64,
    pub precision: f64,
    #[serde(rename = "F1-score")]
    pub f1: f64,
    #[serde(rename = "ROC-AUC")]
    pub roc_auc: f64,
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

impl EvaluationMetrics {
    /// Threshold probabilities and score them against the true labels.
    ///
    /// Precision and recall fall back to 0 when undefined.
    pub fn evaluate(y_true: &[u8], probabilities: &[f64], threshold: f64) -> (Self, ConfusionMatrix) {
        let y_pred: Vec<u8> = probabilities
            .iter()
            .map(|&p| u8::from(p >= threshold))
            .collect();
        let cm = ConfusionMatrix::from_labels(y_true, &y_pred);

        let precision = ratio(cm.tp, cm.tp + cm.fp);
        let recall = ratio(cm.tp, cm.tp + cm.fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let metrics = Self {
            accuracy: ratio(cm.tp + cm.tn, cm.total()),
            recall,
            precision,
            f1,
            roc_auc: roc_auc(y_true, probabilities),
        };
        (metrics, cm)
    }
}

/// Area under the ROC curve, trapezoid rule over tied score groups.
/// Returns 0.5 when only one class is present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> f64 {
    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .zip(y_true)
        .map(|(&s, &t)| (s, t == 1))
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let n_pos = pairs.iter().filter(|(_, t)| *t).count() as f64;
    let n_neg = pairs.len() as f64 - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        return 0.5;
    }

    let (mut tp, mut fp) = (0.0, 0.0);
    let (mut tpr_prev, mut fpr_prev) = (0.0, 0.0);
    let mut auc = 0.0;

    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0;
        while i < pairs.len() && pairs[i].0 == score {
            if pairs[i].1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }

        let tpr = tp / n_pos;
        let fpr = fp / n_neg;
        auc += (fpr - fpr_prev) * (tpr + tpr_prev) / 2.0;
        tpr_prev = tpr;
        fpr_prev = fpr;
    }

    auc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix() {
        let cm = ConfusionMatrix::from_labels(&[1, 1, 0, 0, 1], &[1, 0, 0, 1, 1]);
        assert_eq!(cm, ConfusionMatrix { tp: 2, tn: 1, fp: 1, fn_: 1 });
    }

    #[test]
    fn test_evaluate_metrics() {
        let y = [1, 1, 0, 0, 1, 0];
        let p = [0.9, 0.4, 0.2, 0.6, 0.7, 0.1];
        let (m, cm) = EvaluationMetrics::evaluate(&y, &p, 0.5);

        assert_eq!(cm.total(), 6);
        assert!((m.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_changes_labels() {
        let y = [1, 0];
        let p = [0.35, 0.2];
        let (at_half, _) = EvaluationMetrics::evaluate(&y, &p, 0.5);
        let (at_third, _) = EvaluationMetrics::evaluate(&y, &p, 0.3);

        assert_eq!(at_half.recall, 0.0);
        assert_eq!(at_third.recall, 1.0);
    }

    #[test]
    fn test_roc_auc() {
        assert_eq!(roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]), 1.0);
        assert_eq!(roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]), 0.0);
        assert_eq!(roc_auc(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]), 0.5);
        assert!((roc_auc(&[0, 1, 0, 1], &[0.1, 0.4, 0.5, 0.8]) - 0.75).abs() < 1e-12);
        assert_eq!(roc_auc(&[1, 1], &[0.3, 0.4]), 0.5);
    }

    #[test]
    fn test_metric_keys() {
        let (m, _) = EvaluationMetrics::evaluate(&[1, 0], &[0.9, 0.1], 0.5);
        let json = serde_json::to_value(&m).unwrap();
        for key in ["accuracy", "recall", "precision", "F1-score", "ROC-AUC"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
