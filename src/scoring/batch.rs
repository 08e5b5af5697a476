//! Sequential batch processing with per-item error isolation

use std::fmt::Display;
use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

/// One failed batch item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub index: usize,
    pub student_id: Option<Uuid>,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<T> {
    pub successful: Vec<T>,
    pub failed: Vec<BatchFailure>,
    pub summary: BatchSummary,
}

/// Items that know which student they reference
pub trait BatchItem {
    fn student_id(&self) -> Option<Uuid>;
}

/// Run `process` over `items` one at a time. A failing item is recorded with
/// its index and the loop moves on.
pub async fn run<I, T, E, F, Fut>(items: Vec<I>, mut process: F) -> BatchOutcome<T>
where
    I: BatchItem,
    E: Display,
    F: FnMut(usize, I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = items.len();
    let mut successful = Vec::new();
    let mut failed = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let student_id = item.student_id();

        match process(index, item).await {
            Ok(result) => successful.push(result),
            Err(err) => {
                tracing::warn!("Batch item {} failed: {}", index, err);
                failed.push(BatchFailure {
                    index,
                    student_id,
                    error: err.to_string(),
                });
            }
        }
    }

    let summary = BatchSummary {
        total,
        successful: successful.len(),
        failed: failed.len(),
    };

    BatchOutcome { successful, failed, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{predict_local, FeatureVector, PredictionStatus};

    struct Item {
        student_id: Uuid,
        features: FeatureVector,
    }

    impl BatchItem for Item {
        fn student_id(&self) -> Option<Uuid> {
            Some(self.student_id)
        }
    }

    fn features(hours: f64) -> FeatureVector {
        FeatureVector {
            hours_studied: hours,
            attendance: 90.0,
            sleep_hours: 8.0,
            previous_scores: 75.0,
            motivation: 7.0,
            tutoring_sessions: 2,
            teacher_quality: 7.0,
            physical_activity: 4.0,
            extracurricular: true,
            learning_disability: false,
        }
    }

    #[tokio::test]
    async fn test_missing_student_is_isolated() {
        let known = [Uuid::new_v4(), Uuid::new_v4()];
        let missing = Uuid::new_v4();

        let items = vec![
            Item { student_id: known[0], features: features(5.0) },
            Item { student_id: missing, features: features(2.0) },
            Item { student_id: known[1], features: features(8.0) },
        ];

        let outcome = run(items, |index, item| {
            let exists = known.contains(&item.student_id);
            async move {
                if !exists {
                    return Err("Student not found");
                }
                Ok((index, predict_local(&item.features).prediction_status))
            }
        })
        .await;

        assert_eq!(outcome.summary, BatchSummary { total: 3, successful: 2, failed: 1 });
        assert_eq!(outcome.successful[0], (0, PredictionStatus::AtRisk));
        assert_eq!(outcome.successful[1].0, 2);
        assert_eq!(
            outcome.failed,
            vec![BatchFailure {
                index: 1,
                student_id: Some(missing),
                error: "Student not found".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_items_processed_in_order() {
        let items: Vec<Item> = (0..4)
            .map(|i| Item { student_id: Uuid::new_v4(), features: features(i as f64) })
            .collect();

        let mut seen = Vec::new();
        let outcome = run(items, |index, _item| {
            seen.push(index);
            async move { Ok::<_, String>(index) }
        })
        .await;

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(outcome.successful, vec![0, 1, 2, 3]);
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let outcome = tokio_test::block_on(run(Vec::<Item>::new(), |_, _| async {
            Ok::<(), String>(())
        }));

        assert_eq!(outcome.summary, BatchSummary { total: 0, successful: 0, failed: 0 });
    }
}
