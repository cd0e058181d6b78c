use std::ops::Range;

use crate::contract::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchAssignment {
    pub batch_id: usize,
    pub start_index: usize,
    pub end_index_exclusive: usize,
}

impl BatchAssignment {
    pub fn len(&self) -> usize {
        self.end_index_exclusive - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index_exclusive
    }
}

/// Splits `total_records` into consecutive batches of `max_batch_size`; only the
/// last batch may be smaller. Zero records produce an empty plan.
pub fn compute_batch_plan(
    total_records: usize,
    max_batch_size: usize,
) -> Result<Vec<BatchAssignment>, ValidationError> {
    if max_batch_size == 0 {
        return Err(ValidationError::new(
            "max_batch_size must be a positive integer",
        ));
    }

    let batch_count = total_records.div_ceil(max_batch_size);
    let mut assignments = Vec::with_capacity(batch_count);
    let mut cursor = 0usize;

    for batch_id in 0..batch_count {
        let end_index_exclusive = (cursor + max_batch_size).min(total_records);
        assignments.push(BatchAssignment {
            batch_id,
            start_index: cursor,
            end_index_exclusive,
        });
        cursor = end_index_exclusive;
    }

    validate_assignments(total_records, &assignments)?;
    Ok(assignments)
}

fn validate_assignments(
    total_records: usize,
    assignments: &[BatchAssignment],
) -> Result<(), ValidationError> {
    if assignments.is_empty() {
        return if total_records == 0 {
            Ok(())
        } else {
            Err(ValidationError::new("No batches planned for pending records"))
        };
    }

    if assignments[0].start_index != 0
        || assignments[assignments.len() - 1].end_index_exclusive != total_records
    {
        return Err(ValidationError::new(
            "Batch boundaries do not cover every record",
        ));
    }

    for idx in 1..assignments.len() {
        if assignments[idx - 1].end_index_exclusive != assignments[idx].start_index {
            return Err(ValidationError::new(
                "Batch boundaries overlap or leave gaps",
            ));
        }
    }

    if assignments.iter().any(BatchAssignment::is_empty) {
        return Err(ValidationError::new("Planned batch is empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_forty_five_records_into_twenty_twenty_five() {
        let plan = compute_batch_plan(45, 20).expect("plan should build");
        let sizes: Vec<_> = plan.iter().map(BatchAssignment::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
        assert_eq!(plan[2].range(), 40..45);
    }

    #[test]
    fn exact_multiple_has_no_trailing_batch() {
        let plan = compute_batch_plan(40, 20).expect("plan should build");
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|batch| batch.len() == 20));
    }

    #[test]
    fn no_records_means_no_batches() {
        assert!(compute_batch_plan(0, 20).expect("plan").is_empty());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let error = compute_batch_plan(5, 0).expect_err("zero size should fail");
        assert_eq!(error.message(), "max_batch_size must be a positive integer");
    }

    #[test]
    fn plan_covers_every_index_exactly_once() {
        for total in [1usize, 19, 20, 21, 99, 1000] {
            let plan = compute_batch_plan(total, 20).expect("plan should build");
            let covered: Vec<usize> = plan.iter().flat_map(BatchAssignment::range).collect();
            assert_eq!(covered, (0..total).collect::<Vec<_>>());
        }
    }
}
