//! Over-allocation pass.
//!
//! Hours are summed per `(alias, week)` across every entry of a person record.
//! Entries without a declared capacity do not take part in the capacity
//! agreement check; the week falls back to the default capacity only when no
//! entry declares one.

use super::schema::DatasetFacts;
use super::{ValidationReport, CAPACITY_EPSILON};
use crate::model::week::{round1, WeekId, DEFAULT_CAPACITY_HOURS};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct WeekBucket {
    hours: f64,
    declared: Vec<f64>,
}

pub(super) fn check(facts: &DatasetFacts, report: &mut ValidationReport) {
    for person in &facts.people {
        let mut buckets: BTreeMap<WeekId, WeekBucket> = BTreeMap::new();
        for entry in &person.entries {
            for week in &entry.weeks {
                let bucket = buckets.entry(*week).or_default();
                bucket.hours += entry.planned_hours;
                if let Some(capacity) = entry.declared_capacity {
                    bucket.declared.push(capacity);
                }
            }
        }

        for (week, bucket) in buckets {
            let Some(capacity) = agreed_capacity(&bucket.declared) else {
                let listed: Vec<String> = bucket.declared.iter().map(|c| c.to_string()).collect();
                report.errors.push(format!(
                    "conflicting capacity_hours for alias '{}' in week {week}: {}",
                    person.alias,
                    listed.join(", ")
                ));
                continue;
            };
            if bucket.hours > capacity + CAPACITY_EPSILON {
                report.errors.push(format!(
                    "over-allocation: alias '{}' has {:.1} planned hours in week {week} against capacity {:.1} ({:.1}%)",
                    person.alias,
                    round1(bucket.hours),
                    capacity,
                    round1(bucket.hours / capacity * 100.0)
                ));
            }
        }
    }
}

/// Single capacity shared by all declarations; `None` when they disagree.
fn agreed_capacity(declared: &[f64]) -> Option<f64> {
    let Some(first) = declared.first().copied() else {
        return Some(DEFAULT_CAPACITY_HOURS);
    };
    declared
        .iter()
        .all(|capacity| (capacity - first).abs() <= CAPACITY_EPSILON)
        .then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agreed_capacity_defaults_and_detects_conflicts() {
        assert_eq!(agreed_capacity(&[]), Some(DEFAULT_CAPACITY_HOURS));
        assert_eq!(agreed_capacity(&[32.0, 32.0]), Some(32.0));
        assert_eq!(agreed_capacity(&[32.0, 40.0]), None);
    }
}
