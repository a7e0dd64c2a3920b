//! Employee scheduling fixtures.
//!
//! Shifts are planning entities whose employee is assigned through a
//! `RwLock`, the way a solver mutates a shared working solution between the
//! before/after notifications of a score director.
//!
//! # Example
//!
//! ```
//! use scoreforge_test::shift::ShiftSchedule;
//!
//! let schedule = ShiftSchedule::generate(3, 2, 3);
//! assert_eq!(schedule.shifts.len(), 6);
//! assert_eq!(schedule.unassigned_count(), 6);
//!
//! schedule.shifts[0].assign(Some(1));
//! schedule.shifts[1].assign(Some(1));
//! // 06-14 and 10-18 on the same day overlap
//! assert_eq!(schedule.overlap_count(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use scoreforge_core::HardSoftScore;

/// Problem fact: someone who can work shifts.
#[derive(Debug)]
pub struct Employee {
    pub id: i64,
    pub name: String,
}

impl Employee {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// Planning entity: a time slot that needs one employee.
#[derive(Debug)]
pub struct Shift {
    pub id: i64,
    pub day: i64,
    /// Start hour, inclusive.
    pub start: i64,
    /// End hour, exclusive.
    pub end: i64,
    employee: RwLock<Option<i64>>,
}

impl Shift {
    pub fn new(id: i64, day: i64, start: i64, end: i64) -> Self {
        Self {
            id,
            day,
            start,
            end,
            employee: RwLock::new(None),
        }
    }

    /// Creates a shift that is already assigned.
    pub fn assigned(id: i64, day: i64, start: i64, end: i64, employee: i64) -> Self {
        let shift = Self::new(id, day, start, end);
        shift.assign(Some(employee));
        shift
    }

    pub fn employee(&self) -> Option<i64> {
        *self.employee.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn assign(&self, employee: Option<i64>) {
        *self.employee.write().unwrap_or_else(PoisonError::into_inner) = employee;
    }

    pub fn is_assigned(&self) -> bool {
        self.employee().is_some()
    }

    pub fn hours(&self) -> i64 {
        self.end - self.start
    }

    /// Same day and intersecting hours.
    pub fn overlaps(&self, other: &Shift) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

/// A complete scheduling problem.
#[derive(Debug, Clone)]
pub struct ShiftSchedule {
    pub employees: Vec<Arc<Employee>>,
    pub shifts: Vec<Arc<Shift>>,
}

impl ShiftSchedule {
    pub fn new(employees: Vec<Arc<Employee>>, shifts: Vec<Arc<Shift>>) -> Self {
        Self { employees, shifts }
    }

    /// Deterministic unassigned schedule.
    ///
    /// Shifts last 8 hours and start every 4 hours from 06:00, so
    /// consecutive shifts of a day overlap.
    pub fn generate(employee_count: usize, days: usize, shifts_per_day: usize) -> Self {
        let employees = (0..employee_count)
            .map(|i| Arc::new(Employee::new(i as i64, &format!("Employee {i}"))))
            .collect();
        let shifts = (0..days * shifts_per_day)
            .map(|i| {
                let day = (i / shifts_per_day) as i64;
                let start = 6 + (i % shifts_per_day) as i64 * 4;
                Arc::new(Shift::new(i as i64, day, start, start + 8))
            })
            .collect();
        Self { employees, shifts }
    }

    pub fn unassigned_count(&self) -> usize {
        self.shifts.iter().filter(|s| !s.is_assigned()).count()
    }

    /// Unordered pairs of overlapping shifts given to the same employee.
    pub fn overlap_count(&self) -> usize {
        let mut count = 0;
        for (i, a) in self.shifts.iter().enumerate() {
            for b in &self.shifts[i + 1..] {
                if a.employee().is_some() && a.employee() == b.employee() && a.overlaps(b) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Assigned shift count per employee id; employees without shifts are absent.
    pub fn shifts_per_employee(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for employee in self.shifts.iter().filter_map(|s| s.employee()) {
            *counts.entry(employee).or_insert(0) += 1;
        }
        counts
    }

    pub fn idle_employee_count(&self) -> usize {
        let busy = self.shifts_per_employee();
        self.employees
            .iter()
            .filter(|e| !busy.contains_key(&e.id))
            .count()
    }

    /// Brute-force score of the reference scheduling rules:
    /// - 1 hard per overlapping pair;
    /// - 1 soft per unassigned shift;
    /// - 1 soft per idle employee;
    /// - 1 soft per shift beyond the second of any employee.
    pub fn brute_force_score(&self) -> HardSoftScore {
        let overload: usize = self
            .shifts_per_employee()
            .values()
            .map(|count| count.saturating_sub(2))
            .sum();
        let soft = self.unassigned_count() + self.idle_employee_count() + overload;
        HardSoftScore::of(-(self.overlap_count() as i64), -(soft as i64))
    }
}
