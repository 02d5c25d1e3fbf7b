use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One month of reported revenue, most recent last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: Uuid,
    pub destination: String,
    pub departed_on: NaiveDate,
    pub documented: bool,
}

/// Read-only per-company input to one analysis pass. Assembled by the storage
/// layer; the engine never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub company_id: Uuid,
    pub last_submission_date: Option<NaiveDate>,
    /// Ordered oldest-first; the evaluator looks at the tail.
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub trips: Vec<TripRecord>,
}

impl FinancialSnapshot {
    pub fn empty(company_id: Uuid) -> Self {
        Self {
            company_id,
            last_submission_date: None,
            monthly_revenue: Vec::new(),
            trips: Vec::new(),
        }
    }
}
