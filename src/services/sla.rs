// src/services/sla.rs
//
// Indicadores de prazo (ANS) calculados a partir das datas do caso.

use chrono::NaiveDate;

use crate::models::ticket::SlaSnapshot;

pub const YES: &str = "SI";
pub const NO: &str = "NO";

/// "SI"/"NO"; `None` quando o caso não tem data limite.
/// Com resposta registrada nunca está vencido.
pub fn classify_overdue(
    due_date: Option<NaiveDate>,
    responded_on: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<&'static str> {
    let due = due_date?;
    if responded_on.is_some() {
        return Some(NO);
    }
    // vence quando data limite + 1 dia já passou
    if today > due { Some(YES) } else { Some(NO) }
}

pub fn sla_indicator(due_date: Option<NaiveDate>, responded_on: Option<NaiveDate>) -> Option<&'static str> {
    match (due_date, responded_on) {
        (Some(due), Some(responded)) if responded <= due => Some("CUMPLE"),
        (Some(_), Some(_)) => Some("INCUMPLE"),
        _ => None,
    }
}

pub fn days_between(later: Option<NaiveDate>, earlier: Option<NaiveDate>) -> Option<i32> {
    let days = (later? - earlier?).num_days();
    i32::try_from(days).ok()
}

pub struct SlaInputs {
    pub submitted_on: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub responded_on: Option<NaiveDate>,
    pub closed_on: Option<NaiveDate>,
}

pub fn derive(inputs: &SlaInputs, today: NaiveDate) -> SlaSnapshot {
    SlaSnapshot {
        overdue: classify_overdue(inputs.due_date, inputs.responded_on, today).map(str::to_string),
        sla_indicator: sla_indicator(inputs.due_date, inputs.responded_on).map(str::to_string),
        operational_elapsed_days: days_between(inputs.due_date, inputs.responded_on),
        real_elapsed_days: days_between(inputs.closed_on, Some(inputs.submitted_on)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn overdue_classification() {
        let due = Some(d(2025, 3, 10));
        // com resposta: sempre NO
        assert_eq!(classify_overdue(due, Some(d(2025, 4, 1)), d(2025, 5, 1)), Some(NO));
        // sem resposta e depois do prazo
        assert_eq!(classify_overdue(due, None, d(2025, 3, 11)), Some(YES));
        // sem resposta, no próprio dia limite
        assert_eq!(classify_overdue(due, None, d(2025, 3, 10)), Some(NO));
        assert_eq!(classify_overdue(due, None, d(2025, 3, 1)), Some(NO));
        assert_eq!(classify_overdue(None, None, d(2025, 3, 1)), None);
    }

    #[test]
    fn indicator_compares_response_to_due_date() {
        let due = Some(d(2025, 3, 10));
        assert_eq!(sla_indicator(due, Some(d(2025, 3, 10))), Some("CUMPLE"));
        assert_eq!(sla_indicator(due, Some(d(2025, 3, 11))), Some("INCUMPLE"));
        assert_eq!(sla_indicator(due, None), None);
        assert_eq!(sla_indicator(None, Some(d(2025, 3, 11))), None);
    }

    #[test]
    fn derives_elapsed_days() {
        let snapshot = derive(
            &SlaInputs {
                submitted_on: d(2025, 3, 1),
                due_date: Some(d(2025, 3, 10)),
                responded_on: Some(d(2025, 3, 8)),
                closed_on: Some(d(2025, 3, 12)),
            },
            d(2025, 3, 20),
        );
        assert_eq!(snapshot.operational_elapsed_days, Some(2));
        assert_eq!(snapshot.real_elapsed_days, Some(11));
        assert_eq!(snapshot.overdue.as_deref(), Some(NO));
        assert_eq!(snapshot.sla_indicator.as_deref(), Some("CUMPLE"));
    }
}
