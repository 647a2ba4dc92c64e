// src/common/lenient.rs
//
// Os formulários do painel mandam tudo como texto ("12", "", null).
// Estes desserializadores aceitam número ou texto e tratam vazio como ausente.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Number(i64),
    Text(String),
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("número inválido: {trimmed}")))
        }
    }
}

/// Aceita "AAAA-MM-DD" ou um carimbo ISO completo (usa só a parte da data).
pub fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<BoolLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolLike::Bool(b)) => Ok(Some(b)),
        Some(BoolLike::Number(n)) => Ok(Some(n != 0)),
        Some(BoolLike::Text(s)) => match s.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "si" | "sí" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("booleano inválido: {other}"))),
        },
    }
}

/// Texto vazio ou só com espaços vira `None`.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("data inválida: {trimmed}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_i64")]
        id: Option<i64>,
        #[serde(default, deserialize_with = "opt_date")]
        date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "opt_bool")]
        flag: Option<bool>,
        #[serde(default, deserialize_with = "opt_text")]
        text: Option<String>,
    }

    #[test]
    fn accepts_form_style_values() {
        let p: Probe = serde_json::from_str(
            r#"{"id":"42","date":"2025-03-01T05:00:00.000Z","flag":"1","text":"  "}"#,
        )
        .unwrap();
        assert_eq!(p.id, Some(42));
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(p.flag, Some(true));
        assert_eq!(p.text, None);
    }

    #[test]
    fn empty_and_null_are_absent() {
        let p: Probe = serde_json::from_str(r#"{"id":"","date":null,"flag":false}"#).unwrap();
        assert_eq!(p.id, None);
        assert_eq!(p.date, None);
        assert_eq!(p.flag, Some(false));

        let p: Probe = serde_json::from_str("{}").unwrap();
        assert!(p.id.is_none() && p.date.is_none() && p.flag.is_none() && p.text.is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Probe>(r#"{"id":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"date":"31/12/2025"}"#).is_err());
    }
}
