//! Confidence review of the data read off an accepted document.
//!
//! Runs once when a session completes. It never changes the flow state; it
//! only adds alerts to the transcript and flags the outcome for manual review
//! when too many critical fields are uncertain.

use crate::model::{DocumentKind, ExtractedData, ExtractedField, Field};

/// Merge the fields read from both sides.
///
/// A value present on one side only is kept. When both sides carry a value
/// the higher confidence wins, ties going to the second side.
pub fn merge_extracted(first: &ExtractedData, second: &ExtractedData) -> ExtractedData {
    let mut merged = ExtractedData::default();
    for field in Field::ALL {
        let a = first.get(field).filter(|f| f.is_present());
        let b = second.get(field).filter(|f| f.is_present());
        let pick: Option<&ExtractedField> = match (a, b) {
            (Some(a), Some(b)) => Some(if b.confidence >= a.confidence { b } else { a }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        if let Some(f) = pick {
            merged.insert(field, f.clone());
        }
    }
    merged
}

/// One alert per critical field that was read with low confidence.
///
/// Missing fields do not raise alerts: there is nothing to verify.
pub fn build_alerts(data: &ExtractedData, kind: DocumentKind, threshold: f32) -> Vec<String> {
    kind.critical_fields()
        .iter()
        .filter_map(|&field| {
            let f = data.get(field)?;
            if f.is_present() && f.confidence < threshold {
                let pct = (f.confidence * 100.0) as u32;
                Some(format!(
                    "Low confidence in '{}' ({pct}%). Please verify it manually.",
                    field.label()
                ))
            } else {
                None
            }
        })
        .collect()
}

/// True when the alerts are numerous enough to ask for a better image.
pub fn needs_review(alerts: &[String], limit: usize) -> bool {
    alerts.len() >= limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(fields: &[(Field, &str, f32)]) -> ExtractedData {
        let mut d = ExtractedData::default();
        for &(field, value, conf) in fields {
            d.insert(field, ExtractedField::new(value, conf));
        }
        d
    }

    #[test]
    fn merge_prefers_present_then_confident() {
        let first = data(&[
            (Field::NumeroDocumento, "123", 0.9),
            (Field::Nombres, "ANA", 0.6),
        ]);
        let second = data(&[
            (Field::Nombres, "ANA MARIA", 0.95),
            (Field::LugarExpedicion, "BOGOTÁ", 0.8),
        ]);

        let merged = merge_extracted(&first, &second);
        assert_eq!(merged.get(Field::NumeroDocumento).unwrap().value.as_deref(), Some("123"));
        assert_eq!(merged.get(Field::Nombres).unwrap().value.as_deref(), Some("ANA MARIA"));
        assert_eq!(merged.get(Field::LugarExpedicion).unwrap().value.as_deref(), Some("BOGOTÁ"));
        assert!(merged.get(Field::Sexo).is_none());
    }

    #[test]
    fn merge_keeps_first_when_more_confident() {
        let first = data(&[(Field::Apellidos, "PEREZ", 0.99)]);
        let second = data(&[(Field::Apellidos, "PERES", 0.5)]);
        let merged = merge_extracted(&first, &second);
        assert_eq!(merged.get(Field::Apellidos).unwrap().value.as_deref(), Some("PEREZ"));
    }

    #[test]
    fn alerts_only_for_present_low_confidence_critical_fields() {
        let d = data(&[
            (Field::NumeroDocumento, "1020304050", 0.5),
            (Field::Nombres, "JUAN", 0.99),
            // Not critical for a cédula.
            (Field::LugarNacimiento, "CALI", 0.1),
        ]);
        let alerts = build_alerts(&d, DocumentKind::CedulaCiudadania, 0.85);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("Document number"));
        assert!(alerts[0].contains("50%"));
    }

    #[test]
    fn review_threshold() {
        let alerts = vec!["a".to_string(), "b".to_string()];
        assert!(needs_review(&alerts, 2));
        assert!(!needs_review(&alerts[..1], 2));
    }
}
