use std::str::FromStr;

use augur_models::decision::{Decision, RiskLevel, Signal};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::AgentError;

/// Confidence assumed when the model omits it.
pub fn default_confidence() -> Decimal {
    Decimal::new(5, 1)
}

/// Parse the advisor model's raw output into decisions.
///
/// Handles common response formats:
/// - Clean array: `[{"signal": "BUY_YES", ...}]`
/// - Fenced: ```json\n[...]\n```
/// - Prefix text: `Here are my picks:\n[...]`
///
/// Non-object elements are skipped. Confidence is clamped into `[0, 1]`.
pub fn parse_decisions(raw: &str) -> Result<Vec<Decision>, AgentError> {
    let elements = extract_array(raw)?;
    Ok(elements
        .iter()
        .filter_map(Value::as_object)
        .map(decision_from_object)
        .collect())
}

fn extract_array(raw: &str) -> Result<Vec<Value>, AgentError> {
    let text = strip_code_fence(raw);

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(elements)) => return Ok(elements),
        Ok(other) => {
            return Err(AgentError::Parse(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            )))
        }
        Err(_) => {}
    }

    if let Some(candidate) = extract_first_array(text) {
        if let Ok(Value::Array(elements)) = serde_json::from_str::<Value>(candidate) {
            return Ok(elements);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON array found in response (length={})",
        raw.len()
    )))
}

/// Drop a leading ``` line (with or without a language tag) and a trailing ```.
fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = match text.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        };
        text = text.trim_end();
        if let Some(stripped) = text.strip_suffix("```") {
            text = stripped;
        }
    }
    text.trim()
}

/// Find the first balanced [ ... ] in the text.
fn extract_first_array(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' if start.is_some() => {
                in_string = !in_string;
            }
            '[' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            ']' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

fn decision_from_object(obj: &Map<String, Value>) -> Decision {
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let signal = obj
        .get("signal")
        .and_then(Value::as_str)
        .and_then(Signal::parse)
        .unwrap_or(Signal::Hold);

    let risk_level = obj
        .get("risk_level")
        .and_then(Value::as_str)
        .and_then(RiskLevel::parse)
        .unwrap_or_default();

    let key_factors = match obj.get("key_factors") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.is_empty() => vec![single.clone()],
        _ => vec![],
    };

    Decision {
        market_question: text("market_question"),
        market_slug: text("market_slug"),
        signal,
        confidence: clamp_confidence(parse_confidence(obj.get("confidence"))),
        reasoning: text("reasoning"),
        key_factors,
        risk_level,
    }
}

/// Accepts a JSON number or a numeric string; anything else yields the default.
fn parse_confidence(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => decimal_from_str(&n.to_string()).unwrap_or_else(|| {
            // Out of Decimal's range: only the sign matters once clamped.
            match n.as_f64() {
                Some(f) if f > 0.0 => Decimal::ONE,
                _ => Decimal::ZERO,
            }
        }),
        Some(Value::String(s)) => decimal_from_str(s.trim()).unwrap_or_else(default_confidence),
        _ => default_confidence(),
    }
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

pub fn clamp_confidence(confidence: Decimal) -> Decimal {
    confidence.clamp(Decimal::ZERO, Decimal::ONE).normalize()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_clean_array() {
        let raw = r#"[{"market_question": "Will X?", "market_slug": "will-x", "signal": "BUY_YES",
            "confidence": 0.82, "reasoning": "Whales buying", "key_factors": ["a", "b"],
            "risk_level": "low"}]"#;
        let decisions = parse_decisions(raw).unwrap();
        assert_eq!(decisions.len(), 1);
        let d = &decisions[0];
        assert_eq!(d.market_slug, "will-x");
        assert_eq!(d.signal, Signal::BuyYes);
        assert_eq!(d.confidence, dec!(0.82));
        assert_eq!(d.key_factors, vec!["a", "b"]);
        assert_eq!(d.risk_level, RiskLevel::Low);
    }

    #[test]
    fn strips_code_fences() {
        let raw = "```json\n[{\"signal\": \"HOLD\", \"confidence\": 0.4}]\n```";
        let decisions = parse_decisions(raw).unwrap();
        assert_eq!(decisions[0].signal, Signal::Hold);

        let raw = "```\n[]\n```";
        assert!(parse_decisions(raw).unwrap().is_empty());
    }

    #[test]
    fn falls_back_to_first_balanced_array() {
        let raw = "Here are my picks:\n[{\"signal\": \"BUY_NO\", \"reasoning\": \"a [b] c\"}]\nGood luck!";
        let decisions = parse_decisions(raw).unwrap();
        assert_eq!(decisions[0].signal, Signal::BuyNo);
        assert_eq!(decisions[0].reasoning, "a [b] c");
    }

    #[test]
    fn applies_defaults() {
        let decisions = parse_decisions("[{}]").unwrap();
        let d = &decisions[0];
        assert_eq!(d.market_question, "");
        assert_eq!(d.signal, Signal::Hold);
        assert_eq!(d.confidence, dec!(0.5));
        assert!(d.key_factors.is_empty());
        assert_eq!(d.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn unknown_signal_becomes_hold() {
        let decisions = parse_decisions(r#"[{"signal": "STRONG_BUY", "risk_level": "extreme"}]"#).unwrap();
        assert_eq!(decisions[0].signal, Signal::Hold);
        assert_eq!(decisions[0].risk_level, RiskLevel::Medium);
    }

    #[test]
    fn confidence_is_clamped() {
        let raw = r#"[{"confidence": 1.4}, {"confidence": -0.3}, {"confidence": 0.55},
            {"confidence": "0.7"}, {"confidence": "very"}, {"confidence": 1e-7}, {"confidence": 1}]"#;
        let confidences: Vec<Decimal> = parse_decisions(raw)
            .unwrap()
            .into_iter()
            .map(|d| d.confidence)
            .collect();
        assert_eq!(
            confidences,
            vec![dec!(1), dec!(0), dec!(0.55), dec!(0.7), dec!(0.5), dec!(0.0000001), dec!(1)]
        );
    }

    #[test]
    fn non_object_elements_are_skipped() {
        let decisions = parse_decisions(r#"["noise", 3, {"signal": "SKIP"}, null]"#).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].signal, Signal::Skip);
    }

    #[test]
    fn rejects_non_array_json() {
        let err = parse_decisions(r#"{"signal": "BUY_YES"}"#).unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn rejects_plain_text() {
        assert!(matches!(
            parse_decisions("I cannot help with that."),
            Err(AgentError::Parse(_))
        ));
    }

    #[test]
    fn single_string_key_factor() {
        let decisions = parse_decisions(r#"[{"key_factors": "ETF inflows"}]"#).unwrap();
        assert_eq!(decisions[0].key_factors, vec!["ETF inflows"]);
    }
}
