use crate::domain::sample::Channel;
use crate::error::FetchError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelReading {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

pub fn parse_series(
    channel: Channel,
    array_key: &str,
    value_field: &str,
    body: &Value,
) -> Result<Vec<ChannelReading>, FetchError> {
    let shape = |detail: String| FetchError::DataShape { channel, detail };

    let items = match body {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get(array_key) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(shape(format!("`{array_key}` is not an array"))),
            None => return Err(shape(format!("missing array key `{array_key}`"))),
        },
        _ => return Err(shape("body is neither an object nor an array".to_string())),
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let date_str = item
            .get("dateTime")
            .and_then(Value::as_str)
            .ok_or_else(|| shape(format!("element {idx} has no dateTime")))?;
        let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
            .map_err(|e| shape(format!("element {idx} has invalid dateTime {date_str:?}: {e}")))?;

        let value = item
            .get("value")
            .and_then(|v| v.get(value_field))
            .and_then(parse_num);

        out.push(ChannelReading { date, value });
    }
    Ok(out)
}

fn parse_num(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_value_field() {
        let body = json!({
            "hrv": [
                {"dateTime": "2026-01-04", "value": {"dailyRmssd": 41.2, "deepRmssd": 48.0}},
                {"dateTime": "2026-01-05", "value": {"dailyRmssd": 38.9, "deepRmssd": 44.1}}
            ]
        });
        let got = parse_series(Channel::Hrv, "hrv", "dailyRmssd", &body).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].date, NaiveDate::from_ymd_opt(2026, 1, 4).unwrap());
        assert_eq!(got[0].value, Some(41.2));
        assert_eq!(got[1].value, Some(38.9));
    }

    #[test]
    fn missing_value_field_is_none_not_zero() {
        let body = json!({
            "tempSkin": [
                {"dateTime": "2026-01-04", "value": {}},
                {"dateTime": "2026-01-05", "value": {"nightlyRelative": "-0.4"}},
                {"dateTime": "2026-01-06", "value": {"nightlyRelative": null}},
                {"dateTime": "2026-01-07"}
            ]
        });
        let got =
            parse_series(Channel::SkinTemperature, "tempSkin", "nightlyRelative", &body).unwrap();
        let values: Vec<_> = got.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![None, Some(-0.4), None, None]);
    }

    #[test]
    fn missing_array_key_is_a_shape_error() {
        let body = json!({"errors": [{"errorType": "system"}]});
        let err = parse_series(Channel::BreathingRate, "br", "breathingRate", &body).unwrap_err();
        assert!(matches!(err, FetchError::DataShape { channel: Channel::BreathingRate, .. }));
    }

    #[test]
    fn non_array_metric_field_is_a_shape_error() {
        let body = json!({"br": {"dateTime": "2026-01-04"}});
        let err = parse_series(Channel::BreathingRate, "br", "breathingRate", &body).unwrap_err();
        assert!(err.to_string().contains("`br` is not an array"));
    }

    #[test]
    fn accepts_bare_top_level_array() {
        let body = json!([
            {"dateTime": "2026-01-04", "value": {"avg": 96.4, "min": 93.0, "max": 99.1}}
        ]);
        let got = parse_series(Channel::OxygenSaturation, "spo2", "avg", &body).unwrap();
        assert_eq!(got[0].value, Some(96.4));
    }

    #[test]
    fn rejects_unparseable_dates() {
        let body = json!({"hrv": [{"dateTime": "01/04/2026", "value": {"dailyRmssd": 40}}]});
        assert!(parse_series(Channel::Hrv, "hrv", "dailyRmssd", &body).is_err());
    }
}
