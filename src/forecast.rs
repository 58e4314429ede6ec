use crate::dataset::Dataset;
use crate::error::FetchError;
use serde_json::Value;

/// Lead hours of a multi-hour request: one hour, or a sequence fetched in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadHours {
    Single(u32),
    Many(Vec<u32>),
}

impl From<u32> for LeadHours {
    fn from(hour: u32) -> Self {
        LeadHours::Single(hour)
    }
}

impl From<Vec<u32>> for LeadHours {
    fn from(hours: Vec<u32>) -> Self {
        LeadHours::Many(hours)
    }
}

impl From<&[u32]> for LeadHours {
    fn from(hours: &[u32]) -> Self {
        LeadHours::Many(hours.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for LeadHours {
    fn from(hours: [u32; N]) -> Self {
        LeadHours::Many(hours.to_vec())
    }
}

/// Accepts a non-negative integer or an array of them, as found in JSON requests.
impl TryFrom<Value> for LeadHours {
    type Error = FetchError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let hour = |v: &Value| v.as_u64().and_then(|h| u32::try_from(h).ok());
        let parsed = match &value {
            Value::Number(_) => hour(&value).map(LeadHours::Single),
            Value::Array(items) => items
                .iter()
                .map(hour)
                .collect::<Option<Vec<_>>>()
                .map(LeadHours::Many),
            _ => None,
        };
        parsed.ok_or_else(|| FetchError::UnsupportedRequest(value.to_string()))
    }
}

/// Result of a multi-hour request, shaped like its [`LeadHours`].
#[derive(Debug, Clone, PartialEq)]
pub enum Forecasts {
    Single(Dataset),
    Many(Vec<Dataset>),
}

impl Forecasts {
    pub fn len(&self) -> usize {
        match self {
            Forecasts::Single(_) => 1,
            Forecasts::Many(all) => all.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<Dataset> {
        match self {
            Forecasts::Single(one) => vec![one],
            Forecasts::Many(all) => all,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_hours_from_json() {
        assert_eq!(LeadHours::try_from(json!(3)).unwrap(), LeadHours::Single(3));
        assert_eq!(
            LeadHours::try_from(json!([1, 2, 3])).unwrap(),
            LeadHours::Many(vec![1, 2, 3])
        );
        assert_eq!(LeadHours::try_from(json!([])).unwrap(), LeadHours::Many(vec![]));
    }

    #[test]
    fn test_unsupported_lead_hour_shapes() {
        for value in [json!("3"), json!(1.5), json!(-1), json!({"h": 1}), json!([1, "2"]), json!(null)] {
            match LeadHours::try_from(value.clone()) {
                Err(FetchError::UnsupportedRequest(text)) => assert_eq!(text, value.to_string()),
                other => panic!("{value} gave {other:?}"),
            }
        }
        let err = LeadHours::try_from(json!("3")).unwrap_err();
        assert_eq!(err.to_string(), r#""3" as forecast hours is not supported"#);
    }

    #[test]
    fn test_string_lead_hours_are_rejected() {
        for text in ["3", "1,2,3", "[4, 5]"] {
            assert!(matches!(
                LeadHours::try_from(json!(text)),
                Err(FetchError::UnsupportedRequest(_))
            ));
            assert!(matches!(
                LeadHours::try_from(Value::from(text.to_string())),
                Err(FetchError::UnsupportedRequest(_))
            ));
        }
    }

    #[test]
    fn test_conversions() {
        assert_eq!(LeadHours::from(6u32), LeadHours::Single(6));
        assert_eq!(LeadHours::from([1u32, 2]), LeadHours::Many(vec![1, 2]));
        assert_eq!(LeadHours::from(&[4u32][..]), LeadHours::Many(vec![4]));
    }
}
