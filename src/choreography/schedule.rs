use crate::utils::serde::deserialize_optional_string_or_number;
use serde::{Deserialize, Serialize};

/// Keyword form of a schedule, rendered to a six-field `cron(...)` expression.
///
/// Defaults: `minute`, `hour`, `month` and `year` fall back to `*`; `week_day`
/// falls back to `?`; `day` falls back to `?` when `week_day` is given and to `*`
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub minute: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub hour: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub month: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub week_day: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub year: Option<String>,
}

impl CronSchedule {
    pub fn validate(&self) -> Result<(), String> {
        if self.day.is_some() && self.week_day.is_some() {
            return Err("Cannot supply both 'day' and 'week_day' in a cron schedule".to_string());
        }

        let fields = [
            ("minute", &self.minute),
            ("hour", &self.hour),
            ("day", &self.day),
            ("month", &self.month),
            ("week_day", &self.week_day),
            ("year", &self.year),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                if value.is_empty() || value.chars().any(char::is_whitespace) {
                    return Err(format!("Cron field '{name}' has invalid value '{value}'"));
                }
            }
        }

        Ok(())
    }

    pub fn expression(&self) -> String {
        let field = |value: &Option<String>, default: &str| {
            value.clone().unwrap_or_else(|| default.to_string())
        };
        let day_default = if self.week_day.is_some() { "?" } else { "*" };

        format!(
            "cron({} {} {} {} {} {})",
            field(&self.minute, "*"),
            field(&self.hour, "*"),
            field(&self.day, day_default),
            field(&self.month, "*"),
            field(&self.week_day, "?"),
            field(&self.year, "*"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_expression() {
        let schedule = CronSchedule {
            minute: Some("0".to_string()),
            hour: Some("4".to_string()),
            ..Default::default()
        };
        assert_eq!(schedule.expression(), "cron(0 4 * * ? *)");
    }

    #[test]
    fn test_week_day_moves_day_to_question_mark() {
        let schedule = CronSchedule {
            minute: Some("30".to_string()),
            hour: Some("2".to_string()),
            week_day: Some("MON-FRI".to_string()),
            ..Default::default()
        };
        assert_eq!(schedule.expression(), "cron(30 2 ? * MON-FRI *)");
    }

    #[test]
    fn test_validation() {
        let both = CronSchedule {
            day: Some("1".to_string()),
            week_day: Some("MON".to_string()),
            ..Default::default()
        };
        assert!(both.validate().is_err());

        let blank = CronSchedule {
            hour: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        assert!(CronSchedule::default().validate().is_ok());
    }
}
