//! Birth details: raw form input, coercion into the backend payload, and the
//! human-readable summary echoed back into the chat.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Error, PartialEq)]
pub enum BirthFormError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be a number (got '{value}')")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{0} is not a valid calendar date")]
    InvalidDate(String),

    #[error("Please provide the birth location (latitude and longitude)")]
    LocationMissing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSettings {
    pub observation_point: String,
    pub ayanamsha: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            observation_point: "topocentric".to_string(),
            ayanamsha: "lahiri".to_string(),
        }
    }
}

impl ChartSettings {
    fn labelled(&self) -> [(&'static str, &str); 2] {
        [
            ("observation_point", self.observation_point.as_str()),
            ("ayanamsha", self.ayanamsha.as_str()),
        ]
    }
}

/// Payload accepted by the backend's `/kundli` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthDetails {
    pub year: i32,
    pub month: u32,
    pub date: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub settings: ChartSettings,
    /// Display-only label; never sent to the backend.
    #[serde(skip)]
    pub place: Option<String>,
}

/// Raw text as typed by the user, before any coercion.
#[derive(Debug, Clone, Default)]
pub struct BirthForm {
    pub year: String,
    pub month: String,
    pub date: String,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
    pub latitude: String,
    pub longitude: String,
    pub timezone: String,
    pub place: String,
}

impl BirthForm {
    /// Fields still blank, in the order a prompt should ask for them.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "year" => Some(&mut self.year),
            "month" => Some(&mut self.month),
            "date" => Some(&mut self.date),
            "hours" => Some(&mut self.hours),
            "minutes" => Some(&mut self.minutes),
            "seconds" => Some(&mut self.seconds),
            "latitude" => Some(&mut self.latitude),
            "longitude" => Some(&mut self.longitude),
            _ => None,
        }
    }

    fn fields(&self) -> [(&'static str, &str); 8] {
        [
            ("year", &self.year),
            ("month", &self.month),
            ("date", &self.date),
            ("hours", &self.hours),
            ("minutes", &self.minutes),
            ("seconds", &self.seconds),
            ("latitude", &self.latitude),
            ("longitude", &self.longitude),
        ]
    }

    pub fn into_details(self) -> Result<BirthDetails, BirthFormError> {
        if self.latitude.trim().is_empty() || self.longitude.trim().is_empty() {
            return Err(BirthFormError::LocationMissing);
        }

        let year = parse_int("year", &self.year)?;
        let month = parse_int("month", &self.month)?;
        let date = parse_int("date", &self.date)?;
        let hours = parse_int("hours", &self.hours)?;
        let minutes = parse_int("minutes", &self.minutes)?;
        let seconds = parse_int("seconds", &self.seconds)?;

        check_range("year", year, 1, 9999)?;
        check_range("month", month, 1, 12)?;
        check_range("date", date, 1, 31)?;
        check_range("hours", hours, 0, 23)?;
        check_range("minutes", minutes, 0, 59)?;
        check_range("seconds", seconds, 0, 59)?;

        let (year, month, date) = (year as i32, month as u32, date as u32);
        if NaiveDate::from_ymd_opt(year, month, date).is_none() {
            return Err(BirthFormError::InvalidDate(format!(
                "{year:04}-{month:02}-{date:02}"
            )));
        }
        let (hours, minutes, seconds) = (hours as u32, minutes as u32, seconds as u32);
        debug_assert!(NaiveTime::from_hms_opt(hours, minutes, seconds).is_some());

        let latitude = parse_float("latitude", &self.latitude)?;
        let longitude = parse_float("longitude", &self.longitude)?;
        check_float_range("latitude", latitude, -90.0, 90.0)?;
        check_float_range("longitude", longitude, -180.0, 180.0)?;

        let timezone = match self.timezone.trim() {
            "" => DEFAULT_TIMEZONE.to_string(),
            tz => tz.to_string(),
        };
        let place = Some(self.place.trim().to_string()).filter(|p| !p.is_empty());

        Ok(BirthDetails {
            year,
            month,
            date,
            hours,
            minutes,
            seconds,
            latitude,
            longitude,
            timezone,
            settings: ChartSettings::default(),
            place,
        })
    }
}

fn parse_int(field: &'static str, raw: &str) -> Result<i64, BirthFormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BirthFormError::MissingField(field));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| BirthFormError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        })
}

fn parse_float(field: &'static str, raw: &str) -> Result<f64, BirthFormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BirthFormError::MissingField(field));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(BirthFormError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), BirthFormError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(BirthFormError::OutOfRange {
            field,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        })
    }
}

fn check_float_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), BirthFormError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(BirthFormError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn coord_to_string(coord: f64, is_latitude: bool) -> String {
    let dir = match (is_latitude, coord >= 0.0) {
        (true, true) => "N",
        (true, false) => "S",
        (false, true) => "E",
        (false, false) => "W",
    };
    format!("{:.4}° {}", coord.abs(), dir)
}

/// "observation_point" -> "Observation Point"
fn title_case_label(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_birth_details(details: &BirthDetails) -> String {
    let month_name = MONTH_NAMES
        .get(details.month.wrapping_sub(1) as usize)
        .map(|name| name.to_string())
        .unwrap_or_else(|| details.month.to_string());

    let mut lines = vec![
        format!(
            "📅 Date of Birth: {:02} {} {}",
            details.date, month_name, details.year
        ),
        format!(
            "🕒 Time of Birth: {:02}:{:02}:{:02} (24-hr)",
            details.hours, details.minutes, details.seconds
        ),
        format!(
            "🧾 ISO: {}-{:02}-{:02}T{:02}:{:02}:{:02}",
            details.year, details.month, details.date, details.hours, details.minutes, details.seconds
        ),
    ];

    if let Some(place) = &details.place {
        lines.push(format!("📌 Place: {place}"));
    }
    lines.push(format!(
        "📍 Coordinates: {}, {}",
        coord_to_string(details.latitude, true),
        coord_to_string(details.longitude, false)
    ));
    lines.push(format!("⏰ Timezone: {}", details.timezone));

    let settings = details
        .settings
        .labelled()
        .iter()
        .map(|(key, value)| format!("{}: {}", title_case_label(key), value))
        .collect::<Vec<_>>()
        .join("\n");
    lines.push(format!("⚙️ Settings:\n{settings}"));

    lines.join("\n")
}

/// The user bubble recorded when a form is submitted.
pub fn acknowledgement(details: &BirthDetails) -> String {
    format!(
        "We have received your following Birth Details:\n\n{}\n\nFor privacy purposes, we are not saving it anywhere ✅",
        format_birth_details(details)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delhi_form() -> BirthForm {
        BirthForm {
            year: "2001".into(),
            month: "6".into(),
            date: "14".into(),
            hours: "8".into(),
            minutes: "45".into(),
            seconds: "0".into(),
            latitude: "28.6139".into(),
            longitude: "77.2090".into(),
            timezone: String::new(),
            place: " New Delhi ".into(),
        }
    }

    #[test]
    fn coerces_fields_and_applies_defaults() {
        let details = delhi_form().into_details().expect("valid form");
        assert_eq!(details.year, 2001);
        assert_eq!(details.month, 6);
        assert_eq!(details.timezone, DEFAULT_TIMEZONE);
        assert_eq!(details.settings, ChartSettings::default());
        assert_eq!(details.place.as_deref(), Some("New Delhi"));
    }

    #[test]
    fn payload_matches_backend_shape() {
        let details = delhi_form().into_details().unwrap();
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["latitude"], serde_json::json!(28.6139));
        assert_eq!(json["settings"]["ayanamsha"], "lahiri");
        assert_eq!(json["settings"]["observation_point"], "topocentric");
        assert!(json.get("place").is_none());
    }

    #[test]
    fn location_is_required() {
        let form = BirthForm {
            latitude: String::new(),
            ..delhi_form()
        };
        assert_eq!(form.into_details(), Err(BirthFormError::LocationMissing));
    }

    #[test]
    fn rejects_non_numeric_input() {
        let form = BirthForm {
            hours: "eight".into(),
            ..delhi_form()
        };
        assert_eq!(
            form.into_details(),
            Err(BirthFormError::InvalidNumber {
                field: "hours",
                value: "eight".into()
            })
        );
    }

    #[test]
    fn rejects_impossible_dates_and_ranges() {
        let form = BirthForm {
            month: "2".into(),
            date: "30".into(),
            ..delhi_form()
        };
        assert!(matches!(
            form.into_details(),
            Err(BirthFormError::InvalidDate(_))
        ));

        let form = BirthForm {
            longitude: "190".into(),
            ..delhi_form()
        };
        assert!(matches!(
            form.into_details(),
            Err(BirthFormError::OutOfRange { field: "longitude", .. })
        ));
    }

    #[test]
    fn reports_missing_fields_in_prompt_order() {
        let form = BirthForm {
            year: "1990".into(),
            latitude: "1".into(),
            ..Default::default()
        };
        assert_eq!(
            form.missing_fields(),
            vec!["month", "date", "hours", "minutes", "seconds", "longitude"]
        );
    }

    #[test]
    fn formats_summary_like_the_chat_bubble() {
        let details = delhi_form().into_details().unwrap();
        let summary = format_birth_details(&details);
        assert_eq!(
            summary,
            "📅 Date of Birth: 14 June 2001\n\
             🕒 Time of Birth: 08:45:00 (24-hr)\n\
             🧾 ISO: 2001-06-14T08:45:00\n\
             📌 Place: New Delhi\n\
             📍 Coordinates: 28.6139° N, 77.2090° E\n\
             ⏰ Timezone: Asia/Kolkata\n\
             ⚙️ Settings:\nObservation Point: topocentric\nAyanamsha: lahiri"
        );
    }

    #[test]
    fn southern_and_western_hemispheres() {
        assert_eq!(coord_to_string(-33.8688, true), "33.8688° S");
        assert_eq!(coord_to_string(-70.6693, false), "70.6693° W");
    }

    #[test]
    fn acknowledgement_wraps_summary() {
        let details = delhi_form().into_details().unwrap();
        let ack = acknowledgement(&details);
        assert!(ack.starts_with("We have received your following Birth Details:\n\n📅"));
        assert!(ack.ends_with("not saving it anywhere ✅"));
    }
}
