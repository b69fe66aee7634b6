//! Sensor reading domain object (spec §3). Opaque to the pairing and crypto
//! layers — it only matters to `CanonicalEncoder` and the unstructured/JSON
//! publish paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interoperable::{FieldType, FieldValue, InteroperableField};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    #[serde(rename = "TemperatureCelcius", skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
    #[serde(rename = "HumidityPercent", skip_serializing_if = "Option::is_none")]
    pub humidity_percent: Option<f64>,
    #[serde(rename = "PressureHectoPascal", skip_serializing_if = "Option::is_none")]
    pub pressure_hecto_pascal: Option<f64>,
    #[serde(rename = "WindSpeedKmh", skip_serializing_if = "Option::is_none")]
    pub wind_speed_kmh: Option<f64>,

    #[serde(rename = "Readout")]
    pub readout: DateTime<Utc>,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "TimeZone")]
    pub time_zone: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

struct ScalarField {
    name: &'static str,
    unit: &'static str,
    value: f64,
}

impl SensorReading {
    fn scalars(&self) -> Vec<ScalarField> {
        let mut out = Vec::new();
        if let Some(v) = self.temperature_celsius {
            out.push(ScalarField {
                name: "Temperature",
                unit: "\u{b0}C",
                value: v,
            });
        }
        if let Some(v) = self.humidity_percent {
            out.push(ScalarField {
                name: "Humidity",
                unit: "%",
                value: v,
            });
        }
        if let Some(v) = self.pressure_hecto_pascal {
            out.push(ScalarField {
                name: "Pressure",
                unit: "hPa",
                value: v,
            });
        }
        if let Some(v) = self.wind_speed_kmh {
            out.push(ScalarField {
                name: "WindSpeed",
                unit: "km/h",
                value: v,
            });
        }
        out
    }

    /// Per-field string forms for `…/Unsecured/Unstructured/<id>/<Field>`,
    /// with the unit suffixed where applicable (spec §4.3.1).
    pub fn unstructured_fields(&self) -> Vec<(&'static str, String)> {
        self.scalars()
            .into_iter()
            .map(|f| (f.name, format!("{} {}", f.value, f.unit)))
            .collect()
    }

    /// Renders the populated scalars as `InteroperableField`s, one
    /// `Quantity` per present field, in a fixed, stable order.
    pub fn interoperable_fields(&self) -> Vec<InteroperableField> {
        self.scalars()
            .into_iter()
            .map(|f| {
                InteroperableField::new(
                    self.id.clone(),
                    self.timestamp,
                    f.name,
                    FieldValue::Quantity {
                        magnitude: f.value,
                        decimals: 1,
                        unit: f.unit.to_string(),
                    },
                    FieldType::Momentary,
                )
            })
            .collect()
    }
}
