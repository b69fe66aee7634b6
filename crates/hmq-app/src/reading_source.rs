//! Simulated weather-like readings for the sensor role. Deliberately
//! trivial: the rest of the publish path only depends on `ReadingSource`,
//! so a real sensor driver could replace this without touching anything
//! downstream.

use chrono::Utc;
use rand::Rng;

use hmq_core::SensorReading;

pub trait ReadingSource: Send {
    fn next_reading(&mut self) -> SensorReading;
}

pub struct JitterReadingSource {
    device_id: String,
    name: String,
    country: String,
    time_zone: String,
    temperature: f64,
    humidity: f64,
    pressure: f64,
    wind_speed: f64,
}

impl JitterReadingSource {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: "Backyard".into(),
            country: "NO".into(),
            time_zone: "Europe/Oslo".into(),
            temperature: 18.0,
            humidity: 55.0,
            pressure: 1013.0,
            wind_speed: 8.0,
        }
    }

    fn jitter(rng: &mut impl Rng, value: f64, spread: f64) -> f64 {
        value + rng.random_range(-spread..=spread)
    }
}

impl ReadingSource for JitterReadingSource {
    fn next_reading(&mut self) -> SensorReading {
        let mut rng = rand::rng();
        self.temperature = Self::jitter(&mut rng, self.temperature, 0.4).clamp(-20.0, 45.0);
        self.humidity = Self::jitter(&mut rng, self.humidity, 1.5).clamp(0.0, 100.0);
        self.pressure = Self::jitter(&mut rng, self.pressure, 0.8).clamp(950.0, 1050.0);
        self.wind_speed = Self::jitter(&mut rng, self.wind_speed, 1.0).clamp(0.0, 120.0);

        let now = Utc::now();
        SensorReading {
            temperature_celsius: Some(self.temperature),
            humidity_percent: Some(self.humidity),
            pressure_hecto_pascal: Some(self.pressure),
            wind_speed_kmh: Some(self.wind_speed),
            readout: now,
            timestamp: now,
            name: self.name.clone(),
            id: self.device_id.clone(),
            country: self.country.clone(),
            time_zone: self.time_zone.clone(),
            description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_keep_the_configured_device_id() {
        let mut source = JitterReadingSource::new("sensor-7");
        let reading = source.next_reading();
        assert_eq!(reading.id, "sensor-7");
        assert!(reading.temperature_celsius.is_some());
    }

    #[test]
    fn consecutive_readings_stay_within_clamped_bounds() {
        let mut source = JitterReadingSource::new("sensor-7");
        for _ in 0..50 {
            let reading = source.next_reading();
            assert!(reading.humidity_percent.unwrap() <= 100.0);
            assert!(reading.humidity_percent.unwrap() >= 0.0);
        }
    }
}
