use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

use crate::schema::{CropFeatures, TrainingRecord};

pub const AREAS: [&str; 10] = [
    "Punjab",
    "Haryana",
    "Uttar Pradesh",
    "Maharashtra",
    "Karnataka",
    "Rajasthan",
    "Gujarat",
    "Madhya Pradesh",
    "Bihar",
    "West Bengal",
];

pub const CROPS: [&str; 10] = [
    "Wheat",
    "Rice",
    "Maize",
    "Cotton",
    "Sugarcane",
    "Soybean",
    "Barley",
    "Mustard",
    "Gram",
    "Groundnut",
];

pub const SOIL_TYPES: [&str; 6] = ["Loamy", "Clay", "Sandy", "Black", "Red", "Alluvial"];

/// The lowest yield a record can have.
pub const MIN_YIELD: f64 = 100.0;

const BASE_YIELD: f64 = 2000.0;
const YIELD_NOISE_SD: f64 = 300.0;

/// `(mean, standard deviation)` of each numeric field.
const TEMPERATURE: (f64, f64) = (25.0, 5.0);
const HUMIDITY: (f64, f64) = (65.0, 15.0);
const PH: (f64, f64) = (6.5, 1.0);
const RAINFALL: (f64, f64) = (800.0, 200.0);

/// Parameters of the synthetic dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub seed: u64,
    pub samples: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            samples: 1000,
        }
    }
}

/// Generates a reproducible agricultural dataset.
///
/// Every column is drawn in full before the next one, categories uniformly and numeric fields
/// from independent normal distributions. The yield is a linear function of the numeric fields
/// plus normal noise, floored at `MIN_YIELD`.
///
/// # Arguments
/// * `config` - The seed and amount of records.
///
/// # Returns
/// Exactly `config.samples` records, identical for identical configs.
pub fn synthesize(config: &SynthConfig) -> Vec<TrainingRecord> {
    let n = config.samples;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let areas = choose_column(&mut rng, &AREAS, n);
    let crops = choose_column(&mut rng, &CROPS, n);
    let soils = choose_column(&mut rng, &SOIL_TYPES, n);
    let temperatures = normal_column(&mut rng, TEMPERATURE, n);
    let humidities = normal_column(&mut rng, HUMIDITY, n);
    let phs = normal_column(&mut rng, PH, n);
    let rainfalls = normal_column(&mut rng, RAINFALL, n);
    let noise = normal_column(&mut rng, (0.0, YIELD_NOISE_SD), n);

    (0..n)
        .map(|i| {
            let features = CropFeatures {
                area: areas[i].to_string(),
                crop: crops[i].to_string(),
                soil_type: soils[i].to_string(),
                temperature: temperatures[i],
                humidity: humidities[i],
                ph: phs[i],
                annual_rainfall: rainfalls[i],
            };

            let crop_yield = (expected_yield(&features) + noise[i]).max(MIN_YIELD);
            TrainingRecord {
                features,
                crop_yield,
            }
        })
        .collect()
}

/// The noiseless yield of a set of features.
pub fn expected_yield(f: &CropFeatures) -> f64 {
    BASE_YIELD
        + (f.temperature - TEMPERATURE.0) * 50.0
        + (f.humidity - HUMIDITY.0) * 10.0
        + (f.ph - PH.0) * 200.0
        + (f.annual_rainfall - RAINFALL.0) * 2.0
}

fn choose_column<R: Rng>(rng: &mut R, values: &[&'static str], n: usize) -> Vec<&'static str> {
    (0..n)
        .map(|_| values[rng.random_range(0..values.len())])
        .collect()
}

fn normal_column<R: Rng>(rng: &mut R, (mean, sd): (f64, f64), n: usize) -> Vec<f64> {
    (0..n)
        .map(|_| mean + sd * rng.sample::<f64, _>(StandardNormal))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureSchema;

    fn records() -> Vec<TrainingRecord> {
        synthesize(&SynthConfig::default())
    }

    fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
        let (sum, n) = values.fold((0.0, 0), |(s, n), v| (s + v, n + 1));
        sum / n as f64
    }

    #[test]
    fn produces_the_requested_amount() {
        assert_eq!(records().len(), 1000);

        let config = SynthConfig {
            seed: 1,
            samples: 17,
        };
        assert_eq!(synthesize(&config).len(), 17);
    }

    #[test]
    fn same_seed_same_records() {
        assert_eq!(records(), records());

        let other = synthesize(&SynthConfig {
            seed: 43,
            ..SynthConfig::default()
        });
        assert_ne!(records(), other);
    }

    #[test]
    fn yields_are_floored() {
        let config = SynthConfig {
            seed: 7,
            samples: 5000,
        };
        assert!(synthesize(&config).iter().all(|r| r.crop_yield >= MIN_YIELD));
    }

    #[test]
    fn categories_come_from_the_fixed_sets() {
        for r in records() {
            assert!(AREAS.contains(&r.features.area.as_str()));
            assert!(CROPS.contains(&r.features.crop.as_str()));
            assert!(SOIL_TYPES.contains(&r.features.soil_type.as_str()));
        }
    }

    #[test]
    fn numeric_columns_follow_their_distributions() {
        let records = records();
        let temp = mean(records.iter().map(|r| r.features.temperature));
        let hum = mean(records.iter().map(|r| r.features.humidity));
        let ph = mean(records.iter().map(|r| r.features.ph));
        let rain = mean(records.iter().map(|r| r.features.annual_rainfall));

        assert!((temp - 25.0).abs() < 1.0);
        assert!((hum - 65.0).abs() < 3.0);
        assert!((ph - 6.5).abs() < 0.2);
        assert!((rain - 800.0).abs() < 40.0);
    }

    #[test]
    fn yield_tracks_the_linear_relation() {
        let records = records();
        let residual = mean(
            records
                .iter()
                .map(|r| (r.crop_yield - expected_yield(&r.features)).abs()),
        );
        assert!(residual < 400.0);
    }

    #[test]
    fn schema_matches_the_records_exactly() {
        let records = records();
        let schema = FeatureSchema::from_records(&records).unwrap();

        let mut areas: Vec<_> = records.iter().map(|r| r.features.area.clone()).collect();
        areas.sort();
        areas.dedup();
        assert_eq!(schema.areas, areas);
        assert_eq!(schema.crops.len(), 10);
        assert_eq!(schema.soil_types, ["Alluvial", "Black", "Clay", "Loamy", "Red", "Sandy"]);

        let temps: Vec<f64> = records.iter().map(|r| r.features.temperature).collect();
        let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
        let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(schema.temperature_range, [min, max]);
        assert!(records.iter().any(|r| r.features.temperature == min));

        let rain_lo = records
            .iter()
            .map(|r| r.features.annual_rainfall)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(schema.rainfall_range[0], rain_lo);
        assert!(schema.ph_range[0] <= schema.ph_range[1]);
        assert!(schema.humidity_range[0] <= schema.humidity_range[1]);
    }
}
