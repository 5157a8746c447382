use chrono::{Datelike, Days, Local, NaiveDate};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// ABO/Rh blood groups.
pub const BLOOD_TYPES: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// Approximate global frequency of each blood group, in percent.
const BLOOD_TYPE_WEIGHTS: [u32; 8] = [35, 6, 9, 2, 4, 1, 38, 5];

/// Clinically significant medication allergies.
pub const COMMON_ALLERGIES: [&str; 15] = [
    "Penicillin",
    "Amoxicillin",
    "Sulfonamides",
    "Cephalosporins",
    "Aspirin",
    "Ibuprofen",
    "Latex",
    "Contrast Dye",
    "Codeine",
    "Morphine",
    "Tetracycline",
    "Erythromycin",
    "Vancomycin",
    "Ciprofloxacin",
    "Local Anesthetics",
];

/// Cross-reactive allergy groups: beta-lactams, NSAIDs, opioids, sulfa.
const MULTI_ALLERGY_GROUPS: [&[&str]; 4] = [
    &["Penicillin", "Amoxicillin", "Cephalosporins"],
    &["Aspirin", "Ibuprofen"],
    &["Codeine", "Morphine"],
    &["Sulfonamides", "Contrast Dye"],
];

const NO_ALLERGY_PROBABILITY: f64 = 0.40;
const MULTIPLE_ALLERGY_PROBABILITY: f64 = 0.15;
const EXTRA_ALLERGY_PROBABILITY: f64 = 0.30;

/// Age-group weights: children / adults / seniors.
const AGE_GROUP_WEIGHTS: [u32; 3] = [20, 50, 30];

const FIRST_NAMES: [&str; 24] = [
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Carlos", "Lucia", "Daniel", "Karen", "Maria", "Anthony",
];

const LAST_NAMES: [&str; 24] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White",
];

/// One synthetic patient. Entirely fictional; never backed by real data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub full_name: String,
    /// ISO date (YYYY-MM-DD).
    pub date_of_birth: String,
    pub blood_type: String,
    /// Comma-separated list, or `None`.
    pub allergies: String,
}

impl PatientRecord {
    /// Medical-notes line placed in the appointment comment field.
    pub fn medical_notes(&self) -> String {
        format!(
            "PATIENT: {} | BLOOD: {} | ALLERGIES: {}",
            self.full_name, self.blood_type, self.allergies
        )
    }
}

/// Synthetic patient generator: lookup-table sampling driven by a seedable
/// RNG. Pure function of its internal randomness; performs no I/O.
pub struct PatientGenerator {
    rng: SmallRng,
    blood_types: WeightedIndex<u32>,
    age_groups: WeightedIndex<u32>,
    issued_ids: HashSet<String>,
}

impl PatientGenerator {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Reproducible records for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        // Static nonzero weights; construction cannot fail.
        Self {
            rng,
            blood_types: WeightedIndex::new(BLOOD_TYPE_WEIGHTS).unwrap(),
            age_groups: WeightedIndex::new(AGE_GROUP_WEIGHTS).unwrap(),
            issued_ids: HashSet::new(),
        }
    }

    pub fn generate(&mut self) -> PatientRecord {
        let age = self.age();
        PatientRecord {
            patient_id: self.unique_id(),
            full_name: self.full_name(),
            date_of_birth: self.date_of_birth(age).to_string(),
            blood_type: BLOOD_TYPES[self.blood_types.sample(&mut self.rng)].to_string(),
            allergies: self.allergies(),
        }
    }

    pub fn generate_batch(&mut self, count: usize) -> Vec<PatientRecord> {
        (0..count).map(|_| self.generate()).collect()
    }

    /// 20% children (0-17), 50% adults (18-64), 30% seniors (65-95).
    fn age(&mut self) -> u32 {
        match self.age_groups.sample(&mut self.rng) {
            0 => self.rng.gen_range(0..=17),
            1 => self.rng.gen_range(18..=64),
            _ => self.rng.gen_range(65..=95),
        }
    }

    fn date_of_birth(&mut self, age: u32) -> NaiveDate {
        let today = Local::now().date_naive();
        let birth_year = today.year() - age as i32;
        let month = self.rng.gen_range(1..=12);
        let max_day = match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ => {
                if birth_year % 4 == 0 {
                    29
                } else {
                    28
                }
            }
        };
        let day = self.rng.gen_range(1..=max_day);
        NaiveDate::from_ymd_opt(birth_year, month, day).unwrap_or(today)
    }

    /// `PT-YYYYMMDD-NNNN`: registration date within the last ten years plus a
    /// four-digit sequence. Unique per generator instance.
    fn unique_id(&mut self) -> String {
        loop {
            let days_back = self.rng.gen_range(0..3650);
            let registered = Local::now().date_naive() - Days::new(days_back);
            let seq = self.rng.gen_range(1000..=9999);
            let id = format!("PT-{}-{seq}", registered.format("%Y%m%d"));
            if self.issued_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    fn full_name(&mut self) -> String {
        let first = FIRST_NAMES[self.rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[self.rng.gen_range(0..LAST_NAMES.len())];
        format!("{first} {last}")
    }

    /// ~40% no known allergies, ~15% of the rest a cross-reactive group
    /// (sometimes with one unrelated extra), otherwise a single entry.
    fn allergies(&mut self) -> String {
        if self.rng.gen_bool(NO_ALLERGY_PROBABILITY) {
            return "None".to_string();
        }
        if self.rng.gen_bool(MULTIPLE_ALLERGY_PROBABILITY) {
            let group = MULTI_ALLERGY_GROUPS[self.rng.gen_range(0..MULTI_ALLERGY_GROUPS.len())];
            let mut combo: Vec<&str> = group.to_vec();
            if self.rng.gen_bool(EXTRA_ALLERGY_PROBABILITY) {
                let extra = COMMON_ALLERGIES[self.rng.gen_range(0..COMMON_ALLERGIES.len())];
                if !combo.contains(&extra) {
                    combo.push(extra);
                }
            }
            combo.join(", ")
        } else {
            COMMON_ALLERGIES[self.rng.gen_range(0..COMMON_ALLERGIES.len())].to_string()
        }
    }
}

impl Default for PatientGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Distribution check over a generated batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub blood_types: BTreeMap<String, usize>,
    pub with_allergies: usize,
    pub age_groups: BTreeMap<String, usize>,
}

impl DatasetSummary {
    pub fn analyze(patients: &[PatientRecord]) -> Self {
        let current_year = Local::now().year();
        let mut summary = Self {
            total: patients.len(),
            ..Self::default()
        };

        for patient in patients {
            *summary
                .blood_types
                .entry(patient.blood_type.clone())
                .or_insert(0) += 1;
            if patient.allergies != "None" {
                summary.with_allergies += 1;
            }

            let birth_year: i32 = patient
                .date_of_birth
                .split('-')
                .next()
                .and_then(|y| y.parse().ok())
                .unwrap_or(current_year);
            let age = current_year - birth_year;
            let group = if age <= 17 {
                "0-17"
            } else if age <= 64 {
                "18-64"
            } else {
                "65+"
            };
            *summary.age_groups.entry(group.to_string()).or_insert(0) += 1;
        }

        summary
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dataset of {} synthetic patients", self.total)?;
        writeln!(f, "  blood types:")?;
        for (blood_type, count) in &self.blood_types {
            let pct = *count as f64 / self.total.max(1) as f64 * 100.0;
            writeln!(f, "    {blood_type:>3}: {count:>5} ({pct:>4.1}%)")?;
        }
        writeln!(f, "  age groups:")?;
        for (group, count) in &self.age_groups {
            writeln!(f, "    {group:>5}: {count}")?;
        }
        write!(
            f,
            "  with allergies: {}/{}",
            self.with_allergies, self.total
        )
    }
}
