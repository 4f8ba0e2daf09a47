//! Clinical attributes and the feature encoder.
//!
//! The slot order of [`FeatureVector`] is the column order the classifiers were
//! trained on. It never varies between requests.

use serde::{Deserialize, Serialize};

/// Number of slots in a feature vector.
pub const FEATURE_COUNT: usize = 11;

/// Label to integer code mapping for one categorical attribute.
///
/// Entries are listed in the order the form offers them; the codes are the
/// ones used when the models were trained.
pub type CodeMap = [(&'static str, u8)];

const SEX_CODES: &CodeMap = &[("Male", 1), ("Female", 0)];

const CHEST_PAIN_CODES: &CodeMap = &[
    ("Typical Angina", 0),
    ("Atypical Angina", 1),
    ("Non-Anginal Pain", 2),
    ("Asymptomatic", 3),
];

const FASTING_BS_CODES: &CodeMap = &[("Yes", 1), ("No", 0)];

const RESTING_ECG_CODES: &CodeMap = &[
    ("Normal", 0),
    ("ST-T Wave Abnormality", 1),
    ("Left Ventricular Hypertrophy", 2),
];

const EXERCISE_ANGINA_CODES: &CodeMap = &[("Yes", 1), ("No", 0)];

const ST_SLOPE_CODES: &CodeMap = &[("Upsloping", 0), ("Flat", 1), ("Downsloping", 2)];

/// Clinical attributes, declared in training column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Age,
    Sex,
    ChestPainType,
    RestingBP,
    Cholesterol,
    FastingBS,
    RestingECG,
    MaxHR,
    ExerciseAngina,
    Oldpeak,
    #[serde(rename = "ST_Slope")]
    StSlope,
}

/// How an attribute is collected and encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeKind {
    /// Passed through as-is; `min`/`max` are the bounds the form enforces.
    Numeric { min: f64, max: f64, step: f64 },
    /// Translated through a code map.
    Categorical(&'static CodeMap),
}

impl Attribute {
    /// All attributes in slot order.
    pub const ALL: [Attribute; FEATURE_COUNT] = [
        Self::Age,
        Self::Sex,
        Self::ChestPainType,
        Self::RestingBP,
        Self::Cholesterol,
        Self::FastingBS,
        Self::RestingECG,
        Self::MaxHR,
        Self::ExerciseAngina,
        Self::Oldpeak,
        Self::StSlope,
    ];

    /// Slot index in the feature vector.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Training column name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Sex => "Sex",
            Self::ChestPainType => "ChestPainType",
            Self::RestingBP => "RestingBP",
            Self::Cholesterol => "Cholesterol",
            Self::FastingBS => "FastingBS",
            Self::RestingECG => "RestingECG",
            Self::MaxHR => "MaxHR",
            Self::ExerciseAngina => "ExerciseAngina",
            Self::Oldpeak => "Oldpeak",
            Self::StSlope => "ST_Slope",
        }
    }

    /// Look up an attribute by its training column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Human-readable label shown next to the input widget.
    #[must_use]
    pub fn form_label(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Sex => "Sex",
            Self::ChestPainType => "Chest Pain Type",
            Self::RestingBP => "Resting Blood Pressure (mm Hg)",
            Self::Cholesterol => "Cholesterol (mg/dL)",
            Self::FastingBS => "Fasting Blood Sugar > 120 mg/dL",
            Self::RestingECG => "Resting ECG",
            Self::MaxHR => "Max Heart Rate",
            Self::ExerciseAngina => "Exercise Induced Angina",
            Self::Oldpeak => "Oldpeak",
            Self::StSlope => "ST Slope",
        }
    }

    #[must_use]
    pub fn kind(self) -> AttributeKind {
        let numeric = |min, max, step| AttributeKind::Numeric { min, max, step };
        match self {
            Self::Age => numeric(1.0, 120.0, 1.0),
            Self::RestingBP => numeric(0.0, 250.0, 1.0),
            Self::Cholesterol => numeric(0.0, 600.0, 1.0),
            Self::MaxHR => numeric(0.0, 220.0, 1.0),
            Self::Oldpeak => numeric(0.0, 10.0, 0.1),
            Self::Sex => AttributeKind::Categorical(SEX_CODES),
            Self::ChestPainType => AttributeKind::Categorical(CHEST_PAIN_CODES),
            Self::FastingBS => AttributeKind::Categorical(FASTING_BS_CODES),
            Self::RestingECG => AttributeKind::Categorical(RESTING_ECG_CODES),
            Self::ExerciseAngina => AttributeKind::Categorical(EXERCISE_ANGINA_CODES),
            Self::StSlope => AttributeKind::Categorical(ST_SLOPE_CODES),
        }
    }

    /// Labels offered for a categorical attribute (empty for numeric ones).
    #[must_use]
    pub fn labels(self) -> Vec<&'static str> {
        match self.kind() {
            AttributeKind::Categorical(map) => map.iter().map(|(label, _)| *label).collect(),
            AttributeKind::Numeric { .. } => Vec::new(),
        }
    }

    /// Translate a categorical label into its training-time code.
    ///
    /// # Errors
    /// Returns [`EncodingError::UnknownLabel`] if the label is not in this
    /// attribute's code map, or if the attribute is numeric.
    pub fn code_for(self, label: &str) -> Result<u8, EncodingError> {
        let unknown = || EncodingError::UnknownLabel {
            attribute: self,
            label: label.to_string(),
        };
        match self.kind() {
            AttributeKind::Categorical(map) => map
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, code)| *code)
                .ok_or_else(unknown),
            AttributeKind::Numeric { .. } => Err(unknown()),
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error raised while encoding raw input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("{attribute}: label {label:?} has no code mapping")]
    UnknownLabel { attribute: Attribute, label: String },
}

/// Fixed-order numeric encoding of one prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub fn new(slots: [f64; FEATURE_COUNT]) -> Self {
        Self(slots)
    }

    #[must_use]
    pub fn get(&self, attribute: Attribute) -> f64 {
        self.0[attribute.index()]
    }

    pub fn set(&mut self, attribute: Attribute, value: f64) {
        self.0[attribute.index()] = value;
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// One raw value as entered in the form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Numeric(f64),
    Label(&'a str),
}

/// Raw request input: numbers for continuous attributes, labels for
/// categorical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    pub age: f64,
    pub sex: String,
    pub chest_pain_type: String,
    pub resting_bp: f64,
    pub cholesterol: f64,
    pub fasting_bs: String,
    pub resting_ecg: String,
    pub max_hr: f64,
    pub exercise_angina: String,
    pub oldpeak: f64,
    pub st_slope: String,
}

impl Default for RawInput {
    /// Initial values of the input form.
    fn default() -> Self {
        Self {
            age: 50.0,
            sex: "Male".into(),
            chest_pain_type: "Typical Angina".into(),
            resting_bp: 120.0,
            cholesterol: 200.0,
            fasting_bs: "Yes".into(),
            resting_ecg: "Normal".into(),
            max_hr: 150.0,
            exercise_angina: "Yes".into(),
            oldpeak: 1.0,
            st_slope: "Upsloping".into(),
        }
    }
}

impl RawInput {
    /// Raw value held for `attribute`.
    #[must_use]
    pub fn value(&self, attribute: Attribute) -> RawValue<'_> {
        match attribute {
            Attribute::Age => RawValue::Numeric(self.age),
            Attribute::Sex => RawValue::Label(&self.sex),
            Attribute::ChestPainType => RawValue::Label(&self.chest_pain_type),
            Attribute::RestingBP => RawValue::Numeric(self.resting_bp),
            Attribute::Cholesterol => RawValue::Numeric(self.cholesterol),
            Attribute::FastingBS => RawValue::Label(&self.fasting_bs),
            Attribute::RestingECG => RawValue::Label(&self.resting_ecg),
            Attribute::MaxHR => RawValue::Numeric(self.max_hr),
            Attribute::ExerciseAngina => RawValue::Label(&self.exercise_angina),
            Attribute::Oldpeak => RawValue::Numeric(self.oldpeak),
            Attribute::StSlope => RawValue::Label(&self.st_slope),
        }
    }

    /// Check numeric values against the bounds of the input form.
    ///
    /// Labels are not checked here; [`encode`] rejects unmapped ones.
    ///
    /// # Errors
    /// Returns every violation found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for attribute in Attribute::ALL {
            if let (RawValue::Numeric(v), AttributeKind::Numeric { min, max, .. }) =
                (self.value(attribute), attribute.kind())
            {
                if !v.is_finite() || !(min..=max).contains(&v) {
                    errors.push(format!(
                        "{} {} out of range [{}, {}]",
                        attribute.form_label(),
                        v,
                        min,
                        max
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Encode raw input into the fixed-order feature vector.
///
/// # Errors
/// Returns [`EncodingError::UnknownLabel`] for a label outside its code map.
pub fn encode(input: &RawInput) -> Result<FeatureVector, EncodingError> {
    let mut slots = [0.0; FEATURE_COUNT];
    for attribute in Attribute::ALL {
        slots[attribute.index()] = match input.value(attribute) {
            RawValue::Numeric(v) => v,
            RawValue::Label(label) => f64::from(attribute.code_for(label)?),
        };
    }
    Ok(FeatureVector::new(slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn reference_input() -> RawInput {
        RawInput {
            age: 50.0,
            sex: "Male".into(),
            chest_pain_type: "Typical Angina".into(),
            resting_bp: 120.0,
            cholesterol: 200.0,
            fasting_bs: "No".into(),
            resting_ecg: "Normal".into(),
            max_hr: 150.0,
            exercise_angina: "No".into(),
            oldpeak: 1.0,
            st_slope: "Upsloping".into(),
        }
    }

    #[test]
    fn test_slot_order_matches_training_columns() {
        let names: Vec<&str> = Attribute::ALL.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            [
                "Age",
                "Sex",
                "ChestPainType",
                "RestingBP",
                "Cholesterol",
                "FastingBS",
                "RestingECG",
                "MaxHR",
                "ExerciseAngina",
                "Oldpeak",
                "ST_Slope",
            ]
        );
        for (i, attribute) in Attribute::ALL.iter().enumerate() {
            assert_eq!(attribute.index(), i);
            assert_eq!(Attribute::from_name(attribute.name()), Some(*attribute));
        }
    }

    #[test]
    fn test_codes_are_unique_and_stable() {
        for attribute in Attribute::ALL {
            let labels = attribute.labels();
            let codes: HashSet<u8> = labels
                .iter()
                .map(|l| attribute.code_for(l).expect("offered label must map"))
                .collect();
            assert_eq!(codes.len(), labels.len(), "duplicate code in {attribute}");
            for label in labels {
                assert_eq!(attribute.code_for(label), attribute.code_for(label));
            }
        }
    }

    #[test]
    fn test_training_codes() {
        assert_eq!(Attribute::Sex.code_for("Female"), Ok(0));
        assert_eq!(Attribute::Sex.code_for("Male"), Ok(1));
        assert_eq!(Attribute::ChestPainType.code_for("Asymptomatic"), Ok(3));
        assert_eq!(Attribute::FastingBS.code_for("Yes"), Ok(1));
        assert_eq!(
            Attribute::RestingECG.code_for("Left Ventricular Hypertrophy"),
            Ok(2)
        );
        assert_eq!(Attribute::ExerciseAngina.code_for("No"), Ok(0));
        assert_eq!(Attribute::StSlope.code_for("Flat"), Ok(1));
    }

    #[test]
    fn test_encode_reference_input() {
        let v = encode(&reference_input()).expect("Should encode");
        assert_eq!(
            v.as_slice(),
            &[50.0, 1.0, 0.0, 120.0, 200.0, 0.0, 0.0, 150.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_changing_sex_changes_only_its_column() {
        let male = encode(&reference_input()).expect("Should encode");
        let female = encode(&RawInput {
            sex: "Female".into(),
            ..reference_input()
        })
        .expect("Should encode");

        let changed: Vec<usize> = (0..FEATURE_COUNT)
            .filter(|&i| male.as_slice()[i].to_bits() != female.as_slice()[i].to_bits())
            .collect();
        assert_eq!(changed, vec![Attribute::Sex.index()]);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let input = RawInput {
            st_slope: "Sideways".into(),
            ..reference_input()
        };
        let err = encode(&input).expect_err("must fail");
        assert_eq!(
            err,
            EncodingError::UnknownLabel {
                attribute: Attribute::StSlope,
                label: "Sideways".into()
            }
        );
        assert!(Attribute::Age.code_for("50").is_err());
    }

    #[test]
    fn test_validation() {
        assert!(RawInput::default().validate().is_ok());
        assert!(reference_input().validate().is_ok());

        let invalid = RawInput {
            age: 0.0,
            oldpeak: 10.5,
            ..reference_input()
        };
        let errors = invalid.validate().expect_err("must fail");
        assert_eq!(errors.len(), 2);

        let nan = RawInput {
            max_hr: f64::NAN,
            ..reference_input()
        };
        assert!(nan.validate().is_err());
    }
}
