use std::fmt;
use std::str::FromStr;

use crate::error::FormError;

pub const FEATURE_COUNT: usize = 20;

/// Name of the age input (years). Drives `DAYS_BIRTH`.
pub const AGE_INPUT: &str = "age_years";
/// Name of the employment input (years). Drives `DAYS_EMPLOYED` and `DAYS_EMPLOYED_PERCENT`.
pub const EMPLOYMENT_INPUT: &str = "employment_years";

pub const AGE_DOMAIN: Domain = Domain::Integer { min: 18, max: 100 };
pub const EMPLOYMENT_DOMAIN: Domain = Domain::Integer { min: 0, max: 50 };

pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKey {
    AmtIncomeTotal,
    AmtCredit,
    AmtAnnuity,
    CreditIncomePercent,
    AnnuityIncomePercent,
    CreditTerm,
    ExtSource1,
    ExtSource2,
    ExtSource3,
    DaysBirth,
    CodeGenderM,
    CntChildren,
    DaysEmployed,
    DaysEmployedPercent,
    NameIncomeTypeWorking,
    RegionRatingClientWCity,
    RegionRatingClient,
    RegCityNotWorkCity,
    FlagOwnRealty,
    OccupationTypeLaborers,
}

impl FeatureKey {
    /// Wire order expected by the scoring service. Never reorder.
    pub const ALL: [Self; FEATURE_COUNT] = [
        Self::AmtIncomeTotal,
        Self::AmtCredit,
        Self::AmtAnnuity,
        Self::CreditIncomePercent,
        Self::AnnuityIncomePercent,
        Self::CreditTerm,
        Self::ExtSource1,
        Self::ExtSource2,
        Self::ExtSource3,
        Self::DaysBirth,
        Self::CodeGenderM,
        Self::CntChildren,
        Self::DaysEmployed,
        Self::DaysEmployedPercent,
        Self::NameIncomeTypeWorking,
        Self::RegionRatingClientWCity,
        Self::RegionRatingClient,
        Self::RegCityNotWorkCity,
        Self::FlagOwnRealty,
        Self::OccupationTypeLaborers,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AmtIncomeTotal => "AMT_INCOME_TOTAL",
            Self::AmtCredit => "AMT_CREDIT",
            Self::AmtAnnuity => "AMT_ANNUITY",
            Self::CreditIncomePercent => "CREDIT_INCOME_PERCENT",
            Self::AnnuityIncomePercent => "ANNUITY_INCOME_PERCENT",
            Self::CreditTerm => "CREDIT_TERM",
            Self::ExtSource1 => "EXT_SOURCE_1",
            Self::ExtSource2 => "EXT_SOURCE_2",
            Self::ExtSource3 => "EXT_SOURCE_3",
            Self::DaysBirth => "DAYS_BIRTH",
            Self::CodeGenderM => "CODE_GENDER_M",
            Self::CntChildren => "CNT_CHILDREN",
            Self::DaysEmployed => "DAYS_EMPLOYED",
            Self::DaysEmployedPercent => "DAYS_EMPLOYED_PERCENT",
            Self::NameIncomeTypeWorking => "NAME_INCOME_TYPE_Working",
            Self::RegionRatingClientWCity => "REGION_RATING_CLIENT_W_CITY",
            Self::RegionRatingClient => "REGION_RATING_CLIENT",
            Self::RegCityNotWorkCity => "REG_CITY_NOT_WORK_CITY",
            Self::FlagOwnRealty => "FLAG_OWN_REALTY",
            Self::OccupationTypeLaborers => "OCCUPATION_TYPE_Laborers",
        }
    }

    /// Position of the key in the outbound feature array.
    pub const fn index(self) -> usize {
        self as usize
    }

    #[allow(clippy::indexing_slicing)]
    pub fn descriptor(self) -> &'static FieldDescriptor {
        // DESCRIPTORS is laid out in `ALL` order; checked by tests.
        &DESCRIPTORS[self.index()]
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| FormError::UnknownKey(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free numeric entry.
    Amount,
    /// Slider over [0, 1].
    Score,
    /// Boolean carried as 0.0 / 1.0.
    Flag,
    /// Small non-negative integer entry.
    Count,
    /// Discrete rating slider.
    Rating,
    /// Recomputed from age / employment inputs, never edited directly.
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    Any,
    Range { min: f64, max: f64 },
    Integer { min: i64, max: i64 },
    Discrete(&'static [f64]),
}

impl Domain {
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match *self {
            Self::Any => true,
            Self::Range { min, max } => (min..=max).contains(&value),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer { min, max } => {
                value.fract() == 0.0 && (min as f64..=max as f64).contains(&value)
            }
            Self::Discrete(allowed) => allowed.iter().any(|v| (v - value).abs() < f64::EPSILON),
        }
    }

    pub(crate) fn check(&self, key: &str, value: f64) -> Result<f64, FormError> {
        if !value.is_finite() {
            return Err(FormError::validation(key, "value must be a finite number"));
        }
        if self.contains(value) {
            Ok(value)
        } else {
            Err(FormError::validation(
                key,
                format!("{value} is outside {self}"),
            ))
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any finite number"),
            Self::Range { min, max } => write!(f, "[{min}, {max}]"),
            Self::Integer { min, max } => write!(f, "integers {min}..={max}"),
            Self::Discrete(allowed) => {
                let parts = allowed.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Financial,
    ExternalScores,
    Personal,
    Professional,
    Regional,
}

impl Section {
    pub const ALL: [Self; 5] = [
        Self::Financial,
        Self::ExternalScores,
        Self::Personal,
        Self::Professional,
        Self::Regional,
    ];

    pub const fn title(self) -> &'static str {
        match self {
            Self::Financial => "Informations financières",
            Self::ExternalScores => "Scores externes",
            Self::Personal => "Informations personnelles",
            Self::Professional => "Informations professionnelles",
            Self::Regional => "Informations régionales",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub key: FeatureKey,
    pub kind: FieldKind,
    pub domain: Domain,
    pub default: f64,
    pub label: &'static str,
    pub section: Section,
    /// Labels for 0.0 and 1.0 when a flag is picked from a list instead of a checkbox.
    pub choices: Option<[&'static str; 2]>,
}

const FLAG: Domain = Domain::Discrete(&[0.0, 1.0]);
const RATING: Domain = Domain::Discrete(&[1.0, 2.0, 3.0]);
const SCORE: Domain = Domain::Range { min: 0.0, max: 1.0 };

const fn field(
    key: FeatureKey,
    kind: FieldKind,
    domain: Domain,
    default: f64,
    label: &'static str,
    section: Section,
) -> FieldDescriptor {
    FieldDescriptor {
        key,
        kind,
        domain,
        default,
        label,
        section,
        choices: None,
    }
}

/// One row per feature, in wire order. Defaults describe a sample client.
pub static DESCRIPTORS: [FieldDescriptor; FEATURE_COUNT] = [
    field(FeatureKey::AmtIncomeTotal, FieldKind::Amount, Domain::Any, 150_000.0, "Revenu annuel total", Section::Financial),
    field(FeatureKey::AmtCredit, FieldKind::Amount, Domain::Any, 600_000.0, "Montant du crédit demandé", Section::Financial),
    field(FeatureKey::AmtAnnuity, FieldKind::Amount, Domain::Any, 30_000.0, "Montant des paiements annuels", Section::Financial),
    field(FeatureKey::CreditIncomePercent, FieldKind::Amount, Domain::Any, 4.0, "Ratio crédit/revenu", Section::Financial),
    field(FeatureKey::AnnuityIncomePercent, FieldKind::Amount, Domain::Any, 0.2, "Ratio annuité/revenu", Section::Financial),
    field(FeatureKey::CreditTerm, FieldKind::Amount, Domain::Any, 20.0, "Durée du crédit (années)", Section::Financial),
    field(FeatureKey::ExtSource1, FieldKind::Score, SCORE, 0.7, "Score externe 1 (0-1)", Section::ExternalScores),
    field(FeatureKey::ExtSource2, FieldKind::Score, SCORE, 0.65, "Score externe 2 (0-1)", Section::ExternalScores),
    field(FeatureKey::ExtSource3, FieldKind::Score, SCORE, 0.8, "Score externe 3 (0-1)", Section::ExternalScores),
    field(FeatureKey::DaysBirth, FieldKind::Derived, Domain::Any, -14_000.0, "Age en jours (négatif)", Section::Personal),
    FieldDescriptor {
        choices: Some(["Femme", "Homme"]),
        ..field(FeatureKey::CodeGenderM, FieldKind::Flag, FLAG, 1.0, "Genre", Section::Personal)
    },
    field(FeatureKey::CntChildren, FieldKind::Count, Domain::Integer { min: 0, max: 10 }, 2.0, "Nombre d'enfants", Section::Personal),
    field(FeatureKey::DaysEmployed, FieldKind::Derived, Domain::Any, -3_650.0, "Jours d'emploi (négatif)", Section::Professional),
    field(FeatureKey::DaysEmployedPercent, FieldKind::Derived, Domain::Any, 0.26, "Ratio emploi/âge", Section::Professional),
    field(FeatureKey::NameIncomeTypeWorking, FieldKind::Flag, FLAG, 1.0, "Travailleur salarié", Section::Professional),
    field(FeatureKey::RegionRatingClientWCity, FieldKind::Rating, RATING, 2.0, "Note région+ville (1-3)", Section::Regional),
    field(FeatureKey::RegionRatingClient, FieldKind::Rating, RATING, 2.0, "Note région (1-3)", Section::Regional),
    field(FeatureKey::RegCityNotWorkCity, FieldKind::Flag, FLAG, 0.0, "Travaille dans une ville différente de celle de résidence", Section::Regional),
    field(FeatureKey::FlagOwnRealty, FieldKind::Flag, FLAG, 1.0, "Propriétaire d'un bien immobilier", Section::Personal),
    field(FeatureKey::OccupationTypeLaborers, FieldKind::Flag, FLAG, 0.0, "Ouvrier", Section::Professional),
];

impl FieldDescriptor {
    pub const fn is_editable(&self) -> bool {
        !matches!(self.kind, FieldKind::Derived)
    }
}

pub fn descriptors_in(section: Section) -> impl Iterator<Item = &'static FieldDescriptor> {
    DESCRIPTORS.iter().filter(move |d| d.section == section)
}
