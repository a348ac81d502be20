use std::collections::BTreeMap;

use crate::error::FormError;
use crate::features::{
    FeatureKey, AGE_DOMAIN, AGE_INPUT, DAYS_PER_YEAR, DESCRIPTORS, EMPLOYMENT_DOMAIN,
    EMPLOYMENT_INPUT, FEATURE_COUNT,
};

/// Feature values in wire order, ready to be sent to the scoring service.
pub type OrderedVector = [f64; FEATURE_COUNT];

/// Editable state behind the scoring form.
///
/// Every key of [`FeatureKey::ALL`] holds a finite value at all times. The
/// three derived keys (`DAYS_BIRTH`, `DAYS_EMPLOYED`, `DAYS_EMPLOYED_PERCENT`)
/// only move through [`FeatureForm::set_age_years`] and
/// [`FeatureForm::set_employment_years`], so they can never go stale.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureForm {
    values: BTreeMap<FeatureKey, f64>,
}

impl Default for FeatureForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureForm {
    /// Sample client from the descriptor defaults, with the derived keys
    /// recomputed from the whole years they imply.
    pub fn new() -> Self {
        let mut form = Self {
            values: DESCRIPTORS.iter().map(|d| (d.key, d.default)).collect(),
        };
        form.normalize_derived();
        form
    }

    /// Restores a form from a complete set of named values, derived keys included.
    ///
    /// Keys that are not given keep their default. Values are checked against
    /// each field's domain but derived keys are taken as-is.
    pub fn from_named_values<'a, I>(values: I) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut form = Self::new();
        for (name, value) in values {
            let key = name.parse::<FeatureKey>()?;
            let value = key.descriptor().domain.check(key.as_str(), value)?;
            form.values.insert(key, value);
        }
        Ok(form)
    }

    pub fn get(&self, key: &str) -> Result<f64, FormError> {
        self.value(key.parse()?)
    }

    pub fn value(&self, key: FeatureKey) -> Result<f64, FormError> {
        self.values
            .get(&key)
            .copied()
            .ok_or(FormError::IncompleteVector(key.as_str()))
    }

    /// Applies one user edit by name.
    ///
    /// Accepts any editable feature key plus the [`AGE_INPUT`] and
    /// [`EMPLOYMENT_INPUT`] year inputs. Out-of-domain values are rejected and
    /// the previous value is kept.
    pub fn set(&mut self, key: &str, value: f64) -> Result<(), FormError> {
        match key {
            AGE_INPUT => {
                let years = whole_years(AGE_INPUT, AGE_DOMAIN.check(AGE_INPUT, value)?)?;
                self.set_age_years(years)
            }
            EMPLOYMENT_INPUT => {
                let years = whole_years(
                    EMPLOYMENT_INPUT,
                    EMPLOYMENT_DOMAIN.check(EMPLOYMENT_INPUT, value)?,
                )?;
                self.set_employment_years(years)
            }
            _ => self.set_value(key.parse()?, value),
        }
    }

    pub fn set_value(&mut self, key: FeatureKey, value: f64) -> Result<(), FormError> {
        let descriptor = key.descriptor();
        if !descriptor.is_editable() {
            return Err(FormError::validation(
                key.as_str(),
                format!("derived field; edit {AGE_INPUT} or {EMPLOYMENT_INPUT} instead"),
            ));
        }
        let value = descriptor.domain.check(key.as_str(), value)?;
        self.values.insert(key, value);
        Ok(())
    }

    pub fn age_years(&self) -> u32 {
        self.years_of(FeatureKey::DaysBirth)
    }

    pub fn employment_years(&self) -> u32 {
        self.years_of(FeatureKey::DaysEmployed)
    }

    pub fn set_age_years(&mut self, years: u32) -> Result<(), FormError> {
        AGE_DOMAIN.check(AGE_INPUT, f64::from(years))?;
        self.values
            .insert(FeatureKey::DaysBirth, -DAYS_PER_YEAR * f64::from(years));
        self.refresh_employment_ratio();
        Ok(())
    }

    pub fn set_employment_years(&mut self, years: u32) -> Result<(), FormError> {
        EMPLOYMENT_DOMAIN.check(EMPLOYMENT_INPUT, f64::from(years))?;
        self.values
            .insert(FeatureKey::DaysEmployed, -DAYS_PER_YEAR * f64::from(years));
        self.refresh_employment_ratio();
        Ok(())
    }

    /// Values in wire order. Reads only; the form is left untouched.
    pub fn to_ordered_vector(&self) -> Result<OrderedVector, FormError> {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, key) in out.iter_mut().zip(FeatureKey::ALL) {
            *slot = self.value(key)?;
        }
        Ok(out)
    }

    pub fn to_named_map(&self) -> BTreeMap<String, f64> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), *value))
            .collect()
    }

    fn normalize_derived(&mut self) {
        let age = f64::from(self.age_years());
        let employed = f64::from(self.employment_years());
        self.values
            .insert(FeatureKey::DaysBirth, -DAYS_PER_YEAR * age);
        self.values
            .insert(FeatureKey::DaysEmployed, -DAYS_PER_YEAR * employed);
        self.refresh_employment_ratio();
    }

    fn refresh_employment_ratio(&mut self) {
        let age = self.age_years();
        let ratio = if age > 0 {
            f64::from(self.employment_years()) / f64::from(age)
        } else {
            0.0
        };
        self.values.insert(FeatureKey::DaysEmployedPercent, ratio);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn years_of(&self, key: FeatureKey) -> u32 {
        let days = self.values.get(&key).copied().unwrap_or_default();
        (days.abs() / DAYS_PER_YEAR).trunc().min(f64::from(u32::MAX)) as u32
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_years(name: &str, value: f64) -> Result<u32, FormError> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(FormError::validation(name, "expected a whole number of years"));
    }
    Ok(value as u32)
}
