use crate::error::{ReportError, Result};
use crate::ingestion::parse_sale_date;
use crate::period::PeriodKey;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One transaction row from a monthly sales export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub period: PeriodKey,
    pub establishment: String,
    pub value: f64,
    /// Columns the comparison engine does not read (sale type, discount, route, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    pub fn new(period: PeriodKey, establishment: impl Into<String>, value: f64) -> Self {
        Self {
            period,
            establishment: establishment.into(),
            value,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The attribute's value when it is present and not blank.
    pub fn filled_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|v| !v.trim().is_empty())
    }

    /// Reads a sale date out of the named attribute.
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.attribute(name).and_then(parse_sale_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColumnMapping {
    #[schemars(description = "Column holding the YYYY-MM period of each transaction")]
    pub period: String,

    #[schemars(description = "Column holding the establishment (agency, store) name")]
    pub establishment: String,

    #[schemars(description = "Column holding the numeric sale amount that is summed and counted")]
    pub value: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            period: "period".to_string(),
            establishment: "establishment".to_string(),
            value: "value".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Header names used by the monthly ticket-sales exports.
    pub fn sales_export() -> Self {
        Self {
            period: "AnoMes".to_string(),
            establishment: "NomeEstab".to_string(),
            value: "ValorTotal".to_string(),
        }
    }

    pub fn required(&self) -> [&str; 3] {
        [&self.period, &self.establishment, &self.value]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum GrowthPairing {
    #[schemars(
        description = "Compare each period with the one before it in the related-period chain, in chain order."
    )]
    ChainOrder,

    #[schemars(
        description = "Sort the chain by date first, then compare each period with its chronological predecessor."
    )]
    Chronological,
}

impl Default for GrowthPairing {
    fn default() -> Self {
        Self::ChainOrder
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ComparisonConfig {
    #[schemars(description = "Which dataset columns carry the period, establishment and value")]
    pub columns: ColumnMapping,

    #[schemars(description = "How growth columns pair up periods")]
    pub growth_pairing: GrowthPairing,

    #[schemars(
        description = "Multiplier applied to the same month of the previous year to obtain the sales target (1.2 = +20%)"
    )]
    pub target_uplift: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            growth_pairing: GrowthPairing::default(),
            target_uplift: 1.2,
        }
    }
}

impl ComparisonConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (role, column) in [
            ("period", &self.columns.period),
            ("establishment", &self.columns.establishment),
            ("value", &self.columns.value),
        ] {
            if column.trim().is_empty() {
                return Err(ReportError::InvalidConfig(format!(
                    "{} column name must not be empty",
                    role
                )));
            }
        }

        if !self.target_uplift.is_finite() || self.target_uplift <= 0.0 {
            return Err(ReportError::InvalidConfig(format!(
                "target_uplift must be a positive number, got {}",
                self.target_uplift
            )));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ComparisonConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
