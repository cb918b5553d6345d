use std::str::FromStr;
use std::string::String;
use std::{env, fmt};

use crate::transform::Rule;

pub struct Config {
    pub rule_set: RuleSet,
}

/// Which transformation rules a deployment applies to every record.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum RuleSet {
    #[default]
    All,
    TimestampOnly,
}

impl RuleSet {
    pub fn rules(&self) -> &'static [Rule] {
        match self {
            RuleSet::All => &[
                Rule::ProcessingTimestamp,
                Rule::UppercaseMessage,
                Rule::RemovePassword,
                Rule::CalculateProduct,
                Rule::FlattenNested,
            ],
            RuleSet::TimestampOnly => &[Rule::ProcessingTimestamp],
        }
    }
}

impl FromStr for RuleSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "All" => Ok(RuleSet::All),
            "TimestampOnly" => Ok(RuleSet::TimestampOnly),
            other => Err(format!("Invalid or Unsupported rule set {}", other)),
        }
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Config {
    pub fn load_from_env() -> Result<Config, String> {
        let conf = Config {
            rule_set: env::var("TRANSFORM_RULES")
                .unwrap_or("All".to_string())
                .parse::<RuleSet>()
                .map_err(|e| format!("Error parsing TRANSFORM_RULES - {}", e))?,
        };

        Ok(conf)
    }
}
