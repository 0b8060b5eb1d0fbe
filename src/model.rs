use serde::{Deserialize, Serialize};

/// A bank as scraped from the ranking page, before currency conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedBank {
    pub name: String,
    pub mc_usd_billion: f64,
}

/// A fully transformed row of the report
///
/// Field order is column order in both the CSV file and the database table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRecord {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "MC_USD_Billion")]
    pub mc_usd_billion: f64,

    #[serde(rename = "MC_GBP_Billion")]
    pub mc_gbp_billion: f64,

    #[serde(rename = "MC_EUR_Billion")]
    pub mc_eur_billion: f64,

    #[serde(rename = "MC_INR_Billion")]
    pub mc_inr_billion: f64,
}

/// Records in source-page row order
pub type BankTable = Vec<BankRecord>;

/// Report columns, in order
pub const COLUMNS: [&str; 5] = [
    "Name",
    "MC_USD_Billion",
    "MC_GBP_Billion",
    "MC_EUR_Billion",
    "MC_INR_Billion",
];
