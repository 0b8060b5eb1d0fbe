// Currency transformer - adds GBP/EUR/INR market caps from an exchange-rate table

use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::error::EtlError;
use crate::logger::ProgressLog;
use crate::model::{BankRecord, BankTable, ExtractedBank};

/// Target currencies of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Gbp,
    Eur,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Gbp, Currency::Eur, Currency::Inr];

    /// ISO code as it appears in the rate file
    pub fn code(&self) -> &str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,

    #[serde(rename = "Rate")]
    rate: f64,
}

/// Currency code -> multiplier applied to USD amounts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRateTable {
    rates: HashMap<String, f64>,
}

impl ExchangeRateTable {
    /// Build from (code, rate) pairs. Rates must be finite and positive.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, EtlError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut rates = HashMap::new();
        for (code, rate) in pairs {
            let code: String = code.into();
            let code = code.trim().to_string();
            if !rate.is_finite() || rate <= 0.0 {
                return Err(EtlError::MalformedRateFile(format!(
                    "rate for {} must be positive, got {}",
                    code, rate
                )));
            }
            if rates.insert(code.clone(), rate).is_some() {
                return Err(EtlError::MalformedRateFile(format!(
                    "currency {} listed twice",
                    code
                )));
            }
        }
        Ok(ExchangeRateTable { rates })
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn rate(&self, currency: Currency) -> Result<f64, EtlError> {
        self.get(currency.code()).ok_or_else(|| EtlError::MissingRate {
            currency: currency.code().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Read a `Currency,Rate` CSV
pub fn load_exchange_rates(path: &Path) -> Result<ExchangeRateTable, EtlError> {
    let file = File::open(path).map_err(|e| EtlError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut pairs = Vec::new();
    for (line, result) in reader.deserialize::<RateRow>().enumerate() {
        let row = result.map_err(|e| {
            EtlError::MalformedRateFile(format!("{} line {}: {}", path.display(), line + 2, e))
        })?;
        pairs.push((row.currency, row.rate));
    }

    ExchangeRateTable::from_pairs(pairs)
}

/// Round half away from zero to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert every bank's USD market cap into GBP, EUR and INR
///
/// All three rates are resolved before any record is built, so a missing
/// rate never leaves a partial table behind.
pub fn transform(
    banks: Vec<ExtractedBank>,
    rates: &ExchangeRateTable,
) -> Result<BankTable, EtlError> {
    let gbp = rates.rate(Currency::Gbp)?;
    let eur = rates.rate(Currency::Eur)?;
    let inr = rates.rate(Currency::Inr)?;

    Ok(banks
        .into_iter()
        .map(|bank| BankRecord {
            mc_gbp_billion: round2(bank.mc_usd_billion * gbp),
            mc_eur_billion: round2(bank.mc_usd_billion * eur),
            mc_inr_billion: round2(bank.mc_usd_billion * inr),
            mc_usd_billion: bank.mc_usd_billion,
            name: bank.name,
        })
        .collect())
}

/// Transform stage: load the rate file, convert, log around both
pub fn transform_with_rate_file(
    banks: Vec<ExtractedBank>,
    rate_path: &Path,
    log: &ProgressLog,
) -> Result<BankTable, EtlError> {
    log.log_progress("Data transformation started")?;

    let result = load_exchange_rates(rate_path).and_then(|rates| transform(banks, &rates));

    match result {
        Ok(table) => {
            log.log_progress("Data transformation completed")?;
            Ok(table)
        }
        Err(e) => Err(log.failed("Data transformation", e)),
    }
}
