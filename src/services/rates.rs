use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tracing::warn;

use crate::error::AppError;

const IRS_RATES_URL: &str = "https://www.irs.gov/tax-professionals/standard-mileage-rates";
const RATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Common phrasing on the IRS page: "Self-employed and business: 70 cents/mile"
const RATE_PATTERN: &str = r"(?i)Self-employed and business:\s*(\d+)\s*cents/mile";

/// Supplies the current IRS business mileage rate by scraping the published
/// rates page. Any failure, including a reworded page, yields the configured
/// fallback. No caching and no retry: the rate changes at most once a year
/// and staleness is harmless.
#[derive(Clone)]
pub struct RateService {
    client: Client,
    pattern: Regex,
    fallback: f64,
}

impl RateService {
    pub fn new(fallback: f64) -> Self {
        Self {
            client: Client::new(),
            pattern: Regex::new(RATE_PATTERN).expect("rate pattern is a valid regex"),
            fallback,
        }
    }

    pub fn fallback_rate(&self) -> f64 {
        self.fallback
    }

    /// One best-effort lookup per call; never fails.
    pub async fn current_rate(&self) -> f64 {
        match self.lookup().await {
            Ok(rate) => rate,
            Err(err) => {
                warn!("IRS rate lookup failed, using fallback {}: {err}", self.fallback);
                self.fallback
            }
        }
    }

    async fn lookup(&self) -> Result<f64, AppError> {
        let body = self
            .client
            .get(IRS_RATES_URL)
            .timeout(RATE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(self.parse_rate(&body).unwrap_or(self.fallback))
    }

    /// Extracts the rate from page text; `None` when the wording changed.
    fn parse_rate(&self, body: &str) -> Option<f64> {
        let text = body.split_whitespace().collect::<Vec<_>>().join(" ");
        let captures = self.pattern.captures(&text)?;
        let cents: u32 = captures.get(1)?.as_str().parse().ok()?;
        Some(f64::from(cents) / 100.0)
    }
}
