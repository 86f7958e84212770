use reqwest::Client;
use serde::Deserialize;
use tracing::{instrument, warn};

// Subset of the OpenWeatherMap 5-day forecast response that we read
#[derive(Deserialize, Debug)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Deserialize, Debug)]
struct ForecastEntry {
    weather: Vec<WeatherDescription>,
    main: MainReadings,
}

#[derive(Deserialize, Debug)]
struct WeatherDescription {
    description: String,
}

#[derive(Deserialize, Debug)]
struct MainReadings {
    // Kept as the API's number text so `25.0` is not shortened to `25`
    temp: serde_json::Number,
}

/// Sentinel returned whenever a forecast cannot be produced
pub fn cannot_fetch(location: &str) -> String {
    format!("Cannot fetch weather for {location}.")
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Summarize the nearest forecast entry for `location` in Telugu.
    ///
    /// `date` is accepted for callers that pass it along, but the first forecast
    /// entry is always used. Every failure collapses into [`cannot_fetch`].
    #[instrument(skip(self))]
    pub async fn forecast(&self, location: &str, date: &str) -> String {
        match self.fetch(location).await {
            Ok(Some(entry)) => match entry.weather.first() {
                Some(weather) => format!(
                    "{location} వాతావరణం: {}, ఉష్ణోగ్రత: {}°C",
                    weather.description, entry.main.temp
                ),
                None => {
                    warn!("Forecast entry has no weather description");
                    cannot_fetch(location)
                }
            },
            Ok(None) => cannot_fetch(location),
            Err(e) => {
                warn!(error = %e, "Weather lookup failed");
                cannot_fetch(location)
            }
        }
    }

    async fn fetch(&self, location: &str) -> Result<Option<ForecastEntry>, reqwest::Error> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "te"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Weather API returned an error status");
            return Ok(None);
        }

        let forecast = response.json::<ForecastResponse>().await?;
        Ok(forecast.list.into_iter().next())
    }
}
