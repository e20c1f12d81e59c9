use crate::config::Config;
use crate::error::AppError;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::models::*;

const MAX_RETRIES: u32 = 3;
const REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(20) {
    Some(n) => n,
    None => unreachable!(),
};
const MAX_MATCH_IDS: usize = 100;

pub struct RiotApiClient {
    api_key: String,
    region: String,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RiotApiClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = config.require_api_key()?.to_string();
        Ok(RiotApiClient {
            api_key,
            region: config.region.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)),
        })
    }

    fn get_regional_routing(&self) -> &str {
        match self.region.as_str() {
            "na1" | "br1" | "la1" | "la2" => "americas",
            "euw1" | "eun1" | "tr1" | "ru" => "europe",
            "kr" | "jp1" => "asia",
            "oc1" | "ph2" | "sg2" | "th2" | "vn2" => "sea",
            _ => "americas",
        }
    }

    /// Account-V1 is only served from americas, asia and europe.
    fn get_account_routing(&self) -> &str {
        match self.get_regional_routing() {
            "sea" => "asia",
            routing => routing,
        }
    }

    fn wait_for_slot(&self) {
        while let Err(not_until) = self.rate_limiter.check() {
            thread::sleep(not_until.wait_time_from(DefaultClock::default().now()));
        }
    }

    /// GET with rate limiting and 429 backoff. `Ok(None)` means 404.
    fn execute_request(&self, url: &str) -> Result<Option<String>, AppError> {
        let mut retry_count = 0;

        loop {
            self.wait_for_slot();
            debug!("GET {}", url);

            let response = ureq::get(url)
                .set("User-Agent", "prostaff_stats/0.1.0")
                .set("X-Riot-Token", &self.api_key)
                .call();

            match response {
                Ok(resp) => {
                    return resp
                        .into_string()
                        .map(Some)
                        .map_err(|e| AppError::HttpError(e.to_string()));
                }
                Err(ureq::Error::Status(404, _)) => return Ok(None),
                Err(ureq::Error::Status(429, resp)) => {
                    if retry_count >= MAX_RETRIES {
                        return Err(AppError::RateLimited);
                    }
                    let wait_ms = resp
                        .header("Retry-After")
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(|secs| secs * 1000)
                        .unwrap_or(2000 * (retry_count + 1) as u64);
                    warn!("Rate limited, waiting {}ms before retry", wait_ms);
                    thread::sleep(Duration::from_millis(wait_ms));
                    retry_count += 1;
                }
                Err(ureq::Error::Status(code, _)) => {
                    return Err(AppError::ApiError(format!("Riot API returned {}", code)));
                }
                Err(e) => {
                    return Err(AppError::HttpError(e.to_string()));
                }
            }
        }
    }

    pub fn get_account(&self, game_name: &str, tag_line: &str) -> Result<AccountDto, AppError> {
        let url = format!(
            "https://{}.api.riotgames.com/riot/account/v1/accounts/by-riot-id/{}/{}",
            self.get_account_routing(),
            game_name,
            tag_line
        );

        let body = self
            .execute_request(&url)?
            .ok_or_else(|| AppError::AccountNotFound(format!("{}#{}", game_name, tag_line)))?;
        serde_json::from_str(&body).map_err(|e| AppError::JsonError(e.to_string()))
    }

    pub fn get_match_ids(&self, puuid: &str, count: usize) -> Result<Vec<String>, AppError> {
        let url = format!(
            "https://{}.api.riotgames.com/lol/match/v5/matches/by-puuid/{}/ids?count={}",
            self.get_regional_routing(),
            puuid,
            count.min(MAX_MATCH_IDS)
        );

        match self.execute_request(&url)? {
            Some(body) => serde_json::from_str(&body).map_err(|e| AppError::JsonError(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_match(&self, match_id: &str) -> Result<MatchDto, AppError> {
        let url = format!(
            "https://{}.api.riotgames.com/lol/match/v5/matches/{}",
            self.get_regional_routing(),
            match_id
        );

        let body = self
            .execute_request(&url)?
            .ok_or_else(|| AppError::ApiError(format!("Match {} not found", match_id)))?;
        serde_json::from_str(&body).map_err(|e| AppError::JsonError(e.to_string()))
    }
}
