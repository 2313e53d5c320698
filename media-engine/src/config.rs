/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Engine configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Configuration for the media orchestration engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway endpoint and credentials.
    pub gateway: GatewayConfig,
    /// PostgreSQL connection string for the media store.
    pub database_url: String,
    /// Video room creation caps.
    pub limits: RoomLimits,
}

/// Connection settings for the SFU gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway signaling endpoint (e.g. "http://sfu:8188/gateway").
    pub url: String,
    /// Pre-shared secret sent on every request.
    pub secret: String,
    /// Bound on every signaling round trip. A timed-out call is a failed
    /// step; it is never retried by the engine.
    pub request_timeout: Duration,
}

/// Caps applied when creating a video-routing room.
#[derive(Debug, Clone, Copy)]
pub struct RoomLimits {
    /// Maximum concurrent publishers per video room.
    pub publisher_cap: u32,
    /// Per-publisher bitrate cap in bits per second.
    pub bitrate_cap: u64,
}

impl Default for RoomLimits {
    fn default() -> Self {
        Self {
            publisher_cap: 100,
            bitrate_cap: 614_400,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required
    /// - `GATEWAY_URL`
    /// - `GATEWAY_SECRET`
    /// - `DATABASE_URL`
    ///
    /// # Optional
    /// - `GATEWAY_TIMEOUT_MS` (default: `"5000"`)
    /// - `VIDEO_PUBLISHER_CAP` (default: `"100"`)
    /// - `VIDEO_BITRATE_CAP` (default: `"614400"`)
    pub fn from_env() -> Result<Self, String> {
        let url =
            env::var("GATEWAY_URL").map_err(|_| "GATEWAY_URL environment variable is required")?;
        let secret = env::var("GATEWAY_SECRET")
            .map_err(|_| "GATEWAY_SECRET environment variable is required")?;
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let timeout_ms = env::var("GATEWAY_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u64>()
            .map_err(|_| "GATEWAY_TIMEOUT_MS must be a valid integer")?;

        let publisher_cap = env::var("VIDEO_PUBLISHER_CAP")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .map_err(|_| "VIDEO_PUBLISHER_CAP must be a valid integer")?;

        let bitrate_cap = env::var("VIDEO_BITRATE_CAP")
            .unwrap_or_else(|_| "614400".to_string())
            .parse::<u64>()
            .map_err(|_| "VIDEO_BITRATE_CAP must be a valid integer")?;

        Ok(Self {
            gateway: GatewayConfig {
                url,
                secret,
                request_timeout: Duration::from_millis(timeout_ms),
            },
            database_url,
            limits: RoomLimits {
                publisher_cap,
                bitrate_cap,
            },
        })
    }
}
