pub const MAINNET_API_URL: &str = "https://omni.apex.exchange";
pub const TESTNET_API_URL: &str = "https://qa.omni.apex.exchange";
pub const LOCAL_API_URL: &str = "http://localhost:3001";

/// Prefix of every v3 REST path; part of the signed path
pub const API_PREFIX: &str = "/api/v3";

pub(crate) const HEADER_SIGNATURE: &str = "APEX-SIGNATURE";
pub(crate) const HEADER_TIMESTAMP: &str = "APEX-TIMESTAMP";
pub(crate) const HEADER_API_KEY: &str = "APEX-API-KEY";
pub(crate) const HEADER_PASSPHRASE: &str = "APEX-PASSPHRASE";
pub(crate) const CONTENT_TYPE_JSON: &str = "application/json";

pub(crate) const ENV_API_KEY: &str = "APEX_API_KEY";
pub(crate) const ENV_API_SECRET: &str = "APEX_API_SECRET";
pub(crate) const ENV_API_PASSPHRASE: &str = "APEX_API_PASSPHRASE";

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
