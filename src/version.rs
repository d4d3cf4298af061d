// Build-time identity from Cargo.toml: served on /version and sent as User-Agent to sources

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// "gdatum/0.3.0"
pub fn user_agent() -> String {
    format!("{}/{}", NAME, VERSION)
}
