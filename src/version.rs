// Version information for the Satvision detection node

/// Full version string
pub const VERSION: &str = "v0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-28";
