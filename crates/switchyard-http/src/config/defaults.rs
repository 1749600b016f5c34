//! Default configuration values

pub struct RoutingDefaults;

impl RoutingDefaults {
    pub const DEBUG: bool = false;
    pub const STRICT_RULES: bool = false;
    pub const ADMIN_CAPABILITY: &'static str = "manage_options";
    pub const NONCE_HEADER: &'static str = "x-nonce";
    pub const NONCE_FIELD: &'static str = "_nonce";
    pub const NONCE_LIFETIME_SECS: u64 = 86_400;
}
