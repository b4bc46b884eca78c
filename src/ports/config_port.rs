//! Read access to run configuration, keyed by INI section and key.

/// Typed lookups with caller-supplied defaults. Unparseable values fall back
/// to the default; validation happens in `domain::config_validation`.
pub trait ConfigPort {
    /// Raw value, `None` when the key is absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
