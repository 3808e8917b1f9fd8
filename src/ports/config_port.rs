//! Configuration access port.
//!
//! Keys are grouped by section: `[backtest]` for run parameters,
//! `[early_stopping]` for the stop policy and `[sweep]` for sweep axes.
//! Typed getters fall back to `default` when a key is absent or unparsable.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// True when the key is present with a non-blank value.
    fn has_key(&self, section: &str, key: &str) -> bool {
        self.get_string(section, key)
            .is_some_and(|value| !value.trim().is_empty())
    }
}
