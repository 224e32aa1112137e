//! INI file configuration adapter.

use crate::domain::error::HourcrossError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HourcrossError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| HourcrossError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_all_sections() {
        let content = r#"
[backtest]
symbols = APT, BTC
quote = USDC
initial_capital = 10000.0

[strategy]
take_profit = 1.5
trailing_enabled = on
fast_span = 6

[data]
source = csv
data_dir = ./data
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "symbols"),
            Some("APT, BTC".to_string())
        );
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 10000.0);
        assert_eq!(adapter.get_double("strategy", "take_profit", 0.0), 1.5);
        assert!(adapter.get_bool("strategy", "trailing_enabled", false));
        assert_eq!(adapter.get_int("strategy", "fast_span", 0), 6);
        assert_eq!(
            adapter.get_string("data", "data_dir"),
            Some("./data".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nquote = USDC\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nslow_span = abc\n").unwrap();
        assert_eq!(adapter.get_int("strategy", "slow_span", 40), 40);
        assert_eq!(adapter.get_int("strategy", "fast_span", 6), 6);
    }

    #[test]
    fn get_int_accepts_negative_offset() {
        let adapter = FileConfigAdapter::from_string("[data]\nutc_offset_hours = -5\n").unwrap();
        assert_eq!(adapter.get_int("data", "utc_offset_hours", 2), -5);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nfee_pct = ten basis points\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "fee_pct", 0.1), 0.1);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\na = true\nb = yes\nc = 1\nd = On\ne = false\nf = no\ng = 0\nh = off\n",
        )
        .unwrap();
        for key in ["a", "b", "c", "d"] {
            assert!(adapter.get_bool("strategy", key, false), "{key}");
        }
        for key in ["e", "f", "g", "h"] {
            assert!(!adapter.get_bool("strategy", key, true), "{key}");
        }
    }

    #[test]
    fn get_bool_returns_default_for_missing_or_garbage() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nx = maybe\n").unwrap();
        assert!(adapter.get_bool("strategy", "x", true));
        assert!(!adapter.get_bool("strategy", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\nsource = binance\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "source"),
            Some("binance".to_string())
        );
    }

    #[test]
    fn from_file_missing_file_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/hourcross.ini");
        assert!(matches!(
            result,
            Err(HourcrossError::ConfigParse { file, .. }) if file.contains("hourcross.ini")
        ));
    }
}
