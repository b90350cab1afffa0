use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

const ENV_PREFIX: &str = "GOLEARN_";

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .golearnrc if exists
        if config_path.exists() {
            match fs::File::open(&config_path) {
                Ok(file) => read_rc(BufReader::new(file), &mut map),
                Err(e) => log::warn!("cannot read {}: {}", config_path.display(), e),
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if let Some(key) = k.strip_prefix(ENV_PREFIX) {
                map.insert(key.to_string(), v);
            } else if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    /// Defaults only, no rc file or environment.
    pub fn defaults() -> Self {
        Self { inner: default_map(), config_path: default_config_path() }
    }

    /// Command-line flags land here and win over everything else.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.is_empty()).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("REQUEST_TIMEOUT").unwrap_or(30))
    }

    pub fn log_file(&self) -> PathBuf {
        self.get_path("LOG_FILE")
            .unwrap_or_else(|| env::temp_dir().join("golearn.log"))
    }
}

fn read_rc(reader: impl BufRead, map: &mut HashMap<String, String>) {
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "COURSE_API_URL",
        "COURSE_CATALOG_PATH",
        "EXECUTION_BACKEND",
        "COMPILE_API_URL",
        "COMPILE_API_FORMAT",
        "SANDBOX_MODULE_DIR",
        "SANDBOX_RUNNER",
        "SANDBOX_DEFAULT_EXAMPLE",
        "REQUEST_TIMEOUT",
        "LOG_LEVEL",
        "LOG_FILE",
    ];

    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("golearn").join(".golearnrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    let data = BaseDirs::new()
        .map(|b| b.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.local/share"));

    m.insert("COURSE_API_URL".into(), crate::course::http::DEFAULT_COURSE_API.into());
    m.insert("EXECUTION_BACKEND".into(), "remote".into());
    m.insert("COMPILE_API_FORMAT".into(), "service".into());
    m.insert(
        "SANDBOX_MODULE_DIR".into(),
        data.join("golearn").join("modules").to_string_lossy().into_owned(),
    );
    m.insert("SANDBOX_RUNNER".into(), crate::process::DEFAULT_RUNNER.into());
    m.insert("SANDBOX_DEFAULT_EXAMPLE".into(), crate::execution::examples::DEFAULT_EXAMPLE.into());
    m.insert("REQUEST_TIMEOUT".into(), "30".into());
    m.insert("LOG_LEVEL".into(), "warn".into());

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_lines_override_defaults() {
        let mut map = default_map();
        let rc = "# local setup\nEXECUTION_BACKEND = sandbox\n\nREQUEST_TIMEOUT=5\nnot a pair\n";
        read_rc(rc.as_bytes(), &mut map);
        let cfg = Config { inner: map, config_path: PathBuf::new() };
        assert_eq!(cfg.get("EXECUTION_BACKEND").as_deref(), Some("sandbox"));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.get("COMPILE_API_FORMAT").as_deref(), Some("service"));
    }

    #[test]
    fn set_wins_and_empty_values_read_as_unset() {
        let mut cfg = Config::defaults();
        cfg.set("COURSE_API_URL", "http://courses.test/api");
        assert_eq!(cfg.get("COURSE_API_URL").as_deref(), Some("http://courses.test/api"));
        cfg.set("COMPILE_API_URL", "");
        assert_eq!(cfg.get("COMPILE_API_URL"), None);
    }

    #[test]
    fn typed_getters() {
        let mut cfg = Config::defaults();
        cfg.set("REQUEST_TIMEOUT", "soon");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        cfg.set("FLAG", "1");
        assert!(cfg.get_bool("FLAG"));
        assert!(!cfg.get_bool("MISSING"));
        assert!(cfg.config_path.ends_with("golearn/.golearnrc"));
    }
}
