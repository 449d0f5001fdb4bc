use crate::world::time::DEFAULT_TICK_LENGTH;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFINITIONS_FILE: &str = "definitions.yml";
const LAYOUT_FILE: &str = "layout.yml";

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub tick_length: Duration,
    pub seed: u64,
    /// Ticks to run before stopping; 0 runs until shutdown.
    pub tick_limit: u64,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        Self::from_args_with(args, |key| std::env::var(key).ok())
    }

    fn from_args_with(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: rscsim <data-root> [tick_ms]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let tick_ms = if args.len() > 2 {
            Some(parse_number("tick_ms", &args[2])?)
        } else {
            env_number(&env, "RSC_TICK_MS")?
        };
        let tick_length = tick_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TICK_LENGTH);
        let seed = env_number(&env, "RSC_SEED")?.unwrap_or_else(seed_from_clock);
        let tick_limit = env_number(&env, "RSC_TICK_LIMIT")?.unwrap_or(0);
        Ok(Self {
            root,
            tick_length,
            seed,
            tick_limit,
        })
    }

    pub fn definitions_path(&self) -> PathBuf {
        self.root.join(DEFINITIONS_FILE)
    }

    /// The layout file, if the data root has one.
    pub fn layout_path(&self) -> Option<PathBuf> {
        let path = self.root.join(LAYOUT_FILE);
        path.is_file().then_some(path)
    }
}

fn env_number(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>, String> {
    match env(key) {
        Some(value) if !value.trim().is_empty() => parse_number(key, &value).map(Some),
        _ => Ok(None),
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid {} '{}'", name, value))
}

fn seed_from_clock() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
