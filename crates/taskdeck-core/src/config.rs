use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const DEFAULT_LISTEN: &str =
  "127.0.0.1:5001";
pub const DEFAULT_DATA_LOCATION: &str =
  "tasks.json";
pub const DEFAULT_CORS_ORIGINS: &str =
  "http://localhost:3000,\
   http://localhost:5173";
pub const DEFAULT_API_URL: &str =
  "http://localhost:5001/api";
pub const DEFAULT_CACHE_LOCATION: &str =
  "~/.taskdeck/cache.json";

/// Environment variables that override
/// config keys after the rc file loads.
const ENV_OVERRIDES: [(&str, &str); 3] = [
  ("TASKDECK_LISTEN", "server.listen"),
  ("TASKDECK_DATA", "data.location"),
  ("TASKDECK_API_URL", "api.url")
];

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("server.listen", DEFAULT_LISTEN),
      (
        "data.location",
        DEFAULT_DATA_LOCATION
      ),
      (
        "cors.origins",
        DEFAULT_CORS_ORIGINS
      ),
      ("api.url", DEFAULT_API_URL),
      ("api.timeout", "5"),
      (
        "cache.location",
        DEFAULT_CACHE_LOCATION
      ),
      ("color", "on")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading taskdeckrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no taskdeckrc found; using \
         defaults"
      );
    }

    cfg.apply_env(|name| {
      std::env::var(name).ok()
    });
    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn apply_env<F>(
    &mut self,
    lookup: F
  ) where
    F: Fn(&str) -> Option<String>
  {
    for (var, key) in ENV_OVERRIDES {
      if let Some(value) = lookup(var)
        && !value.trim().is_empty()
      {
        debug!(var, key, value = %value, "applying environment override");
        self.map.insert(
          key.to_string(),
          value.trim().to_string()
        );
      }
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u64>().map_err(
          |err| {
            anyhow!(
              "invalid value for \
               {key}: {v} ({err})"
            )
          }
        )
      })
      .transpose()
  }

  /// Comma separated values with blanks
  /// dropped.
  pub fn get_list(
    &self,
    key: &str
  ) -> Vec<String> {
    self
      .map
      .get(key)
      .map(|v| {
        v.split(',')
          .map(str::trim)
          .filter(|item| !item.is_empty())
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default()
  }

  pub fn get_path(
    &self,
    key: &str
  ) -> Option<PathBuf> {
    self.map.get(key).map(|v| {
      expand_tilde(Path::new(v.trim()))
    })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if self
          .loaded_files
          .contains(&include_path)
        {
          warn!(include = %include_path.display(), "include already loaded; skipping");
        } else if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("TASKDECKRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       ~/.taskdeckrc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".taskdeckrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::Config;

  #[test]
  fn rc_file_with_include_and_comments()
  {
    let temp = tempdir().unwrap();
    let extra = temp.path().join("extra.rc");
    fs::write(
      &extra,
      "cors.origins = https://a.example, ,https://b.example\n"
    )
    .unwrap();

    let rc = temp.path().join("main.rc");
    fs::write(
      &rc,
      "# server\nserver.listen = 0.0.0.0:9000  # all interfaces\n\ninclude extra.rc\ncolor=off\n"
    )
    .unwrap();

    let cfg =
      Config::load(Some(&rc)).unwrap();
    assert_eq!(
      cfg.get("server.listen").as_deref(),
      Some("0.0.0.0:9000")
    );
    assert_eq!(
      cfg.get_list("cors.origins"),
      vec![
        "https://a.example".to_string(),
        "https://b.example".to_string()
      ]
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(false)
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn invalid_line_names_file_and_line()
  {
    let temp = tempdir().unwrap();
    let rc = temp.path().join("bad.rc");
    fs::write(&rc, "color=on\nnot a pair\n")
      .unwrap();

    let err = Config::load(Some(&rc))
      .unwrap_err()
      .to_string();
    assert!(err.contains("bad.rc:2"));
  }

  #[test]
  fn overrides_then_env_take_precedence()
   {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "rc.api.timeout".to_string(),
      "12".to_string()
    )]);
    assert_eq!(
      cfg.get_u64("api.timeout").unwrap(),
      Some(12)
    );

    cfg.apply_env(|name| match name {
      | "TASKDECK_DATA" => {
        Some("/srv/tasks.json".to_string())
      }
      | "TASKDECK_LISTEN" => {
        Some("  ".to_string())
      }
      | _ => None
    });
    assert_eq!(
      cfg.get("data.location").as_deref(),
      Some("/srv/tasks.json")
    );
    assert_eq!(
      cfg.get("server.listen").as_deref(),
      Some(super::DEFAULT_LISTEN)
    );
  }

  #[test]
  fn non_numeric_timeout_is_rejected() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "api.timeout".to_string(),
      "soon".to_string()
    )]);
    assert!(
      cfg.get_u64("api.timeout").is_err()
    );
  }
}
