use crate::core::error::FixtureError;
use crate::ports::FixtureStorePort;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Loads plaintext fixtures from `<base>/<rule-dir>/<name>`.
///
/// Fixtures may carry `@@@TOKEN@@@` placeholders; substitution is literal and
/// case-sensitive, applied by the caller via [`substitute_tokens`].
pub struct DirFixtureStore {
    base_dir: PathBuf,
}

impl DirFixtureStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }
}

impl FixtureStorePort for DirFixtureStore {
    fn load(&self, rule_dir: &str, name: &str) -> Result<String, FixtureError> {
        let path = self.base_dir.join(rule_dir).join(name);
        debug!(path = %path.display(), "Loading fixture");
        fs::read_to_string(&path).map_err(|source| FixtureError::Read {
            path: path
                .canonicalize()
                .unwrap_or(path),
            source,
        })
    }
}

/// Replaces every `@@@KEY@@@` occurrence with its value, literally and
/// case-sensitively. Tokens without a supplied value are left untouched.
pub fn substitute_tokens(content: &str, params: &[(&str, &str)]) -> String {
    let mut out = content.to_string();
    for (key, value) in params {
        let token = format!("@@@{key}@@@");
        out = out.replace(&token, value);
    }
    out
}
