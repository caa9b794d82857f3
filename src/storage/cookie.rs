use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use time::format_description::well_known::Rfc2822;
use time::{Duration, OffsetDateTime};

use super::codec::{decode_tasks, encode_tasks, TaskRecord};
use super::{PersistenceMode, TaskRepository};

const JAR_HEADER: &str = "# task-cells cookie jar";
const JAR_TMP_EXTENSION: &str = "txt.tmp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub max_age_secs: Option<i64>,
    pub expires: Option<OffsetDateTime>,
}

impl Cookie {
    pub fn session(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age_secs: None,
            expires: None,
        }
    }

    pub fn persistent(
        name: impl Into<String>,
        value: impl Into<String>,
        max_age: Duration,
        now: OffsetDateTime,
    ) -> Result<Self> {
        let name = name.into();
        let expires = now
            .checked_add(max_age)
            .with_context(|| format!("expiry of cookie {name} is out of range"))?;
        Ok(Self {
            name,
            value: value.into(),
            max_age_secs: Some(max_age.whole_seconds()),
            expires: Some(expires),
        })
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.map(|expires| expires <= now).unwrap_or(false)
    }

    /// Renders the cookie as a `Set-Cookie` line. The name/value pair is
    /// form-url-encoded so the value can never contain a bare `;`.
    pub fn to_set_cookie(&self) -> Result<String> {
        let mut line = serde_urlencoded::to_string([(self.name.as_str(), self.value.as_str())])
            .with_context(|| format!("encoding cookie {}", self.name))?;
        if let Some(max_age) = self.max_age_secs {
            line.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(expires) = self.expires {
            let expires = expires
                .format(&Rfc2822)
                .with_context(|| format!("formatting expiry of cookie {}", self.name))?;
            line.push_str(&format!("; Expires={expires}"));
        }
        Ok(line)
    }

    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split(';');
        let pair = parts.next().unwrap_or_default().trim();
        if !pair.contains('=') {
            bail!("cookie line has no name=value pair");
        }
        let mut pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(pair).context("decoding cookie name/value")?;
        if pairs.len() != 1 {
            bail!("expected one name=value pair, found {}", pairs.len());
        }
        let (name, value) = pairs.remove(0);
        if name.is_empty() {
            bail!("cookie name is empty");
        }

        let mut cookie = Cookie::session(name, value);
        for attribute in parts {
            let Some((key, val)) = attribute.trim().split_once('=') else {
                continue;
            };
            if key.eq_ignore_ascii_case("max-age") {
                cookie.max_age_secs = Some(
                    val.trim()
                        .parse()
                        .with_context(|| format!("parsing Max-Age of cookie {}", cookie.name))?,
                );
            } else if key.eq_ignore_ascii_case("expires") {
                cookie.expires = Some(
                    OffsetDateTime::parse(val.trim(), &Rfc2822)
                        .with_context(|| format!("parsing Expires of cookie {}", cookie.name))?,
                );
            }
        }
        Ok(cookie)
    }
}

/// File-backed cookie jar holding one `Set-Cookie` line per cookie. Task data
/// lives in a single named cookie; other cookies are carried along untouched.
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
    name: String,
    max_age: Duration,
}

impl CookieJar {
    /// Opens (creating if needed) the jar file. Fails when the location is not
    /// writable, which callers treat as "cookies disabled".
    pub fn open(path: PathBuf, name: impl Into<String>, max_age: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cookie jar directory {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening cookie jar {}", path.display()))?;
        Ok(Self {
            path,
            name: name.into(),
            max_age,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every unexpired cookie in the jar. Unparseable lines are skipped.
    pub fn read_cookies(&self, now: OffsetDateTime) -> Result<Vec<Cookie>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading cookie jar {}", self.path.display()))
            }
        };
        let mut cookies = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Cookie::parse(line) {
                Ok(cookie) if cookie.is_expired(now) => {
                    tracing::debug!(name = %cookie.name, "dropping expired cookie");
                }
                Ok(cookie) => cookies.push(cookie),
                Err(err) => {
                    tracing::warn!(?err, line = idx + 1, "skipping malformed cookie jar line");
                }
            }
        }
        Ok(cookies)
    }

    pub fn get(&self, name: &str, now: OffsetDateTime) -> Result<Option<Cookie>> {
        Ok(self
            .read_cookies(now)?
            .into_iter()
            .find(|cookie| cookie.name == name))
    }

    /// Stores `cookie`, replacing any cookie with the same name.
    pub fn set(&self, cookie: Cookie, now: OffsetDateTime) -> Result<()> {
        let mut cookies = self.read_cookies(now)?;
        cookies.retain(|existing| existing.name != cookie.name);
        cookies.push(cookie);
        self.write_cookies(&cookies)
    }

    fn write_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        let mut contents = String::from(JAR_HEADER);
        contents.push('\n');
        for cookie in cookies {
            contents.push_str(&cookie.to_set_cookie()?);
            contents.push('\n');
        }
        let tmp_path = self.path.with_extension(JAR_TMP_EXTENSION);
        fs::write(&tmp_path, contents.as_bytes()).with_context(|| {
            format!("writing temporary cookie jar {}", tmp_path.display())
        })?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("atomically replacing cookie jar {}", self.path.display())
        })?;
        Ok(())
    }
}

impl TaskRepository for CookieJar {
    fn load(&self) -> Result<Vec<TaskRecord>> {
        let Some(cookie) = self.get(&self.name, OffsetDateTime::now_utc())? else {
            tracing::debug!(name = %self.name, "no task cookie present");
            return Ok(Vec::new());
        };
        decode_tasks(&cookie.value).with_context(|| format!("decoding cookie {}", self.name))
    }

    fn save(&mut self, records: &[TaskRecord]) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        let value = encode_tasks(records)?;
        let cookie = Cookie::persistent(&*self.name, value, self.max_age, now)?;
        self.set(cookie, now)
    }

    fn mode(&self) -> PersistenceMode {
        PersistenceMode::CookieJar
    }
}
