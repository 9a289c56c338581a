//! Per-key settings storage.
//!
//! Every setting is one row of the `config` table holding its value as text.
//! Typed accessors serialize through [`ConfigValue`] and fall back to the
//! setting's documented default when the row is absent, so callers never see
//! a missing setting.

use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::migrations::MigrationManager;
use crate::schema::Table;

/// The settings coursesync knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Username,
    Password,
    PasswordEncrypted,
    FilenameScheme,
    ThrottleRate,
    ThrottleRateAutorun,
    UpdatePolicy,
    TelemetryPolicy,
    UnrelatedFilesPolicy,
    DownloadVideos,
    CourseWhitelist,
    CourseBlacklist,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 12] = [
        ConfigKey::Username,
        ConfigKey::Password,
        ConfigKey::PasswordEncrypted,
        ConfigKey::FilenameScheme,
        ConfigKey::ThrottleRate,
        ConfigKey::ThrottleRateAutorun,
        ConfigKey::UpdatePolicy,
        ConfigKey::TelemetryPolicy,
        ConfigKey::UnrelatedFilesPolicy,
        ConfigKey::DownloadVideos,
        ConfigKey::CourseWhitelist,
        ConfigKey::CourseBlacklist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Username => "username",
            ConfigKey::Password => "password",
            ConfigKey::PasswordEncrypted => "password_encrypted",
            ConfigKey::FilenameScheme => "filename_scheme",
            ConfigKey::ThrottleRate => "throttle_rate",
            ConfigKey::ThrottleRateAutorun => "throttle_rate_autorun",
            ConfigKey::UpdatePolicy => "update_policy",
            ConfigKey::TelemetryPolicy => "telemetry_policy",
            ConfigKey::UnrelatedFilesPolicy => "unrelated_files_policy",
            ConfigKey::DownloadVideos => "download_videos",
            ConfigKey::CourseWhitelist => "course_whitelist",
            ConfigKey::CourseBlacklist => "course_blacklist",
        }
    }

    /// Text form of the value a typed getter returns when the key is absent.
    ///
    /// `None` means the default is itself "unset" (no username, unbounded
    /// throttle rate, ...).
    pub fn default_text(self) -> Option<String> {
        match self {
            ConfigKey::Username
            | ConfigKey::Password
            | ConfigKey::PasswordEncrypted
            | ConfigKey::ThrottleRate
            | ConfigKey::ThrottleRateAutorun => None,
            ConfigKey::FilenameScheme => Some(FilenameScheme::default().to_config()),
            ConfigKey::UpdatePolicy => Some(UpdatePolicy::default().to_config()),
            ConfigKey::TelemetryPolicy => Some(true.to_config()),
            ConfigKey::UnrelatedFilesPolicy => Some(UnrelatedFilesPolicy::default().to_config()),
            ConfigKey::DownloadVideos => Some(true.to_config()),
            ConfigKey::CourseWhitelist | ConfigKey::CourseBlacklist => {
                Some(Vec::<i64>::new().to_config())
            }
        }
    }

    /// Whether `raw` would be understood by this key's typed getter.
    pub fn accepts(self, raw: &str) -> bool {
        match self {
            ConfigKey::Username | ConfigKey::Password | ConfigKey::PasswordEncrypted => true,
            ConfigKey::FilenameScheme => FilenameScheme::from_config(raw).is_some(),
            ConfigKey::ThrottleRate | ConfigKey::ThrottleRateAutorun => {
                u64::from_config(raw).is_some()
            }
            ConfigKey::UpdatePolicy => UpdatePolicy::from_config(raw).is_some(),
            ConfigKey::TelemetryPolicy | ConfigKey::DownloadVideos => {
                bool::from_config(raw).is_some()
            }
            ConfigKey::UnrelatedFilesPolicy => UnrelatedFilesPolicy::from_config(raw).is_some(),
            ConfigKey::CourseWhitelist | ConfigKey::CourseBlacklist => {
                Vec::<i64>::from_config(raw).is_some()
            }
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| crate::Error::generic(format!("Unknown setting: {s}")))
    }
}

/// A value that can be stored as the text of a config row.
pub trait ConfigValue: Sized {
    fn to_config(&self) -> String;

    /// Parse stored text, `None` if it is not a valid value of this type.
    fn from_config(raw: &str) -> Option<Self>;
}

impl ConfigValue for String {
    fn to_config(&self) -> String {
        self.clone()
    }

    fn from_config(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl ConfigValue for bool {
    fn to_config(&self) -> String {
        self.to_string()
    }

    fn from_config(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(true),
            "false" | "0" | "no" | "n" => Some(false),
            _ => None,
        }
    }
}

impl ConfigValue for u64 {
    fn to_config(&self) -> String {
        self.to_string()
    }

    fn from_config(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl ConfigValue for Vec<i64> {
    fn to_config(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    fn from_config(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl ConfigValue for $name {
            fn to_config(&self) -> String {
                self.as_str().to_string()
            }

            fn from_config(raw: &str) -> Option<Self> {
                match raw.trim() {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                <$name as ConfigValue>::from_config(s).ok_or_else(|| {
                    crate::Error::generic(format!(
                        concat!("Invalid ", stringify!($name), ": {}"),
                        s
                    ))
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// How the tool installs new releases.
    UpdatePolicy {
        #[default]
        Disabled => "0",
        /// Build from the source repository.
        Github => "1",
        /// Install the published release.
        Registry => "2",
    }
}

text_enum! {
    /// How remote file names are rendered on disk.
    FilenameScheme {
        #[default]
        Keep => "0",
        /// Replace characters that are unsafe on common filesystems.
        AsciiSafe => "1",
    }
}

text_enum! {
    /// What to do with files in the working directory the store does not know.
    UnrelatedFilesPolicy {
        #[default]
        Keep => "0",
        MoveAside => "1",
        Delete => "2",
    }
}

/// Database operations for settings.
pub struct ConfigStore<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> ConfigStore<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> crate::Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Remove a setting so its getter reports the default again.
    pub fn unset(&self, key: &str) -> crate::Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM config WHERE key = ?", params![key])?;
        Ok(removed > 0)
    }

    pub fn entries(&self) -> crate::Result<BTreeMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM config")?;
        let rows = stmt.query_map(params![], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            entries.insert(key, value);
        }
        Ok(entries)
    }

    /// Drop every setting at once.
    pub fn delete_config(&self) -> crate::Result<()> {
        MigrationManager::drop_and_recreate(self.conn, Table::Config)
    }

    /// Typed read; unparseable text counts as absent.
    pub fn read<T: ConfigValue>(&self, key: ConfigKey) -> crate::Result<Option<T>> {
        let Some(raw) = self.get(key.as_str())? else {
            return Ok(None);
        };

        match T::from_config(&raw) {
            Some(value) => Ok(Some(value)),
            None => {
                warn!(key = %key, value = %raw, "Ignoring unparseable setting");
                Ok(None)
            }
        }
    }

    pub fn write<T: ConfigValue>(&self, key: ConfigKey, value: &T) -> crate::Result<()> {
        self.set(key.as_str(), &value.to_config())
    }

    fn write_optional<T: ConfigValue>(&self, key: ConfigKey, value: Option<&T>) -> crate::Result<()> {
        match value {
            Some(value) => self.write(key, value),
            None => self.unset(key.as_str()).map(|_| ()),
        }
    }

    pub fn username(&self) -> crate::Result<Option<String>> {
        self.read(ConfigKey::Username)
    }

    pub fn set_username(&self, username: Option<&str>) -> crate::Result<()> {
        self.write_optional(ConfigKey::Username, username.map(str::to_string).as_ref())
    }

    /// Clear-text password, only present when the user opted out of encryption.
    pub fn password(&self) -> crate::Result<Option<String>> {
        self.read(ConfigKey::Password)
    }

    pub fn set_password(&self, password: Option<&str>) -> crate::Result<()> {
        self.write_optional(ConfigKey::Password, password.map(str::to_string).as_ref())
    }

    pub fn password_encrypted(&self) -> crate::Result<Option<String>> {
        self.read(ConfigKey::PasswordEncrypted)
    }

    pub fn set_password_encrypted(&self, encrypted: Option<&str>) -> crate::Result<()> {
        self.write_optional(
            ConfigKey::PasswordEncrypted,
            encrypted.map(str::to_string).as_ref(),
        )
    }

    pub fn filename_scheme(&self) -> crate::Result<FilenameScheme> {
        Ok(self.read(ConfigKey::FilenameScheme)?.unwrap_or_default())
    }

    pub fn set_filename_scheme(&self, scheme: FilenameScheme) -> crate::Result<()> {
        self.write(ConfigKey::FilenameScheme, &scheme)
    }

    /// Download rate limit in MiB/s, `None` for unbounded.
    pub fn throttle_rate(&self) -> crate::Result<Option<u64>> {
        self.read(ConfigKey::ThrottleRate)
    }

    pub fn set_throttle_rate(&self, rate: Option<u64>) -> crate::Result<()> {
        self.write_optional(ConfigKey::ThrottleRate, rate.as_ref())
    }

    /// Rate limit applied when running unattended, `None` for unbounded.
    pub fn throttle_rate_autorun(&self) -> crate::Result<Option<u64>> {
        self.read(ConfigKey::ThrottleRateAutorun)
    }

    pub fn set_throttle_rate_autorun(&self, rate: Option<u64>) -> crate::Result<()> {
        self.write_optional(ConfigKey::ThrottleRateAutorun, rate.as_ref())
    }

    pub fn update_policy(&self) -> crate::Result<UpdatePolicy> {
        Ok(self.read(ConfigKey::UpdatePolicy)?.unwrap_or_default())
    }

    pub fn set_update_policy(&self, policy: UpdatePolicy) -> crate::Result<()> {
        self.write(ConfigKey::UpdatePolicy, &policy)
    }

    pub fn telemetry_policy(&self) -> crate::Result<bool> {
        Ok(self.read(ConfigKey::TelemetryPolicy)?.unwrap_or(true))
    }

    pub fn set_telemetry_policy(&self, enabled: bool) -> crate::Result<()> {
        self.write(ConfigKey::TelemetryPolicy, &enabled)
    }

    pub fn unrelated_files_policy(&self) -> crate::Result<UnrelatedFilesPolicy> {
        Ok(self.read(ConfigKey::UnrelatedFilesPolicy)?.unwrap_or_default())
    }

    pub fn set_unrelated_files_policy(&self, policy: UnrelatedFilesPolicy) -> crate::Result<()> {
        self.write(ConfigKey::UnrelatedFilesPolicy, &policy)
    }

    pub fn download_videos(&self) -> crate::Result<bool> {
        Ok(self.read(ConfigKey::DownloadVideos)?.unwrap_or(true))
    }

    pub fn set_download_videos(&self, enabled: bool) -> crate::Result<()> {
        self.write(ConfigKey::DownloadVideos, &enabled)
    }

    /// Courses to sync exclusively; empty means all.
    pub fn course_whitelist(&self) -> crate::Result<Vec<i64>> {
        Ok(self.read(ConfigKey::CourseWhitelist)?.unwrap_or_default())
    }

    pub fn set_course_whitelist(&self, course_ids: &[i64]) -> crate::Result<()> {
        self.write(ConfigKey::CourseWhitelist, &course_ids.to_vec())
    }

    pub fn course_blacklist(&self) -> crate::Result<Vec<i64>> {
        Ok(self.read(ConfigKey::CourseBlacklist)?.unwrap_or_default())
    }

    pub fn set_course_blacklist(&self, course_ids: &[i64]) -> crate::Result<()> {
        self.write(ConfigKey::CourseBlacklist, &course_ids.to_vec())
    }
}
