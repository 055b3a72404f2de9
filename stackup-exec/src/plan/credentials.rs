use std::fmt;
use std::io;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use stackup_core::StackConfig;
use zeroize::Zeroizing;

const SECRET_LEN: usize = 32;

/// Secrets generated on first install and shared by the steps that need them.
pub struct Credentials {
    postgres_password: SecretString,
    redis_password: SecretString,
    jwt_secret: SecretString,
    admin_password: SecretString,
}

impl Credentials {
    pub fn generate() -> Self {
        Self {
            postgres_password: random_secret(),
            redis_password: random_secret(),
            jwt_secret: random_secret(),
            admin_password: random_secret(),
        }
    }

    /// Reads the secrets back from an earlier install's env file, or generates fresh ones
    /// when there is none. A file missing any secret is an error rather than a rotation.
    pub async fn load_or_generate(env_file: &Path) -> io::Result<Self> {
        match tokio::fs::read_to_string(env_file).await {
            Ok(contents) => {
                let contents = Zeroizing::new(contents);
                Self::from_env(&contents).map_err(|key| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("{} has no {key}", env_file.display()),
                    )
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::generate()),
            Err(e) => Err(e),
        }
    }

    fn from_env(contents: &str) -> Result<Self, &'static str> {
        let lookup = |key: &'static str| {
            contents
                .lines()
                .filter_map(|line| line.split_once('='))
                .find(|(k, v)| k.trim() == key && !v.trim().is_empty())
                .map(|(_, v)| SecretString::from(v.trim().to_string()))
                .ok_or(key)
        };
        Ok(Self {
            postgres_password: lookup("POSTGRES_PASSWORD")?,
            redis_password: lookup("REDIS_PASSWORD")?,
            jwt_secret: lookup("JWT_SECRET")?,
            admin_password: lookup("ADMIN_PASSWORD")?,
        })
    }

    pub fn admin_password(&self) -> &SecretString {
        &self.admin_password
    }

    fn entries(&self) -> [(&'static str, &SecretString); 4] {
        [
            ("POSTGRES_PASSWORD", &self.postgres_password),
            ("REDIS_PASSWORD", &self.redis_password),
            ("JWT_SECRET", &self.jwt_secret),
            ("ADMIN_PASSWORD", &self.admin_password),
        ]
    }

    /// Env file contents. The buffer is wiped when dropped.
    pub fn render_env(&self, config: &StackConfig) -> Zeroizing<String> {
        let mut out = Zeroizing::new(String::new());
        out.push_str("# Generated by stackup. Contains secrets; keep this file private.\n");
        out.push_str(&format!("COMPOSE_PROJECT_NAME={}\n", config.project));
        out.push_str(&format!("ADMIN_EMAIL={}\n", config.admin.email));
        out.push_str(&format!("ADMIN_USERNAME={}\n", config.admin.username));
        for (key, value) in self.entries() {
            out.push_str(key);
            out.push('=');
            out.push_str(value.expose_secret());
            out.push('\n');
        }
        out
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

fn random_secret() -> SecretString {
    let raw: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(SECRET_LEN)
        .collect();
    SecretString::from(raw)
}

/// Writes `contents` to `path`, creating parent directories. Owner-only on unix.
pub async fn write_private_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(())
}
