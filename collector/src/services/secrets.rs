use crate::error::{Result, StatsError};
use log::info;
use std::process::{Command, Output};

/// Publishes a secret somewhere the scheduled (CI) runs can read it.
pub trait SecretProvisioner {
    fn name(&self) -> &str;
    fn provision(&self, secret_name: &str, value: &str) -> Result<()>;
}

/// Does nothing. Used when no target repository is configured and in tests.
#[derive(Debug, Default)]
pub struct NoopProvisioner;

impl SecretProvisioner for NoopProvisioner {
    fn name(&self) -> &str {
        "noop"
    }

    fn provision(&self, secret_name: &str, _value: &str) -> Result<()> {
        info!("Secret provisioning disabled, not publishing {secret_name}");
        Ok(())
    }
}

/// Sets a GitHub Actions repository secret through the `gh` CLI.
#[derive(Debug)]
pub struct GhCliProvisioner {
    repo: String,
    program: String,
}

impl GhCliProvisioner {
    pub fn new(repo: impl Into<String>) -> Self {
        GhCliProvisioner {
            repo: repo.into(),
            program: "gh".to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| StatsError::Provision(format!("could not run {}: {e}", self.program)))
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.run(&["auth", "status"])?.status.success() {
            return Ok(());
        }

        info!("gh is not authenticated, starting interactive login");
        let status = Command::new(&self.program)
            .args(["auth", "login"])
            .status()
            .map_err(|e| StatsError::Provision(format!("could not run {}: {e}", self.program)))?;
        if status.success() {
            Ok(())
        } else {
            Err(StatsError::Provision(format!("gh auth login exited with {status}")))
        }
    }
}

impl SecretProvisioner for GhCliProvisioner {
    fn name(&self) -> &str {
        "gh"
    }

    fn provision(&self, secret_name: &str, value: &str) -> Result<()> {
        self.ensure_authenticated()?;

        let output = self.run(&[
            "secret",
            "set",
            secret_name,
            "--body",
            value,
            "--repo",
            self.repo.as_str(),
        ])?;
        if !output.status.success() {
            return Err(StatsError::Provision(format!(
                "gh secret set {secret_name} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("GitHub secret {secret_name} set on {}", self.repo);
        Ok(())
    }
}
