use crate::config::Settings;
use crate::daemon::program::{Program, ProgramKind};
use crate::error::{Result, SupervisorError};
use crate::path::from_user_str;
use log::warn;
use std::collections::HashMap;
use std::path::PathBuf;

/// A fully resolved invocation, ready to hand to [`crate::process::Process`].
pub struct Invocation {
    pub command: Vec<String>,
    pub env: HashMap<String, String>,
    pub work_dir: Option<PathBuf>,
}

/// Resolves a [`Program`] declaration into a concrete [`Invocation`] (§4.3).
/// This is the single place that branches on `kind`; adding a new kind
/// means adding one branch here.
pub struct Spawner<'a> {
    settings: &'a Settings,
    base_dir: &'a std::path::Path,
}

impl<'a> Spawner<'a> {
    pub fn new(settings: &'a Settings, base_dir: &'a std::path::Path) -> Self {
        Spawner { settings, base_dir }
    }

    pub fn build(&self, program: &Program) -> Result<Invocation> {
        program.validate()?;

        let work_dir = self.resolve_work_dir(program);
        let command = match program.kind {
            ProgramKind::Python => self.build_python(program, &work_dir)?,
            ProgramKind::Node => self.build_node(program, &work_dir)?,
            ProgramKind::Exec => self.build_exec(program, &work_dir)?,
        };
        let env = self.build_env(program);

        Ok(Invocation {
            command,
            env,
            work_dir: Some(work_dir),
        })
    }

    fn resolve_work_dir(&self, program: &Program) -> PathBuf {
        program
            .cwd
            .as_deref()
            .and_then(from_user_str)
            .or_else(|| self.settings.cwd.as_deref().and_then(from_user_str))
            .unwrap_or_else(|| self.base_dir.to_path_buf())
    }

    fn resolve_script(&self, program: &Program, work_dir: &std::path::Path) -> Result<PathBuf> {
        let script = program.script.as_ref().ok_or_else(|| {
            SupervisorError::BadDeclaration(format!(
                "program '{}' has no script to resolve",
                program.name
            ))
        })?;
        let path = from_user_str(script).unwrap_or_else(|| PathBuf::from(script));
        let absolute = if path.is_absolute() {
            path
        } else {
            work_dir.join(path)
        };
        if !absolute.exists() {
            return Err(SupervisorError::BadDeclaration(format!(
                "script '{}' for program '{}' does not exist",
                absolute.display(),
                program.name
            )));
        }
        Ok(absolute)
    }

    fn python_interpreter(&self, program: &Program) -> PathBuf {
        let venv = program.venv.as_deref().or(self.settings.venv.as_deref());
        match venv.and_then(from_user_str) {
            Some(venv_dir) => venv_dir.join("bin").join("python"),
            None => PathBuf::from("python3"),
        }
    }

    fn build_python(&self, program: &Program, work_dir: &std::path::Path) -> Result<Vec<String>> {
        let interpreter = self.python_interpreter(program).to_string_lossy().into_owned();
        let mut cmd = vec![interpreter];
        if let Some(module) = &program.module {
            cmd.push("-m".to_string());
            cmd.push(module.clone());
        } else {
            let script = self.resolve_script(program, work_dir)?;
            cmd.push(script.to_string_lossy().into_owned());
        }
        cmd.extend(program.args.iter().cloned());
        Ok(cmd)
    }

    fn build_node(&self, program: &Program, work_dir: &std::path::Path) -> Result<Vec<String>> {
        let node = self
            .settings
            .node
            .as_deref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "node".to_string());
        let script = self.resolve_script(program, work_dir)?;
        let mut cmd = vec![node, script.to_string_lossy().into_owned()];
        cmd.extend(program.args.iter().cloned());
        Ok(cmd)
    }

    fn build_exec(&self, program: &Program, work_dir: &std::path::Path) -> Result<Vec<String>> {
        let script = self.resolve_script(program, work_dir)?;
        if !is_executable(&script) {
            return Err(SupervisorError::BadDeclaration(format!(
                "'{}' is not executable",
                script.display()
            )));
        }
        let mut cmd = vec![script.to_string_lossy().into_owned()];
        cmd.extend(program.args.iter().cloned());
        Ok(cmd)
    }

    fn build_env(&self, program: &Program) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        for entry in &program.environment {
            match entry.split() {
                Some((key, value)) => {
                    env.insert(key.to_string(), value.to_string());
                }
                None => warn!(
                    "Skipping malformed environment entry '{}' for program '{}'",
                    entry.0, program.name
                ),
            }
        }
        env
    }
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::program::EnvEntry;

    fn program(kind: ProgramKind) -> Program {
        Program {
            name: "demo".into(),
            kind,
            script: Some("run.py".into()),
            module: None,
            enabled: true,
            uploaded: false,
            venv: None,
            cwd: None,
            args: vec![],
            environment: vec![EnvEntry("FOO=bar".into())],
            comment: None,
        }
    }

    #[test]
    fn rejects_module_on_non_python() {
        let mut p = program(ProgramKind::Exec);
        p.script = None;
        p.module = Some("mymod".into());
        assert!(p.validate().is_err());
    }

    #[test]
    fn env_overlay_wins_over_inherited() {
        std::env::set_var("FOO", "original");
        let settings = Settings::default();
        let spawner = Spawner::new(&settings, std::path::Path::new("."));
        let env = spawner.build_env(&program(ProgramKind::Python));
        assert_eq!(env.get("FOO").map(String::as_str), Some("bar"));
    }
}
