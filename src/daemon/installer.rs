use crate::daemon::logs::LogManager;
use crate::daemon::program::{Program, ProgramKind};
use crate::error::{Result, SupervisorError};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Maximum size, in bytes, of an uploaded archive (§4.6 step 1).
pub const MAX_ARCHIVE_BYTES: u64 = 50 * 1024 * 1024;

/// Wall-clock cap on a single install subprocess (pip/npm install).
const INSTALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// The Installer (§4.6): turns an uploaded archive into a runnable,
/// isolated program directory. Runs on a dedicated worker, never on the
/// monitor loop, and holds the program's per-program mutex (enforced by the
/// caller) for the whole pipeline.
pub struct Installer {
    uploads_root: PathBuf,
    log_manager: LogManager,
}

impl Installer {
    pub fn new(uploads_root: PathBuf, log_manager: LogManager) -> Self {
        Installer {
            uploads_root,
            log_manager,
        }
    }

    pub fn program_dir(&self, slug: &str) -> PathBuf {
        self.uploads_root.join(slug)
    }

    /// Runs the full install pipeline for `program` from the archive bytes
    /// at `archive_path`. `is_update` distinguishes a brand-new upload
    /// (directory must not exist) from a code update (directory must
    /// already exist).
    pub fn install(&self, program: &Program, archive_path: &Path, is_update: bool) -> Result<()> {
        let slug = program.slug();
        let target_dir = self.program_dir(&slug);

        if is_update && !target_dir.exists() {
            return Err(SupervisorError::NotFound(program.name.clone()));
        }
        if !is_update && target_dir.exists() {
            return Err(SupervisorError::NameConflict(program.name.clone()));
        }

        self.validate_archive(archive_path)?;

        let staging_dir = self
            .uploads_root
            .join(format!(".{}.staging", slug));
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir)?;
        }
        fs::create_dir_all(&staging_dir)?;

        self.extract(archive_path, &staging_dir)?;
        self.flatten_single_root(&staging_dir)?;

        if is_update {
            self.merge_update(&staging_dir, &target_dir)?;
        } else {
            fs::create_dir_all(&self.uploads_root)?;
            fs::rename(&staging_dir, &target_dir)?;
        }

        self.build_environment(program, &target_dir)?;

        self.log_manager
            .append_banner(&slug, "install completed successfully")?;
        info!("Installed program '{}' into {}", program.name, target_dir.display());
        Ok(())
    }

    fn validate_archive(&self, archive_path: &Path) -> Result<()> {
        let size = fs::metadata(archive_path)?.len();
        if size > MAX_ARCHIVE_BYTES {
            return Err(SupervisorError::ArchiveTooLarge(MAX_ARCHIVE_BYTES));
        }

        let file = fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| SupervisorError::BadDeclaration(format!("not a valid zip archive: {}", e)))?;

        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| SupervisorError::BadDeclaration(format!("corrupt archive entry: {}", e)))?;
            let name = entry.name();
            if name.starts_with('/') || name.starts_with('\\') {
                return Err(SupervisorError::UnsafePath(name.to_string()));
            }
            if Path::new(name).components().any(|c| c == std::path::Component::ParentDir) {
                return Err(SupervisorError::UnsafePath(name.to_string()));
            }
        }
        Ok(())
    }

    fn extract(&self, archive_path: &Path, dest: &Path) -> Result<()> {
        let file = fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| SupervisorError::BadDeclaration(format!("not a valid zip archive: {}", e)))?;
        archive
            .extract(dest)
            .map_err(|e| SupervisorError::BadDeclaration(format!("failed to extract archive: {}", e)))?;
        Ok(())
    }

    /// If the archive contained exactly one top-level directory and nothing
    /// else, hoist its contents up so the program's root is that directory's
    /// contents rather than a needless extra nesting level.
    fn flatten_single_root(&self, dir: &Path) -> Result<()> {
        let entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
        if entries.len() != 1 {
            return Ok(());
        }
        let only = &entries[0];
        if !only.file_type()?.is_dir() {
            return Ok(());
        }
        let inner = only.path();
        let tmp = dir.with_extension("flatten-tmp");
        fs::rename(&inner, &tmp)?;
        for entry in fs::read_dir(&tmp)? {
            let entry = entry?;
            let dest = dir.join(entry.file_name());
            fs::rename(entry.path(), dest)?;
        }
        fs::remove_dir_all(&tmp)?;
        Ok(())
    }

    /// Replaces program sources with the staged update while preserving any
    /// existing isolated environment (`.venv`, `node_modules`).
    fn merge_update(&self, staging_dir: &Path, target_dir: &Path) -> Result<()> {
        for entry in fs::read_dir(staging_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name == ".venv" || name == "node_modules" {
                continue;
            }
            let dest = target_dir.join(&name);
            if dest.exists() {
                if dest.is_dir() {
                    fs::remove_dir_all(&dest)?;
                } else {
                    fs::remove_file(&dest)?;
                }
            }
            fs::rename(entry.path(), &dest)?;
        }
        fs::remove_dir_all(staging_dir)?;
        Ok(())
    }

    fn build_environment(&self, program: &Program, target_dir: &Path) -> Result<()> {
        let slug = program.slug();
        match program.kind {
            ProgramKind::Python => {
                let venv_dir = target_dir.join(".venv");
                if !venv_dir.exists() {
                    self.run_streaming(&slug, &["python3", "-m", "venv", ".venv"], target_dir)?;
                }
                let requirements = target_dir.join("requirements.txt");
                if requirements.exists() {
                    let pip = venv_dir.join("bin").join("pip");
                    self.run_streaming(
                        &slug,
                        &[pip.to_string_lossy().as_ref(), "install", "-r", "requirements.txt"],
                        target_dir,
                    )?;
                }
            }
            ProgramKind::Node => {
                if target_dir.join("package.json").exists() {
                    self.run_streaming(&slug, &["npm", "install"], target_dir)?;
                }
            }
            ProgramKind::Exec => {}
        }
        Ok(())
    }

    /// Runs an install subprocess, streaming its combined output into the
    /// program's log with a banner, enforcing a wall-clock timeout.
    fn run_streaming(&self, slug: &str, argv: &[&str], work_dir: &Path) -> Result<()> {
        self.log_manager
            .append_banner(slug, &format!("running: {}", argv.join(" ")))?;

        let (head, tail) = argv.split_first().expect("argv must not be empty");
        let log_file = self.log_manager.open_for_append(slug)?;
        let stderr_file = log_file.try_clone()?;

        let mut child = Command::new(head)
            .args(tail)
            .current_dir(work_dir)
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| SupervisorError::SpawnFailed(slug.to_string(), e.to_string()))?;

        let deadline = Instant::now() + INSTALL_TIMEOUT;
        loop {
            match child.try_wait()? {
                Some(status) => {
                    if !status.success() {
                        self.log_manager.append_banner(
                            slug,
                            &format!("command exited with non-zero status: {:?}", status.code()),
                        )?;
                        return Err(SupervisorError::BadDeclaration(format!(
                            "install command failed: {}",
                            argv.join(" ")
                        )));
                    }
                    return Ok(());
                }
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(SupervisorError::InstallTimeout(slug.to_string()));
                    }
                    std::thread::sleep(Duration::from_millis(300));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_entries() {
        assert!(Path::new("../evil").components().any(|c| c == std::path::Component::ParentDir));
    }
}
