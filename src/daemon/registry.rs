use crate::config::ProgramsDocument;
use crate::daemon::program::{Program, ProgramPatch};
use crate::error::{Result, SupervisorError};
use log::info;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// The Program Registry (§4.1): the authoritative, persisted mapping from
/// program name to its declaration. All mutation goes through this type so
/// that declarations and their on-disk representation never drift apart.
pub struct Registry {
    path: PathBuf,
    programs: RwLock<HashMap<String, Program>>,
    /// Preserves declaration order for a stable `progs.yaml` and stable
    /// `list()` output.
    order: RwLock<Vec<String>>,
}

impl Registry {
    pub fn load(path: PathBuf) -> Result<Registry> {
        let doc = ProgramsDocument::load(&path)?;
        let mut programs = HashMap::new();
        let mut order = Vec::new();
        for program in doc.programs {
            if let Err(e) = program.validate() {
                log::warn!("Skipping invalid program declaration: {}", e);
                continue;
            }
            order.push(program.name.clone());
            programs.insert(program.name.clone(), program);
        }
        Ok(Registry {
            path,
            programs: RwLock::new(programs),
            order: RwLock::new(order),
        })
    }

    pub fn list(&self) -> Vec<Program> {
        let programs = self.programs.read();
        self.order
            .read()
            .iter()
            .filter_map(|name| programs.get(name).cloned())
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<Program> {
        self.programs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SupervisorError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.read().contains_key(name)
    }

    pub fn add(&self, program: Program) -> Result<()> {
        program.validate()?;
        let mut programs = self.programs.write();
        if programs.contains_key(&program.name) {
            return Err(SupervisorError::NameConflict(program.name));
        }
        self.order.write().push(program.name.clone());
        info!("Registered new program '{}'", program.name);
        programs.insert(program.name.clone(), program);
        drop(programs);
        self.persist()
    }

    pub fn edit(&self, name: &str, patch: ProgramPatch) -> Result<Program> {
        let mut programs = self.programs.write();
        let mut updated = programs
            .get(name)
            .cloned()
            .ok_or_else(|| SupervisorError::NotFound(name.to_string()))?;
        updated.apply_patch(patch);
        updated.validate()?;
        programs.insert(name.to_string(), updated.clone());
        drop(programs);
        self.persist()?;
        Ok(updated)
    }

    pub fn remove(&self, name: &str) -> Result<Program> {
        let mut programs = self.programs.write();
        let removed = programs
            .remove(name)
            .ok_or_else(|| SupervisorError::NotFound(name.to_string()))?;
        self.order.write().retain(|n| n != name);
        drop(programs);
        self.persist()?;
        info!("Removed program '{}'", name);
        Ok(removed)
    }

    fn persist(&self) -> Result<()> {
        let doc = ProgramsDocument {
            programs: self.list(),
        };
        doc.save(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::program::ProgramKind;

    fn program(name: &str) -> Program {
        Program {
            name: name.to_string(),
            kind: ProgramKind::Exec,
            script: Some("run.sh".into()),
            module: None,
            enabled: true,
            uploaded: false,
            venv: None,
            cwd: None,
            args: vec![],
            environment: vec![],
            comment: None,
        }
    }

    fn registry() -> (Registry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progs.yaml");
        (Registry::load(path).unwrap(), dir)
    }

    #[test]
    fn add_then_list_preserves_insertion_order() {
        let (r, _dir) = registry();
        r.add(program("b")).unwrap();
        r.add(program("a")).unwrap();
        let names: Vec<_> = r.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn add_rejects_duplicate_name() {
        let (r, _dir) = registry();
        r.add(program("svc")).unwrap();
        let err = r.add(program("svc")).unwrap_err();
        assert!(matches!(err, SupervisorError::NameConflict(_)));
    }

    #[test]
    fn remove_drops_from_order_and_map() {
        let (r, _dir) = registry();
        r.add(program("svc")).unwrap();
        r.remove("svc").unwrap();
        assert!(!r.contains("svc"));
        assert!(r.list().is_empty());
        assert!(matches!(r.remove("svc").unwrap_err(), SupervisorError::NotFound(_)));
    }

    #[test]
    fn edit_leaves_program_untouched_when_patch_is_invalid() {
        let (r, _dir) = registry();
        r.add(program("svc")).unwrap();

        let bad_patch = ProgramPatch {
            module: Some("mymod".into()),
            ..Default::default()
        };
        assert!(r.edit("svc", bad_patch).is_err());

        // Exec + module is rejected by validate(); the stored declaration
        // must still be the original, untouched one.
        let stored = r.get("svc").unwrap();
        assert_eq!(stored.script, Some("run.sh".into()));
        assert_eq!(stored.module, None);
    }

    #[test]
    fn edit_applies_valid_patch() {
        let (r, _dir) = registry();
        r.add(program("svc")).unwrap();
        let patch = ProgramPatch {
            enabled: Some(false),
            ..Default::default()
        };
        let updated = r.edit("svc", patch).unwrap();
        assert!(!updated.enabled);
        assert!(!r.get("svc").unwrap().enabled);
    }
}
