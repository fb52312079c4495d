//! Phase 1: Registration.
//!
//! Bind belongs-to, import and include statements to the units they name.

use crate::error::LinkError;
use crate::linker::context::LinkContext;
use crate::model::{Schema, UnitId, UnitKind};
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec::Vec;

/// Bind every unit's parent module, imports and includes.
pub fn register_units(ctx: &mut LinkContext<'_>) -> Result<(), LinkError> {
    let units = ctx.schema.source_unit_ids();

    // Parents first: include checks need module_of() to be settled.
    for &unit in &units {
        bind_parent(ctx.schema, unit)?;
    }
    for &unit in &units {
        bind_imports(ctx.schema, unit)?;
        bind_includes(ctx.schema, unit)?;
    }
    Ok(())
}

fn bind_parent(schema: &mut Schema, unit: UnitId) -> Result<(), LinkError> {
    let record = schema.unit(unit);
    let Some(parent) = record.belongs_to.clone() else {
        return Ok(());
    };
    let found = latest(schema, &parent, None).filter(|&id| schema.unit(id).kind == UnitKind::Module);
    let Some(module) = found else {
        return Err(LinkError::BelongsTo {
            location: record.location(),
            submodule: record.name.clone(),
            module: parent,
        });
    };
    schema.unit_mut(unit).parent_module = Some(module);
    Ok(())
}

fn bind_imports(schema: &mut Schema, unit: UnitId) -> Result<(), LinkError> {
    let own_prefix = schema.unit(unit).prefix.clone();
    let mut seen = BTreeSet::new();
    let mut targets = Vec::new();

    for import in &schema.unit(unit).imports {
        if import.prefix == own_prefix || !seen.insert(import.prefix.as_str()) {
            return Err(LinkError::DuplicatePrefix {
                location: import.location.clone(),
                prefix: import.prefix.clone(),
            });
        }
        let found = latest(schema, &import.module, import.revision.as_deref())
            .filter(|&id| schema.unit(id).kind == UnitKind::Module);
        let Some(target) = found else {
            let module = match &import.revision {
                Some(revision) => format!("{}@{revision}", import.module),
                None => import.module.clone(),
            };
            return Err(LinkError::ImportNotFound {
                location: import.location.clone(),
                module,
            });
        };
        targets.push(target);
    }

    for (import, target) in schema.unit_mut(unit).imports.iter_mut().zip(targets) {
        import.target = Some(target);
    }
    Ok(())
}

fn bind_includes(schema: &mut Schema, unit: UnitId) -> Result<(), LinkError> {
    let module = schema.module_of(unit);
    let mut targets = Vec::new();

    for include in &schema.unit(unit).includes {
        let found = latest(schema, &include.submodule, include.revision.as_deref())
            .filter(|&id| schema.unit(id).kind == UnitKind::Submodule);
        let Some(target) = found else {
            return Err(LinkError::IncludeNotFound {
                location: include.location.clone(),
                submodule: include.submodule.clone(),
            });
        };
        if schema.unit(target).parent_module != Some(module) {
            return Err(LinkError::BelongsTo {
                location: include.location.clone(),
                submodule: include.submodule.clone(),
                module: schema.unit(module).name.clone(),
            });
        }
        targets.push(target);
    }

    for (include, target) in schema.unit_mut(unit).includes.iter_mut().zip(targets) {
        include.target = Some(target);
    }
    Ok(())
}

/// Unit named `name`; the requested revision, or else the latest one.
fn latest(schema: &Schema, name: &str, revision: Option<&str>) -> Option<UnitId> {
    schema
        .units()
        .filter(|u| !u.is_clone() && u.name == name)
        .filter(|u| revision.is_none() || u.revision.as_deref() == revision)
        .max_by(|a, b| a.revision.cmp(&b.revision).then(a.id.cmp(&b.id)))
        .map(|u| u.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::context::NoopObserver;
    use crate::linker::LinkOptions;
    use crate::model::{Import, Include, Location};

    fn loc() -> Location {
        Location::new("m.yang", 3, 5)
    }

    fn register(schema: &mut Schema) -> Result<(), LinkError> {
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(schema, &options, &mut observer);
        register_units(&mut ctx)
    }

    #[test]
    fn test_imports_bind_latest_revision() {
        let mut schema = Schema::new();
        let old = schema.add_module("t", "urn:t", "t", "t@2019.yang");
        schema.set_revision(old, "2019-01-01");
        let new = schema.add_module("t", "urn:t", "t", "t@2021.yang");
        schema.set_revision(new, "2021-06-30");
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let p = schema.add_module("p", "urn:p", "p", "p.yang");
        schema.add_import(m, Import::new("t", "t", loc()));
        schema.add_import(p, Import::new("t", "t", loc()).with_revision("2019-01-01"));

        register(&mut schema).unwrap();
        assert_eq!(schema.unit(m).imports[0].target, Some(new));
        assert_eq!(schema.unit(p).imports[0].target, Some(old));
    }

    #[test]
    fn test_missing_import() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        schema.add_import(m, Import::new("t", "t", loc()).with_revision("2020-01-01"));
        let err = register(&mut schema).unwrap_err();
        assert!(matches!(err, LinkError::ImportNotFound { ref module, .. } if module == "t@2020-01-01"));
    }

    #[test]
    fn test_duplicate_prefix() {
        let mut schema = Schema::new();
        schema.add_module("a", "urn:a", "a", "a.yang");
        schema.add_module("b", "urn:b", "b", "b.yang");
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        schema.add_import(m, Import::new("a", "x", loc()));
        schema.add_import(m, Import::new("b", "x", loc()));
        let err = register(&mut schema).unwrap_err();
        assert!(matches!(err, LinkError::DuplicatePrefix { ref prefix, .. } if prefix == "x"));

        let mut schema = Schema::new();
        schema.add_module("a", "urn:a", "a", "a.yang");
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        schema.add_import(m, Import::new("a", "m", loc()));
        assert!(matches!(register(&mut schema), Err(LinkError::DuplicatePrefix { .. })));
    }

    #[test]
    fn test_submodule_binding() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let sub = schema.add_submodule("m-sub", "m", "m", "m-sub.yang");
        schema.add_include(m, Include::new("m-sub", loc()));

        register(&mut schema).unwrap();
        assert_eq!(schema.unit(sub).parent_module, Some(m));
        assert_eq!(schema.unit(m).includes[0].target, Some(sub));
        assert_eq!(schema.module_of(sub), m);
    }

    #[test]
    fn test_include_of_foreign_submodule() {
        let mut schema = Schema::new();
        schema.add_module("o", "urn:o", "o", "o.yang");
        schema.add_submodule("o-sub", "o", "o", "o-sub.yang");
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        schema.add_include(m, Include::new("o-sub", loc()));
        let err = register(&mut schema).unwrap_err();
        assert!(matches!(err, LinkError::BelongsTo { ref module, .. } if module == "m"));
    }

    #[test]
    fn test_missing_parent_module() {
        let mut schema = Schema::new();
        schema.add_submodule("lost", "nowhere", "n", "lost.yang");
        let err = register(&mut schema).unwrap_err();
        assert!(matches!(err, LinkError::BelongsTo { ref submodule, .. } if submodule == "lost"));
    }
}
