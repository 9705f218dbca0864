//! Test: Module Resolution - from saved configuration to planned steps

use crate::helpers::*;
use erp_pipeline::core::{ModuleName, ModuleRef, ProjectId, StepKey};
use erp_pipeline::execution::{plan_steps, ModuleResolver, Resolution};

/// Ids are looked up in the catalog, in configuration order
#[tokio::test]
async fn test_ids_resolved_through_catalog() {
    let mock = service(
        MockJobService::new()
            .with_module_ids(&[1, 3])
            .with_catalog(&[(1, "Duplicate Tool"), (2, "X"), (3, "Envelope Breaking")]),
    );
    let resolver = ModuleResolver::new(mock.clone());

    let modules = resolver.resolve(ProjectId(7)).await;

    assert_eq!(modules.resolution, Resolution::Configured);
    assert_eq!(
        modules.names,
        vec![ModuleName::from("Duplicate Tool"), ModuleName::from("Envelope Breaking")]
    );
    assert_eq!(mock.count("catalog"), 1);

    let keys: Vec<StepKey> = plan_steps(&modules.names).iter().map(|s| s.key).collect();
    assert_eq!(keys, vec![StepKey::Duplicate, StepKey::Envelope]);
}

/// Ids missing from the catalog are dropped
#[tokio::test]
async fn test_unknown_ids_dropped() {
    let mock = service(
        MockJobService::new()
            .with_module_ids(&[4, 99])
            .with_catalog(&[(4, "Extra Envelopes")]),
    );

    let modules = ModuleResolver::new(mock).resolve(ProjectId(7)).await;

    assert_eq!(modules.names, vec![ModuleName::from("Extra Envelopes")]);
}

/// Names are used as-is and the catalog is never fetched
#[tokio::test]
async fn test_names_skip_catalog() {
    let mock = service(MockJobService::new().with_module_names(&["Box Breaking", "Duplicate Tool"]));

    let modules = ModuleResolver::new(mock.clone()).resolve(ProjectId(7)).await;

    assert_eq!(modules.names.len(), 2);
    assert_eq!(mock.count("catalog"), 0);

    // Plan order is fixed regardless of configuration order
    let keys: Vec<StepKey> = plan_steps(&modules.names).iter().map(|s| s.key).collect();
    assert_eq!(keys, vec![StepKey::Duplicate, StepKey::BoxBreaking]);
}

/// The first element decides: with a leading id, stray names are dropped
#[tokio::test]
async fn test_mixed_list_follows_first_element() {
    let mock = service(
        MockJobService::new()
            .with_config(ConfigReply::Modules(vec![
                ModuleRef::Id(1),
                ModuleRef::Name("2".to_string()),
                ModuleRef::Name("Box Breaking".to_string()),
            ]))
            .with_catalog(&[(1, "Duplicate Tool"), (2, "Envelope Breaking")]),
    );

    let modules = ModuleResolver::new(mock).resolve(ProjectId(7)).await;

    assert_eq!(
        modules.names,
        vec![ModuleName::from("Duplicate Tool"), ModuleName::from("Envelope Breaking")]
    );
}

#[tokio::test]
async fn test_missing_configuration() {
    let mock = service(MockJobService::new());

    let modules = ModuleResolver::new(mock.clone()).resolve(ProjectId(7)).await;

    assert_eq!(modules.resolution, Resolution::NotConfigured);
    assert!(modules.is_empty());
    assert_eq!(mock.count("catalog"), 0);
}

/// Load failures degrade to an empty list instead of erroring
#[tokio::test]
async fn test_load_failures_degrade() {
    let config_down = service(MockJobService::new().with_config(ConfigReply::Fails));
    let modules = ModuleResolver::new(config_down).resolve(ProjectId(7)).await;
    assert!(modules.is_degraded());
    assert!(modules.is_empty());

    let catalog_down = service(
        MockJobService::new()
            .with_module_ids(&[1])
            .with_failing_catalog(),
    );
    let modules = ModuleResolver::new(catalog_down).resolve(ProjectId(7)).await;
    assert!(modules.is_degraded());
    assert!(modules.is_empty());
}

/// Modules that match no step simply plan nothing
#[tokio::test]
async fn test_unrelated_modules_plan_nothing() {
    let mock = service(MockJobService::new().with_module_names(&["Unrelated Module", "Audit Trail"]));

    let modules = ModuleResolver::new(mock).resolve(ProjectId(7)).await;

    assert_eq!(modules.names.len(), 2);
    assert!(plan_steps(&modules.names).is_empty());
}
