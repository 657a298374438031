//! Stored manifests must re-partition into the same resources

use std::collections::BTreeMap;

use keel_core::{SortOrder, VersionSet, flatten_manifests, partition};

fn rendered_chart() -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    files.insert(
        "shop/templates/deployment.yaml".to_string(),
        r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: shop
spec:
  replicas: 2
"#
        .to_string(),
    );
    files.insert(
        "shop/templates/service.yaml".to_string(),
        r#"apiVersion: v1
kind: Service
metadata:
  name: shop
spec:
  type: ClusterIP
---
apiVersion: v1
kind: ServiceAccount
metadata:
  name: shop
"#
        .to_string(),
    );
    files.insert(
        "shop/templates/config.yaml".to_string(),
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: shop-config\ndata:\n  mode: prod\n"
            .to_string(),
    );
    files.insert(
        "shop/templates/migrate.yaml".to_string(),
        r#"apiVersion: batch/v1
kind: Job
metadata:
  name: shop-migrate
  annotations:
    helm.sh/hook: pre-upgrade
"#
        .to_string(),
    );
    files.insert("shop/templates/NOTES.txt".to_string(), "Thanks for installing shop".to_string());
    files.insert("shop/templates/_helpers.tpl".to_string(), "{{- define \"x\" -}}".to_string());
    files
}

#[test]
fn test_flatten_then_partition_preserves_manifests() {
    let first = partition(&rendered_chart(), &VersionSet::default(), SortOrder::InstallOrder).unwrap();
    assert_eq!(first.manifests.len(), 4);
    assert_eq!(first.hooks.len(), 1);
    assert_eq!(first.notes.get("shop"), Some("Thanks for installing shop"));

    let stored = flatten_manifests(&first.manifests);
    let mut synthetic = BTreeMap::new();
    synthetic.insert("release-manifest".to_string(), stored);

    let second = partition(&synthetic, &VersionSet::default(), SortOrder::InstallOrder).unwrap();

    assert!(second.hooks.is_empty());
    assert_eq!(second.manifests.len(), first.manifests.len());
    for (a, b) in first.manifests.iter().zip(&second.manifests) {
        assert_eq!(a.content, b.content);
        assert_eq!(a.head, b.head);
        assert_eq!(b.name, "release-manifest");
    }
}

#[test]
fn test_stored_manifest_is_kind_ordered() {
    let p = partition(&rendered_chart(), &VersionSet::default(), SortOrder::InstallOrder).unwrap();
    let stored = flatten_manifests(&p.manifests);

    let sources: Vec<&str> = stored
        .lines()
        .filter_map(|l| l.strip_prefix("# Source: "))
        .collect();
    assert_eq!(
        sources,
        vec![
            "shop/templates/config.yaml",
            "shop/templates/service.yaml",
            "shop/templates/service.yaml",
            "shop/templates/deployment.yaml",
        ]
    );
    assert!(stored.starts_with("\n---\n# Source: shop/templates/config.yaml\napiVersion: v1\n"));
}

#[test]
fn test_uninstall_order_is_reverse_of_install() {
    let install = partition(&rendered_chart(), &VersionSet::default(), SortOrder::InstallOrder).unwrap();
    let uninstall = partition(&rendered_chart(), &VersionSet::default(), SortOrder::UninstallOrder).unwrap();

    let install_kinds: Vec<_> = install.manifests.iter().map(|m| m.head.kind().to_string()).collect();
    let mut uninstall_kinds: Vec<_> = uninstall.manifests.iter().map(|m| m.head.kind().to_string()).collect();
    uninstall_kinds.reverse();
    assert_eq!(install_kinds, uninstall_kinds);
}
